use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::assistant::PolicyAssistant;
use crate::core::config::{AppPaths, ConfigService, RagSettings};
use crate::embedding::{self, EmbeddingProvider};
use crate::llm::{self, ChatBackend};
use crate::rag::{AnswerGenerator, IngestionPipeline, Retriever, SqliteVectorIndex};

pub mod error;

use error::InitializationError;

/// Shared application state for the HTTP routes and the CLI.
///
/// Holds the one vector index, the embedder shared by ingestion and
/// retrieval, and the assistant that owns the conversation session.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: RagSettings,
    pub index: Arc<SqliteVectorIndex>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub assistant: Arc<PolicyAssistant>,
    pub started_at: DateTime<Utc>,
}

/// How an existing index with a different dimension is treated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Refuse to start on a dimension conflict.
    Strict,
    /// Open whatever dimension is stored; the caller resets before writing.
    Reindex,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Loading and validating configuration
    /// 2. Opening the vector index with the configured dimension
    /// 3. Building the embedding and chat backends
    pub async fn initialize(paths: Arc<AppPaths>, mode: IndexMode) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config.load_settings().map_err(InitializationError::Config)?;
        if let Ok(effective) = config.load_config() {
            tracing::debug!(
                config = %config.redact_sensitive_values(&effective),
                path = %config.config_path().display(),
                "Configuration loaded"
            );
        }

        let index_path = resolve_index_path(&paths, &settings);
        if let Some(parent) = index_path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!("Failed to create index directory {}: {}", parent.display(), err);
            }
        }

        let index = match mode {
            IndexMode::Strict => SqliteVectorIndex::open(&index_path, settings.dimension).await,
            IndexMode::Reindex => {
                tracing::info!(path = %index_path.display(), "Opening index for reindex");
                SqliteVectorIndex::open_for_reindex(&index_path, settings.dimension).await
            }
        }
        .map_err(InitializationError::Index)?;

        let embedder = embedding::from_settings(&settings).map_err(InitializationError::Embedding)?;
        let backend = llm::from_settings(&settings).map_err(InitializationError::Generation)?;

        Ok(Self::assemble(paths, config, settings, Arc::new(index), embedder, backend))
    }

    /// Wires already-built components together.
    pub fn assemble(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: RagSettings,
        index: Arc<SqliteVectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn ChatBackend>,
    ) -> Arc<Self> {
        let retriever = Arc::new(Retriever::new(
            index.clone(),
            embedder.clone(),
            settings.embedding.timeout,
        ));
        let generator = Arc::new(AnswerGenerator::from_settings(
            retriever,
            backend,
            &settings.generation,
            settings.top_k,
        ));
        let assistant = Arc::new(PolicyAssistant::new(generator, settings.max_turns));

        Arc::new(AppState {
            paths,
            config,
            settings,
            index,
            embedder,
            assistant,
            started_at: Utc::now(),
        })
    }

    pub fn ingestion_pipeline(&self) -> IngestionPipeline {
        IngestionPipeline::new(self.index.clone(), self.embedder.clone())
            .with_batch_size(self.settings.batch_size)
            .with_embed_timeout(self.settings.embedding.timeout)
    }
}

/// Configured `index.path`, relative paths taken from the data directory.
fn resolve_index_path(paths: &AppPaths, settings: &RagSettings) -> PathBuf {
    match &settings.index_path {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => paths.user_data_dir.join(path),
        None => paths.index_path.clone(),
    }
}
