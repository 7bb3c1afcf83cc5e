//! Deterministic backend doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::embedding::{EmbeddingProvider, HashEmbedder};
use crate::llm::{ChatBackend, ChatRequest};
use crate::rag::{IndexedEntry, SqliteVectorIndex, VectorIndex};
use crate::records::KnowledgeRecord;

pub const TEST_DIMENSION: usize = 256;

pub fn policy_record(title: &str, content: &str) -> KnowledgeRecord {
    KnowledgeRecord::new(title, "2024-05-20 10:30:00", "广东省人民政府", content)
}

pub async fn temp_index(dimension: usize) -> (tempfile::TempDir, Arc<SqliteVectorIndex>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = SqliteVectorIndex::open(dir.path().join("policy_index.db"), dimension)
        .await
        .expect("open index");
    (dir, Arc::new(index))
}

/// Embeds `record` with `embedder` and upserts it.
pub async fn index_record(index: &dyn VectorIndex, embedder: &HashEmbedder, record: KnowledgeRecord) {
    let embedding = embedder.embed_sync(&record.canonical_text()).expect("embed");
    index
        .upsert(IndexedEntry::new(record, embedding))
        .await
        .expect("upsert");
}

/// Hash embedder that emits a vector of the wrong length for texts containing a marker.
pub struct MismatchEmbedder {
    inner: HashEmbedder,
    marker: String,
    wrong_dimension: usize,
}

impl MismatchEmbedder {
    pub fn new(dimension: usize, marker: &str, wrong_dimension: usize) -> Self {
        Self {
            inner: HashEmbedder::new(dimension),
            marker: marker.to_string(),
            wrong_dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for MismatchEmbedder {
    fn name(&self) -> &str {
        "mismatch"
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        if text.contains(&self.marker) {
            return Ok(vec![0.1; self.wrong_dimension]);
        }
        self.inner.embed_sync(text)
    }
}

/// Embedder whose backend is always down.
pub struct UnreachableEmbedder;

#[async_trait]
impl EmbeddingProvider for UnreachableEmbedder {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn dimension(&self) -> Option<usize> {
        None
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, RagError> {
        Err(RagError::embedding_transient("connection refused"))
    }
}

/// Chat backend that plays back scripted results, then a fixed reply.
pub struct ScriptedChat {
    script: Mutex<VecDeque<Result<String, RagError>>>,
    fallback: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: reply.to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_script(reply: &str, script: Vec<Result<String, RagError>>) -> Self {
        let chat = Self::replying(reply);
        *chat.script.lock().expect("script lock") = script.into();
        chat
    }

    pub fn slow(reply: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(reply)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().expect("request lock").clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, RagError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("request lock") = Some(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().expect("script lock").pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
