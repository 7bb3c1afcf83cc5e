use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use axum::Router;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use policy_rag::core::config::AppPaths;
use policy_rag::core::logging;
use policy_rag::rag::VectorIndex;
use policy_rag::records::RecordStore;
use policy_rag::server;
use policy_rag::state::{AppState, IndexMode};

#[derive(Parser, Debug)]
#[command(
    name = "policy-rag",
    about = "Answer government-policy questions grounded in an indexed knowledge base"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Port to bind (overrides server.port; 0 picks a free port)
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Load a staged JSON array of records, clean it and index it
    Ingest {
        /// Path to the staged records file
        file: PathBuf,

        /// Replace all entries once the file loads and the embedder answers
        #[arg(long, default_value_t = false)]
        reindex: bool,
    },
    /// Interactive question loop on the terminal
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = Arc::new(AppPaths::new());
    if let Err(err) = logging::init(&paths) {
        eprintln!("policy-rag: file logging disabled: {err}");
    }

    match cli.command {
        Command::Serve { port } => serve(paths, port).await,
        Command::Ingest { file, reindex } => ingest(paths, file, reindex).await,
        Command::Chat => chat(paths).await,
    }
}

async fn serve(paths: Arc<AppPaths>, port: Option<u16>) -> anyhow::Result<()> {
    let state = AppState::initialize(paths, IndexMode::Strict)
        .await
        .context("Failed to initialize application state")?;

    let port = port.unwrap_or(state.settings.port);
    let bind_addr = format!("{}:{}", state.settings.host, port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("POLICY_RAG_PORT={}", addr.port());
    tracing::info!(entries = state.index.count().await.unwrap_or(0), "Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

async fn ingest(paths: Arc<AppPaths>, file: PathBuf, reindex: bool) -> anyhow::Result<()> {
    // load before touching the index so a bad file never clears it
    let store = RecordStore::from_path(&file)
        .with_context(|| format!("Failed to load records from {}", file.display()))?;
    let rejected = store.rejected().to_vec();
    let duplicates = store.duplicates();

    let mode = if reindex { IndexMode::Reindex } else { IndexMode::Strict };
    let state = AppState::initialize(paths, mode)
        .await
        .context("Failed to initialize application state")?;

    let pipeline = state.ingestion_pipeline();
    let report = if reindex {
        pipeline
            .reindex(store.records(), state.settings.dimension)
            .await
            .context("Reindex aborted; existing entries were kept")?
    } else {
        pipeline.ingest(store.records()).await
    };
    let entries = state.index.count().await?;

    let summary = serde_json::json!({
        "file": file.display().to_string(),
        "rejected": &rejected,
        "duplicates": duplicates,
        "report": &report,
        "entries": entries,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !report.is_complete() {
        bail!(
            "{} records were not committed; rerun ingestion once the index is reachable",
            report.uncommitted.len()
        );
    }
    Ok(())
}

async fn chat(paths: Arc<AppPaths>) -> anyhow::Result<()> {
    let state = AppState::initialize(paths, IndexMode::Strict)
        .await
        .context("Failed to initialize application state")?;
    let assistant = state.assistant.clone();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all("欢迎使用政务问答助手，输入 exit 退出。\n".as_bytes())
        .await?;

    loop {
        stdout.write_all("你: ".as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query, "exit" | "quit" | "退出") {
            break;
        }

        match assistant.ask(query).await {
            Ok(grounded) => {
                stdout
                    .write_all(format!("Chatbot: {}\n", grounded.answer).as_bytes())
                    .await?;
            }
            Err(err) => {
                tracing::warn!(error = %err, retryable = err.is_retryable(), "Question failed");
                stdout
                    .write_all(format!("Chatbot: 抱歉，暂时无法回答（{}）\n", err).as_bytes())
                    .await?;
            }
        }
    }

    let transcript = assistant.render_transcript().await;
    if !transcript.is_empty() {
        stdout
            .write_all(format!("\n对话记录:\n{}\n", transcript).as_bytes())
            .await?;
    }
    stdout.flush().await?;
    Ok(())
}
