//! SQLite-backed vector index.
//!
//! Record metadata and little-endian f32 embedding blobs live in one table;
//! search is a brute-force cosine scan that reads and decodes every stored
//! vector, so each query costs O(entries x dimension). The dimension is
//! persisted in a meta table so that reopening with a different dimension
//! is refused.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;

use super::store::{check_dimension, IndexedEntry, SearchHit, VectorIndex};
use crate::core::errors::RagError;
use crate::records::KnowledgeRecord;
use crate::vector_math::rank_descending;

const DIMENSION_KEY: &str = "dimension";

const UPSERT_SQL: &str = "INSERT INTO index_entries (title, time, source, content, embedding)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(title) DO UPDATE SET
         time = excluded.time,
         source = excluded.source,
         content = excluded.content,
         embedding = excluded.embedding,
         updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')";

pub struct SqliteVectorIndex {
    pool: SqlitePool,
    db_path: PathBuf,
    dimension: AtomicUsize,
    // single writer; readers go straight to the pool
    write_lock: Mutex<()>,
}

impl SqliteVectorIndex {
    /// Opens or creates the index at `db_path` with embedding dimension `dimension`.
    ///
    /// Fails with `ConfigConflict` when the file already holds an index of another dimension.
    pub async fn open(db_path: impl AsRef<Path>, dimension: usize) -> Result<Self, RagError> {
        let index = Self::connect(db_path.as_ref(), dimension).await?;
        index.claim_dimension(dimension).await?;

        tracing::info!(path = %index.db_path.display(), dimension, "Vector index opened");
        Ok(index)
    }

    /// Opens the index whatever dimension it was created with.
    ///
    /// Existing entries and their stored dimension are kept untouched until
    /// `reset` is called, so a reindex that fails before that point loses nothing.
    pub async fn open_for_reindex(db_path: impl AsRef<Path>, dimension: usize) -> Result<Self, RagError> {
        let index = Self::connect(db_path.as_ref(), dimension).await?;
        match index.stored_dimension().await? {
            Some(existing) => {
                if existing != dimension {
                    tracing::warn!(
                        path = %index.db_path.display(),
                        existing,
                        requested = dimension,
                        "Index dimension differs; entries are kept until reset"
                    );
                }
                index.dimension.store(existing, Ordering::Release);
            }
            None => index.claim_dimension(dimension).await?,
        }
        Ok(index)
    }

    async fn connect(db_path: &Path, dimension: usize) -> Result<Self, RagError> {
        if dimension == 0 {
            return Err(RagError::Config("index dimension must be positive".to_string()));
        }
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                return Err(RagError::IndexUnavailable(format!(
                    "index directory {} does not exist",
                    parent.display()
                )));
            }
        }
        let db_path = db_path.to_path_buf();

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect_with(options)
            .await?;

        let index = Self {
            pool,
            db_path,
            dimension: AtomicUsize::new(dimension),
            write_lock: Mutex::new(()),
        };
        index.init_schema().await?;
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_entries (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE,
                time TEXT NOT NULL,
                source TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn stored_dimension(&self) -> Result<Option<usize>, RagError> {
        let stored: Option<String> = sqlx::query("SELECT value FROM index_meta WHERE key = ?1")
            .bind(DIMENSION_KEY)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.try_get("value"))
            .transpose()?;

        stored
            .map(|value| {
                value.parse().map_err(|_| {
                    RagError::Storage(format!("corrupt dimension value '{}' in index meta", value))
                })
            })
            .transpose()
    }

    async fn claim_dimension(&self, dimension: usize) -> Result<(), RagError> {
        let _guard = self.write_lock.lock().await;

        match self.stored_dimension().await? {
            Some(existing) => {
                if existing != dimension {
                    return Err(RagError::ConfigConflict(format!(
                        "index at {} was created with dimension {}, requested {}; reindex to change it",
                        self.db_path.display(),
                        existing,
                        dimension
                    )));
                }
            }
            None => {
                sqlx::query("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")
                    .bind(DIMENSION_KEY)
                    .bind(dimension.to_string())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn write_entry(tx: &mut Transaction<'_, Sqlite>, entry: &IndexedEntry) -> Result<(), RagError> {
        let record = &entry.record;
        sqlx::query(UPSERT_SQL)
            .bind(&record.title)
            .bind(&record.timestamp)
            .bind(&record.source)
            .bind(&record.content)
            .bind(serialize_embedding(&entry.embedding))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<IndexedEntry, RagError> {
        let blob: Vec<u8> = row.try_get("embedding")?;
        Ok(IndexedEntry {
            record: KnowledgeRecord {
                title: row.try_get("title")?,
                timestamp: row.try_get("time")?,
                source: row.try_get("source")?,
                content: row.try_get("content")?,
            },
            embedding: deserialize_embedding(&blob),
        })
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Acquire)
    }

    async fn upsert(&self, entry: IndexedEntry) -> Result<(), RagError> {
        self.upsert_batch(vec![entry]).await.map(|_| ())
    }

    async fn upsert_batch(&self, entries: Vec<IndexedEntry>) -> Result<usize, RagError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let dimension = self.dimension();
        for entry in &entries {
            check_dimension(dimension, &entry.embedding)?;
        }

        let mut tx = self.pool.begin().await?;
        for entry in &entries {
            Self::write_entry(&mut tx, entry).await?;
        }
        tx.commit().await?;

        tracing::debug!(count = entries.len(), "Committed index batch");
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchHit>, RagError> {
        let dimension = self.dimension();
        check_dimension(dimension, query_embedding)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT title, time, source, content, embedding
             FROM index_entries
             ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let entry = Self::row_to_entry(row)?;
            if entry.embedding.len() != dimension {
                tracing::warn!(title = %entry.record.title, "Skipping stored entry with wrong dimension");
                continue;
            }
            entries.push(Some(entry));
        }

        let candidates: Vec<&[f32]> = entries
            .iter()
            .flatten()
            .map(|entry| entry.embedding.as_slice())
            .collect();
        let ranked = rank_descending(query_embedding, &candidates);

        let mut hits = Vec::with_capacity(k.min(ranked.len()));
        for (idx, score) in ranked.into_iter().take(k) {
            if let Some(entry) = entries[idx].take() {
                hits.push(SearchHit { entry, score });
            }
        }
        Ok(hits)
    }

    async fn get(&self, key: &str) -> Result<Option<IndexedEntry>, RagError> {
        let row = sqlx::query(
            "SELECT title, time, source, content, embedding
             FROM index_entries
             WHERE title = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_entry).transpose()
    }

    async fn count(&self) -> Result<usize, RagError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM index_entries")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?;
        Ok(count.max(0) as usize)
    }

    async fn reset(&self, dimension: usize) -> Result<(), RagError> {
        if dimension == 0 {
            return Err(RagError::Config("index dimension must be positive".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM index_entries")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO index_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')",
        )
        .bind(DIMENSION_KEY)
        .bind(dimension.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.dimension.store(dimension, Ordering::Release);
        tracing::info!(path = %self.db_path.display(), dimension, "Vector index reset");
        Ok(())
    }
}
