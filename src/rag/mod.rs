//! Retrieval-augmented answering over the policy knowledge base.
//!
//! - `SqliteVectorIndex`: durable embedding store behind the `VectorIndex` trait
//! - `IngestionPipeline`: embeds cleaned records and writes them in batches
//! - `Retriever` / `AnswerGenerator`: query-time retrieval and grounded generation

pub mod context_builder;
mod generator;
mod ingest;
mod retriever;
mod sqlite;
mod store;

pub use generator::{AnswerGenerator, GroundedAnswer};
pub use ingest::{IngestReport, IngestionPipeline, SkippedRecord};
pub use retriever::Retriever;
pub use sqlite::SqliteVectorIndex;
pub use store::{check_dimension, IndexedEntry, SearchHit, VectorIndex};
