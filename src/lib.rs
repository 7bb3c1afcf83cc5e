pub mod assistant;
pub mod core;
pub mod embedding;
pub mod llm;
pub mod rag;
pub mod records;
pub mod server;
pub mod session;
pub mod state;
pub mod vector_math;

#[cfg(test)]
pub(crate) mod test_support;
