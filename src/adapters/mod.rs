//! Adapters for external systems.

pub mod cache;
pub mod embeddings;
pub mod llm;
pub mod sqlite;
