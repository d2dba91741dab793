//! Retrieval-augmented answering over card policy documents.
//!
//! This module provides:
//! - `loader`: flattens per-card JSON files into retrievable `Document`s
//! - `index`: in-memory vector index with unscoped and card-scoped search
//! - `pipeline`: retrieval, context building and grounded answer synthesis

pub mod index;
pub mod loader;
pub mod pipeline;


pub use index::{Retriever, SearchHit, VectorIndex};
pub use loader::{Document, DocumentMetadata};
pub use pipeline::{QueryResponse, RagPipeline, SourceRef};
