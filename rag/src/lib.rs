//! askgraph-rag: retrieval-augmented question answering over a knowledge graph
//!
//! This crate answers natural-language questions from data stored in a Neo4j
//! graph, including:
//! - Node-type selection from phrase overrides and keyword scoring
//! - Lazy provisioning of per-type vector indexes
//! - Embedding generation via OpenAI/Ollama, and backfilling node embeddings
//! - Answer generation via Gemini or an OpenAI-compatible chat API
//!
//! # Example
//!
//! ```ignore
//! use askgraph_rag::{RagContext, RagSettings};
//!
//! let ctx = RagContext::connect(RagSettings::default(), session, embedder, llm).await?;
//! let answer = ctx.answer("Who wrote the OAuth integration?", None, None).await;
//! println!("{}", answer.answer);
//! ```

pub mod embeddings;
pub mod error;
pub mod graph;
pub mod index;
pub mod llm;
pub mod query;
pub mod retrieval;
pub mod routing;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::RagError;
pub use graph::{GraphSession, HttpGraphSession};
pub use index::{IndexProvisioner, VectorIndexSpec};
pub use query::{RagContext, RagSettings};
pub use routing::select_node_type;
pub use types::{
    Availability, DatabaseSnapshot, DebugCapture, NodeType, RagAnswer, RetrievedItem, Selection,
};
