//! Embedding providers and the node embedding backfill.
//!
//! Supports OpenAI-compatible APIs and Ollama. The same provider embeds graph
//! nodes through [`EmbeddingBackfill`] and questions at query time.

mod backfill;
pub(crate) mod provider;

pub use backfill::{BackfillReport, DEFAULT_BATCH_SIZE, EmbeddingBackfill, text_for_embedding};
pub use provider::{EmbeddingProvider, OllamaProvider, OpenAiProvider};
