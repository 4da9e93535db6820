use thiserror::Error;

use crate::llm::LlmError;

/// Errors that can occur during RAG operations.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Graph database error [{code}]: {message}")]
    Graph { code: String, message: String },

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// Build a graph error that did not come with a server status code.
    pub fn graph(message: impl Into<String>) -> Self {
        RagError::Graph {
            code: "Client.Unknown".to_string(),
            message: message.into(),
        }
    }

    /// Whether the graph server rejected a schema change because it already exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            RagError::Graph { code, message } => {
                code.ends_with("EquivalentSchemaRuleAlreadyExists")
                    || code.ends_with("IndexAlreadyExists")
                    || message.to_lowercase().contains("already exists")
            }
            _ => false,
        }
    }
}
