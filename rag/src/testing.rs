//! In-memory collaborators for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::embeddings::EmbeddingProvider;
use crate::embeddings::provider::embed_non_blank;
use crate::error::RagError;
use crate::graph::{GraphSession, Row};
use crate::llm::{GenerationRequest, LanguageModel, LlmError};

type Handler = Box<dyn Fn(&str, &serde_json::Value) -> Result<Vec<Row>, RagError> + Send + Sync>;

/// Answers statements with a handler and records everything it was sent.
pub struct FakeSession {
    handler: Handler,
    pub statements: Mutex<Vec<(String, serde_json::Value)>>,
    pub closed: Mutex<bool>,
}

impl FakeSession {
    pub fn new(
        handler: impl Fn(&str, &serde_json::Value) -> Result<Vec<Row>, RagError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            statements: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap()
            .iter()
            .map(|(s, _)| s.clone())
            .collect()
    }
}

#[async_trait]
impl GraphSession for FakeSession {
    async fn run(&self, statement: &str, params: serde_json::Value) -> Result<Vec<Row>, RagError> {
        self.statements
            .lock()
            .unwrap()
            .push((statement.to_string(), params.clone()));
        (self.handler)(statement, &params)
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

/// Build a row from `(column, value)` pairs.
pub fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Returns the same 3-dimensional vector for every non-blank text.
pub struct FixedEmbedder;

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        embed_non_blank(texts, 3, |input| async move {
            Ok(input.iter().map(|_| vec![0.5, 0.25, 0.0]).collect())
        })
        .await
    }

    fn dimensions(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

/// Replies with a canned result and keeps every request it received.
pub struct ScriptedModel {
    reply: Box<dyn Fn() -> Result<String, LlmError> + Send + Sync>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn answering(text: &str) -> Self {
        let text = text.to_string();
        Self {
            reply: Box::new(move || Ok(text.clone())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            reply: Box::new(move || {
                Err(LlmError::ApiError {
                    status,
                    message: "backend unavailable".to_string(),
                })
            }),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.reply)()
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
