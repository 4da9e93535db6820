//! # Language-model backends
//!
//! Answer generation is behind the [`LanguageModel`] trait. Two HTTP
//! backends are provided:
//!
//! - [`GeminiClient`]: Google Generative Language `generateContent`
//! - [`OpenAiChatClient`]: any OpenAI-compatible `chat/completions` endpoint
//!
//! Both return `Result<String, LlmError>`; callers never probe response
//! shapes themselves.

mod gemini;
mod openai;
mod prompt;

pub use gemini::{DEFAULT_GEMINI_ENDPOINT, GeminiClient};
pub use openai::OpenAiChatClient;
pub use prompt::{SYSTEM_INSTRUCTION, build_prompt};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key is missing or cannot be found.
    #[error("API key not found. Set {env_var} environment variable")]
    MissingApiKey { env_var: String },
    /// Network error communicating with the LLM API.
    #[error("Network error: {message}")]
    Network { message: String },
    /// LLM API returned an error status.
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },
    /// Response body did not have the expected shape.
    #[error("Parse error: {message}")]
    ParseError { message: String },
    /// The model answered with no text.
    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One earlier turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// Everything a backend needs to produce one answer.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system_instruction: Option<String>,
    pub history: Vec<ChatTurn>,
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}

/// Sampling parameters shared by all backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: 1024,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

/// A backend that turns a prompt into answer text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Model identifier, for display.
    fn model_name(&self) -> &str;
}

/// Truncate a response body for inclusion in error messages.
pub(crate) fn snippet(body: &str) -> &str {
    match body.char_indices().nth(500) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

fn map_network_error(e: reqwest::Error) -> LlmError {
    LlmError::Network {
        message: e.to_string(),
    }
}
