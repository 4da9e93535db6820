//! # Backend Construction
//!
//! Builds the graph session, embedding provider and language model named by
//! the configuration, and connects them into a [`RagContext`].

use std::sync::Arc;

use askgraph_rag::embeddings::{EmbeddingProvider, OllamaProvider, OpenAiProvider};
use askgraph_rag::llm::{GeminiClient, LanguageModel, LlmError, OpenAiChatClient};
use askgraph_rag::{HttpGraphSession, RagContext, RagError};

use crate::config::{Config, EmbeddingsConfig, GraphConfig, LlmConfig};
use crate::errors::{display_config_error, display_error};
use crate::exit_codes::*;

/// Open an HTTP session against the configured database
pub fn build_session(graph: &GraphConfig) -> Arc<HttpGraphSession> {
    Arc::new(HttpGraphSession::new(
        &graph.uri,
        &graph.database,
        graph.user.clone(),
        graph.password.clone(),
    ))
}

/// Build the embedding provider named in the configuration
pub fn build_embedder(
    config: &EmbeddingsConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn EmbeddingProvider>, RagError> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            config.model.clone(),
            config.endpoint.clone(),
            Some(config.dimensions),
        ))),
        "openai" => {
            let api_key = config.get_api_key_with(lookup).ok_or_else(|| {
                RagError::Config(format!(
                    "embedding API key not found. Set {} environment variable",
                    config.api_key_env.as_deref().unwrap_or("api_key")
                ))
            })?;
            Ok(Arc::new(OpenAiProvider::new(
                api_key,
                config.model.clone(),
                config.endpoint.clone(),
                Some(config.dimensions),
            )))
        }
        other => Err(RagError::Config(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

/// Build the language model named in the configuration
///
/// A missing API key is reported as [`LlmError::MissingApiKey`].
pub fn build_llm(
    config: &LlmConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn LanguageModel>, RagError> {
    let api_key = config.get_api_key_with(lookup);
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(
            api_key,
            config.key_env_name(),
            config.model.clone(),
            Some(config.endpoint.clone()),
            config.params(),
        )?)),
        "openai" => Ok(Arc::new(OpenAiChatClient::new(
            api_key,
            config.key_env_name(),
            config.model.clone(),
            config.endpoint.clone(),
            config.params(),
        )?)),
        other => Err(RagError::Config(format!("unknown LLM provider: {other}"))),
    }
}

/// Build every collaborator and probe the database
///
/// The language model is built first so a missing API key fails before any
/// network traffic.
pub async fn connect(config: &Config) -> Result<RagContext, RagError> {
    let env = |var: &str| std::env::var(var).ok();
    let llm = build_llm(&config.llm, env)?;
    let embedder = build_embedder(&config.embeddings, env)?;
    let session = build_session(&config.graph);
    log::debug!("Connecting to {}", session.commit_url());
    RagContext::connect(config.rag_settings(), session, embedder, llm).await
}

/// Exit code for a failure to set up the context
pub fn setup_exit_code(error: &RagError) -> i32 {
    match error {
        RagError::Config(_) | RagError::Llm(LlmError::MissingApiKey { .. }) => EXIT_CONFIG_ERROR,
        _ => EXIT_ERROR,
    }
}

/// Print a setup failure and return the matching exit code
pub fn report_setup_error(error: &RagError) -> i32 {
    let code = setup_exit_code(error);
    if code == EXIT_CONFIG_ERROR {
        display_config_error(&error.to_string());
    } else {
        display_error(&error.to_string());
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn gemini_key(var: &str) -> Option<String> {
        (var == "GEMINI_API_KEY").then(|| "test-key".to_string())
    }

    #[test]
    fn test_missing_gemini_key_is_config_error() {
        let err = build_llm(&LlmConfig::default(), no_env).err().unwrap();
        assert!(matches!(
            err,
            RagError::Llm(LlmError::MissingApiKey { ref env_var }) if env_var == "GEMINI_API_KEY"
        ));
        assert_eq!(setup_exit_code(&err), EXIT_CONFIG_ERROR);
    }

    #[test]
    fn test_builds_gemini_client() {
        let llm = build_llm(&LlmConfig::default(), gemini_key).unwrap();
        assert_eq!(llm.model_name(), "gemini-2.0-flash");
    }

    #[test]
    fn test_builds_openai_client_with_stored_key() {
        let mut config = LlmConfig::openai("http://localhost:8080/v1", "gpt-4o");
        config.api_key = Some("stored".to_string());
        let llm = build_llm(&config, no_env).unwrap();
        assert_eq!(llm.model_name(), "gpt-4o");
    }

    #[test]
    fn test_unknown_llm_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..LlmConfig::default()
        };
        let err = build_llm(&config, gemini_key).err().unwrap();
        assert!(matches!(err, RagError::Config(_)));
        assert_eq!(setup_exit_code(&err), EXIT_CONFIG_ERROR);
    }

    #[test]
    fn test_builds_ollama_embedder() {
        let embedder = build_embedder(&EmbeddingsConfig::default(), no_env).unwrap();
        assert_eq!(embedder.dimensions(), 384);
        assert_eq!(embedder.model_name(), "all-minilm");
    }

    #[test]
    fn test_openai_embedder_requires_key() {
        let config = EmbeddingsConfig {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            ..EmbeddingsConfig::default()
        };
        assert!(build_embedder(&config, no_env).is_err());

        let embedder =
            build_embedder(&config, |_| Some("sk-test".to_string())).unwrap();
        assert_eq!(embedder.dimensions(), 384);
    }

    #[test]
    fn test_network_failures_are_general_errors() {
        let err = RagError::graph("connection refused");
        assert_eq!(setup_exit_code(&err), EXIT_ERROR);
    }
}
