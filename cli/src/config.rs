//! # Configuration Management
//!
//! This module handles loading and saving CLI configuration: graph database
//! connection, embedding provider, language model and retrieval settings.
//!
//! ## Configuration File Location
//!
//! `$XDG_CONFIG_HOME/askgraph/config.json`, or `$HOME/.config/askgraph/config.json`
//! when `XDG_CONFIG_HOME` is not set. On Windows `%USERPROFILE%` stands in for `$HOME`.
//!
//! A missing file is not an error: every section falls back to its defaults.
//!
//! ## Environment Overrides
//!
//! Graph connection settings can be overridden with `ASKGRAPH_NEO4J_URI`,
//! `ASKGRAPH_NEO4J_USER`, `ASKGRAPH_NEO4J_PASSWORD` and `ASKGRAPH_NEO4J_DATABASE`.

use anyhow::{Context, Result};
use askgraph_rag::llm::{DEFAULT_GEMINI_ENDPOINT, GenerationParams};
use askgraph_rag::{RagSettings, VectorIndexSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const URI_ENV_VAR: &str = "ASKGRAPH_NEO4J_URI";
const USER_ENV_VAR: &str = "ASKGRAPH_NEO4J_USER";
const PASSWORD_ENV_VAR: &str = "ASKGRAPH_NEO4J_PASSWORD";
const DATABASE_ENV_VAR: &str = "ASKGRAPH_NEO4J_DATABASE";

/// Graph database connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// HTTP endpoint of the database server
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
        }
    }
}

/// Embedding provider used for query vectors
///
/// Must match the model that produced the stored node embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Provider (ollama, openai)
    pub provider: String,
    /// API endpoint URL (provider default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub model: String,
    pub dimensions: usize,
    /// Node property holding stored embeddings
    pub property: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: Some("http://localhost:11434".to_string()),
            model: "all-minilm".to_string(),
            dimensions: 384,
            property: "embedding".to_string(),
            api_key: None,
            api_key_env: None,
        }
    }
}

impl EmbeddingsConfig {
    pub fn get_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        resolve_key(self.api_key_env.as_deref(), self.api_key.as_ref(), lookup)
    }
}

/// Language model used to write answers
///
/// # Supported Providers
///
/// - `gemini`: Google Gemini `generateContent` API
/// - `openai`: any OpenAI-compatible `chat/completions` endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider (gemini, openai)
    pub provider: String,
    /// API endpoint URL
    pub endpoint: String,
    /// Model name (e.g., gemini-2.0-flash, gpt-4o)
    pub model: String,
    /// API key (plaintext)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key (preferred over api_key)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            provider: "gemini".to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            api_key_env: Some("GEMINI_API_KEY".to_string()),
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
            top_p: params.top_p,
            top_k: params.top_k,
        }
    }
}

impl LlmConfig {
    /// Create an OpenAI-compatible configuration
    pub fn openai(endpoint: &str, model: &str) -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            ..Self::default()
        }
    }

    /// Get the API key from the process environment or config
    pub fn get_api_key(&self) -> Option<String> {
        self.get_api_key_with(|var| std::env::var(var).ok())
    }

    /// Get the API key, reading environment variables through `lookup`
    pub fn get_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        resolve_key(self.api_key_env.as_deref(), self.api_key.as_ref(), lookup)
    }

    /// Name of the variable the key is expected in, for error messages
    pub fn key_env_name(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or("api_key")
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            top_p: self.top_p,
            top_k: self.top_k,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nodes retrieved per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 500 }
    }
}

/// CLI configuration
///
/// # Example
///
/// ```rust,no_run
/// use askgraph::config::Config;
///
/// let config = Config::load().expect("Failed to load config");
/// println!("{}", config.graph.uri);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph: GraphConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Load configuration from the default config file, then apply
    /// environment overrides.
    ///
    /// Returns defaults when no config file exists.
    pub fn load() -> Result<Self> {
        let env = |var: &str| std::env::var(var).ok();
        let path = config_path_with(env)?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides(env);
        Ok(config)
    }

    /// Load configuration from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the default config file
    ///
    /// Returns the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path_with(|var| std::env::var(var).ok())?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Override graph connection settings from environment variables
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets = [
            (URI_ENV_VAR, &mut self.graph.uri),
            (USER_ENV_VAR, &mut self.graph.user),
            (PASSWORD_ENV_VAR, &mut self.graph.password),
            (DATABASE_ENV_VAR, &mut self.graph.database),
        ];
        for (var, target) in targets {
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                *target = value;
            }
        }
    }

    /// Settings for the RAG context derived from this configuration
    pub fn rag_settings(&self) -> RagSettings {
        RagSettings {
            index: VectorIndexSpec {
                property: self.embeddings.property.clone(),
                dimensions: self.embeddings.dimensions,
                ..VectorIndexSpec::default()
            },
            default_top_k: self.retrieval.top_k,
        }
    }
}

/// Get the path to the configuration file
pub fn config_path() -> Result<PathBuf> {
    config_path_with(|var| std::env::var(var).ok())
}

fn config_path_with(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    let config_dir = config_dir_with(lookup).context("Could not determine config directory")?;
    Ok(config_dir.join("askgraph").join("config.json"))
}

fn config_dir_with(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    lookup("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            lookup("HOME")
                .or_else(|| lookup("USERPROFILE"))
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

fn resolve_key(
    env_var: Option<&str>,
    stored: Option<&String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    // First try environment variable
    if let Some(key) = env_var.and_then(|var| lookup(var)).filter(|k| !k.is_empty()) {
        return Some(key);
    }
    stored.cloned()
}

/// Mask a secret for display: first and last four characters only
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
