//! Embedding providers for graph nodes and questions.
//!
//! Questions must be embedded by the same model that embedded the graph
//! nodes, otherwise nearest-neighbour search returns noise. The default is
//! `all-minilm` (all-MiniLM-L6-v2, 384 dimensions) served by Ollama.
//!
//! Nodes with no usable text still need a vector so they stop showing up as
//! unembedded. Blank texts therefore map to the zero vector and are never
//! sent to the model.

use std::future::Future;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// Converts node text and questions to vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single question.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding(format!("{} returned no vector", self.model_name())))
    }

    /// Embed many texts, one vector per text in input order.
    ///
    /// Blank texts yield a zero vector of [`EmbeddingProvider::dimensions`].
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Embed the non-blank entries of `texts` with `send` and zero-fill the rest.
///
/// `send` is skipped entirely when every text is blank.
pub(crate) async fn embed_non_blank<F, Fut>(
    texts: &[String],
    dims: usize,
    send: F,
) -> Result<Vec<Vec<f32>>, RagError>
where
    F: FnOnce(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<Vec<f32>>, RagError>>,
{
    let pending: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, _)| i)
        .collect();

    let mut vectors = vec![vec![0.0; dims]; texts.len()];
    if pending.len() < texts.len() {
        debug!(
            "{} of {} texts are blank, using zero vectors",
            texts.len() - pending.len(),
            texts.len()
        );
    }
    if pending.is_empty() {
        return Ok(vectors);
    }

    let inputs = pending.iter().map(|&i| texts[i].clone()).collect();
    let embedded = send(inputs).await?;
    if embedded.len() != pending.len() {
        return Err(RagError::Embedding(format!(
            "sent {} texts but received {} vectors",
            pending.len(),
            embedded.len()
        )));
    }
    check_dimensions(&embedded, dims)?;

    for (i, vector) in pending.into_iter().zip(embedded) {
        vectors[i] = vector;
    }
    Ok(vectors)
}

/// Reject vectors that would not fit the vector index.
fn check_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<(), RagError> {
    match vectors.iter().find(|v| v.len() != expected) {
        Some(v) => Err(RagError::Embedding(format!(
            "expected {expected}-dimensional embedding, got {}",
            v.len()
        ))),
        None => Ok(()),
    }
}

async fn error_body(response: reqwest::Response, backend: &str) -> RagError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    RagError::Embedding(format!("{backend} returned {status}: {body}"))
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

/// OpenAI `/embeddings` or any compatible endpoint.
///
/// `dimensions` is sent with every request so models such as
/// `text-embedding-3-small` shrink their output to the index size.
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAiProvider {
    pub fn new(
        api_key: String,
        model: String,
        endpoint: Option<String>,
        dims: Option<usize>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
            model,
            dims: dims.unwrap_or(384),
        }
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, RagError> {
        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input,
            dimensions: self.dims,
        };
        let response = self
            .client
            .post(format!("{}/embeddings", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_body(response, "OpenAI").await);
        }

        let body: OpenAiEmbeddingResponse = response.json().await?;
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        embed_non_blank(texts, self.dims, |input| self.request(input)).await
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Local Ollama server (`/api/embed`).
pub struct OllamaProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dims: usize,
}

impl OllamaProvider {
    pub fn new(model: String, endpoint: Option<String>, dims: Option<usize>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| "http://localhost:11434".to_string()),
            model,
            dims: dims.unwrap_or(384),
        }
    }

    async fn request(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, RagError> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            input,
        };
        let response = self
            .client
            .post(format!("{}/api/embed", self.endpoint))
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_body(response, "Ollama").await);
        }

        let body: OllamaEmbeddingResponse = response.json().await?;
        Ok(body.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        embed_non_blank(texts, self.dims, |input| self.request(input)).await
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_blank_texts_get_zero_vectors_and_are_not_sent() {
        let sent = Mutex::new(Vec::new());
        let input = texts(&["Add OAuth integration", "", "  \n", "Login crash"]);

        let vectors = embed_non_blank(&input, 2, |batch| {
            sent.lock().unwrap().extend(batch.clone());
            async move { Ok(batch.iter().map(|t| vec![t.len() as f32, 1.0]).collect()) }
        })
        .await
        .unwrap();

        assert_eq!(
            *sent.lock().unwrap(),
            texts(&["Add OAuth integration", "Login crash"])
        );
        assert_eq!(
            vectors,
            vec![vec![21.0, 1.0], vec![0.0, 0.0], vec![0.0, 0.0], vec![11.0, 1.0]]
        );
    }

    #[tokio::test]
    async fn test_all_blank_batch_makes_no_request() {
        let vectors = embed_non_blank(&texts(&["", " "]), 3, |_| async {
            Err(RagError::Embedding("should not be called".to_string()))
        })
        .await
        .unwrap();
        assert_eq!(vectors, vec![vec![0.0; 3], vec![0.0; 3]]);
    }

    #[tokio::test]
    async fn test_missing_vectors_are_an_error() {
        let err = embed_non_blank(&texts(&["a", "b"]), 2, |_| async {
            Ok(vec![vec![1.0, 0.0]])
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("sent 2 texts but received 1 vectors"));
    }

    #[tokio::test]
    async fn test_wrong_dimensions_are_an_error() {
        let err = embed_non_blank(&texts(&["a"]), 384, |_| async { Ok(vec![vec![0.0; 768]]) })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 384-dimensional embedding, got 768"));
    }

    #[test]
    fn test_openai_request_asks_for_index_dimensions() {
        let provider = OpenAiProvider::new(
            "sk-test".to_string(),
            "text-embedding-3-small".to_string(),
            None,
            None,
        );
        let request = OpenAiEmbeddingRequest {
            model: &provider.model,
            input: texts(&["who wrote it"]),
            dimensions: provider.dimensions(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["dimensions"], 384);
        assert_eq!(json["model"], "text-embedding-3-small");
    }

    #[test]
    fn test_ollama_defaults_match_minilm_index() {
        let provider = OllamaProvider::new("all-minilm".to_string(), None, None);
        assert_eq!(provider.dimensions(), 384);
        assert_eq!(provider.endpoint, "http://localhost:11434");
    }
}
