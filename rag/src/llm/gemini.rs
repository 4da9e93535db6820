use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{
    GenerationParams, GenerationRequest, LanguageModel, LlmError, Role, map_network_error, snippet,
};

/// Default Generative Language API base URL
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model acknowledgement placed after the system instruction turn.
const SYSTEM_ACK: &str = "I'll follow these instructions.";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Client for Gemini `generateContent`.
///
/// The API key travels as the `key` query parameter.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    params: GenerationParams,
}

impl GeminiClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `api_key` - Resolved API key; `None` is a configuration error
    /// * `api_key_env` - Variable the key was looked up in, for the error message
    /// * `model` - Model name (e.g., "gemini-2.0-flash")
    /// * `endpoint` - API base (defaults to [`DEFAULT_GEMINI_ENDPOINT`])
    pub fn new(
        api_key: Option<String>,
        api_key_env: &str,
        model: String,
        endpoint: Option<String>,
        params: GenerationParams,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.ok_or_else(|| LlmError::MissingApiKey {
            env_var: api_key_env.to_string(),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            api_key,
            params,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Ordered turns: system instruction + ack, history, then the prompt.
    fn build_payload(&self, request: &GenerationRequest) -> GenerateContentRequest {
        let mut contents = Vec::with_capacity(request.history.len() + 3);

        if let Some(instruction) = &request.system_instruction {
            contents.push(Content {
                role: "user",
                parts: vec![Part {
                    text: format!("System: {instruction}"),
                }],
            });
            contents.push(Content {
                role: "model",
                parts: vec![Part {
                    text: SYSTEM_ACK.to_string(),
                }],
            });
        }

        for turn in &request.history {
            contents.push(Content {
                role: match turn.role {
                    Role::User => "user",
                    Role::Model => "model",
                },
                parts: vec![Part {
                    text: turn.content.clone(),
                }],
            });
        }

        contents.push(Content {
            role: "user",
            parts: vec![Part {
                text: request.prompt.clone(),
            }],
        });

        GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: self.params.temperature,
                max_output_tokens: self.params.max_output_tokens,
                top_p: self.params.top_p,
                top_k: self.params.top_k,
            },
        }
    }
}

/// Concatenate all text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .ok_or_else(|| LlmError::ParseError {
            message: "Unable to parse response from Gemini API".to_string(),
        })?;

    let text: String = parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let payload = self.build_payload(request);
        debug!("Gemini request with {} turns", payload.contents.len());

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(map_network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::Network {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| snippet(&body).to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::ParseError {
                message: format!("{e}. Body: {}", snippet(&body)),
            })?;
        extract_text(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::ChatTurn;

    fn client() -> GeminiClient {
        GeminiClient::new(
            Some("test-key".to_string()),
            "GEMINI_API_KEY",
            "gemini-2.0-flash".to_string(),
            None,
            GenerationParams::default(),
        )
        .unwrap()
    }

    fn parse(value: serde_json::Value) -> Result<String, LlmError> {
        extract_text(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_missing_key_is_error() {
        let err = GeminiClient::new(
            None,
            "GEMINI_API_KEY",
            "gemini-2.0-flash".to_string(),
            None,
            GenerationParams::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err,
            LlmError::MissingApiKey { ref env_var } if env_var == "GEMINI_API_KEY"
        ));
    }

    #[test]
    fn test_url() {
        assert_eq!(
            client().url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_payload_turn_order_and_config() {
        let request = GenerationRequest::new("Who wrote the OAuth integration?")
            .with_system_instruction("Answer briefly.")
            .with_history(vec![ChatTurn {
                role: Role::Model,
                content: "Earlier answer".to_string(),
            }]);

        let payload = serde_json::to_value(client().build_payload(&request)).unwrap();
        assert_eq!(
            payload["contents"],
            json!([
                {"role": "user", "parts": [{"text": "System: Answer briefly."}]},
                {"role": "model", "parts": [{"text": "I'll follow these instructions."}]},
                {"role": "model", "parts": [{"text": "Earlier answer"}]},
                {"role": "user", "parts": [{"text": "Who wrote the OAuth integration?"}]}
            ])
        );
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], json!(1024));
        assert_eq!(payload["generationConfig"]["topK"], json!(40));
        assert!(payload["generationConfig"]["topP"].as_f64().unwrap() > 0.9);
    }

    #[test]
    fn test_payload_without_system_instruction() {
        let payload = client().build_payload(&GenerationRequest::new("hi"));
        assert_eq!(payload.contents.len(), 1);
        assert_eq!(payload.contents[0].role, "user");
    }

    #[test]
    fn test_extract_concatenates_parts() {
        let text = parse(json!({
            "candidates": [{
                "content": {"parts": [{"text": "@octocat wrote it. "}, {"text": "See PR #12."}]}
            }]
        }))
        .unwrap();
        assert_eq!(text, "@octocat wrote it. See PR #12.");
    }

    #[test]
    fn test_extract_without_candidates() {
        let err = parse(json!({"candidates": []})).unwrap_err();
        assert!(matches!(err, LlmError::ParseError { .. }));
    }

    #[test]
    fn test_extract_empty_text() {
        let err = parse(json!({"candidates": [{"content": {"parts": [{}]}}]})).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }
}
