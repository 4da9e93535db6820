use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{
    GenerationParams, GenerationRequest, LanguageModel, LlmError, Role, map_network_error, snippet,
};

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    params: GenerationParams,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: Option<String>,
        api_key_env: &str,
        model: String,
        endpoint: String,
        params: GenerationParams,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.ok_or_else(|| LlmError::MissingApiKey {
            env_var: api_key_env.to_string(),
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            api_key,
            params,
        })
    }

    fn build_request(&self, request: &GenerationRequest) -> OpenAIRequest {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        if let Some(instruction) = &request.system_instruction {
            messages.push(OpenAIMessage {
                role: "system",
                content: instruction.clone(),
            });
        }
        for turn in &request.history {
            messages.push(OpenAIMessage {
                role: match turn.role {
                    Role::User => "user",
                    Role::Model => "assistant",
                },
                content: turn.content.clone(),
            });
        }
        messages.push(OpenAIMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        OpenAIRequest {
            model: self.model.clone(),
            messages,
            temperature: self.params.temperature,
            max_tokens: self.params.max_output_tokens,
            top_p: self.params.top_p,
            stream: false,
        }
    }
}

fn extract_content(response: OpenAIResponse) -> Result<String, LlmError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::ParseError {
            message: "No response content in choices".to_string(),
        })?;
    if content.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content)
}

#[async_trait]
impl LanguageModel for OpenAiChatClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(map_network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LlmError::Network {
            message: format!("Failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAIErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| snippet(&body).to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OpenAIResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse chat response: {e}. Body: {}", snippet(&body)),
            })?;
        extract_content(parsed)
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

    fn client() -> OpenAiChatClient {
        OpenAiChatClient::new(
            Some("sk-test".to_string()),
            "OPENAI_API_KEY",
            "gpt-4o-mini".to_string(),
            "https://api.openai.com/v1/".to_string(),
            GenerationParams::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        assert_eq!(client().endpoint, "https://api.openai.com/v1");
    }

    #[test]
    fn test_request_messages() {
        let request = GenerationRequest::new("question")
            .with_system_instruction("rules")
            .with_history(vec![ChatTurn {
                role: Role::Model,
                content: "before".to_string(),
            }]);
        let body = serde_json::to_value(client().build_request(&request)).unwrap();
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "rules"},
                {"role": "assistant", "content": "before"},
                {"role": "user", "content": "question"}
            ])
        );
        assert_eq!(body["max_tokens"], json!(1024));
        assert_eq!(body["stream"], json!(false));
    }

    #[test]
    fn test_extract_content() {
        let response: OpenAIResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "@octocat did."}}]
        }))
        .unwrap();
        assert_eq!(extract_content(response).unwrap(), "@octocat did.");

        let response: OpenAIResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        assert!(matches!(
            extract_content(response),
            Err(LlmError::ParseError { .. })
        ));
    }
}
