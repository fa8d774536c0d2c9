// OpenAI-compatible chat-completion client
//
// Works against any endpoint speaking the `/chat/completions` format
// (GitHub Models, Azure inference, OpenAI itself).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CompletionClient, Credentials};
use crate::config::constants::{
    DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, MAX_TOKENS, SYSTEM_PROMPT, TEMPERATURE,
};
use crate::errors::{PipelineError, Result};

/// Chat-completion client with fixed generation parameters
#[derive(Clone)]
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl ChatCompletionClient {
    /// Client for the default hosted endpoint and model
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS)
    }

    /// Client for a custom compatible endpoint
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|source| PipelineError::Transport { source })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            model: self.model.clone(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, prompt: &str, credentials: &Credentials) -> Result<String> {
        let request = self.build_request(prompt);

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credentials.token())
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|source| PipelineError::Transport { source })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            tracing::warn!("Completion request failed with status {}: {}", status, message);
            return Err(status_error(status, message));
        }

        let body = response
            .text()
            .await
            .map_err(|source| PipelineError::Transport { source })?;

        let chat: ChatResponse = serde_json::from_str(&body).map_err(|e| PipelineError::Service {
            status: Some(status.as_u16()),
            message: format!("Failed to decode completion response: {}", e),
        })?;

        tracing::debug!("Received {} completion choice(s)", chat.choices.len());

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Service {
                status: Some(status.as_u16()),
                message: "No response from API".to_string(),
            })?;

        choice.message.content.ok_or_else(|| PipelineError::Service {
            status: Some(status.as_u16()),
            message: "Completion choice carried no content".to_string(),
        })
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

/// Human-readable message from an error body, or a generic one
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("API request failed with status {}", status.as_u16()))
}

fn status_error(status: StatusCode, message: String) -> PipelineError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PipelineError::Auth {
            status: status.as_u16(),
            message,
        },
        _ => PipelineError::Service {
            status: Some(status.as_u16()),
            message,
        },
    }
}

// Wire types

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ChatCompletionClient::new().unwrap();
        assert_eq!(client.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(client.model(), DEFAULT_MODEL);
        assert_eq!(client.name(), "chat-completions");
    }

    #[test]
    fn test_request_shape() {
        let client = ChatCompletionClient::new().unwrap();
        let body = serde_json::to_value(client.build_request("hello")).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 4000);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_error_message_from_body() {
        let msg = error_message(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "Rate limit reached"}}"#,
        );
        assert_eq!(msg, "Rate limit reached");
    }

    #[test]
    fn test_error_message_fallback() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>"),
            "API request failed with status 502"
        );
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, "{}"),
            "API request failed with status 400"
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            PipelineError::Auth { status: 401, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            PipelineError::Auth { status: 403, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            PipelineError::Service {
                status: Some(500),
                ..
            }
        ));
    }
}
