use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use matreq_core::config::LlmConfig;

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to constrain output to a single JSON object.
    pub json_object: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("llm api key is not configured")]
    MissingApiKey,
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm endpoint returned {status}")]
    UpstreamStatus { status: u16, body: String },
    #[error("llm response had no message content")]
    MissingContent,
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
}

/// Returns the assistant message content of a single chat completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Client for `/chat/completions` endpoints that speak the OpenAI wire format (Groq, OpenAI, vLLM).
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.expose_secret().trim().is_empty()),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

fn first_message_content(response: ChatCompletionResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::MissingContent)
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::MissingApiKey)?;

        let body = ChatCompletionBody {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_object.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                event_name = "llm.completion.upstream_error",
                status = status.as_u16(),
                model = %self.model,
                "llm endpoint rejected completion request"
            );
            return Err(LlmError::UpstreamStatus { status: status.as_u16(), body });
        }

        let payload: ChatCompletionResponse =
            response.json().await.map_err(|error| LlmError::Decode(error.to_string()))?;
        first_message_content(payload)
    }
}

#[cfg(test)]
mod tests {
    use matreq_core::config::AppConfig;

    use super::{
        first_message_content, ChatCompletionResponse, CompletionRequest, LlmClient, LlmError,
        OpenAiCompatibleClient,
    };

    fn decode(raw: &str) -> ChatCompletionResponse {
        serde_json::from_str(raw).expect("valid completion json")
    }

    #[test]
    fn extracts_first_choice_content() {
        let response =
            decode(r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#);
        assert_eq!(first_message_content(response), Ok("{\"a\":1}".to_string()));
    }

    #[test]
    fn missing_or_empty_content_is_reported() {
        assert_eq!(
            first_message_content(decode(r#"{"choices":[]}"#)),
            Err(LlmError::MissingContent)
        );
        assert_eq!(
            first_message_content(decode(r#"{"choices":[{"message":{"content":null}}]}"#)),
            Err(LlmError::MissingContent)
        );
        assert_eq!(first_message_content(decode(r#"{}"#)), Err(LlmError::MissingContent));
    }

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let mut config = AppConfig::default().llm;
        config.base_url = "https://api.groq.com/openai/v1/".to_string();
        let client = OpenAiCompatibleClient::from_config(&config).expect("client");

        assert_eq!(client.endpoint(), "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(client.model(), "llama-3.1-8b-instant");
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let config = AppConfig::default().llm;
        let client = OpenAiCompatibleClient::from_config(&config).expect("client");
        let request = CompletionRequest {
            system: "sys".to_string(),
            user: "user".to_string(),
            temperature: 0.3,
            max_tokens: 200,
            json_object: true,
        };

        assert_eq!(client.complete(&request).await, Err(LlmError::MissingApiKey));
    }
}
