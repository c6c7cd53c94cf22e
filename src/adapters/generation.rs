use crate::domain::model::GenerationRequest;
use crate::domain::ports::TextGenerator;
use crate::utils::error::{HandoutError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text generation over an OpenAI-compatible `/chat/completions` endpoint
/// (Groq by default). One attempt per call; failures are returned as-is.
pub struct ChatCompletionGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    client: Client,
}

impl ChatCompletionGenerator {
    /// Reads the key from `api_key_env`. A missing key only fails at generation time.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key_env = api_key_env.into();
        let api_key = std::env::var(&api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            api_key_env,
            client,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn failure(message: impl Into<String>) -> HandoutError {
        HandoutError::GenerationError {
            message: message.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| HandoutError::MissingCredential {
                variable: self.api_key_env.clone(),
            })?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %self.model, "Sending generation request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::failure(format!("request failed: {}", e)))?;

        let status = response.status();
        tracing::debug!("Generation response status: {}", status);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(Self::failure("authentication failed, check the API key"));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(Self::failure("rate limit or quota exceeded"));
            }
            s if !s.is_success() => {
                let detail = response.text().await.unwrap_or_default();
                tracing::warn!(status = s.as_u16(), body = %detail, "Generation API returned an error");
                return Err(Self::failure(format!("API returned status {}", s.as_u16())));
            }
            _ => {}
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("unreadable response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Self::failure("empty response"))
    }
}
