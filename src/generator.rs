//! Text generation over the OpenAI chat-completions API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::compile::CompiledMessage;
use crate::config::OpenAiConfig;
use crate::errors::{AppError, AppResult};

/// Produces text from compiled chat messages
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[CompiledMessage]) -> AppResult<String>;
}

/// OpenAI chat-completions client
#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: SecretString,
    model: String,
    endpoint: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [CompiledMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGenerator {
    /// Create a client for the configured model
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, messages: &[CompiledMessage]) -> AppResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("chat completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "chat completion API error ({status}): {error_text}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("invalid chat completion response: {e}")))?;

        tracing::debug!(model = %self.model, choices = chat.choices.len(), "chat completion received");
        Ok(first_content(chat))
    }
}

/// Content of the first choice, or empty text when the model returned none
fn first_content(chat: ChatResponse) -> String {
    chat.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default()
}
