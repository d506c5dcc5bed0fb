//! `CompletionProvider` over an OpenAI-compatible chat-completions endpoint.
//!
//! The API key comes from `OPENAI_API_KEY` (a `.env` file is honoured). When it
//! is unset, requests go out without an `Authorization` header, which is what
//! local OpenAI-compatible servers expect.

use async_trait::async_trait;
use doc_sync_core::config::ProviderConfig;
use doc_sync_core::contract::{CompletionProvider, ConversationTurn, FinishReason, ProviderResponse};
use doc_sync_core::error::ProviderError;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::env;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiProvider {
    http: HttpClient,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig, api_key: Option<String>) -> Self {
        Self {
            http: HttpClient::new(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
        }
    }

    pub fn new_from_env(config: &ProviderConfig) -> Self {
        dotenvy::dotenv().ok();
        let api_key = env::var(API_KEY_VAR).ok().filter(|k| !k.is_empty());
        tracing::info!(
            endpoint = %config.base_url,
            model = %config.model,
            api_key_set = api_key.is_some(),
            "Initialised completion provider from environment"
        );
        Self::new(config, api_key)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        conversation: &[ConversationTurn],
    ) -> Result<ProviderResponse, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: conversation,
        };
        let mut req = self.http.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Completion request rejected");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_completion(&body)
    }
}

/// Extracts the first choice of a chat-completions response body.
pub fn parse_completion(body: &str) -> Result<ProviderResponse, ProviderError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("response has no choices".to_string()))?;
    let finish_reason = choice
        .finish_reason
        .ok_or_else(|| ProviderError::Malformed("choice has no finish_reason".to_string()))?;
    Ok(ProviderResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: FinishReason::from(finish_reason.as_str()),
    })
}
