// src/ai.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{config::Config, error::AppError};

/// Outbound explanation generation. A trait seam so handlers stay
/// testable without a network.
#[async_trait]
pub trait ExplanationModel: Send + Sync {
    async fn explain(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError>;
}

/// Client for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiChatModel {
    /// Builds the client when AI_API_BASE and AI_API_KEY are configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AppError> {
        let (Some(base), Some(api_key)) = (&config.ai_api_base, &config.ai_api_key) else {
            return Ok(None);
        };

        let base = Url::parse(base)
            .map_err(|e| AppError::Configuration(format!("Invalid AI_API_BASE: {}", e)))?;
        let endpoint = base
            .join("chat/completions")
            .map_err(|e| AppError::Configuration(format!("Invalid AI_API_BASE: {}", e)))?;

        Ok(Some(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: api_key.clone(),
            model: config.ai_model.clone(),
        }))
    }
}

#[async_trait]
impl ExplanationModel for OpenAiChatModel {
    async fn explain(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("AI request failed: {:?}", e);
                AppError::InternalServerError(format!("AI request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!("AI endpoint returned {}: {}", status, text);
            return Err(AppError::InternalServerError(format!(
                "AI endpoint returned {}",
                status
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::InternalServerError(format!("Malformed AI response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::InternalServerError("AI response had no choices".to_string()))
    }
}

/// Stand-in used when no AI endpoint is configured; every call fails
/// with a configuration error and nothing leaves the process.
pub struct DisabledModel;

#[async_trait]
impl ExplanationModel for DisabledModel {
    async fn explain(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, AppError> {
        Err(AppError::Configuration(
            "AI explanation generation is not configured".to_string(),
        ))
    }
}
