//! Executive commentary via an Azure-OpenAI-style chat deployment.
//!
//! The client is a thin wrapper: the caller assembles a
//! [`CommentaryContext`](crate::service::CommentaryContext) and the model
//! is instructed to narrate only the numbers it was handed. Credentials
//! come from the environment at construction; nothing is embedded.

use crate::error::{CockpitError, Result};
use crate::service::CommentaryContext;
use log::{debug, info};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

const SYSTEM_PROMPT: &str = "You are a CFO's analyst writing a short executive commentary. \
Use only the figures provided in the context. Never invent or extrapolate numbers. \
Lead with the most material movement, then working capital, then cash outlook. \
Keep it under 200 words.";

/// Connection settings for the chat deployment.
#[derive(Debug, Clone)]
pub struct CommentaryConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

impl CommentaryConfig {
    /// Read the configuration from `AZURE_OPENAI_*` environment
    /// variables. Every variable is required; there are no defaults.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            endpoint: required_env("AZURE_OPENAI_ENDPOINT")?,
            api_key: required_env("AZURE_OPENAI_KEY")?,
            deployment: required_env("AZURE_OPENAI_DEPLOYMENT")?,
            api_version: required_env("AZURE_OPENAI_API_VERSION")?,
        })
    }

    fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CockpitError::Config(format!("{name} is not set"))),
    }
}

#[derive(Clone)]
pub struct CommentaryClient {
    client: Client,
    config: CommentaryConfig,
}

impl CommentaryClient {
    pub fn new(config: CommentaryConfig) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(CommentaryConfig::from_env()?)
    }

    /// Generate commentary for one context. Failures never disturb the
    /// metrics that produced the context.
    pub async fn generate(&self, context: &CommentaryContext) -> Result<String> {
        let url = self.config.chat_url();
        debug!("requesting commentary from {}", self.config.deployment);

        let body = json!({
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": context.to_string() },
            ],
            "temperature": 0.3,
            "max_tokens": 400,
        });

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CockpitError::Commentary(format!(
                "chat completion failed (status {status}): {error_text}"
            )));
        }

        let payload: serde_json::Value = response.json().await?;
        let text = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                CockpitError::Commentary("response missing message content".to_string())
            })?;

        info!("commentary generated ({} chars)", text.len());
        Ok(text.trim().to_string())
    }
}
