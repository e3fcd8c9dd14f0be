use crate::core::ai::{
    models::{AiConfig, AiMessage},
    AiError, AiProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::error::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Value shipped in sample configuration; treated the same as no key at all.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_OPENAI_API_KEY_HERE";

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, AiError> {
        if !is_usable_api_key(&api_key) {
            return Err(AiError::MissingApiKey);
        }

        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

pub fn is_usable_api_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != PLACEHOLDER_API_KEY
}

#[async_trait]
impl AiProvider for OpenAiClient {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/chat/completions", self.base_url);

        let payload = request_body(messages, config);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(format!("Completion API error: {} - {}", status, text).into());
        }

        let response_json: serde_json::Value = response.json().await?;
        first_choice_content(&response_json)
    }
}

fn request_body(messages: &[AiMessage], config: &AiConfig) -> serde_json::Value {
    json!({
        "model": config.model,
        "messages": messages,
    })
}

/// Extracts `choices[0].message.content` verbatim.
fn first_choice_content(
    response: &serde_json::Value,
) -> Result<String, Box<dyn Error + Send + Sync>> {
    let content = response["choices"][0]["message"]["content"]
        .as_str()
        .ok_or("Failed to parse response content")?
        .to_string();

    Ok(content)
}
