use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::config::Config;
use crate::extract::ExtractionError;

const USER_AGENT: &str = "card-ocr-api/1.0";

/// A multimodal model that answers one prompt about one image.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str, image_data_uri: &str) -> Result<String, ExtractionError>;
}

// ── OpenAI chat completions ──────────────────────────────────────────────────

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, ExtractionError> {
        let endpoint = config
            .base_url
            .join("chat/completions")
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        // No overall deadline: a slow model answer is waited on.
        let http = reqwest::ClientBuilder::new()
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, prompt: &str, image_data_uri: &str) -> Result<String, ExtractionError> {
        let body = request_body(&self.model, self.max_tokens, prompt, image_data_uri);

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ExtractionError::Request(format!("ConnectError: {}", e))
                } else {
                    ExtractionError::Request(format!("RequestError: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("failed to read error body: {}", e));
            return Err(ExtractionError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        first_message(completion)
    }
}

fn request_body(model: &str, max_tokens: u32, prompt: &str, image_data_uri: &str) -> Value {
    json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": prompt },
                { "type": "image_url", "image_url": { "url": image_data_uri } }
            ]
        }],
        "max_tokens": max_tokens
    })
}

fn first_message(completion: ChatCompletion) -> Result<String, ExtractionError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ExtractionError::EmptyCompletion)
}
