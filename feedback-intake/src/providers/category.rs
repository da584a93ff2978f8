//! Complaint category classifier (OpenAI-compatible chat completions)
//!
//! The model is instructed to answer with exactly one label from
//! [`CATEGORY_LABELS`]. Replies are normalized (trimmed, lower-cased, trailing
//! punctuation removed); anything outside the label set is treated as a
//! malformed reply.

use async_trait::async_trait;
use feedback_common::config::CategoryConfig;
use feedback_common::db::CATEGORY_LABELS;
use serde::{Deserialize, Serialize};

use super::{http_client, CategoryProvider, ProviderError, ProviderResult};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Instruction naming the closed label set
fn system_prompt() -> String {
    format!(
        "Classify the customer complaint into exactly one category. \
         Options: {}. Answer with the category name only, one word.",
        CATEGORY_LABELS.join(", ")
    )
}

/// Map a raw model reply onto the label set
pub fn normalize_label(raw: &str) -> Option<&'static str> {
    let cleaned = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_lowercase();

    CATEGORY_LABELS
        .iter()
        .copied()
        .find(|label| *label == cleaned)
}

impl ChatResponse {
    fn into_label(self) -> ProviderResult<String> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Malformed("reply has no content".to_string()))?;

        normalize_label(&content)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed(format!("unexpected category {:?}", content)))
    }
}

/// Category classifier client
pub struct CategoryClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl CategoryClient {
    pub fn new(config: &CategoryConfig, api_key: String) -> feedback_common::Result<Self> {
        Ok(Self {
            http_client: http_client(config.connect_timeout(), config.timeout())?,
            endpoint: format!(
                "{}/chat/completions",
                config.base_url.trim_end_matches('/')
            ),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl CategoryProvider for CategoryClient {
    async fn classify(&self, text: &str) -> ProviderResult<String> {
        let instruction = system_prompt();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &instruction,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
        };

        tracing::debug!(model = %self.model, "Querying category classifier");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        parsed.into_label()
    }
}
