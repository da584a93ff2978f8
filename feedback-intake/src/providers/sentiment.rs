//! Sentiment analysis API client
//!
//! `POST <url>` with header `apikey` and body `{"body": <text>}`; a 200 reply
//! carries `{"sentiment": <label>}`.

use async_trait::async_trait;
use feedback_common::config::SentimentConfig;
use serde::{Deserialize, Serialize};

use super::{http_client, ProviderError, ProviderResult, SentimentProvider};

#[derive(Debug, Serialize)]
struct SentimentRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SentimentResponse {
    sentiment: Option<String>,
}

impl SentimentResponse {
    fn into_label(self) -> ProviderResult<String> {
        match self.sentiment {
            Some(label) if !label.trim().is_empty() => Ok(label.trim().to_string()),
            _ => Err(ProviderError::Malformed(
                "response has no sentiment label".to_string(),
            )),
        }
    }
}

/// Sentiment API client
pub struct SentimentClient {
    http_client: reqwest::Client,
    url: String,
    api_key: String,
}

impl SentimentClient {
    pub fn new(config: &SentimentConfig, api_key: String) -> feedback_common::Result<Self> {
        Ok(Self {
            http_client: http_client(config.connect_timeout(), config.timeout())?,
            url: config.url.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl SentimentProvider for SentimentClient {
    async fn analyze(&self, text: &str) -> ProviderResult<String> {
        tracing::debug!(chars = text.chars().count(), "Querying sentiment API");

        let response = self
            .http_client
            .post(&self.url)
            .header("apikey", &self.api_key)
            .json(&SentimentRequest { body: text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let parsed: SentimentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        parsed.into_label()
    }
}
