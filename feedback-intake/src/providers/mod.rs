//! Enrichment provider clients
//!
//! Each upstream is reached through a trait so the orchestrator can be driven
//! by fakes in tests. Every call returns an explicit `ProviderResult`; callers
//! decide what a failure means, providers never substitute fallback values.

pub mod category;
pub mod geolocation;
pub mod sentiment;

pub use category::CategoryClient;
pub use geolocation::GeolocationClient;
pub use sentiment::SentimentClient;

use async_trait::async_trait;
use feedback_common::config::{ProviderCredentials, ProvidersConfig};
use feedback_common::{Error, GeoLocation};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("feedback-intake/", env!("CARGO_PKG_VERSION"));

/// Failure of a single provider call
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    /// Upstream answered but declined the request (e.g. a reserved address)
    #[error("lookup rejected: {0}")]
    Rejected(String),

    /// Provider task ended without producing a result
    #[error("provider task aborted: {0}")]
    Aborted(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::Status(status.as_u16())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

/// Result of one provider call
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Sentiment classifier: text → sentiment label
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn analyze(&self, text: &str) -> ProviderResult<String>;
}

/// Geolocation lookup: network address → full location
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn locate(&self, ip: IpAddr) -> ProviderResult<GeoLocation>;
}

/// Category classifier: text → one label from the closed category set
#[async_trait]
pub trait CategoryProvider: Send + Sync {
    async fn classify(&self, text: &str) -> ProviderResult<String>;
}

/// The three production clients, ready to hand to the orchestrator
pub struct ProviderSet {
    pub sentiment: Arc<dyn SentimentProvider>,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub category: Arc<dyn CategoryProvider>,
}

impl ProviderSet {
    /// Construct the HTTP clients from configuration and resolved credentials
    pub fn from_config(
        config: &ProvidersConfig,
        credentials: &ProviderCredentials,
    ) -> feedback_common::Result<Self> {
        Ok(Self {
            sentiment: Arc::new(SentimentClient::new(
                &config.sentiment,
                credentials.sentiment_api_key.clone(),
            )?),
            geolocation: Arc::new(GeolocationClient::new(&config.geolocation)?),
            category: Arc::new(CategoryClient::new(
                &config.category,
                credentials.category_api_key.clone(),
            )?),
        })
    }
}

/// Build a reqwest client with the provider's own timeout budget
pub(crate) fn http_client(
    connect_timeout: Duration,
    timeout: Duration,
) -> feedback_common::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))
}
