//! Configuration loading and provider credential resolution
//!
//! Bootstrap configuration comes from a TOML file that is allowed to be
//! missing. Resolution priority for every setting, highest first:
//! 1. Command-line argument (handled by the binary)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "feedback-intake";

/// Environment variables consulted for the sentiment classifier key, in priority order
pub const SENTIMENT_KEY_ENV: &[&str] = &["SENTIMENT_API_KEY", "API_KEY"];

/// Environment variables consulted for the category classifier key, in priority order
pub const CATEGORY_KEY_ENV: &[&str] = &["CATEGORY_API_KEY", "API_GPT_KEY"];

/// Environment variable overriding the category classifier base URL
pub const CATEGORY_URL_ENV: &str = "GPT_URL";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional in the file; absent values fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Path to SQLite database file
    pub database_path: Option<PathBuf>,

    /// Prefer the first `X-Forwarded-For` entry over the TCP peer address
    pub trust_forwarded_for: bool,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Upstream enrichment providers
    pub providers: ProvidersConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Settings for the three enrichment providers
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub sentiment: SentimentConfig,
    pub geolocation: GeolocationConfig,
    pub category: CategoryConfig,
}

/// Sentiment classifier endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Full URL of the analysis endpoint
    pub url: String,
    /// API key (environment takes precedence)
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            url: "https://api.apilayer.com/sentiment/analysis".to_string(),
            api_key: None,
            connect_timeout_secs: 5,
            timeout_secs: 10,
        }
    }
}

/// Geolocation lookup endpoint (no credentials required)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Base URL; the address is appended as the final path segment
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://ip-api.com/json".to_string(),
            connect_timeout_secs: 5,
            timeout_secs: 15,
        }
    }
}

/// Category classifier (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Base URL; `/chat/completions` is appended
    pub base_url: String,
    /// API key (environment takes precedence)
    pub api_key: Option<String>,
    /// Model name sent with every request
    pub model: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            connect_timeout_secs: 5,
            timeout_secs: 10,
        }
    }
}

macro_rules! timeouts {
    ($ty:ty) => {
        impl $ty {
            /// TCP connect timeout
            pub fn connect_timeout(&self) -> Duration {
                Duration::from_secs(self.connect_timeout_secs)
            }

            /// Total request timeout
            pub fn timeout(&self) -> Duration {
                Duration::from_secs(self.timeout_secs)
            }
        }
    };
}

timeouts!(SentimentConfig);
timeouts!(GeolocationConfig);
timeouts!(CategoryConfig);

impl TomlConfig {
    /// Load configuration from `path`
    ///
    /// A missing file is not an error: a warning is logged and defaults are
    /// returned. A file that exists but fails to parse is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: TomlConfig = toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            info!("Loaded configuration from {}", path.display());
            config
        } else {
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            TomlConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment overrides that have no CLI counterpart
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(CATEGORY_URL_ENV) {
            if !url.trim().is_empty() {
                self.providers.category.base_url = url.trim().to_string();
            }
        }
    }

    /// Database path from the file, else the platform default
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Default config file location (`<config_dir>/feedback-intake/config.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// Default database location (`<data_local_dir>/feedback-intake/feedback.db`)
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME).join("feedback.db"))
        .unwrap_or_else(|| PathBuf::from("feedback.db"))
}

// ============================================================================
// Credentials
// ============================================================================

/// API keys required by the enrichment providers
///
/// Both keys must be present before the service starts; a missing key is a
/// startup failure, never a per-request fallback.
#[derive(Clone)]
pub struct ProviderCredentials {
    pub sentiment_api_key: String,
    pub category_api_key: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("sentiment_api_key", &"<redacted>")
            .field("category_api_key", &"<redacted>")
            .finish()
    }
}

impl ProviderCredentials {
    /// Resolve both keys from environment then TOML
    pub fn resolve(providers: &ProvidersConfig) -> Result<Self> {
        let sentiment_api_key = resolve_api_key(
            "sentiment",
            SENTIMENT_KEY_ENV,
            providers.sentiment.api_key.as_deref(),
        )?;
        let category_api_key = resolve_api_key(
            "category",
            CATEGORY_KEY_ENV,
            providers.category.api_key.as_deref(),
        )?;

        Ok(Self {
            sentiment_api_key,
            category_api_key,
        })
    }
}

/// Resolve one provider API key
///
/// **Priority:** environment variables (in the given order) → TOML
pub fn resolve_api_key(provider: &str, env_vars: &[&str], toml_key: Option<&str>) -> Result<String> {
    let mut found: Vec<(String, String)> = Vec::new();

    for var in env_vars {
        if let Ok(key) = std::env::var(var) {
            if is_valid_key(&key) {
                found.push((format!("environment ({})", var), key));
            }
        }
    }

    if let Some(key) = toml_key {
        if is_valid_key(key) {
            found.push(("TOML".to_string(), key.to_string()));
        }
    }

    if found.len() > 1 {
        let sources: Vec<&str> = found.iter().map(|(source, _)| source.as_str()).collect();
        warn!(
            "{} API key found in multiple sources: {}. Using {}.",
            provider,
            sources.join(", "),
            sources[0]
        );
    }

    match found.into_iter().next() {
        Some((source, key)) => {
            info!("{} API key loaded from {}", provider, source);
            Ok(key.trim().to_string())
        }
        None => Err(Error::Config(format!(
            "{} API key not configured. Set {} or providers.{}.api_key in the TOML config",
            provider,
            env_vars.join(" or "),
            provider
        ))),
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
