//! Tracing setup
//!
//! The subscriber is installed before the configuration file is read, so
//! messages from loading it are not lost. The configured level is applied
//! afterwards through a reload handle unless `RUST_LOG` is set.

use feedback_common::config::LoggingConfig;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Crates whose events are shown at the configured level
const LOG_TARGETS: &[&str] = &["feedback_intake", "feedback_common", "tower_http"];

/// Build the filter used when `RUST_LOG` is not set
pub fn filter_for_level(level: &str) -> EnvFilter {
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Handle to the installed filter
pub struct LogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogLevel {
    /// Switch to the level from the configuration file
    ///
    /// A `RUST_LOG` filter always wins and is left untouched.
    pub fn apply_configured(&self, logging: &LoggingConfig) -> Result<(), reload::Error> {
        if self.from_env {
            return Ok(());
        }
        self.handle.reload(filter_for_level(&logging.level))
    }
}

/// Install the global subscriber at the default level
pub fn init() -> LogLevel {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let initial = env_filter.unwrap_or_else(|| filter_for_level(&LoggingConfig::default().level));

    let (filter, handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    LogLevel { handle, from_env }
}
