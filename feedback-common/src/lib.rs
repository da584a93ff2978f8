//! # Feedback Common Library
//!
//! Shared code for the feedback intake service:
//! - Error type and result alias
//! - Configuration loading and provider credential resolution
//! - SQLite initialization, migrations and domain models
//! - Time helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use db::models::{EnrichmentResult, FeedbackRecord, FeedbackStatus, GeoLocation};
pub use error::{Error, Result};
