//! Database models
//!
//! Domain view of the single `feedback_info` table. Geolocation is carried as
//! one optional composite so a record can never hold a partial location; it is
//! flattened to nullable columns only inside the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentiment stored when the classifier could not be consulted
pub const SENTIMENT_UNKNOWN: &str = "unknown";

/// Category stored when the classifier could not be consulted
pub const CATEGORY_OTHER: &str = "other";

/// Closed set of category labels offered to the category classifier
pub const CATEGORY_LABELS: [&str; 3] = ["technical", "payment", CATEGORY_OTHER];

/// Lifecycle status of a feedback record
///
/// Transitions only `Open` → `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Open,
    Closed,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Open => "open",
            FeedbackStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(FeedbackStatus::Open),
            "closed" => Ok(FeedbackStatus::Closed),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown feedback status: {}",
                other
            ))),
        }
    }
}

/// A fully-populated geolocation from one successful lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: String,
    pub region: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    /// Rebuild from nullable columns; any missing part yields `None`
    pub fn from_parts(
        country: Option<String>,
        region: Option<String>,
        city: Option<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Option<Self> {
        Some(Self {
            country: country?,
            region: region?,
            city: city?,
            latitude: latitude?,
            longitude: longitude?,
        })
    }
}

/// Merged output of the three enrichment providers
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    pub sentiment: String,
    pub category: String,
    pub geo: Option<GeoLocation>,
}

impl EnrichmentResult {
    /// Result with every field at its sentinel
    pub fn fallback() -> Self {
        Self {
            sentiment: SENTIMENT_UNKNOWN.to_string(),
            category: CATEGORY_OTHER.to_string(),
            geo: None,
        }
    }
}

impl Default for EnrichmentResult {
    fn default() -> Self {
        Self::fallback()
    }
}

/// A persisted feedback record
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub id: i64,
    pub text: String,
    pub status: FeedbackStatus,
    /// Creation time, seconds since the Unix epoch
    pub timestamp: i64,
    pub sentiment: String,
    pub category: String,
    /// Caller network address captured at submission
    pub ip: Option<String>,
    pub geo: Option<GeoLocation>,
}
