//! Enrichment orchestrator
//!
//! Fans out to the sentiment classifier, geolocation lookup and category
//! classifier at once and merges their answers into one [`EnrichmentResult`].
//!
//! # Fallback policy
//! Each provider is settled on its own:
//! - sentiment failure → `"unknown"`
//! - category failure → `"other"`
//! - geolocation failure or non-success status → no location (all fields null)
//!
//! A failure, timeout or panic in one call never cancels or delays the other
//! two, and `enrich` itself cannot fail. Calls are spawned as independent
//! tasks, so they also run to completion if the request future is dropped.
//! No call is retried.

use feedback_common::db::{CATEGORY_OTHER, SENTIMENT_UNKNOWN};
use feedback_common::{EnrichmentResult, GeoLocation};
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::providers::{
    CategoryProvider, GeolocationProvider, ProviderError, ProviderResult, ProviderSet,
    SentimentProvider,
};

/// Upper bound on any single provider call, on top of the client's own timeouts
pub const DEFAULT_CALL_DEADLINE: Duration = Duration::from_secs(20);

/// Concurrent fan-out/fan-in over the three enrichment providers
#[derive(Clone)]
pub struct EnrichmentOrchestrator {
    sentiment: Arc<dyn SentimentProvider>,
    geolocation: Arc<dyn GeolocationProvider>,
    category: Arc<dyn CategoryProvider>,
    call_deadline: Duration,
}

impl EnrichmentOrchestrator {
    pub fn new(providers: ProviderSet) -> Self {
        Self {
            sentiment: providers.sentiment,
            geolocation: providers.geolocation,
            category: providers.category,
            call_deadline: DEFAULT_CALL_DEADLINE,
        }
    }

    /// Override the per-call deadline
    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = deadline;
        self
    }

    /// Run all three providers concurrently and merge the outcomes
    ///
    /// `origin` is the caller's address; without one the geolocation lookup
    /// is skipped and the location stays empty.
    pub async fn enrich(&self, text: &str, origin: Option<IpAddr>) -> EnrichmentResult {
        let text: Arc<str> = Arc::from(text);

        let sentiment_task = {
            let provider = Arc::clone(&self.sentiment);
            let text = Arc::clone(&text);
            tokio::spawn(bounded(self.call_deadline, async move {
                provider.analyze(&text).await
            }))
        };

        let category_task = {
            let provider = Arc::clone(&self.category);
            let text = Arc::clone(&text);
            tokio::spawn(bounded(self.call_deadline, async move {
                provider.classify(&text).await
            }))
        };

        let geo_task = origin.map(|ip| {
            let provider = Arc::clone(&self.geolocation);
            tokio::spawn(bounded(self.call_deadline, async move {
                provider.locate(ip).await
            }))
        });

        let (sentiment, category, geo) = tokio::join!(sentiment_task, category_task, async {
            match geo_task {
                Some(task) => Some(task.await),
                None => None,
            }
        });

        let geo: Option<GeoLocation> = match geo {
            Some(joined) => settle("geolocation", joined),
            None => {
                debug!("No origin address, skipping geolocation lookup");
                None
            }
        };

        EnrichmentResult {
            sentiment: settle("sentiment", sentiment)
                .unwrap_or_else(|| SENTIMENT_UNKNOWN.to_string()),
            category: settle("category", category).unwrap_or_else(|| CATEGORY_OTHER.to_string()),
            geo,
        }
    }
}

/// Apply the orchestrator deadline to one provider call
async fn bounded<T, F>(deadline: Duration, call: F) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(ProviderError::Timeout))
}

/// Reduce a joined provider task to its value, logging any failure
fn settle<T>(provider: &'static str, joined: Result<ProviderResult<T>, JoinError>) -> Option<T> {
    let outcome = joined.unwrap_or_else(|e| Err(ProviderError::Aborted(e.to_string())));

    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(provider, error = %e, "Enrichment provider failed, using fallback");
            None
        }
    }
}
