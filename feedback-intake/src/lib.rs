//! feedback-intake library interface
//!
//! Complaint intake service: stores free-text feedback enriched with
//! sentiment, category and caller geolocation, and lets operators list and
//! close it.

pub mod api;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod intake;
pub mod logging;
pub mod providers;

pub use crate::enrichment::EnrichmentOrchestrator;
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool; each request checks out one connection
    pub db: SqlitePool,
    /// Enrichment fan-out over the three providers
    pub orchestrator: EnrichmentOrchestrator,
    /// Prefer `X-Forwarded-For` over the TCP peer address
    pub trust_forwarded_for: bool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, orchestrator: EnrichmentOrchestrator) -> Self {
        Self {
            db,
            orchestrator,
            trust_forwarded_for: false,
            startup_time: Utc::now(),
        }
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route(
            "/feedback",
            post(api::submit_feedback).get(api::list_feedback),
        )
        .route("/feedback/close/:feedback_id", post(api::close_feedback))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
