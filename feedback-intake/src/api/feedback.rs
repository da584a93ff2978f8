//! Feedback endpoints
//!
//! - `POST /feedback` submit and enrich a complaint
//! - `GET /feedback?status=&timestamp=` list published records
//! - `POST /feedback/close/:feedback_id` close a record

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        ConnectInfo, Path, Query, State,
    },
    http::HeaderMap,
    Json,
};
use feedback_common::{FeedbackRecord, FeedbackStatus, GeoLocation};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, info, warn};

use crate::db::{feedback, FeedbackFilter};
use crate::error::{ApiError, ApiResult};
use crate::intake::{self, SubmissionStage};
use crate::AppState;

/// POST /feedback request body
#[derive(Debug, Deserialize)]
pub struct FeedbackSubmission {
    pub text: String,
}

/// Query parameters for GET /feedback
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Exact-match status filter
    pub status: Option<String>,
    /// Inclusive lower bound on creation time (Unix seconds)
    pub timestamp: Option<i64>,
}

/// Flattened geolocation group; all five fields are null together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoFields {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<Option<&GeoLocation>> for GeoFields {
    fn from(geo: Option<&GeoLocation>) -> Self {
        Self {
            country: geo.map(|g| g.country.clone()),
            region: geo.map(|g| g.region.clone()),
            city: geo.map(|g| g.city.clone()),
            latitude: geo.map(|g| g.latitude),
            longitude: geo.map(|g| g.longitude),
        }
    }
}

/// Response to a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAnswer {
    pub id: i64,
    pub status: FeedbackStatus,
    pub sentiment: String,
    pub category: String,
    pub ip: Option<String>,
    #[serde(flatten)]
    pub geo: GeoFields,
}

impl From<&FeedbackRecord> for FeedbackAnswer {
    fn from(record: &FeedbackRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            sentiment: record.sentiment.clone(),
            category: record.category.clone(),
            ip: record.ip.clone(),
            geo: record.geo.as_ref().into(),
        }
    }
}

/// Full record as returned by listing and close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackView {
    pub id: i64,
    pub text: String,
    pub status: FeedbackStatus,
    pub timestamp: i64,
    pub sentiment: String,
    pub category: String,
    pub ip: Option<String>,
    #[serde(flatten)]
    pub geo: GeoFields,
}

impl From<FeedbackRecord> for FeedbackView {
    fn from(record: FeedbackRecord) -> Self {
        let geo = record.geo.as_ref().into();
        Self {
            id: record.id,
            text: record.text,
            status: record.status,
            timestamp: record.timestamp,
            sentiment: record.sentiment,
            category: record.category,
            ip: record.ip,
            geo,
        }
    }
}

/// Determine the caller's address
///
/// With `trust_forwarded_for`, the first parseable `X-Forwarded-For` entry
/// wins; otherwise the TCP peer address is used.
pub fn client_address(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> Option<IpAddr> {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }

    peer.map(|addr| addr.ip())
}

/// POST /feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> ApiResult<Json<FeedbackAnswer>> {
    let Json(submission) = payload.map_err(|rejection| {
        warn!(stage = %SubmissionStage::Rejected, error = %rejection, "Feedback rejected");
        ApiError::Unprocessable(rejection.body_text())
    })?;

    let origin = client_address(
        &headers,
        peer.map(|ConnectInfo(addr)| addr),
        state.trust_forwarded_for,
    );

    let mut conn = state.db.acquire().await?;
    let record = intake::submit(&mut conn, &state.orchestrator, &submission.text, origin).await?;

    debug!(id = record.id, stage = %SubmissionStage::Responded, "Responding to submission");
    Ok(Json(FeedbackAnswer::from(&record)))
}

/// GET /feedback
pub async fn list_feedback(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<FeedbackView>>> {
    let Query(query) = query.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;

    let filter = FeedbackFilter {
        status: query.status,
        min_timestamp: query.timestamp,
    };

    let mut conn = state.db.acquire().await?;
    let records = feedback::list(&mut conn, &filter).await?;

    debug!(count = records.len(), ?filter, "Listed feedback");
    Ok(Json(records.into_iter().map(FeedbackView::from).collect()))
}

/// POST /feedback/close/:feedback_id
pub async fn close_feedback(
    State(state): State<AppState>,
    feedback_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<FeedbackView>> {
    let Path(feedback_id) =
        feedback_id.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;

    let mut conn = state.db.acquire().await?;
    let record = feedback::close(&mut conn, feedback_id).await.map_err(|e| match e {
        feedback_common::Error::NotFound(what) => ApiError::NotFound(what),
        other => ApiError::Common(other),
    })?;

    info!(id = record.id, "Feedback closed");
    Ok(Json(FeedbackView::from(record)))
}
