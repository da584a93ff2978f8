//! Submission pipeline
//!
//! One submission moves through
//! `received → enriching → merging → committed → responded`.
//! A malformed body ends in `rejected` before anything is written. After
//! `received` only store failures can stop the pipeline; provider failures
//! are already folded into sentinel values by the orchestrator.

use feedback_common::{time, FeedbackRecord};
use sqlx::SqliteConnection;
use std::fmt;
use std::net::IpAddr;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::feedback;
use crate::enrichment::EnrichmentOrchestrator;

/// Position of a submission in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Received,
    Enriching,
    Merging,
    Committed,
    Responded,
    Rejected,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionStage::Received => "received",
            SubmissionStage::Enriching => "enriching",
            SubmissionStage::Merging => "merging",
            SubmissionStage::Committed => "committed",
            SubmissionStage::Responded => "responded",
            SubmissionStage::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Store failure during a submission, tagged with the stage it hit
#[derive(Debug, Error)]
#[error("submission failed at stage {stage}: {source}")]
pub struct SubmissionError {
    pub stage: SubmissionStage,
    #[source]
    pub source: feedback_common::Error,
}

impl SubmissionError {
    fn at(stage: SubmissionStage) -> impl FnOnce(feedback_common::Error) -> Self {
        move |source| Self { stage, source }
    }
}

/// Create, enrich and publish one feedback record
///
/// The create write completes before enrichment starts, and the merge commit
/// completes before this returns.
pub async fn submit(
    conn: &mut SqliteConnection,
    orchestrator: &EnrichmentOrchestrator,
    text: &str,
    origin: Option<IpAddr>,
) -> Result<FeedbackRecord, SubmissionError> {
    let ip = origin.map(|addr| addr.to_string());
    let id = feedback::create(conn, text, ip.as_deref(), time::unix_now())
        .await
        .map_err(SubmissionError::at(SubmissionStage::Received))?;
    debug!(id, stage = %SubmissionStage::Received, "Feedback record created");

    debug!(id, stage = %SubmissionStage::Enriching, "Enriching feedback");
    let enrichment = orchestrator.enrich(text, origin).await;

    debug!(id, stage = %SubmissionStage::Merging, "Merging enrichment");
    let record = feedback::merge_enrichment(conn, id, &enrichment)
        .await
        .map_err(SubmissionError::at(SubmissionStage::Merging))?;

    info!(
        id,
        stage = %SubmissionStage::Committed,
        sentiment = %record.sentiment,
        category = %record.category,
        located = record.geo.is_some(),
        "Feedback committed"
    );

    Ok(record)
}
