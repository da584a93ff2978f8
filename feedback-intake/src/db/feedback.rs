//! Feedback record store
//!
//! Lifecycle of the `feedback_info` row:
//! 1. `create` inserts an open, unenriched row (invisible to readers)
//! 2. `merge_enrichment` attaches sentiment, category and location and makes it visible
//! 3. `close` moves it to `closed` (idempotent)
//!
//! `list` and `close` only ever see rows that completed step 2.

use feedback_common::{EnrichmentResult, Error, FeedbackRecord, FeedbackStatus, GeoLocation, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, QueryBuilder, Row, Sqlite, SqliteConnection};

use feedback_common::db::{CATEGORY_OTHER, SENTIMENT_UNKNOWN};

const SELECT_RECORD: &str = "SELECT id, text, status, timestamp, sentiment, category, ip, \
     country, region, city, latitude, longitude FROM feedback_info";

/// Optional filters for [`list`]
#[derive(Debug, Clone, Default)]
pub struct FeedbackFilter {
    /// Exact match on the stored status string
    pub status: Option<String>,
    /// Inclusive lower bound on the creation timestamp (Unix seconds)
    pub min_timestamp: Option<i64>,
}

/// Insert a new open record with sentinel enrichment; returns its id
pub async fn create(
    conn: &mut SqliteConnection,
    text: &str,
    ip: Option<&str>,
    timestamp: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO feedback_info (text, status, timestamp, sentiment, category, ip, enriched)
        VALUES (?, ?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(text)
    .bind(FeedbackStatus::Open.as_str())
    .bind(timestamp)
    .bind(SENTIMENT_UNKNOWN)
    .bind(CATEGORY_OTHER)
    .bind(ip)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Attach enrichment to a record and publish it
///
/// The location group is written as a unit: all five columns from one
/// lookup, or all five NULL.
pub async fn merge_enrichment(
    conn: &mut SqliteConnection,
    id: i64,
    enrichment: &EnrichmentResult,
) -> Result<FeedbackRecord> {
    let geo = enrichment.geo.as_ref();

    let mut tx = conn.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE feedback_info
        SET sentiment = ?, category = ?,
            country = ?, region = ?, city = ?, latitude = ?, longitude = ?,
            enriched = 1
        WHERE id = ?
        "#,
    )
    .bind(&enrichment.sentiment)
    .bind(&enrichment.category)
    .bind(geo.map(|g| g.country.as_str()))
    .bind(geo.map(|g| g.region.as_str()))
    .bind(geo.map(|g| g.city.as_str()))
    .bind(geo.map(|g| g.latitude))
    .bind(geo.map(|g| g.longitude))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("feedback {}", id)));
    }

    let record = fetch(&mut tx, id).await?;
    tx.commit().await?;

    Ok(record)
}

/// All published records matching `filter`, in insertion order
pub async fn list(conn: &mut SqliteConnection, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_RECORD);
    query.push(" WHERE enriched = 1");

    if let Some(status) = &filter.status {
        query.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(min_timestamp) = filter.min_timestamp {
        query.push(" AND timestamp >= ").push_bind(min_timestamp);
    }
    query.push(" ORDER BY id");

    let rows = query.build().fetch_all(&mut *conn).await?;

    rows.iter().map(record_from_row).collect()
}

/// Mark a published record closed; closing twice succeeds
pub async fn close(conn: &mut SqliteConnection, id: i64) -> Result<FeedbackRecord> {
    let mut tx = conn.begin().await?;

    let result = sqlx::query("UPDATE feedback_info SET status = ? WHERE id = ? AND enriched = 1")
        .bind(FeedbackStatus::Closed.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("feedback {}", id)));
    }

    let record = fetch(&mut tx, id).await?;
    tx.commit().await?;

    Ok(record)
}

async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<FeedbackRecord> {
    let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_RECORD))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("feedback {}", id)))?;

    record_from_row(&row)
}

fn record_from_row(row: &SqliteRow) -> Result<FeedbackRecord> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<FeedbackStatus>()
        .map_err(|e| Error::Internal(format!("Corrupt feedback row: {}", e)))?;

    let geo = GeoLocation::from_parts(
        row.try_get("country")?,
        row.try_get("region")?,
        row.try_get("city")?,
        row.try_get("latitude")?,
        row.try_get("longitude")?,
    );

    Ok(FeedbackRecord {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        status,
        timestamp: row.try_get("timestamp")?,
        sentiment: row.try_get("sentiment")?,
        category: row.try_get("category")?,
        ip: row.try_get("ip")?,
        geo,
    })
}
