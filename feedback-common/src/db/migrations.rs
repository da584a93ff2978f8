//! Database schema migrations
//!
//! Versioned, idempotent upgrades tracked in `schema_version`.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Check before altering** - every step must be safe to repeat

use crate::db::models::{CATEGORY_OTHER, SENTIMENT_UNKNOWN};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Columns added after the first deployment, which stored only
/// text, status, timestamp, sentiment and category
const V1_COLUMNS: &[(&str, &str)] = &[
    ("ip", "TEXT"),
    ("country", "TEXT"),
    ("region", "TEXT"),
    ("city", "TEXT"),
    ("latitude", "REAL"),
    ("longitude", "REAL"),
    ("enriched", "INTEGER NOT NULL DEFAULT 0"),
];

/// Get current schema version from database (0 if none recorded)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current = get_schema_version(pool).await?;

    if current < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    if current < CURRENT_SCHEMA_VERSION {
        info!(
            "Database schema migrated from v{} to v{}",
            current, CURRENT_SCHEMA_VERSION
        );
    }

    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Migration v1: geolocation group, origin address and visibility flag
///
/// Rows that predate the `enriched` column were written in a single step,
/// so they are marked visible.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let mut added_enriched = false;

    for (column, decl) in V1_COLUMNS {
        if !has_column(pool, "feedback_info", column).await? {
            let sql = format!("ALTER TABLE feedback_info ADD COLUMN {} {}", column, decl);
            sqlx::query(&sql).execute(pool).await?;
            info!("Migration v1: Added {} to feedback_info", column);
            added_enriched |= *column == "enriched";
        }
    }

    if added_enriched {
        let result = sqlx::query("UPDATE feedback_info SET enriched = 1")
            .execute(pool)
            .await?;
        info!(
            "Migration v1: Marked {} existing feedback rows as enriched",
            result.rows_affected()
        );
    }

    Ok(())
}

/// Migration v2: normalize values written by the first deployment
///
/// Timestamps were stored as fractional seconds (REAL); they are truncated
/// to whole Unix seconds. Missing sentiment or category become the sentinels.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let result = sqlx::query(
        "UPDATE feedback_info SET timestamp = CAST(timestamp AS INTEGER) \
         WHERE typeof(timestamp) = 'real'",
    )
    .execute(pool)
    .await?;
    if result.rows_affected() > 0 {
        info!(
            "Migration v2: Truncated {} fractional timestamps",
            result.rows_affected()
        );
    }

    sqlx::query("UPDATE feedback_info SET sentiment = ? WHERE sentiment IS NULL")
        .bind(SENTIMENT_UNKNOWN)
        .execute(pool)
        .await?;
    sqlx::query("UPDATE feedback_info SET category = ? WHERE category IS NULL")
        .bind(CATEGORY_OTHER)
        .execute(pool)
        .await?;

    Ok(())
}
