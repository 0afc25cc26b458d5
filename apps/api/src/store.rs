//! Content store — the shared, deduplicated item table.
//!
//! Uniqueness of (source, external_id) is enforced by the DB constraint, not
//! by application-level locking, so concurrent upserts with overlapping
//! candidate sets are safe.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::models::item::{ItemRow, RawCandidate};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreOutcome {
    pub inserted: u64,
    pub skipped_duplicate: u64,
}

/// Inserts each candidate unless its (source, external_id) pair already
/// exists. A duplicate is a normal outcome, counted and skipped; the existing
/// row keeps the fields of the first successful insert.
pub async fn upsert_items(
    pool: &SqlitePool,
    candidates: &[RawCandidate],
) -> Result<StoreOutcome, sqlx::Error> {
    let mut outcome = StoreOutcome::default();

    for candidate in candidates {
        let result = sqlx::query(
            "INSERT INTO items (source, external_id, title, url, collected_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(source, external_id) DO NOTHING",
        )
        .bind(candidate.source.as_str())
        .bind(&candidate.external_id)
        .bind(&candidate.title)
        .bind(&candidate.url)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            outcome.skipped_duplicate += 1;
        } else {
            outcome.inserted += 1;
        }
    }

    Ok(outcome)
}

/// Items still awaiting enrichment, oldest-collected-first so the backlog
/// drains in arrival order.
pub async fn items_missing_summary(
    pool: &SqlitePool,
    limit: usize,
) -> Result<Vec<ItemRow>, sqlx::Error> {
    sqlx::query_as::<_, ItemRow>(
        "SELECT * FROM items WHERE summary IS NULL ORDER BY collected_at ASC, id ASC LIMIT ?",
    )
    .bind(limit as i64)
    .fetch_all(pool)
    .await
}

/// Writes summary and tags for one item. Idempotent; overwrites any prior
/// value. Returns false when the id does not exist.
pub async fn update_summary(
    pool: &SqlitePool,
    item_id: i64,
    summary: &str,
    tags: &[String],
) -> Result<bool, sqlx::Error> {
    let tags_json = serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string());

    let result = sqlx::query("UPDATE items SET summary = ?, tags = ? WHERE id = ?")
        .bind(summary)
        .bind(tags_json)
        .bind(item_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_item(pool: &SqlitePool, item_id: i64) -> Result<Option<ItemRow>, sqlx::Error> {
    sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = ?")
        .bind(item_id)
        .fetch_optional(pool)
        .await
}

pub async fn count_items(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM items")
        .fetch_one(pool)
        .await
}
