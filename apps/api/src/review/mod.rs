//! Per-user review state and preference learning.
//!
//! Feedback is the only mutation path: one like/skip moves the (user, item)
//! row out of `unseen` exactly once and folds the item's tags into the
//! user's preference scores. Both writes happen in one transaction so a
//! crash cannot leave a reviewed item without its preference delta.

pub mod handlers;

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::item::{Item, ItemRow};
use crate::models::review::{ReviewAction, ReviewStatus, UserItemRow};

/// Ensures an `unseen` state row exists for every item this user has not met
/// yet. Idempotent; re-ingestion never resets an existing row. Returns the
/// number of rows created.
pub async fn sync_new_items(pool: &SqlitePool, user_id: &str) -> Result<u64, sqlx::Error> {
    // INSERT OR IGNORE sidesteps the SQLite quirk where an upsert clause on
    // an INSERT..SELECT needs a WHERE to parse.
    let result = sqlx::query(
        "INSERT OR IGNORE INTO user_items (user_id, item_id, status) \
         SELECT ?, id, ? FROM items",
    )
    .bind(user_id)
    .bind(ReviewStatus::Unseen.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Applies one explicit feedback action. Fails with `NotFound` when no state
/// row exists and with a conflict when the item was already reviewed; a
/// re-review would double-count preference deltas.
pub async fn apply_feedback(
    pool: &SqlitePool,
    user_id: &str,
    item_id: i64,
    action: ReviewAction,
) -> Result<Item, AppError> {
    let mut tx = pool.begin().await?;

    let state = sqlx::query_as::<_, UserItemRow>(
        "SELECT * FROM user_items WHERE user_id = ? AND item_id = ?",
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No review state for item {item_id}")))?;

    if state.status != ReviewStatus::Unseen.as_str() {
        return Err(AppError::Conflict(format!(
            "Item {item_id} was already reviewed ({})",
            state.status
        )));
    }

    let item = sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = ?")
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {item_id} not found")))?;

    let now = Utc::now();
    sqlx::query(
        "UPDATE user_items SET status = ?, reviewed_at = ? WHERE user_id = ? AND item_id = ?",
    )
    .bind(action.status().as_str())
    .bind(now)
    .bind(user_id)
    .bind(item_id)
    .execute(&mut *tx)
    .await?;

    for tag in item.tag_list() {
        sqlx::query(
            "INSERT INTO preferences (user_id, tag, score, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id, tag) DO UPDATE SET score = score + ?, updated_at = ?",
        )
        .bind(user_id)
        .bind(&tag)
        .bind(action.delta())
        .bind(now)
        .bind(action.delta())
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(Item::from(item))
}

/// The user's accumulated tag preferences as a score lookup.
pub async fn preferences_for(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<HashMap<String, i64>, sqlx::Error> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT tag, score FROM preferences WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().collect())
}

/// Preference rows sorted for display, strongest signal first.
pub async fn preferences_sorted(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as("SELECT tag, score FROM preferences WHERE user_id = ? ORDER BY score DESC, tag")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Reviewed items for one user, most recently reviewed first.
pub async fn reviewed_items(
    pool: &SqlitePool,
    user_id: &str,
    status: ReviewStatus,
) -> Result<Vec<Item>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ItemRow>(
        "SELECT i.* FROM items i \
         JOIN user_items ui ON ui.item_id = i.id \
         WHERE ui.user_id = ? AND ui.status = ? \
         ORDER BY ui.reviewed_at DESC, i.id DESC",
    )
    .bind(user_id)
    .bind(status.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Item::from).collect())
}

/// Review-state counts per status for one user.
pub async fn status_counts(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<HashMap<String, i64>, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM user_items WHERE user_id = ? GROUP BY status",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::{RawCandidate, Source};
    use crate::store;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn make_user(pool: &SqlitePool, id: &str) {
        sqlx::query("INSERT INTO users (id, tier, created_at, last_seen_at) VALUES (?, 'free', ?, ?)")
            .bind(id)
            .bind(Utc::now())
            .bind(Utc::now())
            .execute(pool)
            .await
            .unwrap();
    }

    /// Seeds one enriched item and returns its id.
    async fn seed_item(pool: &SqlitePool, external_id: &str, tags: &[&str]) -> i64 {
        store::upsert_items(
            pool,
            &[RawCandidate {
                source: Source::Hackernews,
                external_id: external_id.to_string(),
                title: format!("Item {external_id}"),
                url: None,
            }],
        )
        .await
        .unwrap();

        let id: i64 = sqlx::query_scalar("SELECT id FROM items WHERE external_id = ?")
            .bind(external_id)
            .fetch_one(pool)
            .await
            .unwrap();
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        store::update_summary(pool, id, "summary", &tags).await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_sync_is_idempotent() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        seed_item(&pool, "1", &[]).await;
        seed_item(&pool, "2", &[]).await;

        assert_eq!(sync_new_items(&pool, "u1").await.unwrap(), 2);
        assert_eq!(sync_new_items(&pool, "u1").await.unwrap(), 0);

        seed_item(&pool, "3", &[]).await;
        assert_eq!(sync_new_items(&pool, "u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_like_updates_status_and_preferences() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        let item_id = seed_item(&pool, "1", &["ai", "saas"]).await;
        sync_new_items(&pool, "u1").await.unwrap();

        apply_feedback(&pool, "u1", item_id, ReviewAction::Like)
            .await
            .unwrap();

        let state = sqlx::query_as::<_, UserItemRow>(
            "SELECT * FROM user_items WHERE user_id = 'u1' AND item_id = ?",
        )
        .bind(item_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(state.status, "liked");
        assert!(state.reviewed_at.is_some());

        let prefs = preferences_for(&pool, "u1").await.unwrap();
        assert_eq!(prefs.get("ai"), Some(&1));
        assert_eq!(prefs.get("saas"), Some(&1));
    }

    #[tokio::test]
    async fn test_skip_subtracts_preference() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        let item_id = seed_item(&pool, "1", &["rust"]).await;
        sync_new_items(&pool, "u1").await.unwrap();

        apply_feedback(&pool, "u1", item_id, ReviewAction::Skip)
            .await
            .unwrap();

        let prefs = preferences_for(&pool, "u1").await.unwrap();
        assert_eq!(prefs.get("rust"), Some(&-1));
    }

    #[tokio::test]
    async fn test_preference_scores_accumulate() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        let a = seed_item(&pool, "1", &["ai"]).await;
        let b = seed_item(&pool, "2", &["ai"]).await;
        let c = seed_item(&pool, "3", &["ai"]).await;
        sync_new_items(&pool, "u1").await.unwrap();

        apply_feedback(&pool, "u1", a, ReviewAction::Like).await.unwrap();
        apply_feedback(&pool, "u1", b, ReviewAction::Like).await.unwrap();
        apply_feedback(&pool, "u1", c, ReviewAction::Skip).await.unwrap();

        // likes minus skips: +1 +1 -1
        let prefs = preferences_for(&pool, "u1").await.unwrap();
        assert_eq!(prefs.get("ai"), Some(&1));
    }

    #[tokio::test]
    async fn test_feedback_without_state_row_is_not_found() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        let item_id = seed_item(&pool, "1", &[]).await;
        // No sync: the state row does not exist.

        let err = apply_feedback(&pool, "u1", item_id, ReviewAction::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_second_review_is_rejected_without_double_count() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        let item_id = seed_item(&pool, "1", &["ai"]).await;
        sync_new_items(&pool, "u1").await.unwrap();

        apply_feedback(&pool, "u1", item_id, ReviewAction::Like)
            .await
            .unwrap();
        let err = apply_feedback(&pool, "u1", item_id, ReviewAction::Skip)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        let prefs = preferences_for(&pool, "u1").await.unwrap();
        assert_eq!(prefs.get("ai"), Some(&1));
    }

    #[tokio::test]
    async fn test_feedback_is_isolated_per_user() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        make_user(&pool, "u2").await;
        let item_id = seed_item(&pool, "1", &["ai"]).await;
        sync_new_items(&pool, "u1").await.unwrap();
        sync_new_items(&pool, "u2").await.unwrap();

        apply_feedback(&pool, "u1", item_id, ReviewAction::Like)
            .await
            .unwrap();

        assert!(preferences_for(&pool, "u2").await.unwrap().is_empty());
        let counts = status_counts(&pool, "u2").await.unwrap();
        assert_eq!(counts.get("unseen"), Some(&1));
    }

    #[tokio::test]
    async fn test_reviewed_items_lists_by_status() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        let a = seed_item(&pool, "1", &[]).await;
        let b = seed_item(&pool, "2", &[]).await;
        sync_new_items(&pool, "u1").await.unwrap();

        apply_feedback(&pool, "u1", a, ReviewAction::Like).await.unwrap();
        apply_feedback(&pool, "u1", b, ReviewAction::Skip).await.unwrap();

        let liked = reviewed_items(&pool, "u1", ReviewStatus::Liked).await.unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].id, a);

        let skipped = reviewed_items(&pool, "u1", ReviewStatus::Skipped).await.unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].id, b);
    }
}
