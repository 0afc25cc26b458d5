//! Deterministic queue ranking.
//!
//! Priority is a plain sum of the user's preference scores over the item's
//! tags. Ties break on recency and then id, so the full order is total:
//! ranking the same rows twice yields byte-identical output.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::models::item::{Item, ItemRow};
use crate::models::review::ReviewStatus;
use crate::review;

/// One queue entry: the item with its computed priority for this user.
#[derive(Debug, Serialize)]
pub struct RankedItem {
    #[serde(flatten)]
    pub item: Item,
    pub priority: i64,
}

/// Sum of scores for the tags this user has an opinion on. Unknown tags
/// contribute nothing, as does an item with no tags yet.
pub fn priority_for(prefs: &HashMap<String, i64>, tags: &[String]) -> i64 {
    tags.iter().filter_map(|tag| prefs.get(tag)).sum()
}

/// Orders by priority desc, then collected_at desc, then id desc.
pub fn sort_scored(scored: &mut [(ItemRow, i64)]) {
    scored.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.0.collected_at.cmp(&a.0.collected_at))
            .then_with(|| b.0.id.cmp(&a.0.id))
    });
}

/// Ranks the user's unseen items and returns at most `limit` of them.
pub async fn rank(
    pool: &SqlitePool,
    user_id: &str,
    limit: usize,
) -> Result<Vec<RankedItem>, sqlx::Error> {
    let prefs = review::preferences_for(pool, user_id).await?;

    let rows = sqlx::query_as::<_, ItemRow>(
        "SELECT i.* FROM items i \
         JOIN user_items ui ON ui.item_id = i.id \
         WHERE ui.user_id = ? AND ui.status = ?",
    )
    .bind(user_id)
    .bind(ReviewStatus::Unseen.as_str())
    .fetch_all(pool)
    .await?;

    let mut scored: Vec<(ItemRow, i64)> = rows
        .into_iter()
        .map(|row| {
            let priority = priority_for(&prefs, &row.tag_list());
            (row, priority)
        })
        .collect();

    sort_scored(&mut scored);
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .map(|(row, priority)| RankedItem {
            item: Item::from(row),
            priority,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::{RawCandidate, Source};
    use crate::models::review::ReviewAction;
    use crate::store;
    use chrono::{TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    fn make_row(id: i64, collected_at_secs: i64) -> ItemRow {
        ItemRow {
            id,
            source: "hackernews".to_string(),
            external_id: id.to_string(),
            title: format!("Item {id}"),
            url: None,
            summary: None,
            tags: None,
            collected_at: Utc.timestamp_opt(collected_at_secs, 0).unwrap(),
        }
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_priority_sums_known_tags_only() {
        let mut prefs = HashMap::new();
        prefs.insert("ai".to_string(), 3);
        prefs.insert("rust".to_string(), -1);

        assert_eq!(priority_for(&prefs, &tags(&["ai", "rust"])), 2);
        assert_eq!(priority_for(&prefs, &tags(&["ai", "saas"])), 3);
        assert_eq!(priority_for(&prefs, &tags(&["web"])), 0);
        assert_eq!(priority_for(&prefs, &[]), 0);
        assert_eq!(priority_for(&HashMap::new(), &tags(&["ai"])), 0);
    }

    #[test]
    fn test_sort_breaks_ties_on_recency_then_id() {
        // Same priority: newer first. Same timestamp: higher id first.
        let mut scored = vec![
            (make_row(1, 100), 0),
            (make_row(2, 300), 0),
            (make_row(3, 200), 0),
            (make_row(4, 200), 0),
            (make_row(5, 100), 5),
        ];
        sort_scored(&mut scored);

        let order: Vec<i64> = scored.iter().map(|(row, _)| row.id).collect();
        assert_eq!(order, vec![5, 2, 4, 3, 1]);
    }

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

    async fn seed_item(pool: &SqlitePool, external_id: &str, item_tags: &[&str]) -> i64 {
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
        store::update_summary(pool, id, "summary", &tags(item_tags))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_liking_one_item_lifts_items_sharing_its_tags() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        let a = seed_item(&pool, "a", &["ai", "saas"]).await;
        let b = seed_item(&pool, "b", &["saas"]).await;
        let c = seed_item(&pool, "c", &["python"]).await;
        crate::review::sync_new_items(&pool, "u1").await.unwrap();

        crate::review::apply_feedback(&pool, "u1", a, ReviewAction::Like)
            .await
            .unwrap();

        let ranked = rank(&pool, "u1", 50).await.unwrap();
        let ids: Vec<i64> = ranked.iter().map(|r| r.item.id).collect();
        assert_eq!(ids, vec![b, c]);
        assert_eq!(ranked[0].priority, 1);
        assert_eq!(ranked[1].priority, 0);
    }

    #[tokio::test]
    async fn test_reviewed_items_leave_the_queue() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        let a = seed_item(&pool, "a", &[]).await;
        let b = seed_item(&pool, "b", &[]).await;
        crate::review::sync_new_items(&pool, "u1").await.unwrap();

        crate::review::apply_feedback(&pool, "u1", a, ReviewAction::Skip)
            .await
            .unwrap();

        let ranked = rank(&pool, "u1", 50).await.unwrap();
        let ids: Vec<i64> = ranked.iter().map(|r| r.item.id).collect();
        assert_eq!(ids, vec![b]);
    }

    #[tokio::test]
    async fn test_rank_is_reproducible() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        for n in 0..6 {
            seed_item(&pool, &n.to_string(), &["ai"]).await;
        }
        crate::review::sync_new_items(&pool, "u1").await.unwrap();

        let first = serde_json::to_string(&rank(&pool, "u1", 50).await.unwrap()).unwrap();
        let second = serde_json::to_string(&rank(&pool, "u1", 50).await.unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_rank_honors_limit() {
        let pool = test_pool().await;
        make_user(&pool, "u1").await;
        for n in 0..5 {
            seed_item(&pool, &n.to_string(), &[]).await;
        }
        crate::review::sync_new_items(&pool, "u1").await.unwrap();

        let ranked = rank(&pool, "u1", 2).await.unwrap();
        assert_eq!(ranked.len(), 2);
    }
}
