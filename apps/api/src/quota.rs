//! Per-user, per-calendar-day quota accounting.
//!
//! The check-then-increment is one conditional upsert statement, so within
//! this process the ceiling is exact without any lock. Two processes sharing
//! a database could in principle over-admit by one near the ceiling; that
//! bounded window is tolerated rather than serializing every check.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::models::user::Tier;

/// Action classes gated by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionClass {
    Collect,
    Summarize,
}

impl ActionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionClass::Collect => "collect",
            ActionClass::Summarize => "summarize",
        }
    }
}

/// Daily ceiling for one tier and action; `None` means no ceiling.
pub fn ceiling_for(config: &Config, tier: Tier, action: ActionClass) -> Option<u32> {
    match tier {
        Tier::Supporter => None,
        Tier::Free => Some(match action {
            ActionClass::Collect => config.free_collect_per_day,
            ActionClass::Summarize => config.free_summarize_per_day,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed { remaining: Option<u32> },
    Denied { retry_after: NaiveDate },
}

/// Admits or denies one gated action for `user_id` against today's counter.
pub async fn check_and_increment(
    pool: &SqlitePool,
    user_id: &str,
    action: ActionClass,
    ceiling: Option<u32>,
) -> Result<QuotaDecision, sqlx::Error> {
    check_and_increment_on(pool, user_id, action, ceiling, Local::now().date_naive()).await
}

/// Same as [`check_and_increment`] with the calendar day injected, so tests
/// can cross midnight without waiting for it.
pub async fn check_and_increment_on(
    pool: &SqlitePool,
    user_id: &str,
    action: ActionClass,
    ceiling: Option<u32>,
    day: NaiveDate,
) -> Result<QuotaDecision, sqlx::Error> {
    // No ceiling: nothing to account, nothing to deny.
    let Some(ceiling) = ceiling else {
        return Ok(QuotaDecision::Allowed { remaining: None });
    };

    let retry_after = day.succ_opt().unwrap_or(day);
    if ceiling == 0 {
        return Ok(QuotaDecision::Denied { retry_after });
    }

    let day_key = day.to_string();
    let result = sqlx::query(
        "INSERT INTO quota_counters (user_id, day, action, count) VALUES (?, ?, ?, 1) \
         ON CONFLICT(user_id, day, action) \
         DO UPDATE SET count = count + 1 WHERE quota_counters.count < ?",
    )
    .bind(user_id)
    .bind(&day_key)
    .bind(action.as_str())
    .bind(ceiling as i64)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(QuotaDecision::Denied { retry_after });
    }

    let used = used_on(pool, user_id, action, day).await?;
    let remaining = (ceiling as i64 - used).max(0) as u32;
    Ok(QuotaDecision::Allowed {
        remaining: Some(remaining),
    })
}

/// Today's count for one action class; absent rows read as zero.
pub async fn used_on(
    pool: &SqlitePool,
    user_id: &str,
    action: ActionClass,
    day: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(\
            (SELECT count FROM quota_counters WHERE user_id = ? AND day = ? AND action = ?), 0)",
    )
    .bind(user_id)
    .bind(day.to_string())
    .bind(action.as_str())
    .fetch_one(pool)
    .await
}
