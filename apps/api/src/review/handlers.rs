//! Axum route handlers for the review API.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::identity;
use crate::models::item::Item;
use crate::models::review::{ReviewAction, ReviewStatus};
use crate::quota::{self, ActionClass};
use crate::ranking::{self, RankedItem};
use crate::review;
use crate::state::AppState;
use crate::store;

const DEFAULT_QUEUE_LIMIT: usize = 20;
const MAX_QUEUE_LIMIT: usize = 100;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueueParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub count: usize,
    pub items: Vec<RankedItem>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub action: ReviewAction,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub item_id: i64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ReviewedParams {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewedResponse {
    pub status: String,
    pub count: usize,
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize)]
pub struct TagScore {
    pub tag: String,
    pub score: i64,
}

#[derive(Debug, Serialize)]
pub struct QuotaStatus {
    pub action: String,
    pub used: i64,
    /// Absent for unmetered tiers.
    pub ceiling: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub user_id: String,
    pub tier: String,
    pub total_items: i64,
    pub unseen: i64,
    pub liked: i64,
    pub skipped: i64,
    pub preferences: Vec<TagScore>,
    pub quota: Vec<QuotaStatus>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/queue
///
/// The personalized review queue: unseen items ranked by tag preference.
/// Syncs state rows first, so a brand-new identity sees the whole backlog.
pub async fn handle_queue(
    State(state): State<AppState>,
    Query(params): Query<QueueParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_QUEUE_LIMIT)
        .min(MAX_QUEUE_LIMIT);

    let token = identity::token_from_headers(&headers);
    let resolved = identity::resolve(&state.db, token.as_deref()).await?;
    review::sync_new_items(&state.db, resolved.token()).await?;

    let items = ranking::rank(&state.db, resolved.token(), limit).await?;

    Ok(identity::json_with_cookie(
        &resolved,
        QueueResponse {
            count: items.len(),
            items,
        },
    ))
}

/// POST /api/v1/review/:item_id
///
/// Applies one like/skip. An item the user has never been queued is a 404;
/// an already-reviewed item is a 409.
pub async fn handle_review(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<ReviewRequest>,
) -> Result<Response, AppError> {
    let token = identity::token_from_headers(&headers);
    let resolved = identity::resolve(&state.db, token.as_deref()).await?;

    let item = review::apply_feedback(&state.db, resolved.token(), item_id, request.action).await?;

    Ok(identity::json_with_cookie(
        &resolved,
        ReviewResponse {
            item_id: item.id,
            status: request.action.status().as_str().to_string(),
        },
    ))
}

/// GET /api/v1/reviewed
///
/// Items the user already reviewed, filtered by `?status=liked|skipped`
/// (default liked), most recently reviewed first.
pub async fn handle_reviewed(
    State(state): State<AppState>,
    Query(params): Query<ReviewedParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let status = match params.status.as_deref() {
        None => ReviewStatus::Liked,
        Some(raw) => match ReviewStatus::parse(raw) {
            Some(ReviewStatus::Unseen) | None => {
                return Err(AppError::Validation(
                    "status must be 'liked' or 'skipped'".to_string(),
                ))
            }
            Some(status) => status,
        },
    };

    let token = identity::token_from_headers(&headers);
    let resolved = identity::resolve(&state.db, token.as_deref()).await?;

    let items = review::reviewed_items(&state.db, resolved.token(), status).await?;

    Ok(identity::json_with_cookie(
        &resolved,
        ReviewedResponse {
            status: status.as_str().to_string(),
            count: items.len(),
            items,
        },
    ))
}

/// GET /api/v1/items/:id
///
/// One stored item, shared across users; no identity involved.
pub async fn handle_get_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<Item>, AppError> {
    let row = store::get_item(&state.db, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item {item_id} not found")))?;

    Ok(Json(Item::from(row)))
}

/// GET /api/v1/stats
///
/// The stats view: review-state counts, learned preferences strongest-first,
/// and today's quota usage per gated action.
pub async fn handle_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = identity::token_from_headers(&headers);
    let resolved = identity::resolve(&state.db, token.as_deref()).await?;
    review::sync_new_items(&state.db, resolved.token()).await?;

    let total_items = store::count_items(&state.db).await?;
    let counts = review::status_counts(&state.db, resolved.token()).await?;
    let preferences = review::preferences_sorted(&state.db, resolved.token())
        .await?
        .into_iter()
        .map(|(tag, score)| TagScore { tag, score })
        .collect();

    let today = Local::now().date_naive();
    let mut quota_status = Vec::new();
    for action in [ActionClass::Collect, ActionClass::Summarize] {
        let used = quota::used_on(&state.db, resolved.token(), action, today).await?;
        quota_status.push(QuotaStatus {
            action: action.as_str().to_string(),
            used,
            ceiling: quota::ceiling_for(&state.config, resolved.user.tier(), action),
        });
    }

    let count_for = |status: ReviewStatus| counts.get(status.as_str()).copied().unwrap_or(0);
    let response = StatsResponse {
        user_id: resolved.user.id.clone(),
        tier: resolved.user.tier.clone(),
        total_items,
        unseen: count_for(ReviewStatus::Unseen),
        liked: count_for(ReviewStatus::Liked),
        skipped: count_for(ReviewStatus::Skipped),
        preferences,
        quota: quota_status,
    };

    Ok(identity::json_with_cookie(&resolved, response))
}
