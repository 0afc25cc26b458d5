//! Axum route handlers for the ingestion API.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Serialize;

use crate::enrich::{self, EnrichReport};
use crate::errors::AppError;
use crate::identity::{self, ResolvedIdentity};
use crate::ingest::{self, RunReport};
use crate::quota::{self, ActionClass, QuotaDecision};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CollectResponse {
    pub report: RunReport,
    /// Actions left today, absent for unmetered tiers.
    pub quota_remaining: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub report: EnrichReport,
    pub quota_remaining: Option<u32>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// Admits one gated action against the caller's daily ceiling, or fails with
/// the quota error the response layer turns into a 429.
async fn admit(
    state: &AppState,
    resolved: &ResolvedIdentity,
    action: ActionClass,
) -> Result<Option<u32>, AppError> {
    let ceiling = quota::ceiling_for(&state.config, resolved.user.tier(), action);
    match quota::check_and_increment(&state.db, resolved.token(), action, ceiling).await? {
        QuotaDecision::Allowed { remaining } => Ok(remaining),
        QuotaDecision::Denied { retry_after } => Err(AppError::QuotaExceeded {
            action: action.as_str(),
            retry_after,
        }),
    }
}

/// POST /api/v1/collect
///
/// Runs one full ingestion pass (fetch → store → enrich → sync) on behalf of
/// the calling user. Gated by the per-day collect quota.
pub async fn handle_collect(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = identity::token_from_headers(&headers);
    let resolved = identity::resolve(&state.db, token.as_deref()).await?;
    let quota_remaining = admit(&state, &resolved, ActionClass::Collect).await?;

    let report = ingest::run(
        &state.db,
        &state.adapters,
        state.summarizer.as_ref(),
        state.config.summarize_batch_limit,
    )
    .await?;

    Ok(identity::json_with_cookie(
        &resolved,
        CollectResponse {
            report,
            quota_remaining,
        },
    ))
}

/// POST /api/v1/summarize
///
/// Drains one batch from the enrichment backlog without fetching anything
/// new. Gated by the per-day summarize quota.
pub async fn handle_summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = identity::token_from_headers(&headers);
    let resolved = identity::resolve(&state.db, token.as_deref()).await?;
    let quota_remaining = admit(&state, &resolved, ActionClass::Summarize).await?;

    let report = enrich::summarize_pending(
        &state.db,
        state.summarizer.as_ref(),
        state.config.summarize_batch_limit,
    )
    .await?;

    Ok(identity::json_with_cookie(
        &resolved,
        SummarizeResponse {
            report,
            quota_remaining,
        },
    ))
}
