//! Ingestion runs — fetch, store, enrich, sync, in that order.
//!
//! The fetch phase runs every adapter concurrently and waits for all of them
//! before anything is written, so a slow source delays the run but a dead one
//! only shrinks it. Later phases always execute, even over an empty batch,
//! which keeps the enrichment backlog draining when every upstream is down.

pub mod handlers;

use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::enrich::{self, EnrichReport, Summarizer};
use crate::identity;
use crate::models::item::RawCandidate;
use crate::review;
use crate::sources::SourceAdapter;
use crate::store::{self, StoreOutcome};

/// Per-source fetch result, in adapter registration order.
#[derive(Debug, Serialize)]
pub struct SourceOutcome {
    pub source: String,
    pub status: String,
    pub fetched: usize,
    pub error: Option<String>,
}

/// Everything one ingestion run did.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub sources: Vec<SourceOutcome>,
    pub inserted: u64,
    pub skipped_duplicate: u64,
    pub enrichment: EnrichReport,
    pub synced_users: usize,
    pub new_state_rows: u64,
}

/// Runs one full ingestion pass. A failed source degrades to zero candidates
/// and an `unavailable` entry in the report; only a storage error aborts.
pub async fn run(
    pool: &SqlitePool,
    adapters: &[Arc<dyn SourceAdapter>],
    summarizer: &dyn Summarizer,
    enrich_limit: usize,
) -> Result<RunReport, sqlx::Error> {
    let mut set = JoinSet::new();
    for (idx, adapter) in adapters.iter().enumerate() {
        let adapter = Arc::clone(adapter);
        set.spawn(async move {
            let limit = adapter.fetch_limit();
            (idx, adapter.source(), adapter.fetch(limit).await)
        });
    }

    // Slots keyed by spawn index keep the report in registration order
    // regardless of completion order.
    let mut slots: Vec<Option<SourceOutcome>> = Vec::new();
    slots.resize_with(adapters.len(), || None);
    let mut candidates: Vec<RawCandidate> = Vec::new();

    while let Some(joined) = set.join_next().await {
        let Ok((idx, source, result)) = joined else {
            warn!("Source fetch task panicked");
            continue;
        };
        slots[idx] = Some(match result {
            Ok(batch) => {
                info!("Fetched {} candidates from {source}", batch.len());
                let fetched = batch.len();
                candidates.extend(batch);
                SourceOutcome {
                    source: source.as_str().to_string(),
                    status: "ok".to_string(),
                    fetched,
                    error: None,
                }
            }
            Err(e) => {
                warn!("{e}");
                SourceOutcome {
                    source: source.as_str().to_string(),
                    status: "unavailable".to_string(),
                    fetched: 0,
                    error: Some(e.reason),
                }
            }
        });
    }
    let sources: Vec<SourceOutcome> = slots.into_iter().flatten().collect();

    let StoreOutcome {
        inserted,
        skipped_duplicate,
    } = store::upsert_items(pool, &candidates).await?;

    let enrichment = enrich::summarize_pending(pool, summarizer, enrich_limit).await?;

    let user_ids = identity::all_user_ids(pool).await?;
    let mut new_state_rows = 0u64;
    for user_id in &user_ids {
        new_state_rows += review::sync_new_items(pool, user_id).await?;
    }

    info!(
        "Ingestion run: {} fetched, {} inserted, {} duplicates, {} state rows across {} users",
        candidates.len(),
        inserted,
        skipped_duplicate,
        new_state_rows,
        user_ids.len()
    );

    Ok(RunReport {
        sources,
        inserted,
        skipped_duplicate,
        enrichment,
        synced_users: user_ids.len(),
        new_state_rows,
    })
}
