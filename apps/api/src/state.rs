use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::enrich::Summarizer;
use crate::sources::SourceAdapter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    /// Pluggable summarizer. ClaudeSummarizer when an API key is configured,
    /// DisabledSummarizer (title fallback) otherwise.
    pub summarizer: Arc<dyn Summarizer>,
    /// Source adapters in the order their outcomes appear in run reports.
    pub adapters: Vec<Arc<dyn SourceAdapter>>,
}
