mod config;
mod db;
mod enrich;
mod errors;
mod identity;
mod ingest;
mod llm_client;
mod models;
mod quota;
mod ranking;
mod review;
mod routes;
mod sources;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::enrich::{ClaudeSummarizer, DisabledSummarizer, Summarizer};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::sources::build_adapters;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (every knob has a default)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Crate name with hyphens, tracing target with underscores.
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{}={}", target, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Trendsift API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite and run migrations
    let db = create_pool(&config.database_path).await?;
    db::run_migrations(&db).await?;

    // Initialize the summarizer
    let summarizer: Arc<dyn Summarizer> = match config.anthropic_api_key.clone() {
        Some(key) => {
            let llm = LlmClient::new(key, Duration::from_secs(config.llm_timeout_secs));
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Arc::new(ClaudeSummarizer::new(llm))
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; summaries fall back to titles");
            Arc::new(DisabledSummarizer)
        }
    };

    // Initialize source adapters
    let adapters = build_adapters(&config);
    info!("{} source adapters configured", adapters.len());

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        summarizer,
        adapters,
    };

    // Scheduled ingestion runs alongside the API
    if config.scheduler_enabled {
        tokio::spawn(scheduled_runs(state.clone()));
        info!(
            "Scheduler enabled: ingestion every {}h",
            config.collect_interval_hours
        );
    }

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodic system-triggered ingestion. Not quota-gated: a scheduled run is
/// not attributable to any one user's allowance.
async fn scheduled_runs(state: AppState) {
    let period = Duration::from_secs(state.config.collect_interval_hours * 3600);
    let mut ticker = tokio::time::interval(period);
    // The first tick fires immediately; skip it so a restart loop cannot
    // hammer the upstreams.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let run = ingest::run(
            &state.db,
            &state.adapters,
            state.summarizer.as_ref(),
            state.config.summarize_batch_limit,
        )
        .await;
        match run {
            Ok(report) => info!(
                "Scheduled run: {} inserted, {} duplicates, {} summarized",
                report.inserted, report.skipped_duplicate, report.enrichment.summarized
            ),
            Err(e) => error!("Scheduled run failed: {e}"),
        }
    }
}
