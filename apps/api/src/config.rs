use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Every knob has a default so a bare `cargo run` works against a local
/// SQLite file; the Anthropic key is optional (enrichment degrades to the
/// title fallback without it).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub hackernews_fetch_count: usize,
    pub reddit_fetch_count: usize,
    pub github_fetch_count: usize,
    pub devto_fetch_count: usize,
    pub producthunt_fetch_count: usize,
    pub tldr_fetch_count: usize,
    pub summarize_batch_limit: usize,
    pub request_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub free_collect_per_day: u32,
    pub free_summarize_per_day: u32,
    pub scheduler_enabled: bool,
    pub collect_interval_hours: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "trendsift.db".to_string()),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            port: env_parse("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            hackernews_fetch_count: env_parse("HACKERNEWS_FETCH_COUNT", 30)?,
            reddit_fetch_count: env_parse("REDDIT_FETCH_COUNT", 20)?,
            github_fetch_count: env_parse("GITHUB_FETCH_COUNT", 20)?,
            devto_fetch_count: env_parse("DEVTO_FETCH_COUNT", 20)?,
            producthunt_fetch_count: env_parse("PRODUCTHUNT_FETCH_COUNT", 20)?,
            tldr_fetch_count: env_parse("TLDR_FETCH_COUNT", 15)?,
            summarize_batch_limit: env_parse("SUMMARIZE_BATCH_LIMIT", 10)?,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 10)?,
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS", 30)?,
            free_collect_per_day: env_parse("FREE_COLLECT_PER_DAY", 3)?,
            free_summarize_per_day: env_parse("FREE_SUMMARIZE_PER_DAY", 10)?,
            scheduler_enabled: env_parse("SCHEDULER_ENABLED", true)?,
            collect_interval_hours: env_parse("COLLECT_INTERVAL_HOURS", 6)?,
        })
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
