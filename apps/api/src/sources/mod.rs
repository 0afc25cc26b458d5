//! Source adapters — one per external content system.
//!
//! Each adapter owns its upstream HTTP contract and reduces it to normalized
//! `RawCandidate`s. A single malformed upstream record is dropped and
//! counted, never fatal to the batch; only a total fetch failure surfaces as
//! `SourceUnavailable`, which the orchestrator treats as "zero candidates
//! from this source".

pub mod devto;
pub mod github;
pub mod hackernews;
pub mod producthunt;
pub mod reddit;
pub mod tldr;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::models::item::{RawCandidate, Source};

/// Total fetch failure for one source (network, timeout, non-2xx). Logged
/// and degraded by the caller, never user-visible.
#[derive(Debug)]
pub struct SourceUnavailable {
    pub source: Source,
    pub reason: String,
}

// Implemented by hand: thiserror treats a field named `source` as the error
// cause, but here it is the content source, not an underlying error.
impl std::fmt::Display for SourceUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} unavailable: {}", self.source, self.reason)
    }
}

impl std::error::Error for SourceUnavailable {}

impl SourceUnavailable {
    pub fn new(source: Source, reason: impl Into<String>) -> Self {
        Self {
            source,
            reason: reason.into(),
        }
    }

    pub fn from_http(source: Source, err: reqwest::Error) -> Self {
        Self::new(source, err.to_string())
    }
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter feeds.
    fn source(&self) -> Source;

    /// Configured per-run candidate bound for this source.
    fn fetch_limit(&self) -> usize;

    /// Fetches up to `limit` normalized candidates from the upstream system.
    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>, SourceUnavailable>;
}

/// Builds the full adapter set. The shared HTTP client carries the request
/// timeout and User-Agent for every upstream call.
pub fn build_adapters(config: &Config) -> Vec<Arc<dyn SourceAdapter>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(format!("trendsift/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to build HTTP client");

    vec![
        Arc::new(hackernews::HackerNewsAdapter::new(
            client.clone(),
            config.hackernews_fetch_count,
        )),
        Arc::new(reddit::RedditAdapter::new(
            client.clone(),
            config.reddit_fetch_count,
        )),
        Arc::new(github::GithubAdapter::new(
            client.clone(),
            config.github_fetch_count,
        )),
        Arc::new(devto::DevtoAdapter::new(
            client.clone(),
            config.devto_fetch_count,
        )),
        Arc::new(producthunt::ProductHuntAdapter::new(
            client.clone(),
            config.producthunt_fetch_count,
        )),
        Arc::new(tldr::TldrAdapter::new(client, config.tldr_fetch_count)),
    ]
}
