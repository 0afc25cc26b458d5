//! Enrichment — best-effort AI summarization and tagging.
//!
//! Flow: items_missing_summary → summarize per item → update_summary.
//! Enrichment must never block an item from being reviewable: any failure of
//! the external call resolves to the title fallback, and the batch keeps
//! going. A "failed" count in the report means the fallback path was used,
//! not that anything aborted.

pub mod prompts;
pub mod tags;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::{LlmClient, LlmError};
use crate::store;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("summarization is disabled: no API key configured")]
    Disabled,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Raw summarization output before the vocabulary filter runs.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryDraft {
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The external summarization capability. Object-safe so the app can hold it
/// as `Arc<dyn Summarizer>` and tests can substitute a stub.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, title: &str, url: Option<&str>)
        -> Result<SummaryDraft, SummarizeError>;
}

/// Production summarizer backed by the Claude API.
pub struct ClaudeSummarizer {
    llm: LlmClient,
}

impl ClaudeSummarizer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Summarizer for ClaudeSummarizer {
    async fn summarize(
        &self,
        title: &str,
        url: Option<&str>,
    ) -> Result<SummaryDraft, SummarizeError> {
        let prompt = prompts::SUMMARIZE_PROMPT_TEMPLATE
            .replace("{title}", title)
            .replace("{url}", url.unwrap_or("(none)"));

        let draft: SummaryDraft = self
            .llm
            .call_json(&prompt, prompts::SUMMARIZE_SYSTEM)
            .await?;

        Ok(draft)
    }
}

/// Installed when no API key is configured. Every call fails fast, so every
/// item takes the title fallback and the pipeline stays usable end-to-end.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(
        &self,
        _title: &str,
        _url: Option<&str>,
    ) -> Result<SummaryDraft, SummarizeError> {
        Err(SummarizeError::Disabled)
    }
}

#[derive(Debug, Clone)]
pub struct EnrichedSummary {
    pub summary: String,
    pub tags: Vec<String>,
    pub fell_back: bool,
}

/// Summarizes one item. Never fails: tags are filtered to the closed
/// vocabulary on success, and any error resolves to the unmodified title
/// with no tags.
pub async fn summarize(summarizer: &dyn Summarizer, title: &str, url: Option<&str>) -> EnrichedSummary {
    match summarizer.summarize(title, url).await {
        Ok(draft) => EnrichedSummary {
            summary: draft.summary,
            tags: tags::filter_known_tags(draft.tags),
            fell_back: false,
        },
        Err(e) => {
            warn!("Summarization fell back to title for '{title}': {e}");
            EnrichedSummary {
                summary: title.to_string(),
                tags: Vec::new(),
                fell_back: true,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EnrichReport {
    pub total: usize,
    pub summarized: usize,
    pub failed: usize,
}

/// Drains up to `limit` items from the enrichment backlog. Each item gets a
/// summary written exactly once per pass (fallback or not), so a pass leaves
/// no touched item with a null summary.
pub async fn summarize_pending(
    pool: &SqlitePool,
    summarizer: &dyn Summarizer,
    limit: usize,
) -> Result<EnrichReport, sqlx::Error> {
    let pending = store::items_missing_summary(pool, limit).await?;
    let mut report = EnrichReport {
        total: pending.len(),
        ..Default::default()
    };

    for item in pending {
        let enriched = summarize(summarizer, &item.title, item.url.as_deref()).await;
        store::update_summary(pool, item.id, &enriched.summary, &enriched.tags).await?;
        if enriched.fell_back {
            report.failed += 1;
        } else {
            report.summarized += 1;
        }
    }

    info!(
        "Enrichment pass: {} pending, {} summarized, {} fell back",
        report.total, report.summarized, report.failed
    );
    Ok(report)
}
