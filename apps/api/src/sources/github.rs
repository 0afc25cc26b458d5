//! GitHub adapter over the repository search API.
//!
//! One general query for freshly created repos above a star floor, then one
//! query per curated topic. Topic queries run sequentially with a short
//! pause; unauthenticated search allows ten requests a minute and a 403 here
//! means that budget is spent, which degrades the batch instead of failing
//! the run.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{SourceAdapter, SourceUnavailable};
use crate::models::item::{RawCandidate, Source};

const SEARCH_URL: &str = "https://api.github.com/search/repositories";
const TOPICS: [&str; 6] = [
    "ai",
    "llm",
    "machine-learning",
    "developer-tools",
    "saas",
    "cli",
];
const GENERAL_STAR_FLOOR: u32 = 50;
const TOPIC_STAR_FLOOR: u32 = 10;
const PER_TOPIC_RESULTS: usize = 5;
const TOPIC_QUERY_PAUSE_MS: u64 = 500;
const DESCRIPTION_CLIP: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Clone, Deserialize)]
struct Repo {
    id: Option<u64>,
    full_name: Option<String>,
    html_url: Option<String>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u32,
}

pub struct GithubAdapter {
    client: Client,
    fetch_count: usize,
}

impl GithubAdapter {
    pub fn new(client: Client, fetch_count: usize) -> Self {
        Self {
            client,
            fetch_count,
        }
    }

    async fn search(&self, query: &str, per_page: usize) -> Result<Vec<Repo>, reqwest::Error> {
        let response = self
            .client
            .get(SEARCH_URL)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", query),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", &per_page.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<SearchResponse>().await?.items)
    }
}

/// Builds the display title: `full_name: description` with the description
/// clipped to keep titles scannable.
fn normalize_repo(repo: Repo) -> Result<RawCandidate, ()> {
    let (Some(id), Some(full_name)) = (repo.id, repo.full_name) else {
        return Err(());
    };
    let title = match repo.description {
        Some(description) if !description.is_empty() => {
            let clipped: String = description.chars().take(DESCRIPTION_CLIP).collect();
            format!("{full_name}: {clipped}")
        }
        _ => full_name,
    };
    Ok(RawCandidate {
        source: Source::Github,
        external_id: id.to_string(),
        title,
        url: repo.html_url,
    })
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    fn source(&self) -> Source {
        Source::Github
    }

    fn fetch_limit(&self) -> usize {
        self.fetch_count
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>, SourceUnavailable> {
        let week_ago = (Utc::now() - chrono::Duration::days(7)).format("%Y-%m-%d");
        let month_ago = (Utc::now() - chrono::Duration::days(30)).format("%Y-%m-%d");

        let mut repos: Vec<Repo> = Vec::new();
        let mut failures = 0usize;

        let general_query = format!("created:>{week_ago} stars:>{GENERAL_STAR_FLOOR}");
        match self.search(&general_query, (limit / 2).max(1)).await {
            Ok(mut found) => repos.append(&mut found),
            Err(e) => {
                warn!("GitHub: general search failed: {e}");
                failures += 1;
            }
        }

        for topic in TOPICS {
            tokio::time::sleep(Duration::from_millis(TOPIC_QUERY_PAUSE_MS)).await;
            let query = format!("topic:{topic} created:>{month_ago} stars:>{TOPIC_STAR_FLOOR}");
            match self.search(&query, PER_TOPIC_RESULTS).await {
                Ok(mut found) => repos.append(&mut found),
                Err(e) => {
                    warn!("GitHub: topic '{topic}' search failed: {e}");
                    failures += 1;
                }
            }
        }

        if failures == TOPICS.len() + 1 {
            return Err(SourceUnavailable::new(
                Source::Github,
                "all search queries failed",
            ));
        }

        // The general and topic queries overlap; keep the first sighting.
        let mut seen = HashSet::new();
        repos.retain(|repo| match repo.id {
            Some(id) => seen.insert(id),
            None => true,
        });
        repos.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));

        let mut candidates = Vec::new();
        let mut dropped = 0usize;
        for repo in repos {
            match normalize_repo(repo) {
                Ok(candidate) => candidates.push(candidate),
                Err(()) => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("GitHub: dropped {dropped} malformed records");
        }
        candidates.truncate(limit);
        debug!("GitHub: {} candidates", candidates.len());
        Ok(candidates)
    }
}
