//! Hacker News adapter, backed by the public Firebase API.
//!
//! Two-step contract: `topstories.json` lists ids, then one `item/<id>.json`
//! call per story. Item fetches run concurrently under a semaphore so a big
//! limit cannot flood the upstream.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{SourceAdapter, SourceUnavailable};
use crate::models::item::{RawCandidate, Source};

const TOP_STORIES_URL: &str = "https://hacker-news.firebaseio.com/v0/topstories.json";
const ITEM_URL: &str = "https://hacker-news.firebaseio.com/v0/item";
const MAX_CONCURRENT_ITEM_FETCHES: usize = 10;

#[derive(Debug, Clone, Deserialize)]
struct HnStory {
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    // Absent for Ask HN / text posts.
    url: Option<String>,
}

pub struct HackerNewsAdapter {
    client: Client,
    fetch_count: usize,
}

impl HackerNewsAdapter {
    pub fn new(client: Client, fetch_count: usize) -> Self {
        Self {
            client,
            fetch_count,
        }
    }

    /// Per-item failures are tolerated: the story is simply absent from the
    /// batch.
    async fn fetch_story(client: &Client, id: u64) -> Option<HnStory> {
        let url = format!("{ITEM_URL}/{id}.json");
        let response = match client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("HN item {id} fetch failed: {e}");
                return None;
            }
        };
        match response.error_for_status() {
            // The API returns `null` for dead items, hence Option in Option.
            Ok(r) => r.json::<Option<HnStory>>().await.ok().flatten(),
            Err(e) => {
                debug!("HN item {id} returned an error status: {e}");
                None
            }
        }
    }
}

/// Keeps only real stories with a title. A missing title is a malformed
/// record; a non-story type (job, poll) is an expected filter.
fn normalize_story(id: u64, story: HnStory) -> Result<Option<RawCandidate>, ()> {
    if story.kind.as_deref() != Some("story") {
        return Ok(None);
    }
    let Some(title) = story.title else {
        return Err(());
    };
    Ok(Some(RawCandidate {
        source: Source::Hackernews,
        external_id: id.to_string(),
        title,
        url: story.url,
    }))
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    fn source(&self) -> Source {
        Source::Hackernews
    }

    fn fetch_limit(&self) -> usize {
        self.fetch_count
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>, SourceUnavailable> {
        let ids: Vec<u64> = self
            .client
            .get(TOP_STORIES_URL)
            .send()
            .await
            .map_err(|e| SourceUnavailable::from_http(Source::Hackernews, e))?
            .error_for_status()
            .map_err(|e| SourceUnavailable::from_http(Source::Hackernews, e))?
            .json()
            .await
            .map_err(|e| SourceUnavailable::from_http(Source::Hackernews, e))?;

        let ids: Vec<u64> = ids.into_iter().take(limit).collect();
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_ITEM_FETCHES));
        let mut set = JoinSet::new();

        for (index, id) in ids.iter().copied().enumerate() {
            let client = self.client.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Self::fetch_story(&client, id).await.map(|s| (index, s))
            });
        }

        // Re-assemble in top-story rank order regardless of completion order.
        let mut slots: Vec<Option<HnStory>> = vec![None; ids.len()];
        while let Some(joined) = set.join_next().await {
            if let Ok(Some((index, story))) = joined {
                slots[index] = Some(story);
            }
        }

        let mut candidates = Vec::new();
        let mut dropped = 0usize;
        for (index, slot) in slots.into_iter().enumerate() {
            let Some(story) = slot else { continue };
            match normalize_story(ids[index], story) {
                Ok(Some(candidate)) => candidates.push(candidate),
                Ok(None) => {}
                Err(()) => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("Hacker News: dropped {dropped} malformed records");
        }
        debug!("Hacker News: {} candidates", candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(kind: Option<&str>, title: Option<&str>, url: Option<&str>) -> HnStory {
        HnStory {
            kind: kind.map(|s| s.to_string()),
            title: title.map(|s| s.to_string()),
            url: url.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_normalize_keeps_stories_with_titles() {
        let candidate = normalize_story(
            42,
            story(Some("story"), Some("A title"), Some("https://x.test")),
        )
        .unwrap()
        .unwrap();

        assert_eq!(candidate.source, Source::Hackernews);
        assert_eq!(candidate.external_id, "42");
        assert_eq!(candidate.title, "A title");
        assert_eq!(candidate.url.as_deref(), Some("https://x.test"));
    }

    #[test]
    fn test_normalize_allows_missing_url() {
        // Ask HN posts have no outbound url.
        let candidate = normalize_story(1, story(Some("story"), Some("Ask HN: ?"), None))
            .unwrap()
            .unwrap();
        assert!(candidate.url.is_none());
    }

    #[test]
    fn test_normalize_filters_non_stories() {
        assert_eq!(
            normalize_story(1, story(Some("job"), Some("Hiring"), None)),
            Ok(None)
        );
        assert_eq!(normalize_story(1, story(None, Some("x"), None)), Ok(None));
    }

    #[test]
    fn test_normalize_rejects_missing_title_as_malformed() {
        assert_eq!(normalize_story(1, story(Some("story"), None, None)), Err(()));
    }
}
