//! Reddit adapter over the public `hot.json` listings.
//!
//! Pulls a share of the limit from each subreddit in a fixed builder-focused
//! set. Subreddits are fetched concurrently; one failing subreddit degrades
//! the batch, and only all of them failing marks the source unavailable.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{SourceAdapter, SourceUnavailable};
use crate::models::item::{RawCandidate, Source};

const SUBREDDITS: [&str; 5] = [
    "programming",
    "webdev",
    "SideProject",
    "indiehackers",
    "MachineLearning",
];
/// Floor for the per-subreddit share so small limits still sample each one.
const MIN_PER_SUBREDDIT: usize = 5;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Debug, Clone, Deserialize)]
struct RedditPost {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    stickied: bool,
}

pub struct RedditAdapter {
    client: Client,
    fetch_count: usize,
}

impl RedditAdapter {
    pub fn new(client: Client, fetch_count: usize) -> Self {
        Self {
            client,
            fetch_count,
        }
    }

    async fn fetch_subreddit(
        client: &Client,
        subreddit: &str,
        limit: usize,
    ) -> Result<Listing, reqwest::Error> {
        let url = format!("https://www.reddit.com/r/{subreddit}/hot.json?limit={limit}");
        client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Listing>()
            .await
    }
}

/// Flattens one listing into candidates. Stickied posts are moderator
/// announcements, not trends, so they are filtered; posts missing id or
/// title count as malformed.
fn normalize_listing(listing: Listing) -> (Vec<RawCandidate>, usize) {
    let mut candidates = Vec::new();
    let mut dropped = 0usize;

    for child in listing.data.children {
        let post = child.data;
        if post.stickied {
            continue;
        }
        let (Some(id), Some(title)) = (post.id, post.title) else {
            dropped += 1;
            continue;
        };
        // Self posts carry a subreddit-relative url.
        let url = post.url.map(|u| {
            if u.starts_with("/r/") {
                format!("https://www.reddit.com{u}")
            } else {
                u
            }
        });
        candidates.push(RawCandidate {
            source: Source::Reddit,
            external_id: id,
            title,
            url,
        });
    }

    (candidates, dropped)
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn source(&self) -> Source {
        Source::Reddit
    }

    fn fetch_limit(&self) -> usize {
        self.fetch_count
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>, SourceUnavailable> {
        let per_subreddit = (limit / SUBREDDITS.len()).max(MIN_PER_SUBREDDIT);

        let mut set = JoinSet::new();
        for subreddit in SUBREDDITS {
            let client = self.client.clone();
            set.spawn(async move {
                let result = Self::fetch_subreddit(&client, subreddit, per_subreddit).await;
                (subreddit, result)
            });
        }

        let mut candidates = Vec::new();
        let mut dropped = 0usize;
        let mut failures = 0usize;
        while let Some(joined) = set.join_next().await {
            let Ok((subreddit, result)) = joined else {
                failures += 1;
                continue;
            };
            match result {
                Ok(listing) => {
                    let (mut sub_candidates, sub_dropped) = normalize_listing(listing);
                    candidates.append(&mut sub_candidates);
                    dropped += sub_dropped;
                }
                Err(e) => {
                    warn!("Reddit: r/{subreddit} fetch failed: {e}");
                    failures += 1;
                }
            }
        }

        if failures == SUBREDDITS.len() {
            return Err(SourceUnavailable::new(
                Source::Reddit,
                "all subreddit fetches failed",
            ));
        }

        if dropped > 0 {
            warn!("Reddit: dropped {dropped} malformed records");
        }
        candidates.truncate(limit);
        debug!("Reddit: {} candidates", candidates.len());
        Ok(candidates)
    }
}
