//! Dev.to adapter over the public articles API.
//!
//! Blends this week's top articles with the programming tag feed, then keeps
//! the most-reacted ones. Either feed failing alone degrades the batch.

use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{SourceAdapter, SourceUnavailable};
use crate::models::item::{RawCandidate, Source};

const ARTICLES_URL: &str = "https://dev.to/api/articles";
const FALLBACK_TAG: &str = "programming";

#[derive(Debug, Clone, Deserialize)]
struct Article {
    id: Option<u64>,
    title: Option<String>,
    url: Option<String>,
    #[serde(default)]
    public_reactions_count: u32,
}

pub struct DevtoAdapter {
    client: Client,
    fetch_count: usize,
}

impl DevtoAdapter {
    pub fn new(client: Client, fetch_count: usize) -> Self {
        Self {
            client,
            fetch_count,
        }
    }

    async fn fetch_articles(&self, query: &[(&str, String)]) -> Result<Vec<Article>, reqwest::Error> {
        self.client
            .get(ARTICLES_URL)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Article>>()
            .await
    }
}

fn normalize_article(article: Article) -> Result<RawCandidate, ()> {
    let (Some(id), Some(title)) = (article.id, article.title) else {
        return Err(());
    };
    Ok(RawCandidate {
        source: Source::Devto,
        external_id: id.to_string(),
        title,
        url: article.url,
    })
}

#[async_trait]
impl SourceAdapter for DevtoAdapter {
    fn source(&self) -> Source {
        Source::Devto
    }

    fn fetch_limit(&self) -> usize {
        self.fetch_count
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>, SourceUnavailable> {
        let per_page = limit.to_string();
        let mut articles: Vec<Article> = Vec::new();
        let mut failures = 0usize;

        let top = [
            ("per_page", per_page.clone()),
            ("top", "7".to_string()),
        ];
        match self.fetch_articles(&top).await {
            Ok(mut found) => articles.append(&mut found),
            Err(e) => {
                warn!("Dev.to: top articles fetch failed: {e}");
                failures += 1;
            }
        }

        let tagged = [
            ("per_page", per_page),
            ("tag", FALLBACK_TAG.to_string()),
        ];
        match self.fetch_articles(&tagged).await {
            Ok(mut found) => articles.append(&mut found),
            Err(e) => {
                warn!("Dev.to: tag feed fetch failed: {e}");
                failures += 1;
            }
        }

        if failures == 2 {
            return Err(SourceUnavailable::new(
                Source::Devto,
                "both article feeds failed",
            ));
        }

        let mut seen = HashSet::new();
        articles.retain(|article| match article.id {
            Some(id) => seen.insert(id),
            None => true,
        });
        articles.sort_by(|a, b| b.public_reactions_count.cmp(&a.public_reactions_count));

        let mut candidates = Vec::new();
        let mut dropped = 0usize;
        for article in articles {
            match normalize_article(article) {
                Ok(candidate) => candidates.push(candidate),
                Err(()) => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("Dev.to: dropped {dropped} malformed records");
        }
        candidates.truncate(limit);
        debug!("Dev.to: {} candidates", candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_maps_article_fields() {
        let candidate = normalize_article(Article {
            id: Some(9),
            title: Some("Shipping a side project".to_string()),
            url: Some("https://dev.to/x".to_string()),
            public_reactions_count: 12,
        })
        .unwrap();

        assert_eq!(candidate.source, Source::Devto);
        assert_eq!(candidate.external_id, "9");
        assert_eq!(candidate.title, "Shipping a side project");
    }

    #[test]
    fn test_normalize_rejects_missing_fields() {
        assert!(normalize_article(Article {
            id: None,
            title: Some("t".to_string()),
            url: None,
            public_reactions_count: 0,
        })
        .is_err());
        assert!(normalize_article(Article {
            id: Some(1),
            title: None,
            url: None,
            public_reactions_count: 0,
        })
        .is_err());
    }
}
