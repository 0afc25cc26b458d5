//! TLDR.tech adapter over the newsletter RSS feeds.
//!
//! Pulls a share of the limit from each topic feed. One feed failing
//! degrades the batch; only all of them failing marks the source
//! unavailable. The story link doubles as the external id, so the same
//! story surfacing in two topics collapses to one candidate.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use reqwest::Client;
use tracing::{debug, warn};

use super::{SourceAdapter, SourceUnavailable};
use crate::models::item::{RawCandidate, Source};

const FEEDS: [(&str, &str); 3] = [
    ("tech", "https://tldr.tech/api/rss/tech"),
    ("ai", "https://tldr.tech/api/rss/ai"),
    ("webdev", "https://tldr.tech/api/rss/webdev"),
];
/// Floor for the per-feed share so small limits still sample each topic.
const MIN_PER_FEED: usize = 5;
/// Pause between requests against the same host.
const FEED_SPACING: Duration = Duration::from_millis(200);

pub struct TldrAdapter {
    client: Client,
    fetch_count: usize,
}

impl TldrAdapter {
    pub fn new(client: Client, fetch_count: usize) -> Self {
        Self {
            client,
            fetch_count,
        }
    }

    async fn fetch_feed(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// One `<item>` as accumulated by the feed walker.
#[derive(Debug, Default)]
struct FeedItem {
    title: String,
    link: String,
}

/// Which text-bearing child of the current item is open.
enum Field {
    Title,
    Link,
}

/// Walks one RSS feed and collects up to `limit` candidates plus a count of
/// items dropped for an empty title or link.
fn parse_feed(xml: &[u8], limit: usize) -> Result<(Vec<RawCandidate>, usize), quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut candidates = Vec::new();
    let mut dropped = 0usize;
    let mut item: Option<FeedItem> = None;
    let mut field: Option<Field> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"item" => item = Some(FeedItem::default()),
                b"title" if item.is_some() => field = Some(Field::Title),
                b"link" if item.is_some() => field = Some(Field::Link),
                _ => field = None,
            },
            Event::Text(t) => {
                if let (Some(open), Some(field)) = (item.as_mut(), &field) {
                    let target = match field {
                        Field::Title => &mut open.title,
                        Field::Link => &mut open.link,
                    };
                    target.push_str(t.unescape().unwrap_or_default().as_ref());
                }
            }
            Event::CData(t) => {
                if let (Some(open), Some(field)) = (item.as_mut(), &field) {
                    let target = match field {
                        Field::Title => &mut open.title,
                        Field::Link => &mut open.link,
                    };
                    target.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"title" | b"link" => field = None,
                b"item" => {
                    if let Some(done) = item.take() {
                        let title = done.title.trim();
                        let link = done.link.trim();
                        if title.is_empty() || link.is_empty() {
                            dropped += 1;
                        } else {
                            candidates.push(RawCandidate {
                                source: Source::Tldr,
                                external_id: link.to_string(),
                                title: title.to_string(),
                                url: Some(link.to_string()),
                            });
                        }
                    }
                    if candidates.len() >= limit {
                        break;
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((candidates, dropped))
}

#[async_trait]
impl SourceAdapter for TldrAdapter {
    fn source(&self) -> Source {
        Source::Tldr
    }

    fn fetch_limit(&self) -> usize {
        self.fetch_count
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>, SourceUnavailable> {
        let per_feed = (limit / FEEDS.len()).max(MIN_PER_FEED);

        let mut candidates: Vec<RawCandidate> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut dropped = 0usize;
        let mut failures = 0usize;

        for (idx, &(topic, url)) in FEEDS.iter().enumerate() {
            if candidates.len() >= limit {
                break;
            }
            if idx > 0 {
                tokio::time::sleep(FEED_SPACING).await;
            }

            let body = match self.fetch_feed(url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("TLDR: {topic} feed fetch failed: {e}");
                    failures += 1;
                    continue;
                }
            };
            match parse_feed(body.as_bytes(), per_feed) {
                Ok((found, feed_dropped)) => {
                    dropped += feed_dropped;
                    for candidate in found {
                        if seen.insert(candidate.external_id.clone()) {
                            candidates.push(candidate);
                        }
                    }
                }
                Err(e) => {
                    warn!("TLDR: {topic} feed parse failed: {e}");
                    failures += 1;
                }
            }
        }

        if failures == FEEDS.len() {
            return Err(SourceUnavailable::new(
                Source::Tldr,
                "all topic feeds failed",
            ));
        }

        if dropped > 0 {
            warn!("TLDR: dropped {dropped} malformed records");
        }
        candidates.truncate(limit);
        debug!("TLDR: {} candidates", candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>TLDR Tech</title>
    <link>https://tldr.tech</link>
    <item>
      <title>Chips get smaller again</title>
      <link>https://example.com/chips</link>
      <description>Fab news.</description>
    </item>
    <item>
      <title></title>
      <link>https://example.com/untitled</link>
    </item>
    <item>
      <title><![CDATA[Postgres vs. the world (5 minute read)]]></title>
      <link>https://example.com/postgres</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed_maps_items() {
        let (candidates, dropped) = parse_feed(FEED.as_bytes(), 10).unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(dropped, 1);
        assert_eq!(candidates[0].source, Source::Tldr);
        assert_eq!(candidates[0].title, "Chips get smaller again");
        assert_eq!(candidates[0].external_id, "https://example.com/chips");
        assert_eq!(candidates[0].url.as_deref(), Some("https://example.com/chips"));
    }

    #[test]
    fn test_parse_feed_ignores_channel_title_and_link() {
        let (candidates, _) = parse_feed(FEED.as_bytes(), 10).unwrap();

        assert!(candidates
            .iter()
            .all(|c| c.external_id != "https://tldr.tech"));
        assert!(candidates.iter().all(|c| c.title != "TLDR Tech"));
    }

    #[test]
    fn test_parse_feed_reads_cdata_titles() {
        let (candidates, _) = parse_feed(FEED.as_bytes(), 10).unwrap();

        assert_eq!(
            candidates[1].title,
            "Postgres vs. the world (5 minute read)"
        );
    }

    #[test]
    fn test_parse_feed_respects_limit() {
        let (candidates, _) = parse_feed(FEED.as_bytes(), 1).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_parse_feed_rejects_broken_xml() {
        assert!(parse_feed(b"<rss><item></wrong>", 5).is_err());
    }
}
