//! Product Hunt adapter over the public Atom launch feed.
//!
//! No API key needed. Each entry's HTML content opens with the product
//! tagline; that first line is folded into the title so enrichment sees what
//! the product does, not just its name.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use tracing::{debug, warn};

use super::{SourceAdapter, SourceUnavailable};
use crate::models::item::{RawCandidate, Source};

const FEED_URL: &str = "https://www.producthunt.com/feed";
/// Cap on the tagline folded into the title.
const TAGLINE_MAX_CHARS: usize = 200;

pub struct ProductHuntAdapter {
    client: Client,
    fetch_count: usize,
}

impl ProductHuntAdapter {
    pub fn new(client: Client, fetch_count: usize) -> Self {
        Self {
            client,
            fetch_count,
        }
    }

    async fn fetch_feed(&self) -> Result<String, reqwest::Error> {
        self.client
            .get(FEED_URL)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

/// One `<entry>` as accumulated by the feed walker.
#[derive(Debug, Default)]
struct Entry {
    title: String,
    link: Option<String>,
    content: String,
}

/// Which text-bearing child of the current entry is open.
enum Field {
    Title,
    Content,
}

/// Walks the Atom feed and collects up to `limit` candidates plus a count of
/// entries dropped for missing a title or link. Entry content arrives as
/// escaped HTML in text events, never as child elements.
fn parse_feed(xml: &[u8], limit: usize) -> Result<(Vec<RawCandidate>, usize), quick_xml::Error> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut candidates = Vec::new();
    let mut dropped = 0usize;
    let mut entry: Option<Entry> = None;
    let mut field: Option<Field> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"entry" => entry = Some(Entry::default()),
                b"title" if entry.is_some() => field = Some(Field::Title),
                b"content" if entry.is_some() => field = Some(Field::Content),
                b"link" => set_link(&mut entry, &e),
                _ => field = None,
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"link" {
                    set_link(&mut entry, &e);
                }
            }
            Event::Text(t) => {
                if let (Some(open), Some(field)) = (entry.as_mut(), &field) {
                    let target = match field {
                        Field::Title => &mut open.title,
                        Field::Content => &mut open.content,
                    };
                    target.push_str(t.unescape().unwrap_or_default().as_ref());
                }
            }
            Event::CData(t) => {
                if let (Some(open), Some(field)) = (entry.as_mut(), &field) {
                    let target = match field {
                        Field::Title => &mut open.title,
                        Field::Content => &mut open.content,
                    };
                    target.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"title" | b"content" => field = None,
                b"entry" => {
                    if let Some(done) = entry.take() {
                        match finalize_entry(done) {
                            Ok(candidate) => candidates.push(candidate),
                            Err(()) => dropped += 1,
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

/// First `href` wins; entries carry a single alternate link.
fn set_link(entry: &mut Option<Entry>, e: &BytesStart<'_>) {
    let Some(entry) = entry.as_mut() else {
        return;
    };
    if entry.link.is_some() {
        return;
    }
    if let Ok(Some(attr)) = e.try_get_attribute("href") {
        let href = attr.unescape_value().unwrap_or_default();
        if !href.is_empty() {
            entry.link = Some(href.into_owned());
        }
    }
}

fn finalize_entry(entry: Entry) -> Result<RawCandidate, ()> {
    let Some(url) = entry.link else {
        return Err(());
    };
    let name = entry.title.trim();
    if name.is_empty() {
        return Err(());
    }

    let title = match tagline_of(&entry.content) {
        Some(tagline) => format!("{name} - {tagline}"),
        None => name.to_string(),
    };

    Ok(RawCandidate {
        source: Source::Producthunt,
        external_id: slug_from_url(&url).unwrap_or_else(|| url.clone()),
        title,
        url: Some(url),
    })
}

/// First non-empty line of the content with its HTML stripped, capped.
fn tagline_of(content: &str) -> Option<String> {
    let text = strip_html(content);
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(TAGLINE_MAX_CHARS).collect())
}

/// Drops HTML tags from feed content, keeping the text between them.
fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Launch slug out of `https://www.producthunt.com/posts/<slug>?ref=...`.
fn slug_from_url(url: &str) -> Option<String> {
    let rest = url.split("/posts/").nth(1)?;
    let slug = rest.split(['/', '?']).next()?;
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}

#[async_trait]
impl SourceAdapter for ProductHuntAdapter {
    fn source(&self) -> Source {
        Source::Producthunt
    }

    fn fetch_limit(&self) -> usize {
        self.fetch_count
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RawCandidate>, SourceUnavailable> {
        let body = self
            .fetch_feed()
            .await
            .map_err(|e| SourceUnavailable::from_http(Source::Producthunt, e))?;

        let (candidates, dropped) = parse_feed(body.as_bytes(), limit).map_err(|e| {
            SourceUnavailable::new(Source::Producthunt, format!("feed parse failed: {e}"))
        })?;

        if dropped > 0 {
            warn!("Product Hunt: dropped {dropped} malformed records");
        }
        debug!("Product Hunt: {} candidates", candidates.len());
        Ok(candidates)
    }
}
