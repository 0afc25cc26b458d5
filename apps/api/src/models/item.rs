use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Known content sources. Stored in the DB as the lowercase string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Hackernews,
    Reddit,
    Github,
    Devto,
    Producthunt,
    Tldr,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Hackernews => "hackernews",
            Source::Reddit => "reddit",
            Source::Github => "github",
            Source::Devto => "devto",
            Source::Producthunt => "producthunt",
            Source::Tldr => "tldr",
        }
    }

    pub fn parse(s: &str) -> Option<Source> {
        match s {
            "hackernews" => Some(Source::Hackernews),
            "reddit" => Some(Source::Reddit),
            "github" => Some(Source::Github),
            "devto" => Some(Source::Devto),
            "producthunt" => Some(Source::Producthunt),
            "tldr" => Some(Source::Tldr),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Source::Hackernews => "Hacker News",
            Source::Reddit => "Reddit",
            Source::Github => "GitHub",
            Source::Devto => "Dev.to",
            Source::Producthunt => "Product Hunt",
            Source::Tldr => "TLDR",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source-normalized content record that has not been stored yet.
/// Source-native metadata is already folded into `title` by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawCandidate {
    pub source: Source,
    pub external_id: String,
    pub title: String,
    pub url: Option<String>,
}

/// One deduplicated piece of content, shared across all users.
/// `summary` and `tags` stay NULL until an enrichment pass touches the row;
/// `tags` holds a JSON array in TEXT form.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub tags: Option<String>,
    pub collected_at: DateTime<Utc>,
}

impl ItemRow {
    /// Decoded tag list. Tolerates NULL and malformed column contents by
    /// treating them as "no tags" rather than failing the read path.
    pub fn tag_list(&self) -> Vec<String> {
        parse_tag_list(self.tags.as_deref())
    }
}

/// API-facing item shape with tags decoded out of the TEXT column.
#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: i64,
    pub source: String,
    pub external_id: String,
    pub title: String,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub collected_at: DateTime<Utc>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        let tags = row.tag_list();
        Item {
            id: row.id,
            source: row.source,
            external_id: row.external_id,
            title: row.title,
            url: row.url,
            summary: row.summary,
            tags,
            collected_at: row.collected_at,
        }
    }
}

pub fn parse_tag_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(tags) => tags,
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trips_through_str() {
        for source in [
            Source::Hackernews,
            Source::Reddit,
            Source::Github,
            Source::Devto,
            Source::Producthunt,
            Source::Tldr,
        ] {
            assert_eq!(Source::parse(source.as_str()), Some(source));
        }
    }

    #[test]
    fn test_source_parse_rejects_unknown() {
        assert_eq!(Source::parse("myspace"), None);
        assert_eq!(Source::parse(""), None);
    }

    #[test]
    fn test_parse_tag_list_handles_null_and_garbage() {
        assert!(parse_tag_list(None).is_empty());
        assert!(parse_tag_list(Some("not json")).is_empty());
        assert!(parse_tag_list(Some("{\"a\":1}")).is_empty());
        assert_eq!(
            parse_tag_list(Some("[\"ai\",\"rust\"]")),
            vec!["ai".to_string(), "rust".to_string()]
        );
    }
}
