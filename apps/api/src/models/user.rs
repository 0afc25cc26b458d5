use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Quota tiers, ordered: free < supporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Supporter,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Supporter => "supporter",
        }
    }

    /// Unknown tier strings fall back to the most restrictive tier.
    pub fn parse(s: &str) -> Tier {
        match s {
            "supporter" => Tier::Supporter,
            _ => Tier::Free,
        }
    }
}

/// An anonymous identity. `id` is the opaque client token; immutable once
/// created. Tier changes come from outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: String,
    pub tier: String,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl UserRow {
    pub fn tier(&self) -> Tier {
        Tier::parse(&self.tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Free < Tier::Supporter);
    }

    #[test]
    fn test_tier_parse_defaults_to_free() {
        assert_eq!(Tier::parse("supporter"), Tier::Supporter);
        assert_eq!(Tier::parse("free"), Tier::Free);
        assert_eq!(Tier::parse("platinum"), Tier::Free);
    }
}
