use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Review lifecycle of one item for one user. Starts at `unseen` and leaves
/// it at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Unseen,
    Liked,
    Skipped,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Unseen => "unseen",
            ReviewStatus::Liked => "liked",
            ReviewStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<ReviewStatus> {
        match s {
            "unseen" => Some(ReviewStatus::Unseen),
            "liked" => Some(ReviewStatus::Liked),
            "skipped" => Some(ReviewStatus::Skipped),
            _ => None,
        }
    }
}

/// Explicit feedback from the review surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Like,
    Skip,
}

impl ReviewAction {
    /// Resulting review status.
    pub fn status(&self) -> ReviewStatus {
        match self {
            ReviewAction::Like => ReviewStatus::Liked,
            ReviewAction::Skip => ReviewStatus::Skipped,
        }
    }

    /// Preference delta applied to every tag on the reviewed item.
    pub fn delta(&self) -> i64 {
        match self {
            ReviewAction::Like => 1,
            ReviewAction::Skip => -1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserItemRow {
    pub user_id: String,
    pub item_id: i64,
    pub status: String,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreferenceRow {
    pub user_id: String,
    pub tag: String,
    pub score: i64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_maps_to_status_and_delta() {
        assert_eq!(ReviewAction::Like.status(), ReviewStatus::Liked);
        assert_eq!(ReviewAction::Skip.status(), ReviewStatus::Skipped);
        assert_eq!(ReviewAction::Like.delta(), 1);
        assert_eq!(ReviewAction::Skip.delta(), -1);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            ReviewStatus::Unseen,
            ReviewStatus::Liked,
            ReviewStatus::Skipped,
        ] {
            assert_eq!(ReviewStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReviewStatus::parse("archived"), None);
    }
}
