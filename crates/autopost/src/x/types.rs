//! X API v2 data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public engagement counters of a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicMetrics {
    pub like_count: u64,
    pub retweet_count: u64,
    pub reply_count: u64,
    pub quote_count: u64,
    pub impression_count: u64,
}

impl PublicMetrics {
    /// Ranking score: likes plus reposts weighted twice.
    #[must_use]
    pub fn engagement_score(&self) -> u64 {
        self.like_count + self.retweet_count * 2
    }
}

/// A post as returned by the search and timeline endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub public_metrics: PublicMetrics,
}

/// A post mentioning the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub text: String,
    pub author_id: String,
    /// Handle of the author, "unknown" when not expanded.
    pub author_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: String,
    pub text: String,
}

/// Ordering of recent-search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Relevancy,
    Recency,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Relevancy => "relevancy",
            SortOrder::Recency => "recency",
        }
    }
}

// Wire envelopes.

#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub includes: Option<Includes>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Includes {
    #[serde(default)]
    pub users: Vec<UserRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRef {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMention {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LikeResult {
    pub liked: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiProblem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_score_weights_reposts() {
        let metrics = PublicMetrics {
            like_count: 100,
            retweet_count: 30,
            ..Default::default()
        };
        assert_eq!(metrics.engagement_score(), 160);
    }

    #[test]
    fn test_post_parses_with_missing_metrics() {
        let post: Post = serde_json::from_str(r#"{"id":"1","text":"hello"}"#).unwrap();
        assert_eq!(post.public_metrics, PublicMetrics::default());
        assert!(post.author_id.is_none());
    }

    #[test]
    fn test_post_parses_api_shape() {
        let post: Post = serde_json::from_str(
            r#"{
                "id": "1790",
                "text": "AIで人生が変わる",
                "author_id": "42",
                "created_at": "2026-10-01T03:00:00.000Z",
                "public_metrics": {"like_count": 120, "retweet_count": 8, "reply_count": 2, "quote_count": 1, "impression_count": 9000}
            }"#,
        )
        .unwrap();
        assert_eq!(post.public_metrics.like_count, 120);
        assert_eq!(post.author_id.as_deref(), Some("42"));
        assert!(post.created_at.is_some());
    }
}
