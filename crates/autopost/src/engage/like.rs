//! Keyword search and like pass.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ContentConfig;
use crate::error::AutopostResult;
use crate::x::{SortOrder, XApi};

/// Posts fetched per keyword.
const SEARCH_RESULTS: u32 = 10;

/// Pause between likes.
const LIKE_PAUSE: Duration = Duration::from_secs(1);

/// Likes recent posts found for the engagement keywords.
pub struct LikeHandler {
    api: Arc<dyn XApi>,
    keywords: Vec<String>,
    per_keyword: usize,
    pause: Duration,
}

impl LikeHandler {
    #[must_use]
    pub fn new(api: Arc<dyn XApi>, config: &ContentConfig) -> Self {
        Self {
            api,
            keywords: config.engagement_keywords.clone(),
            per_keyword: config.likes_per_keyword,
            pause: LIKE_PAUSE,
        }
    }

    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Like up to the per-keyword limit, skipping the account's own posts.
    ///
    /// Returns the number of likes (or, for a dry run, of would-be likes).
    pub async fn run(&self, dry_run: bool) -> AutopostResult<usize> {
        let own_id = self.api.own_user_id().await?;
        let mut total = 0;

        for keyword in &self.keywords {
            let posts = self
                .api
                .search_recent(keyword, SEARCH_RESULTS, SortOrder::Recency)
                .await?;

            let mut count = 0;
            for post in posts {
                if count >= self.per_keyword {
                    break;
                }
                if post.author_id.as_deref() == Some(own_id.as_str()) {
                    continue;
                }

                if dry_run {
                    let preview: String = post.text.chars().take(30).collect();
                    tracing::info!(dry_run = true, post_id = %post.id, text = %preview, "Would like");
                    count += 1;
                    continue;
                }

                match self.api.like(&post.id).await {
                    Ok(true) => {
                        count += 1;
                        tokio::time::sleep(self.pause).await;
                    }
                    Ok(false) => tracing::warn!(post_id = %post.id, "Like not applied"),
                    Err(e) => tracing::warn!(post_id = %post.id, error = %e, "Like failed"),
                }
            }

            tracing::info!(keyword = %keyword, count, "Keyword likes done");
            total += count;
        }

        Ok(total)
    }
}
