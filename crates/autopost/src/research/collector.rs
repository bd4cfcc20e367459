//! Buzz-post collection from recent search.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::ContentConfig;
use crate::error::AutopostResult;
use crate::x::{SortOrder, XApi};

use super::patterns::PostPattern;
use super::ResearchItem;

/// Searches each research keyword and keeps the posts above the like threshold.
pub struct ResearchCollector {
    api: Arc<dyn XApi>,
    config: ContentConfig,
}

impl ResearchCollector {
    #[must_use]
    pub fn new(api: Arc<dyn XApi>, config: ContentConfig) -> Self {
        Self { api, config }
    }

    /// Search query for a keyword: Japanese originals only.
    #[must_use]
    pub fn query_for(keyword: &str) -> String {
        format!("{keyword} lang:ja -is:retweet -is:reply")
    }

    /// Collect buzz posts for one genre.
    ///
    /// A 403 from search (plan restriction) yields no results for that keyword;
    /// any other API error is returned.
    pub async fn collect_genre(
        &self,
        genre: &str,
        keywords: &[String],
    ) -> AutopostResult<Vec<ResearchItem>> {
        let mut items = Vec::new();

        for keyword in keywords {
            let query = Self::query_for(keyword);
            let posts = match self
                .api
                .search_recent(&query, self.config.results_per_keyword, SortOrder::Relevancy)
                .await
            {
                Ok(posts) => posts,
                Err(e) if e.status() == Some(403) => {
                    tracing::warn!(genre, keyword = %keyword, error = %e, "Search not permitted, skipping keyword");
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            tracing::info!(genre, keyword = %keyword, count = posts.len(), "Keyword searched");

            items.extend(
                posts
                    .into_iter()
                    .filter(|p| p.public_metrics.like_count >= self.config.buzz_threshold_likes)
                    .map(|p| ResearchItem {
                        pattern: PostPattern::detect(&p.text),
                        id: p.id,
                        text: p.text,
                        author_id: p.author_id,
                        created_at: p.created_at,
                        metrics: p.public_metrics,
                        genre: genre.to_string(),
                    }),
            );
        }

        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(item.id.clone()));

        tracing::info!(
            genre,
            count = items.len(),
            threshold = self.config.buzz_threshold_likes,
            "Buzz posts extracted"
        );
        Ok(items)
    }

    /// Collect every configured genre, deduplicated and ranked by engagement.
    pub async fn collect_all(&self) -> AutopostResult<Vec<ResearchItem>> {
        let mut all = Vec::new();
        for (genre, keywords) in &self.config.research_genres {
            all.extend(self.collect_genre(genre, keywords).await?);
        }

        let mut seen = HashSet::new();
        all.retain(|item| seen.insert(item.id.clone()));
        rank_by_engagement(&mut all);
        Ok(all)
    }
}

/// Sort by engagement score, highest first. Ties keep their order.
pub fn rank_by_engagement(items: &mut [ResearchItem]) {
    items.sort_by(|a, b| {
        b.metrics
            .engagement_score()
            .cmp(&a.metrics.engagement_score())
    });
}
