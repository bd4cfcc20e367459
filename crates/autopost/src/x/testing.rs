//! In-memory [`XApi`] for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AutopostError, AutopostResult};

use super::{Mention, Post, PublicMetrics, PublishedPost, SortOrder, XApi};

#[derive(Default)]
pub(crate) struct FakeX {
    pub user_id: String,
    pub search_results: Vec<Post>,
    /// Status returned by every search instead of results.
    pub search_error: Option<u16>,
    pub own_posts: Vec<Post>,
    pub mentions: Vec<Mention>,
    pub fail_publish: bool,
    pub searches: Mutex<Vec<String>>,
    pub published: Mutex<Vec<(String, Option<String>)>>,
    pub liked: Mutex<Vec<String>>,
}

impl FakeX {
    pub fn new() -> Self {
        Self {
            user_id: "me".to_string(),
            ..Default::default()
        }
    }

    pub fn published(&self) -> Vec<(String, Option<String>)> {
        self.published.lock().unwrap().clone()
    }

    pub fn liked(&self) -> Vec<String> {
        self.liked.lock().unwrap().clone()
    }
}

pub(crate) fn post(id: &str, text: &str, author: &str, likes: u64) -> Post {
    Post {
        id: id.to_string(),
        text: text.to_string(),
        author_id: Some(author.to_string()),
        created_at: None,
        public_metrics: PublicMetrics {
            like_count: likes,
            ..Default::default()
        },
    }
}

#[async_trait]
impl XApi for FakeX {
    async fn own_user_id(&self) -> AutopostResult<String> {
        Ok(self.user_id.clone())
    }

    async fn search_recent(
        &self,
        query: &str,
        max_results: u32,
        _sort: SortOrder,
    ) -> AutopostResult<Vec<Post>> {
        self.searches.lock().unwrap().push(query.to_string());
        if let Some(status) = self.search_error {
            return Err(AutopostError::api_status("x", status, "search failed"));
        }
        Ok(self
            .search_results
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect())
    }

    async fn own_recent_posts(&self, max_results: u32) -> AutopostResult<Vec<Post>> {
        Ok(self.own_posts.iter().take(max_results as usize).cloned().collect())
    }

    async fn create_post(
        &self,
        text: &str,
        reply_to: Option<&str>,
    ) -> AutopostResult<PublishedPost> {
        if self.fail_publish {
            return Err(AutopostError::api_status("x", 403, "duplicate content"));
        }
        let mut published = self.published.lock().unwrap();
        published.push((text.to_string(), reply_to.map(ToString::to_string)));
        Ok(PublishedPost {
            id: format!("post-{}", published.len()),
            text: text.to_string(),
        })
    }

    async fn mentions(
        &self,
        since_id: Option<&str>,
        max_results: u32,
    ) -> AutopostResult<Vec<Mention>> {
        // Newest first, like the real endpoint.
        let mut mentions: Vec<Mention> = self
            .mentions
            .iter()
            .filter(|m| since_id.map_or(true, |since| m.id.as_str() > since))
            .cloned()
            .collect();
        mentions.sort_by(|a, b| b.id.cmp(&a.id));
        mentions.truncate(max_results as usize);
        Ok(mentions)
    }

    async fn like(&self, post_id: &str) -> AutopostResult<bool> {
        self.liked.lock().unwrap().push(post_id.to_string());
        Ok(true)
    }
}
