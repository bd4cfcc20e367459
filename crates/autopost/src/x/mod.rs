//! X (Twitter) API access.
//!
//! [`XApi`] is the seam every component talks through; [`XClient`] is the
//! real v2 implementation.

mod client;
pub mod oauth;
#[cfg(test)]
pub(crate) mod testing;
mod types;

use async_trait::async_trait;

use crate::error::AutopostResult;

pub use client::XClient;
pub use types::{Mention, Post, PublicMetrics, PublishedPost, SortOrder};

/// Operations the automation needs from X.
#[async_trait]
pub trait XApi: Send + Sync {
    /// Id of the account the client acts for.
    async fn own_user_id(&self) -> AutopostResult<String>;

    /// Recent-search for posts matching a query.
    async fn search_recent(
        &self,
        query: &str,
        max_results: u32,
        sort: SortOrder,
    ) -> AutopostResult<Vec<Post>>;

    /// The account's own most recent posts.
    async fn own_recent_posts(&self, max_results: u32) -> AutopostResult<Vec<Post>>;

    /// Publish a post, optionally as a reply.
    async fn create_post(&self, text: &str, reply_to: Option<&str>)
        -> AutopostResult<PublishedPost>;

    /// Mentions of the account newer than `since_id`.
    async fn mentions(&self, since_id: Option<&str>, max_results: u32)
        -> AutopostResult<Vec<Mention>>;

    /// Like a post. Returns whether the like is in place.
    async fn like(&self, post_id: &str) -> AutopostResult<bool>;
}
