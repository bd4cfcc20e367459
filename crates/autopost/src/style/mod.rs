//! Style profiling of the account's own posts.

mod analyzer;

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{read_json, write_json, DataPaths, STYLE_SAMPLE_SIZE};
use crate::error::AutopostResult;
use crate::x::XApi;

pub use analyzer::{
    CharRatios, EndingStat, LengthDistribution, PhraseStat, StyleProfile, ToneMarkers,
};

/// Cached copy of the account's own posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PastPost {
    pub id: String,
    pub text: String,
}

impl StyleProfile {
    /// Load a saved profile, or `None` if none was saved yet.
    pub fn load(path: &Path) -> AutopostResult<Option<Self>> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> AutopostResult<()> {
        write_json(path, self)?;
        tracing::info!(path = %path.display(), "Style profile saved");
        Ok(())
    }
}

/// Builds and caches the style profile.
pub struct StyleProfiler {
    api: Option<Arc<dyn XApi>>,
    paths: DataPaths,
}

impl StyleProfiler {
    /// Without an API the profiler only works from the cached posts.
    #[must_use]
    pub fn new(api: Option<Arc<dyn XApi>>, paths: DataPaths) -> Self {
        Self { api, paths }
    }

    /// Return the saved profile, or build one when missing or `force` is set.
    pub async fn profile(&self, force: bool) -> AutopostResult<StyleProfile> {
        if !force {
            if let Some(profile) = StyleProfile::load(&self.paths.style_profile())? {
                tracing::debug!("Using saved style profile");
                return Ok(profile);
            }
        }
        self.rebuild().await
    }

    /// Fetch recent own posts (falling back to the cache) and re-analyze.
    ///
    /// A profile built from no posts is returned but not saved.
    pub async fn rebuild(&self) -> AutopostResult<StyleProfile> {
        let posts = self.own_posts().await?;
        let texts: Vec<&str> = posts.iter().map(|p| p.text.as_str()).collect();
        let profile = StyleProfile::analyze(&texts);
        if profile.total_posts_analyzed > 0 {
            profile.save(&self.paths.style_profile())?;
        } else {
            tracing::info!("No posts to analyze, using the default style profile");
        }
        Ok(profile)
    }

    async fn own_posts(&self) -> AutopostResult<Vec<PastPost>> {
        let cache = self.paths.past_posts();

        if let Some(api) = &self.api {
            match api.own_recent_posts(STYLE_SAMPLE_SIZE as u32).await {
                Ok(posts) if !posts.is_empty() => {
                    let posts: Vec<PastPost> = posts
                        .into_iter()
                        .map(|p| PastPost { id: p.id, text: p.text })
                        .collect();
                    write_json(&cache, &posts)?;
                    tracing::info!(count = posts.len(), "Fetched own posts for style analysis");
                    return Ok(posts);
                }
                Ok(_) => tracing::warn!("Account has no posts yet"),
                Err(e) => tracing::warn!(error = %e, "Could not fetch own posts, using cache"),
            }
        }

        Ok(read_json(&cache)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x::testing::{post, FakeX};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_profile_without_api_or_cache_is_default() {
        let dir = TempDir::new().unwrap();
        let profiler = StyleProfiler::new(None, DataPaths::new(dir.path()));

        let profile = profiler.profile(false).await.unwrap();
        assert_eq!(profile, StyleProfile::default());
        assert!(!dir.path().join("style_profile.json").exists());
    }

    #[tokio::test]
    async fn test_empty_profile_does_not_shadow_later_posts() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());

        let offline = StyleProfiler::new(None, paths.clone()).profile(false).await.unwrap();
        assert_eq!(offline.total_posts_analyzed, 0);

        let fake = FakeX {
            own_posts: vec![post("1", "時間は最大の資産である。", "me", 0)],
            ..FakeX::new()
        };
        let live = StyleProfiler::new(Some(Arc::new(fake)), paths.clone())
            .profile(false)
            .await
            .unwrap();
        assert_eq!(live.total_posts_analyzed, 1);
        assert!(paths.style_profile().exists());
    }

    #[tokio::test]
    async fn test_profile_uses_cached_posts() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let cached = vec![PastPost {
            id: "1".into(),
            text: "時間は最大の資産である。".into(),
        }];
        write_json(&paths.past_posts(), &cached).unwrap();

        let profile = StyleProfiler::new(None, paths).profile(true).await.unwrap();
        assert_eq!(profile.total_posts_analyzed, 1);
        assert_eq!(profile.endings[0].ending, "である");
    }

    #[tokio::test]
    async fn test_saved_profile_is_reused() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path());
        let mut saved = StyleProfile::default();
        saved.avg_length = 99.0;
        saved.save(&paths.style_profile()).unwrap();

        let profile = StyleProfiler::new(None, paths).profile(false).await.unwrap();
        assert!((profile.avg_length - 99.0).abs() < f64::EPSILON);
    }
}
