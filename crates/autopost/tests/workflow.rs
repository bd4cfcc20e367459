//! End-to-end generate, schedule and publish flows over in-memory fakes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use autopost::ai::{AIMessage, AIProvider, AIResponse, GenerateOptions, OfflineProvider, TokenUsage};
use autopost::config::{ContentConfig, DataPaths, MAX_POST_CHARS};
use autopost::error::{AutopostError, AutopostResult};
use autopost::pipeline::{Pipeline, PipelineConfig};
use autopost::schedule::{HistoryLog, Outcome, PostScheduler, ScheduleStore};
use autopost::x::{Mention, Post, PublishedPost, SortOrder, XApi};
use tempfile::TempDir;

/// X API fake that records every call.
#[derive(Default)]
struct RecordingX {
    calls: AtomicUsize,
    published: Mutex<Vec<String>>,
}

impl RecordingX {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl XApi for RecordingX {
    async fn own_user_id(&self) -> AutopostResult<String> {
        self.hit();
        Ok("me".into())
    }

    async fn search_recent(&self, _: &str, _: u32, _: SortOrder) -> AutopostResult<Vec<Post>> {
        self.hit();
        Ok(Vec::new())
    }

    async fn own_recent_posts(&self, _: u32) -> AutopostResult<Vec<Post>> {
        self.hit();
        Ok(Vec::new())
    }

    async fn create_post(&self, text: &str, _: Option<&str>) -> AutopostResult<PublishedPost> {
        self.hit();
        let mut published = self.published.lock().unwrap();
        published.push(text.to_string());
        Ok(PublishedPost {
            id: format!("id-{}", published.len()),
            text: text.to_string(),
        })
    }

    async fn mentions(&self, _: Option<&str>, _: u32) -> AutopostResult<Vec<Mention>> {
        self.hit();
        Ok(Vec::new())
    }

    async fn like(&self, _: &str) -> AutopostResult<bool> {
        self.hit();
        Ok(true)
    }
}

/// Model fake whose every call fails.
struct FailingProvider;

#[async_trait]
impl AIProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn generate_text(
        &self,
        _: &str,
        _: &[AIMessage],
        _: &GenerateOptions,
    ) -> AutopostResult<AIResponse> {
        Err(AutopostError::api_status("failing", 529, "overloaded"))
    }
}

/// Model fake replaying texts, reporting itself as offline.
struct Scripted {
    texts: Vec<&'static str>,
    next: AtomicUsize,
}

#[async_trait]
impl AIProvider for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_external(&self) -> bool {
        false
    }

    async fn generate_text(
        &self,
        model: &str,
        _: &[AIMessage],
        _: &GenerateOptions,
    ) -> AutopostResult<AIResponse> {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(AIResponse {
            text: self.texts[i % self.texts.len()].to_string(),
            usage: TokenUsage::default(),
            model: model.to_string(),
            provider: "scripted".into(),
        })
    }
}

fn auto(count: usize) -> PipelineConfig {
    PipelineConfig {
        count,
        auto: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_scheduled_posts_keep_content_invariants() {
    let dir = TempDir::new().unwrap();
    let config = ContentConfig::default();
    let banned = config.banned_phrases.clone();

    // Valid texts interleaved with banned-phrase and hashtag texts.
    let provider = Arc::new(Scripted {
        texts: vec![
            "情報を集める時代は終わった。何を捨てるかを決める人が勝つ。",
            "これは裏技です。知らない人は損をしています。今すぐ試すべきだ。",
            "量より質。毎日一つだけ、昨日より良い問いを立てることが大切だ。",
            "#AI 時代に必要なのは、道具ではなく判断軸である。",
        ],
        next: AtomicUsize::new(0),
    });

    let pipeline = Pipeline::new(
        auto(6),
        config,
        DataPaths::new(dir.path()),
        Some(Arc::new(RecordingX::default())),
        provider,
    )
    .unwrap();
    let result = pipeline.run(None).await.unwrap();
    assert!(result.generated > 0);

    let stored = ScheduleStore::new(dir.path().join("scheduled.json")).load().unwrap();
    assert_eq!(stored.len(), result.scheduled.len());

    let mut slots = HashSet::new();
    for post in &stored {
        assert!(post.text.chars().count() <= MAX_POST_CHARS);
        assert!(banned.iter().all(|b| !post.text.contains(b.as_str())));
        assert!(!post.text.contains('#'));
        assert!(slots.insert(post.slot), "slot {} used twice", post.slot);
    }
}

#[tokio::test]
async fn test_dry_run_calls_no_external_api() {
    let dir = TempDir::new().unwrap();
    let x = Arc::new(RecordingX::default());
    let config = PipelineConfig {
        dry_run: true,
        ..auto(3)
    };

    let pipeline = Pipeline::new(
        config,
        ContentConfig::default(),
        DataPaths::new(dir.path()),
        Some(x.clone()),
        Arc::new(OfflineProvider::samples()),
    )
    .unwrap();
    let result = pipeline.run(None).await.unwrap();

    assert_eq!(result.scheduled.len(), 3);
    assert_eq!(x.calls(), 0);
    assert!(!dir.path().join("scheduled.json").exists());
    assert!(!dir.path().join("post_history.json").exists());
}

#[tokio::test]
async fn test_dry_run_publish_pass_sends_nothing() {
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::new(dir.path());
    let x = Arc::new(RecordingX::default());

    // Seed a schedule with a live run, then publish it as a dry run.
    let pipeline = Pipeline::new(
        auto(2),
        ContentConfig::default(),
        paths.clone(),
        Some(x.clone()),
        Arc::new(OfflineProvider::samples()),
    )
    .unwrap();
    pipeline.run(None).await.unwrap();
    let before = std::fs::read(paths.schedule()).unwrap();
    let calls = x.calls();

    let scheduler = PostScheduler::new(Some(x.clone()), &paths, Vec::new());
    let far_future = chrono::DateTime::parse_from_rfc3339("2100-01-01T00:00:00+09:00").unwrap();
    let reports = scheduler.execute_due_at(far_future, true).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.outcome.is_none()));
    assert_eq!(x.calls(), calls);
    assert_eq!(std::fs::read(paths.schedule()).unwrap(), before);
}

#[tokio::test]
async fn test_model_errors_do_not_abort_the_run() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::new(
        auto(1),
        ContentConfig::default(),
        DataPaths::new(dir.path()),
        None,
        Arc::new(FailingProvider),
    )
    .unwrap();
    let result = pipeline.run(None).await.unwrap();

    assert_eq!(result.generated, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(!dir.path().join("scheduled.json").exists());
}

#[tokio::test]
async fn test_post_now_publishes_and_records_history() {
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::new(dir.path());
    let x = Arc::new(RecordingX::default());
    let config = PipelineConfig {
        post_now: true,
        ..auto(2)
    };

    let pipeline = Pipeline::new(
        config,
        ContentConfig::default(),
        paths.clone(),
        Some(x.clone()),
        Arc::new(OfflineProvider::samples()),
    )
    .unwrap();
    let result = pipeline.run(None).await.unwrap();

    assert_eq!(result.published.len(), 2);
    assert_eq!(x.published.lock().unwrap().len(), 2);

    let history = HistoryLog::new(paths.history()).load().unwrap();
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|h| matches!(h.outcome, Outcome::Posted { .. })));
}

#[tokio::test]
async fn test_status_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let paths = DataPaths::new(dir.path());

    let pipeline = Pipeline::new(
        auto(3),
        ContentConfig::default(),
        paths.clone(),
        Some(Arc::new(RecordingX::default())),
        Arc::new(OfflineProvider::samples()),
    )
    .unwrap();
    pipeline.run(None).await.unwrap();

    let scheduler = PostScheduler::new(None, &paths, Vec::new());
    let before = std::fs::read(paths.schedule()).unwrap();

    let first = scheduler.summary().unwrap();
    let second = scheduler.summary().unwrap();

    assert_eq!(first.scheduled, 3);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(std::fs::read(paths.schedule()).unwrap(), before);
    assert!(!paths.history().exists());
}
