//! Automatic replies to mentions.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::{read_json, write_json, DataPaths};
use crate::error::AutopostResult;
use crate::generate::ContentEngine;
use crate::x::{Mention, XApi};

/// Mentions fetched per run.
const MENTIONS_PER_RUN: u32 = 20;

/// Progress through the mention timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyState {
    /// Newest mention with every earlier one answered.
    pub last_mention_id: Option<String>,
    /// Mentions answered past a failed one, skipped until the id catches up.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answered: Vec<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Local>>,
}

impl ReplyState {
    fn advance(&mut self, mention_id: &str) {
        self.last_mention_id = Some(mention_id.to_string());
        self.answered.retain(|id| id != mention_id);
    }
}

/// Outcome of a reply run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyReport {
    pub replied: usize,
    pub failed: usize,
}

/// Answers new mentions in the persona.
pub struct ReplyHandler {
    api: Arc<dyn XApi>,
    engine: Arc<ContentEngine>,
    state_path: PathBuf,
    style_fragment: String,
}

impl ReplyHandler {
    #[must_use]
    pub fn new(
        api: Arc<dyn XApi>,
        engine: Arc<ContentEngine>,
        paths: &DataPaths,
        style_fragment: String,
    ) -> Self {
        Self {
            api,
            engine,
            state_path: paths.reply_state(),
            style_fragment,
        }
    }

    /// Current state; a missing or unreadable file starts from scratch.
    pub fn state(&self) -> ReplyState {
        match read_json(&self.state_path) {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Reply state unreadable, starting over");
                ReplyState::default()
            }
        }
    }

    /// Reply to every mention newer than the stored id, oldest first.
    ///
    /// The stored id advances past each successful reply until the first
    /// failure. Later mentions are still answered and remembered, so the
    /// failed one is retried next run without replying twice to the others.
    /// A dry run generates replies but neither publishes them nor touches
    /// the state.
    pub async fn run(&self, dry_run: bool) -> AutopostResult<ReplyReport> {
        let mut state = self.state();
        tracing::info!(since_id = ?state.last_mention_id, "Checking mentions");

        let mut mentions = self
            .api
            .mentions(state.last_mention_id.as_deref(), MENTIONS_PER_RUN)
            .await?;
        if mentions.is_empty() {
            tracing::info!("No new mentions");
            return Ok(ReplyReport::default());
        }
        // The timeline is newest first.
        mentions.reverse();

        let mut report = ReplyReport::default();
        let mut blocked = false;
        for mention in &mentions {
            if state.answered.contains(&mention.id) {
                tracing::debug!(mention = %mention.id, "Already answered");
                if !blocked && !dry_run {
                    state.advance(&mention.id);
                    self.save(&mut state)?;
                }
                continue;
            }

            match self.reply_to(mention, dry_run).await {
                Ok(()) => {
                    report.replied += 1;
                    if dry_run {
                        continue;
                    }
                    if blocked {
                        state.answered.push(mention.id.clone());
                    } else {
                        state.advance(&mention.id);
                    }
                    self.save(&mut state)?;
                }
                Err(e) => {
                    report.failed += 1;
                    blocked = true;
                    tracing::error!(mention = %mention.id, error = %e, "Reply failed, retrying next run");
                }
            }
        }

        Ok(report)
    }

    fn save(&self, state: &mut ReplyState) -> AutopostResult<()> {
        state.last_updated = Some(Local::now());
        write_json(&self.state_path, &*state)
    }

    async fn reply_to(&self, mention: &Mention, dry_run: bool) -> AutopostResult<()> {
        let preview: String = mention.text.chars().take(30).collect();
        tracing::info!(author = %mention.author_username, text = %preview, "Generating reply");

        let reply = self
            .engine
            .generate_reply(&self.style_fragment, mention)
            .await?;

        if dry_run {
            tracing::info!(dry_run = true, mention = %mention.id, reply = %reply, "Would reply");
            return Ok(());
        }

        let published = self.api.create_post(&reply, Some(&mention.id)).await?;
        tracing::info!(post_id = %published.id, mention = %mention.id, "Reply published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::OfflineProvider;
    use crate::config::ContentConfig;
    use crate::x::testing::FakeX;
    use tempfile::TempDir;

    const REPLY: &str = "コメントありがとうございます！励みになります";

    fn mention(id: &str) -> Mention {
        Mention {
            id: id.to_string(),
            text: format!("メンション{id}です"),
            author_id: "u1".to_string(),
            author_username: "alice".to_string(),
            created_at: None,
            conversation_id: None,
        }
    }

    fn handler(dir: &TempDir, fake: Arc<FakeX>, replies: &[&str]) -> ReplyHandler {
        let provider = Arc::new(OfflineProvider::new(
            replies.iter().map(ToString::to_string).collect(),
        ));
        let engine = Arc::new(ContentEngine::new(provider, ContentConfig::default()).unwrap());
        ReplyHandler::new(fake, engine, &DataPaths::new(dir.path()), String::new())
    }

    #[tokio::test]
    async fn test_replies_oldest_first_and_advances_state() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeX {
            mentions: vec![mention("101"), mention("102"), mention("103")],
            ..FakeX::new()
        });
        let h = handler(&dir, fake.clone(), &[REPLY]);

        let report = h.run(false).await.unwrap();
        assert_eq!(report, ReplyReport { replied: 3, failed: 0 });

        let targets: Vec<_> = fake.published().into_iter().map(|(_, to)| to.unwrap()).collect();
        assert_eq!(targets, vec!["101", "102", "103"]);
        assert_eq!(h.state().last_mention_id.as_deref(), Some("103"));

        // Nothing new on the second run.
        let report = h.run(false).await.unwrap();
        assert_eq!(report, ReplyReport::default());
        assert_eq!(fake.published().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_reply_does_not_advance_state() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeX {
            mentions: vec![mention("201")],
            ..FakeX::new()
        });
        // Every attempt carries a mention and is rejected.
        let h = handler(&dir, fake.clone(), &["@alice ありがとうございます！"]);

        let report = h.run(false).await.unwrap();
        assert_eq!(report, ReplyReport { replied: 0, failed: 1 });
        assert!(fake.published().is_empty());
        assert!(h.state().last_mention_id.is_none());
    }

    #[tokio::test]
    async fn test_failed_reply_holds_state_for_retry() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeX {
            mentions: vec![mention("401"), mention("402")],
            ..FakeX::new()
        });
        let rejected = "@alice ありがとうございます！";

        // 401 burns three rejected attempts, 402 gets the valid reply.
        let h = handler(&dir, fake.clone(), &[rejected, rejected, rejected, REPLY]);
        let report = h.run(false).await.unwrap();
        assert_eq!(report, ReplyReport { replied: 1, failed: 1 });

        let state = h.state();
        assert!(state.last_mention_id.is_none());
        assert_eq!(state.answered, vec!["402".to_string()]);

        // Next run retries 401 and does not answer 402 again.
        let h = handler(&dir, fake.clone(), &[REPLY]);
        let report = h.run(false).await.unwrap();
        assert_eq!(report, ReplyReport { replied: 1, failed: 0 });

        let targets: Vec<_> = fake.published().into_iter().map(|(_, to)| to.unwrap()).collect();
        assert_eq!(targets, vec!["402", "401"]);
        let state = h.state();
        assert_eq!(state.last_mention_id.as_deref(), Some("402"));
        assert!(state.answered.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_publishes_nothing() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeX {
            mentions: vec![mention("301")],
            ..FakeX::new()
        });
        let h = handler(&dir, fake.clone(), &[REPLY]);

        let report = h.run(true).await.unwrap();
        assert_eq!(report.replied, 1);
        assert!(fake.published().is_empty());
        assert!(!dir.path().join("reply_state.json").exists());
    }
}
