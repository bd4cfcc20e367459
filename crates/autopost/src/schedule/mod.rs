//! Slot scheduling and publishing.
//!
//! Approved drafts are assigned to the earliest free future slot and stored
//! in `scheduled.json`. A publish pass sends every due entry once and marks
//! it posted or failed; failed sends are not retried.

mod slots;
mod store;

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::config::{DataPaths, MAX_POST_CHARS};
use crate::error::{AutopostError, AutopostResult};
use crate::generate::{find_banned, DraftPost};
use crate::research::PostPattern;
use crate::x::XApi;

pub use slots::{next_free_slot, Period, Slot, DAILY_SLOTS, HORIZON_DAYS};
pub use store::{HistoryLog, HistoryRecord, Outcome, ScheduleStore};

/// Publication state of a scheduled post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Scheduled,
    Posted,
    Failed,
}

/// A post bound to a publishing time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: Uuid,
    pub draft_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub pattern: Option<PostPattern>,
    /// Slot period; `None` for immediate posts.
    #[serde(default)]
    pub period: Option<Period>,
    pub slot: DateTime<FixedOffset>,
    pub status: PostStatus,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub posted_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub post_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScheduledPost {
    fn from_draft(
        draft: &DraftPost,
        slot: DateTime<FixedOffset>,
        period: Option<Period>,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            draft_id: draft.id,
            text: draft.text.clone(),
            pattern: draft.pattern,
            period,
            slot,
            status: PostStatus::Scheduled,
            created_at: now,
            posted_at: None,
            post_id: None,
            error: None,
        }
    }

    /// Scheduled and at or past its slot.
    #[must_use]
    pub fn is_due(&self, now: DateTime<FixedOffset>) -> bool {
        self.status == PostStatus::Scheduled && self.slot <= now
    }
}

/// One entry handled by a publish pass.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub id: Uuid,
    pub text: String,
    /// `None` for dry runs.
    pub outcome: Option<Outcome>,
}

/// Counts and upcoming entries of the schedule.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSummary {
    pub scheduled: usize,
    pub posted: usize,
    pub failed: usize,
    pub total: usize,
    /// Up to three upcoming posts, earliest first.
    pub next: Vec<ScheduledPost>,
}

impl fmt::Display for ScheduleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📊 スケジュール状況")?;
        writeln!(f, "  待機中: {} 件", self.scheduled)?;
        writeln!(f, "  投稿済: {} 件", self.posted)?;
        writeln!(f, "  失敗:   {} 件", self.failed)?;
        write!(f, "  合計:   {} 件", self.total)?;
        if !self.next.is_empty() {
            write!(f, "\n\n⏰ 次の予約投稿:")?;
            for post in &self.next {
                let preview: String = post.text.chars().take(40).collect();
                write!(f, "\n  {}: {preview}", post.slot.format("%Y-%m-%d %H:%M"))?;
            }
        }
        Ok(())
    }
}

/// Schedules approved drafts and publishes them when due.
pub struct PostScheduler {
    api: Option<Arc<dyn XApi>>,
    store: ScheduleStore,
    history: HistoryLog,
    banned_phrases: Vec<String>,
}

impl PostScheduler {
    /// Without an API only dry-run publishing is possible.
    #[must_use]
    pub fn new(api: Option<Arc<dyn XApi>>, paths: &DataPaths, banned_phrases: Vec<String>) -> Self {
        Self {
            api,
            store: ScheduleStore::new(paths.schedule()),
            history: HistoryLog::new(paths.history()),
            banned_phrases,
        }
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Re-check the scheduling invariants for a draft.
    fn admissible(&self, draft: &DraftPost) -> bool {
        if !draft.is_approved() {
            tracing::warn!(draft = %draft.id, status = ?draft.status, "Draft not approved, not scheduling");
            return false;
        }
        let chars = draft.text.chars().count();
        if chars > MAX_POST_CHARS {
            tracing::warn!(draft = %draft.id, chars, "Draft too long, not scheduling");
            return false;
        }
        if let Some(phrase) = find_banned(&draft.text, &self.banned_phrases) {
            tracing::warn!(draft = %draft.id, phrase, "Draft contains banned phrase, not scheduling");
            return false;
        }
        true
    }

    /// Assign approved drafts to free slots.
    pub fn schedule_approved(&self, drafts: &[DraftPost]) -> AutopostResult<Vec<ScheduledPost>> {
        self.schedule_approved_at(drafts, Local::now().fixed_offset())
    }

    /// [`Self::schedule_approved`] with an explicit clock.
    ///
    /// Drafts that are not approved, too long, contain a banned phrase or are
    /// already in the schedule are left out. Entries assigned before a
    /// [`AutopostError::NoFreeSlot`] are still saved.
    pub fn schedule_approved_at(
        &self,
        drafts: &[DraftPost],
        now: DateTime<FixedOffset>,
    ) -> AutopostResult<Vec<ScheduledPost>> {
        let mut posts = self.store.load()?;
        let (added, failure) = self.assign(&posts, drafts, now);

        posts.extend(added.iter().cloned());
        self.store.save(&posts)?;

        match failure {
            Some(e) => Err(e),
            None => Ok(added),
        }
    }

    /// Slots the drafts would get, without touching the store.
    pub fn preview(&self, drafts: &[DraftPost]) -> AutopostResult<Vec<ScheduledPost>> {
        self.preview_at(drafts, Local::now().fixed_offset())
    }

    /// [`Self::preview`] with an explicit clock.
    pub fn preview_at(
        &self,
        drafts: &[DraftPost],
        now: DateTime<FixedOffset>,
    ) -> AutopostResult<Vec<ScheduledPost>> {
        let posts = self.store.load()?;
        match self.assign(&posts, drafts, now) {
            (_, Some(e)) => Err(e),
            (added, None) => Ok(added),
        }
    }

    /// New entries for admissible drafts, in slot order, plus the error that
    /// stopped assignment early, if any.
    fn assign(
        &self,
        existing: &[ScheduledPost],
        drafts: &[DraftPost],
        now: DateTime<FixedOffset>,
    ) -> (Vec<ScheduledPost>, Option<AutopostError>) {
        let mut occupied: HashSet<DateTime<Utc>> =
            existing.iter().map(|p| p.slot.with_timezone(&Utc)).collect();
        let known: HashSet<Uuid> = existing.iter().map(|p| p.draft_id).collect();

        let mut added = Vec::new();
        for draft in drafts {
            if known.contains(&draft.id) {
                tracing::debug!(draft = %draft.id, "Draft already scheduled");
                continue;
            }
            if !self.admissible(draft) {
                continue;
            }
            match next_free_slot(&now, &occupied) {
                Ok((slot, period)) => {
                    occupied.insert(slot.with_timezone(&Utc));
                    tracing::info!(slot = %slot, period = %period, "Slot assigned");
                    added.push(ScheduledPost::from_draft(draft, slot, Some(period), now));
                }
                Err(e) => return (added, Some(e)),
            }
        }
        (added, None)
    }

    /// Store approved drafts due immediately and publish them.
    pub async fn post_now(
        &self,
        drafts: &[DraftPost],
        dry_run: bool,
    ) -> AutopostResult<Vec<PublishReport>> {
        self.post_now_at(drafts, Local::now().fixed_offset(), dry_run).await
    }

    /// [`Self::post_now`] with an explicit clock.
    ///
    /// Each entry gets its own instant from `now` onward, one millisecond
    /// apart, so no two entries share a slot. Drafts already in the schedule
    /// are left out.
    pub async fn post_now_at(
        &self,
        drafts: &[DraftPost],
        now: DateTime<FixedOffset>,
        dry_run: bool,
    ) -> AutopostResult<Vec<PublishReport>> {
        let mut posts = self.store.load()?;
        let mut occupied: HashSet<DateTime<Utc>> =
            posts.iter().map(|p| p.slot.with_timezone(&Utc)).collect();
        let mut known: HashSet<Uuid> = posts.iter().map(|p| p.draft_id).collect();

        let mut added = Vec::new();
        let mut instant = now;
        for draft in drafts {
            if !known.insert(draft.id) {
                tracing::debug!(draft = %draft.id, "Draft already scheduled");
                continue;
            }
            if !self.admissible(draft) {
                continue;
            }
            while !occupied.insert(instant.with_timezone(&Utc)) {
                instant += TimeDelta::milliseconds(1);
            }
            added.push(ScheduledPost::from_draft(draft, instant, None, now));
        }

        if dry_run {
            // Dry runs leave the store untouched, so report straight away.
            return Ok(added
                .into_iter()
                .map(|p| {
                    tracing::info!(dry_run = true, text = %p.text, "Would publish now");
                    PublishReport {
                        id: p.id,
                        text: p.text,
                        outcome: None,
                    }
                })
                .collect());
        }

        let due_by = added.iter().map(|p| p.slot).max().unwrap_or(now);
        posts.extend(added);
        self.store.save(&posts)?;
        self.execute_due_at(due_by, false).await
    }

    /// Publish every due entry once.
    pub async fn execute_due(&self, dry_run: bool) -> AutopostResult<Vec<PublishReport>> {
        self.execute_due_at(Local::now().fixed_offset(), dry_run).await
    }

    /// [`Self::execute_due`] with an explicit clock.
    ///
    /// A dry run only logs what would be sent and changes nothing on disk.
    pub async fn execute_due_at(
        &self,
        now: DateTime<FixedOffset>,
        dry_run: bool,
    ) -> AutopostResult<Vec<PublishReport>> {
        let mut posts = self.store.load()?;
        let due: Vec<usize> = (0..posts.len()).filter(|&i| posts[i].is_due(now)).collect();
        if due.is_empty() {
            tracing::debug!("No scheduled posts due");
            return Ok(Vec::new());
        }

        if dry_run {
            return Ok(due
                .into_iter()
                .map(|i| {
                    let post = &posts[i];
                    tracing::info!(dry_run = true, slot = %post.slot, text = %post.text, "Would publish");
                    PublishReport {
                        id: post.id,
                        text: post.text.clone(),
                        outcome: None,
                    }
                })
                .collect());
        }

        let api = self
            .api
            .as_ref()
            .ok_or_else(|| AutopostError::Config("X API client not configured".into()))?;

        let mut reports = Vec::with_capacity(due.len());
        let mut records = Vec::with_capacity(due.len());
        for i in due {
            let post = &mut posts[i];
            let outcome = match api.create_post(&post.text, None).await {
                Ok(published) => {
                    tracing::info!(post_id = %published.id, slot = %post.slot, "Post published");
                    post.status = PostStatus::Posted;
                    post.posted_at = Some(now);
                    post.post_id = Some(published.id.clone());
                    Outcome::Posted {
                        post_id: published.id,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, slot = %post.slot, "Publish failed");
                    post.status = PostStatus::Failed;
                    post.error = Some(e.to_string());
                    Outcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            records.push(HistoryRecord {
                text: post.text.clone(),
                timestamp: now,
                outcome: outcome.clone(),
            });
            reports.push(PublishReport {
                id: post.id,
                text: post.text.clone(),
                outcome: Some(outcome),
            });
        }

        self.store.save(&posts)?;
        self.history.append(&records)?;
        Ok(reports)
    }

    /// Run publish passes every `interval` until Ctrl-C.
    pub async fn run_daemon(&self, interval: Duration, dry_run: bool) -> AutopostResult<()> {
        self.run_until(interval, dry_run, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run publish passes every `interval` until `shutdown` completes.
    ///
    /// Errors of a single pass are logged and the loop keeps going.
    pub async fn run_until<F>(&self, interval: Duration, dry_run: bool, shutdown: F) -> AutopostResult<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(interval_secs = interval.as_secs(), dry_run, "Scheduler daemon started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("Scheduler daemon stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.execute_due(dry_run).await {
                        Ok(reports) if !reports.is_empty() => {
                            tracing::info!(count = reports.len(), "Publish pass done");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Publish pass failed"),
                    }
                }
            }
        }
    }

    /// Counts and the next three scheduled posts. Never writes.
    pub fn summary(&self) -> AutopostResult<ScheduleSummary> {
        let posts = self.store.load()?;
        let count = |s: PostStatus| posts.iter().filter(|p| p.status == s).count();

        let mut next: Vec<ScheduledPost> = posts
            .iter()
            .filter(|p| p.status == PostStatus::Scheduled)
            .cloned()
            .collect();
        next.sort_by_key(|p| p.slot);
        next.truncate(3);

        Ok(ScheduleSummary {
            scheduled: count(PostStatus::Scheduled),
            posted: count(PostStatus::Posted),
            failed: count(PostStatus::Failed),
            total: posts.len(),
            next,
        })
    }

    /// Drop posted and failed entries. Returns how many were removed.
    pub fn clear_completed(&self) -> AutopostResult<usize> {
        self.retain(|p| p.status == PostStatus::Scheduled, "completed")
    }

    /// Drop entries not yet published. Returns how many were removed.
    pub fn clear_pending(&self) -> AutopostResult<usize> {
        self.retain(|p| p.status != PostStatus::Scheduled, "pending")
    }

    fn retain(&self, keep: impl Fn(&ScheduledPost) -> bool, what: &str) -> AutopostResult<usize> {
        let mut posts = self.store.load()?;
        let before = posts.len();
        posts.retain(keep);
        let removed = before - posts.len();
        self.store.save(&posts)?;
        tracing::info!(removed, kind = what, "Schedule cleared");
        Ok(removed)
    }
}
