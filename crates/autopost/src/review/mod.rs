//! Review gate between generation and scheduling.
//!
//! Every draft starts pending and ends approved, edited (approved with new
//! text) or skipped. Quitting leaves the remaining drafts pending; only
//! approved drafts leave the gate.

mod terminal;

use crate::config::MAX_POST_CHARS;
use crate::error::AutopostResult;
use crate::generate::{find_banned, DraftPost};

pub use terminal::TerminalReview;

/// Reviewer decision for one draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Skip,
    Edit,
    Quit,
}

impl ReviewAction {
    /// Parse the single-letter shortcut (`a`, `s`, `e`, `q`).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "a" => Some(Self::Approve),
            "s" => Some(Self::Skip),
            "e" => Some(Self::Edit),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Source of reviewer input.
pub trait ReviewInput {
    /// Called once before the first draft is shown.
    fn start(&mut self, _total: usize) {}

    /// Ask what to do with a draft (`index` is 1-based).
    fn action(&mut self, draft: &DraftPost, index: usize, total: usize)
        -> AutopostResult<ReviewAction>;

    /// Ask for replacement text.
    fn edited_text(&mut self, draft: &DraftPost) -> AutopostResult<String>;

    /// Tell the reviewer what happened.
    fn notify(&mut self, _message: &str) {}
}

/// Approve every draft without asking.
#[must_use]
pub fn auto_approve(mut drafts: Vec<DraftPost>) -> Vec<DraftPost> {
    for draft in &mut drafts {
        draft.approve();
    }
    tracing::info!(count = drafts.len(), "All drafts auto-approved");
    drafts
}

/// Walk the drafts through the reviewer and return the approved ones.
pub fn review_drafts(
    mut drafts: Vec<DraftPost>,
    input: &mut dyn ReviewInput,
    banned_phrases: &[String],
) -> AutopostResult<Vec<DraftPost>> {
    let total = drafts.len();
    if total == 0 {
        return Ok(drafts);
    }
    input.start(total);

    'drafts: for (i, draft) in drafts.iter_mut().enumerate() {
        loop {
            match input.action(draft, i + 1, total)? {
                ReviewAction::Approve => {
                    draft.approve();
                    input.notify("承認");
                }
                ReviewAction::Skip => {
                    draft.skip();
                    input.notify("スキップ");
                }
                ReviewAction::Edit => {
                    let text = input.edited_text(draft)?.trim().to_string();
                    let chars = text.chars().count();
                    if text.is_empty() {
                        draft.skip();
                        input.notify("空のテキストはスキップされます");
                    } else if chars > MAX_POST_CHARS {
                        input.notify(&format!("{MAX_POST_CHARS}文字を超えています ({chars}文字)"));
                        continue;
                    } else if let Some(phrase) = find_banned(&text, banned_phrases) {
                        input.notify(&format!("禁止表現「{phrase}」が含まれています"));
                        continue;
                    } else {
                        draft.edit(text);
                        input.notify(&format!("修正して承認 ({chars}文字)"));
                    }
                }
                ReviewAction::Quit => {
                    input.notify("レビュー終了");
                    tracing::info!(reviewed = i, total, "Review stopped by user");
                    break 'drafts;
                }
            }
            break;
        }
    }

    let approved: Vec<DraftPost> = drafts.into_iter().filter(DraftPost::is_approved).collect();
    let skipped = total - approved.len();
    tracing::info!(approved = approved.len(), skipped, "Review complete");
    Ok(approved)
}
