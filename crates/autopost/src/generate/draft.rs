use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::research::PostPattern;

/// Review status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    Approved,
    Skipped,
    /// Replaced by reviewer text and approved.
    Edited,
}

/// A generated post awaiting review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPost {
    pub id: Uuid,
    pub text: String,
    pub theme: String,
    /// Pattern of the reference post the draft was modelled on.
    pub pattern: Option<PostPattern>,
    pub status: DraftStatus,
}

impl DraftPost {
    #[must_use]
    pub fn new(text: String, theme: impl Into<String>, pattern: Option<PostPattern>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            theme: theme.into(),
            pattern,
            status: DraftStatus::Pending,
        }
    }

    pub fn approve(&mut self) {
        self.status = DraftStatus::Approved;
    }

    pub fn skip(&mut self) {
        self.status = DraftStatus::Skipped;
    }

    /// Replace the text with reviewer input; the draft counts as approved.
    pub fn edit(&mut self, text: String) {
        self.text = text;
        self.status = DraftStatus::Edited;
    }

    /// Whether the draft may be scheduled.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        matches!(self.status, DraftStatus::Approved | DraftStatus::Edited)
    }
}
