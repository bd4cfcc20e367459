//! Structural pattern classification for buzz posts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural pattern of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostPattern {
    /// Ends with a question to the reader.
    Question,
    /// Declarative "you should / there is only" statement.
    Assertive,
    /// Enumerates points.
    List,
    /// Sets two ideas against each other.
    Contrast,
    /// First-person experience.
    Experience,
    /// Short one-sentence maxim.
    Aphorism,
    /// Anything else.
    Other,
}

const ASSERTIVE_MARKERS: &[&str] = &["べき", "しかない", "それだけ"];
const LIST_MARKERS: &[&str] = &["①", "②", "１", "２", "・"];
const CONTRAST_MARKERS: &[&str] = &["しかし", "でも", "一方で", "ところが"];
const EXPERIENCE_MARKERS: &[&str] = &["私は", "僕は", "実際に", "経験上"];

/// Posts shorter than this that end in a full stop read as maxims.
const APHORISM_MAX_CHARS: usize = 60;

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

impl PostPattern {
    /// Classify a post. Rules are checked in order; the first match wins.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.ends_with('？') || text.ends_with('?') {
            return PostPattern::Question;
        }
        if text.ends_with('。') && contains_any(text, ASSERTIVE_MARKERS) {
            return PostPattern::Assertive;
        }
        if contains_any(text, LIST_MARKERS) {
            return PostPattern::List;
        }
        if contains_any(text, CONTRAST_MARKERS) {
            return PostPattern::Contrast;
        }
        if contains_any(text, EXPERIENCE_MARKERS) {
            return PostPattern::Experience;
        }
        if text.chars().count() < APHORISM_MAX_CHARS && text.ends_with('。') {
            return PostPattern::Aphorism;
        }
        PostPattern::Other
    }

    /// Name used inside generation prompts.
    #[must_use]
    pub fn prompt_label(self) -> &'static str {
        match self {
            PostPattern::Question => "問いかけ型",
            PostPattern::Assertive => "断言型",
            PostPattern::List => "リスト型",
            PostPattern::Contrast => "対比型",
            PostPattern::Experience => "体験型",
            PostPattern::Aphorism => "格言型",
            PostPattern::Other => "自由型",
        }
    }
}

impl fmt::Display for PostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PostPattern::Question => "question",
            PostPattern::Assertive => "assertive",
            PostPattern::List => "list",
            PostPattern::Contrast => "contrast",
            PostPattern::Experience => "experience",
            PostPattern::Aphorism => "aphorism",
            PostPattern::Other => "other",
        };
        write!(f, "{s}")
    }
}
