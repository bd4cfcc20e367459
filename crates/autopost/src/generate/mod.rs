//! Persona-constrained post generation.

mod draft;
mod engine;
mod prompts;
mod validate;

use std::path::Path;

use crate::error::AutopostResult;

pub use draft::{DraftPost, DraftStatus};
pub use engine::{pick_themes, ContentEngine, GenerationContext, MAX_REFERENCES};
pub use prompts::PromptManager;
pub use validate::{clean_output, correction_note, find_banned, validate};

/// Read the owner's idea notes, dropping `#` comment lines.
///
/// Returns `None` when the file is missing or has nothing but comments.
pub fn load_ideas(path: &Path) -> AutopostResult<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let ideas = content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    let ideas = ideas.trim();
    Ok((!ideas.is_empty()).then(|| ideas.to_string()))
}
