//! Output cleaning and content validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{MAX_POST_CHARS, MIN_POST_CHARS};
use crate::error::Violation;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://").expect("valid URL regex"));
static EDGE_STARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*+|\*+$").expect("valid markdown regex"));
static NUMBERING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[.)]\s*").expect("valid numbering regex"));

const WRAPPING_CHARS: &[char] = &['"', '\'', '「', '」', '『', '』'];

/// Strip model decoration from a generated post.
///
/// Removes wrapping quotes and brackets, markdown emphasis at the edges and a
/// leading list number, then keeps the first non-empty line.
#[must_use]
pub fn clean_output(raw: &str) -> String {
    let text = raw.trim().trim_matches(WRAPPING_CHARS);
    let text = EDGE_STARS_RE.replace_all(text, "");
    let text = NUMBERING_RE.replace(&text, "");

    let text = if text.contains('\n') {
        text.lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or(text.as_ref())
            .to_string()
    } else {
        text.into_owned()
    };
    text.trim().to_string()
}

/// Check a post against every content rule, in a fixed order.
pub fn validate(text: &str, banned_phrases: &[String]) -> Result<(), Violation> {
    let chars = text.chars().count();
    if chars > MAX_POST_CHARS {
        return Err(Violation::TooLong {
            chars,
            max: MAX_POST_CHARS,
        });
    }
    if chars < MIN_POST_CHARS {
        return Err(Violation::TooShort {
            chars,
            min: MIN_POST_CHARS,
        });
    }
    if text.contains('#') || text.contains('＃') {
        return Err(Violation::Hashtag);
    }
    if let Some(phrase) = find_banned(text, banned_phrases) {
        return Err(Violation::BannedPhrase(phrase.to_string()));
    }
    if URL_RE.is_match(text) {
        return Err(Violation::Url);
    }
    if text.contains('@') {
        return Err(Violation::Mention);
    }
    Ok(())
}

/// First banned phrase contained in `text`.
pub fn find_banned<'a>(text: &str, banned_phrases: &'a [String]) -> Option<&'a str> {
    banned_phrases
        .iter()
        .find(|p| !p.is_empty() && text.contains(p.as_str()))
        .map(String::as_str)
}

/// Note appended to the user prompt after a rejected attempt.
#[must_use]
pub fn correction_note(violation: &Violation) -> String {
    let issue = match violation {
        Violation::TooLong { chars, .. } => format!("文字数超過 ({chars}文字)"),
        Violation::TooShort { chars, .. } => format!("文字数不足 ({chars}文字)"),
        Violation::Hashtag => "ハッシュタグが含まれています".to_string(),
        Violation::BannedPhrase(p) => format!("禁止表現「{p}」が含まれています"),
        Violation::Url => "URLが含まれています".to_string(),
        Violation::Mention => "メンションが含まれています".to_string(),
        Violation::Empty => "出力が空です".to_string(),
    };
    format!(
        "\n\n※前回の生成では「{issue}」問題がありました。必ず{MAX_POST_CHARS}文字以内にしてください。"
    )
}
