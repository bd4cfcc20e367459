//! Lexical statistics over the account's own posts.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::research::round1;

/// Sentence-ending labels, most specific suffix first.
const ENDINGS: &[&str] = &[
    "である", "べきだ", "しかない", "だろう", "のだ", "です", "ます", "ない", "する", "こと",
    "もの", "たい", "いる", "れる", "だ",
];

const ASSERTIVE_WORDS: &[&str] = &["べき", "しかない", "絶対", "確実に"];
const REFLECTIVE_WORDS: &[&str] = &["思う", "感じる", "気づいた", "考える"];
const INSTRUCTIVE_WORDS: &[&str] = &["すべき", "してほしい", "おすすめ", "大切"];

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid URL regex"));
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+").expect("valid mention regex"));

/// How often a sentence ending occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndingStat {
    pub ending: String,
    pub count: usize,
    /// Share of all matched endings, in percent.
    pub percent: f64,
}

/// Script mixture, whitespace excluded. Percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharRatios {
    pub kanji_pct: f64,
    pub hiragana_pct: f64,
    pub katakana_pct: f64,
    pub other_pct: f64,
}

/// A recurring n-gram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseStat {
    pub phrase: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthDistribution {
    pub min: usize,
    pub max: usize,
    pub avg: f64,
    pub under_70: usize,
    pub from_70_to_100: usize,
    pub from_100_to_140: usize,
}

/// Share of posts carrying each tone marker, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneMarkers {
    pub assertive: f64,
    pub questioning: f64,
    pub reflective: f64,
    pub instructive: f64,
}

impl ToneMarkers {
    /// Tone with the highest share; earlier tones win ties.
    #[must_use]
    pub fn dominant(&self) -> &'static str {
        let tones = [
            ("assertive", self.assertive),
            ("questioning", self.questioning),
            ("reflective", self.reflective),
            ("instructive", self.instructive),
        ];
        let mut best = tones[0];
        for tone in &tones[1..] {
            if tone.1 > best.1 {
                best = *tone;
            }
        }
        best.0
    }
}

/// Stylistic profile of the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub total_posts_analyzed: usize,
    pub endings: Vec<EndingStat>,
    pub char_ratios: CharRatios,
    pub frequent_phrases: Vec<PhraseStat>,
    pub avg_length: f64,
    pub length_distribution: LengthDistribution,
    pub tone_markers: ToneMarkers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Default for StyleProfile {
    /// Assertive strategist voice used when there is no history.
    fn default() -> Self {
        let ending = |e: &str, pct: f64| EndingStat {
            ending: e.to_string(),
            count: 0,
            percent: pct,
        };
        Self {
            total_posts_analyzed: 0,
            endings: vec![
                ending("だ", 40.0),
                ending("である", 30.0),
                ending("だろう", 10.0),
                ending("ない", 15.0),
                ending("する", 5.0),
            ],
            char_ratios: CharRatios {
                kanji_pct: 40.0,
                hiragana_pct: 45.0,
                katakana_pct: 10.0,
                other_pct: 5.0,
            },
            frequent_phrases: Vec::new(),
            avg_length: 120.0,
            length_distribution: LengthDistribution {
                min: 80,
                max: 140,
                avg: 120.0,
                under_70: 0,
                from_70_to_100: 0,
                from_100_to_140: 0,
            },
            tone_markers: ToneMarkers {
                assertive: 60.0,
                questioning: 5.0,
                reflective: 15.0,
                instructive: 20.0,
            },
            note: Some("default profile (assertive strategist)".to_string()),
        }
    }
}

impl StyleProfile {
    /// Compute a profile from post texts. Empty input yields the default.
    #[must_use]
    pub fn analyze<S: AsRef<str>>(texts: &[S]) -> Self {
        let texts: Vec<&str> = texts
            .iter()
            .map(AsRef::as_ref)
            .filter(|t| !t.is_empty())
            .collect();
        if texts.is_empty() {
            tracing::warn!("No posts to analyze, using default style profile");
            return Self::default();
        }

        let lengths: Vec<usize> = texts.iter().map(|t| t.chars().count()).collect();
        let avg_length = round1(lengths.iter().sum::<usize>() as f64 / lengths.len() as f64);

        let profile = Self {
            total_posts_analyzed: texts.len(),
            endings: analyze_endings(&texts),
            char_ratios: analyze_char_ratios(&texts),
            frequent_phrases: analyze_phrases(&texts),
            avg_length,
            length_distribution: length_distribution(&lengths, avg_length),
            tone_markers: analyze_tone(&texts),
            note: None,
        };

        tracing::info!(
            posts = profile.total_posts_analyzed,
            avg_length = profile.avg_length,
            "Style analysis complete"
        );
        profile
    }

    /// Render the style rules block inserted into the system prompt.
    #[must_use]
    pub fn prompt_fragment(&self) -> String {
        let endings = if self.endings.is_empty() {
            "「だ」「である」調".to_string()
        } else {
            self.endings
                .iter()
                .take(5)
                .map(|e| format!("「{}」({}%)", e.ending, e.percent))
                .collect::<Vec<_>>()
                .join("、")
        };

        let phrases = if self.frequent_phrases.is_empty() {
            "なし".to_string()
        } else {
            self.frequent_phrases
                .iter()
                .take(5)
                .map(|p| format!("「{}」", p.phrase))
                .collect::<Vec<_>>()
                .join("、")
        };

        let tone = match self.tone_markers.dominant() {
            "assertive" => "断定的で力強い",
            "questioning" => "問いかけ型で読者に考えさせる",
            "reflective" => "内省的で落ち着いた",
            _ => "教訓的でアドバイス寄り",
        };

        format!(
            "【文体ルール】\n\
             - 語尾パターン: {endings}\n\
             - 漢字率約{}%、ひらがな率約{}%のバランスを保つ\n\
             - 口調は{tone}トーン\n\
             - 頻出フレーズ: {phrases}\n\
             - 平均文字数: {}文字前後",
            self.char_ratios.kanji_pct, self.char_ratios.hiragana_pct, self.avg_length
        )
    }
}

fn analyze_endings(texts: &[&str]) -> Vec<EndingStat> {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();

    for text in texts {
        for sentence in text.split(['。', '！', '？', '\n']) {
            let sentence = sentence.trim();
            if sentence.chars().count() < 3 {
                continue;
            }
            if let Some(label) = ENDINGS.iter().find(|e| sentence.ends_with(*e)) {
                match counts.iter_mut().find(|(l, _)| l == label) {
                    Some((_, c)) => *c += 1,
                    None => counts.push((label, 1)),
                }
            }
        }
    }

    let total = counts.iter().map(|(_, c)| c).sum::<usize>().max(1);
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(10)
        .map(|(ending, count)| EndingStat {
            ending: ending.to_string(),
            count,
            percent: round1(count as f64 / total as f64 * 100.0),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Kanji,
    Hiragana,
    Katakana,
    Other,
}

fn classify(c: char) -> Script {
    match c {
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{20000}'..='\u{2EBEF}' => {
            Script::Kanji
        }
        // Includes the prolonged sound mark and voicing marks shared with katakana.
        '\u{3041}'..='\u{309F}' | '\u{30A0}' | '\u{30FC}' => Script::Hiragana,
        '\u{30A1}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF65}'..='\u{FF9F}' => {
            Script::Katakana
        }
        _ => Script::Other,
    }
}

fn analyze_char_ratios(texts: &[&str]) -> CharRatios {
    let mut counts = [0usize; 4];
    for c in texts.iter().flat_map(|t| t.chars()).filter(|c| !c.is_whitespace()) {
        let slot = match classify(c) {
            Script::Kanji => 0,
            Script::Hiragana => 1,
            Script::Katakana => 2,
            Script::Other => 3,
        };
        counts[slot] += 1;
    }

    let total = counts.iter().sum::<usize>().max(1) as f64;
    let pct = |n: usize| round1(n as f64 / total * 100.0);
    CharRatios {
        kanji_pct: pct(counts[0]),
        hiragana_pct: pct(counts[1]),
        katakana_pct: pct(counts[2]),
        other_pct: pct(counts[3]),
    }
}

fn analyze_phrases(texts: &[&str]) -> Vec<PhraseStat> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for text in texts {
        let clean = URL_RE.replace_all(text, "");
        let clean = MENTION_RE.replace_all(&clean, "");
        let chars: Vec<char> = clean.chars().collect();

        for n in 2..=5 {
            for window in chars.windows(n) {
                if window.iter().all(|c| c.is_whitespace()) {
                    continue;
                }
                let ngram: String = window.iter().collect();
                match index.get(&ngram) {
                    Some(&i) => counts[i].1 += 1,
                    None => {
                        index.insert(ngram.clone(), counts.len());
                        counts.push((ngram, 1));
                    }
                }
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(30)
        .filter(|(phrase, count)| *count >= 3 && !is_punctuation_only(phrase))
        .take(15)
        .map(|(phrase, count)| PhraseStat { phrase, count })
        .collect()
}

fn is_punctuation_only(phrase: &str) -> bool {
    phrase
        .chars()
        .all(|c| matches!(c, '。' | '、' | '！' | '？') || c.is_whitespace())
}

fn length_distribution(lengths: &[usize], avg: f64) -> LengthDistribution {
    LengthDistribution {
        min: lengths.iter().copied().min().unwrap_or(0),
        max: lengths.iter().copied().max().unwrap_or(0),
        avg,
        under_70: lengths.iter().filter(|&&l| l < 70).count(),
        from_70_to_100: lengths.iter().filter(|&&l| (70..100).contains(&l)).count(),
        from_100_to_140: lengths.iter().filter(|&&l| (100..=140).contains(&l)).count(),
    }
}

fn analyze_tone(texts: &[&str]) -> ToneMarkers {
    let has_any = |text: &str, words: &[&str]| words.iter().any(|w| text.contains(w));
    let share = |pred: &dyn Fn(&str) -> bool| {
        let hits = texts.iter().filter(|&&t| pred(t)).count();
        round1(hits as f64 / texts.len().max(1) as f64 * 100.0)
    };

    ToneMarkers {
        assertive: share(&|t| has_any(t, ASSERTIVE_WORDS)),
        questioning: share(&|t| t.contains('？') || t.contains('?')),
        reflective: share(&|t| has_any(t, REFLECTIVE_WORDS)),
        instructive: share(&|t| has_any(t, INSTRUCTIVE_WORDS)),
    }
}
