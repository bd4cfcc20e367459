//! Buzz-post research.
//!
//! Collects high-engagement posts for the configured genres, tags each with a
//! structural pattern and persists the latest run.

mod collector;
mod patterns;

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{read_json, write_json};
use crate::error::AutopostResult;
use crate::x::PublicMetrics;

pub use collector::{rank_by_engagement, ResearchCollector};
pub use patterns::PostPattern;

/// A buzz post found by research.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchItem {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub metrics: PublicMetrics,
    pub genre: String,
    pub pattern: PostPattern,
}

/// Persisted research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResults {
    pub timestamp: DateTime<Local>,
    pub total_count: usize,
    pub items: Vec<ResearchItem>,
}

impl ResearchResults {
    #[must_use]
    pub fn new(items: Vec<ResearchItem>) -> Self {
        Self {
            timestamp: Local::now(),
            total_count: items.len(),
            items,
        }
    }

    /// Load the last run, or `None` if research never ran.
    pub fn load(path: &Path) -> AutopostResult<Option<Self>> {
        read_json(path)
    }

    /// Replace the stored run.
    pub fn save(&self, path: &Path) -> AutopostResult<()> {
        write_json(path, self)?;
        tracing::info!(path = %path.display(), count = self.total_count, "Research results saved");
        Ok(())
    }
}

/// Summary of a set of buzz posts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuzzAnalysis {
    pub total_analyzed: usize,
    pub avg_length: f64,
    /// Most frequent patterns, at most five.
    pub patterns: Vec<(PostPattern, usize)>,
    /// Top posts by likes, at most ten.
    pub top_posts: Vec<(String, u64)>,
}

/// Analyze lengths and pattern frequencies of buzz posts.
#[must_use]
pub fn analyze_buzz_patterns(items: &[ResearchItem]) -> BuzzAnalysis {
    if items.is_empty() {
        return BuzzAnalysis::default();
    }

    let total_chars: usize = items.iter().map(|i| i.text.chars().count()).sum();
    let avg_length = round1(total_chars as f64 / items.len() as f64);

    let mut order: Vec<PostPattern> = Vec::new();
    let mut counts: HashMap<PostPattern, usize> = HashMap::new();
    for item in items {
        let count = counts.entry(item.pattern).or_insert(0);
        if *count == 0 {
            order.push(item.pattern);
        }
        *count += 1;
    }
    let mut patterns: Vec<(PostPattern, usize)> =
        order.into_iter().map(|p| (p, counts[&p])).collect();
    patterns.sort_by(|a, b| b.1.cmp(&a.1));
    patterns.truncate(5);

    let mut by_likes: Vec<&ResearchItem> = items.iter().collect();
    by_likes.sort_by(|a, b| b.metrics.like_count.cmp(&a.metrics.like_count));
    let top_posts = by_likes
        .into_iter()
        .take(10)
        .map(|i| (i.text.clone(), i.metrics.like_count))
        .collect();

    tracing::info!(
        total = items.len(),
        patterns = counts.len(),
        "Buzz pattern analysis complete"
    );

    BuzzAnalysis {
        total_analyzed: items.len(),
        avg_length,
        patterns,
        top_posts,
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Built-in buzz posts used when search is unavailable.
#[must_use]
pub fn sample_buzz_posts() -> Vec<ResearchItem> {
    let samples: [(&str, u64, &str); 5] = [
        (
            "AIに仕事を奪われる人と、AIを使って仕事を効率化する人の差は「好奇心」だけです。新しいツールを触ることを恐れないでください。",
            5200,
            "AIマネタイズ",
        ),
        (
            "Claude 3.5 Sonnetのコーディング能力が異次元すぎる。エンジニアはコードを書く時間より、設計とレビューに時間を使うべき時代になった。",
            3800,
            "AIトレンド",
        ),
        (
            "副業で月5万稼ぐなら、プログラミングより「AI×コンテンツ制作」が一番早い。誰でもクリエイターになれる時代が来ました。",
            2100,
            "AIマネタイズ",
        ),
        (
            "「AIは人間味がない」というのは誤解です。使い手の感情や意図をどれだけプロンプトに乗せられるかで、出力される文章の温度感は劇的に変わります。",
            6500,
            "AIトレンド",
        ),
        (
            "人生を変えるのに必要なのは、才能ではなく「環境」と「ツール」です。最新のAIツールを使いこなすだけで、個人の生産性は10倍になります。",
            4200,
            "自己啓発×AI",
        ),
    ];

    samples
        .iter()
        .enumerate()
        .map(|(i, (text, likes, genre))| ResearchItem {
            id: format!("sample-{}", i + 1),
            text: (*text).to_string(),
            author_id: None,
            created_at: None,
            metrics: PublicMetrics {
                like_count: *likes,
                ..Default::default()
            },
            genre: (*genre).to_string(),
            pattern: PostPattern::detect(text),
        })
        .collect()
}
