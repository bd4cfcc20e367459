//! Offline provider used by dry runs.
//!
//! Cycles through a fixed set of texts and never touches the network.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AutopostError, AutopostResult};

use super::provider::{AIMessage, AIProvider, AIResponse, GenerateOptions, TokenUsage};

const SAMPLE_POSTS: &[&str] = &[
    "AIを使いこなす人と使われる人の差は、問いを立てる力にある。道具より先に、自分が何を解きたいのかを決めるべきだ。",
    "仕組み化できない努力は、いずれ限界が来る。毎日の作業を一つずつAIに渡し、空いた時間を考えることに使う。",
    "情報を集める時代は終わった。これからは、集めた情報から何を捨てるかを決める人が勝つ。",
    "副業で結果が出ない理由の多くは、才能ではなく検証の回数だ。小さく試して、早く捨てる。それだけである。",
    "AIの出力に違和感を覚えたら、それはあなたの中に基準がある証拠だ。その基準こそが最大の資産である。",
];

/// Provider that replays canned texts in order.
pub struct OfflineProvider {
    texts: Vec<String>,
    cursor: AtomicUsize,
}

impl OfflineProvider {
    pub fn new(texts: Vec<String>) -> Self {
        Self {
            texts,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Provider replaying built-in posts that pass content validation.
    #[must_use]
    pub fn samples() -> Self {
        Self::new(SAMPLE_POSTS.iter().map(ToString::to_string).collect())
    }

    /// Number of texts handed out so far.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AIProvider for OfflineProvider {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn is_external(&self) -> bool {
        false
    }

    async fn generate_text(
        &self,
        model: &str,
        _messages: &[AIMessage],
        _options: &GenerateOptions,
    ) -> AutopostResult<AIResponse> {
        if self.texts.is_empty() {
            return Err(AutopostError::Config(
                "offline provider has no texts".to_string(),
            ));
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let text = self.texts[index % self.texts.len()].clone();
        tracing::debug!(dry_run = true, index, "Offline generation");

        Ok(AIResponse {
            text,
            usage: TokenUsage::default(),
            model: model.to_string(),
            provider: "offline".to_string(),
        })
    }
}
