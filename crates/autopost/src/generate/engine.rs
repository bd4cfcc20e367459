//! Post generation with validation and bounded regeneration.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::ai::{AIMessage, AIProvider, GenerateOptions};
use crate::config::{ContentConfig, MAX_POST_CHARS};
use crate::error::{AutopostError, AutopostResult, Violation};
use crate::research::{PostPattern, ResearchItem};
use crate::x::Mention;

use super::draft::DraftPost;
use super::prompts::{PostPrompt, PromptManager, Reference, ReplyPrompt, SystemPrompt};
use super::validate::{clean_output, correction_note, validate};

/// References carried into a batch; only the first few reach each prompt.
pub const MAX_REFERENCES: usize = 5;

/// References quoted in a single prompt.
const PROMPT_REFERENCES: usize = 3;

const TEMPERATURE: f32 = 0.8;
const MAX_TOKENS: u32 = 300;

/// Inputs shared by every draft of a batch.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    /// Rendered style rules from the style profile.
    pub style_fragment: String,
    /// Buzz posts, best first.
    pub references: Vec<ResearchItem>,
    /// Free-form notes from the account owner.
    pub ideas: Option<String>,
}

impl GenerationContext {
    /// Pattern hint for the `index`-th draft, cycling through the references.
    fn pattern_for(&self, index: usize) -> Option<PostPattern> {
        let refs = self.references.len().min(MAX_REFERENCES);
        (refs > 0).then(|| self.references[index % refs].pattern)
    }
}

/// Generates posts through an [`AIProvider`].
pub struct ContentEngine {
    provider: Arc<dyn AIProvider>,
    config: ContentConfig,
    prompts: PromptManager,
}

impl ContentEngine {
    pub fn new(provider: Arc<dyn AIProvider>, config: ContentConfig) -> AutopostResult<Self> {
        Ok(Self {
            provider,
            config,
            prompts: PromptManager::new()?,
        })
    }

    /// Use a prompt manager other than the embedded templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptManager) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    /// Check a text against the configured content rules.
    pub fn validate(&self, text: &str) -> Result<(), Violation> {
        validate(text, &self.config.banned_phrases)
    }

    fn system_prompt(&self, style: &str) -> AutopostResult<String> {
        self.prompts.render(
            "system",
            &SystemPrompt {
                persona: &self.config.persona,
                max_chars: MAX_POST_CHARS,
                banned: &self.config.banned_phrases,
                style,
            },
        )
    }

    fn options() -> GenerateOptions {
        GenerateOptions {
            temperature: Some(TEMPERATURE),
            max_tokens: Some(MAX_TOKENS),
        }
    }

    /// Generate one valid draft on `theme`.
    pub async fn generate_post(
        &self,
        ctx: &GenerationContext,
        theme: &str,
        pattern: Option<PostPattern>,
    ) -> AutopostResult<DraftPost> {
        let system = self.system_prompt(&ctx.style_fragment)?;
        let references = ctx
            .references
            .iter()
            .take(PROMPT_REFERENCES)
            .enumerate()
            .map(|(i, r)| Reference {
                n: i + 1,
                text: &r.text,
            })
            .collect();
        let user = self.prompts.render(
            "post",
            &PostPrompt {
                theme,
                pattern: pattern.map(PostPattern::prompt_label),
                references,
                ideas: ctx.ideas.as_deref(),
                max_chars: MAX_POST_CHARS,
            },
        )?;

        let (text, attempt) = self.generate_valid(&system, user).await?;
        tracing::info!(
            chars = text.chars().count(),
            theme,
            attempt,
            "Post generated"
        );
        Ok(DraftPost::new(text, theme, pattern))
    }

    /// Generate `count` drafts on distinct themes where possible.
    ///
    /// Failed drafts are logged and left out, so the result may be shorter.
    pub async fn generate_batch(&self, ctx: &GenerationContext, count: usize) -> Vec<DraftPost> {
        let themes = pick_themes(&self.config.themes, count, &mut rand::thread_rng());
        let mut drafts = Vec::with_capacity(count);

        for (i, theme) in themes.iter().enumerate() {
            match self.generate_post(ctx, theme, ctx.pattern_for(i)).await {
                Ok(draft) => {
                    tracing::info!(index = i + 1, total = count, "Batch draft done");
                    drafts.push(draft);
                }
                Err(e) => {
                    tracing::error!(index = i + 1, total = count, error = %e, "Batch draft failed");
                }
            }
        }

        drafts
    }

    /// Generate a reply to a mention, validated like a post.
    pub async fn generate_reply(&self, style: &str, mention: &Mention) -> AutopostResult<String> {
        let system = self.system_prompt(style)?;
        let user = self.prompts.render(
            "reply",
            &ReplyPrompt {
                author: &mention.author_username,
                text: &mention.text,
                max_chars: MAX_POST_CHARS,
            },
        )?;

        let (text, _) = self.generate_valid(&system, user).await?;
        tracing::info!(mention = %mention.id, chars = text.chars().count(), "Reply generated");
        Ok(text)
    }

    /// Call the model until the cleaned output passes validation.
    ///
    /// Each attempt is one model call. A rejected attempt appends a correction
    /// note to the prompt; after `max_retries` rejections the text is given up
    /// with [`AutopostError::RetriesExhausted`]. API errors end the loop at once.
    /// Returns the text and the attempt that produced it.
    async fn generate_valid(&self, system: &str, mut user: String) -> AutopostResult<(String, u32)> {
        let attempts = self.config.max_retries;
        let mut last = Violation::Empty;

        for attempt in 1..=attempts {
            let messages = [AIMessage::system(system), AIMessage::user(user.clone())];
            let response = self
                .provider
                .generate_text(&self.config.model, &messages, &Self::options())
                .await?;

            let text = clean_output(&response.text);
            let verdict = if text.is_empty() {
                Err(Violation::Empty)
            } else {
                self.validate(&text)
            };

            match verdict {
                Ok(()) => return Ok((text, attempt)),
                Err(violation) => {
                    tracing::warn!(attempt, issue = %violation, "Generated text rejected, retrying");
                    user.push_str(&correction_note(&violation));
                    last = violation;
                }
            }
        }

        Err(AutopostError::RetriesExhausted { attempts, last })
    }
}

/// Sample `count` themes without replacement, topping up with random picks.
pub fn pick_themes<R: Rng + ?Sized>(themes: &[String], count: usize, rng: &mut R) -> Vec<String> {
    let mut picked: Vec<String> = themes
        .choose_multiple(rng, count.min(themes.len()))
        .cloned()
        .collect();
    while picked.len() < count {
        match themes.choose(rng) {
            Some(theme) => picked.push(theme.clone()),
            None => break,
        }
    }
    picked
}
