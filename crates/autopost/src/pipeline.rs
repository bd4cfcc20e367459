//! Generate pipeline - orchestrates the style-research-generate-review-schedule flow.

use std::sync::Arc;

use crate::ai::AIProvider;
use crate::config::{ContentConfig, DataPaths};
use crate::error::AutopostResult;
use crate::generate::{load_ideas, ContentEngine, GenerationContext, MAX_REFERENCES};
use crate::research::{
    analyze_buzz_patterns, sample_buzz_posts, ResearchCollector, ResearchItem, ResearchResults,
};
use crate::review::{auto_approve, review_drafts, ReviewInput};
use crate::schedule::{PostScheduler, PublishReport, ScheduledPost};
use crate::style::{StyleProfile, StyleProfiler};
use crate::x::XApi;

/// Options for one generate run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Drafts to generate.
    pub count: usize,
    /// Approve every draft without review.
    pub auto: bool,
    /// Use no external API and write no schedule.
    pub dry_run: bool,
    /// Publish approved drafts right away instead of scheduling them.
    pub post_now: bool,
    /// Rebuild the style profile even when one is saved.
    pub reanalyze_style: bool,
    /// Search again instead of reusing saved research.
    pub refresh_research: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            count: 10,
            auto: false,
            dry_run: false,
            post_now: false,
            reanalyze_style: false,
            refresh_research: true,
        }
    }
}

/// Result of a generate run.
#[derive(Debug, Default)]
pub struct GenerateResult {
    /// Drafts that passed validation.
    pub generated: usize,
    /// Drafts approved in review.
    pub approved: usize,
    /// Entries added to the schedule (planned only, for dry runs).
    pub scheduled: Vec<ScheduledPost>,
    /// Immediate publish results.
    pub published: Vec<PublishReport>,
    /// Errors encountered.
    pub errors: Vec<String>,
}

/// Generate pipeline orchestrator.
pub struct Pipeline {
    config: PipelineConfig,
    content: ContentConfig,
    paths: DataPaths,
    api: Option<Arc<dyn XApi>>,
    engine: ContentEngine,
}

impl Pipeline {
    /// Create a new pipeline. Without an API client research and style work
    /// from samples and caches only.
    pub fn new(
        config: PipelineConfig,
        content: ContentConfig,
        paths: DataPaths,
        api: Option<Arc<dyn XApi>>,
        provider: Arc<dyn AIProvider>,
    ) -> AutopostResult<Self> {
        if config.dry_run && provider.is_external() {
            tracing::warn!(provider = provider.name(), "Dry run with an external provider");
        }
        let engine = ContentEngine::new(provider, content.clone())?;
        Ok(Self {
            config,
            content,
            paths,
            api,
            engine,
        })
    }

    /// The API client, unless this is a dry run.
    fn live_api(&self) -> Option<Arc<dyn XApi>> {
        if self.config.dry_run {
            None
        } else {
            self.api.clone()
        }
    }

    /// Saved or freshly built style profile.
    pub async fn style(&self) -> AutopostResult<StyleProfile> {
        StyleProfiler::new(self.live_api(), self.paths.clone())
            .profile(self.config.reanalyze_style)
            .await
    }

    /// Buzz posts to draw references from, best first.
    ///
    /// Falls back to the built-in samples when search is unavailable, fails
    /// or finds nothing.
    pub async fn research(&self) -> AutopostResult<Vec<ResearchItem>> {
        let path = self.paths.research();

        if !self.config.refresh_research {
            if let Some(saved) = ResearchResults::load(&path)? {
                if !saved.items.is_empty() {
                    tracing::info!(count = saved.items.len(), "Using saved research");
                    return Ok(saved.items);
                }
            }
        }

        let Some(api) = self.live_api() else {
            tracing::info!(dry_run = self.config.dry_run, "No X API, using sample buzz posts");
            return Ok(sample_buzz_posts());
        };

        match ResearchCollector::new(api, self.content.clone())
            .collect_all()
            .await
        {
            Ok(items) if !items.is_empty() => {
                ResearchResults::new(items.clone()).save(&path)?;
                Ok(items)
            }
            Ok(_) => {
                tracing::warn!("Research found no buzz posts, using samples");
                Ok(sample_buzz_posts())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Research failed, using samples");
                Ok(sample_buzz_posts())
            }
        }
    }

    /// Run the whole flow. `reviewer` is ignored in auto mode.
    pub async fn run(&self, reviewer: Option<&mut dyn ReviewInput>) -> AutopostResult<GenerateResult> {
        let mut result = GenerateResult::default();
        tracing::info!(
            count = self.config.count,
            auto = self.config.auto,
            dry_run = self.config.dry_run,
            "Starting generate run"
        );

        // Style
        let style = self.style().await?;
        tracing::info!(
            posts = style.total_posts_analyzed,
            tone = style.tone_markers.dominant(),
            "Style profile ready"
        );

        // Research
        let mut references = self.research().await?;
        let analysis = analyze_buzz_patterns(&references);
        if let Some((pattern, count)) = analysis.patterns.first() {
            tracing::info!(pattern = ?pattern, count, avg_length = analysis.avg_length, "Top buzz pattern");
        }
        references.truncate(MAX_REFERENCES);

        let ideas = match load_ideas(&self.paths.ideas()) {
            Ok(ideas) => ideas,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read ideas, continuing without");
                None
            }
        };

        // Generate
        let ctx = GenerationContext {
            style_fragment: style.prompt_fragment(),
            references,
            ideas,
        };
        let drafts = self.engine.generate_batch(&ctx, self.config.count).await;
        result.generated = drafts.len();
        if drafts.len() < self.config.count {
            result.errors.push(format!(
                "{} of {} drafts failed to generate",
                self.config.count - drafts.len(),
                self.config.count
            ));
        }
        if drafts.is_empty() {
            tracing::warn!("No drafts generated");
            return Ok(result);
        }

        // Review
        let approved = match reviewer {
            Some(input) if !self.config.auto => {
                review_drafts(drafts, input, &self.content.banned_phrases)?
            }
            _ => auto_approve(drafts),
        };
        result.approved = approved.len();
        if approved.is_empty() {
            tracing::info!("No drafts approved");
            return Ok(result);
        }

        // Schedule or publish
        let scheduler = PostScheduler::new(
            self.live_api(),
            &self.paths,
            self.content.banned_phrases.clone(),
        );
        if self.config.post_now {
            result.published = scheduler.post_now(&approved, self.config.dry_run).await?;
        } else {
            let scheduled = if self.config.dry_run {
                scheduler.preview(&approved)
            } else {
                scheduler.schedule_approved(&approved)
            };
            match scheduled {
                Ok(posts) => result.scheduled = posts,
                Err(e) => {
                    tracing::error!(error = %e, "Scheduling stopped early");
                    result.errors.push(e.to_string());
                }
            }
        }

        tracing::info!(
            generated = result.generated,
            approved = result.approved,
            scheduled = result.scheduled.len(),
            published = result.published.len(),
            errors = result.errors.len(),
            "Generate run complete"
        );
        Ok(result)
    }
}
