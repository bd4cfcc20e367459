//! Autopost CLI - research, generate, review, schedule and publish X posts.

mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use dialoguer::{theme::ColorfulTheme, Confirm};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autopost::ai::{AIProvider, AnthropicProvider, OfflineProvider};
use autopost::config::{ContentConfig, DataPaths};
use autopost::engage::{LikeHandler, ReplyHandler};
use autopost::generate::ContentEngine;
use autopost::pipeline::{Pipeline, PipelineConfig};
use autopost::review::{ReviewInput, TerminalReview};
use autopost::schedule::PostScheduler;
use autopost::style::StyleProfiler;
use autopost::x::{XApi, XClient};

/// Autopost CLI - Automate posting for a single X account.
#[derive(Parser)]
#[command(name = "autopost")]
#[command(about = "X account automation: buzz research, generation, review and scheduling")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Generate drafts, review them and schedule the approved ones
    #[arg(long)]
    generate: bool,

    /// Approve every draft without review
    #[arg(long)]
    auto: bool,

    /// Number of drafts to generate
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Call no external API and write no schedule
    #[arg(long)]
    dry_run: bool,

    /// Run the publish loop until Ctrl-C
    #[arg(long)]
    run: bool,

    /// Show the schedule summary
    #[arg(long)]
    status: bool,

    /// Remove posted and failed entries from the schedule
    #[arg(long)]
    clear: bool,

    /// Remove entries not yet published from the schedule
    #[arg(long)]
    clear_pending: bool,

    /// Generate and publish immediately instead of scheduling
    #[arg(long)]
    post_now: bool,

    /// Publish due posts once and exit
    #[arg(long)]
    execute_scheduled: bool,

    /// Publish due posts once, run the like pass and exit
    #[arg(long)]
    cron: bool,

    /// Reply to new mentions
    #[arg(long)]
    reply: bool,

    /// Like recent posts for the engagement keywords
    #[arg(long)]
    engage: bool,

    /// Rebuild the style profile from the account's posts
    #[arg(long)]
    reanalyze: bool,

    /// State directory (default: $AUTOPOST_DATA_DIR or ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Content config file (default: ./autopost.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// One-shot passes, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Execute,
    Reply,
    Engage,
}

impl Cli {
    fn passes(&self) -> Vec<Pass> {
        let mut passes = Vec::new();
        if self.execute_scheduled || self.cron {
            passes.push(Pass::Execute);
        }
        if self.reply {
            passes.push(Pass::Reply);
        }
        if self.engage || self.cron {
            passes.push(Pass::Engage);
        }
        passes
    }

    /// Whether to offer publishing due posts right after an interactive schedule.
    fn offers_publish(&self, dry_run: bool, scheduled: usize) -> bool {
        !self.auto && !self.post_now && !dry_run && scheduled > 0
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("autopost=debug,info")
        } else {
            EnvFilter::new("autopost=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let content = ContentConfig::load(cli.config.as_deref()).context("Failed to load content config")?;
    let paths = DataPaths::resolve(cli.data_dir.clone());
    tracing::debug!(data_dir = %paths.root().display(), model = %content.model, "Configuration loaded");

    if cli.status {
        return run_status(&content, &paths);
    }
    if cli.clear || cli.clear_pending {
        return run_clear(&cli, &content, &paths);
    }

    let wants_generate = cli.generate || cli.post_now;
    let wants_action = wants_generate
        || cli.run
        || cli.execute_scheduled
        || cli.cron
        || cli.reply
        || cli.engage
        || cli.reanalyze;
    if !wants_action {
        Cli::command().print_help()?;
        return Ok(());
    }

    let api = connect_x(cli.dry_run);
    let dry_run = cli.dry_run || api.is_none();
    ui::print_banner(dry_run);

    let passes = cli.passes();
    if !passes.is_empty() {
        for pass in passes {
            match pass {
                Pass::Execute => run_execute(&content, &paths, api.clone(), cli.dry_run).await?,
                Pass::Reply => run_reply(&content, &paths, api.clone(), cli.dry_run).await?,
                Pass::Engage => run_engage(&content, api.clone(), cli.dry_run).await?,
            }
        }
        return Ok(());
    }

    if cli.run {
        return run_daemon(&content, &paths, api, cli.dry_run).await;
    }

    if wants_generate {
        return run_generate(&cli, content, paths, api, dry_run).await;
    }

    // Only --reanalyze remains.
    let profile = StyleProfiler::new(api, paths).rebuild().await?;
    if profile.total_posts_analyzed == 0 {
        ui::print_warning("分析できる投稿がありません - 既定の文体を使います");
        return Ok(());
    }
    ui::print_success(&format!(
        "文体プロファイルを更新しました ({} 件分析, トーン: {})",
        profile.total_posts_analyzed,
        profile.tone_markers.dominant()
    ));
    Ok(())
}

/// X client from the environment, or `None` for dry runs and missing credentials.
fn connect_x(dry_run: bool) -> Option<Arc<dyn XApi>> {
    if dry_run {
        return None;
    }
    match XClient::from_env() {
        Ok(client) => {
            tracing::info!(username = client.username(), "X API client ready");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "X API unavailable");
            ui::print_warning(&format!("{e} - ドライランで実行します"));
            None
        }
    }
}

/// Language-model provider: offline samples for dry runs, Anthropic otherwise.
fn provider(dry_run: bool) -> Result<Arc<dyn AIProvider>> {
    if dry_run {
        return Ok(Arc::new(OfflineProvider::samples()));
    }
    let provider = AnthropicProvider::from_env().context("Failed to create Anthropic provider")?;
    Ok(Arc::new(provider))
}

fn run_status(content: &ContentConfig, paths: &DataPaths) -> Result<()> {
    let summary = PostScheduler::new(None, paths, content.banned_phrases.clone()).summary()?;
    println!("{summary}");
    Ok(())
}

fn run_clear(cli: &Cli, content: &ContentConfig, paths: &DataPaths) -> Result<()> {
    let scheduler = PostScheduler::new(None, paths, content.banned_phrases.clone());
    if cli.clear {
        let removed = scheduler.clear_completed()?;
        ui::print_success(&format!("投稿済み・失敗を {removed} 件削除しました"));
    }
    if cli.clear_pending {
        let removed = scheduler.clear_pending()?;
        ui::print_success(&format!("予約待ちを {removed} 件削除しました"));
    }
    Ok(())
}

async fn run_execute(
    content: &ContentConfig,
    paths: &DataPaths,
    api: Option<Arc<dyn XApi>>,
    dry_run: bool,
) -> Result<()> {
    if api.is_none() && !dry_run {
        bail!("Publishing requires X API credentials (or use --dry-run)");
    }
    ui::print_section("📤 予約投稿の実行");
    let scheduler = PostScheduler::new(api, paths, content.banned_phrases.clone());
    let reports = scheduler.execute_due(dry_run).await?;
    ui::print_publish_reports(&reports);
    Ok(())
}

async fn run_daemon(
    content: &ContentConfig,
    paths: &DataPaths,
    api: Option<Arc<dyn XApi>>,
    dry_run: bool,
) -> Result<()> {
    if api.is_none() && !dry_run {
        bail!("The publish loop requires X API credentials (or use --dry-run)");
    }
    let scheduler = PostScheduler::new(api, paths, content.banned_phrases.clone());
    println!("{}", scheduler.summary()?);
    ui::print_section("🔄 スケジューラー起動");
    ui::print_info(&format!(
        "{} 秒ごとに確認します (Ctrl-C で停止)",
        content.poll_interval_secs
    ));
    scheduler.run_daemon(content.poll_interval(), dry_run).await?;
    ui::print_success("スケジューラーを停止しました");
    Ok(())
}

async fn run_reply(
    content: &ContentConfig,
    paths: &DataPaths,
    api: Option<Arc<dyn XApi>>,
    dry_run: bool,
) -> Result<()> {
    let Some(api) = api else {
        ui::print_warning("リプライには X API が必要です");
        return Ok(());
    };
    ui::print_section("💬 メンションへの返信");

    let style = StyleProfiler::new(Some(api.clone()), paths.clone())
        .profile(false)
        .await?;
    let engine = Arc::new(ContentEngine::new(provider(dry_run)?, content.clone())?);
    let handler = ReplyHandler::new(api, engine, paths, style.prompt_fragment());

    let report = handler.run(dry_run).await?;
    ui::print_success(&format!("返信 {} 件 (失敗 {} 件)", report.replied, report.failed));
    Ok(())
}

async fn run_engage(content: &ContentConfig, api: Option<Arc<dyn XApi>>, dry_run: bool) -> Result<()> {
    let Some(api) = api else {
        ui::print_warning("いいねには X API が必要です");
        return Ok(());
    };
    ui::print_section("❤️ キーワードいいね");

    let liked = LikeHandler::new(api, content).run(dry_run).await?;
    ui::print_success(&format!("いいね {liked} 件"));
    Ok(())
}

async fn run_generate(
    cli: &Cli,
    content: ContentConfig,
    paths: DataPaths,
    api: Option<Arc<dyn XApi>>,
    dry_run: bool,
) -> Result<()> {
    let theme = ColorfulTheme::default();
    let interactive = !cli.auto;

    let reanalyze_style = if cli.reanalyze || !paths.style_profile().exists() {
        cli.reanalyze
    } else if interactive {
        Confirm::with_theme(&theme)
            .with_prompt("文体プロファイルを再分析しますか？")
            .default(false)
            .interact()?
    } else {
        false
    };

    let refresh_research = if interactive && paths.research().exists() {
        Confirm::with_theme(&theme)
            .with_prompt("バズ投稿のリサーチをやり直しますか？")
            .default(true)
            .interact()?
    } else {
        true
    };

    let config = PipelineConfig {
        count: cli.count as usize,
        auto: cli.auto,
        dry_run,
        post_now: cli.post_now,
        reanalyze_style,
        refresh_research,
    };
    tracing::info!(
        count = config.count,
        auto = config.auto,
        dry_run,
        post_now = config.post_now,
        "Starting generation"
    );

    ui::print_section("✍️ 投稿の生成");
    ui::print_step(&format!("{} 件のドラフトを生成します", config.count));

    let banned = content.banned_phrases.clone();
    let pipeline = Pipeline::new(config, content, paths.clone(), api.clone(), provider(dry_run)?)?;
    let mut terminal = interactive.then(TerminalReview::new);
    let reviewer = terminal.as_mut().map(|t| t as &mut dyn ReviewInput);
    let result = pipeline.run(reviewer).await?;

    ui::print_section("📊 結果");
    ui::print_info(&format!(
        "生成 {} 件 / 承認 {} 件",
        result.generated, result.approved
    ));
    if cli.post_now {
        ui::print_publish_reports(&result.published);
    } else if !result.scheduled.is_empty() {
        ui::print_scheduled(&result.scheduled, dry_run);
    }
    for error in &result.errors {
        ui::print_warning(error);
    }

    if cli.offers_publish(dry_run, result.scheduled.len())
        && Confirm::with_theme(&theme)
            .with_prompt("今すぐ予約投稿を実行しますか？")
            .default(false)
            .interact()?
    {
        ui::print_section("📤 予約投稿の実行");
        let reports = PostScheduler::new(api, &paths, banned).execute_due(false).await?;
        ui::print_publish_reports(&reports);
    }
    Ok(())
}
