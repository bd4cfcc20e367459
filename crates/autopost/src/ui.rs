//! Console output for the autopost CLI.

use colored::Colorize;

use autopost::schedule::{Outcome, PublishReport, ScheduledPost};

/// Print the banner.
pub fn print_banner(dry_run: bool) {
    println!();
    println!("{}", "═".repeat(60).bright_black());
    println!("{}", "🤖 autopost - X 自動投稿".cyan().bold());
    if dry_run {
        println!("  {}", "ドライラン: API は呼び出しません".yellow());
    }
    println!("{}", "═".repeat(60).bright_black());
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
    println!("{}", "─".repeat(60).bright_black());
}

pub fn print_step(message: &str) {
    println!("{} {}", "▶".cyan(), message.bold());
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message.yellow());
}

pub fn print_error(message: &str) {
    println!("{} {}", "✗".red().bold(), message.red());
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

fn preview(text: &str, chars: usize) -> String {
    let mut out: String = text.chars().take(chars).collect();
    if text.chars().count() > chars {
        out.push('…');
    }
    out
}

/// Print newly scheduled (or planned) posts.
pub fn print_scheduled(posts: &[ScheduledPost], planned: bool) {
    let verb = if planned { "予定" } else { "予約" };
    for post in posts {
        let period = post.period.map(|p| p.to_string()).unwrap_or_default();
        println!(
            "  {} {} {}",
            post.slot.format("%m/%d %H:%M").to_string().cyan(),
            format!("[{period}]").bright_black(),
            preview(&post.text, 40)
        );
    }
    println!("  {} {} 件", verb, posts.len());
}

/// Print the results of a publish pass.
pub fn print_publish_reports(reports: &[PublishReport]) {
    if reports.is_empty() {
        print_info("投稿予定のポストはありません");
        return;
    }
    for report in reports {
        let text = preview(&report.text, 40);
        match &report.outcome {
            Some(Outcome::Posted { post_id }) => print_success(&format!("投稿完了 ({post_id}): {text}")),
            Some(Outcome::Failed { error }) => print_error(&format!("投稿失敗: {text} - {error}")),
            None => print_info(&format!("[DRY RUN] 投稿予定: {text}")),
        }
    }
}
