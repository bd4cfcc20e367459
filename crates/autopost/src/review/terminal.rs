use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input};

use crate::error::{AutopostError, AutopostResult};
use crate::generate::DraftPost;

use super::{ReviewAction, ReviewInput};

/// Interactive reviewer on the terminal.
pub struct TerminalReview {
    theme: ColorfulTheme,
}

impl TerminalReview {
    #[must_use]
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalReview {
    fn default() -> Self {
        Self::new()
    }
}

fn prompt_error(e: dialoguer::Error) -> AutopostError {
    AutopostError::Io(std::io::Error::other(e))
}

impl ReviewInput for TerminalReview {
    fn start(&mut self, total: usize) {
        println!("\n{}", "=".repeat(60));
        println!("{} ({total} 件)", "📋 投稿レビューモード（対話型）".bold());
        println!("  [a] 承認  [s] スキップ  [e] 編集  [q] 終了");
        println!("{}", "=".repeat(60));
    }

    fn action(
        &mut self,
        draft: &DraftPost,
        index: usize,
        total: usize,
    ) -> AutopostResult<ReviewAction> {
        println!(
            "\n--- [{index}/{total}] ({}文字) ---",
            draft.text.chars().count()
        );
        println!("  {}", draft.text.cyan());
        println!();

        let key: String = Input::with_theme(&self.theme)
            .with_prompt("操作 [a/s/e/q]")
            .validate_with(|input: &String| -> Result<(), &str> {
                ReviewAction::from_key(input)
                    .map(|_| ())
                    .ok_or("無効な操作です。a/s/e/q を入力してください。")
            })
            .interact_text()
            .map_err(prompt_error)?;
        // The validator only lets known keys through.
        Ok(ReviewAction::from_key(&key).unwrap_or(ReviewAction::Quit))
    }

    fn edited_text(&mut self, draft: &DraftPost) -> AutopostResult<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt("修正テキスト")
            .with_initial_text(draft.text.clone())
            .allow_empty(true)
            .interact_text()
            .map_err(prompt_error)
    }

    fn notify(&mut self, message: &str) {
        println!("  {}", message.yellow());
    }
}
