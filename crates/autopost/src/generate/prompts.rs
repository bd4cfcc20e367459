//! Prompt template management.

use std::path::Path;

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{AutopostError, AutopostResult};

const TEMPLATES: [(&str, &str); 3] = [
    ("system", SYSTEM_TEMPLATE),
    ("post", POST_TEMPLATE),
    ("reply", REPLY_TEMPLATE),
];

/// Manages Handlebars prompt templates.
pub struct PromptManager {
    handlebars: Handlebars<'static>,
}

impl PromptManager {
    /// Create a prompt manager with the embedded templates.
    pub fn new() -> AutopostResult<Self> {
        let mut handlebars = Self::engine();
        for (name, template) in TEMPLATES {
            handlebars
                .register_template_string(name, template)
                .map_err(|e| AutopostError::Prompt(e.to_string()))?;
        }
        Ok(Self { handlebars })
    }

    /// Embedded templates, overridden by any `<name>.hbs` found in `dir`.
    pub fn from_dir(dir: &Path) -> AutopostResult<Self> {
        let mut manager = Self::new()?;
        for (name, _) in TEMPLATES {
            let path = dir.join(format!("{name}.hbs"));
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                manager
                    .handlebars
                    .register_template_string(name, &content)
                    .map_err(|e| AutopostError::Prompt(format!("{}: {e}", path.display())))?;
                tracing::debug!(template = name, "Loaded prompt override");
            }
        }
        Ok(manager)
    }

    fn engine() -> Handlebars<'static> {
        let mut handlebars = Handlebars::new();
        // Prompts are plain text; HTML escaping would mangle quotes in references.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars
    }

    /// Render a template with the given data.
    pub fn render<T: Serialize>(&self, template: &str, data: &T) -> AutopostResult<String> {
        self.handlebars
            .render(template, data)
            .map_err(|e| AutopostError::Prompt(e.to_string()))
    }
}

/// Data for the system prompt.
#[derive(Debug, Serialize)]
pub struct SystemPrompt<'a> {
    pub persona: &'a str,
    pub max_chars: usize,
    pub banned: &'a [String],
    pub style: &'a str,
}

/// A numbered reference post.
#[derive(Debug, Serialize)]
pub struct Reference<'a> {
    pub n: usize,
    pub text: &'a str,
}

/// Data for a single post request.
#[derive(Debug, Serialize)]
pub struct PostPrompt<'a> {
    pub theme: &'a str,
    pub pattern: Option<&'a str>,
    pub references: Vec<Reference<'a>>,
    pub ideas: Option<&'a str>,
    pub max_chars: usize,
}

/// Data for a reply to a mention.
#[derive(Debug, Serialize)]
pub struct ReplyPrompt<'a> {
    pub author: &'a str,
    pub text: &'a str,
    pub max_chars: usize,
}

const SYSTEM_TEMPLATE: &str = r"{{persona}}

【絶対ルール】
1. 必ず{{max_chars}}文字以内で投稿テキストのみを出力すること（説明や注釈は不要）
2. ハッシュタグ（#）は絶対に使用しない
3. 投資助言に該当する断定的表現は避ける（「買い」「売り」「必ず儲かる」等は禁止）
4. 思考法やトレンドの紹介に留め、具体的な銘柄推奨はしない
5. URLやメンションは含めない
{{#if banned}}
6. 次の表現は使用しない: {{#each banned}}「{{this}}」{{/each}}
{{/if}}

{{style}}";

const POST_TEMPLATE: &str = r"以下のテーマで、X（旧Twitter）の投稿テキストを1件だけ生成してください。

テーマ: {{theme}}
{{#if pattern}}
構成: {{pattern}}の投稿にしてください。
{{/if}}
{{#if references}}

【参考にすべきバズ投稿の構造・リズム】
{{#each references}}
参考{{n}}: {{text}}
{{/each}}

上記のバズ投稿の構造やリズムを参考にしつつ、独自の内容を生成してください。
{{/if}}
{{#if ideas}}

【発信者の最近の思考メモ】
{{ideas}}

このメモの視点を自然に織り込んでください。
{{/if}}

投稿テキストのみを出力してください（{{max_chars}}文字以内、説明不要）。";

const REPLY_TEMPLATE: &str = r"以下のメンションに、あなたのペルソナとして返信してください。

送信者: {{author}}
内容: {{text}}

【返信ルール】
- {{max_chars}}文字以内で返信テキストのみを出力すること
- 相手への感謝や共感を一言添える
- ハッシュタグ、URL、メンション（@）は含めない

返信テキストのみを出力してください。";

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_system_prompt_renders_rules_and_style() {
        let manager = PromptManager::new().unwrap();
        let banned = vec!["裏技".to_string()];
        let prompt = manager
            .render(
                "system",
                &SystemPrompt {
                    persona: "テスト用ペルソナ",
                    max_chars: 140,
                    banned: &banned,
                    style: "【文体ルール】",
                },
            )
            .unwrap();

        assert!(prompt.starts_with("テスト用ペルソナ"));
        assert!(prompt.contains("140文字以内"));
        assert!(prompt.contains("「裏技」"));
        assert!(prompt.ends_with("【文体ルール】"));
    }

    #[test]
    fn test_post_prompt_includes_references_and_ideas() {
        let manager = PromptManager::new().unwrap();
        let prompt = manager
            .render(
                "post",
                &PostPrompt {
                    theme: "AI副業",
                    pattern: Some("問いかけ型"),
                    references: vec![
                        Reference { n: 1, text: "\"引用\"を含む参考" },
                        Reference { n: 2, text: "二つ目" },
                    ],
                    ideas: Some("朝のメモ"),
                    max_chars: 140,
                },
            )
            .unwrap();

        assert!(prompt.contains("テーマ: AI副業"));
        assert!(prompt.contains("問いかけ型"));
        assert!(prompt.contains("参考1: \"引用\"を含む参考"));
        assert!(prompt.contains("参考2: 二つ目"));
        assert!(prompt.contains("朝のメモ"));
    }

    #[test]
    fn test_post_prompt_without_optional_sections() {
        let manager = PromptManager::new().unwrap();
        let prompt = manager
            .render(
                "post",
                &PostPrompt {
                    theme: "AI副業",
                    pattern: None,
                    references: Vec::new(),
                    ideas: None,
                    max_chars: 140,
                },
            )
            .unwrap();

        assert!(!prompt.contains("参考"));
        assert!(!prompt.contains("思考メモ"));
        assert!(!prompt.contains("構成"));
    }

    #[test]
    fn test_from_dir_overrides_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("reply.hbs"), "返信: {{text}}").unwrap();

        let manager = PromptManager::from_dir(dir.path()).unwrap();
        let prompt = manager
            .render(
                "reply",
                &ReplyPrompt {
                    author: "alice",
                    text: "こんにちは",
                    max_chars: 140,
                },
            )
            .unwrap();
        assert_eq!(prompt, "返信: こんにちは");
    }
}
