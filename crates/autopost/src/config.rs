//! Configuration for autopost.
//!
//! Two layers:
//! - [`XCredentials`]: API keys, always read from the environment.
//! - [`ContentConfig`]: persona, themes, banned phrases, research keywords and
//!   tuning knobs. Built-in defaults, optionally overridden by a TOML file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AutopostError, AutopostResult};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "autopost.toml";

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default account handle.
pub const DEFAULT_USERNAME: &str = "3m6LGY8PTkQKx63";

/// Default model for generation.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Maximum post length in characters.
pub const MAX_POST_CHARS: usize = 140;

/// Minimum post length in characters.
pub const MIN_POST_CHARS: usize = 10;

/// Number of own posts sampled for the style profile.
pub const STYLE_SAMPLE_SIZE: usize = 50;

/// X API credentials.
///
/// # Environment Variables
/// - `X_API_KEY`, `X_API_SECRET`: consumer key pair
/// - `X_ACCESS_TOKEN`, `X_ACCESS_TOKEN_SECRET`: user access token pair
/// - `X_BEARER_TOKEN`: app-only bearer token for reads
/// - `X_USERNAME`: account handle (default: 3m6LGY8PTkQKx63)
#[derive(Debug, Clone)]
pub struct XCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub bearer_token: String,
    pub username: String,
}

impl XCredentials {
    /// Read X credentials, naming every missing variable in the error.
    pub fn from_env() -> AutopostResult<Self> {
        let vars = [
            "X_API_KEY",
            "X_API_SECRET",
            "X_ACCESS_TOKEN",
            "X_ACCESS_TOKEN_SECRET",
            "X_BEARER_TOKEN",
        ];
        let values: Vec<Option<String>> = vars
            .iter()
            .map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
            .collect();

        let missing: Vec<&str> = vars
            .iter()
            .zip(&values)
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(AutopostError::Config(format!(
                "missing X API credentials: {}",
                missing.join(", ")
            )));
        }

        let mut values = values.into_iter().flatten();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            api_key: next(),
            api_secret: next(),
            access_token: next(),
            access_token_secret: next(),
            bearer_token: next(),
            username: std::env::var("X_USERNAME").unwrap_or_else(|_| DEFAULT_USERNAME.to_string()),
        })
    }
}

/// Persona, content rules and tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Persona description placed at the top of the system prompt.
    pub persona: String,
    /// Topics drawn for each generated post.
    pub themes: Vec<String>,
    /// Phrases no post may contain.
    pub banned_phrases: Vec<String>,
    /// Research genres mapped to their search keywords.
    pub research_genres: BTreeMap<String, Vec<String>>,
    /// Minimum likes for a searched post to count as a buzz post.
    pub buzz_threshold_likes: u64,
    /// Results requested per research keyword.
    pub results_per_keyword: u32,
    /// Keywords searched by the like pass.
    pub engagement_keywords: Vec<String>,
    /// Likes per engagement keyword.
    pub likes_per_keyword: usize,
    /// Generation attempts per draft.
    pub max_retries: u32,
    /// Publish loop interval in seconds.
    pub poll_interval_secs: u64,
    /// Language model used for generation.
    pub model: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            themes: DEFAULT_THEMES.iter().map(ToString::to_string).collect(),
            banned_phrases: DEFAULT_BANNED_PHRASES
                .iter()
                .map(ToString::to_string)
                .collect(),
            research_genres: DEFAULT_RESEARCH_GENRES
                .iter()
                .map(|(genre, keywords)| {
                    (
                        (*genre).to_string(),
                        keywords.iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
            buzz_threshold_likes: 100,
            results_per_keyword: 10,
            engagement_keywords: vec!["AIエージェント".to_string(), "AIツール".to_string()],
            likes_per_keyword: 5,
            max_retries: 3,
            poll_interval_secs: 60,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl ContentConfig {
    /// Load from a TOML file; fields left out keep their defaults.
    pub fn from_file(path: &Path) -> AutopostResult<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| AutopostError::Config(format!("{}: {e}", path.display())))
    }

    /// Resolve the content config.
    ///
    /// An explicit path must exist. Without one, `autopost.toml` in the working
    /// directory is used when present, otherwise the defaults. `AUTOPOST_MODEL`
    /// overrides the model either way.
    pub fn load(explicit: Option<&Path>) -> AutopostResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(model) = std::env::var("AUTOPOST_MODEL") {
            if !model.trim().is_empty() {
                config.model = model;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configs that would make generation impossible.
    pub fn validate(&self) -> AutopostResult<()> {
        if self.themes.is_empty() {
            return Err(AutopostError::Config("themes must not be empty".into()));
        }
        if self.max_retries == 0 {
            return Err(AutopostError::Config("max_retries must be at least 1".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(AutopostError::Config(
                "poll_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Publish loop interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Locations of the persisted JSON state.
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Use the given directory as the state root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve from an explicit path, `AUTOPOST_DATA_DIR`, or `./data`.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let root = explicit
            .or_else(|| std::env::var("AUTOPOST_DATA_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn research(&self) -> PathBuf {
        self.root.join("research_results.json")
    }

    pub fn style_profile(&self) -> PathBuf {
        self.root.join("style_profile.json")
    }

    pub fn past_posts(&self) -> PathBuf {
        self.root.join("past_tweets.json")
    }

    pub fn schedule(&self) -> PathBuf {
        self.root.join("scheduled.json")
    }

    pub fn history(&self) -> PathBuf {
        self.root.join("post_history.json")
    }

    pub fn reply_state(&self) -> PathBuf {
        self.root.join("reply_state.json")
    }

    pub fn ideas(&self) -> PathBuf {
        self.root.join("ideas.txt")
    }
}

/// Read a JSON file, or `None` if it does not exist.
pub(crate) fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> AutopostResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Write a value as pretty JSON, creating parent directories.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> AutopostResult<()> {
    let content = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

const DEFAULT_PERSONA: &str = "あなたは「次世代の生き方を提唱するAIマネタイズ専門家」です。
以下の属性を持っています：
- 最先端のAI技術（Claude, GPT, Gemini, OpenSource）に精通しているが、技術オタクではない
- 「AIを使って人生をどう変えるか」「どう稼ぐか」という実利的な視点を重視する
- 読者に「自分もできるかも」「人生が変わる予感がする」という希望を与える
- 口調は柔らかく丁寧だが、芯のある「です・ます」調（たまに「だ・である」を混ぜてリズムを作る）
- 読者に寄り添いつつ、行動を促すメンター的な存在";

const DEFAULT_THEMES: &[&str] = &[
    "AIツール（Claude Code, Antigravity, NotebookLM等）の活用法",
    "AI時代の新しい働き方・稼ぎ方",
    "AI副業による収益化のヒント",
    "テクノロジーを活用した自己変革・人生設計",
    "これからの時代に求められるスキルとマインド",
    "AIがもたらす社会変化と個人のチャンス",
    "AIを活用した時間術・生産性向上",
    "初心者でもできるAIスタートアップガイド",
];

/// Over-hyped or investment-advice phrasing.
const DEFAULT_BANNED_PHRASES: &[&str] = &[
    "絶対に儲かる",
    "必ず儲かる",
    "100%成功",
    "誰でも簡単",
    "何もしなくていい",
    "元本保証",
    "確実な利益",
    "裏技",
    "詐欺",
    "投資推奨",
    "買い時",
    "売り時",
];

const DEFAULT_RESEARCH_GENRES: &[(&str, &[&str])] = &[
    (
        "AIマネタイズ",
        &[
            "AI 副業 稼ぐ",
            "ChatGPT マネタイズ",
            "Claude 活用法",
            "AIツール 収益化",
            "自動化 ビジネス",
        ],
    ),
    (
        "AIトレンド",
        &[
            "最新AIニュース",
            "Gemini アップデート",
            "生成AI 未来",
            "AI 仕事 変化",
            "シンギュラリティ",
        ],
    ),
    (
        "自己啓発×AI",
        &[
            "AI 学習法",
            "リスキリング AI",
            "AI時代 スキル",
            "生産性向上 ツール",
            "人生変える AI",
        ],
    ),
    (
        "エンジニアリング",
        &[
            "プログラミング AI",
            "ノーコード 開発",
            "個人開発 成功",
            "技術トレンド",
            "エンジニア キャリア",
        ],
    ),
];
