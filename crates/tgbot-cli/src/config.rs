//! Application configuration.
//!
//! Settings come from an optional TOML file (`config/default.toml` unless a
//! path is given) and are then overridden by environment variables, which
//! may themselves come from a `.env` file loaded in `main`.
//!
//! | variable                                | overrides            |
//! |-----------------------------------------|----------------------|
//! | `TG_BOT_API_KEY` / `TELEGRAM_BOT_TOKEN` | `telegram.token`     |
//! | `OPENAI_API_KEY`                        | `openai.api_key`     |
//! | `OPENAI_BASE_URL`                       | `openai.base_url`    |
//! | `TGBOT_DB_PATH`                         | `database.path`      |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tgbot_adapters::TELEGRAM_API_BASE;
use tgbot_agent::{DEFAULT_CHAT_MODEL, DEFAULT_HISTORY_WINDOW, DEFAULT_VISION_MODEL, OPENAI_BASE_URL};
use tgbot_kernel::DEFAULT_BROADCAST_CONCURRENCY;

use crate::helpers::env_non_empty;

/// Config file read when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// System prompt put in front of every chat completion.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "I am a super intelligent AI assistant that runs inside Telegram bot";

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub openai: OpenAiConfig,
    pub database: DatabaseConfig,
    pub bot: BotConfig,
    pub log: LogConfig,
}

/// `[telegram]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub api_base: String,
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: TELEGRAM_API_BASE.to_owned(),
            poll_timeout_secs: 30,
        }
    }
}

/// `[openai]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub vision_model: String,
    pub system_prompt: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENAI_BASE_URL.to_owned(),
            chat_model: DEFAULT_CHAT_MODEL.to_owned(),
            vision_model: DEFAULT_VISION_MODEL.to_owned(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    }
}

/// `[database]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tgbot.db"),
        }
    }
}

/// `[bot]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Messages of conversation history kept per user.
    pub history_window: usize,
    /// Broadcast sends in flight at once.
    pub broadcast_concurrency: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            broadcast_concurrency: DEFAULT_BROADCAST_CONCURRENCY,
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load the configuration file and apply environment overrides.
///
/// An explicit `path` must exist. Without one, `config/default.toml` is
/// read when present and built-in defaults are used otherwise.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                read_config_file(default)?
            } else {
                AppConfig::default()
            }
        }
    };
    config.apply_env(env_non_empty);
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config file {}", path.display()))
}

/// Parse TOML configuration text. Missing sections and keys take defaults.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    toml::from_str(content).context("failed to parse configuration")
}

impl AppConfig {
    /// Apply overrides from `lookup`, normally the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("TG_BOT_API_KEY").or_else(|| lookup("TELEGRAM_BOT_TOKEN")) {
            self.telegram.token = Some(token);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.openai.base_url = url;
        }
        if let Some(path) = lookup("TGBOT_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
    }

    /// The bot token, or an error telling the operator how to set it.
    pub fn telegram_token(&self) -> Result<&str> {
        self.telegram
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "TG_BOT_API_KEY is required. Create a bot at https://t.me/BotFather"
                )
            })
    }

    /// The OpenAI key when one is configured and non-empty.
    pub fn openai_key(&self) -> Option<&str> {
        self.openai.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("tgbot.db"));
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.telegram.api_base, TELEGRAM_API_BASE);
        assert_eq!(config.openai.chat_model, DEFAULT_CHAT_MODEL);
        assert_eq!(config.openai.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(config.bot.history_window, DEFAULT_HISTORY_WINDOW);
        assert_eq!(config.log.level, "info");
        assert!(!config.log.json);
        assert!(config.telegram_token().is_err());
        assert!(config.openai_key().is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [database]
            path = "/var/lib/tgbot/bot.db"

            [bot]
            history_window = 6

            [log]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/var/lib/tgbot/bot.db"));
        assert_eq!(config.bot.history_window, 6);
        assert_eq!(config.bot.broadcast_concurrency, DEFAULT_BROADCAST_CONCURRENCY);
        assert!(config.log.json);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(parse_config("[database\npath = 1").is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = parse_config(
            r#"
            [telegram]
            token = "from-file"
            "#,
        )
        .unwrap();
        config.apply_env(env(&[
            ("TG_BOT_API_KEY", "from-env"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
            ("TGBOT_DB_PATH", "other.db"),
        ]));
        assert_eq!(config.telegram_token().unwrap(), "from-env");
        assert_eq!(config.openai_key(), Some("sk-test"));
        assert_eq!(config.openai.base_url, "http://localhost:8080/v1");
        assert_eq!(config.database.path, PathBuf::from("other.db"));
    }

    #[test]
    fn telegram_bot_token_is_a_fallback_name() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("TELEGRAM_BOT_TOKEN", "fallback")]));
        assert_eq!(config.telegram_token().unwrap(), "fallback");

        config.apply_env(env(&[
            ("TG_BOT_API_KEY", "primary"),
            ("TELEGRAM_BOT_TOKEN", "fallback"),
        ]));
        assert_eq!(config.telegram_token().unwrap(), "primary");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn explicit_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.toml");
        std::fs::write(&path, "[telegram]\npoll_timeout_secs = 3\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.telegram.poll_timeout_secs, 3);
    }
}
