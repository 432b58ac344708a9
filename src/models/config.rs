//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::FeedSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Where posts go and whether they are sent at all
    #[serde(default)]
    pub mode: RunMode,

    /// hpoi.net access settings
    #[serde(default)]
    pub feed: FeedConfig,

    /// Telegram bot and destination settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Dedup store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Run deadline settings
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A missing or malformed file is a configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| AppError::config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.feed.user_agent.trim().is_empty() {
            return Err(AppError::validation("feed.user_agent is empty"));
        }
        if self.feed.timeout_secs == 0 {
            return Err(AppError::validation("feed.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.feed.base_url)
            .map_err(|e| AppError::validation(format!("feed.base_url is invalid: {e}")))?;
        if self.telegram.timeout_secs == 0 {
            return Err(AppError::validation("telegram.timeout_secs must be > 0"));
        }
        if self.watchdog.deadline_secs == 0 {
            return Err(AppError::validation("watchdog.deadline_secs must be > 0"));
        }
        if self.storage.records_file.as_os_str().is_empty() {
            return Err(AppError::validation("storage.records_file is empty"));
        }

        match self.mode {
            RunMode::Production => {
                self.require_token()?;
                if self.telegram.channel_id == 0 {
                    return Err(AppError::validation(
                        "telegram.channel_id is required in production mode",
                    ));
                }
            }
            RunMode::Development => {
                self.require_token()?;
                if self.telegram.owner_id == 0 {
                    return Err(AppError::validation(
                        "telegram.owner_id is required in development mode",
                    ));
                }
            }
            RunMode::Test => {}
        }

        if self.telegram.sub_channel_id == Some(0) {
            return Err(AppError::validation(
                "telegram.sub_channel_id must be a chat id; omit it to disable the secondary channel",
            ));
        }

        if let Some(proxy) = &self.telegram.proxy {
            url::Url::parse(proxy)
                .map_err(|e| AppError::validation(format!("telegram.proxy is invalid: {e}")))?;
        }
        Ok(())
    }

    fn require_token(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(AppError::validation(format!(
                "telegram.bot_token is required in {} mode",
                self.mode
            )));
        }
        Ok(())
    }

    /// Resolve the chats this run posts to.
    ///
    /// Outside production both destinations collapse onto the operator chat.
    pub fn destinations(&self) -> Destinations {
        match self.mode {
            RunMode::Production => Destinations {
                primary: self.telegram.channel_id,
                secondary: self.telegram.sub_channel_id,
            },
            RunMode::Development | RunMode::Test => Destinations {
                primary: self.telegram.owner_id,
                secondary: self.telegram.sub_channel_id.map(|_| self.telegram.owner_id),
            },
        }
    }

    /// Proxy for transport requests, only honoured in development mode.
    pub fn transport_proxy(&self) -> Option<&str> {
        match self.mode {
            RunMode::Development => self.telegram.proxy.as_deref(),
            RunMode::Production | RunMode::Test => None,
        }
    }
}

/// Run mode, chosen explicitly in config or on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Post to the real channels
    Production,
    /// Post to the operator chat through the optional proxy
    Development,
    /// Dry run: fetch, dedupe and record without posting
    #[default]
    Test,
}

impl RunMode {
    /// Whether this mode talks to the publish transport at all.
    pub fn publishes(self) -> bool {
        !matches!(self, RunMode::Test)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Production => "production",
            RunMode::Development => "development",
            RunMode::Test => "test",
        };
        f.write_str(name)
    }
}

impl FromStr for RunMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(RunMode::Production),
            "development" | "dev" => Ok(RunMode::Development),
            "test" => Ok(RunMode::Test),
            other => Err(AppError::config(format!("Unknown run mode '{other}'"))),
        }
    }
}

/// Chats an item is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destinations {
    /// Always targeted
    pub primary: i64,
    /// Targeted in addition to `primary` for secondary-topic items
    pub secondary: Option<i64>,
}

/// hpoi.net access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Site root, used for the listing, detail pages and link resolution
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// `utoken` session cookie; the listing is empty without it
    #[serde(default)]
    pub utoken: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Listing/detail document selectors
    #[serde(default)]
    pub selectors: FeedSelectors,
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            utoken: String::new(),
            timeout_secs: defaults::timeout(),
            selectors: FeedSelectors::default(),
        }
    }
}

/// Telegram bot and destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API root
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Bot token
    #[serde(default)]
    pub bot_token: String,

    /// Primary channel
    #[serde(default)]
    pub channel_id: i64,

    /// Secondary channel for scale-figure announcements
    #[serde(default)]
    pub sub_channel_id: Option<i64>,

    /// Operator chat used outside production
    #[serde(default)]
    pub owner_id: i64,

    /// Tag routing an item to the secondary channel
    #[serde(default = "defaults::secondary_tag")]
    pub secondary_tag: String,

    /// Local proxy for development runs (e.g. `http://localhost:1087`)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl TelegramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            bot_token: String::new(),
            channel_id: 0,
            sub_channel_id: None,
            owner_id: 0,
            secondary_tag: defaults::secondary_tag(),
            proxy: None,
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Dedup store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON Lines file holding publish records
    #[serde(default = "defaults::records_file")]
    pub records_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            records_file: defaults::records_file(),
        }
    }
}

/// Run deadline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Wall-clock budget for one run
    #[serde(default = "defaults::deadline")]
    pub deadline_secs: u64,

    /// Extra time granted after the deadline before the process is killed
    #[serde(default = "defaults::grace")]
    pub grace_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            deadline_secs: defaults::deadline(),
            grace_secs: defaults::grace(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn base_url() -> String {
        "https://www.hpoi.net/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; hpoi-relay/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn secondary_tag() -> String {
        "#比例人形".into()
    }
    pub fn records_file() -> PathBuf {
        PathBuf::from("data/published_records.jsonl")
    }
    pub fn deadline() -> u64 {
        5 * 60
    }
    pub fn grace() -> u64 {
        10
    }
}
