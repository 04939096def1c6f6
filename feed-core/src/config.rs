//! Application configuration.
//!
//! Settings are read from a TOML file (`redditfeed.toml` unless
//! `REDDITFEED_CONFIG` points elsewhere). Every section has defaults, so a
//! missing file is not an error. A few values can be overridden from the
//! environment, which is where the Discord token usually lives.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_PATH_VAR: &str = "REDDITFEED_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "redditfeed.toml";
pub const DISCORD_TOKEN_VAR: &str = "DISCORD_TOKEN";
pub const DATABASE_URL_VAR: &str = "REDDITFEED_DATABASE_URL";
pub const POLL_INTERVAL_VAR: &str = "REDDITFEED_POLL_INTERVAL_SECONDS";

/// Reddit rejects the default reqwest agent.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/86.0.4240.75 Safari/537.36";

pub const REDDIT_COLOUR: u32 = 0xFF4500;

/// Largest page a listing request can return.
pub const MAX_LISTING_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub xkcd: XkcdConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
    #[serde(default = "default_colour")]
    pub embed_colour: u32,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: None,
            command_prefix: default_prefix(),
            embed_colour: default_colour(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_reddit_base")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub listing_limit: Option<u32>,
    #[serde(default = "default_concurrency")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_reddit_base(),
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
            listing_limit: None,
            max_concurrent_fetches: default_concurrency(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

impl RedditConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_timeout")]
    pub send_timeout_seconds: u64,
    /// Ids remembered per subreddit. Must hold a whole listing.
    #[serde(default = "default_seen_capacity")]
    pub seen_capacity: usize,
    #[serde(default = "bool_true")]
    pub oldest_first: bool,
    /// Record the first listing of a subreddit without sending it.
    #[serde(default = "bool_true")]
    pub prime_new_subreddits: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            send_timeout_seconds: default_timeout(),
            seen_capacity: default_seen_capacity(),
            oldest_first: true,
            prime_new_subreddits: true,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XkcdConfig {
    #[serde(default = "default_xkcd_base")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for XkcdConfig {
    fn default() -> Self {
        Self {
            base_url: default_xkcd_base(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}
fn default_colour() -> u32 {
    REDDIT_COLOUR
}
fn default_reddit_base() -> String {
    "https://www.reddit.com".to_string()
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}
fn default_timeout() -> u64 {
    10
}
fn default_concurrency() -> usize {
    4
}
fn default_requests_per_minute() -> u32 {
    60
}
fn default_interval() -> u64 {
    30
}
fn default_seen_capacity() -> usize {
    1_000
}
fn default_database_url() -> String {
    "sqlite://redditfeed.db".to_string()
}
fn default_xkcd_base() -> String {
    "https://xkcd.com".to_string()
}
fn bool_true() -> bool {
    true
}

impl AppConfig {
    /// Parses a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                value: format!("{}: {}", path.display(), e),
            })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// File (from `REDDITFEED_CONFIG` or the default path), then environment
    /// overrides, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(DISCORD_TOKEN_VAR).filter(|t| !t.trim().is_empty()) {
            self.discord.token = Some(token);
        }

        if let Some(url) = lookup(DATABASE_URL_VAR) {
            self.storage.database_url = url;
        }

        if let Some(raw) = lookup(POLL_INTERVAL_VAR) {
            self.poll.interval_seconds =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: POLL_INTERVAL_VAR.to_string(),
                        value: raw.clone(),
                    })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.discord.token {
            Some(token) if !token.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::MissingEnvironmentVariable {
                    var_name: DISCORD_TOKEN_VAR.to_string(),
                })
            }
        }

        if self.discord.command_prefix.is_empty() {
            return Err(ConfigError::MissingField {
                field: "discord.command_prefix".to_string(),
            });
        }

        check_http_url("reddit.base_url", &self.reddit.base_url)?;
        check_http_url("xkcd.base_url", &self.xkcd.base_url)?;

        if self.reddit.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "reddit.user_agent".to_string(),
            });
        }

        check_positive("reddit.timeout_seconds", self.reddit.timeout_seconds)?;
        check_positive(
            "reddit.max_concurrent_fetches",
            self.reddit.max_concurrent_fetches as u64,
        )?;
        check_positive(
            "reddit.requests_per_minute",
            self.reddit.requests_per_minute as u64,
        )?;
        check_positive("poll.interval_seconds", self.poll.interval_seconds)?;
        check_positive("poll.send_timeout_seconds", self.poll.send_timeout_seconds)?;
        if self.poll.seen_capacity < MAX_LISTING_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "poll.seen_capacity".to_string(),
                value: self.poll.seen_capacity.to_string(),
            });
        }
        check_positive("xkcd.timeout_seconds", self.xkcd.timeout_seconds)?;

        Ok(())
    }
}

fn check_positive(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}
