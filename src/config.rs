//! Configuration module for feedpin.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::slots::{ReleaseFilter, SlotRule, MAX_SLOTS};
use crate::{FeedpinError, Result};

/// HTTP trigger surface configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Whether the HTTP surface is served.
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_server_enabled() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedpin.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedpin.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Feed polling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Global enable flag. Disabled runs return a status message and do nothing.
    #[serde(default = "default_feed_enabled")]
    pub enabled: bool,
    /// Feed URL.
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Maximum number of feed items considered per run.
    #[serde(default = "default_feed_max_items")]
    pub max_items: usize,
    /// Timer interval in seconds (0 disables the timer).
    #[serde(default = "default_feed_check_interval")]
    pub check_interval_secs: u64,
    /// Maximum feed size in bytes.
    #[serde(default = "default_feed_max_size")]
    pub max_feed_size_bytes: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_feed_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_feed_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_feed_total_timeout")]
    pub total_timeout_secs: u64,
}

fn default_feed_enabled() -> bool {
    true
}

fn default_feed_url() -> String {
    "https://godotengine.org/rss.xml".to_string()
}

fn default_feed_max_items() -> usize {
    12
}

fn default_feed_check_interval() -> u64 {
    600 // 10 minutes
}

fn default_feed_max_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_feed_connect_timeout() -> u64 {
    10
}

fn default_feed_read_timeout() -> u64 {
    20
}

fn default_feed_total_timeout() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: default_feed_enabled(),
            url: default_feed_url(),
            max_items: default_feed_max_items(),
            check_interval_secs: default_feed_check_interval(),
            max_feed_size_bytes: default_feed_max_size(),
            connect_timeout_secs: default_feed_connect_timeout(),
            read_timeout_secs: default_feed_read_timeout(),
            total_timeout_secs: default_feed_total_timeout(),
        }
    }
}

/// Which content platform implementation to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// Reddit OAuth API.
    Reddit,
    /// In-process platform that only logs what it would do.
    DryRun,
}

/// Content platform configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Platform implementation.
    #[serde(default = "default_platform_kind")]
    pub kind: PlatformKind,
    /// Community the posts are created in.
    #[serde(default)]
    pub subreddit: String,
    /// API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// User agent sent with every API request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// OAuth bearer token.
    #[serde(default)]
    pub access_token: String,
    /// Flair template id used when a slot has none.
    #[serde(default)]
    pub flair_style: String,
    /// Flair text for release items when a slot has none.
    #[serde(default = "default_release_flair_text")]
    pub release_flair_text: String,
    /// Flair text for other items when a slot has none.
    #[serde(default = "default_news_flair_text")]
    pub news_flair_text: String,
}

fn default_platform_kind() -> PlatformKind {
    PlatformKind::DryRun
}

fn default_api_base() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_user_agent() -> String {
    "feedpin/0.1 (sticky feed bot)".to_string()
}

fn default_release_flair_text() -> String {
    "official - releases".to_string()
}

fn default_news_flair_text() -> String {
    "official - news".to_string()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            kind: default_platform_kind(),
            subreddit: String::new(),
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            access_token: String::new(),
            flair_style: String::new(),
            release_flair_text: default_release_flair_text(),
            news_flair_text: default_news_flair_text(),
        }
    }
}

/// Where the engine looks for an already-created post for a feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    /// The post recorded in the slot state.
    SlotState,
    /// Recent posts by known author accounts, matched by URL.
    AuthorHistory,
}

/// Reconciliation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileConfig {
    /// Existing-post lookup strategy.
    #[serde(default = "default_lookup")]
    pub lookup: LookupKind,
    /// Accounts whose posts count as "ours" for the author history lookup.
    #[serde(default)]
    pub known_authors: Vec<String>,
    /// Number of recent posts scanned by the author history lookup.
    #[serde(default = "default_author_history_limit")]
    pub author_history_limit: usize,
}

fn default_lookup() -> LookupKind {
    LookupKind::SlotState
}

fn default_author_history_limit() -> usize {
    25
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            lookup: default_lookup(),
            known_authors: vec![],
            author_history_limit: default_author_history_limit(),
        }
    }
}

/// One `[[slots]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotConfig {
    /// Slot number (1 is the most prominent pin).
    pub number: u32,
    /// Accepted categories (empty matches any).
    #[serde(default)]
    pub categories: Vec<String>,
    /// Required title substring (empty matches any).
    #[serde(default)]
    pub title_contains: String,
    /// Release filter.
    #[serde(default)]
    pub release: ReleaseFilter,
    /// Flair template id (empty uses `platform.flair_style`).
    #[serde(default)]
    pub flair_id: String,
    /// Flair text (empty uses the release/news preset).
    #[serde(default)]
    pub flair_text: String,
    /// Follow the feed. `false` keeps whatever post a moderator assigned.
    #[serde(default = "default_from_feed")]
    pub from_feed: bool,
}

fn default_from_feed() -> bool {
    true
}

impl SlotConfig {
    /// Convert into a classification rule.
    pub fn to_rule(&self) -> SlotRule {
        SlotRule {
            number: self.number,
            categories: self.categories.iter().cloned().collect(),
            title_contains: self.title_contains.clone(),
            release: self.release,
            flair_id: self.flair_id.clone(),
            flair_text: self.flair_text.clone(),
            from_feed: self.from_feed,
        }
    }
}

fn default_slots() -> Vec<SlotConfig> {
    let slot = |number: u32, title: &str, release: ReleaseFilter| SlotConfig {
        number,
        categories: vec![],
        title_contains: title.to_string(),
        release,
        flair_id: String::new(),
        flair_text: String::new(),
        from_feed: true,
    };
    vec![
        slot(1, "", ReleaseFilter::NonRelease),
        slot(2, "Godot 4", ReleaseFilter::Release),
        slot(3, "Godot 3", ReleaseFilter::Release),
    ]
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP surface configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Feed configuration.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Platform configuration.
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Reconciliation configuration.
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    /// Slot rules.
    #[serde(default = "default_slots")]
    pub slots: Vec<SlotConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            feed: FeedConfig::default(),
            platform: PlatformConfig::default(),
            reconcile: ReconcileConfig::default(),
            slots: default_slots(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedpinError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedpinError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDPIN_ACCESS_TOKEN`: platform OAuth bearer token
    /// - `FEEDPIN_FLAIR_STYLE`: global flair template id
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("FEEDPIN_ACCESS_TOKEN") {
            if !token.is_empty() {
                self.platform.access_token = token;
            }
        }
        if let Ok(flair) = std::env::var("FEEDPIN_FLAIR_STYLE") {
            if !flair.is_empty() {
                self.platform.flair_style = flair;
            }
        }
    }

    /// Slot rules in slot-number order.
    pub fn slot_rules(&self) -> Vec<SlotRule> {
        let mut rules: Vec<SlotRule> = self.slots.iter().map(SlotConfig::to_rule).collect();
        rules.sort_by_key(|r| r.number);
        rules
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for slot in &self.slots {
            if slot.number == 0 {
                return Err(FeedpinError::Config(
                    "slot numbers start at 1".to_string(),
                ));
            }
            if slot.number > MAX_SLOTS {
                return Err(FeedpinError::Config(format!(
                    "slot {} is out of range, slot numbers go up to {}",
                    slot.number, MAX_SLOTS
                )));
            }
            if !seen.insert(slot.number) {
                return Err(FeedpinError::Config(format!(
                    "slot {} is configured more than once",
                    slot.number
                )));
            }
        }

        if self.feed.max_items == 0 {
            return Err(FeedpinError::Config(
                "feed.max_items must be at least 1".to_string(),
            ));
        }
        crate::feed::validate_url(&self.feed.url)
            .map_err(|e| FeedpinError::Config(format!("feed.url: {e}")))?;

        if self.platform.kind == PlatformKind::Reddit {
            if self.platform.subreddit.is_empty() {
                return Err(FeedpinError::Config(
                    "platform.subreddit must be set for the reddit platform".to_string(),
                ));
            }
            if self.platform.access_token.is_empty() {
                return Err(FeedpinError::Config(
                    "platform.access_token is not set. \
                     Set it in config.toml or via FEEDPIN_ACCESS_TOKEN environment variable."
                        .to_string(),
                ));
            }
        }

        if self.reconcile.lookup == LookupKind::AuthorHistory
            && self.reconcile.known_authors.is_empty()
        {
            return Err(FeedpinError::Config(
                "reconcile.known_authors must list at least one account \
                 for the author_history lookup"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
