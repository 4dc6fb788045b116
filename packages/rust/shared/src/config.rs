//! Application configuration for TrackTect.
//!
//! User config lives at `~/.tracktect/tracktect.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TracktectError};
use crate::types::HandleOverrides;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "tracktect.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".tracktect";

// ---------------------------------------------------------------------------
// Config structs (matching tracktect.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Outbound HTTP settings shared by all fetchers.
    #[serde(default)]
    pub http: HttpConfig,

    /// OpenRouter settings (summarizer and classifier).
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Notion knowledge-store settings.
    #[serde(default)]
    pub notion: NotionConfig,

    /// Social platform settings.
    #[serde(default)]
    pub social: SocialConfig,

    /// Knowledge-store publish policy.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Pinned social handles per URL.
    #[serde(default)]
    pub overrides: OverridesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Where the classification artifact is written (relative to the working dir).
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,

    /// Maximum tweets collected per URL.
    #[serde(default = "default_max_items")]
    pub max_tweets: usize,

    /// Maximum videos collected per URL.
    #[serde(default = "default_max_items")]
    pub max_videos: usize,

    /// Characters of a video description shown in the progress log.
    #[serde(default = "default_description_preview_chars")]
    pub description_preview_chars: usize,

    /// Landing-page snapshot and run-history database.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            artifact_path: default_artifact_path(),
            max_tweets: default_max_items(),
            max_videos: default_max_items(),
            description_preview_chars: default_description_preview_chars(),
            database_path: default_database_path(),
        }
    }
}

fn default_artifact_path() -> String {
    "output/classified_results.json".into()
}
fn default_max_items() -> usize {
    5
}
fn default_description_preview_chars() -> usize {
    200
}
fn default_database_path() -> String {
    "output/tracktect.db".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Allow fetching loopback/private hosts (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            allow_private_hosts: false,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for summarization and classification.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL.
    #[serde(default = "default_openrouter_base_url")]
    pub base_url: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_openrouter_base_url(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

/// `[notion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotionConfig {
    /// Name of the env var holding the integration token.
    #[serde(default = "default_notion_token_env")]
    pub token_env: String,

    /// Page that receives one update block per domain.
    #[serde(default)]
    pub parent_page_id: String,

    /// API base URL.
    #[serde(default = "default_notion_base_url")]
    pub base_url: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            token_env: default_notion_token_env(),
            parent_page_id: String::new(),
            base_url: default_notion_base_url(),
        }
    }
}

fn default_notion_token_env() -> String {
    "NOTION_TOKEN".into()
}
fn default_notion_base_url() -> String {
    "https://api.notion.com/v1".into()
}

/// `[social]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// RSS bridge used to read public timelines.
    #[serde(default = "default_nitter_base_url")]
    pub nitter_base_url: String,

    /// Base URL for YouTube channel pages and feeds.
    #[serde(default = "default_youtube_base_url")]
    pub youtube_base_url: String,

    /// Base URL for the YouTube Data API.
    #[serde(default = "default_youtube_api_base_url")]
    pub youtube_api_base_url: String,

    /// Env var holding a YouTube Data API key. Comments are skipped when unset.
    #[serde(default = "default_youtube_api_key_env")]
    pub youtube_api_key_env: String,

    /// Maximum comments fetched per video.
    #[serde(default = "default_max_items")]
    pub max_comments: usize,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            nitter_base_url: default_nitter_base_url(),
            youtube_base_url: default_youtube_base_url(),
            youtube_api_base_url: default_youtube_api_base_url(),
            youtube_api_key_env: default_youtube_api_key_env(),
            max_comments: default_max_items(),
        }
    }
}

fn default_nitter_base_url() -> String {
    "https://nitter.net".into()
}
fn default_youtube_base_url() -> String {
    "https://www.youtube.com".into()
}
fn default_youtube_api_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".into()
}
fn default_youtube_api_key_env() -> String {
    "YOUTUBE_API_KEY".into()
}

/// `[publish]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Abort the run on the first knowledge-store failure.
    #[serde(default = "default_true")]
    pub fail_fast: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

fn default_true() -> bool {
    true
}

/// `[overrides]` section: `[overrides.twitter]` and `[overrides.youtube]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverridesConfig {
    #[serde(default)]
    pub twitter: HandleOverrides,
    #[serde(default)]
    pub youtube: HandleOverrides,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.tracktect/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TracktectError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.tracktect/tracktect.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TracktectError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| TracktectError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_at(&config_file_path()?)
}

/// Write a default config file at `path`, creating parent directories.
pub fn init_config_at(path: &Path) -> Result<PathBuf> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| TracktectError::io(dir, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| TracktectError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| TracktectError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path.to_path_buf())
}

/// Read a secret from the env var named in config. Empty values count as missing.
pub fn require_env(var_name: &str, purpose: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(TracktectError::config(format!(
            "{purpose} not found. Set the {var_name} environment variable."
        ))),
    }
}
