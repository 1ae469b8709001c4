use mediadex_common::ContentHint;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides `[catalog] api_key`.
pub const API_KEY_ENV: &str = "MEDIADEX_TMDB_API_KEY";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    /// Folders seeded into the registry on start.
    #[serde(default)]
    pub folders: Vec<FolderConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mediadex.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// External catalog (TMDB) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// Minimum spacing between outbound catalog calls.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Wait before the single retry after a rate-limit response.
    #[serde(default = "default_backoff_ms")]
    pub rate_limit_backoff_ms: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_language() -> String {
    "en-US".to_string()
}
fn default_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}
fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}
fn default_min_interval_ms() -> u64 {
    200
}
fn default_backoff_ms() -> u64 {
    2000
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            language: default_language(),
            base_url: default_base_url(),
            image_base_url: default_image_base_url(),
            min_interval_ms: default_min_interval_ms(),
            rate_limit_backoff_ms: default_backoff_ms(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl CatalogConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.rate_limit_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How long a file's size must stay unchanged before it is reported.
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold_ms: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Quiet period after the latest discovery before a scan pass runs.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Extra or replacement extensions; empty means the built-in video list.
    #[serde(default)]
    pub extensions: Vec<String>,
}

fn default_true() -> bool {
    true
}
fn default_stability_threshold() -> u64 {
    2000
}
fn default_poll_interval() -> u64 {
    100
}
fn default_debounce() -> u64 {
    3000
}
fn default_max_depth() -> usize {
    16
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            stability_threshold_ms: default_stability_threshold(),
            poll_interval_ms: default_poll_interval(),
            debounce_ms: default_debounce(),
            max_depth: default_max_depth(),
            extensions: Vec::new(),
        }
    }
}

impl WatchConfig {
    pub fn stability_threshold(&self) -> Duration {
        Duration::from_millis(self.stability_threshold_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FolderConfig {
    pub path: PathBuf,

    #[serde(default)]
    pub content: ContentHint,
}
