//! Browser configuration

use crate::extract::ScoringWeights;
use crate::types::ContentPriority;
use crate::DEFAULT_USER_AGENT;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the cache database path
pub const DB_PATH_ENV: &str = "BROWSEKIT_DB_PATH";

const APP_DIR: &str = "browsekit";
const DB_FILE: &str = "web_cache.db";

/// Defaults applied to every browse request
///
/// Per-request fields of [`BrowseRequest`](crate::BrowseRequest) override the
/// matching flags here.
#[derive(Debug, Clone)]
pub struct BrowseConfig {
    /// SQLite cache file
    pub db_path: PathBuf,
    pub user_agent: String,
    /// Use raw GitHub sources when a page links to one
    pub prefer_raw: bool,
    /// Prepend extracted site navigation
    pub include_navigation: bool,
    pub content_priority: ContentPriority,
    /// Refuse anything but raw GitHub content
    pub github_raw_only: bool,
    pub timeout: Duration,
    pub scoring: ScoringWeights,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            prefer_raw: true,
            include_navigation: false,
            content_priority: ContentPriority::Auto,
            github_raw_only: false,
            timeout: DEFAULT_TIMEOUT,
            scoring: ScoringWeights::default(),
        }
    }
}

impl BrowseConfig {
    /// Defaults, with the database path taken from `BROWSEKIT_DB_PATH` if set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = db_path_from(std::env::var_os(DB_PATH_ENV)) {
            config.db_path = path;
        }
        config
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }
}

/// `<data dir>/browsekit/web_cache.db`, or the working directory when the
/// platform has no data dir
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DB_FILE)
}

fn db_path_from(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}
