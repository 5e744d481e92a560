//! Error types for browsekit

use thiserror::Error;

/// Errors surfaced by the browse tool operations
///
/// Heuristic failures (markup anomalies, bad grep patterns, renderer errors)
/// never show up here; they degrade to a fallback instead.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// URL is missing a scheme or host
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Search pattern is empty
    #[error("Missing required parameter: grep_pattern")]
    EmptyPattern,

    /// The page could not be fetched
    #[error("Failed to fetch content from {0}")]
    FetchFailed(String),

    /// Raw GitHub content was required but could not be fetched
    #[error("Failed to fetch raw content from GitHub URL: {0}")]
    GithubRawUnavailable(String),

    /// Raw GitHub content was required for a non-GitHub URL
    #[error("Error: github_raw_only is enabled, but {0} is not a GitHub URL")]
    NotGithubUrl(String),

    /// Cache store failure
    #[error("Cache unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Response is not textual
    #[error("Binary content is not supported: {0}")]
    BinaryContent(String),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectError(err)
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::RequestError(err.to_string())
        }
    }
}

/// Errors from a markdown conversion stage
///
/// These never leave the crate's public operations; the renderer falls back
/// to a simpler stage instead.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The stage produced only whitespace
    #[error("conversion produced no text")]
    EmptyOutput,

    /// A cleanup pattern failed to compile
    #[error("invalid cleanup pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Errors raised by cache stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Could not create the database directory
    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    /// A lock holder panicked
    #[error("cache lock poisoned")]
    Poisoned,
}
