//! Core types for browsekit

use crate::grep::GrepOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Strategy used to pick the main content region of a page
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ContentPriority {
    /// Fixed-weight rules, with density analysis when rules find little
    #[default]
    Auto,
    /// Prefer the `<main>` element outright
    Main,
    /// Prefer the longest `<article>`
    Article,
    /// Density analysis weighted toward the most text
    Largest,
    /// Density analysis weighted toward text density
    Dense,
}

impl ContentPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentPriority::Auto => "auto",
            ContentPriority::Main => "main",
            ContentPriority::Article => "article",
            ContentPriority::Largest => "largest",
            ContentPriority::Dense => "dense",
        }
    }

    /// Parse a priority, substituting `auto` for unknown values
    pub fn parse_lossy(s: &str) -> Self {
        s.parse().unwrap_or_else(|err: String| {
            warn!(value = s, "{}. Using 'auto' instead.", err);
            ContentPriority::Auto
        })
    }
}

impl FromStr for ContentPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ContentPriority::Auto),
            "main" => Ok(ContentPriority::Main),
            "article" => Ok(ContentPriority::Article),
            "largest" => Ok(ContentPriority::Largest),
            "dense" => Ok(ContentPriority::Dense),
            _ => Err(format!("Invalid content_priority '{}'", s)),
        }
    }
}

impl std::fmt::Display for ContentPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to browse a URL
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BrowseRequest {
    /// The URL to fetch (required, must have a scheme and host)
    pub url: String,

    /// Regex pattern used to filter the rendered lines (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grep_pattern: Option<String>,

    /// Lines of context around each match, like grep -C
    #[serde(default)]
    pub context_lines: usize,

    /// Show non-matching lines instead, like grep -v
    #[serde(default)]
    pub invert_match: bool,

    /// Prefix lines with their line numbers, like grep -n
    #[serde(default)]
    pub show_line_numbers: bool,

    /// Match whole words only, like grep -w
    #[serde(default)]
    pub whole_words: bool,

    /// Use raw GitHub content when the page points at a GitHub source file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_raw: Option<bool>,

    /// Prepend the page's navigation structure (useful when traversing a site)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_navigation: Option<bool>,

    /// Content extraction strategy: auto, main, article, largest or dense
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_priority: Option<String>,

    /// Only return raw GitHub content, failing for other URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_raw_only: Option<bool>,
}

impl BrowseRequest {
    /// Create a new request with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Filter the result with a grep pattern
    pub fn grep(mut self, pattern: impl Into<String>) -> Self {
        self.grep_pattern = Some(pattern.into());
        self
    }

    /// Lines of context around matches
    pub fn context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Show non-matching lines
    pub fn invert_match(mut self) -> Self {
        self.invert_match = true;
        self
    }

    /// Prefix output lines with line numbers
    pub fn show_line_numbers(mut self) -> Self {
        self.show_line_numbers = true;
        self
    }

    /// Match whole words only
    pub fn whole_words(mut self) -> Self {
        self.whole_words = true;
        self
    }

    pub fn prefer_raw(mut self, enable: bool) -> Self {
        self.prefer_raw = Some(enable);
        self
    }

    pub fn include_navigation(mut self, enable: bool) -> Self {
        self.include_navigation = Some(enable);
        self
    }

    pub fn content_priority(mut self, priority: impl Into<String>) -> Self {
        self.content_priority = Some(priority.into());
        self
    }

    pub fn github_raw_only(mut self, enable: bool) -> Self {
        self.github_raw_only = Some(enable);
        self
    }

    /// Grep options, or `None` when no (non-empty) pattern was given
    pub fn grep_options(&self) -> Option<GrepOptions> {
        let pattern = self.grep_pattern.as_deref().filter(|p| !p.is_empty())?;
        Some(GrepOptions {
            pattern: pattern.to_string(),
            context_lines: self.context_lines,
            invert_match: self.invert_match,
            show_line_numbers: self.show_line_numbers,
            whole_words: self.whole_words,
        })
    }
}

/// Request to search every cached page
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    /// Regex pattern to search for across all cached content (required)
    pub grep_pattern: String,

    /// Lines of context around each match, like grep -C
    #[serde(default)]
    pub context_lines: usize,

    /// Show non-matching lines instead, like grep -v
    #[serde(default)]
    pub invert_match: bool,

    /// Prefix lines with their line numbers, like grep -n
    #[serde(default)]
    pub show_line_numbers: bool,

    /// Match whole words only, like grep -w
    #[serde(default)]
    pub whole_words: bool,
}

impl SearchRequest {
    /// Create a new search for the given pattern
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            grep_pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn show_line_numbers(mut self) -> Self {
        self.show_line_numbers = true;
        self
    }

    /// Grep options, or `None` for an empty pattern
    pub fn grep_options(&self) -> Option<GrepOptions> {
        if self.grep_pattern.is_empty() {
            return None;
        }
        Some(GrepOptions {
            pattern: self.grep_pattern.clone(),
            context_lines: self.context_lines,
            invert_match: self.invert_match,
            show_line_numbers: self.show_line_numbers,
            whole_words: self.whole_words,
        })
    }
}

/// Request handed to a [`Fetcher`](crate::Fetcher)
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub follow_redirects: bool,
}

impl FetchRequest {
    /// Create a request with default user agent, timeout and redirects on
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
            timeout: crate::config::DEFAULT_TIMEOUT,
            follow_redirects: true,
        }
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }
}

/// A successfully fetched page
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Decoded body
    pub body: String,

    /// True if the body was cut short by the timeout
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_priority_from_str() {
        assert_eq!(
            ContentPriority::from_str("auto").unwrap(),
            ContentPriority::Auto
        );
        assert_eq!(
            ContentPriority::from_str("MAIN").unwrap(),
            ContentPriority::Main
        );
        assert_eq!(
            ContentPriority::from_str(" dense ").unwrap(),
            ContentPriority::Dense
        );
        assert!(ContentPriority::from_str("biggest").is_err());
    }

    #[test]
    fn test_content_priority_lossy_defaults_to_auto() {
        assert_eq!(
            ContentPriority::parse_lossy("nonsense"),
            ContentPriority::Auto
        );
        assert_eq!(
            ContentPriority::parse_lossy("article"),
            ContentPriority::Article
        );
    }

    #[test]
    fn test_content_priority_display() {
        assert_eq!(ContentPriority::Largest.to_string(), "largest");
        assert_eq!(ContentPriority::default().to_string(), "auto");
    }

    #[test]
    fn test_browse_request_builder() {
        let req = BrowseRequest::new("https://example.com")
            .grep("rust")
            .context_lines(2)
            .show_line_numbers()
            .include_navigation(true);

        assert_eq!(req.url, "https://example.com");
        assert_eq!(req.include_navigation, Some(true));
        let opts = req.grep_options().unwrap();
        assert_eq!(opts.pattern, "rust");
        assert_eq!(opts.context_lines, 2);
        assert!(opts.show_line_numbers);
    }

    #[test]
    fn test_empty_grep_pattern_is_none() {
        let req = BrowseRequest::new("https://example.com").grep("");
        assert!(req.grep_options().is_none());
        assert!(SearchRequest::new("").grep_options().is_none());
    }

    #[test]
    fn test_browse_request_deserialization_defaults() {
        let req: BrowseRequest =
            serde_json::from_str(r#"{"url": "https://example.com", "content_priority": "dense"}"#)
                .unwrap();
        assert_eq!(req.context_lines, 0);
        assert!(!req.invert_match);
        assert_eq!(req.content_priority.as_deref(), Some("dense"));
        assert!(req.prefer_raw.is_none());
    }

    #[test]
    fn test_browse_request_serialization() {
        let req = BrowseRequest::new("https://example.com");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"url\":\"https://example.com\""));
        // Optional None fields should be omitted
        assert!(!json.contains("grep_pattern"));
        assert!(!json.contains("prefer_raw"));
    }
}
