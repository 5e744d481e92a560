//! Browse pipeline and the cache tool operations

use crate::cache::{CacheKey, CacheStats, CacheStore, SqliteStore};
use crate::config::BrowseConfig;
use crate::convert::{extract_title, html_to_markdown_with, is_html};
use crate::error::BrowseError;
use crate::extract::ContentSelector;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::github::{find_source_link, is_github_file_url, to_raw};
use crate::grep::{grep_content, grep_lines, GrepOptions};
use crate::navigation::{extract_navigation, format_navigation_as_markdown};
use crate::types::{BrowseRequest, ContentPriority, FetchRequest, FetchedPage, SearchRequest};
use crate::urls;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lines shown per page in search results
const SEARCH_PREVIEW_LINES: usize = 10;

/// Where the text of a browse response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    Cache,
    Web,
    GithubRaw,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Cache => "cache",
            ContentSource::Web => "web",
            ContentSource::GithubRaw => "github_raw",
        }
    }
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags of one browse call, request values over config defaults
#[derive(Debug, Clone, Copy)]
struct Flags {
    prefer_raw: bool,
    include_navigation: bool,
    priority: ContentPriority,
    github_raw_only: bool,
}

impl Flags {
    fn resolve(req: &BrowseRequest, config: &BrowseConfig) -> Self {
        Self {
            prefer_raw: req.prefer_raw.unwrap_or(config.prefer_raw),
            include_navigation: req.include_navigation.unwrap_or(config.include_navigation),
            priority: req
                .content_priority
                .as_deref()
                .map(ContentPriority::parse_lossy)
                .unwrap_or(config.content_priority),
            github_raw_only: req.github_raw_only.unwrap_or(config.github_raw_only),
        }
    }
}

/// Builder for a [`Browser`]
#[derive(Default)]
pub struct BrowserBuilder {
    config: BrowseConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    store: Option<Arc<dyn CacheStore>>,
}

impl BrowserBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: BrowseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn prefer_raw(mut self, enable: bool) -> Self {
        self.config.prefer_raw = enable;
        self
    }

    pub fn include_navigation(mut self, enable: bool) -> Self {
        self.config.include_navigation = enable;
        self
    }

    pub fn content_priority(mut self, priority: ContentPriority) -> Self {
        self.config.content_priority = priority;
        self
    }

    pub fn github_raw_only(mut self, enable: bool) -> Self {
        self.config.github_raw_only = enable;
        self
    }

    /// Use a custom fetcher instead of [`HttpFetcher`]
    pub fn fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Use a custom store instead of the SQLite database at `config.db_path`
    pub fn store(mut self, store: impl CacheStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Build the browser, opening the SQLite cache unless a store was given
    pub fn build(self) -> Result<Browser, BrowseError> {
        let store = match self.store {
            Some(store) => store,
            None => Arc::new(SqliteStore::open(&self.config.db_path)?),
        };
        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::new()));
        let selector = ContentSelector::new(self.config.scoring.clone());

        Ok(Browser {
            config: self.config,
            fetcher,
            store,
            selector,
        })
    }
}

/// Fetches pages, renders them to markdown and caches the result
pub struct Browser {
    config: BrowseConfig,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn CacheStore>,
    selector: ContentSelector,
}

impl Browser {
    pub fn builder() -> BrowserBuilder {
        BrowserBuilder::new()
    }

    pub fn config(&self) -> &BrowseConfig {
        &self.config
    }

    /// Fetch `req.url` as markdown, from the cache when possible
    ///
    /// The response starts with a `### Content from ...` header naming the
    /// source and, when a grep pattern was given, the filter.
    pub async fn browse(&self, req: &BrowseRequest) -> Result<String, BrowseError> {
        let flags = Flags::resolve(req, &self.config);
        let url = req.url.trim();

        if !urls::is_valid(url) {
            return Err(BrowseError::InvalidUrl(url.to_string()));
        }

        if flags.prefer_raw && is_github_file_url(url) {
            if let Some(content) = self.fetch_github_file(url).await {
                return Ok(respond(url, ContentSource::GithubRaw, &content, req));
            }
            if flags.github_raw_only {
                return Err(BrowseError::GithubRawUnavailable(url.to_string()));
            }
        }

        let normalized = urls::normalize(url);
        let key = CacheKey::new(
            normalized,
            flags.prefer_raw,
            flags.include_navigation,
            flags.priority,
        );

        if let Some(entry) = self.store.get(&key)? {
            debug!(key = %key, "Cache hit");
            return Ok(respond(url, ContentSource::Cache, &entry.rendered, req));
        }

        if flags.github_raw_only && !is_github_file_url(url) {
            return Err(BrowseError::NotGithubUrl(url.to_string()));
        }

        let page = self
            .fetch(url)
            .await
            .ok_or_else(|| BrowseError::FetchFailed(url.to_string()))?;

        let (rendered, source) = self.render(url, &page, flags).await;

        let timestamp = chrono::Utc::now().timestamp();
        if let Err(err) = self.store.put(&key, &page.body, &rendered, timestamp) {
            warn!(key = %key, error = %err, "Failed to cache rendered page");
        }

        Ok(respond(url, source, &rendered, req))
    }

    /// Grep every cached page, showing the first lines of each hit
    pub fn search_cached(&self, req: &SearchRequest) -> Result<String, BrowseError> {
        let options = req.grep_options().ok_or(BrowseError::EmptyPattern)?;

        let entries = self.store.entries()?;
        if entries.is_empty() {
            return Ok("No cached content available to search.".to_string());
        }

        let results: Vec<String> = entries
            .iter()
            .filter_map(|entry| {
                let lines = grep_lines(&entry.rendered, &options);
                if lines.is_empty() {
                    return None;
                }
                let mut preview = lines
                    .iter()
                    .take(SEARCH_PREVIEW_LINES)
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("\n");
                if lines.len() > SEARCH_PREVIEW_LINES {
                    preview.push_str("\n...(more results truncated)...");
                }
                Some(format!("### URL: {}\n{}\n", entry.url, preview))
            })
            .collect();

        if results.is_empty() {
            return Ok(format!(
                "No content matching '{}' found in the cache.",
                options.pattern
            ));
        }

        Ok(format!(
            "### Search Results for '{}'{}:\n\n{}",
            options.pattern,
            options_suffix(&options),
            results.join("\n")
        ))
    }

    /// Remove every cached page
    pub fn clear_cache(&self) -> Result<String, BrowseError> {
        let removed = self.store.clear()?;
        info!(removed, "Cache cleared");
        Ok(format!(
            "Cache cleared successfully. {} entries removed.",
            removed
        ))
    }

    /// Human readable cache report
    pub fn cache_stats(&self) -> Result<String, BrowseError> {
        let stats = self.store.stats()?;
        Ok(format_stats(
            &stats,
            &self.store.location(),
            chrono::Utc::now().timestamp(),
        ))
    }

    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        let request = FetchRequest::new(url)
            .user_agent(self.config.user_agent.clone())
            .timeout(self.config.timeout);

        match self.fetcher.fetch(&request).await {
            Ok(page) if page.body.trim().is_empty() => {
                warn!(url, fetcher = self.fetcher.name(), "Empty response body");
                None
            }
            Ok(page) if page.truncated => {
                warn!(url, fetcher = self.fetcher.name(), "Response body incomplete");
                None
            }
            Ok(page) => Some(page),
            Err(err) => {
                warn!(url, fetcher = self.fetcher.name(), error = %err, "Fetch failed");
                None
            }
        }
    }

    /// Raw file behind a GitHub blob or edit URL, titled with the file name
    async fn fetch_github_file(&self, url: &str) -> Option<String> {
        let raw_url = to_raw(url);
        debug!(url, raw_url = %raw_url, "Fetching GitHub file directly");
        let page = self.fetch(&raw_url).await?;
        Some(format!("# {}\n\n{}", file_name(url), page.body))
    }

    async fn render(
        &self,
        url: &str,
        page: &FetchedPage,
        flags: Flags,
    ) -> (String, ContentSource) {
        let html = page.body.as_str();
        let navigation = if flags.include_navigation {
            format_navigation_as_markdown(&extract_navigation(html))
        } else {
            String::new()
        };
        let with_navigation = |content: String| {
            if navigation.is_empty() {
                content
            } else {
                format!("{}\n---\n\n{}", navigation, content)
            }
        };

        if flags.prefer_raw {
            if let Some(raw_url) = find_source_link(html).and_then(|link| link.raw_url()) {
                if let Some(raw) = self.fetch(&raw_url).await {
                    let content = with_navigation(raw.body);
                    let content = if content.starts_with("# ") {
                        content
                    } else {
                        let title = extract_title(html).unwrap_or_else(|| file_name(&raw_url));
                        format!("# {}\n\n{}", title, content)
                    };
                    return (content, ContentSource::GithubRaw);
                }
                debug!(url, raw_url = %raw_url, "Raw source unavailable, rendering page");
            }
        }

        let title = extract_title(html).unwrap_or_else(|| url.to_string());
        let markdown = if is_html(page.content_type.as_deref(), html) {
            html_to_markdown_with(html, flags.priority, &self.selector)
        } else {
            page.body.clone()
        };
        (
            format!("# {}\n\n{}", title, with_navigation(markdown)),
            ContentSource::Web,
        )
    }
}

/// Last path segment without the query string
fn file_name(url: &str) -> String {
    let segment = url.rsplit('/').next().unwrap_or(url);
    segment.split(['?', '#']).next().unwrap_or(segment).to_string()
}

fn options_suffix(options: &GrepOptions) -> String {
    let flags = options.to_cli_flags();
    if flags.is_empty() {
        String::new()
    } else {
        format!(" with options: {}", flags)
    }
}

fn respond(url: &str, source: ContentSource, content: &str, req: &BrowseRequest) -> String {
    match req.grep_options() {
        Some(options) => format!(
            "### Content from {} (source: {}, filtered by: '{}'{})\n\n{}",
            url,
            source,
            options.pattern,
            options_suffix(&options),
            grep_content(content, &options)
        ),
        None => format!("### Content from {} (source: {})\n\n{}", url, source, content),
    }
}

fn age(now: i64, timestamp: Option<i64>) -> String {
    match timestamp {
        Some(ts) => format!("{} hours old", (now - ts).max(0) / 3600),
        None => "N/A".to_string(),
    }
}

/// Render [`CacheStats`] as the text returned by the stats tool
pub fn format_stats(stats: &CacheStats, location: &str, now: i64) -> String {
    let mut out = String::from("Cache Statistics:\n");
    out.push_str(&format!("- Database location: {}\n", location));
    out.push_str(&format!("- Total pages cached: {}\n", stats.count));
    out.push_str(&format!("- Total cache size: {} KB\n", stats.total_size / 1024));
    out.push_str(&format!("- Oldest cache entry: {}\n", age(now, stats.oldest)));
    out.push_str(&format!("- Newest cache entry: {}\n", age(now, stats.newest)));
    out.push_str("- Recent URLs:\n");
    if stats.recent_urls.is_empty() {
        out.push_str("  - None\n");
    }
    for url in &stats.recent_urls {
        out.push_str(&format!("  - {}\n", url));
    }
    out.push_str("\nNote: Cache entries are kept indefinitely until manually cleared.");
    out
}
