//! browsekit - web pages as LLM-friendly markdown
//!
//! This crate fetches web pages and turns them into compact markdown for
//! language models: it picks the main content region, optionally keeps the
//! site navigation, prefers raw GitHub sources when a page links to one, and
//! caches every rendering in SQLite.
//!
//! ## Pipeline
//!
//! A [`Browser`] runs one browse request as:
//! URL normalization, GitHub file short-circuit, cache lookup, then on a miss
//! fetch, content selection, navigation extraction, markdown rendering and a
//! cache write. An optional grep filter is applied to the result.
//!
//! Pages are fetched through the [`Fetcher`] trait ([`HttpFetcher`] by
//! default) and cached through [`CacheStore`] ([`SqliteStore`] or
//! [`MemoryStore`]).

mod browser;
pub mod cache;
pub mod config;
mod convert;
pub mod dom;
mod error;
pub mod extract;
pub mod fetchers;
pub mod github;
pub mod grep;
pub mod navigation;
mod tool;
mod types;
pub mod urls;

pub use browser::{format_stats, Browser, BrowserBuilder, ContentSource};
pub use cache::{CacheEntry, CacheKey, CacheStats, CacheStore, MemoryStore, SqliteStore};
pub use config::BrowseConfig;
pub use convert::{extract_title, html_to_markdown, html_to_markdown_with, html_to_text, is_html};
pub use error::{BrowseError, ConvertError, FetchError, StoreError};
pub use extract::{extract_main_content, ContentSelector, ScoringWeights};
pub use fetchers::{Fetcher, HttpFetcher};
pub use grep::{grep_content, GrepOptions};
pub use navigation::{extract_navigation, format_navigation_as_markdown};
pub use tool::{call_tool, tool_definitions, ToolDefinition};
pub use types::{BrowseRequest, ContentPriority, FetchRequest, FetchedPage, SearchRequest};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = "browsekit/0.1";

/// Tool description for LLM consumption
pub const TOOL_DESCRIPTION: &str = r#"Fetch a URL and return its main content as markdown.

- Extracts the main content region and drops page chrome
- Uses raw GitHub sources when the page links to one
- Optionally prepends the site navigation
- Filters the result with a grep pattern
- Caches every rendering; repeated calls are served from the cache"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# browsekit

Fetches web pages and returns them as LLM-friendly markdown.

## Tools
- `browse_url`: fetch one page as markdown
- `search_cached_content`: grep every cached page
- `clear_cache`: remove every cached page
- `get_cache_stats`: report cache size, age and recent URLs

## browse_url Parameters
- `url` (required): the URL to fetch (must have a scheme and host)
- `grep_pattern` (optional): regex; only matching lines are returned
- `context_lines` (optional): lines of context around matches, like grep -C
- `invert_match` (optional): return non-matching lines, like grep -v
- `show_line_numbers` (optional): prefix lines with numbers, like grep -n
- `whole_words` (optional): match whole words only, like grep -w
- `prefer_raw` (optional): use raw GitHub sources when found (default: true)
- `include_navigation` (optional): prepend the site navigation (default: false)
- `content_priority` (optional): auto, main, article, largest or dense
- `github_raw_only` (optional): fail unless raw GitHub content is available

## Output
A header line names the source (`cache`, `web` or `github_raw`) and the
filter, followed by the markdown:

    ### Content from https://example.com (source: web)

    # Example Domain
    ...

## Examples

### Read a documentation page with its navigation
```json
{"url": "https://docs.rs/tokio/latest/tokio/", "include_navigation": true}
```

### Find every mention of "timeout" with context
```json
{"url": "https://example.com/guide", "grep_pattern": "timeout", "context_lines": 2}
```

### Read a GitHub file
```json
{"url": "https://github.com/owner/repo/blob/main/README.md"}
```

## Error Handling
- Invalid URLs return an error
- Failed fetches return an error and are not cached
- An unknown `content_priority` falls back to `auto`
"#;
