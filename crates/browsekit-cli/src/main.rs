//! browsekit CLI - browse the web as markdown from the terminal or over MCP

mod mcp;

use browsekit::grep::{find_sections, highlight_matches, NO_MATCHES_MESSAGE};
use browsekit::{
    BrowseConfig, BrowseRequest, Browser, ContentPriority, SearchRequest, TOOL_LLMTXT,
};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// browsekit - web pages as LLM-friendly markdown
#[derive(Parser, Debug)]
#[command(name = "browsekit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Cache database path (overrides BROWSEKIT_DB_PATH)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Print full help with examples (llmtxt)
    #[arg(long)]
    llmtxt: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as MCP (Model Context Protocol) server over stdio
    Server,
    /// Fetch a URL and print it as markdown
    Browse {
        /// URL to fetch
        url: String,

        #[command(flatten)]
        grep: GrepArgs,

        /// Regex pattern to filter lines
        #[arg(long, short = 'g')]
        grep_pattern: Option<String>,

        /// Return whole markdown sections containing a match instead of lines
        #[arg(long, requires = "grep_pattern")]
        sections: bool,

        /// Wrap every match in markdown bold
        #[arg(long, requires = "grep_pattern")]
        highlight: bool,

        /// Render the page even when it links to a GitHub source
        #[arg(long)]
        no_raw: bool,

        /// Prepend the site navigation
        #[arg(long)]
        navigation: bool,

        /// Content extraction strategy: auto, main, article, largest or dense
        #[arg(long, short = 'p')]
        priority: Option<String>,

        /// Only accept raw GitHub content
        #[arg(long)]
        github_raw_only: bool,

        /// Custom User-Agent
        #[arg(long)]
        user_agent: Option<String>,
    },
    /// Search every cached page
    Search {
        /// Regex pattern to search for
        pattern: String,

        #[command(flatten)]
        grep: GrepArgs,
    },
    /// Manage the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Args, Debug)]
struct GrepArgs {
    /// Lines of context around matches
    #[arg(long, short = 'C', default_value_t = 0)]
    context: usize,

    /// Show non-matching lines
    #[arg(long, short = 'v')]
    invert: bool,

    /// Prefix lines with line numbers
    #[arg(long, short = 'n')]
    line_numbers: bool,

    /// Match whole words only
    #[arg(long, short = 'w')]
    words: bool,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Remove every cached page
    Clear,
    /// Show cache statistics
    Stats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so the MCP transport on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if cli.llmtxt {
        writeln_safe(TOOL_LLMTXT);
        std::process::exit(0);
    }

    let mut config = BrowseConfig::from_env();
    if let Some(path) = cli.db_path {
        config.db_path = path;
    }

    match cli.command {
        Some(Commands::Server) => {
            let browser = build_browser(config);
            mcp::run_server(browser).await;
        }
        Some(Commands::Browse {
            url,
            grep,
            grep_pattern,
            sections,
            highlight,
            no_raw,
            navigation,
            priority,
            github_raw_only,
            user_agent,
        }) => {
            if let Some(ua) = user_agent {
                config.user_agent = ua;
            }
            if let Some(priority) = priority {
                config.content_priority = ContentPriority::parse_lossy(&priority);
            }
            config.prefer_raw = !no_raw;
            config.include_navigation = navigation;
            config.github_raw_only = github_raw_only;

            let browser = build_browser(config);
            let line_pattern = if sections { None } else { grep_pattern.clone() };
            let request = browse_request(url, line_pattern, &grep);
            let result = browser.browse(&request).await;
            report(result.map(|out| match grep_pattern {
                Some(pattern) => post_filter(out, &pattern, sections, highlight),
                None => out,
            }));
        }
        Some(Commands::Search { pattern, grep }) => {
            let browser = build_browser(config);
            report(browser.search_cached(&search_request(pattern, &grep)));
        }
        Some(Commands::Cache { action }) => {
            let browser = build_browser(config);
            match action {
                CacheAction::Clear => report(browser.clear_cache()),
                CacheAction::Stats => report(browser.cache_stats()),
            }
        }
        None => {
            eprintln!("Usage: browsekit browse <URL>");
            eprintln!("   or: browsekit search <PATTERN>");
            eprintln!("   or: browsekit cache clear|stats");
            eprintln!("   or: browsekit server");
            eprintln!("   or: browsekit --help");
            std::process::exit(1);
        }
    }
}

fn build_browser(config: BrowseConfig) -> Browser {
    let db_path = config.db_path.clone();
    match Browser::builder().config(config).build() {
        Ok(browser) => browser,
        Err(e) => {
            eprintln!("Error opening cache at {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    }
}

fn browse_request(url: String, pattern: Option<String>, grep: &GrepArgs) -> BrowseRequest {
    BrowseRequest {
        url,
        grep_pattern: pattern,
        context_lines: grep.context,
        invert_match: grep.invert,
        show_line_numbers: grep.line_numbers,
        whole_words: grep.words,
        ..Default::default()
    }
}

fn search_request(pattern: String, grep: &GrepArgs) -> SearchRequest {
    SearchRequest {
        grep_pattern: pattern,
        context_lines: grep.context,
        invert_match: grep.invert,
        show_line_numbers: grep.line_numbers,
        whole_words: grep.words,
    }
}

/// Apply section selection and highlighting below the header line
fn post_filter(output: String, pattern: &str, sections: bool, highlight: bool) -> String {
    if !sections && !highlight {
        return output;
    }
    let Some((header, body)) = output.split_once("\n\n") else {
        return output;
    };

    let mut body = if sections {
        matching_sections(body, pattern)
    } else {
        body.to_string()
    };
    if highlight && body != NO_MATCHES_MESSAGE {
        body = highlight_matches(&body, pattern);
    }
    format!("{}\n\n{}", header, body)
}

fn matching_sections(content: &str, pattern: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let found = find_sections(content, pattern);
    if found.is_empty() {
        return NO_MATCHES_MESSAGE.to_string();
    }
    found
        .iter()
        .map(|&(start, end)| lines[start..=end].join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn report<E: std::fmt::Display>(result: Result<String, E>) {
    match result {
        Ok(text) => writeln_safe(&text),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_browse_flags() {
        let cli = Cli::parse_from([
            "browsekit",
            "browse",
            "https://example.com",
            "-g",
            "rust",
            "-C",
            "2",
            "-n",
            "--navigation",
            "--priority",
            "dense",
        ]);
        match cli.command {
            Some(Commands::Browse {
                url,
                grep,
                grep_pattern,
                navigation,
                priority,
                no_raw,
                ..
            }) => {
                assert_eq!(url, "https://example.com");
                assert_eq!(grep_pattern.as_deref(), Some("rust"));
                assert_eq!(grep.context, 2);
                assert!(grep.line_numbers);
                assert!(navigation);
                assert!(!no_raw);
                assert_eq!(priority.as_deref(), Some("dense"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_db_path() {
        let cli = Cli::parse_from(["browsekit", "cache", "stats", "--db-path", "/tmp/x.db"]);
        assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(
            cli.command,
            Some(Commands::Cache {
                action: CacheAction::Stats
            })
        ));
    }

    #[test]
    fn test_sections_requires_pattern() {
        let missing = Cli::try_parse_from(["browsekit", "browse", "https://example.com", "--sections"]);
        assert!(missing.is_err());
        let cli = Cli::try_parse_from([
            "browsekit",
            "browse",
            "https://example.com",
            "-g",
            "cargo",
            "--sections",
            "--highlight",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Browse {
                sections: true,
                highlight: true,
                ..
            })
        ));
    }

    const RENDERED: &str = "### Content from https://example.com (source: web)\n\n\
        # Intro\nhello\n## Install\nrun cargo build\n## Usage\nrun it";

    #[test]
    fn test_post_filter_sections() {
        let out = post_filter(RENDERED.to_string(), "cargo", true, false);
        assert_eq!(
            out,
            "### Content from https://example.com (source: web)\n\n## Install\nrun cargo build"
        );
        let none = post_filter(RENDERED.to_string(), "haskell", true, true);
        assert!(none.ends_with(NO_MATCHES_MESSAGE));
    }

    #[test]
    fn test_post_filter_highlight_leaves_header() {
        let out = post_filter(RENDERED.to_string(), "run", false, true);
        assert!(out.starts_with("### Content from https://example.com (source: web)\n\n"));
        assert!(out.contains("**run** cargo build"));
        assert_eq!(post_filter(RENDERED.to_string(), "run", false, false), RENDERED);
    }

    #[test]
    fn test_search_request_from_args() {
        let grep = GrepArgs {
            context: 1,
            invert: true,
            line_numbers: false,
            words: true,
        };
        let req = search_request("tokio".to_string(), &grep);
        assert_eq!(req.grep_pattern, "tokio");
        assert_eq!(req.context_lines, 1);
        assert!(req.invert_match);
        assert!(req.whole_words);
    }

    #[test]
    fn test_browse_request_leaves_flags_to_config() {
        let grep = GrepArgs {
            context: 0,
            invert: false,
            line_numbers: false,
            words: false,
        };
        let req = browse_request("https://example.com".to_string(), None, &grep);
        assert!(req.prefer_raw.is_none());
        assert!(req.include_navigation.is_none());
        assert!(req.grep_options().is_none());
    }
}
