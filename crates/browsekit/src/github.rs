//! GitHub source resolution
//!
//! Documentation sites often link to the markdown file they were rendered
//! from. When such a link exists, the raw file is usually a better source than
//! the rendered page.

use crate::dom::{collapse_whitespace, parse_selector};
use scraper::Html;
use tracing::debug;
use url::Url;

const RAW_HOST: &str = "raw.githubusercontent.com";

/// Link texts that typically point at a page's source file
const EDIT_PHRASES: &[&str] = &[
    "edit this page",
    "edit on github",
    "view source",
    "view on github",
    "improve this page",
    "suggest changes",
    "edit page",
];

fn is_github_host(url: &Url) -> bool {
    url.host_str() == Some("github.com")
}

/// True for `github.com` URLs that point at a file (`/blob/` or `/edit/`)
pub fn is_github_file_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            let path = parsed.path();
            is_github_host(&parsed) && (path.contains("/blob/") || path.contains("/edit/"))
        }
        Err(_) => false,
    }
}

/// Rewrite a GitHub blob or edit URL to the raw file URL
///
/// `/edit/<ref>/path` becomes `/raw/<ref>/path` on github.com, which redirects
/// to the raw file. `/blob/<ref>/path` goes straight to
/// `raw.githubusercontent.com`. The query string is kept. Anything else is
/// returned unchanged.
pub fn to_raw(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if !is_github_host(&parsed) {
        return url.to_string();
    }

    let path = parsed.path().to_string();
    if path.contains("/edit/") {
        parsed.set_path(&path.replacen("/edit/", "/raw/", 1));
    } else if path.contains("/blob/") {
        if parsed.set_host(Some(RAW_HOST)).is_err() {
            return url.to_string();
        }
        parsed.set_path(&path.replacen("/blob/", "/", 1));
    } else {
        return url.to_string();
    }
    parsed.set_fragment(None);
    parsed.to_string()
}

/// An anchor found on a page, with GitHub classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub href: String,
    pub text: String,
    pub is_github: bool,
    pub is_blob: bool,
    pub is_edit: bool,
    pub is_tree: bool,
    /// Link text reads like "Edit this page" or "View source"
    pub matches_edit_phrase: bool,
}

impl LinkInfo {
    fn new(href: String, text: String) -> Self {
        let parsed = Url::parse(&href).ok();
        let is_github = parsed.as_ref().is_some_and(is_github_host);
        let path = parsed.as_ref().map(|u| u.path()).unwrap_or_default();
        let lower = text.to_lowercase();

        Self {
            is_blob: is_github && path.contains("/blob/"),
            is_edit: is_github && path.contains("/edit/"),
            is_tree: is_github && path.contains("/tree/"),
            matches_edit_phrase: EDIT_PHRASES.iter().any(|p| lower.contains(p)),
            is_github,
            href,
            text,
        }
    }

    /// Points at a file or directory inside a repository
    pub fn is_source(&self) -> bool {
        self.is_blob || self.is_edit || self.is_tree
    }

    /// Raw content URL, for blob and edit links only
    pub fn raw_url(&self) -> Option<String> {
        (self.is_blob || self.is_edit).then(|| to_raw(&self.href))
    }
}

/// Every anchor with an `href`, in document order
///
/// `javascript:` links are skipped.
pub fn extract_links(markup: &str) -> Vec<LinkInfo> {
    let Some(selector) = parse_selector("a[href]") else {
        return Vec::new();
    };
    let doc = Html::parse_document(markup);

    doc.select(&selector)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
                return None;
            }
            let text = collapse_whitespace(&a.text().collect::<String>());
            Some(LinkInfo::new(href.to_string(), text))
        })
        .collect()
}

/// Find the link most likely to point at the page's GitHub source
///
/// Preference order: a repository file link with "edit this page" style text,
/// then any repository file link, then any GitHub link.
pub fn find_source_link(markup: &str) -> Option<LinkInfo> {
    let links: Vec<LinkInfo> = extract_links(markup)
        .into_iter()
        .filter(|l| l.is_github)
        .collect();

    let found = links
        .iter()
        .find(|l| l.is_source() && l.matches_edit_phrase)
        .or_else(|| links.iter().find(|l| l.is_source()))
        .or_else(|| links.first())
        .cloned();

    if let Some(link) = &found {
        debug!(href = %link.href, text = %link.text, "Found GitHub source link");
    }
    found
}
