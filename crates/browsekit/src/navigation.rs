//! Site navigation extraction
//!
//! Finds menus, sidebars and tables of contents in the original page and
//! flattens each into a leveled list of links, so an agent can keep moving
//! through a site after the content selector has thrown the chrome away.

use crate::dom::{class_contains, collapse_whitespace, is_heading, NEVER_CONTENT_TAGS};
use scraper::{ElementRef, Html};
use serde::Serialize;
use tracing::debug;

/// Class substrings marking a navigation container
const NAV_CLASS_PATTERNS: &[&str] = &[
    "menu",
    "navigation",
    "nav",
    "navbar",
    "sidebar",
    "toc",
    "table-of-contents",
];

/// Class substrings marking the current page's entry
const ACTIVE_PATTERNS: &[&str] = &["active", "current", "selected", "highlight"];

/// Lists need this many links before they count as navigation
const MIN_LIST_LINKS: usize = 3;

/// One entry of a navigation structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NavigationItem {
    Link {
        href: String,
        text: String,
        is_active: bool,
        level: usize,
    },
    /// A heading-like entry without a link, such as a `<summary>`
    Category { text: String, level: usize },
}

impl NavigationItem {
    pub fn level(&self) -> usize {
        match self {
            NavigationItem::Link { level, .. } | NavigationItem::Category { level, .. } => *level,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            NavigationItem::Link { text, .. } | NavigationItem::Category { text, .. } => text,
        }
    }
}

/// A menu, sidebar or table of contents found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationSection {
    pub title: Option<String>,
    /// Tag name of the container element
    pub source: String,
    /// Class tokens of the container element
    pub class_hints: Vec<String>,
    pub items: Vec<NavigationItem>,
}

fn is_list(name: &str) -> bool {
    matches!(name, "ul" | "ol")
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

fn element_text(el: ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn is_container(el: ElementRef) -> bool {
    let value = el.value();
    let name = value.name();
    if name == "nav" {
        return true;
    }
    if class_contains(value, NAV_CLASS_PATTERNS) {
        return true;
    }
    is_list(name)
        && el
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|d| d.value().name() == "a")
            .take(MIN_LIST_LINKS)
            .count()
            >= MIN_LIST_LINKS
}

/// Extract every navigation structure from a page, in document order
///
/// Every container yields its own section, so a `<ul>` inside a `<nav>`
/// appears twice. Containers that yield no items are dropped.
pub fn extract_navigation(html: &str) -> Vec<NavigationSection> {
    let doc = Html::parse_document(html);
    let mut sections = Vec::new();

    for el in doc.root_element().descendants().filter_map(ElementRef::wrap) {
        if !is_container(el) {
            continue;
        }

        let mut items = Vec::new();
        collect_children(el, 0, &mut items);
        if items.is_empty() {
            continue;
        }

        let value = el.value();
        sections.push(NavigationSection {
            title: infer_title(el),
            source: value.name().to_string(),
            class_hints: value.classes().map(str::to_string).collect(),
            items,
        });
    }

    debug!(sections = sections.len(), "Extracted navigation");
    sections
}

fn collect_children(el: ElementRef, level: usize, items: &mut Vec<NavigationItem>) {
    for child in child_elements(el) {
        collect_element(child, level, items);
    }
}

fn collect_element(el: ElementRef, level: usize, items: &mut Vec<NavigationItem>) {
    let name = el.value().name();
    match name {
        "a" => push_link(el, None, level, items),
        "li" => collect_list_item(el, level, items),
        "details" => collect_details(el, level, items),
        _ if is_heading(name) || NEVER_CONTENT_TAGS.contains(&name) => {}
        _ => collect_children(el, level, items),
    }
}

fn collect_list_item(li: ElementRef, level: usize, items: &mut Vec<NavigationItem>) {
    let anchor = child_elements(li)
        .find(|c| c.value().name() == "a")
        .or_else(|| own_anchor(li));

    match anchor {
        Some(a) => push_link(a, Some(li), level, items),
        None if has_nested_list(li) => {
            let text = own_text(li);
            if !text.is_empty() {
                items.push(NavigationItem::Category { text, level });
            }
        }
        None => {}
    }

    collect_nested(li, level + 1, items);
}

/// First anchor anywhere under `el`, not looking into nested lists
fn own_anchor(el: ElementRef) -> Option<ElementRef> {
    for child in child_elements(el) {
        let name = child.value().name();
        if name == "a" {
            return Some(child);
        }
        if is_list(name) || name == "details" {
            continue;
        }
        if let Some(found) = own_anchor(child) {
            return Some(found);
        }
    }
    None
}

fn has_nested_list(el: ElementRef) -> bool {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|d| is_list(d.value().name()) || d.value().name() == "details")
}

/// Text of a list item, leaving out its nested lists
fn own_text(el: ElementRef) -> String {
    fn walk(el: ElementRef, out: &mut String) {
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                out.push_str(text);
                out.push(' ');
            } else if let Some(child) = ElementRef::wrap(child) {
                let name = child.value().name();
                if !is_list(name) && name != "details" {
                    walk(child, out);
                }
            }
        }
    }
    let mut out = String::new();
    walk(el, &mut out);
    collapse_whitespace(&out)
}

/// Lists and disclosure widgets below a list item
fn collect_nested(el: ElementRef, level: usize, items: &mut Vec<NavigationItem>) {
    for child in child_elements(el) {
        let name = child.value().name();
        if is_list(name) {
            collect_children(child, level, items);
        } else if name == "details" {
            collect_details(child, level, items);
        } else if name != "a" {
            collect_nested(child, level, items);
        }
    }
}

fn collect_details(details: ElementRef, level: usize, items: &mut Vec<NavigationItem>) {
    let mut inner_level = level;
    if let Some(summary) = child_elements(details).find(|c| c.value().name() == "summary") {
        let text = element_text(summary);
        if !text.is_empty() {
            items.push(NavigationItem::Category { text, level });
            inner_level = level + 1;
        }
    }
    for child in child_elements(details) {
        if child.value().name() != "summary" {
            collect_element(child, inner_level, items);
        }
    }
}

fn push_link(
    a: ElementRef,
    li: Option<ElementRef>,
    level: usize,
    items: &mut Vec<NavigationItem>,
) {
    let Some(href) = a.value().attr("href").map(str::trim) else {
        return;
    };
    if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
        return;
    }
    let text = element_text(a);
    if text.is_empty() {
        return;
    }

    let is_active = marks_active(a) || li.is_some_and(marks_active);
    items.push(NavigationItem::Link {
        href: href.to_string(),
        text,
        is_active,
        level,
    });
}

fn marks_active(el: ElementRef) -> bool {
    let value = el.value();
    value.attr("aria-current").is_some() || class_contains(value, ACTIVE_PATTERNS)
}

fn infer_title(el: ElementRef) -> Option<String> {
    let previous = el
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|p| is_heading(p.value().name()));
    if let Some(heading) = previous {
        let text = element_text(heading);
        if !text.is_empty() {
            return Some(text);
        }
    }

    let descendants = || el.descendants().skip(1).filter_map(ElementRef::wrap);

    if let Some(heading) = descendants().find(|d| is_heading(d.value().name())) {
        let text = element_text(heading);
        if !text.is_empty() {
            return Some(text);
        }
    }

    let titled = descendants()
        .filter(|d| class_contains(d.value(), &["title"]))
        .map(element_text)
        .find(|text| !text.is_empty());
    if titled.is_some() {
        return titled;
    }

    if let Some(label) = el.value().attr("aria-label").map(str::trim) {
        if !label.is_empty() {
            return Some(label.to_string());
        }
    }

    el.value().id().map(title_case).filter(|t| !t.is_empty())
}

/// `main-menu_links` becomes `Main Menu Links`
fn title_case(id: &str) -> String {
    id.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render sections as markdown bullet lists, one `##` heading per section
pub fn format_navigation_as_markdown(sections: &[NavigationSection]) -> String {
    sections
        .iter()
        .map(|section| {
            let mut out = format!(
                "## {}\n\n",
                section.title.as_deref().unwrap_or("Navigation")
            );
            for item in &section.items {
                let indent = "  ".repeat(item.level());
                match item {
                    NavigationItem::Link {
                        href,
                        text,
                        is_active,
                        ..
                    } => {
                        let current = if *is_active { " (current)" } else { "" };
                        out.push_str(&format!("{indent}- [{text}]({href}){current}\n"));
                    }
                    NavigationItem::Category { text, .. } => {
                        out.push_str(&format!("{indent}- **{text}**\n"));
                    }
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(href: &str, text: &str, level: usize) -> NavigationItem {
        NavigationItem::Link {
            href: href.to_string(),
            text: text.to_string(),
            is_active: false,
            level,
        }
    }

    #[test]
    fn test_short_list_is_not_navigation() {
        let html = r#"<body><ul><li><a href="/a">A</a></li><li><a href="/b">B</a></li></ul></body>"#;
        assert!(extract_navigation(html).is_empty());
    }

    #[test]
    fn test_list_with_three_links() {
        let html = r#"<body><ul>
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
            <li><a href="/c">C</a></li>
        </ul></body>"#;
        let sections = extract_navigation(html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].source, "ul");
        assert_eq!(
            sections[0].items,
            vec![link("/a", "A", 0), link("/b", "B", 0), link("/c", "C", 0)]
        );
    }

    #[test]
    fn test_nested_lists_and_active() {
        let html = r#"<nav aria-label="Docs">
            <ul>
              <li><a href="/guide">Guide</a>
                <ul>
                  <li class="active"><a href="/guide/install">Install</a></li>
                  <li><a href="/guide/usage" aria-current="page">Usage</a></li>
                </ul>
              </li>
              <li>Reference
                <ul><li><a href="/ref/api">API</a></li></ul>
              </li>
            </ul>
        </nav>"#;
        let sections = extract_navigation(html);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].source, "ul");
        assert_eq!(sections[1].items, sections[0].items);
        let section = &sections[0];
        assert_eq!(section.title.as_deref(), Some("Docs"));
        assert_eq!(section.source, "nav");
        assert_eq!(
            section.items,
            vec![
                link("/guide", "Guide", 0),
                NavigationItem::Link {
                    href: "/guide/install".into(),
                    text: "Install".into(),
                    is_active: true,
                    level: 1
                },
                NavigationItem::Link {
                    href: "/guide/usage".into(),
                    text: "Usage".into(),
                    is_active: true,
                    level: 1
                },
                NavigationItem::Category {
                    text: "Reference".into(),
                    level: 0
                },
                link("/ref/api", "API", 1),
            ]
        );
    }

    #[test]
    fn test_details_summary_category() {
        let html = r#"<div class="sidebar">
            <details>
              <summary>Advanced</summary>
              <ul><li><a href="/adv/one">One</a></li></ul>
            </details>
            <a href="/faq">FAQ</a>
        </div>"#;
        let sections = extract_navigation(html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].class_hints, vec!["sidebar".to_string()]);
        assert_eq!(
            sections[0].items,
            vec![
                NavigationItem::Category {
                    text: "Advanced".into(),
                    level: 0
                },
                link("/adv/one", "One", 1),
                link("/faq", "FAQ", 0),
            ]
        );
    }

    fn first_title(html: &str) -> Option<String> {
        extract_navigation(html).into_iter().next().and_then(|s| s.title)
    }

    #[test]
    fn test_title_inference() {
        assert_eq!(
            first_title(r##"<body><h3>On this page</h3><div class="toc"><a href="#a">A</a></div></body>"##),
            Some("On this page".to_string())
        );
        assert_eq!(
            first_title(r#"<div class="menu"><span class="menu-title">Products</span><a href="/p">P</a></div>"#),
            Some("Products".to_string())
        );
        assert_eq!(
            first_title(r#"<nav><h4>Topics</h4><a href="/t">T</a></nav>"#),
            Some("Topics".to_string())
        );
        assert_eq!(
            first_title(r#"<div class="nav-links" id="footer-links_main"><a href="/x">X</a></div>"#),
            Some("Footer Links Main".to_string())
        );
        assert_eq!(first_title(r#"<nav><a href="/y">Y</a></nav>"#), None);
    }

    #[test]
    fn test_title_from_earlier_heading_sibling() {
        let html = r#"<body><h2>Docs</h2><p>intro</p><nav><a href="/y">Y</a></nav></body>"#;
        assert_eq!(first_title(html), Some("Docs".to_string()));
    }

    #[test]
    fn test_nested_containers_each_yield_a_section() {
        let html = r#"<nav><ul>
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
            <li><a href="/c">C</a></li>
        </ul></nav>"#;
        let sections = extract_navigation(html);
        let sources: Vec<_> = sections.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(sources, vec!["nav", "ul"]);
        assert_eq!(sections[0].items, sections[1].items);
        assert_eq!(sections[1].items.len(), 3);
    }

    #[test]
    fn test_class_container_of_any_tag() {
        let html = r#"<header class="navbar"><a href="/">Home</a><a href="/blog">Blog</a></header>"#;
        let sections = extract_navigation(html);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].source, "header");
        assert_eq!(
            sections[0].items,
            vec![link("/", "Home", 0), link("/blog", "Blog", 0)]
        );
    }

    #[test]
    fn test_skips_javascript_and_empty_links() {
        let html = r#"<nav><a href="javascript:void(0)">Toggle</a><a href="/a"></a><a href="/b">B</a></nav>"#;
        let sections = extract_navigation(html);
        assert_eq!(sections[0].items, vec![link("/b", "B", 0)]);
    }

    #[test]
    fn test_empty_container_dropped() {
        assert!(extract_navigation("<nav><p>Nothing</p></nav>").is_empty());
    }

    #[test]
    fn test_format_navigation_as_markdown() {
        let sections = vec![
            NavigationSection {
                title: Some("Docs".into()),
                source: "nav".into(),
                class_hints: vec![],
                items: vec![
                    NavigationItem::Category {
                        text: "Start".into(),
                        level: 0,
                    },
                    NavigationItem::Link {
                        href: "/intro".into(),
                        text: "Intro".into(),
                        is_active: true,
                        level: 1,
                    },
                ],
            },
            NavigationSection {
                title: None,
                source: "ul".into(),
                class_hints: vec![],
                items: vec![link("/a", "A", 0)],
            },
        ];
        assert_eq!(
            format_navigation_as_markdown(&sections),
            "## Docs\n\n- **Start**\n  - [Intro](/intro) (current)\n\n## Navigation\n\n- [A](/a)\n"
        );
        assert_eq!(format_navigation_as_markdown(&[]), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("main-menu_links"), "Main Menu Links");
        assert_eq!(title_case("--"), "");
    }
}
