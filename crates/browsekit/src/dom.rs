//! Read-only helpers over a parsed document
//!
//! Documents are parsed once and never edited. Anything that should disappear
//! from the output is recorded in a [`NodeSet`] and skipped when text is
//! measured or markup is serialized.

use ego_tree::{NodeId, NodeRef};
use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use tracing::warn;

/// Set of excluded nodes, keyed by stable node id
pub type NodeSet = HashSet<NodeId>;

/// Elements that never contain readable content
pub const NEVER_CONTENT_TAGS: &[&str] = &[
    "script", "style", "meta", "noscript", "iframe", "svg", "template", "link",
];

/// Elements that hold page chrome rather than content
pub const STRUCTURAL_TAGS: &[&str] = &["nav", "header", "footer"];

/// Void elements have no closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Parse a CSS selector, logging instead of panicking on bad input
pub fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            warn!(selector = css, error = ?err, "Ignoring invalid selector");
            None
        }
    }
}

/// All elements in the document matching `css`, in document order
pub fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match parse_selector(css) {
        Some(selector) => doc.select(&selector).collect(),
        None => Vec::new(),
    }
}

/// Ids of every element whose tag is in `tags`
pub fn mark_tags(doc: &Html, tags: &[&str]) -> NodeSet {
    doc.tree
        .nodes()
        .filter(|node| match node.value() {
            Node::Element(el) => tags.contains(&el.name()),
            _ => false,
        })
        .map(|node| node.id())
        .collect()
}

/// True if the element or one of its ancestors is in `set`
pub fn is_within(el: &ElementRef, set: &NodeSet) -> bool {
    set.contains(&el.id()) || el.ancestors().any(|a| set.contains(&a.id()))
}

/// True if an ancestor (not the element itself) has one of the given tags
pub fn has_ancestor_tag(el: &ElementRef, tags: &[&str]) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| tags.contains(&a.value().name()))
}

/// Class tokens and the id attribute, lowercased
fn class_and_id(el: &Element) -> impl Iterator<Item = String> + '_ {
    el.classes()
        .chain(el.id())
        .map(|token| token.to_ascii_lowercase())
}

/// Match class tokens or id against substring patterns
pub fn class_or_id_contains(el: &Element, patterns: &[&str]) -> bool {
    class_and_id(el).any(|token| patterns.iter().any(|p| token.contains(p)))
}

/// Match class tokens only against substring patterns
pub fn class_contains(el: &Element, patterns: &[&str]) -> bool {
    el.classes().any(|class| {
        let class = class.to_ascii_lowercase();
        patterns.iter().any(|p| class.contains(p))
    })
}

pub fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Raw descendant text, skipping excluded subtrees
pub fn visible_text(el: ElementRef, excluded: &NodeSet) -> String {
    let mut out = String::new();
    push_text(*el, excluded, &mut out);
    out
}

fn push_text(node: NodeRef<Node>, excluded: &NodeSet, out: &mut String) {
    for child in node.children() {
        if excluded.contains(&child.id()) {
            continue;
        }
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => push_text(child, excluded, out),
            _ => {}
        }
    }
}

/// Length in characters of the whitespace-collapsed visible text
pub fn text_len(el: ElementRef, excluded: &NodeSet) -> usize {
    collapse_whitespace(&visible_text(el, excluded)).chars().count()
}

/// Number of descendant elements with the given tag that are not excluded
pub fn count_tag(el: ElementRef, tag: &str, excluded: &NodeSet) -> usize {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|d| d.value().name() == tag && !is_within(d, excluded))
        .count()
}

/// Serialize an element and its subtree, leaving out excluded nodes
pub fn outer_html(el: ElementRef, excluded: &NodeSet) -> String {
    let mut out = String::new();
    write_node(*el, excluded, &mut out);
    out
}

/// Serialize the children of an element, leaving out excluded nodes
pub fn inner_html(el: ElementRef, excluded: &NodeSet) -> String {
    let mut out = String::new();
    for child in el.children() {
        write_node(child, excluded, &mut out);
    }
    out
}

fn write_node(node: NodeRef<Node>, excluded: &NodeSet, out: &mut String) {
    if excluded.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Document | Node::Fragment => {
            for child in node.children() {
                write_node(child, excluded, out);
            }
        }
        Node::Text(text) => escape_into(text, false, out),
        Node::Element(el) => {
            let name = el.name();
            out.push('<');
            out.push_str(name);
            for (attr, value) in el.attrs() {
                out.push(' ');
                out.push_str(attr);
                out.push_str("=\"");
                escape_into(value, true, out);
                out.push('"');
            }
            out.push('>');
            if VOID_TAGS.contains(&name) {
                return;
            }
            for child in node.children() {
                write_node(child, excluded, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        _ => {}
    }
}

fn escape_into(s: &str, attribute: bool, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_tags_and_serialize() {
        let doc = Html::parse_document(
            "<html><body><div id=\"a\"><script>x()</script><p>Hi &amp; bye</p></div></body></html>",
        );
        let removed = mark_tags(&doc, NEVER_CONTENT_TAGS);
        let div = select(&doc, "div")[0];
        assert_eq!(
            outer_html(div, &removed),
            "<div id=\"a\"><p>Hi &amp; bye</p></div>"
        );
        assert_eq!(inner_html(div, &removed), "<p>Hi &amp; bye</p>");
    }

    #[test]
    fn test_visible_text_skips_excluded() {
        let doc = Html::parse_document("<div><style>.x{}</style>Hello <b>world</b></div>");
        let removed = mark_tags(&doc, NEVER_CONTENT_TAGS);
        let div = select(&doc, "div")[0];
        assert_eq!(collapse_whitespace(&visible_text(div, &removed)), "Hello world");
        assert_eq!(text_len(div, &removed), 11);
    }

    #[test]
    fn test_void_elements_not_closed() {
        let doc = Html::parse_document("<p>a<br>b<img src=\"x.png\"></p>");
        let p = select(&doc, "p")[0];
        assert_eq!(
            outer_html(p, &NodeSet::new()),
            "<p>a<br>b<img src=\"x.png\"></p>"
        );
    }

    #[test]
    fn test_class_or_id_contains() {
        let doc = Html::parse_document(
            "<div class=\"Main comment-section\"></div><div id=\"advertisement-top\"></div><div class=\"plain\"></div>",
        );
        let divs = select(&doc, "div");
        let patterns = ["comment-section", "advertisement"];
        assert!(class_or_id_contains(divs[0].value(), &patterns));
        assert!(class_or_id_contains(divs[1].value(), &patterns));
        assert!(!class_or_id_contains(divs[2].value(), &patterns));
    }

    #[test]
    fn test_has_ancestor_tag_and_count() {
        let doc = Html::parse_document(
            "<header><div class=\"content\"><a href=\"/\">1</a><a href=\"/2\">2</a></div></header>",
        );
        let div = select(&doc, "div.content")[0];
        assert!(has_ancestor_tag(&div, STRUCTURAL_TAGS));
        assert_eq!(count_tag(div, "a", &NodeSet::new()), 2);
    }

    #[test]
    fn test_invalid_selector_is_empty() {
        let doc = Html::parse_document("<p>x</p>");
        assert!(select(&doc, "p[").is_empty());
    }
}
