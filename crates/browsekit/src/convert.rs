//! HTML conversion utilities
//!
//! Rendering walks the parsed tree and emits markdown per element. The output
//! then goes through a few textual cleanup passes. [`html_to_markdown_with`]
//! wraps everything in a fallback chain so a page always yields some text.

use crate::dom::{collapse_whitespace, select, NEVER_CONTENT_TAGS};
use crate::error::ConvertError;
use crate::extract::ContentSelector;
use crate::types::ContentPriority;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::warn;

/// Elements rendered as their own paragraph
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "aside", "nav", "figure",
    "figcaption", "dl", "dt", "dd", "address", "details", "summary", "form", "fieldset",
];

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: Option<&str>, body: &str) -> bool {
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    let head: String = body.trim_start().chars().take(15).collect();
    let head = head.to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Page title from `<title>`, else the first `<h1>`
pub fn extract_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    ["title", "h1"].iter().find_map(|tag| {
        select(&doc, tag)
            .into_iter()
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
    })
}

/// Convert HTML to markdown using `auto` content selection
pub fn html_to_markdown(html: &str) -> String {
    html_to_markdown_with(html, ContentPriority::Auto, &ContentSelector::default())
}

/// Convert HTML to markdown, degrading step by step on failure
///
/// 1. select the main content and render it with cleanup passes
/// 2. render the whole document without selection or cleanup
/// 3. flat text extraction
pub fn html_to_markdown_with(
    html: &str,
    priority: ContentPriority,
    selector: &ContentSelector,
) -> String {
    match full_conversion(html, priority, selector) {
        Ok(markdown) => return markdown,
        Err(err) => warn!(error = %err, "Markdown conversion failed, trying plain conversion"),
    }
    match plain_conversion(html) {
        Ok(markdown) => return markdown,
        Err(err) => warn!(error = %err, "Plain conversion failed, falling back to text"),
    }
    html_to_text(html)
}

fn full_conversion(
    html: &str,
    priority: ContentPriority,
    selector: &ContentSelector,
) -> Result<String, ConvertError> {
    let selected = selector.select(html, priority);
    let fragment = Html::parse_fragment(&selected);
    let mut rendered = String::new();
    render_children(fragment.root_element(), &mut rendered);
    non_empty(post_process(&rendered)?)
}

fn plain_conversion(html: &str) -> Result<String, ConvertError> {
    let doc = Html::parse_document(html);
    let mut rendered = String::new();
    render_element(doc.root_element(), &mut rendered);
    non_empty(rendered.trim().to_string())
}

fn non_empty(markdown: String) -> Result<String, ConvertError> {
    if markdown.trim().is_empty() {
        Err(ConvertError::EmptyOutput)
    } else {
        Ok(markdown)
    }
}

/// Convert HTML to plain text, one block per line
pub fn html_to_text(html: &str) -> String {
    fn walk(el: ElementRef, preformatted: bool, out: &mut String) {
        for child in el.children() {
            if let Some(text) = child.value().as_text() {
                if preformatted {
                    out.push_str(text);
                } else {
                    out.push_str(&text.replace('\n', " "));
                }
            } else if let Some(child) = ElementRef::wrap(child) {
                let name = child.value().name();
                if NEVER_CONTENT_TAGS.contains(&name) || name == "head" {
                    continue;
                }
                let block = name == "br"
                    || name == "li"
                    || name == "tr"
                    || name == "pre"
                    || BLOCK_TAGS.contains(&name)
                    || crate::dom::is_heading(name);
                if block {
                    out.push('\n');
                }
                walk(child, preformatted || name == "pre", out);
                if block {
                    out.push('\n');
                }
            }
        }
    }

    let doc = Html::parse_document(html);
    let mut out = String::new();
    walk(doc.root_element(), false, &mut out);
    out.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_to_string(el: ElementRef) -> String {
    let mut out = String::new();
    render_children(el, &mut out);
    out
}

fn render_children(el: ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            push_text(text, out);
        } else if let Some(child) = ElementRef::wrap(child) {
            render_element(child, out);
        }
    }
}

/// Append text with whitespace runs collapsed
fn push_text(text: &str, out: &mut String) {
    let mut last_space = out.is_empty() || out.ends_with(char::is_whitespace);
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(c);
            last_space = false;
        }
    }
}

fn push_block(content: &str, out: &mut String) {
    if content.is_empty() {
        return;
    }
    out.push_str("\n\n");
    out.push_str(content);
    out.push_str("\n\n");
}

fn render_element(el: ElementRef, out: &mut String) {
    let name = el.value().name();
    match name {
        _ if NEVER_CONTENT_TAGS.contains(&name) => {}
        "head" | "title" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = collapse_whitespace(&render_to_string(el));
            if !text.is_empty() {
                push_block(&format!("{} {}", "#".repeat(level), text), out);
            }
        }
        "br" => out.push('\n'),
        "hr" => push_block("---", out),
        "strong" | "b" => wrap_inline(el, "**", out),
        "em" | "i" => wrap_inline(el, "*", out),
        "code" | "kbd" | "samp" => {
            let text = el.text().collect::<String>();
            if !text.trim().is_empty() {
                out.push('`');
                out.push_str(text.trim());
                out.push('`');
            }
        }
        "pre" => push_block(&fenced_code(el), out),
        "a" => render_link(el, out),
        "img" => render_image(el, out),
        "ul" | "ol" => push_block(&render_list(el), out),
        "li" => push_block(&list_item("- ", el), out),
        "blockquote" => push_block(&render_quote(el), out),
        "table" => push_block(&render_table(el), out),
        _ if BLOCK_TAGS.contains(&name) => push_block(render_to_string(el).trim(), out),
        _ => render_children(el, out),
    }
}

fn wrap_inline(el: ElementRef, marker: &str, out: &mut String) {
    let inner = render_to_string(el);
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        push_text(&inner, out);
        return;
    }
    if inner.starts_with(char::is_whitespace) {
        push_text(" ", out);
    }
    out.push_str(marker);
    out.push_str(trimmed);
    out.push_str(marker);
    if inner.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn render_link(el: ElementRef, out: &mut String) {
    let text = collapse_whitespace(&render_to_string(el));
    if text.is_empty() {
        return;
    }
    match el.value().attr("href").map(str::trim).filter(|h| !h.is_empty()) {
        Some(href) => out.push_str(&format!("[{}]({})", text, href)),
        None => push_text(&text, out),
    }
}

fn render_image(el: ElementRef, out: &mut String) {
    let value = el.value();
    let alt = value.attr("alt").map(collapse_whitespace).unwrap_or_default();
    let Some(src) = value.attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
        return;
    };
    if src.to_ascii_lowercase().starts_with("data:image") {
        if !alt.is_empty() {
            out.push_str(&format!("[Image: {}]", alt));
        }
        return;
    }
    out.push_str(&format!("![{}]({})", alt, src));
}

fn code_language(el: ElementRef) -> Option<String> {
    el.value().classes().find_map(|class| {
        class
            .strip_prefix("language-")
            .or_else(|| class.strip_prefix("lang-"))
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
    })
}

fn fenced_code(pre: ElementRef) -> String {
    let language = pre
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|d| d.value().name() == "code")
        .and_then(code_language)
        .or_else(|| code_language(pre))
        .unwrap_or_default();
    let code = pre.text().collect::<String>();
    format!("```{}\n{}\n```", language, code.trim_matches('\n'))
}

fn render_list(list: ElementRef) -> String {
    let ordered = list.value().name() == "ol";
    let start = list
        .value()
        .attr("start")
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(1);

    let mut lines = Vec::new();
    let mut number = start;
    for child in list.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "li" => {
                let marker = if ordered {
                    format!("{}. ", number)
                } else {
                    "- ".to_string()
                };
                number += 1;
                let item = list_item(&marker, child);
                if !item.is_empty() {
                    lines.push(item);
                }
            }
            // a list directly inside a list, as some generators emit
            "ul" | "ol" => {
                let nested = render_list(child);
                lines.extend(nested.lines().map(|line| format!("  {}", line)));
            }
            _ => {}
        }
    }
    lines.join("\n")
}

/// One list item: marker on the first line, the rest indented under it
fn list_item(marker: &str, li: ElementRef) -> String {
    let content = render_to_string(li);
    let indent = " ".repeat(marker.len());
    let mut lines = content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty());

    let Some(first) = lines.next() else {
        return String::new();
    };
    let mut out = format!("{}{}", marker, first.trim_start());
    for line in lines {
        out.push('\n');
        out.push_str(&indent);
        out.push_str(line);
    }
    out
}

fn render_quote(el: ElementRef) -> String {
    let inner = render_to_string(el);
    let mut lines: Vec<String> = Vec::new();
    for line in inner.trim().lines().map(str::trim_end) {
        if !line.is_empty() {
            lines.push(format!("> {}", line));
        } else if lines.last().is_some_and(|l| l != ">") {
            lines.push(">".to_string());
        }
    }
    lines.join("\n")
}

fn render_table(table: ElementRef) -> String {
    let rows: Vec<Vec<String>> = table
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|row| row.value().name() == "tr" && owning_table(*row) == Some(table.id()))
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "th" | "td"))
                .map(|cell| collapse_whitespace(&render_to_string(cell)).replace('|', "\\|"))
                .collect()
        })
        .filter(|cells: &Vec<String>| !cells.is_empty())
        .collect();

    let Some(width) = rows.iter().map(Vec::len).max() else {
        return String::new();
    };

    let format_row = |cells: &[String]| {
        let mut padded: Vec<&str> = cells.iter().map(String::as_str).collect();
        padded.resize(width, "");
        format!("| {} |", padded.join(" | "))
    };

    // the first row is the header, whether or not it used <th>
    let mut lines = vec![format_row(rows[0].as_slice())];
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(rows[1..].iter().map(|row| format_row(row.as_slice())));
    lines.join("\n")
}

fn owning_table(row: ElementRef) -> Option<ego_tree::NodeId> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
        .map(|t| t.id())
}

fn post_process(markdown: &str) -> Result<String, ConvertError> {
    let trailing_space = Regex::new(r"[ \t]+\n")?;
    let blank_runs = Regex::new(r"\n{3,}")?;
    // any `[a][b]` pair, defined reference or not
    let reference_link = Regex::new(r"\[([^\]]+)\]\[([^\]]+)\]")?;

    let text = trailing_space.replace_all(markdown, "\n");
    let text = blank_runs.replace_all(&text, "\n\n");
    let text = tighten_fences(&text);
    let text = space_after_lists(&text);
    let text = reference_link.replace_all(&text, "[$1]($2)");
    Ok(text.trim().to_string())
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Remove blank lines directly inside code fences
fn tighten_fences(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut after_open = false;

    for line in text.split('\n') {
        if is_fence(line) {
            if in_fence {
                while out.last().is_some_and(|l| l.trim().is_empty()) {
                    out.pop();
                }
            }
            in_fence = !in_fence;
            after_open = in_fence;
            out.push(line);
            continue;
        }
        if after_open && line.trim().is_empty() {
            continue;
        }
        after_open = false;
        out.push(line);
    }
    out.join("\n")
}

fn is_list_line(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with("- ") || line.starts_with("* ") || line.starts_with("+ ") {
        return true;
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with(". ")
}

/// Insert a blank line between a list block and following non-list text
fn space_after_lists(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut in_list = false;

    for line in text.split('\n') {
        if is_fence(line) {
            if in_list && !in_fence && !line.starts_with(' ') {
                out.push("");
                in_list = false;
            }
            in_fence = !in_fence;
            out.push(line);
            continue;
        }
        if in_fence {
            out.push(line);
            continue;
        }

        if line.trim().is_empty() {
            in_list = false;
        } else if is_list_line(line) {
            in_list = true;
        } else if in_list && !line.starts_with(' ') {
            out.push("");
            in_list = false;
        }
        out.push(line);
    }
    out.join("\n")
}
