//! Grep-style line filtering
//!
//! Matching is per line and case-insensitive. A pattern that fails to compile
//! as a regex degrades to a plain substring search instead of failing.

use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Returned by [`grep_content`] when nothing matched
pub const NO_MATCHES_MESSAGE: &str = "No content matching the pattern was found.";

/// Options for a single grep invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GrepOptions {
    /// Regex pattern to search for
    pub pattern: String,
    /// Lines of context before and after each match
    #[serde(default)]
    pub context_lines: usize,
    /// Keep non-matching lines instead
    #[serde(default)]
    pub invert_match: bool,
    /// Prefix lines with 1-based line numbers
    #[serde(default)]
    pub show_line_numbers: bool,
    /// Match whole words only
    #[serde(default)]
    pub whole_words: bool,
}

impl GrepOptions {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Default::default()
        }
    }

    pub fn context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    pub fn invert_match(mut self) -> Self {
        self.invert_match = true;
        self
    }

    pub fn show_line_numbers(mut self) -> Self {
        self.show_line_numbers = true;
        self
    }

    pub fn whole_words(mut self) -> Self {
        self.whole_words = true;
        self
    }

    /// Render the options as grep command line flags, e.g. `-C 2 -v -n`
    pub fn to_cli_flags(&self) -> String {
        let mut flags = Vec::new();
        if self.context_lines > 0 {
            flags.push(format!("-C {}", self.context_lines));
        }
        if self.invert_match {
            flags.push("-v".to_string());
        }
        if self.show_line_numbers {
            flags.push("-n".to_string());
        }
        if self.whole_words {
            flags.push("-w".to_string());
        }
        flags.join(" ")
    }

    fn regex(&self) -> Result<Regex, regex::Error> {
        let pattern = if self.whole_words {
            format!(r"\b(?:{})\b", self.pattern)
        } else {
            self.pattern.clone()
        };
        RegexBuilder::new(&pattern).case_insensitive(true).build()
    }
}

/// Filter `content` and return the selected output lines
///
/// Returns an empty vector when nothing matched. An empty pattern keeps every
/// line untouched.
pub fn grep_lines(content: &str, options: &GrepOptions) -> Vec<String> {
    let lines: Vec<&str> = content.split('\n').collect();

    if options.pattern.is_empty() {
        return lines.into_iter().map(str::to_string).collect();
    }

    let regex = match options.regex() {
        Ok(regex) => regex,
        Err(err) => {
            debug!(pattern = %options.pattern, error = %err, "Pattern is not a valid regex, using substring match");
            return substring_lines(&lines, options);
        }
    };

    let hits: Vec<bool> = lines
        .iter()
        .map(|line| regex.is_match(line) != options.invert_match)
        .collect();

    let mut selected: BTreeSet<usize> = hits
        .iter()
        .enumerate()
        .filter(|(_, hit)| **hit)
        .map(|(i, _)| i)
        .collect();

    let with_context = options.context_lines > 0 && !options.invert_match;
    if with_context {
        let last = lines.len().saturating_sub(1);
        let matched: Vec<usize> = selected.iter().copied().collect();
        for idx in matched {
            let start = idx.saturating_sub(options.context_lines);
            let end = idx.saturating_add(options.context_lines).min(last);
            selected.extend(start..=end);
        }
    }

    selected
        .into_iter()
        .map(|i| {
            let mut prefix = String::new();
            if with_context {
                prefix.push_str(if hits[i] { "> " } else { "  " });
            }
            if options.show_line_numbers {
                prefix.push_str(&format!("{}: ", i + 1));
            }
            format!("{}{}", prefix, lines[i])
        })
        .collect()
}

fn substring_lines(lines: &[&str], options: &GrepOptions) -> Vec<String> {
    let needle = options.pattern.to_lowercase();
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.to_lowercase().contains(&needle) != options.invert_match)
        .map(|(i, line)| {
            if options.show_line_numbers {
                format!("{}: {}", i + 1, line)
            } else {
                line.to_string()
            }
        })
        .collect()
}

/// Filter `content` like grep, returning the joined output
///
/// Nothing matching yields [`NO_MATCHES_MESSAGE`], never an empty string.
pub fn grep_content(content: &str, options: &GrepOptions) -> String {
    if options.pattern.is_empty() {
        return content.to_string();
    }
    let lines = grep_lines(content, options);
    if lines.is_empty() {
        NO_MATCHES_MESSAGE.to_string()
    } else {
        lines.join("\n")
    }
}

/// Find markdown sections (split at headings) containing a match
///
/// Returns inclusive `(start_line, end_line)` pairs, 0-based.
pub fn find_sections(content: &str, pattern: &str) -> Vec<(usize, usize)> {
    let lines: Vec<&str> = content.split('\n').collect();

    let regex = match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => regex,
        Err(_) => {
            let found = content.to_lowercase().contains(&pattern.to_lowercase());
            return if found && !lines.is_empty() {
                vec![(0, lines.len() - 1)]
            } else {
                Vec::new()
            };
        }
    };

    let mut boundaries: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(i, line)| line.starts_with('#') || is_setext_heading(&lines, *i))
        .map(|(i, _)| i)
        .collect();
    boundaries.push(lines.len());

    let mut sections = Vec::new();
    let mut start = 0;
    for end in boundaries {
        if end > start && regex.is_match(&lines[start..end].join("\n")) {
            sections.push((start, end - 1));
        }
        start = end;
    }
    sections
}

fn is_setext_heading(lines: &[&str], i: usize) -> bool {
    let Some(next) = lines.get(i + 1) else {
        return false;
    };
    let next = next.trim();
    !lines[i].trim().is_empty() && !next.is_empty() && next.chars().all(|c| c == '=')
}

/// Wrap every match of `pattern` in markdown bold
pub fn highlight_matches(content: &str, pattern: &str) -> String {
    if pattern.is_empty() {
        return content.to_string();
    }
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => regex.replace_all(content, "**${0}**").into_owned(),
        Err(_) => content.replace(pattern, &format!("**{}**", pattern)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE_LINES: &str = "alpha\nbeta\ngamma\ndelta\nepsilon";

    #[test]
    fn test_simple_match_is_case_insensitive() {
        let out = grep_content(FIVE_LINES, &GrepOptions::new("GAMMA"));
        assert_eq!(out, "gamma");
    }

    #[test]
    fn test_context_marks_match_and_context_lines() {
        let opts = GrepOptions::new("gamma").context_lines(1);
        let out = grep_lines(FIVE_LINES, &opts);
        assert_eq!(out, vec!["  beta", "> gamma", "  delta"]);
    }

    #[test]
    fn test_context_with_line_numbers() {
        let opts = GrepOptions::new("gamma").context_lines(1).show_line_numbers();
        let out = grep_content(FIVE_LINES, &opts);
        assert_eq!(out, "  2: beta\n> 3: gamma\n  4: delta");
    }

    #[test]
    fn test_context_clamped_to_bounds() {
        let opts = GrepOptions::new("alpha").context_lines(3);
        let out = grep_lines(FIVE_LINES, &opts);
        assert_eq!(out, vec!["> alpha", "  beta", "  gamma", "  delta"]);
    }

    #[test]
    fn test_huge_context_keeps_whole_document() {
        let opts = GrepOptions::new("gamma").context_lines(usize::MAX);
        let out = grep_lines("alpha\nbeta\ngamma\ndelta", &opts);
        assert_eq!(out, vec!["  alpha", "  beta", "> gamma", "  delta"]);
    }

    #[test]
    fn test_invert_match_ignores_context() {
        let opts = GrepOptions::new("a$").invert_match().context_lines(2);
        assert_eq!(grep_lines(FIVE_LINES, &opts), vec!["epsilon"]);
        let opts = GrepOptions::new("eta").invert_match();
        assert_eq!(
            grep_lines(FIVE_LINES, &opts),
            vec!["alpha", "gamma", "delta", "epsilon"]
        );
    }

    #[test]
    fn test_whole_words() {
        let text = "cat\ncatalog\nthe cat sat";
        let opts = GrepOptions::new("cat").whole_words();
        assert_eq!(grep_lines(text, &opts), vec!["cat", "the cat sat"]);
    }

    #[test]
    fn test_invalid_regex_falls_back_to_substring() {
        let text = "call foo(bar\nnothing here\nFOO(BAR) again";
        let opts = GrepOptions::new("foo(bar").show_line_numbers();
        assert_eq!(grep_content(text, &opts), "1: call foo(bar\n3: FOO(BAR) again");
    }

    #[test]
    fn test_empty_pattern_is_noop() {
        assert_eq!(grep_content(FIVE_LINES, &GrepOptions::new("")), FIVE_LINES);
    }

    #[test]
    fn test_no_matches_message() {
        let out = grep_content(FIVE_LINES, &GrepOptions::new("zeta"));
        assert_eq!(out, NO_MATCHES_MESSAGE);
        assert!(grep_lines(FIVE_LINES, &GrepOptions::new("zeta")).is_empty());
    }

    #[test]
    fn test_to_cli_flags() {
        assert_eq!(GrepOptions::new("x").to_cli_flags(), "");
        let opts = GrepOptions::new("x")
            .context_lines(2)
            .invert_match()
            .show_line_numbers()
            .whole_words();
        assert_eq!(opts.to_cli_flags(), "-C 2 -v -n -w");
    }

    #[test]
    fn test_find_sections() {
        let doc = "# Intro\nhello\n# Install\ncargo add thing\n# Usage\nrun it";
        assert_eq!(find_sections(doc, "cargo"), vec![(2, 3)]);
        assert_eq!(find_sections(doc, "^#"), vec![(0, 1), (2, 3), (4, 5)]);
        assert!(find_sections(doc, "missing").is_empty());
    }

    #[test]
    fn test_find_sections_setext_heading_starts_section() {
        let doc = "Intro\n=====\nhello\nInstall\n=======\ncargo add thing";
        assert_eq!(find_sections(doc, "cargo"), vec![(3, 5)]);
        assert_eq!(find_sections(doc, "hello"), vec![(0, 2)]);
    }

    #[test]
    fn test_highlight_matches() {
        assert_eq!(
            highlight_matches("Rust is rusty", "rust"),
            "**Rust** is **rust**y"
        );
        assert_eq!(highlight_matches("a (b", "(b"), "a **(b**");
    }
}
