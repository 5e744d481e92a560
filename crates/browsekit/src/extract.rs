//! Main content selection
//!
//! Picks the region of a page that holds the actual content. Candidates come
//! from fixed-weight selector rules (`<main>`, `<article>`, known content
//! classes) and, when those are thin, from a text density analysis of block
//! containers. The winner is serialized and cleaned a second time in
//! isolation.

use crate::dom::{
    class_contains, class_or_id_contains, count_tag, has_ancestor_tag, inner_html, is_within,
    mark_tags, outer_html, select, text_len, NodeSet, NEVER_CONTENT_TAGS, STRUCTURAL_TAGS,
};
use crate::types::ContentPriority;
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node};
use std::collections::HashSet;
use tracing::debug;

/// Class or id substrings marking ads, comment threads and similar noise
pub const NOISE_PATTERNS: &[&str] = &[
    "advertisement",
    "advert",
    "ad-container",
    "ad-slot",
    "ad-banner",
    "adsbygoogle",
    "sponsored",
    "comment-section",
    "comments-section",
    "comments-area",
    "comment-list",
    "disqus",
    "cookie-banner",
    "cookie-consent",
    "newsletter",
    "social-share",
    "share-buttons",
    "related-posts",
];

/// One selector so matches come back in document order
const DENSITY_SELECTOR: &str = "div, section, main, td, table";

/// Coefficients of the density score for one priority mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityWeights {
    pub text_length: f64,
    pub text_density: f64,
    pub link_ratio: f64,
}

impl DensityWeights {
    fn score(&self, text_length: f64, text_density: f64, link_ratio: f64) -> f64 {
        self.text_length * text_length
            + self.text_density * text_density
            + self.link_ratio * link_ratio
    }
}

/// Every tunable constant used to score content candidates
///
/// The defaults keep this ordering: `<main>` above long articles, above
/// `.markdown-body`, above generic selectors, above density candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub main: f64,
    pub article_base: f64,
    pub article_bonus_cap: f64,
    /// Text characters per point of article bonus
    pub article_chars_per_point: f64,
    /// Known content containers, highest priority first
    pub high_value: Vec<(String, f64)>,
    /// Common content selectors, only used with enough text
    pub generic: Vec<(String, f64)>,
    pub generic_min_text: usize,
    /// Below this many rule-based candidates density analysis runs in `auto`
    pub min_rule_candidates: usize,
    pub density_min_text: usize,
    pub density_min_html: usize,
    pub density_cap: f64,
    pub density_divisor: f64,
    /// Stands in for the text/link ratio of a container without links
    pub no_link_factor: f64,
    pub largest: DensityWeights,
    pub dense: DensityWeights,
    pub blend: DensityWeights,
}

fn weighted(list: &[(&str, f64)]) -> Vec<(String, f64)> {
    list.iter().map(|(s, w)| (s.to_string(), *w)).collect()
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            main: 100.0,
            article_base: 90.0,
            article_bonus_cap: 10.0,
            article_chars_per_point: 1000.0,
            high_value: weighted(&[
                (".markdown-body", 95.0),
                ("[role=\"main\"]", 90.0),
                (".rst-content", 88.0),
                (".docs-content", 85.0),
            ]),
            generic: weighted(&[
                ("#content", 80.0),
                ("#main", 78.0),
                (".main-content", 75.0),
                (".content", 70.0),
                (".post-content", 70.0),
                (".entry-content", 70.0),
                (".post", 60.0),
                (".entry", 55.0),
                (".blog-post", 55.0),
                (".main", 50.0),
                ("#primary", 45.0),
            ]),
            generic_min_text: 100,
            min_rule_candidates: 3,
            density_min_text: 200,
            density_min_html: 500,
            density_cap: 40.0,
            density_divisor: 50.0,
            no_link_factor: 0.5,
            largest: DensityWeights {
                text_length: 0.6,
                text_density: 20.0,
                link_ratio: 0.1,
            },
            dense: DensityWeights {
                text_length: 0.01,
                text_density: 50.0,
                link_ratio: 0.2,
            },
            blend: DensityWeights {
                text_length: 0.3,
                text_density: 30.0,
                link_ratio: 0.15,
            },
        }
    }
}

impl ScoringWeights {
    fn density_weights(&self, priority: ContentPriority) -> &DensityWeights {
        match priority {
            ContentPriority::Largest => &self.largest,
            ContentPriority::Dense => &self.dense,
            _ => &self.blend,
        }
    }
}

/// Which rule produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin {
    Main,
    Article,
    HighValue,
    Generic,
    Density,
}

/// A region considered as the main content
#[derive(Debug, Clone, PartialEq)]
pub struct ContentCandidate {
    pub node: NodeId,
    pub score: f64,
    pub origin: CandidateOrigin,
}

/// Candidates in discovery order, one per node
#[derive(Default)]
struct CandidateList {
    seen: HashSet<NodeId>,
    list: Vec<ContentCandidate>,
}

impl CandidateList {
    fn push(&mut self, el: ElementRef, score: f64, origin: CandidateOrigin) {
        if self.seen.insert(el.id()) {
            self.list.push(ContentCandidate {
                node: el.id(),
                score,
                origin,
            });
        }
    }
}

/// Nodes excluded from content, computed once per document
struct PageMarks {
    /// Never readable (scripts, styles, ...)
    removed: NodeSet,
    /// nav, header, footer
    structural: NodeSet,
    /// ads, comments, cookie banners
    noise: NodeSet,
}

impl PageMarks {
    fn scan(doc: &Html) -> Self {
        let noise = doc
            .tree
            .nodes()
            .filter(|node| match node.value() {
                Node::Element(el) => {
                    !matches!(el.name(), "html" | "body")
                        && class_or_id_contains(el, NOISE_PATTERNS)
                }
                _ => false,
            })
            .map(|node| node.id())
            .collect();

        Self {
            removed: mark_tags(doc, NEVER_CONTENT_TAGS),
            structural: mark_tags(doc, STRUCTURAL_TAGS),
            noise,
        }
    }

    fn chrome(&self) -> NodeSet {
        self.removed
            .iter()
            .chain(&self.structural)
            .chain(&self.noise)
            .copied()
            .collect()
    }
}

/// Selects main content with a configurable set of weights
#[derive(Debug, Clone, Default)]
pub struct ContentSelector {
    weights: ScoringWeights,
}

impl ContentSelector {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score every candidate region of `doc`, in discovery order
    pub fn candidates(&self, doc: &Html, priority: ContentPriority) -> Vec<ContentCandidate> {
        let marks = PageMarks::scan(doc);
        self.collect_candidates(doc, &marks, priority)
    }

    fn collect_candidates(
        &self,
        doc: &Html,
        marks: &PageMarks,
        priority: ContentPriority,
    ) -> Vec<ContentCandidate> {
        let w = &self.weights;
        let mut found = CandidateList::default();

        for main in select(doc, "main") {
            found.push(main, w.main, CandidateOrigin::Main);
        }

        for article in select(doc, "article") {
            let chars = text_len(article, &marks.removed) as f64;
            let bonus = (chars / w.article_chars_per_point).min(w.article_bonus_cap);
            found.push(article, w.article_base + bonus, CandidateOrigin::Article);
        }

        for (css, score) in &w.high_value {
            for el in select(doc, css) {
                found.push(el, *score, CandidateOrigin::HighValue);
            }
        }

        for (css, score) in &w.generic {
            for el in select(doc, css) {
                if has_ancestor_tag(&el, STRUCTURAL_TAGS) || is_within(&el, &marks.noise) {
                    continue;
                }
                if text_len(el, &marks.removed) < w.generic_min_text {
                    continue;
                }
                found.push(el, *score, CandidateOrigin::Generic);
            }
        }

        let rule_based = found.list.len();
        let wants_density = matches!(priority, ContentPriority::Largest | ContentPriority::Dense)
            || rule_based < w.min_rule_candidates;

        if wants_density {
            let chrome = marks.chrome();
            let weights = w.density_weights(priority);
            for el in select(doc, DENSITY_SELECTOR) {
                if let Some(score) = self.density_score(el, marks, &chrome, weights) {
                    found.push(el, score, CandidateOrigin::Density);
                }
            }
            debug!(
                rule_based,
                density = found.list.len() - rule_based,
                "Ran density analysis"
            );
        }

        found.list
    }

    fn density_score(
        &self,
        el: ElementRef,
        marks: &PageMarks,
        chrome: &NodeSet,
        weights: &DensityWeights,
    ) -> Option<f64> {
        let w = &self.weights;
        if is_within(&el, chrome) {
            return None;
        }
        let text = text_len(el, &marks.removed);
        if text < w.density_min_text {
            return None;
        }
        let html = outer_html(el, &marks.removed).len();
        if html < w.density_min_html {
            return None;
        }

        let text = text as f64;
        let text_density = text / html as f64;
        let links = count_tag(el, "a", &marks.removed);
        let link_ratio = if links == 0 {
            text * w.no_link_factor
        } else {
            text / links as f64
        };

        let raw = weights.score(text, text_density, link_ratio);
        Some((raw / w.density_divisor).min(w.density_cap))
    }

    /// Return the markup of the main content region
    ///
    /// Never fails: without any candidate the cleaned `<body>` is returned.
    pub fn select(&self, html: &str, priority: ContentPriority) -> String {
        let doc = Html::parse_document(html);
        let marks = PageMarks::scan(&doc);

        let chosen = self.choose(&doc, &marks, priority);
        match chosen.and_then(|id| doc.tree.get(id)).and_then(ElementRef::wrap) {
            Some(el) => clean_fragment(&outer_html(el, &marks.removed), true),
            None => {
                debug!("No content candidate, using cleaned body");
                let body = select(&doc, "body")
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| doc.root_element());
                clean_fragment(&outer_html(body, &marks.chrome()), false)
            }
        }
    }

    fn choose(&self, doc: &Html, marks: &PageMarks, priority: ContentPriority) -> Option<NodeId> {
        match priority {
            ContentPriority::Main => {
                if let Some(main) = select(doc, "main").into_iter().next() {
                    debug!("Selected <main> by priority");
                    return Some(main.id());
                }
            }
            ContentPriority::Article => {
                let mut best: Option<(usize, NodeId)> = None;
                for article in select(doc, "article") {
                    let len = text_len(article, &marks.removed);
                    match best {
                        Some((best_len, _)) if best_len >= len => {}
                        _ => best = Some((len, article.id())),
                    }
                }
                if let Some((len, id)) = best {
                    debug!(text_len = len, "Selected longest <article> by priority");
                    return Some(id);
                }
            }
            _ => {}
        }

        let candidates = self.collect_candidates(doc, marks, priority);
        let mut best: Option<&ContentCandidate> = None;
        for candidate in &candidates {
            match best {
                Some(b) if b.score >= candidate.score => {}
                _ => best = Some(candidate),
            }
        }
        best.map(|c| {
            debug!(score = c.score, origin = ?c.origin, "Selected content candidate");
            c.node
        })
    }
}

/// Re-parse a selected region on its own and drop stray page chrome from it
///
/// With `keep_region`, a lone top-level element is the selected region and is
/// never dropped itself. The body fallback parses to the page's top-level
/// elements, so every one of them is checked.
fn clean_fragment(markup: &str, keep_region: bool) -> String {
    let fragment = Html::parse_fragment(markup);
    let root = fragment.root_element();

    let mut excluded: NodeSet = fragment
        .tree
        .nodes()
        .filter(|node| match node.value() {
            Node::Element(el) => {
                NEVER_CONTENT_TAGS.contains(&el.name())
                    || STRUCTURAL_TAGS.contains(&el.name())
                    || class_contains(el, &["sidebar"])
                    || class_or_id_contains(el, NOISE_PATTERNS)
            }
            _ => false,
        })
        .map(|node| node.id())
        .collect();

    if keep_region {
        let mut top = root
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| !NEVER_CONTENT_TAGS.contains(&el.value().name()));
        if let (Some(region), None) = (top.next(), top.next()) {
            excluded.remove(&region.id());
        }
    }

    inner_html(root, &excluded)
}

/// Extract the main content markup with default weights
pub fn extract_main_content(html: &str, priority: ContentPriority) -> String {
    ContentSelector::default().select(html, priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        "lorem ".repeat(n)
    }

    #[test]
    fn test_main_beats_short_content_div() {
        let html = format!(
            "<html><body><div class=\"content\">{}</div><main><p>{}</p></main></body></html>",
            "x".repeat(50),
            words(100)
        );
        let out = extract_main_content(&html, ContentPriority::Auto);
        assert!(out.starts_with("<main>"));
        assert!(!out.contains("xxxxx"));
    }

    #[test]
    fn test_article_mode_picks_longest() {
        let html = format!(
            "<body><article id=\"short\">{}</article><article id=\"long\">{}</article></body>",
            "a".repeat(200),
            "b ".repeat(1000)
        );
        let out = extract_main_content(&html, ContentPriority::Article);
        assert!(out.contains("id=\"long\""));
        assert!(!out.contains("aaaa"));
    }

    #[test]
    fn test_main_mode_takes_main_outright() {
        let html = format!(
            "<body><div class=\"markdown-body\">{}</div><main>tiny</main></body>",
            words(200)
        );
        assert_eq!(
            extract_main_content(&html, ContentPriority::Main),
            "<main>tiny</main>"
        );
        // main still outranks markdown-body on score
        assert_eq!(
            extract_main_content(&html, ContentPriority::Auto),
            "<main>tiny</main>"
        );
    }

    #[test]
    fn test_generic_selector_skips_short_and_structural() {
        let doc = Html::parse_document(&format!(
            "<body><header><div class=\"content\">{}</div></header><div id=\"content\">short</div></body>",
            words(50)
        ));
        let candidates = ContentSelector::default().candidates(&doc, ContentPriority::Auto);
        assert!(candidates
            .iter()
            .all(|c| c.origin != CandidateOrigin::Generic));
    }

    #[test]
    fn test_article_score_bonus_capped() {
        let doc = Html::parse_document(&format!("<article>{}</article>", "z ".repeat(20_000)));
        let candidates = ContentSelector::default().candidates(&doc, ContentPriority::Auto);
        let article = candidates
            .iter()
            .find(|c| c.origin == CandidateOrigin::Article)
            .unwrap();
        assert_eq!(article.score, 100.0);
    }

    #[test]
    fn test_density_candidates_are_capped() {
        let body = format!("<p>{}</p>", words(200));
        let html = format!("<body><div id=\"x\">{}</div></body>", body);
        let doc = Html::parse_document(&html);
        let candidates = ContentSelector::default().candidates(&doc, ContentPriority::Largest);
        let density: Vec<_> = candidates
            .iter()
            .filter(|c| c.origin == CandidateOrigin::Density)
            .collect();
        assert_eq!(density.len(), 1);
        assert!(density[0].score <= 40.0);
    }

    #[test]
    fn test_density_ignores_noise_and_nav() {
        let filler = format!("<p>{}</p>", words(200));
        let html = format!(
            "<body><nav><div>{filler}</div></nav><div class=\"comments-area\">{filler}</div></body>"
        );
        let doc = Html::parse_document(&html);
        let candidates = ContentSelector::default().candidates(&doc, ContentPriority::Dense);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_fallback_to_cleaned_body() {
        let html = "<html><body><nav><a href=\"/\">Home</a></nav><p>Hello</p>\
                    <div class=\"advertisement\">Buy</div><script>x()</script></body></html>";
        assert_eq!(extract_main_content(html, ContentPriority::Auto), "<p>Hello</p>");
    }

    #[test]
    fn test_fallback_strips_top_level_sidebar() {
        let html = r#"<body><aside class="sidebar">SIDEBAR LINKS</aside><p>Hello</p></body>"#;
        assert_eq!(extract_main_content(html, ContentPriority::Auto), "<p>Hello</p>");
    }

    #[test]
    fn test_selected_region_with_sidebar_class_is_kept() {
        let html = format!(
            "<body><div class=\"sidebar-layout\"><aside class=\"sidebar\">Side</aside><p>{}</p></div></body>",
            words(200)
        );
        let out = extract_main_content(&html, ContentPriority::Largest);
        assert!(out.starts_with("<div class=\"sidebar-layout\"><p>lorem"));
    }

    #[test]
    fn test_density_ties_follow_document_order() {
        let filler = format!("<p>{}</p>", words(1250));
        let html = format!(
            "<body><section id=\"first\">{filler}</section><div id=\"second\">{filler}</div></body>"
        );
        let doc = Html::parse_document(&html);
        let candidates = ContentSelector::default().candidates(&doc, ContentPriority::Largest);
        let scores: Vec<_> = candidates.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![40.0, 40.0]);
        let out = extract_main_content(&html, ContentPriority::Largest);
        assert!(out.starts_with("<section id=\"first\">"));
    }

    #[test]
    fn test_cleanup_strips_chrome_inside_selection() {
        let html = format!(
            "<body><main><nav>Menu</nav><p>{}</p><aside class=\"sidebar\">Side</aside>\
             <div class=\"share-buttons\">Share</div></main></body>",
            words(10)
        );
        let out = extract_main_content(&html, ContentPriority::Auto);
        assert!(out.starts_with("<main><p>lorem"));
        assert!(!out.contains("Menu"));
        assert!(!out.contains("Side"));
        assert!(!out.contains("Share"));
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let html = format!(
            "<body><div class=\"post\" id=\"first\">{0}</div><div class=\"post\" id=\"second\">{0}</div></body>",
            words(30)
        );
        let out = extract_main_content(&html, ContentPriority::Auto);
        assert!(out.contains("id=\"first\""));
    }

    #[test]
    fn test_custom_weights() {
        let weights = ScoringWeights {
            main: 10.0,
            ..Default::default()
        };
        let html = format!(
            "<body><main>{}</main><div class=\"markdown-body\">{}</div></body>",
            words(5),
            "docs ".repeat(5)
        );
        let out = ContentSelector::new(weights).select(&html, ContentPriority::Auto);
        assert!(out.starts_with("<div class=\"markdown-body\">"));
    }
}
