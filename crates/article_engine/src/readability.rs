//! Readability-style content detection over a parsed `scraper::Html` document.
//!
//! Paragraph-like nodes vote for their ancestors, candidates are weighted by tag
//! and class/id hints, and the winner is discounted by its link density. The
//! winning node plus qualifying siblings form the article body.

use std::collections::HashMap;

use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::text::collapse_whitespace;

const UNLIKELY_CANDIDATES: &[&str] = &[
    "-ad-", "ad-break", "agegate", "banner", "breadcrumbs", "combx", "comment", "community",
    "cookie", "cover-wrap", "disqus", "extra", "footer", "gdpr", "header", "legends", "menu",
    "newsletter", "pager", "pagination", "popup", "promo", "related", "remark", "replies", "rss",
    "share", "shoutbox", "sidebar", "skyscraper", "social", "sponsor", "supplemental",
    "yom-remote",
];
const MAYBE_CANDIDATES: &[&str] = &["and", "article", "body", "column", "content", "main", "shadow"];
const POSITIVE_HINTS: &[&str] = &[
    "article", "blog", "body", "content", "entry", "h-entry", "hentry", "main", "page", "post",
    "story", "text",
];
const NEGATIVE_HINTS: &[&str] = &[
    "-ad-", "banner", "com-", "combx", "comment", "contact", "foot", "footer", "footnote", "gdpr",
    "hidden", "masthead", "media", "meta", "outbrain", "promo", "related", "scroll", "share",
    "shopping", "shoutbox", "sidebar", "skyscraper", "sponsor", "tags", "tool", "widget",
];
const SKIPPED_TAGS: &[&str] = &[
    "aside", "button", "embed", "footer", "form", "header", "iframe", "input", "nav", "noscript",
    "object", "script", "select", "style", "svg", "template", "textarea",
];
const PARAGRAPH_TAGS: &[&str] = &["p", "pre", "td"];
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "dd", "div", "dl", "dt", "figcaption", "h1", "h2", "h3",
    "h4", "h5", "h6", "li", "main", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];
const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " — ", " – ", " :: "];
const SAME_PAGE_LINK_WEIGHT: f64 = 0.3;
const MAX_BYLINE_CHARS: usize = 100;

/// Raw fields found in a document, before whitespace collapsing and fallbacks.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Readable {
    pub title: String,
    pub byline: String,
    pub content: String,
    pub excerpt: String,
    pub site_name: String,
}

pub(crate) fn parse(doc: &Html, base: &Url, min_paragraph_chars: usize) -> Readable {
    let metas = MetaTags::collect(doc);
    let region = find_content_region(doc, base, min_paragraph_chars);

    let content = match &region {
        Some(nodes) => nodes
            .iter()
            .map(|node| element_text(*node))
            .collect::<Vec<_>>()
            .join(" "),
        None => body(doc).map(element_text).unwrap_or_default(),
    };

    let excerpt = metas
        .first(&["description", "og:description", "twitter:description"])
        .or_else(|| {
            let scope = region.as_deref().unwrap_or_default();
            first_paragraph(scope).or_else(|| body(doc).and_then(|b| first_paragraph(&[b])))
        })
        .unwrap_or_default();

    Readable {
        title: extract_title(doc, &metas),
        byline: extract_byline(doc, &metas),
        content,
        excerpt,
        site_name: metas
            .first(&["og:site_name", "application-name"])
            .unwrap_or_default(),
    }
}

struct MetaTags {
    entries: Vec<(String, String)>,
}

impl MetaTags {
    fn collect(doc: &Html) -> Self {
        let entries = selector("meta")
            .map(|sel| {
                doc.select(&sel)
                    .filter_map(|meta| {
                        let el = meta.value();
                        let key = el.attr("property").or_else(|| el.attr("name"))?;
                        let content = el.attr("content")?.trim();
                        (!content.is_empty())
                            .then(|| (key.trim().to_ascii_lowercase(), content.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { entries }
    }

    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| {
            self.entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, content)| content.clone())
        })
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn body(doc: &Html) -> Option<ElementRef<'_>> {
    selector("body").and_then(|sel| doc.select(&sel).next())
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    doc.select(&sel)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn extract_title(doc: &Html, metas: &MetaTags) -> String {
    if let Some(title) = metas.first(&["og:title", "twitter:title"]) {
        return title;
    }
    if let Some(title) = first_text(doc, "title") {
        return strip_site_suffix(&title);
    }
    first_text(doc, "h1").unwrap_or_default()
}

fn strip_site_suffix(title: &str) -> String {
    for separator in TITLE_SEPARATORS {
        if let Some(idx) = title.rfind(separator) {
            let head = title[..idx].trim();
            if head.split_whitespace().count() >= 3 {
                return head.to_string();
            }
        }
    }
    title.trim().to_string()
}

fn extract_byline(doc: &Html, metas: &MetaTags) -> String {
    if let Some(author) = metas.first(&["author", "article:author"]) {
        if !author.starts_with("http") {
            return author;
        }
    }
    first_text(
        doc,
        r#"[rel="author"], [itemprop="author"], .byline, .author, [class*="byline"], [id*="byline"]"#,
    )
    .filter(|text| text.chars().count() <= MAX_BYLINE_CHARS)
    .unwrap_or_default()
}

fn hint_text(el: ElementRef<'_>) -> String {
    let value = el.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.id().unwrap_or_default()
    )
    .to_ascii_lowercase()
}

fn is_hidden(el: ElementRef<'_>) -> bool {
    let value = el.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value
        .attr("style")
        .map(|style| style.replace(' ', "").to_ascii_lowercase())
        .is_some_and(|style| style.contains("display:none") || style.contains("visibility:hidden"))
}

fn is_unlikely(el: ElementRef<'_>) -> bool {
    let name = el.value().name();
    if matches!(name, "html" | "body" | "article" | "main") {
        return false;
    }
    let hints = hint_text(el);
    UNLIKELY_CANDIDATES.iter().any(|m| hints.contains(m))
        && !MAYBE_CANDIDATES.iter().any(|m| hints.contains(m))
}

/// Nodes whose whole subtree never counts as article text.
fn is_excluded(el: ElementRef<'_>) -> bool {
    SKIPPED_TAGS.contains(&el.value().name()) || is_hidden(el) || is_unlikely(el)
}

fn class_weight(el: ElementRef<'_>) -> f64 {
    let value = el.value();
    let mut weight = 0.0;
    for hint in [value.attr("class"), value.id()].into_iter().flatten() {
        let hint = hint.to_ascii_lowercase();
        if NEGATIVE_HINTS.iter().any(|m| hint.contains(m)) {
            weight -= 25.0;
        }
        if POSITIVE_HINTS.iter().any(|m| hint.contains(m)) {
            weight += 25.0;
        }
    }
    weight
}

fn initial_score(el: ElementRef<'_>) -> f64 {
    let base = match el.value().name() {
        "article" | "main" => 8.0,
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    base + class_weight(el)
}

/// Visits the descendants of `el` in document order as open/close events,
/// never entering excluded subtrees. Iterative: nesting depth costs no stack.
fn walk_visible<'a>(el: ElementRef<'a>, mut visit: impl FnMut(NodeRef<'a, Node>, bool)) {
    let root = el.id();
    let mut skipping: Option<NodeId> = None;
    for edge in el.traverse() {
        let (node, opening) = match edge {
            Edge::Open(node) => (node, true),
            Edge::Close(node) => (node, false),
        };
        if node.id() == root {
            continue;
        }
        if let Some(skipped) = skipping {
            if !opening && node.id() == skipped {
                skipping = None;
            }
            continue;
        }
        if opening && ElementRef::wrap(node).is_some_and(is_excluded) {
            skipping = Some(node.id());
            continue;
        }
        visit(node, opening);
    }
}

/// Text of `el` with excluded subtrees removed; block boundaries become spaces.
fn element_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    if is_excluded(el) {
        return out;
    }
    walk_visible(el, |node, opening| match node.value() {
        Node::Text(text) if opening => out.push_str(text),
        Node::Element(element) => {
            let name = element.name();
            if BLOCK_TAGS.contains(&name) || (opening && name == "br") {
                out.push(' ');
            }
        }
        _ => {}
    });
    out
}

fn text_len(el: ElementRef<'_>) -> usize {
    collapse_whitespace(&element_text(el)).chars().count()
}

fn link_density(el: ElementRef<'_>, base: &Url) -> f64 {
    let total = text_len(el);
    if total == 0 {
        return 0.0;
    }
    let Some(sel) = selector("a") else {
        return 0.0;
    };
    let mut page = base.clone();
    page.set_fragment(None);

    let linked: f64 = el
        .select(&sel)
        .map(|link| {
            let len = collapse_whitespace(&link.text().collect::<String>()).chars().count() as f64;
            let same_page = link
                .value()
                .attr("href")
                .and_then(|href| base.join(href.trim()).ok())
                .is_some_and(|mut target| {
                    target.set_fragment(None);
                    target == page
                });
            if same_page {
                len * SAME_PAGE_LINK_WEIGHT
            } else {
                len
            }
        })
        .sum();
    (linked / total as f64).min(1.0)
}

fn paragraph_score(text_len: usize, text: &str) -> f64 {
    let commas = text.chars().filter(|c| matches!(c, ',' | '，')).count() as f64;
    1.0 + commas + (text_len / 100).min(3) as f64
}

fn score_paragraphs<'a>(
    root: ElementRef<'a>,
    min_paragraph_chars: usize,
    scores: &mut HashMap<NodeId, (ElementRef<'a>, f64)>,
) {
    walk_visible(root, |node, opening| {
        if !opening {
            return;
        }
        let Some(paragraph) =
            ElementRef::wrap(node).filter(|el| PARAGRAPH_TAGS.contains(&el.value().name()))
        else {
            return;
        };
        let text = collapse_whitespace(&element_text(paragraph));
        let len = text.chars().count();
        if len < min_paragraph_chars {
            return;
        }
        let score = paragraph_score(len, &text);
        let parent = paragraph.parent().and_then(ElementRef::wrap);
        let grandparent = parent.and_then(|p| p.parent()).and_then(ElementRef::wrap);
        for (ancestor, share) in [(parent, score), (grandparent, score / 2.0)] {
            if let Some(ancestor) = ancestor {
                let entry = scores
                    .entry(ancestor.id())
                    .or_insert_with(|| (ancestor, initial_score(ancestor)));
                entry.1 += share;
            }
        }
    });
}

/// Picks the best-scoring candidate and the siblings that belong with it,
/// in document order. `None` when no paragraph qualified.
fn find_content_region<'a>(
    doc: &'a Html,
    base: &Url,
    min_paragraph_chars: usize,
) -> Option<Vec<ElementRef<'a>>> {
    let root = body(doc).unwrap_or_else(|| doc.root_element());
    let mut scores = HashMap::new();
    score_paragraphs(root, min_paragraph_chars, &mut scores);

    let finals: HashMap<NodeId, f64> = scores
        .values()
        .map(|(el, score)| (el.id(), score * (1.0 - link_density(*el, base))))
        .collect();

    let (best_id, best_score) = finals
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(id, score)| (*id, *score))?;
    let best = scores.get(&best_id).map(|(el, _)| *el)?;

    let Some(parent) = best.parent().and_then(ElementRef::wrap) else {
        return Some(vec![best]);
    };
    let threshold = (best_score * 0.2).max(10.0);
    let region = parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| {
            if sibling.id() == best_id {
                return true;
            }
            if is_excluded(*sibling) {
                return false;
            }
            if finals.get(&sibling.id()).is_some_and(|score| *score >= threshold) {
                return true;
            }
            if sibling.value().name() == "p" {
                let len = text_len(*sibling);
                let density = link_density(*sibling, base);
                return (len > 80 && density < 0.25) || (len > 0 && density == 0.0 && ends_sentence(*sibling));
            }
            false
        })
        .collect();
    Some(region)
}

fn ends_sentence(el: ElementRef<'_>) -> bool {
    let text = collapse_whitespace(&element_text(el));
    text.ends_with('.') || text.ends_with('!') || text.ends_with('?')
}

fn first_paragraph(scope: &[ElementRef<'_>]) -> Option<String> {
    let sel = selector("p")?;
    scope
        .iter()
        .flat_map(|el| el.select(&sel))
        .filter(|p| !is_excluded(*p))
        .map(|p| collapse_whitespace(&element_text(p)))
        .find(|text| !text.is_empty())
}
