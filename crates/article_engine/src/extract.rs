use article_core::ArticleResult;
use scraper::Html;
use url::Url;

use crate::decode::decode_html;
use crate::readability;
use crate::text::{choose_content, collapse_whitespace, sanitize_text, DEFAULT_EXCERPT_LEAD_CHARS};
use crate::ExtractError;

pub const DEFAULT_MIN_PARAGRAPH_CHARS: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Leading excerpt characters that must appear in the content for it to be trusted.
    pub excerpt_lead_chars: usize,
    pub min_paragraph_chars: usize,
    /// Rewrite `"` to `'` and drop `\` in every text field.
    pub sanitize: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            excerpt_lead_chars: DEFAULT_EXCERPT_LEAD_CHARS,
            min_paragraph_chars: DEFAULT_MIN_PARAGRAPH_CHARS,
            sanitize: false,
        }
    }
}

/// Turns a fetched page into article fields. Implementations must be stateless
/// and reentrant: one instance serves every concurrent pipeline.
pub trait Extractor: Send + Sync {
    fn extract(&self, url: &str, html: &[u8]) -> Result<ArticleResult, ExtractError>;
}

/// Readability-style extractor:
/// - metadata from Open Graph / meta tags, then document structure
/// - body from the best-scoring content region, whitespace collapsed to one line
/// - excerpt substituted when the region looks like boilerplate.
#[derive(Debug, Default, Clone)]
pub struct ReadabilityExtractor {
    options: ExtractOptions,
}

impl ReadabilityExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    fn finish(&self, text: &str) -> String {
        let text = collapse_whitespace(text);
        if self.options.sanitize {
            sanitize_text(&text)
        } else {
            text
        }
    }
}

impl Extractor for ReadabilityExtractor {
    fn extract(&self, url: &str, html: &[u8]) -> Result<ArticleResult, ExtractError> {
        let base = Url::parse(url).map_err(|err| ExtractError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        let decoded = decode_html(html);
        if decoded.html.trim().is_empty() {
            return Err(ExtractError::Unreadable {
                url: url.to_string(),
                reason: "empty document".to_string(),
            });
        }

        let doc = Html::parse_document(&decoded.html);
        let readable = readability::parse(&doc, &base, self.options.min_paragraph_chars);

        let excerpt = collapse_whitespace(&readable.excerpt);
        let content = choose_content(
            collapse_whitespace(&readable.content),
            &excerpt,
            self.options.excerpt_lead_chars,
        );
        let title = collapse_whitespace(&readable.title);
        if title.is_empty() && content.is_empty() {
            return Err(ExtractError::Unreadable {
                url: url.to_string(),
                reason: "no readable content".to_string(),
            });
        }

        Ok(ArticleResult {
            url: url.to_string(),
            title: self.finish(&title),
            byline: self.finish(&readable.byline),
            content: self.finish(&content),
            excerpt: self.finish(&excerpt),
            site_name: self.finish(&readable.site_name),
            error: String::new(),
        })
    }
}
