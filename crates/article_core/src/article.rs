use std::fmt;

use serde::{Deserialize, Serialize};

/// Extracted article fields for one requested URL.
///
/// Either `error` is empty and the article fields are filled (missing metadata
/// stays an empty string), or `error` is set and the article fields are empty.
/// `url` is always the canonical URL of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleResult {
    pub url: String,
    pub title: String,
    pub byline: String,
    pub content: String,
    pub excerpt: String,
    pub site_name: String,
    pub error: String,
}

impl ArticleResult {
    /// Builds a failed entry carrying only the url and the error message.
    pub fn failed(url: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            url: url.into(),
            error: error.to_string(),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Incoming payload for a batch scrape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub urls: Vec<String>,
}

/// Outgoing payload for a batch scrape, positionally aligned with the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub results: Vec<ArticleResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_entry_keeps_url_and_clears_fields() {
        let result = ArticleResult::failed("https://example.com/a", "HTTP 404 from https://example.com/a");
        assert!(result.is_error());
        assert_eq!(result.url, "https://example.com/a");
        assert!(result.title.is_empty());
        assert!(result.content.is_empty());
    }

    #[test]
    fn serializes_with_snake_case_site_name() {
        let result = ArticleResult {
            url: "https://example.com".into(),
            site_name: "Example".into(),
            ..ArticleResult::default()
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["site_name"], "Example");
        assert_eq!(json["error"], "");
    }

    #[test]
    fn request_decodes_url_list() {
        let request: ScrapeRequest =
            serde_json::from_str(r#"{"urls":["https://a.example","https://b.example"]}"#).unwrap();
        assert_eq!(request.urls.len(), 2);
    }
}
