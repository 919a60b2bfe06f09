use std::fmt;

use thiserror::Error;

/// Lifecycle of one URL's pipeline inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Fetching,
    Extracting,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgress {
    pub index: usize,
    pub url: String,
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(JobProgress),
    JobCompleted {
        index: usize,
        url: String,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
    pub truncated: bool,
}

/// Transport failure for a single URL; always names the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub url: String,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::new(FailureKind::Cancelled, url, "aborted by batch cancellation")
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::HttpStatus(code) => write!(f, "HTTP {code} from {}", self.url),
            FailureKind::InvalidUrl => write!(f, "build request for {}: {}", self.url, self.message),
            kind => write!(f, "fetch {}: {kind}: {}", self.url, self.message),
        }
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Cancelled,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Extraction failure; keeps the url so the caller can attribute it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("parse URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("readability {url}: {reason}")]
    Unreadable { url: String, reason: String },
}

impl ExtractError {
    pub fn url(&self) -> &str {
        match self {
            ExtractError::InvalidUrl { url, .. } | ExtractError::Unreadable { url, .. } => url,
        }
    }
}

/// Terminal failure of one URL's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("cancelled before {url} was fetched")]
    Cancelled { url: String },
    #[error("extraction of {url} aborted: {message}")]
    Aborted { url: String, message: String },
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            PipelineError::Cancelled { .. } => true,
            PipelineError::Fetch(err) => err.kind == FailureKind::Cancelled,
            PipelineError::Extract(_) | PipelineError::Aborted { .. } => false,
        }
    }
}

/// Construction failure of engine-owned resources.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("build http client: {0}")]
    Client(String),
    #[error("build tokio runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_code_and_target() {
        let err = FetchError::new(FailureKind::HttpStatus(404), "https://example.com/a", "404 Not Found");
        assert_eq!(err.to_string(), "HTTP 404 from https://example.com/a");
    }

    #[test]
    fn cancelled_fetch_is_classified_as_cancellation() {
        let err = PipelineError::from(FetchError::cancelled("https://example.com/a"));
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("cancelled"));
        assert!(err.to_string().contains("https://example.com/a"));
    }

    #[test]
    fn extract_error_keeps_url() {
        let err = ExtractError::Unreadable {
            url: "https://example.com/a".into(),
            reason: "empty document".into(),
        };
        assert_eq!(err.url(), "https://example.com/a");
        assert!(!PipelineError::from(err).is_cancelled());
    }
}
