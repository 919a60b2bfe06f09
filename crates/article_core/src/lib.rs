//! Article core: pure data model, URL canonicalization and batch validation.
mod article;
mod batch;
mod normalize;

pub use article::{ArticleResult, ScrapeRequest, ScrapeResponse};
pub use batch::{validate_batch, BatchLimits, ValidationError, DEFAULT_MAX_BATCH};
pub use normalize::normalize_url;
