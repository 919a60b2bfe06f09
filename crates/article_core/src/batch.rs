use thiserror::Error;

pub const DEFAULT_MAX_BATCH: usize = 10;

/// Batch-level rejection; raised before any pipeline work starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("urls must not be empty")]
    Empty,
    #[error("too many URLs: {count} exceeds the limit of {max}")]
    TooMany { count: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_urls: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_urls: DEFAULT_MAX_BATCH,
        }
    }
}

pub fn validate_batch<S: AsRef<str>>(urls: &[S], limits: BatchLimits) -> Result<(), ValidationError> {
    if urls.is_empty() {
        return Err(ValidationError::Empty);
    }
    if urls.len() > limits.max_urls {
        return Err(ValidationError::TooMany {
            count: urls.len(),
            max: limits.max_urls,
        });
    }
    Ok(())
}
