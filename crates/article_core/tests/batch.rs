use article_core::{validate_batch, BatchLimits, ValidationError};

#[test]
fn empty_batch_is_rejected() {
    let urls: Vec<String> = Vec::new();
    assert_eq!(
        validate_batch(&urls, BatchLimits::default()),
        Err(ValidationError::Empty)
    );
}

#[test]
fn oversized_batch_is_rejected_with_counts() {
    let urls = vec!["https://example.com"; 4];
    let err = validate_batch(&urls, BatchLimits { max_urls: 3 }).unwrap_err();
    assert_eq!(err, ValidationError::TooMany { count: 4, max: 3 });
    assert!(err.to_string().contains("too many URLs"));
}

#[test]
fn batch_at_limit_is_accepted() {
    let urls = vec!["https://example.com"; 3];
    assert!(validate_batch(&urls, BatchLimits { max_urls: 3 }).is_ok());
}
