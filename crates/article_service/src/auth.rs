//! Bearer-token check for the scrape route.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use engine_logging::engine_warn;

use crate::server::error_response;

/// Rejects requests whose `Authorization: Bearer <key>` does not match `expected`.
pub async fn require_bearer(
    State(expected): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
            next.run(request).await
        }
        _ => {
            engine_warn!("rejected {} {}: unauthorized", request.method(), request.uri().path());
            error_response(StatusCode::UNAUTHORIZED, "unauthorized")
        }
    }
}

/// Compares every byte regardless of where the first mismatch is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    fn app(key: &str) -> Router {
        Router::new()
            .route("/private", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(Arc::<str>::from(key), require_bearer))
    }

    async fn status_for(header: Option<&str>) -> StatusCode {
        let mut request = Request::builder().uri("/private");
        if let Some(value) = header {
            request = request.header("Authorization", value);
        }
        app("letmein")
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn matching_bearer_token_passes() {
        assert_eq!(status_for(Some("Bearer letmein")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_or_wrong_token_is_rejected() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(Some("Bearer nope")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(Some("letmein")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(Some("Bearer LETMEIN")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejection_body_is_json() {
        let response = app("k")
            .oneshot(Request::builder().uri("/private").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"error":"unauthorized"}"#);
    }

    #[test]
    fn constant_time_eq_compares_length_and_content() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
