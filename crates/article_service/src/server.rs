use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use article_core::{validate_batch, ScrapeRequest, ScrapeResponse, ValidationError};
use article_engine::BatchScraper;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use engine_logging::{engine_info, engine_warn};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::rate_limit::{limit_by_ip, RateLimiter};
use crate::{auth, Config};

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    scraper: BatchScraper,
    shutdown: CancellationToken,
    request_timeout: Duration,
}

impl AppState {
    /// Batches started by handlers are cancelled when `shutdown` fires.
    pub fn new(scraper: BatchScraper, shutdown: CancellationToken, request_timeout: Duration) -> Self {
        Self {
            scraper,
            shutdown,
            request_timeout,
        }
    }
}

/// `/health` is open; `/scrape` sits behind the rate limiter, then the API key check.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let mut protected = Router::new().route("/scrape", post(scrape_handler));
    if let Some(key) = &config.api_key {
        protected = protected.layer(middleware::from_fn_with_state(
            Arc::<str>::from(key.as_str()),
            auth::require_bearer,
        ));
    }
    let protected = protected.layer(middleware::from_fn_with_state(
        Arc::new(RateLimiter::per_minute(config.rate_limit_per_minute)),
        limit_by_ip,
    ));

    protected
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serves until Ctrl-C or SIGTERM, then cancels `shutdown` and drains open requests.
pub async fn serve(config: &Config, scraper: BatchScraper) -> std::io::Result<()> {
    let shutdown = CancellationToken::new();
    let state = AppState::new(scraper, shutdown.clone(), config.request_timeout);
    let app = build_router(state, config);

    let address = config.bind_address();
    let listener = TcpListener::bind(address).await?;
    engine_info!(
        "article service listening on {} (workers={}, max urls={})",
        address,
        config.max_concurrency,
        config.max_urls_per_request
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            engine_info!("shutdown requested; cancelling in-flight batches");
            shutdown.cancel();
        })
        .await?;

    engine_info!("article service stopped");
    Ok(())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn scrape_handler(
    State(state): State<AppState>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            engine_warn!("rejected scrape request: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, "invalid JSON");
        }
    };

    if let Err(err) = validate_batch(&request.urls, state.scraper.limits()) {
        engine_warn!("rejected scrape request: {}", err);
        let message = match err {
            ValidationError::Empty => "urls must not be empty",
            ValidationError::TooMany { .. } => "too many URLs",
        };
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    // Cancelled on shutdown, on timeout, or when this future is dropped.
    let cancel = state.shutdown.child_token();
    let _abandoned = cancel.clone().drop_guard();

    let work = state.scraper.scrape(&cancel, &request.urls);
    tokio::pin!(work);
    let results = tokio::select! {
        results = &mut work => results,
        _ = tokio::time::sleep(state.request_timeout) => {
            engine_warn!(
                "scrape request exceeded {:?}; cancelling {} urls",
                state.request_timeout,
                request.urls.len()
            );
            cancel.cancel();
            work.await
        }
    };

    Json(ScrapeResponse { results }).into_response()
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => engine_info!("received SIGTERM"),
                _ = tokio::signal::ctrl_c() => engine_info!("received Ctrl-C"),
            }
        }
        Err(err) => {
            engine_warn!("could not register SIGTERM handler: {}", err);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        engine_warn!("failed to listen for Ctrl-C: {}", err);
    }
}
