//! HTTP front for the article engine: `/health` and `/scrape` over axum.
pub mod auth;
pub mod config;
pub mod rate_limit;
pub mod server;

pub use config::{log_level_from_env, parse_duration, Config};
pub use rate_limit::RateLimiter;
pub use server::{build_router, serve, AppState};
