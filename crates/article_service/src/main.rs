use anyhow::Context;
use article_engine::BatchScraper;
use article_service::{log_level_from_env, serve, Config};
use engine_logging::{engine_info, LogDestination};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    engine_logging::initialize(LogDestination::Terminal, log_level_from_env());

    let config = Config::from_env();
    engine_info!(
        "starting article service: fetch timeout {:?}, request timeout {:?}, auth {}",
        config.fetch_timeout,
        config.request_timeout,
        if config.api_key.is_some() { "on" } else { "off" }
    );

    let scraper = BatchScraper::from_config(&config.engine_config()).context("build scraper")?;
    serve(&config, scraper)
        .await
        .with_context(|| format!("serve on {}", config.bind_address()))
}
