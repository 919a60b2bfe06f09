use article_core::{ArticleResult, ValidationError};
use tokio::runtime::{Builder, Runtime};
use tokio_util::sync::CancellationToken;

use crate::{BatchScraper, EngineConfig, EngineError};

/// Synchronous front for callers without an async runtime.
///
/// Owns a multi-threaded tokio runtime; the blocking calls must not be made
/// from inside another runtime.
pub struct EngineHandle {
    runtime: Runtime,
    scraper: BatchScraper,
}

impl EngineHandle {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let runtime = build_runtime()?;
        let scraper = {
            let _guard = runtime.enter();
            BatchScraper::from_config(config)?
        };
        Ok(Self { runtime, scraper })
    }

    pub fn with_scraper(scraper: BatchScraper) -> Result<Self, EngineError> {
        Ok(Self {
            runtime: build_runtime()?,
            scraper,
        })
    }

    pub fn scraper(&self) -> &BatchScraper {
        &self.scraper
    }

    /// Blocks until every URL of the batch has a result.
    pub fn scrape(&self, urls: &[String]) -> Result<Vec<ArticleResult>, ValidationError> {
        self.scrape_with_cancel(&CancellationToken::new(), urls)
    }

    pub fn scrape_with_cancel(
        &self,
        cancel: &CancellationToken,
        urls: &[String],
    ) -> Result<Vec<ArticleResult>, ValidationError> {
        self.runtime.block_on(self.scraper.scrape_batch(cancel, urls))
    }
}

fn build_runtime() -> Result<Runtime, EngineError> {
    Ok(Builder::new_multi_thread()
        .enable_all()
        .thread_name("article-engine")
        .build()?)
}
