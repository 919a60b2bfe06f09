use std::sync::Arc;
use std::time::Instant;

use article_core::{normalize_url, validate_batch, ArticleResult, BatchLimits, ValidationError};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::progress::{NoopSink, ProgressSink};
use crate::user_agent::UserAgentPool;
use crate::{
    EngineConfig, EngineError, EngineEvent, Extractor, JobProgress, PipelineError,
    ReadabilityExtractor, Stage,
};

/// Runs a batch of URLs through fetch and extract with at most `max_workers`
/// pipelines in flight. Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct BatchScraper {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    max_workers: usize,
    limits: BatchLimits,
    sink: Arc<dyn ProgressSink>,
}

impl BatchScraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn Extractor>, max_workers: usize) -> Self {
        Self {
            fetcher,
            extractor,
            max_workers: max_workers.max(1),
            limits: BatchLimits::default(),
            sink: Arc::new(NoopSink),
        }
    }

    /// Builds the reqwest fetcher and readability extractor described by `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
        let agents = Arc::new(UserAgentPool::new(config.user_agents.iter().cloned()));
        let fetcher = ReqwestFetcher::with_user_agents(config.fetch.clone(), agents)?;
        let extractor = ReadabilityExtractor::new(config.extract.clone());
        Ok(Self::new(Arc::new(fetcher), Arc::new(extractor), config.max_workers).with_limits(config.limits))
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    /// Validates the batch size, then scrapes. A rejected batch starts no pipeline.
    pub async fn scrape_batch(
        &self,
        cancel: &CancellationToken,
        urls: &[String],
    ) -> Result<Vec<ArticleResult>, ValidationError> {
        validate_batch(urls, self.limits)?;
        Ok(self.scrape(cancel, urls).await)
    }

    /// Returns exactly one result per input URL, at the input's position.
    ///
    /// Never fails as a whole: fetch, extract and cancellation failures are
    /// recorded in the affected entry only.
    pub async fn scrape(&self, cancel: &CancellationToken, urls: &[String]) -> Vec<ArticleResult> {
        let started = Instant::now();
        engine_info!(
            "scrape batch start size={} workers={}",
            urls.len(),
            self.max_workers
        );

        let gate = Arc::new(Semaphore::new(self.max_workers));
        let mut workers = JoinSet::new();
        for (index, raw) in urls.iter().enumerate() {
            let pipeline = Pipeline {
                index,
                url: normalize_url(raw),
                fetcher: Arc::clone(&self.fetcher),
                extractor: Arc::clone(&self.extractor),
                sink: Arc::clone(&self.sink),
            };
            let gate = Arc::clone(&gate);
            let cancel = cancel.clone();
            workers.spawn(async move { pipeline.run(&gate, &cancel).await });
        }

        let mut slots: Vec<Option<ArticleResult>> = vec![None; urls.len()];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(err) => engine_error!("scrape pipeline aborted: {}", err),
            }
        }

        let results: Vec<ArticleResult> = slots
            .into_iter()
            .zip(urls)
            .map(|(slot, raw)| {
                slot.unwrap_or_else(|| ArticleResult::failed(normalize_url(raw), "pipeline aborted"))
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_error()).count();
        engine_info!(
            "scrape batch done size={} ok={} failed={} elapsed_ms={}",
            results.len(),
            results.len() - failed,
            failed,
            started.elapsed().as_millis()
        );
        results
    }
}

struct Pipeline {
    index: usize,
    /// Canonical URL; fetched and recorded in the result.
    url: String,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn ProgressSink>,
}

impl Pipeline {
    async fn run(self, gate: &Semaphore, cancel: &CancellationToken) -> (usize, ArticleResult) {
        self.report(Stage::Pending);
        let result = match self.drive(gate, cancel).await {
            Ok(article) => {
                self.sink.emit(EngineEvent::JobCompleted {
                    index: self.index,
                    url: self.url.clone(),
                    result: Ok(()),
                });
                article
            }
            Err(err) => {
                engine_warn!("scrape [{}] {} failed: {}", self.index, self.url, err);
                self.sink.emit(EngineEvent::JobCompleted {
                    index: self.index,
                    url: self.url.clone(),
                    result: Err(err.to_string()),
                });
                ArticleResult::failed(self.url.clone(), &err)
            }
        };
        (self.index, result)
    }

    async fn drive(&self, gate: &Semaphore, cancel: &CancellationToken) -> Result<ArticleResult, PipelineError> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(self.cancelled()),
            permit = gate.acquire() => permit.map_err(|_| self.cancelled())?,
        };

        self.report(Stage::Fetching);
        let page = self.fetcher.fetch(cancel, &self.url).await?;

        self.report(Stage::Extracting);
        // Parsing and scoring are CPU-bound; keep them off the async workers.
        let extractor = Arc::clone(&self.extractor);
        let url = self.url.clone();
        let mut article = tokio::task::spawn_blocking(move || extractor.extract(&url, &page.bytes))
            .await
            .map_err(|err| PipelineError::Aborted {
                url: self.url.clone(),
                message: err.to_string(),
            })??;
        article.url.clone_from(&self.url);

        self.report(Stage::Done);
        Ok(article)
    }

    fn cancelled(&self) -> PipelineError {
        PipelineError::Cancelled {
            url: self.url.clone(),
        }
    }

    fn report(&self, stage: Stage) {
        engine_debug!("scrape [{}] {} -> {:?}", self.index, self.url, stage);
        self.sink.emit(EngineEvent::Progress(JobProgress {
            index: self.index,
            url: self.url.clone(),
            stage,
        }));
    }
}
