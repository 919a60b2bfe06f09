use article_core::BatchLimits;

use crate::{ExtractOptions, FetchSettings};

pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Everything needed to assemble a [`crate::BatchScraper`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    pub extract: ExtractOptions,
    /// Upper bound on pipelines running at once.
    pub max_workers: usize,
    pub limits: BatchLimits,
    /// Outgoing identities; empty selects the built-in pool.
    pub user_agents: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            extract: ExtractOptions::default(),
            max_workers: DEFAULT_MAX_WORKERS,
            limits: BatchLimits::default(),
            user_agents: Vec::new(),
        }
    }
}
