//! Article engine: fetch, decode and extract pipeline plus the batch orchestrator.
mod batch;
mod config;
mod decode;
mod engine;
mod extract;
mod fetch;
mod progress;
mod readability;
mod text;
mod types;
mod user_agent;

pub use batch::BatchScraper;
pub use config::{EngineConfig, DEFAULT_MAX_WORKERS};
pub use decode::{decode_html, DecodedHtml};
pub use engine::EngineHandle;
pub use extract::{ExtractOptions, Extractor, ReadabilityExtractor, DEFAULT_MIN_PARAGRAPH_CHARS};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, DEFAULT_MAX_BODY_BYTES};
pub use progress::{ChannelProgressSink, NoopSink, ProgressSink};
pub use text::{choose_content, collapse_whitespace, sanitize_text, DEFAULT_EXCERPT_LEAD_CHARS};
pub use types::{
    EngineError, EngineEvent, ExtractError, FailureKind, FetchError, FetchMetadata, FetchOutput,
    JobProgress, PipelineError, Stage,
};
pub use user_agent::UserAgentPool;
