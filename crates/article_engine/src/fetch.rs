use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_trace};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use tokio_util::sync::CancellationToken;

use crate::user_agent::UserAgentPool;
use crate::{EngineError, FailureKind, FetchError, FetchMetadata, FetchOutput};

pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    /// Hard ceiling on bytes read from one body; the rest is discarded.
    pub max_bytes: usize,
    pub accept: String,
    pub accept_language: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            redirect_limit: 5,
            max_bytes: DEFAULT_MAX_BODY_BYTES,
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieves the body of `url`, aborting promptly once `cancel` fires.
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<FetchOutput, FetchError>;
}

/// Fetcher over one pooled `reqwest::Client`, shared by every pipeline.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
    agents: Arc<UserAgentPool>,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, EngineError> {
        Self::with_user_agents(settings, Arc::new(UserAgentPool::default()))
    }

    pub fn with_user_agents(
        settings: FetchSettings,
        agents: Arc<UserAgentPool>,
    ) -> Result<Self, EngineError> {
        let client = build_client(&settings)?;
        Ok(Self {
            client,
            settings,
            agents,
        })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }
}

fn build_client(settings: &FetchSettings) -> Result<reqwest::Client, EngineError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
        .build()
        .map_err(|err| EngineError::Client(err.to_string()))
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, url, err.to_string()))?;

        let request = self
            .client
            .get(parsed)
            .header(USER_AGENT, self.agents.next_agent())
            .header(ACCEPT, self.settings.accept.as_str())
            .header(ACCEPT_LANGUAGE, self.settings.accept_language.as_str());

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::cancelled(url)),
            result = request.send() => result.map_err(|err| map_reqwest_error(url, err))?,
        };

        // Early returns drop `response`, which hands the connection back to the pool.
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                url,
                status.to_string(),
            ));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let max_bytes = self.settings.max_bytes;
        let initial = response
            .content_length()
            .map_or(0, |len| len.min(max_bytes as u64) as usize);
        let mut bytes = Vec::with_capacity(initial);
        let mut truncated = false;
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::cancelled(url)),
                chunk = stream.next() => chunk,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|err| map_reqwest_error(url, err))?;
            let remaining = max_bytes - bytes.len();
            if chunk.len() > remaining {
                bytes.extend_from_slice(&chunk[..remaining]);
                truncated = true;
                break;
            }
            bytes.extend_from_slice(&chunk);
            engine_trace!("fetch {} read {} bytes so far", url, bytes.len());
        }

        if truncated {
            engine_debug!("fetch {} truncated body at {} bytes", url, max_bytes);
        }

        let metadata = FetchMetadata {
            url: url.to_string(),
            final_url,
            content_type,
            byte_len: bytes.len() as u64,
            truncated,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, url, err.to_string());
    }
    FetchError::new(FailureKind::Network, url, err.to_string())
}
