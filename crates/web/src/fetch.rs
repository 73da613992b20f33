//! Single-attempt HTTP GET with a per-call timeout.

use std::time::Duration;

use reqwest::Client;
use sitekb::LoadError;
use thiserror::Error;
use tracing::debug;

/// What went wrong with a fetch. Timeouts, unreachable hosts, and rejected requests are
/// kept apart so callers can decide between falling back and skipping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Host unreachable: {0}")]
    Unreachable(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("GET {url} failed: {cause}")]
pub struct FetchError {
    pub url: String,
    pub cause: FetchCause,
}

impl From<FetchError> for LoadError {
    fn from(err: FetchError) -> Self {
        match err.cause {
            FetchCause::Timeout(after) => LoadError::Timeout(format!("{after:?}")),
            FetchCause::Unreachable(detail) => LoadError::Unreachable(detail),
            FetchCause::Status(code) => LoadError::Rejected(code),
            FetchCause::Transport(detail) => LoadError::Transport(detail),
        }
    }
}

/// A thin wrapper over a shared `reqwest::Client` that always sends the configured
/// User-Agent. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// Fetches `url` once. No retries.
    pub async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let fail = |cause| FetchError {
            url: url.to_string(),
            cause,
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| fail(classify(&e, timeout)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fail(FetchCause::Status(status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fail(classify(&e, timeout)))?;
        debug!(url = %url, bytes = body.len(), "Fetched.");
        Ok(body.to_vec())
    }
}

fn classify(err: &reqwest::Error, timeout: Duration) -> FetchCause {
    if err.is_timeout() {
        FetchCause::Timeout(timeout)
    } else if err.is_connect() {
        FetchCause::Unreachable(err.to_string())
    } else {
        FetchCause::Transport(err.to_string())
    }
}
