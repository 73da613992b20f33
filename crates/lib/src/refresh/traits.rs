use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Why a single page could not be turned into content.
///
/// Plugin crates map their own transport and parsing errors into these variants, so
/// the scheduler can tell "unreachable" from "rejected" from "timed out" without
/// knowing how pages are fetched.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum LoadError {
    #[error("Timed out after {0}")]
    Timeout(String),

    #[error("Host unreachable: {0}")]
    Unreachable(String),

    #[error("Rejected with HTTP status {0}")]
    Rejected(u16),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Content could not be extracted from the page")]
    Extraction,
}

/// Text extracted from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    pub content: String,
}

/// Produces the candidate URLs for a refresh run.
///
/// Implementations never fail: when discovery breaks they return their fallback list.
#[async_trait]
pub trait UrlSource: Send + Sync {
    /// Discovers URLs matching any of `keywords`. An empty slice means "use the
    /// configured keywords".
    async fn discover(&self, keywords: &[String]) -> Vec<String>;

    /// Known-good URLs used when discovery returns nothing.
    fn fallback_urls(&self) -> Vec<String>;
}

/// Fetches one page and extracts its title and body text.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<PageContent, LoadError>;
}
