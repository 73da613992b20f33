//! # sitekb-web: Web Discovery and Page Loading
//!
//! This crate connects the `sitekb` refresh pipeline to a real website. It provides
//! the HTTP [`Fetcher`], the [`SitemapResolver`] (a `UrlSource`), and the
//! [`WebPageLoader`] (a `PageLoader`), plus helpers that wire them into a ready
//! [`KnowledgeBase`].

pub mod fetch;
pub mod loader;
pub mod sitemap;

use std::sync::Arc;

use sitekb::{
    KnowledgeBase, KnowledgeStore, RefreshScheduler, RefreshSettings, SiteConfig, StoreError,
};
use sitekb_html::{ExtractError, PageExtractor};
use thiserror::Error;
use tracing::info;

pub use fetch::{FetchCause, FetchError, Fetcher};
pub use loader::WebPageLoader;
pub use sitemap::SitemapResolver;

// --- Error Definitions ---

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Failed to build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Invalid URL pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("HTML extractor setup failed: {0}")]
    Extractor(#[from] ExtractError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// --- Pipeline Assembly ---

/// Builds a scheduler that discovers URLs from `site`'s sitemap and loads pages over HTTP.
pub fn build_scheduler(
    store: KnowledgeStore,
    site: SiteConfig,
    settings: RefreshSettings,
) -> Result<RefreshScheduler, WebError> {
    let fetcher = Fetcher::new(&site.user_agent)?;
    let pages = WebPageLoader::new(fetcher.clone(), PageExtractor::new()?, site.page_timeout());
    let urls = SitemapResolver::new(fetcher, site)?;
    Ok(RefreshScheduler::new(
        store,
        Arc::new(urls),
        Arc::new(pages),
        settings,
    ))
}

/// Opens the store at `db_path` and returns a knowledge base backed by the website.
pub async fn open_knowledge_base(
    db_path: &str,
    site: SiteConfig,
    settings: RefreshSettings,
) -> Result<KnowledgeBase, WebError> {
    let store = KnowledgeStore::open(db_path).await?;
    info!(sitemap_url = %site.sitemap_url, "Knowledge base wired to website.");
    let scheduler = build_scheduler(store, site, settings)?;
    Ok(KnowledgeBase::new(scheduler))
}
