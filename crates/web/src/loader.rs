//! Page loading: fetch a URL and hand the bytes to the HTML extractor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sitekb::{LoadError, PageContent, PageLoader};
use sitekb_html::PageExtractor;
use tracing::debug;

use crate::fetch::Fetcher;

#[derive(Debug, Clone)]
pub struct WebPageLoader {
    fetcher: Fetcher,
    extractor: Arc<PageExtractor>,
    timeout: Duration,
}

impl WebPageLoader {
    pub fn new(fetcher: Fetcher, extractor: PageExtractor, timeout: Duration) -> Self {
        Self {
            fetcher,
            extractor: Arc::new(extractor),
            timeout,
        }
    }
}

#[async_trait]
impl PageLoader for WebPageLoader {
    async fn load(&self, url: &str) -> Result<PageContent, LoadError> {
        let bytes = self.fetcher.get(url, self.timeout).await?;
        let page = self.extractor.extract(&bytes);
        if !page.success {
            return Err(LoadError::Extraction);
        }
        debug!(url = %url, chars = page.content.chars().count(), "Extracted page.");
        Ok(PageContent {
            title: page.title,
            content: page.content,
        })
    }
}
