//! # Knowledge Base Facade
//!
//! The entry points the surrounding application calls. None of them let a refresh
//! or store problem escape into the caller's request path unless the caller asked
//! for a refresh explicitly: reads degrade to an empty list, staleness checks fail open.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::{RefreshError, StoreError};
use crate::refresh::{RefreshOutcome, RefreshScheduler};
use crate::store::KnowledgeStore;
use crate::types::KnowledgeEntry;

/// Snapshot of the knowledge base for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeStats {
    pub active_entries: u64,
    pub last_updated: Option<String>,
    pub is_stale: bool,
    pub refresh_running: bool,
}

#[derive(Clone)]
pub struct KnowledgeBase {
    scheduler: RefreshScheduler,
}

impl KnowledgeBase {
    pub fn new(scheduler: RefreshScheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &KnowledgeStore {
        self.scheduler.store()
    }

    /// Starts a refresh over discovered URLs and waits for it.
    ///
    /// Returns `Ok(None)` when another refresh is already in flight; the caller's
    /// request is then satisfied by that run.
    pub async fn trigger_refresh(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<RefreshOutcome>, RefreshError> {
        self.refresh_urls(None, cancel).await
    }

    /// Like [`trigger_refresh`](Self::trigger_refresh) but over an explicit URL list
    /// when `urls` is `Some`.
    pub async fn refresh_urls(
        &self,
        urls: Option<Vec<String>>,
        cancel: &CancellationToken,
    ) -> Result<Option<RefreshOutcome>, RefreshError> {
        match self.scheduler.run(urls, cancel).await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RefreshError::AlreadyRunning) => {
                info!("Refresh requested while one is running; skipping.");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Refreshes only when the knowledge base is stale.
    pub async fn refresh_if_due(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<RefreshOutcome>, RefreshError> {
        if !self.scheduler.is_due().await {
            return Ok(None);
        }
        self.trigger_refresh(cancel).await
    }

    /// Active entries, newest first. A store failure yields an empty list.
    pub async fn get_knowledge_items(&self, limit: u32) -> Vec<KnowledgeEntry> {
        match self.store().list_active(limit).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Could not read the knowledge base: {e}");
                Vec::new()
            }
        }
    }

    pub async fn is_knowledge_stale(&self) -> bool {
        self.scheduler.is_due().await
    }

    /// Lists active entries, running a refresh first if the knowledge base is empty.
    ///
    /// A failed refresh is logged and the (possibly empty) list is returned anyway.
    pub async fn load_or_initialize(
        &self,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Vec<KnowledgeEntry> {
        let items = self.get_knowledge_items(limit).await;
        if !items.is_empty() {
            return items;
        }

        info!("Knowledge base is empty; running an initial refresh.");
        if let Err(e) = self.trigger_refresh(cancel).await {
            warn!("Initial knowledge refresh failed: {e}");
        }
        self.get_knowledge_items(limit).await
    }

    pub async fn stats(&self) -> Result<KnowledgeStats, StoreError> {
        let store = self.store();
        let active_entries = store.count_active().await?;
        let last_updated = store.max_active_timestamp().await?;
        Ok(KnowledgeStats {
            active_entries,
            last_updated,
            is_stale: self.scheduler.is_due().await,
            refresh_running: self.scheduler.is_running(),
        })
    }
}
