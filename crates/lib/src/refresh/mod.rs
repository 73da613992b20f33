//! # Refresh Scheduler
//!
//! Decides when the knowledge base needs refreshing and runs the refresh:
//! discover candidate URLs, load each page, gate on content length, and write
//! new content to the store.
//!
//! A run never aborts because of one page. Load failures and short pages are
//! collected in [`RefreshOutcome::errors`]; only a store failure ends the run early,
//! and every entry written before that point stays committed.

pub mod traits;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RefreshSettings;
use crate::errors::RefreshError;
use crate::store::KnowledgeStore;
use crate::types::{parse_timestamp, NewKnowledgeEntry, UpsertOutcome};
use traits::{LoadError, PageLoader, UrlSource};

/// Summary of one refresh run. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshOutcome {
    /// URLs whose processing started. Smaller than the candidate list only when the
    /// run was cancelled.
    pub urls_considered: usize,
    /// URLs that loaded and passed the content-length gate.
    pub urls_succeeded: usize,
    pub items_added: usize,
    pub items_duplicate: usize,
    /// Per-URL failures, in processing order.
    pub errors: Vec<UrlFailure>,
    pub cancelled: bool,
}

/// A URL that produced no entry, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlFailure {
    pub url: String,
    pub reason: FailureReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Fetching or extracting the page failed.
    Load(LoadError),
    /// The page loaded but its content was at or below the minimum length.
    ContentTooShort { chars: usize },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Load(e) => write!(f, "{e}"),
            FailureReason::ContentTooShort { chars } => {
                write!(f, "Content too short ({chars} characters)")
            }
        }
    }
}

impl fmt::Display for UrlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.reason)
    }
}

/// Returns whether a knowledge base whose newest active entry carries `latest` is
/// stale at `now`.
///
/// Stale when there is no entry, when the timestamp cannot be parsed, or when strictly
/// more than `threshold` has elapsed.
pub fn is_stale(latest: Option<&str>, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
    let Some(raw) = latest else {
        return true;
    };
    match parse_timestamp(raw) {
        Some(ts) => now.signed_duration_since(ts) > threshold,
        None => {
            warn!(last_updated = %raw, "Unparseable knowledge timestamp; treating as stale.");
            true
        }
    }
}

/// Orchestrates refresh runs against a shared [`KnowledgeStore`].
///
/// Only one run executes at a time per store, across every scheduler built over it; a
/// second caller gets [`RefreshError::AlreadyRunning`] instead of starting an
/// overlapping crawl.
#[derive(Clone)]
pub struct RefreshScheduler {
    store: KnowledgeStore,
    urls: Arc<dyn UrlSource>,
    pages: Arc<dyn PageLoader>,
    settings: RefreshSettings,
}

impl RefreshScheduler {
    pub fn new(
        store: KnowledgeStore,
        urls: Arc<dyn UrlSource>,
        pages: Arc<dyn PageLoader>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            store,
            urls,
            pages,
            settings,
        }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    /// Whether a run is currently in progress.
    pub fn is_running(&self) -> bool {
        self.store.is_refreshing()
    }

    /// Whether a refresh is due now. Fails open: a store error counts as due.
    pub async fn is_due(&self) -> bool {
        self.is_due_at(Utc::now()).await
    }

    pub async fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        match self.store.max_active_timestamp().await {
            Ok(latest) => is_stale(
                latest.as_deref(),
                now,
                self.settings.staleness_threshold(),
            ),
            Err(e) => {
                warn!("Could not read knowledge freshness, assuming stale: {e}");
                true
            }
        }
    }

    /// Runs one refresh over `urls`, or over discovered URLs when `None`.
    ///
    /// Cancelling `cancel` stops the run before its next fetch; a page that is already
    /// loading is finished and written.
    pub async fn run(
        &self,
        urls: Option<Vec<String>>,
        cancel: &CancellationToken,
    ) -> Result<RefreshOutcome, RefreshError> {
        let _running = self
            .store
            .try_begin_refresh()
            .ok_or(RefreshError::AlreadyRunning)?;

        let urls = match urls {
            Some(urls) => urls,
            None => self.candidate_urls().await,
        };
        info!(url_count = urls.len(), "Starting knowledge base refresh.");

        let mut outcome = RefreshOutcome::default();
        let delay = self.settings.page_delay();

        for url in urls {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Refresh cancelled; no further pages will be fetched.");
                    outcome.cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            outcome.urls_considered += 1;

            let page = match self.pages.load(&url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %url, "Skipping page: {e}");
                    outcome.errors.push(UrlFailure {
                        url,
                        reason: FailureReason::Load(e),
                    });
                    continue;
                }
            };

            let chars = page.content.chars().count();
            if chars <= self.settings.min_content_chars {
                debug!(url = %url, chars, "Skipping page with too little content.");
                outcome.errors.push(UrlFailure {
                    url,
                    reason: FailureReason::ContentTooShort { chars },
                });
                continue;
            }
            outcome.urls_succeeded += 1;

            let entry = NewKnowledgeEntry::web(&url, &page.title, &page.content);
            match self.store.upsert_if_new(&entry).await? {
                UpsertOutcome::Created(id) => {
                    debug!(url = %url, kb_id = %id, "Added knowledge entry.");
                    outcome.items_added += 1;
                }
                UpsertOutcome::Duplicate => {
                    debug!(url = %url, "Content already known.");
                    outcome.items_duplicate += 1;
                }
            }
        }

        info!(
            considered = outcome.urls_considered,
            succeeded = outcome.urls_succeeded,
            added = outcome.items_added,
            duplicate = outcome.items_duplicate,
            failed = outcome.errors.len(),
            cancelled = outcome.cancelled,
            "Knowledge base refresh finished."
        );
        Ok(outcome)
    }

    async fn candidate_urls(&self) -> Vec<String> {
        let discovered = self.urls.discover(&[]).await;
        if !discovered.is_empty() {
            return discovered;
        }
        warn!("URL discovery returned nothing; using the fallback list.");
        self.urls.fallback_urls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_store_is_stale() {
        assert!(is_stale(None, now(), Duration::hours(6)));
    }

    #[test]
    fn test_staleness_boundary_is_strict() {
        let threshold = Duration::hours(6);
        let exactly = "2025-06-01T06:00:00.000000Z";
        let just_over = "2025-06-01T05:59:59.000000Z";
        let recent = "2025-06-01 11:00:00";
        assert!(!is_stale(Some(exactly), now(), threshold));
        assert!(is_stale(Some(just_over), now(), threshold));
        assert!(!is_stale(Some(recent), now(), threshold));
    }

    #[test]
    fn test_unparseable_timestamp_is_stale() {
        assert!(is_stale(Some("not a date"), now(), Duration::hours(6)));
    }

    #[test]
    fn test_failure_reason_display() {
        let failure = UrlFailure {
            url: "https://example.org/a".to_string(),
            reason: FailureReason::ContentTooShort { chars: 42 },
        };
        assert_eq!(
            failure.to_string(),
            "https://example.org/a: Content too short (42 characters)"
        );
        let rejected = FailureReason::Load(LoadError::Rejected(503));
        assert_eq!(rejected.to_string(), "Rejected with HTTP status 503");
    }
}
