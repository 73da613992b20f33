//! # sitekb: Website Knowledge-Base Refresh Pipeline
//!
//! This crate keeps a local, queryable knowledge base in sync with an external website.
//! It owns the persistent store, the staleness check, and the refresh orchestration.
//! Discovering candidate URLs and turning a URL into page text are delegated to plugins
//! (see `sitekb-web` and `sitekb-html`) through the traits in [`refresh::traits`].
//!
//! The surrounding application only talks to [`KnowledgeBase`]:
//! `trigger_refresh`, `get_knowledge_items`, and `is_knowledge_stale`.

pub mod config;
pub mod constants;
pub mod errors;
pub mod knowledge;
pub mod refresh;
pub mod store;
pub mod types;

pub use config::{RefreshSettings, SiteConfig};
pub use errors::{RefreshError, StoreError};
pub use knowledge::{KnowledgeBase, KnowledgeStats};
pub use refresh::{
    traits::{LoadError, PageContent, PageLoader, UrlSource},
    FailureReason, RefreshOutcome, RefreshScheduler, UrlFailure,
};
pub use store::KnowledgeStore;
pub use types::{KnowledgeEntry, NewKnowledgeEntry, SourceType, UpsertOutcome};

pub use tokio_util::sync::CancellationToken;
