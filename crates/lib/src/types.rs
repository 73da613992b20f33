//! # Knowledge Base Types
//!
//! Records stored in the `knowledge_base` table and the helpers that give them
//! their identity: content normalization, content hashing, and timestamp handling.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::StoreError;

/// Where a knowledge entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Web,
    Document,
    Manual,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Web => "web",
            SourceType::Document => "document",
            SourceType::Manual => "manual",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(SourceType::Web),
            "document" => Ok(SourceType::Document),
            "manual" => Ok(SourceType::Manual),
            other => Err(StoreError::UnknownSourceType(other.to_string())),
        }
    }
}

/// A stored knowledge entry.
///
/// Entries are never edited after creation; only `is_active` may change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeEntry {
    pub id: String,
    pub source_type: SourceType,
    pub source_url: Option<String>,
    pub title: String,
    pub content: String,
    pub content_hash: String,
    /// Raw stored timestamp. See [`KnowledgeEntry::last_updated_at`].
    pub last_updated: String,
    pub is_active: bool,
}

impl KnowledgeEntry {
    /// The parsed `last_updated` value, if it is in a recognised format.
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.last_updated)
    }
}

/// An entry waiting to be written by [`KnowledgeStore::upsert_if_new`](crate::store::KnowledgeStore::upsert_if_new).
#[derive(Debug, Clone)]
pub struct NewKnowledgeEntry {
    pub source_type: SourceType,
    pub source_url: Option<String>,
    pub title: String,
    pub content: String,
    pub last_updated: DateTime<Utc>,
}

impl NewKnowledgeEntry {
    /// A web page scraped now.
    pub fn web(url: &str, title: &str, content: &str) -> Self {
        Self {
            source_type: SourceType::Web,
            source_url: Some(url.to_string()),
            title: title.to_string(),
            content: content.to_string(),
            last_updated: Utc::now(),
        }
    }

    pub fn with_last_updated(mut self, last_updated: DateTime<Utc>) -> Self {
        self.last_updated = last_updated;
        self
    }
}

/// Result of an insert-if-new write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new active entry was written with this id.
    Created(String),
    /// An active entry with the same content hash already exists; nothing was written.
    Duplicate,
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// MD5 hex digest of the normalized content.
///
/// The URL is deliberately not part of the digest: two pages with the same text
/// collapse into one entry.
pub fn content_hash(content: &str) -> String {
    format!("{:x}", md5::compute(normalize_content(content).as_bytes()))
}

/// Formats a timestamp the way the store writes it: fixed-width RFC 3339 in UTC,
/// so lexical and chronological order agree.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses a stored timestamp. Accepts RFC 3339 and SQLite's `CURRENT_TIMESTAMP`
/// layout (`YYYY-MM-DD HH:MM:SS`, read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
