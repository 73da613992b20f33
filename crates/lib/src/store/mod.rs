//! # Knowledge Store
//!
//! Persistent storage for knowledge entries, backed by a local Turso (SQLite) database.
//!
//! Writes go through a single writer lock, and the insert itself is an
//! `INSERT … ON CONFLICT DO NOTHING` against the unique `(content_hash, is_active)`
//! index, so duplicate detection holds even if two refreshes race. Every write is its
//! own atomic statement; readers never see a half-written entry.

pub mod sql;

use std::fmt::{self, Debug};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use turso::{params, Database, Row, Value as TursoValue};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::types::{
    content_hash, format_timestamp, normalize_content, KnowledgeEntry, NewKnowledgeEntry,
    UpsertOutcome,
};

/// A handle to the knowledge base.
///
/// Cloning is cheap and every clone shares the same database, writer lock and refresh
/// guard, so one store can serve the refresh scheduler and any number of readers at once.
#[derive(Clone)]
pub struct KnowledgeStore {
    db: Database,
    write_lock: Arc<Mutex<()>>,
    refresh_lock: Arc<Mutex<()>>,
}

impl KnowledgeStore {
    /// Opens (or creates) the database at `db_path` and ensures the schema exists.
    ///
    /// Use `":memory:"` for an isolated in-memory store.
    pub async fn open(db_path: &str) -> Result<Self, StoreError> {
        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StoreError::Connection(e.to_string()))?;
                }
            }
        }

        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        // PRAGMA returns a row, so it has to go through `query`.
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self::from_database(db);
        store.initialize_schema().await?;
        info!(db_path = %db_path, "Knowledge store ready.");
        Ok(store)
    }

    /// Wraps an existing database. The schema is not touched.
    pub fn from_database(db: Database) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Claims the store for a refresh run. `None` while another run, from any scheduler
    /// sharing this store, holds the guard.
    pub fn try_begin_refresh(&self) -> Option<MutexGuard<'_, ()>> {
        self.refresh_lock.try_lock().ok()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    /// Creates the table and indexes if missing. Safe to call on every startup.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.db.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    /// Writes `entry` as a new active entry unless its content is already present.
    pub async fn upsert_if_new(
        &self,
        entry: &NewKnowledgeEntry,
    ) -> Result<UpsertOutcome, StoreError> {
        let content = normalize_content(&entry.content);
        let hash = content_hash(&content);
        let id = Uuid::new_v4().to_string();

        let _writer = self.write_lock.lock().await;
        let conn = self.db.connect()?;
        let changes = conn
            .execute(
                sql::INSERT_IF_NEW,
                params![
                    id.clone(),
                    entry.source_type.as_str(),
                    entry.source_url.as_deref(),
                    entry.title.clone(),
                    content,
                    hash.clone(),
                    format_timestamp(&entry.last_updated)
                ],
            )
            .await?;

        if changes == 0 {
            debug!(content_hash = %hash, "Active entry with identical content exists.");
            return Ok(UpsertOutcome::Duplicate);
        }
        debug!(kb_id = %id, content_hash = %hash, "Stored new knowledge entry.");
        Ok(UpsertOutcome::Created(id))
    }

    /// Active entries ordered by `last_updated`, newest first.
    pub async fn list_active(&self, limit: u32) -> Result<Vec<KnowledgeEntry>, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn.query(&sql::list_active(limit), ()).await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(entry_from_row(&row)?);
        }
        Ok(entries)
    }

    /// Looks up a single entry, active or not.
    pub async fn get(&self, id: &str) -> Result<Option<KnowledgeEntry>, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn.query(&sql::select_by_id(), params![id]).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(entry_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// The raw `last_updated` value of the newest active entry.
    ///
    /// Returned unparsed: deciding what an unreadable timestamp means is the
    /// caller's business.
    pub async fn max_active_timestamp(&self) -> Result<Option<String>, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn.query(sql::MAX_ACTIVE_TIMESTAMP, ()).await?;
        match rows.next().await? {
            Some(row) => optional_text(&row, 0, "last_updated"),
            None => Ok(None),
        }
    }

    pub async fn count_active(&self) -> Result<u64, StoreError> {
        let conn = self.db.connect()?;
        let mut rows = conn.query(sql::COUNT_ACTIVE, ()).await?;
        match rows.next().await? {
            Some(row) => match row.get_value(0)? {
                TursoValue::Integer(n) => Ok(n.max(0) as u64),
                _ => Err(StoreError::TypeConversion { column: "count" }),
            },
            None => Ok(0),
        }
    }

    /// Soft-deletes an active entry. Returns `false` if no active entry has this id.
    ///
    /// Only the most recently retired copy of a given content is kept: the unique
    /// `(content_hash, is_active)` index allows one retired row per hash, so an older
    /// retired row with the same hash is deleted in the same transaction.
    pub async fn deactivate(&self, id: &str) -> Result<bool, StoreError> {
        let _writer = self.write_lock.lock().await;
        let mut conn = self.db.connect()?;

        let hash = {
            let mut rows = conn.query(sql::SELECT_ACTIVE_HASH, params![id]).await?;
            match rows.next().await? {
                Some(row) => text(&row, 0, "content_hash")?,
                None => return Ok(false),
            }
        };

        let tx = conn.transaction().await?;
        tx.execute(sql::DELETE_RETIRED_WITH_HASH, params![hash.clone()])
            .await?;
        tx.execute(sql::RETIRE_ENTRY, params![id]).await?;
        tx.commit().await?;

        info!(kb_id = %id, content_hash = %hash, "Knowledge entry retired.");
        Ok(true)
    }
}

impl Debug for KnowledgeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeStore").finish_non_exhaustive()
    }
}

impl AsRef<Database> for KnowledgeStore {
    fn as_ref(&self) -> &Database {
        &self.db
    }
}

fn entry_from_row(row: &Row) -> Result<KnowledgeEntry, StoreError> {
    let is_active = match row.get_value(7)? {
        TursoValue::Integer(i) => i != 0,
        _ => return Err(StoreError::TypeConversion { column: "is_active" }),
    };
    Ok(KnowledgeEntry {
        id: text(row, 0, "kb_id")?,
        source_type: text(row, 1, "source_type")?.parse()?,
        source_url: optional_text(row, 2, "source_url")?,
        title: text(row, 3, "title")?,
        content: text(row, 4, "content")?,
        content_hash: text(row, 5, "content_hash")?,
        last_updated: text(row, 6, "last_updated")?,
        is_active,
    })
}

fn text(row: &Row, idx: usize, column: &'static str) -> Result<String, StoreError> {
    match row.get_value(idx)? {
        TursoValue::Text(s) => Ok(s),
        _ => Err(StoreError::TypeConversion { column }),
    }
}

fn optional_text(row: &Row, idx: usize, column: &'static str) -> Result<Option<String>, StoreError> {
    match row.get_value(idx)? {
        TursoValue::Text(s) => Ok(Some(s)),
        TursoValue::Null => Ok(None),
        _ => Err(StoreError::TypeConversion { column }),
    }
}
