//! # Knowledge Store SQL
//!
//! SQL strings for the `knowledge_base` table, kept apart from the store logic.

pub const CREATE_KNOWLEDGE_BASE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS knowledge_base (
        kb_id TEXT PRIMARY KEY,
        source_type TEXT NOT NULL,
        source_url TEXT,
        title TEXT NOT NULL,
        content TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        last_updated TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    );
";

/// At most one active and one retired row per content hash.
pub const CREATE_HASH_ACTIVE_INDEX: &str = "
    CREATE UNIQUE INDEX IF NOT EXISTS idx_knowledge_base_hash_active
    ON knowledge_base (content_hash, is_active);
";

pub const CREATE_LAST_UPDATED_INDEX: &str = "
    CREATE INDEX IF NOT EXISTS idx_knowledge_base_last_updated
    ON knowledge_base (last_updated);
";

pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    CREATE_KNOWLEDGE_BASE_TABLE,
    CREATE_HASH_ACTIVE_INDEX,
    CREATE_LAST_UPDATED_INDEX,
];

/// Inserts an active entry unless an active entry with the same hash exists.
/// Expects `kb_id, source_type, source_url, title, content, content_hash, last_updated`.
pub const INSERT_IF_NEW: &str = "
    INSERT INTO knowledge_base
        (kb_id, source_type, source_url, title, content, content_hash, last_updated, is_active)
    VALUES (?, ?, ?, ?, ?, ?, ?, 1)
    ON CONFLICT(content_hash, is_active) DO NOTHING
";

const ENTRY_COLUMNS: &str =
    "kb_id, source_type, source_url, title, content, content_hash, last_updated, is_active";

/// Active entries, newest first.
pub fn list_active(limit: u32) -> String {
    format!(
        "
        SELECT {ENTRY_COLUMNS}
        FROM knowledge_base
        WHERE is_active = 1
        ORDER BY last_updated DESC
        LIMIT {limit};
    "
    )
}

pub fn select_by_id() -> String {
    format!("SELECT {ENTRY_COLUMNS} FROM knowledge_base WHERE kb_id = ?")
}

pub const MAX_ACTIVE_TIMESTAMP: &str =
    "SELECT MAX(last_updated) FROM knowledge_base WHERE is_active = 1";

pub const COUNT_ACTIVE: &str = "SELECT COUNT(*) FROM knowledge_base WHERE is_active = 1";

pub const SELECT_ACTIVE_HASH: &str =
    "SELECT content_hash FROM knowledge_base WHERE kb_id = ? AND is_active = 1";

pub const DELETE_RETIRED_WITH_HASH: &str =
    "DELETE FROM knowledge_base WHERE content_hash = ? AND is_active = 0";

pub const RETIRE_ENTRY: &str = "UPDATE knowledge_base SET is_active = 0 WHERE kb_id = ?";
