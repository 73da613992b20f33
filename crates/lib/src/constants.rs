//! # Shared Constants
//!
//! Constants shared across the crates of the `sitekb` workspace.

/// The default path for the knowledge-base database.
pub const DEFAULT_DB_FILE: &str = "db/sitekb.db";

/// The XML namespace of the sitemaps.org protocol.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
