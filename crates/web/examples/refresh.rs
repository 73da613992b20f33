//! Example: refresh a knowledge base from a live website and print the newest entries.
//!
//! Uses the default site configuration unless `SITEMAP_URL` and `BASE_DOMAIN` are set.
//!
//! # Usage
//!
//! From the workspace root:
//! `RUST_LOG=info cargo run -p sitekb-web --example refresh`

use sitekb::{CancellationToken, RefreshSettings, SiteConfig};
use sitekb_web::open_knowledge_base;
use std::{env, fs};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // A dedicated DB so repeated runs start from scratch.
    let db_path = "db/sitekb_example.db";
    for path in [db_path.to_string(), format!("{db_path}-wal")] {
        if fs::metadata(&path).is_ok() {
            fs::remove_file(&path)?;
            info!("Removed existing database file: {path}");
        }
    }

    let mut site = SiteConfig::default();
    if let Ok(url) = env::var("SITEMAP_URL") {
        site.sitemap_url = url;
    }
    if let Ok(domain) = env::var("BASE_DOMAIN") {
        site.base_domain = domain;
    }

    let kb = open_knowledge_base(db_path, site, RefreshSettings::default()).await?;
    let cancel = CancellationToken::new();

    if let Some(outcome) = kb.trigger_refresh(&cancel).await? {
        info!(
            "Refresh finished: {} added, {} duplicate, {} failed.",
            outcome.items_added,
            outcome.items_duplicate,
            outcome.errors.len()
        );
        for failure in &outcome.errors {
            info!("  {failure}");
        }
    }

    for item in kb.get_knowledge_items(5).await {
        let preview: String = item.content.chars().take(120).collect();
        println!("{}\n  {}\n  {preview}\n", item.title, item.source_url.unwrap_or_default());
    }
    Ok(())
}
