//! # sitekb: Knowledge-Base Refresh CLI
//!
//! Keeps a local knowledge base in sync with a website. Run `sitekb refresh` once,
//! or `sitekb watch` to refresh whenever the knowledge base goes stale.

mod config;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use sitekb::{CancellationToken, KnowledgeBase, KnowledgeEntry, RefreshOutcome};
use sitekb_web::open_knowledge_base;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use self::config::get_config;

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML config file (defaults to ./config.yml when present)
    #[arg(long, global = true, env = "SITEKB_CONFIG")]
    config: Option<String>,
    /// Override the database path from the configuration
    #[arg(long, global = true)]
    db: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape the site and add new content to the knowledge base
    Refresh(RefreshArgs),
    /// Show entry count, last update, and staleness
    Status(StatusArgs),
    /// List active knowledge entries, newest first
    List(ListArgs),
    /// Retire (soft-delete) an entry by id
    Retire(RetireArgs),
    /// Refresh periodically whenever the knowledge base is stale
    Watch(WatchArgs),
}

#[derive(Parser, Debug)]
struct RefreshArgs {
    /// Refresh these URLs instead of discovering them from the sitemap
    #[arg(long = "url")]
    urls: Vec<String>,
    /// Refresh even if the knowledge base is still fresh
    #[arg(long)]
    force: bool,
    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct StatusArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Maximum number of entries
    #[arg(short = 'n', long, default_value_t = 100)]
    limit: u32,
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct RetireArgs {
    id: String,
}

#[derive(Parser, Debug)]
struct WatchArgs {
    /// Seconds between staleness checks
    #[arg(long, default_value_t = 600)]
    interval: u64,
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = get_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_url = db;
    }

    let kb = open_knowledge_base(&config.db_url, config.site, config.refresh).await?;
    let cancel = shutdown_token();

    match cli.command {
        Commands::Refresh(args) => refresh(&kb, args, &cancel).await,
        Commands::Status(args) => status(&kb, args).await,
        Commands::List(args) => list(&kb, args).await,
        Commands::Retire(args) => retire(&kb, args).await,
        Commands::Watch(args) => watch(&kb, args, &cancel).await,
    }
}

/// A token cancelled on Ctrl-C, so a running refresh stops before its next fetch.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested; finishing the page in flight.");
            on_signal.cancel();
        }
    });
    token
}

// --- Command Handlers ---

async fn refresh(kb: &KnowledgeBase, args: RefreshArgs, cancel: &CancellationToken) -> Result<()> {
    let explicit = !args.urls.is_empty();
    if !args.force && !explicit && !kb.is_knowledge_stale().await {
        println!("Knowledge base is fresh; use --force to refresh anyway.");
        return Ok(());
    }

    let urls = explicit.then_some(args.urls);
    match kb.refresh_urls(urls, cancel).await? {
        Some(outcome) if args.json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        Some(outcome) => print_outcome(&outcome),
        None => println!("A refresh is already running."),
    }
    Ok(())
}

async fn status(kb: &KnowledgeBase, args: StatusArgs) -> Result<()> {
    let stats = kb.stats().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("Active entries: {}", stats.active_entries);
    println!(
        "Last updated:   {}",
        stats.last_updated.as_deref().unwrap_or("never")
    );
    println!("Stale:          {}", if stats.is_stale { "yes" } else { "no" });
    Ok(())
}

async fn list(kb: &KnowledgeBase, args: ListArgs) -> Result<()> {
    let items = kb.get_knowledge_items(args.limit).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if items.is_empty() {
        println!("The knowledge base is empty. Run `sitekb refresh` first.");
    }
    for item in &items {
        print_entry(item);
    }
    Ok(())
}

async fn retire(kb: &KnowledgeBase, args: RetireArgs) -> Result<()> {
    if !kb.store().deactivate(&args.id).await? {
        bail!("No active entry with id '{}'.", args.id);
    }
    println!("Retired {}.", args.id);
    Ok(())
}

async fn watch(kb: &KnowledgeBase, args: WatchArgs, cancel: &CancellationToken) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));
    info!(interval_secs = args.interval, "Watching knowledge base freshness.");
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Some(outcome) = kb.refresh_if_due(cancel).await? {
                    print_outcome(&outcome);
                }
            }
        }
    }
    info!("Watch stopped.");
    Ok(())
}

// --- Output ---

fn print_outcome(outcome: &RefreshOutcome) {
    println!(
        "Considered {} URL(s): {} succeeded, {} added, {} duplicate, {} failed{}",
        outcome.urls_considered,
        outcome.urls_succeeded,
        outcome.items_added,
        outcome.items_duplicate,
        outcome.errors.len(),
        if outcome.cancelled { " (cancelled)" } else { "" }
    );
    for failure in &outcome.errors {
        println!("  - {failure}");
    }
}

fn print_entry(entry: &KnowledgeEntry) {
    let preview: String = entry.content.chars().take(200).collect();
    println!("[{}] {}", entry.id, entry.title);
    if let Some(url) = &entry.source_url {
        println!("  source:  {url}");
    }
    println!("  updated: {}", entry.last_updated);
    println!("  {preview}");
}
