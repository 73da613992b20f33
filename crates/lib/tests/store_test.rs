//! # Knowledge Store Tests
//!
//! Exercises insert-if-new semantics, ordering, soft deletion, and concurrent writers
//! against an isolated in-memory database.

mod common;

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use common::setup_tracing;
use sitekb::{KnowledgeStore, NewKnowledgeEntry, SourceType, UpsertOutcome};
use sitekb_test_utils::TestSetup;

fn entry(url: &str, content: &str) -> NewKnowledgeEntry {
    NewKnowledgeEntry::web(url, "Test Page", content)
}

#[tokio::test]
async fn test_upsert_if_new_reports_duplicate_for_same_content() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let setup = TestSetup::new().await?;
    let store = &setup.store;

    // --- Act ---
    let first = store
        .upsert_if_new(&entry("https://example.org/a", "Enrolment opens in  March."))
        .await?;
    let second = store
        .upsert_if_new(&entry("https://example.org/a", "Enrolment opens\nin March."))
        .await?;

    // --- Assert ---
    let UpsertOutcome::Created(id) = first else {
        panic!("Expected the first write to create an entry, got {first:?}");
    };
    assert_eq!(second, UpsertOutcome::Duplicate);

    let stored = store.get(&id).await?.expect("entry should exist");
    assert_eq!(stored.content, "Enrolment opens in March.");
    assert_eq!(stored.source_type, SourceType::Web);
    assert_eq!(stored.source_url.as_deref(), Some("https://example.org/a"));
    assert!(stored.is_active);
    assert_eq!(store.count_active().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_identical_content_from_two_urls_yields_one_entry() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let setup = TestSetup::new().await?;
    let content = "Census date is the last day to withdraw without financial penalty.";

    // --- Act ---
    setup
        .store
        .upsert_if_new(&entry("https://example.org/a", content))
        .await?;
    let outcome = setup
        .store
        .upsert_if_new(&entry("https://example.org/c", content))
        .await?;

    // --- Assert ---
    assert_eq!(outcome, UpsertOutcome::Duplicate);
    let items = setup.store.list_active(100).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source_url.as_deref(), Some("https://example.org/a"));
    Ok(())
}

#[tokio::test]
async fn test_list_active_orders_newest_first_and_respects_limit() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let setup = TestSetup::new().await?;
    let base = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();
    for (i, content) in ["first page", "second page", "third page"].iter().enumerate() {
        let e = entry("https://example.org", content)
            .with_last_updated(base + Duration::hours(i as i64));
        setup.store.upsert_if_new(&e).await?;
    }

    // --- Act ---
    let all = setup.store.list_active(10).await?;
    let top = setup.store.list_active(2).await?;
    let newest = setup.store.max_active_timestamp().await?;

    // --- Assert ---
    let contents: Vec<_> = all.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["third page", "second page", "first page"]);
    assert_eq!(top.len(), 2);
    assert_eq!(newest.as_deref(), Some("2025-02-01T11:00:00.000000Z"));
    assert_eq!(all[0].last_updated_at(), Some(base + Duration::hours(2)));
    Ok(())
}

#[tokio::test]
async fn test_empty_store_has_no_timestamp() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;

    assert_eq!(setup.store.max_active_timestamp().await?, None);
    assert_eq!(setup.store.count_active().await?, 0);
    assert!(setup.store.list_active(100).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_deactivate_retires_entry_and_allows_reingest() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let setup = TestSetup::new().await?;
    let store = &setup.store;
    let content = "International students must hold a valid visa for the study period.";
    let UpsertOutcome::Created(first_id) =
        store.upsert_if_new(&entry("https://example.org/visa", content)).await?
    else {
        panic!("expected a new entry");
    };

    // --- Act & Assert: retire, then the same content is accepted again ---
    assert!(store.deactivate(&first_id).await?);
    assert!(!store.deactivate(&first_id).await?, "already retired");
    assert!(store.list_active(10).await?.is_empty());
    assert!(!store.get(&first_id).await?.expect("row kept").is_active);

    let UpsertOutcome::Created(second_id) =
        store.upsert_if_new(&entry("https://example.org/visa", content)).await?
    else {
        panic!("retired content should be re-ingestable");
    };

    // --- Retiring the second copy replaces the older retired row ---
    assert!(store.deactivate(&second_id).await?);
    assert!(store.get(&first_id).await?.is_none());
    assert!(!store.get(&second_id).await?.expect("row kept").is_active);
    assert_eq!(store.count_active().await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_deactivate_unknown_id_returns_false() -> Result<()> {
    setup_tracing();
    let setup = TestSetup::new().await?;
    assert!(!setup.store.deactivate("no-such-id").await?);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_upserts_create_exactly_one_entry() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let setup = TestSetup::new().await?;
    let content = "Fee payment deadlines are published each semester on the fees page.";

    // --- Act ---
    let mut handles = Vec::new();
    for i in 0..8 {
        let store = setup.store.clone();
        let e = entry(&format!("https://example.org/{i}"), content);
        handles.push(tokio::spawn(async move { store.upsert_if_new(&e).await }));
    }
    let mut created = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await?? {
            UpsertOutcome::Created(_) => created += 1,
            UpsertOutcome::Duplicate => duplicates += 1,
        }
    }

    // --- Assert ---
    assert_eq!(created, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(setup.store.count_active().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_open_file_database_persists_entries() -> Result<()> {
    // --- Arrange ---
    setup_tracing();
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("nested").join("kb.db");
    let db_path = db_path.to_string_lossy().to_string();

    // --- Act ---
    {
        let store = KnowledgeStore::open(&db_path).await?;
        store
            .upsert_if_new(&entry("https://example.org/a", "Campus maps and opening hours."))
            .await?;
    }
    let reopened = KnowledgeStore::open(&db_path).await?;

    // --- Assert ---
    assert_eq!(reopened.count_active().await?, 1);
    Ok(())
}
