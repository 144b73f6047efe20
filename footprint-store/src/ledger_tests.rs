//! Ledger state machine tests.
//!
//! Covers rollover, reset, load-time close-out and behaviour when the
//! store rejects writes.

use chrono::Duration;
use footprint_core::{DailyLedger, ManualClock, Role, TokenCount};
use std::sync::Arc;

use crate::ledger::Ledger;
use crate::ledger_store::LedgerStore;
use crate::test_support::{day, flaky_store};

async fn ledger_on(store: &LedgerStore, clock: &ManualClock) -> Ledger {
    Ledger::load(store.clone(), Arc::new(clock.clone())).await
}

// ============================================================================
// Load
// ============================================================================

#[tokio::test]
async fn test_load_empty_store_starts_today() {
    let store = LedgerStore::in_memory();
    let clock = ManualClock::at_noon(day(18));

    let ledger = ledger_on(&store, &clock).await;

    assert_eq!(ledger.snapshot(), DailyLedger::new(day(18)));
    assert!(!ledger.is_dirty());
    assert_eq!(store.load_current().await.unwrap(), Some(DailyLedger::new(day(18))));
}

#[tokio::test]
async fn test_load_resumes_same_day() {
    let store = LedgerStore::in_memory();
    let mut existing = DailyLedger::new(day(18));
    existing.apply(TokenCount::new(70), Role::User);
    store.save_current(&existing).await.unwrap();

    let ledger = ledger_on(&store, &ManualClock::at_noon(day(18))).await;

    assert_eq!(ledger.snapshot(), existing);
    assert!(store.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_load_archives_stale_record() {
    let store = LedgerStore::in_memory();
    let mut stale = DailyLedger::new(day(16));
    stale.apply(TokenCount::new(300), Role::User);
    store.save_current(&stale).await.unwrap();

    let ledger = ledger_on(&store, &ManualClock::at_noon(day(18))).await;

    assert_eq!(ledger.snapshot(), DailyLedger::new(day(18)));
    assert_eq!(store.load_archive(day(16)).await.unwrap(), Some(stale));
}

#[tokio::test]
async fn test_load_corrupt_record_starts_fresh() {
    let store = LedgerStore::in_memory();
    store
        .backend()
        .set("dailyData", serde_json::json!({"date": 12}))
        .await
        .unwrap();

    let ledger = ledger_on(&store, &ManualClock::at_noon(day(18))).await;
    assert_eq!(ledger.snapshot(), DailyLedger::new(day(18)));
}

// ============================================================================
// Recording
// ============================================================================

#[tokio::test]
async fn test_user_then_assistant_matches_snapshot() {
    let store = LedgerStore::in_memory();
    let mut ledger = ledger_on(&store, &ManualClock::at_noon(day(18))).await;

    ledger.record_turn(TokenCount::new(12), Role::User).await.unwrap();
    ledger.record_turn(TokenCount::new(150), Role::Assistant).await.unwrap();

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.queries, 1);
    assert_eq!(snapshot.total_tokens, 162);
    assert!((snapshot.carbon_grams - 81.0).abs() < 1e-9);
    assert_eq!(store.load_current().await.unwrap(), Some(snapshot));
}

#[tokio::test]
async fn test_turn_on_new_day_rolls_over_first() {
    let store = LedgerStore::in_memory();
    let clock = ManualClock::at_noon(day(19));
    let mut ledger = ledger_on(&store, &clock).await;

    ledger.record_turn(TokenCount::new(500), Role::User).await.unwrap();

    clock.advance(Duration::days(1));
    ledger.record_turn(TokenCount::new(40), Role::Assistant).await.unwrap();

    let monday = store.load_archive(day(19)).await.unwrap().unwrap();
    assert_eq!(monday.total_tokens, 500);
    assert_eq!(monday.queries, 1);

    let tuesday = ledger.snapshot();
    assert_eq!(tuesday.date, day(20));
    assert_eq!(tuesday.total_tokens, 40);
    assert_eq!(tuesday.queries, 0);
}

// ============================================================================
// Rollover
// ============================================================================

#[tokio::test]
async fn test_rollover_same_day_is_noop() {
    let store = LedgerStore::in_memory();
    let mut ledger = ledger_on(&store, &ManualClock::at_noon(day(18))).await;
    ledger.record_turn(TokenCount::new(10), Role::User).await.unwrap();

    assert!(!ledger.rollover().await.unwrap());
    assert_eq!(ledger.snapshot().total_tokens, 10);
    assert!(store.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rollover_twice_archives_once() {
    let store = LedgerStore::in_memory();
    let clock = ManualClock::at_noon(day(18));
    let mut ledger = ledger_on(&store, &clock).await;
    ledger.record_turn(TokenCount::new(25), Role::User).await.unwrap();

    clock.advance(Duration::days(1));
    assert!(ledger.rollover().await.unwrap());
    let first = ledger.snapshot();

    assert!(!ledger.rollover().await.unwrap());
    let second = ledger.snapshot();

    assert_eq!(first, second);
    assert_eq!(first, DailyLedger::new(day(19)));

    let history = store.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_tokens, 25);
}

#[tokio::test]
async fn test_idle_day_is_still_archived() {
    let store = LedgerStore::in_memory();
    let clock = ManualClock::at_noon(day(18));
    let mut ledger = ledger_on(&store, &clock).await;

    clock.advance(Duration::days(1));
    ledger.rollover().await.unwrap();

    assert_eq!(
        store.load_archive(day(18)).await.unwrap(),
        Some(DailyLedger::new(day(18)))
    );
}

#[tokio::test]
async fn test_reset_today_archives_and_zeroes() {
    let store = LedgerStore::in_memory();
    let mut ledger = ledger_on(&store, &ManualClock::at_noon(day(18))).await;
    ledger.record_turn(TokenCount::new(99), Role::User).await.unwrap();

    ledger.reset_today().await.unwrap();

    assert_eq!(ledger.snapshot(), DailyLedger::new(day(18)));
    assert_eq!(store.load_archive(day(18)).await.unwrap().unwrap().total_tokens, 99);
    assert_eq!(store.load_current().await.unwrap(), Some(DailyLedger::new(day(18))));
}

// ============================================================================
// Storage Failures
// ============================================================================

#[tokio::test]
async fn test_failed_save_keeps_memory_state_and_retries() {
    let (store, flaky) = flaky_store();
    let mut ledger = ledger_on(&store, &ManualClock::at_noon(day(18))).await;

    flaky.set_failing(true);
    let result = ledger.record_turn(TokenCount::new(30), Role::User).await;
    assert!(result.unwrap_err().is_transient());
    assert_eq!(ledger.snapshot().total_tokens, 30);
    assert!(ledger.is_dirty());
    assert_eq!(store.load_current().await.unwrap().unwrap().total_tokens, 0);

    flaky.set_failing(false);
    ledger.flush().await.unwrap();
    assert!(!ledger.is_dirty());
    assert_eq!(store.load_current().await.unwrap().unwrap().total_tokens, 30);
}

#[tokio::test]
async fn test_failed_archive_is_queued_until_flush() {
    let (store, flaky) = flaky_store();
    let clock = ManualClock::at_noon(day(18));
    let mut ledger = ledger_on(&store, &clock).await;
    ledger.record_turn(TokenCount::new(8), Role::User).await.unwrap();

    flaky.set_failing(true);
    clock.advance(Duration::days(1));
    assert!(ledger.rollover().await.is_err());
    assert_eq!(ledger.date(), day(19));
    assert_eq!(ledger.unarchived_count(), 1);

    // The next mutation carries the retry.
    flaky.set_failing(false);
    ledger.record_turn(TokenCount::new(2), Role::Assistant).await.unwrap();
    assert_eq!(ledger.unarchived_count(), 0);
    assert_eq!(store.load_archive(day(18)).await.unwrap().unwrap().total_tokens, 8);
    assert_eq!(store.load_current().await.unwrap().unwrap().total_tokens, 2);
}
