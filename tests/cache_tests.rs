//! Fallback cache integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use procure_sync::types::{Invoice, Transaction, TransactionType};
use procure_sync::{
    ConnectOptions, FallbackCache, JsonlCache, LoopbackTransport, RealtimeClient,
    ReconcilerOptions,
};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn setup_cache_dir() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("procure_sync_cache_{}_{}", std::process::id(), id))
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_collection_survives_restart() {
    let dir = setup_cache_dir();

    {
        let transport = LoopbackTransport::new();
        let client = RealtimeClient::new(Arc::new(transport.clone()))
            .with_cache(Arc::new(JsonlCache::open(&dir).unwrap()));
        client
            .manager()
            .connect("app-key", ConnectOptions::default())
            .unwrap();
        transport.establish("1.1");

        let _transactions = client.reconciler_with::<Transaction>(
            Vec::new(),
            ReconcilerOptions::default().cache_on_change(true),
        );
        transport.deliver(
            "private-transactions",
            "transaction-created",
            json!({"id": "t1", "description": "Coffee beans", "amount": "42.50", "type": "expense"}),
        );
        transport.deliver(
            "private-transactions",
            "transaction-created",
            json!({"id": "t2", "description": "Refund", "amount": "10", "type": "income"}),
        );
        client.disconnect();
    }

    // Next start: empty server snapshot, cache fills in
    let client = RealtimeClient::new(Arc::new(LoopbackTransport::new()))
        .with_cache(Arc::new(JsonlCache::open(&dir).unwrap()));
    let transactions = client.reconciler::<Transaction>(Vec::new());

    let records = transactions.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, "t2");
    assert_eq!(records[0].transaction_type, TransactionType::Income);
    assert_eq!(records[1].amount, Decimal::new(4250, 2));

    cleanup(&dir);
}

#[test]
fn test_server_snapshot_overwrites_cache() {
    let dir = setup_cache_dir();
    let cache = Arc::new(JsonlCache::open(&dir).unwrap());
    cache
        .put("invoices", &[json!({"id": "stale", "invoiceNumber": "OLD", "amount": "1"})])
        .unwrap();

    let client = RealtimeClient::new(Arc::new(LoopbackTransport::new())).with_cache(cache.clone());
    let invoices = client.reconciler(vec![Invoice::new("i1", "INV-1", Decimal::new(100, 0))]);

    assert_eq!(invoices.len(), 1);
    let cached = cache.get("invoices").unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0]["id"], "i1");

    cleanup(&dir);
}

#[test]
fn test_reseed_writes_through() {
    let dir = setup_cache_dir();
    let cache = Arc::new(JsonlCache::open(&dir).unwrap());
    let client = RealtimeClient::new(Arc::new(LoopbackTransport::new())).with_cache(cache.clone());

    let invoices = client.reconciler(vec![Invoice::new("i1", "INV-1", Decimal::new(100, 0))]);
    invoices.reseed(vec![
        Invoice::new("i3", "INV-3", Decimal::new(300, 0)),
        Invoice::new("i2", "INV-2", Decimal::new(200, 0)),
    ]);

    let cached = cache.get("invoices").unwrap();
    assert_eq!(cached.len(), 2);
    assert_eq!(cached[0]["id"], "i3");
    assert_eq!(cache.keys().unwrap(), vec!["invoices".to_string()]);

    cleanup(&dir);
}

#[test]
fn test_empty_reseed_keeps_cached_copy() {
    let dir = setup_cache_dir();
    let cache = Arc::new(JsonlCache::open(&dir).unwrap());
    let client = RealtimeClient::new(Arc::new(LoopbackTransport::new())).with_cache(cache.clone());

    let invoices = client.reconciler(vec![
        Invoice::new("i2", "INV-2", Decimal::new(200, 0)),
        Invoice::new("i1", "INV-1", Decimal::new(100, 0)),
    ]);
    invoices.reseed(Vec::new());

    // The live collection follows the server, the offline copy survives
    assert!(invoices.is_empty());
    assert_eq!(cache.get("invoices").unwrap().len(), 2);

    invoices.teardown();
    drop(invoices);
    let restarted = client.reconciler::<Invoice>(Vec::new());
    assert_eq!(restarted.len(), 2);
    assert_eq!(restarted.records()[0].id, "i2");

    cleanup(&dir);
}
