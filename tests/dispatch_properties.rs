//! Dispatcher invariants under concurrency and store failures.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;

use futures_util::future::join_all;
use voucher_relayer::relay::RelayError;
use voucher_relayer::store::{VoucherState, VoucherStore};

mod common;
use common::{dead, Harness, Scripted, ScriptedGateway, ADDRESSES};

#[tokio::test]
async fn test_concurrent_redemptions_consume_once() {
    let h = Harness::new(3, &["hot"], ScriptedGateway::new()).await;

    let attempts = (0..16).map(|_| {
        let dispatcher = h.dispatcher.clone();
        tokio::spawn(async move { dispatcher.relay_mint(dead(), "hot").await })
    });
    let results: Vec<_> = join_all(attempts).await.into_iter().map(|r| r.unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let invalid = results
        .iter()
        .filter(|r| matches!(r, Err(RelayError::VoucherInvalid)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(invalid, 15);
    assert_eq!(h.gateway.accepted().len(), 1);
    assert_eq!(h.state("hot").await, VoucherState::Used);
}

#[tokio::test]
async fn test_round_robin_fairness() {
    let vouchers: Vec<String> = (0..9).map(|i| format!("v{}", i)).collect();
    let refs: Vec<&str> = vouchers.iter().map(String::as_str).collect();
    let h = Harness::new(3, &refs, ScriptedGateway::new()).await;

    let mut senders = Vec::new();
    for voucher in &vouchers {
        senders.push(h.dispatcher.relay_mint(dead(), voucher).await.unwrap().sender);
    }

    let expected: Vec<_> = (0..9).map(|i| ADDRESSES[i % 3]).collect();
    assert_eq!(senders, expected);

    let mut counts: HashMap<_, usize> = HashMap::new();
    for sender in senders {
        *counts.entry(sender).or_default() += 1;
    }
    assert!(counts.values().all(|&n| n == 3));
}

#[tokio::test]
async fn test_nonces_strictly_increase_under_load() {
    let vouchers: Vec<String> = (0..24).map(|i| format!("v{}", i)).collect();
    let refs: Vec<&str> = vouchers.iter().map(String::as_str).collect();
    let h = Harness::new(2, &refs, ScriptedGateway::new()).await;

    let tasks = vouchers.iter().cloned().map(|voucher| {
        let dispatcher = h.dispatcher.clone();
        tokio::spawn(async move { dispatcher.relay_mint(dead(), &voucher).await })
    });
    for result in join_all(tasks).await {
        result.unwrap().unwrap();
    }

    for sender in &ADDRESSES[..2] {
        let nonces: Vec<u64> = h
            .gateway
            .accepted()
            .iter()
            .filter(|tx| tx.sender == *sender)
            .map(|tx| tx.nonce)
            .collect();
        let expected: Vec<u64> = (0..nonces.len() as u64).collect();
        assert_eq!(nonces, expected, "gaps or repeats for {}", sender);
    }
    assert_eq!(h.gateway.accepted().len(), 24);
}

#[tokio::test]
async fn test_failover_tries_each_identity_once() {
    let gateway = ScriptedGateway::new()
        .always(ADDRESSES[0], Scripted::Transient)
        .always(ADDRESSES[1], Scripted::Transient)
        .always(ADDRESSES[2], Scripted::Transient);
    let h = Harness::new(3, &["v1"], gateway).await;

    let err = h.dispatcher.relay_mint(dead(), "v1").await.unwrap_err();
    assert!(matches!(err, RelayError::AllRelayersExhausted));

    let submissions = h.gateway.submissions();
    assert_eq!(submissions.len(), 3);
    let distinct: HashSet<_> = submissions.iter().map(|(sender, _)| *sender).collect();
    assert_eq!(distinct.len(), 3);
}

#[tokio::test]
async fn test_failed_rollback_is_reported() {
    let gateway = ScriptedGateway::new().always(ADDRESSES[0], Scripted::Transient);
    let h = Harness::new(1, &["v1"], gateway).await;
    h.store.fail_release.store(true, Ordering::SeqCst);

    let err = h.dispatcher.relay_mint(dead(), "v1").await.unwrap_err();

    match err {
        RelayError::RollbackFailed { voucher_id, .. } => assert_eq!(voucher_id, "v1"),
        other => panic!("expected RollbackFailed, got {:?}", other),
    }
    // Still reserved: never redeemable without an operator
    assert_eq!(h.state("v1").await, VoucherState::Reserved);
    assert_eq!(h.store.in_flight().await.unwrap(), vec!["v1".to_string()]);
}

#[tokio::test]
async fn test_finalize_failure_still_reports_success() {
    let h = Harness::new(1, &["v1"], ScriptedGateway::new()).await;
    h.store.fail_finalize.store(true, Ordering::SeqCst);

    let receipt = h.dispatcher.relay_mint(dead(), "v1").await.unwrap();

    assert_eq!(receipt.tx_hash, h.gateway.accepted()[0].hash);
    assert_eq!(h.state("v1").await, VoucherState::Reserved);
    assert!(matches!(
        h.dispatcher.relay_mint(dead(), "v1").await,
        Err(RelayError::VoucherInvalid)
    ));
}

#[tokio::test]
async fn test_reserve_failure_surfaces_store_error() {
    let h = Harness::new(1, &["v1"], ScriptedGateway::new()).await;
    h.store.fail_reserve.store(true, Ordering::SeqCst);

    let err = h.dispatcher.relay_mint(dead(), "v1").await.unwrap_err();

    assert_eq!(err.kind(), "STORE_UNAVAILABLE");
    assert!(h.gateway.calls().is_empty());
}

#[tokio::test]
async fn test_success_statistics() {
    let h = Harness::new(2, &["v1", "v2"], ScriptedGateway::new()).await;
    h.dispatcher.relay_mint(dead(), "v1").await.unwrap();
    h.dispatcher.relay_mint(dead(), "v2").await.unwrap();

    let sales = h.dispatcher.sales_stats().await.unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].sales, 2);

    let recent = h.dispatcher.recent_mints(1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].voucher_id, "v2");
    assert_eq!(
        h.dispatcher.verify_voucher("v1").await.unwrap(),
        VoucherState::Used
    );
}
