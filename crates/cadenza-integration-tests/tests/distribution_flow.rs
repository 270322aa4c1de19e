//! Integration test: Economic correctness of period distributions.
//!
//! Exercises the distribution lifecycle:
//! 1. Accumulate period stream stats from event batches
//! 2. Split revenue into fund rows (sum property, residual placement)
//! 3. Credit creator-pool and priority-fund shares
//! 4. Verify idempotence of re-running a period
//! 5. Verify the pool-cap allocation policy under tier multipliers

use cadenza_db::queries::{ledger, priority, streams, treasury};
use cadenza_royalty::calculator;
use cadenza_royalty::fraud::{self, FraudConfig};
use cadenza_treasury::distributor::TreasuryDistributor;
use cadenza_treasury::splits::FundSplit;
use cadenza_types::events::StreamEvent;
use cadenza_types::ledger::FundKind;
use cadenza_types::period::Period;
use cadenza_types::tier::CreatorTier;

/// Base timestamp for test scenarios.
const BASE_TIME: u64 = 1_700_000_000;

fn test_period() -> Period {
    Period::containing(BASE_TIME)
}

fn event(creator: &str, duration: u32, fraud_score: f64) -> StreamEvent {
    StreamEvent {
        creator_id: creator.to_string(),
        viewer_id: "viewer".to_string(),
        duration_seconds: duration,
        fraud_score,
        timestamp: BASE_TIME,
    }
}

/// Helper: analyze an event batch and accumulate it into period stats.
fn ingest(conn: &rusqlite::Connection, creator: &str, events: &[StreamEvent]) {
    let stats = fraud::analyze(events, &FraudConfig::default());
    streams::accumulate(
        conn,
        creator,
        test_period(),
        stats.qualified_streams as i64,
        stats.fraud_streams as i64,
    )
    .expect("accumulate stats");
}

#[test]
fn fund_balances_sum_to_revenue_to_the_cent() {
    let conn = cadenza_db::open_memory().expect("open DB");
    let distributor = TreasuryDistributor::new(FundSplit::default()).expect("distributor");

    // Awkward amounts that do not divide evenly by the percentages
    for (i, revenue) in [70_001u64, 99_999, 12_345_677].iter().enumerate() {
        let period = Period::new(
            test_period().start + i as u64 * 10_000,
            test_period().end + i as u64 * 10_000,
        )
        .expect("period");
        distributor
            .distribute(&conn, *revenue, period, BASE_TIME)
            .expect("distribute");

        let balances = treasury::period_balances(&conn, period).expect("balances");
        let total: i64 = balances.iter().map(|(_, b)| b).sum();
        assert_eq!(total as u64, *revenue, "fund sum drifted for {revenue}");
    }
}

#[test]
fn full_pipeline_events_to_credits() {
    let conn = cadenza_db::open_memory().expect("open DB");
    let distributor = TreasuryDistributor::new(FundSplit::default()).expect("distributor");

    // creator-a: 80 qualified, 10 of them fraud-flagged
    let mut batch = Vec::new();
    for i in 0..80 {
        batch.push(event("creator-a", 60, if i < 10 { 0.9 } else { 0.1 }));
    }
    // 5 short plays that must not qualify
    for _ in 0..5 {
        batch.push(event("creator-a", 10, 0.0));
    }
    ingest(&conn, "creator-a", &batch);

    // creator-b: 20 clean qualified streams
    let batch_b: Vec<StreamEvent> = (0..20).map(|_| event("creator-b", 45, 0.0)).collect();
    ingest(&conn, "creator-b", &batch_b);

    let summary = distributor
        .distribute(&conn, 70_000, test_period(), BASE_TIME + 100)
        .expect("distribute");
    assert_eq!(summary.credited_count, 2);
    assert_eq!(summary.failed_count, 0);

    // Creator pool = 35_000. Equal tiers, weights 80:20.
    // a: 28_000 pre-fraud, discounted by 10/80 -> 24_500. b: 7_000.
    let a = ledger::account(&conn, "creator-a").expect("account a");
    let b = ledger::account(&conn, "creator-b").expect("account b");
    assert_eq!(a.balance, 24_500);
    assert_eq!(b.balance, 7_000);

    // The credit metadata carries the calculation breakdown
    let txs = ledger::recent_transactions(&conn, "creator-a", 1).expect("txs");
    let meta: serde_json::Value =
        serde_json::from_str(txs[0].metadata.as_deref().expect("metadata")).expect("json");
    assert_eq!(meta["fraud_stream_count"], 10);
    assert_eq!(meta["base_amount"], 28_000);
}

#[test]
fn distribute_twice_produces_no_new_transactions() {
    let conn = cadenza_db::open_memory().expect("open DB");
    let distributor = TreasuryDistributor::new(FundSplit::default()).expect("distributor");

    ingest(
        &conn,
        "creator-a",
        &(0..50).map(|_| event("creator-a", 60, 0.0)).collect::<Vec<_>>(),
    );
    priority::set_manual_designation(&conn, "creator-a", true, 1, BASE_TIME).expect("designate");

    let first = distributor
        .distribute(&conn, 100_000, test_period(), BASE_TIME)
        .expect("first");
    assert_eq!(first.credited_count, 2); // pool + priority
    let tx_count = ledger::transaction_count(&conn).expect("count");
    let balance_after_first = ledger::account(&conn, "creator-a").expect("account").balance;

    let second = distributor
        .distribute(&conn, 100_000, test_period(), BASE_TIME + 5_000)
        .expect("second");
    assert_eq!(second.credited_count, 0);
    assert_eq!(second.duplicate_count, 2);
    assert_eq!(ledger::transaction_count(&conn).expect("count"), tx_count);
    assert_eq!(
        ledger::account(&conn, "creator-a").expect("account").balance,
        balance_after_first,
    );
}

#[test]
fn reference_calculation_overshoots_but_allocation_is_capped() {
    // The raw per-creator contract: pool $700, 80/100 streams, 2.0x tier,
    // 10 fraud streams.
    let result = calculator::calculate(70_000, 80, 100, 20_000, 10).expect("calculate");
    assert_eq!(result.base_amount, 56_000);
    assert_eq!(result.final_amount, 112_000);
    assert_eq!(result.adjusted_amount, 98_000);
    // $980 against a $700 pool: the per-creator formula overshoots.
    assert!(result.adjusted_amount > 70_000);

    // The distribution path folds multipliers into weights before
    // normalizing, so the credited total stays inside the pool.
    let conn = cadenza_db::open_memory().expect("open DB");
    let distributor = TreasuryDistributor::new(FundSplit::default()).expect("distributor");

    streams::accumulate(&conn, "priority-artist", test_period(), 80, 10).expect("stats");
    streams::accumulate(&conn, "emerging-artist", test_period(), 20, 0).expect("stats");
    priority::set_tier(&conn, "priority-artist", CreatorTier::Priority, BASE_TIME).expect("tier");

    let summary = distributor
        .distribute(&conn, 70_000, test_period(), BASE_TIME)
        .expect("distribute");

    let pool = treasury::fund_balance(&conn, FundKind::CreatorPool, test_period()).expect("fund");
    assert!(
        (summary.credited_cents as i64) <= pool,
        "credited {} exceeds creator pool {pool}",
        summary.credited_cents,
    );

    // The 2.0x creator still out-earns pro rata: weight 160 vs 20
    let a = ledger::account(&conn, "priority-artist").expect("account");
    let b = ledger::account(&conn, "emerging-artist").expect("account");
    assert!(a.balance > b.balance * 4);
}

#[test]
fn priority_fund_only_reaches_active_designations() {
    let conn = cadenza_db::open_memory().expect("open DB");
    let distributor = TreasuryDistributor::new(FundSplit::default()).expect("distributor");

    streams::accumulate(&conn, "active", test_period(), 40, 0).expect("stats");
    streams::accumulate(&conn, "inactive", test_period(), 40, 0).expect("stats");
    streams::accumulate(&conn, "plain", test_period(), 20, 0).expect("stats");
    priority::set_manual_designation(&conn, "active", true, 1, BASE_TIME).expect("active");
    priority::set_manual_designation(&conn, "inactive", false, 1, BASE_TIME).expect("inactive");

    distributor
        .distribute(&conn, 100_000, test_period(), BASE_TIME)
        .expect("distribute");

    // Priority fund is 10_000 and goes entirely to the one active artist
    let active = ledger::account(&conn, "active").expect("account");
    let inactive = ledger::account(&conn, "inactive").expect("account");
    assert_eq!(active.balance - inactive.balance, 10_000);

    // Priority credits use the licensing-share source
    let txs = ledger::recent_transactions(&conn, "active", 10).expect("txs");
    assert!(txs.iter().any(|t| t.source == "licensing-share"));
    let inactive_txs = ledger::recent_transactions(&conn, "inactive", 10).expect("txs");
    assert!(inactive_txs.iter().all(|t| t.source != "licensing-share"));
}

#[test]
fn zero_revenue_period_is_valid() {
    let conn = cadenza_db::open_memory().expect("open DB");
    let distributor = TreasuryDistributor::new(FundSplit::default()).expect("distributor");
    streams::accumulate(&conn, "creator-a", test_period(), 10, 0).expect("stats");

    let summary = distributor
        .distribute(&conn, 0, test_period(), BASE_TIME)
        .expect("distribute");
    // Zero-amount credits are skipped, not errors
    assert_eq!(summary.credited_count, 0);
    assert_eq!(summary.failed_count, 0);
}
