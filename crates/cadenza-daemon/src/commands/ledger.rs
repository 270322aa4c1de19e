//! Ledger command handlers: account reads, event ingestion, webhooks.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use cadenza_db::queries::{audit, ledger, streams};
use cadenza_db::DbError;
use cadenza_royalty::fraud;
use cadenza_types::events::StreamEvent;
use cadenza_types::ledger::TransactionSource;
use cadenza_types::period::Period;

use crate::commands::db_err;
use crate::events::Event;
use crate::rpc::RpcError;
use crate::scheduler::unix_now;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn require_creator_id(params: &Value) -> std::result::Result<&str, RpcError> {
    params
        .get("creator_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("creator_id required"))
}

fn tx_to_json(tx: &ledger::TransactionRow) -> Value {
    serde_json::json!({
        "id": tx.id,
        "amount_cents": tx.amount_cents,
        "source": tx.source,
        "status": tx.status,
        "idempotency_key": tx.idempotency_key,
        "reverses_id": tx.reverses_id,
        "metadata": tx.metadata,
        "created_at": tx.created_at,
    })
}

/// Get an account's confirmed balances and recent transactions.
pub async fn get_account_summary(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = require_creator_id(params)?;
    let db = state.db.lock().await;

    let account = ledger::account(&db, creator_id).map_err(db_err)?;
    let recent = ledger::recent_transactions(&db, creator_id, 20).map_err(db_err)?;

    Ok(serde_json::json!({
        "creator_id": account.creator_id,
        "balance": account.balance,
        "total_earned": account.total_earned,
        "total_paid_out": account.total_paid_out,
        "min_payout_cents": account.min_payout_cents,
        "recent_transactions": recent.iter().map(tx_to_json).collect::<Vec<_>>(),
    }))
}

/// Get an account's transaction history.
pub async fn get_transactions(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = require_creator_id(params)?;
    let limit = params.get("limit").and_then(|v| v.as_u64()).unwrap_or(100) as u32;

    let db = state.db.lock().await;
    let txs = ledger::recent_transactions(&db, creator_id, limit).map_err(db_err)?;
    Ok(serde_json::json!(txs.iter().map(tx_to_json).collect::<Vec<_>>()))
}

/// Ingest a batch of stream events from the event pipeline.
///
/// Events are grouped by creator and period, run through the fraud
/// analyzer, and accumulated into period stream stats. Ingestion is
/// additive: batches may arrive in any order from any number of workers.
pub async fn ingest_stream_events(state: &Arc<DaemonState>, params: &Value) -> Result {
    let events: Vec<StreamEvent> = params
        .get("events")
        .cloned()
        .ok_or_else(|| RpcError::invalid_params("events required"))
        .and_then(|v| {
            serde_json::from_value(v).map_err(|e| RpcError::invalid_params(&e.to_string()))
        })?;

    let mut grouped: BTreeMap<(String, u64), Vec<StreamEvent>> = BTreeMap::new();
    for event in events {
        let period = Period::containing(event.timestamp);
        grouped
            .entry((event.creator_id.clone(), period.start))
            .or_default()
            .push(event);
    }

    let config = state.config.fraud_config();
    let db = state.db.lock().await;
    let mut batches = 0u64;
    for ((creator_id, period_start), batch) in &grouped {
        let period = Period::containing(*period_start);
        let stats = fraud::analyze(batch, &config);
        if stats.qualified_streams == 0 {
            continue;
        }
        streams::accumulate(
            &db,
            creator_id,
            period,
            stats.qualified_streams as i64,
            stats.fraud_streams as i64,
        )
        .map_err(db_err)?;
        batches += 1;
    }

    Ok(serde_json::json!({"batches_recorded": batches}))
}

/// Payment-processor webhook: a confirmed one-off tip.
///
/// The webhook event id is the idempotency key, so re-delivery cannot
/// double-credit.
pub async fn webhook_tip(state: &Arc<DaemonState>, params: &Value) -> Result {
    let event_id = params
        .get("event_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("event_id required"))?;
    let creator_id = require_creator_id(params)?;
    let amount_cents = params
        .get("amount_cents")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("amount_cents required"))?;

    let now = unix_now();
    let db = state.db.lock().await;
    let key = format!("tip:{event_id}");

    match ledger::credit(
        &db,
        creator_id,
        amount_cents,
        TransactionSource::Tip,
        &key,
        None,
        now,
    ) {
        Ok(tx_id) => {
            audit::append(
                &db,
                "tip_credited",
                Some(creator_id),
                Some(amount_cents),
                &serde_json::json!({"transaction_id": tx_id, "event_id": event_id}),
                now,
            )
            .map_err(db_err)?;
            state.event_bus.emit(Event {
                event_type: "TipCredited".to_string(),
                timestamp: now,
                payload: serde_json::json!({
                    "creator_id": creator_id,
                    "amount_cents": amount_cents,
                }),
            });
            Ok(serde_json::json!({"transaction_id": tx_id, "duplicate": false}))
        }
        // Webhook re-delivery: success-no-op
        Err(DbError::Duplicate(_)) => Ok(serde_json::json!({"duplicate": true})),
        Err(err) => Err(db_err(err)),
    }
}

/// Reverse a credited transaction (fraud reversal). Elevated.
pub async fn reverse_transaction(state: &Arc<DaemonState>, params: &Value) -> Result {
    let transaction_id = params
        .get("transaction_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("transaction_id required"))?;

    let now = unix_now();
    let db = state.db.lock().await;
    let key = format!("rev:{transaction_id}");

    match ledger::reverse(&db, transaction_id, &key, now) {
        Ok(reversal_id) => {
            audit::append(
                &db,
                "transaction_reversed",
                None,
                None,
                &serde_json::json!({
                    "transaction_id": transaction_id,
                    "reversal_id": reversal_id,
                }),
                now,
            )
            .map_err(db_err)?;
            state.event_bus.emit(Event {
                event_type: "ReversalRecorded".to_string(),
                timestamp: now,
                payload: serde_json::json!({"transaction_id": transaction_id}),
            });
            Ok(serde_json::json!({"reversal_id": reversal_id, "duplicate": false}))
        }
        Err(DbError::Duplicate(_)) => Ok(serde_json::json!({"duplicate": true})),
        Err(err) => Err(db_err(err)),
    }
}

/// Override an account's minimum payout threshold. Elevated.
pub async fn set_min_payout(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = require_creator_id(params)?;
    let min_payout_cents = params
        .get("min_payout_cents")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("min_payout_cents required"))?;

    let db = state.db.lock().await;
    ledger::set_min_payout(&db, creator_id, min_payout_cents).map_err(db_err)?;
    Ok(serde_json::json!({"updated": true}))
}
