//! Payout command handlers.

use std::sync::Arc;

use serde_json::Value;

use cadenza_db::queries::payouts::{self, PayoutRow};
use cadenza_payout::orchestrator::{self, PayoutOutcome};

use crate::commands::{db_err, payout_err};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::scheduler::unix_now;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn payout_to_json(row: &PayoutRow) -> Value {
    serde_json::json!({
        "id": row.id,
        "creator_id": row.creator_id,
        "method": row.method,
        "gross_cents": row.gross_cents,
        "tax_cents": row.tax_cents,
        "net_cents": row.net_cents,
        "status": row.status,
        "external_reference": row.external_reference,
        "failure_reason": row.failure_reason,
        "created_at": row.created_at,
        "processed_at": row.processed_at,
    })
}

/// A creator's payout history.
pub async fn get_payout_history(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = params
        .get("creator_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("creator_id required"))?;
    let limit = params.get("limit").and_then(|v| v.as_u64()).unwrap_or(50) as u32;

    let db = state.db.lock().await;
    let rows = payouts::history(&db, creator_id, limit).map_err(db_err)?;
    Ok(serde_json::json!(rows.iter().map(payout_to_json).collect::<Vec<_>>()))
}

/// Process one account's payout. Elevated.
pub async fn process_payout(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = params
        .get("creator_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("creator_id required"))?;

    let now = unix_now();
    let db = state.db.lock().await;
    let outcome = state
        .orchestrator
        .process_payout(&db, creator_id, now)
        .map_err(payout_err)?;

    let (kind, payout) = match &outcome {
        PayoutOutcome::BelowThreshold {
            balance_cents,
            min_payout_cents,
        } => {
            return Ok(serde_json::json!({
                "outcome": "below-threshold",
                "balance_cents": balance_cents,
                "min_payout_cents": min_payout_cents,
            }));
        }
        PayoutOutcome::Completed(row) => ("completed", row),
        PayoutOutcome::InvoicePending(row) => ("invoice-pending", row),
    };

    state.event_bus.emit(Event {
        event_type: match &outcome {
            PayoutOutcome::Completed(_) => "PayoutCompleted".to_string(),
            _ => "InvoiceCreated".to_string(),
        },
        timestamp: now,
        payload: serde_json::json!({
            "creator_id": creator_id,
            "net_cents": payout.net_cents,
        }),
    });

    Ok(serde_json::json!({"outcome": kind, "payout": payout_to_json(payout)}))
}

/// Process every eligible account. Elevated.
pub async fn run_payouts(state: &Arc<DaemonState>) -> Result {
    let now = unix_now();
    let db = state.db.lock().await;
    let summary = state.orchestrator.run_batch(&db, now).map_err(payout_err)?;

    state.event_bus.emit(Event {
        event_type: "PayoutBatchCompleted".to_string(),
        timestamp: now,
        payload: serde_json::to_value(summary)
            .map_err(|e| RpcError::internal_error(&e.to_string()))?,
    });

    serde_json::to_value(summary).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Confirm a pending manual invoice as paid. Elevated.
pub async fn confirm_manual_invoice(state: &Arc<DaemonState>, params: &Value) -> Result {
    let payout_id = params
        .get("payout_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("payout_id required"))?;

    let now = unix_now();
    let db = state.db.lock().await;
    let row = orchestrator::confirm_manual_invoice(&db, payout_id, now).map_err(payout_err)?;

    state.event_bus.emit(Event {
        event_type: "InvoiceConfirmed".to_string(),
        timestamp: now,
        payload: serde_json::json!({
            "creator_id": row.creator_id,
            "payout_id": payout_id,
        }),
    });

    Ok(payout_to_json(&row))
}

/// Open manual invoices (operator work queue). Elevated.
pub async fn get_pending_invoices(state: &Arc<DaemonState>) -> Result {
    let db = state.db.lock().await;
    let rows = payouts::pending_invoices(&db).map_err(db_err)?;
    Ok(serde_json::json!(rows.iter().map(payout_to_json).collect::<Vec<_>>()))
}

/// Payment-processor webhook: asynchronous payout status.
///
/// Idempotent by external reference; a disagreement with the local record
/// is logged for manual audit, never auto-corrected.
pub async fn webhook_payout_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let external_reference = params
        .get("external_reference")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("external_reference required"))?;
    let completed = params
        .get("completed")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| RpcError::invalid_params("completed required"))?;

    let now = unix_now();
    let db = state.db.lock().await;
    let outcome = orchestrator::reconcile(&db, external_reference, completed, now)
        .map_err(payout_err)?;

    serde_json::to_value(outcome).map_err(|e| RpcError::internal_error(&e.to_string()))
}
