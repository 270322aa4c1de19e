//! Treasury command handlers: revenue reports, fund balances, triggers.

use std::sync::Arc;

use serde_json::Value;

use cadenza_db::queries::treasury;
use cadenza_types::period::Period;

use crate::commands::db_err;
use crate::events::Event;
use crate::rpc::RpcError;
use crate::scheduler::{run_job, unix_now, JobKind};
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

pub(crate) fn require_period(params: &Value) -> std::result::Result<Period, RpcError> {
    let start = params
        .get("period_start")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("period_start required"))?;
    let end = params
        .get("period_end")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("period_end required"))?;
    Period::new(start, end).ok_or_else(|| RpcError::invalid_params("period_start must precede period_end"))
}

/// Record a period revenue total from the billing service.
pub async fn report_revenue(state: &Arc<DaemonState>, params: &Value) -> Result {
    let period = require_period(params)?;
    let source_type = params
        .get("source_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("source_type required"))?;
    let total_revenue_cents = params
        .get("total_revenue_cents")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("total_revenue_cents required"))?;

    let now = unix_now();
    let db = state.db.lock().await;
    let recorded =
        treasury::record_revenue_report(&db, period, source_type, total_revenue_cents, now)
            .map_err(db_err)?;

    if recorded {
        state.event_bus.emit(Event {
            event_type: "RevenueReported".to_string(),
            timestamp: now,
            payload: serde_json::json!({
                "period_start": period.start,
                "period_end": period.end,
                "source_type": source_type,
                "total_revenue_cents": total_revenue_cents,
            }),
        });
    }

    Ok(serde_json::json!({"recorded": recorded}))
}

/// Fund balances for a period.
pub async fn get_fund_balances(state: &Arc<DaemonState>, params: &Value) -> Result {
    let period = require_period(params)?;
    let db = state.db.lock().await;
    let balances = treasury::period_balances(&db, period).map_err(db_err)?;

    Ok(serde_json::json!(balances
        .iter()
        .map(|(fund, balance)| serde_json::json!({"fund": fund, "balance_cents": balance}))
        .collect::<Vec<_>>()))
}

/// Manually trigger the distribution job. Elevated.
///
/// Defaults to the most recently elapsed period; period-scoped
/// idempotency keys make a concurrent scheduled run safe.
pub async fn trigger_distribution(state: &Arc<DaemonState>, params: &Value) -> Result {
    let now = unix_now();
    let period = if params.get("period_start").is_some() {
        require_period(params)?
    } else {
        Period::previous(now)
    };

    let report = run_job(state, JobKind::MonthlyDistribution, period, now).await;
    serde_json::to_value(&report).map_err(|e| RpcError::internal_error(&e.to_string()))
}
