//! Operations command handlers: job triggers, audit export, tiers,
//! priority overrides, catalog metrics.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use cadenza_db::queries::{audit, jobs, priority, profiles};
use cadenza_types::country::Country;
use cadenza_types::events::PayoutProfile;
use cadenza_types::period::Period;
use cadenza_types::tier::CreatorTier;

use crate::commands::db_err;
use crate::rpc::RpcError;
use crate::scheduler::{run_job, unix_now, JobKind};
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn require_creator_id(params: &Value) -> std::result::Result<&str, RpcError> {
    params
        .get("creator_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("creator_id required"))
}

/// Manually trigger priority re-evaluation. Elevated.
pub async fn trigger_priority_promotion(state: &Arc<DaemonState>) -> Result {
    let now = unix_now();
    let report = run_job(state, JobKind::PriorityPromotion, Period::previous(now), now).await;
    serde_json::to_value(&report).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Manually trigger the infrastructure payment. Elevated.
pub async fn trigger_infra_payment(state: &Arc<DaemonState>) -> Result {
    let now = unix_now();
    let report = run_job(state, JobKind::InfrastructurePayment, Period::previous(now), now).await;
    serde_json::to_value(&report).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Recent job runs, newest first.
pub async fn get_job_status(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = params.get("limit").and_then(|v| v.as_u64()).unwrap_or(20) as u32;
    let db = state.db.lock().await;
    let runs = jobs::recent_runs(&db, limit).map_err(db_err)?;

    Ok(serde_json::json!(runs
        .iter()
        .map(|run| serde_json::json!({
            "job": run.job,
            "period_start": run.period_start,
            "period_end": run.period_end,
            "status": run.status,
            "detail": run.detail,
            "started_at": run.started_at,
            "finished_at": run.finished_at,
        }))
        .collect::<Vec<_>>()))
}

/// Export audit entries for a time range (compliance). Elevated.
pub async fn export_audit_log(state: &Arc<DaemonState>, params: &Value) -> Result {
    let from = params
        .get("from")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("from required"))?;
    let to = params
        .get("to")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("to required"))?;

    let db = state.db.lock().await;
    let entries = audit::export_range(&db, from, to).map_err(db_err)?;

    Ok(serde_json::json!(entries
        .iter()
        .map(|entry| serde_json::json!({
            "id": entry.id,
            "category": entry.category,
            "creator_id": entry.creator_id,
            "amount_cents": entry.amount_cents,
            "detail": entry.detail,
            "created_at": entry.created_at,
        }))
        .collect::<Vec<_>>()))
}

/// Record catalog metrics for a creator (promotion evaluation input).
pub async fn report_creator_metrics(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = require_creator_id(params)?;
    let upload_count = params
        .get("upload_count")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("upload_count required"))?;
    let quality_score = params
        .get("quality_score")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| RpcError::invalid_params("quality_score required"))?;

    let db = state.db.lock().await;
    priority::upsert_metrics(&db, creator_id, upload_count, quality_score, unix_now())
        .map_err(db_err)?;
    Ok(serde_json::json!({"recorded": true}))
}

/// Store a creator's payout capabilities and country.
pub async fn upsert_payout_profile(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = require_creator_id(params)?;
    let get_str =
        |key: &str| params.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());

    let profile = PayoutProfile {
        connect_account_id: get_str("connect_account_id"),
        bank_iban: get_str("bank_iban"),
        crypto_wallet: get_str("crypto_wallet"),
        crypto_asset_type: get_str("crypto_asset_type"),
        country: params
            .get("country")
            .and_then(|v| v.as_str())
            .map(Country::from_code)
            .unwrap_or(Country::Other),
    };

    let db = state.db.lock().await;
    profiles::upsert(&db, creator_id, &profile, unix_now()).map_err(db_err)?;
    Ok(serde_json::json!({"updated": true}))
}

/// Set a creator's tier. Elevated.
pub async fn set_creator_tier(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = require_creator_id(params)?;
    let tier_code = params
        .get("tier")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("tier required"))?;
    let tier = CreatorTier::from_str(tier_code)
        .map_err(|e| RpcError::invalid_params(&e.to_string()))?;

    let db = state.db.lock().await;
    priority::set_tier(&db, creator_id, tier, unix_now()).map_err(db_err)?;
    Ok(serde_json::json!({"tier": tier.as_str(), "multiplier_bps": tier.multiplier_bps()}))
}

/// Pin a priority designation by operator override. Elevated.
pub async fn set_priority_override(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = require_creator_id(params)?;
    let active = params
        .get("active")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| RpcError::invalid_params("active required"))?;
    let priority_level = params.get("priority_level").and_then(|v| v.as_i64()).unwrap_or(1);

    let db = state.db.lock().await;
    priority::set_manual_designation(&db, creator_id, active, priority_level, unix_now())
        .map_err(db_err)?;
    Ok(serde_json::json!({"updated": true}))
}

/// Release a manual override. Elevated.
pub async fn clear_priority_override(state: &Arc<DaemonState>, params: &Value) -> Result {
    let creator_id = require_creator_id(params)?;
    let db = state.db.lock().await;
    priority::clear_manual_override(&db, creator_id, unix_now()).map_err(db_err)?;
    Ok(serde_json::json!({"cleared": true}))
}
