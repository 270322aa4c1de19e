//! Period-boundary job scheduling.
//!
//! Three jobs run once per elapsed revenue period: the monthly
//! distribution, priority-tier re-evaluation, and the infrastructure
//! payment. Each is independently triggerable over RPC and idempotent per
//! period — the `job_runs` table is the claim record, so a timer tick and
//! a manual trigger can race safely. State machine per run:
//! `idle -> running -> {succeeded, failed}`; a failed run keeps its error
//! detail and may be retried.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use cadenza_db::queries::jobs::ClaimOutcome;
use cadenza_db::queries::{audit, jobs, priority, streams, treasury};
use cadenza_treasury::distributor;
use cadenza_types::period::Period;

use crate::events::Event;
use crate::DaemonState;

/// The scheduled period-boundary jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Settle the elapsed period's revenue into fund rows and credits.
    MonthlyDistribution,
    /// Re-evaluate priority designations against thresholds.
    PriorityPromotion,
    /// Debit the platform-ops fund by the infrastructure cost.
    InfrastructurePayment,
}

impl JobKind {
    /// All jobs, in execution order.
    pub const ALL: [JobKind; 3] = [
        Self::MonthlyDistribution,
        Self::PriorityPromotion,
        Self::InfrastructurePayment,
    ];

    /// Stable storage code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonthlyDistribution => "distribution",
            Self::PriorityPromotion => "priority-promotion",
            Self::InfrastructurePayment => "infra-payment",
        }
    }
}

/// Terminal outcome of one job invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobOutcome {
    Succeeded,
    Failed,
    /// A prior run already settled this period (or is still running).
    Skipped,
}

/// What one job invocation did.
#[derive(Clone, Debug, Serialize)]
pub struct JobReport {
    pub job: &'static str,
    pub period: Period,
    pub outcome: JobOutcome,
    pub detail: serde_json::Value,
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Run one job for one period, claiming its run slot first.
pub async fn run_job(
    state: &Arc<DaemonState>,
    kind: JobKind,
    period: Period,
    now: u64,
) -> JobReport {
    let db = state.db.lock().await;

    match jobs::claim_run(&db, kind.as_str(), period, now) {
        Ok(ClaimOutcome::Claimed) => {}
        Ok(ClaimOutcome::AlreadySucceeded) | Ok(ClaimOutcome::AlreadyRunning) => {
            return JobReport {
                job: kind.as_str(),
                period,
                outcome: JobOutcome::Skipped,
                detail: serde_json::json!({"reason": "already settled or running"}),
            };
        }
        Err(err) => {
            warn!(job = kind.as_str(), error = %err, "could not claim job run");
            return JobReport {
                job: kind.as_str(),
                period,
                outcome: JobOutcome::Failed,
                detail: serde_json::json!({"error": err.to_string()}),
            };
        }
    }

    let result = match kind {
        JobKind::MonthlyDistribution => run_distribution(state, &db, period, now),
        JobKind::PriorityPromotion => run_priority_promotion(state, &db, period, now),
        JobKind::InfrastructurePayment => run_infra_payment(state, &db, period, now),
    };

    let (outcome, detail) = match result {
        Ok(detail) => {
            info!(job = kind.as_str(), period_start = period.start, "job succeeded");
            (JobOutcome::Succeeded, detail)
        }
        Err(reason) => {
            warn!(
                job = kind.as_str(),
                period_start = period.start,
                reason = reason.as_str(),
                "job failed"
            );
            (JobOutcome::Failed, serde_json::json!({"error": reason}))
        }
    };

    if let Err(err) = jobs::finish_run(
        &db,
        kind.as_str(),
        period,
        outcome == JobOutcome::Succeeded,
        &detail,
        unix_now(),
    ) {
        warn!(job = kind.as_str(), error = %err, "could not record job outcome");
    }

    state.event_bus.emit(Event {
        event_type: match outcome {
            JobOutcome::Succeeded => format!("Job{}Succeeded", event_suffix(kind)),
            _ => format!("Job{}Failed", event_suffix(kind)),
        },
        timestamp: now,
        payload: serde_json::json!({
            "job": kind.as_str(),
            "period_start": period.start,
            "period_end": period.end,
            "detail": detail,
        }),
    });

    JobReport {
        job: kind.as_str(),
        period,
        outcome,
        detail,
    }
}

fn event_suffix(kind: JobKind) -> &'static str {
    match kind {
        JobKind::MonthlyDistribution => "Distribution",
        JobKind::PriorityPromotion => "Promotion",
        JobKind::InfrastructurePayment => "InfraPayment",
    }
}

/// Settle the elapsed period's revenue.
fn run_distribution(
    state: &Arc<DaemonState>,
    db: &rusqlite::Connection,
    period: Period,
    now: u64,
) -> Result<serde_json::Value, String> {
    let reports = treasury::revenue_report_count(db, period).map_err(|e| e.to_string())?;
    if reports == 0 {
        // The billing service has not reported yet; fail so the next
        // tick retries once revenue arrives.
        return Err("no revenue reported for period".to_string());
    }
    let revenue = treasury::total_period_revenue(db, period).map_err(|e| e.to_string())?;

    let summary = state
        .distributor
        .distribute(db, revenue as u64, period, now)
        .map_err(|e| e.to_string())?;

    serde_json::to_value(&summary).map_err(|e| e.to_string())
}

/// Re-evaluate priority designations against the configured thresholds.
///
/// Creators pinned by a manual override are never touched.
fn run_priority_promotion(
    state: &Arc<DaemonState>,
    db: &rusqlite::Connection,
    period: Period,
    now: u64,
) -> Result<serde_json::Value, String> {
    let settings = &state.config.scheduler;
    let mut promoted = 0u64;
    let mut demoted = 0u64;
    let mut pinned = 0u64;

    for metrics in priority::all_metrics(db).map_err(|e| e.to_string())? {
        let period_streams = streams::creator_stats(db, &metrics.creator_id, period)
            .map_err(|e| e.to_string())?
            .map(|s| s.qualified_streams)
            .unwrap_or(0);

        let eligible = metrics.upload_count >= settings.priority_min_uploads
            && metrics.quality_score >= settings.priority_min_quality
            && period_streams >= settings.priority_min_streams;

        let existing = priority::designation(db, &metrics.creator_id).map_err(|e| e.to_string())?;
        let was_active = existing.as_ref().map(|d| d.active).unwrap_or(false);
        if eligible == was_active {
            continue;
        }
        // Only materialize a designation row when something changes.
        let changed = priority::set_auto_designation(db, &metrics.creator_id, eligible, 1, now)
            .map_err(|e| e.to_string())?;
        if !changed {
            pinned += 1;
        } else if eligible {
            promoted += 1;
        } else {
            demoted += 1;
        }
    }

    let detail = serde_json::json!({
        "promoted": promoted,
        "demoted": demoted,
        "pinned": pinned,
    });
    audit::append(db, "priority_promotion", None, None, &detail, now).map_err(|e| e.to_string())?;
    Ok(detail)
}

/// Debit the platform-ops fund by the configured infrastructure cost.
///
/// Insufficient balance skips the payment entirely and fails the run so
/// it can be retried once the fund is topped up.
fn run_infra_payment(
    state: &Arc<DaemonState>,
    db: &rusqlite::Connection,
    period: Period,
    now: u64,
) -> Result<serde_json::Value, String> {
    let cost = state.config.treasury.infra_cost_cents;
    let remaining = distributor::pay_infrastructure(db, period, cost, now)
        .map_err(|e| e.to_string())?;

    Ok(serde_json::json!({"debited_cents": cost, "remaining_cents": remaining}))
}

/// Run every due job for the most recently elapsed period.
pub async fn run_due_jobs(state: &Arc<DaemonState>) {
    let now = unix_now();
    let period = Period::previous(now);
    if period.start >= period.end {
        // Degenerate first-epoch period; nothing has elapsed yet.
        return;
    }
    for kind in JobKind::ALL {
        let report = run_job(state, kind, period, now).await;
        if report.outcome == JobOutcome::Failed {
            warn!(job = report.job, "scheduled job failed; will retry next tick");
        }
    }
}

/// The scheduler timer loop. Runs until shutdown.
pub async fn scheduler_loop(state: Arc<DaemonState>) {
    let tick = std::time::Duration::from_secs(state.config.scheduler.tick_secs.max(1));
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(tick_secs = tick.as_secs(), "scheduler loop started");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_due_jobs(&state).await;
            }
            _ = shutdown_rx.recv() => {
                info!("scheduler loop stopping");
                return;
            }
        }
    }
}
