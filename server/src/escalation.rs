//! ReportEscalationEngine — 3-strike detection and the staleness sweep
//!
//! Two independent escalation paths share the notification machinery:
//!
//! - [`run_strike_check`] fires synchronously on every report creation and
//!   may disable the restaurant.
//! - [`spawn_sweep`] is a periodic task (one per process — running multiple
//!   instances would double-escalate) that escalates reports left in
//!   RESOLVED_BY_RESTAURANT past the confirmation deadline.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use shared::types::{NotificationType, ReportType};

use crate::db::reports;
use crate::error::BoxError;
use crate::notify;
use crate::state::AppState;
use crate::tasks::{BackgroundTasks, TaskKind};

/// Three-strike check after a report lands
///
/// Scans reports of the same type against the same restaurant from distinct
/// students within the trailing window. At the threshold:
/// - disables the restaurant (conditional update — at most one disable and
///   `disabled_at` stamp per incident),
/// - bulk-escalates every open matching report in the window (idempotent by
///   predicate, so late reports in the same incident still get swept up),
/// - notifies all super-admins, gated on winning the disable so the alert
///   fires exactly once per incident.
pub async fn run_strike_check(
    state: &AppState,
    restaurant_id: Uuid,
    restaurant_name: &str,
    report_type: ReportType,
    now: DateTime<Utc>,
) -> Result<(), BoxError> {
    let window_start = now - Duration::minutes(state.config.strike_window_minutes);

    let distinct_students =
        reports::strike_student_count(&state.pool, restaurant_id, report_type, window_start)
            .await?;
    if distinct_students < state.config.strike_threshold {
        return Ok(());
    }

    let disabled_now = reports::disable_restaurant(&state.pool, restaurant_id, now).await?;

    let escalated =
        reports::escalate_window(&state.pool, restaurant_id, report_type, window_start, now)
            .await?;
    if !escalated.is_empty() {
        tracing::warn!(
            restaurant_id = %restaurant_id,
            report_type = %report_type.as_str(),
            escalated = escalated.len(),
            "Strike threshold reached, reports escalated"
        );
    }

    if disabled_now {
        tracing::warn!(
            restaurant_id = %restaurant_id,
            distinct_students,
            "Restaurant auto-disabled by three-strike rule"
        );
        let title = "Restaurant auto-disabled";
        let message = format!(
            "{restaurant_name} was disabled after {distinct_students} students reported \
             \"{}\" within the last {} minutes. {} report(s) escalated.",
            report_type.as_str(),
            state.config.strike_window_minutes,
            escalated.len(),
        );
        if let Err(e) = notify::notify_super_admins(
            state,
            NotificationType::RestaurantDisabled,
            title,
            &message,
        )
        .await
        {
            tracing::warn!(error = %e, "Failed to notify super-admins of auto-disable");
        }
    }

    Ok(())
}

/// One pass of the staleness sweep
///
/// Escalates reports resolved more than `resolved_stale_hours` ago without
/// student confirmation and sends super-admins a single notification for the
/// whole batch.
pub async fn sweep_stale_reports(state: &AppState, now: DateTime<Utc>) -> Result<usize, BoxError> {
    let cutoff = now - Duration::hours(state.config.resolved_stale_hours);
    let escalated = reports::escalate_stale(&state.pool, cutoff, now).await?;

    if escalated.is_empty() {
        return Ok(0);
    }

    tracing::info!(
        count = escalated.len(),
        "Escalated stale resolved reports without student confirmation"
    );

    let title = "Stale reports escalated";
    let message = format!(
        "{} report(s) sat resolved for over {}h without student confirmation and were escalated.",
        escalated.len(),
        state.config.resolved_stale_hours,
    );
    if let Err(e) =
        notify::notify_super_admins(state, NotificationType::ReportEscalated, title, &message)
            .await
    {
        tracing::warn!(error = %e, "Failed to notify super-admins of stale escalations");
    }

    Ok(escalated.len())
}

/// Register the periodic sweep on the process's task manager
///
/// Runs for the lifetime of the process; the shutdown token stops it between
/// ticks.
pub fn spawn_sweep(tasks: &mut BackgroundTasks, state: AppState) {
    let token = tasks.shutdown_token();
    let interval = std::time::Duration::from_secs(state.config.sweep_interval_secs);

    tasks.spawn("escalation_sweep", TaskKind::Periodic, async move {
        let mut ticker = tokio::time::interval(interval);
        // The immediate first tick would race startup; skip it.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = sweep_stale_reports(&state, Utc::now()).await {
                        tracing::error!(error = %e, "Escalation sweep failed");
                    }
                }
            }
        }
    });
}
