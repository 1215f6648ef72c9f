//! Report endpoints: create, resolve, confirm, list
//!
//! Creation enforces the two anti-spam rules, then runs the three-strike
//! check synchronously — a strike incident must disable the restaurant
//! before the response goes out, not eventually.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use shared::error::{AppError, ErrorCode};
use shared::types::{NotificationType, ReportType, Role};

use super::{ApiResult, ListQuery};
use crate::db::{orders, platform, reports};
use crate::db::reports::ReportRow;
use crate::escalation;
use crate::live::Room;
use crate::notify;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub restaurant_id: Uuid,
    pub report_type: ReportType,
    pub order_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

/// Postgres SQLSTATE for unique violations — the partial unique index on
/// (student, order) backs the one-report-per-order rule against races.
const UNIQUE_VIOLATION: &str = "23505";

/// POST /api/reports — student files a report against a restaurant
pub async fn create_report(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Json(payload): Json<CreateReportRequest>,
) -> ApiResult<ReportRow> {
    identity.require_role(Role::Student)?;
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let now = Utc::now();

    let mut conn = state.pool.acquire().await.map_err(crate::error::ServiceError::from)?;
    let restaurant = platform::restaurant_state(&mut conn, payload.restaurant_id)
        .await
        .map_err(crate::error::ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound))?;
    drop(conn);

    // An order reference must be the student's own order at this restaurant
    if let Some(order_id) = payload.order_id {
        let order = orders::find_by_id(&state.pool, order_id)
            .await?
            .filter(|o| o.student_id == identity.user_id)
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
        if order.restaurant_id != payload.restaurant_id {
            return Err(AppError::validation(
                "order does not belong to the reported restaurant",
            )
            .into());
        }
        if reports::order_already_reported(&state.pool, identity.user_id, order_id).await? {
            return Err(AppError::new(ErrorCode::OrderAlreadyReported).into());
        }
    }

    // One report per restaurant per rolling window, judged by the most
    // recent prior report
    if let Some(last) =
        reports::last_report_at(&state.pool, identity.user_id, payload.restaurant_id).await?
    {
        let cooldown = Duration::hours(state.config.report_cooldown_hours);
        if now - last < cooldown {
            return Err(AppError::new(ErrorCode::ReportCooldownActive)
                .with_detail("cooldown_hours", state.config.report_cooldown_hours)
                .into());
        }
    }

    let report = match reports::insert(
        &state.pool,
        identity.user_id,
        payload.restaurant_id,
        payload.report_type,
        payload.order_id,
        payload.comment.as_deref(),
        now,
    )
    .await
    {
        Ok(report) => report,
        Err(e) => {
            // Two concurrent submissions for the same order: the unique
            // index catches what the pre-check could not see.
            let unique = e
                .downcast_ref::<sqlx::Error>()
                .and_then(|se| se.as_database_error())
                .and_then(|db| db.code())
                .is_some_and(|code| code == UNIQUE_VIOLATION);
            if unique {
                return Err(AppError::new(ErrorCode::OrderAlreadyReported).into());
            }
            return Err(crate::error::ServiceError::Db(e).into());
        }
    };

    tracing::info!(
        report_id = %report.id,
        restaurant_id = %payload.restaurant_id,
        report_type = payload.report_type.as_str(),
        "Report created"
    );

    escalation::run_strike_check(
        &state,
        payload.restaurant_id,
        &restaurant.name,
        payload.report_type,
        now,
    )
    .await?;

    Ok(Json(report))
}

/// POST /api/reports/{id}/resolve — restaurant marks a report handled
pub async fn resolve_report(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(report_id): Path<Uuid>,
) -> ApiResult<ReportRow> {
    let restaurant_id = identity.require_restaurant()?;
    let now = Utc::now();

    let resolved = reports::resolve(&state.pool, report_id, restaurant_id, now)
        .await
        .map_err(crate::error::ServiceError::from)?;

    let Some(resolved) = resolved else {
        return Err(stale_or_missing(&state, report_id, restaurant_id, Role::Restaurant).await);
    };

    // Ask the student to confirm; unconfirmed reports escalate after the
    // staleness window.
    if let Err(e) = notify::notify_user(
        &state,
        resolved.student_id,
        Role::Student,
        Room::Student(resolved.student_id),
        NotificationType::ReportResolved,
        "Report resolved",
        "The restaurant marked your report as resolved. Please confirm the issue is fixed.",
    )
    .await
    {
        tracing::warn!(report_id = %report_id, error = %e, "Failed to notify student of resolution");
    }

    Ok(Json(resolved))
}

/// POST /api/reports/{id}/confirm — student confirms the resolution
pub async fn confirm_report(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(report_id): Path<Uuid>,
) -> ApiResult<ReportRow> {
    identity.require_role(Role::Student)?;
    let now = Utc::now();

    let confirmed = reports::confirm(&state.pool, report_id, identity.user_id, now)
        .await
        .map_err(crate::error::ServiceError::from)?;

    match confirmed {
        Some(report) => Ok(Json(report)),
        None => Err(stale_or_missing(&state, report_id, identity.user_id, Role::Student).await),
    }
}

/// Distinguish a stale transition from an unknown or foreign report after a
/// zero-row conditional update
async fn stale_or_missing(
    state: &AppState,
    report_id: Uuid,
    scope_id: Uuid,
    role: Role,
) -> crate::error::ServiceError {
    match reports::find_by_id(&state.pool, report_id).await {
        Ok(Some(report)) => {
            let owned = match role {
                Role::Restaurant => report.restaurant_id == scope_id,
                Role::Student => report.student_id == scope_id,
                Role::SuperAdmin => true,
            };
            if owned {
                AppError::new(ErrorCode::StaleReportTransition)
                    .with_detail("status", report.status)
                    .into()
            } else {
                AppError::new(ErrorCode::ReportNotFound).into()
            }
        }
        Ok(None) => AppError::new(ErrorCode::ReportNotFound).into(),
        Err(e) => crate::error::ServiceError::Db(e),
    }
}

/// GET /api/reports — scoped by role: students see their own, restaurants
/// see reports against them, super-admins see everything
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<ReportRow>> {
    let (limit, offset) = query.clamped();
    let rows = match identity.role {
        Role::Student => {
            reports::list_for_student(&state.pool, identity.user_id, limit, offset).await?
        }
        Role::Restaurant => {
            let restaurant_id = identity.require_restaurant()?;
            reports::list_for_restaurant(&state.pool, restaurant_id, limit, offset).await?
        }
        Role::SuperAdmin => reports::list_all(&state.pool, limit, offset).await?,
    };
    Ok(Json(rows))
}
