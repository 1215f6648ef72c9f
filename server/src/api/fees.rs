//! Service-fee endpoints: summary, outstanding view, collection
//!
//! Restaurants can inspect their own books; only super-admins run the
//! collect operation.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::types::Role;
use shared::util::month_start;

use super::ApiResult;
use crate::db::fees::{self, CollectionOutcome, FeeSummary};
use crate::state::AppState;

/// Restaurants may only read their own books
fn check_fee_access(
    identity: &crate::auth::Identity,
    restaurant_id: Uuid,
) -> Result<(), AppError> {
    match identity.role {
        Role::SuperAdmin => Ok(()),
        Role::Restaurant if identity.restaurant_id == Some(restaurant_id) => Ok(()),
        Role::Restaurant => Err(AppError::new(ErrorCode::RestaurantNotFound)),
        Role::Student => Err(AppError::with_message(
            ErrorCode::RoleRequired,
            "RESTAURANT or SUPER_ADMIN role required",
        )),
    }
}

/// GET /api/restaurants/{id}/fees/summary
pub async fn summary(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(restaurant_id): Path<Uuid>,
) -> ApiResult<FeeSummary> {
    check_fee_access(&identity, restaurant_id)?;
    let summary = fees::summary(&state.pool, restaurant_id, month_start(Utc::now())).await?;
    Ok(Json(summary))
}

#[derive(Serialize)]
pub struct OutstandingFees {
    pub outstanding: Decimal,
}

/// GET /api/restaurants/{id}/fees/outstanding
pub async fn outstanding(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(restaurant_id): Path<Uuid>,
) -> ApiResult<OutstandingFees> {
    check_fee_access(&identity, restaurant_id)?;
    let outstanding = fees::outstanding(&state.pool, restaurant_id).await?;
    Ok(Json(OutstandingFees { outstanding }))
}

/// POST /api/restaurants/{id}/fees/collect — super-admin only
///
/// Returns the exact amount moved to collected; a concurrent completion or
/// collection aborts with a retryable conflict.
pub async fn collect(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(restaurant_id): Path<Uuid>,
) -> ApiResult<CollectionOutcome> {
    identity.require_role(Role::SuperAdmin)?;
    let outcome = fees::collect(&state.pool, restaurant_id).await?;
    Ok(Json(outcome))
}
