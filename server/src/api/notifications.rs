//! Notification endpoints: list, unread count, mark read
//!
//! These are the polling fallback for the realtime `notification:new`
//! channel; read-state belongs exclusively to the recipient.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};

use super::{ApiResult, ListQuery};
use crate::db::notifications::{self, NotificationRow};
use crate::state::AppState;

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<NotificationRow>> {
    let (limit, offset) = query.clamped();
    let rows =
        notifications::list_for_recipient(&state.pool, identity.user_id, limit, offset).await?;
    Ok(Json(rows))
}

#[derive(Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
) -> ApiResult<UnreadCount> {
    let unread = notifications::unread_count(&state.pool, identity.user_id).await?;
    Ok(Json(UnreadCount { unread }))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<UnreadCount> {
    let flipped = notifications::mark_read(&state.pool, notification_id, identity.user_id).await?;
    if !flipped {
        return Err(AppError::new(ErrorCode::NotificationNotFound).into());
    }
    let unread = notifications::unread_count(&state.pool, identity.user_id).await?;
    Ok(Json(UnreadCount { unread }))
}
