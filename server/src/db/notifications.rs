//! Notification persistence
//!
//! A notification row and its recipient's unread recount happen in the same
//! unit of work, so the count pushed over the realtime channel always
//! matches what a poll would return.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::types::{NotificationType, Role};

use super::BoxError;

/// Notification row as stored
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub recipient_role: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Persist a notification and recompute the recipient's unread count
pub async fn create(
    pool: &PgPool,
    recipient_id: Uuid,
    recipient_role: Role,
    notification_type: NotificationType,
    title: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<(NotificationRow, i64), BoxError> {
    let mut tx = pool.begin().await?;

    let row: NotificationRow = sqlx::query_as(
        r#"
        INSERT INTO notifications (
            id, recipient_id, recipient_role, notification_type, title, message, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(recipient_id)
    .bind(recipient_role.as_str())
    .bind(notification_type.as_str())
    .bind(title)
    .bind(message)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let (unread,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(recipient_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((row, unread))
}

/// A recipient's notifications, newest first
pub async fn list_for_recipient(
    pool: &PgPool,
    recipient_id: Uuid,
    limit: i32,
    offset: i32,
) -> Result<Vec<NotificationRow>, BoxError> {
    let rows: Vec<NotificationRow> = sqlx::query_as(
        r#"
        SELECT * FROM notifications
        WHERE recipient_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(recipient_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Current unread count (polling fallback for the realtime badge)
pub async fn unread_count(pool: &PgPool, recipient_id: Uuid) -> Result<i64, BoxError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(recipient_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Mark one notification read; only the owning recipient may flip it
pub async fn mark_read(
    pool: &PgPool,
    notification_id: Uuid,
    recipient_id: Uuid,
) -> Result<bool, BoxError> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
    )
    .bind(notification_id)
    .bind(recipient_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}
