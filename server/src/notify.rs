//! NotificationDispatcher — persist, recount, hand to fan-out
//!
//! Every function here is a post-commit side effect of some business
//! operation. Failures are logged and swallowed by the best-effort
//! wrappers; a delivery hiccup must never roll back or fail the operation
//! that triggered it, because every consumer also polls.

use chrono::Utc;
use uuid::Uuid;

use shared::events::{LiveEvent, NotificationView, OrderEventView};
use shared::types::{NotificationType, OrderStatus, Role};

use crate::db::{notifications, orders::OrderRow, platform};
use crate::error::BoxError;
use crate::live::Room;
use crate::state::AppState;

fn order_view(order: &OrderRow, status: OrderStatus) -> OrderEventView {
    OrderEventView {
        order_id: order.id,
        order_number: order.order_number,
        restaurant_id: order.restaurant_id,
        student_id: order.student_id,
        status,
        total: order.total,
        created_at: order.created_at,
    }
}

/// Persist a notification for one recipient and push `notification:new`
/// to the audience room
///
/// The unread count is recomputed in the same unit of work as the insert,
/// then carried on the event so clients can update badges without a fetch.
/// `recipient_id` on the view disambiguates shared rooms.
pub async fn notify_user(
    state: &AppState,
    recipient_id: Uuid,
    role: Role,
    room: Room,
    notification_type: NotificationType,
    title: &str,
    message: &str,
) -> Result<(), BoxError> {
    let (row, unread) = notifications::create(
        &state.pool,
        recipient_id,
        role,
        notification_type,
        title,
        message,
        Utc::now(),
    )
    .await?;

    state.hub.publish(
        room,
        LiveEvent::NotificationNew {
            notification: NotificationView {
                id: row.id,
                recipient_id: row.recipient_id,
                notification_type,
                title: row.title,
                message: row.message,
                created_at: row.created_at,
            },
            unread_count: unread,
        },
    );

    Ok(())
}

/// Notify every super-admin account (escalation fan-out)
pub async fn notify_super_admins(
    state: &AppState,
    notification_type: NotificationType,
    title: &str,
    message: &str,
) -> Result<(), BoxError> {
    let admins = platform::super_admin_ids(&state.pool).await?;
    for admin_id in admins {
        notify_user(
            state,
            admin_id,
            Role::SuperAdmin,
            Room::SuperAdmins,
            notification_type,
            title,
            message,
        )
        .await?;
    }
    Ok(())
}

/// Push `order:new` to the restaurant channel (creation side effect)
pub fn publish_order_created(state: &AppState, order: &OrderRow) {
    state.hub.publish(
        Room::Restaurant(order.restaurant_id),
        LiveEvent::OrderNew {
            order: order_view(order, OrderStatus::Received),
        },
    );
}

/// Push `order:statusChanged` to the restaurant and the owning student
pub fn publish_order_status_changed(state: &AppState, order: &OrderRow, status: OrderStatus) {
    let event = LiveEvent::OrderStatusChanged {
        order: order_view(order, status),
    };
    state
        .hub
        .publish(Room::Restaurant(order.restaurant_id), event.clone());
    state.hub.publish(Room::Student(order.student_id), event);
}

/// Best-effort student notification for an order lifecycle change
///
/// Logged and swallowed on failure — the business operation already
/// committed.
pub async fn order_update_best_effort(
    state: &AppState,
    order: &OrderRow,
    status: OrderStatus,
    notification_type: NotificationType,
    title: &str,
    message: &str,
) {
    publish_order_status_changed(state, order, status);
    if let Err(e) = notify_user(
        state,
        order.student_id,
        Role::Student,
        Room::Student(order.student_id),
        notification_type,
        title,
        message,
    )
    .await
    {
        tracing::warn!(
            order_id = %order.id,
            error = %e,
            "Failed to deliver order notification; client will reconcile by polling"
        );
    }
}
