//! Realtime event payloads pushed over the WebSocket channels
//!
//! Events are low-latency hints, not authoritative state: delivery is
//! best-effort after the triggering transaction commits, and clients
//! reconcile via a subsequent fetch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{NotificationType, OrderStatus};

/// Compact order view carried inside realtime events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEventView {
    pub order_id: Uuid,
    pub order_number: i64,
    pub restaurant_id: Uuid,
    pub student_id: Uuid,
    pub status: OrderStatus,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Notification view carried inside `notification:new` events
///
/// `recipient_id` lets clients on a shared room (restaurant staff,
/// super-admin broadcast) tell whose badge the unread count belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Event protocol pushed to connected clients
///
/// Routing is by audience room: `order:new` goes only to the restaurant,
/// `order:statusChanged` to the restaurant and the owning student,
/// `notification:new` to whichever room matches the recipient's role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum LiveEvent {
    /// A new order landed at the restaurant
    #[serde(rename = "order:new")]
    OrderNew { order: OrderEventView },

    /// An order moved through the fulfillment pipeline (or was cancelled)
    #[serde(rename = "order:statusChanged")]
    OrderStatusChanged { order: OrderEventView },

    /// A notification was persisted for the receiving audience
    ///
    /// Carries the recipient's running unread count so clients can update
    /// badges without a roundtrip.
    #[serde(rename = "notification:new")]
    NotificationNew {
        notification: NotificationView,
        unread_count: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_wire_names() {
        let view = OrderEventView {
            order_id: Uuid::nil(),
            order_number: 42,
            restaurant_id: Uuid::nil(),
            student_id: Uuid::nil(),
            status: OrderStatus::Received,
            total: Decimal::new(1250, 2),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(LiveEvent::OrderNew { order: view }).unwrap();
        assert_eq!(json["event"], "order:new");
        assert_eq!(json["data"]["order"]["order_number"], 42);
        assert_eq!(json["data"]["order"]["status"], "RECEIVED");
    }
}
