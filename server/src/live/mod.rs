//! FanoutHub — room-scoped realtime event distribution
//!
//! Routes committed-state events to connected WebSocket clients. Delivery is
//! best-effort: publishing never blocks and never fails the triggering
//! business operation — every consumer also has a polling fallback.
//!
//! ```text
//! Business operation (after commit)
//!       │ LiveEvent
//!       ▼
//! FanoutHub
//!   ├── rooms: Room → broadcast::Sender<LiveEvent>
//!   │     ├── Student(id)    — private per-student channel
//!   │     ├── Restaurant(id) — shared per-restaurant channel
//!   │     └── SuperAdmins    — broadcast channel
//!   │           │
//!   │           ▼
//!   └── WebSocket handler (subscribe → push)
//! ```

use dashmap::DashMap;
use shared::events::LiveEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Broadcast channel capacity — enough to absorb connection-time bursts
const BROADCAST_CAPACITY: usize = 256;

/// Audience room an event is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Private channel for one student
    Student(Uuid),
    /// Shared channel for all staff of one restaurant
    Restaurant(Uuid),
    /// Broadcast channel for every super-admin
    SuperAdmins,
}

/// Room-keyed event hub
///
/// Rooms are created lazily on first subscribe or publish and removed once
/// the last subscriber is gone, so idle restaurants cost nothing.
#[derive(Clone, Default)]
pub struct FanoutHub {
    rooms: Arc<DashMap<Room, broadcast::Sender<LiveEvent>>>,
}

impl FanoutHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to a room
    ///
    /// Fire-and-forget: an empty room drops the event (clients reconcile via
    /// polling), and a lagging subscriber loses old events, never new ones.
    pub fn publish(&self, room: Room, event: LiveEvent) {
        if let Some(tx) = self.rooms.get(&room) {
            if tx.receiver_count() == 0 {
                drop(tx);
                self.rooms.remove_if(&room, |_, tx| tx.receiver_count() == 0);
                return;
            }
            let _ = tx.send(event);
        }
    }

    /// Subscribe to a room's event stream
    pub fn subscribe(&self, room: Room) -> broadcast::Receiver<LiveEvent> {
        self.rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .subscribe()
    }

    /// Drop rooms whose last subscriber disconnected
    ///
    /// Called by the WebSocket handler on teardown.
    pub fn release(&self, room: Room) {
        self.rooms.remove_if(&room, |_, tx| tx.receiver_count() == 0);
    }

    /// Number of live rooms (diagnostics)
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shared::events::OrderEventView;
    use shared::types::OrderStatus;

    fn order_event(number: i64) -> LiveEvent {
        LiveEvent::OrderNew {
            order: OrderEventView {
                order_id: Uuid::new_v4(),
                order_number: number,
                restaurant_id: Uuid::new_v4(),
                student_id: Uuid::new_v4(),
                status: OrderStatus::Received,
                total: Decimal::new(999, 2),
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn subscribe_receives_published_events() {
        let hub = FanoutHub::new();
        let restaurant = Uuid::new_v4();
        let mut rx = hub.subscribe(Room::Restaurant(restaurant));

        hub.publish(Room::Restaurant(restaurant), order_event(7));

        match rx.recv().await.unwrap() {
            LiveEvent::OrderNew { order } => assert_eq!(order.order_number, 7),
            other => panic!("Expected OrderNew, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn room_isolation() {
        let hub = FanoutHub::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut rx_a = hub.subscribe(Room::Restaurant(a));
        let mut rx_b = hub.subscribe(Room::Restaurant(b));

        hub.publish(Room::Restaurant(a), order_event(1));

        assert!(rx_a.recv().await.is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn student_and_restaurant_rooms_are_distinct() {
        let hub = FanoutHub::new();
        let id = Uuid::new_v4();
        let mut student_rx = hub.subscribe(Room::Student(id));
        let mut restaurant_rx = hub.subscribe(Room::Restaurant(id));

        hub.publish(Room::Student(id), order_event(2));

        assert!(student_rx.recv().await.is_ok());
        assert!(restaurant_rx.try_recv().is_err());
    }

    #[test]
    fn publish_to_empty_room_is_a_noop() {
        let hub = FanoutHub::new();
        // No subscribers — must not panic or accumulate state
        hub.publish(Room::SuperAdmins, order_event(3));
        assert_eq!(hub.room_count(), 0);
    }

    #[tokio::test]
    async fn rooms_cleaned_up_after_last_subscriber() {
        let hub = FanoutHub::new();
        let room = Room::Restaurant(Uuid::new_v4());

        let rx = hub.subscribe(room);
        assert_eq!(hub.room_count(), 1);

        drop(rx);
        hub.release(room);
        assert_eq!(hub.room_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_all_room_subscribers() {
        let hub = FanoutHub::new();
        let mut rx1 = hub.subscribe(Room::SuperAdmins);
        let mut rx2 = hub.subscribe(Room::SuperAdmins);

        hub.publish(Room::SuperAdmins, order_event(4));

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
