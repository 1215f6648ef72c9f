//! Domain vocabulary: roles, order/report state machines, cancellation taxonomy
//!
//! Status values are closed enums with explicit transition tables. The
//! database stores the `as_str()` form as TEXT; the server parses back at the
//! boundary, so an illegal transition can never be expressed as plain data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Actor role carried in identity claims
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Restaurant,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Restaurant => "RESTAURANT",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUDENT" => Ok(Role::Student),
            "RESTAURANT" => Ok(Role::Restaurant),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            other => Err(UnknownVariant::new("Role", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for parsing an unknown enum variant out of the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} variant: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

// =============================================================================
// Order status
// =============================================================================

/// Order fulfillment pipeline status
///
/// `RECEIVED → PREPARING → READY → DELIVERED_TO_STUDENT → COMPLETED`, with
/// `CANCELLED` reachable from the early states. `COMPLETED` and `CANCELLED`
/// are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Received,
    Preparing,
    Ready,
    DeliveredToStudent,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::DeliveredToStudent => "DELIVERED_TO_STUDENT",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// The expected predecessor for a forward transition to `self`
    ///
    /// Drives the conditional update "set status = X where status = prev";
    /// `Received` and `Cancelled` are not forward targets.
    pub fn expected_previous(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Preparing => Some(OrderStatus::Received),
            OrderStatus::Ready => Some(OrderStatus::Preparing),
            OrderStatus::DeliveredToStudent => Some(OrderStatus::Ready),
            OrderStatus::Completed => Some(OrderStatus::DeliveredToStudent),
            OrderStatus::Received | OrderStatus::Cancelled => None,
        }
    }

    /// Transition table: may `actor` move an order from `self` to `to`?
    ///
    /// The restaurant drives the kitchen pipeline; the student alone confirms
    /// pickup completion. Cancellation goes through [`CancelReason`] rules,
    /// not this table.
    pub fn can_transition(&self, to: OrderStatus, actor: Role) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to, actor),
            (Received, Preparing, Role::Restaurant)
                | (Preparing, Ready, Role::Restaurant)
                | (Ready, DeliveredToStudent, Role::Restaurant)
                | (DeliveredToStudent, Completed, Role::Student)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(OrderStatus::Received),
            "PREPARING" => Ok(OrderStatus::Preparing),
            "READY" => Ok(OrderStatus::Ready),
            "DELIVERED_TO_STUDENT" => Ok(OrderStatus::DeliveredToStudent),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownVariant::new("OrderStatus", other)),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Cancellation reason taxonomy
///
/// `System` is reserved for internal use and rejected from the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    RestaurantClosing,
    ItemUnavailable,
    InternalIssue,
    System,
    Other,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::RestaurantClosing => "RESTAURANT_CLOSING",
            CancelReason::ItemUnavailable => "ITEM_UNAVAILABLE",
            CancelReason::InternalIssue => "INTERNAL_ISSUE",
            CancelReason::System => "SYSTEM",
            CancelReason::Other => "OTHER",
        }
    }

    /// Reserved codes may not be submitted through the API
    pub fn is_reserved(&self) -> bool {
        matches!(self, CancelReason::System)
    }

    /// Whether an order in `from` may be cancelled with this reason
    ///
    /// `READY` orders are already plated; only an internal issue justifies
    /// pulling them back.
    pub fn cancellable_from(&self, from: OrderStatus) -> bool {
        match from {
            OrderStatus::Received | OrderStatus::Preparing => true,
            OrderStatus::Ready => matches!(self, CancelReason::InternalIssue),
            _ => false,
        }
    }

    /// `OTHER` carries no information on its own; a comment is mandatory
    pub fn requires_comment(&self) -> bool {
        matches!(self, CancelReason::Other)
    }
}

impl FromStr for CancelReason {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESTAURANT_CLOSING" => Ok(CancelReason::RestaurantClosing),
            "ITEM_UNAVAILABLE" => Ok(CancelReason::ItemUnavailable),
            "INTERNAL_ISSUE" => Ok(CancelReason::InternalIssue),
            "SYSTEM" => Ok(CancelReason::System),
            "OTHER" => Ok(CancelReason::Other),
            other => Err(UnknownVariant::new("CancelReason", other)),
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Payment status (card-only platform, charged at creation)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "PAID",
        }
    }
}

/// Refund bookkeeping status
///
/// The platform has no automated refund capability; cancellation parks the
/// order at `Pending` for manual pickup-counter reconciliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    None,
    Pending,
    Refunded,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::None => "NONE",
            RefundStatus::Pending => "PENDING",
            RefundStatus::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for RefundStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(RefundStatus::None),
            "PENDING" => Ok(RefundStatus::Pending),
            "REFUNDED" => Ok(RefundStatus::Refunded),
            other => Err(UnknownVariant::new("RefundStatus", other)),
        }
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Student report type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    RestaurantClosed,
    AcceptedNotPrepared,
    Other,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::RestaurantClosed => "RESTAURANT_CLOSED",
            ReportType::AcceptedNotPrepared => "ACCEPTED_NOT_PREPARED",
            ReportType::Other => "OTHER",
        }
    }
}

impl FromStr for ReportType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESTAURANT_CLOSED" => Ok(ReportType::RestaurantClosed),
            "ACCEPTED_NOT_PREPARED" => Ok(ReportType::AcceptedNotPrepared),
            "OTHER" => Ok(ReportType::Other),
            other => Err(UnknownVariant::new("ReportType", other)),
        }
    }
}

/// Report status state machine
///
/// `PENDING → RESOLVED_BY_RESTAURANT → CONFIRMED_BY_STUDENT`; `ESCALATED`
/// is only ever set by the escalation engine and is terminal alongside
/// `CONFIRMED_BY_STUDENT`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    ResolvedByRestaurant,
    ConfirmedByStudent,
    Escalated,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "PENDING",
            ReportStatus::ResolvedByRestaurant => "RESOLVED_BY_RESTAURANT",
            ReportStatus::ConfirmedByStudent => "CONFIRMED_BY_STUDENT",
            ReportStatus::Escalated => "ESCALATED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReportStatus::ConfirmedByStudent | ReportStatus::Escalated
        )
    }

    /// Transition table for report mutations
    ///
    /// Escalation is not in this table: it is never driven by an API actor.
    pub fn can_transition(&self, to: ReportStatus, actor: Role) -> bool {
        use ReportStatus::*;
        matches!(
            (self, to, actor),
            (Pending, ResolvedByRestaurant, Role::Restaurant)
                | (ResolvedByRestaurant, ConfirmedByStudent, Role::Student)
        )
    }

    /// States the escalation engine may escalate from
    pub fn is_escalatable(&self) -> bool {
        matches!(
            self,
            ReportStatus::Pending | ReportStatus::ResolvedByRestaurant
        )
    }
}

impl FromStr for ReportStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReportStatus::Pending),
            "RESOLVED_BY_RESTAURANT" => Ok(ReportStatus::ResolvedByRestaurant),
            "CONFIRMED_BY_STUDENT" => Ok(ReportStatus::ConfirmedByStudent),
            "ESCALATED" => Ok(ReportStatus::Escalated),
            other => Err(UnknownVariant::new("ReportStatus", other)),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// Notification type for routing and client display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    OrderReceived,
    OrderStatusChanged,
    OrderCancelled,
    ReportResolved,
    ReportEscalated,
    RestaurantDisabled,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderReceived => "ORDER_RECEIVED",
            NotificationType::OrderStatusChanged => "ORDER_STATUS_CHANGED",
            NotificationType::OrderCancelled => "ORDER_CANCELLED",
            NotificationType::ReportResolved => "REPORT_RESOLVED",
            NotificationType::ReportEscalated => "REPORT_ESCALATED",
            NotificationType::RestaurantDisabled => "RESTAURANT_DISABLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_pipeline_transitions() {
        use OrderStatus::*;

        assert!(Received.can_transition(Preparing, Role::Restaurant));
        assert!(Preparing.can_transition(Ready, Role::Restaurant));
        assert!(Ready.can_transition(DeliveredToStudent, Role::Restaurant));
        assert!(DeliveredToStudent.can_transition(Completed, Role::Student));
    }

    #[test]
    fn order_transitions_are_role_gated() {
        use OrderStatus::*;

        // The student cannot drive the kitchen pipeline
        assert!(!Received.can_transition(Preparing, Role::Student));
        assert!(!Ready.can_transition(DeliveredToStudent, Role::Student));
        // The restaurant cannot confirm pickup on the student's behalf
        assert!(!DeliveredToStudent.can_transition(Completed, Role::Restaurant));
        assert!(!DeliveredToStudent.can_transition(Completed, Role::SuperAdmin));
    }

    #[test]
    fn order_no_skipping_states() {
        use OrderStatus::*;

        assert!(!Received.can_transition(Ready, Role::Restaurant));
        assert!(!Received.can_transition(Completed, Role::Student));
        assert!(!Preparing.can_transition(DeliveredToStudent, Role::Restaurant));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        use OrderStatus::*;

        for to in [Received, Preparing, Ready, DeliveredToStudent, Completed] {
            for actor in [Role::Student, Role::Restaurant, Role::SuperAdmin] {
                assert!(!Completed.can_transition(to, actor));
                assert!(!Cancelled.can_transition(to, actor));
            }
        }
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn expected_previous_matches_pipeline() {
        assert_eq!(
            OrderStatus::Preparing.expected_previous(),
            Some(OrderStatus::Received)
        );
        assert_eq!(
            OrderStatus::Completed.expected_previous(),
            Some(OrderStatus::DeliveredToStudent)
        );
        assert_eq!(OrderStatus::Received.expected_previous(), None);
        assert_eq!(OrderStatus::Cancelled.expected_previous(), None);
    }

    #[test]
    fn cancel_reason_rules() {
        assert!(CancelReason::System.is_reserved());
        assert!(!CancelReason::Other.is_reserved());
        assert!(CancelReason::Other.requires_comment());
        assert!(!CancelReason::InternalIssue.requires_comment());

        // READY only cancellable for internal issues
        assert!(CancelReason::InternalIssue.cancellable_from(OrderStatus::Ready));
        assert!(!CancelReason::Other.cancellable_from(OrderStatus::Ready));
        assert!(!CancelReason::RestaurantClosing.cancellable_from(OrderStatus::Ready));

        // Early states cancellable with any reason
        assert!(CancelReason::Other.cancellable_from(OrderStatus::Received));
        assert!(CancelReason::ItemUnavailable.cancellable_from(OrderStatus::Preparing));

        // Late/terminal states never cancellable
        assert!(!CancelReason::InternalIssue.cancellable_from(OrderStatus::DeliveredToStudent));
        assert!(!CancelReason::InternalIssue.cancellable_from(OrderStatus::Completed));
        assert!(!CancelReason::InternalIssue.cancellable_from(OrderStatus::Cancelled));
    }

    #[test]
    fn report_transitions() {
        use ReportStatus::*;

        assert!(Pending.can_transition(ResolvedByRestaurant, Role::Restaurant));
        assert!(ResolvedByRestaurant.can_transition(ConfirmedByStudent, Role::Student));

        assert!(!Pending.can_transition(ResolvedByRestaurant, Role::Student));
        assert!(!ResolvedByRestaurant.can_transition(ConfirmedByStudent, Role::Restaurant));

        // ESCALATED is never an API-driven target
        for from in [Pending, ResolvedByRestaurant, ConfirmedByStudent] {
            for actor in [Role::Student, Role::Restaurant, Role::SuperAdmin] {
                assert!(!from.can_transition(Escalated, actor));
            }
        }

        assert!(Pending.is_escalatable());
        assert!(ResolvedByRestaurant.is_escalatable());
        assert!(!ConfirmedByStudent.is_escalatable());
        assert!(!Escalated.is_escalatable());
    }

    #[test]
    fn status_str_roundtrip() {
        for status in [
            OrderStatus::Received,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::DeliveredToStudent,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        for status in [
            ReportStatus::Pending,
            ReportStatus::ResolvedByRestaurant,
            ReportStatus::ConfirmedByStudent,
            ReportStatus::Escalated,
        ] {
            assert_eq!(status.as_str().parse::<ReportStatus>().unwrap(), status);
        }
        assert!("PLATED".parse::<OrderStatus>().is_err());
    }
}
