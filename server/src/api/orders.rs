//! Order endpoints: creation, status transitions, cancellation, POS reference
//!
//! Creation validates the payload (card included) before any business logic
//! runs, then hands off to the serializable creation transaction in
//! `db::orders`. Post-commit side effects (realtime events, notifications)
//! are best-effort and never fail the request.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::error::{AppError, ErrorCode};
use shared::types::{CancelReason, NotificationType, OrderStatus, Role};

use super::{ApiResult, ListQuery};
use crate::db::orders::{
    self, NewOrder, NewOrderItem, OrderItemRow, OrderRow, POS_REFERENCE_MAX_LEN,
};
use crate::notify;
use crate::state::AppState;

/// Order plus its immutable items
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub restaurant_id: Uuid,
    #[validate(length(min = 1, message = "order must contain at least one item"), nested)]
    pub items: Vec<CreateOrderItem>,
    #[validate(nested)]
    pub payment: PaymentDetails,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateOrderItem {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 50))]
    pub quantity: i32,
    #[serde(default)]
    pub extra_ids: Vec<Uuid>,
    #[validate(length(max = 200))]
    pub note: Option<String>,
}

/// Card details — validated fully, stored only as holder + last 4 digits
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentDetails {
    #[validate(credit_card)]
    pub card_number: String,
    #[validate(length(min = 1, max = 100))]
    pub card_holder: String,
    /// MM/YY
    pub expiry: String,
    #[validate(length(min = 3, max = 4))]
    pub cvv: String,
}

/// Parse an MM/YY expiry into (month, full year)
fn parse_expiry(s: &str) -> Option<(u32, i32)> {
    let (month, year) = s.split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    if !(1..=12).contains(&month) || !(0..100).contains(&year) {
        return None;
    }
    Some((month, 2000 + year))
}

/// A card is valid through the last day of its expiry month
fn expiry_passed(month: u32, year: i32, now: DateTime<Utc>) -> bool {
    (year, month) < (now.year(), now.month())
}

/// Digits-only last four of the card number
fn card_last4(number: &str) -> Option<String> {
    let digits: Vec<char> = number.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    Some(digits[digits.len() - 4..].iter().collect())
}

fn validate_payment(payment: &PaymentDetails, now: DateTime<Utc>) -> Result<String, AppError> {
    if !payment.cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::CardInvalid).with_detail("field", "cvv"));
    }
    let (month, year) = parse_expiry(&payment.expiry)
        .ok_or_else(|| AppError::new(ErrorCode::CardInvalid).with_detail("field", "expiry"))?;
    if expiry_passed(month, year, now) {
        return Err(AppError::new(ErrorCode::CardExpired));
    }
    card_last4(&payment.card_number)
        .ok_or_else(|| AppError::new(ErrorCode::CardInvalid).with_detail("field", "card_number"))
}

/// POST /api/orders — student places a paid order
pub async fn create_order(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Json(payload): Json<CreateOrderRequest>,
) -> ApiResult<OrderResponse> {
    identity.require_role(Role::Student)?;
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let now = Utc::now();
    let card_last4 = validate_payment(&payload.payment, now)?;

    let input = NewOrder {
        restaurant_id: payload.restaurant_id,
        student_id: identity.user_id,
        items: payload
            .items
            .into_iter()
            .map(|i| NewOrderItem {
                product_id: i.product_id,
                quantity: i.quantity,
                extra_ids: i.extra_ids,
                note: i.note,
            })
            .collect(),
        card_holder: payload.payment.card_holder,
        card_last4,
    };

    let (order, items) = orders::create_order(&state.pool, input, now).await?;

    tracing::info!(
        order_id = %order.id,
        order_number = order.order_number,
        restaurant_id = %order.restaurant_id,
        total = %order.total,
        "Order created"
    );

    // Best-effort realtime hint; the restaurant also polls.
    notify::publish_order_created(&state, &order);

    Ok(Json(OrderResponse { order, items }))
}

/// Scope an order row to the requesting identity; foreign orders read as
/// not-found rather than leaking existence
fn check_order_access(order: &OrderRow, identity: &crate::auth::Identity) -> Result<(), AppError> {
    let allowed = match identity.role {
        Role::Student => order.student_id == identity.user_id,
        Role::Restaurant => identity.restaurant_id == Some(order.restaurant_id),
        Role::SuperAdmin => true,
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::new(ErrorCode::OrderNotFound))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// POST /api/orders/{id}/status — advance the fulfillment pipeline
///
/// Applied as "set status to X where status = expected previous"; zero rows
/// is the stale-transition signal, e.g. two taps of "mark ready".
pub async fn update_status(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<OrderRow> {
    let target = payload.status;
    let Some(expected) = target.expected_previous() else {
        return Err(AppError::validation(format!(
            "{} is not a forward transition target",
            target
        ))
        .into());
    };
    if !expected.can_transition(target, identity.role) {
        return Err(AppError::with_message(
            ErrorCode::PermissionDenied,
            format!("{} may not move an order to {}", identity.role, target),
        )
        .into());
    }

    let order = orders::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    check_order_access(&order, &identity)?;

    let now = Utc::now();
    let updated = orders::transition_status(&state.pool, order_id, expected, target, now)
        .await
        .map_err(crate::error::ServiceError::from)?;

    let Some(updated) = updated else {
        // The row existed a moment ago; a zero-row CAS means someone else
        // moved it first.
        return Err(AppError::new(ErrorCode::StaleTransition)
            .with_detail("expected", expected.as_str())
            .into());
    };

    tracing::info!(
        order_id = %updated.id,
        from = expected.as_str(),
        to = target.as_str(),
        "Order status updated"
    );

    match target {
        OrderStatus::Ready => {
            notify::order_update_best_effort(
                &state,
                &updated,
                target,
                NotificationType::OrderStatusChanged,
                "Order ready for pickup",
                &format!("Order #{} is ready for pickup.", updated.order_number),
            )
            .await;
        }
        _ => notify::publish_order_status_changed(&state, &updated, target),
    }

    Ok(Json(updated))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelOrderRequest {
    pub reason: CancelReason,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

/// POST /api/orders/{id}/cancel — restaurant cancels an order
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<CancelOrderRequest>,
) -> ApiResult<OrderRow> {
    let restaurant_id = identity.require_restaurant()?;
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    if payload.reason.is_reserved() {
        return Err(AppError::new(ErrorCode::CancelReasonReserved).into());
    }
    let comment = payload.comment.as_deref().filter(|c| !c.trim().is_empty());
    if payload.reason.requires_comment() && comment.is_none() {
        return Err(AppError::new(ErrorCode::CancelCommentRequired).into());
    }

    let order = orders::find_by_id(&state.pool, order_id)
        .await?
        .filter(|o| o.restaurant_id == restaurant_id)
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    let current = order.order_status()?;
    if !payload.reason.cancellable_from(current) {
        return Err(AppError::new(ErrorCode::OrderNotCancellable)
            .with_detail("status", current.as_str())
            .into());
    }

    let now = Utc::now();
    let cancelled =
        orders::cancel_order(&state.pool, order_id, current, payload.reason, comment, now)
            .await
            .map_err(crate::error::ServiceError::from)?
            .ok_or_else(|| AppError::new(ErrorCode::StaleTransition))?;

    tracing::info!(
        order_id = %cancelled.id,
        reason = payload.reason.as_str(),
        "Order cancelled, refund pending manual reconciliation"
    );

    notify::order_update_best_effort(
        &state,
        &cancelled,
        OrderStatus::Cancelled,
        NotificationType::OrderCancelled,
        "Order cancelled",
        &format!(
            "Order #{} was cancelled by the restaurant. Your refund is pending manual processing.",
            cancelled.order_number
        ),
    )
    .await;

    Ok(Json(cancelled))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePosReferenceRequest {
    pub reference: String,
}

/// PUT /api/orders/{id}/pos-reference — restaurant attaches its own POS id;
/// an empty string clears it
pub async fn update_pos_reference(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<UpdatePosReferenceRequest>,
) -> ApiResult<OrderRow> {
    let restaurant_id = identity.require_restaurant()?;
    if payload.reference.len() > POS_REFERENCE_MAX_LEN {
        return Err(AppError::new(ErrorCode::PosReferenceTooLong)
            .with_detail("max_len", POS_REFERENCE_MAX_LEN as i64)
            .into());
    }

    let updated =
        orders::set_pos_reference(&state.pool, order_id, restaurant_id, &payload.reference)
            .await
            .map_err(crate::error::ServiceError::from)?
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    Ok(Json(updated))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = orders::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    check_order_access(&order, &identity)?;

    let items = orders::items_for_order(&state.pool, order_id).await?;
    Ok(Json(OrderResponse { order, items }))
}

/// GET /api/orders — the student's own orders
pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<OrderRow>> {
    identity.require_role(Role::Student)?;
    let (limit, offset) = query.clamped();
    let rows = orders::list_for_student(&state.pool, identity.user_id, limit, offset).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct RestaurantOrdersQuery {
    #[serde(default = "super::default_limit")]
    pub limit: i32,
    #[serde(default)]
    pub offset: i32,
    pub status: Option<OrderStatus>,
}

/// GET /api/restaurant/orders — the restaurant's queue, optionally filtered
pub async fn list_restaurant_orders(
    State(state): State<AppState>,
    Extension(identity): Extension<crate::auth::Identity>,
    Query(query): Query<RestaurantOrdersQuery>,
) -> ApiResult<Vec<OrderRow>> {
    let restaurant_id = identity.require_restaurant()?;
    let limit = query.limit.clamp(1, 100);
    let offset = query.offset.max(0);
    let rows =
        orders::list_for_restaurant(&state.pool, restaurant_id, query.status, limit, offset)
            .await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_expiry_accepts_mm_yy() {
        assert_eq!(parse_expiry("03/27"), Some((3, 2027)));
        assert_eq!(parse_expiry("12/30"), Some((12, 2030)));
        assert_eq!(parse_expiry("1/26"), Some((1, 2026)));
    }

    #[test]
    fn parse_expiry_rejects_garbage() {
        assert_eq!(parse_expiry("13/27"), None);
        assert_eq!(parse_expiry("00/27"), None);
        assert_eq!(parse_expiry("0327"), None);
        assert_eq!(parse_expiry("03/2027"), None);
        assert_eq!(parse_expiry("ab/cd"), None);
    }

    #[test]
    fn card_valid_through_end_of_expiry_month() {
        let now = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();
        assert!(!expiry_passed(8, 2026, now)); // expires this month — still valid
        assert!(!expiry_passed(9, 2026, now));
        assert!(expiry_passed(7, 2026, now));
        assert!(expiry_passed(12, 2025, now));
    }

    #[test]
    fn last4_strips_formatting() {
        assert_eq!(card_last4("4242 4242 4242 4242").as_deref(), Some("4242"));
        assert_eq!(card_last4("4000-0566-5566-5556").as_deref(), Some("5556"));
        assert_eq!(card_last4("123"), None);
    }

    #[test]
    fn payment_validation_flags_the_right_field() {
        let now = Utc.with_ymd_and_hms(2026, 8, 15, 12, 0, 0).unwrap();

        let expired = PaymentDetails {
            card_number: "4242424242424242".into(),
            card_holder: "Ada Lovelace".into(),
            expiry: "01/24".into(),
            cvv: "123".into(),
        };
        assert_eq!(
            validate_payment(&expired, now).unwrap_err().code,
            ErrorCode::CardExpired
        );

        let bad_cvv = PaymentDetails {
            card_number: "4242424242424242".into(),
            card_holder: "Ada Lovelace".into(),
            expiry: "01/28".into(),
            cvv: "12a".into(),
        };
        assert_eq!(
            validate_payment(&bad_cvv, now).unwrap_err().code,
            ErrorCode::CardInvalid
        );

        let ok = PaymentDetails {
            card_number: "4242 4242 4242 4242".into(),
            card_holder: "Ada Lovelace".into(),
            expiry: "01/28".into(),
            cvv: "123".into(),
        };
        assert_eq!(validate_payment(&ok, now).unwrap(), "4242");
    }
}
