//! Order persistence: the order aggregate and its status state machine
//!
//! Order creation runs as one SERIALIZABLE transaction spanning the business
//! checks, stock reservation, fee snapshot, and order/item insert. Status
//! transitions are single conditional updates ("set status to X where status
//! = expected"), which is the sole concurrency guard against racing
//! transition requests.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};
use shared::types::{CancelReason, OrderStatus};

use super::{BoxError, catalog, platform};
use crate::error::{ServiceError, ServiceResult};

/// Maximum accepted length for the free-text POS reference
pub const POS_REFERENCE_MAX_LEN: usize = 64;

/// Full order row as stored
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: i64,
    pub restaurant_id: Uuid,
    pub student_id: Uuid,
    pub status: String,
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub total: Decimal,
    pub payment_method: String,
    pub payment_status: String,
    pub refund_status: String,
    pub cancel_reason: Option<String>,
    pub cancel_comment: Option<String>,
    pub pos_reference: Option<String>,
    pub card_holder: String,
    pub card_last4: String,
    pub service_fee_collected: bool,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    /// Parse the stored status back into the domain enum
    pub fn order_status(&self) -> Result<OrderStatus, shared::types::UnknownVariant> {
        self.status.parse()
    }
}

/// Immutable order item row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub extras: serde_json::Value,
    pub note: Option<String>,
}

/// Validated input for order creation
#[derive(Debug)]
pub struct NewOrder {
    pub restaurant_id: Uuid,
    pub student_id: Uuid,
    pub items: Vec<NewOrderItem>,
    pub card_holder: String,
    pub card_last4: String,
}

#[derive(Debug)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub extra_ids: Vec<Uuid>,
    pub note: Option<String>,
}

/// Whether the restaurant's closing time has passed at `now`
///
/// Overnight windows (closes_at before opens_at) wrap past midnight.
fn closing_passed(opens_at: Option<NaiveTime>, closes_at: Option<NaiveTime>, now: NaiveTime) -> bool {
    let (Some(opens), Some(closes)) = (opens_at, closes_at) else {
        return false;
    };
    if opens <= closes {
        now >= closes
    } else {
        now >= closes && now < opens
    }
}

/// Line total for one item: (base price + extras) × quantity
fn line_total(price: Decimal, extras_sum: Decimal, quantity: i32) -> Decimal {
    (price + extras_sum) * Decimal::from(quantity)
}

/// Create an order inside one serializable transaction
///
/// Verifies the student, loads the config and restaurant snapshots, enforces
/// every business gate, prices each line from the live catalog, reserves
/// stock, snapshots the service fee, and persists order + items atomically.
/// A Postgres serialization failure surfaces as a retryable
/// `TransactionConflict` via `ServiceError`; it is never retried here.
pub async fn create_order(
    pool: &PgPool,
    input: NewOrder,
    now: DateTime<Utc>,
) -> ServiceResult<(OrderRow, Vec<OrderItemRow>)> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    // Student must exist and be verified
    match platform::student_verified(&mut tx, input.student_id).await? {
        None => {
            return Err(AppError::not_found("Student").into());
        }
        Some(false) => {
            return Err(AppError::new(ErrorCode::StudentNotVerified).into());
        }
        Some(true) => {}
    }

    // Global config snapshot
    let config = platform::config_snapshot(&mut tx).await?;
    if config.maintenance_mode {
        return Err(AppError::new(ErrorCode::MaintenanceMode).into());
    }
    if !config.ordering_enabled {
        return Err(AppError::new(ErrorCode::OrderingDisabled).into());
    }

    // Restaurant operational state
    let restaurant = platform::restaurant_state(&mut tx, input.restaurant_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound))?;
    if restaurant.is_disabled {
        return Err(AppError::new(ErrorCode::RestaurantDisabled).into());
    }
    if !restaurant.university_active {
        return Err(AppError::new(ErrorCode::UniversityInactive).into());
    }
    if !restaurant.is_open {
        return Err(AppError::new(ErrorCode::RestaurantClosed).into());
    }
    if closing_passed(restaurant.opens_at, restaurant.closes_at, now.time()) {
        // Flip happens outside the creation transaction so it survives the
        // refusal below.
        tx.rollback().await.ok();
        if platform::mark_closed(pool, input.restaurant_id).await? {
            tracing::info!(
                restaurant_id = %input.restaurant_id,
                "Auto-closed restaurant past closing time"
            );
        }
        return Err(AppError::new(ErrorCode::RestaurantClosed).into());
    }

    // Concurrent-order cap over orders still in the kitchen
    if restaurant.max_concurrent_orders > 0 {
        let (active,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM orders
             WHERE restaurant_id = $1 AND status IN ('RECEIVED', 'PREPARING')",
        )
        .bind(input.restaurant_id)
        .fetch_one(&mut *tx)
        .await?;
        if active >= restaurant.max_concurrent_orders as i64 {
            return Err(AppError::new(ErrorCode::RestaurantBusy).into());
        }
    }

    // Price every line from the live catalog and reserve stock
    struct PricedLine {
        product_id: Uuid,
        product_name: String,
        quantity: i32,
        unit_price: Decimal,
        extras: Vec<catalog::ExtraSnapshot>,
        note: Option<String>,
    }

    let mut subtotal = Decimal::ZERO;
    let mut lines = Vec::with_capacity(input.items.len());

    for item in &input.items {
        let product = catalog::product_for_order(&mut tx, input.restaurant_id, item.product_id)
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::ProductNotFound)
                    .with_detail("product_id", item.product_id.to_string())
            })?;
        if !product.is_active || product.is_out_of_stock {
            return Err(AppError::new(ErrorCode::ProductUnavailable)
                .with_detail("product_id", item.product_id.to_string())
                .into());
        }

        let extras = if item.extra_ids.is_empty() {
            Vec::new()
        } else {
            let found =
                catalog::extras_for_product(&mut tx, item.product_id, &item.extra_ids).await?;
            if found.len() != item.extra_ids.len() {
                return Err(AppError::new(ErrorCode::ExtraInvalid)
                    .with_detail("product_id", item.product_id.to_string())
                    .into());
            }
            found
        };

        if product.track_stock
            && !catalog::reserve_stock(&mut tx, item.product_id, item.quantity).await?
        {
            // Rollback also undoes reservations for earlier lines.
            return Err(AppError::new(ErrorCode::ProductOutOfStock)
                .with_detail("product_id", item.product_id.to_string())
                .into());
        }

        let extras_sum: Decimal = extras.iter().map(|e| e.price).sum();
        subtotal += line_total(product.price, extras_sum, item.quantity);

        lines.push(PricedLine {
            product_id: product.id,
            product_name: product.name,
            quantity: item.quantity,
            unit_price: product.price,
            extras,
            note: item.note.clone(),
        });
    }

    // Fee snapshot — later config changes never touch this order
    let service_fee = config.service_fee();
    let total = subtotal + service_fee;

    // Persist order and items
    let (order_number,): (i64,) = sqlx::query_as("SELECT nextval('order_number_seq')")
        .fetch_one(&mut *tx)
        .await?;

    let order: OrderRow = sqlx::query_as(
        r#"
        INSERT INTO orders (
            id, order_number, restaurant_id, student_id, status,
            subtotal, service_fee, total, card_holder, card_last4, created_at
        )
        VALUES ($1, $2, $3, $4, 'RECEIVED', $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(order_number)
    .bind(input.restaurant_id)
    .bind(input.student_id)
    .bind(subtotal)
    .bind(service_fee)
    .bind(total)
    .bind(&input.card_holder)
    .bind(&input.card_last4)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let mut item_rows = Vec::with_capacity(lines.len());
    for line in lines {
        let extras_json = serde_json::to_value(&line.extras)
            .map_err(|e| ServiceError::Db(e.into()))?;
        let row: OrderItemRow = sqlx::query_as(
            r#"
            INSERT INTO order_items (
                id, order_id, product_id, product_name, quantity, unit_price, extras, note
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(&extras_json)
        .bind(&line.note)
        .fetch_one(&mut *tx)
        .await?;
        item_rows.push(row);
    }

    tx.commit().await?;
    Ok((order, item_rows))
}

/// Apply a forward status transition as a conditional update
///
/// "Set status to `to` where current status = `expected`" — zero affected
/// rows means a stale transition (or an unknown/foreign id; callers probe).
/// The lifecycle timestamp matching the target status is set in the same
/// statement.
pub async fn transition_status(
    pool: &PgPool,
    order_id: Uuid,
    expected: OrderStatus,
    to: OrderStatus,
    now: DateTime<Utc>,
) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE orders SET
            status       = $3,
            ready_at     = CASE WHEN $3 = 'READY' THEN $4 ELSE ready_at END,
            delivered_at = CASE WHEN $3 = 'DELIVERED_TO_STUDENT' THEN $4 ELSE delivered_at END,
            completed_at = CASE WHEN $3 = 'COMPLETED' THEN $4 ELSE completed_at END
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(expected.as_str())
    .bind(to.as_str())
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Cancel an order as a conditional update from its expected current status
///
/// Refund status always moves to PENDING — refunds are reconciled manually
/// at the pickup counter.
pub async fn cancel_order(
    pool: &PgPool,
    order_id: Uuid,
    expected: OrderStatus,
    reason: CancelReason,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE orders SET
            status         = 'CANCELLED',
            cancel_reason  = $3,
            cancel_comment = $4,
            refund_status  = 'PENDING',
            cancelled_at   = $5
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(expected.as_str())
    .bind(reason.as_str())
    .bind(comment)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Update the free-text POS reference; an empty string clears it
pub async fn set_pos_reference(
    pool: &PgPool,
    order_id: Uuid,
    restaurant_id: Uuid,
    reference: &str,
) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE orders SET pos_reference = NULLIF($3, '')
        WHERE id = $1 AND restaurant_id = $2
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(restaurant_id)
    .bind(reference)
    .fetch_optional(pool)
    .await
}

/// Load one order by id
pub async fn find_by_id(pool: &PgPool, order_id: Uuid) -> Result<Option<OrderRow>, BoxError> {
    let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Items of one order
pub async fn items_for_order(
    pool: &PgPool,
    order_id: Uuid,
) -> Result<Vec<OrderItemRow>, BoxError> {
    let rows: Vec<OrderItemRow> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
            .bind(order_id)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}

/// A student's orders, newest first
pub async fn list_for_student(
    pool: &PgPool,
    student_id: Uuid,
    limit: i32,
    offset: i32,
) -> Result<Vec<OrderRow>, BoxError> {
    let rows: Vec<OrderRow> = sqlx::query_as(
        "SELECT * FROM orders WHERE student_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// A restaurant's orders, optionally filtered by status, newest first
pub async fn list_for_restaurant(
    pool: &PgPool,
    restaurant_id: Uuid,
    status_filter: Option<OrderStatus>,
    limit: i32,
    offset: i32,
) -> Result<Vec<OrderRow>, BoxError> {
    let rows: Vec<OrderRow> = if let Some(status) = status_filter {
        sqlx::query_as(
            r#"
            SELECT * FROM orders
            WHERE restaurant_id = $1 AND status = $2
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(restaurant_id)
        .bind(status.as_str())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as(
            r#"
            SELECT * FROM orders
            WHERE restaurant_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(restaurant_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?
    };
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn closing_passed_same_day_window() {
        let opens = Some(t(9, 0));
        let closes = Some(t(21, 0));

        assert!(!closing_passed(opens, closes, t(12, 0)));
        assert!(!closing_passed(opens, closes, t(20, 59)));
        assert!(closing_passed(opens, closes, t(21, 0)));
        assert!(closing_passed(opens, closes, t(23, 30)));
    }

    #[test]
    fn closing_passed_overnight_window() {
        // Open 18:00 → 02:00 next day
        let opens = Some(t(18, 0));
        let closes = Some(t(2, 0));

        assert!(!closing_passed(opens, closes, t(23, 0)));
        assert!(!closing_passed(opens, closes, t(1, 59)));
        assert!(closing_passed(opens, closes, t(2, 0)));
        assert!(closing_passed(opens, closes, t(9, 0)));
        assert!(!closing_passed(opens, closes, t(18, 0)));
    }

    #[test]
    fn closing_passed_without_hours_never_triggers() {
        assert!(!closing_passed(None, None, t(12, 0)));
        assert!(!closing_passed(Some(t(9, 0)), None, t(12, 0)));
    }

    #[test]
    fn line_total_includes_extras_per_unit() {
        let price = Decimal::new(850, 2); // 8.50
        let extras = Decimal::new(150, 2); // 1.50
        assert_eq!(line_total(price, extras, 3), Decimal::new(3000, 2)); // 30.00
        assert_eq!(line_total(price, Decimal::ZERO, 1), price);
    }
}
