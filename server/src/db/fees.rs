//! Service-fee aggregation and idempotent collection bookkeeping
//!
//! The fee itself is burned into each order at creation time (see
//! `db::orders`); this module is the read side plus the collect operation.
//! Collection selects the exact outstanding set, then performs one
//! conditional bulk update verified by affected-row count — a mismatch means
//! a completion or a prior collection raced in between, and the whole
//! collection aborts so amounts are never split or double-counted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::error::{AppError, ErrorCode};

use super::BoxError;
use crate::error::ServiceResult;

/// Per-restaurant fee aggregates, computed only over COMPLETED orders
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeeSummary {
    /// Lifetime collected + uncollected fee total
    pub lifetime_total: Decimal,
    /// Fees on orders completed in the current calendar month
    pub month_total: Decimal,
    /// Fees on card-paid orders (the platform is card-only, but the split is
    /// kept so the books stay auditable if methods are ever added)
    pub card_total: Decimal,
    /// Completed orders that contributed a fee
    pub contributing_orders: i64,
}

pub async fn summary(
    pool: &PgPool,
    restaurant_id: Uuid,
    month_start: DateTime<Utc>,
) -> Result<FeeSummary, BoxError> {
    let row: FeeSummary = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(service_fee), 0)                                           AS lifetime_total,
            COALESCE(SUM(service_fee) FILTER (WHERE completed_at >= $2), 0)         AS month_total,
            COALESCE(SUM(service_fee) FILTER (WHERE payment_method = 'CARD'), 0)    AS card_total,
            COUNT(*) FILTER (WHERE service_fee > 0)                                 AS contributing_orders
        FROM orders
        WHERE restaurant_id = $1 AND status = 'COMPLETED'
        "#,
    )
    .bind(restaurant_id)
    .bind(month_start)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Sum of uncollected fees on completed, non-refunded orders
pub async fn outstanding(pool: &PgPool, restaurant_id: Uuid) -> Result<Decimal, BoxError> {
    let (sum,): (Decimal,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(service_fee), 0)
        FROM orders
        WHERE restaurant_id = $1
            AND status = 'COMPLETED'
            AND refund_status = 'NONE'
            AND service_fee_collected = FALSE
            AND service_fee > 0
        "#,
    )
    .bind(restaurant_id)
    .fetch_one(pool)
    .await?;
    Ok(sum)
}

/// Result of a collection run
#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutcome {
    pub collected_amount: Decimal,
    pub order_count: i64,
}

/// Collect all currently-outstanding fees for a restaurant
///
/// Selects the exact outstanding order-id set, then flips `collected` on
/// precisely that set with a `collected = false` predicate. If the affected
/// row count differs from the selected set, another completion or collection
/// raced in; the transaction rolls back and the caller retries.
pub async fn collect(pool: &PgPool, restaurant_id: Uuid) -> ServiceResult<CollectionOutcome> {
    let mut tx = pool.begin().await?;

    let rows: Vec<(Uuid, Decimal)> = sqlx::query_as(
        r#"
        SELECT id, service_fee
        FROM orders
        WHERE restaurant_id = $1
            AND status = 'COMPLETED'
            AND refund_status = 'NONE'
            AND service_fee_collected = FALSE
            AND service_fee > 0
        "#,
    )
    .bind(restaurant_id)
    .fetch_all(&mut *tx)
    .await?;

    if rows.is_empty() {
        return Ok(CollectionOutcome {
            collected_amount: Decimal::ZERO,
            order_count: 0,
        });
    }

    let ids: Vec<Uuid> = rows.iter().map(|(id, _)| *id).collect();
    let amount: Decimal = rows.iter().map(|(_, fee)| *fee).sum();

    let result = sqlx::query(
        r#"
        UPDATE orders SET service_fee_collected = TRUE
        WHERE id = ANY($1) AND service_fee_collected = FALSE
        "#,
    )
    .bind(&ids)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() != ids.len() as u64 {
        tx.rollback().await?;
        return Err(AppError::new(ErrorCode::FeeCollectionConflict).into());
    }

    tx.commit().await?;

    tracing::info!(
        restaurant_id = %restaurant_id,
        amount = %amount,
        orders = ids.len(),
        "Service fees collected"
    );

    Ok(CollectionOutcome {
        collected_amount: amount,
        order_count: ids.len() as i64,
    })
}
