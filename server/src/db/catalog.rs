//! Read-only catalog lookups and stock reservation
//!
//! Prices always come from the live catalog here — client-submitted prices
//! are never trusted. The stock decrement is a conditional update inside the
//! order-creation transaction: zero affected rows aborts the whole order and
//! the transaction rollback undoes decrements already applied for earlier
//! lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Product pricing row loaded for order creation
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductPricing {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub track_stock: bool,
    pub is_out_of_stock: bool,
    pub is_active: bool,
}

/// Immutable extra snapshot stored on the order item
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExtraSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub kind: String,
}

/// Load a product for pricing, scoped to the restaurant being ordered from
pub async fn product_for_order(
    conn: &mut PgConnection,
    restaurant_id: Uuid,
    product_id: Uuid,
) -> Result<Option<ProductPricing>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, name, price, track_stock, is_out_of_stock, is_active
        FROM products
        WHERE id = $1 AND restaurant_id = $2
        "#,
    )
    .bind(product_id)
    .bind(restaurant_id)
    .fetch_optional(conn)
    .await
}

/// Load the chosen extras, scoped to the product they must belong to
///
/// A missing id (wrong product, deleted extra) simply drops out of the
/// result; the caller compares counts to reject the selection.
pub async fn extras_for_product(
    conn: &mut PgConnection,
    product_id: Uuid,
    extra_ids: &[Uuid],
) -> Result<Vec<ExtraSnapshot>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, name, price, kind
        FROM product_extras
        WHERE product_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(product_id)
    .bind(extra_ids)
    .fetch_all(conn)
    .await
}

/// Conditionally reserve stock for one order line
///
/// "Subtract quantity where current stock covers it and the product is not
/// manually out of stock" — a single atomic statement, not read-then-write.
/// Returns whether the reservation took effect.
pub async fn reserve_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    quantity: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - $2
        WHERE id = $1 AND track_stock AND stock >= $2 AND NOT is_out_of_stock
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
