//! Global config snapshot and restaurant operational state
//!
//! Both are read per operation and treated as immutable snapshots, so the
//! core stays testable without a live config store and later config changes
//! never retroactively alter in-flight work.

use chrono::NaiveTime;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::BoxError;

/// Platform-wide configuration snapshot
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfigSnapshot {
    pub ordering_enabled: bool,
    pub maintenance_mode: bool,
    pub service_fee_enabled: bool,
    pub service_fee_amount: rust_decimal::Decimal,
}

impl ConfigSnapshot {
    /// The fee burned into an order created under this snapshot
    pub fn service_fee(&self) -> rust_decimal::Decimal {
        if self.service_fee_enabled {
            self.service_fee_amount
        } else {
            rust_decimal::Decimal::ZERO
        }
    }
}

pub async fn config_snapshot(conn: &mut PgConnection) -> Result<ConfigSnapshot, sqlx::Error> {
    sqlx::query_as(
        "SELECT ordering_enabled, maintenance_mode, service_fee_enabled, service_fee_amount
         FROM platform_config WHERE id = 1",
    )
    .fetch_one(conn)
    .await
}

/// Restaurant operational state joined with its university's active flag
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RestaurantState {
    pub id: Uuid,
    pub name: String,
    pub is_open: bool,
    pub is_disabled: bool,
    pub opens_at: Option<NaiveTime>,
    pub closes_at: Option<NaiveTime>,
    pub max_concurrent_orders: i32,
    pub university_active: bool,
}

pub async fn restaurant_state(
    conn: &mut PgConnection,
    restaurant_id: Uuid,
) -> Result<Option<RestaurantState>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT r.id, r.name, r.is_open, r.is_disabled, r.opens_at, r.closes_at,
               r.max_concurrent_orders, u.is_active AS university_active
        FROM restaurants r
        JOIN universities u ON u.id = r.university_id
        WHERE r.id = $1
        "#,
    )
    .bind(restaurant_id)
    .fetch_optional(conn)
    .await
}

/// Whether the student row exists and is verified
pub async fn student_verified(
    conn: &mut PgConnection,
    student_id: Uuid,
) -> Result<Option<bool>, sqlx::Error> {
    let row: Option<(bool,)> =
        sqlx::query_as("SELECT is_verified FROM users WHERE id = $1 AND role = 'STUDENT'")
            .bind(student_id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|r| r.0))
}

/// Flip a restaurant closed once its closing time has passed
///
/// Conditional update so concurrent creations race harmlessly; returns
/// whether this call performed the flip.
pub async fn mark_closed(pool: &PgPool, restaurant_id: Uuid) -> Result<bool, BoxError> {
    let result = sqlx::query("UPDATE restaurants SET is_open = FALSE WHERE id = $1 AND is_open")
        .bind(restaurant_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// All super-admin account ids, for escalation fan-out
pub async fn super_admin_ids(pool: &PgPool) -> Result<Vec<Uuid>, BoxError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE role = 'SUPER_ADMIN'")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn service_fee_respects_toggle() {
        let enabled = ConfigSnapshot {
            ordering_enabled: true,
            maintenance_mode: false,
            service_fee_enabled: true,
            service_fee_amount: Decimal::new(50, 2),
        };
        assert_eq!(enabled.service_fee(), Decimal::new(50, 2));

        let disabled = ConfigSnapshot {
            service_fee_enabled: false,
            ..enabled
        };
        assert_eq!(disabled.service_fee(), Decimal::ZERO);
    }
}
