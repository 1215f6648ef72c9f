//! Report persistence: anti-spam lookups, state transitions, escalation scans
//!
//! Report transitions use the same conditional-update guard as orders.
//! Escalation writes (`ESCALATED`) never come from the API layer — only the
//! escalation engine calls them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::types::ReportType;

use super::BoxError;

/// Full report row as stored
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub report_type: String,
    pub status: String,
    pub student_id: Uuid,
    pub restaurant_id: Uuid,
    pub order_id: Option<Uuid>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Whether the student already reported this order
pub async fn order_already_reported(
    pool: &PgPool,
    student_id: Uuid,
    order_id: Uuid,
) -> Result<bool, BoxError> {
    let (exists,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM reports WHERE student_id = $1 AND order_id = $2)",
    )
    .bind(student_id)
    .bind(order_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

/// When the student last reported this restaurant (drives the rolling
/// 24-hour cooldown, evaluated against the most recent report)
pub async fn last_report_at(
    pool: &PgPool,
    student_id: Uuid,
    restaurant_id: Uuid,
) -> Result<Option<DateTime<Utc>>, BoxError> {
    let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
        r#"
        SELECT created_at FROM reports
        WHERE student_id = $1 AND restaurant_id = $2
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(student_id)
    .bind(restaurant_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

pub async fn insert(
    pool: &PgPool,
    student_id: Uuid,
    restaurant_id: Uuid,
    report_type: ReportType,
    order_id: Option<Uuid>,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ReportRow, BoxError> {
    let row: ReportRow = sqlx::query_as(
        r#"
        INSERT INTO reports (
            id, report_type, status, student_id, restaurant_id, order_id,
            comment, created_at, updated_at
        )
        VALUES ($1, $2, 'PENDING', $3, $4, $5, $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(report_type.as_str())
    .bind(student_id)
    .bind(restaurant_id)
    .bind(order_id)
    .bind(comment)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &PgPool, report_id: Uuid) -> Result<Option<ReportRow>, BoxError> {
    let row: Option<ReportRow> = sqlx::query_as("SELECT * FROM reports WHERE id = $1")
        .bind(report_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Conditional report transition, scoped to the acting restaurant
pub async fn resolve(
    pool: &PgPool,
    report_id: Uuid,
    restaurant_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<ReportRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE reports SET status = 'RESOLVED_BY_RESTAURANT', updated_at = $3
        WHERE id = $1 AND restaurant_id = $2 AND status = 'PENDING'
        RETURNING *
        "#,
    )
    .bind(report_id)
    .bind(restaurant_id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Conditional report confirmation, scoped to the filing student
pub async fn confirm(
    pool: &PgPool,
    report_id: Uuid,
    student_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<ReportRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE reports SET status = 'CONFIRMED_BY_STUDENT', updated_at = $3
        WHERE id = $1 AND student_id = $2 AND status = 'RESOLVED_BY_RESTAURANT'
        RETURNING *
        "#,
    )
    .bind(report_id)
    .bind(student_id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Distinct students who filed reports of this type against the restaurant
/// within the trailing strike window
pub async fn strike_student_count(
    pool: &PgPool,
    restaurant_id: Uuid,
    report_type: ReportType,
    window_start: DateTime<Utc>,
) -> Result<i64, BoxError> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT student_id) FROM reports
        WHERE restaurant_id = $1 AND report_type = $2 AND created_at >= $3
        "#,
    )
    .bind(restaurant_id)
    .bind(report_type.as_str())
    .bind(window_start)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Bulk-escalate every matching open report in the strike window
///
/// Only PENDING and RESOLVED_BY_RESTAURANT rows qualify; the predicate makes
/// repeated calls idempotent.
pub async fn escalate_window(
    pool: &PgPool,
    restaurant_id: Uuid,
    report_type: ReportType,
    window_start: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<Uuid>, BoxError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        UPDATE reports SET status = 'ESCALATED', updated_at = $4
        WHERE restaurant_id = $1
            AND report_type = $2
            AND created_at >= $3
            AND status IN ('PENDING', 'RESOLVED_BY_RESTAURANT')
        RETURNING id
        "#,
    )
    .bind(restaurant_id)
    .bind(report_type.as_str())
    .bind(window_start)
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Report escalated by the staleness sweep
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StaleEscalation {
    pub id: Uuid,
    pub restaurant_id: Uuid,
}

/// Escalate reports that sat in RESOLVED_BY_RESTAURANT past the cutoff
/// without student confirmation
pub async fn escalate_stale(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<StaleEscalation>, BoxError> {
    let rows: Vec<StaleEscalation> = sqlx::query_as(
        r#"
        UPDATE reports SET status = 'ESCALATED', updated_at = $2
        WHERE status = 'RESOLVED_BY_RESTAURANT' AND updated_at <= $1
        RETURNING id, restaurant_id
        "#,
    )
    .bind(cutoff)
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Idempotently disable a restaurant after a strike incident
///
/// Guarded by `is_disabled = FALSE`, so at most one call per incident wins
/// and stamps `disabled_at`; only explicit restaurant action clears the flag.
pub async fn disable_restaurant(
    pool: &PgPool,
    restaurant_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool, BoxError> {
    let result = sqlx::query(
        r#"
        UPDATE restaurants
        SET is_disabled = TRUE, is_open = FALSE, disabled_at = $2
        WHERE id = $1 AND is_disabled = FALSE
        "#,
    )
    .bind(restaurant_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Reports visible to a student (their own), newest first
pub async fn list_for_student(
    pool: &PgPool,
    student_id: Uuid,
    limit: i32,
    offset: i32,
) -> Result<Vec<ReportRow>, BoxError> {
    let rows: Vec<ReportRow> = sqlx::query_as(
        "SELECT * FROM reports WHERE student_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Reports filed against a restaurant, newest first
pub async fn list_for_restaurant(
    pool: &PgPool,
    restaurant_id: Uuid,
    limit: i32,
    offset: i32,
) -> Result<Vec<ReportRow>, BoxError> {
    let rows: Vec<ReportRow> = sqlx::query_as(
        "SELECT * FROM reports WHERE restaurant_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(restaurant_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All reports, newest first (super-admin view)
pub async fn list_all(
    pool: &PgPool,
    limit: i32,
    offset: i32,
) -> Result<Vec<ReportRow>, BoxError> {
    let rows: Vec<ReportRow> =
        sqlx::query_as("SELECT * FROM reports ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;
    Ok(rows)
}
