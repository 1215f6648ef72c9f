//! Unified service-layer error type
//!
//! `ServiceError` bridges the gap between DB-layer errors (`sqlx::Error`,
//! `BoxError`) and the API-layer error (`AppError`). It enables `?`
//! propagation without manual `.map_err(|e| { tracing::error!(...); ... })`
//! boilerplate, and it is the single place where Postgres serialization
//! failures are translated into the retryable conflict code.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};
use shared::types::UnknownVariant;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Postgres SQLSTATE for "could not serialize access due to ..." under
/// SERIALIZABLE isolation.
const SERIALIZATION_FAILURE: &str = "40001";

/// Service-layer error — only two variants, keeps things simple.
///
/// - `Db`: Database/infrastructure errors (auto-logged, mapped to DatabaseError)
/// - `App`: Business-rule errors (transparent pass-through to client)
#[derive(Debug)]
pub enum ServiceError {
    /// Database or infrastructure error (sqlx, serde, etc.)
    Db(BoxError),
    /// Business-rule error (already an AppError with the correct ErrorCode)
    App(AppError),
}

/// Whether a sqlx error is a serialization conflict the caller may retry
pub fn is_serialization_conflict(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == SERIALIZATION_FAILURE)
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        if is_serialization_conflict(&e) {
            ServiceError::App(AppError::new(ErrorCode::TransactionConflict))
        } else {
            ServiceError::Db(e.into())
        }
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

// A status string the domain layer cannot parse means the row was corrupted
// outside this core; surface as an infrastructure error.
impl From<UnknownVariant> for ServiceError {
    fn from(e: UnknownVariant) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

/// Convenience type alias for service-layer results
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_errors_pass_through() {
        let err = ServiceError::App(AppError::new(ErrorCode::RestaurantBusy));
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::RestaurantBusy);
    }

    #[test]
    fn db_errors_collapse_to_database_error() {
        let err = ServiceError::Db("connection reset".into());
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::DatabaseError);
    }
}
