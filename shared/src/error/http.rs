//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 400 Bad Request — malformed input, rejected before business logic
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::CancelReasonReserved
            | Self::CancelCommentRequired
            | Self::PosReferenceTooLong
            | Self::CardInvalid
            | Self::CardExpired
            | Self::ExtraInvalid => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied | Self::RoleRequired | Self::StudentNotVerified => {
                StatusCode::FORBIDDEN
            }

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::ReportNotFound
            | Self::ProductNotFound
            | Self::RestaurantNotFound
            | Self::NotificationNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict — stale transitions and retryable races
            Self::StaleTransition
            | Self::StaleReportTransition
            | Self::OrderAlreadyReported
            | Self::FeeCollectionConflict
            | Self::TransactionConflict => StatusCode::CONFLICT,

            // 422 Unprocessable — business-rule refusals
            Self::OrderNotCancellable
            | Self::ReportCooldownActive
            | Self::ProductUnavailable
            | Self::ProductOutOfStock
            | Self::RestaurantClosed
            | Self::RestaurantDisabled
            | Self::RestaurantBusy
            | Self::UniversityInactive
            | Self::OrderingDisabled
            | Self::MaintenanceMode => StatusCode::UNPROCESSABLE_ENTITY,

            // 500 Internal Server Error
            Self::Unknown | Self::InternalError | Self::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
        assert_eq!(ErrorCode::CardInvalid.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::TokenExpired.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::OrderNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::StaleTransition.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::RestaurantBusy.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
