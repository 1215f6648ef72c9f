//! Unified error codes for the campus ordering platform
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors (45xx: reports)
//! - 5xxx: Payment and fee errors
//! - 6xxx: Catalog errors
//! - 7xxx: Restaurant and platform errors
//! - 8xxx: Notification errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Represented as u16 values for efficient serialization and
/// cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Student account has not completed verification
    StudentNotVerified = 1008,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order status no longer matches the expected predecessor
    StaleTransition = 4002,
    /// Order cannot be cancelled from its current status with this reason
    OrderNotCancellable = 4003,
    /// Cancellation reason is reserved for internal use
    CancelReasonReserved = 4004,
    /// Cancellation with reason "other" requires a comment
    CancelCommentRequired = 4005,
    /// Point-of-sale reference exceeds the maximum length
    PosReferenceTooLong = 4006,

    // ==================== 45xx: Report ====================
    /// Report not found
    ReportNotFound = 4501,
    /// This order has already been reported by the student
    OrderAlreadyReported = 4502,
    /// Student already reported this restaurant within the cooldown window
    ReportCooldownActive = 4503,
    /// Report status no longer matches the expected predecessor
    StaleReportTransition = 4504,

    // ==================== 5xxx: Payment & Fees ====================
    /// Card details failed validation
    CardInvalid = 5001,
    /// Card expiry date has passed
    CardExpired = 5002,
    /// Fee collection raced with a concurrent completion or collection
    FeeCollectionConflict = 5101,

    // ==================== 6xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product is marked unavailable
    ProductUnavailable = 6002,
    /// Product has insufficient stock
    ProductOutOfStock = 6003,
    /// Extra does not belong to the product
    ExtraInvalid = 6004,

    // ==================== 7xxx: Restaurant & Platform ====================
    /// Restaurant not found
    RestaurantNotFound = 7001,
    /// Restaurant is closed
    RestaurantClosed = 7002,
    /// Restaurant has been disabled
    RestaurantDisabled = 7003,
    /// Restaurant is at its concurrent-order limit
    RestaurantBusy = 7004,
    /// University is inactive
    UniversityInactive = 7005,
    /// Ordering is disabled platform-wide
    OrderingDisabled = 7006,
    /// Platform is in maintenance mode
    MaintenanceMode = 7007,

    // ==================== 8xxx: Notification ====================
    /// Notification not found
    NotificationNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Transaction serialization conflict, safe to retry
    TransactionConflict = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether the caller may retry the operation as-is
    ///
    /// Only transient conflicts qualify; stale transitions signal a real
    /// race the caller should re-query before acting on.
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::TransactionConflict | ErrorCode::FeeCollectionConflict
        )
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::StudentNotVerified => "Student account is not verified",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::RoleRequired => "Specific role is required",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::StaleTransition => "Order status changed concurrently",
            ErrorCode::OrderNotCancellable => "Order cannot be cancelled in its current status",
            ErrorCode::CancelReasonReserved => "Cancellation reason is reserved",
            ErrorCode::CancelCommentRequired => "Cancellation comment is required",
            ErrorCode::PosReferenceTooLong => "POS reference is too long",

            // Report
            ErrorCode::ReportNotFound => "Report not found",
            ErrorCode::OrderAlreadyReported => "Order has already been reported",
            ErrorCode::ReportCooldownActive => "Restaurant was already reported recently",
            ErrorCode::StaleReportTransition => "Report status changed concurrently",

            // Payment & Fees
            ErrorCode::CardInvalid => "Card details are invalid",
            ErrorCode::CardExpired => "Card has expired",
            ErrorCode::FeeCollectionConflict => "Fee collection conflicted, retry",

            // Catalog
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductUnavailable => "Product is currently unavailable",
            ErrorCode::ProductOutOfStock => "Product is out of stock",
            ErrorCode::ExtraInvalid => "Extra does not belong to this product",

            // Restaurant & Platform
            ErrorCode::RestaurantNotFound => "Restaurant not found",
            ErrorCode::RestaurantClosed => "Restaurant is closed",
            ErrorCode::RestaurantDisabled => "Restaurant is disabled",
            ErrorCode::RestaurantBusy => "Restaurant cannot take more orders right now",
            ErrorCode::UniversityInactive => "University is inactive",
            ErrorCode::OrderingDisabled => "Ordering is currently disabled",
            ErrorCode::MaintenanceMode => "Platform is under maintenance",

            // Notification
            ErrorCode::NotificationNotFound => "Notification not found",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TransactionConflict => "Transaction conflict, retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),

            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1008 => Ok(ErrorCode::StudentNotVerified),

            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::StaleTransition),
            4003 => Ok(ErrorCode::OrderNotCancellable),
            4004 => Ok(ErrorCode::CancelReasonReserved),
            4005 => Ok(ErrorCode::CancelCommentRequired),
            4006 => Ok(ErrorCode::PosReferenceTooLong),

            4501 => Ok(ErrorCode::ReportNotFound),
            4502 => Ok(ErrorCode::OrderAlreadyReported),
            4503 => Ok(ErrorCode::ReportCooldownActive),
            4504 => Ok(ErrorCode::StaleReportTransition),

            5001 => Ok(ErrorCode::CardInvalid),
            5002 => Ok(ErrorCode::CardExpired),
            5101 => Ok(ErrorCode::FeeCollectionConflict),

            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductUnavailable),
            6003 => Ok(ErrorCode::ProductOutOfStock),
            6004 => Ok(ErrorCode::ExtraInvalid),

            7001 => Ok(ErrorCode::RestaurantNotFound),
            7002 => Ok(ErrorCode::RestaurantClosed),
            7003 => Ok(ErrorCode::RestaurantDisabled),
            7004 => Ok(ErrorCode::RestaurantBusy),
            7005 => Ok(ErrorCode::UniversityInactive),
            7006 => Ok(ErrorCode::OrderingDisabled),
            7007 => Ok(ErrorCode::MaintenanceMode),

            8001 => Ok(ErrorCode::NotificationNotFound),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::TransactionConflict),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::StudentNotVerified.code(), 1008);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::StaleTransition.code(), 4002);
        assert_eq!(ErrorCode::ReportCooldownActive.code(), 4503);
        assert_eq!(ErrorCode::FeeCollectionConflict.code(), 5101);
        assert_eq!(ErrorCode::ProductOutOfStock.code(), 6003);
        assert_eq!(ErrorCode::RestaurantBusy.code(), 7004);
        assert_eq!(ErrorCode::TransactionConflict.code(), 9003);
    }

    #[test]
    fn test_roundtrip() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::StaleTransition,
            ErrorCode::OrderAlreadyReported,
            ErrorCode::ProductOutOfStock,
            ErrorCode::MaintenanceMode,
            ErrorCode::TransactionConflict,
        ];

        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            let parsed: ErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(code, parsed);
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(4444), Err(InvalidErrorCode(4444)));
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::TransactionConflict.is_retryable());
        assert!(ErrorCode::FeeCollectionConflict.is_retryable());
        assert!(!ErrorCode::StaleTransition.is_retryable());
        assert!(!ErrorCode::RestaurantBusy.is_retryable());
    }

    #[test]
    fn test_serialize_as_number() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::OrderNotFound).unwrap(),
            "4001"
        );
        assert_eq!(serde_json::to_string(&ErrorCode::Success).unwrap(), "0");
    }
}
