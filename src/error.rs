use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::handlers::shared::ApiResponse;

/// The record exists but is not in the state the operation expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    AlreadyCheckedIn,
    NoActiveCheckIn,
    AlreadyResolved,
    StageNotPending,
    AwaitingManagerApproval,
    AlreadyPaid,
    CannotDeletePaid,
    PayrollCancelled,
    DuplicatePayroll,
}

impl ConflictKind {
    pub fn code(&self) -> &'static str {
        match self {
            ConflictKind::AlreadyCheckedIn => "already_checked_in",
            ConflictKind::NoActiveCheckIn => "no_active_check_in",
            ConflictKind::AlreadyResolved => "already_resolved",
            ConflictKind::StageNotPending => "stage_not_pending",
            ConflictKind::AwaitingManagerApproval => "awaiting_manager_approval",
            ConflictKind::AlreadyPaid => "already_paid",
            ConflictKind::CannotDeletePaid => "cannot_delete_paid",
            ConflictKind::PayrollCancelled => "payroll_cancelled",
            ConflictKind::DuplicatePayroll => "duplicate_payroll",
        }
    }
}

/// A business rule refused an otherwise well-formed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    OutsideGeofence,
    InsufficientBalance,
    TooEarly,
    LocationNotConfigured,
}

impl PolicyKind {
    pub fn code(&self) -> &'static str {
        match self {
            PolicyKind::OutsideGeofence => "outside_geofence",
            PolicyKind::InsufficientBalance => "insufficient_balance",
            PolicyKind::TooEarly => "too_early",
            PolicyKind::LocationNotConfigured => "location_not_configured",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{message}")]
    Conflict { kind: ConflictKind, message: String },

    #[error("{message}")]
    Policy { kind: PolicyKind, message: String },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Internal server error{}", .0.as_ref().map_or("".to_string(), |s| format!(": {}", s)))]
    InternalServerError(Option<String>),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn conflict(kind: ConflictKind, message: impl Into<String>) -> Self {
        AppError::Conflict {
            kind,
            message: message.into(),
        }
    }

    pub fn policy(kind: PolicyKind, message: impl Into<String>) -> Self {
        AppError::Policy {
            kind,
            message: message.into(),
        }
    }

    pub fn internal_server_error_message(message: impl Into<String>) -> Self {
        AppError::InternalServerError(Some(message.into()))
    }

    pub fn internal_server_error() -> Self {
        AppError::InternalServerError(None)
    }

    /// Machine-checkable error code carried in every error response.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
            AppError::NotFound(_) => "not_found",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::Validation(_) => "validation_error",
            AppError::Conflict { kind, .. } => kind.code(),
            AppError::Policy { kind, .. } => kind.code(),
            AppError::Unsupported(_) => "unsupported",
            AppError::Unauthorized => "unauthorized",
        }
    }

    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            AppError::Conflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn policy_kind(&self) -> Option<PolicyKind> {
        match self {
            AppError::Policy { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseError(_) | AppError::InternalServerError(_)
        )
    }

    /// Message safe to hand back to the caller.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Policy { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            log::error!("Request failed with status {}: {}", status_code, self);
        } else {
            log::warn!("Request rejected with status {}: {}", status_code, self);
        }

        let response_body = ApiResponse::<()>::error_with_code(&self.public_message(), self.code());

        HttpResponse::build(status_code).json(response_body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            if db_error.is_unique_violation() {
                match db_error.constraint() {
                    Some("attendance_session_key") => {
                        return AppError::conflict(
                            ConflictKind::AlreadyCheckedIn,
                            "Already checked in for this shift today",
                        );
                    }
                    Some("payroll_period_key") => {
                        return AppError::conflict(
                            ConflictKind::DuplicatePayroll,
                            "Payroll already exists for this employee for the selected month and year",
                        );
                    }
                    _ => {}
                }
            }
        }

        log::error!("Database error: {}", error);
        AppError::DatabaseError(error)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        log::error!("Anyhow error: {}", error);

        match error.downcast::<sqlx::Error>() {
            Ok(sqlx_err) => AppError::from(sqlx_err),
            Err(original_error) => AppError::InternalServerError(Some(original_error.to_string())),
        }
    }
}
