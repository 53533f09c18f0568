use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Client-side validation failures (coordinate or QR token rejected).
#[derive(Debug, Display, Clone, PartialEq)]
pub enum ValidationError {
    #[display(
        fmt = "You are {:.0}m from the office, allowed radius is {:.0}m",
        distance_m,
        allowed_m
    )]
    OutOfRange { distance_m: f64, allowed_m: f64 },
    #[display(fmt = "Unknown QR code")]
    InvalidToken,
    #[display(fmt = "QR code has expired")]
    ExpiredToken,
    #[display(fmt = "QR code has been deactivated")]
    InactiveToken,
}

/// Illegal check-in/out transitions for the employee-day record.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,
    #[display(fmt = "No active check-in found for today")]
    NotCheckedIn,
    #[display(fmt = "Attendance already completed for today")]
    AlreadyCompleted,
}

/// Leave-balance ledger failures.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum BalanceError {
    #[display(fmt = "Insufficient leave balance")]
    InsufficientBalance,
    #[display(fmt = "Leave request already processed")]
    DoubleCommit,
}

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    Validation(ValidationError),
    #[display(fmt = "{}", _0)]
    State(StateError),
    #[display(fmt = "{}", _0)]
    Balance(BalanceError),
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "Internal Server Error")]
    Database(sqlx::Error),
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e)
    }
}

impl From<StateError> for AppError {
    fn from(e: StateError) -> Self {
        AppError::State(e)
    }
}

impl From<BalanceError> for AppError {
    fn from(e: BalanceError) -> Self {
        AppError::Balance(e)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(ValidationError::OutOfRange { .. }) => "out_of_range",
            AppError::Validation(ValidationError::InvalidToken) => "invalid_token",
            AppError::Validation(ValidationError::ExpiredToken) => "expired_token",
            AppError::Validation(ValidationError::InactiveToken) => "inactive_token",
            AppError::State(StateError::AlreadyCheckedIn) => "already_checked_in",
            AppError::State(StateError::NotCheckedIn) => "not_checked_in",
            AppError::State(StateError::AlreadyCompleted) => "already_completed",
            AppError::Balance(BalanceError::InsufficientBalance) => "insufficient_balance",
            AppError::Balance(BalanceError::DoubleCommit) => "double_commit",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::Database(_) => "internal",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::State(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Balance(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Database(e) = self {
            tracing::error!(error = %e, "Storage error");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_400() {
        assert_eq!(
            AppError::from(StateError::AlreadyCheckedIn).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ValidationError::ExpiredToken).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn balance_errors_map_to_409() {
        assert_eq!(
            AppError::from(BalanceError::DoubleCommit).status_code(),
            StatusCode::CONFLICT
        );
    }
}
