use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rust_decimal::Decimal;

use crate::models::{BookingStatus, PaymentStatus};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("room {room_id} is already booked for the requested interval")]
    SlotConflict { room_id: i64 },

    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    #[error("booking {id} is already {status}")]
    AlreadyTerminal { id: String, status: BookingStatus },

    #[error("booking {0} has already started and can no longer be cancelled")]
    TooLateToCancel(String),

    #[error("booking {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("payment {id} cannot move from {from} to {to}")]
    InvalidPaymentTransition {
        id: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("booking {0} has already been paid for")]
    AlreadyPaid(String),

    #[error("booking {booking_id} has payment {payment_id} awaiting the gateway")]
    PaymentPending {
        booking_id: String,
        payment_id: String,
    },

    #[error("payment {0} has already been settled")]
    AlreadySettled(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::SlotConflict { .. } => StatusCode::CONFLICT,
            AppError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::AlreadyTerminal { .. } => StatusCode::CONFLICT,
            AppError::TooLateToCancel(_) => StatusCode::CONFLICT,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::InvalidPaymentTransition { .. } => StatusCode::CONFLICT,
            AppError::AlreadyPaid(_) => StatusCode::CONFLICT,
            AppError::PaymentPending { .. } => StatusCode::CONFLICT,
            AppError::AlreadySettled(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
