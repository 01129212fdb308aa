use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::services::TicketingError;
use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Ticket type {ticket_type_id} is out of stock")]
    OutOfStock { ticket_type_id: Uuid },

    #[error("Ticket belongs to a different event")]
    EventMismatch,

    #[error("Attendee already checked in")]
    AlreadyCheckedIn { checked_in_at: Option<DateTime<Utc>> },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Persistence error")]
    PersistenceError(StoreError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::OutOfStock { .. } => StatusCode::CONFLICT,
            AppError::EventMismatch => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AlreadyCheckedIn { .. } => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PersistenceError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::OutOfStock { .. } => "OUT_OF_STOCK",
            AppError::EventMismatch => "EVENT_MISMATCH",
            AppError::AlreadyCheckedIn { .. } => "ALREADY_CHECKED_IN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::PersistenceError(_) => "PERSISTENCE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Structured context a client can act on.
    fn details(&self) -> Option<Value> {
        match self {
            AppError::OutOfStock { ticket_type_id } => Some(json!({ "ticket_type_id": ticket_type_id })),
            AppError::AlreadyCheckedIn { checked_in_at } => Some(json!({ "checked_in_at": checked_in_at })),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            AppError::PersistenceError(e) => error!(error = ?e, "Persistence error"),
            AppError::InternalServerError(msg) => error!(message = %msg, "Internal error"),
            AppError::AuthError(_) | AppError::Forbidden(_) => warn!(error = %self, "Access denied"),
            // Business outcomes, not faults.
            _ => tracing::debug!(error = %self, "Request rejected"),
        }
    }
}

impl From<TicketingError> for AppError {
    fn from(err: TicketingError) -> Self {
        match err {
            TicketingError::Validation(msg) => AppError::ValidationError(msg),
            TicketingError::OutOfStock { ticket_type_id } => AppError::OutOfStock { ticket_type_id },
            TicketingError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            TicketingError::EventMismatch => AppError::EventMismatch,
            TicketingError::AlreadyCheckedIn { checked_in_at } => AppError::AlreadyCheckedIn { checked_in_at },
            TicketingError::Forbidden => AppError::Forbidden("You do not manage this event".to_string()),
            TicketingError::Conflict(msg) => AppError::Conflict(msg),
            TicketingError::Persistence(e) => AppError::PersistenceError(e),
            TicketingError::IssuanceConflict | TicketingError::ReservationCommitted(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Storage and internal failures are reported without their cause.
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::PersistenceError(_) => "The ticketing store is unavailable, please retry".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        error_response(code, public_message, self.details(), status)
    }
}
