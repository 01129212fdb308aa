use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Structured outcomes of the ticketing core. Callers render these; the core
/// never produces user-facing text beyond these messages.
#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("ticket type {ticket_type_id} is out of stock")]
    OutOfStock { ticket_type_id: Uuid },

    #[error("issued token collides with an existing credential")]
    IssuanceConflict,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("token belongs to a different event")]
    EventMismatch,

    #[error("attendee already checked in")]
    AlreadyCheckedIn {
        checked_in_at: Option<DateTime<Utc>>,
    },

    #[error("reservation {0} is already committed")]
    ReservationCommitted(Uuid),

    #[error("not allowed to manage this event")]
    Forbidden,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl TicketingError {
    /// Transient infrastructure faults; the whole call is safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TicketingError::Persistence(_))
    }
}
