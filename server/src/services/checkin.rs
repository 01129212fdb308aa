use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{bounded, ensure_owner, TicketingError};
use crate::models::Attendee;
use crate::store::{Conditional, TicketingStore};

/// Admits attendees at the door. A token is honoured exactly once.
pub struct CheckInValidator {
    store: Arc<dyn TicketingStore>,
    timeout: Duration,
}

impl CheckInValidator {
    pub fn new(store: Arc<dyn TicketingStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    #[instrument(skip(self, token), fields(event_id = %event_id))]
    pub async fn check_in(&self, token: &str, event_id: Uuid) -> Result<Attendee, TicketingError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TicketingError::Validation("token must not be empty".to_string()));
        }

        let holder = bounded(
            self.timeout,
            "find_attendee_by_token",
            self.store.find_attendee_by_token(token),
        )
        .await?
        .ok_or(TicketingError::NotFound("attendee"))?;
        if holder.event_id != event_id {
            return Err(TicketingError::EventMismatch);
        }

        // The flag is re-checked inside the store; two scanners racing on the
        // same token get one success and one AlreadyCheckedIn.
        let outcome = bounded(
            self.timeout,
            "mark_checked_in",
            self.store.mark_checked_in(holder.attendee.id, Utc::now()),
        )
        .await?;
        match outcome {
            Conditional::Applied(attendee) => {
                info!(attendee_id = %attendee.id, "Attendee checked in");
                Ok(attendee)
            }
            Conditional::Rejected(attendee) => Err(TicketingError::AlreadyCheckedIn {
                checked_in_at: attendee.checked_in_at,
            }),
            Conditional::Missing => Err(TicketingError::NotFound("attendee")),
        }
    }

    /// Administrative correction of a mistaken scan.
    #[instrument(skip(self), fields(attendee_id = %attendee_id))]
    pub async fn undo_check_in(&self, organizer_id: Uuid, attendee_id: Uuid) -> Result<Attendee, TicketingError> {
        let holder = bounded(self.timeout, "get_attendee", self.store.get_attendee(attendee_id))
            .await?
            .ok_or(TicketingError::NotFound("attendee"))?;
        let event = bounded(self.timeout, "get_event", self.store.get_event(holder.event_id))
            .await?
            .ok_or(TicketingError::NotFound("event"))?;
        ensure_owner(&event, organizer_id)?;

        match bounded(self.timeout, "clear_check_in", self.store.clear_check_in(attendee_id)).await? {
            Conditional::Applied(attendee) => {
                info!("Check-in reverted");
                Ok(attendee)
            }
            Conditional::Rejected(_) => Err(TicketingError::Conflict(
                "attendee is not checked in".to_string(),
            )),
            Conditional::Missing => Err(TicketingError::NotFound("attendee")),
        }
    }
}
