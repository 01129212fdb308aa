use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{bounded, TicketingError};
use crate::config::CoreSettings;
use crate::models::{HoldRequest, Reservation, ReservationStatus};
use crate::store::{Conditional, TicketingStore};

/// Single source of truth for "can N more units be sold".
///
/// Every mutation is one conditional write in the store, so two buyers racing
/// for the last unit are serialized by the storage layer rather than by any
/// in-process lock.
pub struct InventoryLedger {
    store: Arc<dyn TicketingStore>,
    timeout: Duration,
    ttl: chrono::Duration,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn TicketingStore>, settings: &CoreSettings) -> Self {
        Self {
            store,
            timeout: settings.persistence_timeout,
            ttl: chrono::Duration::from_std(settings.reservation_ttl)
                .unwrap_or_else(|_| chrono::Duration::minutes(15)),
        }
    }

    #[instrument(skip(self), fields(ticket_type_id = %ticket_type_id))]
    pub async fn reserve(&self, ticket_type_id: Uuid, quantity: i32) -> Result<Reservation, TicketingError> {
        if quantity <= 0 {
            return Err(TicketingError::Validation(
                "reserved quantity must be positive".to_string(),
            ));
        }

        // A hold written after our deadline fired is never seen here; the
        // expiry sweep hands those units back.
        let hold = HoldRequest::new(ticket_type_id, quantity, Utc::now(), self.ttl);
        match bounded(self.timeout, "reserve_capacity", self.store.reserve_capacity(&hold)).await? {
            Conditional::Applied(reservation) => {
                debug!(reservation_id = %reservation.id, "Capacity reserved");
                Ok(reservation)
            }
            Conditional::Rejected(ticket_type) => {
                info!(
                    sold = ticket_type.sold,
                    capacity = ?ticket_type.capacity,
                    "Reservation rejected, ticket type is out of stock"
                );
                Err(TicketingError::OutOfStock { ticket_type_id })
            }
            Conditional::Missing => Err(TicketingError::NotFound("ticket type")),
        }
    }

    /// Hands a provisional hold back. Releasing an already released hold is a no-op.
    #[instrument(skip(self), fields(reservation_id = %reservation_id))]
    pub async fn release(&self, reservation_id: Uuid) -> Result<(), TicketingError> {
        match bounded(
            self.timeout,
            "release_reservation",
            self.store.release_reservation(reservation_id),
        )
        .await?
        {
            Conditional::Applied(reservation) => {
                debug!(quantity = reservation.quantity, "Reservation released");
                Ok(())
            }
            Conditional::Rejected(reservation) => match reservation.status {
                ReservationStatus::Committed => Err(TicketingError::ReservationCommitted(reservation_id)),
                ReservationStatus::Released | ReservationStatus::Held => Ok(()),
            },
            Conditional::Missing => Err(TicketingError::NotFound("reservation")),
        }
    }

    #[instrument(skip(self), fields(reservation_id = %reservation_id))]
    pub async fn commit(&self, reservation_id: Uuid) -> Result<Reservation, TicketingError> {
        match bounded(
            self.timeout,
            "commit_reservation",
            self.store.commit_reservation(reservation_id),
        )
        .await?
        {
            Conditional::Applied(reservation) => Ok(reservation),
            Conditional::Rejected(reservation) if reservation.status == ReservationStatus::Committed => {
                Ok(reservation)
            }
            Conditional::Rejected(_) => Err(TicketingError::Conflict(format!(
                "reservation {} was released before it could be committed",
                reservation_id
            ))),
            Conditional::Missing => Err(TicketingError::NotFound("reservation")),
        }
    }

    /// Returns the units of every hold that outlived its TTL without being committed.
    pub async fn release_expired(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, TicketingError> {
        let released = bounded(
            self.timeout,
            "release_expired_reservations",
            self.store.release_expired_reservations(now),
        )
        .await?;
        Ok(released)
    }
}

/// Periodically reclaims holds left behind by abandoned checkouts.
pub fn spawn_reservation_sweeper(ledger: Arc<InventoryLedger>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match ledger.release_expired(Utc::now()).await {
                Ok(released) if !released.is_empty() => {
                    let units: i32 = released.iter().map(|reservation| reservation.quantity).sum();
                    info!(reservations = released.len(), units, "Released expired reservations");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Reservation sweep failed"),
            }
        }
    })
}
