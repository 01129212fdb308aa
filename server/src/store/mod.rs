//! Persistence seam for the ticketing core.
//!
//! Every method that guards an invariant is a single conditional write: the
//! predicate and the mutation happen in one atomic step inside the store, so
//! concurrent callers can never both act on stale state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Attendee, AttendeeListing, DashboardSummary, Event, EventSummary, EventTicketType,
    HoldRequest, Order, OrderDetails, OrderItem, OrderStatus, Reservation, TokenHolder,
};

pub mod memory;
pub mod postgres;

pub use memory::{Fault, MemoryStore, RowCounts};
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("reservation {0} is no longer held")]
    Lapsed(Uuid),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("storage fault: {0}")]
    Fault(String),
}

/// Outcome of a conditional write.
///
/// `Rejected` carries the row as it currently stands so callers can explain
/// why the predicate failed (current sold count, first check-in time, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional<T, R = T> {
    Applied(T),
    Rejected(R),
    Missing,
}

/// All rows of one checkout attempt, written as a unit by
/// [`TicketingStore::complete_order`].
#[derive(Debug, Clone)]
pub struct OrderBundle {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub attendees: Vec<Attendee>,
    pub reservation_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled(Order),
    AttendeesCheckedIn,
    StatusMismatch(OrderStatus),
    Missing,
}

#[async_trait]
pub trait TicketingStore: Send + Sync {
    async fn insert_event(&self, event: &Event) -> StoreResult<()>;
    async fn update_event(&self, event: &Event) -> StoreResult<Conditional<Event>>;
    /// Rejected while any order references the event.
    async fn delete_event(&self, event_id: Uuid) -> StoreResult<Conditional<Event>>;
    async fn get_event(&self, event_id: Uuid) -> StoreResult<Option<Event>>;
    async fn list_events(&self, organizer_id: Uuid) -> StoreResult<Vec<Event>>;

    async fn insert_ticket_type(&self, ticket_type: &EventTicketType) -> StoreResult<()>;
    /// Rejected when the new capacity would fall below the units already sold or held.
    async fn update_ticket_type(
        &self,
        ticket_type: &EventTicketType,
    ) -> StoreResult<Conditional<EventTicketType>>;
    /// Rejected once any unit has been sold or held, or an order line references it.
    async fn delete_ticket_type(&self, ticket_type_id: Uuid) -> StoreResult<Conditional<EventTicketType>>;
    async fn get_ticket_type(&self, ticket_type_id: Uuid) -> StoreResult<Option<EventTicketType>>;
    async fn list_ticket_types(&self, event_id: Uuid) -> StoreResult<Vec<EventTicketType>>;

    /// Increments `sold` only if the result stays within capacity and records
    /// the hold, snapshotting the ticket type's current price.
    async fn reserve_capacity(
        &self,
        hold: &HoldRequest,
    ) -> StoreResult<Conditional<Reservation, EventTicketType>>;
    /// `held -> released`, returning the units to the ticket type.
    async fn release_reservation(&self, reservation_id: Uuid) -> StoreResult<Conditional<Reservation>>;
    /// `held -> committed`.
    async fn commit_reservation(&self, reservation_id: Uuid) -> StoreResult<Conditional<Reservation>>;
    async fn release_expired_reservations(&self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>>;

    async fn token_exists(&self, token: &str) -> StoreResult<bool>;
    /// Writes the order, its items and attendees, commits every reservation
    /// and marks the order completed, all or nothing. Fails with
    /// [`StoreError::Conflict`] on a duplicate order number or token and with
    /// [`StoreError::Lapsed`] when a reservation expired underneath the order.
    async fn complete_order(&self, bundle: &OrderBundle) -> StoreResult<Order>;
    /// Removes every row written for the order and hands back the units of
    /// the given reservations, held or already committed, in one step.
    /// Idempotent.
    async fn discard_order(&self, order_id: Uuid, reservation_ids: &[Uuid]) -> StoreResult<()>;
    async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<OrderDetails>>;
    /// Moves the order from `from` to `to`, deleting its attendees and
    /// returning its units, unless an attendee has already checked in.
    async fn cancel_order(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<CancelOutcome>;

    async fn find_attendee_by_token(&self, token: &str) -> StoreResult<Option<TokenHolder>>;
    async fn get_attendee(&self, attendee_id: Uuid) -> StoreResult<Option<TokenHolder>>;
    /// Sets the check-in flag only if it is currently unset.
    async fn mark_checked_in(
        &self,
        attendee_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Conditional<Attendee>>;
    /// Clears the check-in flag only if it is currently set.
    async fn clear_check_in(&self, attendee_id: Uuid) -> StoreResult<Conditional<Attendee>>;
    async fn list_attendees(
        &self,
        event_id: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<AttendeeListing>>;

    async fn event_summary(&self, event_id: Uuid) -> StoreResult<EventSummary>;
    async fn dashboard_summary(&self, organizer_id: Uuid) -> StoreResult<DashboardSummary>;
}
