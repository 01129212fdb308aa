use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Held,
    Committed,
    Released,
}

/// A provisional hold against a ticket type's remaining capacity.
///
/// The unit price is captured from the ticket type in the same write that
/// takes the hold, so later price edits never reach an in-flight order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_held(&self) -> bool {
        self.status == ReservationStatus::Held
    }
}

/// Everything the store needs to take a hold; the price is filled in by the
/// store from the ticket type row.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub reservation_id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl HoldRequest {
    pub fn new(ticket_type_id: Uuid, quantity: i32, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            reservation_id: Uuid::new_v4(),
            ticket_type_id,
            quantity,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn into_reservation(self, unit_price: Decimal) -> Reservation {
        Reservation {
            id: self.reservation_id,
            ticket_type_id: self.ticket_type_id,
            quantity: self.quantity,
            unit_price,
            status: ReservationStatus::Held,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}
