use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketKind {
    Free,
    Paid,
    Donation,
    Tiered,
}

/// A purchasable category of an event with its own price and capacity.
///
/// `sold` counts both committed and provisionally held units, so the remaining
/// capacity seen by a new buyer already accounts for in-flight checkouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EventTicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: TicketKind,
    pub price: Decimal,
    pub capacity: Option<i32>,
    pub sold: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventTicketType {
    pub fn new(event_id: Uuid, draft: TicketTypeDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            name: draft.name.trim().to_string(),
            description: draft.description,
            kind: draft.kind,
            price: draft.price,
            capacity: draft.capacity,
            sold: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, draft: TicketTypeDraft, now: DateTime<Utc>) {
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.kind = draft.kind;
        self.price = draft.price;
        self.capacity = draft.capacity;
        self.updated_at = now;
    }

    /// Units still available, `None` when the capacity is unlimited.
    pub fn remaining(&self) -> Option<i32> {
        self.capacity.map(|capacity| (capacity - self.sold).max(0))
    }

    /// A quantity whose sum with `sold` does not fit an `i32` never fits.
    pub fn can_accommodate(&self, quantity: i32) -> bool {
        match (self.sold.checked_add(quantity), self.capacity) {
            (Some(total), Some(capacity)) => total <= capacity,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketTypeDraft {
    pub name: String,
    pub description: Option<String>,
    pub kind: TicketKind,
    pub price: Decimal,
    pub capacity: Option<i32>,
}

impl TicketTypeDraft {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("ticket type name must not be empty".to_string());
        }
        if self.price.is_sign_negative() {
            return Err("ticket price must not be negative".to_string());
        }
        if self.kind == TicketKind::Free && !self.price.is_zero() {
            return Err("free tickets must have a zero price".to_string());
        }
        if matches!(self.capacity, Some(capacity) if capacity < 0) {
            return Err("ticket capacity must not be negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(price: Decimal, capacity: Option<i32>) -> TicketTypeDraft {
        TicketTypeDraft {
            name: "General Admission".to_string(),
            description: None,
            kind: TicketKind::Paid,
            price,
            capacity,
        }
    }

    #[test]
    fn remaining_tracks_capacity() {
        let mut ticket = EventTicketType::new(Uuid::new_v4(), draft(Decimal::new(2500, 2), Some(3)), Utc::now());
        assert_eq!(ticket.remaining(), Some(3));
        ticket.sold = 3;
        assert_eq!(ticket.remaining(), Some(0));
        assert!(!ticket.can_accommodate(1));
        assert!(ticket.can_accommodate(0));
    }

    #[test]
    fn unlimited_capacity_accepts_anything() {
        let ticket = EventTicketType::new(Uuid::new_v4(), draft(Decimal::ZERO, None), Utc::now());
        assert_eq!(ticket.remaining(), None);
        assert!(ticket.can_accommodate(10_000));
    }

    #[test]
    fn overflowing_quantities_never_fit() {
        let mut limited = EventTicketType::new(Uuid::new_v4(), draft(Decimal::ONE, Some(10)), Utc::now());
        limited.sold = 1;
        assert!(!limited.can_accommodate(i32::MAX));

        let mut unlimited = EventTicketType::new(Uuid::new_v4(), draft(Decimal::ONE, None), Utc::now());
        unlimited.sold = 1;
        assert!(!unlimited.can_accommodate(i32::MAX));
        assert!(unlimited.can_accommodate(i32::MAX - 1));
    }

    #[test]
    fn validation_rules() {
        assert!(draft(Decimal::new(-1, 0), None).validate().is_err());
        assert!(draft(Decimal::ONE, Some(-5)).validate().is_err());

        let mut free = draft(Decimal::ONE, None);
        free.kind = TicketKind::Free;
        assert!(free.validate().is_err());
        free.price = Decimal::ZERO;
        assert!(free.validate().is_ok());
    }
}
