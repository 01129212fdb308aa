use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::attendee::Attendee;
use super::reservation::Reservation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Orders only move forward; cancellation and refund are the sole exits
    /// from a live order and both are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Completed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Completed, OrderStatus::Cancelled)
                | (OrderStatus::Completed, OrderStatus::Refunded)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub event_id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn pending(
        id: Uuid,
        event_id: Uuid,
        order_number: String,
        items: &[OrderItem],
        customer: &CustomerContact,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            event_id,
            order_number,
            total_amount: items.iter().map(OrderItem::line_total).sum(),
            status: OrderStatus::Pending,
            customer_name: customer.name.trim().to_string(),
            customer_email: customer.email.trim().to_string(),
            customer_phone: customer.phone.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn from_reservation(order_id: Uuid, reservation: &Reservation, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            ticket_type_id: reservation.ticket_type_id,
            quantity: reservation.quantity,
            unit_price: reservation.unit_price,
            created_at: now,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl CustomerContact {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("customer name must not be empty".to_string());
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(format!("'{}' is not a valid email address", email)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CartLine {
    pub ticket_type_id: Uuid,
    pub quantity: u32,
}

/// A checkout submission: the visitor's cart passed by value plus contact details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub lines: Vec<CartLine>,
    pub customer: CustomerContact,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub attendees: Vec<Attendee>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_are_monotonic() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(OrderStatus::Completed.can_transition_to(OrderStatus::Refunded));
        assert!(OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Refunded.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn total_is_sum_of_line_items() {
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let items = vec![
            OrderItem {
                id: Uuid::new_v4(),
                order_id,
                ticket_type_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: Decimal::new(1250, 2),
                created_at: now,
            },
            OrderItem {
                id: Uuid::new_v4(),
                order_id,
                ticket_type_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: Decimal::new(4000, 2),
                created_at: now,
            },
        ];
        let customer = CustomerContact {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
        };

        let order = Order::pending(order_id, Uuid::new_v4(), "ORD-1".to_string(), &items, &customer, now);
        assert_eq!(order.total_amount, Decimal::new(6500, 2));
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn customer_email_must_look_like_an_address() {
        let mut customer = CustomerContact {
            name: "Grace".to_string(),
            email: "grace@example.org".to_string(),
            phone: Some("555-0100".to_string()),
        };
        assert!(customer.validate().is_ok());

        customer.email = "grace".to_string();
        assert!(customer.validate().is_err());

        customer.email = "@example.org".to_string();
        assert!(customer.validate().is_err());

        customer.email = "grace@example.org".to_string();
        customer.name = " ".to_string();
        assert!(customer.validate().is_err());
    }
}
