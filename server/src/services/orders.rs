use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::credentials::mint_order_number;
use super::{bounded, ensure_owner, CredentialIssuer, InventoryLedger, TicketingError};
use crate::config::CoreSettings;
use crate::models::{
    Attendee, CustomerContact, Order, OrderDetails, OrderItem, OrderRequest, OrderStatus, Reservation,
};
use crate::store::{CancelOutcome, OrderBundle, StoreError, TicketingStore};

/// Turns a cart into a completed order, or into nothing at all.
///
/// The sequence is validate, reserve every line, then write the order with
/// its items and attendees in one storage call. Any failure after the first
/// reservation runs the compensation path: discard whatever rows the attempt
/// left behind and hand every unit back, committed or not.
///
/// A write whose acknowledgement is lost may still have landed, so a failed
/// write is followed by a read of the order before anything is undone.
pub struct OrderOrchestrator {
    store: Arc<dyn TicketingStore>,
    ledger: Arc<InventoryLedger>,
    issuer: CredentialIssuer,
    timeout: Duration,
    max_attempts: u32,
    max_units_per_line: u32,
}

impl OrderOrchestrator {
    pub fn new(
        store: Arc<dyn TicketingStore>,
        ledger: Arc<InventoryLedger>,
        issuer: CredentialIssuer,
        settings: &CoreSettings,
    ) -> Self {
        Self {
            store,
            ledger,
            issuer,
            timeout: settings.persistence_timeout,
            max_attempts: settings.issuance_max_attempts.max(1),
            max_units_per_line: settings.max_units_per_line,
        }
    }

    #[instrument(skip(self, request), fields(event_id = %event_id))]
    pub async fn place_order(
        &self,
        event_id: Uuid,
        request: OrderRequest,
    ) -> Result<OrderDetails, TicketingError> {
        let lines = self.validate(event_id, &request).await?;
        let reservations = self.reserve_all(&lines).await?;

        let order_id = Uuid::new_v4();
        match self.fulfil(order_id, event_id, &reservations, &request.customer).await {
            Ok(details) => {
                info!(
                    order_id = %details.order.id,
                    order_number = %details.order.order_number,
                    attendees = details.attendees.len(),
                    "Order completed"
                );
                Ok(details)
            }
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Order failed, compensating");
                self.compensate(order_id, &reservations).await;
                Err(e)
            }
        }
    }

    /// Checks the cart against the catalog and merges repeated lines.
    async fn validate(&self, event_id: Uuid, request: &OrderRequest) -> Result<Vec<(Uuid, i32)>, TicketingError> {
        if request.lines.is_empty() {
            return Err(TicketingError::Validation("cart must not be empty".to_string()));
        }
        request
            .customer
            .validate()
            .map_err(TicketingError::Validation)?;

        let mut merged: Vec<(Uuid, u64)> = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            if line.quantity == 0 {
                return Err(TicketingError::Validation(format!(
                    "quantity for ticket type {} must be greater than zero",
                    line.ticket_type_id
                )));
            }
            match merged.iter_mut().find(|(id, _)| *id == line.ticket_type_id) {
                Some((_, quantity)) => *quantity += u64::from(line.quantity),
                None => merged.push((line.ticket_type_id, u64::from(line.quantity))),
            }
        }

        let event = bounded(self.timeout, "get_event", self.store.get_event(event_id))
            .await?
            .ok_or_else(|| TicketingError::Validation(format!("event {} does not exist", event_id)))?;
        if !event.is_on_sale() {
            return Err(TicketingError::Validation("event is not open for sales".to_string()));
        }

        let mut lines = Vec::with_capacity(merged.len());
        for (ticket_type_id, quantity) in merged {
            if quantity > u64::from(self.max_units_per_line) {
                return Err(TicketingError::Validation(format!(
                    "at most {} tickets of one type per order",
                    self.max_units_per_line
                )));
            }
            let quantity = i32::try_from(quantity)
                .map_err(|_| TicketingError::Validation("quantity is too large".to_string()))?;

            let ticket_type = bounded(
                self.timeout,
                "get_ticket_type",
                self.store.get_ticket_type(ticket_type_id),
            )
            .await?;
            match ticket_type {
                Some(ticket_type) if ticket_type.event_id == event_id => lines.push((ticket_type_id, quantity)),
                _ => {
                    return Err(TicketingError::Validation(format!(
                        "ticket type {} is not sold for this event",
                        ticket_type_id
                    )))
                }
            }
        }
        Ok(lines)
    }

    async fn reserve_all(&self, lines: &[(Uuid, i32)]) -> Result<Vec<Reservation>, TicketingError> {
        let mut held = Vec::with_capacity(lines.len());
        for &(ticket_type_id, quantity) in lines {
            match self.ledger.reserve(ticket_type_id, quantity).await {
                Ok(reservation) => held.push(reservation),
                Err(e) => {
                    self.release_all(&held).await;
                    return Err(e);
                }
            }
        }
        Ok(held)
    }

    /// Writes the order, retrying with a fresh order number and fresh tokens
    /// when the store reports a uniqueness collision.
    async fn fulfil(
        &self,
        order_id: Uuid,
        event_id: Uuid,
        reservations: &[Reservation],
        customer: &CustomerContact,
    ) -> Result<OrderDetails, TicketingError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let bundle = self.assemble(order_id, event_id, reservations, customer, Utc::now()).await?;
            match bounded(self.timeout, "complete_order", self.store.complete_order(&bundle)).await {
                Ok(order) => {
                    return Ok(OrderDetails {
                        order,
                        items: bundle.items,
                        attendees: bundle.attendees,
                    })
                }
                Err(StoreError::Conflict(constraint)) if attempt < self.max_attempts => {
                    warn!(attempt, constraint = %constraint, "Order write collided, retrying");
                }
                Err(e) => {
                    if let Some(details) = self.landed(order_id).await {
                        warn!(error = %e, "Order write reported failure but the order is completed");
                        return Ok(details);
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// The stored order, if a write that reported failure actually completed it.
    async fn landed(&self, order_id: Uuid) -> Option<OrderDetails> {
        match bounded(self.timeout, "get_order", self.store.get_order(order_id)).await {
            Ok(Some(details)) if details.order.status == OrderStatus::Completed => Some(details),
            Ok(_) => None,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Could not read back a failed order");
                None
            }
        }
    }

    async fn assemble(
        &self,
        order_id: Uuid,
        event_id: Uuid,
        reservations: &[Reservation],
        customer: &CustomerContact,
        now: DateTime<Utc>,
    ) -> Result<OrderBundle, TicketingError> {
        let items: Vec<OrderItem> = reservations
            .iter()
            .map(|reservation| OrderItem::from_reservation(order_id, reservation, now))
            .collect();

        let mut pending = HashSet::new();
        let mut attendees = Vec::new();
        for item in &items {
            for _ in 0..item.quantity {
                attendees.push(self.issue_one(item, customer, &mut pending, now).await?);
            }
        }

        Ok(OrderBundle {
            order: Order::pending(order_id, event_id, mint_order_number(now), &items, customer, now),
            items,
            attendees,
            reservation_ids: reservations.iter().map(|reservation| reservation.id).collect(),
        })
    }

    async fn issue_one(
        &self,
        item: &OrderItem,
        customer: &CustomerContact,
        pending: &mut HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<Attendee, TicketingError> {
        for attempt in 1..=self.max_attempts {
            match self.issuer.issue(item, customer, pending, now).await {
                Err(TicketingError::IssuanceConflict) => {
                    warn!(attempt, order_item_id = %item.id, "Token collision, drawing another");
                }
                outcome => return outcome,
            }
        }
        Err(StoreError::Conflict("attendees_token_key".to_string()).into())
    }

    async fn compensate(&self, order_id: Uuid, reservations: &[Reservation]) {
        let reservation_ids: Vec<Uuid> = reservations.iter().map(|reservation| reservation.id).collect();
        if let Err(e) = bounded(
            self.timeout,
            "discard_order",
            self.store.discard_order(order_id, &reservation_ids),
        )
        .await
        {
            error!(order_id = %order_id, error = %e, "Failed to discard rows of a failed order");
            self.release_all(reservations).await;
        }
    }

    async fn release_all(&self, reservations: &[Reservation]) {
        for reservation in reservations {
            // Left to the expiry sweep if this fails.
            if let Err(e) = self.ledger.release(reservation.id).await {
                error!(reservation_id = %reservation.id, error = %e, "Failed to release reservation");
            }
        }
    }

    pub async fn get_order(&self, organizer_id: Uuid, order_id: Uuid) -> Result<OrderDetails, TicketingError> {
        let details = bounded(self.timeout, "get_order", self.store.get_order(order_id))
            .await?
            .ok_or(TicketingError::NotFound("order"))?;
        self.authorize(organizer_id, details.order.event_id).await?;
        Ok(details)
    }

    pub async fn cancel_order(&self, organizer_id: Uuid, order_id: Uuid) -> Result<Order, TicketingError> {
        self.close(organizer_id, order_id, OrderStatus::Cancelled).await
    }

    pub async fn refund_order(&self, organizer_id: Uuid, order_id: Uuid) -> Result<Order, TicketingError> {
        self.close(organizer_id, order_id, OrderStatus::Refunded).await
    }

    /// Cancel or refund: the order's attendees are voided and its units go
    /// back on sale. Refused once anyone from the order has been admitted.
    #[instrument(skip(self), fields(order_id = %order_id, target = ?target))]
    async fn close(&self, organizer_id: Uuid, order_id: Uuid, target: OrderStatus) -> Result<Order, TicketingError> {
        let current = self.get_order(organizer_id, order_id).await?.order.status;
        if !current.can_transition_to(target) {
            return Err(TicketingError::Conflict(format!(
                "order cannot move from {:?} to {:?}",
                current, target
            )));
        }

        let outcome = bounded(
            self.timeout,
            "cancel_order",
            self.store.cancel_order(order_id, current, target),
        )
        .await?;
        match outcome {
            CancelOutcome::Cancelled(order) => {
                info!(status = ?order.status, "Order closed, units returned to stock");
                Ok(order)
            }
            CancelOutcome::AttendeesCheckedIn => Err(TicketingError::Conflict(
                "order has attendees who already checked in".to_string(),
            )),
            CancelOutcome::StatusMismatch(status) => Err(TicketingError::Conflict(format!(
                "order status changed to {:?} concurrently",
                status
            ))),
            CancelOutcome::Missing => Err(TicketingError::NotFound("order")),
        }
    }

    async fn authorize(&self, organizer_id: Uuid, event_id: Uuid) -> Result<(), TicketingError> {
        let event = bounded(self.timeout, "get_event", self.store.get_event(event_id))
            .await?
            .ok_or(TicketingError::NotFound("event"))?;
        ensure_owner(&event, organizer_id)
    }
}
