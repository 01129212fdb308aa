//! In-process store used by the test suite and by local runs without a
//! database. A single mutex guards all tables, which gives every method the
//! same all-or-nothing behaviour as a Postgres transaction.
//!
//! Faults can be queued to make the next order write misbehave like a
//! backend without multi-row transactions (partial writes) or like a stalled
//! connection.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CancelOutcome, Conditional, OrderBundle, StoreError, StoreResult, TicketingStore};
use crate::models::{
    Attendee, AttendeeListing, DashboardSummary, Event, EventStatus, EventSummary,
    EventTicketType, HoldRequest, Order, OrderDetails, OrderItem, OrderStatus, Reservation,
    ReservationStatus, TokenHolder,
};

#[derive(Debug, Clone)]
pub enum Fault {
    /// The next `complete_order` writes the order row, its items and this many
    /// attendees, then fails without cleaning up.
    PartialWrite { attendees: usize },
    /// The next `complete_order` hangs this long before touching any row.
    Stall(Duration),
    /// The next `complete_order` writes everything, then hangs this long
    /// before acknowledging, like a commit whose reply is lost in transit.
    LateAck(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    pub orders: usize,
    pub items: usize,
    pub attendees: usize,
    pub held_reservations: usize,
}

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    ticket_types: HashMap<Uuid, EventTicketType>,
    reservations: HashMap<Uuid, Reservation>,
    orders: HashMap<Uuid, Order>,
    items: HashMap<Uuid, OrderItem>,
    attendees: HashMap<Uuid, Attendee>,
}

impl Tables {
    fn token_taken(&self, token: &str) -> bool {
        self.attendees.values().any(|attendee| attendee.token == token)
    }

    fn release(&mut self, reservation_id: Uuid) -> Conditional<Reservation> {
        self.hand_back(reservation_id, &[ReservationStatus::Held])
    }

    /// Returns the units of a reservation currently in one of `from`.
    fn hand_back(&mut self, reservation_id: Uuid, from: &[ReservationStatus]) -> Conditional<Reservation> {
        let Some(reservation) = self.reservations.get_mut(&reservation_id) else {
            return Conditional::Missing;
        };
        if !from.contains(&reservation.status) {
            return Conditional::Rejected(reservation.clone());
        }
        reservation.status = ReservationStatus::Released;
        let released = reservation.clone();

        if let Some(ticket_type) = self.ticket_types.get_mut(&released.ticket_type_id) {
            ticket_type.sold = (ticket_type.sold - released.quantity).max(0);
        }
        Conditional::Applied(released)
    }

    fn holder(&self, attendee: &Attendee) -> Option<TokenHolder> {
        self.orders.get(&attendee.order_id).map(|order| TokenHolder {
            attendee: attendee.clone(),
            event_id: order.event_id,
        })
    }

    fn completed_orders(&self, event_id: Uuid) -> impl Iterator<Item = &Order> {
        self.orders
            .values()
            .filter(move |order| order.event_id == event_id && order.status == OrderStatus::Completed)
    }

    fn units_in_order(&self, order_id: Uuid) -> i64 {
        self.items
            .values()
            .filter(|item| item.order_id == order_id)
            .map(|item| i64::from(item.quantity))
            .sum()
    }

    fn attendees_of_event(&self, event_id: Uuid) -> impl Iterator<Item = &Attendee> {
        self.attendees.values().filter(move |attendee| {
            self.orders
                .get(&attendee.order_id)
                .is_some_and(|order| order.event_id == event_id)
        })
    }

    fn discard(&mut self, order_id: Uuid) {
        self.attendees.retain(|_, attendee| attendee.order_id != order_id);
        self.items.retain(|_, item| item.order_id != order_id);
        self.orders.remove(&order_id);
    }

    fn complete(&mut self, bundle: &OrderBundle) -> StoreResult<Order> {
        if self
            .orders
            .values()
            .any(|order| order.order_number == bundle.order.order_number)
        {
            return Err(StoreError::Conflict("orders_order_number_key".to_string()));
        }
        let mut seen = HashSet::new();
        for attendee in &bundle.attendees {
            if !seen.insert(attendee.token.as_str()) || self.token_taken(&attendee.token) {
                return Err(StoreError::Conflict("attendees_token_key".to_string()));
            }
        }
        for reservation_id in &bundle.reservation_ids {
            match self.reservations.get(reservation_id) {
                Some(reservation) if reservation.is_held() => {}
                _ => return Err(StoreError::Lapsed(*reservation_id)),
            }
        }

        for reservation_id in &bundle.reservation_ids {
            if let Some(reservation) = self.reservations.get_mut(reservation_id) {
                reservation.status = ReservationStatus::Committed;
            }
        }
        let mut order = bundle.order.clone();
        order.status = OrderStatus::Completed;
        self.orders.insert(order.id, order.clone());
        for item in &bundle.items {
            self.items.insert(item.id, item.clone());
        }
        for attendee in &bundle.attendees {
            self.attendees.insert(attendee.id, attendee.clone());
        }
        Ok(order)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    faults: Mutex<VecDeque<Fault>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a fault for the next order write.
    pub async fn inject(&self, fault: Fault) {
        self.faults.lock().await.push_back(fault);
    }

    pub async fn row_counts(&self) -> RowCounts {
        let tables = self.tables.lock().await;
        RowCounts {
            orders: tables.orders.len(),
            items: tables.items.len(),
            attendees: tables.attendees.len(),
            held_reservations: tables
                .reservations
                .values()
                .filter(|reservation| reservation.is_held())
                .count(),
        }
    }

    pub async fn reservation(&self, reservation_id: Uuid) -> Option<Reservation> {
        self.tables.lock().await.reservations.get(&reservation_id).cloned()
    }

    async fn next_fault(&self) -> Option<Fault> {
        self.faults.lock().await.pop_front()
    }
}

#[async_trait]
impl TicketingStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.events.contains_key(&event.id) {
            return Err(StoreError::Conflict("events_pkey".to_string()));
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> StoreResult<Conditional<Event>> {
        let mut tables = self.tables.lock().await;
        match tables.events.get_mut(&event.id) {
            Some(current) => {
                *current = event.clone();
                Ok(Conditional::Applied(event.clone()))
            }
            None => Ok(Conditional::Missing),
        }
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<Conditional<Event>> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        let Some(event) = tables.events.get(&event_id).cloned() else {
            return Ok(Conditional::Missing);
        };
        if tables.orders.values().any(|order| order.event_id == event_id) {
            return Ok(Conditional::Rejected(event));
        }

        let ticket_type_ids: HashSet<Uuid> = tables
            .ticket_types
            .values()
            .filter(|ticket_type| ticket_type.event_id == event_id)
            .map(|ticket_type| ticket_type.id)
            .collect();
        tables
            .reservations
            .retain(|_, reservation| !ticket_type_ids.contains(&reservation.ticket_type_id));
        tables
            .ticket_types
            .retain(|id, _| !ticket_type_ids.contains(id));
        tables.events.remove(&event_id);
        Ok(Conditional::Applied(event))
    }

    async fn get_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.tables.lock().await.events.get(&event_id).cloned())
    }

    async fn list_events(&self, organizer_id: Uuid) -> StoreResult<Vec<Event>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|event| event.organizer_id == organizer_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn insert_ticket_type(&self, ticket_type: &EventTicketType) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.events.contains_key(&ticket_type.event_id) {
            return Err(StoreError::Fault(format!(
                "event {} does not exist",
                ticket_type.event_id
            )));
        }
        tables.ticket_types.insert(ticket_type.id, ticket_type.clone());
        Ok(())
    }

    async fn update_ticket_type(
        &self,
        ticket_type: &EventTicketType,
    ) -> StoreResult<Conditional<EventTicketType>> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.ticket_types.get_mut(&ticket_type.id) else {
            return Ok(Conditional::Missing);
        };
        if matches!(ticket_type.capacity, Some(capacity) if capacity < current.sold) {
            return Ok(Conditional::Rejected(current.clone()));
        }

        current.name = ticket_type.name.clone();
        current.description = ticket_type.description.clone();
        current.kind = ticket_type.kind;
        current.price = ticket_type.price;
        current.capacity = ticket_type.capacity;
        current.updated_at = ticket_type.updated_at;
        Ok(Conditional::Applied(current.clone()))
    }

    async fn delete_ticket_type(&self, ticket_type_id: Uuid) -> StoreResult<Conditional<EventTicketType>> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        let Some(ticket_type) = tables.ticket_types.get(&ticket_type_id).cloned() else {
            return Ok(Conditional::Missing);
        };
        let referenced = tables
            .items
            .values()
            .any(|item| item.ticket_type_id == ticket_type_id);
        if ticket_type.sold > 0 || referenced {
            return Ok(Conditional::Rejected(ticket_type));
        }

        tables
            .reservations
            .retain(|_, reservation| reservation.ticket_type_id != ticket_type_id);
        tables.ticket_types.remove(&ticket_type_id);
        Ok(Conditional::Applied(ticket_type))
    }

    async fn get_ticket_type(&self, ticket_type_id: Uuid) -> StoreResult<Option<EventTicketType>> {
        Ok(self.tables.lock().await.ticket_types.get(&ticket_type_id).cloned())
    }

    async fn list_ticket_types(&self, event_id: Uuid) -> StoreResult<Vec<EventTicketType>> {
        let tables = self.tables.lock().await;
        let mut ticket_types: Vec<EventTicketType> = tables
            .ticket_types
            .values()
            .filter(|ticket_type| ticket_type.event_id == event_id)
            .cloned()
            .collect();
        ticket_types.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(ticket_types)
    }

    async fn reserve_capacity(
        &self,
        hold: &HoldRequest,
    ) -> StoreResult<Conditional<Reservation, EventTicketType>> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        let Some(ticket_type) = tables.ticket_types.get_mut(&hold.ticket_type_id) else {
            return Ok(Conditional::Missing);
        };
        let total = match ticket_type.sold.checked_add(hold.quantity) {
            Some(total) if ticket_type.can_accommodate(hold.quantity) => total,
            _ => return Ok(Conditional::Rejected(ticket_type.clone())),
        };

        ticket_type.sold = total;
        ticket_type.updated_at = hold.created_at;
        let reservation = hold.clone().into_reservation(ticket_type.price);
        tables.reservations.insert(reservation.id, reservation.clone());
        Ok(Conditional::Applied(reservation))
    }

    async fn release_reservation(&self, reservation_id: Uuid) -> StoreResult<Conditional<Reservation>> {
        Ok(self.tables.lock().await.release(reservation_id))
    }

    async fn commit_reservation(&self, reservation_id: Uuid) -> StoreResult<Conditional<Reservation>> {
        let mut tables = self.tables.lock().await;
        let Some(reservation) = tables.reservations.get_mut(&reservation_id) else {
            return Ok(Conditional::Missing);
        };
        if !reservation.is_held() {
            return Ok(Conditional::Rejected(reservation.clone()));
        }
        reservation.status = ReservationStatus::Committed;
        Ok(Conditional::Applied(reservation.clone()))
    }

    async fn release_expired_reservations(&self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        let mut tables = self.tables.lock().await;
        let expired: Vec<Uuid> = tables
            .reservations
            .values()
            .filter(|reservation| reservation.is_held() && reservation.expires_at < now)
            .map(|reservation| reservation.id)
            .collect();

        let released = expired
            .into_iter()
            .filter_map(|id| match tables.release(id) {
                Conditional::Applied(reservation) => Some(reservation),
                _ => None,
            })
            .collect();
        Ok(released)
    }

    async fn token_exists(&self, token: &str) -> StoreResult<bool> {
        Ok(self.tables.lock().await.token_taken(token))
    }

    async fn complete_order(&self, bundle: &OrderBundle) -> StoreResult<Order> {
        match self.next_fault().await {
            Some(Fault::PartialWrite { attendees }) => {
                let mut tables = self.tables.lock().await;
                tables.orders.insert(bundle.order.id, bundle.order.clone());
                for item in &bundle.items {
                    tables.items.insert(item.id, item.clone());
                }
                for attendee in bundle.attendees.iter().take(attendees) {
                    tables.attendees.insert(attendee.id, attendee.clone());
                }
                return Err(StoreError::Fault(format!(
                    "connection lost after writing {} attendee(s)",
                    attendees
                )));
            }
            Some(Fault::Stall(duration)) => tokio::time::sleep(duration).await,
            Some(Fault::LateAck(duration)) => {
                let order = self.tables.lock().await.complete(bundle)?;
                tokio::time::sleep(duration).await;
                return Ok(order);
            }
            None => {}
        }

        self.tables.lock().await.complete(bundle)
    }

    async fn discard_order(&self, order_id: Uuid, reservation_ids: &[Uuid]) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.discard(order_id);
        for reservation_id in reservation_ids {
            tables.hand_back(
                *reservation_id,
                &[ReservationStatus::Held, ReservationStatus::Committed],
            );
        }
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<OrderDetails>> {
        let tables = self.tables.lock().await;
        let Some(order) = tables.orders.get(&order_id).cloned() else {
            return Ok(None);
        };
        let mut items: Vec<OrderItem> = tables
            .items
            .values()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.created_at, item.id));
        let mut attendees: Vec<Attendee> = tables
            .attendees
            .values()
            .filter(|attendee| attendee.order_id == order_id)
            .cloned()
            .collect();
        attendees.sort_by_key(|attendee| (attendee.created_at, attendee.id));
        Ok(Some(OrderDetails {
            order,
            items,
            attendees,
        }))
    }

    async fn cancel_order(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<CancelOutcome> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        let Some(status) = tables.orders.get(&order_id).map(|order| order.status) else {
            return Ok(CancelOutcome::Missing);
        };
        if status != from {
            return Ok(CancelOutcome::StatusMismatch(status));
        }
        if tables
            .attendees
            .values()
            .any(|attendee| attendee.order_id == order_id && attendee.checked_in)
        {
            return Ok(CancelOutcome::AttendeesCheckedIn);
        }

        tables
            .attendees
            .retain(|_, attendee| attendee.order_id != order_id);
        for item in tables.items.values().filter(|item| item.order_id == order_id) {
            if let Some(ticket_type) = tables.ticket_types.get_mut(&item.ticket_type_id) {
                ticket_type.sold = (ticket_type.sold - item.quantity).max(0);
            }
        }
        match tables.orders.get_mut(&order_id) {
            Some(order) => {
                order.status = to;
                order.updated_at = Utc::now();
                Ok(CancelOutcome::Cancelled(order.clone()))
            }
            None => Ok(CancelOutcome::Missing),
        }
    }

    async fn find_attendee_by_token(&self, token: &str) -> StoreResult<Option<TokenHolder>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .attendees
            .values()
            .find(|attendee| attendee.token == token)
            .and_then(|attendee| tables.holder(attendee)))
    }

    async fn get_attendee(&self, attendee_id: Uuid) -> StoreResult<Option<TokenHolder>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .attendees
            .get(&attendee_id)
            .and_then(|attendee| tables.holder(attendee)))
    }

    async fn mark_checked_in(
        &self,
        attendee_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Conditional<Attendee>> {
        let mut tables = self.tables.lock().await;
        let Some(attendee) = tables.attendees.get_mut(&attendee_id) else {
            return Ok(Conditional::Missing);
        };
        if attendee.checked_in {
            return Ok(Conditional::Rejected(attendee.clone()));
        }
        attendee.checked_in = true;
        attendee.checked_in_at = Some(at);
        Ok(Conditional::Applied(attendee.clone()))
    }

    async fn clear_check_in(&self, attendee_id: Uuid) -> StoreResult<Conditional<Attendee>> {
        let mut tables = self.tables.lock().await;
        let Some(attendee) = tables.attendees.get_mut(&attendee_id) else {
            return Ok(Conditional::Missing);
        };
        if !attendee.checked_in {
            return Ok(Conditional::Rejected(attendee.clone()));
        }
        attendee.checked_in = false;
        attendee.checked_in_at = None;
        Ok(Conditional::Applied(attendee.clone()))
    }

    async fn list_attendees(
        &self,
        event_id: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<AttendeeListing>> {
        let tables = self.tables.lock().await;
        let mut listings: Vec<AttendeeListing> = tables
            .attendees_of_event(event_id)
            .map(|attendee| AttendeeListing {
                attendee: attendee.clone(),
                ticket_type_name: tables
                    .ticket_types
                    .get(&attendee.ticket_type_id)
                    .map(|ticket_type| ticket_type.name.clone())
                    .unwrap_or_default(),
            })
            .filter(|listing| search.map_or(true, |needle| listing.matches(needle)))
            .collect();
        listings.sort_by(|a, b| b.attendee.created_at.cmp(&a.attendee.created_at));
        Ok(listings)
    }

    async fn event_summary(&self, event_id: Uuid) -> StoreResult<EventSummary> {
        let tables = self.tables.lock().await;
        let completed: Vec<&Order> = tables.completed_orders(event_id).collect();
        let attendees: Vec<&Attendee> = tables.attendees_of_event(event_id).collect();

        Ok(EventSummary {
            event_id,
            orders: completed.len() as i64,
            revenue: completed.iter().map(|order| order.total_amount).sum(),
            tickets_sold: completed
                .iter()
                .map(|order| tables.units_in_order(order.id))
                .sum(),
            attendees: attendees.len() as i64,
            checked_in: attendees.iter().filter(|attendee| attendee.checked_in).count() as i64,
        })
    }

    async fn dashboard_summary(&self, organizer_id: Uuid) -> StoreResult<DashboardSummary> {
        let tables = self.tables.lock().await;
        let events: Vec<&Event> = tables
            .events
            .values()
            .filter(|event| event.organizer_id == organizer_id)
            .collect();
        let completed: Vec<&Order> = events
            .iter()
            .flat_map(|event| tables.completed_orders(event.id))
            .collect();

        Ok(DashboardSummary {
            events: events.len() as i64,
            published_events: events
                .iter()
                .filter(|event| event.status == EventStatus::Published)
                .count() as i64,
            tickets_sold: completed
                .iter()
                .map(|order| tables.units_in_order(order.id))
                .sum(),
            revenue: completed.iter().map(|order| order.total_amount).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerContact, EventDraft, TicketKind, TicketTypeDraft};
    use rust_decimal::Decimal;

    async fn seeded(capacity: Option<i32>) -> (MemoryStore, EventTicketType) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let event = Event::new(
            Uuid::new_v4(),
            EventDraft {
                title: "Launch".to_string(),
                description: None,
                location: None,
                start_time: now,
                end_time: None,
                status: Some(EventStatus::Published),
            },
            now,
        );
        store.insert_event(&event).await.unwrap();
        let ticket_type = EventTicketType::new(
            event.id,
            TicketTypeDraft {
                name: "GA".to_string(),
                description: None,
                kind: TicketKind::Paid,
                price: Decimal::new(1000, 2),
                capacity,
            },
            now,
        );
        store.insert_ticket_type(&ticket_type).await.unwrap();
        (store, ticket_type)
    }

    fn hold(ticket_type_id: Uuid, quantity: i32) -> HoldRequest {
        HoldRequest::new(ticket_type_id, quantity, Utc::now(), chrono::Duration::minutes(15))
    }

    #[tokio::test]
    async fn reserve_respects_capacity() {
        let (store, ticket_type) = seeded(Some(2)).await;

        let first = store.reserve_capacity(&hold(ticket_type.id, 2)).await.unwrap();
        assert!(matches!(first, Conditional::Applied(ref r) if r.unit_price == Decimal::new(1000, 2)));

        let second = store.reserve_capacity(&hold(ticket_type.id, 1)).await.unwrap();
        assert!(matches!(second, Conditional::Rejected(ref t) if t.sold == 2));

        let missing = store.reserve_capacity(&hold(Uuid::new_v4(), 1)).await.unwrap();
        assert_eq!(missing, Conditional::Missing);
    }

    #[tokio::test]
    async fn release_returns_units_once() {
        let (store, ticket_type) = seeded(Some(5)).await;
        let Conditional::Applied(reservation) =
            store.reserve_capacity(&hold(ticket_type.id, 3)).await.unwrap()
        else {
            panic!("reservation should succeed");
        };

        assert!(matches!(
            store.release_reservation(reservation.id).await.unwrap(),
            Conditional::Applied(_)
        ));
        assert!(matches!(
            store.release_reservation(reservation.id).await.unwrap(),
            Conditional::Rejected(ref r) if r.status == ReservationStatus::Released
        ));
        let current = store.get_ticket_type(ticket_type.id).await.unwrap().unwrap();
        assert_eq!(current.sold, 0);
    }

    #[tokio::test]
    async fn expired_holds_are_swept() {
        let (store, ticket_type) = seeded(None).await;
        let mut stale = hold(ticket_type.id, 4);
        stale.expires_at = Utc::now() - chrono::Duration::seconds(1);
        store.reserve_capacity(&stale).await.unwrap();
        store.reserve_capacity(&hold(ticket_type.id, 1)).await.unwrap();

        let released = store.release_expired_reservations(Utc::now()).await.unwrap();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].quantity, 4);
        let current = store.get_ticket_type(ticket_type.id).await.unwrap().unwrap();
        assert_eq!(current.sold, 1);
        assert_eq!(store.row_counts().await.held_reservations, 1);
    }

    #[tokio::test]
    async fn discarding_an_order_returns_its_committed_units() {
        let (store, ticket_type) = seeded(Some(4)).await;
        let Conditional::Applied(reservation) =
            store.reserve_capacity(&hold(ticket_type.id, 2)).await.unwrap()
        else {
            panic!("reservation should succeed");
        };
        let now = Utc::now();
        let item = OrderItem::from_reservation(Uuid::new_v4(), &reservation, now);
        let contact = CustomerContact {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
        };
        let bundle = OrderBundle {
            order: Order::pending(
                item.order_id,
                ticket_type.event_id,
                "ORD-20310912-ABCDEFGH".to_string(),
                std::slice::from_ref(&item),
                &contact,
                now,
            ),
            items: vec![item],
            attendees: Vec::new(),
            reservation_ids: vec![reservation.id],
        };
        store.complete_order(&bundle).await.unwrap();
        assert_eq!(store.reservation(reservation.id).await.unwrap().status, ReservationStatus::Committed);

        store.discard_order(bundle.order.id, &bundle.reservation_ids).await.unwrap();
        store.discard_order(bundle.order.id, &bundle.reservation_ids).await.unwrap();

        assert_eq!(store.row_counts().await, RowCounts::default());
        assert_eq!(store.get_ticket_type(ticket_type.id).await.unwrap().unwrap().sold, 0);
        assert_eq!(store.reservation(reservation.id).await.unwrap().status, ReservationStatus::Released);
    }

    #[tokio::test]
    async fn capacity_cannot_drop_below_sold() {
        let (store, ticket_type) = seeded(Some(10)).await;
        store.reserve_capacity(&hold(ticket_type.id, 6)).await.unwrap();

        let mut shrunk = ticket_type.clone();
        shrunk.capacity = Some(5);
        assert!(matches!(
            store.update_ticket_type(&shrunk).await.unwrap(),
            Conditional::Rejected(ref t) if t.sold == 6
        ));
        assert!(matches!(
            store.delete_ticket_type(ticket_type.id).await.unwrap(),
            Conditional::Rejected(_)
        ));
    }
}
