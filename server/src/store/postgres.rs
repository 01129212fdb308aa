use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::{CancelOutcome, Conditional, OrderBundle, StoreError, StoreResult, TicketingStore};
use crate::models::{
    Attendee, AttendeeListing, DashboardSummary, Event, EventSummary, EventTicketType,
    HoldRequest, Order, OrderDetails, OrderItem, OrderStatus, Reservation, TokenHolder,
};

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, location, start_time, end_time, \
     status, created_at, updated_at";

const TICKET_TYPE_COLUMNS: &str =
    "id, event_id, name, description, kind, price, capacity, sold, created_at, updated_at";

const RESERVATION_COLUMNS: &str =
    "id, ticket_type_id, quantity, unit_price, status, created_at, expires_at";

const ORDER_COLUMNS: &str = "id, event_id, order_number, total_amount, status, customer_name, \
     customer_email, customer_phone, created_at, updated_at";

const ATTENDEE_COLUMNS: &str = "a.id, a.order_id, a.order_item_id, a.ticket_type_id, a.name, \
     a.email, a.phone, a.token, a.checked_in, a.checked_in_at, a.created_at";

/// Maps unique-key violations to [`StoreError::Conflict`] so callers can
/// retry with fresh identifiers.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(db.constraint().unwrap_or("unique").to_string());
        }
    }
    StoreError::Database(err)
}

/// Makes `%`, `_` and `\` match literally inside an `ILIKE ... ESCAPE '\'` pattern.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_ticket_type(
        &self,
        ticket_type_id: Uuid,
    ) -> StoreResult<Option<EventTicketType>> {
        let ticket_type = sqlx::query_as::<_, EventTicketType>(&format!(
            "SELECT {TICKET_TYPE_COLUMNS} FROM ticket_types WHERE id = $1"
        ))
        .bind(ticket_type_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ticket_type)
    }

    async fn fetch_reservation(&self, reservation_id: Uuid) -> StoreResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn fetch_attendee(&self, attendee_id: Uuid) -> StoreResult<Option<Attendee>> {
        let attendee = sqlx::query_as::<_, Attendee>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees a WHERE a.id = $1"
        ))
        .bind(attendee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attendee)
    }

    async fn write_bundle(
        tx: &mut Transaction<'_, Postgres>,
        bundle: &OrderBundle,
    ) -> StoreResult<()> {
        let order = &bundle.order;
        sqlx::query(
            "INSERT INTO orders (id, event_id, order_number, total_amount, status, customer_name, \
             customer_email, customer_phone, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9)",
        )
        .bind(order.id)
        .bind(order.event_id)
        .bind(&order.order_number)
        .bind(order.total_amount)
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(classify)?;

        for item in &bundle.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, ticket_type_id, quantity, unit_price, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(item.order_id)
            .bind(item.ticket_type_id)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.created_at)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        }

        for attendee in &bundle.attendees {
            sqlx::query(
                "INSERT INTO attendees (id, order_id, order_item_id, ticket_type_id, name, email, \
                 phone, token, checked_in, checked_in_at, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, NULL, $9)",
            )
            .bind(attendee.id)
            .bind(attendee.order_id)
            .bind(attendee.order_item_id)
            .bind(attendee.ticket_type_id)
            .bind(&attendee.name)
            .bind(&attendee.email)
            .bind(&attendee.phone)
            .bind(&attendee.token)
            .bind(attendee.created_at)
            .execute(&mut **tx)
            .await
            .map_err(classify)?;
        }

        for reservation_id in &bundle.reservation_ids {
            let committed = sqlx::query(
                "UPDATE reservations SET status = 'committed' WHERE id = $1 AND status = 'held'",
            )
            .bind(reservation_id)
            .execute(&mut **tx)
            .await?;
            if committed.rows_affected() != 1 {
                return Err(StoreError::Lapsed(*reservation_id));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TicketingStore for PgStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, location, start_time, \
             end_time, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(event.id)
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.status)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> StoreResult<Conditional<Event>> {
        let updated = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET title = $2, description = $3, location = $4, start_time = $5, \
             end_time = $6, status = $7, updated_at = $8 \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.status)
        .bind(event.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated.map_or(Conditional::Missing, Conditional::Applied))
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<Conditional<Event>> {
        let deleted = sqlx::query_as::<_, Event>(&format!(
            "DELETE FROM events e WHERE e.id = $1 \
             AND NOT EXISTS (SELECT 1 FROM orders o WHERE o.event_id = e.id) \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(event) = deleted {
            return Ok(Conditional::Applied(event));
        }
        Ok(self
            .get_event(event_id)
            .await?
            .map_or(Conditional::Missing, Conditional::Rejected))
    }

    async fn get_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn list_events(&self, organizer_id: Uuid) -> StoreResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn insert_ticket_type(&self, ticket_type: &EventTicketType) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO ticket_types (id, event_id, name, description, kind, price, capacity, \
             sold, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9)",
        )
        .bind(ticket_type.id)
        .bind(ticket_type.event_id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.kind)
        .bind(ticket_type.price)
        .bind(ticket_type.capacity)
        .bind(ticket_type.created_at)
        .bind(ticket_type.updated_at)
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn update_ticket_type(
        &self,
        ticket_type: &EventTicketType,
    ) -> StoreResult<Conditional<EventTicketType>> {
        let updated = sqlx::query_as::<_, EventTicketType>(&format!(
            "UPDATE ticket_types SET name = $2, description = $3, kind = $4, price = $5, \
             capacity = $6, updated_at = $7 \
             WHERE id = $1 AND ($6::INTEGER IS NULL OR $6::INTEGER >= sold) \
             RETURNING {TICKET_TYPE_COLUMNS}"
        ))
        .bind(ticket_type.id)
        .bind(&ticket_type.name)
        .bind(&ticket_type.description)
        .bind(ticket_type.kind)
        .bind(ticket_type.price)
        .bind(ticket_type.capacity)
        .bind(ticket_type.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(ticket_type) = updated {
            return Ok(Conditional::Applied(ticket_type));
        }
        Ok(self
            .fetch_ticket_type(ticket_type.id)
            .await?
            .map_or(Conditional::Missing, Conditional::Rejected))
    }

    async fn delete_ticket_type(&self, ticket_type_id: Uuid) -> StoreResult<Conditional<EventTicketType>> {
        let deleted = sqlx::query_as::<_, EventTicketType>(&format!(
            "DELETE FROM ticket_types t WHERE t.id = $1 AND t.sold = 0 \
             AND NOT EXISTS (SELECT 1 FROM order_items i WHERE i.ticket_type_id = t.id) \
             RETURNING {TICKET_TYPE_COLUMNS}"
        ))
        .bind(ticket_type_id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(ticket_type) = deleted {
            return Ok(Conditional::Applied(ticket_type));
        }
        Ok(self
            .fetch_ticket_type(ticket_type_id)
            .await?
            .map_or(Conditional::Missing, Conditional::Rejected))
    }

    async fn get_ticket_type(&self, ticket_type_id: Uuid) -> StoreResult<Option<EventTicketType>> {
        self.fetch_ticket_type(ticket_type_id).await
    }

    async fn list_ticket_types(&self, event_id: Uuid) -> StoreResult<Vec<EventTicketType>> {
        let ticket_types = sqlx::query_as::<_, EventTicketType>(&format!(
            "SELECT {TICKET_TYPE_COLUMNS} FROM ticket_types WHERE event_id = $1 ORDER BY created_at"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ticket_types)
    }

    async fn reserve_capacity(
        &self,
        hold: &HoldRequest,
    ) -> StoreResult<Conditional<Reservation, EventTicketType>> {
        // The row lock taken by the UPDATE serializes competing buyers; the
        // predicate is re-evaluated against the committed count. The sum is
        // taken in BIGINT so an oversized hold is rejected instead of raising
        // an integer overflow.
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "WITH bumped AS ( \
                 UPDATE ticket_types SET sold = sold + $3, updated_at = $4 \
                 WHERE id = $2 AND sold::BIGINT + $3 <= COALESCE(capacity, 2147483647) \
                 RETURNING id, price \
             ) \
             INSERT INTO reservations (id, ticket_type_id, quantity, unit_price, status, created_at, expires_at) \
             SELECT $1, bumped.id, $3, bumped.price, 'held'::reservation_status, $4, $5 FROM bumped \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(hold.reservation_id)
        .bind(hold.ticket_type_id)
        .bind(hold.quantity)
        .bind(hold.created_at)
        .bind(hold.expires_at)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(reservation) = reservation {
            return Ok(Conditional::Applied(reservation));
        }
        Ok(self
            .fetch_ticket_type(hold.ticket_type_id)
            .await?
            .map_or(Conditional::Missing, Conditional::Rejected))
    }

    async fn release_reservation(&self, reservation_id: Uuid) -> StoreResult<Conditional<Reservation>> {
        let mut tx = self.pool.begin().await?;
        let released = sqlx::query_as::<_, Reservation>(&format!(
            "UPDATE reservations SET status = 'released' WHERE id = $1 AND status = 'held' \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(released) = released else {
            tx.rollback().await?;
            return Ok(self
                .fetch_reservation(reservation_id)
                .await?
                .map_or(Conditional::Missing, Conditional::Rejected));
        };

        sqlx::query(
            "UPDATE ticket_types SET sold = GREATEST(sold - $2, 0), updated_at = NOW() WHERE id = $1",
        )
        .bind(released.ticket_type_id)
        .bind(released.quantity)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Conditional::Applied(released))
    }

    async fn commit_reservation(&self, reservation_id: Uuid) -> StoreResult<Conditional<Reservation>> {
        let committed = sqlx::query_as::<_, Reservation>(&format!(
            "UPDATE reservations SET status = 'committed' WHERE id = $1 AND status = 'held' \
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(reservation) = committed {
            return Ok(Conditional::Applied(reservation));
        }
        Ok(self
            .fetch_reservation(reservation_id)
            .await?
            .map_or(Conditional::Missing, Conditional::Rejected))
    }

    async fn release_expired_reservations(&self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        let released = sqlx::query_as::<_, Reservation>(&format!(
            "WITH expired AS ( \
                 UPDATE reservations SET status = 'released' \
                 WHERE status = 'held' AND expires_at < $1 \
                 RETURNING {RESERVATION_COLUMNS} \
             ), returned AS ( \
                 UPDATE ticket_types t SET sold = GREATEST(t.sold - e.total, 0), updated_at = $1 \
                 FROM (SELECT ticket_type_id, SUM(quantity)::INTEGER AS total \
                       FROM expired GROUP BY ticket_type_id) e \
                 WHERE t.id = e.ticket_type_id \
             ) \
             SELECT {RESERVATION_COLUMNS} FROM expired"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(released)
    }

    async fn token_exists(&self, token: &str) -> StoreResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM attendees WHERE token = $1)")
                .bind(token)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn complete_order(&self, bundle: &OrderBundle) -> StoreResult<Order> {
        let mut tx = self.pool.begin().await?;
        Self::write_bundle(&mut tx, bundle).await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = 'completed', updated_at = NOW() WHERE id = $1 \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(bundle.order.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn discard_order(&self, order_id: Uuid, reservation_ids: &[Uuid]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        // Waits out a `complete_order` still in flight for the same holds, so
        // the delete below sees its rows once it has committed.
        sqlx::query("SELECT id FROM reservations WHERE id = ANY($1) FOR UPDATE")
            .bind(reservation_ids)
            .fetch_all(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "WITH reclaimed AS ( \
                 UPDATE reservations SET status = 'released' \
                 WHERE id = ANY($1) AND status IN ('held', 'committed') \
                 RETURNING ticket_type_id, quantity \
             ) \
             UPDATE ticket_types t SET sold = GREATEST(t.sold - r.total, 0), updated_at = NOW() \
             FROM (SELECT ticket_type_id, SUM(quantity)::INTEGER AS total \
                   FROM reclaimed GROUP BY ticket_type_id) r \
             WHERE t.id = r.ticket_type_id",
        )
        .bind(reservation_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<OrderDetails>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, ticket_type_id, quantity, unit_price, created_at \
             FROM order_items WHERE order_id = $1 ORDER BY created_at, id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        let attendees = sqlx::query_as::<_, Attendee>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees a WHERE a.order_id = $1 \
             ORDER BY a.created_at, a.id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

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
        let mut tx = self.pool.begin().await?;
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(order) = order else {
            return Ok(CancelOutcome::Missing);
        };
        if order.status != from {
            return Ok(CancelOutcome::StatusMismatch(order.status));
        }

        // Locking the attendee rows makes a concurrent check-in wait for us.
        let flags: Vec<(bool,)> =
            sqlx::query_as("SELECT checked_in FROM attendees WHERE order_id = $1 FOR UPDATE")
                .bind(order_id)
                .fetch_all(&mut *tx)
                .await?;
        if flags.iter().any(|(checked_in,)| *checked_in) {
            return Ok(CancelOutcome::AttendeesCheckedIn);
        }

        sqlx::query("DELETE FROM attendees WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE ticket_types t SET sold = GREATEST(t.sold - i.quantity, 0), updated_at = NOW() \
             FROM order_items i WHERE i.order_id = $1 AND t.id = i.ticket_type_id",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(to)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(CancelOutcome::Cancelled(order))
    }

    async fn find_attendee_by_token(&self, token: &str) -> StoreResult<Option<TokenHolder>> {
        let holder = sqlx::query_as::<_, TokenHolder>(&format!(
            "SELECT {ATTENDEE_COLUMNS}, o.event_id FROM attendees a \
             JOIN orders o ON o.id = a.order_id WHERE a.token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(holder)
    }

    async fn get_attendee(&self, attendee_id: Uuid) -> StoreResult<Option<TokenHolder>> {
        let holder = sqlx::query_as::<_, TokenHolder>(&format!(
            "SELECT {ATTENDEE_COLUMNS}, o.event_id FROM attendees a \
             JOIN orders o ON o.id = a.order_id WHERE a.id = $1"
        ))
        .bind(attendee_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(holder)
    }

    async fn mark_checked_in(
        &self,
        attendee_id: Uuid,
        at: DateTime<Utc>,
    ) -> StoreResult<Conditional<Attendee>> {
        let updated = sqlx::query_as::<_, Attendee>(&format!(
            "UPDATE attendees a SET checked_in = TRUE, checked_in_at = $2 \
             WHERE a.id = $1 AND NOT a.checked_in RETURNING {ATTENDEE_COLUMNS}"
        ))
        .bind(attendee_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(attendee) = updated {
            return Ok(Conditional::Applied(attendee));
        }
        Ok(self
            .fetch_attendee(attendee_id)
            .await?
            .map_or(Conditional::Missing, Conditional::Rejected))
    }

    async fn clear_check_in(&self, attendee_id: Uuid) -> StoreResult<Conditional<Attendee>> {
        let updated = sqlx::query_as::<_, Attendee>(&format!(
            "UPDATE attendees a SET checked_in = FALSE, checked_in_at = NULL \
             WHERE a.id = $1 AND a.checked_in RETURNING {ATTENDEE_COLUMNS}"
        ))
        .bind(attendee_id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(attendee) = updated {
            return Ok(Conditional::Applied(attendee));
        }
        Ok(self
            .fetch_attendee(attendee_id)
            .await?
            .map_or(Conditional::Missing, Conditional::Rejected))
    }

    async fn list_attendees(
        &self,
        event_id: Uuid,
        search: Option<&str>,
    ) -> StoreResult<Vec<AttendeeListing>> {
        let pattern = search.map(|needle| format!("%{}%", escape_like(needle.trim())));
        let listings = sqlx::query_as::<_, AttendeeListing>(&format!(
            "SELECT {ATTENDEE_COLUMNS}, t.name AS ticket_type_name FROM attendees a \
             JOIN orders o ON o.id = a.order_id \
             JOIN ticket_types t ON t.id = a.ticket_type_id \
             WHERE o.event_id = $1 \
             AND ($2::TEXT IS NULL OR a.name ILIKE $2 ESCAPE '\\' OR a.email ILIKE $2 ESCAPE '\\') \
             ORDER BY a.created_at DESC"
        ))
        .bind(event_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(listings)
    }

    async fn event_summary(&self, event_id: Uuid) -> StoreResult<EventSummary> {
        let summary = sqlx::query_as::<_, EventSummary>(
            "SELECT $1::UUID AS event_id, \
               (SELECT COUNT(*) FROM orders WHERE event_id = $1 AND status = 'completed') AS orders, \
               (SELECT COALESCE(SUM(total_amount), 0) FROM orders \
                  WHERE event_id = $1 AND status = 'completed') AS revenue, \
               (SELECT COALESCE(SUM(i.quantity), 0)::BIGINT FROM order_items i \
                  JOIN orders o ON o.id = i.order_id \
                  WHERE o.event_id = $1 AND o.status = 'completed') AS tickets_sold, \
               (SELECT COUNT(*) FROM attendees a JOIN orders o ON o.id = a.order_id \
                  WHERE o.event_id = $1) AS attendees, \
               (SELECT COUNT(*) FROM attendees a JOIN orders o ON o.id = a.order_id \
                  WHERE o.event_id = $1 AND a.checked_in) AS checked_in",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    async fn dashboard_summary(&self, organizer_id: Uuid) -> StoreResult<DashboardSummary> {
        let summary = sqlx::query_as::<_, DashboardSummary>(
            "SELECT \
               (SELECT COUNT(*) FROM events WHERE organizer_id = $1) AS events, \
               (SELECT COUNT(*) FROM events WHERE organizer_id = $1 AND status = 'published') \
                  AS published_events, \
               (SELECT COALESCE(SUM(i.quantity), 0)::BIGINT FROM order_items i \
                  JOIN orders o ON o.id = i.order_id JOIN events e ON e.id = o.event_id \
                  WHERE e.organizer_id = $1 AND o.status = 'completed') AS tickets_sold, \
               (SELECT COALESCE(SUM(o.total_amount), 0) FROM orders o \
                  JOIN events e ON e.id = o.event_id \
                  WHERE e.organizer_id = $1 AND o.status = 'completed') AS revenue",
        )
        .bind(organizer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("ada"), "ada");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
