use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{bounded, ensure_owner, TicketingError};
use crate::models::{
    AttendeeListing, DashboardSummary, Event, EventDraft, EventSummary, EventTicketType,
    TicketTypeDraft,
};
use crate::store::{Conditional, TicketingStore};

/// Organizer-facing management of events, ticket types and reports.
pub struct Catalog {
    store: Arc<dyn TicketingStore>,
    timeout: Duration,
}

impl Catalog {
    pub fn new(store: Arc<dyn TicketingStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Loads an event and verifies the caller organizes it.
    pub async fn owned_event(&self, organizer_id: Uuid, event_id: Uuid) -> Result<Event, TicketingError> {
        let event = bounded(self.timeout, "get_event", self.store.get_event(event_id))
            .await?
            .ok_or(TicketingError::NotFound("event"))?;
        ensure_owner(&event, organizer_id)?;
        Ok(event)
    }

    #[instrument(skip(self, draft), fields(organizer_id = %organizer_id))]
    pub async fn create_event(&self, organizer_id: Uuid, draft: EventDraft) -> Result<Event, TicketingError> {
        draft.validate().map_err(TicketingError::Validation)?;
        let event = Event::new(organizer_id, draft, Utc::now());
        bounded(self.timeout, "insert_event", self.store.insert_event(&event)).await?;
        info!(event_id = %event.id, "Event created");
        Ok(event)
    }

    pub async fn list_events(&self, organizer_id: Uuid) -> Result<Vec<Event>, TicketingError> {
        Ok(bounded(self.timeout, "list_events", self.store.list_events(organizer_id)).await?)
    }

    pub async fn update_event(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        draft: EventDraft,
    ) -> Result<Event, TicketingError> {
        draft.validate().map_err(TicketingError::Validation)?;
        let mut event = self.owned_event(organizer_id, event_id).await?;
        event.apply(draft, Utc::now());

        match bounded(self.timeout, "update_event", self.store.update_event(&event)).await? {
            Conditional::Applied(event) => Ok(event),
            Conditional::Rejected(_) => Err(TicketingError::Conflict("event changed concurrently".to_string())),
            Conditional::Missing => Err(TicketingError::NotFound("event")),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_event(&self, organizer_id: Uuid, event_id: Uuid) -> Result<(), TicketingError> {
        self.owned_event(organizer_id, event_id).await?;
        match bounded(self.timeout, "delete_event", self.store.delete_event(event_id)).await? {
            Conditional::Applied(_) => {
                info!("Event deleted");
                Ok(())
            }
            Conditional::Rejected(_) => Err(TicketingError::Conflict(
                "events with orders cannot be deleted".to_string(),
            )),
            Conditional::Missing => Err(TicketingError::NotFound("event")),
        }
    }

    pub async fn create_ticket_type(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        draft: TicketTypeDraft,
    ) -> Result<EventTicketType, TicketingError> {
        draft.validate().map_err(TicketingError::Validation)?;
        self.owned_event(organizer_id, event_id).await?;

        let ticket_type = EventTicketType::new(event_id, draft, Utc::now());
        bounded(
            self.timeout,
            "insert_ticket_type",
            self.store.insert_ticket_type(&ticket_type),
        )
        .await?;
        info!(ticket_type_id = %ticket_type.id, event_id = %event_id, "Ticket type created");
        Ok(ticket_type)
    }

    /// Public listing shown on the event page.
    pub async fn list_ticket_types(&self, event_id: Uuid) -> Result<Vec<EventTicketType>, TicketingError> {
        bounded(self.timeout, "get_event", self.store.get_event(event_id))
            .await?
            .ok_or(TicketingError::NotFound("event"))?;
        Ok(bounded(
            self.timeout,
            "list_ticket_types",
            self.store.list_ticket_types(event_id),
        )
        .await?)
    }

    pub async fn update_ticket_type(
        &self,
        organizer_id: Uuid,
        ticket_type_id: Uuid,
        draft: TicketTypeDraft,
    ) -> Result<EventTicketType, TicketingError> {
        draft.validate().map_err(TicketingError::Validation)?;
        let mut ticket_type = self.owned_ticket_type(organizer_id, ticket_type_id).await?;
        ticket_type.apply(draft, Utc::now());

        let outcome = bounded(
            self.timeout,
            "update_ticket_type",
            self.store.update_ticket_type(&ticket_type),
        )
        .await?;
        match outcome {
            Conditional::Applied(ticket_type) => Ok(ticket_type),
            Conditional::Rejected(current) => Err(TicketingError::Conflict(format!(
                "capacity cannot drop below the {} units already sold or held",
                current.sold
            ))),
            Conditional::Missing => Err(TicketingError::NotFound("ticket type")),
        }
    }

    pub async fn delete_ticket_type(&self, organizer_id: Uuid, ticket_type_id: Uuid) -> Result<(), TicketingError> {
        self.owned_ticket_type(organizer_id, ticket_type_id).await?;
        let outcome = bounded(
            self.timeout,
            "delete_ticket_type",
            self.store.delete_ticket_type(ticket_type_id),
        )
        .await?;
        match outcome {
            Conditional::Applied(_) => Ok(()),
            Conditional::Rejected(_) => Err(TicketingError::Conflict(
                "ticket types with sold units cannot be deleted".to_string(),
            )),
            Conditional::Missing => Err(TicketingError::NotFound("ticket type")),
        }
    }

    async fn owned_ticket_type(
        &self,
        organizer_id: Uuid,
        ticket_type_id: Uuid,
    ) -> Result<EventTicketType, TicketingError> {
        let ticket_type = bounded(
            self.timeout,
            "get_ticket_type",
            self.store.get_ticket_type(ticket_type_id),
        )
        .await?
        .ok_or(TicketingError::NotFound("ticket type"))?;
        self.owned_event(organizer_id, ticket_type.event_id).await?;
        Ok(ticket_type)
    }

    pub async fn list_attendees(
        &self,
        organizer_id: Uuid,
        event_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<AttendeeListing>, TicketingError> {
        self.owned_event(organizer_id, event_id).await?;
        let search = search.map(str::trim).filter(|needle| !needle.is_empty());
        Ok(bounded(
            self.timeout,
            "list_attendees",
            self.store.list_attendees(event_id, search),
        )
        .await?)
    }

    pub async fn event_summary(&self, organizer_id: Uuid, event_id: Uuid) -> Result<EventSummary, TicketingError> {
        self.owned_event(organizer_id, event_id).await?;
        Ok(bounded(self.timeout, "event_summary", self.store.event_summary(event_id)).await?)
    }

    pub async fn dashboard_summary(&self, organizer_id: Uuid) -> Result<DashboardSummary, TicketingError> {
        Ok(bounded(
            self.timeout,
            "dashboard_summary",
            self.store.dashboard_summary(organizer_id),
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventStatus, TicketKind};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(MemoryStore::new()), Duration::from_secs(1))
    }

    fn event_draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            description: None,
            location: None,
            start_time: Utc::now(),
            end_time: None,
            status: Some(EventStatus::Published),
        }
    }

    fn ticket_draft(capacity: Option<i32>) -> TicketTypeDraft {
        TicketTypeDraft {
            name: "VIP".to_string(),
            description: None,
            kind: TicketKind::Paid,
            price: Decimal::new(9900, 2),
            capacity,
        }
    }

    #[tokio::test]
    async fn foreign_organizers_are_refused() {
        let catalog = catalog();
        let owner = Uuid::new_v4();
        let event = catalog.create_event(owner, event_draft("Gala")).await.unwrap();

        let stranger = Uuid::new_v4();
        assert!(matches!(
            catalog.owned_event(stranger, event.id).await,
            Err(TicketingError::Forbidden)
        ));
        assert!(matches!(
            catalog.create_ticket_type(stranger, event.id, ticket_draft(None)).await,
            Err(TicketingError::Forbidden)
        ));
        assert!(catalog.list_events(stranger).await.unwrap().is_empty());
        assert_eq!(catalog.list_events(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_drafts_are_rejected_before_storage() {
        let catalog = catalog();
        let owner = Uuid::new_v4();
        assert!(matches!(
            catalog.create_event(owner, event_draft("  ")).await,
            Err(TicketingError::Validation(_))
        ));

        let event = catalog.create_event(owner, event_draft("Gala")).await.unwrap();
        let mut free = ticket_draft(None);
        free.kind = TicketKind::Free;
        assert!(matches!(
            catalog.create_ticket_type(owner, event.id, free).await,
            Err(TicketingError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn ticket_types_are_listed_publicly_and_edited_by_owner() {
        let catalog = catalog();
        let owner = Uuid::new_v4();
        let event = catalog.create_event(owner, event_draft("Gala")).await.unwrap();
        let ticket_type = catalog
            .create_ticket_type(owner, event.id, ticket_draft(Some(10)))
            .await
            .unwrap();

        let listed = catalog.list_ticket_types(event.id).await.unwrap();
        assert_eq!(listed, vec![ticket_type.clone()]);

        let mut draft = ticket_draft(Some(20));
        draft.name = "VIP Lounge".to_string();
        let updated = catalog.update_ticket_type(owner, ticket_type.id, draft).await.unwrap();
        assert_eq!(updated.capacity, Some(20));
        assert_eq!(updated.name, "VIP Lounge");

        catalog.delete_ticket_type(owner, ticket_type.id).await.unwrap();
        assert!(catalog.list_ticket_types(event.id).await.unwrap().is_empty());
        assert!(matches!(
            catalog.list_ticket_types(Uuid::new_v4()).await,
            Err(TicketingError::NotFound("event"))
        ));
    }
}
