#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use ticketing_server::config::CoreSettings;
use ticketing_server::models::{
    CartLine, CustomerContact, Event, EventDraft, EventStatus, EventTicketType, OrderRequest,
    TicketKind, TicketTypeDraft,
};
use ticketing_server::services::{Services, TokenSource};
use ticketing_server::store::{MemoryStore, TicketingStore};

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub services: Services,
    pub organizer: Uuid,
    pub event: Event,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_settings(CoreSettings::default()).await
    }

    pub async fn with_settings(settings: CoreSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::assemble(store.clone(), Services::new(store, &settings)).await
    }

    pub async fn with_tokens(tokens: Arc<dyn TokenSource>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let services = Services::with_token_source(store.clone(), &CoreSettings::default(), tokens);
        Self::assemble(store, services).await
    }

    async fn assemble(store: Arc<MemoryStore>, services: Services) -> Self {
        let organizer = Uuid::new_v4();
        let event = services
            .catalog
            .create_event(organizer, published("Launch Night"))
            .await
            .unwrap();
        Self {
            store,
            services,
            organizer,
            event,
        }
    }

    pub async fn another_event(&self, title: &str) -> Event {
        self.services
            .catalog
            .create_event(self.organizer, published(title))
            .await
            .unwrap()
    }

    /// Ticket type on the fixture's event; price in cents.
    pub async fn ticket_type(&self, name: &str, cents: i64, capacity: Option<i32>) -> EventTicketType {
        self.ticket_type_for(self.event.id, name, cents, capacity).await
    }

    pub async fn ticket_type_for(
        &self,
        event_id: Uuid,
        name: &str,
        cents: i64,
        capacity: Option<i32>,
    ) -> EventTicketType {
        let draft = TicketTypeDraft {
            name: name.to_string(),
            description: None,
            kind: if cents == 0 { TicketKind::Free } else { TicketKind::Paid },
            price: Decimal::new(cents, 2),
            capacity,
        };
        self.services
            .catalog
            .create_ticket_type(self.organizer, event_id, draft)
            .await
            .unwrap()
    }

    pub async fn sold(&self, ticket_type_id: Uuid) -> i32 {
        self.store
            .get_ticket_type(ticket_type_id)
            .await
            .unwrap()
            .unwrap()
            .sold
    }
}

pub fn published(title: &str) -> EventDraft {
    EventDraft {
        title: title.to_string(),
        description: Some("Doors at seven".to_string()),
        location: Some("Warehouse 9".to_string()),
        start_time: Utc::now() + chrono::Duration::days(30),
        end_time: None,
        status: Some(EventStatus::Published),
    }
}

pub fn customer() -> CustomerContact {
    CustomerContact {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: None,
    }
}

pub fn cart(lines: &[(Uuid, u32)]) -> OrderRequest {
    OrderRequest {
        lines: lines
            .iter()
            .map(|&(ticket_type_id, quantity)| CartLine {
                ticket_type_id,
                quantity,
            })
            .collect(),
        customer: customer(),
    }
}
