//! The ticketing core: inventory ledger, order orchestration, credential
//! issuance and check-in, plus the organizer catalog that surrounds them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::config::CoreSettings;
use crate::models::Event;
use crate::store::{StoreError, StoreResult, TicketingStore};

pub mod catalog;
pub mod checkin;
pub mod credentials;
pub mod error;
pub mod ledger;
pub mod orders;

pub use catalog::Catalog;
pub use checkin::CheckInValidator;
pub use credentials::{CredentialIssuer, RandomTokens, TokenSource};
pub use error::TicketingError;
pub use ledger::{spawn_reservation_sweeper, InventoryLedger};
pub use orders::OrderOrchestrator;

/// Runs one persistence call under the configured deadline.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, limit_ms = limit.as_millis() as u64, "Persistence call timed out");
            Err(StoreError::Timeout(operation))
        }
    }
}

pub(crate) fn ensure_owner(event: &Event, organizer_id: Uuid) -> Result<(), TicketingError> {
    if event.organizer_id == organizer_id {
        Ok(())
    } else {
        Err(TicketingError::Forbidden)
    }
}

/// Handles to every service, cheap to clone into request handlers.
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<Catalog>,
    pub ledger: Arc<InventoryLedger>,
    pub orders: Arc<OrderOrchestrator>,
    pub check_in: Arc<CheckInValidator>,
}

impl Services {
    pub fn new(store: Arc<dyn TicketingStore>, settings: &CoreSettings) -> Self {
        Self::with_token_source(store, settings, Arc::new(RandomTokens))
    }

    pub fn with_token_source(
        store: Arc<dyn TicketingStore>,
        settings: &CoreSettings,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        let ledger = Arc::new(InventoryLedger::new(store.clone(), settings));
        let issuer = CredentialIssuer::new(store.clone(), tokens, settings.persistence_timeout);
        Self {
            catalog: Arc::new(Catalog::new(store.clone(), settings.persistence_timeout)),
            orders: Arc::new(OrderOrchestrator::new(store.clone(), ledger.clone(), issuer, settings)),
            check_in: Arc::new(CheckInValidator::new(store, settings.persistence_timeout)),
            ledger,
        }
    }
}
