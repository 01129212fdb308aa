use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One issued seat: a single purchased unit bound to a check-in token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Attendee {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub ticket_type_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub token: String,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An attendee resolved together with the event its order belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TokenHolder {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendee: Attendee,
    pub event_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct AttendeeListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendee: Attendee,
    pub ticket_type_name: String,
}

impl AttendeeListing {
    /// Case-insensitive match on name or email, as used by the attendee search box.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.attendee.name.to_lowercase().contains(&needle)
            || self.attendee.email.to_lowercase().contains(&needle)
    }
}
