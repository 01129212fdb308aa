use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn new(organizer_id: Uuid, draft: EventDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organizer_id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            location: draft.location,
            start_time: draft.start_time,
            end_time: draft.end_time,
            status: draft.status.unwrap_or(EventStatus::Draft),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the editable fields, keeping the current status when the
    /// draft does not name one.
    pub fn apply(&mut self, draft: EventDraft, now: DateTime<Utc>) {
        self.title = draft.title.trim().to_string();
        self.description = draft.description;
        self.location = draft.location;
        self.start_time = draft.start_time;
        self.end_time = draft.end_time;
        if let Some(status) = draft.status {
            self.status = status;
        }
        self.updated_at = now;
    }

    pub fn is_on_sale(&self) -> bool {
        self.status == EventStatus::Published
    }
}

/// Organizer-supplied fields for creating or editing an event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<EventStatus>,
}

impl EventDraft {
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("event title must not be empty".to_string());
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err("event cannot end before it starts".to_string());
            }
        }
        Ok(())
    }
}
