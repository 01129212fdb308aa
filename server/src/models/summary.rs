use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Sales and attendance figures for one event. Only completed orders count
/// towards revenue and sold units.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct EventSummary {
    pub event_id: Uuid,
    pub orders: i64,
    pub revenue: Decimal,
    pub tickets_sold: i64,
    pub attendees: i64,
    pub checked_in: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct DashboardSummary {
    pub events: i64,
    pub published_events: i64,
    pub tickets_sold: i64,
    pub revenue: Decimal,
}
