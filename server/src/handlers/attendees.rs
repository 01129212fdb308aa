use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;
use uuid::Uuid;

use crate::services::Services;
use crate::utils::response::success;
use crate::utils::{ApiJson, AppError, OrganizerId};

#[derive(Debug, Deserialize)]
pub struct AttendeeQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub token: String,
}

pub async fn list_attendees(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(event_id): Path<Uuid>,
    Query(query): Query<AttendeeQuery>,
) -> Result<Response, AppError> {
    let attendees = services
        .catalog
        .list_attendees(organizer_id, event_id, query.search.as_deref())
        .await?;
    Ok(success(attendees, "Attendees retrieved"))
}

/// Door scan: only the event's organizer (or their staff) may admit.
pub async fn check_in(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(event_id): Path<Uuid>,
    ApiJson(request): ApiJson<CheckInRequest>,
) -> Result<Response, AppError> {
    services.catalog.owned_event(organizer_id, event_id).await?;
    let attendee = services.check_in.check_in(&request.token, event_id).await?;
    Ok(success(attendee, "Attendee checked in"))
}

pub async fn undo_check_in(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(attendee_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let attendee = services
        .check_in
        .undo_check_in(organizer_id, attendee_id)
        .await?;
    Ok(success(attendee, "Check-in reverted"))
}
