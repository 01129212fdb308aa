use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::models::EventDraft;
use crate::services::Services;
use crate::utils::response::{created, empty_success, success};
use crate::utils::{ApiJson, AppError, OrganizerId};

pub async fn create_event(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    ApiJson(draft): ApiJson<EventDraft>,
) -> Result<Response, AppError> {
    let event = services.catalog.create_event(organizer_id, draft).await?;
    Ok(created(event, "Event created"))
}

pub async fn list_events(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
) -> Result<Response, AppError> {
    let events = services.catalog.list_events(organizer_id).await?;
    Ok(success(events, "Events retrieved"))
}

pub async fn get_event(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = services.catalog.owned_event(organizer_id, event_id).await?;
    Ok(success(event, "Event retrieved"))
}

pub async fn update_event(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(event_id): Path<Uuid>,
    ApiJson(draft): ApiJson<EventDraft>,
) -> Result<Response, AppError> {
    let event = services.catalog.update_event(organizer_id, event_id, draft).await?;
    Ok(success(event, "Event updated"))
}

pub async fn delete_event(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    services.catalog.delete_event(organizer_id, event_id).await?;
    Ok(empty_success("Event deleted"))
}

pub async fn event_summary(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let summary = services.catalog.event_summary(organizer_id, event_id).await?;
    Ok(success(summary, "Event summary retrieved"))
}

pub async fn dashboard(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
) -> Result<Response, AppError> {
    let summary = services.catalog.dashboard_summary(organizer_id).await?;
    Ok(success(summary, "Dashboard retrieved"))
}
