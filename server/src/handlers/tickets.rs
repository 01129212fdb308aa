use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::models::TicketTypeDraft;
use crate::services::Services;
use crate::utils::response::{created, empty_success, success};
use crate::utils::{ApiJson, AppError, OrganizerId};

/// Public: what is on sale for an event and how much is left.
pub async fn list_ticket_types(
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let ticket_types = services.catalog.list_ticket_types(event_id).await?;
    Ok(success(ticket_types, "Ticket types retrieved"))
}

pub async fn create_ticket_type(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(event_id): Path<Uuid>,
    ApiJson(draft): ApiJson<TicketTypeDraft>,
) -> Result<Response, AppError> {
    let ticket_type = services
        .catalog
        .create_ticket_type(organizer_id, event_id, draft)
        .await?;
    Ok(created(ticket_type, "Ticket type created"))
}

pub async fn update_ticket_type(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(ticket_type_id): Path<Uuid>,
    ApiJson(draft): ApiJson<TicketTypeDraft>,
) -> Result<Response, AppError> {
    let ticket_type = services
        .catalog
        .update_ticket_type(organizer_id, ticket_type_id, draft)
        .await?;
    Ok(success(ticket_type, "Ticket type updated"))
}

pub async fn delete_ticket_type(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(ticket_type_id): Path<Uuid>,
) -> Result<Response, AppError> {
    services
        .catalog
        .delete_ticket_type(organizer_id, ticket_type_id)
        .await?;
    Ok(empty_success("Ticket type deleted"))
}
