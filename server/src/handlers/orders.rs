use axum::extract::{Path, State};
use axum::response::Response;
use uuid::Uuid;

use crate::models::OrderRequest;
use crate::services::Services;
use crate::utils::response::{created, success};
use crate::utils::{ApiJson, AppError, OrganizerId};

/// Public checkout. The response carries every issued attendee token.
pub async fn place_order(
    State(services): State<Services>,
    Path(event_id): Path<Uuid>,
    ApiJson(request): ApiJson<OrderRequest>,
) -> Result<Response, AppError> {
    let details = services.orders.place_order(event_id, request).await?;
    Ok(created(details, "Order placed"))
}

pub async fn get_order(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(order_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let details = services.orders.get_order(organizer_id, order_id).await?;
    Ok(success(details, "Order retrieved"))
}

pub async fn cancel_order(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(order_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let order = services.orders.cancel_order(organizer_id, order_id).await?;
    Ok(success(order, "Order cancelled"))
}

pub async fn refund_order(
    State(services): State<Services>,
    OrganizerId(organizer_id): OrganizerId,
    Path(order_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let order = services.orders.refund_order(organizer_id, order_id).await?;
    Ok(success(order, "Order refunded"))
}
