use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{attendees, events, health_check, orders, tickets};
use crate::services::Services;

pub fn create_routes(services: Services, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(events::dashboard))
        .route("/events", post(events::create_event).get(events::list_events))
        .route(
            "/events/:event_id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:event_id/summary", get(events::event_summary))
        .route(
            "/events/:event_id/ticket-types",
            get(tickets::list_ticket_types).post(tickets::create_ticket_type),
        )
        .route(
            "/ticket-types/:ticket_type_id",
            put(tickets::update_ticket_type).delete(tickets::delete_ticket_type),
        )
        .route("/events/:event_id/orders", post(orders::place_order))
        .route("/orders/:order_id", get(orders::get_order))
        .route("/orders/:order_id/cancel", post(orders::cancel_order))
        .route("/orders/:order_id/refund", post(orders::refund_order))
        .route("/events/:event_id/attendees", get(attendees::list_attendees))
        .route("/events/:event_id/check-in", post(attendees::check_in))
        .route(
            "/attendees/:attendee_id/undo-check-in",
            post(attendees::undo_check_in),
        )
        .with_state(services)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.allowed_origins))
}
