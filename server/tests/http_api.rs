use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ticketing_server::config::{Config, CoreSettings};
use ticketing_server::routes::create_routes;
use ticketing_server::services::Services;
use ticketing_server::store::MemoryStore;

fn app() -> Router {
    let config = Config::from_lookup(|_| None);
    let services = Services::new(Arc::new(MemoryStore::new()), &CoreSettings::default());
    create_routes(services, &config)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    organizer: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(organizer) = organizer {
        request = request.header("x-user-id", organizer.to_string());
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn published_event(app: &Router, organizer: Uuid) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/events",
        Some(organizer),
        Some(json!({
            "title": "Rust Conf Afterparty",
            "location": "Pier 48",
            "start_time": "2031-09-12T19:00:00Z",
            "status": "published"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn ticket_type(app: &Router, organizer: Uuid, event_id: &str, capacity: i32) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/events/{event_id}/ticket-types"),
        Some(organizer),
        Some(json!({ "name": "General", "kind": "paid", "price": "25.00", "capacity": capacity })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

fn checkout(ticket_type_id: &str, quantity: u32) -> Value {
    json!({
        "lines": [{ "ticket_type_id": ticket_type_id, "quantity": quantity }],
        "customer": { "name": "Grace Hopper", "email": "grace@example.com" }
    })
}

#[tokio::test]
async fn health_check_carries_security_headers() {
    let app = app();
    let response = app
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["cache-control"], "no-store");
    assert!(response.headers().get("strict-transport-security").is_none());
}

#[tokio::test]
async fn organizer_routes_require_identity() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = send(&app, Method::GET, "/dashboard", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_and_door_scan_end_to_end() {
    let app = app();
    let organizer = Uuid::new_v4();
    let event_id = published_event(&app, organizer).await;
    let ticket_type_id = ticket_type(&app, organizer, &event_id, 10).await;

    let (status, listing) = send(&app, Method::GET, &format!("/events/{event_id}/ticket-types"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);

    let (status, order) = send(
        &app,
        Method::POST,
        &format!("/events/{event_id}/orders"),
        None,
        Some(checkout(&ticket_type_id, 2)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["data"]["status"], "completed");
    assert_eq!(order["data"]["total_amount"], "50.00");
    let attendees = order["data"]["attendees"].as_array().unwrap();
    assert_eq!(attendees.len(), 2);
    let token = attendees[0]["token"].as_str().unwrap().to_string();

    let scan = json!({ "token": token });
    let (status, admitted) = send(
        &app,
        Method::POST,
        &format!("/events/{event_id}/check-in"),
        Some(organizer),
        Some(scan.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{admitted}");
    assert_eq!(admitted["data"]["checked_in"], true);

    let (status, again) = send(
        &app,
        Method::POST,
        &format!("/events/{event_id}/check-in"),
        Some(organizer),
        Some(scan),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["error"]["code"], "ALREADY_CHECKED_IN");
    assert_eq!(again["error"]["details"]["checked_in_at"], admitted["data"]["checked_in_at"]);

    let (status, summary) = send(
        &app,
        Method::GET,
        &format!("/events/{event_id}/summary"),
        Some(organizer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["data"]["tickets_sold"], 2);
    assert_eq!(summary["data"]["checked_in"], 1);
}

#[tokio::test]
async fn sold_out_checkout_names_the_ticket_type() {
    let app = app();
    let organizer = Uuid::new_v4();
    let event_id = published_event(&app, organizer).await;
    let ticket_type_id = ticket_type(&app, organizer, &event_id, 1).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/events/{event_id}/orders"),
        None,
        Some(checkout(&ticket_type_id, 2)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "OUT_OF_STOCK");
    assert_eq!(body["error"]["details"]["ticket_type_id"], ticket_type_id.as_str());
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let app = app();
    let organizer = Uuid::new_v4();
    let event_id = published_event(&app, organizer).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/events/{event_id}/orders"),
        None,
        Some(json!({ "lines": "everything" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn foreign_organizers_are_forbidden() {
    let app = app();
    let owner = Uuid::new_v4();
    let event_id = published_event(&app, owner).await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/events/{event_id}/attendees"),
        Some(Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = send(&app, Method::DELETE, &format!("/events/{event_id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, &format!("/events/{event_id}"), Some(owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
