mod common;

use rust_decimal::Decimal;
use uuid::Uuid;

use common::{cart, Fixture};
use ticketing_server::models::{OrderDetails, OrderStatus};
use ticketing_server::services::TicketingError;

async fn buy(fx: &Fixture, quantity: u32) -> OrderDetails {
    let general = fx.ticket_type("General", 2500, Some(20)).await;
    fx.services
        .orders
        .place_order(fx.event.id, cart(&[(general.id, quantity)]))
        .await
        .unwrap()
}

#[tokio::test]
async fn second_scan_reports_the_original_time() {
    let fx = Fixture::new().await;
    let order = buy(&fx, 1).await;
    let token = &order.attendees[0].token;

    let admitted = fx.services.check_in.check_in(token, fx.event.id).await.unwrap();
    assert!(admitted.checked_in);
    let first_at = admitted.checked_in_at.unwrap();

    match fx.services.check_in.check_in(token, fx.event.id).await {
        Err(TicketingError::AlreadyCheckedIn { checked_in_at }) => assert_eq!(checked_in_at, Some(first_at)),
        other => panic!("expected AlreadyCheckedIn, got {other:?}"),
    }
}

#[tokio::test]
async fn racing_scanners_admit_once() {
    let fx = Fixture::new().await;
    let order = buy(&fx, 1).await;
    let token = order.attendees[0].token.clone();

    let (a, b) = tokio::join!(
        fx.services.check_in.check_in(&token, fx.event.id),
        fx.services.check_in.check_in(&token, fx.event.id),
    );
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, Err(TicketingError::AlreadyCheckedIn { checked_in_at: Some(_) }))));
}

#[tokio::test]
async fn token_from_another_event_is_refused() {
    let fx = Fixture::new().await;
    let order = buy(&fx, 1).await;
    let other = fx.another_event("Matinee").await;

    let err = fx
        .services
        .check_in
        .check_in(&order.attendees[0].token, other.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TicketingError::EventMismatch));

    // The refused scan must not burn the ticket.
    fx.services
        .check_in
        .check_in(&order.attendees[0].token, fx.event.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_and_blank_tokens() {
    let fx = Fixture::new().await;
    assert!(matches!(
        fx.services.check_in.check_in("0123456789abcdef0123456789abcdef", fx.event.id).await,
        Err(TicketingError::NotFound("attendee"))
    ));
    assert!(matches!(
        fx.services.check_in.check_in("   ", fx.event.id).await,
        Err(TicketingError::Validation(_))
    ));
}

#[tokio::test]
async fn organizer_can_undo_a_mistaken_scan() {
    let fx = Fixture::new().await;
    let order = buy(&fx, 1).await;
    let attendee = &order.attendees[0];
    let check_in = &fx.services.check_in;

    assert!(matches!(
        check_in.undo_check_in(fx.organizer, attendee.id).await,
        Err(TicketingError::Conflict(_))
    ));

    check_in.check_in(&attendee.token, fx.event.id).await.unwrap();
    assert!(matches!(
        check_in.undo_check_in(Uuid::new_v4(), attendee.id).await,
        Err(TicketingError::Forbidden)
    ));

    let reverted = check_in.undo_check_in(fx.organizer, attendee.id).await.unwrap();
    assert!(!reverted.checked_in);
    assert!(reverted.checked_in_at.is_none());

    check_in.check_in(&attendee.token, fx.event.id).await.unwrap();
}

#[tokio::test]
async fn cancellation_returns_units_and_voids_tokens() {
    let fx = Fixture::new().await;
    let order = buy(&fx, 2).await;
    let ticket_type_id = order.items[0].ticket_type_id;
    assert_eq!(fx.sold(ticket_type_id).await, 2);

    let cancelled = fx
        .services
        .orders
        .cancel_order(fx.organizer, order.order.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(fx.sold(ticket_type_id).await, 0);

    assert!(matches!(
        fx.services.check_in.check_in(&order.attendees[0].token, fx.event.id).await,
        Err(TicketingError::NotFound(_))
    ));
    assert!(matches!(
        fx.services.orders.refund_order(fx.organizer, order.order.id).await,
        Err(TicketingError::Conflict(_))
    ));
}

#[tokio::test]
async fn admitted_orders_cannot_be_refunded() {
    let fx = Fixture::new().await;
    let order = buy(&fx, 2).await;
    fx.services
        .check_in
        .check_in(&order.attendees[1].token, fx.event.id)
        .await
        .unwrap();

    assert!(matches!(
        fx.services.orders.refund_order(fx.organizer, order.order.id).await,
        Err(TicketingError::Conflict(_))
    ));
    assert!(matches!(
        fx.services.orders.cancel_order(Uuid::new_v4(), order.order.id).await,
        Err(TicketingError::Forbidden)
    ));

    let still = fx
        .services
        .orders
        .get_order(fx.organizer, order.order.id)
        .await
        .unwrap();
    assert_eq!(still.order.status, OrderStatus::Completed);
    assert_eq!(still.attendees.len(), 2);
}

#[tokio::test]
async fn summary_counts_completed_orders_and_admissions() {
    let fx = Fixture::new().await;
    let kept = buy(&fx, 3).await;
    let refunded = buy(&fx, 1).await;
    fx.services
        .check_in
        .check_in(&kept.attendees[0].token, fx.event.id)
        .await
        .unwrap();
    fx.services
        .orders
        .refund_order(fx.organizer, refunded.order.id)
        .await
        .unwrap();

    let summary = fx
        .services
        .catalog
        .event_summary(fx.organizer, fx.event.id)
        .await
        .unwrap();
    assert_eq!(summary.orders, 1);
    assert_eq!(summary.tickets_sold, 3);
    assert_eq!(summary.revenue, Decimal::new(7500, 2));
    assert_eq!(summary.attendees, 3);
    assert_eq!(summary.checked_in, 1);

    let dashboard = fx.services.catalog.dashboard_summary(fx.organizer).await.unwrap();
    assert_eq!(dashboard.events, 1);
    assert_eq!(dashboard.published_events, 1);
    assert_eq!(dashboard.tickets_sold, 3);

    let found = fx
        .services
        .catalog
        .list_attendees(fx.organizer, fx.event.id, Some("ADA@"))
        .await
        .unwrap();
    assert_eq!(found.len(), 3);
    assert_eq!(found[0].ticket_type_name, "General");
    let none = fx
        .services
        .catalog
        .list_attendees(fx.organizer, fx.event.id, Some("grace"))
        .await
        .unwrap();
    assert!(none.is_empty());
}
