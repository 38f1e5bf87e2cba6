//! End-to-end booking lifecycle against in-memory infrastructure:
//! place → pay → tickets → cancel → refund, plus the failure branches.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{cancel_booking, confirm_payment, place_booking, register_show, test_platform};
use marquee::aggregates::booking::{BookingAction, BookingError};
use marquee::notifications::NotificationRecord;
use marquee::types::{Money, PaymentStatus, SeatCategory, UserId};
use std::time::Duration;

fn three_seat_show() -> Vec<(&'static str, u32, SeatCategory, u64)> {
    vec![
        ("A", 1, SeatCategory::Premium, 120),
        ("A", 2, SeatCategory::Premium, 120),
        ("B", 1, SeatCategory::Normal, 90),
        ("B", 2, SeatCategory::Normal, 90),
    ]
}

#[tokio::test]
async fn full_lifecycle_place_pay_cancel() {
    let fixture = test_platform(600).await;
    let platform = &fixture.platform;
    let user = UserId::new();

    let show_id = register_show(platform, &three_seat_show()).await;

    // Place: seats priced [120, 120, 90] must total 330.
    let (booking_id, terminal) =
        place_booking(platform, user, show_id, &[("A", 1), ("A", 2), ("B", 1)]).await;
    let BookingAction::ChargeIntentOpened { order_ref, .. } = terminal else {
        panic!("expected a charge intent, got {terminal:?}");
    };
    assert!(order_ref.starts_with("order_"));

    let booking = platform
        .ledger
        .state(|s| s.booking(&booking_id).cloned())
        .await
        .expect("booking exists");
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.total_amount, Money::from_major(330));
    assert_eq!(booking.order_ref.as_deref(), Some(order_ref.as_str()));

    // Pay with a valid signature: exactly 3 tickets, one per seat.
    let signature = fixture.gateway.signature_for(&booking_id, "pay_77");
    let result = confirm_payment(platform, booking_id, user, "pay_77", signature).await;
    assert!(matches!(result, BookingAction::PaymentConfirmed { .. }));

    let booking = platform
        .ledger
        .state(|s| s.booking(&booking_id).cloned())
        .await
        .expect("booking exists");
    assert_eq!(booking.payment_status, PaymentStatus::Completed);
    assert_eq!(booking.tickets.len(), 3);
    let mut numbers: Vec<&str> = booking
        .tickets
        .iter()
        .map(|t| t.ticket_number.as_str())
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    assert_eq!(numbers.len(), 3, "ticket numbers must be distinct");
    for (ticket, seat) in booking.tickets.iter().zip(&booking.seats) {
        assert_eq!(ticket.seat, seat.key);
    }

    // Cancel: refund first, then seats release.
    let result = cancel_booking(platform, booking_id, user).await;
    assert!(matches!(result, BookingAction::RefundSucceeded { .. }));

    let (status, available) = platform
        .ledger
        .state(|s| {
            let status = s.booking(&booking_id).map(|b| b.payment_status);
            let available = s
                .seat_map(&show_id)
                .map(|m| m.available_count(chrono::Utc::now()));
            (status, available)
        })
        .await;
    assert_eq!(status, Some(PaymentStatus::Refunded));
    assert_eq!(available, Some(4));

    // Confirmation and cancellation notices both went out.
    let records = fixture.notifier.records();
    assert!(records.contains(&NotificationRecord::Confirmed { user, tickets: 3 }));
    assert!(records.contains(&NotificationRecord::Cancelled { user }));

    // Every transition was persisted: ShowRegistered, BookingOpened,
    // ChargeIntentOpened, PaymentCaptured, CancellationStarted,
    // RefundSucceeded.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fixture.persisted_events(), 6);
}

#[tokio::test]
async fn history_projection_follows_the_ledger() {
    let fixture = test_platform(600).await;
    let platform = &fixture.platform;
    let user = UserId::new();
    let show_id = register_show(platform, &three_seat_show()).await;

    let (booking_id, _) = place_booking(platform, user, show_id, &[("B", 1)]).await;
    let signature = fixture.gateway.signature_for(&booking_id, "pay_1");
    confirm_payment(platform, booking_id, user, "pay_1", signature).await;

    // Projection updates flow through the bus asynchronously.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let history = platform.history.read().await.bookings_for(&user);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, booking_id);
    assert_eq!(history[0].payment_status, PaymentStatus::Completed);
    assert_eq!(history[0].total_amount, Money::from_major(90));
}

#[tokio::test]
async fn invalid_signature_changes_nothing() {
    let fixture = test_platform(600).await;
    let platform = &fixture.platform;
    let user = UserId::new();
    let show_id = register_show(platform, &three_seat_show()).await;

    let (booking_id, _) = place_booking(platform, user, show_id, &[("A", 1)]).await;

    let result =
        confirm_payment(platform, booking_id, user, "pay_1", "deadbeef".to_string()).await;
    let BookingAction::PaymentRejected { error, .. } = result else {
        panic!("expected rejection, got {result:?}");
    };
    assert_eq!(error, BookingError::InvalidSignature);

    let booking = platform
        .ledger
        .state(|s| s.booking(&booking_id).cloned())
        .await
        .expect("booking exists");
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert!(booking.tickets.is_empty());
}

#[tokio::test]
async fn cancelling_an_unpaid_booking_is_rejected_without_refund() {
    let fixture = test_platform(600).await;
    let platform = &fixture.platform;
    let user = UserId::new();
    let show_id = register_show(platform, &three_seat_show()).await;

    let (booking_id, _) = place_booking(platform, user, show_id, &[("A", 1)]).await;

    let result = cancel_booking(platform, booking_id, user).await;
    let BookingAction::CancellationRejected { error, .. } = result else {
        panic!("expected rejection, got {result:?}");
    };
    assert!(matches!(error, BookingError::InvalidState { .. }));

    // Still pending, and no cancellation notice was sent.
    let status = platform
        .ledger
        .state(|s| s.booking(&booking_id).map(|b| b.payment_status))
        .await;
    assert_eq!(status, Some(PaymentStatus::Pending));
    assert!(
        !fixture
            .notifier
            .records()
            .iter()
            .any(|r| matches!(r, NotificationRecord::Cancelled { .. }))
    );
}

#[tokio::test]
async fn refund_failure_leaves_the_booking_completed() {
    let fixture = test_platform(600).await;
    let platform = &fixture.platform;
    let user = UserId::new();
    let show_id = register_show(platform, &three_seat_show()).await;

    let (booking_id, _) = place_booking(platform, user, show_id, &[("A", 1), ("A", 2)]).await;
    let signature = fixture.gateway.signature_for(&booking_id, "pay_9");
    confirm_payment(platform, booking_id, user, "pay_9", signature).await;

    fixture.gateway.fail_refunds(true);
    let result = cancel_booking(platform, booking_id, user).await;
    assert!(matches!(result, BookingAction::RefundFailed { .. }));

    let (status, available) = platform
        .ledger
        .state(|s| {
            (
                s.booking(&booking_id).map(|b| b.payment_status),
                s.seat_map(&show_id)
                    .map(|m| m.available_count(chrono::Utc::now())),
            )
        })
        .await;
    // Never marked refunded without an actual refund; seats stay booked.
    assert_eq!(status, Some(PaymentStatus::Completed));
    assert_eq!(available, Some(2));

    // The retry succeeds once the gateway recovers.
    fixture.gateway.fail_refunds(false);
    let result = cancel_booking(platform, booking_id, user).await;
    assert!(matches!(result, BookingAction::RefundSucceeded { .. }));
}

#[tokio::test]
async fn charge_intent_failure_releases_the_hold() {
    let fixture = test_platform(600).await;
    let platform = &fixture.platform;
    let user = UserId::new();
    let show_id = register_show(platform, &three_seat_show()).await;

    fixture.gateway.fail_charges(true);
    let (booking_id, terminal) = place_booking(platform, user, show_id, &[("A", 1)]).await;
    assert!(matches!(terminal, BookingAction::ChargeIntentFailed { .. }));

    let (status, available) = platform
        .ledger
        .state(|s| {
            (
                s.booking(&booking_id).map(|b| b.payment_status),
                s.seat_map(&show_id)
                    .map(|m| m.available_count(chrono::Utc::now())),
            )
        })
        .await;
    assert_eq!(status, Some(PaymentStatus::Failed));
    // No orphaned holds: every seat is available again.
    assert_eq!(available, Some(4));
}

#[tokio::test]
async fn confirming_someone_elses_booking_is_denied() {
    let fixture = test_platform(600).await;
    let platform = &fixture.platform;
    let owner = UserId::new();
    let stranger = UserId::new();
    let show_id = register_show(platform, &three_seat_show()).await;

    let (booking_id, _) = place_booking(platform, owner, show_id, &[("A", 1)]).await;
    let signature = fixture.gateway.signature_for(&booking_id, "pay_1");

    let result = confirm_payment(platform, booking_id, stranger, "pay_1", signature).await;
    let BookingAction::PaymentRejected { error, .. } = result else {
        panic!("expected rejection, got {result:?}");
    };
    assert_eq!(error, BookingError::AccessDenied);
}
