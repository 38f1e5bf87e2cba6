//! Concurrency and hold-expiry guarantees: a seat can be held by at most
//! one active booking, no matter how requests interleave.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::{confirm_payment, place_booking, register_show, test_platform};
use marquee::aggregates::booking::{BookingAction, BookingError};
use marquee::types::{PaymentStatus, SeatCategory, UserId};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn concurrent_requests_for_the_same_seat_yield_one_winner() {
    let fixture = test_platform(600).await;
    let platform = Arc::new(fixture.platform);
    let show_id = register_show(&platform, &[("A", 1, SeatCategory::Vip, 200)]).await;

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let platform = Arc::clone(&platform);
            tokio::spawn(async move {
                let user = UserId::new();
                place_booking(&platform, user, show_id, &[("A", 1)]).await
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await.expect("task completed").1);
    }

    let winners = outcomes
        .iter()
        .filter(|t| matches!(t, BookingAction::ChargeIntentOpened { .. }))
        .count();
    let losers = outcomes
        .iter()
        .filter(|t| {
            matches!(
                t,
                BookingAction::BookingRejected {
                    error: BookingError::SeatUnavailable { .. },
                    ..
                }
            )
        })
        .count();

    assert_eq!(winners, 1, "exactly one request wins the seat: {outcomes:?}");
    assert_eq!(losers, 1, "the other fails with SeatUnavailable: {outcomes:?}");

    // And only one booking was ever persisted.
    let bookings = platform.ledger.state(|s| s.bookings.len()).await;
    assert_eq!(bookings, 1);
}

#[tokio::test]
async fn many_concurrent_requests_never_oversell() {
    let fixture = test_platform(600).await;
    let platform = Arc::new(fixture.platform);
    let show_id = register_show(
        &platform,
        &[
            ("A", 1, SeatCategory::Normal, 90),
            ("A", 2, SeatCategory::Normal, 90),
        ],
    )
    .await;

    // Eight racers for two seats, each wanting both.
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let platform = Arc::clone(&platform);
            tokio::spawn(async move {
                let user = UserId::new();
                place_booking(&platform, user, show_id, &[("A", 1), ("A", 2)]).await
            })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        let (_, terminal) = task.await.expect("task completed");
        if matches!(terminal, BookingAction::ChargeIntentOpened { .. }) {
            winners += 1;
        }
    }

    assert_eq!(winners, 1, "both seats go to exactly one booking");

    let now = chrono::Utc::now();
    let available = platform
        .ledger
        .state(|s| s.seat_map(&show_id).map(|m| m.available_count(now)))
        .await;
    assert_eq!(available, Some(0));
}

#[tokio::test]
async fn expired_hold_returns_the_seat_to_the_pool() {
    // One-second hold TTL so the expiry timer fires inside the test.
    let fixture = test_platform(1).await;
    let platform = &fixture.platform;
    let show_id = register_show(platform, &[("A", 1, SeatCategory::Vip, 200)]).await;

    let first = UserId::new();
    let (first_booking, terminal) = place_booking(platform, first, show_id, &[("A", 1)]).await;
    assert!(matches!(terminal, BookingAction::ChargeIntentOpened { .. }));

    // A rival cannot take the held seat yet.
    let rival = UserId::new();
    let (_, blocked) = place_booking(platform, rival, show_id, &[("A", 1)]).await;
    assert!(matches!(
        blocked,
        BookingAction::BookingRejected {
            error: BookingError::SeatUnavailable { .. },
            ..
        }
    ));

    // Payment never arrives; the hold lapses.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let status = platform
        .ledger
        .state(|s| s.booking(&first_booking).map(|b| b.payment_status))
        .await;
    assert_eq!(status, Some(PaymentStatus::Failed));

    // Now the rival gets the seat.
    let (_, retried) = place_booking(platform, rival, show_id, &[("A", 1)]).await;
    assert!(matches!(retried, BookingAction::ChargeIntentOpened { .. }));

    // A late confirmation of the expired booking must fail.
    let signature = fixture.gateway.signature_for(&first_booking, "pay_late");
    let result = confirm_payment(platform, first_booking, first, "pay_late", signature).await;
    assert!(matches!(result, BookingAction::PaymentRejected { .. }));
}
