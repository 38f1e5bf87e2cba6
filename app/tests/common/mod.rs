//! Shared fixtures for integration tests: a platform wired to in-memory
//! infrastructure with a programmable gateway and a recording notifier.

#![allow(dead_code)] // each test binary uses a subset of the helpers
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use marquee::Platform;
use marquee::aggregates::booking::BookingAction;
use marquee::config::{AuthConfig, BookingConfig, Config, DatabaseConfig, GatewayConfig, ServerConfig};
use marquee::notifications::RecordingNotifier;
use marquee::payments::MockPaymentGateway;
use marquee::types::{BookingId, Money, SeatCategory, SeatKey, SeatSpec, ShowId, UserId};
use marquee_testing::mocks::InMemoryEventStore;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestPlatform {
    pub platform: Platform,
    pub gateway: Arc<MockPaymentGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub event_store: Arc<InMemoryEventStore>,
}

impl TestPlatform {
    /// Events persisted to the ledger stream so far.
    pub fn persisted_events(&self) -> usize {
        self.event_store
            .event_count(&marquee_core::stream::StreamId::new("ledger"))
    }
}

fn test_config(hold_ttl_secs: u64) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "warn".to_string(),
            shutdown_timeout: 5,
        },
        database: DatabaseConfig { url: None },
        gateway: GatewayConfig {
            key_secret: "test-secret".to_string(),
            currency: "INR".to_string(),
        },
        booking: BookingConfig { hold_ttl_secs },
        auth: AuthConfig { admin_token: None },
    }
}

pub async fn test_platform(hold_ttl_secs: u64) -> TestPlatform {
    let gateway = Arc::new(MockPaymentGateway::new("test-secret"));
    let notifier = Arc::new(RecordingNotifier::new());
    let event_store = Arc::new(InMemoryEventStore::new());
    let platform = Platform::with_collaborators(
        test_config(hold_ttl_secs),
        event_store.clone(),
        gateway.clone(),
        notifier.clone(),
    )
    .await
    .expect("platform assembly");
    platform.start().await.expect("platform start");

    TestPlatform {
        platform,
        gateway,
        notifier,
        event_store,
    }
}

/// Register a show with the given `(row, number, category, major_price)`
/// seats directly on the ledger.
pub async fn register_show(
    platform: &Platform,
    seats: &[(&str, u32, SeatCategory, u64)],
) -> ShowId {
    let show_id = ShowId::new();
    let specs: Vec<SeatSpec> = seats
        .iter()
        .map(|(row, number, category, price)| SeatSpec {
            key: SeatKey::new(*row, *number),
            category: *category,
            price: Money::from_major(*price),
        })
        .collect();

    platform
        .ledger
        .send(BookingAction::RegisterShow {
            show_id,
            seats: specs,
        })
        .await
        .expect("register show");

    assert!(
        platform
            .ledger
            .state(|s| s.seat_map(&show_id).is_some())
            .await,
        "seat map should be registered"
    );
    show_id
}

/// Place a booking and wait for its terminal action (charge intent opened
/// or failed, or a rejection).
pub async fn place_booking(
    platform: &Platform,
    user: UserId,
    show_id: ShowId,
    seats: &[(&str, u32)],
) -> (BookingId, BookingAction) {
    let booking_id = BookingId::new();
    let correlation_id = Uuid::new_v4();
    let seat_keys: Vec<SeatKey> = seats
        .iter()
        .map(|(row, number)| SeatKey::new(*row, *number))
        .collect();

    let terminal = platform
        .ledger
        .send_and_wait_for(
            BookingAction::PlaceBooking {
                correlation_id,
                booking_id,
                user_id: user,
                show_id,
                seat_keys,
            },
            move |action| match action {
                BookingAction::ChargeIntentOpened { booking_id: b, .. }
                | BookingAction::ChargeIntentFailed { booking_id: b, .. } => *b == booking_id,
                BookingAction::BookingRejected { correlation_id: c, .. } => *c == correlation_id,
                _ => false,
            },
            COMMAND_TIMEOUT,
        )
        .await
        .expect("place booking terminal");

    (booking_id, terminal)
}

/// Confirm payment with a valid (or caller-provided) signature and wait for
/// the result.
pub async fn confirm_payment(
    platform: &Platform,
    booking_id: BookingId,
    requester: UserId,
    payment_id: &str,
    signature: String,
) -> BookingAction {
    let correlation_id = Uuid::new_v4();
    platform
        .ledger
        .send_and_wait_for(
            BookingAction::ConfirmPayment {
                correlation_id,
                booking_id,
                requester,
                payment_id: payment_id.to_string(),
                signature,
            },
            move |action| match action {
                BookingAction::PaymentConfirmed { correlation_id: c, .. }
                | BookingAction::PaymentRejected { correlation_id: c, .. } => *c == correlation_id,
                _ => false,
            },
            COMMAND_TIMEOUT,
        )
        .await
        .expect("confirm payment terminal")
}

/// Cancel a booking and wait for the result.
pub async fn cancel_booking(
    platform: &Platform,
    booking_id: BookingId,
    requester: UserId,
) -> BookingAction {
    let correlation_id = Uuid::new_v4();
    platform
        .ledger
        .send_and_wait_for(
            BookingAction::CancelBooking {
                correlation_id,
                booking_id,
                requester,
            },
            move |action| match action {
                BookingAction::RefundSucceeded { booking_id: b, .. }
                | BookingAction::RefundFailed { booking_id: b, .. } => *b == booking_id,
                BookingAction::CancellationRejected { correlation_id: c, .. } => {
                    *c == correlation_id
                }
                _ => false,
            },
            COMMAND_TIMEOUT,
        )
        .await
        .expect("cancel booking terminal")
}
