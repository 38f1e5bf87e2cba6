//! The booking ledger aggregate: the platform's reservation coordinator.
//!
//! One event-sourced aggregate owns both the per-show seat maps and the
//! booking records, so every lifecycle transition (hold, charge intent,
//! payment capture, cancellation, refund, expiry) is a single synchronous
//! state change under the store's write lock, persisted as a single event.
//! There is no window where seats are booked without a ticket record.
//!
//! Booking lifecycle:
//!
//! ```text
//! PlaceBooking ── seats held ──► Pending ── ConfirmPayment ──► Completed
//!      │                           │  │                            │
//!      └─ SeatUnavailable          │  └─ hold expiry /             │ CancelBooking
//!         (nothing persisted)      │     charge failure ─► Failed  ▼
//!                                  │                         CancelPending
//!                                  │                          │        │
//!                                  │              refund ok ──┘        └── refund failed
//!                                  │                  ▼                        ▼
//!                                  │               Refunded               Completed
//! ```
//!
//! Commands carry a correlation id; their outcome comes back over the
//! store's action broadcast as a state-neutral result action, after the
//! corresponding state transition has been applied.

use crate::aggregates::seat_map::{SeatMap, SeatMapError};
use crate::events::{LEDGER_TOPIC, PlatformEvent};
use crate::notifications::Notifier;
use crate::payments::PaymentGateway;
use crate::tickets;
use crate::types::{
    Booking, BookingId, LedgerState, Money, PaymentStatus, SeatKey, SeatSnapshot, SeatSpec,
    ShowId, Ticket, UserId,
};
use chrono::{DateTime, Duration, Utc};
use marquee_core::environment::Clock;
use marquee_core::event::{Event, EventError, SerializedEvent};
use marquee_core::event_bus::EventBus;
use marquee_core::event_store::EventStore;
use marquee_core::reducer::Reducer;
use marquee_core::stream::StreamId;
use marquee_core::{SmallVec, append_events, async_effect, delay, effect::Effect, publish_event, smallvec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Errors
// ============================================================================

/// The booking domain's error taxonomy, carried inside result actions and
/// mapped onto HTTP errors at the API boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingError {
    /// Entity id absent.
    #[error("Not found")]
    NotFound,

    /// Requester does not own the booking.
    #[error("Access denied")]
    AccessDenied,

    /// Reservation conflict: a requested seat is taken or unknown.
    #[error("Seat unavailable: {reason}")]
    SeatUnavailable {
        /// Which seat and why.
        reason: String,
    },

    /// Payment signature did not match the keyed hash.
    #[error("Invalid payment signature")]
    InvalidSignature,

    /// The booking is not in the state the operation requires.
    #[error("Invalid state: {reason}")]
    InvalidState {
        /// What was expected.
        reason: String,
    },

    /// A gateway or collaborator call failed.
    #[error("Upstream failure: {reason}")]
    Upstream {
        /// Failure detail.
        reason: String,
    },

    /// Malformed input.
    #[error("Validation failed: {reason}")]
    Validation {
        /// What was wrong.
        reason: String,
    },
}

impl From<SeatMapError> for BookingError {
    fn from(error: SeatMapError) -> Self {
        match error {
            SeatMapError::EmptyRequest | SeatMapError::DuplicateSeat(_) => Self::Validation {
                reason: error.to_string(),
            },
            SeatMapError::UnknownSeat(_)
            | SeatMapError::Unavailable(_)
            | SeatMapError::HoldMissing(_) => Self::SeatUnavailable {
                reason: error.to_string(),
            },
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions of the booking ledger aggregate.
///
/// Three kinds share the enum, the teacher pattern for saga-style
/// aggregates:
///
/// - **Commands** drive transitions and are never persisted.
/// - **Events** are facts: applied to state, appended to the event store,
///   published on the bus.
/// - **Results** are state-neutral responses broadcast back to the caller
///   that issued the correlated command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BookingAction {
    // ---- Commands ----
    /// Install the seat map for a newly created show.
    RegisterShow {
        /// The show to register.
        show_id: ShowId,
        /// Seat declarations with per-seat pricing.
        seats: Vec<SeatSpec>,
    },

    /// Hold seats and open a pending booking.
    PlaceBooking {
        /// Correlates the result back to the caller.
        correlation_id: Uuid,
        /// Caller-generated booking id.
        booking_id: BookingId,
        /// The customer booking.
        user_id: UserId,
        /// The show to book on.
        show_id: ShowId,
        /// Requested seats.
        seat_keys: Vec<SeatKey>,
    },

    /// Verify a payment and complete the booking.
    ConfirmPayment {
        /// Correlates the result back to the caller.
        correlation_id: Uuid,
        /// The booking being paid.
        booking_id: BookingId,
        /// The requesting user; must own the booking.
        requester: UserId,
        /// Gateway payment reference.
        payment_id: String,
        /// Keyed-hash signature over `(booking_id, payment_id)`.
        signature: String,
    },

    /// Cancel a completed booking and refund it.
    CancelBooking {
        /// Correlates the result back to the caller.
        correlation_id: Uuid,
        /// The booking to cancel.
        booking_id: BookingId,
        /// The requesting user; must own the booking.
        requester: UserId,
    },

    /// Scheduled self-command: lapse an unpaid hold.
    ExpireHold {
        /// The booking whose hold may have lapsed.
        booking_id: BookingId,
    },

    // ---- Events ----
    /// A show's seat map was installed.
    ShowRegistered {
        /// The registered show.
        show_id: ShowId,
        /// Its seat declarations.
        seats: Vec<SeatSpec>,
        /// When it was registered.
        registered_at: DateTime<Utc>,
    },

    /// Seats were held and a pending booking recorded.
    BookingOpened {
        /// The new booking.
        booking_id: BookingId,
        /// Its owner.
        user_id: UserId,
        /// The show booked.
        show_id: ShowId,
        /// Seat snapshot with reservation-time prices.
        seats: Vec<SeatSnapshot>,
        /// Sum of the snapshot prices.
        total_amount: Money,
        /// When the hold lapses without payment.
        hold_expires_at: DateTime<Utc>,
        /// When the booking was placed.
        opened_at: DateTime<Utc>,
    },

    /// The gateway accepted the charge intent.
    ChargeIntentOpened {
        /// The booking charged.
        booking_id: BookingId,
        /// Gateway order reference the client pays against.
        order_ref: String,
    },

    /// Charge-intent creation failed; the hold is released.
    ChargeIntentFailed {
        /// The booking whose hold is released.
        booking_id: BookingId,
        /// Gateway failure detail.
        reason: String,
    },

    /// Payment verified: seats committed, tickets issued.
    PaymentCaptured {
        /// The completed booking.
        booking_id: BookingId,
        /// Gateway payment reference.
        payment_id: String,
        /// One ticket per seat.
        tickets: Vec<Ticket>,
        /// When payment was captured.
        captured_at: DateTime<Utc>,
    },

    /// An unpaid hold lapsed; seats returned to the pool.
    HoldExpired {
        /// The expired booking.
        booking_id: BookingId,
        /// When it expired.
        expired_at: DateTime<Utc>,
    },

    /// Cancellation accepted; refund in flight.
    CancellationStarted {
        /// The booking being cancelled.
        booking_id: BookingId,
        /// When cancellation was requested.
        started_at: DateTime<Utc>,
    },

    /// The refund cleared; seats released, booking closed.
    RefundSucceeded {
        /// The refunded booking.
        booking_id: BookingId,
        /// Gateway refund reference.
        refund_ref: String,
        /// When the refund cleared.
        refunded_at: DateTime<Utc>,
    },

    /// The refund failed; the booking stays completed.
    RefundFailed {
        /// The booking left untouched.
        booking_id: BookingId,
        /// Gateway failure detail.
        reason: String,
    },

    // ---- Results (broadcast only, no state change) ----
    /// `PlaceBooking` was rejected before anything was persisted.
    BookingRejected {
        /// Correlation id of the rejected command.
        correlation_id: Uuid,
        /// The booking id the caller generated.
        booking_id: BookingId,
        /// Why it was rejected.
        error: BookingError,
    },

    /// `ConfirmPayment` succeeded.
    PaymentConfirmed {
        /// Correlation id of the command.
        correlation_id: Uuid,
        /// The completed booking.
        booking_id: BookingId,
    },

    /// `ConfirmPayment` was rejected.
    PaymentRejected {
        /// Correlation id of the command.
        correlation_id: Uuid,
        /// The booking left unchanged (or expired).
        booking_id: BookingId,
        /// Why it was rejected.
        error: BookingError,
    },

    /// `CancelBooking` was rejected.
    CancellationRejected {
        /// Correlation id of the command.
        correlation_id: Uuid,
        /// The booking left unchanged.
        booking_id: BookingId,
        /// Why it was rejected.
        error: BookingError,
    },

    /// An event store or bus operation failed after retries.
    InfrastructureFailed {
        /// Failure detail.
        error: String,
    },
}

impl BookingAction {
    /// Stable identifier for persisted event variants.
    ///
    /// Commands and results are never persisted and return `"unknown"`.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::ShowRegistered { .. } => "ShowRegistered.v1",
            Self::BookingOpened { .. } => "BookingOpened.v1",
            Self::ChargeIntentOpened { .. } => "ChargeIntentOpened.v1",
            Self::ChargeIntentFailed { .. } => "ChargeIntentFailed.v1",
            Self::PaymentCaptured { .. } => "PaymentCaptured.v1",
            Self::HoldExpired { .. } => "HoldExpired.v1",
            Self::CancellationStarted { .. } => "CancellationStarted.v1",
            Self::RefundSucceeded { .. } => "RefundSucceeded.v1",
            Self::RefundFailed { .. } => "RefundFailed.v1",
            _ => "unknown",
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Injected dependencies for the booking ledger.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Durable event log.
    pub event_store: Arc<dyn EventStore>,
    /// Event distribution.
    pub event_bus: Arc<dyn EventBus>,
    /// Stream the ledger appends to.
    pub stream_id: StreamId,
    /// Payment collaborator.
    pub gateway: Arc<dyn PaymentGateway>,
    /// Messaging collaborator.
    pub notifier: Arc<dyn Notifier>,
    /// How long an unpaid hold lives.
    pub hold_ttl: Duration,
    /// ISO currency code for charges.
    pub currency: String,
}

impl BookingEnvironment {
    /// Creates a new `BookingEnvironment`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_store: Arc<dyn EventStore>,
        event_bus: Arc<dyn EventBus>,
        stream_id: StreamId,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        hold_ttl: Duration,
        currency: String,
    ) -> Self {
        Self {
            clock,
            event_store,
            event_bus,
            stream_id,
            gateway,
            notifier,
            hold_ttl,
            currency,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the booking ledger aggregate.
#[derive(Clone, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rebuild ledger state from a persisted event stream.
    ///
    /// # Errors
    ///
    /// Returns [`EventError`] if an event fails to decode.
    pub fn rehydrate(state: &mut LedgerState, events: &[SerializedEvent]) -> Result<(), EventError> {
        for event in events {
            let PlatformEvent::Booking(action) = PlatformEvent::from_bytes(&event.data)?;
            Self::apply_event(state, &action);
        }
        Ok(())
    }

    /// Effects persisting and publishing one ledger event.
    fn persist_and_publish(
        event: &BookingAction,
        env: &BookingEnvironment,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        let wrapped = PlatformEvent::Booking(event.clone());
        let serialized = match SerializedEvent::from_event(&wrapped, None) {
            Ok(serialized) => serialized,
            Err(e) => {
                let error = e.to_string();
                return smallvec![async_effect! {
                    Some(BookingAction::InfrastructureFailed { error })
                }];
            }
        };

        smallvec![
            append_events! {
                store: env.event_store,
                stream: env.stream_id.as_str(),
                expected_version: None,
                events: vec![serialized.clone()],
                on_success: |_version| None,
                on_error: |error| Some(BookingAction::InfrastructureFailed {
                    error: error.to_string()
                })
            },
            publish_event! {
                bus: env.event_bus,
                topic: LEDGER_TOPIC,
                event: serialized,
                on_success: || None,
                on_error: |error| Some(BookingAction::InfrastructureFailed {
                    error: error.to_string()
                })
            },
        ]
    }

    /// A single broadcast-only result effect, recording the error for
    /// diagnostics.
    fn reject(
        state: &mut LedgerState,
        result: BookingAction,
        error: &BookingError,
    ) -> SmallVec<[Effect<BookingAction>; 4]> {
        state.last_error = Some(error.to_string());
        smallvec![async_effect! { Some(result) }]
    }

    /// Applies an event to state. Pure: replaying the same events always
    /// yields the same state.
    #[allow(clippy::too_many_lines)]
    fn apply_event(state: &mut LedgerState, action: &BookingAction) {
        match action {
            BookingAction::ShowRegistered { show_id, seats, .. } => {
                // Specs were validated before the event was written.
                if let Ok(seat_map) = SeatMap::from_specs(seats) {
                    state.seat_maps.insert(*show_id, seat_map);
                }
                state.last_error = None;
            }

            BookingAction::BookingOpened {
                booking_id,
                user_id,
                show_id,
                seats,
                total_amount,
                hold_expires_at,
                opened_at,
            } => {
                if let Some(seat_map) = state.seat_maps.get_mut(show_id) {
                    let keys: Vec<SeatKey> = seats.iter().map(|s| s.key.clone()).collect();
                    seat_map.apply_hold(*booking_id, &keys, *hold_expires_at);
                }
                state.bookings.insert(
                    *booking_id,
                    Booking {
                        id: *booking_id,
                        user: *user_id,
                        show: *show_id,
                        seats: seats.clone(),
                        total_amount: *total_amount,
                        payment_status: PaymentStatus::Pending,
                        payment_id: None,
                        order_ref: None,
                        booking_date: *opened_at,
                        hold_expires_at: *hold_expires_at,
                        is_active: true,
                        tickets: Vec::new(),
                    },
                );
                state.last_error = None;
            }

            BookingAction::ChargeIntentOpened {
                booking_id,
                order_ref,
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.order_ref = Some(order_ref.clone());
                }
                state.last_error = None;
            }

            BookingAction::ChargeIntentFailed { booking_id, reason } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    if booking.payment_status == PaymentStatus::Pending {
                        booking.payment_status = PaymentStatus::Failed;
                        booking.is_active = false;
                        let show = booking.show;
                        if let Some(seat_map) = state.seat_maps.get_mut(&show) {
                            seat_map.release(*booking_id);
                        }
                    }
                }
                state.last_error = Some(reason.clone());
            }

            BookingAction::PaymentCaptured {
                booking_id,
                payment_id,
                tickets,
                ..
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.payment_status = PaymentStatus::Completed;
                    booking.payment_id = Some(payment_id.clone());
                    booking.tickets = tickets.clone();
                    let show = booking.show;
                    let keys: Vec<SeatKey> =
                        booking.seats.iter().map(|s| s.key.clone()).collect();
                    if let Some(seat_map) = state.seat_maps.get_mut(&show) {
                        seat_map.apply_booked(*booking_id, &keys);
                    }
                }
                state.last_error = None;
            }

            BookingAction::HoldExpired { booking_id, .. } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    if booking.payment_status == PaymentStatus::Pending {
                        booking.payment_status = PaymentStatus::Failed;
                        booking.is_active = false;
                        let show = booking.show;
                        if let Some(seat_map) = state.seat_maps.get_mut(&show) {
                            seat_map.release(*booking_id);
                        }
                    }
                }
                state.last_error = None;
            }

            BookingAction::CancellationStarted { booking_id, .. } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    if booking.payment_status == PaymentStatus::Completed {
                        booking.payment_status = PaymentStatus::CancelPending;
                    }
                }
                state.last_error = None;
            }

            BookingAction::RefundSucceeded { booking_id, .. } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.payment_status = PaymentStatus::Refunded;
                    booking.is_active = false;
                    let show = booking.show;
                    if let Some(seat_map) = state.seat_maps.get_mut(&show) {
                        seat_map.release(*booking_id);
                    }
                }
                state.last_error = None;
            }

            BookingAction::RefundFailed { booking_id, reason } => {
                // Cancellation is not granted: the booking stays completed
                // and the caller retries later.
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    if booking.payment_status == PaymentStatus::CancelPending {
                        booking.payment_status = PaymentStatus::Completed;
                    }
                }
                state.last_error = Some(reason.clone());
            }

            BookingAction::InfrastructureFailed { error } => {
                state.last_error = Some(error.clone());
            }

            // Commands and results never mutate state here.
            BookingAction::RegisterShow { .. }
            | BookingAction::PlaceBooking { .. }
            | BookingAction::ConfirmPayment { .. }
            | BookingAction::CancelBooking { .. }
            | BookingAction::ExpireHold { .. }
            | BookingAction::BookingRejected { .. }
            | BookingAction::PaymentConfirmed { .. }
            | BookingAction::PaymentRejected { .. }
            | BookingAction::CancellationRejected { .. } => {}
        }
    }
}

impl Reducer for BookingReducer {
    type State = LedgerState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ================= RegisterShow =================
            BookingAction::RegisterShow { show_id, seats } => {
                if state.seat_maps.contains_key(&show_id) {
                    state.last_error = Some(format!("show {show_id} is already registered"));
                    return SmallVec::new();
                }
                if let Err(error) = SeatMap::from_specs(&seats) {
                    state.last_error = Some(error.to_string());
                    return SmallVec::new();
                }

                let event = BookingAction::ShowRegistered {
                    show_id,
                    seats,
                    registered_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                Self::persist_and_publish(&event, env)
            }

            // ================= PlaceBooking =================
            BookingAction::PlaceBooking {
                correlation_id,
                booking_id,
                user_id,
                show_id,
                seat_keys,
            } => {
                let now = env.clock.now();
                let hold_expires_at = now + env.hold_ttl;

                let Some(seat_map) = state.seat_maps.get_mut(&show_id) else {
                    let error = BookingError::NotFound;
                    let result = BookingAction::BookingRejected {
                        correlation_id,
                        booking_id,
                        error: error.clone(),
                    };
                    return Self::reject(state, result, &error);
                };

                let seats = match seat_map.reserve(booking_id, &seat_keys, now, hold_expires_at) {
                    Ok(seats) => seats,
                    Err(e) => {
                        let error = BookingError::from(e);
                        let result = BookingAction::BookingRejected {
                            correlation_id,
                            booking_id,
                            error: error.clone(),
                        };
                        return Self::reject(state, result, &error);
                    }
                };

                let Some(total_amount) = Money::checked_sum(seats.iter().map(|s| s.price)) else {
                    seat_map.release(booking_id);
                    let error = BookingError::Validation {
                        reason: "total amount overflow".to_string(),
                    };
                    let result = BookingAction::BookingRejected {
                        correlation_id,
                        booking_id,
                        error: error.clone(),
                    };
                    return Self::reject(state, result, &error);
                };

                let event = BookingAction::BookingOpened {
                    booking_id,
                    user_id,
                    show_id,
                    seats,
                    total_amount,
                    hold_expires_at,
                    opened_at: now,
                };
                Self::apply_event(state, &event);

                let mut effects = Self::persist_and_publish(&event, env);

                effects.push(delay! {
                    duration: env.hold_ttl.to_std().unwrap_or_default(),
                    action: BookingAction::ExpireHold { booking_id }
                });

                let gateway = Arc::clone(&env.gateway);
                let currency = env.currency.clone();
                effects.push(Effect::Future(Box::pin(async move {
                    match gateway.create_charge(total_amount, &currency, booking_id).await {
                        Ok(intent) => Some(BookingAction::ChargeIntentOpened {
                            booking_id,
                            order_ref: intent.order_ref,
                        }),
                        Err(e) => Some(BookingAction::ChargeIntentFailed {
                            booking_id,
                            reason: e.to_string(),
                        }),
                    }
                })));

                effects
            }

            // ================= ConfirmPayment =================
            BookingAction::ConfirmPayment {
                correlation_id,
                booking_id,
                requester,
                payment_id,
                signature,
            } => {
                let now = env.clock.now();

                let precondition = match state.bookings.get(&booking_id) {
                    None => Err(BookingError::NotFound),
                    Some(b) if !b.owned_by(&requester) => Err(BookingError::AccessDenied),
                    Some(b) if b.payment_status != PaymentStatus::Pending => {
                        Err(BookingError::InvalidState {
                            reason: format!(
                                "payment can only be confirmed from pending, booking is {:?}",
                                b.payment_status
                            ),
                        })
                    }
                    Some(b) => Ok((b.show, b.seats.clone(), b.user)),
                };

                let (show_id, seats, owner) = match precondition {
                    Ok(ok) => ok,
                    Err(error) => {
                        let result = BookingAction::PaymentRejected {
                            correlation_id,
                            booking_id,
                            error: error.clone(),
                        };
                        return Self::reject(state, result, &error);
                    }
                };

                // Signature mismatch mutates nothing.
                if !env.gateway.verify_signature(&booking_id, &payment_id, &signature) {
                    let error = BookingError::InvalidSignature;
                    let result = BookingAction::PaymentRejected {
                        correlation_id,
                        booking_id,
                        error: error.clone(),
                    };
                    return Self::reject(state, result, &error);
                }

                let committed = state
                    .seat_maps
                    .get_mut(&show_id)
                    .ok_or(SeatMapError::HoldMissing(booking_id))
                    .and_then(|seat_map| seat_map.commit(booking_id, now));

                if committed.is_err() {
                    // The hold lapsed before confirmation; expire the
                    // booking now instead of waiting for the timer.
                    let event = BookingAction::HoldExpired {
                        booking_id,
                        expired_at: now,
                    };
                    Self::apply_event(state, &event);
                    let mut effects = Self::persist_and_publish(&event, env);

                    let error = BookingError::SeatUnavailable {
                        reason: "the seat hold expired before payment".to_string(),
                    };
                    state.last_error = Some(error.to_string());
                    effects.push(async_effect! {
                        Some(BookingAction::PaymentRejected {
                            correlation_id,
                            booking_id,
                            error,
                        })
                    });
                    return effects;
                }

                let event = BookingAction::PaymentCaptured {
                    booking_id,
                    payment_id,
                    tickets: tickets::issue(&seats),
                    captured_at: now,
                };
                Self::apply_event(state, &event);

                let mut effects = Self::persist_and_publish(&event, env);

                let notifier = Arc::clone(&env.notifier);
                let booking = state.bookings.get(&booking_id).cloned();
                effects.push(Effect::Future(Box::pin(async move {
                    if let Some(booking) = booking {
                        notifier.booking_confirmed(owner, &booking).await;
                    }
                    None
                })));

                effects.push(async_effect! {
                    Some(BookingAction::PaymentConfirmed {
                        correlation_id,
                        booking_id,
                    })
                });

                effects
            }

            // ================= CancelBooking =================
            BookingAction::CancelBooking {
                correlation_id,
                booking_id,
                requester,
            } => {
                let precondition = match state.bookings.get(&booking_id) {
                    None => Err(BookingError::NotFound),
                    Some(b) if !b.owned_by(&requester) => Err(BookingError::AccessDenied),
                    Some(b) if b.payment_status != PaymentStatus::Completed => {
                        Err(BookingError::InvalidState {
                            reason: format!(
                                "only completed bookings can be cancelled, booking is {:?}",
                                b.payment_status
                            ),
                        })
                    }
                    Some(b) => match &b.payment_id {
                        Some(payment_id) => Ok((payment_id.clone(), b.total_amount)),
                        None => Err(BookingError::InvalidState {
                            reason: "booking has no payment reference".to_string(),
                        }),
                    },
                };

                let (payment_id, amount) = match precondition {
                    Ok(ok) => ok,
                    Err(error) => {
                        let result = BookingAction::CancellationRejected {
                            correlation_id,
                            booking_id,
                            error: error.clone(),
                        };
                        return Self::reject(state, result, &error);
                    }
                };

                // CancelPending blocks a second refund while this one is in
                // flight.
                let event = BookingAction::CancellationStarted {
                    booking_id,
                    started_at: env.clock.now(),
                };
                Self::apply_event(state, &event);

                let mut effects = Self::persist_and_publish(&event, env);

                let gateway = Arc::clone(&env.gateway);
                let clock = Arc::clone(&env.clock);
                effects.push(Effect::Future(Box::pin(async move {
                    match gateway.refund(&payment_id, amount).await {
                        Ok(receipt) => Some(BookingAction::RefundSucceeded {
                            booking_id,
                            refund_ref: receipt.refund_ref,
                            refunded_at: clock.now(),
                        }),
                        Err(e) => Some(BookingAction::RefundFailed {
                            booking_id,
                            reason: e.to_string(),
                        }),
                    }
                })));

                effects
            }

            // ================= ExpireHold =================
            BookingAction::ExpireHold { booking_id } => {
                let still_pending = state
                    .bookings
                    .get(&booking_id)
                    .is_some_and(|b| b.payment_status == PaymentStatus::Pending);
                if !still_pending {
                    return SmallVec::new();
                }

                let event = BookingAction::HoldExpired {
                    booking_id,
                    expired_at: env.clock.now(),
                };
                Self::apply_event(state, &event);
                Self::persist_and_publish(&event, env)
            }

            // ================= Gateway-result events =================
            event @ (BookingAction::ChargeIntentOpened { .. }
            | BookingAction::ChargeIntentFailed { .. }) => {
                Self::apply_event(state, &event);
                Self::persist_and_publish(&event, env)
            }

            BookingAction::RefundSucceeded {
                booking_id,
                refund_ref,
                refunded_at,
            } => {
                let event = BookingAction::RefundSucceeded {
                    booking_id,
                    refund_ref,
                    refunded_at,
                };
                Self::apply_event(state, &event);
                let mut effects = Self::persist_and_publish(&event, env);

                let notifier = Arc::clone(&env.notifier);
                let booking = state.bookings.get(&booking_id).cloned();
                effects.push(Effect::Future(Box::pin(async move {
                    if let Some(booking) = booking {
                        notifier.booking_cancelled(booking.user, &booking).await;
                    }
                    None
                })));

                effects
            }

            event @ BookingAction::RefundFailed { .. } => {
                Self::apply_event(state, &event);
                Self::persist_and_publish(&event, env)
            }

            // ================= Everything else =================
            // Replayed events apply without new effects; results are
            // broadcast-only no-ops.
            other => {
                Self::apply_event(state, &other);
                SmallVec::new()
            }
        }
    }
}
