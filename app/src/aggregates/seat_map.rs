//! Per-show seat inventory.
//!
//! The seat map is the single shared mutable resource contended by
//! concurrent bookings. It is owned by the booking ledger aggregate and
//! mutated only through the operations here, which the store runtime
//! executes serially; combined with the all-or-nothing contract of
//! [`SeatMap::reserve`] that rules out double-booking.

use crate::types::{BookingId, Money, SeatCategory, SeatKey, SeatSnapshot, SeatSpec};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from seat map operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeatMapError {
    /// A requested seat does not exist on this show.
    #[error("Seat {0} does not exist on this show")]
    UnknownSeat(SeatKey),

    /// A requested seat is already held or booked.
    #[error("Seat {0} is not available")]
    Unavailable(SeatKey),

    /// The same seat appeared twice in one request.
    #[error("Seat {0} was requested more than once")]
    DuplicateSeat(SeatKey),

    /// No live hold exists for the booking.
    #[error("No live hold for booking {0}")]
    HoldMissing(BookingId),

    /// An empty seat list is never a valid request.
    #[error("At least one seat must be requested")]
    EmptyRequest,
}

/// Occupancy state of one seat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeatStatus {
    /// Free to reserve.
    Available,
    /// Temporarily claimed by a pending booking.
    Held {
        /// The booking holding the seat.
        by: BookingId,
        /// When the hold lapses.
        expires_at: DateTime<Utc>,
    },
    /// Permanently sold to a completed booking.
    Booked {
        /// The booking that bought the seat.
        by: BookingId,
    },
}

/// One seat's category, price, and occupancy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatRecord {
    /// Category of the seat.
    pub category: SeatCategory,
    /// Price billed when this seat is reserved.
    pub price: Money,
    /// Current occupancy.
    pub status: SeatStatus,
}

impl SeatRecord {
    /// Whether the seat can be reserved at `now`. An expired hold counts as
    /// free.
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        match &self.status {
            SeatStatus::Available => true,
            SeatStatus::Held { expires_at, .. } => *expires_at <= now,
            SeatStatus::Booked { .. } => false,
        }
    }
}

/// Seat inventory for one show, keyed by `(row, number)`.
///
/// `BTreeMap` keeps iteration deterministic; replaying the same events
/// always produces the same observable order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeatMap {
    seats: BTreeMap<SeatKey, SeatRecord>,
}

impl SeatMap {
    /// Build a seat map from a show's seat declarations.
    ///
    /// # Errors
    ///
    /// Returns [`SeatMapError::DuplicateSeat`] if a key appears twice, or
    /// [`SeatMapError::EmptyRequest`] for an empty declaration.
    pub fn from_specs(specs: &[SeatSpec]) -> Result<Self, SeatMapError> {
        if specs.is_empty() {
            return Err(SeatMapError::EmptyRequest);
        }

        let mut seats = BTreeMap::new();
        for spec in specs {
            let record = SeatRecord {
                category: spec.category,
                price: spec.price,
                status: SeatStatus::Available,
            };
            if seats.insert(spec.key.clone(), record).is_some() {
                return Err(SeatMapError::DuplicateSeat(spec.key.clone()));
            }
        }
        Ok(Self { seats })
    }

    /// Number of seats on the show.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Whether the map has no seats.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    /// Iterate seats in key order.
    pub fn seats(&self) -> impl Iterator<Item = (&SeatKey, &SeatRecord)> {
        self.seats.iter()
    }

    /// Number of seats reservable at `now`.
    #[must_use]
    pub fn available_count(&self, now: DateTime<Utc>) -> usize {
        self.seats.values().filter(|s| s.is_available(now)).count()
    }

    /// Atomically hold the named seats for `booking_id`.
    ///
    /// All-or-nothing: if any seat is unknown, already held, or booked, no
    /// seat in the set is touched. On success every seat is marked held
    /// until `expires_at` and a priced snapshot is returned; billing uses
    /// these prices, never a later re-read.
    ///
    /// # Errors
    ///
    /// [`SeatMapError::EmptyRequest`], [`SeatMapError::DuplicateSeat`],
    /// [`SeatMapError::UnknownSeat`], or [`SeatMapError::Unavailable`];
    /// in all cases the map is unchanged.
    pub fn reserve(
        &mut self,
        booking_id: BookingId,
        keys: &[SeatKey],
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Vec<SeatSnapshot>, SeatMapError> {
        if keys.is_empty() {
            return Err(SeatMapError::EmptyRequest);
        }

        // Validate the whole set before touching anything.
        let mut snapshots = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(SeatMapError::DuplicateSeat(key.clone()));
            }
            let record = self
                .seats
                .get(key)
                .ok_or_else(|| SeatMapError::UnknownSeat(key.clone()))?;
            if !record.is_available(now) {
                return Err(SeatMapError::Unavailable(key.clone()));
            }
            snapshots.push(SeatSnapshot {
                key: key.clone(),
                category: record.category,
                price: record.price,
            });
        }

        self.apply_hold(booking_id, keys, expires_at);
        Ok(snapshots)
    }

    /// Mark seats held without validation. Replay path: the event already
    /// proved the hold was granted.
    pub fn apply_hold(&mut self, booking_id: BookingId, keys: &[SeatKey], expires_at: DateTime<Utc>) {
        for key in keys {
            if let Some(record) = self.seats.get_mut(key) {
                record.status = SeatStatus::Held {
                    by: booking_id,
                    expires_at,
                };
            }
        }
    }

    /// Transition the seats held by `booking_id` to booked.
    ///
    /// # Errors
    ///
    /// Returns [`SeatMapError::HoldMissing`] if the booking holds no seat
    /// with an unexpired hold; the map is unchanged in that case.
    pub fn commit(
        &mut self,
        booking_id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<Vec<SeatKey>, SeatMapError> {
        let held: Vec<SeatKey> = self
            .seats
            .iter()
            .filter(|(_, record)| {
                matches!(
                    &record.status,
                    SeatStatus::Held { by, expires_at } if *by == booking_id && *expires_at > now
                )
            })
            .map(|(key, _)| key.clone())
            .collect();

        if held.is_empty() {
            return Err(SeatMapError::HoldMissing(booking_id));
        }

        self.apply_booked(booking_id, &held);
        Ok(held)
    }

    /// Mark seats booked without validation. Replay path.
    pub fn apply_booked(&mut self, booking_id: BookingId, keys: &[SeatKey]) {
        for key in keys {
            if let Some(record) = self.seats.get_mut(key) {
                record.status = SeatStatus::Booked { by: booking_id };
            }
        }
    }

    /// Free every seat held or booked by `booking_id`.
    ///
    /// Idempotent: releasing a booking that owns nothing is a no-op.
    pub fn release(&mut self, booking_id: BookingId) {
        for record in self.seats.values_mut() {
            let owned = match &record.status {
                SeatStatus::Held { by, .. } | SeatStatus::Booked { by } => *by == booking_id,
                SeatStatus::Available => false,
            };
            if owned {
                record.status = SeatStatus::Available;
            }
        }
    }

    /// Free every expired hold, returning the bookings that lost one.
    pub fn release_expired(&mut self, now: DateTime<Utc>) -> Vec<BookingId> {
        let mut expired = Vec::new();
        for record in self.seats.values_mut() {
            if let SeatStatus::Held { by, expires_at } = &record.status {
                if *expires_at <= now {
                    if !expired.contains(by) {
                        expired.push(*by);
                    }
                    record.status = SeatStatus::Available;
                }
            }
        }
        expired
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use marquee_core::environment::Clock;
    use proptest::prelude::*;

    fn specs() -> Vec<SeatSpec> {
        let spec = |row: &str, number: u32, category, price| SeatSpec {
            key: SeatKey::new(row, number),
            category,
            price: Money::from_major(price),
        };
        vec![
            spec("A", 1, SeatCategory::Vip, 200),
            spec("A", 2, SeatCategory::Vip, 200),
            spec("B", 1, SeatCategory::Premium, 120),
            spec("B", 2, SeatCategory::Premium, 120),
            spec("C", 1, SeatCategory::Normal, 90),
        ]
    }

    fn map() -> SeatMap {
        SeatMap::from_specs(&specs()).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        marquee_testing::test_clock().now()
    }

    #[test]
    fn from_specs_rejects_duplicates() {
        let mut duplicated = specs();
        duplicated.push(duplicated[0].clone());
        assert_eq!(
            SeatMap::from_specs(&duplicated),
            Err(SeatMapError::DuplicateSeat(SeatKey::new("A", 1)))
        );
    }

    #[test]
    fn reserve_snapshots_prices_at_hold_time() {
        let mut map = map();
        let booking = BookingId::new();
        let now = t0();

        let snapshots = map
            .reserve(
                booking,
                &[SeatKey::new("B", 1), SeatKey::new("B", 2), SeatKey::new("C", 1)],
                now,
                now + Duration::minutes(10),
            )
            .unwrap();

        let total = Money::checked_sum(snapshots.iter().map(|s| s.price)).unwrap();
        assert_eq!(total, Money::from_major(330));
        assert_eq!(map.available_count(now), 2);
    }

    #[test]
    fn reserve_is_all_or_nothing() {
        let mut map = map();
        let now = t0();
        let expires = now + Duration::minutes(10);

        let first = BookingId::new();
        map.reserve(first, &[SeatKey::new("A", 1)], now, expires).unwrap();

        // A2 is free but the set contains the held A1, so nothing changes.
        let second = BookingId::new();
        let result = map.reserve(
            second,
            &[SeatKey::new("A", 2), SeatKey::new("A", 1)],
            now,
            expires,
        );
        assert_eq!(result, Err(SeatMapError::Unavailable(SeatKey::new("A", 1))));
        assert_eq!(map.available_count(now), 4);

        // A2 alone still works.
        assert!(map.reserve(second, &[SeatKey::new("A", 2)], now, expires).is_ok());
    }

    #[test]
    fn reserve_rejects_unknown_seats() {
        let mut map = map();
        let now = t0();
        let result = map.reserve(
            BookingId::new(),
            &[SeatKey::new("Z", 9)],
            now,
            now + Duration::minutes(10),
        );
        assert_eq!(result, Err(SeatMapError::UnknownSeat(SeatKey::new("Z", 9))));
    }

    #[test]
    fn expired_hold_counts_as_available() {
        let mut map = map();
        let now = t0();
        let first = BookingId::new();
        map.reserve(first, &[SeatKey::new("A", 1)], now, now + Duration::minutes(10))
            .unwrap();

        let later = now + Duration::minutes(11);
        let second = BookingId::new();
        assert!(
            map.reserve(second, &[SeatKey::new("A", 1)], later, later + Duration::minutes(10))
                .is_ok()
        );
    }

    #[test]
    fn commit_requires_a_live_hold() {
        let mut map = map();
        let now = t0();
        let booking = BookingId::new();

        assert_eq!(
            map.commit(booking, now),
            Err(SeatMapError::HoldMissing(booking))
        );

        map.reserve(booking, &[SeatKey::new("C", 1)], now, now + Duration::minutes(10))
            .unwrap();
        let committed = map.commit(booking, now).unwrap();
        assert_eq!(committed, vec![SeatKey::new("C", 1)]);

        // An expired hold cannot be committed.
        let other = BookingId::new();
        map.reserve(other, &[SeatKey::new("A", 1)], now, now + Duration::minutes(10))
            .unwrap();
        assert_eq!(
            map.commit(other, now + Duration::minutes(11)),
            Err(SeatMapError::HoldMissing(other))
        );
    }

    #[test]
    fn release_is_idempotent() {
        let mut map = map();
        let now = t0();
        let booking = BookingId::new();

        map.reserve(booking, &[SeatKey::new("A", 1)], now, now + Duration::minutes(10))
            .unwrap();
        map.release(booking);
        assert_eq!(map.available_count(now), 5);

        // Releasing again is a no-op, not an error.
        map.release(booking);
        assert_eq!(map.available_count(now), 5);
    }

    #[test]
    fn release_expired_frees_only_lapsed_holds() {
        let mut map = map();
        let now = t0();
        let short = BookingId::new();
        let long = BookingId::new();

        map.reserve(short, &[SeatKey::new("A", 1)], now, now + Duration::minutes(5))
            .unwrap();
        map.reserve(long, &[SeatKey::new("A", 2)], now, now + Duration::minutes(30))
            .unwrap();

        let expired = map.release_expired(now + Duration::minutes(6));
        assert_eq!(expired, vec![short]);
        assert_eq!(map.available_count(now + Duration::minutes(6)), 4);
    }

    proptest! {
        /// Any request overlapping an existing hold fails without changing
        /// occupancy, regardless of how the set is composed.
        #[test]
        fn overlapping_reserve_never_partially_holds(extra in 0usize..5, overlap in 0usize..5) {
            let mut map = map();
            let now = t0();
            let expires = now + Duration::minutes(10);
            let all: Vec<SeatKey> = specs().into_iter().map(|s| s.key).collect();

            let first = BookingId::new();
            map.reserve(first, &[all[overlap].clone()], now, expires).unwrap();
            let before = map.clone();

            let mut request: Vec<SeatKey> = all
                .iter()
                .filter(|k| **k != all[overlap])
                .take(extra)
                .cloned()
                .collect();
            request.push(all[overlap].clone());

            let second = BookingId::new();
            prop_assert!(map.reserve(second, &request, now, expires).is_err());
            prop_assert_eq!(map, before);
        }
    }
}
