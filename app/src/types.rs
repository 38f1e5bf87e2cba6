//! Domain types for the Marquee booking platform.
//!
//! Value objects and entities shared across the catalog, the booking ledger,
//! and the API layer.

use crate::aggregates::seat_map::SeatMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a user (customer, partner, or admin).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a movie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovieId(Uuid);

impl MovieId {
    /// Creates a new random `MovieId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MovieId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a theater.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TheaterId(Uuid);

impl TheaterId {
    /// Creates a new random `TheaterId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TheaterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TheaterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a show (one screening of a movie on a screen).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShowId(Uuid);

impl ShowId {
    /// Creates a new random `ShowId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ShowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random `BookingId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing `Uuid`.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money (integer minor units, no floating point)
// ============================================================================

/// A monetary amount in minor currency units (cents, paise, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Money(u64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// From minor units.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// From major units (e.g. whole rupees or dollars).
    ///
    /// # Panics
    ///
    /// Panics on overflow; use [`Money::checked_from_major`] for untrusted
    /// input.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_major(units: u64) -> Self {
        match units.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("Money::from_major overflow"),
        }
    }

    /// From major units, checking for overflow.
    #[must_use]
    pub const fn checked_from_major(units: u64) -> Option<Self> {
        match units.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Sum an iterator of amounts, failing on overflow.
    #[must_use]
    pub fn checked_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// The `(row, number)` pair uniquely identifying a seat within one show.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatKey {
    /// Row label, e.g. `"A"`.
    pub row: String,
    /// Seat number within the row.
    pub number: u32,
}

impl SeatKey {
    /// Creates a seat key.
    #[must_use]
    pub fn new(row: impl Into<String>, number: u32) -> Self {
        Self {
            row: row.into(),
            number,
        }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.number)
    }
}

/// Seat category, priced independently per show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatCategory {
    /// Standard seating.
    Normal,
    /// Premium seating.
    Premium,
    /// VIP seating.
    Vip,
}

/// A seat as declared when a show's seat map is initialized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSpec {
    /// Seat identity within the show.
    pub key: SeatKey,
    /// Category of the seat.
    pub category: SeatCategory,
    /// Price for this seat on this show.
    pub price: Money,
}

/// A seat as captured on a booking at reservation time.
///
/// Snapshots are copies, not references: later show edits cannot
/// retroactively change what a historical booking was billed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSnapshot {
    /// Seat identity within the show.
    pub key: SeatKey,
    /// Category at reservation time. Serialized as `type`, the field name
    /// clients already consume.
    #[serde(rename = "type")]
    pub category: SeatCategory,
    /// Price at reservation time.
    pub price: Money,
}

/// Per-category pricing for one show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPricing {
    /// Price for normal seats.
    pub normal: Money,
    /// Price for premium seats.
    pub premium: Money,
    /// Price for VIP seats.
    pub vip: Money,
}

impl SeatPricing {
    /// Price for a category.
    #[must_use]
    pub const fn for_category(&self, category: SeatCategory) -> Money {
        match category {
            SeatCategory::Normal => self.normal,
            SeatCategory::Premium => self.premium,
            SeatCategory::Vip => self.vip,
        }
    }
}

// ============================================================================
// Bookings and tickets
// ============================================================================

/// Payment lifecycle of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Seats held, awaiting payment confirmation.
    Pending,
    /// Payment verified, tickets issued.
    Completed,
    /// Cancellation requested, refund in flight.
    CancelPending,
    /// Hold expired or charge-intent creation failed. Terminal.
    Failed,
    /// Refund succeeded after cancellation. Terminal.
    Refunded,
}

/// Issued proof of purchase for one seat. Immutable once issued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket number, e.g. `TKT-5f3a...`.
    pub ticket_number: String,
    /// Scannable token encoding the ticket number.
    pub qr_code: String,
    /// The seat this ticket admits.
    pub seat: SeatKey,
}

/// A booking: the durable ledger record of one seat purchase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier.
    pub id: BookingId,
    /// The customer who placed it.
    pub user: UserId,
    /// The show it is for.
    pub show: ShowId,
    /// Seat snapshot taken at reservation time.
    pub seats: Vec<SeatSnapshot>,
    /// Sum of the snapshot prices.
    pub total_amount: Money,
    /// Current payment lifecycle state.
    pub payment_status: PaymentStatus,
    /// Gateway payment reference, set on confirmation.
    pub payment_id: Option<String>,
    /// Gateway charge-intent reference, set after intent creation.
    pub order_ref: Option<String>,
    /// When the booking was placed.
    pub booking_date: DateTime<Utc>,
    /// When the seat hold lapses if payment never completes.
    pub hold_expires_at: DateTime<Utc>,
    /// Cleared on refund.
    pub is_active: bool,
    /// Issued tickets, one per seat, present once completed.
    pub tickets: Vec<Ticket>,
}

impl Booking {
    /// Whether `user` owns this booking.
    #[must_use]
    pub fn owned_by(&self, user: &UserId) -> bool {
        self.user == *user
    }
}

// ============================================================================
// Roles
// ============================================================================

/// Platform roles. Authorization is a capability check against this closed
/// enumeration, never an ad hoc string comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Books tickets.
    Customer,
    /// Operates theaters and shows.
    Partner,
    /// Approves theaters and manages the catalog.
    Admin,
}

// ============================================================================
// Catalog entities
// ============================================================================

/// A cast member credit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    /// Actor name.
    pub name: String,
    /// Role played.
    pub role: String,
    /// Optional headshot URL.
    pub image: Option<String>,
}

/// A movie in the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// Movie identifier.
    pub id: MovieId,
    /// Title.
    pub title: String,
    /// Synopsis.
    pub description: String,
    /// Release date.
    pub release_date: DateTime<Utc>,
    /// Runtime in minutes.
    pub duration_minutes: u32,
    /// Genres.
    pub genres: Vec<String>,
    /// Primary language.
    pub language: String,
    /// Rating on a 0-10 scale.
    pub rating: f32,
    /// Poster URL.
    pub poster: String,
    /// Trailer URL.
    pub trailer: Option<String>,
    /// Cast credits.
    pub cast: Vec<CastMember>,
    /// Director name.
    pub director: String,
    /// Soft-delete flag.
    pub is_active: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Postal location of a theater.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Street address.
    pub address: String,
    /// City.
    pub city: String,
    /// State.
    pub state: String,
    /// Postal code.
    pub pincode: String,
}

/// One screen in a theater, with its seat template.
///
/// The template fixes seat keys and categories; prices are set per show.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screen {
    /// Screen number within the theater.
    pub screen_number: u32,
    /// Seat layout: key and category per seat.
    pub seats: Vec<(SeatKey, SeatCategory)>,
}

impl Screen {
    /// Number of seats on this screen.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.seats.len()
    }
}

/// A theater operated by a partner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Theater {
    /// Theater identifier.
    pub id: TheaterId,
    /// Display name.
    pub name: String,
    /// Postal location.
    pub location: Location,
    /// Screens and their seat templates.
    pub screens: Vec<Screen>,
    /// Amenities offered.
    pub amenities: Vec<String>,
    /// The partner operating this theater.
    pub partner: UserId,
    /// Set by an admin before shows can be created.
    pub is_approved: bool,
    /// Soft-delete flag.
    pub is_active: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// A screening of a movie on a screen at a date/time, with per-category
/// pricing. Seat occupancy lives in the booking ledger's seat map, not here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Show {
    /// Show identifier.
    pub id: ShowId,
    /// The movie screened.
    pub movie: MovieId,
    /// The theater.
    pub theater: TheaterId,
    /// Screen number within the theater.
    pub screen: u32,
    /// Screening date.
    pub date: DateTime<Utc>,
    /// Start time, e.g. `"18:30"`.
    pub start_time: String,
    /// End time, e.g. `"21:00"`.
    pub end_time: String,
    /// Per-category seat pricing.
    pub pricing: SeatPricing,
    /// Soft-delete flag.
    pub is_active: bool,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Ledger aggregate state
// ============================================================================

/// State of the booking ledger aggregate: every show's seat map plus every
/// booking, the single source of truth for seat occupancy.
#[derive(Clone, Debug, Default)]
pub struct LedgerState {
    /// Seat occupancy per registered show.
    pub seat_maps: HashMap<ShowId, SeatMap>,
    /// All bookings by id.
    pub bookings: HashMap<BookingId, Booking>,
    /// Last validation error, for diagnostics.
    pub last_error: Option<String>,
}

impl LedgerState {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A booking by id.
    #[must_use]
    pub fn booking(&self, id: &BookingId) -> Option<&Booking> {
        self.bookings.get(id)
    }

    /// The seat map for a show, if registered.
    #[must_use]
    pub fn seat_map(&self, show: &ShowId) -> Option<&SeatMap> {
        self.seat_maps.get(show)
    }

    /// Completed revenue per show, for partner/admin reporting.
    #[must_use]
    pub fn revenue_by_show(&self) -> HashMap<ShowId, Money> {
        let mut revenue: HashMap<ShowId, Money> = HashMap::new();
        for booking in self.bookings.values() {
            if booking.payment_status == PaymentStatus::Completed {
                let entry = revenue.entry(booking.show).or_insert(Money::ZERO);
                *entry = entry.checked_add(booking.total_amount).unwrap_or(*entry);
            }
        }
        revenue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_sums_and_displays() {
        let total = Money::checked_sum([
            Money::from_major(120),
            Money::from_major(120),
            Money::from_major(90),
        ]);
        assert_eq!(total, Some(Money::from_major(330)));
        assert_eq!(Money::from_cents(12_345).to_string(), "123.45");
    }

    #[test]
    fn money_sum_detects_overflow() {
        let total = Money::checked_sum([Money::from_cents(u64::MAX), Money::from_cents(1)]);
        assert_eq!(total, None);
    }

    #[test]
    fn seat_keys_order_by_row_then_number() {
        let mut keys = vec![
            SeatKey::new("B", 1),
            SeatKey::new("A", 10),
            SeatKey::new("A", 2),
        ];
        keys.sort();
        assert_eq!(keys[0], SeatKey::new("A", 2));
        assert_eq!(keys[2], SeatKey::new("B", 1));
        assert_eq!(keys[0].to_string(), "A2");
    }

    #[test]
    fn pricing_selects_by_category() {
        let pricing = SeatPricing {
            normal: Money::from_major(90),
            premium: Money::from_major(120),
            vip: Money::from_major(200),
        };
        assert_eq!(pricing.for_category(SeatCategory::Vip), Money::from_major(200));
        assert_eq!(pricing.for_category(SeatCategory::Normal), Money::from_major(90));
    }

    #[test]
    fn revenue_counts_only_completed_bookings() {
        let show = ShowId::new();
        let mut state = LedgerState::new();

        let mut booking = |status: PaymentStatus, major: u64| Booking {
            id: BookingId::new(),
            user: UserId::new(),
            show,
            seats: Vec::new(),
            total_amount: Money::from_major(major),
            payment_status: status,
            payment_id: None,
            order_ref: None,
            booking_date: Utc::now(),
            hold_expires_at: Utc::now(),
            is_active: true,
            tickets: Vec::new(),
        };

        for b in [
            booking(PaymentStatus::Completed, 100),
            booking(PaymentStatus::Completed, 50),
            booking(PaymentStatus::Pending, 999),
            booking(PaymentStatus::Refunded, 999),
        ] {
            state.bookings.insert(b.id, b);
        }

        let revenue = state.revenue_by_show();
        assert_eq!(revenue.get(&show), Some(&Money::from_major(150)));
    }
}
