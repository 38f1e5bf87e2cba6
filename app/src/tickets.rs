//! Ticket issuance.
//!
//! One ticket per booked seat, generated at payment-confirmation time. The
//! ticket number is globally unique; the QR payload is a URL-safe base64
//! encoding of the scannable token derived from it.

use crate::types::{SeatSnapshot, Ticket};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uuid::Uuid;

/// Prefix of the scannable token inside the QR payload.
const TOKEN_PREFIX: &str = "marquee:ticket:";

/// Issue one ticket per seat snapshot.
#[must_use]
pub fn issue(seats: &[SeatSnapshot]) -> Vec<Ticket> {
    seats
        .iter()
        .map(|seat| {
            let ticket_number = ticket_number();
            Ticket {
                qr_code: qr_payload(&ticket_number),
                ticket_number,
                seat: seat.key.clone(),
            }
        })
        .collect()
}

fn ticket_number() -> String {
    format!("TKT-{}", Uuid::new_v4().simple())
}

/// The scannable QR payload for a ticket number.
#[must_use]
pub fn qr_payload(ticket_number: &str) -> String {
    URL_SAFE_NO_PAD.encode(format!("{TOKEN_PREFIX}{ticket_number}"))
}

/// Decode a QR payload back to its ticket number, if valid.
#[must_use]
pub fn decode_qr_payload(payload: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let token = String::from_utf8(bytes).ok()?;
    token.strip_prefix(TOKEN_PREFIX).map(ToString::to_string)
}
