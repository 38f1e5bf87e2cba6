//! Show endpoints: listing, detail, live seat availability.

use super::catalog_error_to_http;
use crate::auth::middleware::RequirePartner;
use crate::server::state::AppState;
use crate::types::{SeatCategory, Show, ShowId};
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use marquee_web::error::AppError;
use serde::Serialize;
use uuid::Uuid;

/// List active shows, soonest first.
pub async fn list_shows(State(state): State<AppState>) -> Json<Vec<Show>> {
    Json(state.catalog.list_shows().await)
}

/// Fetch one show.
///
/// # Errors
///
/// `404` if absent.
pub async fn get_show(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Show>, AppError> {
    state
        .catalog
        .get_show(ShowId::from_uuid(id))
        .await
        .map(Json)
        .map_err(|e| catalog_error_to_http(&e))
}

/// One seat in the availability view.
#[derive(Debug, Serialize)]
pub struct SeatView {
    /// Row label.
    pub row: String,
    /// Seat number within the row.
    pub number: u32,
    /// Seat category.
    pub category: SeatCategory,
    /// Price in minor currency units.
    pub price: u64,
    /// `available`, `held`, or `booked`.
    pub status: &'static str,
}

/// Seat availability for one show.
#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    /// The show queried.
    pub show_id: Uuid,
    /// Total seats.
    pub total: usize,
    /// Seats currently reservable.
    pub available: usize,
    /// Per-seat detail in row/number order.
    pub seats: Vec<SeatView>,
}

/// Live seat availability from the booking ledger.
///
/// # Errors
///
/// `404` if the show has no registered seat map.
pub async fn get_availability(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let show_id = ShowId::from_uuid(id);
    let now = Utc::now();

    let snapshot = state
        .ledger
        .state(|s| {
            s.seat_map(&show_id).map(|seat_map| {
                let seats: Vec<SeatView> = seat_map
                    .seats()
                    .map(|(key, record)| SeatView {
                        row: key.row.clone(),
                        number: key.number,
                        category: record.category,
                        price: record.price.cents(),
                        status: if record.is_available(now) {
                            "available"
                        } else if matches!(
                            record.status,
                            crate::aggregates::seat_map::SeatStatus::Booked { .. }
                        ) {
                            "booked"
                        } else {
                            "held"
                        },
                    })
                    .collect();
                (seat_map.available_count(now), seats)
            })
        })
        .await;

    let Some((available, seats)) = snapshot else {
        return Err(AppError::not_found("Show", show_id));
    };

    Ok(Json(AvailabilityResponse {
        show_id: id,
        total: seats.len(),
        available,
        seats,
    }))
}

/// Message-only response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// Soft-delete a show; partner-gated, owner only. Seats already sold stay
/// valid.
///
/// # Errors
///
/// `404` unknown show, `403` not the owning partner.
pub async fn delete_show(
    RequirePartner(session): RequirePartner,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .catalog
        .deactivate_show(session.user_id, ShowId::from_uuid(id))
        .await
        .map_err(|e| catalog_error_to_http(&e))?;
    Ok(Json(MessageResponse {
        message: "Show deleted successfully".to_string(),
    }))
}
