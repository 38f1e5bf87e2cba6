//! Partner endpoints: theater/show management and revenue reporting.

use super::catalog_error_to_http;
use crate::aggregates::booking::BookingAction;
use crate::auth::middleware::RequirePartner;
use crate::catalog::NewShow;
use crate::server::state::AppState;
use crate::types::{Show, Theater, TheaterId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use marquee_web::error::AppError;
use serde::Serialize;
use uuid::Uuid;

/// The caller's theaters, approved or not.
pub async fn my_theaters(
    RequirePartner(session): RequirePartner,
    State(state): State<AppState>,
) -> Json<Vec<Theater>> {
    Json(state.catalog.theaters_for_partner(session.user_id).await)
}

/// The caller's shows across all their theaters.
pub async fn my_shows(
    RequirePartner(session): RequirePartner,
    State(state): State<AppState>,
) -> Json<Vec<Show>> {
    Json(state.catalog.shows_for_partner(session.user_id).await)
}

/// Create a show on an owned, approved theater and register its seat map
/// with the booking ledger.
///
/// # Errors
///
/// `404` unknown theater/movie/screen, `403` not the owner or unapproved
/// theater, `500` if the seat map could not be registered (the show is
/// rolled back).
pub async fn create_show(
    RequirePartner(session): RequirePartner,
    Path(theater_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(new): Json<NewShow>,
) -> Result<(StatusCode, Json<Show>), AppError> {
    let (show, seats) = state
        .catalog
        .create_show(session.user_id, TheaterId::from_uuid(theater_id), new)
        .await
        .map_err(|e| catalog_error_to_http(&e))?;

    state
        .ledger
        .send(BookingAction::RegisterShow {
            show_id: show.id,
            seats,
        })
        .await
        .map_err(|e| AppError::internal(format!("Seat map registration failed: {e}")))?;

    // The reducer ran synchronously inside send; verify the seat map landed.
    let registered = state
        .ledger
        .state(|s| s.seat_map(&show.id).is_some())
        .await;
    if !registered {
        let _ = state.catalog.deactivate_show(session.user_id, show.id).await;
        return Err(AppError::internal("Seat map registration was rejected"));
    }

    Ok((StatusCode::CREATED, Json(show)))
}

/// Revenue for one show.
#[derive(Debug, Serialize)]
pub struct ShowRevenue {
    /// The show.
    pub show_id: Uuid,
    /// Completed revenue in minor currency units.
    pub revenue: u64,
}

/// Revenue report for a partner.
#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    /// Per-show breakdown.
    pub shows: Vec<ShowRevenue>,
    /// Sum across all shows, minor currency units.
    pub total: u64,
}

/// Completed revenue across the caller's shows.
pub async fn my_revenue(
    RequirePartner(session): RequirePartner,
    State(state): State<AppState>,
) -> Json<RevenueResponse> {
    let shows = state.catalog.shows_for_partner(session.user_id).await;
    let revenue_by_show = state.ledger.state(|s| s.revenue_by_show()).await;

    let mut total: u64 = 0;
    let show_revenues: Vec<ShowRevenue> = shows
        .iter()
        .map(|show| {
            let revenue = revenue_by_show
                .get(&show.id)
                .map_or(0, |amount| amount.cents());
            total = total.saturating_add(revenue);
            ShowRevenue {
                show_id: *show.id.as_uuid(),
                revenue,
            }
        })
        .collect();

    Json(RevenueResponse {
        shows: show_revenues,
        total,
    })
}
