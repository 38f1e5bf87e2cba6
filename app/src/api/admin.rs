//! Admin endpoints: theater approval workflow, platform stats, session
//! provisioning.

use super::catalog_error_to_http;
use crate::auth::middleware::RequireAdmin;
use crate::server::state::AppState;
use crate::types::{PaymentStatus, Role, Theater, TheaterId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use marquee_web::error::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Theaters awaiting approval.
pub async fn pending_theaters(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Json<Vec<Theater>> {
    Json(state.catalog.pending_theaters().await)
}

/// Message-only response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// Approve a theater and notify its partner.
///
/// # Errors
///
/// `404` if absent.
pub async fn approve_theater(
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let theater = state
        .catalog
        .approve_theater(TheaterId::from_uuid(id))
        .await
        .map_err(|e| catalog_error_to_http(&e))?;

    // Fire-and-forget: a failed notification never blocks the approval.
    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        notifier.account_status(theater.partner, true).await;
    });

    Ok(Json(MessageResponse {
        message: "Theater approved successfully".to_string(),
    }))
}

/// Reject a theater and notify its partner.
///
/// # Errors
///
/// `404` if absent.
pub async fn reject_theater(
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let theater = state
        .catalog
        .reject_theater(TheaterId::from_uuid(id))
        .await
        .map_err(|e| catalog_error_to_http(&e))?;

    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        notifier.account_status(theater.partner, false).await;
    });

    Ok(Json(MessageResponse {
        message: "Theater rejected successfully".to_string(),
    }))
}

/// Platform-wide statistics.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// All bookings ever placed.
    pub total_bookings: usize,
    /// Bookings currently completed.
    pub completed_bookings: usize,
    /// Completed revenue in minor currency units.
    pub total_revenue: u64,
    /// Active catalog movies.
    pub active_movies: usize,
    /// Active catalog shows.
    pub active_shows: usize,
}

/// Aggregate statistics across the ledger and catalog.
pub async fn stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Json<StatsResponse> {
    let (total_bookings, completed_bookings, total_revenue) = state
        .ledger
        .state(|s| {
            let completed = s
                .bookings
                .values()
                .filter(|b| b.payment_status == PaymentStatus::Completed)
                .count();
            let revenue: u64 = s
                .revenue_by_show()
                .values()
                .fold(0u64, |acc, amount| acc.saturating_add(amount.cents()));
            (s.bookings.len(), completed, revenue)
        })
        .await;

    let active_movies = state.catalog.list_movies().await.len();
    let active_shows = state.catalog.list_shows().await.len();

    Json(StatsResponse {
        total_bookings,
        completed_bookings,
        total_revenue,
        active_movies,
        active_shows,
    })
}

/// Request body for provisioning a session.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Contact address for the new session.
    pub email: String,
    /// Role granted to the token.
    pub role: Role,
}

/// Response carrying a provisioned session.
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    /// Bearer token to authenticate with.
    pub token: String,
    /// The user id behind the token.
    pub user_id: Uuid,
    /// Role granted.
    pub role: Role,
}

/// Provision a bearer token for a customer, partner, or admin. Account
/// management proper lives outside this service; this is the admin's
/// bootstrap lever.
///
/// # Errors
///
/// `422` for a blank email.
pub async fn create_session(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    if request.email.trim().is_empty() {
        return Err(AppError::validation("email is required"));
    }

    let (token, user_id) = state.sessions.issue(request.email, request.role);
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            token,
            user_id: *user_id.as_uuid(),
            role: request.role,
        }),
    ))
}
