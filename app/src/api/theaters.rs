//! Theater catalog endpoints. Reads are public; partners create and update
//! their own theaters, admins approve them (see `admin`).

use super::catalog_error_to_http;
use crate::auth::middleware::RequirePartner;
use crate::catalog::{NewTheater, TheaterUpdate};
use crate::server::state::AppState;
use crate::types::{Theater, TheaterId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use marquee_web::error::AppError;
use uuid::Uuid;

/// List active, approved theaters.
pub async fn list_theaters(State(state): State<AppState>) -> Json<Vec<Theater>> {
    Json(state.catalog.list_theaters().await)
}

/// Fetch one theater.
///
/// # Errors
///
/// `404` if absent.
pub async fn get_theater(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Theater>, AppError> {
    state
        .catalog
        .get_theater(TheaterId::from_uuid(id))
        .await
        .map(Json)
        .map_err(|e| catalog_error_to_http(&e))
}

/// Create a theater (partner). Starts unapproved; an admin must approve it
/// before shows can be created.
///
/// # Errors
///
/// `422` for invalid input.
pub async fn create_theater(
    RequirePartner(session): RequirePartner,
    State(state): State<AppState>,
    Json(new): Json<NewTheater>,
) -> Result<(StatusCode, Json<Theater>), AppError> {
    let theater = state
        .catalog
        .create_theater(session.user_id, new)
        .await
        .map_err(|e| catalog_error_to_http(&e))?;
    Ok((StatusCode::CREATED, Json(theater)))
}

/// Partially update an owned theater (partner).
///
/// # Errors
///
/// `404` unknown theater, `403` not the owner.
pub async fn update_theater(
    RequirePartner(session): RequirePartner,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(update): Json<TheaterUpdate>,
) -> Result<Json<Theater>, AppError> {
    state
        .catalog
        .update_theater(session.user_id, TheaterId::from_uuid(id), update)
        .await
        .map(Json)
        .map_err(|e| catalog_error_to_http(&e))
}
