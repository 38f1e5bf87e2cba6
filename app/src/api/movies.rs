//! Movie catalog endpoints. Reads are public; mutation is admin-gated.

use super::catalog_error_to_http;
use crate::auth::middleware::RequireAdmin;
use crate::catalog::{MovieUpdate, NewMovie};
use crate::server::state::AppState;
use crate::types::{Movie, MovieId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use marquee_web::error::AppError;
use serde::Serialize;
use uuid::Uuid;

/// List active movies, newest first.
pub async fn list_movies(State(state): State<AppState>) -> Json<Vec<Movie>> {
    Json(state.catalog.list_movies().await)
}

/// Fetch one movie.
///
/// # Errors
///
/// `404` if absent.
pub async fn get_movie(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Movie>, AppError> {
    state
        .catalog
        .get_movie(MovieId::from_uuid(id))
        .await
        .map(Json)
        .map_err(|e| catalog_error_to_http(&e))
}

/// Create a movie (admin).
///
/// # Errors
///
/// `422` for invalid input.
pub async fn create_movie(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(new): Json<NewMovie>,
) -> Result<(StatusCode, Json<Movie>), AppError> {
    let movie = state
        .catalog
        .create_movie(new)
        .await
        .map_err(|e| catalog_error_to_http(&e))?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// Partially update a movie (admin).
///
/// # Errors
///
/// `404` if absent.
pub async fn update_movie(
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(update): Json<MovieUpdate>,
) -> Result<Json<Movie>, AppError> {
    state
        .catalog
        .update_movie(MovieId::from_uuid(id), update)
        .await
        .map(Json)
        .map_err(|e| catalog_error_to_http(&e))
}

/// Message-only response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

/// Soft-delete a movie (admin).
///
/// # Errors
///
/// `404` if absent.
pub async fn delete_movie(
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .catalog
        .delete_movie(MovieId::from_uuid(id))
        .await
        .map_err(|e| catalog_error_to_http(&e))?;
    Ok(Json(MessageResponse {
        message: "Movie deleted successfully".to_string(),
    }))
}
