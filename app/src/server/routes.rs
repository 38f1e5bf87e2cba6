//! Router assembly.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{admin, bookings, movies, partners, shows, theaters};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Build the complete router: health checks plus the `/api` surface.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Bookings (the core flow)
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/user", get(bookings::get_user_bookings))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/payment", post(bookings::confirm_payment))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        // Shows
        .route("/shows", get(shows::list_shows))
        .route("/shows/:id", get(shows::get_show))
        .route("/shows/:id/availability", get(shows::get_availability))
        .route("/shows/:id", delete(shows::delete_show))
        // Movies (mutation admin-gated)
        .route("/movies", get(movies::list_movies))
        .route("/movies", post(movies::create_movie))
        .route("/movies/:id", get(movies::get_movie))
        .route("/movies/:id", put(movies::update_movie))
        .route("/movies/:id", delete(movies::delete_movie))
        // Theaters (partner-created)
        .route("/theaters", get(theaters::list_theaters))
        .route("/theaters", post(theaters::create_theater))
        .route("/theaters/:id", get(theaters::get_theater))
        .route("/theaters/:id", put(theaters::update_theater))
        // Partner management
        .route("/partners/theaters", get(partners::my_theaters))
        .route("/partners/shows", get(partners::my_shows))
        .route(
            "/partners/theaters/:id/shows",
            post(partners::create_show),
        )
        .route("/partners/revenue", get(partners::my_revenue))
        // Admin
        .route("/admin/theaters/pending", get(admin::pending_theaters))
        .route("/admin/theaters/:id/approve", post(admin::approve_theater))
        .route("/admin/theaters/:id/reject", post(admin::reject_theater))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/sessions", post(admin::create_session));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .with_state(state)
}
