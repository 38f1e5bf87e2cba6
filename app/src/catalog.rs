//! Catalog document store: movies, theaters, shows.
//!
//! Catalog CRUD is a thin collaborator around the booking core. Documents
//! live in an in-memory store behind an async lock; the booking ledger
//! remains the single source of truth for seat occupancy.

use crate::types::{
    CastMember, Location, Movie, MovieId, Screen, SeatPricing, SeatSpec, Show, ShowId, Theater,
    TheaterId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from catalog operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Entity id absent.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requester does not own the document.
    #[error("Access denied")]
    AccessDenied,

    /// The theater has not been approved by an admin yet.
    #[error("Theater is not approved")]
    NotApproved,

    /// Malformed input.
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Input for creating a movie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovie {
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
}

/// Partial update for a movie; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieUpdate {
    /// New title.
    pub title: Option<String>,
    /// New synopsis.
    pub description: Option<String>,
    /// New rating.
    pub rating: Option<f32>,
    /// New poster URL.
    pub poster: Option<String>,
    /// New trailer URL.
    pub trailer: Option<String>,
}

/// Input for creating a theater.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTheater {
    /// Display name.
    pub name: String,
    /// Postal location.
    pub location: Location,
    /// Screens with their seat templates.
    pub screens: Vec<Screen>,
    /// Amenities offered.
    pub amenities: Vec<String>,
}

/// Partial update for a theater; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TheaterUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New amenities list.
    pub amenities: Option<Vec<String>>,
    /// New postal location.
    pub location: Option<Location>,
}

/// Input for creating a show on a theater screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShow {
    /// Movie to screen.
    pub movie: MovieId,
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
}

#[derive(Debug, Default)]
struct CatalogState {
    movies: HashMap<MovieId, Movie>,
    theaters: HashMap<TheaterId, Theater>,
    shows: HashMap<ShowId, Show>,
}

/// The catalog store.
#[derive(Debug, Default)]
pub struct CatalogStore {
    state: RwLock<CatalogState>,
}

impl CatalogStore {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Movies ----

    /// Create a movie (admin).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for an empty title.
    pub async fn create_movie(&self, new: NewMovie) -> Result<Movie, CatalogError> {
        if new.title.trim().is_empty() {
            return Err(CatalogError::Validation("title is required".to_string()));
        }

        let movie = Movie {
            id: MovieId::new(),
            title: new.title,
            description: new.description,
            release_date: new.release_date,
            duration_minutes: new.duration_minutes,
            genres: new.genres,
            language: new.language,
            rating: new.rating,
            poster: new.poster,
            trailer: new.trailer,
            cast: new.cast,
            director: new.director,
            is_active: true,
            created_at: Utc::now(),
        };

        self.state
            .write()
            .await
            .movies
            .insert(movie.id, movie.clone());
        Ok(movie)
    }

    /// Active movies, newest first.
    pub async fn list_movies(&self) -> Vec<Movie> {
        let state = self.state.read().await;
        let mut movies: Vec<Movie> = state.movies.values().filter(|m| m.is_active).cloned().collect();
        movies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        movies
    }

    /// A movie by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if absent.
    pub async fn get_movie(&self, id: MovieId) -> Result<Movie, CatalogError> {
        self.state
            .read()
            .await
            .movies
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound("Movie"))
    }

    /// Apply a partial update to a movie (admin).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if absent.
    pub async fn update_movie(&self, id: MovieId, update: MovieUpdate) -> Result<Movie, CatalogError> {
        let mut state = self.state.write().await;
        let movie = state
            .movies
            .get_mut(&id)
            .ok_or(CatalogError::NotFound("Movie"))?;

        if let Some(title) = update.title {
            movie.title = title;
        }
        if let Some(description) = update.description {
            movie.description = description;
        }
        if let Some(rating) = update.rating {
            movie.rating = rating;
        }
        if let Some(poster) = update.poster {
            movie.poster = poster;
        }
        if let Some(trailer) = update.trailer {
            movie.trailer = Some(trailer);
        }
        Ok(movie.clone())
    }

    /// Soft-delete a movie (admin).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if absent.
    pub async fn delete_movie(&self, id: MovieId) -> Result<(), CatalogError> {
        let mut state = self.state.write().await;
        let movie = state
            .movies
            .get_mut(&id)
            .ok_or(CatalogError::NotFound("Movie"))?;
        movie.is_active = false;
        Ok(())
    }

    // ---- Theaters ----

    /// Create a theater owned by `partner`. Starts unapproved.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for an empty name or no screens.
    pub async fn create_theater(
        &self,
        partner: UserId,
        new: NewTheater,
    ) -> Result<Theater, CatalogError> {
        if new.name.trim().is_empty() {
            return Err(CatalogError::Validation("name is required".to_string()));
        }
        if new.screens.is_empty() {
            return Err(CatalogError::Validation(
                "at least one screen is required".to_string(),
            ));
        }

        let theater = Theater {
            id: TheaterId::new(),
            name: new.name,
            location: new.location,
            screens: new.screens,
            amenities: new.amenities,
            partner,
            is_approved: false,
            is_active: true,
            created_at: Utc::now(),
        };

        self.state
            .write()
            .await
            .theaters
            .insert(theater.id, theater.clone());
        Ok(theater)
    }

    /// Active, approved theaters, newest first.
    pub async fn list_theaters(&self) -> Vec<Theater> {
        let state = self.state.read().await;
        let mut theaters: Vec<Theater> = state
            .theaters
            .values()
            .filter(|t| t.is_active && t.is_approved)
            .cloned()
            .collect();
        theaters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        theaters
    }

    /// A theater by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if absent.
    pub async fn get_theater(&self, id: TheaterId) -> Result<Theater, CatalogError> {
        self.state
            .read()
            .await
            .theaters
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound("Theater"))
    }

    /// Theaters owned by `partner`, newest first.
    pub async fn theaters_for_partner(&self, partner: UserId) -> Vec<Theater> {
        let state = self.state.read().await;
        let mut theaters: Vec<Theater> = state
            .theaters
            .values()
            .filter(|t| t.partner == partner)
            .cloned()
            .collect();
        theaters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        theaters
    }

    /// Apply a partial update to a theater; only its owning partner may.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] or [`CatalogError::AccessDenied`].
    pub async fn update_theater(
        &self,
        partner: UserId,
        id: TheaterId,
        update: TheaterUpdate,
    ) -> Result<Theater, CatalogError> {
        let mut state = self.state.write().await;
        let theater = state
            .theaters
            .get_mut(&id)
            .ok_or(CatalogError::NotFound("Theater"))?;
        if theater.partner != partner {
            return Err(CatalogError::AccessDenied);
        }

        if let Some(name) = update.name {
            theater.name = name;
        }
        if let Some(amenities) = update.amenities {
            theater.amenities = amenities;
        }
        if let Some(location) = update.location {
            theater.location = location;
        }
        Ok(theater.clone())
    }

    /// Theaters awaiting approval, newest first (admin).
    pub async fn pending_theaters(&self) -> Vec<Theater> {
        let state = self.state.read().await;
        let mut theaters: Vec<Theater> = state
            .theaters
            .values()
            .filter(|t| t.is_active && !t.is_approved)
            .cloned()
            .collect();
        theaters.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        theaters
    }

    /// Approve a theater (admin). Returns the updated document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if absent.
    pub async fn approve_theater(&self, id: TheaterId) -> Result<Theater, CatalogError> {
        let mut state = self.state.write().await;
        let theater = state
            .theaters
            .get_mut(&id)
            .ok_or(CatalogError::NotFound("Theater"))?;
        theater.is_approved = true;
        Ok(theater.clone())
    }

    /// Reject a theater (admin): deactivates it. Returns the updated
    /// document.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if absent.
    pub async fn reject_theater(&self, id: TheaterId) -> Result<Theater, CatalogError> {
        let mut state = self.state.write().await;
        let theater = state
            .theaters
            .get_mut(&id)
            .ok_or(CatalogError::NotFound("Theater"))?;
        theater.is_active = false;
        Ok(theater.clone())
    }

    // ---- Shows ----

    /// Create a show on one of `partner`'s approved theaters.
    ///
    /// Returns the show plus the priced seat declarations derived from the
    /// screen's template, ready to register with the booking ledger.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] for a missing theater, movie, or screen;
    /// [`CatalogError::AccessDenied`] if `partner` does not own the theater;
    /// [`CatalogError::NotApproved`] if the theater awaits approval.
    pub async fn create_show(
        &self,
        partner: UserId,
        theater_id: TheaterId,
        new: NewShow,
    ) -> Result<(Show, Vec<SeatSpec>), CatalogError> {
        let mut state = self.state.write().await;

        if !state.movies.get(&new.movie).is_some_and(|m| m.is_active) {
            return Err(CatalogError::NotFound("Movie"));
        }

        let theater = state
            .theaters
            .get(&theater_id)
            .ok_or(CatalogError::NotFound("Theater"))?;
        if theater.partner != partner {
            return Err(CatalogError::AccessDenied);
        }
        if !theater.is_approved || !theater.is_active {
            return Err(CatalogError::NotApproved);
        }

        let screen = theater
            .screens
            .iter()
            .find(|s| s.screen_number == new.screen)
            .ok_or(CatalogError::NotFound("Screen"))?;

        let seats: Vec<SeatSpec> = screen
            .seats
            .iter()
            .map(|(key, category)| SeatSpec {
                key: key.clone(),
                category: *category,
                price: new.pricing.for_category(*category),
            })
            .collect();
        if seats.is_empty() {
            return Err(CatalogError::Validation(
                "screen has no seats".to_string(),
            ));
        }

        let show = Show {
            id: ShowId::new(),
            movie: new.movie,
            theater: theater_id,
            screen: new.screen,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            pricing: new.pricing,
            is_active: true,
            created_at: Utc::now(),
        };
        state.shows.insert(show.id, show.clone());

        Ok((show, seats))
    }

    /// Active shows, soonest first.
    pub async fn list_shows(&self) -> Vec<Show> {
        let state = self.state.read().await;
        let mut shows: Vec<Show> = state.shows.values().filter(|s| s.is_active).cloned().collect();
        shows.sort_by(|a, b| a.date.cmp(&b.date).then(a.start_time.cmp(&b.start_time)));
        shows
    }

    /// A show by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if absent.
    pub async fn get_show(&self, id: ShowId) -> Result<Show, CatalogError> {
        self.state
            .read()
            .await
            .shows
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound("Show"))
    }

    /// Shows owned by `partner`, across all their theaters.
    pub async fn shows_for_partner(&self, partner: UserId) -> Vec<Show> {
        let state = self.state.read().await;
        let theater_ids: Vec<TheaterId> = state
            .theaters
            .values()
            .filter(|t| t.partner == partner)
            .map(|t| t.id)
            .collect();
        let mut shows: Vec<Show> = state
            .shows
            .values()
            .filter(|s| theater_ids.contains(&s.theater))
            .cloned()
            .collect();
        shows.sort_by(|a, b| a.date.cmp(&b.date));
        shows
    }

    /// Soft-delete a show; only its owning partner may do so.
    ///
    /// # Errors
    ///
    /// [`CatalogError::NotFound`] or [`CatalogError::AccessDenied`].
    pub async fn deactivate_show(&self, partner: UserId, id: ShowId) -> Result<(), CatalogError> {
        let mut state = self.state.write().await;
        let theater_id = state
            .shows
            .get(&id)
            .map(|s| s.theater)
            .ok_or(CatalogError::NotFound("Show"))?;
        let owned = state
            .theaters
            .get(&theater_id)
            .is_some_and(|t| t.partner == partner);
        if !owned {
            return Err(CatalogError::AccessDenied);
        }
        if let Some(show) = state.shows.get_mut(&id) {
            show.is_active = false;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Money, SeatCategory, SeatKey};

    fn new_movie(title: &str) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            description: "A film".to_string(),
            release_date: Utc::now(),
            duration_minutes: 120,
            genres: vec!["Drama".to_string()],
            language: "English".to_string(),
            rating: 7.5,
            poster: "https://example.com/poster.jpg".to_string(),
            trailer: None,
            cast: Vec::new(),
            director: "Someone".to_string(),
        }
    }

    fn new_theater() -> NewTheater {
        NewTheater {
            name: "Grand Cinema".to_string(),
            location: Location {
                address: "1 Main St".to_string(),
                city: "Pune".to_string(),
                state: "MH".to_string(),
                pincode: "411001".to_string(),
            },
            screens: vec![Screen {
                screen_number: 1,
                seats: vec![
                    (SeatKey::new("A", 1), SeatCategory::Vip),
                    (SeatKey::new("B", 1), SeatCategory::Normal),
                ],
            }],
            amenities: vec!["Parking".to_string()],
        }
    }

    fn new_show(movie: MovieId) -> NewShow {
        NewShow {
            movie,
            screen: 1,
            date: Utc::now(),
            start_time: "18:30".to_string(),
            end_time: "21:00".to_string(),
            pricing: SeatPricing {
                normal: Money::from_major(90),
                premium: Money::from_major(120),
                vip: Money::from_major(200),
            },
        }
    }

    #[tokio::test]
    async fn deleted_movies_disappear_from_listings() {
        let catalog = CatalogStore::new();
        let movie = catalog.create_movie(new_movie("First")).await.unwrap();
        catalog.create_movie(new_movie("Second")).await.unwrap();

        catalog.delete_movie(movie.id).await.unwrap();
        let listed = catalog.list_movies().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Second");

        // Still fetchable by id for history.
        assert!(!catalog.get_movie(movie.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn show_creation_requires_owned_approved_theater() {
        let catalog = CatalogStore::new();
        let partner = UserId::new();
        let movie = catalog.create_movie(new_movie("Film")).await.unwrap();
        let theater = catalog.create_theater(partner, new_theater()).await.unwrap();

        // Unapproved.
        let result = catalog.create_show(partner, theater.id, new_show(movie.id)).await;
        assert_eq!(result.unwrap_err(), CatalogError::NotApproved);

        catalog.approve_theater(theater.id).await.unwrap();

        // Wrong partner.
        let result = catalog
            .create_show(UserId::new(), theater.id, new_show(movie.id))
            .await;
        assert_eq!(result.unwrap_err(), CatalogError::AccessDenied);

        // Owner on an approved theater.
        let (show, seats) = catalog
            .create_show(partner, theater.id, new_show(movie.id))
            .await
            .unwrap();
        assert_eq!(seats.len(), 2);
        let vip = seats.iter().find(|s| s.key == SeatKey::new("A", 1)).unwrap();
        assert_eq!(vip.price, Money::from_major(200));
        assert!(catalog.get_show(show.id).await.is_ok());
    }

    #[tokio::test]
    async fn pending_theaters_surface_for_admins() {
        let catalog = CatalogStore::new();
        let partner = UserId::new();
        let theater = catalog.create_theater(partner, new_theater()).await.unwrap();

        assert_eq!(catalog.pending_theaters().await.len(), 1);
        assert!(catalog.list_theaters().await.is_empty());

        catalog.approve_theater(theater.id).await.unwrap();
        assert!(catalog.pending_theaters().await.is_empty());
        assert_eq!(catalog.list_theaters().await.len(), 1);
    }

    #[tokio::test]
    async fn rejecting_a_theater_deactivates_it() {
        let catalog = CatalogStore::new();
        let theater = catalog
            .create_theater(UserId::new(), new_theater())
            .await
            .unwrap();
        catalog.reject_theater(theater.id).await.unwrap();
        assert!(catalog.pending_theaters().await.is_empty());
        assert!(catalog.list_theaters().await.is_empty());
    }
}
