//! Shared state for HTTP handlers.

use crate::app::{LedgerStore, Platform};
use crate::auth::sessions::SessionStore;
use crate::catalog::CatalogStore;
use crate::notifications::Notifier;
use crate::projections::CustomerBookingsProjection;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything handlers need, cloned cheaply per request.
#[derive(Clone)]
pub struct AppState {
    /// The booking ledger store (write side).
    pub ledger: Arc<LedgerStore>,
    /// Catalog documents.
    pub catalog: Arc<CatalogStore>,
    /// Bearer-token sessions.
    pub sessions: Arc<SessionStore>,
    /// Customer booking history (read side).
    pub history: Arc<RwLock<CustomerBookingsProjection>>,
    /// Messaging collaborator for approval notifications.
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Build handler state from an assembled platform.
    #[must_use]
    pub fn from_platform(platform: &Platform) -> Self {
        Self {
            ledger: Arc::clone(&platform.ledger),
            catalog: Arc::clone(&platform.catalog),
            sessions: Arc::clone(&platform.sessions),
            history: Arc::clone(&platform.history),
            notifier: Arc::clone(&platform.notifier),
        }
    }
}
