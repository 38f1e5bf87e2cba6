//! Platform assembly: wires the ledger store, catalog, sessions, and the
//! history projection together from configuration.

use crate::aggregates::booking::{BookingAction, BookingEnvironment, BookingReducer};
use crate::auth::sessions::SessionStore;
use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::events::{LEDGER_TOPIC, PlatformEvent};
use crate::notifications::{LogNotifier, Notifier};
use crate::payments::{MockPaymentGateway, PaymentGateway};
use crate::projections::CustomerBookingsProjection;
use crate::types::{LedgerState, Role, UserId};
use chrono::Duration;
use futures::StreamExt;
use marquee_core::environment::SystemClock;
use marquee_core::event::{Event, EventError};
use marquee_core::event_bus::EventBus;
use marquee_core::event_store::{EventStore, EventStoreError};
use marquee_core::projection::Projection;
use marquee_core::stream::StreamId;
use marquee_postgres::PostgresEventStore;
use marquee_runtime::{BroadcastEventBus, Store};
use marquee_testing::mocks::InMemoryEventStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Stream the booking ledger persists to.
const LEDGER_STREAM: &str = "ledger";

/// The ledger aggregate store.
pub type LedgerStore = Store<LedgerState, BookingAction, BookingEnvironment, BookingReducer>;

/// Errors during platform assembly.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Event store failed.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A persisted event failed to decode.
    #[error("Event decoding error: {0}")]
    Events(#[from] EventError),

    /// Event bus failed.
    #[error("Event bus error: {0}")]
    EventBus(String),
}

/// The assembled platform.
pub struct Platform {
    /// The booking ledger store.
    pub ledger: Arc<LedgerStore>,
    /// Catalog documents.
    pub catalog: Arc<CatalogStore>,
    /// Bearer-token sessions.
    pub sessions: Arc<SessionStore>,
    /// Customer booking history read model.
    pub history: Arc<RwLock<CustomerBookingsProjection>>,
    /// Messaging collaborator (also used directly by admin approval).
    pub notifier: Arc<dyn Notifier>,
    event_bus: Arc<dyn EventBus>,
    config: Config,
}

impl Platform {
    /// Assemble the platform with default collaborators: Postgres event
    /// store when `DATABASE_URL` is set (in-memory otherwise), the mock
    /// payment gateway, and the logging notifier.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the event store cannot be reached or
    /// the persisted stream fails to decode.
    pub async fn new(config: Config) -> Result<Self, PlatformError> {
        let event_store: Arc<dyn EventStore> = match &config.database.url {
            Some(url) => {
                tracing::info!("Connecting to Postgres event store");
                Arc::new(PostgresEventStore::new(url).await?)
            }
            None => {
                tracing::warn!("DATABASE_URL unset, using in-memory event store");
                Arc::new(InMemoryEventStore::new())
            }
        };
        let gateway = MockPaymentGateway::shared(config.gateway.key_secret.clone());
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        Self::with_collaborators(config, event_store, gateway, notifier).await
    }

    /// Assemble the platform with explicit collaborators (tests inject
    /// failing gateways and recording notifiers here).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the persisted stream fails to decode.
    pub async fn with_collaborators(
        config: Config,
        event_store: Arc<dyn EventStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, PlatformError> {
        let event_bus: Arc<dyn EventBus> = Arc::new(BroadcastEventBus::default());

        // Rebuild ledger state from the persisted stream.
        let events = event_store
            .load_events(StreamId::new(LEDGER_STREAM), None)
            .await?;
        let mut state = LedgerState::new();
        BookingReducer::rehydrate(&mut state, &events)?;
        tracing::info!(
            events = events.len(),
            bookings = state.bookings.len(),
            shows = state.seat_maps.len(),
            "Ledger state rehydrated"
        );

        let env = BookingEnvironment::new(
            Arc::new(SystemClock),
            event_store,
            Arc::clone(&event_bus),
            StreamId::new(LEDGER_STREAM),
            gateway,
            Arc::clone(&notifier),
            Duration::seconds(i64::try_from(config.booking.hold_ttl_secs).unwrap_or(600)),
            config.gateway.currency.clone(),
        );
        let ledger = Arc::new(Store::new(state, BookingReducer::new(), env));

        let sessions = Arc::new(SessionStore::new());
        if let Some(token) = &config.auth.admin_token {
            sessions.install(
                token.clone(),
                UserId::new(),
                "admin@marquee.local",
                Role::Admin,
            );
            tracing::info!("Bootstrap admin session installed");
        }

        Ok(Self {
            ledger,
            catalog: Arc::new(CatalogStore::new()),
            sessions,
            history: Arc::new(RwLock::new(CustomerBookingsProjection::new())),
            notifier,
            event_bus,
            config,
        })
    }

    /// Start background processing: the history projection consumer.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::EventBus`] if the subscription fails.
    pub async fn start(&self) -> Result<(), PlatformError> {
        let mut stream = self
            .event_bus
            .subscribe(&[LEDGER_TOPIC])
            .await
            .map_err(|e| PlatformError::EventBus(e.to_string()))?;

        let history = Arc::clone(&self.history);
        tokio::spawn(async move {
            tracing::info!("History projection consumer started");
            while let Some(result) = stream.next().await {
                match result {
                    Ok(serialized) => match PlatformEvent::from_bytes(&serialized.data) {
                        Ok(event) => {
                            if let Err(e) = history.write().await.handle_event(&event) {
                                tracing::error!(error = %e, "History projection update failed");
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to decode ledger event");
                        }
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "Ledger event stream error");
                    }
                }
            }
            tracing::warn!("History projection consumer ended");
        });

        Ok(())
    }

    /// The loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}
