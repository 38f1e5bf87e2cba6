//! # Marquee Postgres
//!
//! `PostgreSQL` implementation of the [`EventStore`] trait.
//!
//! Events live in an append-only `events` table; a companion `streams` table
//! carries each stream's current version and is row-locked during appends so
//! the expected-version check and the insert are one atomic unit.

use marquee_core::event::SerializedEvent;
use marquee_core::event_store::{EventStore, EventStoreError};
use marquee_core::stream::{StreamId, Version};
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::future::Future;
use std::pin::Pin;

/// Event store backed by `PostgreSQL`.
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Connect to the database and run the event store migrations.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::StorageError`] if the connection or
    /// migration fails.
    pub async fn new(url: &str) -> Result<Self, EventStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await
            .map_err(|e| EventStoreError::StorageError(e.to_string()))?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing connection pool. Does not run migrations.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the event store schema.
    ///
    /// # Errors
    ///
    /// Returns [`EventStoreError::StorageError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), EventStoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| EventStoreError::StorageError(e.to_string()))
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)] // versions fit i64 for any realistic stream
impl EventStore for PostgresEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, EventStoreError>> + Send + '_>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| EventStoreError::StorageError(e.to_string()))?;

            // Lock the stream row for the duration of the append.
            let row = sqlx::query(
                "INSERT INTO streams (stream_id, version) VALUES ($1, 0)
                 ON CONFLICT (stream_id) DO UPDATE SET version = streams.version
                 RETURNING version",
            )
            .bind(stream_id.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| EventStoreError::StorageError(e.to_string()))?;

            let current: i64 = row
                .try_get("version")
                .map_err(|e| EventStoreError::StorageError(e.to_string()))?;
            let current = Version::new(current as u64);

            if let Some(expected) = expected_version {
                if expected != current {
                    return Err(EventStoreError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual: current,
                    });
                }
            }

            let mut version = current;
            for event in &events {
                version = version.next();
                sqlx::query(
                    "INSERT INTO events (stream_id, version, event_type, data, metadata)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(stream_id.as_str())
                .bind(version.value() as i64)
                .bind(&event.event_type)
                .bind(&event.data)
                .bind(&event.metadata)
                .execute(&mut *tx)
                .await
                .map_err(|e| EventStoreError::StorageError(e.to_string()))?;
            }

            sqlx::query("UPDATE streams SET version = $2 WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .bind(version.value() as i64)
                .execute(&mut *tx)
                .await
                .map_err(|e| EventStoreError::StorageError(e.to_string()))?;

            tx.commit()
                .await
                .map_err(|e| EventStoreError::StorageError(e.to_string()))?;

            tracing::debug!(stream = %stream_id, version = %version, "Appended events");
            Ok(version)
        })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SerializedEvent>, EventStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let from = from_version.map_or(1, |v| v.value() as i64);

            let rows = sqlx::query(
                "SELECT event_type, data, metadata FROM events
                 WHERE stream_id = $1 AND version >= $2
                 ORDER BY version ASC",
            )
            .bind(stream_id.as_str())
            .bind(from)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EventStoreError::StorageError(e.to_string()))?;

            rows.into_iter()
                .map(|row| {
                    Ok(SerializedEvent::new(
                        row.try_get("event_type")
                            .map_err(|e| EventStoreError::StorageError(e.to_string()))?,
                        row.try_get("data")
                            .map_err(|e| EventStoreError::StorageError(e.to_string()))?,
                        row.try_get("metadata")
                            .map_err(|e| EventStoreError::StorageError(e.to_string()))?,
                    ))
                })
                .collect()
        })
    }
}
