//! Configuration, loaded from environment variables with defaults that work
//! for local development.

use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Event store settings.
    pub database: DatabaseConfig,
    /// Payment gateway settings.
    pub gateway: GatewayConfig,
    /// Booking lifecycle settings.
    pub booking: BookingConfig,
    /// Authentication settings.
    pub auth: AuthConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Graceful shutdown timeout in seconds.
    pub shutdown_timeout: u64,
}

/// Event store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` URL for the event store. Unset runs the in-memory store
    /// (development only: events do not survive a restart).
    pub url: Option<String>,
}

/// Payment gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Shared secret for payment signature verification.
    pub key_secret: String,
    /// ISO currency code for charges.
    pub currency: String,
}

/// Booking lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Seconds an unpaid seat hold lives before auto-release.
    pub hold_ttl_secs: u64,
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Fixed admin bearer token installed at startup; used to bootstrap
    /// sessions for everyone else. Unset disables the bootstrap login.
    pub admin_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                shutdown_timeout: env::var("SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
            },
            gateway: GatewayConfig {
                key_secret: env::var("GATEWAY_KEY_SECRET")
                    .unwrap_or_else(|_| "dev-secret-change-in-production".to_string()),
                currency: env::var("GATEWAY_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            },
            booking: BookingConfig {
                hold_ttl_secs: env::var("BOOKING_HOLD_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            },
            auth: AuthConfig {
                admin_token: env::var("AUTH_ADMIN_TOKEN").ok(),
            },
        }
    }
}
