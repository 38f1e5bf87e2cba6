//! Axum extractors for authentication and role checks.
//!
//! Handlers take [`AuthedUser`] to require a valid session,
//! [`RequirePartner`] / [`RequireAdmin`] to additionally gate on role.

use crate::auth::sessions::Session;
use crate::server::state::AppState;
use crate::types::Role;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use marquee_web::error::AppError;

/// Bearer token from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| {
                AppError::unauthorized("Invalid authorization format, expected 'Bearer <token>'")
            })?;

        if token.is_empty() {
            return Err(AppError::unauthorized("Empty bearer token"));
        }

        Ok(Self(token.to_string()))
    }
}

/// An authenticated user of any role.
#[derive(Debug, Clone)]
pub struct AuthedUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AuthedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let session = state
            .sessions
            .resolve(&token)
            .ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;
        Ok(Self(session))
    }
}

/// An authenticated partner.
#[derive(Debug, Clone)]
pub struct RequirePartner(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for RequirePartner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthedUser(session) = AuthedUser::from_request_parts(parts, state).await?;
        if session.role != Role::Partner {
            return Err(AppError::forbidden("Partner role required"));
        }
        Ok(Self(session))
    }
}

/// An authenticated admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthedUser(session) = AuthedUser::from_request_parts(parts, state).await?;
        if session.role != Role::Admin {
            return Err(AppError::forbidden("Admin role required"));
        }
        Ok(Self(session))
    }
}
