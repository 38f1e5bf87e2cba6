//! Request extractors shared across handlers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use uuid::Uuid;

/// Correlation id for tracing a request across the action feedback loop.
///
/// Read from the `x-correlation-id` header when present and parseable,
/// otherwise freshly generated. Extraction never fails.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-correlation-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .unwrap_or_else(Uuid::new_v4);
        Ok(Self(id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn uses_header_when_present() {
        let id = Uuid::new_v4();
        let (mut parts, ()) = Request::builder()
            .header("x-correlation-id", id.to_string())
            .body(())
            .unwrap()
            .into_parts();

        let CorrelationId(extracted) = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(extracted, id);
    }

    #[tokio::test]
    async fn generates_when_missing() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();

        let CorrelationId(a) = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        let CorrelationId(b) = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_ne!(a, b);
    }
}
