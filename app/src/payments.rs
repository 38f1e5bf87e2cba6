//! Payment gateway adapter.
//!
//! The coordinator only ever talks to the [`PaymentGateway`] trait: charge
//! intents, signature verification, refunds. Gateway-specific behavior stays
//! behind this boundary.
//!
//! Payment confirmation is verified with a keyed hash: the gateway signs
//! `"{booking_id}|{payment_id}"` with the shared key secret (HMAC-SHA256,
//! hex digest) and the platform recomputes and compares it in constant time.

use crate::types::{BookingId, Money};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Result alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors from the payment gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The charge intent was declined.
    #[error("Charge declined: {reason}")]
    ChargeDeclined {
        /// Decline reason from the gateway.
        reason: String,
    },

    /// The refund was rejected.
    #[error("Refund rejected: {reason}")]
    RefundRejected {
        /// Rejection reason from the gateway.
        reason: String,
    },

    /// The gateway did not answer in time.
    #[error("Gateway timeout")]
    Timeout,

    /// Anything else.
    #[error("Gateway error: {message}")]
    Other {
        /// Error detail.
        message: String,
    },
}

/// A gateway-side authorized-but-not-captured payment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeIntent {
    /// Gateway order reference the client pays against.
    pub order_ref: String,
    /// Amount authorized.
    pub amount: Money,
    /// ISO currency code.
    pub currency: String,
}

/// Receipt for a completed refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    /// Gateway refund reference.
    pub refund_ref: String,
    /// Amount refunded.
    pub amount: Money,
}

/// External payment collaborator.
pub trait PaymentGateway: Send + Sync {
    /// Create a charge intent for `amount` referencing a booking.
    fn create_charge(
        &self,
        amount: Money,
        currency: &str,
        reference: BookingId,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<ChargeIntent>> + Send>>;

    /// Verify a payment signature against the keyed hash of
    /// `(booking_id, payment_id)`.
    fn verify_signature(&self, booking_id: &BookingId, payment_id: &str, signature: &str) -> bool;

    /// Refund a captured payment in full or in part.
    fn refund(
        &self,
        payment_ref: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<RefundReceipt>> + Send>>;
}

/// Hex HMAC-SHA256 signature over `"{booking_id}|{payment_id}"`.
///
/// Used by the mock gateway and by tests to produce valid signatures; real
/// gateways compute the same digest on their side.
#[must_use]
pub fn sign(secret: &str, booking_id: &BookingId, payment_id: &str) -> String {
    // HMAC accepts keys of any length; the error arm is unreachable.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(format!("{booking_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a hex signature.
#[must_use]
pub fn verify(secret: &str, booking_id: &BookingId, payment_id: &str, signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{booking_id}|{payment_id}").as_bytes());
    mac.verify_slice(&provided).is_ok()
}

/// In-process gateway for development and tests.
///
/// Signs and verifies with the configured secret; charge and refund
/// outcomes can be programmed to fail.
pub struct MockPaymentGateway {
    secret: String,
    fail_charges: AtomicBool,
    fail_refunds: AtomicBool,
}

impl MockPaymentGateway {
    /// Create a gateway signing with `secret`.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            fail_charges: AtomicBool::new(false),
            fail_refunds: AtomicBool::new(false),
        }
    }

    /// Arc-wrapped trait object for injection.
    #[must_use]
    pub fn shared(secret: impl Into<String>) -> Arc<dyn PaymentGateway> {
        Arc::new(Self::new(secret))
    }

    /// Make subsequent charge intents fail.
    pub fn fail_charges(&self, fail: bool) {
        self.fail_charges.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent refunds fail.
    pub fn fail_refunds(&self, fail: bool) {
        self.fail_refunds.store(fail, Ordering::SeqCst);
    }

    /// A valid signature for a payment against `booking_id`.
    #[must_use]
    pub fn signature_for(&self, booking_id: &BookingId, payment_id: &str) -> String {
        sign(&self.secret, booking_id, payment_id)
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn create_charge(
        &self,
        amount: Money,
        currency: &str,
        reference: BookingId,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<ChargeIntent>> + Send>> {
        let fail = self.fail_charges.load(Ordering::SeqCst);
        let currency = currency.to_string();
        Box::pin(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

            if fail {
                return Err(GatewayError::ChargeDeclined {
                    reason: "programmed failure".to_string(),
                });
            }

            let order_ref = format!("order_{}", Uuid::new_v4().simple());
            tracing::info!(
                booking_id = %reference,
                amount = amount.cents(),
                %order_ref,
                "Mock charge intent created"
            );
            Ok(ChargeIntent {
                order_ref,
                amount,
                currency,
            })
        })
    }

    fn verify_signature(&self, booking_id: &BookingId, payment_id: &str, signature: &str) -> bool {
        verify(&self.secret, booking_id, payment_id, signature)
    }

    fn refund(
        &self,
        payment_ref: &str,
        amount: Money,
    ) -> Pin<Box<dyn Future<Output = GatewayResult<RefundReceipt>> + Send>> {
        let fail = self.fail_refunds.load(Ordering::SeqCst);
        let payment_ref = payment_ref.to_string();
        Box::pin(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

            if fail {
                return Err(GatewayError::RefundRejected {
                    reason: "programmed failure".to_string(),
                });
            }

            let refund_ref = format!("rfnd_{}", Uuid::new_v4().simple());
            tracing::info!(%payment_ref, amount = amount.cents(), %refund_ref, "Mock refund processed");
            Ok(RefundReceipt { refund_ref, amount })
        })
    }
}
