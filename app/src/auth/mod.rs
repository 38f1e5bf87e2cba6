//! Authentication and authorization.
//!
//! Account management is out of scope; sessions are bearer tokens resolved
//! against an in-memory [`sessions::SessionStore`], issued administratively
//! or by tests. Authorization is a capability check against the closed
//! [`crate::types::Role`] enumeration at the extractor boundary.

pub mod middleware;
pub mod sessions;

pub use middleware::{AuthedUser, BearerToken, RequireAdmin, RequirePartner};
pub use sessions::{Session, SessionStore};
