//! Bearer-token session store.

use crate::types::{Role, UserId};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::collections::HashMap;
use std::sync::RwLock;

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The user behind the token.
    pub user_id: UserId,
    /// Contact address for notifications.
    pub email: String,
    /// The user's role.
    pub role: Role,
}

/// In-memory token → session map.
///
/// Tokens are 32-character alphanumeric strings. The store is process-local
/// by design; a shared session backend would slot in behind the same
/// methods.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a token for a fresh user with the given role.
    ///
    /// Returns `(token, user_id)`.
    pub fn issue(&self, email: impl Into<String>, role: Role) -> (String, UserId) {
        let user_id = UserId::new();
        let token = self.issue_for(user_id, email, role);
        (token, user_id)
    }

    /// Issue a token for an existing user.
    pub fn issue_for(&self, user_id: UserId, email: impl Into<String>, role: Role) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        self.install(token.clone(), user_id, email, role);
        token
    }

    /// Install a fixed token (config bootstrap).
    pub fn install(
        &self,
        token: String,
        user_id: UserId,
        email: impl Into<String>,
        role: Role,
    ) {
        let session = Session {
            user_id,
            email: email.into(),
            role,
        };
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(token, session);
        }
    }

    /// Resolve a bearer token.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<Session> {
        self.sessions
            .read()
            .ok()
            .and_then(|sessions| sessions.get(token).cloned())
    }

    /// Drop a token.
    pub fn revoke(&self, token: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(token);
        }
    }
}
