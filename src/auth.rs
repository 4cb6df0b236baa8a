//! Auth-provider collaborator surface.
//!
//! The handler does not decide what "authenticated" means; it asks an
//! [`AuthProvider`]. The provider is consulted twice per flow: on entry to a
//! protected route to check whether the session already carries a principal,
//! and again after a successful token exchange to finalize authentication.
//! [`SessionTokenProvider`] is the simplest useful implementation: a session
//! is authenticated exactly when it holds an access token.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::session::{Session, SessionStore};

/// The authenticated identity associated with a session.
///
/// Opaque holder: it exposes the access token and nothing else. Role and
/// permission handling belong to the application, not to this crate.
#[derive(Debug, Clone)]
pub struct Principal {
    token: String,
}

impl Principal {
    pub fn new(token: impl Into<String>) -> Self {
        Principal {
            token: token.into(),
        }
    }

    /// The access token this principal was authenticated with.
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Decides whether a session is authenticated and consumes freshly obtained
/// access tokens.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Authenticate the session with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] (or an implementation
    /// specific error) when no principal is associated with the session.
    async fn authenticate(&self, session_id: &str) -> Result<Principal>;

    /// Consume an access token obtained for the given session, typically by
    /// storing it so a subsequent [`authenticate`](Self::authenticate)
    /// succeeds.
    async fn on_token(&self, session: &dyn Session, access_token: &str) -> Result<()>;
}

/// Auth provider that equates "authenticated" with "the session holds an
/// access token under the configured key".
///
/// `on_token` writes the token into the session; `authenticate` resolves
/// the session in the store and looks the token up again. This mirrors the
/// single round-trip the handler needs and keeps the token's lifetime tied
/// to the session's.
pub struct SessionTokenProvider {
    token_key: String,
    store: Arc<dyn SessionStore>,
}

impl SessionTokenProvider {
    pub fn new(token_key: impl Into<String>, store: Arc<dyn SessionStore>) -> Self {
        SessionTokenProvider {
            token_key: token_key.into(),
            store,
        }
    }
}

#[async_trait]
impl AuthProvider for SessionTokenProvider {
    async fn authenticate(&self, session_id: &str) -> Result<Principal> {
        let session = self
            .store
            .get(session_id)
            .ok_or(AuthError::NotAuthenticated)?;
        match session.get(&self.token_key) {
            Some(token) => {
                debug!(session_id, "session carries an access token");
                Ok(Principal::new(token))
            }
            None => Err(AuthError::NotAuthenticated.into()),
        }
    }

    async fn on_token(&self, session: &dyn Session, access_token: &str) -> Result<()> {
        session.put(&self.token_key, access_token);
        Ok(())
    }
}
