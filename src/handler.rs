//! The OAuth2 auth flow controller.
//!
//! [`OAuth2AuthHandler`] is the state machine at the center of the crate.
//! Per request it decides between three outcomes: pass the request through
//! (the session already carries a principal), redirect to the provider's
//! authorization endpoint (writing the flow state into the session first),
//! or process an authorization callback (verify the echoed state, exchange
//! the code, finalize authentication, resume the original request).
//!
//! # Flow state
//!
//! A redirect leaves exactly three correlated values behind: the originally
//! requested url under the configured return-url key, a fresh salt under
//! [`STATE_SALT_KEY`], and the session id the session itself carries. The
//! state token sent to the provider is a keyed digest over the three, so
//! the callback can be verified entirely from session contents. A
//! successful callback consumes all of it; nothing outlives one round-trip.
//!
//! # Races
//!
//! Distinct sessions cannot interfere, their flow state is keyed by session
//! id. Within one session, a fresh login attempt overwrites the salt and
//! return url and thereby invalidates any callback still in flight from an
//! earlier redirect. That callback will fail state verification with a 401,
//! which is the acceptable best-effort outcome; the flow is not
//! linearizable across concurrent attempts on the same session.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::AuthProvider;
use crate::config::HandlerOptions;
use crate::error::{AuthError, Result};
use crate::oauth2::exchange::{AuthTokenRequestor, TokenRequestParameters};
use crate::oauth2::state::{generate_salt, StateToken};
use crate::oauth2::url::AuthUrlBuilder;
use crate::session::Session;

/// Session key under which the per-redirect salt is stored.
pub const STATE_SALT_KEY: &str = "oauth2_state_salt";

/// The controller's verdict on a protected-route request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowDirective {
    /// The session is authenticated; let the request through unchanged.
    Continue,
    /// Respond 302 with this location and end the request.
    Redirect(String),
}

/// Orchestrates the authorization-code flow for one provider configuration.
pub struct OAuth2AuthHandler {
    options: HandlerOptions,
    auth_provider: Arc<dyn AuthProvider>,
    requestor: AuthTokenRequestor,
}

impl OAuth2AuthHandler {
    /// Create a handler from validated options and an auth provider.
    ///
    /// The token exchange factory is constructed once here from the static
    /// provider parameters; only the authorization code varies per
    /// callback.
    pub fn new(options: HandlerOptions, auth_provider: Arc<dyn AuthProvider>) -> Result<Self> {
        let params = TokenRequestParameters::new(
            options.token_url(),
            options.client_id(),
            options.client_secret(),
            options.callback_url(),
        )?;
        let requestor = AuthTokenRequestor::new(options.strategy(), &params)?;
        Ok(OAuth2AuthHandler {
            options,
            auth_provider,
            requestor,
        })
    }

    /// The path component of the callback url. Register the callback
    /// handler here, method GET.
    pub fn callback_path(&self) -> &str {
        self.options.callback_path()
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// Handle entry to a protected route.
    ///
    /// If the session already carries a principal the request passes
    /// through. Otherwise the flow state is written to the session and the
    /// provider redirect url is returned.
    pub async fn handle_request(
        &self,
        session: &dyn Session,
        requested_path: &str,
    ) -> Result<FlowDirective> {
        if self.auth_provider.authenticate(session.id()).await.is_ok() {
            debug!(path = requested_path, "session already authenticated");
            return Ok(FlowDirective::Continue);
        }

        // Not logged in: stash where the user was headed, salt the state,
        // and send them to the provider. We get redirected back afterwards.
        session.put(self.options.return_url_key(), requested_path);
        let salt = generate_salt();
        session.put(STATE_SALT_KEY, &salt);

        let state = StateToken::compute(
            requested_path,
            &salt,
            session.id(),
            self.options.state_secret(),
        );
        let redirect = AuthUrlBuilder::new()
            .with_authorization_url(self.options.authorization_url())
            .with_client_id(self.options.client_id())
            .with_redirect_uri(self.options.callback_url())
            .with_state(state)
            .build()?;

        debug!(path = requested_path, "redirecting to authorization endpoint");
        Ok(FlowDirective::Redirect(redirect))
    }

    /// Handle the provider's redirect back to us.
    ///
    /// Verifies the echoed state against a token recomputed from session
    /// contents, exchanges the authorization code, hands the access token
    /// to the auth provider, re-authenticates the session, and returns the
    /// originally requested url to resume.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCallback`] when state, salt or return url is
    ///   missing (401)
    /// - [`AuthError::StateMismatch`] on any state difference (401)
    /// - [`AuthError::MissingAuthorizationCode`] (401)
    /// - [`AuthError::TokenExchange`] on any exchange failure, never
    ///   retried (401)
    /// - [`AuthError::Reauthentication`] when the provider refuses the
    ///   session after a successful token fetch (403)
    /// - [`AuthError::LostReturnUrl`] when the return url vanished between
    ///   redirect and callback completion (401)
    pub async fn handle_callback(
        &self,
        session: &dyn Session,
        wire_state: Option<&str>,
        code: Option<&str>,
    ) -> Result<String> {
        // Validate the state was the one we stored first, otherwise this
        // callback does not belong to a redirect we issued.
        let (wire_state, salt, return_url) = match (
            wire_state,
            session.get(STATE_SALT_KEY),
            session.get(self.options.return_url_key()),
        ) {
            (Some(state), Some(salt), Some(return_url)) => (state, salt, return_url),
            _ => {
                warn!("callback rejected: state, salt or return url missing");
                return Err(AuthError::InvalidCallback.into());
            }
        };

        let expected = StateToken::compute(
            &return_url,
            &salt,
            session.id(),
            self.options.state_secret(),
        );
        if !expected.matches(wire_state) {
            warn!("callback rejected: state mismatch");
            return Err(AuthError::StateMismatch.into());
        }

        let code = match code.filter(|c| !c.is_empty()) {
            Some(code) => code,
            None => {
                warn!("callback rejected: no authorization code");
                return Err(AuthError::MissingAuthorizationCode.into());
            }
        };

        let access_token = self.requestor.invoke(code).await?;

        self.auth_provider
            .on_token(session, &access_token)
            .await
            .map_err(|e| {
                warn!(error = %e, "auth provider refused the access token");
                AuthError::Reauthentication
            })?;
        self.auth_provider
            .authenticate(session.id())
            .await
            .map_err(|e| {
                warn!(error = %e, "re-authentication failed after token exchange");
                AuthError::Reauthentication
            })?;

        // The round-trip is complete; the flow state must not be replayable.
        session.remove(STATE_SALT_KEY);
        let target = session
            .remove(self.options.return_url_key())
            .ok_or(AuthError::LostReturnUrl)?;

        info!(return_url = %target, "authorization flow completed, resuming original request");
        Ok(target)
    }
}
