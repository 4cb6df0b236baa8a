//! Query url assembly for OAuth2 redirects and token retrieval.
//!
//! The builders here do plain string assembly: the first parameter is
//! prefixed with `?`, subsequent ones with `&`, each rendered `name=value`.
//! Values are NOT percent-encoded; callers must supply URL-safe values.
//! (The form-encoded POST body in [`crate::oauth2::exchange`] does encode.)

use super::params::OAuth2Param;
use crate::error::{Error, Result};
use crate::oauth2::state::StateToken;

const PARAM_KEY_VAL_SEPARATOR: char = '=';
const FIRST_PARAM_DELIMITER: char = '?';
const SUBSEQUENT_PARAM_DELIMITER: char = '&';

const RESPONSE_TYPE_CODE: &str = "code";
pub(crate) const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";

/// Low-level query assembly over a base url.
///
/// Every appended parameter value is validated to be non-empty; an empty
/// value is a configuration error and no partial url escapes the builder.
#[derive(Debug)]
pub(crate) struct QueryUrl {
    buffer: String,
    has_params: bool,
}

impl QueryUrl {
    pub(crate) fn new(base: impl Into<String>) -> Self {
        QueryUrl {
            buffer: base.into(),
            has_params: false,
        }
    }

    /// Append one `name=value` pair, choosing the `?`/`&` delimiter by
    /// position.
    pub(crate) fn param(mut self, param: OAuth2Param, value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::config(format!(
                "{} must not be empty in query url",
                param.param_name()
            )));
        }
        self.buffer.push(if self.has_params {
            SUBSEQUENT_PARAM_DELIMITER
        } else {
            FIRST_PARAM_DELIMITER
        });
        self.has_params = true;
        self.buffer.push_str(param.param_name());
        self.buffer.push(PARAM_KEY_VAL_SEPARATOR);
        self.buffer.push_str(value);
        Ok(self)
    }

    pub(crate) fn finish(self) -> String {
        self.buffer
    }
}

/// Builder for the authorization redirect url.
///
/// The following elements are mandatory: the authorization url through which
/// the provider exposes its authentication, the client id with which our
/// application is registered, the redirect uri the provider will send the
/// browser back to, and the state token. The response type is always `code`.
/// Parameter order is fixed (client_id, redirect_uri, state, response_type)
/// so redirects are deterministic.
#[derive(Debug, Default)]
pub struct AuthUrlBuilder {
    authorization_url: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    state: Option<StateToken>,
}

impl AuthUrlBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authentication url exposed by the OAuth2 provider.
    #[must_use]
    pub fn with_authorization_url(mut self, url: impl Into<String>) -> Self {
        self.authorization_url = Some(url.into());
        self
    }

    /// Set the client id with which we are registered with the provider.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the redirect uri which will handle the authorization result.
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Set the state token to be echoed back by the provider.
    #[must_use]
    pub fn with_state(mut self, state: StateToken) -> Self {
        self.state = Some(state);
        self
    }

    /// Generate the full redirect url, validating that all required
    /// parameters are present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any required element is missing or
    /// empty; no partial url is returned.
    pub fn build(self) -> Result<String> {
        let authorization_url = require(self.authorization_url, "authorization url")?;
        let client_id = require(self.client_id, "client id")?;
        let redirect_uri = require(self.redirect_uri, "redirect uri")?;
        let state = self
            .state
            .ok_or_else(|| Error::config("state must be set in AuthUrlBuilder"))?;

        Ok(QueryUrl::new(authorization_url)
            .param(OAuth2Param::ClientId, &client_id)?
            .param(OAuth2Param::RedirectUri, &redirect_uri)?
            .param(OAuth2Param::State, state.as_str())?
            .param(OAuth2Param::ResponseType, RESPONSE_TYPE_CODE)?
            .finish())
    }
}

fn require(value: Option<String>, what: &str) -> Result<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::config(format!("{what} must not be empty in AuthUrlBuilder")))
}

/// Token-endpoint GET url with the static portion precomputed.
///
/// The client id, grant type, client secret and redirect uri never vary for
/// a given handler, so they are assembled once; only the authorization code
/// is appended per exchange.
#[derive(Debug, Clone)]
pub(crate) struct TokenGetUrl {
    core: String,
}

impl TokenGetUrl {
    pub(crate) fn new(
        token_url: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Result<Self> {
        if token_url.is_empty() {
            return Err(Error::config("token url must not be empty in TokenGetUrl"));
        }
        let core = QueryUrl::new(token_url)
            .param(OAuth2Param::ClientId, client_id)?
            .param(OAuth2Param::GrantType, GRANT_TYPE_AUTHORIZATION_CODE)?
            .param(OAuth2Param::ClientSecret, client_secret)?
            .param(OAuth2Param::RedirectUri, redirect_uri)?
            .finish();
        Ok(TokenGetUrl { core })
    }

    /// The full exchange url for one authorization code.
    pub(crate) fn build(&self, code: &str) -> String {
        format!(
            "{}{}{}{}{}",
            self.core,
            SUBSEQUENT_PARAM_DELIMITER,
            OAuth2Param::Code.param_name(),
            PARAM_KEY_VAL_SEPARATOR,
            code
        )
    }
}
