//! Handler configuration.

use rand::Rng;
use url::Url;

use crate::error::{Error, Result};
use crate::oauth2::exchange::TokenRequestStrategy;

/// Default name of the session key used to store the originally requested
/// url.
pub const DEFAULT_RETURN_URL_KEY: &str = "return_url";

/// Default name of the session key used to store the access token.
pub const DEFAULT_TOKEN_KEY: &str = "oauth2_token";

/// Length in bytes of the generated per-instance state secret.
const STATE_SECRET_LENGTH: usize = 32;

/// Immutable settings bundle for one OAuth2 handler instance.
///
/// Constructed once per protected route group from the five values every
/// provider registration yields: client id, client secret, the provider's
/// authorization and token endpoints, and the callback url this application
/// exposes. All urls are validated to be well-formed absolute http(s) urls
/// at construction; the callback url's path component is derived once and
/// later registered as the callback route.
///
/// The session key names, the exchange strategy (default POST) and the
/// state-digest secret can be overridden with the consuming `with_*`
/// setters. The state secret defaults to fresh random bytes per instance,
/// which invalidates in-flight redirects across process restarts; supply a
/// fixed per-deployment secret to survive them.
///
/// # Example
///
/// ```rust,ignore
/// use authgate::{HandlerOptions, TokenRequestStrategy};
///
/// let options = HandlerOptions::new(
///     "my-client",
///     "my-secret",
///     "https://provider.example/authorize",
///     "https://app.example/oauth2/result",
///     "https://provider.example/token",
/// )?
/// .with_strategy(TokenRequestStrategy::Get)
/// .with_return_url_key("original_url");
/// ```
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    client_id: String,
    client_secret: String,
    authorization_url: String,
    callback_url: String,
    callback_path: String,
    token_url: String,
    return_url_key: String,
    token_key: String,
    strategy: TokenRequestStrategy,
    state_secret: Vec<u8>,
}

impl HandlerOptions {
    /// Create options from the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any value is empty or any of the three
    /// urls is not an absolute http(s) url.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authorization_url: impl Into<String>,
        callback_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Result<Self> {
        let client_id = non_empty(client_id.into(), "client id")?;
        let client_secret = non_empty(client_secret.into(), "client secret")?;
        let authorization_url = absolute_url(authorization_url.into(), "authorization url")?;
        let callback_url = absolute_url(callback_url.into(), "callback url")?;
        let callback_path = derive_path(&callback_url)?;
        let token_url = absolute_url(token_url.into(), "token url")?;

        let mut state_secret = vec![0u8; STATE_SECRET_LENGTH];
        rand::thread_rng().fill(state_secret.as_mut_slice());

        Ok(HandlerOptions {
            client_id,
            client_secret,
            authorization_url,
            callback_url,
            callback_path,
            token_url,
            return_url_key: DEFAULT_RETURN_URL_KEY.to_string(),
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            strategy: TokenRequestStrategy::default(),
            state_secret,
        })
    }

    /// Override the session key holding the originally requested url.
    #[must_use]
    pub fn with_return_url_key(mut self, key: impl Into<String>) -> Self {
        self.return_url_key = key.into();
        self
    }

    /// Override the session key under which the access token is stored.
    #[must_use]
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    /// Override the token exchange encoding.
    #[must_use]
    pub fn with_strategy(mut self, strategy: TokenRequestStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Supply a fixed per-deployment secret for the state digest.
    #[must_use]
    pub fn with_state_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.state_secret = secret.into();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// The provider's authorization endpoint.
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    /// The full url the provider redirects back to after authentication.
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// The path component of the callback url, registered as the callback
    /// route.
    pub fn callback_path(&self) -> &str {
        &self.callback_path
    }

    /// The provider's token endpoint.
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn return_url_key(&self) -> &str {
        &self.return_url_key
    }

    pub fn token_key(&self) -> &str {
        &self.token_key
    }

    pub fn strategy(&self) -> TokenRequestStrategy {
        self.strategy
    }

    pub(crate) fn state_secret(&self) -> &[u8] {
        &self.state_secret
    }
}

fn non_empty(value: String, what: &str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::config(format!(
            "{what} must not be empty in HandlerOptions"
        )));
    }
    Ok(value)
}

fn absolute_url(value: String, what: &str) -> Result<String> {
    let value = non_empty(value, what)?;
    let parsed = Url::parse(&value)
        .map_err(|e| Error::config(format!("{what} {value:?} is not a valid url: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::config(format!(
            "{what} {value:?} must be an absolute http(s) url"
        )));
    }
    Ok(value)
}

fn derive_path(callback_url: &str) -> Result<String> {
    let parsed = Url::parse(callback_url)
        .map_err(|e| Error::config(format!("callback url {callback_url:?} is invalid: {e}")))?;
    Ok(parsed.path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT_ID: &str = "testClient";
    const CLIENT_SECRET: &str = "testClientSecret";
    const AUTH_URL: &str = "http://localhost:9292/authSuccess";
    const CALLBACK_URL: &str = "http://localhost:8080/authResult";
    const TOKEN_URL: &str = "http://localhost:9292/authToken";

    fn options() -> HandlerOptions {
        HandlerOptions::new(CLIENT_ID, CLIENT_SECRET, AUTH_URL, CALLBACK_URL, TOKEN_URL)
            .expect("valid options")
    }

    #[test]
    fn test_defaults() {
        let opts = options();
        assert_eq!(opts.return_url_key(), "return_url");
        assert_eq!(opts.token_key(), "oauth2_token");
        assert_eq!(opts.strategy(), TokenRequestStrategy::Post);
        assert_eq!(opts.state_secret().len(), 32);
    }

    #[test]
    fn test_callback_path_derivation() {
        assert_eq!(options().callback_path(), "/authResult");

        let opts = HandlerOptions::new(
            CLIENT_ID,
            CLIENT_SECRET,
            AUTH_URL,
            "https://app.example/oauth2/result?x=1",
            TOKEN_URL,
        )
        .unwrap();
        assert_eq!(opts.callback_path(), "/oauth2/result");
    }

    #[test]
    fn test_overrides() {
        let opts = options()
            .with_return_url_key("original_url")
            .with_token_key("access_token")
            .with_strategy(TokenRequestStrategy::Get)
            .with_state_secret(b"fixed-secret".to_vec());
        assert_eq!(opts.return_url_key(), "original_url");
        assert_eq!(opts.token_key(), "access_token");
        assert_eq!(opts.strategy(), TokenRequestStrategy::Get);
        assert_eq!(opts.state_secret(), b"fixed-secret");
    }

    #[test]
    fn test_state_secret_is_unique_per_instance() {
        assert_ne!(options().state_secret(), options().state_secret());
    }

    #[test]
    fn test_empty_fields_are_rejected() {
        assert!(HandlerOptions::new("", CLIENT_SECRET, AUTH_URL, CALLBACK_URL, TOKEN_URL).is_err());
        assert!(HandlerOptions::new(CLIENT_ID, "", AUTH_URL, CALLBACK_URL, TOKEN_URL).is_err());
        assert!(HandlerOptions::new(CLIENT_ID, CLIENT_SECRET, "", CALLBACK_URL, TOKEN_URL).is_err());
        assert!(HandlerOptions::new(CLIENT_ID, CLIENT_SECRET, AUTH_URL, "", TOKEN_URL).is_err());
        assert!(HandlerOptions::new(CLIENT_ID, CLIENT_SECRET, AUTH_URL, CALLBACK_URL, "").is_err());
    }

    #[test]
    fn test_malformed_urls_are_rejected() {
        assert!(HandlerOptions::new(
            CLIENT_ID,
            CLIENT_SECRET,
            "not a url",
            CALLBACK_URL,
            TOKEN_URL
        )
        .is_err());
        assert!(HandlerOptions::new(
            CLIENT_ID,
            CLIENT_SECRET,
            AUTH_URL,
            "/relative/path",
            TOKEN_URL
        )
        .is_err());
        assert!(HandlerOptions::new(
            CLIENT_ID,
            CLIENT_SECRET,
            AUTH_URL,
            CALLBACK_URL,
            "ftp://files.example/token"
        )
        .is_err());
    }
}
