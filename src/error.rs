//! Error types for authgate.

use axum::http::StatusCode;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running the OAuth2 handler.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Authentication-related errors.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Configuration errors. These are fatal at construction time and are
    /// never recoverable at request time.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP errors from the outbound token exchange.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// The HTTP status with which this error terminates a request.
    ///
    /// Validation and authentication failures map to 401, a failed
    /// re-authentication after a successful token fetch maps to 403, and
    /// misconfiguration surfaces as 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Auth(e) => e.status_code(),
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Network and JSON failures only arise from the token exchange,
            // which terminates the callback request as unauthorized.
            Error::Network(_) | Error::Json(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Authentication-specific errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No session was found on the request. Session middleware must run
    /// upstream of the handler.
    #[error("No session on request - did you forget to install a session layer?")]
    MissingSession,

    /// The session carries no authenticated principal.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The callback request or session is missing values required to verify
    /// the authorization result.
    #[error("Invalid callback - missing state, salt or return url")]
    InvalidCallback,

    /// The state echoed back by the provider does not match the one we
    /// issued (potential CSRF).
    #[error("OAuth2 state mismatch - possible CSRF attack")]
    StateMismatch,

    /// The provider redirected back without an authorization code.
    #[error("Callback carried no authorization code")]
    MissingAuthorizationCode,

    /// Exchanging the authorization code for an access token failed.
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// The return url vanished from the session between redirect and
    /// callback completion.
    #[error("Return url lost from session")]
    LostReturnUrl,

    /// Re-authenticating the session after a successful token fetch failed.
    #[error("Re-authentication failed after token exchange")]
    Reauthentication,
}

impl AuthError {
    /// The HTTP status with which this error terminates a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingSession => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Reauthentication => StatusCode::FORBIDDEN,
            AuthError::NotAuthenticated
            | AuthError::InvalidCallback
            | AuthError::StateMismatch
            | AuthError::MissingAuthorizationCode
            | AuthError::TokenExchange(_)
            | AuthError::LostReturnUrl => StatusCode::UNAUTHORIZED,
        }
    }
}
