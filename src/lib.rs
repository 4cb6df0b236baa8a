//! authgate - session-bound OAuth2 authorization-code middleware for axum.
//!
//! The crate implements the server-side half of the classic three-leg
//! OAuth2 code flow: requests to protected routes are intercepted, an
//! unauthenticated caller is redirected to the provider's authorization
//! endpoint carrying an anti-forgery state token derived from the session,
//! the callback is verified against that token, the authorization code is
//! exchanged for an access token, and the originally requested url is
//! resumed.
//!
//! Session storage, cookies and request routing remain the application's
//! concern and are consumed through narrow interfaces; see
//! [`session::Session`] and [`auth::AuthProvider`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use authgate::{
//!     HandlerOptions, MemorySessionStore, OAuth2AuthHandler, SessionTokenProvider,
//! };
//!
//! let store = Arc::new(MemorySessionStore::new());
//! let options = HandlerOptions::new(
//!     "my-client",
//!     "my-secret",
//!     "https://provider.example/authorize",
//!     "https://app.example/oauth2/result",
//!     "https://provider.example/token",
//! )?;
//! let provider = Arc::new(SessionTokenProvider::new(options.token_key(), store.clone()));
//! let handler = Arc::new(OAuth2AuthHandler::new(options, provider)?);
//!
//! let app = authgate::router::protect(private_routes, handler.clone())
//!     .merge(authgate::router::routes(handler));
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod oauth2;
pub mod router;
pub mod session;

pub use auth::{AuthProvider, Principal, SessionTokenProvider};
pub use config::{HandlerOptions, DEFAULT_RETURN_URL_KEY, DEFAULT_TOKEN_KEY};
pub use error::{AuthError, Error, Result};
pub use handler::{FlowDirective, OAuth2AuthHandler, STATE_SALT_KEY};
pub use oauth2::{AuthUrlBuilder, OAuth2Param, StateToken, TokenRequestStrategy};
pub use session::{MemorySessionStore, Session, SessionStore, SharedSession};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
