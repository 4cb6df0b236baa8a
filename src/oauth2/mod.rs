//! OAuth2 wire-protocol building blocks.
//!
//! Everything in this module is pure protocol: parameter names, query url
//! assembly, the session-bound state token, and the code-for-token exchange
//! encodings. The flow orchestration lives in [`crate::handler`].

pub mod exchange;
pub mod params;
pub mod state;
pub mod url;

pub use exchange::{AuthTokenRequestor, TokenRequestParameters, TokenRequestStrategy};
pub use params::OAuth2Param;
pub use state::{generate_salt, StateToken};
pub use url::AuthUrlBuilder;
