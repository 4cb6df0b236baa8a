//! Wire parameter names used in OAuth2 requests.

use std::fmt;

/// Enumeration of the parameter names used in OAuth2 requests. Public to
/// permit reuse in external OAuth2 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuth2Param {
    ClientId,
    GrantType,
    ClientSecret,
    RedirectUri,
    Code,
    State,
    ResponseType,
}

impl OAuth2Param {
    /// The wire name of this parameter.
    pub const fn param_name(self) -> &'static str {
        match self {
            OAuth2Param::ClientId => "client_id",
            OAuth2Param::GrantType => "grant_type",
            OAuth2Param::ClientSecret => "client_secret",
            OAuth2Param::RedirectUri => "redirect_uri",
            OAuth2Param::Code => "code",
            OAuth2Param::State => "state",
            OAuth2Param::ResponseType => "response_type",
        }
    }
}

impl fmt::Display for OAuth2Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param_name())
    }
}
