//! Exchange of an authorization code for an access token.
//!
//! An exchange is always one outbound HTTP request, but providers differ in
//! how they want it encoded. [`TokenRequestStrategy`] captures the two wire
//! encodings as a tagged variant: everything static for a given provider
//! (endpoint, client id, client secret, redirect uri) is folded into a
//! per-code request factory once, and only the authorization code varies per
//! invocation.
//!
//! - [`TokenRequestStrategy::Get`] builds a single GET url carrying all five
//!   parameters in the query string, no body.
//! - [`TokenRequestStrategy::Post`] posts to the bare token endpoint with a
//!   form-encoded body carrying the same five parameters.
//!
//! The response body is parsed as JSON and only `access_token` is consumed.
//! A non-success status, an unparseable body or a missing field all surface
//! as [`AuthError::TokenExchange`]; the exchange is never retried with the
//! same code.

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, warn};

use super::params::OAuth2Param;
use super::url::{TokenGetUrl, GRANT_TYPE_AUTHORIZATION_CODE};
use crate::error::{AuthError, Error, Result};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Static parameters for token retrieval which do not vary from exchange to
/// exchange for a given provider.
#[derive(Debug, Clone)]
pub struct TokenRequestParameters {
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl TokenRequestParameters {
    /// Bundle the static exchange parameters, rejecting empty values.
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self> {
        let params = TokenRequestParameters {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        };
        for (value, what) in [
            (&params.token_url, "token url"),
            (&params.client_id, "client id"),
            (&params.client_secret, "client secret"),
            (&params.redirect_uri, "redirect uri"),
        ] {
            if value.is_empty() {
                return Err(Error::config(format!(
                    "{what} must not be empty in TokenRequestParameters"
                )));
            }
        }
        Ok(params)
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

/// Factory function turning `(client, code)` into a ready-to-send request.
type RequestFactory = Box<dyn Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder + Send + Sync>;

/// The HTTP encoding used to convert an authorization code into an access
/// token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenRequestStrategy {
    /// All five parameters in the query string of a GET request.
    Get,
    /// Form-encoded POST body; this is what most providers expect.
    #[default]
    Post,
}

impl TokenRequestStrategy {
    /// Create the per-code request factory from the static parameters.
    ///
    /// The GET variant precomputes the static query portion once; the POST
    /// variant captures the parameters and writes the form body per code.
    /// Body writing is folded into the returned factory, so invoking it
    /// yields a request that is fully ready to send.
    pub(crate) fn factory(self, params: &TokenRequestParameters) -> Result<RequestFactory> {
        match self {
            TokenRequestStrategy::Get => {
                let url = TokenGetUrl::new(
                    params.token_url(),
                    params.client_id(),
                    params.client_secret(),
                    params.redirect_uri(),
                )?;
                Ok(Box::new(move |client, code| client.get(url.build(code))))
            }
            TokenRequestStrategy::Post => {
                let params = params.clone();
                Ok(Box::new(move |client, code| {
                    client
                        .post(params.token_url())
                        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                        .body(post_body(&params, code))
                }))
            }
        }
    }
}

/// Form-encode the five exchange parameters in fixed order, no leading
/// delimiter.
fn post_body(params: &TokenRequestParameters, code: &str) -> String {
    let pairs = [
        (OAuth2Param::ClientId, params.client_id()),
        (OAuth2Param::ClientSecret, params.client_secret()),
        (OAuth2Param::GrantType, GRANT_TYPE_AUTHORIZATION_CODE),
        (OAuth2Param::RedirectUri, params.redirect_uri()),
        (OAuth2Param::Code, code),
    ];
    pairs
        .iter()
        .map(|(param, value)| format!("{}={}", param.param_name(), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Token response from the OAuth2 token endpoint.
///
/// Only `access_token` is consumed; everything else the provider returns is
/// ignored.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Issues token exchange requests for authorization codes.
///
/// Owns the HTTP client and the request factory produced by the configured
/// [`TokenRequestStrategy`]. Each [`invoke`](Self::invoke) produces exactly
/// one outbound request; a failed exchange is surfaced, never retried.
pub struct AuthTokenRequestor {
    client: reqwest::Client,
    factory: RequestFactory,
}

impl AuthTokenRequestor {
    /// Create a requestor for the given strategy and static parameters.
    pub fn new(strategy: TokenRequestStrategy, params: &TokenRequestParameters) -> Result<Self> {
        Ok(AuthTokenRequestor {
            client: reqwest::Client::new(),
            factory: strategy.factory(params)?,
        })
    }

    /// Exchange one authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExchange`] on network failure, a
    /// non-success status, an unparseable body or a response missing
    /// `access_token`. Timeouts configured on the HTTP client surface the
    /// same way.
    pub async fn invoke(&self, code: &str) -> Result<String> {
        if code.is_empty() {
            return Err(AuthError::MissingAuthorizationCode.into());
        }

        debug!(code_preview = %mask(code), "exchanging authorization code for access token");

        let response = (self.factory)(&self.client, code)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "token endpoint rejected the exchange");
            return Err(AuthError::TokenExchange(format!(
                "token endpoint returned {status}"
            ))
            .into());
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchange(format!("unparseable token response: {e}")))?;

        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                warn!("token response carried no access_token");
                AuthError::TokenExchange("response missing access_token".to_string()).into()
            })
    }
}

/// Render a short preview of a secret value for logs.
fn mask(value: &str) -> String {
    if value.len() <= 8 {
        "***".to_string()
    } else {
        format!("{}***", &value[..4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(token_url: &str) -> TokenRequestParameters {
        TokenRequestParameters::new(
            token_url,
            "testClient",
            "testClientSecret",
            "https://app.example/cb",
        )
        .expect("valid parameters")
    }

    #[test]
    fn test_parameters_reject_empty_values() {
        assert!(TokenRequestParameters::new("", "id", "secret", "uri").is_err());
        assert!(TokenRequestParameters::new("url", "", "secret", "uri").is_err());
        assert!(TokenRequestParameters::new("url", "id", "", "uri").is_err());
        assert!(TokenRequestParameters::new("url", "id", "secret", "").is_err());
    }

    #[test]
    fn test_default_strategy_is_post() {
        assert_eq!(TokenRequestStrategy::default(), TokenRequestStrategy::Post);
    }

    #[test]
    fn test_post_body_order_and_encoding() {
        let params = params("https://p.example/token");
        let body = post_body(&params, "a code+with specials");
        assert_eq!(
            body,
            "client_id=testClient&client_secret=testClientSecret\
             &grant_type=authorization_code&redirect_uri=https%3A%2F%2Fapp.example%2Fcb\
             &code=a%20code%2Bwith%20specials"
        );
        assert!(!body.starts_with('&'));
    }

    #[test]
    fn test_mask_hides_tail() {
        assert_eq!(mask("short"), "***");
        assert_eq!(mask("code-12345678"), "code***");
    }

    #[tokio::test]
    async fn test_get_exchange_wire_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(query_param("client_id", "testClient"))
            .and(query_param("grant_type", "authorization_code"))
            .and(query_param("client_secret", "testClientSecret"))
            .and(query_param("redirect_uri", "https://app.example/cb"))
            .and(query_param("code", "code-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "tok123",
                    "token_type": "bearer"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let params = params(&format!("{}/token", server.uri()));
        let requestor = AuthTokenRequestor::new(TokenRequestStrategy::Get, &params).unwrap();
        let token = requestor.invoke("code-1").await.unwrap();
        assert_eq!(token, "tok123");
    }

    #[tokio::test]
    async fn test_post_exchange_wire_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header(
                "content-type",
                "application/x-www-form-urlencoded; charset=utf-8",
            ))
            .and(body_string(
                "client_id=testClient&client_secret=testClientSecret\
                 &grant_type=authorization_code&redirect_uri=https%3A%2F%2Fapp.example%2Fcb\
                 &code=code-2",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "tok456" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let params = params(&format!("{}/token", server.uri()));
        let requestor = AuthTokenRequestor::new(TokenRequestStrategy::Post, &params).unwrap();
        let token = requestor.invoke("code-2").await.unwrap();
        assert_eq!(token, "tok456");
    }

    #[tokio::test]
    async fn test_exchange_failure_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let params = params(&format!("{}/token", server.uri()));
        let requestor = AuthTokenRequestor::new(TokenRequestStrategy::Post, &params).unwrap();
        let err = requestor.invoke("code-3").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::TokenExchange(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_failure_on_missing_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "error": "invalid_grant" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let params = params(&format!("{}/token", server.uri()));
        let requestor = AuthTokenRequestor::new(TokenRequestStrategy::Post, &params).unwrap();
        let err = requestor.invoke("code-4").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::TokenExchange(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected_without_request() {
        let params = params("https://p.example/token");
        let requestor = AuthTokenRequestor::new(TokenRequestStrategy::Post, &params).unwrap();
        let err = requestor.invoke("").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(AuthError::MissingAuthorizationCode)
        ));
    }
}
