//! axum integration.
//!
//! Two pieces wire the controller into an application router:
//!
//! - [`protect`] wraps protected routes in a middleware that runs
//!   [`OAuth2AuthHandler::handle_request`] before the inner handler.
//! - [`routes`] yields a router exposing GET on the handler's
//!   `callback_path()`, wired to
//!   [`OAuth2AuthHandler::handle_callback`].
//!
//! Both expect an upstream session layer to have inserted a
//! [`SharedSession`] into the request extensions. A request without one is
//! a deployment error and fails with 500; no redirect is issued.
//!
//! Failed flows terminate with the mapped status code and the status's
//! canonical reason as the body. Internal error detail never reaches the
//! wire.
//!
//! ```rust,ignore
//! let handler = Arc::new(OAuth2AuthHandler::new(options, provider)?);
//! let app = Router::new()
//!     .nest("/private", protect(private_routes, handler.clone()))
//!     .merge(routes(handler))
//!     .layer(my_session_layer);
//! ```

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AuthError, Error};
use crate::handler::{FlowDirective, OAuth2AuthHandler};
use crate::session::SharedSession;

/// Query parameters the provider sends to the callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    state: Option<String>,
    code: Option<String>,
}

/// Wrap a router so every route in it requires an authenticated session.
pub fn protect(router: Router, handler: Arc<OAuth2AuthHandler>) -> Router {
    router.layer(middleware::from_fn_with_state(handler, require_oauth2))
}

/// Router exposing the authorization-result callback, method GET, at the
/// handler's callback path.
pub fn routes(handler: Arc<OAuth2AuthHandler>) -> Router {
    let callback_path = handler.callback_path().to_string();
    Router::new()
        .route(&callback_path, get(handle_callback))
        .with_state(handler)
}

/// Middleware guarding protected routes.
async fn require_oauth2(
    State(handler): State<Arc<OAuth2AuthHandler>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(session) = request.extensions().get::<SharedSession>().cloned() else {
        return error_response(&AuthError::MissingSession.into());
    };

    match handler
        .handle_request(session.as_ref(), request.uri().path())
        .await
    {
        Ok(FlowDirective::Continue) => next.run(request).await,
        Ok(FlowDirective::Redirect(location)) => found(&location),
        Err(e) => error_response(&e),
    }
}

/// The callback route handler.
async fn handle_callback(
    State(handler): State<Arc<OAuth2AuthHandler>>,
    session: Option<Extension<SharedSession>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(Extension(session)) = session else {
        return error_response(&AuthError::MissingSession.into());
    };

    match handler
        .handle_callback(
            session.as_ref(),
            query.state.as_deref(),
            query.code.as_deref(),
        )
        .await
    {
        Ok(return_url) => found(&return_url),
        Err(e) => error_response(&e),
    }
}

/// A `302 Found` with the given location and an empty body.
fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::FOUND.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => {
            warn!("redirect location is not a valid header value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Terminate the request with the error's status code and a generic body.
fn error_response(error: &Error) -> Response {
    let status = error.status_code();
    debug!(%error, %status, "request terminated");
    let body = status.canonical_reason().unwrap_or("request failed");
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_sets_location_and_empty_body() {
        let response = found("https://provider.example/auth?client_id=abc");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://provider.example/auth?client_id=abc"
        );
    }

    #[test]
    fn test_found_rejects_invalid_location() {
        let response = found("bad\nlocation");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[test]
    fn test_error_response_carries_no_detail() {
        let response = error_response(&AuthError::StateMismatch.into());
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
