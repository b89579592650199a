use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use redis_auth::{AuthError, AuthOutcome, AuthScheme};

use super::error::AuthRejection;
use super::session::{AuthCredentials, Session};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Required,
    Optional,
}

/// Request-scoped [`Session`] without authentication, for public routes such as login
///
/// ```no_run
/// use axum::{Router, middleware::from_fn_with_state, routing::post};
/// use redis_auth::AuthScheme;
/// use redis_auth_axum::with_session;
///
/// fn routes(scheme: AuthScheme) -> Router {
///     Router::new()
///         .route("/sessions", post(|| async { "login" }))
///         .layer(from_fn_with_state(scheme, with_session))
/// }
/// ```
pub async fn with_session(
    State(scheme): State<AuthScheme>,
    mut req: Request,
    next: Next,
) -> Response {
    let session = Session::new(scheme.anonymous_session());
    req.extensions_mut().insert(session.clone());
    let response = next.run(req).await;
    finish(session, response).await
}

/// Reject requests without a valid session, with the status of the failure
pub async fn authenticate(State(scheme): State<AuthScheme>, req: Request, next: Next) -> Response {
    run(scheme, req, next, Mode::Required).await
}

/// Let unauthenticated requests through anonymously.
///
/// Malformed sessions are treated like missing ones, cookie clearing
/// included. An unavailable store still fails the request.
pub async fn authenticate_optional(
    State(scheme): State<AuthScheme>,
    req: Request,
    next: Next,
) -> Response {
    run(scheme, req, next, Mode::Optional).await
}

async fn run(scheme: AuthScheme, req: Request, next: Next, mode: Mode) -> Response {
    let (mut parts, body) = req.into_parts();
    let authentication = scheme.authenticate(&parts).await;

    let credentials = match &authentication.outcome {
        AuthOutcome::Authenticated(authenticated) => Some(AuthCredentials::from(authenticated)),
        AuthOutcome::Error(err @ AuthError::StoreUnavailable(_)) => {
            return AuthRejection::new(err.clone(), authentication.directive).into_response();
        }
        AuthOutcome::Unauthenticated(err) | AuthOutcome::Error(err) => {
            if mode == Mode::Required {
                return AuthRejection::new(err.clone(), authentication.directive).into_response();
            }
            tracing::debug!("Continuing anonymously: {}", err);
            None
        }
    };

    let session = Session::new(scheme.session(&authentication));
    parts.extensions.insert(session.clone());
    if let Some(credentials) = credentials {
        parts.extensions.insert(credentials);
    }

    let response = next.run(Request::from_parts(parts, body)).await;
    finish(session, response).await
}

async fn finish(session: Session, mut response: Response) -> Response {
    let directive = session.take_directive().await;
    match directive.apply(response.headers_mut()) {
        Ok(()) => response,
        Err(e) => {
            tracing::error!("Failed to write session cookie: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
