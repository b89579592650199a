use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use http::request::Parts;
use redis_auth::{AuthError, Authenticated, CookieDirective, SessionManager};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::error::AuthRejection;

/// Request-scoped session manager, available as an Axum extractor
///
/// Installed by the [`with_session`](crate::with_session),
/// [`authenticate`](crate::authenticate) and
/// [`authenticate_optional`](crate::authenticate_optional) middleware. Cookie
/// changes made through it are written to the response once the handler
/// returns.
///
/// # Example
///
/// ```no_run
/// use redis_auth_axum::{IntoResponseError, Session};
/// use http::StatusCode;
/// use serde_json::json;
///
/// async fn login(session: Session) -> Result<&'static str, (StatusCode, String)> {
///     session
///         .issue("sessionid", &json!({"name": "user1"}))
///         .await
///         .into_response_error()?;
///     Ok("Logged in")
/// }
/// ```
#[derive(Clone)]
pub struct Session {
    manager: Arc<Mutex<SessionManager>>,
    cookie_name: Arc<str>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl Session {
    pub(crate) fn new(manager: SessionManager) -> Self {
        let cookie_name = Arc::from(manager.cookie_name());
        Self {
            manager: Arc::new(Mutex::new(manager)),
            cookie_name,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub async fn issue<T>(&self, id: &str, payload: &T) -> Result<(), AuthError>
    where
        T: Serialize + ?Sized,
    {
        self.manager.lock().await.issue(id, payload).await
    }

    pub async fn fetch(&self, id: &str) -> Result<Option<String>, AuthError> {
        self.manager.lock().await.fetch(id).await
    }

    /// Revoke `id`, or the session of the current request when `None`
    pub async fn revoke(&self, id: Option<&str>) -> Result<(), AuthError> {
        self.manager.lock().await.revoke(id).await
    }

    /// Session payload of the authenticated principal, if any
    pub async fn artifacts(&self) -> Option<Value> {
        self.manager.lock().await.artifacts().cloned()
    }

    pub(crate) async fn take_directive(&self) -> CookieDirective {
        self.manager.lock().await.take_directive()
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("Session extractor used on a route without session middleware");
            AuthRejection::from(AuthError::InvalidArgument(
                "Session middleware is not installed".to_string(),
            ))
        })
    }
}

/// Credentials of an authenticated request, available as an Axum extractor
///
/// Rejects with 401 when the request is not authenticated. Use
/// `Option<AuthCredentials>` on routes behind
/// [`authenticate_optional`](crate::authenticate_optional).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuthCredentials {
    /// What the validator returned, or the session payload
    pub credentials: Value,
    /// The session payload as stored
    pub artifacts: Value,
}

impl From<&Authenticated> for AuthCredentials {
    fn from(authenticated: &Authenticated) -> Self {
        Self {
            credentials: authenticated.credentials.clone(),
            artifacts: authenticated.artifacts.clone(),
        }
    }
}

impl<S> FromRequestParts<S> for AuthCredentials
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCredentials>()
            .cloned()
            .ok_or_else(|| {
                tracing::debug!("No authenticated session in request");
                AuthRejection::from(AuthError::Unauthorized(
                    "Missing authentication".to_string(),
                ))
            })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthCredentials
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthCredentials>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts() -> Parts {
        let (parts, _) = http::Request::builder()
            .uri("/")
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_credentials_from_authenticated() {
        let authenticated = Authenticated {
            credentials: json!({"id": 1}),
            artifacts: json!({"name": "user1"}),
            session_id: "sessionid".to_string(),
        };

        let credentials = AuthCredentials::from(&authenticated);

        assert_eq!(credentials.credentials, json!({"id": 1}));
        assert_eq!(credentials.artifacts, json!({"name": "user1"}));
    }

    #[tokio::test]
    async fn test_credentials_extractor_rejects_without_extension() {
        let mut parts = parts();

        let result =
            <AuthCredentials as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await;

        let rejection = result.unwrap_err();
        assert!(matches!(rejection.error(), AuthError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_optional_credentials_extractor() {
        let mut parts = parts();
        let none =
            <AuthCredentials as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &())
                .await
                .unwrap();
        assert!(none.is_none());

        let credentials = AuthCredentials {
            credentials: json!({"id": 1}),
            artifacts: json!({"id": 1}),
        };
        parts.extensions.insert(credentials.clone());
        let some =
            <AuthCredentials as OptionalFromRequestParts<()>>::from_request_parts(&mut parts, &())
                .await
                .unwrap();
        assert_eq!(some, Some(credentials));
    }

    #[tokio::test]
    async fn test_session_extractor_requires_middleware() {
        let mut parts = parts();

        let result = <Session as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await;

        assert!(matches!(
            result.unwrap_err().error(),
            AuthError::InvalidArgument(_)
        ));
    }
}
