//! Per-request authentication decision.
//!
//! Every request ends in exactly one terminal state:
//!
//! | request | outcome | cookie |
//! |---|---|---|
//! | no cookie | `Unauthenticated(Unauthorized)` | untouched |
//! | undecodable cookie | `Error(Malformed)` | cleared if `clear_invalid` |
//! | store failure | `Error(StoreUnavailable)` | untouched |
//! | unknown session | `Unauthenticated(Unauthorized)` | cleared if `clear_invalid` |
//! | unreadable session | `Error(Malformed)` | cleared if `clear_invalid` |
//! | validator says no | `Unauthenticated(Unauthorized)` | cleared if `clear_invalid` |
//! | valid session | `Authenticated` | re-issued if `keep_alive` |

mod types;
mod validator;

use std::sync::Arc;

use http::request::Parts;

use crate::config::AuthConfig;
use crate::cookie::{CookieDirective, CookiePolicy};
use crate::errors::AuthError;
use crate::session::{Session, SessionManager, decode_payload};
use crate::storage::{RedisSessionStore, SessionStore};

pub use types::{AuthOutcome, Authenticated, Authentication};
pub use validator::{SessionValidator, ValidationResult};

/// A registered session authentication scheme.
///
/// Cheap to clone; all clones share one configuration, store and validator.
#[derive(Clone)]
pub struct AuthScheme {
    inner: Arc<SchemeInner>,
}

struct SchemeInner {
    config: AuthConfig,
    policy: CookiePolicy,
    store: Arc<dyn SessionStore>,
    validator: Option<Arc<dyn SessionValidator>>,
}

impl std::fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthScheme")
            .field("config", &self.inner.config)
            .field("validator", &self.inner.validator.is_some())
            .finish()
    }
}

pub struct AuthSchemeBuilder {
    config: AuthConfig,
    validator: Option<Arc<dyn SessionValidator>>,
}

impl AuthSchemeBuilder {
    pub fn validator<V: SessionValidator>(mut self, validator: V) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Build the scheme over an existing store
    pub fn build(self, store: Arc<dyn SessionStore>) -> Result<AuthScheme, AuthError> {
        self.config.validate()?;
        tracing::info!(
            "Registering session scheme with cookie '{}'",
            self.config.cookie_name
        );
        Ok(AuthScheme {
            inner: Arc::new(SchemeInner {
                policy: CookiePolicy::new(&self.config),
                config: self.config,
                store,
                validator: self.validator,
            }),
        })
    }

    /// Connect to the configured Redis server and build the scheme over it
    pub async fn connect(self) -> Result<AuthScheme, AuthError> {
        self.config.validate()?;
        let store = RedisSessionStore::connect(
            &self.config.redis,
            &self.config.prefix_key,
            self.config.store_timeout,
        )
        .await?;
        self.build(Arc::new(store))
    }
}

impl AuthScheme {
    pub fn builder(config: AuthConfig) -> AuthSchemeBuilder {
        AuthSchemeBuilder {
            config,
            validator: None,
        }
    }

    pub fn new(config: AuthConfig, store: Arc<dyn SessionStore>) -> Result<Self, AuthError> {
        Self::builder(config).build(store)
    }

    pub async fn connect(config: AuthConfig) -> Result<Self, AuthError> {
        Self::builder(config).connect().await
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    pub fn policy(&self) -> &CookiePolicy {
        &self.inner.policy
    }

    pub(crate) fn store(&self) -> &dyn SessionStore {
        self.inner.store.as_ref()
    }

    /// Session manager for a request that carries no authenticated session
    pub fn anonymous_session(&self) -> SessionManager {
        SessionManager::new(self.clone(), None, None, CookieDirective::None)
    }

    /// Session manager seeded with the result of [`Self::authenticate`]
    pub fn session(&self, authentication: &Authentication) -> SessionManager {
        match &authentication.outcome {
            AuthOutcome::Authenticated(auth) => SessionManager::new(
                self.clone(),
                Some(auth.session_id.clone()),
                Some(auth.artifacts.clone()),
                authentication.directive.clone(),
            ),
            _ => SessionManager::new(self.clone(), None, None, authentication.directive.clone()),
        }
    }

    pub(crate) async fn fetch(&self, id: &str) -> Result<Option<String>, AuthError> {
        self.store().select(self.config().redis.db).await?;
        Ok(self.store().get(id).await?)
    }

    /// Decide whether `request` is authenticated.
    #[tracing::instrument(skip_all, fields(method = %request.method, path = %request.uri.path()))]
    pub async fn authenticate(&self, request: &Parts) -> Authentication {
        let Some(raw) = self.policy().read(&request.headers) else {
            tracing::debug!("No session cookie");
            return Authentication::rejected(
                AuthOutcome::Unauthenticated(AuthError::Unauthorized(
                    "Missing authentication".to_string(),
                )),
                CookieDirective::None,
            );
        };

        match self.evaluate(request, &raw).await {
            Ok(authenticated) => {
                let directive = self.keep_alive(&authenticated.session_id);
                tracing::debug!("Session authenticated");
                Authentication {
                    outcome: AuthOutcome::Authenticated(authenticated),
                    directive,
                }
            }
            Err(err) => self.reject(err),
        }
    }

    async fn evaluate(&self, request: &Parts, raw: &str) -> Result<Authenticated, AuthError> {
        let session_id = self.policy().decode(raw)?;

        let Some(stored) = self.fetch(&session_id).await? else {
            return Err(AuthError::Unauthorized("Unknown session".to_string()));
        };
        let session = Session {
            payload: decode_payload(&stored)?,
            id: session_id,
        };
        tracing::debug!("Session found");

        let credentials = match &self.inner.validator {
            None => session.payload.clone(),
            Some(validator) => {
                let result = validator.validate(request, &session).await;
                if !result.valid {
                    return Err(AuthError::Unauthorized("Invalid session".to_string()));
                }
                tracing::debug!("Session accepted by validator");
                result
                    .credentials
                    .unwrap_or_else(|| session.payload.clone())
            }
        };

        Ok(Authenticated {
            credentials,
            artifacts: session.payload,
            session_id: session.id,
        })
    }

    fn keep_alive(&self, session_id: &str) -> CookieDirective {
        if !self.config().keep_alive {
            return CookieDirective::None;
        }
        match self.policy().set_cookie(session_id) {
            Ok(directive) => directive,
            // Only ids `issue` would have refused get here; the request stays authenticated
            Err(e) => {
                tracing::warn!("Cannot re-issue session cookie: {}", e);
                CookieDirective::None
            }
        }
    }

    fn reject(&self, err: AuthError) -> Authentication {
        // Only reached with a cookie present.
        let directive = self.policy().on_rejection(true, &err);
        let outcome = match err {
            AuthError::Unauthorized(_) => {
                tracing::debug!("Session rejected: {}", err);
                AuthOutcome::Unauthenticated(err)
            }
            AuthError::Malformed(_) => {
                tracing::warn!("Malformed session data: {}", err);
                AuthOutcome::Error(err)
            }
            _ => {
                tracing::error!("Authentication failed: {}", err);
                AuthOutcome::Error(err)
            }
        };
        Authentication::rejected(outcome, directive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CookieEncoding;
    use crate::storage::InMemorySessionStore;
    use crate::test_utils::{failing_scheme, memory_scheme, test_config};
    use http::header::COOKIE;
    use serde_json::json;

    const CLEAR: &str = "authentication=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Secure; HttpOnly; SameSite=Strict";

    fn request(cookie: Option<&str>) -> Parts {
        let mut builder = http::Request::builder().uri("/resource");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    fn clearing_config() -> AuthConfig {
        let mut config = test_config();
        config.cookie.clear_invalid = true;
        config
    }

    async fn seeded(config: AuthConfig) -> (AuthScheme, Arc<InMemorySessionStore>) {
        let (scheme, store) = memory_scheme(config);
        scheme
            .anonymous_session()
            .issue("sessionid", &json!({"name": "user1"}))
            .await
            .unwrap();
        (scheme, store)
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthorized_without_directive() {
        // Given clearInvalid enabled
        let (scheme, _store) = memory_scheme(clearing_config());

        // When a request without cookie is authenticated
        let auth = scheme.authenticate(&request(None)).await;

        // Then it is rejected and the cookie is left alone
        assert!(matches!(
            auth.outcome,
            AuthOutcome::Unauthenticated(AuthError::Unauthorized(_))
        ));
        assert!(auth.directive.is_none());
    }

    #[tokio::test]
    async fn test_valid_session_authenticates() {
        let (scheme, _store) = seeded(test_config()).await;

        let auth = scheme
            .authenticate(&request(Some("authentication=sessionid")))
            .await;

        assert_eq!(
            auth.outcome,
            AuthOutcome::Authenticated(Authenticated {
                credentials: json!({"name": "user1"}),
                artifacts: json!({"name": "user1"}),
                session_id: "sessionid".to_string(),
            })
        );
        assert!(auth.directive.is_none());
    }

    #[tokio::test]
    async fn test_keep_alive_reissues_cookie() {
        let mut config = test_config();
        config.keep_alive = true;
        let (scheme, store) = seeded(config).await;
        let ttl_before = store.ttl("sessionid").await.unwrap();

        let auth = scheme
            .authenticate(&request(Some("authentication=sessionid")))
            .await;

        assert!(auth.outcome.is_authenticated());
        assert_eq!(
            auth.directive.header_value(),
            Some("authentication=sessionid; Max-Age=60; Secure; HttpOnly; SameSite=Strict")
        );
        // Store-side TTL is not refreshed
        assert!(store.ttl("sessionid").await.unwrap() <= ttl_before);
    }

    #[tokio::test]
    async fn test_unknown_session_without_clear_invalid() {
        let (scheme, _store) = memory_scheme(test_config());

        let auth = scheme
            .authenticate(&request(Some("authentication=unknown")))
            .await;

        assert!(matches!(
            auth.outcome,
            AuthOutcome::Unauthenticated(AuthError::Unauthorized(_))
        ));
        assert!(auth.directive.is_none());
    }

    #[tokio::test]
    async fn test_unknown_session_with_clear_invalid() {
        let (scheme, _store) = memory_scheme(clearing_config());

        let auth = scheme
            .authenticate(&request(Some("authentication=unknown")))
            .await;

        assert_eq!(auth.outcome.status_code(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(auth.directive.header_value(), Some(CLEAR));
    }

    #[tokio::test]
    async fn test_revoked_session_is_unauthorized() {
        // Given a session that was issued and then revoked
        let (scheme, _store) = seeded(test_config()).await;
        let auth = scheme
            .authenticate(&request(Some("authentication=sessionid")))
            .await;
        let mut manager = scheme.session(&auth);
        manager.revoke(None).await.unwrap();

        // When the same cookie comes back
        let auth = scheme
            .authenticate(&request(Some("authentication=sessionid")))
            .await;

        // Then it is rejected
        assert!(matches!(
            auth.outcome,
            AuthOutcome::Unauthenticated(AuthError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_unreadable_session_is_malformed() {
        // Given a stored value that is not a session payload
        let (scheme, store) = memory_scheme(clearing_config());
        store.set("broken", "not json").await.unwrap();

        // When it is looked up
        let auth = scheme
            .authenticate(&request(Some("authentication=broken")))
            .await;

        // Then the request is malformed and the cookie cleared
        assert!(matches!(auth.outcome, AuthOutcome::Error(AuthError::Malformed(_))));
        assert_eq!(auth.outcome.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(auth.directive.header_value(), Some(CLEAR));
    }

    #[tokio::test]
    async fn test_undecodable_cookie_is_malformed() {
        let mut config = clearing_config();
        config.cookie.encoding = CookieEncoding::Base64;
        let (scheme, _store) = memory_scheme(config);

        let auth = scheme
            .authenticate(&request(Some("authentication=!!!")))
            .await;

        assert!(matches!(auth.outcome, AuthOutcome::Error(AuthError::Malformed(_))));
        assert!(matches!(auth.directive, CookieDirective::Clear(_)));
    }

    #[tokio::test]
    async fn test_encoded_cookie_round_trip() {
        let mut config = test_config();
        config.cookie.encoding = CookieEncoding::Base64Json;
        let (scheme, _store) = memory_scheme(config);
        let mut manager = scheme.anonymous_session();
        manager.issue("sessionid", &json!({"a": 1})).await.unwrap();
        let header = manager.directive().header_value().unwrap().to_string();
        let cookie = header.split(';').next().unwrap();

        let auth = scheme.authenticate(&request(Some(cookie))).await;

        assert!(auth.outcome.is_authenticated());
    }

    #[tokio::test]
    async fn test_store_failure_is_error_without_directive() {
        // Given a store that fails every operation, and clearInvalid enabled
        let scheme = failing_scheme(clearing_config());

        // When authenticating a request with a cookie
        let auth = scheme
            .authenticate(&request(Some("authentication=sessionid")))
            .await;

        // Then the failure is reported as such and the cookie is untouched
        assert!(matches!(
            auth.outcome,
            AuthOutcome::Error(AuthError::StoreUnavailable(_))
        ));
        assert_eq!(
            auth.outcome.status_code(),
            http::StatusCode::SERVICE_UNAVAILABLE
        );
        assert!(auth.directive.is_none());
    }

    #[tokio::test]
    async fn test_validator_rejects() {
        let (seed, store) = seeded(clearing_config()).await;
        let scheme = AuthScheme::builder(seed.config().clone())
            .validator(|_: &Parts, _: &Session| ValidationResult::invalid())
            .build(store)
            .unwrap();

        let auth = scheme
            .authenticate(&request(Some("authentication=sessionid")))
            .await;

        assert!(matches!(
            auth.outcome,
            AuthOutcome::Unauthenticated(AuthError::Unauthorized(_))
        ));
        assert_eq!(auth.directive.header_value(), Some(CLEAR));
    }

    #[tokio::test]
    async fn test_validator_credentials_replace_payload() {
        let (seed, store) = seeded(test_config()).await;
        let scheme = AuthScheme::builder(seed.config().clone())
            .validator(|_: &Parts, session: &Session| {
                ValidationResult::with_credentials(json!({"user": session.payload["name"]}))
            })
            .build(store)
            .unwrap();

        let auth = scheme
            .authenticate(&request(Some("authentication=sessionid")))
            .await;

        let AuthOutcome::Authenticated(authenticated) = auth.outcome else {
            panic!("Expected an authenticated outcome");
        };
        assert_eq!(authenticated.credentials, json!({"user": "user1"}));
        assert_eq!(authenticated.artifacts, json!({"name": "user1"}));
    }

    #[tokio::test]
    async fn test_validator_without_credentials_uses_payload() {
        let (seed, store) = seeded(test_config()).await;
        let scheme = AuthScheme::builder(seed.config().clone())
            .validator(|_: &Parts, _: &Session| ValidationResult::valid())
            .build(store)
            .unwrap();

        let auth = scheme
            .authenticate(&request(Some("authentication=sessionid")))
            .await;

        let AuthOutcome::Authenticated(authenticated) = auth.outcome else {
            panic!("Expected an authenticated outcome");
        };
        assert_eq!(authenticated.credentials, json!({"name": "user1"}));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = test_config();
        config.prefix_key = String::new();
        let store = Arc::new(InMemorySessionStore::new("auth"));

        let result = AuthScheme::new(config, store);

        assert!(matches!(result, Err(AuthError::ConfigInvalid(_))));
    }

    #[tokio::test]
    async fn test_connect_refused_is_store_unavailable() {
        let mut config = test_config();
        config.redis.port = 1;
        config.store_timeout = std::time::Duration::from_secs(2);

        let result = AuthScheme::connect(config).await;

        assert!(matches!(result, Err(AuthError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_session_from_rejection_carries_directive() {
        let (scheme, _store) = memory_scheme(clearing_config());
        let auth = scheme
            .authenticate(&request(Some("authentication=unknown")))
            .await;

        let manager = scheme.session(&auth);

        assert!(!manager.is_authenticated());
        assert_eq!(manager.directive().header_value(), Some(CLEAR));
    }
}
