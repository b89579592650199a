use serde::Serialize;
use serde_json::Value;

use crate::cookie::CookieDirective;
use crate::errors::AuthError;
use crate::scheme::AuthScheme;

use super::codec::{encode_payload, to_payload};

/// Request-scoped session facade.
///
/// Holds no session data across requests: every call goes to the store.
/// Side effects are limited to the store and one pending cookie directive,
/// which the host applies to the response.
pub struct SessionManager {
    scheme: AuthScheme,
    request_session_id: Option<String>,
    artifacts: Option<Value>,
    directive: CookieDirective,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_name", &self.cookie_name())
            .field("authenticated", &self.artifacts.is_some())
            .field("directive", &self.directive)
            .finish()
    }
}

impl SessionManager {
    pub(crate) fn new(
        scheme: AuthScheme,
        request_session_id: Option<String>,
        artifacts: Option<Value>,
        directive: CookieDirective,
    ) -> Self {
        Self {
            scheme,
            request_session_id,
            artifacts,
            directive,
        }
    }

    pub fn cookie_name(&self) -> &str {
        self.scheme.policy().name()
    }

    /// Session payload of the authenticated principal of this request
    pub fn artifacts(&self) -> Option<&Value> {
        self.artifacts.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Session id carried by the request's cookie, once decoded
    pub fn request_session_id(&self) -> Option<&str> {
        self.request_session_id.as_deref()
    }

    pub fn directive(&self) -> &CookieDirective {
        &self.directive
    }

    pub fn take_directive(&mut self) -> CookieDirective {
        std::mem::take(&mut self.directive)
    }

    /// Store a new session and schedule its cookie on the response.
    #[tracing::instrument(skip_all)]
    pub async fn issue<T>(&mut self, id: &str, payload: &T) -> Result<(), AuthError>
    where
        T: Serialize + ?Sized,
    {
        if id.is_empty() {
            return Err(AuthError::InvalidArgument("Invalid token.".to_string()));
        }
        let payload = to_payload(payload)?;
        let value = encode_payload(&payload)?;
        let directive = self.scheme.policy().set_cookie(id)?;

        let config = self.scheme.config();
        let store = self.scheme.store();
        store.select(config.redis.db).await?;
        store.set(id, &value).await?;
        if let Some(ttl) = config.session_ttl_secs() {
            if let Err(e) = store.expire(id, ttl).await {
                // Without a TTL and without a cookie the record would never go away
                match store.expire(id, 0).await {
                    Ok(()) => tracing::debug!("Removed session left without a TTL"),
                    Err(cleanup) => tracing::error!("Session left without a TTL: {}", cleanup),
                }
                return Err(e.into());
            }
        }
        tracing::debug!("Session stored, ttl: {:?}s", config.session_ttl_secs());

        self.directive = directive;
        self.artifacts = Some(payload);
        self.request_session_id = Some(id.to_string());
        Ok(())
    }

    /// Raw stored value of session `id`, `None` when absent.
    #[tracing::instrument(skip_all)]
    pub async fn fetch(&self, id: &str) -> Result<Option<String>, AuthError> {
        let value = self.scheme.fetch(id).await?;
        tracing::debug!("Session lookup hit: {}", value.is_some());
        Ok(value)
    }

    /// Destroy a session. Defaults to the session of the current request.
    ///
    /// The request must be authenticated; preconditions are checked before
    /// the store is touched.
    #[tracing::instrument(skip_all)]
    pub async fn revoke(&mut self, id: Option<&str>) -> Result<(), AuthError> {
        let key = id
            .or(self.request_session_id.as_deref())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AuthError::InvalidArgument("A key must be specified.".to_string()))?
            .to_string();
        if self.artifacts.is_none() {
            return Err(AuthError::InvalidArgument("Invalid cookie.".to_string()));
        }

        let store = self.scheme.store();
        store.select(self.scheme.config().redis.db).await?;
        store.expire(&key, 0).await?;
        tracing::debug!("Session revoked");

        self.artifacts = None;
        self.directive = if self.scheme.policy().clear_invalid() {
            self.scheme.policy().clear_cookie()
        } else {
            CookieDirective::None
        };
        Ok(())
    }
}
