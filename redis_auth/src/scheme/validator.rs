use async_trait::async_trait;
use http::request::Parts;
use serde_json::Value;

use crate::session::Session;

/// Verdict of a [`SessionValidator`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationResult {
    pub valid: bool,
    /// Replaces the session payload as the request's credentials
    pub credentials: Option<Value>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            valid: true,
            credentials: None,
        }
    }

    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Value) -> Self {
        Self {
            valid: true,
            credentials: Some(credentials),
        }
    }
}

/// Application check run on every request whose session was found.
///
/// Plain closures `Fn(&Parts, &Session) -> ValidationResult` implement this
/// trait; implement it directly when validation has to await something.
#[async_trait]
pub trait SessionValidator: Send + Sync + 'static {
    async fn validate(&self, request: &Parts, session: &Session) -> ValidationResult;
}

#[async_trait]
impl<F> SessionValidator for F
where
    F: Fn(&Parts, &Session) -> ValidationResult + Send + Sync + 'static,
{
    async fn validate(&self, request: &Parts, session: &Session) -> ValidationResult {
        self(request, session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parts() -> Parts {
        let (parts, _) = http::Request::builder()
            .uri("/resource")
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    struct AdminOnly;

    #[async_trait]
    impl SessionValidator for AdminOnly {
        async fn validate(&self, _request: &Parts, session: &Session) -> ValidationResult {
            if session.payload["role"] == "admin" {
                ValidationResult::valid()
            } else {
                ValidationResult::invalid()
            }
        }
    }

    #[tokio::test]
    async fn test_closure_validator() {
        let validator = |request: &Parts, _session: &Session| {
            if request.uri.path() == "/resource" {
                ValidationResult::with_credentials(json!({"id": 1}))
            } else {
                ValidationResult::invalid()
            }
        };
        let session = Session {
            id: "sessionid".to_string(),
            payload: json!({"name": "user1"}),
        };

        let result = validator.validate(&parts(), &session).await;

        assert!(result.valid);
        assert_eq!(result.credentials, Some(json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_trait_validator() {
        let admin = Session {
            id: "a".to_string(),
            payload: json!({"role": "admin"}),
        };
        let user = Session {
            id: "b".to_string(),
            payload: json!({"role": "user"}),
        };

        assert!(AdminOnly.validate(&parts(), &admin).await.valid);
        assert!(!AdminOnly.validate(&parts(), &user).await.valid);
    }

    #[test]
    fn test_constructors() {
        assert_eq!(
            ValidationResult::invalid(),
            ValidationResult {
                valid: false,
                credentials: None
            }
        );
        assert!(ValidationResult::valid().credentials.is_none());
    }
}
