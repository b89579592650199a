use axum::response::{IntoResponse, Response};
use http::StatusCode;
use redis_auth::{AuthError, CookieDirective};

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

impl<T> IntoResponseError<T> for Result<T, AuthError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            if e.status_code().is_server_error() {
                tracing::error!("{}", e);
            }
            (e.status_code(), e.to_string())
        })
    }
}

/// Rejected request: the error response plus the cookie mutation it carries
#[derive(Debug)]
pub struct AuthRejection {
    error: AuthError,
    directive: CookieDirective,
}

impl AuthRejection {
    pub fn new(error: AuthError, directive: CookieDirective) -> Self {
        Self { error, directive }
    }

    pub fn error(&self) -> &AuthError {
        &self.error
    }
}

impl From<AuthError> for AuthRejection {
    fn from(error: AuthError) -> Self {
        Self::new(error, CookieDirective::None)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let mut response = (self.error.status_code(), self.error.to_string()).into_response();
        if let Err(e) = self.directive.apply(response.headers_mut()) {
            tracing::error!("Failed to attach cookie to rejection: {}", e);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;

    #[test]
    fn test_auth_error_status_mapping() {
        let cases = [
            (AuthError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AuthError::Malformed("x".into()), StatusCode::BAD_REQUEST),
            (
                AuthError::StoreUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                AuthError::InvalidArgument("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AuthError::ConfigInvalid("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            // Given a failed result
            let result: Result<(), AuthError> = Err(error.clone());

            // When converting to a response error
            let response_error = result.into_response_error();

            // Then the status follows the error kind
            match response_error {
                Err((status, message)) => {
                    assert_eq!(status, expected);
                    assert_eq!(message, error.to_string());
                }
                Ok(_) => panic!("Expected an error for {error:?}"),
            }
        }
    }

    #[test]
    fn test_success_case() {
        let result: Result<String, AuthError> = Ok("Success".to_string());
        assert_eq!(result.into_response_error().unwrap(), "Success");
    }

    #[test]
    fn test_rejection_carries_clear_cookie() {
        let rejection = AuthRejection::new(
            AuthError::Unauthorized("Unknown session".into()),
            CookieDirective::Clear("authentication=; Max-Age=0".to_string()),
        );

        let response = rejection.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(SET_COOKIE).unwrap(),
            "authentication=; Max-Age=0"
        );
    }

    #[test]
    fn test_rejection_without_directive() {
        let rejection = AuthRejection::from(AuthError::StoreUnavailable("down".into()));

        let response = rejection.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
