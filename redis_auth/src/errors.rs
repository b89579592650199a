use http::StatusCode;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors produced by the authentication scheme and the session manager
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The scheme options failed validation. Only raised while building a scheme.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The session store could not be reached or answered with a protocol error
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    /// No usable session: missing cookie, unknown session id, or rejected by the validator
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The cookie or the stored session value could not be decoded
    #[error("Malformed session: {0}")]
    Malformed(String),

    /// A session manager precondition was violated by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AuthError {
    /// HTTP status the host framework should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::Malformed(_) => StatusCode::BAD_REQUEST,
            AuthError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::ConfigInvalid(_) | AuthError::InvalidArgument(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the clear-invalid cookie policy applies to this error
    pub(crate) fn clears_cookie(&self) -> bool {
        matches!(self, AuthError::Unauthorized(_) | AuthError::Malformed(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}
