use http::StatusCode;
use serde_json::Value;

use crate::cookie::CookieDirective;
use crate::errors::AuthError;

/// Identity established for one request
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    /// What the validator returned, or the session payload
    pub credentials: Value,
    /// The session payload as stored
    pub artifacts: Value,
    pub session_id: String,
}

/// Terminal state of one authentication attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(Authenticated),
    /// No usable session: missing cookie, unknown session, or rejected by the validator
    Unauthenticated(AuthError),
    /// The request could not be evaluated: malformed data or an unavailable store
    Error(AuthError),
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn error(&self) -> Option<&AuthError> {
        match self {
            Self::Authenticated(_) => None,
            Self::Unauthenticated(err) | Self::Error(err) => Some(err),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.error().map_or(StatusCode::OK, AuthError::status_code)
    }
}

/// Result of [`AuthScheme::authenticate`](super::AuthScheme::authenticate):
/// the outcome plus the cookie mutation the response must carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Authentication {
    pub outcome: AuthOutcome,
    pub directive: CookieDirective,
}

impl Authentication {
    pub(crate) fn rejected(outcome: AuthOutcome, directive: CookieDirective) -> Self {
        Self { outcome, directive }
    }
}
