use http::header::{HeaderMap, HeaderValue, SET_COOKIE};

use crate::errors::AuthError;

/// The single cookie mutation a request asks the host to apply to its response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CookieDirective {
    #[default]
    None,
    /// `Set-Cookie` value issuing or refreshing the session cookie
    Set(String),
    /// `Set-Cookie` value expiring the session cookie on the client
    Clear(String),
}

impl CookieDirective {
    pub fn is_none(&self) -> bool {
        matches!(self, CookieDirective::None)
    }

    pub fn header_value(&self) -> Option<&str> {
        match self {
            CookieDirective::None => None,
            CookieDirective::Set(value) | CookieDirective::Clear(value) => Some(value),
        }
    }

    /// Append the directive to response headers as one `Set-Cookie`
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AuthError> {
        let Some(value) = self.header_value() else {
            return Ok(());
        };

        let value = HeaderValue::from_str(value)
            .map_err(|_| AuthError::InvalidArgument("Failed to parse cookie".to_string()))?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }
}
