use headers::{Cookie, HeaderMapExt};
use http::HeaderMap;

use crate::config::{AuthConfig, SameSite};
use crate::errors::AuthError;

use super::directive::CookieDirective;
use super::encoding::CookieValueCodec;

const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Cookie attributes and clearing rules derived from one [`AuthConfig`]
#[derive(Clone)]
pub struct CookiePolicy {
    name: String,
    max_age: u64,
    is_secure: bool,
    is_http_only: bool,
    same_site: Option<SameSite>,
    path: Option<String>,
    domain: Option<String>,
    clear_invalid: bool,
    codec: CookieValueCodec,
}

impl CookiePolicy {
    pub fn new(config: &AuthConfig) -> Self {
        let cookie = &config.cookie;
        Self {
            name: config.cookie_name.clone(),
            max_age: cookie.max_age_secs(),
            is_secure: cookie.is_secure,
            is_http_only: cookie.is_http_only,
            same_site: cookie.same_site,
            path: cookie.path.clone(),
            domain: cookie.domain.clone(),
            clear_invalid: cookie.clear_invalid,
            codec: CookieValueCodec::new(
                cookie.encoding,
                &config.cookie_name,
                cookie.password.as_deref(),
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clear_invalid(&self) -> bool {
        self.clear_invalid
    }

    /// Raw value of the configured cookie in the request, if any
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        let cookies = headers.typed_get::<Cookie>()?;
        cookies
            .get(&self.name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Decode a raw cookie value into the session id it carries
    pub fn decode(&self, raw: &str) -> Result<String, AuthError> {
        self.codec.decode(raw)
    }

    /// Directive issuing a cookie that carries `session_id`
    pub fn set_cookie(&self, session_id: &str) -> Result<CookieDirective, AuthError> {
        let value = self.codec.encode(session_id)?;
        if !is_cookie_value(&value) {
            return Err(AuthError::InvalidArgument(
                "Session id is not a valid cookie value".to_string(),
            ));
        }
        Ok(CookieDirective::Set(format!(
            "{}={}; Max-Age={}{}",
            self.name,
            value,
            self.max_age,
            self.attributes()
        )))
    }

    /// Directive expiring the cookie on the client
    pub fn clear_cookie(&self) -> CookieDirective {
        CookieDirective::Clear(format!(
            "{}=; Max-Age=0; Expires={}{}",
            self.name,
            EPOCH,
            self.attributes()
        ))
    }

    /// Whether a rejected request must have its cookie cleared
    pub fn must_clear(&self, cookie_present: bool, rejection: &AuthError) -> bool {
        self.clear_invalid && cookie_present && rejection.clears_cookie()
    }

    pub fn on_rejection(&self, cookie_present: bool, rejection: &AuthError) -> CookieDirective {
        if self.must_clear(cookie_present, rejection) {
            self.clear_cookie()
        } else {
            CookieDirective::None
        }
    }

    fn attributes(&self) -> String {
        let mut attrs = String::new();
        if self.is_secure {
            attrs.push_str("; Secure");
        }
        if self.is_http_only {
            attrs.push_str("; HttpOnly");
        }
        if let Some(same_site) = self.same_site {
            attrs.push_str("; SameSite=");
            attrs.push_str(same_site.as_str());
        }
        if let Some(domain) = &self.domain {
            attrs.push_str("; Domain=");
            attrs.push_str(domain);
        }
        if let Some(path) = &self.path {
            attrs.push_str("; Path=");
            attrs.push_str(path);
        }
        attrs
    }
}

// RFC 6265 cookie-octet
fn is_cookie_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}
