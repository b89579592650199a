//! Scheme configuration
//!
//! Options arrive as a loosely typed [`AuthOptions`] bag (JSON or environment
//! variables) and are validated exactly once into an [`AuthConfig`]. A scheme
//! is never built from a configuration that failed validation.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

pub const DEFAULT_COOKIE_NAME: &str = "authentication";
pub const DEFAULT_PREFIX_KEY: &str = "auth";
/// 30 days
pub const DEFAULT_COOKIE_TTL_MS: u64 = 1000 * 60 * 60 * 24 * 30;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;
/// Upper bound for `ttl` and `cookie.ttl`, one hundred years in milliseconds
pub const MAX_TTL_MS: u64 = 1000 * 60 * 60 * 24 * 365 * 100;
pub const IRON_MIN_PASSWORD_LEN: usize = 32;

const ENV_PREFIX: &str = "REDIS_AUTH_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
        }
    }
}

/// How the session id is written into the cookie value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieEncoding {
    #[default]
    None,
    Base64,
    Base64Json,
    Iron,
}

impl FromStr for CookieEncoding {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "base64" => Ok(Self::Base64),
            "base64json" => Ok(Self::Base64Json),
            "iron" => Ok(Self::Iron),
            other => Err(AuthError::ConfigInvalid(format!(
                "cookie.encoding must be one of none, base64, base64json, iron (got {other:?})"
            ))),
        }
    }
}

/// `isSameSite` accepts `false` or a policy name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SameSiteOption {
    Flag(bool),
    Policy(String),
}

impl SameSiteOption {
    fn resolve(&self) -> Result<Option<SameSite>, AuthError> {
        match self {
            SameSiteOption::Flag(false) => Ok(None),
            SameSiteOption::Policy(p) if p == "Strict" => Ok(Some(SameSite::Strict)),
            SameSiteOption::Policy(p) if p == "Lax" => Ok(Some(SameSite::Lax)),
            other => Err(AuthError::ConfigInvalid(format!(
                "cookie.isSameSite must be false, \"Strict\" or \"Lax\" (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RedisOptions {
    pub host: Option<String>,
    pub port: Option<i64>,
    pub db: Option<i64>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CookieOptions {
    pub ttl: Option<i64>,
    pub is_secure: Option<bool>,
    pub is_http_only: Option<bool>,
    pub is_same_site: Option<SameSiteOption>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub encoding: Option<CookieEncoding>,
    pub password: Option<String>,
    pub clear_invalid: Option<bool>,
}

/// Unvalidated scheme options, keyed the same way in JSON
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthOptions {
    pub cookie_name: Option<String>,
    pub prefix_key: Option<String>,
    pub redis: Option<RedisOptions>,
    pub ttl: Option<i64>,
    pub cookie: Option<CookieOptions>,
    pub keep_alive: Option<bool>,
    /// Deadline for a single store round trip, in milliseconds
    pub store_timeout: Option<i64>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub db: u8,
    pub password: Option<String>,
}

impl RedisSettings {
    /// Connection URL including the database index
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl fmt::Debug for RedisSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct CookieSettings {
    /// Client-side lifetime in milliseconds
    pub ttl: u64,
    pub is_secure: bool,
    pub is_http_only: bool,
    pub same_site: Option<SameSite>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub encoding: CookieEncoding,
    pub password: Option<String>,
    pub clear_invalid: bool,
}

impl CookieSettings {
    pub fn max_age_secs(&self) -> u64 {
        self.ttl / 1000
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_COOKIE_TTL_MS,
            is_secure: true,
            is_http_only: true,
            same_site: Some(SameSite::Strict),
            path: None,
            domain: None,
            encoding: CookieEncoding::None,
            password: None,
            clear_invalid: false,
        }
    }
}

impl fmt::Debug for CookieSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSettings")
            .field("ttl", &self.ttl)
            .field("is_secure", &self.is_secure)
            .field("is_http_only", &self.is_http_only)
            .field("same_site", &self.same_site)
            .field("path", &self.path)
            .field("domain", &self.domain)
            .field("encoding", &self.encoding)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("clear_invalid", &self.clear_invalid)
            .finish()
    }
}

/// Validated configuration of one registered scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub prefix_key: String,
    pub redis: RedisSettings,
    /// Store-side session lifetime in milliseconds, 0 for no expiry
    pub ttl: u64,
    pub cookie: CookieSettings,
    pub keep_alive: bool,
    pub store_timeout: Duration,
}

impl AuthConfig {
    /// Minimal configuration with every optional field at its default
    pub fn new(redis: RedisSettings, ttl: u64) -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            prefix_key: DEFAULT_PREFIX_KEY.to_string(),
            redis,
            ttl,
            cookie: CookieSettings::default(),
            keep_alive: false,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let options: AuthOptions = serde_json::from_str(json)
            .map_err(|e| AuthError::ConfigInvalid(e.to_string()))?;
        Self::try_from(options)
    }

    /// Load options from `REDIS_AUTH_*` environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        let redis = RedisOptions {
            host: env_var("REDIS_HOST"),
            port: env_parse("REDIS_PORT")?,
            db: env_parse("REDIS_DB")?,
            password: env_var("REDIS_PASSWORD"),
        };

        let is_same_site = env_var("COOKIE_SAME_SITE").map(|v| match v.as_str() {
            "false" => SameSiteOption::Flag(false),
            _ => SameSiteOption::Policy(v),
        });

        let cookie = CookieOptions {
            ttl: env_parse("COOKIE_TTL")?,
            is_secure: env_parse("COOKIE_SECURE")?,
            is_http_only: env_parse("COOKIE_HTTP_ONLY")?,
            is_same_site,
            path: env_var("COOKIE_PATH"),
            domain: env_var("COOKIE_DOMAIN"),
            encoding: env_parse("COOKIE_ENCODING")?,
            password: env_var("COOKIE_PASSWORD"),
            clear_invalid: env_parse("COOKIE_CLEAR_INVALID")?,
        };

        let options = AuthOptions {
            cookie_name: env_var("COOKIE_NAME"),
            prefix_key: env_var("PREFIX_KEY"),
            redis: Some(redis),
            ttl: env_parse("TTL")?,
            cookie: Some(cookie),
            keep_alive: env_parse("KEEP_ALIVE")?,
            store_timeout: env_parse("STORE_TIMEOUT_MS")?,
        };

        Self::try_from(options)
    }

    /// Store-side TTL in whole seconds, rounded up. `None` keeps the key forever.
    pub fn session_ttl_secs(&self) -> Option<u64> {
        match self.ttl {
            0 => None,
            ms => Some(ms.div_ceil(1000)),
        }
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if !is_cookie_token(&self.cookie_name) {
            return Err(invalid("cookieName must be a non-empty cookie token"));
        }
        if self.prefix_key.is_empty() {
            return Err(invalid("prefixKey must not be empty"));
        }
        if self.redis.host.is_empty() {
            return Err(invalid("redis.host must not be empty"));
        }
        if self.redis.port == 0 {
            return Err(invalid("redis.port must be between 1 and 65535"));
        }
        if self.redis.password.as_deref() == Some("") {
            return Err(invalid("redis.password must not be empty"));
        }
        if self.ttl > MAX_TTL_MS {
            return Err(invalid(&format!("ttl must not exceed {MAX_TTL_MS}")));
        }
        if self.cookie.ttl > MAX_TTL_MS {
            return Err(invalid(&format!("cookie.ttl must not exceed {MAX_TTL_MS}")));
        }
        check_attribute("cookie.path", self.cookie.path.as_deref())?;
        check_attribute("cookie.domain", self.cookie.domain.as_deref())?;
        if self.cookie.password.as_deref() == Some("") {
            return Err(invalid("cookie.password must not be empty"));
        }
        if self.cookie.encoding == CookieEncoding::Iron {
            match self.cookie.password.as_deref() {
                Some(p) if p.len() >= IRON_MIN_PASSWORD_LEN => {}
                Some(_) => {
                    return Err(invalid(&format!(
                        "cookie.password must be at least {IRON_MIN_PASSWORD_LEN} characters for iron encoding"
                    )));
                }
                None => return Err(invalid("cookie.password is required for iron encoding")),
            }
        }
        if self.store_timeout.is_zero() {
            return Err(invalid("storeTimeout must be greater than 0"));
        }
        Ok(())
    }
}

impl TryFrom<AuthOptions> for AuthConfig {
    type Error = AuthError;

    fn try_from(options: AuthOptions) -> Result<Self, Self::Error> {
        let redis = options.redis.ok_or_else(|| invalid("redis is required"))?;
        let host = redis.host.ok_or_else(|| invalid("redis.host is required"))?;
        let port = redis.port.ok_or_else(|| invalid("redis.port is required"))?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| invalid("redis.port must be between 1 and 65535"))?;
        let db = redis.db.ok_or_else(|| invalid("redis.db is required"))?;
        let db = u8::try_from(db).map_err(|_| invalid("redis.db must be between 0 and 255"))?;

        let ttl = options.ttl.ok_or_else(|| invalid("ttl is required"))?;
        let ttl = non_negative("ttl", ttl)?;

        let cookie = options.cookie.unwrap_or_default();
        let defaults = CookieSettings::default();
        let same_site = match cookie.is_same_site {
            Some(option) => option.resolve()?,
            None => defaults.same_site,
        };
        let cookie = CookieSettings {
            ttl: match cookie.ttl {
                Some(ttl) => non_negative("cookie.ttl", ttl)?,
                None => defaults.ttl,
            },
            is_secure: cookie.is_secure.unwrap_or(defaults.is_secure),
            is_http_only: cookie.is_http_only.unwrap_or(defaults.is_http_only),
            same_site,
            path: cookie.path,
            domain: cookie.domain,
            encoding: cookie.encoding.unwrap_or_default(),
            password: cookie.password,
            clear_invalid: cookie.clear_invalid.unwrap_or(defaults.clear_invalid),
        };

        let store_timeout = match options.store_timeout {
            Some(ms) => non_negative("storeTimeout", ms)?,
            None => DEFAULT_STORE_TIMEOUT_MS,
        };

        let config = AuthConfig {
            cookie_name: options
                .cookie_name
                .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
            prefix_key: options
                .prefix_key
                .unwrap_or_else(|| DEFAULT_PREFIX_KEY.to_string()),
            redis: RedisSettings {
                host,
                port,
                db,
                password: redis.password,
            },
            ttl,
            cookie,
            keep_alive: options.keep_alive.unwrap_or(false),
            store_timeout: Duration::from_millis(store_timeout),
        };

        config.validate()?;
        Ok(config)
    }
}

fn invalid(msg: &str) -> AuthError {
    AuthError::ConfigInvalid(msg.to_string())
}

fn non_negative(name: &str, value: i64) -> Result<u64, AuthError> {
    u64::try_from(value).map_err(|_| invalid(&format!("{name} must be greater than or equal to 0")))
}

// RFC 6265 cookie-name: any CHAR except CTLs or separators
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c))
}

fn check_attribute(name: &str, value: Option<&str>) -> Result<(), AuthError> {
    match value {
        Some("") => Err(invalid(&format!("{name} must not be empty"))),
        Some(v) if v.chars().any(|c| c == ';' || c.is_ascii_control()) => {
            Err(invalid(&format!("{name} contains invalid characters")))
        }
        _ => Ok(()),
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn env_parse<T>(name: &str) -> Result<Option<T>, AuthError>
where
    T: FromStr,
{
    match env_var(name) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AuthError::ConfigInvalid(format!("{ENV_PREFIX}{name} has an invalid value: {raw:?}"))
        }),
        None => Ok(None),
    }
}
