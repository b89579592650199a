//! redis-auth - Cookie-referenced session authentication over Redis
//!
//! Requests carry an opaque session id in a cookie. The id is looked up in a
//! key-value store; the presence of the session, and optionally an
//! application [`SessionValidator`], decide whether the request is
//! authenticated. Cookie mutations are never written directly: each decision
//! returns a [`CookieDirective`] the host framework applies to its response.

mod config;
mod cookie;
mod errors;
mod scheme;
mod session;
mod storage;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::{
    AuthConfig, AuthOptions, CookieEncoding, CookieOptions, CookieSettings, DEFAULT_COOKIE_NAME,
    DEFAULT_COOKIE_TTL_MS, DEFAULT_PREFIX_KEY, DEFAULT_STORE_TIMEOUT_MS, MAX_TTL_MS,
    RedisOptions, RedisSettings, SameSite, SameSiteOption,
};
pub use cookie::{CookieDirective, CookiePolicy};
pub use errors::AuthError;
pub use scheme::{
    AuthOutcome, AuthScheme, AuthSchemeBuilder, Authenticated, Authentication, SessionValidator,
    ValidationResult,
};
pub use session::{Session, SessionManager, to_payload};
pub use storage::{InMemorySessionStore, RedisSessionStore, SessionStore, StorageError};
pub use utils::gen_session_id;
