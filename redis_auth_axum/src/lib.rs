//! redis-auth-axum - Axum integration for the redis-auth session scheme
//!
//! Install one of the middleware functions with
//! `axum::middleware::from_fn_with_state(scheme, ..)` and use the
//! [`Session`] and [`AuthCredentials`] extractors in handlers.

mod error;
mod middleware;
mod session;

pub use error::{AuthRejection, IntoResponseError};
pub use middleware::{authenticate, authenticate_optional, with_session};
pub use session::{AuthCredentials, Session};

pub use redis_auth::{AuthConfig, AuthError, AuthScheme, SessionValidator, ValidationResult};
