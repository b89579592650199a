use std::sync::Arc;

use redis_auth::{AuthConfig, AuthScheme, InMemorySessionStore, RedisSettings};

mod handlers;
mod server;
mod users;

use crate::{
    handlers::{AccountValidator, AppState, router},
    server::{init_tracing, spawn_http_server},
    users::UserDirectory,
};

const DEFAULT_PORT: u16 = 3000;

// Local Redis, one minute sessions, cookie usable over plain HTTP
fn local_config() -> AuthConfig {
    let redis = RedisSettings {
        host: "127.0.0.1".to_string(),
        port: 6379,
        db: 0,
        password: None,
    };
    let mut config = AuthConfig::new(redis, 60 * 1000);
    config.cookie.ttl = 60 * 1000;
    config.cookie.is_secure = false;
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing(env!("CARGO_CRATE_NAME"));

    let config = match AuthConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("{}; using local defaults", e);
            local_config()
        }
    };

    let users = Arc::new(UserDirectory::seeded());
    let builder = AuthScheme::builder(config.clone()).validator(AccountValidator {
        users: users.clone(),
    });
    let scheme = if std::env::var("DEMO_MEMORY_STORE").is_ok_and(|v| v == "true") {
        tracing::info!("Using in-memory session store");
        builder.build(Arc::new(InMemorySessionStore::new(config.prefix_key)))?
    } else {
        builder.connect().await?
    };

    let port = match std::env::var("PORT") {
        Ok(port) => port.parse()?,
        Err(_) => DEFAULT_PORT,
    };

    let app = router(scheme, AppState { users });
    spawn_http_server(port, app).await??;
    Ok(())
}
