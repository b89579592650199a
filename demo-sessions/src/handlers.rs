use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use http::request::Parts;
use serde::Deserialize;
use serde_json::{Value, json};

use redis_auth::Session as StoredSession;
use redis_auth_axum::{
    AuthCredentials, AuthScheme, IntoResponseError, Session, SessionValidator, ValidationResult,
    authenticate, authenticate_optional,
};

use crate::users::{Account, UserDirectory};

#[derive(Clone)]
pub(crate) struct AppState {
    pub users: Arc<UserDirectory>,
}

/// Accepts sessions whose account still exists, and exposes that account as credentials
pub(crate) struct AccountValidator {
    pub users: Arc<UserDirectory>,
}

#[async_trait]
impl SessionValidator for AccountValidator {
    async fn validate(&self, _request: &Parts, session: &StoredSession) -> ValidationResult {
        let Some(email) = session.payload["account"]["email"].as_str() else {
            return ValidationResult::invalid();
        };
        match self.users.find(email).await {
            Some(account) => ValidationResult::with_credentials(json!(account)),
            None => {
                tracing::debug!("Session refers to a removed account");
                ValidationResult::invalid()
            }
        }
    }
}

pub(crate) fn router(scheme: AuthScheme, state: AppState) -> Router {
    Router::new()
        .route(
            "/sessions",
            post(login)
                .route_layer(from_fn_with_state(scheme.clone(), authenticate_optional))
                .merge(
                    delete(logout)
                        .route_layer(from_fn_with_state(scheme.clone(), authenticate)),
                ),
        )
        .route(
            "/users",
            post(create_user).merge(
                get(list_users).route_layer(from_fn_with_state(scheme.clone(), authenticate)),
            ),
        )
        .route(
            "/me",
            get(me).route_layer(from_fn_with_state(scheme, authenticate)),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreateUserRequest {
    name: String,
    email: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    auth: Option<AuthCredentials>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<&'static str, (StatusCode, String)> {
    if auth.is_some() {
        return Ok("Already logged in !");
    }

    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(invalid_login());
    };
    let Some(account) = state.users.verify(&email, &password).await else {
        tracing::debug!("Login failed for {}", email);
        return Err(invalid_login());
    };

    let sid = uuid::Uuid::new_v4().to_string();
    session
        .issue(&sid, &json!({ "account": account }))
        .await
        .into_response_error()?;
    tracing::info!("User {} logged in", account.id);
    Ok("Successfully logged in !")
}

async fn logout(session: Session) -> Result<&'static str, (StatusCode, String)> {
    session.revoke(None).await.into_response_error()?;
    Ok("Logged out")
}

async fn list_users(State(state): State<AppState>) -> Json<Vec<Account>> {
    Json(state.users.list().await)
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Account>), (StatusCode, String)> {
    state
        .users
        .create(&body.name, &body.email, &body.password)
        .await
        .map(|account| (StatusCode::CREATED, Json(account)))
        .ok_or_else(|| (StatusCode::CONFLICT, "Email already registered".to_string()))
}

async fn me(auth: AuthCredentials) -> Json<Value> {
    Json(auth.credentials)
}

fn invalid_login() -> (StatusCode, String) {
    (
        StatusCode::UNAUTHORIZED,
        "Email or password invalid...".to_string(),
    )
}
