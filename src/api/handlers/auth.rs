use axum::extract::State;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{credential_error, session_error};
use crate::api::response::ApiError;
use crate::credentials;
use crate::storage::run_blocking;
use crate::tokens::session;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginResponse {
    pub response: String,
    pub token: String,
}

/// `POST /auth`: verify credentials and issue a session token
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, ApiError> {
    let timeout = state.config.stores.timeout();
    let LoginForm { password, username } = form;

    let log = Arc::clone(&state.log);
    let user = username.clone();
    run_blocking(timeout, move || {
        credentials::verify(log.as_ref(), &user, &password)
    })
    .await
    .map_err(credential_error)?;

    // Token is issued exactly once per successful verification
    let tokens = Arc::clone(&state.tokens);
    let ttl = state.config.tokens.session_ttl();
    let issued = run_blocking(timeout, move || {
        session::issue(tokens.as_ref(), &username, ttl)
    })
    .await
    .map_err(|e| match session_error(e) {
        ApiError::Error(code, _) => ApiError::Error(code, "Failed to generate token".to_string()),
        other => other,
    })?;

    tracing::info!(username = %issued.username, "User authenticated");

    Ok(Json(LoginResponse {
        response: "ok".to_string(),
        token: issued.token,
    }))
}
