//! Session token middleware
//!
//! Resolves the `?token=` query parameter before a protected handler runs
//! and hands the bound username to it as a [`SessionUser`] extension.
//! Requests with a missing or unknown token are rejected here, so the
//! durable log is never touched for them.

use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::handlers::{session_error, TokenParams};
use super::response::ApiError;
use crate::storage::run_blocking;
use crate::tokens::session;
use crate::AppState;

/// Username bound to the request's session token
#[derive(Debug, Clone)]
pub struct SessionUser(pub String);

pub async fn require_session(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TokenParams>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = params.require()?;

    let store = Arc::clone(&state.tokens);
    let username = run_blocking(state.config.stores.timeout(), move || {
        session::resolve(store.as_ref(), &token)
    })
    .await
    .map_err(session_error)?;

    if username.is_empty() {
        tracing::warn!("Token resolved to an empty username");
        return Err(ApiError::unauthorized(
            "Username not found for the provided token",
        ));
    }

    request.extensions_mut().insert(SessionUser(username));
    Ok(next.run(request).await)
}
