use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{session_error, TokenParams};
use crate::api::response::ApiError;
use crate::storage::run_blocking;
use crate::tokens::session;
use crate::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct ValidateTokenResponse {
    /// Nanoseconds until the token expires
    pub remaining_time: u64,
    pub valid: bool,
}

/// `GET /validate_token?token=`: report validity and remaining lifetime
pub async fn validate_token(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TokenParams>,
) -> Result<Json<ValidateTokenResponse>, ApiError> {
    let token = params.require()?;

    let store = Arc::clone(&state.tokens);
    let ttl = run_blocking(state.config.stores.timeout(), move || {
        session::remaining_ttl(store.as_ref(), &token)
    })
    .await
    .map_err(session_error)?;

    Ok(Json(ValidateTokenResponse {
        remaining_time: u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX),
        valid: true,
    }))
}
