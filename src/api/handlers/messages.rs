use axum::extract::State;
use axum::{Extension, Json};
use std::sync::Arc;

use super::sync_error;
use crate::api::middleware::SessionUser;
use crate::api::response::ApiError;
use crate::storage::run_blocking;
use crate::sync::{self, Partition};
use crate::AppState;

/// `GET /fetch_messages?token=`: the message log split at the caller's watermark.
///
/// The token was resolved by the session middleware; it may expire before
/// the log is read. That window is accepted.
pub async fn fetch_messages(
    State(state): State<Arc<AppState>>,
    Extension(SessionUser(username)): Extension<SessionUser>,
) -> Result<Json<Partition>, ApiError> {
    let log = Arc::clone(&state.log);
    let history = run_blocking(state.config.stores.timeout(), move || {
        sync::fetch_history(log.as_ref(), &username)
    })
    .await
    .map_err(sync_error)?;

    Ok(Json(history))
}
