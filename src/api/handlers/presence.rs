use axum::extract::State;
use axum::{Extension, Json};
use std::sync::Arc;

use super::presence_error;
use crate::api::middleware::SessionUser;
use crate::api::response::ApiError;
use crate::presence;
use crate::storage::run_blocking;
use crate::AppState;

/// `GET /online_users?token=`: usernames currently marked online
pub async fn online_users(
    State(state): State<Arc<AppState>>,
    Extension(SessionUser(username)): Extension<SessionUser>,
) -> Result<Json<Vec<String>>, ApiError> {
    let log = Arc::clone(&state.log);
    let online = run_blocking(state.config.stores.timeout(), move || {
        presence::list_online(log.as_ref())
    })
    .await
    .map_err(presence_error)?;

    tracing::debug!(requested_by = %username, count = online.len(), "Listed online users");
    Ok(Json(online))
}
