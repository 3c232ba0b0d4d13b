use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::require_session;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Token-protected routes -- the token is resolved before the handler runs
    let session_routes = Router::new()
        .route("/fetch_messages", get(handlers::fetch_messages))
        .route("/online_users", get(handlers::online_users))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ));

    let public_routes = Router::new()
        .route("/", get(handlers::status_page))
        .route("/auth", post(handlers::authenticate))
        .route("/health", get(handlers::health))
        .route("/validate_token", get(handlers::validate_token));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
