mod auth;
mod messages;
mod presence;
mod sessions;
mod status;

use serde::Deserialize;

use crate::api::response::ApiError;
use crate::credentials::CredentialError;
use crate::presence::PresenceError;
use crate::storage::StoreError;
use crate::sync::SyncError;
use crate::tokens::session::SessionError;

pub use auth::{authenticate, LoginForm, LoginResponse};
pub use messages::fetch_messages;
pub use presence::online_users;
pub use sessions::{validate_token, ValidateTokenResponse};
pub use status::{health, status_page, HealthResponse};

/// `?token=` query parameter shared by the token-authenticated routes
#[derive(Debug, Deserialize)]
pub struct TokenParams {
    #[serde(default)]
    pub token: Option<String>,
}

impl TokenParams {
    pub fn require(self) -> Result<String, ApiError> {
        match self.token {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => {
                tracing::debug!("Token not provided");
                Err(ApiError::bad_request("Token not provided"))
            }
        }
    }
}

// ============================================================================
// Error mapping
// ============================================================================

/// Map a durable-store failure, keeping malformed records distinguishable
fn store_error(e: StoreError, context: &str) -> ApiError {
    match e {
        StoreError::Decode(_) => {
            tracing::error!(error = %e, "{context}: malformed stored record");
            ApiError::internal("Failed to decode stored data")
        }
        _ => {
            tracing::error!(error = %e, "{context}: durable store unavailable");
            ApiError::internal(context.to_string())
        }
    }
}

pub(crate) fn session_error(e: SessionError) -> ApiError {
    match e {
        SessionError::InvalidToken => {
            tracing::info!("Invalid or expired token");
            ApiError::unauthorized("Invalid token")
        }
        SessionError::StoreUnavailable(e) => {
            tracing::error!(error = %e, "Ephemeral store failure");
            ApiError::internal("Failed to validate token")
        }
    }
}

fn credential_error(e: CredentialError) -> ApiError {
    match e {
        CredentialError::InvalidCredentials => {
            ApiError::unauthorized("Invalid username or password")
        }
        CredentialError::PersistenceUnavailable(e) => store_error(e, "Failed to authenticate"),
        CredentialError::Hashing(msg) => {
            tracing::error!(error = %msg, "Password hashing failed");
            ApiError::internal("Failed to authenticate")
        }
    }
}

fn presence_error(e: PresenceError) -> ApiError {
    match e {
        PresenceError::NotFound(username) => {
            tracing::info!(username = %username, "No last_seen record");
            ApiError::not_found("No last_seen data found for the user")
        }
        PresenceError::NotNumeric { status, username } => {
            tracing::info!(username = %username, status = %status, "last_seen is not a timestamp");
            ApiError::unauthorized("No last_seen timestamp available for the user")
        }
        PresenceError::PersistenceUnavailable(e) => store_error(e, "Failed to query presence"),
    }
}

fn sync_error(e: SyncError) -> ApiError {
    match e {
        SyncError::Watermark(e) => presence_error(e),
        SyncError::PersistenceUnavailable(e) => store_error(e, "Failed to query messages"),
    }
}
