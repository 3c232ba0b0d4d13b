use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::storage::run_blocking;
use crate::tokens::session;
use crate::AppState;

/// Start the background expiration cleaner task
pub fn start_expiration_cleaner(state: Arc<AppState>) -> JoinHandle<()> {
    let interval = Duration::from_secs(state.config.tokens.cleanup_interval_seconds);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);

        loop {
            interval_timer.tick().await;
            run_cleanup(&state).await;
        }
    })
}

/// Run one cleanup pass, returning the number of tokens removed
pub async fn run_cleanup(state: &AppState) -> usize {
    debug!("Running expiration cleanup");

    let store = Arc::clone(&state.tokens);
    let result = run_blocking(state.config.stores.timeout(), move || {
        session::cleanup_expired(store.as_ref())
    })
    .await;

    match result {
        Ok(count) => {
            if count > 0 {
                debug!(tokens_cleaned = count, "Expired session tokens cleaned");
            }
            count
        }
        Err(e) => {
            error!(error = %e, "Failed to clean up expired session tokens");
            0
        }
    }
}
