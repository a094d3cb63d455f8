//! Application state shared across handlers

use std::sync::Arc;

use chrono::Duration;
use tracing::error;

use pantry_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Lifetime of issued tokens
    pub token_ttl: Duration,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>, token_ttl: Duration) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret: jwt_secret.into(),
            token_ttl,
        })
    }
}

/// Run blocking store work off the async runtime. Failures are logged with
/// `action` and surface to the caller as [`ApiError::Internal`].
pub(crate) async fn with_db<F, T>(state: &AppState, action: &'static str, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error during {}: {}", action, e);
            ApiError::Internal
        })?
        .map_err(|e| {
            error!("Failed to {}: {:#}", action, e);
            ApiError::Internal
        })
}
