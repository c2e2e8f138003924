//! Shared handler state

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::error::TrackerResult;
use crate::storage::Storage;

use super::error::{ApiError, ApiResult};

/// Storage and settings shared by every request
#[derive(Clone)]
pub struct AppState {
    storage: Arc<Storage>,
    settings: Arc<Settings>,
}

impl AppState {
    pub fn new(storage: Storage, settings: Settings) -> Self {
        Self {
            storage: Arc::new(storage),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run blocking database work off the async runtime
    pub async fn run<T, F>(&self, work: F) -> ApiResult<T>
    where
        F: FnOnce(&Storage, &Settings) -> TrackerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        let settings = Arc::clone(&self.settings);
        tokio::task::spawn_blocking(move || work(&storage, &settings))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
    }
}
