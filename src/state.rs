use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::email::Mailer;
use crate::services::asset_service::AssetService;
use crate::storage::FileStorage;

/// Shared application state, cloned per request by axum. Every dependency is
/// constructed in `main` and passed in explicitly.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub storage: Arc<dyn FileStorage>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        storage: Arc<dyn FileStorage>,
        mailer: Arc<dyn Mailer>,
        config: AppConfig,
    ) -> Self {
        Self {
            pool,
            storage,
            mailer,
            config: Arc::new(config),
        }
    }

    pub fn assets(&self) -> AssetService {
        AssetService::new(self.storage.clone())
    }
}
