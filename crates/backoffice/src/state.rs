//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::BackofficeConfig;
use crate::db::SalesRepository;
use crate::services::AnalysisService;

/// Analysis service backed by the ERP database.
pub type ErpAnalysisService = AnalysisService<SalesRepository>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BackofficeConfig,
    pool: PgPool,
    analysis: ErpAnalysisService,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: BackofficeConfig, pool: PgPool) -> Self {
        let analysis = AnalysisService::new(SalesRepository::new(pool.clone()), config.analysis);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                analysis,
            }),
        }
    }

    /// Get a reference to the back-office configuration.
    #[must_use]
    pub fn config(&self) -> &BackofficeConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the sales analysis service.
    #[must_use]
    pub fn analysis(&self) -> &ErpAnalysisService {
        &self.inner.analysis
    }
}
