//! Sales analysis engine ("analyze1").
//!
//! Turns flat per-product, per-store rows for a period and the same period
//! one year earlier into a grouping tree:
//!
//! ```text
//! fetch rows (N, N-1)  ->  aggregate per level  ->  order + Pareto  ->  leaves
//!                                                                    (products or price bands)
//! ```
//!
//! The tree build is CPU-bound and runs on the blocking pool; progress is
//! pushed through a [`ProgressSink`] while it runs.

pub mod aggregate;
pub mod pareto;
pub mod price_range;
pub mod products;
pub mod progress;
pub mod tree;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, instrument, warn};

use jewel_ops_core::{
    AnalysisFilters, AnalysisQuery, AnalysisRequest, FilterError, GroupingResult, PeriodRows,
};

use crate::config::AnalysisConfig;
use crate::db::RepositoryError;

pub use progress::{LogProgress, NoProgress, ProgressReporter, ProgressSink};
pub use tree::{TreeOptions, build_tree};

// =============================================================================
// Errors
// =============================================================================

/// Failure to obtain rows from the ERP.
#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    /// The ERP database could not be reached.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// The ERP answered with an error or unreadable rows.
    #[error("data source query failed: {0}")]
    Query(String),
}

impl From<RepositoryError> for DataSourceError {
    fn from(err: RepositoryError) -> Self {
        match &err {
            RepositoryError::Database(
                sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_),
            ) => Self::Unavailable(err.to_string()),
            _ => Self::Query(err.to_string()),
        }
    }
}

/// Errors from running an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The request was rejected before any fetch.
    #[error("invalid request: {0}")]
    Validation(#[from] FilterError),

    /// Rows could not be fetched.
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    /// Neither period has a single row for the filters.
    #[error("no sales data for the requested filters")]
    EmptyResult,

    /// The tree build task failed.
    #[error("analysis failed: {0}")]
    Internal(String),
}

// =============================================================================
// Data Source
// =============================================================================

/// Source of flat sales rows for both periods of an analysis.
pub trait SalesDataSource: Send + Sync {
    /// Fetch the rows of period N and period N-1 matching `filters`.
    fn fetch_rows(
        &self,
        filters: &AnalysisFilters,
    ) -> impl Future<Output = Result<PeriodRows, DataSourceError>> + Send;
}

// =============================================================================
// Service
// =============================================================================

/// Runs analyses against a data source.
#[derive(Clone)]
pub struct AnalysisService<S> {
    source: S,
    config: AnalysisConfig,
}

impl<S: SalesDataSource> AnalysisService<S> {
    /// Create a new analysis service.
    #[must_use]
    pub const fn new(source: S, config: AnalysisConfig) -> Self {
        Self { source, config }
    }

    /// Validate `request` and build its grouping tree.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Validation` before any fetch when the request
    /// is invalid, and see [`Self::assemble`] for the rest.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Vec<GroupingResult>, AnalysisError> {
        let query = request.validate()?;
        self.assemble(&query, progress).await
    }

    /// Fetch the rows of `query` and build the grouping tree.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::DataSource` if rows cannot be fetched,
    /// `AnalysisError::EmptyResult` if neither period has rows, or
    /// `AnalysisError::Internal` if the build task panics.
    #[instrument(
        skip(self, query, progress),
        fields(
            start = %query.filters.period.start,
            end = %query.filters.period.end,
            levels = query.hierarchy.len(),
        )
    )]
    pub async fn assemble(
        &self,
        query: &AnalysisQuery,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Vec<GroupingResult>, AnalysisError> {
        let started = Instant::now();

        let rows = self
            .source
            .fetch_rows(&query.filters)
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to fetch sales rows"))?;
        if rows.is_empty() {
            info!("No sales rows for filters");
            return Err(AnalysisError::EmptyResult);
        }
        let row_count = rows.len();

        let options = TreeOptions {
            pareto_threshold: query
                .pareto_threshold
                .unwrap_or(self.config.pareto_threshold),
            leaf: query.leaf,
            price_band_width: self.config.price_band_width,
            max_price_bands: self.config.max_price_bands,
            progress_interval: self.config.progress_interval,
        };
        let hierarchy = query.hierarchy.clone();

        let tree = tokio::task::spawn_blocking(move || {
            build_tree(
                &rows.current,
                &rows.previous,
                &hierarchy,
                &options,
                progress.as_ref(),
            )
        })
        .await
        .map_err(|e| AnalysisError::Internal(e.to_string()))?;

        info!(
            rows = row_count,
            groups = tree.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        Ok(tree)
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use jewel_ops_core::{GroupingChildren, StoreId};

    use super::progress::tests::RecordingProgress;
    use super::test_support::{StaticSource, record};
    use super::*;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            store_ids: vec![StoreId::new(1)],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            ..AnalysisRequest::default()
        }
    }

    fn rows() -> PeriodRows {
        PeriodRows {
            current: vec![
                record("BAG", 1, "A", 1, 2, 800, 300),
                record("BAG", 2, "B", 1, 1, 150, 50),
                record("RING", 3, "C", 1, 1, 50, 10),
            ],
            previous: vec![record("BAG", 1, "A", 1, 1, 500, 200)],
        }
    }

    fn service(result: Result<PeriodRows, DataSourceError>) -> AnalysisService<StaticSource> {
        AnalysisService::new(StaticSource::new(result), AnalysisConfig::default())
    }

    #[tokio::test]
    async fn test_invalid_request_never_fetches() {
        let service = service(Ok(rows()));
        let mut bad = request();
        bad.end_date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();

        let result = service.run(bad, Arc::new(NoProgress)).await;
        assert!(matches!(result, Err(AnalysisError::Validation(_))));
        assert_eq!(service.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_rows_is_empty_result() {
        let service = service(Ok(PeriodRows::default()));
        let result = service.run(request(), Arc::new(NoProgress)).await;
        assert!(matches!(result, Err(AnalysisError::EmptyResult)));
    }

    #[tokio::test]
    async fn test_source_failure_is_propagated() {
        let service = service(Err(DataSourceError::Unavailable("down".to_string())));
        let result = service.run(request(), Arc::new(NoProgress)).await;
        assert!(matches!(
            result,
            Err(AnalysisError::DataSource(DataSourceError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_default_hierarchy_family_then_supplier() {
        let service = service(Ok(rows()));
        let tree = service.run(request(), Arc::new(NoProgress)).await.unwrap();

        let keys: Vec<&str> = tree.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["BAG", "RING"]);
        let GroupingChildren::SubGroupings(suppliers) = &tree[0].children else {
            panic!("expected supplier level");
        };
        assert_eq!(suppliers.len(), 2);
        assert!(matches!(suppliers[0].children, GroupingChildren::Ranges(_)));
    }

    #[tokio::test]
    async fn test_progress_ends_at_total() {
        let service = service(Ok(rows()));
        let sink = Arc::new(RecordingProgress::default());
        service.run(request(), sink.clone()).await.unwrap();

        let events = sink.events();
        let last = events.last().unwrap();
        assert_eq!(last.current, last.total);
        assert_eq!(last.total, 3);
    }

    #[tokio::test]
    async fn test_request_threshold_overrides_config() {
        let service = service(Ok(rows()));
        let mut all = request();
        all.pareto_threshold = Some(Decimal::ONE);
        all.hierarchy = Some(vec!["family".to_string()]);

        let tree = service.run(all, Arc::new(NoProgress)).await.unwrap();
        assert!(tree.iter().all(|n| n.is_in_pareto));

        let tree = service
            .run(
                AnalysisRequest {
                    hierarchy: Some(vec!["family".to_string()]),
                    ..request()
                },
                Arc::new(NoProgress),
            )
            .await
            .unwrap();
        let flags: Vec<bool> = tree.iter().map(|n| n.is_in_pareto).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        let err = DataSourceError::from(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        assert!(matches!(err, DataSourceError::Unavailable(_)));

        let err = DataSourceError::from(RepositoryError::DataCorruption("bad".to_string()));
        assert!(matches!(err, DataSourceError::Query(_)));
    }
}
