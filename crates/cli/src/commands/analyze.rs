//! Sales analysis command.
//!
//! Runs the same pipeline as `POST /analyze/analyze1` against the ERP
//! database and prints the grouping tree as JSON on stdout. Progress is
//! written to the log.
//!
//! # Environment Variables
//!
//! - `ERP_DATABASE_URL` - ERP `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ANALYSIS_*` - Engine tuning, as for the back-office server

use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use thiserror::Error;

use jewel_ops_backoffice::config::{AnalysisConfig, ConfigError, get_database_url};
use jewel_ops_backoffice::db::{SalesRepository, create_pool};
use jewel_ops_backoffice::services::AnalysisError;
use jewel_ops_backoffice::services::analysis::{AnalysisService, LogProgress};
use jewel_ops_core::{AnalysisRequest, GroupingResult, StoreId, SupplierId};

/// Errors that can occur while running an analysis from the CLI.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// The analysis failed.
    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    /// The result could not be written.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// The result could not be serialized.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Arguments of `jo-cli analyze`.
#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// First day of the period (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day of the period, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,

    /// Store id to include (repeatable, all stores if omitted)
    #[arg(long = "store")]
    pub stores: Vec<i32>,

    /// Supplier id to include (repeatable, all suppliers if omitted)
    #[arg(long = "supplier")]
    pub suppliers: Vec<i32>,

    /// Family code to include (repeatable, all families if omitted)
    #[arg(long = "department")]
    pub departments: Vec<String>,

    /// Grouping dimensions, outer to inner (family, supplier, reference, store)
    #[arg(long, value_delimiter = ',')]
    pub hierarchy: Option<Vec<String>>,

    /// Leaf content: `ranges` or `products`
    #[arg(long)]
    pub leaf: Option<String>,

    /// Cumulative revenue share flagged as Pareto, in (0, 1]
    #[arg(long)]
    pub pareto_threshold: Option<Decimal>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl AnalyzeArgs {
    /// The request the server would receive for these arguments.
    #[must_use]
    pub fn into_request(self) -> AnalysisRequest {
        AnalysisRequest {
            store_ids: self.stores.into_iter().map(StoreId::new).collect(),
            supplier_ids: self.suppliers.into_iter().map(SupplierId::new).collect(),
            departments: self.departments,
            start_date: self.start,
            end_date: self.end,
            hierarchy: self.hierarchy,
            leaf: self.leaf,
            pareto_threshold: self.pareto_threshold,
        }
    }
}

/// Run an analysis and print the tree.
///
/// # Errors
///
/// Returns an error if configuration, the database, the analysis or the
/// output fails. A filter matching no rows prints `[]`.
pub async fn run(args: AnalyzeArgs) -> Result<(), AnalyzeError> {
    dotenvy::dotenv().ok();

    let pretty = args.pretty;
    let request = args.into_request();
    // Reject bad filters before opening a connection
    request.clone().validate().map_err(AnalysisError::from)?;

    let database_url = get_database_url("ERP_DATABASE_URL")?;
    let config = AnalysisConfig::from_env()?;

    tracing::info!("Connecting to ERP database...");
    let pool = create_pool(&database_url).await?;

    let service = AnalysisService::new(SalesRepository::new(pool), config);
    let tree = match service.run(request, Arc::new(LogProgress)).await {
        Ok(tree) => tree,
        Err(AnalysisError::EmptyResult) => {
            tracing::warn!("No sales rows match the filters");
            Vec::new()
        }
        Err(e) => return Err(e.into()),
    };

    write_tree(&mut std::io::stdout().lock(), &tree, pretty)?;
    tracing::info!(groups = tree.len(), "Analysis complete");
    Ok(())
}

fn write_tree<W: Write>(
    out: &mut W,
    tree: &[GroupingResult],
    pretty: bool,
) -> Result<(), AnalyzeError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, tree)?;
    } else {
        serde_json::to_writer(&mut *out, tree)?;
    }
    writeln!(out)?;
    Ok(())
}
