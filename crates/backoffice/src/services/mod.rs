//! Business logic services for the back office.
//!
//! # Services
//!
//! - `analysis` - Sales analysis engine (grouping tree, Pareto, price bands)

pub mod analysis;

pub use analysis::{AnalysisError, AnalysisService, DataSourceError, SalesDataSource};
