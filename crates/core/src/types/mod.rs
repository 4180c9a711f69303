//! Core types for the Jewel Ops back office.
//!
//! This module provides type-safe wrappers for ERP entities and the value
//! types of the sales analysis.

pub mod filters;
pub mod grouping;
pub mod id;
pub mod metrics;
pub mod record;

pub use filters::{
    AnalysisFilters, AnalysisQuery, AnalysisRequest, DEFAULT_HIERARCHY, DateRange, FilterError,
    MAX_HIERARCHY_DEPTH, validate_pareto_threshold,
};
pub use grouping::{
    GroupingChildren, GroupingDimension, GroupingProduct, GroupingRange, GroupingResult,
    LeafView, ProgressEvent, UnknownDimension,
};
pub use id::*;
pub use metrics::{AggregatedMetrics, MetricsDifference, PeriodMetrics, margin_rate};
pub use record::{FlatSalesRecord, PeriodRows};
