//! Analysis request filters and their validation.
//!
//! Validation is isolated from persistence: a request is turned into an
//! [`AnalysisQuery`] before anything touches the ERP.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::grouping::{GroupingDimension, LeafView};
use super::id::{StoreId, SupplierId};

/// Maximum number of hierarchy levels accepted in one request.
pub const MAX_HIERARCHY_DEPTH: usize = 4;

/// Hierarchy used when the request does not name one.
pub const DEFAULT_HIERARCHY: [GroupingDimension; 2] =
    [GroupingDimension::Family, GroupingDimension::Supplier];

/// Reasons an analysis request is rejected before any fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("startDate {start} is after endDate {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
    #[error("date {0} cannot be shifted back one year")]
    DateOutOfRange(NaiveDate),
    #[error("department codes must not be blank")]
    BlankDepartment,
    #[error("unknown grouping dimension: {0}")]
    UnknownDimension(String),
    #[error("grouping dimension {0} appears more than once")]
    DuplicateDimension(GroupingDimension),
    #[error("hierarchy must have between 1 and 4 levels (got {0})")]
    HierarchyDepth(usize),
    #[error("unknown leaf view: {0}")]
    UnknownLeaf(String),
    #[error("paretoThreshold must be in (0, 1] (got {0})")]
    ParetoThreshold(Decimal),
}

/// Body of `POST /analyze/analyze1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub store_ids: Vec<StoreId>,
    #[serde(default)]
    pub supplier_ids: Vec<SupplierId>,
    #[serde(default)]
    pub departments: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Grouping dimensions, outer to inner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<Vec<String>>,
    /// `ranges` or `products`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pareto_threshold: Option<Decimal>,
}

/// An inclusive calendar span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The same span shifted back exactly one year.
    ///
    /// February 29th maps to February 28th.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::DateOutOfRange` if a bound cannot be represented.
    pub fn previous_year(&self) -> Result<Self, FilterError> {
        let shift = |date: NaiveDate| {
            date.checked_sub_months(Months::new(12))
                .ok_or(FilterError::DateOutOfRange(date))
        };
        Ok(Self {
            start: shift(self.start)?,
            end: shift(self.end)?,
        })
    }
}

/// Row filters. Empty lists mean "no filter on that dimension".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisFilters {
    pub store_ids: Vec<StoreId>,
    pub supplier_ids: Vec<SupplierId>,
    pub departments: Vec<String>,
    pub period: DateRange,
}

impl AnalysisFilters {
    /// Period N-1.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::DateOutOfRange` if the shifted span is not
    /// representable.
    pub fn previous_period(&self) -> Result<DateRange, FilterError> {
        self.period.previous_year()
    }
}

/// A validated request, ready for the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisQuery {
    pub filters: AnalysisFilters,
    pub hierarchy: Vec<GroupingDimension>,
    pub leaf: LeafView,
    pub pareto_threshold: Option<Decimal>,
}

impl AnalysisRequest {
    /// Validate and normalize the request.
    ///
    /// Ids are sorted and de-duplicated and department codes trimmed, so two
    /// equivalent requests produce the same query.
    ///
    /// # Errors
    ///
    /// Returns a `FilterError` describing the first problem found.
    pub fn validate(self) -> Result<AnalysisQuery, FilterError> {
        if self.start_date > self.end_date {
            return Err(FilterError::InvertedDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        let period = DateRange {
            start: self.start_date,
            end: self.end_date,
        };
        period.previous_year()?;

        let mut departments = Vec::with_capacity(self.departments.len());
        for department in &self.departments {
            let code = department.trim();
            if code.is_empty() {
                return Err(FilterError::BlankDepartment);
            }
            departments.push(code.to_string());
        }
        departments.sort();
        departments.dedup();

        let mut store_ids = self.store_ids;
        store_ids.sort();
        store_ids.dedup();
        let mut supplier_ids = self.supplier_ids;
        supplier_ids.sort();
        supplier_ids.dedup();

        let hierarchy = match self.hierarchy {
            Some(names) => parse_hierarchy(&names)?,
            None => DEFAULT_HIERARCHY.to_vec(),
        };

        let leaf = match self.leaf {
            Some(name) => name.parse().map_err(|_| FilterError::UnknownLeaf(name))?,
            None => LeafView::default(),
        };

        if let Some(threshold) = self.pareto_threshold {
            validate_pareto_threshold(threshold)?;
        }

        Ok(AnalysisQuery {
            filters: AnalysisFilters {
                store_ids,
                supplier_ids,
                departments,
                period,
            },
            hierarchy,
            leaf,
            pareto_threshold: self.pareto_threshold,
        })
    }
}

/// Check a Pareto threshold lies in `(0, 1]`.
///
/// # Errors
///
/// Returns `FilterError::ParetoThreshold` otherwise.
pub fn validate_pareto_threshold(threshold: Decimal) -> Result<(), FilterError> {
    if threshold <= Decimal::ZERO || threshold > Decimal::ONE {
        return Err(FilterError::ParetoThreshold(threshold));
    }
    Ok(())
}

fn parse_hierarchy(names: &[String]) -> Result<Vec<GroupingDimension>, FilterError> {
    if names.is_empty() || names.len() > MAX_HIERARCHY_DEPTH {
        return Err(FilterError::HierarchyDepth(names.len()));
    }

    let mut hierarchy: Vec<GroupingDimension> = Vec::with_capacity(names.len());
    for name in names {
        let dimension: GroupingDimension = name
            .parse()
            .map_err(|_| FilterError::UnknownDimension(name.clone()))?;
        if hierarchy.contains(&dimension) {
            return Err(FilterError::DuplicateDimension(dimension));
        }
        hierarchy.push(dimension);
    }
    Ok(hierarchy)
}
