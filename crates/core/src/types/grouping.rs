//! Result tree of a sales analysis.
//!
//! The tree is what the dashboard tables render: one [`GroupingResult`] per
//! node, nested by [`GroupingDimension`], with either price bands or a flat
//! product list at the leaves.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::SupplierId;
use super::metrics::AggregatedMetrics;
use super::record::FlatSalesRecord;

/// A dimension the tree can be grouped by, outer to inner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingDimension {
    /// Family / department code.
    Family,
    /// Supplier.
    Supplier,
    /// Supplier product reference.
    Reference,
    /// Store.
    Store,
}

impl GroupingDimension {
    /// Grouping key of a row for this dimension.
    #[must_use]
    pub fn key(self, record: &FlatSalesRecord) -> String {
        match self {
            Self::Family => record.family.clone(),
            Self::Supplier => record.supplier_id.to_string(),
            Self::Reference => record.product_key(),
            Self::Store => record.store_id.to_string(),
        }
    }

    /// Display label of a row for this dimension.
    #[must_use]
    pub fn label(self, record: &FlatSalesRecord) -> String {
        match self {
            Self::Family => record.family.clone(),
            Self::Supplier => record
                .supplier_name
                .clone()
                .unwrap_or_else(|| record.supplier_id.to_string()),
            Self::Reference => record.reference.clone(),
            Self::Store => record.store_id.to_string(),
        }
    }

    /// The wire name of the dimension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Supplier => "supplier",
            Self::Reference => "reference",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for GroupingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`GroupingDimension`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grouping dimension: {0}")]
pub struct UnknownDimension(pub String);

impl FromStr for GroupingDimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "family" | "department" => Ok(Self::Family),
            "supplier" => Ok(Self::Supplier),
            "reference" => Ok(Self::Reference),
            "store" => Ok(Self::Store),
            other => Err(UnknownDimension(other.to_string())),
        }
    }
}

/// What the innermost grouping level carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafView {
    /// Products split into price bands around the median price.
    #[default]
    Ranges,
    /// A flat product list.
    Products,
}

impl FromStr for LeafView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ranges" => Ok(Self::Ranges),
            "products" => Ok(Self::Products),
            other => Err(format!("unknown leaf view: {other}")),
        }
    }
}

/// One node of the analysis tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingResult {
    /// Position among siblings after ordering.
    pub index: usize,
    /// Grouping key (family code, supplier id, ...).
    pub key: String,
    /// Display name.
    pub label: String,
    #[serde(flatten)]
    pub metrics: AggregatedMetrics,
    pub is_in_pareto: bool,
    #[serde(flatten)]
    pub children: GroupingChildren,
}

/// The content below a node. Exactly one kind is ever present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupingChildren {
    /// Next hierarchy level.
    SubGroupings(Vec<GroupingResult>),
    /// Price-band breakdown of a leaf node.
    Ranges(Vec<GroupingRange>),
    /// Flat product list of a leaf node.
    Products(Vec<GroupingProduct>),
}

/// One price band of a leaf node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingRange {
    /// Inclusive lower bound.
    pub min_price: Decimal,
    /// Exclusive upper bound.
    pub max_price: Decimal,
    #[serde(flatten)]
    pub metrics: AggregatedMetrics,
    /// The band containing the median sale price.
    pub is_median: bool,
    pub products: Vec<GroupingProduct>,
}

/// Per-product metrics at the leaves of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingProduct {
    pub supplier_id: SupplierId,
    pub supplier_name: Option<String>,
    pub reference: String,
    pub image: Option<String>,
    #[serde(flatten)]
    pub metrics: AggregatedMetrics,
    /// Margin over revenue in percent, period N.
    pub margin_rate: Decimal,
    /// Margin over revenue in percent, period N-1.
    #[serde(rename = "marginRateN1")]
    pub margin_rate_n1: Decimal,
    /// Public sale price.
    pub price: Option<Decimal>,
    pub order_quantity: Option<i64>,
    /// Days since the last sale in any store.
    pub last_life_span: Option<i64>,
    pub is_in_pareto: bool,
}

impl GroupingProduct {
    /// Price used for banding; missing prices count as zero.
    #[must_use]
    pub fn band_price(&self) -> Decimal {
        self.price.unwrap_or(Decimal::ZERO).max(Decimal::ZERO)
    }
}

/// Progress of a running analysis, pushed to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_from_str() {
        let parse = |name: &str| name.parse::<GroupingDimension>();
        assert_eq!(parse("family").unwrap(), GroupingDimension::Family);
        assert_eq!(parse(" Supplier ").unwrap(), GroupingDimension::Supplier);
        assert_eq!(parse("department").unwrap(), GroupingDimension::Family);
        assert!(parse("colour").is_err());
    }

    #[test]
    fn test_leaf_view_default_is_ranges() {
        assert_eq!(LeafView::default(), LeafView::Ranges);
        assert_eq!("products".parse::<LeafView>().unwrap(), LeafView::Products);
    }

    #[test]
    fn test_node_serializes_single_children_field() {
        let node = GroupingResult {
            index: 0,
            key: "BAG".to_string(),
            label: "BAG".to_string(),
            metrics: AggregatedMetrics::default(),
            is_in_pareto: false,
            children: GroupingChildren::Products(Vec::new()),
        };

        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("products").is_some());
        assert!(json.get("subGroupings").is_none());
        assert!(json.get("ranges").is_none());
        assert_eq!(json["isInPareto"], false);
        assert_eq!(json["totalSalesN1"], 0);
    }
}
