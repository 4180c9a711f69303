//! Flat sales rows as delivered by the ERP.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{StoreId, SupplierId};

/// One product, in one store, over one analysis period.
///
/// Produced by the row fetcher and consumed only by aggregation; never
/// persisted by the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatSalesRecord {
    /// Supplier the product is bought from.
    pub supplier_id: SupplierId,
    /// Supplier display name, when the ERP knows it.
    pub supplier_name: Option<String>,
    /// Supplier product reference.
    pub reference: String,
    /// Family / department code (e.g. `BAG`, `ALL`).
    pub family: String,
    /// Store the row belongs to.
    pub store_id: StoreId,
    /// Units sold over the period.
    pub units_sold: i64,
    /// Sale revenue (excluding tax) over the period.
    pub sale_revenue: Decimal,
    /// Purchase cost of the units sold.
    pub purchase_cost: Decimal,
    /// Units in stock at the end of the period.
    pub stock: i64,
    /// Purchase cost of the units in stock.
    pub stock_purchase_cost: Decimal,
    /// Public (catalog) sale price.
    pub public_price: Option<Decimal>,
    /// Supplier order quantity for the product.
    pub order_quantity: Option<i64>,
    /// Days since the product last sold in this store.
    pub last_life_span: Option<i64>,
    /// Product image reference.
    pub image: Option<String>,
}

impl FlatSalesRecord {
    /// Key identifying the product across stores (`supplier|reference`).
    #[must_use]
    pub fn product_key(&self) -> String {
        format!("{}|{}", self.supplier_id, self.reference)
    }
}

/// Rows for the analysed period (N) and the comparable prior period (N-1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodRows {
    /// Rows of period N.
    pub current: Vec<FlatSalesRecord>,
    /// Rows of period N-1.
    pub previous: Vec<FlatSalesRecord>,
}

impl PeriodRows {
    /// True when neither period returned a single row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.previous.is_empty()
    }

    /// Total number of rows across both periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.current.len() + self.previous.len()
    }
}
