//! Per-product, per-store sales rows from the ERP.
//!
//! Queries are built at runtime: the ERP schema is external, so there is no
//! database to verify `query_as!` macros against at compile time.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};

use jewel_ops_core::{
    AnalysisFilters, DateRange, FlatSalesRecord, PeriodRows, StoreId, SupplierId,
};

use super::RepositoryError;
use crate::services::analysis::{DataSourceError, SalesDataSource};

/// One row per product, store and period.
///
/// Sales lines and the closing stock snapshot are joined with a full outer
/// join so that a product with stock but no sale (or the reverse) still
/// yields a row.
const SALES_ROWS_QUERY: &str = r"
WITH sales AS (
    SELECT
        l.store_id,
        l.supplier_id,
        l.reference,
        SUM(l.quantity)::bigint AS units_sold,
        SUM(l.net_amount) AS sale_revenue,
        SUM(l.quantity * l.unit_cost) AS purchase_cost,
        ($2::date - MAX(l.sold_on))::bigint AS last_life_span
    FROM erp.sale_lines l
    WHERE l.sold_on BETWEEN $1 AND $2
      AND (cardinality($3::int[]) = 0 OR l.store_id = ANY($3))
      AND (cardinality($4::int[]) = 0 OR l.supplier_id = ANY($4))
    GROUP BY l.store_id, l.supplier_id, l.reference
),
stock AS (
    SELECT DISTINCT ON (s.store_id, s.supplier_id, s.reference)
        s.store_id,
        s.supplier_id,
        s.reference,
        s.quantity::bigint AS stock,
        s.purchase_value AS stock_purchase_cost
    FROM erp.stock_levels s
    WHERE s.snapshot_date <= $2
      AND (cardinality($3::int[]) = 0 OR s.store_id = ANY($3))
      AND (cardinality($4::int[]) = 0 OR s.supplier_id = ANY($4))
    ORDER BY s.store_id, s.supplier_id, s.reference, s.snapshot_date DESC
)
SELECT
    p.supplier_id,
    sup.name AS supplier_name,
    p.reference,
    p.family,
    COALESCE(sa.store_id, st.store_id) AS store_id,
    COALESCE(sa.units_sold, 0) AS units_sold,
    COALESCE(sa.sale_revenue, 0) AS sale_revenue,
    COALESCE(sa.purchase_cost, 0) AS purchase_cost,
    COALESCE(st.stock, 0) AS stock,
    COALESCE(st.stock_purchase_cost, 0) AS stock_purchase_cost,
    p.public_price,
    p.order_quantity::bigint AS order_quantity,
    sa.last_life_span,
    p.image
FROM sales sa
FULL OUTER JOIN stock st
    ON st.store_id = sa.store_id
   AND st.supplier_id = sa.supplier_id
   AND st.reference = sa.reference
JOIN erp.products p
    ON p.supplier_id = COALESCE(sa.supplier_id, st.supplier_id)
   AND p.reference = COALESCE(sa.reference, st.reference)
LEFT JOIN erp.suppliers sup ON sup.id = p.supplier_id
WHERE (cardinality($5::text[]) = 0 OR p.family = ANY($5))
ORDER BY store_id, p.supplier_id, p.reference
";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for the sales rows query.
#[derive(Debug, sqlx::FromRow)]
struct SalesRow {
    supplier_id: i32,
    supplier_name: Option<String>,
    reference: String,
    family: Option<String>,
    store_id: Option<i32>,
    units_sold: i64,
    sale_revenue: Decimal,
    purchase_cost: Decimal,
    stock: i64,
    stock_purchase_cost: Decimal,
    public_price: Option<Decimal>,
    order_quantity: Option<i64>,
    last_life_span: Option<i64>,
    image: Option<String>,
}

impl TryFrom<SalesRow> for FlatSalesRecord {
    type Error = RepositoryError;

    fn try_from(row: SalesRow) -> Result<Self, Self::Error> {
        let store_id = row.store_id.ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "sales row {}|{} has no store",
                row.supplier_id, row.reference
            ))
        })?;

        Ok(Self {
            supplier_id: SupplierId::new(row.supplier_id),
            supplier_name: row.supplier_name,
            reference: row.reference,
            family: row.family.unwrap_or_default(),
            store_id: StoreId::new(store_id),
            units_sold: row.units_sold,
            sale_revenue: row.sale_revenue,
            purchase_cost: row.purchase_cost,
            stock: row.stock,
            stock_purchase_cost: row.stock_purchase_cost,
            public_price: row.public_price,
            order_quantity: row.order_quantity,
            last_life_span: row.last_life_span,
            image: row.image.filter(|image| !image.is_empty()),
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for ERP sales rows.
#[derive(Clone)]
pub struct SalesRepository {
    pool: PgPool,
}

impl SalesRepository {
    /// Create a new sales repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the rows of one period.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a row cannot be mapped.
    #[instrument(skip(self, filters), fields(start = %period.start, end = %period.end))]
    pub async fn fetch_period(
        &self,
        filters: &AnalysisFilters,
        period: DateRange,
    ) -> Result<Vec<FlatSalesRecord>, RepositoryError> {
        let store_ids: Vec<i32> = filters.store_ids.iter().map(StoreId::as_i32).collect();
        let supplier_ids: Vec<i32> = filters
            .supplier_ids
            .iter()
            .map(SupplierId::as_i32)
            .collect();

        let rows = sqlx::query_as::<_, SalesRow>(SALES_ROWS_QUERY)
            .bind(period.start)
            .bind(period.end)
            .bind(&store_ids)
            .bind(&supplier_ids)
            .bind(&filters.departments)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Fetched sales rows");
        rows.into_iter().map(FlatSalesRecord::try_from).collect()
    }
}

impl SalesDataSource for SalesRepository {
    #[instrument(skip(self, filters))]
    async fn fetch_rows(&self, filters: &AnalysisFilters) -> Result<PeriodRows, DataSourceError> {
        let previous_period = filters
            .previous_period()
            .map_err(|e| DataSourceError::Query(e.to_string()))?;

        let (current, previous) = tokio::try_join!(
            self.fetch_period(filters, filters.period),
            self.fetch_period(filters, previous_period),
        )?;

        debug!(
            days = period_days(filters.period.start, filters.period.end),
            current = current.len(),
            previous = previous.len(),
            "Fetched both periods"
        );
        Ok(PeriodRows { current, previous })
    }
}

/// Number of days covered by an inclusive range.
#[must_use]
pub fn period_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}
