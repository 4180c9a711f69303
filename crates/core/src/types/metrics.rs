//! Summable sales metrics and their period-over-period comparison.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::Serialize;

use super::record::FlatSalesRecord;

/// Figures for a single period, summed over any number of rows.
///
/// All fields are sums, so combining partial aggregates in any order yields
/// the same totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodMetrics {
    /// Units sold.
    pub total_sales: i64,
    /// Sale revenue.
    pub total_sales_revenue: Decimal,
    /// Revenue minus purchase cost.
    pub total_sales_margin: Decimal,
    /// Units in stock.
    pub stock: i64,
    /// Purchase cost of the stock.
    pub stock_purchase_price: Decimal,
}

impl PeriodMetrics {
    /// Metrics contributed by a single row.
    ///
    /// Negative ERP figures (returns, stock corrections) are clamped to zero
    /// and the margin is floored at zero, so aggregates are never negative.
    #[must_use]
    pub fn from_record(record: &FlatSalesRecord) -> Self {
        let revenue = record.sale_revenue.max(Decimal::ZERO);
        let cost = record.purchase_cost.max(Decimal::ZERO);

        Self {
            total_sales: record.units_sold.max(0),
            total_sales_revenue: revenue,
            total_sales_margin: (revenue - cost).max(Decimal::ZERO),
            stock: record.stock.max(0),
            stock_purchase_price: record.stock_purchase_cost.max(Decimal::ZERO),
        }
    }

    /// Margin as a percentage of revenue.
    #[must_use]
    pub fn margin_rate(&self) -> Decimal {
        margin_rate(self.total_sales_margin, self.total_sales_revenue)
    }
}

impl Add for PeriodMetrics {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for PeriodMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.total_sales += rhs.total_sales;
        self.total_sales_revenue += rhs.total_sales_revenue;
        self.total_sales_margin += rhs.total_sales_margin;
        self.stock += rhs.stock;
        self.stock_purchase_price += rhs.stock_purchase_price;
    }
}

impl Sum for PeriodMetrics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Self> for PeriodMetrics {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Margin rate in percent, rounded to two decimals.
///
/// Resolves to zero when revenue is zero.
#[must_use]
pub fn margin_rate(margin: Decimal, revenue: Decimal) -> Decimal {
    if revenue.is_zero() {
        return Decimal::ZERO;
    }
    (margin / revenue * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Period N metrics next to period N-1 metrics.
///
/// The difference fields exist only in the serialized form and are always
/// derived from the two periods, so `difference == current - previous`
/// holds by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(into = "AggregatedMetricsBody")]
pub struct AggregatedMetrics {
    /// Period N.
    pub current: PeriodMetrics,
    /// Period N-1.
    pub previous: PeriodMetrics,
}

impl AggregatedMetrics {
    /// Pair the two periods.
    #[must_use]
    pub const fn new(current: PeriodMetrics, previous: PeriodMetrics) -> Self {
        Self { current, previous }
    }

    /// Signed N minus N-1 for every field.
    #[must_use]
    pub fn difference(&self) -> MetricsDifference {
        MetricsDifference {
            total_sales: self.current.total_sales - self.previous.total_sales,
            total_sales_revenue: self.current.total_sales_revenue
                - self.previous.total_sales_revenue,
            total_sales_margin: self.current.total_sales_margin - self.previous.total_sales_margin,
            stock: self.current.stock - self.previous.stock,
            stock_purchase_price: self.current.stock_purchase_price
                - self.previous.stock_purchase_price,
        }
    }

    /// Revenue of period N, the figure every ordering and classification uses.
    #[must_use]
    pub const fn revenue(&self) -> Decimal {
        self.current.total_sales_revenue
    }
}

impl Add for AggregatedMetrics {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            current: self.current + rhs.current,
            previous: self.previous + rhs.previous,
        }
    }
}

impl AddAssign for AggregatedMetrics {
    fn add_assign(&mut self, rhs: Self) {
        self.current += rhs.current;
        self.previous += rhs.previous;
    }
}

impl Sum for AggregatedMetrics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Signed differences between period N and period N-1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsDifference {
    pub total_sales: i64,
    pub total_sales_revenue: Decimal,
    pub total_sales_margin: Decimal,
    pub stock: i64,
    pub stock_purchase_price: Decimal,
}

/// Flat wire shape of [`AggregatedMetrics`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AggregatedMetricsBody {
    total_sales: i64,
    total_sales_revenue: Decimal,
    total_sales_margin: Decimal,
    stock: i64,
    stock_purchase_price: Decimal,
    #[serde(rename = "totalSalesN1")]
    total_sales_n1: i64,
    #[serde(rename = "totalSalesRevenueN1")]
    total_sales_revenue_n1: Decimal,
    #[serde(rename = "totalSalesMarginN1")]
    total_sales_margin_n1: Decimal,
    #[serde(rename = "stockN1")]
    stock_n1: i64,
    #[serde(rename = "stockPurchasePriceN1")]
    stock_purchase_price_n1: Decimal,
    #[serde(rename = "totalSalesDifferenceN1")]
    total_sales_difference_n1: i64,
    #[serde(rename = "totalSalesRevenueDifferenceN1")]
    total_sales_revenue_difference_n1: Decimal,
    #[serde(rename = "totalSalesMarginDifferenceN1")]
    total_sales_margin_difference_n1: Decimal,
    #[serde(rename = "stockDifferenceN1")]
    stock_difference_n1: i64,
    #[serde(rename = "stockPurchasePriceDifferenceN1")]
    stock_purchase_price_difference_n1: Decimal,
}

impl From<AggregatedMetrics> for AggregatedMetricsBody {
    fn from(metrics: AggregatedMetrics) -> Self {
        let AggregatedMetrics { current, previous } = metrics;
        let diff = metrics.difference();

        Self {
            total_sales: current.total_sales,
            total_sales_revenue: current.total_sales_revenue,
            total_sales_margin: current.total_sales_margin,
            stock: current.stock,
            stock_purchase_price: current.stock_purchase_price,
            total_sales_n1: previous.total_sales,
            total_sales_revenue_n1: previous.total_sales_revenue,
            total_sales_margin_n1: previous.total_sales_margin,
            stock_n1: previous.stock,
            stock_purchase_price_n1: previous.stock_purchase_price,
            total_sales_difference_n1: diff.total_sales,
            total_sales_revenue_difference_n1: diff.total_sales_revenue,
            total_sales_margin_difference_n1: diff.total_sales_margin,
            stock_difference_n1: diff.stock,
            stock_purchase_price_difference_n1: diff.stock_purchase_price,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::id::{StoreId, SupplierId};

    fn record(units: i64, revenue: i64, cost: i64) -> FlatSalesRecord {
        FlatSalesRecord {
            supplier_id: SupplierId::new(1),
            supplier_name: None,
            reference: "R1".to_string(),
            family: "BAG".to_string(),
            store_id: StoreId::new(1),
            units_sold: units,
            sale_revenue: Decimal::from(revenue),
            purchase_cost: Decimal::from(cost),
            stock: 3,
            stock_purchase_cost: Decimal::from(30),
            public_price: None,
            order_quantity: None,
            last_life_span: None,
            image: None,
        }
    }

    #[test]
    fn test_from_record_computes_margin() {
        let metrics = PeriodMetrics::from_record(&record(2, 500, 200));
        assert_eq!(metrics.total_sales, 2);
        assert_eq!(metrics.total_sales_revenue, Decimal::from(500));
        assert_eq!(metrics.total_sales_margin, Decimal::from(300));
        assert_eq!(metrics.stock, 3);
    }

    #[test]
    fn test_from_record_clamps_negative_figures() {
        let metrics = PeriodMetrics::from_record(&record(-1, -50, 20));
        assert_eq!(metrics.total_sales, 0);
        assert_eq!(metrics.total_sales_revenue, Decimal::ZERO);
        assert_eq!(metrics.total_sales_margin, Decimal::ZERO);
    }

    #[test]
    fn test_margin_rate_zero_revenue_is_zero() {
        assert_eq!(margin_rate(Decimal::from(10), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(PeriodMetrics::default().margin_rate(), Decimal::ZERO);
    }

    #[test]
    fn test_margin_rate_rounds_to_two_places() {
        let rate = margin_rate(Decimal::from(1), Decimal::from(3));
        assert_eq!(rate, Decimal::new(3333, 2));
    }

    #[test]
    fn test_serialized_differences_match_periods() {
        let current = PeriodMetrics::from_record(&record(5, 500, 200));
        let metrics = AggregatedMetrics::new(current, PeriodMetrics::default());
        let json = serde_json::to_value(metrics).unwrap();

        assert_eq!(json["totalSales"], 5);
        assert_eq!(json["totalSalesN1"], 0);
        assert_eq!(json["totalSalesDifferenceN1"], 5);
        assert_eq!(json["totalSalesRevenueDifferenceN1"], "500");
        assert_eq!(json["stockDifferenceN1"], 3);
    }

    #[test]
    fn test_sum_of_aggregates() {
        let sold_now = PeriodMetrics::from_record(&record(1, 100, 40));
        let sold_before = PeriodMetrics::from_record(&record(2, 50, 10));
        let a = AggregatedMetrics::new(sold_now, PeriodMetrics::default());
        let b = AggregatedMetrics::new(PeriodMetrics::default(), sold_before);
        let total: AggregatedMetrics = [a, b].into_iter().sum();

        assert_eq!(total.current.total_sales, 1);
        assert_eq!(total.previous.total_sales, 2);
        assert_eq!(total.difference().total_sales_revenue, Decimal::from(50));
    }
}
