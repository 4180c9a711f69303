//! Reduction of flat sales rows into per-key metrics.
//!
//! Aggregation is a plain sum per key, so it is associative and
//! commutative: aggregating the parts of any partition of a row set and
//! merging the results gives the same totals as aggregating the whole set.

use std::collections::BTreeMap;

use jewel_ops_core::{AggregatedMetrics, FlatSalesRecord, PeriodMetrics};

/// Sum the metrics of `records` per key extracted by `key_fn`.
pub fn aggregate<'a, I, F>(records: I, key_fn: F) -> BTreeMap<String, PeriodMetrics>
where
    I: IntoIterator<Item = &'a FlatSalesRecord>,
    F: Fn(&FlatSalesRecord) -> String,
{
    let mut totals: BTreeMap<String, PeriodMetrics> = BTreeMap::new();
    for record in records {
        *totals.entry(key_fn(record)).or_default() += PeriodMetrics::from_record(record);
    }
    totals
}

/// Merge the aggregate `other` into `into`.
pub fn merge(into: &mut BTreeMap<String, PeriodMetrics>, other: BTreeMap<String, PeriodMetrics>) {
    for (key, metrics) in other {
        *into.entry(key).or_default() += metrics;
    }
}

/// Join period N and period N-1 aggregates on key.
///
/// A key present in only one period is kept with zero metrics for the
/// other period.
#[must_use]
pub fn compare(
    current: &BTreeMap<String, PeriodMetrics>,
    previous: &BTreeMap<String, PeriodMetrics>,
) -> BTreeMap<String, AggregatedMetrics> {
    let mut joined: BTreeMap<String, AggregatedMetrics> = BTreeMap::new();
    for (key, metrics) in current {
        joined.entry(key.clone()).or_default().current = *metrics;
    }
    for (key, metrics) in previous {
        joined.entry(key.clone()).or_default().previous = *metrics;
    }
    joined
}

/// Split rows into groups by key, preserving the input order within a group.
pub fn partition<'a, I, F>(records: I, key_fn: F) -> BTreeMap<String, Vec<&'a FlatSalesRecord>>
where
    I: IntoIterator<Item = &'a FlatSalesRecord>,
    F: Fn(&FlatSalesRecord) -> String,
{
    let mut groups: BTreeMap<String, Vec<&'a FlatSalesRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(key_fn(record)).or_default().push(record);
    }
    groups
}
