//! Recursive construction of the analysis tree.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::debug;

use jewel_ops_core::{
    FlatSalesRecord, GroupingChildren, GroupingDimension, GroupingResult, LeafView,
};

use super::aggregate::{aggregate, compare, partition};
use super::pareto::{classify_pareto, revenue_share};
use super::price_range::bin_by_price;
use super::products::build_products;
use super::progress::{ProgressReporter, ProgressSink};

/// Knobs of a single tree build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    pub pareto_threshold: Decimal,
    pub leaf: LeafView,
    pub price_band_width: Decimal,
    pub max_price_bands: usize,
    pub progress_interval: usize,
}

/// Build the grouping tree of both periods along `hierarchy`.
///
/// Progress counts products placed at the leaves; the total is known
/// upfront, so the sink sees `0`, intermediate steps, then `(total, total)`.
#[must_use]
pub fn build_tree(
    current: &[FlatSalesRecord],
    previous: &[FlatSalesRecord],
    hierarchy: &[GroupingDimension],
    options: &TreeOptions,
    progress: &dyn ProgressSink,
) -> Vec<GroupingResult> {
    let total = count_leaf_products(current, previous, hierarchy);
    let mut reporter = ProgressReporter::new(progress, total, options.progress_interval);
    reporter.start();

    let current: Vec<&FlatSalesRecord> = current.iter().collect();
    let previous: Vec<&FlatSalesRecord> = previous.iter().collect();
    let tree = build_level(&current, &previous, hierarchy, options, &mut reporter);

    reporter.finish();
    tree
}

/// Number of product lines the tree will carry at its leaves.
#[must_use]
pub fn count_leaf_products(
    current: &[FlatSalesRecord],
    previous: &[FlatSalesRecord],
    hierarchy: &[GroupingDimension],
) -> usize {
    current
        .iter()
        .chain(previous)
        .map(|record| {
            let mut path: Vec<String> = hierarchy.iter().map(|dim| dim.key(record)).collect();
            path.push(record.product_key());
            path
        })
        .collect::<BTreeSet<_>>()
        .len()
}

fn build_level(
    current: &[&FlatSalesRecord],
    previous: &[&FlatSalesRecord],
    hierarchy: &[GroupingDimension],
    options: &TreeOptions,
    reporter: &mut ProgressReporter<'_>,
) -> Vec<GroupingResult> {
    let Some((&dimension, inner)) = hierarchy.split_first() else {
        return Vec::new();
    };
    let key_fn = |record: &FlatSalesRecord| dimension.key(record);

    let metrics = compare(
        &aggregate(current.iter().copied(), key_fn),
        &aggregate(previous.iter().copied(), key_fn),
    );
    let mut current_groups = partition(current.iter().copied(), key_fn);
    let mut previous_groups = partition(previous.iter().copied(), key_fn);

    let mut nodes: Vec<GroupingResult> = metrics
        .into_iter()
        .map(|(key, metrics)| {
            let current_rows = current_groups.remove(&key).unwrap_or_default();
            let previous_rows = previous_groups.remove(&key).unwrap_or_default();
            let label = group_label(dimension, &current_rows, &previous_rows, &key);

            let children = if inner.is_empty() {
                build_leaf(&current_rows, &previous_rows, options, reporter)
            } else {
                GroupingChildren::SubGroupings(build_level(
                    &current_rows,
                    &previous_rows,
                    inner,
                    options,
                    reporter,
                ))
            };

            GroupingResult {
                index: 0,
                key,
                label,
                metrics,
                is_in_pareto: false,
                children,
            }
        })
        .collect();

    nodes.sort_by(|a, b| {
        b.metrics
            .revenue()
            .cmp(&a.metrics.revenue())
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.key.cmp(&b.key))
    });

    let revenues: Vec<Decimal> = nodes.iter().map(|n| n.metrics.revenue()).collect();
    let pareto = classify_pareto(&revenues, options.pareto_threshold);
    for (index, node) in nodes.iter_mut().enumerate() {
        node.index = index;
        node.is_in_pareto = pareto.contains(&index);
    }

    let level_revenue: Decimal = revenues.iter().sum();
    let pareto_revenue: Decimal = pareto.iter().filter_map(|&i| revenues.get(i)).sum();
    debug!(
        dimension = %dimension,
        groups = nodes.len(),
        pareto_groups = pareto.len(),
        pareto_share = %revenue_share(pareto_revenue, level_revenue).round_dp(4),
        "Built grouping level"
    );

    nodes
}

fn build_leaf(
    current: &[&FlatSalesRecord],
    previous: &[&FlatSalesRecord],
    options: &TreeOptions,
    reporter: &mut ProgressReporter<'_>,
) -> GroupingChildren {
    let products = build_products(current, previous, options.pareto_threshold);
    reporter.advance(products.len());

    match options.leaf {
        LeafView::Products => GroupingChildren::Products(products),
        LeafView::Ranges => {
            let binning = bin_by_price(products, options.price_band_width, options.max_price_bands);
            debug!(
                median = %binning.median,
                bands = binning.ranges.len(),
                "Binned leaf products by price"
            );
            GroupingChildren::Ranges(binning.ranges)
        }
    }
}

/// Label of a group: the first row carrying a real name, current period first.
fn group_label(
    dimension: GroupingDimension,
    current: &[&FlatSalesRecord],
    previous: &[&FlatSalesRecord],
    key: &str,
) -> String {
    current
        .iter()
        .chain(previous)
        .map(|record| dimension.label(record))
        .find(|label| label != key)
        .unwrap_or_else(|| key.to_string())
}
