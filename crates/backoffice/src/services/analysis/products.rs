//! Leaf-level product lines.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use jewel_ops_core::{
    AggregatedMetrics, FlatSalesRecord, GroupingProduct, PeriodMetrics, StoreId, SupplierId,
};

use super::pareto::classify_pareto;

/// Running totals and attributes of one product across its store rows.
struct ProductAccumulator {
    supplier_id: SupplierId,
    supplier_name: Option<String>,
    reference: String,
    current: PeriodMetrics,
    previous: PeriodMetrics,
    price: Option<Decimal>,
    order_quantity: Option<i64>,
    last_life_span: Option<i64>,
    image: Option<(StoreId, String)>,
}

impl ProductAccumulator {
    fn new(record: &FlatSalesRecord) -> Self {
        Self {
            supplier_id: record.supplier_id,
            supplier_name: record.supplier_name.clone(),
            reference: record.reference.clone(),
            current: PeriodMetrics::default(),
            previous: PeriodMetrics::default(),
            price: None,
            order_quantity: None,
            last_life_span: None,
            image: None,
        }
    }

    fn absorb_attributes(&mut self, record: &FlatSalesRecord) {
        if self.supplier_name.is_none() {
            self.supplier_name.clone_from(&record.supplier_name);
        }
        self.price = max_option(self.price, record.public_price);
        self.order_quantity = max_option(self.order_quantity, record.order_quantity);

        if let Some(image) = record.image.as_ref().filter(|i| !i.is_empty()) {
            let replace = self
                .image
                .as_ref()
                .is_none_or(|(store_id, _)| record.store_id < *store_id);
            if replace {
                self.image = Some((record.store_id, image.clone()));
            }
        }
    }

    fn into_product(self) -> GroupingProduct {
        GroupingProduct {
            supplier_id: self.supplier_id,
            supplier_name: self.supplier_name,
            reference: self.reference,
            image: self.image.map(|(_, image)| image),
            metrics: AggregatedMetrics::new(self.current, self.previous),
            margin_rate: self.current.margin_rate(),
            margin_rate_n1: self.previous.margin_rate(),
            price: self.price,
            order_quantity: self.order_quantity,
            last_life_span: self.last_life_span,
            is_in_pareto: false,
        }
    }
}

fn max_option<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn min_option<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Build the product lines of one leaf group.
///
/// Rows are merged per `supplier|reference`. Products are ordered by
/// period N revenue, highest first, then by supplier and reference, and
/// the Pareto flag is set over the whole list.
#[must_use]
pub fn build_products(
    current: &[&FlatSalesRecord],
    previous: &[&FlatSalesRecord],
    pareto_threshold: Decimal,
) -> Vec<GroupingProduct> {
    let mut products: BTreeMap<String, ProductAccumulator> = BTreeMap::new();

    for record in current {
        let product = products
            .entry(record.product_key())
            .or_insert_with(|| ProductAccumulator::new(record));
        product.current += PeriodMetrics::from_record(record);
        product.last_life_span = min_option(product.last_life_span, record.last_life_span);
        product.absorb_attributes(record);
    }
    for record in previous {
        let product = products
            .entry(record.product_key())
            .or_insert_with(|| ProductAccumulator::new(record));
        product.previous += PeriodMetrics::from_record(record);
        product.absorb_attributes(record);
    }

    let mut lines: Vec<GroupingProduct> = products
        .into_values()
        .map(ProductAccumulator::into_product)
        .collect();
    lines.sort_by(|a, b| {
        b.metrics
            .revenue()
            .cmp(&a.metrics.revenue())
            .then_with(|| a.supplier_id.cmp(&b.supplier_id))
            .then_with(|| a.reference.cmp(&b.reference))
    });

    let revenues: Vec<Decimal> = lines.iter().map(|p| p.metrics.revenue()).collect();
    let pareto = classify_pareto(&revenues, pareto_threshold);
    for (index, line) in lines.iter_mut().enumerate() {
        line.is_in_pareto = pareto.contains(&index);
    }

    lines
}
