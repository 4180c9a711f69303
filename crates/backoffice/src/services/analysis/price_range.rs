//! Price bands anchored on the median sale price.
//!
//! Bands have a fixed width and one band boundary sits exactly on the
//! median: boundaries are `0`, `median mod width`, then every `width`.
//! Bounds are lower-inclusive and upper-exclusive, so a price equal to a
//! boundary belongs to the band starting there.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use jewel_ops_core::{AggregatedMetrics, GroupingProduct, GroupingRange};

/// Band count under which no widening is attempted.
const MIN_BAND_CAP: usize = 2;

/// Candidate factors tried before settling for one known to fit.
const MAX_WIDENING_STEPS: usize = 4096;

/// Price bands of a product set and the median they are anchored on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBinning {
    pub ranges: Vec<GroupingRange>,
    pub median: Decimal,
}

/// Median of the positive sale prices; zero if there are none.
///
/// Even counts average the two middle values.
#[must_use]
pub fn median_price(products: &[GroupingProduct]) -> Decimal {
    let mut prices: Vec<Decimal> = products
        .iter()
        .map(GroupingProduct::band_price)
        .filter(|price| *price > Decimal::ZERO)
        .collect();
    if prices.is_empty() {
        return Decimal::ZERO;
    }
    prices.sort_unstable();

    let mid = prices.len() / 2;
    let median = if prices.len() % 2 == 1 {
        prices.get(mid).copied()
    } else {
        prices
            .get(mid.saturating_sub(1))
            .zip(prices.get(mid))
            .map(|(low, high)| (low + high) / Decimal::TWO)
    };
    median.unwrap_or_default().normalize()
}

/// Band layout for one product set.
#[derive(Debug, Clone, Copy)]
struct BandLayout {
    width: Decimal,
    /// First boundary above zero, `median mod width`; zero when the median is
    /// a multiple of the width.
    offset: Decimal,
}

impl BandLayout {
    fn new(median: Decimal, width: Decimal) -> Self {
        Self {
            width,
            offset: median % width,
        }
    }

    fn has_leading_band(&self) -> bool {
        self.offset > Decimal::ZERO
    }

    /// Index of the band containing `price`, saturating at `Decimal::MAX`.
    fn position(&self, price: Decimal) -> Decimal {
        let price = price.max(Decimal::ZERO);
        if self.has_leading_band() && price < self.offset {
            return Decimal::ZERO;
        }
        let steps = (price - self.offset)
            .checked_div(self.width)
            .unwrap_or(Decimal::MAX)
            .floor();
        if self.has_leading_band() {
            steps.checked_add(Decimal::ONE).unwrap_or(Decimal::MAX)
        } else {
            steps
        }
    }

    fn index_of(&self, price: Decimal) -> usize {
        self.position(price).to_usize().unwrap_or(usize::MAX)
    }

    /// `[min, max)` of band `index`.
    fn bounds(&self, index: usize) -> (Decimal, Decimal) {
        if self.has_leading_band() {
            if index == 0 {
                return (Decimal::ZERO, self.offset);
            }
            let min = self.offset + self.width * Decimal::from(index - 1);
            return (min, min + self.width);
        }
        let min = self.width * Decimal::from(index);
        (min, min + self.width)
    }

    fn fits(&self, max_price: Decimal, cap: Decimal) -> bool {
        self.position(max_price) < cap
    }
}

/// Split `products` into contiguous price bands around their median price.
///
/// Bands run from zero to the band holding the highest price; empty bands in
/// between are kept. Products with a missing, zero or negative price land in
/// the lowest band. When more than `max_bands` bands would be needed the
/// width is multiplied by the smallest factor that fits, keeping the median
/// on a boundary.
#[must_use]
pub fn bin_by_price(
    products: Vec<GroupingProduct>,
    band_width: Decimal,
    max_bands: usize,
) -> PriceBinning {
    let median = median_price(&products);
    if products.is_empty() {
        return PriceBinning {
            ranges: Vec::new(),
            median,
        };
    }

    let max_price = products
        .iter()
        .map(GroupingProduct::band_price)
        .max()
        .unwrap_or_default();
    let layout = fit_layout(median, band_width, max_bands, max_price);
    let median_index = layout.index_of(median);
    let last_index = layout.index_of(max_price);

    let band_count = last_index.saturating_add(1);
    let mut members: Vec<Vec<GroupingProduct>> = vec![Vec::new(); band_count];
    for product in products {
        let index = layout.index_of(product.band_price()).min(last_index);
        if let Some(band) = members.get_mut(index) {
            band.push(product);
        }
    }

    let ranges = members
        .into_iter()
        .enumerate()
        .map(|(index, products)| {
            let (min_price, max_price) = layout.bounds(index);
            let metrics: AggregatedMetrics = products.iter().map(|p| p.metrics).sum();
            GroupingRange {
                min_price: min_price.normalize(),
                max_price: max_price.normalize(),
                metrics,
                is_median: index == median_index,
                products,
            }
        })
        .collect();

    PriceBinning { ranges, median }
}

/// Narrowest layout with at most `max_bands` bands.
///
/// Any width above `max_price / (cap - 1)` fits whatever the offset, and no
/// width under `max_price / (cap + 1)` does, so only the factors in between
/// are tried, narrowest first.
fn fit_layout(
    median: Decimal,
    band_width: Decimal,
    max_bands: usize,
    max_price: Decimal,
) -> BandLayout {
    let width = if band_width > Decimal::ZERO {
        band_width
    } else {
        Decimal::ONE
    };
    let cap = Decimal::from(max_bands.max(MIN_BAND_CAP));

    let layout = BandLayout::new(median, width);
    if layout.fits(max_price, cap) {
        return layout;
    }

    let fitting_width = (max_price / (cap - Decimal::ONE))
        .floor()
        .checked_add(Decimal::ONE)
        .unwrap_or(Decimal::MAX);
    let fallback = BandLayout::new(median, fitting_width);

    // Too many bands to count in whole widths
    let Some(span) = max_price.checked_div(width) else {
        return fallback;
    };
    let per_band = (span / (cap - Decimal::ONE)).floor();
    let Some(highest) = per_band.checked_add(Decimal::ONE) else {
        return fallback;
    };
    let lowest = (span / (cap + Decimal::ONE)).ceil().max(Decimal::ONE);

    let mut factor = lowest;
    for _ in 0..MAX_WIDENING_STEPS {
        if factor >= highest {
            break;
        }
        let Some(candidate) = widened(median, width, factor) else {
            break;
        };
        if candidate.fits(max_price, cap) {
            return candidate;
        }
        factor += Decimal::ONE;
    }

    widened(median, width, highest)
        .filter(|layout| layout.fits(max_price, cap))
        .unwrap_or(fallback)
}

fn widened(median: Decimal, width: Decimal, factor: Decimal) -> Option<BandLayout> {
    width
        .checked_mul(factor)
        .map(|wide| BandLayout::new(median, wide))
}
