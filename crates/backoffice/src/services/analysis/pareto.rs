//! Pareto (80/20) classification of sibling groups.

use std::collections::BTreeSet;

use rust_decimal::Decimal;

/// Indices of the items forming the Pareto set of `revenues`.
///
/// Items are ranked by revenue, highest first (ties keep input order), and
/// taken until their cumulative revenue reaches `threshold` of the total.
/// The item that crosses the threshold is included. A zero total flags
/// nothing.
///
/// The flagged set only grows as the threshold grows.
#[must_use]
pub fn classify_pareto(revenues: &[Decimal], threshold: Decimal) -> BTreeSet<usize> {
    let total: Decimal = revenues
        .iter()
        .copied()
        .filter(|r| r.is_sign_positive())
        .sum();
    if total <= Decimal::ZERO {
        return BTreeSet::new();
    }

    let mut ranked: Vec<(usize, Decimal)> = revenues.iter().copied().enumerate().collect();
    ranked.sort_by(|(ia, a), (ib, b)| b.cmp(a).then(ia.cmp(ib)));

    let target = threshold * total;
    let mut cumulative = Decimal::ZERO;
    let mut flagged = BTreeSet::new();

    for (index, revenue) in ranked {
        cumulative += revenue.max(Decimal::ZERO);
        flagged.insert(index);
        if cumulative >= target {
            break;
        }
    }

    flagged
}

/// Share of `part` in `total`, zero when the total is zero.
#[must_use]
pub fn revenue_share(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    part / total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(values: &[i64]) -> Vec<Decimal> {
        values.iter().copied().map(Decimal::from).collect()
    }

    fn pct(value: i64) -> Decimal {
        Decimal::new(value, 2)
    }

    #[test]
    fn test_only_top_item_when_it_reaches_threshold() {
        let flagged = classify_pareto(&dec(&[800, 150, 50]), pct(80));
        assert_eq!(flagged, BTreeSet::from([0]));
    }

    #[test]
    fn test_crossing_item_is_included() {
        let flagged = classify_pareto(&dec(&[500, 200, 200, 100]), pct(80));
        assert_eq!(flagged, BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn test_ranks_by_revenue_not_position() {
        let flagged = classify_pareto(&dec(&[50, 150, 800]), pct(80));
        assert_eq!(flagged, BTreeSet::from([2]));
    }

    #[test]
    fn test_zero_total_flags_nothing() {
        assert!(classify_pareto(&dec(&[0, 0, 0]), pct(80)).is_empty());
        assert!(classify_pareto(&[], pct(80)).is_empty());
    }

    #[test]
    fn test_zero_revenue_items_are_never_needed_to_reach_threshold() {
        let flagged = classify_pareto(&dec(&[100, 0, 0]), Decimal::ONE);
        assert_eq!(flagged, BTreeSet::from([0]));
    }

    #[test]
    fn test_ties_keep_input_order() {
        let flagged = classify_pareto(&dec(&[100, 100, 100, 100]), pct(50));
        assert_eq!(flagged, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_monotone_in_threshold() {
        let revenues = dec(&[120, 40, 300, 5, 90, 90, 0, 260, 33]);
        let thresholds: Vec<Decimal> = (1..=100).map(pct).collect();

        for pair in thresholds.windows(2) {
            if let [lower, higher] = pair {
                let small = classify_pareto(&revenues, *lower);
                let large = classify_pareto(&revenues, *higher);
                assert!(small.is_subset(&large), "{lower} vs {higher}");
            }
        }
    }

    #[test]
    fn test_revenue_share_guards_zero_total() {
        let share = revenue_share(Decimal::from(5), Decimal::ZERO);
        assert_eq!(share, Decimal::ZERO);

        let share = revenue_share(Decimal::from(800), Decimal::from(1000));
        assert_eq!(share, pct(80));
    }
}
