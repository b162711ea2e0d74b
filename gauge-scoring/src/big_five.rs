//! Big Five trait aggregation for OVERVIEW results.

use std::collections::BTreeMap;

use gauge_core::BigFiveTrait;

/// Average answered trait item scores (0.0–1.0) into 0–100 trait scores.
///
/// Skipped items (`None`) are left out. Traits with no answered item are
/// absent from the map.
pub fn aggregate<I>(items: I) -> BTreeMap<BigFiveTrait, f64>
where
    I: IntoIterator<Item = (BigFiveTrait, Option<f64>)>,
{
    let mut sums: BTreeMap<BigFiveTrait, (f64, usize)> = BTreeMap::new();
    for (trait_, score) in items {
        if let Some(score) = score {
            let entry = sums.entry(trait_).or_default();
            entry.0 += score;
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(trait_, (sum, n))| (trait_, (sum / n as f64 * 100.0).clamp(0.0, 100.0)))
        .collect()
}
