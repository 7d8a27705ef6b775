use std::cmp::Ordering;

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{CanonicalRegionTable, RankShare, RegionValue, Summary};
use crate::pipeline::utility::pct;

/// Total, mean, max and min of the table's values.
pub fn summarize(table: &CanonicalRegionTable) -> Result<Summary> {
    if table.is_empty() {
        return Err(PipelineError::EmptyResult("table has no rows".into()));
    }

    let total: f64 = table.values().sum();
    let max = table.values().fold(f64::NEG_INFINITY, f64::max);
    let min = table.values().fold(f64::INFINITY, f64::min);

    Ok(Summary {
        total,
        mean: total / table.len() as f64,
        max,
        min,
    })
}

/// The `n` rows with the greatest values, largest first.
///
/// Ties keep their table order. `n` larger than the table returns every row.
pub fn top_n(table: &CanonicalRegionTable, n: usize) -> Vec<RegionValue> {
    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    rows.truncate(n);
    rows
}

/// Rows ordered by ascending value, as drawn in the horizontal bar chart.
pub fn sorted_ascending(table: &CanonicalRegionTable) -> Vec<RegionValue> {
    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));
    rows
}

/// Rank and percentage share of `region`.
///
/// The rank counts every region whose value is at or above this one, so
/// tied regions share the larger count. The share is 0.0 when the table
/// total is zero.
pub fn rank_and_share(table: &CanonicalRegionTable, region: &str) -> Result<RankShare> {
    let value = table
        .get(region)
        .ok_or_else(|| PipelineError::RegionNotFound(region.to_string()))?;

    let rank = table.values().filter(|v| *v >= value).count();
    let total: f64 = table.values().sum();

    Ok(RankShare {
        rank,
        share_pct: pct(value, total),
    })
}
