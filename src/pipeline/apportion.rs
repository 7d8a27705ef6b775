//! Distribution of national figures across regions by demographic weight.
//!
//! Forecasts and IQVIA dose counts are national. The per-region values
//! produced here are estimates from static population shares, not
//! regional measurements.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{CanonicalRegionTable, RegionValue, RegionalForecast};
use crate::regions::RegionWeights;
use crate::sources::ForecastPoint;

/// Splits `value` across every region of `weights` as `value × weight`.
///
/// Rows follow the weight table order and every region is present. Zero and
/// negative values are passed through unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyResult`] if `value` is NaN or infinite.
pub fn apportion(value: f64, weights: &RegionWeights) -> Result<CanonicalRegionTable> {
    if !value.is_finite() {
        return Err(PipelineError::EmptyResult(format!(
            "national value {value} is not a number"
        )));
    }

    let rows = weights
        .iter()
        .map(|(region, weight)| RegionValue::new(region, value * weight))
        .collect();

    debug!(value, regions = weights.len(), "Apportioned national value");
    CanonicalRegionTable::new(rows)
}

/// Returns the forecast point dated `date`.
pub fn forecast_for_date(points: &[ForecastPoint], date: NaiveDate) -> Result<&ForecastPoint> {
    points
        .iter()
        .find(|p| p.date == date)
        .ok_or_else(|| PipelineError::EmptyResult(format!("no forecast for {date}")))
}

/// Apportions a forecast point's estimate and both of its bounds.
pub fn apportion_forecast(
    point: &ForecastPoint,
    weights: &RegionWeights,
) -> Result<RegionalForecast> {
    Ok(RegionalForecast {
        estimate: apportion(point.estimate, weights)?,
        lower: apportion(point.lower, weights)?,
        upper: apportion(point.upper, weights)?,
    })
}
