use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{CanonicalRegionTable, RegionValue};
use crate::pipeline::utility::{nan_mean, nan_sum};
use crate::regions::RegionNormalizer;
use crate::sources::{ALL_AGES, DoseRecord, RegionalForecastRow, SurveillanceTable};

/// Campaign, age group and variable identifying one IQVIA series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoseScope {
    pub campaign: String,
    pub age_group: String,
    pub variable: String,
}

impl DoseScope {
    fn matches(&self, record: &DoseRecord) -> bool {
        record.campaign == self.campaign
            && record.age_group == self.age_group
            && record.variable == self.variable
    }
}

/// Mean of `metric` per region over the all-ages rows of `week`.
///
/// Rows are grouped by their normalized region label, so source labels that
/// alias the same region pool into one mean. Output is in label order. NaN
/// rates are ignored; a region whose rates are all NaN is left out. A region
/// without rows is absent rather than zero.
///
/// # Errors
///
/// - [`PipelineError::MissingColumn`] if `metric` is not a column of the table.
/// - [`PipelineError::EmptyResult`] if no all-ages row exists for `week`, or
///   none of them carries an observed rate.
#[tracing::instrument(
    level = "debug",
    skip(table, normalizer),
    fields(rows = table.records.len())
)]
pub fn surveillance_by_region(
    table: &SurveillanceTable,
    week: &str,
    metric: &str,
    normalizer: &RegionNormalizer,
) -> Result<CanonicalRegionTable> {
    if !table.has_metric(metric) {
        return Err(PipelineError::MissingColumn(metric.to_string()));
    }

    let mut by_region: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in &table.records {
        if record.week != week || record.age_cohort != ALL_AGES {
            continue;
        }
        by_region
            .entry(normalizer.normalize(&record.region))
            .or_default()
            .push(record.metric(metric).unwrap_or(f64::NAN));
    }

    if by_region.is_empty() {
        return Err(PipelineError::EmptyResult(format!(
            "no '{ALL_AGES}' rows for week {week}"
        )));
    }

    let rows: Vec<RegionValue> = by_region
        .into_iter()
        .filter_map(|(region, values)| nan_mean(&values).map(|m| RegionValue::new(region, m)))
        .collect();

    if rows.is_empty() {
        return Err(PipelineError::EmptyResult(format!(
            "{metric} is unobserved for week {week}"
        )));
    }

    debug!(regions = rows.len(), "Surveillance rates aggregated");
    CanonicalRegionTable::new(rows)
}

/// Regional forecast values for `date`, summed per normalized region label.
///
/// NaN estimates are ignored; a region whose estimates are all NaN is left
/// out. Output is in label order.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyResult`] if no row is dated `date` or none
/// of them carries an estimate.
#[tracing::instrument(level = "debug", skip(rows, normalizer), fields(rows = rows.len()))]
pub fn regional_forecast_for_date(
    rows: &[RegionalForecastRow],
    date: NaiveDate,
    normalizer: &RegionNormalizer,
) -> Result<CanonicalRegionTable> {
    let mut by_region: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.date == date) {
        by_region
            .entry(normalizer.normalize(&row.region))
            .or_default()
            .push(row.estimate);
    }

    let rows: Vec<RegionValue> = by_region
        .into_iter()
        .filter(|(_, values)| values.iter().any(|v| !v.is_nan()))
        .map(|(region, values)| RegionValue::new(region, nan_sum(values)))
        .collect();

    if rows.is_empty() {
        return Err(PipelineError::EmptyResult(format!(
            "no regional forecast for {date}"
        )));
    }

    debug!(regions = rows.len(), "Regional forecast selected");
    CanonicalRegionTable::new(rows)
}

/// Total of the matching dose values per date, in date order.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyResult`] if no record matches `scope`.
#[tracing::instrument(level = "debug", skip(records), fields(rows = records.len()))]
pub fn daily_dose_totals(
    records: &[DoseRecord],
    scope: &DoseScope,
) -> Result<BTreeMap<NaiveDate, f64>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for record in records.iter().filter(|r| scope.matches(r)) {
        by_date.entry(record.date).or_default().push(record.value);
    }

    if by_date.is_empty() {
        return Err(PipelineError::EmptyResult(format!(
            "no {} rows for campaign {} and age group {}",
            scope.variable, scope.campaign, scope.age_group
        )));
    }

    Ok(by_date
        .into_iter()
        .map(|(date, values)| (date, nan_sum(values)))
        .collect())
}

/// National dose total for `scope`: the sum of its daily totals.
///
/// Dose data has no regional breakdown; apportion the result to map it.
pub fn national_dose_total(records: &[DoseRecord], scope: &DoseScope) -> Result<f64> {
    let daily = daily_dose_totals(records, scope)?;
    Ok(daily.values().sum())
}
