//! Typed rows of the source datasets.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Age cohort label covering every age in SurSaUD data.
pub const ALL_AGES: &str = "Tous âges";

/// IQVIA variable holding influenza vaccine dose counts.
pub const DOSE_VARIABLE: &str = "DOSES(J07E1)";

/// Surveillance metrics offered by the dashboard.
pub const SURVEILLANCE_METRICS: [&str; 3] = [
    "taux_urgences_grippe",
    "taux_hospitalisations_grippe",
    "taux_sos_medecins_grippe",
];

/// One SurSaUD row: rates for a region, age cohort and week.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveillanceRecord {
    pub region: String,
    pub age_cohort: String,
    pub week: String,
    /// Rate per metric column. NaN when unobserved.
    pub metrics: HashMap<String, f64>,
}

impl SurveillanceRecord {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// SurSaUD rows together with the metric columns of their source schema.
#[derive(Debug, Clone, Default)]
pub struct SurveillanceTable {
    pub metric_names: Vec<String>,
    pub records: Vec<SurveillanceRecord>,
}

impl SurveillanceTable {
    pub fn has_metric(&self, name: &str) -> bool {
        self.metric_names.iter().any(|m| m == name)
    }
}

/// One IQVIA row.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseRecord {
    pub campaign: String,
    pub age_group: String,
    pub date: NaiveDate,
    pub variable: String,
    /// NaN when the source cell is blank.
    pub value: f64,
}

/// One forecast output row, at most one per date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    pub trend: Option<f64>,
}

/// One row of a forecast that was already split by region upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalForecastRow {
    pub date: NaiveDate,
    pub region: String,
    pub estimate: f64,
}

/// Everything the loaders managed to read. A missing dataset stays `None`.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub surveillance: Option<SurveillanceTable>,
    pub doses: Option<Vec<DoseRecord>>,
    pub forecast: Option<Vec<ForecastPoint>>,
    pub regional_forecast: Option<Vec<RegionalForecastRow>>,
}
