//! CSV readers for the cleaned SurSaUD, IQVIA and forecast exports.
//!
//! Each reader checks the header row against the column contract before
//! reading any data, so a schema change upstream fails fast with
//! [`PipelineError::MissingColumn`] instead of producing a half-read table.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::StringRecord;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::sources::types::{
    Datasets, DoseRecord, ForecastPoint, RegionalForecastRow, SurveillanceRecord,
    SurveillanceTable,
};

pub const SURVEILLANCE_FILE: &str = "cleaned/sursaud_regional_cleaned.csv";
pub const DOSES_FILE: &str = "cleaned/iqvia_doses_cleaned.csv";
pub const FORECAST_FILE: &str = "processed/predictions_2026_2027.csv";
pub const REGIONAL_FORECAST_FILE: &str = "processed/predictions_regionales_from_national.csv";

const SURVEILLANCE_KEYS: [&str; 3] = ["region", "classe_age", "semaine"];
const DOSE_COLUMNS: [&str; 5] = ["campagne", "groupe_age", "date", "variable", "valeur"];
const FORECAST_COLUMNS: [&str; 4] = ["ds", "yhat", "yhat_lower", "yhat_upper"];
const REGIONAL_FORECAST_COLUMNS: [&str; 3] = ["ds", "region", "yhat"];

#[derive(Debug, Deserialize)]
struct RawDoseRow {
    campagne: String,
    groupe_age: String,
    date: String,
    variable: String,
    valeur: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawForecastRow {
    ds: String,
    yhat: Option<String>,
    yhat_lower: Option<String>,
    yhat_upper: Option<String>,
    #[serde(default)]
    trend: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRegionalForecastRow {
    ds: String,
    region: String,
    yhat: Option<String>,
}

/// Loads every dataset found under `data_dir`.
///
/// A dataset that cannot be read is logged and left out; the selection that
/// needs it then fails with [`PipelineError::SourceUnavailable`].
pub fn load_all(data_dir: &Path) -> Datasets {
    let surveillance = match load_surveillance_file(&data_dir.join(SURVEILLANCE_FILE)) {
        Ok(table) => Some(table),
        Err(e) => {
            warn!(error = %e, "SurSaUD data unavailable");
            None
        }
    };
    let doses = match load_doses_file(&data_dir.join(DOSES_FILE)) {
        Ok(rows) => Some(rows),
        Err(e) => {
            warn!(error = %e, "IQVIA data unavailable");
            None
        }
    };
    let forecast = match load_forecast_file(&data_dir.join(FORECAST_FILE)) {
        Ok(points) => Some(points),
        Err(e) => {
            warn!(error = %e, "Forecast data unavailable");
            None
        }
    };
    let regional_forecast =
        match load_regional_forecast_file(&data_dir.join(REGIONAL_FORECAST_FILE)) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(error = %e, "Regional forecast data unavailable");
                None
            }
        };

    Datasets {
        surveillance,
        doses,
        forecast,
        regional_forecast,
    }
}

pub fn load_surveillance_file(path: &Path) -> Result<SurveillanceTable> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let table = load_surveillance(file)?;
    info!(path = %path.display(), rows = table.records.len(), "Loaded SurSaUD data");
    Ok(table)
}

/// Reads SurSaUD rows. Every `taux_*` column is treated as a rate metric.
pub fn load_surveillance<R: Read>(reader: R) -> Result<SurveillanceTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    require_columns(&headers, &SURVEILLANCE_KEYS)?;

    let region_idx = column_index(&headers, "region")?;
    let cohort_idx = column_index(&headers, "classe_age")?;
    let week_idx = column_index(&headers, "semaine")?;

    let metric_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.starts_with("taux_"))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let metrics: HashMap<String, f64> = metric_columns
            .iter()
            .map(|(i, name)| (name.clone(), parse_value(row.get(*i))))
            .collect();

        records.push(SurveillanceRecord {
            region: field(&row, region_idx).to_string(),
            age_cohort: field(&row, cohort_idx).to_string(),
            week: field(&row, week_idx).to_string(),
            metrics,
        });
    }

    debug!(
        rows = records.len(),
        metrics = metric_columns.len(),
        "Parsed SurSaUD rows"
    );

    Ok(SurveillanceTable {
        metric_names: metric_columns.into_iter().map(|(_, name)| name).collect(),
        records,
    })
}

pub fn load_doses_file(path: &Path) -> Result<Vec<DoseRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let rows = load_doses(file)?;
    info!(path = %path.display(), rows = rows.len(), "Loaded IQVIA data");
    Ok(rows)
}

/// Reads IQVIA rows. Rows with an unparseable date are skipped.
pub fn load_doses<R: Read>(reader: R) -> Result<Vec<DoseRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    require_columns(rdr.headers()?, &DOSE_COLUMNS)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize() {
        let raw: RawDoseRow = result?;
        let Some(date) = parse_date(&raw.date) else {
            skipped += 1;
            continue;
        };
        rows.push(DoseRecord {
            campaign: raw.campagne.trim().to_string(),
            age_group: raw.groupe_age.trim().to_string(),
            date,
            variable: raw.variable.trim().to_string(),
            value: parse_value(raw.valeur.as_deref()),
        });
    }

    if skipped > 0 {
        warn!(skipped, "Skipped IQVIA rows with invalid dates");
    }
    Ok(rows)
}

pub fn load_forecast_file(path: &Path) -> Result<Vec<ForecastPoint>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let points = load_forecast(file)?;
    info!(path = %path.display(), points = points.len(), "Loaded forecast data");
    Ok(points)
}

/// Reads forecast points sorted by date.
///
/// # Errors
///
/// Fails on a missing column or when two rows share a date.
pub fn load_forecast<R: Read>(reader: R) -> Result<Vec<ForecastPoint>> {
    let mut rdr = csv::Reader::from_reader(reader);
    require_columns(rdr.headers()?, &FORECAST_COLUMNS)?;

    let mut points = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize() {
        let raw: RawForecastRow = result?;
        let Some(date) = parse_date(&raw.ds) else {
            skipped += 1;
            continue;
        };
        let trend = raw
            .trend
            .as_deref()
            .map(|t| parse_value(Some(t)))
            .filter(|t| !t.is_nan());
        points.push(ForecastPoint {
            date,
            estimate: parse_value(raw.yhat.as_deref()),
            lower: parse_value(raw.yhat_lower.as_deref()),
            upper: parse_value(raw.yhat_upper.as_deref()),
            trend,
        });
    }

    if skipped > 0 {
        warn!(skipped, "Skipped forecast rows with invalid dates");
    }

    points.sort_by_key(|p| p.date);
    if let Some(pair) = points.windows(2).find(|w| w[0].date == w[1].date) {
        anyhow::bail!("forecast has more than one row for {}", pair[0].date);
    }

    Ok(points)
}

pub fn load_regional_forecast_file(path: &Path) -> Result<Vec<RegionalForecastRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let rows = load_regional_forecast(file)?;
    info!(path = %path.display(), rows = rows.len(), "Loaded regional forecast data");
    Ok(rows)
}

/// Reads a forecast already split by region (`ds`, `region`, `yhat`).
///
/// Rows with an unparseable date are skipped. Rows come back sorted by
/// date, keeping file order within a date.
pub fn load_regional_forecast<R: Read>(reader: R) -> Result<Vec<RegionalForecastRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    require_columns(rdr.headers()?, &REGIONAL_FORECAST_COLUMNS)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize() {
        let raw: RawRegionalForecastRow = result?;
        let Some(date) = parse_date(&raw.ds) else {
            skipped += 1;
            continue;
        };
        rows.push(RegionalForecastRow {
            date,
            region: raw.region.trim().to_string(),
            estimate: parse_value(raw.yhat.as_deref()),
        });
    }

    if skipped > 0 {
        warn!(skipped, "Skipped regional forecast rows with invalid dates");
    }

    rows.sort_by_key(|r| r.date);
    Ok(rows)
}

fn require_columns(headers: &StringRecord, required: &[&str]) -> Result<(), PipelineError> {
    for name in required {
        if !headers.iter().any(|h| h == *name) {
            return Err(PipelineError::MissingColumn((*name).to_string()));
        }
    }
    Ok(())
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, PipelineError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
}

fn field(row: &StringRecord, idx: usize) -> &str {
    row.get(idx).unwrap_or("").trim()
}

/// Parses a numeric cell; blank or non-numeric cells become NaN.
fn parse_value(s: Option<&str>) -> f64 {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
