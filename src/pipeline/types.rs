//! Data types produced by the regional pipeline.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{PipelineError, Result};

/// One region and its value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionValue {
    pub region: String,
    pub value: f64,
}

impl RegionValue {
    pub fn new(region: impl Into<String>, value: f64) -> Self {
        Self {
            region: region.into(),
            value,
        }
    }
}

/// Ordered "value per region" table consumed by every renderer.
///
/// Holds at most one row per region and only finite values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CanonicalRegionTable {
    rows: Vec<RegionValue>,
}

impl CanonicalRegionTable {
    /// Builds a table, dropping rows whose value is NaN or infinite.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateRegion`] if a region appears twice.
    pub fn new(rows: Vec<RegionValue>) -> Result<Self> {
        let mut seen = HashSet::new();
        for row in &rows {
            if !seen.insert(row.region.as_str()) {
                return Err(PipelineError::DuplicateRegion(row.region.clone()));
            }
        }

        Ok(Self {
            rows: rows.into_iter().filter(|r| r.value.is_finite()).collect(),
        })
    }

    pub fn rows(&self) -> &[RegionValue] {
        &self.rows
    }

    pub fn get(&self, region: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.region == region)
            .map(|r| r.value)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.value)
    }
}

/// A canonical row with the geometry join key attached. Also the CSV export row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapRow {
    pub region: String,
    pub value: f64,
    pub region_mapped: String,
}

/// Descriptive aggregates over a table's values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub total: f64,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
}

/// Position of one region within a table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankShare {
    /// Number of regions whose value is at or above this region's.
    pub rank: usize,
    /// Percentage of the table total.
    pub share_pct: f64,
}

/// A forecast point apportioned across regions, bounds included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalForecast {
    pub estimate: CanonicalRegionTable,
    pub lower: CanonicalRegionTable,
    pub upper: CanonicalRegionTable,
}

impl RegionalForecast {
    /// Per-region interval, in estimate row order.
    pub fn bounds(&self) -> Vec<RegionBounds> {
        self.estimate
            .rows()
            .iter()
            .filter_map(|row| {
                Some(RegionBounds {
                    region: row.region.clone(),
                    lower: self.lower.get(&row.region)?,
                    upper: self.upper.get(&row.region)?,
                })
            })
            .collect()
    }
}

/// Forecast interval for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionBounds {
    pub region: String,
    pub lower: f64,
    pub upper: f64,
}

/// One dated national figure behind a view, e.g. a daily dose total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub trend: Option<f64>,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value,
            lower: None,
            upper: None,
            trend: None,
        }
    }
}

/// Everything the presentation layer needs for one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalView {
    pub title: String,
    pub rows: Vec<MapRow>,
    pub summary: Summary,
    pub top: Vec<RegionValue>,
    /// Rows by ascending value, the bar chart order.
    pub bar_order: Vec<RegionValue>,
    /// Apportioned forecast interval; empty unless the selection is a forecast.
    pub bounds: Vec<RegionBounds>,
    /// National series the selection was taken from. Empty for selections
    /// without one.
    pub series: Vec<SeriesPoint>,
}
