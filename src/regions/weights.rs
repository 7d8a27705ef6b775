use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{PipelineError, Result};

/// Maximum distance between the weight sum and 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Approximate population share of each metropolitan region.
///
/// These are static demographic estimates, not measured regional demand.
/// Apportioned values built from them are an approximation.
static DEFAULT_WEIGHTS: &[(&str, f64)] = &[
    ("Île-de-France", 0.18),
    ("Auvergne-Rhône-Alpes", 0.13),
    ("Occitanie", 0.10),
    ("Provence-Alpes-Côte d'Azur", 0.08),
    ("Hauts-de-France", 0.09),
    ("Nouvelle-Aquitaine", 0.09),
    ("Grand Est", 0.08),
    ("Bretagne", 0.05),
    ("Normandie", 0.05),
    ("Pays de la Loire", 0.06),
    ("Centre-Val de Loire", 0.04),
    ("Bourgogne-Franche-Comté", 0.04),
    ("Corse", 0.01),
];

/// One entry of a region weight table, as stored in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionWeight {
    pub region: String,
    pub weight: f64,
}

/// Validated, ordered mapping from region name to demographic share.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionWeights {
    entries: Vec<RegionWeight>,
}

impl RegionWeights {
    /// Builds a table, checking that it is non-empty, has no duplicate
    /// regions, every weight lies in (0, 1] and the weights sum to 1.0.
    pub fn new(entries: Vec<RegionWeight>) -> Result<Self> {
        if entries.is_empty() {
            return Err(PipelineError::InvalidWeight("table is empty".into()));
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.region.as_str()) {
                return Err(PipelineError::InvalidWeight(format!(
                    "duplicate region '{}'",
                    entry.region
                )));
            }
            if !entry.weight.is_finite() || entry.weight <= 0.0 || entry.weight > 1.0 {
                return Err(PipelineError::InvalidWeight(format!(
                    "weight {} for '{}' is outside (0, 1]",
                    entry.weight, entry.region
                )));
            }
        }

        let sum: f64 = entries.iter().map(|e| e.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PipelineError::InvalidWeight(format!(
                "weights sum to {sum}, expected 1.0"
            )));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, region: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.region == region)
            .map(|e| e.weight)
    }

    /// Iterates over `(region, weight)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|e| (e.region.as_str(), e.weight))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }
}

impl Default for RegionWeights {
    fn default() -> Self {
        Self {
            entries: DEFAULT_WEIGHTS
                .iter()
                .map(|(region, weight)| RegionWeight {
                    region: (*region).to_string(),
                    weight: *weight,
                })
                .collect(),
        }
    }
}
