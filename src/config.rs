use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::regions::{RegionNormalizer, RegionWeight, RegionWeights};

/// Region policy loaded from a JSON file.
///
/// Both keys are optional; a missing key keeps the built-in default:
/// ```json
/// {
///   "weights": [
///     { "region": "Île-de-France", "weight": 0.18 },
///     { "region": "Corse", "weight": 0.01 }
///   ],
///   "aliases": { "Ile-de-France": "Île-de-France" }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct RegionConfig {
    #[serde(default)]
    weights: Option<Vec<RegionWeight>>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

impl RegionConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read region config {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Validated weight table, or the built-in one when none is configured.
    pub fn weights(&self) -> Result<RegionWeights> {
        match &self.weights {
            Some(entries) => Ok(RegionWeights::new(entries.clone())?),
            None => Ok(RegionWeights::default()),
        }
    }

    pub fn normalizer(&self) -> Result<RegionNormalizer> {
        Ok(RegionNormalizer::with_aliases(self.aliases.clone())?)
    }
}
