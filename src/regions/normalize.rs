use std::collections::{HashMap, HashSet};

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{CanonicalRegionTable, MapRow};

/// Feature property holding the region name in the regions GeoJSON.
pub const GEO_FEATURE_ID_KEY: &str = "properties.nom";

/// Maps source region labels onto the labels used by the boundary geometry.
///
/// Today both label sets agree, so the default normalizer is the identity.
/// Unknown labels pass through unchanged; a row with such a label still
/// reaches the renderer, which simply has no shape to draw it on.
#[derive(Debug, Clone, Default)]
pub struct RegionNormalizer {
    aliases: HashMap<String, String>,
}

impl RegionNormalizer {
    pub fn identity() -> Self {
        Self::default()
    }

    /// Builds a normalizer from `source label -> geometry label` pairs.
    ///
    /// A target that is itself remapped to a different label is rejected,
    /// which keeps [`normalize`](Self::normalize) idempotent.
    pub fn with_aliases(aliases: HashMap<String, String>) -> Result<Self> {
        let aliases: HashMap<String, String> = aliases
            .into_iter()
            .map(|(from, to)| (from.trim().to_string(), to.trim().to_string()))
            .collect();

        for (from, to) in &aliases {
            if let Some(next) = aliases.get(to) {
                if next != to {
                    return Err(PipelineError::InvalidAlias {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        Ok(Self { aliases })
    }

    pub fn normalize<'a>(&'a self, name: &'a str) -> &'a str {
        let name = name.trim();
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Pairs each row of `table` with its geometry join key.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateRegion`] when two rows land on the
    /// same join key, since the map would draw two values on one shape.
    pub fn attach_join_keys(&self, table: &CanonicalRegionTable) -> Result<Vec<MapRow>> {
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(table.len());
        for row in table.rows() {
            let region_mapped = self.normalize(&row.region).to_string();
            if !seen.insert(region_mapped.clone()) {
                return Err(PipelineError::DuplicateRegion(region_mapped));
            }
            rows.push(MapRow {
                region: row.region.clone(),
                value: row.value,
                region_mapped,
            });
        }
        Ok(rows)
    }
}
