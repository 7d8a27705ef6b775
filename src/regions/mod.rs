//! The spatial unit of analysis: the 13 metropolitan French regions.
//!
//! [`RegionWeights`] holds the demographic shares used to apportion national
//! figures. [`RegionNormalizer`] maps source labels onto the labels of the
//! boundary geometry.

mod normalize;
mod weights;

pub use normalize::{GEO_FEATURE_ID_KEY, RegionNormalizer};
pub use weights::{RegionWeight, RegionWeights, WEIGHT_SUM_TOLERANCE};

/// Region names as spelled in the regions GeoJSON (`properties.nom`).
pub const CANONICAL_REGIONS: [&str; 13] = [
    "Île-de-France",
    "Auvergne-Rhône-Alpes",
    "Occitanie",
    "Provence-Alpes-Côte d'Azur",
    "Hauts-de-France",
    "Nouvelle-Aquitaine",
    "Grand Est",
    "Bretagne",
    "Normandie",
    "Pays de la Loire",
    "Centre-Val de Loire",
    "Bourgogne-Franche-Comté",
    "Corse",
];

pub fn is_canonical(name: &str) -> bool {
    CANONICAL_REGIONS.contains(&name)
}
