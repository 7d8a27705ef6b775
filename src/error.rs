//! Error kinds returned by the regional pipeline.

use thiserror::Error;

/// Failures surfaced to the presentation layer.
///
/// The pipeline is all-or-nothing: any of these aborts the current
/// selection and no partial table is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A filter matched zero rows. Shown to the user as "no data for this selection".
    #[error("no data for selection: {0}")]
    EmptyResult(String),

    /// An input table lacks a column the pipeline needs.
    #[error("missing column '{0}'")]
    MissingColumn(String),

    /// A region lookup referenced a name absent from the table.
    #[error("region not found: {0}")]
    RegionNotFound(String),

    /// A table was built with the same region twice.
    #[error("region '{0}' appears more than once")]
    DuplicateRegion(String),

    /// The region weight table broke one of its invariants.
    #[error("invalid region weights: {0}")]
    InvalidWeight(String),

    /// A region alias points at a label that is itself remapped.
    #[error("alias '{from}' -> '{to}' targets a label that is aliased again")]
    InvalidAlias { from: String, to: String },

    /// The dataset backing a selection was not loaded.
    #[error("{0} data is not available")]
    SourceUnavailable(&'static str),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
