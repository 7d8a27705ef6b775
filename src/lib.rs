pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod regions;
pub mod sources;

pub use error::PipelineError;
