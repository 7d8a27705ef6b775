//! Source datasets: SurSaUD surveillance rates, IQVIA dose records and
//! national and regional forecast points, plus the CSV readers that
//! materialize them.

pub mod loader;
pub mod types;

pub use types::{
    ALL_AGES, DOSE_VARIABLE, Datasets, DoseRecord, ForecastPoint, RegionalForecastRow,
    SURVEILLANCE_METRICS, SurveillanceRecord, SurveillanceTable,
};
