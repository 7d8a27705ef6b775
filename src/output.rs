//! Output formatting and export for regional views.
//!
//! Supports log-based pretty-printing, JSON serialization and CSV export.

use anyhow::Result;
use chrono::NaiveDate;
use csv::Writer;
use std::io::Write;
use tracing::{debug, info};

use crate::pipeline::types::{MapRow, RegionalView};

/// Logs a regional view using Rust's debug pretty-print format.
pub fn print_pretty(view: &RegionalView) {
    debug!("{:#?}", view);
}

/// Logs a regional view as pretty-printed JSON.
pub fn print_json(view: &RegionalView) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(view)?);
    Ok(())
}

/// Export file name for a given day, e.g. `heatmap_vaccination_20260105.csv`.
pub fn default_export_name(day: NaiveDate) -> String {
    format!("heatmap_vaccination_{}.csv", day.format("%Y%m%d"))
}

/// Serializes rows as UTF-8 CSV with a `region,value,region_mapped` header.
pub fn write_rows<W: Write>(writer: W, rows: &[MapRow]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes rows to a CSV file at `path`, replacing any existing file.
pub fn export_csv(path: &str, rows: &[MapRow]) -> Result<()> {
    debug!(path, rows = rows.len(), "Exporting CSV");
    let file = std::fs::File::create(path)?;
    write_rows(file, rows)
}
