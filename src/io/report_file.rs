//! Read/write report JSON files.
//!
//! The report JSON is the "portable" representation of an assessed batch:
//! - batch header (id, upload time)
//! - cost table and image size used for the run
//! - per-tile details with reference coordinates
//! - the batch summary
//!
//! It is the template context handed to the report renderer. The schema is
//! defined by `domain::ReportFile`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::domain::ReportFile;
use crate::error::AppError;

/// Write a report JSON file.
pub fn write_report_json(path: &Path, report: &ReportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create report JSON '{}': {e}", path.display())))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|e| AppError::new(4, format!("Failed to write report JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to write report JSON: {e}")))?;

    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<ReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: ReportFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}
