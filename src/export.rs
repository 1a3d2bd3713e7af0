//! CSV and JSON writers for harvested records.

use crate::model::JobRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Files written by [`export_records`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub csv: PathBuf,
    pub json: PathBuf,
}

impl ExportPaths {
    /// Derives both paths from `base`, replacing any extension it carries.
    pub fn from_base(base: &Path) -> Self {
        Self {
            csv: base.with_extension("csv"),
            json: base.with_extension("json"),
        }
    }
}

/// Writes `records` as CSV with a header row in [`JobRecord`] field order.
/// Missing optional fields become empty cells.
pub fn export_to_csv(records: &[JobRecord], path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `records` as a pretty-printed JSON array. Missing fields are `null`.
pub fn export_to_json(records: &[JobRecord], path: &Path) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes `<base>.csv` and `<base>.json`.
pub fn export_records(records: &[JobRecord], base: &Path) -> Result<ExportPaths, ExportError> {
    let paths = ExportPaths::from_base(base);
    export_to_csv(records, &paths.csv)?;
    export_to_json(records, &paths.json)?;
    info!(
        count = records.len(),
        csv = %paths.csv.display(),
        json = %paths.json.display(),
        "Exported records"
    );
    Ok(paths)
}
