use chrono::Local;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::constants::{BACKUP_EXTENSION, BACKUP_PREFIX, BACKUP_TIMESTAMP_FORMAT, DEFAULT_BACKUP_DIR};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CleanerError, Result};
use crate::types::{ColumnRole, RecordCollection, Transaction};

/// Where a save put its two artifacts
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SaveReport {
    pub output_path: PathBuf,
    pub backup_path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Writes the final collection plus a compressed, timestamped backup
#[derive(Debug, Clone)]
pub struct Persister {
    backup_dir: PathBuf,
}

impl Default for Persister {
    fn default() -> Self {
        Self::new(DEFAULT_BACKUP_DIR)
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Output cells for one row: source columns in order, then revenue.
/// Quantity is written as i32, price and revenue as f32.
fn output_row(record: &Transaction, columns: &[(String, ColumnRole)]) -> Vec<String> {
    let mut row: Vec<String> = columns
        .iter()
        .map(|(_, role)| match role {
            ColumnRole::Quantity => opt(record.quantity),
            ColumnRole::UnitPrice => opt(record.unit_price),
            ColumnRole::CustomerId => opt(record.customer_id),
            ColumnRole::Passthrough(i) => record.fields.get(*i).cloned().unwrap_or_default(),
        })
        .collect();
    row.push(opt(record.revenue.map(|v| v as f32)));
    row
}

fn write_csv<W: Write>(writer: W, records: &RecordCollection) -> Result<W> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(records.schema().output_headers())?;
    let columns = records.schema().columns();
    for record in records.records() {
        csv_writer.write_record(output_row(record, columns))?;
    }
    csv_writer
        .into_inner()
        .map_err(|e| CleanerError::Io(e.into_error()))
}

impl Persister {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// `backup_<YYYYMMDD_HHMMSS>.csv.gz` inside the backup directory
    pub fn backup_path(&self) -> PathBuf {
        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT);
        self.backup_dir
            .join(format!("{BACKUP_PREFIX}{timestamp}.{BACKUP_EXTENSION}"))
    }

    fn write_backup(&self, records: &RecordCollection) -> Result<PathBuf> {
        fs::create_dir_all(&self.backup_dir)?;
        let backup_path = self.backup_path();

        let encoder = GzEncoder::new(BufWriter::new(File::create(&backup_path)?), Compression::default());
        let encoder = write_csv(encoder, records)?;
        encoder.finish()?.flush()?;
        Ok(backup_path)
    }

    fn write_primary(&self, records: &RecordCollection, output_path: &Path) -> Result<()> {
        let writer = write_csv(BufWriter::new(File::create(output_path)?), records)?;
        writer.into_inner().map_err(|e| CleanerError::Io(e.into_error()))?;
        Ok(())
    }

    /// Write the backup first, then the primary output.
    ///
    /// The two writes are independent: a failed primary write leaves the
    /// backup behind.
    #[instrument(skip_all, fields(output = %output_path.display()))]
    pub fn save(
        &self,
        records: &RecordCollection,
        output_path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<SaveReport> {
        info!("Saving cleaned data to {}", output_path.display());

        let backup_path = self.write_backup(records)?;
        self.write_primary(records, output_path)?;

        let rows = records.len();
        let columns = records.schema().column_count() + 1;
        info!("Data saved successfully with shape: ({}, {})", rows, columns);
        diagnostics.record(Diagnostic::BackupWritten {
            path: backup_path.clone(),
        });

        Ok(SaveReport {
            output_path: output_path.to_path_buf(),
            backup_path,
            rows,
            columns,
        })
    }
}
