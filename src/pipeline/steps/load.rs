use calamine::{open_workbook_auto, Data, Reader, Sheets};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::constants::{CSV_EXTENSION, SPREADSHEET_EXTENSIONS};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CleanerError, Result};
use crate::types::{ColumnRole, RecordCollection, Schema, Transaction};

/// A cell as read from the source, before coercion
#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
}

impl From<&Data> for RawCell {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => RawCell::Empty,
            Data::String(s) if s.is_empty() => RawCell::Empty,
            Data::String(s) => RawCell::Text(s.clone()),
            Data::Float(n) => RawCell::Number(*n),
            Data::Int(n) => RawCell::Int(*n),
            Data::Bool(b) => RawCell::Bool(*b),
            Data::Error(e) => RawCell::Text(e.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => RawCell::Text(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
                None => RawCell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        }
    }
}

impl RawCell {
    fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text form used for headers and passthrough columns
    fn render(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.clone(),
            // Integers without decimals
            RawCell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            RawCell::Number(n) => format!("{}", n),
            RawCell::Int(n) => format!("{}", n),
            RawCell::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }

    /// Numeric value; `Ok(None)` for empty cells and NaN
    fn to_f64(&self) -> std::result::Result<Option<f64>, ()> {
        let value = match self {
            RawCell::Empty => return Ok(None),
            RawCell::Number(n) => *n,
            RawCell::Int(n) => *n as f64,
            RawCell::Text(s) if s.trim().is_empty() => return Ok(None),
            RawCell::Text(s) => s.trim().parse::<f64>().map_err(|_| ())?,
            RawCell::Bool(_) => return Err(()),
        };
        Ok((!value.is_nan()).then_some(value))
    }
}

/// Context for coercion errors
struct CellRef<'a> {
    row: usize,
    column: &'a str,
}

impl CellRef<'_> {
    fn invalid(&self, cell: &RawCell) -> CleanerError {
        CleanerError::InvalidValue {
            row: self.row,
            column: self.column.to_string(),
            value: cell.render(),
        }
    }
}

fn coerce_quantity(cell: &RawCell, at: &CellRef<'_>) -> Result<Option<i32>> {
    if let RawCell::Int(n) = cell {
        return i32::try_from(*n).map(Some).map_err(|_| at.invalid(cell));
    }
    match cell.to_f64().map_err(|_| at.invalid(cell))? {
        None => Ok(None),
        Some(v) if v.fract() == 0.0 && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) => {
            Ok(Some(v as i32))
        }
        Some(_) => Err(at.invalid(cell)),
    }
}

fn coerce_unit_price(cell: &RawCell, at: &CellRef<'_>) -> Result<Option<f32>> {
    let value = cell.to_f64().map_err(|_| at.invalid(cell))?;
    Ok(value.map(|v| v as f32))
}

fn coerce_customer_id(cell: &RawCell) -> Option<f64> {
    cell.to_f64().ok().flatten()
}

fn read_spreadsheet(path: &Path) -> Result<Vec<Vec<RawCell>>> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| {
        CleanerError::Spreadsheet(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let sheet_name = workbook.sheet_names().first().cloned().ok_or_else(|| {
        CleanerError::Spreadsheet(format!("{} contains no sheets", path.display()))
    })?;
    debug!("Reading worksheet '{}'", sheet_name);

    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        CleanerError::Spreadsheet(format!("Failed to read sheet '{}': {}", sheet_name, e))
    })?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(RawCell::from).collect())
        .collect())
}

fn read_csv(path: &Path) -> Result<Vec<Vec<RawCell>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        RawCell::Empty
                    } else {
                        RawCell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }
    Ok(rows)
}

fn read_rows(path: &Path) -> Result<Vec<Vec<RawCell>>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        read_spreadsheet(path)
    } else if extension == CSV_EXTENSION {
        read_csv(path)
    } else {
        Err(CleanerError::UnsupportedFormat(path.to_path_buf()))
    }
}

/// Turn raw rows (header first) into typed records
fn build_collection(path: &Path, rows: Vec<Vec<RawCell>>) -> Result<RecordCollection> {
    let mut rows = rows.into_iter();
    let header: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(RawCell::render).collect(),
        None => return Err(CleanerError::EmptyDataset(path.to_path_buf())),
    };
    let schema = Schema::from_header(&header)?;

    let empty = RawCell::Empty;
    let mut records = Vec::new();
    for (index, row) in rows.enumerate() {
        if row.iter().all(RawCell::is_empty) {
            continue;
        }

        // Header is source row 1
        let source_row = index + 2;
        let mut record = Transaction {
            fields: vec![String::new(); schema.passthrough_count()],
            ..Transaction::default()
        };

        for (position, (name, role)) in schema.columns().iter().enumerate() {
            let cell = row.get(position).unwrap_or(&empty);
            let at = CellRef {
                row: source_row,
                column: name,
            };
            match role {
                ColumnRole::Quantity => record.quantity = coerce_quantity(cell, &at)?,
                ColumnRole::UnitPrice => record.unit_price = coerce_unit_price(cell, &at)?,
                ColumnRole::CustomerId => record.customer_id = coerce_customer_id(cell),
                ColumnRole::Passthrough(i) => record.fields[*i] = cell.render(),
            }
        }
        records.push(record);
    }

    Ok(RecordCollection::new(schema, records))
}

/// Load a transaction file into a record collection.
///
/// Spreadsheets (`xlsx`, `xls`, `ods`, ...) use their first worksheet; `csv`
/// files are read as-is. The first row is the header.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load(path: &Path, diagnostics: &mut Diagnostics) -> Result<RecordCollection> {
    info!("Loading data from {}", path.display());
    if !path.exists() {
        return Err(CleanerError::NotFound(path.to_path_buf()));
    }

    let rows = read_rows(path)?;
    let collection = build_collection(path, rows)?;

    let (rows, columns) = collection.shape();
    diagnostics.record(Diagnostic::Loaded { rows, columns });
    if collection.is_empty() {
        return Err(CleanerError::EmptyDataset(path.to_path_buf()));
    }

    let duplicates = collection.duplicate_count();
    if duplicates > 0 {
        diagnostics.record(Diagnostic::DuplicatesDetected { count: duplicates });
    }

    Ok(collection)
}
