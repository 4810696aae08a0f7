//! Structured channel for the advisory events a run produces.
//!
//! Every event is forwarded to `tracing` at its severity and kept in an
//! ordered list, so callers can inspect what happened without scraping logs.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Severity levels for diagnostics
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

/// Something worth reporting that never halts the run
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Resource probe reported enough memory
    MemoryAvailable { available_gb: f64 },
    /// Resource probe reported less memory than the advisory threshold
    LowMemory { available_gb: f64 },
    /// Rows were loaded
    Loaded { rows: usize, columns: usize },
    /// Duplicate rows exist in the freshly loaded data
    DuplicatesDetected { count: usize },
    DuplicatesRemoved { count: usize },
    ZeroPriceRemoved { count: usize },
    UnitPriceCapped { quantile: f64, cap: f32, clipped: usize },
    /// Rows still violating quantity/price rules after cleaning
    InvalidAfterCleaning { count: usize },
    RowsRemoved { count: usize },
    RevenueCapped { cap: f64, clipped: usize },
    NegativeRevenue { count: usize },
    BackupWritten { path: PathBuf },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::LowMemory { .. }
            | Diagnostic::DuplicatesDetected { .. }
            | Diagnostic::InvalidAfterCleaning { .. }
            | Diagnostic::NegativeRevenue { .. } => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MemoryAvailable { available_gb } => {
                write!(f, "Sufficient memory available ({available_gb:.2}GB)")
            }
            Diagnostic::LowMemory { available_gb } => write!(
                f,
                "Very low memory available ({available_gb:.2}GB). Proceeding with caution"
            ),
            Diagnostic::Loaded { rows, columns } => {
                write!(f, "Loaded data with shape: ({rows}, {columns})")
            }
            Diagnostic::DuplicatesDetected { count } => {
                write!(f, "Found {count} duplicate rows; consider deduplication")
            }
            Diagnostic::DuplicatesRemoved { count } => write!(f, "Removed {count} duplicate rows"),
            Diagnostic::ZeroPriceRemoved { count } => {
                write!(f, "Removed {count} rows with zero UnitPrice")
            }
            Diagnostic::UnitPriceCapped {
                quantile,
                cap,
                clipped,
            } => write!(
                f,
                "Capped UnitPrice at {quantile} quantile: {cap} ({clipped} values clipped)"
            ),
            Diagnostic::InvalidAfterCleaning { count } => {
                write!(f, "Invalid data detected post-cleaning in {count} rows")
            }
            Diagnostic::RowsRemoved { count } => write!(f, "Removed {count} rows during cleaning"),
            Diagnostic::RevenueCapped { cap, clipped } => write!(
                f,
                "Capped Revenue at 99th percentile: {cap} ({clipped} values clipped)"
            ),
            Diagnostic::NegativeRevenue { count } => {
                write!(f, "Negative revenue detected in {count} rows")
            }
            Diagnostic::BackupWritten { path } => {
                write!(f, "Backup created at: {}", path.display())
            }
        }
    }
}

/// Ordered sink for the diagnostics of one pipeline invocation
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the event at its severity and keep it
    pub fn record(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Info => info!("{}", diagnostic),
            Severity::Warning => warn!("{}", diagnostic),
        }
        self.events.push(diagnostic);
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.events
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn into_events(self) -> Vec<Diagnostic> {
        self.events
    }
}
