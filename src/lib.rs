pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod resources;
pub mod stats;
pub mod types;

pub use config::{CleanOptions, CleanerConfig};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CleanerError, Result};
pub use pipeline::steps::{add_revenue, clean, deduplicate, load, Persister, SaveReport};
pub use pipeline::{Pipeline, PipelineResult};
pub use types::{ColumnRole, RecordCollection, Schema, Transaction};
