// Cleaning pipeline: load -> clean -> revenue -> persist

pub mod steps;

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument};

use crate::config::CleanerConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::resources::{memory_diagnostic, ResourceProbe};
use crate::stats::{describe, Summary};
use steps::{Persister, SaveReport};

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub input: PathBuf,
    pub rows_loaded: usize,
    pub rows_final: usize,
    pub save: SaveReport,
    pub summary: Summary,
    pub diagnostics: Vec<Diagnostic>,
    pub duration_secs: f64,
}

pub struct Pipeline {
    config: CleanerConfig,
    persister: Persister,
    resource_probe: Option<Box<dyn ResourceProbe>>,
}

impl Pipeline {
    pub fn new(config: CleanerConfig) -> Self {
        let persister = Persister::new(config.backup_dir.clone());
        Self {
            config,
            persister,
            resource_probe: None,
        }
    }

    /// Ask `probe` for available memory once before loading
    pub fn with_resource_probe(mut self, probe: Box<dyn ResourceProbe>) -> Self {
        self.resource_probe = Some(probe);
        self
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Run every stage in order. Any stage error aborts the run.
    #[instrument(skip_all, fields(input = %self.config.input.display()))]
    pub fn run(&self) -> Result<PipelineResult> {
        self.config.validate()?;
        let started = Instant::now();
        let mut diagnostics = Diagnostics::new();

        if let Some(diagnostic) = self
            .resource_probe
            .as_deref()
            .and_then(memory_diagnostic)
        {
            diagnostics.record(diagnostic);
        }

        let loaded = steps::load(&self.config.input, &mut diagnostics)?;
        let rows_loaded = loaded.len();

        let cleaned = steps::clean(loaded, &self.config.clean_options(), &mut diagnostics);
        let with_revenue = steps::add_revenue(cleaned, &mut diagnostics);
        let save = self
            .persister
            .save(&with_revenue, &self.config.output, &mut diagnostics)?;

        let summary = describe(&with_revenue);
        let duration_secs = started.elapsed().as_secs_f64();
        info!(
            "Pipeline finished: {} rows loaded, {} rows written in {:.2}s",
            rows_loaded,
            with_revenue.len(),
            duration_secs
        );

        Ok(PipelineResult {
            input: self.config.input.clone(),
            rows_loaded,
            rows_final: with_revenue.len(),
            save,
            summary,
            diagnostics: diagnostics.into_events(),
            duration_secs,
        })
    }
}
