use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use retail_cleaner::constants::DEFAULT_LOG_DIR;
use retail_cleaner::logging;
use retail_cleaner::resources::SystemMemoryProbe;
use retail_cleaner::stats::describe;
use retail_cleaner::{load, CleanerConfig, Diagnostics, Pipeline};

#[derive(Parser)]
#[command(name = "retail_cleaner")]
#[command(about = "Clean retail transaction data and derive revenue")]
#[command(version = "0.1.0")]
struct Cli {
    /// Directory for data_cleanup.log (overrides the config file)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, clean, derive revenue and save with a backup
    Run {
        /// TOML config file; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        /// Input spreadsheet or CSV
        #[arg(long)]
        input: Option<PathBuf>,
        /// Output CSV path
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory for compressed backups
        #[arg(long)]
        backup_dir: Option<PathBuf>,
        /// Keep rows with a zero unit price
        #[arg(long)]
        keep_zero_price: bool,
        /// Skip deduplication
        #[arg(long)]
        no_dedup: bool,
        /// Quantile in (0, 1) used to cap unit prices
        #[arg(long)]
        outlier_cap: Option<f64>,
        /// Skip the available-memory check
        #[arg(long)]
        skip_resource_check: bool,
        /// Print the run report as JSON instead of the summary table
        #[arg(long)]
        json: bool,
    },
    /// Load a file and print descriptive statistics without cleaning it
    Describe {
        /// Spreadsheet or CSV to summarise
        path: PathBuf,
    },
}

/// Config file (or defaults) with command-line overrides applied
fn resolve_config(command: &Commands) -> anyhow::Result<CleanerConfig> {
    let Commands::Run {
        config,
        input,
        output,
        backup_dir,
        keep_zero_price,
        no_dedup,
        outlier_cap,
        ..
    } = command
    else {
        return Ok(CleanerConfig::default());
    };

    let mut resolved = match config {
        Some(path) => CleanerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CleanerConfig::default(),
    };

    if let Some(input) = input {
        resolved.input = input.clone();
    }
    if let Some(output) = output {
        resolved.output = output.clone();
    }
    if let Some(backup_dir) = backup_dir {
        resolved.backup_dir = backup_dir.clone();
    }
    if *keep_zero_price {
        resolved.remove_zero_price = false;
    }
    if *no_dedup {
        resolved.deduplicate = false;
    }
    if let Some(cap) = outlier_cap {
        resolved.outlier_cap = *cap;
    }
    resolved.validate()?;
    Ok(resolved)
}

fn execute(command: Commands, config: CleanerConfig) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            skip_resource_check,
            json,
            ..
        } => {
            let mut pipeline = Pipeline::new(config);
            if !skip_resource_check {
                pipeline = pipeline.with_resource_probe(Box::new(SystemMemoryProbe));
            }

            let result = pipeline.run()?;
            info!("Backup created at: {}", result.save.backup_path.display());

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                info!("Validation check:");
                println!("{}", result.summary);
            }
        }
        Commands::Describe { path } => {
            let mut diagnostics = Diagnostics::new();
            let records = load(&path, &mut diagnostics)
                .with_context(|| format!("Failed to describe {}", path.display()))?;
            println!("{}", describe(&records));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = resolve_config(&cli.command);

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.log_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

    // Held until main returns so the log file is flushed
    let log_guard = match logging::init_logging(&log_dir) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialise logging in {}: {}", log_dir.display(), e);
            None
        }
    };

    match config.and_then(|config| execute(cli.command, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Process failed: {:#}", e);
            if log_guard.is_none() {
                eprintln!("Process failed: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
