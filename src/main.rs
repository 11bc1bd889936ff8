//! PCBMill command line.

use anyhow::{bail, Context};
use clap::Parser;
use pcbmill::{init_logging, run_board_file, JobConfig, BUILD_DATE, VERSION};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pcbmill")]
#[command(about = "Generate isolation, drilling and cutting G-code for PCBs")]
#[command(version)]
struct Cli {
    /// Board description (JSON) produced by a gerber/DXF converter
    board: Option<PathBuf>,

    /// Job configuration (.json or .toml); defaults to the user config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for the generated G-code
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Write the default configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    generate_config: Option<PathBuf>,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<JobConfig> {
    match path {
        Some(path) => JobConfig::load_from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let path = JobConfig::default_path();
            if path.exists() {
                JobConfig::load_from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))
            } else {
                info!("No configuration at {}, using defaults", path.display());
                Ok(JobConfig::default())
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    info!("PCBMill {} (built {})", VERSION, BUILD_DATE);

    if let Some(path) = cli.generate_config {
        JobConfig::default()
            .save_to_file(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Default configuration written to {}", path.display());
        return Ok(());
    }

    let Some(board) = cli.board else {
        bail!("No board file given (see --help)");
    };
    let config = load_config(cli.config)?;
    let summary = run_board_file(&board, config, &cli.output)?;

    for failure in &summary.failures {
        warn!("{}: {}", failure.layer, failure.error);
    }
    if !summary.is_success() {
        bail!("{} layer(s) failed", summary.failures.len());
    }
    Ok(())
}
