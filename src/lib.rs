//! # PCBMill
//!
//! G-code generation for milling printed circuit boards:
//! - Isolation routing of top and bottom copper
//! - Drilling, one program per drill diameter
//! - Outline cutting with holding tabs
//!
//! ## Architecture
//!
//! PCBMill is organized as a workspace with multiple crates:
//!
//! 1. **pcbmill-core** - Geometry model, geometry kernel, board layers
//! 2. **pcbmill-camtools** - Toolpath strategies, path connector, machine state, orchestrator
//! 3. **pcbmill-settings** - Job configuration files
//! 4. **pcbmill** - Board job runner and command line

pub mod job;

pub use job::{run_board_file, BoardJob, JobSummary, LayerFailure};

pub use pcbmill_core::{
    BoardDescription, DrillHit, GeometryBackend, JsonBoardLoader, KernelBackend, Layer,
    LayerClass, LayerSource, Path, Point, Ring, Shape,
};

pub use pcbmill_camtools::{
    CamToolError, CommandSink, CoordinateMode, CutOrchestrator, CutProfile, FileSink,
    HoldersToolpath, IsolationToolpath, MachineConfig, MachineState, MotionCommand, Operation,
    OperationOutcome, PathConnector, ToolpathGenerator,
};

pub use pcbmill_settings::{JobConfig, SettingsError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output with pretty formatting
/// - RUST_LOG environment variable support
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
