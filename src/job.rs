//! Whole-board job runner.
//!
//! Every layer becomes one or more G-code files in the output directory:
//! copper layers are isolation milled with the mill bit, drill layers get
//! one file per diameter and outline layers are cut with the cut bit,
//! optionally leaving holders. A failing layer is logged and recorded in
//! the [`JobSummary`]; the remaining layers are still processed.

use anyhow::{bail, Context};
use pcbmill_camtools::{
    CutOrchestrator, FileSink, IsolationToolpath, Operation, OperationOutcome, ToolpathGenerator,
};
use pcbmill_core::{JsonBoardLoader, Layer, LayerClass, LayerSource, Path as ToolPath};
use pcbmill_settings::JobConfig;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// A layer that could not be processed.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFailure {
    pub layer: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSummary {
    /// Files written, in processing order.
    pub written: Vec<PathBuf>,
    /// Outputs that had nothing to emit.
    pub skipped: Vec<String>,
    pub failures: Vec<LayerFailure>,
}

impl JobSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BoardJob {
    config: JobConfig,
    output_dir: PathBuf,
}

impl BoardJob {
    pub fn new(config: JobConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Process every layer. Fails early only when the configuration is
    /// invalid or the output directory cannot be created.
    pub fn run(&self, layers: &[Layer]) -> anyhow::Result<JobSummary> {
        self.config
            .validate()
            .context("Invalid job configuration")?;
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_dir.display()
            )
        })?;

        let mut summary = JobSummary::default();
        for layer in layers {
            info!("Processing layer '{}' ({})", layer.name, layer.class);
            let result = match layer.class {
                LayerClass::Top | LayerClass::Bottom => self.run_copper(layer, &mut summary),
                LayerClass::Drill => self.run_drills(layer, &mut summary),
                LayerClass::Outline => self.run_outline(layer, &mut summary),
            };
            if let Err(err) = result {
                error!("Layer '{}' failed: {:#}", layer.name, err);
                summary.failures.push(LayerFailure {
                    layer: layer.name.clone(),
                    error: format!("{:#}", err),
                });
            }
        }

        info!(
            "Wrote {} file(s), skipped {}, {} layer(s) failed",
            summary.written.len(),
            summary.skipped.len(),
            summary.failures.len()
        );
        Ok(summary)
    }

    fn run_copper(&self, layer: &Layer, summary: &mut JobSummary) -> anyhow::Result<()> {
        let paths = self.isolation_paths(layer, self.config.mill_bit_diameter)?;
        let file = self.output_dir.join(format!("{}.gcode", layer.name));
        self.emit(&file, &Operation::Mill(paths), summary)
    }

    fn run_drills(&self, layer: &Layer, summary: &mut JobSummary) -> anyhow::Result<()> {
        let hits = layer.transformed_drills();
        let diameters = layer.drill_diameters();
        if diameters.is_empty() {
            warn!("Drill layer '{}' has no hits", layer.name);
            summary.skipped.push(layer.name.clone());
            return Ok(());
        }
        for diameter in diameters {
            let hits: Vec<_> = hits
                .iter()
                .filter(|h| (h.diameter - diameter).abs() < 1e-6)
                .copied()
                .collect();
            let file = self
                .output_dir
                .join(format!("{}_{}.gcode", layer.name, diameter));
            self.emit(&file, &Operation::Drill { diameter, hits }, summary)?;
        }
        Ok(())
    }

    fn run_outline(&self, layer: &Layer, summary: &mut JobSummary) -> anyhow::Result<()> {
        let tool = self.config.cut_bit_diameter;
        let outline = self.isolation_paths(layer, tool)?;
        let (profile, holder_profile) = self.config.cut_profiles()?;

        let operation = match holder_profile {
            Some(holder_profile) => {
                let mut generator = ToolpathGenerator::new(self.config.holders_toolpath());
                generator.add_tool(tool)?;
                let holders = generator
                    .generate(&layer.transformed_shapes())
                    .context("Holder generation failed")?;
                Operation::CutWithHolders {
                    outline,
                    holders,
                    profile,
                    holder_profile,
                }
            }
            None => Operation::Cut {
                paths: outline,
                profile,
            },
        };

        let file = self.output_dir.join(format!("{}.gcode", layer.name));
        self.emit(&file, &operation, summary)
    }

    fn isolation_paths(&self, layer: &Layer, tool: f64) -> anyhow::Result<Vec<ToolPath>> {
        let mut generator = ToolpathGenerator::new(IsolationToolpath::default())
            .with_settings(self.config.generator_settings());
        generator.add_tool(tool)?;
        generator
            .generate(&layer.transformed_shapes())
            .context("Isolation toolpath generation failed")
    }

    fn emit(
        &self,
        file: &Path,
        operation: &Operation,
        summary: &mut JobSummary,
    ) -> anyhow::Result<()> {
        let name = file.display().to_string();
        if operation.is_empty() {
            warn!("Nothing to emit for {}", name);
            summary.skipped.push(name);
            return Ok(());
        }

        let sink = FileSink::create(file).with_context(|| format!("Failed to create {}", name))?;
        let outcome = CutOrchestrator::from_config(self.config.machine_config(), sink)
            .and_then(|mut orchestrator| orchestrator.execute(operation));
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                // a truncated program must not be left behind
                if let Err(remove_err) = std::fs::remove_file(file) {
                    warn!("Could not remove partial {}: {}", name, remove_err);
                }
                return Err(anyhow::Error::new(err).context(format!("Failed to write {}", name)));
            }
        };
        match outcome {
            OperationOutcome::Completed { paths } => {
                info!("Wrote {} ({} item(s))", name, paths);
                summary.written.push(file.to_path_buf());
            }
            OperationOutcome::Skipped => summary.skipped.push(name),
        }
        Ok(())
    }
}

/// Load a JSON board description and run it.
pub fn run_board_file(
    board: &Path,
    config: JobConfig,
    output_dir: &Path,
) -> anyhow::Result<JobSummary> {
    let layers = JsonBoardLoader::new(board)
        .load_layers()
        .with_context(|| format!("Failed to load board {}", board.display()))?;
    if layers.is_empty() {
        bail!("Board {} has no layers", board.display());
    }
    BoardJob::new(config, output_dir).run(&layers)
}
