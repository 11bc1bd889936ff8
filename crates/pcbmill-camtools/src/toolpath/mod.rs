//! Toolpath generation.
//!
//! A [`ToolpathGenerator`] owns the tool list, the geometry backend and
//! the post-processing settings; the per-operation logic lives in a
//! [`ToolpathStrategy`] ([`IsolationToolpath`] or [`HoldersToolpath`]).

pub mod connector;
pub mod holders;
pub mod isolation;
pub mod ordering;

pub use connector::{DistanceMap, PathConnector};
pub use holders::HoldersToolpath;
pub use isolation::IsolationToolpath;

use crate::error::{CamToolError, CamToolResult, ParameterError, ParameterResult};
use pcbmill_core::{GeometryBackend, KernelBackend, Path, Point, Shape};
use tracing::{debug, info};

/// Callback invoked once for every generated path.
pub type PathObserver = Box<dyn FnMut(&Path)>;

/// Derives cutter-centre paths from shapes for one tool diameter.
pub trait ToolpathStrategy {
    fn name(&self) -> &'static str;

    fn generate_paths(
        &self,
        backend: &dyn GeometryBackend,
        shapes: &[Shape],
        tool_diameter: f64,
    ) -> CamToolResult<Vec<Path>>;
}

/// Post-processing applied after the strategy ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Stitch closed paths together with [`PathConnector`].
    pub connect: bool,
    /// Reorder paths into a nearest-neighbour tour from the origin.
    pub order: bool,
}

pub struct ToolpathGenerator<S: ToolpathStrategy> {
    strategy: S,
    tools: Vec<f64>,
    settings: GeneratorSettings,
    backend: Box<dyn GeometryBackend>,
    observer: Option<PathObserver>,
}

impl<S: ToolpathStrategy> ToolpathGenerator<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            tools: Vec::new(),
            settings: GeneratorSettings::default(),
            backend: Box::new(KernelBackend::default()),
            observer: None,
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn GeometryBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_settings(mut self, settings: GeneratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_observer(mut self, observer: impl FnMut(&Path) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn settings(&self) -> GeneratorSettings {
        self.settings
    }

    pub fn tools(&self) -> &[f64] {
        &self.tools
    }

    pub fn add_tool(&mut self, diameter: f64) -> ParameterResult<()> {
        if !(diameter.is_finite() && diameter > 0.0) {
            return Err(ParameterError::InvalidValue {
                name: "tool_diameter".to_string(),
                reason: format!("must be positive, got {}", diameter),
            });
        }
        self.tools.push(diameter);
        Ok(())
    }

    /// Run the strategy with the first tool, then optimize and optionally connect.
    pub fn generate(&mut self, shapes: &[Shape]) -> CamToolResult<Vec<Path>> {
        let tool = *self.tools.first().ok_or(CamToolError::NoToolSelected)?;
        let paths = self
            .strategy
            .generate_paths(self.backend.as_ref(), shapes, tool)?;
        debug!(
            "{} produced {} path(s) from {} shape(s) with tool {}",
            self.strategy.name(),
            paths.len(),
            shapes.len(),
            tool
        );

        let paths = self.optimize(paths);
        let paths = if self.settings.connect {
            let connected = PathConnector::new(self.backend.as_ref()).connect(&paths, tool)?;
            info!("Connected {} path(s) into {}", paths.len(), connected.len());
            connected
        } else {
            paths
        };

        if let Some(observer) = self.observer.as_mut() {
            for path in &paths {
                observer(path);
            }
        }
        Ok(paths)
    }

    /// Identity unless path ordering is enabled.
    pub fn optimize(&self, paths: Vec<Path>) -> Vec<Path> {
        if self.settings.order {
            ordering::order_paths(paths, Point::default())
        } else {
            paths
        }
    }
}
