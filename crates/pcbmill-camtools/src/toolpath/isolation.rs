use super::ToolpathStrategy;
use crate::error::CamToolResult;
use pcbmill_core::{GeometryBackend, GeometryError, Path, Shape};
use tracing::{error, warn};

/// Offset every shape by the tool radius and union the results.
///
/// A shape the kernel cannot offset is logged and left out; the other
/// shapes of the layer are still processed.
pub(crate) fn offset_union(
    backend: &dyn GeometryBackend,
    shapes: &[Shape],
    tool_diameter: f64,
) -> CamToolResult<Vec<Shape>> {
    let radius = tool_diameter / 2.0;
    let mut grown = Vec::with_capacity(shapes.len());
    for (i, shape) in shapes.iter().enumerate() {
        match backend.offset(shape, radius) {
            Ok(offsets) => grown.extend(offsets),
            Err(err @ GeometryError::InvalidInput(_)) => {
                warn!("Skipping shape {}: {}", i, err);
            }
            Err(err) => {
                error!("Offset of shape {} failed, shape left out: {}", i, err);
            }
        }
    }
    Ok(backend.union(&grown)?)
}

/// Isolation routing: the boundaries of the tool-radius grown region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsolationToolpath {
    pub use_exterior: bool,
    pub use_interior: bool,
}

impl Default for IsolationToolpath {
    fn default() -> Self {
        Self {
            use_exterior: true,
            use_interior: true,
        }
    }
}

impl ToolpathStrategy for IsolationToolpath {
    fn name(&self) -> &'static str {
        "isolation"
    }

    fn generate_paths(
        &self,
        backend: &dyn GeometryBackend,
        shapes: &[Shape],
        tool_diameter: f64,
    ) -> CamToolResult<Vec<Path>> {
        let regions = offset_union(backend, shapes, tool_diameter)?;
        let mut paths = Vec::new();
        for region in &regions {
            if self.use_exterior {
                paths.push(region.exterior.to_path());
            }
            if self.use_interior {
                paths.extend(region.holes.iter().map(|h| h.to_path()));
            }
        }
        Ok(paths)
    }
}
