use super::isolation::offset_union;
use super::ToolpathStrategy;
use crate::error::CamToolResult;
use pcbmill_core::geometry::polyline::trim_seam;
use pcbmill_core::{GeometryBackend, Path, Ring, Shape};
use tracing::{debug, warn};

/// Tolerance used to straighten the outline before it is split into edges.
const OUTLINE_SIMPLIFY_TOLERANCE: f64 = 0.01;

/// Outline cutting that leaves holders (tabs) on long edges.
///
/// Every straight edge of the grown outline that is at least `min_len`
/// long gets one gap centred on its midpoint. The gap in the cutter-centre
/// path is `holder_size + tool_diameter` wide, so the material left
/// standing is `holder_size` wide. Cutouts inside the outline are returned
/// as whole closed rings after the gapped fragments of their region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldersToolpath {
    pub holder_size: f64,
    pub min_len: f64,
}

impl Default for HoldersToolpath {
    fn default() -> Self {
        Self {
            holder_size: 2.0,
            min_len: 10.0,
        }
    }
}

impl HoldersToolpath {
    pub fn new(holder_size: f64, min_len: f64) -> Self {
        Self {
            holder_size,
            min_len,
        }
    }

    fn split_ring(&self, backend: &dyn GeometryBackend, ring: &Ring, gap: f64) -> Vec<Path> {
        let mut fragments = Vec::new();
        let mut holes = 0;
        for (a, b) in ring.segments() {
            let edge = Path::new(vec![a, b]);
            let len = edge.length();
            if len < self.min_len || len <= gap {
                fragments.push(edge);
                continue;
            }
            let lead = len / 2.0 - gap / 2.0;
            let split = backend
                .cut_at(&edge, lead)
                .and_then(|(head, rest)| backend.cut_at(&rest, gap).map(|(_, tail)| (head, tail)));
            match split {
                Some((head, tail)) => {
                    fragments.push(head);
                    fragments.push(tail);
                    holes += 1;
                }
                None => {
                    warn!("Could not place holder on {:.3} mm edge", len);
                    fragments.push(edge);
                }
            }
        }
        debug!("Placed {} holder(s) on {} edge(s)", holes, ring.len());
        backend.line_merge(&fragments)
    }
}

impl ToolpathStrategy for HoldersToolpath {
    fn name(&self) -> &'static str {
        "holders"
    }

    fn generate_paths(
        &self,
        backend: &dyn GeometryBackend,
        shapes: &[Shape],
        tool_diameter: f64,
    ) -> CamToolResult<Vec<Path>> {
        let gap = self.holder_size + tool_diameter;
        let regions = offset_union(backend, shapes, tool_diameter)?;
        let mut paths = Vec::new();
        for region in &regions {
            let outline = backend.simplify(&region.exterior.to_path(), OUTLINE_SIMPLIFY_TOLERANCE)?;
            let ring = Ring::from_path(&outline);
            let ring = Ring::new(trim_seam(ring.points(), OUTLINE_SIMPLIFY_TOLERANCE));
            paths.extend(self.split_ring(backend, &ring, gap));
            paths.extend(region.holes.iter().map(Ring::to_path));
        }
        Ok(paths)
    }
}
