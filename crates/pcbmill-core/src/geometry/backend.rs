//! The geometry capability consumed by toolpath generation.

use super::{polyline, Path, Point, Shape};
use crate::error::{GeometryError, GeometryResult};

/// Offset, boolean and polyline operations used by the CAM pipeline.
///
/// Implementors must provide [`offset`](Self::offset) and
/// [`union`](Self::union); the polyline queries have default
/// implementations in terms of [`polyline`].
pub trait GeometryBackend {
    /// Grow (positive radius) or shrink (negative radius) a shape.
    ///
    /// The exterior moves outward and holes move inward by `radius`. The
    /// result may split into several shapes or vanish entirely.
    fn offset(&self, shape: &Shape, radius: f64) -> GeometryResult<Vec<Shape>>;

    /// Merge overlapping shapes into disjoint regions.
    fn union(&self, shapes: &[Shape]) -> GeometryResult<Vec<Shape>>;

    /// Remove points that deviate less than `tolerance` from the simplified path.
    fn simplify(&self, path: &Path, tolerance: f64) -> GeometryResult<Path> {
        if path.points().iter().any(|p| !p.is_finite()) {
            return Err(GeometryError::UnsupportedGeometry(
                "path contains non-finite coordinates".to_string(),
            ));
        }
        Ok(Path::new(polyline::douglas_peucker(path.points(), tolerance)))
    }

    /// Join fragments that meet end to end into maximal runs.
    fn line_merge(&self, paths: &[Path]) -> Vec<Path> {
        polyline::line_merge(paths)
    }

    fn distance(&self, a: &Path, b: &Path) -> f64 {
        polyline::path_distance(a, b)
    }

    fn interpolate(&self, path: &Path, distance: f64) -> Option<Point> {
        polyline::interpolate(path.points(), distance)
    }

    fn cut_at(&self, path: &Path, distance: f64) -> Option<(Path, Path)> {
        polyline::cut_at(path.points(), distance).map(|(a, b)| (Path::new(a), Path::new(b)))
    }
}
