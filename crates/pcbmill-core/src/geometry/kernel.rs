//! Default geometry kernel.
//!
//! Offsets are computed with `cavalier_contours` parallel offsets and the
//! arcs it produces at convex corners are turned back into straight
//! segments according to the configured [`JoinStyle`]. Boolean operations
//! go through `csgrs` sketches.

use super::backend::GeometryBackend;
use super::{Point, Ring, Shape};
use crate::error::{GeometryError, GeometryResult};
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use std::f64::consts::{FRAC_PI_2, PI};
use std::panic;
use tracing::{debug, warn};

const BULGE_EPSILON: f64 = 1e-9;

/// How convex corners of an offset are rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JoinStyle {
    /// Sharp corner where the two offset edges meet. Corners whose mitre
    /// length would exceed `limit` times the radius are rounded instead.
    Mitre { limit: f64 },
    /// Arc approximated with `segments` chords per full circle.
    Round { segments: u32 },
}

impl Default for JoinStyle {
    fn default() -> Self {
        Self::Mitre { limit: 4.0 }
    }
}

/// `cavalier_contours` + `csgrs` implementation of [`GeometryBackend`].
#[derive(Debug, Clone, Default)]
pub struct KernelBackend {
    join: JoinStyle,
}

impl KernelBackend {
    pub fn new(join: JoinStyle) -> Self {
        Self { join }
    }

    pub fn join_style(&self) -> JoinStyle {
        self.join
    }

    fn ring_to_polyline(ring: &Ring) -> Polyline<f64> {
        let mut pline = Polyline::new();
        for p in ring.points() {
            pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
        }
        pline.set_is_closed(true);
        pline
    }

    fn polyline_to_ring(&self, pline: &Polyline<f64>) -> Ring {
        let count = pline.vertex_count();
        let mut points = Vec::with_capacity(count * 2);
        for i in 0..count {
            let v1 = pline.at(i);
            let v2 = pline.at((i + 1) % count);
            points.push(Point::new(v1.x, v1.y));
            if v1.bulge.abs() > BULGE_EPSILON {
                self.push_join(
                    &mut points,
                    Point::new(v1.x, v1.y),
                    Point::new(v2.x, v2.y),
                    v1.bulge,
                );
            }
        }
        Ring::new(points)
    }

    /// Replace the arc from `start` to `end` by straight segments.
    fn push_join(&self, points: &mut Vec<Point>, start: Point, end: Point, bulge: f64) {
        let chord = start.distance_to(&end);
        if chord < BULGE_EPSILON {
            return;
        }
        let theta = 4.0 * bulge.atan();
        let half = theta.abs() / 2.0;
        let mid = start.lerp(&end, 0.5);
        let nx = -(end.y - start.y) / chord;
        let ny = (end.x - start.x) / chord;
        let sign = bulge.signum();

        let segments = match self.join {
            JoinStyle::Mitre { limit } => {
                if half < FRAC_PI_2 - 1e-6 && 1.0 / half.cos() <= limit {
                    let depth = chord / 2.0 * half.tan();
                    points.push(Point::new(mid.x - nx * sign * depth, mid.y - ny * sign * depth));
                    return;
                }
                32
            }
            JoinStyle::Round { segments } => segments.max(4),
        };

        let radius = chord / (2.0 * half.sin());
        let dist_to_center = radius * half.cos();
        let cx = mid.x + nx * dist_to_center * sign;
        let cy = mid.y + ny * dist_to_center * sign;
        let start_angle = (start.y - cy).atan2(start.x - cx);
        let mut end_angle = (end.y - cy).atan2(end.x - cx);
        if bulge > 0.0 {
            if end_angle <= start_angle {
                end_angle += 2.0 * PI;
            }
        } else if end_angle >= start_angle {
            end_angle -= 2.0 * PI;
        }
        let steps = ((segments as f64) * theta.abs() / (2.0 * PI)).ceil().max(2.0) as usize;
        for j in 1..steps {
            let angle = start_angle + (end_angle - start_angle) * (j as f64 / steps as f64);
            points.push(Point::new(
                cx + radius * angle.cos(),
                cy + radius * angle.sin(),
            ));
        }
    }

    /// Offset a single ring; positive distances grow it.
    fn offset_ring(&self, ring: &Ring, distance: f64) -> GeometryResult<Vec<Ring>> {
        let pline = Self::ring_to_polyline(&ring.to_clockwise());
        let result =
            panic::catch_unwind(panic::AssertUnwindSafe(|| pline.parallel_offset(distance)));
        match result {
            Ok(offsets) => Ok(offsets
                .iter()
                .filter(|p| p.is_closed() && p.vertex_count() >= 2)
                .map(|p| self.polyline_to_ring(p))
                .filter(Ring::is_valid)
                .collect()),
            Err(_) => {
                warn!("Panic during parallel offset of {} vertex ring", ring.len());
                Err(GeometryError::OffsetFailed {
                    radius: distance,
                    reason: "parallel offset panicked".to_string(),
                })
            }
        }
    }

    fn ring_to_sketch(ring: &Ring) -> Sketch<()> {
        let pts: Vec<[f64; 2]> = ring.points().iter().map(|p| [p.x, p.y]).collect();
        Sketch::polygon(&pts, None)
    }

    fn shape_to_sketch(shape: &Shape) -> Sketch<()> {
        let mut sketch = Self::ring_to_sketch(&shape.exterior);
        for hole in shape.holes.iter().filter(|h| h.is_valid()) {
            sketch = sketch.difference(&Self::ring_to_sketch(hole));
        }
        sketch
    }

    fn sketch_to_shapes(sketch: &Sketch<()>) -> Vec<Shape> {
        let mp = sketch.to_multipolygon();
        let mut shapes = Vec::new();
        for poly in mp.0 {
            let exterior = Ring::new(poly.exterior().0.iter().map(|c| Point::new(c.x, c.y)));
            if !exterior.is_valid() {
                continue;
            }
            let holes = poly
                .interiors()
                .iter()
                .map(|ls| Ring::new(ls.0.iter().map(|c| Point::new(c.x, c.y))))
                .filter(Ring::is_valid)
                .collect();
            shapes.push(Shape::with_holes(exterior, holes).normalized());
        }
        shapes
    }
}

impl GeometryBackend for KernelBackend {
    fn offset(&self, shape: &Shape, radius: f64) -> GeometryResult<Vec<Shape>> {
        if !radius.is_finite() {
            return Err(GeometryError::InvalidInput(format!(
                "offset radius {radius} is not finite"
            )));
        }
        if !shape.exterior.is_valid() {
            return Err(GeometryError::InvalidInput(format!(
                "exterior ring has {} usable vertices",
                shape.exterior.len()
            )));
        }
        if radius.abs() < BULGE_EPSILON {
            return Ok(vec![shape.normalized()]);
        }

        let exteriors = self.offset_ring(&shape.exterior, radius)?;
        let mut holes = Vec::new();
        for hole in shape.holes.iter().filter(|h| h.is_valid()) {
            holes.extend(self.offset_ring(hole, -radius)?);
        }
        debug!(
            "Offset by {}: {} exterior ring(s), {} hole ring(s)",
            radius,
            exteriors.len(),
            holes.len()
        );

        if holes.is_empty() {
            return Ok(exteriors
                .into_iter()
                .map(|ring| Shape::new(ring).normalized())
                .collect());
        }

        let mut solid: Sketch<()> = Sketch::new();
        for ring in &exteriors {
            solid = solid.union(&Self::ring_to_sketch(ring));
        }
        let mut voids: Sketch<()> = Sketch::new();
        for ring in &holes {
            voids = voids.union(&Self::ring_to_sketch(ring));
        }
        Ok(Self::sketch_to_shapes(&solid.difference(&voids)))
    }

    fn union(&self, shapes: &[Shape]) -> GeometryResult<Vec<Shape>> {
        let valid: Vec<&Shape> = shapes.iter().filter(|s| s.exterior.is_valid()).collect();
        match valid.as_slice() {
            [] => Ok(Vec::new()),
            [single] => Ok(vec![single.normalized()]),
            [first, rest @ ..] => {
                let mut merged = Self::shape_to_sketch(first);
                for shape in rest {
                    merged = merged.union(&Self::shape_to_sketch(shape));
                }
                let result = Self::sketch_to_shapes(&merged);
                debug!("Union of {} shapes -> {} region(s)", valid.len(), result.len());
                Ok(result)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mitre_join_for_right_angle() {
        let backend = KernelBackend::default();
        let mut points = Vec::new();
        // counter-clockwise quarter arc around (10, 0)
        let bulge = (PI / 8.0).tan();
        backend.push_join(
            &mut points,
            Point::new(10.0, -1.0),
            Point::new(11.0, 0.0),
            bulge,
        );
        assert_eq!(points.len(), 1);
        assert!(points[0].approx_eq(&Point::new(11.0, -1.0), 1e-9));
    }

    #[test]
    fn test_round_join_stays_on_circle() {
        let backend = KernelBackend::new(JoinStyle::Round { segments: 32 });
        let mut points = Vec::new();
        let bulge = (PI / 8.0).tan();
        backend.push_join(
            &mut points,
            Point::new(10.0, -1.0),
            Point::new(11.0, 0.0),
            bulge,
        );
        assert!(points.len() >= 2);
        for p in &points {
            let r = p.distance_to(&Point::new(10.0, 0.0));
            assert!((r - 1.0).abs() < 1e-9);
            assert!(p.x > 10.0 && p.y < 0.0);
        }
    }

    #[test]
    fn test_mitre_limit_falls_back_to_round() {
        let backend = KernelBackend::new(JoinStyle::Mitre { limit: 1.2 });
        let mut points = Vec::new();
        backend.push_join(
            &mut points,
            Point::new(10.0, -1.0),
            Point::new(11.0, 0.0),
            (PI / 8.0).tan(),
        );
        assert!(points.len() > 1);
    }

    #[test]
    fn test_zero_radius_is_identity() {
        let backend = KernelBackend::default();
        let shape = Shape::new(Ring::rectangle(Point::new(0.0, 0.0), Point::new(1.0, 1.0)));
        let out = backend.offset(&shape, 0.0).unwrap();
        assert_eq!(out, vec![shape.normalized()]);
    }

    #[test]
    fn test_offset_rejects_degenerate_ring() {
        let backend = KernelBackend::default();
        let shape = Shape::new(Ring::new([Point::new(0.0, 0.0), Point::new(1.0, 0.0)]));
        assert!(matches!(
            backend.offset(&shape, 1.0),
            Err(GeometryError::InvalidInput(_))
        ));
    }
}
