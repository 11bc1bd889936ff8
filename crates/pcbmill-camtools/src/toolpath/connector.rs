//! Stitching of disjoint closed paths into fewer continuous passes.
//!
//! Starting from the first path, the connector repeatedly picks the
//! nearest path not consumed yet, bridges the two with a tool-width neck
//! where they run parallel at their closest approach and unions everything
//! into one region. This is a greedy chain, not a shortest tour.

use crate::error::CamToolResult;
use pcbmill_core::{GeometryBackend, GeometryError, Path, Point, Ring, Shape};
use tracing::{debug, warn};

/// Pairwise path distances, stored as an upper triangle.
///
/// Self distances and cleared entries hold the `f64::INFINITY` sentinel and
/// are never returned as a minimum.
#[derive(Debug, Clone)]
pub struct DistanceMap {
    size: usize,
    cells: Vec<f64>,
}

impl DistanceMap {
    pub fn new(backend: &dyn GeometryBackend, paths: &[Path]) -> Self {
        let size = paths.len();
        let mut cells = Vec::with_capacity(size * size.saturating_sub(1) / 2);
        for i in 0..size {
            for j in (i + 1)..size {
                cells.push(backend.distance(&paths[i], &paths[j]));
            }
        }
        Self { size, cells }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn index(&self, a: usize, b: usize) -> Option<usize> {
        let (i, j) = if a < b { (a, b) } else { (b, a) };
        if i == j || j >= self.size {
            return None;
        }
        // rows before i hold (size-1) + (size-2) + ... + (size-i) cells
        Some(i * (2 * self.size - i - 1) / 2 + (j - i - 1))
    }

    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.index(a, b)
            .map(|idx| self.cells[idx])
            .unwrap_or(f64::INFINITY)
    }

    /// Nearest index to `a` that has not been cleared.
    pub fn get_closest(&self, a: usize) -> Option<(usize, f64)> {
        (0..self.size)
            .filter(|&b| b != a)
            .map(|b| (b, self.get(a, b)))
            .filter(|(_, d)| d.is_finite())
            .min_by(|x, y| x.1.total_cmp(&y.1))
    }

    /// Invalidate every distance involving `a`.
    pub fn clear(&mut self, a: usize) {
        for b in 0..self.size {
            if let Some(idx) = self.index(a, b) {
                self.cells[idx] = f64::INFINITY;
            }
        }
    }
}

/// Where two rings face each other across the gap.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Contact {
    from: Point,
    to: Point,
    overlap: f64,
}

pub struct PathConnector<'a> {
    backend: &'a dyn GeometryBackend,
}

impl<'a> PathConnector<'a> {
    pub fn new(backend: &'a dyn GeometryBackend) -> Self {
        Self { backend }
    }

    /// Merge the outermost closed paths of `paths` into as few regions as
    /// the greedy chain allows and return the region boundaries. Closed
    /// paths lying inside another closed path isolate hole edges; they are
    /// returned unchanged after the boundaries, followed by the open paths.
    pub fn connect(&self, paths: &[Path], tool_diameter: f64) -> CamToolResult<Vec<Path>> {
        let (closed, open): (Vec<&Path>, Vec<&Path>) = paths.iter().partition(|p| p.is_closed());
        let rings: Vec<Ring> = closed.iter().map(|p| Ring::from_path(p)).collect();
        let (outer, nested): (Vec<usize>, Vec<usize>) = (0..rings.len()).partition(|&i| {
            !rings
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.encloses(&rings[i]))
        });
        if outer.len() < 2 {
            return Ok(paths.to_vec());
        }
        if !nested.is_empty() {
            debug!("Keeping {} nested path(s) out of the chain", nested.len());
        }

        let rings: Vec<Ring> = outer.iter().map(|&i| rings[i].clone()).collect();
        let owned: Vec<Path> = outer.iter().map(|&i| closed[i].clone()).collect();
        let mut map = DistanceMap::new(self.backend, &owned);

        let mut merged = self.backend.union(&[Shape::new(rings[0].clone())])?;
        let mut current = 0;
        while let Some((next, gap)) = map.get_closest(current) {
            map.clear(current);
            let mut parts = merged.clone();
            parts.push(Shape::new(rings[next].clone()));

            if gap > 1e-9 {
                match Self::find_contact(&rings[current], &rings[next], gap, 2.0 * tool_diameter) {
                    Some(contact) => {
                        debug!(
                            "Bridging path {} to {} over {:.3} mm ({:.3} mm overlap)",
                            current, next, gap, contact.overlap
                        );
                        parts.push(Shape::new(Self::bridge(&contact, tool_diameter / 2.0)));
                    }
                    None => {
                        let err = GeometryError::DegenerateSegment {
                            from: current,
                            to: next,
                        };
                        warn!("{}, joining without bridge", err);
                    }
                }
            }

            merged = self.backend.union(&parts)?;
            current = next;
        }

        let mut result = Vec::new();
        for region in &merged {
            result.push(region.exterior.to_path());
            result.extend(region.holes.iter().map(Ring::to_path));
        }
        result.extend(nested.into_iter().map(|i| closed[i].clone()));
        result.extend(open.into_iter().cloned());
        Ok(result)
    }

    /// Longest stretch where an edge of `a` and an edge of `b` run parallel
    /// at distance `gap`, if it is at least `min_overlap` long.
    fn find_contact(a: &Ring, b: &Ring, gap: f64, min_overlap: f64) -> Option<Contact> {
        let tolerance = 1e-6 + gap * 1e-3;
        let mut best: Option<Contact> = None;

        for (a0, a1) in a.segments() {
            let la = a0.distance_to(&a1);
            if la < 1e-9 {
                continue;
            }
            let (ux, uy) = ((a1.x - a0.x) / la, (a1.y - a0.y) / la);

            for (b0, b1) in b.segments() {
                let lb = b0.distance_to(&b1);
                if lb < 1e-9 {
                    continue;
                }
                let (vx, vy) = ((b1.x - b0.x) / lb, (b1.y - b0.y) / lb);
                if (ux * vy - uy * vx).abs() > 1e-3 {
                    continue;
                }

                // signed offsets of b's endpoints from a's line
                let s0 = ux * (b0.y - a0.y) - uy * (b0.x - a0.x);
                let s1 = ux * (b1.y - a0.y) - uy * (b1.x - a0.x);
                let separation = (s0 + s1) / 2.0;
                if (s0 - s1).abs() > tolerance || (separation.abs() - gap).abs() > tolerance {
                    continue;
                }

                let t0 = ux * (b0.x - a0.x) + uy * (b0.y - a0.y);
                let t1 = ux * (b1.x - a0.x) + uy * (b1.y - a0.y);
                let lo = t0.min(t1).max(0.0);
                let hi = t0.max(t1).min(la);
                let overlap = hi - lo;
                if overlap < min_overlap || best.is_some_and(|c| c.overlap >= overlap) {
                    continue;
                }

                let mid = (lo + hi) / 2.0;
                let from = Point::new(a0.x + ux * mid, a0.y + uy * mid);
                let to = Point::new(from.x - uy * separation, from.y + ux * separation);
                best = Some(Contact { from, to, overlap });
            }
        }
        best
    }

    /// Rectangle of half-width `radius` spanning the contact, reaching
    /// `radius` into both shapes.
    fn bridge(contact: &Contact, radius: f64) -> Ring {
        let len = contact.from.distance_to(&contact.to);
        let (ux, uy) = (
            (contact.to.x - contact.from.x) / len,
            (contact.to.y - contact.from.y) / len,
        );
        let (nx, ny) = (-uy * radius, ux * radius);
        let start = Point::new(contact.from.x - ux * radius, contact.from.y - uy * radius);
        let end = Point::new(contact.to.x + ux * radius, contact.to.y + uy * radius);
        Ring::new([
            Point::new(start.x - nx, start.y - ny),
            Point::new(end.x - nx, end.y - ny),
            Point::new(end.x + nx, end.y + ny),
            Point::new(start.x + nx, start.y + ny),
        ])
    }
}
