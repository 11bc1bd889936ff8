//! 2D geometry model.
//!
//! A [`Ring`] is a closed boundary stored without its closing vertex, a
//! [`Shape`] is an exterior ring with optional holes and a [`Path`] is an
//! ordered cutter-centre trajectory that may or may not be closed.

pub mod backend;
pub mod kernel;
pub mod polyline;

use serde::{Deserialize, Serialize};

/// Distance under which two coordinates are treated as the same point.
pub const POINT_EPSILON: f64 = 1e-9;

/// A point in the XY plane, in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// True when both coordinates differ by less than `eps`.
    pub fn approx_eq(&self, other: &Point, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

/// Closed boundary curve.
///
/// The first vertex is not repeated at the end; consecutive duplicate
/// vertices are dropped on construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Point>", into = "Vec<Point>")]
pub struct Ring {
    points: Vec<Point>,
}

impl Ring {
    pub fn new(points: impl IntoIterator<Item = Point>) -> Self {
        let mut clean: Vec<Point> = Vec::new();
        for p in points {
            if clean
                .last()
                .is_some_and(|last| last.approx_eq(&p, POINT_EPSILON))
            {
                continue;
            }
            clean.push(p);
        }
        while clean.len() > 1 {
            let (first, last) = (clean[0], clean[clean.len() - 1]);
            if first.approx_eq(&last, POINT_EPSILON) {
                clean.pop();
            } else {
                break;
            }
        }
        Self { points: clean }
    }

    /// Axis-aligned rectangle with opposite corners `min` and `max`.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self::new([
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A ring needs at least three vertices to enclose an area.
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3 && self.points.iter().all(Point::is_finite)
    }

    /// Shoelace area, positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let p1 = self.points[i];
            let p2 = self.points[(i + 1) % n];
            sum += p1.x * p2.y - p2.x * p1.y;
        }
        sum / 2.0
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    pub fn to_clockwise(&self) -> Ring {
        let mut ring = self.clone();
        if ring.signed_area() > 0.0 {
            ring.points.reverse();
        }
        ring
    }

    pub fn to_counter_clockwise(&self) -> Ring {
        let mut ring = self.clone();
        if ring.signed_area() < 0.0 {
            ring.points.reverse();
        }
        ring
    }

    /// Even-odd test; points on the boundary may go either way.
    pub fn contains_point(&self, p: &Point) -> bool {
        let mut inside = false;
        for (a, b) in self.segments() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True when every vertex of `other` lies inside this ring.
    pub fn encloses(&self, other: &Ring) -> bool {
        !other.is_empty() && other.points.iter().all(|p| self.contains_point(p))
    }

    /// Edges of the ring, including the closing edge.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Closed path whose last point repeats the first.
    pub fn to_path(&self) -> Path {
        let mut points = self.points.clone();
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        Path::new(points)
    }

    pub fn from_path(path: &Path) -> Ring {
        Ring::new(path.points().iter().copied())
    }

    pub fn map_points(&self, f: impl Fn(Point) -> Point) -> Ring {
        Ring::new(self.points.iter().map(|p| f(*p)))
    }
}

impl From<Vec<Point>> for Ring {
    fn from(points: Vec<Point>) -> Self {
        Ring::new(points)
    }
}

impl From<Ring> for Vec<Point> {
    fn from(ring: Ring) -> Self {
        ring.points
    }
}

/// A region: one exterior ring plus zero or more holes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub exterior: Ring,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Ring>,
}

impl Shape {
    pub fn new(exterior: Ring) -> Self {
        Self {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn with_holes(exterior: Ring, holes: Vec<Ring>) -> Self {
        Self { exterior, holes }
    }

    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// Exterior counter-clockwise, holes clockwise.
    pub fn normalized(&self) -> Shape {
        Shape {
            exterior: self.exterior.to_counter_clockwise(),
            holes: self.holes.iter().map(Ring::to_clockwise).collect(),
        }
    }

    pub fn map_points(&self, f: impl Fn(Point) -> Point + Copy) -> Shape {
        Shape {
            exterior: self.exterior.map_points(f),
            holes: self.holes.iter().map(|h| h.map_points(f)).collect(),
        }
    }
}

/// Ordered cutter-centre trajectory.
///
/// `reversed` records that the point order runs against the winding of
/// the ring the path was derived from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Point>,
    #[serde(default)]
    reversed: bool,
}

impl Path {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            reversed: false,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// A path is closed when it has at least four points and ends where it starts.
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() >= 4 => {
                first.approx_eq(last, POINT_EPSILON)
            }
            _ => false,
        }
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }

    /// New copy traversed in the opposite direction.
    pub fn reversed(&self) -> Path {
        let mut points = self.points.clone();
        points.reverse();
        Path {
            points,
            reversed: !self.reversed,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

impl From<Vec<Point>> for Path {
    fn from(points: Vec<Point>) -> Self {
        Path::new(points)
    }
}
