use pcbmill_core::geometry::polyline::point_segment_distance;
use pcbmill_core::{GeometryBackend, KernelBackend, Point, Ring, Shape};
use proptest::prelude::*;

fn square_shape() -> Shape {
    Shape::new(Ring::new([
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 10.0),
        Point::new(0.0, 10.0),
        Point::new(0.0, 0.0),
    ]))
}

fn has_corner(ring: &Ring, x: f64, y: f64) -> bool {
    ring.points()
        .iter()
        .any(|p| p.approx_eq(&Point::new(x, y), 1e-6))
}

fn bounds(ring: &Ring) -> (f64, f64, f64, f64) {
    ring.points().iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    )
}

fn distance_to_ring(p: Point, ring: &Ring) -> f64 {
    ring.segments()
        .map(|(a, b)| point_segment_distance(p, a, b))
        .fold(f64::INFINITY, f64::min)
}

#[test]
fn test_square_offset_has_sharp_corners() {
    let backend = KernelBackend::default();
    let result = backend.offset(&square_shape(), 1.0).unwrap();
    assert_eq!(result.len(), 1);

    let ring = &result[0].exterior;
    assert!(has_corner(ring, -1.0, -1.0));
    assert!(has_corner(ring, 11.0, -1.0));
    assert!(has_corner(ring, 11.0, 11.0));
    assert!(has_corner(ring, -1.0, 11.0));
    assert!((ring.signed_area() - 144.0).abs() < 1e-6);
}

#[test]
fn test_inward_offset_shrinks() {
    let backend = KernelBackend::default();
    let result = backend.offset(&square_shape(), -2.0).unwrap();
    assert_eq!(result.len(), 1);
    let (x0, y0, x1, y1) = bounds(&result[0].exterior);
    assert!((x0 - 2.0).abs() < 1e-6 && (y0 - 2.0).abs() < 1e-6);
    assert!((x1 - 8.0).abs() < 1e-6 && (y1 - 8.0).abs() < 1e-6);
}

#[test]
fn test_inward_offset_can_vanish() {
    let backend = KernelBackend::default();
    let result = backend.offset(&square_shape(), -6.0).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_offset_shrinks_holes() {
    let backend = KernelBackend::default();
    let shape = Shape::with_holes(
        Ring::rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
        vec![Ring::rectangle(Point::new(2.0, 2.0), Point::new(8.0, 8.0))],
    );
    let result = backend.offset(&shape, 1.0).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].holes.len(), 1);

    let (x0, y0, x1, y1) = bounds(&result[0].exterior);
    assert!((x0 + 1.0).abs() < 1e-6 && (y0 + 1.0).abs() < 1e-6);
    assert!((x1 - 11.0).abs() < 1e-6 && (y1 - 11.0).abs() < 1e-6);

    let (x0, y0, x1, y1) = bounds(&result[0].holes[0]);
    assert!((x0 - 3.0).abs() < 1e-6 && (y0 - 3.0).abs() < 1e-6);
    assert!((x1 - 7.0).abs() < 1e-6 && (y1 - 7.0).abs() < 1e-6);
}

#[test]
fn test_offset_closes_small_holes() {
    let backend = KernelBackend::default();
    let shape = Shape::with_holes(
        Ring::rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0)),
        vec![Ring::rectangle(Point::new(4.0, 4.0), Point::new(6.0, 6.0))],
    );
    let result = backend.offset(&shape, 1.5).unwrap();
    assert_eq!(result.len(), 1);
    assert!(result[0].holes.is_empty());
}

#[test]
fn test_union_merges_overlapping_squares() {
    let backend = KernelBackend::default();
    let a = Shape::new(Ring::rectangle(Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
    let b = Shape::new(Ring::rectangle(Point::new(5.0, 0.0), Point::new(15.0, 10.0)));
    let merged = backend.union(&[a, b]).unwrap();
    assert_eq!(merged.len(), 1);
    assert!((merged[0].exterior.signed_area() - 150.0).abs() < 1e-6);
}

#[test]
fn test_union_keeps_disjoint_regions() {
    let backend = KernelBackend::default();
    let a = Shape::new(Ring::rectangle(Point::new(0.0, 0.0), Point::new(1.0, 1.0)));
    let b = Shape::new(Ring::rectangle(Point::new(5.0, 5.0), Point::new(6.0, 6.0)));
    assert_eq!(backend.union(&[a, b]).unwrap().len(), 2);
    assert!(backend.union(&[]).unwrap().is_empty());
}

#[test]
fn test_default_polyline_operations() {
    let backend = KernelBackend::default();
    let path = square_shape().exterior.to_path();
    assert_eq!(backend.interpolate(&path, 15.0), Some(Point::new(10.0, 5.0)));
    let (head, tail) = backend.cut_at(&path, 15.0).unwrap();
    assert!((head.length() - 15.0).abs() < 1e-12);
    assert!((tail.length() - 25.0).abs() < 1e-12);
    assert_eq!(backend.line_merge(&[head, tail]).len(), 1);
}

fn regular_polygon(n: usize, radius: f64, cx: f64, cy: f64) -> Shape {
    let step = std::f64::consts::TAU / n as f64;
    Shape::new(Ring::new((0..n).map(|i| {
        let a = step * i as f64;
        Point::new(cx + radius * a.cos(), cy + radius * a.sin())
    })))
}

proptest! {
    #[test]
    fn prop_convex_offset_is_tight(
        n in 3usize..10,
        radius in 2.0f64..50.0,
        cx in -100.0f64..100.0,
        cy in -100.0f64..100.0,
        tool in 0.1f64..3.0,
    ) {
        let backend = KernelBackend::default();
        let shape = regular_polygon(n, radius, cx, cy);
        let r = tool / 2.0;
        let result = backend.offset(&shape, r).unwrap();
        prop_assert_eq!(result.len(), 1);

        let ring = &result[0].exterior;
        let mut closest = f64::INFINITY;
        for (a, b) in ring.segments() {
            for p in [a, a.lerp(&b, 0.5)] {
                let d = distance_to_ring(p, &shape.exterior);
                prop_assert!(d >= r - 1e-6, "point {:?} at {} < {}", p, d, r);
                closest = closest.min(d);
            }
        }
        prop_assert!(closest < r + 1e-6);
    }
}
