//! Polyline utilities used by the default [`GeometryBackend`] methods.
//!
//! Everything here works on plain point slices: distance queries,
//! Douglas-Peucker simplification, arc-length interpolation and cutting,
//! and merging of fragments that share endpoints.
//!
//! [`GeometryBackend`]: super::backend::GeometryBackend

use super::{Path, Point, POINT_EPSILON};
use std::collections::HashMap;

/// Closest point to `p` on segment `a`-`b` and its parameter in `[0, 1]`.
pub fn closest_point_on_segment(p: Point, a: Point, b: Point) -> (Point, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq < POINT_EPSILON * POINT_EPSILON {
        return (a, 0.0);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    (a.lerp(&b, t), t)
}

pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let (closest, _) = closest_point_on_segment(p, a, b);
    p.distance_to(&closest)
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Proper or touching intersection test for two segments.
pub fn segments_intersect(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    let d1 = cross(b0, b1, a0);
    let d2 = cross(b0, b1, a1);
    let d3 = cross(a0, a1, b0);
    let d4 = cross(a0, a1, b1);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    let on = |o: Point, a: Point, b: Point, d: f64| {
        d.abs() <= POINT_EPSILON && point_segment_distance(o, a, b) <= POINT_EPSILON
    };
    on(a0, b0, b1, d1) || on(a1, b0, b1, d2) || on(b0, a0, a1, d3) || on(b1, a0, a1, d4)
}

pub fn segment_distance(a0: Point, a1: Point, b0: Point, b1: Point) -> f64 {
    if segments_intersect(a0, a1, b0, b1) {
        return 0.0;
    }
    point_segment_distance(a0, b0, b1)
        .min(point_segment_distance(a1, b0, b1))
        .min(point_segment_distance(b0, a0, a1))
        .min(point_segment_distance(b1, a0, a1))
}

/// Minimum distance between two polylines. Empty paths are infinitely far away.
pub fn path_distance(a: &Path, b: &Path) -> f64 {
    let (pa, pb) = (a.points(), b.points());
    if pa.is_empty() || pb.is_empty() {
        return f64::INFINITY;
    }
    let segs = |pts: &[Point]| -> Vec<(Point, Point)> {
        if pts.len() == 1 {
            vec![(pts[0], pts[0])]
        } else {
            pts.windows(2).map(|w| (w[0], w[1])).collect()
        }
    };
    let (sa, sb) = (segs(pa), segs(pb));
    let mut best = f64::INFINITY;
    for &(a0, a1) in &sa {
        for &(b0, b1) in &sb {
            best = best.min(segment_distance(a0, a1, b0, b1));
            if best == 0.0 {
                return 0.0;
            }
        }
    }
    best
}

/// Douglas-Peucker simplification.
///
/// Stack based so long paths cannot exhaust the call stack. The first and
/// last points are always kept, which keeps closed paths closed.
pub fn douglas_peucker(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() <= 2 || tolerance <= 0.0 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    let mut stack = vec![(0, points.len() - 1)];

    while let Some((anchor_idx, floater_idx)) = stack.pop() {
        if anchor_idx + 1 >= floater_idx {
            continue;
        }
        let anchor = points[anchor_idx];
        let floater = points[floater_idx];

        let mut max_dist = 0.0;
        let mut furthest_idx = anchor_idx;
        for (i, p) in points
            .iter()
            .enumerate()
            .take(floater_idx)
            .skip(anchor_idx + 1)
        {
            let dist = point_segment_distance(*p, anchor, floater);
            if dist > max_dist {
                max_dist = dist;
                furthest_idx = i;
            }
        }

        if max_dist > tolerance {
            keep[furthest_idx] = true;
            stack.push((anchor_idx, furthest_idx));
            stack.push((furthest_idx, floater_idx));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Drop the first vertex of a ring (given without its closing point) when
/// it lies within `tolerance` of the chord between its neighbours.
///
/// Douglas-Peucker always keeps the endpoints, so a ring that was opened
/// in the middle of a straight edge keeps that split after simplification.
pub fn trim_seam(points: &[Point], tolerance: f64) -> Vec<Point> {
    let n = points.len();
    if n <= 3 {
        return points.to_vec();
    }
    if point_segment_distance(points[0], points[n - 1], points[1]) <= tolerance {
        points[1..].to_vec()
    } else {
        points.to_vec()
    }
}

/// Point at arc length `distance` along the path, clamped to its ends.
pub fn interpolate(points: &[Point], distance: f64) -> Option<Point> {
    let first = *points.first()?;
    if distance <= 0.0 {
        return Some(first);
    }
    let mut travelled = 0.0;
    for w in points.windows(2) {
        let seg = w[0].distance_to(&w[1]);
        if travelled + seg >= distance {
            if seg <= POINT_EPSILON {
                return Some(w[1]);
            }
            return Some(w[0].lerp(&w[1], (distance - travelled) / seg));
        }
        travelled += seg;
    }
    points.last().copied()
}

/// Split a path at arc length `distance`.
///
/// Returns `None` when the cut would fall on or outside either end.
pub fn cut_at(points: &[Point], distance: f64) -> Option<(Vec<Point>, Vec<Point>)> {
    let total: f64 = points.windows(2).map(|w| w[0].distance_to(&w[1])).sum();
    if points.len() < 2 || distance <= 0.0 || distance >= total {
        return None;
    }

    let mut travelled = 0.0;
    for (i, w) in points.windows(2).enumerate() {
        let seg = w[0].distance_to(&w[1]);
        let end = travelled + seg;
        if (end - distance).abs() <= POINT_EPSILON {
            return Some((points[..=i + 1].to_vec(), points[i + 1..].to_vec()));
        }
        if end > distance {
            let cut = w[0].lerp(&w[1], (distance - travelled) / seg);
            let mut head = points[..=i].to_vec();
            head.push(cut);
            let mut tail = vec![cut];
            tail.extend_from_slice(&points[i + 1..]);
            return Some((head, tail));
        }
        travelled = end;
    }
    None
}

type NodeKey = (i64, i64);

fn node_key(p: &Point) -> NodeKey {
    const GRID: f64 = 1e6;
    ((p.x * GRID).round() as i64, (p.y * GRID).round() as i64)
}

/// Join fragments whose endpoints meet at nodes shared by exactly two
/// fragment ends. Chains that come back to their own start are closed.
pub fn line_merge(paths: &[Path]) -> Vec<Path> {
    let mut pieces: Vec<Option<Vec<Point>>> = paths
        .iter()
        .filter(|p| p.len() >= 2)
        .map(|p| Some(p.points().to_vec()))
        .collect();

    let mut degree: HashMap<NodeKey, usize> = HashMap::new();
    for piece in pieces.iter().flatten() {
        for end in [piece[0], piece[piece.len() - 1]] {
            *degree.entry(node_key(&end)).or_default() += 1;
        }
    }

    let mut merged = Vec::new();
    for i in 0..pieces.len() {
        let Some(mut chain) = pieces[i].take() else {
            continue;
        };

        // extend forward, then backward
        for forward in [true, false] {
            loop {
                let first = chain[0];
                let last = chain[chain.len() - 1];
                if chain.len() > 2 && first.approx_eq(&last, 1e-6) {
                    break;
                }
                let tip = if forward { last } else { first };
                let key = node_key(&tip);
                if degree.get(&key).copied() != Some(2) {
                    break;
                }
                let found = pieces.iter().position(|p| {
                    p.as_ref().is_some_and(|p| {
                        node_key(&p[0]) == key || node_key(&p[p.len() - 1]) == key
                    })
                });
                let Some(j) = found else {
                    break;
                };
                let Some(mut next) = pieces[j].take() else {
                    break;
                };
                if forward {
                    if node_key(&next[0]) != key {
                        next.reverse();
                    }
                    chain.extend_from_slice(&next[1..]);
                } else {
                    if node_key(&next[next.len() - 1]) != key {
                        next.reverse();
                    }
                    next.extend_from_slice(&chain[1..]);
                    chain = next;
                }
            }
        }
        merged.push(Path::new(chain));
    }
    merged
}
