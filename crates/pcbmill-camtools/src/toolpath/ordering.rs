//! Nearest-neighbour ordering of paths and drill hits.

use pcbmill_core::{DrillHit, Path, Point};

/// Greedy tour: from `start`, repeatedly take the item whose entry point is
/// closest to the exit point of the previous one.
pub fn order_by_nearest<T>(
    items: Vec<T>,
    start: Point,
    entry: impl Fn(&T) -> Point,
    exit: impl Fn(&T) -> Point,
) -> Vec<T> {
    let mut remaining = items;
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut cursor = start;

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, item) in remaining.iter().enumerate() {
            let d = cursor.distance_to(&entry(item));
            if d < best_distance {
                best = i;
                best_distance = d;
            }
        }
        let item = remaining.swap_remove(best);
        cursor = exit(&item);
        ordered.push(item);
    }
    ordered
}

pub fn order_paths(paths: Vec<Path>, start: Point) -> Vec<Path> {
    order_by_nearest(
        paths,
        start,
        |p| p.first().copied().unwrap_or_default(),
        |p| p.last().copied().unwrap_or_default(),
    )
}

pub fn order_drills(hits: Vec<DrillHit>, start: Point) -> Vec<DrillHit> {
    order_by_nearest(hits, start, |h| h.position, |h| h.position)
}
