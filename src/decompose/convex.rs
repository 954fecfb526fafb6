//! Hertel-Mehlhorn merge of a triangulation into convex pieces.

use super::{Convex, Triangle, area_epsilon, orient};
use crate::float_types::Real;
use crate::polygon::Polygon;
use hashbrown::{HashMap, HashSet};
use nalgebra::Point2;
use tracing::trace;

type EdgeKey = (usize, usize);

#[inline]
fn key(a: usize, b: usize) -> EdgeKey {
    if a < b { (a, b) } else { (b, a) }
}

fn ring_edges(ring: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
    (0..ring.len()).map(move |i| (ring[i], ring[(i + 1) % ring.len()]))
}

/// Join `a` and `b` across their shared edge `x-y`. `a` walks `x -> y` and
/// `b` walks `y -> x`.
fn join(a: &[usize], b: &[usize], diagonal: EdgeKey) -> Option<Vec<usize>> {
    let i = ring_edges(a).position(|(p, q)| key(p, q) == diagonal)?;
    let (x, y) = (a[i], a[(i + 1) % a.len()]);
    let j = ring_edges(b).position(|(p, q)| p == y && q == x)?;

    let mut merged = Vec::with_capacity(a.len() + b.len() - 2);
    merged.extend((1..=a.len()).map(|k| a[(i + k) % a.len()]));
    merged.extend((2..b.len()).map(|k| b[(j + k) % b.len()]));
    Some(merged)
}

fn is_convex(ring: &[usize], points: &[Point2<Real>]) -> bool {
    let n = ring.len();
    let eps = area_epsilon();
    (0..n).all(|k| {
        orient(
            &points[ring[k]],
            &points[ring[(k + 1) % n]],
            &points[ring[(k + 2) % n]],
        ) >= -eps
    })
}

/// Greedily drop diagonals of `triangles` while the piece they would form
/// stays convex.
pub(crate) fn merge(polygon: &Polygon, triangles: &[Triangle]) -> Vec<Convex> {
    let material_id = polygon.material_id();
    let plane = polygon.plane();
    let points: Vec<Point2<Real>> = polygon.vertices().iter().map(|v| plane.w2p(&v.pos)).collect();
    let boundary: HashSet<EdgeKey> = polygon.edges().iter().map(|e| key(e[0], e[1])).collect();

    let mut pieces: Vec<Option<Vec<usize>>> = triangles.iter().map(|t| Some(t.indices.to_vec())).collect();
    let mut owners: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
    let mut diagonals: Vec<EdgeKey> = Vec::new();
    for (piece, triangle) in triangles.iter().enumerate() {
        for (a, b) in ring_edges(&triangle.indices) {
            let edge = key(a, b);
            let entry = owners.entry(edge).or_default();
            if entry.is_empty() && !boundary.contains(&edge) {
                diagonals.push(edge);
            }
            entry.push(piece);
        }
    }

    let mut removed = 0usize;
    for diagonal in diagonals {
        let Some(&[a, b]) = owners.get(&diagonal).map(Vec::as_slice) else {
            continue;
        };
        if a == b {
            continue;
        }
        let (Some(ring_a), Some(ring_b)) = (&pieces[a], &pieces[b]) else {
            continue;
        };
        let Some(merged) = join(ring_a, ring_b, diagonal) else {
            continue;
        };
        if !is_convex(&merged, &points) {
            continue;
        }

        if let Some(old_b) = pieces[b].take() {
            for (p, q) in ring_edges(&old_b) {
                if let Some(list) = owners.get_mut(&key(p, q)) {
                    for owner in list.iter_mut().filter(|o| **o == b) {
                        *owner = a;
                    }
                }
            }
        }
        owners.remove(&diagonal);
        pieces[a] = Some(merged);
        removed += 1;
    }

    trace!(
        polygon = polygon.id().get(),
        triangles = triangles.len(),
        removed,
        "Merged triangles into convex pieces"
    );
    pieces
        .into_iter()
        .flatten()
        .map(|indices| Convex { indices, material_id })
        .collect()
}
