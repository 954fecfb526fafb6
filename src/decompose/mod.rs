//! Polygon decomposition into triangles and convex pieces.
//!
//! # Algorithms
//!
//! - **Fan**: convex, hole-free loops are fanned from an apex that gives no
//!   zero-area triangle.
//! - **Monotone sweep**: everything else is split into y-monotone pieces by
//!   diagonals at split and merge vertices, and each piece is triangulated by
//!   the two-chain stack sweep. Holes are handled in the same sweep.
//! - **Hertel-Mehlhorn**: triangles are merged greedily across diagonals while
//!   the merged piece stays convex. The result has at most four times the
//!   optimal number of convex pieces.
//!
//! All pieces index the polygon's own vertex array; no vertices are created.

mod convex;
mod monotone;

use crate::float_types::{Real, tolerance};
use crate::loops::Island;
use crate::polygon::Polygon;
use nalgebra::Point2;
use tracing::{debug, trace};

/// A triangle over polygon vertex indices, counter-clockwise about the plane
/// normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triangle {
    pub indices: [usize; 3],
    pub material_id: i32,
}

impl Triangle {
    /// Same triangle seen from the back.
    pub const fn reversed(&self) -> Triangle {
        let [a, b, c] = self.indices;
        Triangle {
            indices: [a, c, b],
            material_id: self.material_id,
        }
    }
}

/// A convex piece over polygon vertex indices, counter-clockwise about the
/// plane normal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convex {
    pub indices: Vec<usize>,
    pub material_id: i32,
}

/// One ring of an island in plane coordinates, with the source index of every
/// point.
#[derive(Debug, Clone)]
pub(crate) struct Ring {
    pub points: Vec<Point2<Real>>,
    pub sources: Vec<usize>,
}

/// Twice the signed area of triangle `a, b, c`.
#[inline]
pub(crate) fn orient(a: &Point2<Real>, b: &Point2<Real>, c: &Point2<Real>) -> Real {
    crate::edge::orient2d(a, b, c)
}

/// Area threshold below which a triangle counts as degenerate.
#[inline]
pub(crate) fn area_epsilon() -> Real {
    tolerance() * tolerance()
}

pub struct Decomposer;

impl Decomposer {
    /// Triangulate every island of `polygon`.
    ///
    /// Open or empty polygons give no triangles. Faces that come out
    /// degenerate are dropped.
    pub fn triangulate(polygon: &Polygon) -> Vec<Triangle> {
        if !polygon.is_valid() || polygon.is_open() {
            return Vec::new();
        }
        let material_id = polygon.material_id();
        let loops = polygon.loops();
        let mut triangles = Vec::new();

        for island in &loops.islands {
            let (outer, holes) = island_rings(polygon, island);
            let faces = if holes.is_empty() {
                fan(&outer).unwrap_or_else(|| monotone::triangulate(&outer, &holes))
            } else {
                monotone::triangulate(&outer, &holes)
            };
            trace!(
                polygon = polygon.id().get(),
                outer = outer.points.len(),
                holes = holes.len(),
                triangles = faces.len(),
                "Triangulated island"
            );
            triangles.extend(faces.into_iter().map(|indices| Triangle { indices, material_id }));
        }

        debug!(polygon = polygon.id().get(), triangles = triangles.len(), "Triangulated polygon");
        triangles
    }

    /// Merge `triangles` of `polygon` into convex pieces.
    pub fn merge_convex(polygon: &Polygon, triangles: &[Triangle]) -> Vec<Convex> {
        convex::merge(polygon, triangles)
    }

    /// Triangulate, then merge into convex pieces.
    pub fn decompose_to_convexes(polygon: &Polygon) -> Vec<Convex> {
        let triangles = Self::triangulate(polygon);
        Self::merge_convex(polygon, &triangles)
    }
}

/// Outer ring and hole rings of an island, in plane coordinates.
fn island_rings(polygon: &Polygon, island: &Island) -> (Ring, Vec<Ring>) {
    let loops = polygon.loops();
    let plane = polygon.plane();
    let ring = |indices: &[usize]| Ring {
        points: indices
            .iter()
            .map(|&i| plane.w2p(&polygon.vertices()[i].pos))
            .collect(),
        sources: indices.to_vec(),
    };
    let outer = ring(&loops.outers[island.outer].indices);
    let holes = island
        .holes
        .iter()
        .map(|&h| ring(&loops.holes[h].indices))
        .collect();
    (outer, holes)
}

/// Fan a convex ring from the first apex that yields no degenerate triangle.
/// `None` when the ring is not convex or no apex works.
fn fan(ring: &Ring) -> Option<Vec<[usize; 3]>> {
    let n = ring.points.len();
    if n < 3 {
        return None;
    }
    let eps = area_epsilon();
    let p = &ring.points;
    let convex = (0..n).all(|i| orient(&p[i], &p[(i + 1) % n], &p[(i + 2) % n]) >= -eps);
    if !convex {
        return None;
    }

    (0..n).find_map(|apex| {
        let fan: Vec<[usize; 3]> = (1..n - 1)
            .map(|i| [apex, (apex + i) % n, (apex + i + 1) % n])
            .collect();
        fan.iter()
            .all(|&[a, b, c]| orient(&p[a], &p[b], &p[c]) > eps)
            .then(|| {
                fan.into_iter()
                    .map(|[a, b, c]| [ring.sources[a], ring.sources[b], ring.sources[c]])
                    .collect()
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_skips_apex_on_collinear_run() {
        // Square with an extra point on the bottom edge; apex 0 would give a
        // zero-area triangle
        let ring = Ring {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(2.0, 2.0),
                Point2::new(0.0, 2.0),
            ],
            sources: vec![10, 11, 12, 13, 14],
        };
        let faces = fan(&ring).unwrap();
        assert_eq!(faces.len(), 3);
        assert!(faces.iter().all(|f| f.contains(&11)));
    }

    #[test]
    fn reflex_ring_is_not_fanned() {
        let ring = Ring {
            points: vec![
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 0.0),
                Point2::new(1.0, 0.5),
                Point2::new(2.0, 2.0),
                Point2::new(0.0, 2.0),
            ],
            sources: (0..5).collect(),
        };
        assert!(fan(&ring).is_none());
    }
}
