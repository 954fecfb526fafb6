//! Connectivity queries over an indexed edge soup.
//!
//! The same walks run on a polygon's own buffers and on the scratch buffers the
//! Boolean engine fills before committing, so they borrow slices instead of a
//! `Polygon`.

use crate::edge::Line2;
use crate::float_types::Real;
use crate::plane::Plane;
use crate::polygon::EdgeIndices;
use crate::vertex::Vertex;
use nalgebra::Vector2;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Topology<'a> {
    pub vertices: &'a [Vertex],
    pub edges: &'a [EdgeIndices],
    pub plane: &'a Plane,
}

impl<'a> Topology<'a> {
    pub const fn new(vertices: &'a [Vertex], edges: &'a [EdgeIndices], plane: &'a Plane) -> Self {
        Topology { vertices, edges, plane }
    }

    /// Edges starting at `vertex`.
    pub fn outgoing(&self, vertex: usize) -> Vec<usize> {
        (0..self.edges.len()).filter(|&i| self.edges[i][0] == vertex).collect()
    }

    /// Edges ending at `vertex`.
    pub fn incoming(&self, vertex: usize) -> Vec<usize> {
        (0..self.edges.len()).filter(|&i| self.edges[i][1] == vertex).collect()
    }

    fn index_of(&self, edge: EdgeIndices) -> Option<usize> {
        self.edges.iter().position(|e| *e == edge)
    }

    /// Previous and next edge of `edge_index`, ignoring its own reverse.
    ///
    /// Branching vertices are resolved by [`Self::choose_prev`] and
    /// [`Self::choose_next`].
    pub fn adjacent(&self, edge_index: usize) -> (Option<usize>, Option<usize>) {
        let Some(&edge) = self.edges.get(edge_index) else {
            return (None, None);
        };
        let reverse = [edge[1], edge[0]];

        let mut before = self.incoming(edge[0]);
        if let Some(pos) = before.iter().position(|&i| self.edges[i] == reverse) {
            before.remove(pos);
        }
        let prev = match before.len() {
            0 => None,
            1 => Some(before[0]),
            _ => {
                let candidates: Vec<usize> = before.iter().map(|&i| self.edges[i][0]).collect();
                self.choose_prev(edge, &candidates)
                    .and_then(|v| self.index_of([v, edge[0]]))
            },
        };

        let mut after = self.outgoing(edge[1]);
        if let Some(pos) = after.iter().position(|&i| self.edges[i] == reverse) {
            after.remove(pos);
        }
        let next = match after.len() {
            0 => None,
            1 => Some(after[0]),
            _ => {
                let candidates: Vec<usize> = after.iter().map(|&i| self.edges[i][1]).collect();
                self.choose_next(edge, &candidates)
                    .and_then(|v| self.index_of([edge[1], v]))
            },
        };

        (prev, next)
    }

    /// Some edge lacks a predecessor or successor.
    pub fn is_open(&self) -> bool {
        (0..self.edges.len()).any(|i| {
            let (prev, next) = self.adjacent(i);
            prev.is_none() || next.is_none()
        })
    }

    /// Cosine of the angle at `i1` between `i0` and `i2`, and the sign of the
    /// turn (`> 0` when `i1→i2` lies counter-clockwise of `i1→i0`, a right
    /// turn for a walker arriving from `i0`).
    fn turn(&self, i0: usize, i1: usize, i2: usize) -> (Real, Real) {
        let p0 = self.plane.w2p(&self.vertices[i0].pos);
        let p1 = self.plane.w2p(&self.vertices[i1].pos);
        let p2 = self.plane.w2p(&self.vertices[i2].pos);
        let a = (p0 - p1).try_normalize(Real::EPSILON).unwrap_or_else(Vector2::zeros);
        let b = (p2 - p1).try_normalize(Real::EPSILON).unwrap_or_else(Vector2::zeros);
        (a.dot(&b), a.x * b.y - a.y * b.x)
    }

    /// Pick the far vertex of the next edge at a branching vertex: the
    /// sharpest right turn, else the straightest left turn.
    pub fn choose_next(&self, edge: EdgeIndices, candidates: &[usize]) -> Option<usize> {
        let mut unique = candidates.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut right: Option<(usize, Real)> = None;
        let mut left: Option<(usize, Real)> = None;
        for c in unique {
            if c == edge[0] {
                continue;
            }
            let (cosine, cross) = self.turn(edge[0], edge[1], c);
            if cross > 0.0 {
                if right.is_none_or(|(_, best)| cosine > best) {
                    right = Some((c, cosine));
                }
            } else if left.is_none_or(|(_, best)| cosine < best) {
                left = Some((c, cosine));
            }
        }
        right.or(left).map(|(v, _)| v)
    }

    /// Mirror of [`Self::choose_next`] for walking backwards.
    pub fn choose_prev(&self, edge: EdgeIndices, candidates: &[usize]) -> Option<usize> {
        let mut unique = candidates.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut clockwise: Option<(usize, Real)> = None;
        let mut other: Option<(usize, Real)> = None;
        for c in unique {
            if c == edge[1] {
                continue;
            }
            let (cosine, cross) = self.turn(edge[1], edge[0], c);
            if cross < 0.0 {
                if clockwise.is_none_or(|(_, best)| cosine > best) {
                    clockwise = Some((c, cosine));
                }
            } else if other.is_none_or(|(_, best)| cosine < best) {
                other = Some((c, cosine));
            }
        }
        clockwise.or(other).map(|(v, _)| v)
    }

    /// Vertex indices in walk order and whether the walk succeeded.
    ///
    /// Open soups start at an edge with no predecessor. Closed soups start at
    /// an edge touching the vertex with the smallest plane `x`. The walk is
    /// capped by the edge count and succeeds when it closes or visits every edge.
    pub fn linked_vertices(&self) -> (Vec<usize>, bool) {
        let Some(&first) = self.edges.first() else {
            return (Vec::new(), false);
        };
        let mut edge = first;

        if self.is_open() {
            if let Some(start) = (0..self.edges.len()).find(|&i| {
                !(0..self.edges.len()).any(|k| k != i && self.edges[i][0] == self.edges[k][1])
            }) {
                edge = self.edges[start];
            }
        } else {
            let leftmost = self
                .vertices
                .iter()
                .enumerate()
                .map(|(i, v)| (i, self.plane.w2p(&v.pos).x))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);
            if let Some(v) = leftmost {
                if let Some(e) = self.edges.iter().find(|e| e[0] == v || e[1] == v) {
                    edge = *e;
                }
            }
        }

        let entry = edge;
        let mut out = Vec::with_capacity(self.edges.len() + 1);
        let mut counter = 0;

        while out.len() < self.edges.len() && counter < self.edges.len() {
            counter += 1;
            let next = self.outgoing(edge[1]);
            if next.is_empty() {
                if edge[0] == edge[1] {
                    return (out, false);
                }
                out.push(edge[0]);
                out.push(edge[1]);
                return (out, true);
            }
            out.push(edge[0]);

            if next.len() == 1 {
                edge = self.edges[next[0]];
            } else {
                let candidates: Vec<usize> = next.iter().map(|&i| self.edges[i][1]).collect();
                match self.choose_next(edge, &candidates) {
                    Some(v) => edge = [edge[1], v],
                    None => break,
                }
            }

            if edge == entry {
                return (out, true);
            }
        }

        let complete = out.len() == self.edges.len();
        (out, complete)
    }

    /// Plane-space line carrying an edge.
    pub fn line_of(&self, edge_index: usize) -> Option<Line2> {
        let e = self.edges.get(edge_index)?;
        let a = self.plane.w2p(&self.vertices[e[0]].pos);
        let b = self.plane.w2p(&self.vertices[e[1]].pos);
        Line2::through(&a, &b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn verts(points: &[(Real, Real)]) -> Vec<Vertex> {
        points.iter().map(|&(x, y)| Vertex::from_pos(Point3::new(x, y, 0.0))).collect()
    }

    #[test]
    fn square_walk_closes() {
        let vertices = verts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let edges = vec![[0, 1], [1, 2], [2, 3], [3, 0]];
        let plane = Plane::default();
        let topo = Topology::new(&vertices, &edges, &plane);
        assert!(!topo.is_open());
        let (linked, ok) = topo.linked_vertices();
        assert!(ok);
        assert_eq!(linked.len(), 4);
        assert_eq!(topo.adjacent(1), (Some(0), Some(2)));
    }

    #[test]
    fn branching_prefers_rightmost_turn() {
        // Walker arrives at (1,0) heading +x; right turn goes to (1,-1).
        let vertices = verts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (1.0, -1.0), (2.0, 0.0)]);
        let edges = vec![[0, 1], [1, 2], [1, 3], [1, 4]];
        let plane = Plane::default();
        let topo = Topology::new(&vertices, &edges, &plane);
        assert_eq!(topo.choose_next([0, 1], &[2, 3, 4]), Some(3));
        assert_eq!(topo.choose_next([0, 1], &[2, 4]), Some(4));
    }

    #[test]
    fn polyline_is_open_and_walks_from_its_start() {
        let vertices = verts(&[(0.0, 0.0), (1.0, 0.0), (2.0, 1.0)]);
        let edges = vec![[1, 2], [0, 1]];
        let plane = Plane::default();
        let topo = Topology::new(&vertices, &edges, &plane);
        assert!(topo.is_open());
        let (linked, ok) = topo.linked_vertices();
        assert!(ok);
        assert_eq!(linked, vec![0, 1, 2]);
    }
}
