//! In-place structural edits: adding and removing edges, offsetting,
//! transforming, mirroring and re-linking.

use crate::edge::{Edge2, Edge3, Line2, SegmentRegion};
use crate::errors::PolygonError;
use crate::float_types::Real;
use crate::plane::Plane;
use crate::polygon::{EdgeIndices, Polygon, PolygonFlags};
use crate::vertex::Vertex;
use nalgebra::{Matrix4, Point3, Vector2, Vector3};
use tracing::debug;

/// Scale amounts below this are treated as no-ops.
const MIN_SCALE: Real = 0.001;

/// Append `edge` to indexed buffers, reusing an existing vertex at either
/// endpoint position. Self-loops are not added.
pub(crate) fn append_edge(vertices: &mut Vec<Vertex>, edges: &mut Vec<EdgeIndices>, edge: &Edge3) {
    let mut index_of = |v: &Vertex| match vertices.iter().position(|o| o.is_equivalent(v)) {
        Some(i) => i,
        None => {
            vertices.push(*v);
            vertices.len() - 1
        },
    };
    let a = index_of(&edge.start);
    let b = index_of(&edge.end);
    if a != b {
        edges.push([a, b]);
    }
}

impl Polygon {
    /// Add a directed edge, reusing vertices already at its endpoints.
    pub fn add_edge(&mut self, edge: &Edge3) {
        let (vertices, edges) = self.buffers_mut();
        append_edge(vertices, edges, edge);
    }

    /// Planar texture projection along the dominant axis of the plane normal.
    pub fn reset_uvs(&mut self) {
        let n = self.plane().normal;
        let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
        for vertex in self.vertices_mut() {
            let p = vertex.pos;
            vertex.uv = if az >= ax && az >= ay {
                Vector2::new(p.x * n.z.signum(), -p.y)
            } else if ax >= ay {
                Vector2::new(-p.y * n.x.signum(), -p.z)
            } else {
                Vector2::new(p.x * n.y.signum(), -p.z)
            };
        }
    }

    /// Offset every edge along its exterior normal by `amount` (positive grows).
    ///
    /// New corners are the intersections of neighbouring offset lines. With
    /// `check_boundary` the result is rejected when an edge would flip, two
    /// non-adjacent edges would cross, or a hole would leave its outer loop.
    pub fn scale(&mut self, amount: Real, check_boundary: bool) -> Result<(), PolygonError> {
        if amount.abs() < MIN_SCALE {
            return Ok(());
        }
        if !self.is_valid() {
            return Err(PolygonError::Invalid);
        }
        if self.is_open() {
            return Err(PolygonError::OpenOperand);
        }

        let topology = self.topology();
        let plane = *self.plane();
        let count = self.edge_count();
        let lines = (0..count)
            .map(|i| topology.line_of(i).map(|line| line.offset(amount)))
            .collect::<Option<Vec<Line2>>>()
            .ok_or(PolygonError::Degenerate { edges: count })?;

        let corner = |own: usize, other: Option<usize>, at: usize| {
            let fallback = || {
                let p = plane.w2p(&self.vertices()[at].pos);
                p + lines[own].normal * amount
            };
            let p = other.and_then(|o| lines[own].intersect(&lines[o])).unwrap_or_else(fallback);
            Vertex::new(plane.p2w(&p), self.vertices()[at].uv)
        };

        let mut moved = Vec::with_capacity(count);
        for (i, &[a, b]) in self.edges().iter().enumerate() {
            let (prev, next) = topology.adjacent(i);
            moved.push(Edge3::new(corner(i, prev, a), corner(i, next, b)));
        }

        if check_boundary {
            self.check_scaled_edges(&moved)?;
        }

        let mut scaled = self.blank_like();
        scaled.commit_edges(&moved)?;
        if check_boundary {
            check_holes_inside(&scaled)?;
        }
        if scaled.is_open() {
            debug!(polygon = self.id().get(), amount, "Scaled polygon came apart");
            return Err(PolygonError::OpenOperand);
        }
        self.set_flags(scaled.flags());
        let (vertices, edges) = scaled.buffers_mut();
        let (vertices, edges) = (std::mem::take(vertices), std::mem::take(edges));
        self.set_geometry(vertices, edges);
        Ok(())
    }

    fn check_scaled_edges(&self, moved: &[Edge3]) -> Result<(), PolygonError> {
        let plane = self.plane();
        for (old, new) in self.edges_3d().zip(moved) {
            let before = old.end.pos - old.start.pos;
            let after = new.end.pos - new.start.pos;
            if before.dot(&after) <= 0.0 {
                return Err(PolygonError::BoundaryViolation("an edge would flip direction"));
            }
        }

        let flat: Vec<Edge2> = moved.iter().map(|e| e.to_2d(plane)).collect();
        let topology = self.topology();
        for i in 0..flat.len() {
            let (prev, next) = topology.adjacent(i);
            let [a, b] = self.edges()[i];
            for j in i + 1..flat.len() {
                let [c, d] = self.edges()[j];
                let adjacent = Some(j) == prev || Some(j) == next || a == c || a == d || b == c || b == d;
                if !adjacent && flat[i].intersects(&flat[j]) {
                    return Err(PolygonError::BoundaryViolation("scaled edges would cross"));
                }
            }
        }
        Ok(())
    }

    /// Move every vertex by `offset`; the plane follows.
    pub fn translate(&mut self, offset: &Vector3<Real>) {
        for vertex in self.vertices_mut() {
            vertex.pos += offset;
        }
        let mut plane = *self.plane();
        plane.w = match self.vertices().first() {
            Some(v) => plane.normal.dot(&v.pos.coords),
            None => plane.w + plane.normal.dot(offset),
        };
        self.set_plane(plane);
    }

    /// Apply an affine transform.
    ///
    /// The plane is refitted from the transformed outline when it can be walked
    /// as one chain of at least three vertices, otherwise carried through the
    /// inverse transpose of `matrix`. Either way the loops keep their winding
    /// relative to the new plane.
    pub fn transform(&mut self, matrix: &Matrix4<Real>) -> Result<(), PolygonError> {
        let linked: Option<Vec<Point3<Real>>> = self
            .linked_vertices()
            .filter(|ring| ring.len() >= 3)
            .map(|ring| ring.iter().map(|v| matrix.transform_point(&v.pos)).collect());

        let plane = match linked.as_deref().and_then(Plane::from_positions) {
            Some(plane) => plane,
            None => {
                let mut plane = self
                    .plane()
                    .transformed(matrix)
                    .ok_or(PolygonError::UnsupportedTransform)?;
                if matrix.fixed_view::<3, 3>(0, 0).clone_owned().determinant() < 0.0 {
                    plane.flip();
                }
                plane
            },
        };

        for vertex in self.vertices_mut() {
            vertex.pos = matrix.transform_point(&vertex.pos);
        }
        self.set_plane(plane);
        Ok(())
    }

    /// Insert a vertex at `pos`, returning its index.
    ///
    /// An existing edge start at `pos` is reused. Otherwise the nearest edge
    /// whose closest point to `pos` is interior is split there.
    pub fn insert_vertex(&mut self, pos: &Point3<Real>) -> Result<usize, PolygonError> {
        let target = Vertex::from_pos(*pos);
        if let Some(&[start, _]) = self
            .edges()
            .iter()
            .find(|e| self.vertices()[e[0]].is_equivalent(&target))
        {
            return Ok(start);
        }

        let nearest = self
            .edges_3d()
            .enumerate()
            .filter_map(|(i, edge)| {
                let (point, region) = edge.nearest_point(pos);
                (region == SegmentRegion::Middle).then(|| (i, (point - pos).norm_squared(), edge))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let Some((index, _, edge)) = nearest else {
            return Err(PolygonError::NoNearbyEdge(*pos));
        };

        let t = edge.parameter_of(pos);
        let uv = edge.start.interpolate(&edge.end, t).uv;
        let (vertices, edges) = self.buffers_mut();
        let new_index = vertices.len();
        vertices.push(Vertex::new(*pos, uv));
        let old_end = edges[index][1];
        edges[index][1] = new_index;
        edges.push([new_index, old_end]);
        Ok(new_index)
    }

    /// Remove the stretch of boundary covered by `segment`, keeping the
    /// uncovered remainders of partially overlapped edges.
    pub fn remove_edge(&mut self, segment: &Edge3) -> Result<(), PolygonError> {
        let mut kept = Vec::with_capacity(self.edge_count());
        for edge in self.edges_3d() {
            if edge.is_equivalent_undirected(segment) {
                continue;
            }
            match edge.subtract(segment) {
                Some(rest) => kept.extend(rest),
                None => kept.push(edge),
            }
        }
        let mut trimmed = self.blank_like();
        trimmed.commit_edges(&kept)?;
        self.adopt(trimmed);
        Ok(())
    }

    /// Remove edge `index`, then optimize.
    pub fn remove_edge_at(&mut self, index: usize) -> Result<(), PolygonError> {
        if index >= self.edge_count() {
            return Err(PolygonError::OutOfRange {
                index,
                len: self.edge_count(),
            });
        }
        let mut edges = self.edges().to_vec();
        edges.remove(index);
        self.commit_optimized(self.vertices().to_vec(), edges)
    }

    /// Reverse every edge and the edge order.
    pub fn reverse_edges(&mut self) {
        let edges = self.edges_mut();
        edges.reverse();
        for edge in edges.iter_mut() {
            edge.swap(0, 1);
        }
    }

    /// Turn the polygon to face the other way.
    pub fn flip(&mut self) {
        self.reverse_edges();
        let plane = self.plane().inverted();
        self.set_plane(plane);
    }

    /// Reflect through `mirror`; outer loops stay counter-clockwise about the
    /// reflected plane.
    pub fn mirror(&mut self, mirror: &Plane) {
        for vertex in self.vertices_mut() {
            vertex.pos = mirror.mirror_point(&vertex.pos);
        }
        self.reverse_edges();
        self.add_flags(PolygonFlags::MIRRORED);
        let plane = mirror.mirror_plane(self.plane());
        self.set_plane(plane);
    }

    /// Join an open polyline that shares an end point with this one.
    pub fn concatenate(&mut self, other: &Polygon) -> Result<(), PolygonError> {
        if !self.is_open() || !other.is_open() {
            return Err(PolygonError::NotOpen);
        }
        let mine = (self.first_vertex(), self.last_vertex());
        let theirs = (other.first_vertex(), other.last_vertex());
        let same = |a: Option<Vertex>, b: Option<Vertex>| matches!((a, b), (Some(a), Some(b)) if a.is_equivalent(&b));

        let reverse = if same(mine.0, theirs.0) || same(mine.1, theirs.1) {
            true
        } else if same(mine.0, theirs.1) || same(mine.1, theirs.0) {
            false
        } else {
            return Err(PolygonError::NoSharedEndpoint);
        };

        let mut vertices = self.vertices().to_vec();
        let mut edges = self.edges().to_vec();
        for edge in other.edges_3d() {
            let edge = if reverse { edge.inverted() } else { edge };
            append_edge(&mut vertices, &mut edges, &edge);
        }
        self.commit_optimized(vertices, edges)
    }

    /// Append another polygon's vertices and edges unchanged.
    pub fn attach(&mut self, other: &Polygon) {
        let (vertices, edges) = self.buffers_mut();
        let base = vertices.len();
        vertices.extend_from_slice(other.vertices());
        edges.extend(other.edges().iter().map(|&[a, b]| [a + base, b + base]));
    }

    /// Store vertices in walk order with consecutive edges.
    pub fn rearrange(&mut self) -> Result<(), PolygonError> {
        let closed = !self.is_open();
        let (order, ok) = self.topology().linked_vertices();
        if !ok || order.is_empty() {
            return Err(PolygonError::Invalid);
        }
        let vertices: Vec<Vertex> = order.iter().map(|&i| self.vertices()[i]).collect();
        let n = vertices.len();
        let mut edges: Vec<EdgeIndices> = (0..n.saturating_sub(1)).map(|i| [i, i + 1]).collect();
        if closed && n > 2 {
            edges.push([n - 1, 0]);
        }
        self.set_geometry(vertices, edges);
        Ok(())
    }

    /// Keep only the outer loop when the polygon has exactly one.
    pub fn remove_all_holes(&mut self) -> bool {
        let loops = self.loops();
        if loops.holes.is_empty() || loops.outers.len() != 1 {
            return false;
        }
        let outer = &loops.outers[0].polygon;
        let (vertices, edges) = (outer.vertices().to_vec(), outer.edges().to_vec());
        self.set_geometry(vertices, edges);
        true
    }

    /// Some edge is paired with its exact reverse.
    pub fn has_bridge_edges(&self) -> bool {
        self.edges().iter().any(|&[a, b]| self.edges().contains(&[b, a]))
    }

    /// Drop every edge paired with its reverse, then optimize.
    pub fn remove_bridge_edges(&mut self) -> Result<(), PolygonError> {
        let edges: Vec<EdgeIndices> = self
            .edges()
            .iter()
            .filter(|&&[a, b]| !self.edges().contains(&[b, a]))
            .copied()
            .collect();
        self.commit_optimized(self.vertices().to_vec(), edges)
    }

    /// Make the outer walk counter-clockwise about the plane normal.
    pub fn modify_orientation(&mut self) {
        if self.is_valid() && !self.is_open() && !self.is_ccw() {
            self.reverse_edges();
        }
    }

    /// Take over another polygon's geometry and flags.
    fn adopt(&mut self, mut other: Polygon) {
        self.set_flags(other.flags());
        let (vertices, edges) = other.buffers_mut();
        let (vertices, edges) = (std::mem::take(vertices), std::mem::take(edges));
        self.set_geometry(vertices, edges);
    }
}

/// Every hole lies inside some outer loop.
fn check_holes_inside(polygon: &Polygon) -> Result<(), PolygonError> {
    let loops = polygon.loops();
    for hole in &loops.holes {
        if !loops.outers.iter().any(|outer| outer.polygon.include_all_edges(&hole.polygon)) {
            return Err(PolygonError::BoundaryViolation("a hole would leave its outer loop"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: Real) -> Polygon {
        Polygon::from_positions(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(size, 0.0, 0.0),
            Point3::new(size, size, 0.0),
            Point3::new(0.0, size, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn positive_scale_grows() {
        let mut sq = square(1.0);
        sq.scale(0.5, true).unwrap();
        let xs: Vec<Real> = sq.vertices().iter().map(|v| v.pos.x).collect();
        let min = xs.iter().cloned().fold(Real::MAX, Real::min);
        let max = xs.iter().cloned().fold(Real::MIN, Real::max);
        assert!((min + 0.5).abs() < 1e-9);
        assert!((max - 1.5).abs() < 1e-9);
    }

    #[test]
    fn tiny_scale_is_noop_and_collapse_is_rejected() {
        let mut sq = square(1.0);
        let before = sq.vertices().to_vec();
        sq.scale(0.0005, true).unwrap();
        assert_eq!(sq.vertices(), &before[..]);
        assert!(sq.scale(-0.6, true).is_err());
        assert_eq!(sq.vertices(), &before[..]);
    }

    #[test]
    fn insert_vertex_splits_edge() {
        let mut sq = square(2.0);
        let index = sq.insert_vertex(&Point3::new(1.0, 0.0, 0.0)).unwrap();
        assert_eq!(sq.edge_count(), 5);
        assert_eq!(sq.vertices()[index].pos, Point3::new(1.0, 0.0, 0.0));
        assert!(!sq.is_open());
        assert_eq!(sq.insert_vertex(&Point3::new(0.0, 0.0, 0.0)).unwrap(), 0);
    }

    #[test]
    fn remove_edge_keeps_remainders() {
        let mut sq = square(4.0);
        sq.remove_edge(&Edge3::from_points(Point3::new(1.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)))
            .unwrap();
        assert!(sq.is_open());
        assert_eq!(sq.edge_count(), 5);
    }

    #[test]
    fn mirror_keeps_ccw_and_marks_flag() {
        let mut sq = square(1.0);
        sq.mirror(&Plane::from_normal(Vector3::x(), 2.0));
        assert!(sq.has_flags(PolygonFlags::MIRRORED));
        assert!(sq.is_ccw());
        assert!(sq.vertices().iter().all(|v| v.pos.x >= 3.0 - 1e-9));
    }

    #[test]
    fn concatenate_reverses_when_starts_meet() {
        let plane = Plane::default();
        let a = Polygon::new(
            vec![Vertex::from_pos(Point3::new(0.0, 0.0, 0.0)), Vertex::from_pos(Point3::new(1.0, 0.0, 0.0))],
            plane,
            0,
            false,
        );
        let b = Polygon::new(
            vec![Vertex::from_pos(Point3::new(0.0, 0.0, 0.0)), Vertex::from_pos(Point3::new(0.0, 1.0, 0.0))],
            plane,
            0,
            false,
        );
        let mut joined = a.clone();
        joined.concatenate(&b).unwrap();
        assert_eq!(joined.edge_count(), 2);
        assert_eq!(joined.first_vertex().map(|v| v.pos), Some(Point3::new(0.0, 1.0, 0.0)));
        assert_eq!(joined.last_vertex().map(|v| v.pos), Some(Point3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn bridge_edges_are_detected_and_removed() {
        let mut sq = square(1.0);
        sq.add_edge(&Edge3::from_points(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)));
        sq.add_edge(&Edge3::from_points(Point3::new(1.0, 1.0, 0.0), Point3::new(0.0, 0.0, 0.0)));
        assert!(sq.has_bridge_edges());
        sq.remove_bridge_edges().unwrap();
        assert!(!sq.has_bridge_edges());
        assert_eq!(sq.edge_count(), 4);
    }

    #[test]
    fn translate_moves_plane() {
        let mut sq = square(1.0);
        sq.translate(&Vector3::new(0.0, 0.0, 2.0));
        assert!((sq.plane().w - 2.0).abs() < 1e-9);
    }
}
