//! Planar polygons with holes or open polylines, stored as a vertex list plus
//! directed index edges, with lazily rebuilt derived data.

pub mod boolean;
pub mod clip_plane;
pub mod edit;
pub mod flags;
pub mod io;
pub mod optimize;
pub mod query;
pub(crate) mod topology;

pub use clip_plane::PlaneClip;
pub use flags::{ClipPolicy, PolygonFlags};

use crate::bsp::PlanarPartition;
use crate::decompose::{Convex, Triangle};
use crate::edge::{Edge2, Edge3};
use crate::errors::PolygonError;
use crate::float_types::{Real, parry3d::bounding_volume::Aabb, tolerance};
use crate::loops::{LoopExtractor, Loops};
use crate::plane::Plane;
use crate::traits::BooleanOps;
use crate::vertex::Vertex;
use nalgebra::{Matrix4, Point3};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use topology::Topology;
use tracing::debug;

/// Directed edge as a `[start, end]` pair of vertex indices.
pub type EdgeIndices = [usize; 2];

/// Identity of a polygon instance. Clones receive a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolygonId(u64);

static NEXT_POLYGON_ID: AtomicU64 = AtomicU64::new(1);

impl PolygonId {
    fn next() -> Self {
        PolygonId(NEXT_POLYGON_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Shape properties derived from the loop structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ShapeFlags {
    pub has_holes: bool,
    pub convex: bool,
}

/// Derived data owned by one polygon; reset on every mutation.
#[derive(Debug, Default)]
pub(crate) struct Caches {
    pub open: OnceLock<bool>,
    pub shape: OnceLock<ShapeFlags>,
    pub partition: OnceLock<Option<PlanarPartition>>,
    pub bounding_box: OnceLock<Aabb>,
    pub loops: OnceLock<Loops>,
    pub triangles: OnceLock<Vec<Triangle>>,
    pub convexes: OnceLock<Vec<Convex>>,
    pub representative: OnceLock<Point3<Real>>,
}

/// A planar polygon: vertices, directed edges, the plane they lie on, a
/// material id and flags.
///
/// Closed polygons give every vertex one incoming and one outgoing edge, except
/// where a bridge edge pair joins a hole to its outer loop. Outer loops run
/// counter-clockwise about the plane normal and holes clockwise. Open polygons
/// are polylines with at least one dangling end.
#[derive(Debug)]
pub struct Polygon {
    id: PolygonId,
    vertices: Vec<Vertex>,
    edges: Vec<EdgeIndices>,
    plane: Plane,
    material_id: i32,
    flags: PolygonFlags,
    cache: Caches,
}

impl Clone for Polygon {
    fn clone(&self) -> Self {
        Polygon {
            id: PolygonId::next(),
            vertices: self.vertices.clone(),
            edges: self.edges.clone(),
            plane: self.plane,
            material_id: self.material_id,
            flags: self.flags,
            cache: Caches::default(),
        }
    }
}

impl Polygon {
    /// Polygon through `vertices` in order, closed back to the first vertex
    /// unless `closed` is false.
    pub fn new(vertices: Vec<Vertex>, plane: Plane, material_id: i32, closed: bool) -> Self {
        let n = vertices.len();
        let mut edges: Vec<EdgeIndices> = (0..n.saturating_sub(1)).map(|i| [i, i + 1]).collect();
        if closed && n > 2 {
            edges.push([n - 1, 0]);
        }
        Self::from_parts(vertices, edges, plane, material_id, PolygonFlags::empty())
    }

    /// Polygon from explicit edges. Every index must address a vertex.
    pub fn with_edges(
        vertices: Vec<Vertex>,
        edges: Vec<EdgeIndices>,
        plane: Plane,
        material_id: i32,
    ) -> Result<Self, PolygonError> {
        for edge in &edges {
            for &index in edge {
                if index >= vertices.len() {
                    return Err(PolygonError::OutOfRange {
                        index,
                        len: vertices.len(),
                    });
                }
            }
        }
        Ok(Self::from_parts(vertices, edges, plane, material_id, PolygonFlags::empty()))
    }

    /// Closed polygon through `positions`, with the plane fitted by Newell's method.
    pub fn from_positions(positions: &[Point3<Real>]) -> Result<Self, PolygonError> {
        let plane = Plane::from_positions(positions).ok_or(PolygonError::Invalid)?;
        let vertices = positions.iter().map(|p| Vertex::from_pos(*p)).collect();
        let mut polygon = Self::new(vertices, plane, 0, true);
        polygon.reset_uvs();
        Ok(polygon)
    }

    /// A polygon with no geometry, used as the target of a Union.
    pub fn empty(plane: Plane) -> Self {
        Self::from_parts(Vec::new(), Vec::new(), plane, 0, PolygonFlags::empty())
    }

    pub(crate) fn from_parts(
        vertices: Vec<Vertex>,
        edges: Vec<EdgeIndices>,
        plane: Plane,
        material_id: i32,
        flags: PolygonFlags,
    ) -> Self {
        Polygon {
            id: PolygonId::next(),
            vertices,
            edges,
            plane,
            material_id,
            flags,
            cache: Caches::default(),
        }
    }

    /// An empty polygon carrying this one's plane, material and flags.
    pub(crate) fn blank_like(&self) -> Self {
        Self::from_parts(Vec::new(), Vec::new(), self.plane, self.material_id, self.flags)
    }

    pub const fn id(&self) -> PolygonId {
        self.id
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[EdgeIndices] {
        &self.edges
    }

    pub const fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn set_plane(&mut self, plane: Plane) {
        self.plane = plane;
        self.invalidate();
    }

    pub const fn material_id(&self) -> i32 {
        self.material_id
    }

    pub fn set_material_id(&mut self, material_id: i32) {
        self.material_id = material_id;
        self.cache.triangles = OnceLock::new();
        self.cache.convexes = OnceLock::new();
    }

    pub const fn flags(&self) -> PolygonFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: PolygonFlags) {
        self.flags = flags;
    }

    pub fn add_flags(&mut self, flags: PolygonFlags) {
        self.flags.insert(flags);
    }

    pub fn remove_flags(&mut self, flags: PolygonFlags) {
        self.flags.remove(flags);
    }

    pub const fn has_flags(&self, flags: PolygonFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn position(&self, index: usize) -> Option<Point3<Real>> {
        self.vertices.get(index).map(|v| v.pos)
    }

    /// Edge `index` with its endpoint vertices.
    pub fn edge(&self, index: usize) -> Option<Edge3> {
        let [a, b] = *self.edges.get(index)?;
        Some(Edge3::new(self.vertices[a], self.vertices[b]))
    }

    /// Edge `index` projected to plane coordinates.
    pub fn edge_2d(&self, index: usize) -> Option<Edge2> {
        self.edge(index).map(|e| e.to_2d(&self.plane))
    }

    /// All edges with their endpoint vertices, in edge order.
    pub fn edges_3d(&self) -> impl Iterator<Item = Edge3> + '_ {
        self.edges
            .iter()
            .map(|&[a, b]| Edge3::new(self.vertices[a], self.vertices[b]))
    }

    pub(crate) fn topology(&self) -> Topology<'_> {
        Topology::new(&self.vertices, &self.edges, &self.plane)
    }

    /// Drop every cached derived structure.
    pub(crate) fn invalidate(&mut self) {
        self.cache = Caches::default();
    }

    /// Replace vertices and edges wholesale.
    pub(crate) fn set_geometry(&mut self, vertices: Vec<Vertex>, edges: Vec<EdgeIndices>) {
        self.vertices = vertices;
        self.edges = edges;
        self.invalidate();
    }

    pub(crate) fn vertices_mut(&mut self) -> &mut Vec<Vertex> {
        self.invalidate();
        &mut self.vertices
    }

    pub(crate) fn edges_mut(&mut self) -> &mut Vec<EdgeIndices> {
        self.invalidate();
        &mut self.edges
    }

    pub(crate) fn buffers_mut(&mut self) -> (&mut Vec<Vertex>, &mut Vec<EdgeIndices>) {
        self.invalidate();
        (&mut self.vertices, &mut self.edges)
    }

    /// Has at least one vertex and one edge.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.edges.is_empty()
    }

    /// Some edge lacks a predecessor or successor.
    pub fn is_open(&self) -> bool {
        *self.cache.open.get_or_init(|| self.topology().is_open())
    }

    fn shape_flags(&self) -> ShapeFlags {
        *self.cache.shape.get_or_init(|| {
            if !self.is_valid() || self.is_open() {
                return ShapeFlags::default();
            }
            let has_holes = !self.loops().holes.is_empty();
            let convex = if self.edges.len() == 3 {
                true
            } else if has_holes {
                false
            } else {
                self.linked_vertices().is_some_and(|ring| is_convex_ring(&ring, &self.plane))
            };
            ShapeFlags { has_holes, convex }
        })
    }

    pub fn has_holes(&self) -> bool {
        self.shape_flags().has_holes
    }

    /// Closed, hole-free and never turning against the plane normal.
    pub fn is_convex(&self) -> bool {
        self.shape_flags().convex
    }

    /// Partition tree over the edges, or `None` for open, empty or degenerate polygons.
    pub fn partition(&self) -> Option<&PlanarPartition> {
        self.cache
            .partition
            .get_or_init(|| self.build_partition())
            .as_ref()
    }

    fn build_partition(&self) -> Option<PlanarPartition> {
        if !self.is_valid() || self.is_open() {
            return None;
        }
        let mut edges = Vec::with_capacity(self.edges.len());
        for mut edge in self.edges_3d() {
            if edge.is_point() {
                debug!(polygon = self.id.get(), "Zero-length edge blocks partition build");
                return None;
            }
            // Pull near-equal coordinates together so axis-aligned edges stay exact
            for axis in 0..3 {
                let (a, b) = (edge.start.pos[axis], edge.end.pos[axis]);
                if a != b && (a - b).abs() < tolerance() {
                    edge.end.pos[axis] = a;
                }
            }
            edges.push(edge);
        }
        Some(PlanarPartition::build(&self.plane, &edges))
    }

    /// Loop structure of the edge soup.
    pub fn loops(&self) -> &Loops {
        self.cache.loops.get_or_init(|| LoopExtractor::extract(self))
    }

    /// Vertices in linked order, if the edges form a single walkable chain.
    pub fn linked_vertices(&self) -> Option<Vec<Vertex>> {
        let (indices, ok) = self.topology().linked_vertices();
        ok.then(|| indices.into_iter().map(|i| self.vertices[i]).collect())
    }

    /// Previous and next edge of `edge_index`.
    pub fn adjacent_edges(&self, edge_index: usize) -> (Option<usize>, Option<usize>) {
        self.topology().adjacent(edge_index)
    }

    /// The outer walk runs counter-clockwise about the plane normal.
    pub fn is_ccw(&self) -> bool {
        let Some(ring) = self.linked_vertices() else {
            return false;
        };
        if ring.len() < 3 {
            return false;
        }
        let lowest = ring
            .iter()
            .enumerate()
            .map(|(i, v)| (i, self.plane.w2p(&v.pos)))
            .min_by(|a, b| a.1.y.total_cmp(&b.1.y).then(a.1.x.total_cmp(&b.1.x)))
            .map_or(0, |(i, _)| i);
        let n = ring.len();
        let v = ring[lowest].pos;
        let prev = ring[(lowest + n - 1) % n].pos;
        let next = ring[(lowest + 1) % n].pos;
        (prev - v).cross(&(next - v)).dot(&self.plane.normal) < 0.0
    }
}

impl BooleanOps for Polygon {
    type Error = PolygonError;

    fn union(&self, other: &Polygon) -> Result<Polygon, PolygonError> {
        let mut result = self.clone();
        result.union_with(other)?;
        Ok(result)
    }

    fn difference(&self, other: &Polygon) -> Result<Polygon, PolygonError> {
        let mut result = self.clone();
        result.subtract(other)?;
        Ok(result)
    }

    fn intersection(&self, other: &Polygon) -> Result<Polygon, PolygonError> {
        let mut result = self.clone();
        result.intersect(other, ClipPolicy::default())?;
        Ok(result)
    }

    fn xor(&self, other: &Polygon) -> Result<Polygon, PolygonError> {
        let mut result = self.clone();
        result.exclusive_or(other)?;
        Ok(result)
    }

    fn transformed(&self, matrix: &Matrix4<Real>) -> Result<Polygon, PolygonError> {
        let mut result = self.clone();
        result.transform(matrix)?;
        Ok(result)
    }

    fn bounding_box(&self) -> Aabb {
        Polygon::bounding_box(self)
    }

    fn invalidate_bounding_box(&mut self) {
        self.cache.bounding_box = OnceLock::new();
    }

    fn inverse(&self) -> Polygon {
        let mut result = self.clone();
        result.flip();
        result
    }

    fn mirrored(&self, plane: &Plane) -> Result<Polygon, PolygonError> {
        let mut result = self.clone();
        result.mirror(plane);
        Ok(result)
    }
}

/// Every consecutive triple of a closed ring turns with the plane normal
/// (collinear runs allowed).
pub(crate) fn is_convex_ring(ring: &[Vertex], plane: &Plane) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let eps = tolerance() * tolerance();
    (0..n).all(|i| {
        let v0 = ring[i].pos;
        let v1 = ring[(i + 1) % n].pos;
        let v2 = ring[(i + 2) % n].pos;
        (v2 - v1).cross(&(v0 - v1)).dot(&plane.normal) >= -eps
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn square() -> Polygon {
        Polygon::from_positions(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn clone_gets_new_identity() {
        let a = square();
        let b = a.clone();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.vertices(), b.vertices());
    }

    #[test]
    fn square_is_closed_convex_and_ccw() {
        let sq = square();
        assert!((sq.plane().normal - Vector3::z()).norm() < 1e-9);
        assert!(!sq.is_open());
        assert!(sq.is_convex());
        assert!(sq.is_ccw());
        assert!(sq.partition().is_some());
    }

    #[test]
    fn reflex_vertex_is_not_convex() {
        let arrow = Polygon::from_positions(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 0.5, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ])
        .unwrap();
        assert!(!arrow.is_convex());
    }

    #[test]
    fn with_edges_rejects_bad_index() {
        let err = Polygon::with_edges(vec![Vertex::from_pos(Point3::origin())], vec![[0, 3]], Plane::default(), 0);
        assert_eq!(err.unwrap_err(), PolygonError::OutOfRange { index: 3, len: 1 });
    }
}
