//! Edge-soup cleanup run after every Boolean operation and structural edit.
//!
//! The pass snaps near-equal coordinates, drops self-loops and duplicate edges,
//! collapses zero-length edges, merges collinear chains and finally compacts
//! the vertex list into edge order. It works on scratch buffers; the polygon is
//! only touched once everything succeeded.

use crate::edge::Edge3;
use crate::errors::PolygonError;
use crate::float_types::{Real, tolerance};
use crate::plane::Plane;
use crate::polygon::topology::Topology;
use crate::polygon::{EdgeIndices, Polygon, PolygonFlags};
use crate::vertex::Vertex;
use hashbrown::{HashMap, HashSet};
use tracing::{trace, warn};

/// Quantized spatial hash for epsilon vertex identity.
///
/// Vertices closer than the tolerance and sharing a pooling tag map to the
/// first one inserted.
#[derive(Debug, Default)]
pub(crate) struct VertexPool {
    vertices: Vec<Vertex>,
    cells: HashMap<[i64; 3], Vec<usize>>,
}

impl VertexPool {
    fn cell_of(vertex: &Vertex) -> [i64; 3] {
        let inv = 1.0 / tolerance();
        [
            (vertex.pos.x * inv).floor() as i64,
            (vertex.pos.y * inv).floor() as i64,
            (vertex.pos.z * inv).floor() as i64,
        ]
    }

    /// Index of an equivalent pooled vertex, if any.
    pub fn find(&self, vertex: &Vertex) -> Option<usize> {
        let [cx, cy, cz] = Self::cell_of(vertex);
        let mut best: Option<usize> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&[cx + dx, cy + dy, cz + dz]) else {
                        continue;
                    };
                    for &i in bucket {
                        let other = &self.vertices[i];
                        if other.tag == vertex.tag && other.is_equivalent(vertex) && best.is_none_or(|b| i < b) {
                            best = Some(i);
                        }
                    }
                }
            }
        }
        best
    }

    /// Pool `vertex`, returning the index of its representative.
    pub fn insert(&mut self, vertex: Vertex) -> usize {
        if let Some(existing) = self.find(&vertex) {
            return existing;
        }
        let index = self.vertices.len();
        self.cells.entry(Self::cell_of(&vertex)).or_default().push(index);
        self.vertices.push(vertex);
        index
    }

    pub fn into_vertices(self) -> Vec<Vertex> {
        self.vertices
    }
}

/// Vertex pool plus the directed edges built on it, skipping self-loops and
/// exact duplicates.
#[derive(Debug, Default)]
pub(crate) struct EdgePool {
    vertices: VertexPool,
    edges: Vec<EdgeIndices>,
    seen: HashSet<EdgeIndices>,
}

impl EdgePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edge: &Edge3, tag: u8) {
        let a = self.vertices.insert(edge.start.with_tag(tag));
        let b = self.vertices.insert(edge.end.with_tag(tag));
        if a == b || !self.seen.insert([a, b]) {
            return;
        }
        self.edges.push([a, b]);
    }

    pub fn extend<'a, I>(&mut self, edges: I, tag: u8)
    where
        I: IntoIterator<Item = &'a Edge3>,
    {
        for edge in edges {
            self.push(edge, tag);
        }
    }

    pub fn into_parts(self) -> (Vec<Vertex>, Vec<EdgeIndices>) {
        (self.vertices.into_vertices(), self.edges)
    }
}

/// Snap each coordinate axis independently: a value within tolerance of one
/// seen earlier takes that earlier value.
fn snap_coordinates(vertices: &mut [Vertex]) {
    let eps = tolerance();
    let inv = 1.0 / eps;
    for axis in 0..3 {
        let mut seen: HashMap<i64, Vec<(usize, Real)>> = HashMap::new();
        let mut order = 0usize;
        for vertex in vertices.iter_mut() {
            let value = vertex.pos[axis];
            let key = (value * inv).floor() as i64;
            let mut best: Option<(usize, Real)> = None;
            for k in key - 1..=key + 1 {
                if let Some(bucket) = seen.get(&k) {
                    for &(seq, v) in bucket {
                        if v != value && (v - value).abs() < eps && best.is_none_or(|(s, _)| seq < s) {
                            best = Some((seq, v));
                        }
                    }
                }
            }
            match best {
                Some((_, snapped)) => vertex.pos[axis] = snapped,
                None => {
                    seen.entry(key).or_default().push((order, value));
                    order += 1;
                },
            }
        }
    }
}

/// Drop self-loop edges and later exact duplicates.
fn remove_edges_having_same_indices(edges: &mut Vec<EdgeIndices>) {
    let mut seen = HashSet::with_capacity(edges.len());
    edges.retain(|e| e[0] != e[1] && seen.insert(*e));
}

/// Collapse zero-length edges: the edge is removed and its neighbours are
/// rewired to a fresh copy of its start vertex.
fn remove_edges_regarded_as_vertex(vertices: &mut Vec<Vertex>, edges: &mut Vec<EdgeIndices>) {
    let mut i = 0;
    while i < edges.len() {
        let edge = edges[i];
        if edge[0] >= vertices.len() || edge[1] >= vertices.len() || !vertices[edge[0]].is_equivalent(&vertices[edge[1]]) {
            i += 1;
            continue;
        }
        edges.remove(i);
        let merged = vertices.len();
        vertices.push(vertices[edge[0]]);
        for other in edges.iter_mut() {
            if other[0] == edge[1] {
                other[0] = merged;
            } else if other[1] == edge[0] {
                other[1] = merged;
            }
        }
    }
}

/// Follow collinear neighbours of `edge_index` in one direction.
fn linked_collinear_edges(topology: &Topology<'_>, edge_index: usize, forward: bool) -> Vec<usize> {
    let mut out = Vec::new();
    let Some(line) = topology.line_of(edge_index) else {
        return out;
    };
    let mut current = edge_index;
    for _ in 0..topology.edges.len() {
        let (prev, next) = topology.adjacent(current);
        let Some(adjacent) = (if forward { next } else { prev }) else {
            break;
        };
        match topology.line_of(adjacent) {
            Some(other) if line.is_equivalent(&other) => {},
            _ => break,
        }
        if adjacent == edge_index {
            break;
        }
        current = adjacent;
        out.push(current);
    }
    out
}

/// Replace every chain of collinear edges by one edge spanning it.
fn flatten_edges(vertices: &[Vertex], edges: &mut Vec<EdgeIndices>, plane: &Plane) -> Result<(), PolygonError> {
    let topology = Topology::new(vertices, edges, plane);
    let mut used: HashSet<usize> = HashSet::new();
    let mut flattened = Vec::with_capacity(edges.len());

    for i in 0..edges.len() {
        if used.contains(&i) {
            continue;
        }
        let backward = linked_collinear_edges(&topology, i, false);
        let forward = linked_collinear_edges(&topology, i, true);
        for &index in backward.iter().chain(forward.iter()) {
            if !used.insert(index) {
                warn!(edge = index, "Collinear merge reached an edge twice");
                return Err(PolygonError::EdgeReused(index));
            }
        }
        let first = backward.last().copied().unwrap_or(i);
        let last = forward.last().copied().unwrap_or(i);
        flattened.push([edges[first][0], edges[last][1]]);
    }

    *edges = flattened;
    Ok(())
}

/// Renumber vertices in order of first use by the edges, dropping orphans.
fn compact_vertices(vertices: &mut Vec<Vertex>, edges: &mut [EdgeIndices]) {
    let mut remap: HashMap<usize, usize> = HashMap::with_capacity(vertices.len());
    let mut compacted = Vec::with_capacity(vertices.len());
    for edge in edges.iter_mut() {
        for index in edge.iter_mut() {
            let old = *index;
            *index = *remap.entry(old).or_insert_with(|| {
                compacted.push(vertices[old]);
                compacted.len() - 1
            });
        }
    }
    *vertices = compacted;
}

/// Run the full cleanup over scratch buffers.
///
/// Fails when no edge survives, when a closed result keeps fewer than three
/// edges, or when a collinear merge would consume an edge twice.
pub(crate) fn optimize_buffers(
    vertices: &mut Vec<Vertex>,
    edges: &mut Vec<EdgeIndices>,
    plane: &Plane,
) -> Result<(), PolygonError> {
    snap_coordinates(vertices);
    remove_edges_having_same_indices(edges);
    remove_edges_regarded_as_vertex(vertices, edges);
    flatten_edges(vertices, edges, plane)?;
    compact_vertices(vertices, edges);
    for vertex in vertices.iter_mut() {
        vertex.tag = 0;
    }

    if edges.is_empty() {
        return Err(PolygonError::Degenerate { edges: 0 });
    }
    if edges.len() < 3 && !Topology::new(vertices, edges, plane).is_open() {
        return Err(PolygonError::Degenerate { edges: edges.len() });
    }
    trace!(vertices = vertices.len(), edges = edges.len(), "Optimized edge soup");
    Ok(())
}

impl Polygon {
    /// Clean up the polygon in place. On failure the polygon is unchanged.
    pub fn optimize(&mut self) -> Result<(), PolygonError> {
        let vertices = self.vertices().to_vec();
        let edges = self.edges().to_vec();
        self.commit_optimized(vertices, edges)
    }

    /// Optimize scratch buffers and, on success, make them this polygon's geometry.
    pub(crate) fn commit_optimized(
        &mut self,
        mut vertices: Vec<Vertex>,
        mut edges: Vec<EdgeIndices>,
    ) -> Result<(), PolygonError> {
        if let Err(error) = optimize_buffers(&mut vertices, &mut edges, self.plane()) {
            warn!(polygon = self.id().get(), %error, "Optimize failed; keeping previous geometry");
            return Err(error);
        }
        if vertices.len() != 4 || edges.len() != 4 {
            self.remove_flags(PolygonFlags::NONPLANAR_QUAD);
        }
        self.set_geometry(vertices, edges);
        Ok(())
    }

    /// Pool a list of 3D edges and optimize them into this polygon.
    pub(crate) fn commit_edges(&mut self, edges: &[Edge3]) -> Result<(), PolygonError> {
        let mut pool = EdgePool::new();
        pool.extend(edges, 0);
        let (vertices, indices) = pool.into_parts();
        self.commit_optimized(vertices, indices)
    }
}
