//! Boolean operations between coplanar closed polygons.
//!
//! **Algorithm**: each operand's edges are cut by the other operand's
//! [`PlanarPartition`]; the pieces picked by a [`ClipObjective`] are pooled
//! through an epsilon vertex pool, dangling ends are reconnected, edges that
//! cannot be part of a loop are dropped, and the soup is optimized. All work
//! happens in scratch buffers, so a failing operation leaves `self` untouched.

use crate::bsp::{EdgePartition, PlanarPartition};
use crate::edge::Edge3;
use crate::errors::PolygonError;
use crate::polygon::edit::append_edge;
use crate::polygon::optimize::EdgePool;
use crate::polygon::{ClipPolicy, EdgeIndices, Polygon};
use crate::vertex::Vertex;
use hashbrown::HashSet;
use tracing::debug;

/// Which partition buckets of a clipped edge survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClipObjective {
    /// Exterior pieces, optionally with coincident pieces.
    Outside { co_same: bool, co_diff: bool },
    /// Interior pieces, optionally with coincident pieces.
    Inside { co_same: bool, co_diff: bool },
    /// Interior pieces, reversed.
    InsideReversed,
}

impl ClipObjective {
    fn select(self, parts: EdgePartition) -> Vec<Edge3> {
        let EdgePartition {
            positive,
            negative,
            co_same,
            co_diff,
        } = parts;
        let mut selected = Vec::new();
        match self {
            ClipObjective::Outside { co_same: same, co_diff: diff } => {
                selected.extend(positive);
                if same {
                    selected.extend(co_same);
                }
                if diff {
                    selected.extend(co_diff);
                }
            },
            ClipObjective::Inside { co_same: same, co_diff: diff } => {
                selected.extend(negative);
                if same {
                    selected.extend(co_same);
                }
                if diff {
                    selected.extend(co_diff);
                }
            },
            ClipObjective::InsideReversed => selected.extend(negative.iter().map(Edge3::inverted)),
        }
        selected
    }
}

const KEEP_OUTSIDE: ClipObjective = ClipObjective::Outside {
    co_same: true,
    co_diff: false,
};
const KEEP_INSIDE: ClipObjective = ClipObjective::Inside {
    co_same: false,
    co_diff: true,
};
const UNION_OTHER: ClipObjective = ClipObjective::Outside {
    co_same: false,
    co_diff: false,
};
const SUBTRACT_SELF: ClipObjective = ClipObjective::Outside {
    co_same: false,
    co_diff: true,
};

impl Polygon {
    /// Cut every edge by `tree` and pool the pieces `objective` keeps.
    pub(crate) fn clip_into(&self, tree: &PlanarPartition, objective: ClipObjective, pool: &mut EdgePool, tag: u8) {
        for edge in self.edges_3d() {
            let kept = objective.select(tree.partition(&edge));
            pool.extend(kept.iter(), tag);
        }
    }

    /// Both operands valid, closed, on one plane, with partition trees.
    fn operand_trees<'a>(
        &'a self,
        other: &'a Polygon,
    ) -> Result<(&'a PlanarPartition, &'a PlanarPartition), PolygonError> {
        if !self.is_valid() || !other.is_valid() {
            debug!(polygon = self.id().get(), "Rejecting Boolean operation on an invalid operand");
            return Err(PolygonError::Invalid);
        }
        if self.is_open() || other.is_open() {
            debug!(polygon = self.id().get(), "Rejecting Boolean operation on an open operand");
            return Err(PolygonError::OpenOperand);
        }
        if !self.is_plane_equivalent(other) {
            debug!(polygon = self.id().get(), "Rejecting Boolean operation across planes");
            return Err(PolygonError::PlaneMismatch);
        }
        let mine = self.partition().ok_or(PolygonError::Invalid)?;
        let theirs = other.partition().ok_or(PolygonError::Invalid)?;
        Ok((mine, theirs))
    }

    /// Merge `other` into this polygon.
    ///
    /// Two closed polygons are unioned through their partitions. Two open
    /// polylines are concatenated, reversing `other` when its ends would collide
    /// with this one's. An empty `self` becomes a copy of `other`.
    pub fn union_with(&mut self, other: &Polygon) -> Result<(), PolygonError> {
        debug!(
            polygon = self.id().get(),
            edges = self.edge_count(),
            other_edges = other.edge_count(),
            "Union"
        );
        if !other.is_valid() {
            return Err(PolygonError::Invalid);
        }

        if self.is_open() && other.is_open() {
            let reverse = self.should_order_reverse(other);
            let mut vertices = self.vertices().to_vec();
            let mut edges = self.edges().to_vec();
            for edge in other.edges_3d() {
                let edge = if reverse { edge.inverted() } else { edge };
                append_edge(&mut vertices, &mut edges, &edge);
            }
            return self.commit_optimized(vertices, edges);
        }
        if self.is_open() || other.is_open() {
            debug!(polygon = self.id().get(), "Rejecting union of open and closed polygons");
            return Err(PolygonError::OpenOperand);
        }

        if !self.is_valid() {
            self.set_plane(*other.plane());
            self.set_geometry(other.vertices().to_vec(), other.edges().to_vec());
            return Ok(());
        }

        let (vertices, mut edges) = {
            let (mine, theirs) = self.operand_trees(other)?;
            let mut pool = EdgePool::new();
            self.clip_into(theirs, KEEP_OUTSIDE, &mut pool, 0);
            other.clip_into(mine, UNION_OTHER, &mut pool, 0);
            pool.into_parts()
        };
        connect_near_vertices(&vertices, &mut edges);
        remove_unconnected_edges(&mut edges);
        let result = self.commit_optimized(vertices, edges);
        debug!(polygon = self.id().get(), edges = self.edge_count(), ok = result.is_ok(), "Union done");
        result
    }

    /// Remove the area of `other` from this polygon.
    ///
    /// When `other` covers every edge of `self` the polygon is erased and the
    /// call still succeeds.
    pub fn subtract(&mut self, other: &Polygon) -> Result<(), PolygonError> {
        debug!(
            polygon = self.id().get(),
            edges = self.edge_count(),
            other_edges = other.edge_count(),
            "Subtract"
        );
        let pooled = {
            let (mine, theirs) = self.operand_trees(other)?;
            if other.include_all_edges(self) {
                None
            } else {
                let mut pool = EdgePool::new();
                self.clip_into(theirs, SUBTRACT_SELF, &mut pool, 0);
                other.clip_into(mine, ClipObjective::InsideReversed, &mut pool, 0);
                Some(pool.into_parts())
            }
        };

        let Some((vertices, mut edges)) = pooled else {
            debug!(polygon = self.id().get(), "Subtrahend covers the polygon; erasing");
            self.set_geometry(Vec::new(), Vec::new());
            return Ok(());
        };
        connect_near_vertices(&vertices, &mut edges);
        remove_unconnected_edges(&mut edges);
        self.commit_optimized(vertices, edges)
    }

    /// Keep only the area shared with `other`.
    pub fn intersect(&mut self, other: &Polygon, policy: ClipPolicy) -> Result<(), PolygonError> {
        debug!(
            polygon = self.id().get(),
            edges = self.edge_count(),
            other_edges = other.edge_count(),
            ?policy,
            "Intersect"
        );
        let (vertices, edges) = {
            let (mine, theirs) = self.operand_trees(other)?;
            let mut pool = EdgePool::new();
            self.clip_into(
                theirs,
                ClipObjective::Inside {
                    co_same: policy.includes_co_same(),
                    co_diff: false,
                },
                &mut pool,
                0,
            );
            other.clip_into(
                mine,
                ClipObjective::Inside {
                    co_same: false,
                    co_diff: policy.includes_co_diff(),
                },
                &mut pool,
                0,
            );
            pool.into_parts()
        };
        self.commit_optimized(vertices, edges)
    }

    /// Keep the area covered by exactly one of the two polygons.
    ///
    /// The two differences are pooled under different tags so their vertices
    /// stay separate where they only touch.
    pub fn exclusive_or(&mut self, other: &Polygon) -> Result<(), PolygonError> {
        debug!(
            polygon = self.id().get(),
            edges = self.edge_count(),
            other_edges = other.edge_count(),
            "ExclusiveOR"
        );
        let (vertices, mut edges) = {
            let (mine, theirs) = self.operand_trees(other)?;
            let mut pool = EdgePool::new();
            self.clip_into(theirs, SUBTRACT_SELF, &mut pool, 0);
            other.clip_into(mine, ClipObjective::InsideReversed, &mut pool, 0);
            other.clip_into(mine, SUBTRACT_SELF, &mut pool, 1);
            self.clip_into(theirs, ClipObjective::InsideReversed, &mut pool, 1);
            pool.into_parts()
        };
        connect_near_vertices(&vertices, &mut edges);
        remove_unconnected_edges(&mut edges);
        self.commit_optimized(vertices, edges)
    }

    /// Cut away the part of this polygon inside `other`; only this polygon's
    /// edges contribute.
    pub fn clip_inside(&mut self, other: &Polygon) -> Result<(), PolygonError> {
        let (vertices, edges) = {
            let (_, theirs) = self.operand_trees(other)?;
            let mut pool = EdgePool::new();
            self.clip_into(theirs, KEEP_OUTSIDE, &mut pool, 0);
            pool.into_parts()
        };
        self.commit_optimized(vertices, edges)
    }

    /// Cut away the part of this polygon outside `other`; only this polygon's
    /// edges contribute.
    pub fn clip_outside(&mut self, other: &Polygon) -> Result<(), PolygonError> {
        let (vertices, edges) = {
            let (_, theirs) = self.operand_trees(other)?;
            let mut pool = EdgePool::new();
            self.clip_into(theirs, KEEP_INSIDE, &mut pool, 0);
            pool.into_parts()
        };
        self.commit_optimized(vertices, edges)
    }

    /// `other` is equivalent to this polygon, or none of its edges leaves it.
    pub fn include_all_edges(&self, other: &Polygon) -> bool {
        if !self.is_valid() || !self.is_plane_equivalent(other) {
            return false;
        }
        let Some(tree) = self.partition() else {
            return false;
        };
        if self.is_equivalent(other) {
            return true;
        }
        other.edges_3d().all(|edge| tree.is_inside(&edge, false))
    }

    /// Appending `other`'s edges as they are would give a vertex two outgoing
    /// or two incoming edges.
    pub fn should_order_reverse(&self, other: &Polygon) -> bool {
        if !other.is_open() {
            return false;
        }
        other.edges_3d().any(|edge| {
            [edge.start.pos, edge.end.pos].iter().enumerate().any(|(end, pos)| {
                self.vertex_index_of(pos)
                    .is_some_and(|index| self.edges().iter().any(|e| e[end] == index))
            })
        })
    }
}

/// Rewire each edge with no predecessor to start at the nearest unused
/// dangling end.
fn connect_near_vertices(vertices: &[Vertex], edges: &mut [EdgeIndices]) {
    let n = edges.len();
    let no_predecessor: Vec<usize> = (0..n)
        .filter(|&i| !(0..n).any(|k| k != i && edges[i][0] == edges[k][1]))
        .collect();
    let no_successor: Vec<usize> = (0..n)
        .filter(|&i| !(0..n).any(|k| k != i && edges[i][1] == edges[k][0]))
        .collect();
    if no_predecessor.is_empty() || no_successor.is_empty() {
        return;
    }

    let mut used: HashSet<usize> = HashSet::new();
    for &start in &no_predecessor {
        if used.contains(&start) {
            continue;
        }
        let from = vertices[edges[start][0]].pos;
        let nearest = no_successor
            .iter()
            .filter(|end| !used.contains(*end))
            .map(|&end| (end, (vertices[edges[end][1]].pos - from).norm()))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((end, _)) = nearest {
            edges[start][0] = edges[end][1];
            used.insert(start);
            used.insert(end);
        }
    }
}

/// Repeatedly drop edges lacking a predecessor or successor other than their
/// own reverse.
fn remove_unconnected_edges(edges: &mut Vec<EdgeIndices>) {
    loop {
        let n = edges.len();
        let keep: Vec<bool> = (0..n)
            .map(|i| {
                let e = edges[i];
                let mut has_prev = false;
                let mut has_next = false;
                for (k, other) in edges.iter().enumerate() {
                    if k == i || (other[0] == e[1] && other[1] == e[0]) {
                        continue;
                    }
                    has_prev |= other[1] == e[0];
                    has_next |= other[0] == e[1];
                }
                has_prev && has_next
            })
            .collect();
        if keep.iter().all(|&k| k) {
            return;
        }
        let mut flags = keep.into_iter();
        edges.retain(|_| flags.next().unwrap_or(false));
    }
}
