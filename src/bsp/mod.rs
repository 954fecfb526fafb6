//! 2D [BSP](https://en.wikipedia.org/wiki/Binary_space_partitioning) partition over the
//! edges of a planar polygon.
//!
//! Lines are the right-hand perpendicular convention of [`Line2`]: with outer
//! loops counter-clockwise about the plane normal, the positive side of every
//! splitting line is the exterior and the negative side the interior. The tree
//! is built once from a polygon's edges and then answers point and edge
//! containment queries for the Boolean engine.

pub mod node;

pub use node::{Node, Side, split_edge};

use crate::edge::{Edge3, Line2};
use crate::float_types::{Real, tolerance};
use crate::plane::Plane;
use nalgebra::{Point2, Point3};
use tracing::{trace, warn};

/// Point containment verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Inside,
    Outside,
    Border,
}

/// How an edge or polygon meets a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionKind {
    /// No shared point.
    None,
    /// Only boundaries touch; no part enters the interior.
    JustTouch,
    /// Some part lies strictly inside.
    Intersection,
}

/// An edge cut into pieces by a partition tree.
#[derive(Debug, Clone, Default)]
pub struct EdgePartition {
    /// Pieces strictly on the exterior side.
    pub positive: Vec<Edge3>,
    /// Pieces strictly on the interior side.
    pub negative: Vec<Edge3>,
    /// Pieces on a boundary edge running the same way.
    pub co_same: Vec<Edge3>,
    /// Pieces on a boundary edge running the opposite way.
    pub co_diff: Vec<Edge3>,
}

impl EdgePartition {
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty() && self.co_same.is_empty() && self.co_diff.is_empty()
    }

    fn extend(&mut self, other: EdgePartition) {
        self.positive.extend(other.positive);
        self.negative.extend(other.negative);
        self.co_same.extend(other.co_same);
        self.co_diff.extend(other.co_diff);
    }
}

/// Destination of a piece of an edge crossing a coincident node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlap {
    Same,
    Opposite,
    Free,
}

/// Arena-backed partition tree over coplanar edges.
#[derive(Debug, Clone)]
pub struct PlanarPartition {
    plane: Plane,
    nodes: Vec<Node>,
}

impl PlanarPartition {
    /// Build a tree from the edges of a polygon lying on `plane`.
    ///
    /// The first usable edge of each bucket defines that node's line. The tree
    /// is not rebalanced. Zero-length edges are ignored; an empty edge set yields
    /// an empty tree that reports every point as outside.
    pub fn build(plane: &Plane, edges: &[Edge3]) -> Self {
        let mut nodes: Vec<Node> = Vec::new();
        let input: Vec<Edge3> = edges.iter().filter(|e| !e.is_point()).copied().collect();
        if input.is_empty() {
            warn!("Building a partition from {} edges, none usable", edges.len());
            return Self { plane: *plane, nodes };
        }

        // (parent index, attach to positive side, edges)
        let mut stack: Vec<(Option<(usize, bool)>, Vec<Edge3>)> = vec![(None, input)];

        while let Some((parent, bucket)) = stack.pop() {
            let mut splitter = None;
            for (i, edge) in bucket.iter().enumerate() {
                let e2 = edge.to_2d(plane);
                if let Some(line) = Line2::through(&e2.start, &e2.end) {
                    splitter = Some((i, line));
                    break;
                }
            }
            let Some((first, line)) = splitter else {
                trace!("Dropping {} edges too short to define a line", bucket.len());
                continue;
            };

            let index = nodes.len();
            let mut node = Node::new(line);
            let mut positive = Vec::new();
            let mut negative = Vec::new();

            for (i, edge) in bucket.into_iter().enumerate() {
                if i == first {
                    node.coincident.push(edge);
                    continue;
                }
                match split_edge(&line, plane, &edge) {
                    Side::Coincident => node.coincident.push(edge),
                    Side::Positive => positive.push(edge),
                    Side::Negative => negative.push(edge),
                    Side::Spanning {
                        positive: p,
                        negative: n,
                    } => {
                        positive.push(p);
                        negative.push(n);
                    },
                }
            }
            nodes.push(node);

            if let Some((parent, on_positive)) = parent {
                if on_positive {
                    nodes[parent].positive = Some(index);
                } else {
                    nodes[parent].negative = Some(index);
                }
            }
            if !positive.is_empty() {
                stack.push((Some((index, true)), positive));
            }
            if !negative.is_empty() {
                stack.push((Some((index, false)), negative));
            }
        }

        Self { plane: *plane, nodes }
    }

    pub const fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Every stored edge piece; together they cover the input exactly once.
    pub fn edges(&self) -> impl Iterator<Item = &Edge3> {
        self.nodes.iter().flat_map(|n| n.coincident.iter())
    }

    /// Classify a world-space point lying on the plane.
    pub fn classify(&self, point: &Point3<Real>) -> Classification {
        self.classify_2d(&self.plane.w2p(point))
    }

    /// Classify a point in plane coordinates.
    ///
    /// A point on a node's line but off its coincident edges is `Border` when
    /// either side of that node sees it as not `Outside`.
    pub fn classify_2d(&self, point: &Point2<Real>) -> Classification {
        if self.nodes.is_empty() {
            return Classification::Outside;
        }
        self.classify_from(Some(0), Classification::Outside, point)
    }

    /// Descend from `start`; a missing subtree answers `missing`.
    fn classify_from(&self, start: Option<usize>, missing: Classification, point: &Point2<Real>) -> Classification {
        let Some(mut index) = start else {
            return missing;
        };
        let eps = tolerance();
        loop {
            let node = &self.nodes[index];
            let d = node.line.signed_distance(point);
            if d > eps {
                match node.positive {
                    Some(child) => index = child,
                    None => return Classification::Outside,
                }
            } else if d < -eps {
                match node.negative {
                    Some(child) => index = child,
                    None => return Classification::Inside,
                }
            } else {
                if node.coincident.iter().any(|e| e.to_2d(&self.plane).contains(point)) {
                    return Classification::Border;
                }
                let front = self.classify_from(node.positive, Classification::Outside, point);
                let back = self.classify_from(node.negative, Classification::Inside, point);
                return if front != Classification::Outside || back != Classification::Outside {
                    Classification::Border
                } else {
                    Classification::Outside
                };
            }
        }
    }

    /// Cut `edge` into positive, negative and coincident pieces.
    pub fn partition(&self, edge: &Edge3) -> EdgePartition {
        let mut result = EdgePartition::default();
        if self.nodes.is_empty() || edge.is_point() {
            result.positive.push(*edge);
            return result;
        }

        let mut stack = vec![(0usize, *edge)];
        while let Some((index, piece)) = stack.pop() {
            let node = &self.nodes[index];
            match split_edge(&node.line, &self.plane, &piece) {
                Side::Positive => match node.positive {
                    Some(child) => stack.push((child, piece)),
                    None => result.positive.push(piece),
                },
                Side::Negative => match node.negative {
                    Some(child) => stack.push((child, piece)),
                    None => result.negative.push(piece),
                },
                Side::Spanning { positive, negative } => {
                    match node.positive {
                        Some(child) => stack.push((child, positive)),
                        None => result.positive.push(positive),
                    }
                    match node.negative {
                        Some(child) => stack.push((child, negative)),
                        None => result.negative.push(negative),
                    }
                },
                Side::Coincident => {
                    for (overlap, part) in split_by_coincident(&piece, &node.coincident) {
                        match overlap {
                            Overlap::Same => result.co_same.push(part),
                            Overlap::Opposite => result.co_diff.push(part),
                            Overlap::Free => match node.positive {
                                Some(child) => stack.push((child, part)),
                                None => result.positive.push(part),
                            },
                        }
                    }
                },
            }
        }
        result
    }

    /// Partition every edge of a set and pool the pieces.
    pub fn partition_all<'a, I>(&self, edges: I) -> EdgePartition
    where
        I: IntoIterator<Item = &'a Edge3>,
    {
        let mut pooled = EdgePartition::default();
        for edge in edges {
            pooled.extend(self.partition(edge));
        }
        pooled
    }

    /// Some part of `edge` lies strictly inside.
    pub fn has_intersection(&self, edge: &Edge3) -> bool {
        !self.nodes.is_empty() && !self.partition(edge).negative.is_empty()
    }

    /// Three-valued intersection of `edge` with the region.
    pub fn intersection(&self, edge: &Edge3) -> IntersectionKind {
        if self.nodes.is_empty() {
            return IntersectionKind::None;
        }
        let parts = self.partition(edge);
        if !parts.negative.is_empty() {
            IntersectionKind::Intersection
        } else if !parts.co_same.is_empty() || !parts.co_diff.is_empty() {
            IntersectionKind::JustTouch
        } else {
            IntersectionKind::None
        }
    }

    /// No part of `edge` lies outside. With `exclude_opposite`, pieces running
    /// against a boundary edge also count as outside.
    pub fn is_inside(&self, edge: &Edge3, exclude_opposite: bool) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let parts = self.partition(edge);
        parts.positive.is_empty() && (!exclude_opposite || parts.co_diff.is_empty())
    }

    /// `edge` lies entirely on the boundary.
    pub fn is_on_edge(&self, edge: &Edge3) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let parts = self.partition(edge);
        parts.positive.is_empty() && parts.negative.is_empty() && !(parts.co_same.is_empty() && parts.co_diff.is_empty())
    }
}

/// Cut a piece lying on a node's line by the node's coincident edges.
///
/// Breakpoints are the coincident edges' endpoints projected into the piece's
/// own parameter space; adjacent sub-pieces with the same destination are merged.
fn split_by_coincident(piece: &Edge3, coincident: &[Edge3]) -> Vec<(Overlap, Edge3)> {
    let length = piece.length();
    let eps_t = tolerance() / length.max(Real::EPSILON);
    let direction = piece.end.pos - piece.start.pos;

    let intervals: Vec<(Real, Real, Overlap)> = coincident
        .iter()
        .filter_map(|c| {
            let ta = piece.parameter_of(&c.start.pos);
            let tb = piece.parameter_of(&c.end.pos);
            let (lo, hi) = if ta <= tb { (ta, tb) } else { (tb, ta) };
            let (lo, hi) = (lo.max(0.0), hi.min(1.0));
            if hi - lo <= eps_t {
                return None;
            }
            let kind = if direction.dot(&(c.end.pos - c.start.pos)) > 0.0 {
                Overlap::Same
            } else {
                Overlap::Opposite
            };
            Some((lo, hi, kind))
        })
        .collect();

    if intervals.is_empty() {
        return vec![(Overlap::Free, *piece)];
    }

    let mut breaks: Vec<Real> = vec![0.0, 1.0];
    for (lo, hi, _) in &intervals {
        breaks.push(*lo);
        breaks.push(*hi);
    }
    breaks.sort_by(|a, b| a.total_cmp(b));
    breaks.dedup_by(|a, b| (*a - *b).abs() <= eps_t);

    let mut spans: Vec<(Real, Real, Overlap)> = Vec::new();
    for pair in breaks.windows(2) {
        let (t0, t1) = (pair[0], pair[1]);
        if t1 - t0 <= eps_t {
            continue;
        }
        let mid = 0.5 * (t0 + t1);
        let kind = intervals
            .iter()
            .find(|(lo, hi, _)| *lo <= mid && mid <= *hi)
            .map_or(Overlap::Free, |(_, _, k)| *k);
        match spans.last_mut() {
            Some(last) if last.2 == kind && (last.1 - t0).abs() <= eps_t => last.1 = t1,
            _ => spans.push((t0, t1, kind)),
        }
    }

    spans
        .into_iter()
        .map(|(t0, t1, kind)| {
            let part = if t0 <= eps_t && t1 >= 1.0 - eps_t {
                *piece
            } else {
                piece.sub_edge(t0, t1)
            };
            (kind, part)
        })
        .collect()
}
