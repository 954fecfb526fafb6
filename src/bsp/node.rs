//! Partition tree node data structure and the edge/line split it is built from

use crate::edge::{Edge3, Line2};
use crate::float_types::tolerance;
use crate::plane::Plane;

/// A node of the 2D partition tree, stored in an index-addressed arena.
#[derive(Debug, Clone)]
pub struct Node {
    /// Splitting line in plane coordinates.
    pub line: Line2,

    /// Edges lying on `line`, in either direction.
    pub coincident: Vec<Edge3>,

    /// Arena index of the subtree on the positive (exterior) side.
    pub positive: Option<usize>,

    /// Arena index of the subtree on the negative (interior) side.
    pub negative: Option<usize>,
}

impl Node {
    pub const fn new(line: Line2) -> Self {
        Self {
            line,
            coincident: Vec::new(),
            positive: None,
            negative: None,
        }
    }
}

/// Where an edge falls relative to a splitting line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Side {
    Coincident,
    Positive,
    Negative,
    /// The edge crosses the line; both halves keep the original direction.
    Spanning { positive: Edge3, negative: Edge3 },
}

/// Classify `edge` against `line`, splitting it at the crossing when it straddles.
///
/// The crossing parameter is measured in plane coordinates and applied to the
/// 3D endpoints, so split points stay on the original segment.
pub fn split_edge(line: &Line2, plane: &Plane, edge: &Edge3) -> Side {
    let eps = tolerance();
    let s0 = line.signed_distance(&plane.w2p(&edge.start.pos));
    let s1 = line.signed_distance(&plane.w2p(&edge.end.pos));

    if s0.abs() <= eps && s1.abs() <= eps {
        return Side::Coincident;
    }
    if s0 >= -eps && s1 >= -eps {
        return Side::Positive;
    }
    if s0 <= eps && s1 <= eps {
        return Side::Negative;
    }

    let t = s0 / (s0 - s1);
    let mid = edge.start.interpolate(&edge.end, t);
    let head = Edge3::new(edge.start, mid);
    let tail = Edge3::new(mid, edge.end);
    if s0 > 0.0 {
        Side::Spanning {
            positive: head,
            negative: tail,
        }
    } else {
        Side::Spanning {
            positive: tail,
            negative: head,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn straddling_edge_splits_at_crossing() {
        let plane = Plane::default();
        let line = Line2::through(&plane.w2p(&Point3::origin()), &plane.w2p(&Point3::new(1.0, 0.0, 0.0))).unwrap();
        let edge = Edge3::from_points(Point3::new(0.5, -1.0, 0.0), Point3::new(0.5, 3.0, 0.0));
        match split_edge(&line, &plane, &edge) {
            Side::Spanning { positive, negative } => {
                assert!((positive.end.pos - Point3::new(0.5, 0.0, 0.0)).norm() < 1e-9);
                assert!((negative.start.pos - Point3::new(0.5, 0.0, 0.0)).norm() < 1e-9);
                assert!(line.signed_distance(&plane.w2p(&positive.start.pos)) > 0.0);
            },
            other => panic!("expected a split, got {:?}", other),
        }
    }

    #[test]
    fn touching_edge_is_not_split() {
        let plane = Plane::default();
        let line = Line2::through(&plane.w2p(&Point3::origin()), &plane.w2p(&Point3::new(0.0, 1.0, 0.0))).unwrap();
        let edge = Edge3::from_points(Point3::new(0.0, 0.5, 0.0), Point3::new(2.0, 0.5, 0.0));
        let side = split_edge(&line, &plane, &edge);
        assert!(matches!(side, Side::Positive | Side::Negative));
        let on_line = Edge3::from_points(Point3::new(0.0, -1.0, 0.0), Point3::new(0.0, 4.0, 0.0));
        assert_eq!(split_edge(&line, &plane, &on_line), Side::Coincident);
    }
}
