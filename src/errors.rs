//! Polygon operation and persistence errors

use crate::float_types::Real;
use nalgebra::Point3;
use std::fmt::Display;

/// All the ways a polygon operation can refuse or fail.
///
/// A refused operation (precondition violation) never mutates the polygon.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolygonError {
    /// (Invalid) The polygon has no vertices or no edges
    Invalid,
    /// (OpenOperand) The operation needs closed polygons but one operand is open
    OpenOperand,
    /// (PlaneMismatch) The operands do not lie on an equivalent plane
    PlaneMismatch,
    /// (Degenerate) Optimizing left too few edges to form a polygon
    Degenerate { edges: usize },
    /// (EdgeReused) Merging collinear chains tried to consume an edge twice
    EdgeReused(usize),
    /// (NotOpen) The operation works on open polylines only
    NotOpen,
    /// (NoSharedEndpoint) Two polylines have no common end point to join at
    NoSharedEndpoint,
    /// (OutOfRange) An edge or vertex index is past the end of its list
    OutOfRange { index: usize, len: usize },
    /// (BoundaryViolation) A checked scale would break the polygon's boundary
    BoundaryViolation(&'static str),
    /// (NoNearbyEdge) No edge passes close enough to the position to take a new vertex
    NoNearbyEdge(Point3<Real>),
    /// (UnsupportedTransform) The transform collapses the polygon's plane
    UnsupportedTransform,
}

impl Display for PolygonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolygonError::Invalid => write!(f, "(Invalid) The polygon has no vertices or no edges"),
            PolygonError::OpenOperand => write!(f, "(OpenOperand) The operation needs closed polygons but an operand is open"),
            PolygonError::PlaneMismatch => write!(f, "(PlaneMismatch) The operands do not lie on an equivalent plane"),
            PolygonError::Degenerate { edges } => write!(f, "(Degenerate) Optimizing left {} edges, which cannot form a polygon", edges),
            PolygonError::EdgeReused(edge) => write!(f, "(EdgeReused) Edge {} was consumed twice while merging collinear edges", edge),
            PolygonError::NotOpen => write!(f, "(NotOpen) The operation works on open polylines only"),
            PolygonError::NoSharedEndpoint => write!(f, "(NoSharedEndpoint) The polylines share no end point"),
            PolygonError::OutOfRange { index, len } => write!(f, "(OutOfRange) Index {} is out of range (len = {})", index, len),
            PolygonError::BoundaryViolation(reason) => write!(f, "(BoundaryViolation) {}", reason),
            PolygonError::NoNearbyEdge(opoint) => write!(f, "(NoNearbyEdge) No edge can take a vertex at: {}", opoint),
            PolygonError::UnsupportedTransform => write!(f, "(UnsupportedTransform) The transform collapses the polygon plane"),
        }
    }
}

/// Errors raised while decoding the binary polygon layout.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// (BadMagic) The payload does not start with the polygon magic bytes
    BadMagic([u8; 4]),
    /// (UnsupportedVersion) The payload was written by a newer format revision
    UnsupportedVersion(u32),
    /// (Truncated) The payload ended before a field could be read
    Truncated { needed: usize, available: usize },
    /// (EdgeIndexOutOfRange) An edge refers to a vertex that was not stored
    EdgeIndexOutOfRange {
        edge: usize,
        index: usize,
        vertex_count: usize,
    },
    /// (UvCountMismatch) The stored texture coordinates do not match the vertex count
    UvCountMismatch { uvs: usize, vertices: usize },
    /// (Codec) The body could not be encoded or decoded
    Codec(#[from] bincode::Error),
    /// Underlying reader or writer failure
    Io(#[from] std::io::Error),
}

impl Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::BadMagic(magic) => write!(f, "(BadMagic) Unexpected magic bytes {:?}", magic),
            PersistError::UnsupportedVersion(version) => write!(f, "(UnsupportedVersion) Format version {} is not supported", version),
            PersistError::Truncated { needed, available } => {
                write!(f, "(Truncated) Needed {} more bytes but only {} remain", needed, available)
            },
            PersistError::EdgeIndexOutOfRange {
                edge,
                index,
                vertex_count,
            } => write!(
                f,
                "(EdgeIndexOutOfRange) Edge {} refers to vertex {} but only {} vertices were stored",
                edge, index, vertex_count
            ),
            PersistError::UvCountMismatch { uvs, vertices } => {
                write!(f, "(UvCountMismatch) {} texture coordinates stored for {} vertices", uvs, vertices)
            },
            PersistError::Codec(error) => write!(f, "(Codec) {}", error),
            PersistError::Io(error) => error.fmt(f),
        }
    }
}
