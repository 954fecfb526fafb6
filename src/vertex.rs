//! Struct and functions for working with `Vertex`s from which `Polygon`s are composed.

use crate::float_types::{Real, tolerance};
use nalgebra::{Point3, Vector2};

/// A vertex of a polygon, holding position and texture coordinate.
///
/// Vertices are compared by position within [`tolerance`], never by address.
#[derive(Debug, Clone, PartialEq, Copy)]
pub struct Vertex {
    pub pos: Point3<Real>,
    pub uv: Vector2<Real>,
    /// Pooling tag. Boolean fragments gathered with different tags are never
    /// merged into one vertex, even when their positions coincide.
    pub(crate) tag: u8,
}

impl Vertex {
    /// Create a new [`Vertex`].
    ///
    /// * `pos` – the position in model space
    /// * `uv`  – texture coordinate carried through splits by interpolation
    ///
    /// Non-finite components are replaced by zero.
    #[inline]
    pub fn new(mut pos: Point3<Real>, mut uv: Vector2<Real>) -> Self {
        // Sanitise position
        for c in pos.coords.iter_mut() {
            if !c.is_finite() {
                *c = 0.0;
            }
        }

        // Sanitise uv
        for c in uv.iter_mut() {
            if !c.is_finite() {
                *c = 0.0;
            }
        }

        Vertex { pos, uv, tag: 0 }
    }

    /// A vertex at `pos` with a zero texture coordinate.
    #[inline]
    pub fn from_pos(pos: Point3<Real>) -> Self {
        Self::new(pos, Vector2::zeros())
    }

    #[inline]
    pub(crate) const fn with_tag(mut self, tag: u8) -> Self {
        self.tag = tag;
        self
    }

    /// Positions coincide within the crate tolerance.
    #[inline]
    pub fn is_equivalent(&self, other: &Vertex) -> bool {
        (self.pos - other.pos).norm() < tolerance()
    }

    /// Euclidean distance between vertex positions.
    pub fn distance_to(&self, other: &Vertex) -> Real {
        (self.pos - other.pos).norm()
    }

    /// **Mathematical Foundation: Linear Interpolation**
    ///
    /// ```text
    /// v(t) = v₀ + t(v₁ - v₀)
    /// ```
    /// applied to both the position and the texture coordinate. Used when an
    /// edge is split by a partition line or a clipping plane.
    pub fn interpolate(&self, other: &Vertex, t: Real) -> Vertex {
        Vertex {
            pos: self.pos + (other.pos - self.pos) * t,
            uv: self.uv + (other.uv - self.uv) * t,
            tag: self.tag,
        }
    }
}

impl From<Point3<Real>> for Vertex {
    fn from(pos: Point3<Real>) -> Self {
        Vertex::from_pos(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sanitises_non_finite_components() {
        let v = Vertex::new(
            Point3::new(Real::NAN, 1.0, Real::INFINITY),
            Vector2::new(Real::NEG_INFINITY, 0.5),
        );
        assert_eq!(v.pos, Point3::new(0.0, 1.0, 0.0));
        assert_eq!(v.uv, Vector2::new(0.0, 0.5));
    }

    #[test]
    fn interpolate_carries_uv() {
        let a = Vertex::new(Point3::origin(), Vector2::new(0.0, 0.0));
        let b = Vertex::new(Point3::new(2.0, 0.0, 0.0), Vector2::new(1.0, 2.0));
        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.pos, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mid.uv, Vector2::new(0.5, 1.0));
    }

    #[test]
    fn equivalence_ignores_uv() {
        let a = Vertex::new(Point3::new(1.0, 1.0, 1.0), Vector2::new(0.0, 0.0));
        let b = Vertex::new(Point3::new(1.0, 1.0, 1.0 + tolerance() * 0.1), Vector2::new(3.0, 3.0));
        assert!(a.is_equivalent(&b));
    }
}
