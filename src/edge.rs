//! Segment and line primitives: 3D polygon edges carrying texture coordinates,
//! and the 2D segments and lines they project to on a polygon plane.

use crate::float_types::{Real, tolerance};
use crate::plane::Plane;
use crate::vertex::Vertex;
use nalgebra::{Point2, Point3, Vector2};

/// Where the closest point of a segment to a query point falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRegion {
    Start,
    Middle,
    End,
}

/// A directed 3D edge with endpoint texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge3 {
    pub start: Vertex,
    pub end: Vertex,
}

impl Edge3 {
    pub const fn new(start: Vertex, end: Vertex) -> Self {
        Edge3 { start, end }
    }

    pub fn from_points(start: Point3<Real>, end: Point3<Real>) -> Self {
        Edge3 {
            start: Vertex::from_pos(start),
            end: Vertex::from_pos(end),
        }
    }

    pub const fn inverted(&self) -> Edge3 {
        Edge3 {
            start: self.end,
            end: self.start,
        }
    }

    pub fn length(&self) -> Real {
        (self.end.pos - self.start.pos).norm()
    }

    /// Both endpoints coincide within tolerance.
    pub fn is_point(&self) -> bool {
        self.start.is_equivalent(&self.end)
    }

    pub fn midpoint(&self) -> Point3<Real> {
        nalgebra::center(&self.start.pos, &self.end.pos)
    }

    /// Same endpoints in the same order.
    pub fn is_equivalent(&self, other: &Edge3) -> bool {
        self.start.is_equivalent(&other.start) && self.end.is_equivalent(&other.end)
    }

    /// Same endpoints in either order.
    pub fn is_equivalent_undirected(&self, other: &Edge3) -> bool {
        self.is_equivalent(other) || self.is_equivalent(&other.inverted())
    }

    /// Sub-edge between parameters `t0` and `t1` along this edge.
    pub fn sub_edge(&self, t0: Real, t1: Real) -> Edge3 {
        Edge3 {
            start: self.start.interpolate(&self.end, t0),
            end: self.start.interpolate(&self.end, t1),
        }
    }

    /// Unclamped projection parameter of `point` onto this edge's line.
    pub fn parameter_of(&self, point: &Point3<Real>) -> Real {
        let d = self.end.pos - self.start.pos;
        let len_sq = d.norm_squared();
        if len_sq < Real::EPSILON {
            return 0.0;
        }
        (point - self.start.pos).dot(&d) / len_sq
    }

    /// Closest point on the segment to `point` and the region it falls in.
    pub fn nearest_point(&self, point: &Point3<Real>) -> (Point3<Real>, SegmentRegion) {
        let t = self.parameter_of(point);
        if t <= 0.0 {
            (self.start.pos, SegmentRegion::Start)
        } else if t >= 1.0 {
            (self.end.pos, SegmentRegion::End)
        } else {
            (self.start.pos + (self.end.pos - self.start.pos) * t, SegmentRegion::Middle)
        }
    }

    /// Squared distance from `point` to the segment.
    pub fn distance_squared(&self, point: &Point3<Real>) -> Real {
        let (nearest, _) = self.nearest_point(point);
        (point - nearest).norm_squared()
    }

    /// `point` lies on the segment within tolerance.
    pub fn contains_point(&self, point: &Point3<Real>) -> bool {
        self.distance_squared(point) < tolerance() * tolerance()
    }

    /// Both edges lie on one line within tolerance.
    pub fn is_collinear_with(&self, other: &Edge3) -> bool {
        if self.is_point() {
            return false;
        }
        let d = (self.end.pos - self.start.pos).normalize();
        [other.start.pos, other.end.pos].iter().all(|p| {
            let w = p - self.start.pos;
            (w - d * w.dot(&d)).norm() < tolerance()
        })
    }

    /// Parts of `self` not covered by the collinear edge `other`.
    ///
    /// Returns `None` when the edges are not collinear or do not overlap by
    /// more than a point; otherwise the zero, one or two remaining pieces in
    /// `self`'s direction.
    pub fn subtract(&self, other: &Edge3) -> Option<Vec<Edge3>> {
        if !self.is_collinear_with(other) {
            return None;
        }
        let t0 = self.parameter_of(&other.start.pos);
        let t1 = self.parameter_of(&other.end.pos);
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let eps = tolerance() / self.length().max(Real::EPSILON);
        let lo = lo.max(0.0);
        let hi = hi.min(1.0);
        if hi - lo <= eps {
            return None;
        }
        let mut pieces = Vec::with_capacity(2);
        if lo > eps {
            pieces.push(self.sub_edge(0.0, lo));
        }
        if hi < 1.0 - eps {
            pieces.push(self.sub_edge(hi, 1.0));
        }
        Some(pieces)
    }

    /// Project onto a plane's 2D frame.
    pub fn to_2d(&self, plane: &Plane) -> Edge2 {
        Edge2 {
            start: plane.w2p(&self.start.pos),
            end: plane.w2p(&self.end.pos),
        }
    }
}

/// A directed 2D segment in plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge2 {
    pub start: Point2<Real>,
    pub end: Point2<Real>,
}

impl Edge2 {
    pub const fn new(start: Point2<Real>, end: Point2<Real>) -> Self {
        Edge2 { start, end }
    }

    pub fn direction(&self) -> Vector2<Real> {
        self.end - self.start
    }

    /// `point` lies on the segment within tolerance.
    pub fn contains(&self, point: &Point2<Real>) -> bool {
        let d = self.direction();
        let len_sq = d.norm_squared();
        if len_sq < Real::EPSILON {
            return (point - self.start).norm() < tolerance();
        }
        let t = ((point - self.start).dot(&d) / len_sq).clamp(0.0, 1.0);
        (point - (self.start + d * t)).norm() < tolerance()
    }

    /// The segments share at least one point (touching counts).
    pub fn intersects(&self, other: &Edge2) -> bool {
        let eps = tolerance();
        let o1 = orient2d(&self.start, &self.end, &other.start);
        let o2 = orient2d(&self.start, &self.end, &other.end);
        let o3 = orient2d(&other.start, &other.end, &self.start);
        let o4 = orient2d(&other.start, &other.end, &self.end);

        if ((o1 > eps && o2 < -eps) || (o1 < -eps && o2 > eps))
            && ((o3 > eps && o4 < -eps) || (o3 < -eps && o4 > eps))
        {
            return true;
        }
        self.contains(&other.start)
            || self.contains(&other.end)
            || other.contains(&self.start)
            || other.contains(&self.end)
    }
}

/// Twice the signed area of triangle `a, b, c` (positive when counter-clockwise).
#[inline]
pub fn orient2d(a: &Point2<Real>, b: &Point2<Real>, c: &Point2<Real>) -> Real {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// A directed 2D line `normal·p = distance`.
///
/// The normal is the right-hand perpendicular of the direction, so for a
/// counter-clockwise loop it points away from the interior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2 {
    pub normal: Vector2<Real>,
    pub distance: Real,
}

impl Line2 {
    /// Line through `a` then `b`; `None` if the points coincide.
    pub fn through(a: &Point2<Real>, b: &Point2<Real>) -> Option<Line2> {
        let d = b - a;
        let len = d.norm();
        if len < Real::EPSILON {
            return None;
        }
        let normal = Vector2::new(d.y, -d.x) / len;
        Some(Line2 {
            normal,
            distance: normal.dot(&a.coords),
        })
    }

    /// Unit direction of travel.
    pub fn direction(&self) -> Vector2<Real> {
        Vector2::new(-self.normal.y, self.normal.x)
    }

    #[inline]
    pub fn signed_distance(&self, point: &Point2<Real>) -> Real {
        self.normal.dot(&point.coords) - self.distance
    }

    /// Same orientation and offset within tolerance.
    pub fn is_equivalent(&self, other: &Line2) -> bool {
        (self.normal - other.normal).norm() < tolerance() && (self.distance - other.distance).abs() < tolerance()
    }

    /// Parallel copy moved by `amount` along the normal.
    pub fn offset(&self, amount: Real) -> Line2 {
        Line2 {
            normal: self.normal,
            distance: self.distance + amount,
        }
    }

    /// Foot of the perpendicular from `point`.
    pub fn project(&self, point: &Point2<Real>) -> Point2<Real> {
        point - self.normal * self.signed_distance(point)
    }

    /// Crossing point of two lines; `None` when (nearly) parallel.
    pub fn intersect(&self, other: &Line2) -> Option<Point2<Real>> {
        let det = self.normal.x * other.normal.y - self.normal.y * other.normal.x;
        if det.abs() < tolerance() * tolerance() {
            return None;
        }
        let x = (self.distance * other.normal.y - self.normal.y * other.distance) / det;
        let y = (self.normal.x * other.distance - self.distance * other.normal.x) / det;
        Some(Point2::new(x, y))
    }
}
