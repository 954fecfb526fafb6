//! Planes shared by every vertex of a polygon, with the world↔plane projection
//! used by all 2D predicates.

use crate::float_types::{Real, tolerance};
use nalgebra::{Matrix3, Matrix4, Point2, Point3, Translation3, Vector3};

// Plane classification constants
pub const COPLANAR: i8 = 0;
pub const FRONT: i8 = 1;
pub const BACK: i8 = 2;
pub const SPANNING: i8 = 3;

/// A plane `n·p = w` with unit normal `n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal vector of the plane
    pub normal: Vector3<Real>,
    /// Distance from origin along normal (plane equation: n·p = w)
    pub w: Real,
}

impl Default for Plane {
    fn default() -> Self {
        Plane {
            normal: Vector3::z(),
            w: 0.0,
        }
    }
}

impl Plane {
    /// Create a new plane from a normal vector and distance.
    /// A zero normal falls back to `+Z`.
    pub fn from_normal(normal: Vector3<Real>, w: Real) -> Self {
        let len = normal.norm();
        if len < Real::EPSILON {
            return Plane {
                normal: Vector3::z(),
                w,
            };
        }
        Plane {
            normal: normal / len,
            w: w / len,
        }
    }

    /// Create a plane from three points.
    /// The normal direction follows the right-hand rule: (p2-p1) × (p3-p1)
    pub fn from_points(p1: Point3<Real>, p2: Point3<Real>, p3: Point3<Real>) -> Option<Self> {
        let normal = (p2 - p1).cross(&(p3 - p1));
        if normal.norm_squared() < Real::EPSILON * Real::EPSILON {
            return None;
        }
        let normal = normal.normalize();
        let w = normal.dot(&p1.coords);
        Some(Plane { normal, w })
    }

    /// **Mathematical Foundation: Newell's Method**
    ///
    /// For an ordered ring of points, the normal is
    /// ```text
    /// n = Σᵢ (pᵢ - pᵢ₊₁) × (pᵢ + pᵢ₊₁) / 2
    /// ```
    /// which is robust to collinear runs and slightly non-planar input. The
    /// offset is the mean of `n·pᵢ`.
    pub fn from_positions(points: &[Point3<Real>]) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let mut normal = Vector3::<Real>::zeros();
        for (i, p) in points.iter().enumerate() {
            let q = points[(i + 1) % points.len()];
            normal.x += (p.y - q.y) * (p.z + q.z);
            normal.y += (p.z - q.z) * (p.x + q.x);
            normal.z += (p.x - q.x) * (p.y + q.y);
        }
        let len = normal.norm();
        if len < Real::EPSILON {
            return None;
        }
        let normal = normal / len;
        let w = points.iter().map(|p| normal.dot(&p.coords)).sum::<Real>() / points.len() as Real;
        Some(Plane { normal, w })
    }

    pub const fn normal(&self) -> Vector3<Real> {
        self.normal
    }

    pub const fn offset(&self) -> Real {
        self.w
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    pub fn inverted(&self) -> Plane {
        Plane {
            normal: -self.normal,
            w: -self.w,
        }
    }

    /// Signed distance of `point` (positive in front).
    #[inline]
    pub fn distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.w
    }

    /// Classify a point as `FRONT`, `BACK` or `COPLANAR` within tolerance.
    pub fn orient_point(&self, point: &Point3<Real>) -> i8 {
        let d = self.distance(point);
        if d > tolerance() {
            FRONT
        } else if d < -tolerance() {
            BACK
        } else {
            COPLANAR
        }
    }

    /// Normals and offsets agree within tolerance.
    pub fn is_equivalent(&self, other: &Plane) -> bool {
        (self.normal - other.normal).norm() < tolerance() && (self.w - other.w).abs() < tolerance()
    }

    pub fn is_same_facing(&self, direction: &Vector3<Real>) -> bool {
        self.normal.dot(direction) > 0.0
    }

    /// Right-handed in-plane basis `(u, v)` with `u × v = n`.
    #[inline]
    pub fn basis(&self) -> (Vector3<Real>, Vector3<Real>) {
        build_orthonormal_basis(self.normal)
    }

    /// World to plane: drop the normal component and express the rest in `(u, v)`.
    #[inline]
    pub fn w2p(&self, point: &Point3<Real>) -> Point2<Real> {
        let (u, v) = self.basis();
        Point2::new(point.coords.dot(&u), point.coords.dot(&v))
    }

    /// Plane to world: the point on the plane with plane coordinates `point`.
    #[inline]
    pub fn p2w(&self, point: &Point2<Real>) -> Point3<Real> {
        let (u, v) = self.basis();
        Point3::from(u * point.x + v * point.y + self.normal * self.w)
    }

    /// Parameter `t` and point where segment `a→b` crosses the plane, if the
    /// segment is not parallel to it. `t` is not clamped.
    pub fn intersect_segment(&self, a: &Point3<Real>, b: &Point3<Real>) -> Option<(Real, Point3<Real>)> {
        let denom = self.normal.dot(&(b - a));
        if denom.abs() < Real::EPSILON {
            return None;
        }
        let t = (self.w - self.normal.dot(&a.coords)) / denom;
        Some((t, a + (b - a) * t))
    }

    /// Line shared by two planes as `(pivot, unit direction)`, or `None` when
    /// the planes are parallel.
    pub fn intersection_line(&self, other: &Plane) -> Option<(Point3<Real>, Vector3<Real>)> {
        let dir = self.normal.cross(&other.normal);
        let len_sq = dir.norm_squared();
        if len_sq < tolerance() * tolerance() {
            return None;
        }
        // Point on both planes closest to the origin
        let pivot = (other.normal.cross(&dir) * self.w + dir.cross(&self.normal) * other.w) / len_sq;
        Some((Point3::from(pivot), dir / len_sq.sqrt()))
    }

    /// Reflect a point through this plane.
    pub fn mirror_point(&self, point: &Point3<Real>) -> Point3<Real> {
        point - self.normal * (2.0 * self.distance(point))
    }

    /// Reflect another plane through this plane. The result faces the mirrored
    /// side, so a polygon mirrored vertex-by-vertex keeps it as its plane.
    pub fn mirror_plane(&self, plane: &Plane) -> Plane {
        let n = plane.normal - self.normal * (2.0 * self.normal.dot(&plane.normal));
        let on_plane = Point3::from(plane.normal * plane.w);
        let p = self.mirror_point(&on_plane);
        Plane::from_normal(n, n.dot(&p.coords))
    }

    /// Homogeneous reflection matrix about this plane.
    ///
    /// ```text
    /// M = T(w·n) · (I - 2 n nᵀ) · T(-w·n)
    /// ```
    pub fn reflection_matrix(&self) -> Matrix4<Real> {
        let n = self.normal;
        let offset = n * self.w;
        let t1 = Translation3::from(-offset).to_homogeneous();

        let mut reflect_4 = Matrix4::identity();
        let reflect_3 = Matrix3::identity() - 2.0 * n * n.transpose();
        reflect_4.fixed_view_mut::<3, 3>(0, 0).copy_from(&reflect_3);

        let t2 = Translation3::from(offset).to_homogeneous();
        t2 * reflect_4 * t1
    }

    /// Transform the plane by an affine matrix using the inverse transpose.
    /// Returns `None` for singular matrices.
    pub fn transformed(&self, matrix: &Matrix4<Real>) -> Option<Plane> {
        let inv_t = matrix.try_inverse()?.transpose();
        let h = inv_t * nalgebra::Vector4::new(self.normal.x, self.normal.y, self.normal.z, -self.w);
        let n = Vector3::new(h.x, h.y, h.z);
        let len = n.norm();
        if len < Real::EPSILON {
            return None;
        }
        Some(Plane {
            normal: n / len,
            w: -h.w / len,
        })
    }
}

/// Build orthonormal basis for 2D projection
pub fn build_orthonormal_basis(n: Vector3<Real>) -> (Vector3<Real>, Vector3<Real>) {
    let n = n.normalize();

    let other = if n.x.abs() < n.y.abs() && n.x.abs() < n.z.abs() {
        Vector3::x()
    } else if n.y.abs() < n.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let v = n.cross(&other).normalize();
    let u = v.cross(&n).normalize();

    (u, v)
}
