use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::plane::Plane;
use nalgebra::{Matrix4, Rotation3, Translation3, Vector3};

/// Boolean operations + transformations, returning new values.
///
/// Implementors keep their own in-place mutators; the names here differ so
/// both can be used side by side.
pub trait BooleanOps: Sized + Clone {
    type Error;

    fn union(&self, other: &Self) -> Result<Self, Self::Error>;
    fn difference(&self, other: &Self) -> Result<Self, Self::Error>;
    fn intersection(&self, other: &Self) -> Result<Self, Self::Error>;
    fn xor(&self, other: &Self) -> Result<Self, Self::Error>;
    fn transformed(&self, matrix: &Matrix4<Real>) -> Result<Self, Self::Error>;
    fn bounding_box(&self) -> Aabb;
    fn invalidate_bounding_box(&mut self);
    /// Same geometry facing the other way.
    fn inverse(&self) -> Self;

    /// Returns a new Self translated by vector.
    fn translated_vector(&self, vector: Vector3<Real>) -> Result<Self, Self::Error> {
        self.transformed(&Translation3::from(vector).to_homogeneous())
    }

    /// Returns a new Self translated by x, y, and z.
    fn translated(&self, x: Real, y: Real, z: Real) -> Result<Self, Self::Error> {
        self.translated_vector(Vector3::new(x, y, z))
    }

    /// Returns a new Self translated so its bounding-box center is at the origin.
    fn centered(&self) -> Result<Self, Self::Error> {
        let center = self.bounding_box().center();
        self.translated(-center.x, -center.y, -center.z)
    }

    /// Rotates by x_deg, y_deg, z_deg about the origin, applied x then y then z.
    fn rotated(&self, x_deg: Real, y_deg: Real, z_deg: Real) -> Result<Self, Self::Error> {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), x_deg.to_radians());
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), y_deg.to_radians());
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), z_deg.to_radians());
        self.transformed(&(rz * ry * rx).to_homogeneous())
    }

    /// Uniform scale about the origin.
    fn scaled_uniform(&self, factor: Real) -> Result<Self, Self::Error> {
        self.transformed(&Matrix4::new_scaling(factor))
    }

    /// Reflect about `plane`. The reflection reverses winding, so the result
    /// is inverted to keep facing consistent.
    fn mirrored(&self, plane: &Plane) -> Result<Self, Self::Error> {
        Ok(self.transformed(&plane.reflection_matrix())?.inverse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PolygonError;
    use crate::polygon::{Polygon, PolygonFlags};
    use nalgebra::Point3;

    fn square(min: Real, size: Real) -> Polygon {
        Polygon::from_positions(&[
            Point3::new(min, min, 0.0),
            Point3::new(min + size, min, 0.0),
            Point3::new(min + size, min + size, 0.0),
            Point3::new(min, min + size, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn value_ops_leave_operands_untouched() {
        let a = square(0.0, 2.0);
        let b = square(1.0, 2.0);
        let joined = a.union(&b).unwrap();
        assert_eq!(a.edge_count(), 4);
        assert!((joined.area() - 7.0).abs() < 1e-9);
        assert!((a.difference(&b).unwrap().area() - 3.0).abs() < 1e-9);
        assert!((a.intersection(&b).unwrap().area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn translated_moves_bounds() {
        let moved = square(0.0, 1.0).translated(2.0, 0.0, 0.0).unwrap();
        let bounds = BooleanOps::bounding_box(&moved);
        assert!((bounds.mins.x - 2.0).abs() < 1e-9);
        assert!((bounds.maxs.x - 3.0).abs() < 1e-9);
    }

    #[test]
    fn centered_puts_box_center_at_origin() {
        let centered = square(3.0, 2.0).centered().unwrap();
        let center = BooleanOps::bounding_box(&centered).center();
        assert!(center.coords.norm() < 1e-9);
    }

    #[test]
    fn mirrored_marks_flag() {
        let mirrored = square(0.0, 1.0).mirrored(&Plane::from_normal(Vector3::x(), 0.0)).unwrap();
        assert!(mirrored.flags().contains(PolygonFlags::MIRRORED));
        assert!(mirrored.is_ccw());
    }

    #[test]
    fn open_operand_is_refused() {
        let open = Polygon::new(square(0.0, 1.0).vertices().to_vec(), Plane::default(), 0, false);
        assert_eq!(square(0.0, 1.0).union(&open).unwrap_err(), PolygonError::OpenOperand);
    }
}
