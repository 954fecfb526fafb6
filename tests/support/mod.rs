//! Test support library
//! Shape builders and float comparison shared by the integration tests.
#![allow(dead_code)]

use brushcsg::{Plane, Polygon, Triangle, Vertex, float_types::Real};
use nalgebra::Point3;

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// Closed polygon on the XY plane (normal +Z) through `points` in order.
pub fn polygon_xy(points: &[(Real, Real)]) -> Polygon {
    let vertices = points
        .iter()
        .map(|&(x, y)| Vertex::from_pos(Point3::new(x, y, 0.0)))
        .collect();
    Polygon::new(vertices, Plane::default(), 0, true)
}

/// Open polyline on the XY plane through `points` in order.
pub fn polyline_xy(points: &[(Real, Real)]) -> Polygon {
    let vertices = points
        .iter()
        .map(|&(x, y)| Vertex::from_pos(Point3::new(x, y, 0.0)))
        .collect();
    Polygon::new(vertices, Plane::default(), 0, false)
}

/// Axis-aligned rectangle on the XY plane, counter-clockwise.
pub fn rect(x: Real, y: Real, width: Real, height: Real) -> Polygon {
    polygon_xy(&[(x, y), (x + width, y), (x + width, y + height), (x, y + height)])
}

pub fn square(x: Real, y: Real, size: Real) -> Polygon {
    rect(x, y, size, size)
}

/// Regular convex polygon centered on the origin.
pub fn regular(sides: usize, radius: Real) -> Polygon {
    let points: Vec<(Real, Real)> = (0..sides)
        .map(|i| {
            let angle = brushcsg::float_types::TAU * i as Real / sides as Real;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    polygon_xy(&points)
}

/// Sum of triangle areas in plane coordinates.
pub fn triangle_area(polygon: &Polygon, triangles: &[Triangle]) -> Real {
    let plane = polygon.plane();
    triangles
        .iter()
        .map(|t| {
            let [a, b, c] = t.indices.map(|i| plane.w2p(&polygon.vertices()[i].pos));
            0.5 * ((b - a).perp(&(c - a)))
        })
        .sum()
}
