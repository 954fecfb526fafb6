mod support;

use brushcsg::{Classification, IntersectionKind, Edge3, PlanarPartition, Plane};
use nalgebra::Point3;
use support::*;

fn p(x: f64, y: f64) -> Point3<brushcsg::float_types::Real> {
    Point3::new(x as _, y as _, 0.0)
}

#[test]
fn convex_polygon_classifies_points() {
    let pentagon = regular(5, 2.0);
    let tree = pentagon.partition().unwrap();
    assert_eq!(tree.classify(&p(0.0, 0.0)), Classification::Inside);
    assert_eq!(tree.classify(&p(5.0, 0.0)), Classification::Outside);
    assert_eq!(tree.classify(&p(2.0, 0.0)), Classification::Border);
    assert!(pentagon.include(&p(0.5, 0.5)));
}

#[test]
fn holed_polygon_classifies_hole_as_outside() {
    let mut holed = square(0.0, 0.0, 3.0);
    holed.subtract(&square(1.0, 1.0, 1.0)).unwrap();
    assert_eq!(holed.classify(&p(1.5, 1.5)), Classification::Outside);
    assert_eq!(holed.classify(&p(0.5, 1.5)), Classification::Inside);
    assert_eq!(holed.classify(&p(1.0, 1.5)), Classification::Border);
}

#[test]
fn edges_are_cut_at_the_boundary() {
    let unit = square(0.0, 0.0, 1.0);
    let tree = unit.partition().unwrap();
    let crossing = Edge3::from_points(p(-1.0, 0.5), p(0.5, 0.5));
    let parts = tree.partition(&crossing);
    assert_eq!(parts.positive.len(), 1);
    assert_eq!(parts.negative.len(), 1);
    assert!(approx_eq(parts.negative[0].length(), 0.5, 1e-9));
    assert_eq!(tree.intersection(&crossing), IntersectionKind::Intersection);

    let along = Edge3::from_points(p(0.25, 0.0), p(0.75, 0.0));
    assert_eq!(tree.intersection(&along), IntersectionKind::JustTouch);
    assert!(tree.is_on_edge(&along));
    assert!(tree.is_inside(&along, false));
}

#[test]
fn empty_tree_sees_everything_outside() {
    let tree = PlanarPartition::build(&Plane::default(), &[]);
    assert!(tree.is_empty());
    assert_eq!(tree.classify(&p(0.0, 0.0)), Classification::Outside);
    assert!(!tree.has_intersection(&Edge3::from_points(p(0.0, 0.0), p(1.0, 0.0))));
}
