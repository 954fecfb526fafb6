mod support;

use brushcsg::{BooleanOps, ClipPolicy, Plane, Polygon, PolygonError};
use nalgebra::{Point3, Vector3};
use support::*;

#[test]
fn union_of_squares_sharing_a_strip() {
    let mut a = square(0.0, 0.0, 1.0);
    let b = square(0.5, 0.0, 1.0);
    a.union_with(&b).unwrap();

    assert!(approx_eq(a.area(), 1.5, 1e-9));
    assert_eq!(a.loops().outers.len(), 1);
    assert!(a.loops().holes.is_empty());
    // Collinear top and bottom runs merge, leaving a 1.5 x 1 rectangle
    assert_eq!(a.edge_count(), 4);
}

#[test]
fn union_of_diagonally_offset_squares_is_an_octagon_outline() {
    let mut a = square(0.0, 0.0, 1.0);
    a.union_with(&square(0.5, 0.5, 1.0)).unwrap();
    assert!(approx_eq(a.area(), 1.75, 1e-9));
    assert_eq!(a.edge_count(), 8);
    assert!(!a.is_convex());
}

#[test]
fn subtracting_centered_square_leaves_a_hole() {
    let mut outer = square(0.0, 0.0, 3.0);
    outer.subtract(&square(1.0, 1.0, 1.0)).unwrap();

    let loops = outer.loops();
    assert_eq!(loops.outers.len(), 1);
    assert_eq!(loops.holes.len(), 1);
    assert_eq!(loops.islands[0].holes, vec![0]);
    assert!(outer.has_holes());
    assert!(approx_eq(outer.area(), 8.0, 1e-9));
}

#[test]
fn subtracting_a_cover_empties_the_polygon() {
    let mut small = square(1.0, 1.0, 1.0);
    small.subtract(&square(0.0, 0.0, 3.0)).unwrap();
    assert!(!small.is_valid());
}

#[test]
fn union_then_subtract_stays_within_original() {
    let p = square(0.0, 0.0, 2.0);
    let q = square(1.0, 1.0, 2.0);
    let mut combined = p.clone();
    combined.union_with(&q).unwrap();
    assert!(approx_eq(combined.area(), 7.0, 1e-9));

    combined.subtract(&q).unwrap();
    assert!(combined.area() <= p.area() + 1e-9);
    assert!(approx_eq(combined.area(), 3.0, 1e-9));
}

#[test]
fn intersection_of_overlapping_squares() {
    let mut a = square(0.0, 0.0, 2.0);
    a.intersect(&square(1.0, 1.0, 2.0), ClipPolicy::Both).unwrap();
    assert!(approx_eq(a.area(), 1.0, 1e-9));
    assert!(a.is_quad());
}

#[test]
fn exclusive_or_with_nested_square_matches_difference() {
    let mut a = square(0.0, 0.0, 3.0);
    a.exclusive_or(&square(1.0, 1.0, 1.0)).unwrap();
    assert!(approx_eq(a.area(), 8.0, 1e-9));
    assert_eq!(a.loops().holes.len(), 1);
}

#[test]
fn mismatched_planes_are_refused_without_mutation() {
    let mut a = square(0.0, 0.0, 1.0);
    let mut b = square(0.0, 0.0, 1.0);
    b.set_plane(Plane::from_normal(Vector3::z(), 1.0));
    let before = a.vertices().to_vec();

    assert_eq!(a.union_with(&b), Err(PolygonError::PlaneMismatch));
    assert_eq!(a.subtract(&b), Err(PolygonError::PlaneMismatch));
    assert_eq!(a.vertices(), &before[..]);
}

#[test]
fn union_into_empty_copies_the_operand() {
    let mut target = Polygon::empty(Plane::default());
    target.union_with(&square(0.0, 0.0, 2.0)).unwrap();
    assert!(approx_eq(target.area(), 4.0, 1e-9));
}

#[test]
fn value_returning_ops_match_mutators() {
    let a = square(0.0, 0.0, 2.0);
    let b = square(1.0, 0.0, 2.0);
    assert!(approx_eq(a.union(&b).unwrap().area(), 6.0, 1e-9));
    assert!(approx_eq(a.difference(&b).unwrap().area(), 2.0, 1e-9));
    assert!(approx_eq(a.intersection(&b).unwrap().area(), 2.0, 1e-9));
    assert!(approx_eq(a.area(), 4.0, 1e-9));
}

#[test]
fn squares_touching_at_a_corner_union_into_one_outline() {
    let mut a = square(0.0, 0.0, 1.0);
    a.union_with(&square(1.0, 1.0, 1.0)).unwrap();
    assert!(approx_eq(a.area(), 2.0, 1e-9));
    assert_eq!(a.loops().outers.len(), 1);
    assert_eq!(a.edge_count(), 8);
}

#[test]
fn exclusive_or_keeps_corner_touching_squares_apart() {
    let mut a = square(0.0, 0.0, 1.0);
    a.exclusive_or(&square(1.0, 1.0, 1.0)).unwrap();
    assert!(approx_eq(a.area(), 2.0, 1e-9));
    assert_eq!(a.loops().outers.len(), 2);
}

#[test]
fn clip_inside_keeps_only_own_edges_outside_the_cutter() {
    let mut a = square(0.0, 0.0, 2.0);
    a.clip_inside(&rect(1.0, -1.0, 2.0, 4.0)).unwrap();
    assert!(a.is_open());
    assert_eq!(a.edge_count(), 3);
    assert!(a.vertices().iter().all(|v| v.pos.x <= 1.0 + 1e-9));
    assert_eq!(a.first_vertex().unwrap().pos, Point3::new(1.0, 2.0, 0.0));
    assert_eq!(a.last_vertex().unwrap().pos, Point3::new(1.0, 0.0, 0.0));
}

#[test]
fn clip_outside_keeps_only_own_edges_inside_the_cutter() {
    let mut a = square(0.0, 0.0, 2.0);
    a.clip_outside(&rect(1.0, -1.0, 2.0, 4.0)).unwrap();
    assert!(a.is_open());
    assert_eq!(a.edge_count(), 3);
    assert!(a.vertices().iter().all(|v| v.pos.x >= 1.0 - 1e-9));
    assert_eq!(a.first_vertex().unwrap().pos, Point3::new(1.0, 0.0, 0.0));
    assert_eq!(a.last_vertex().unwrap().pos, Point3::new(1.0, 2.0, 0.0));
}

#[test]
fn intersect_co_same_keeps_shared_boundary_of_overlap() {
    let mut a = square(0.0, 0.0, 2.0);
    a.intersect(&rect(1.0, 0.0, 2.0, 2.0), ClipPolicy::CoSame).unwrap();
    assert!(!a.is_open());
    assert!(approx_eq(a.area(), 2.0, 1e-9));
    assert!(a.is_quad());
}

#[test]
fn intersect_co_diff_keeps_the_touching_side() {
    let mut a = square(0.0, 0.0, 1.0);
    let b = square(1.0, 0.0, 1.0);

    let mut shared = a.clone();
    shared.intersect(&b, ClipPolicy::CoDiff).unwrap();
    assert!(shared.is_open());
    assert_eq!(shared.edge_count(), 1);
    assert_eq!(shared.first_vertex().unwrap().pos, Point3::new(1.0, 1.0, 0.0));
    assert_eq!(shared.last_vertex().unwrap().pos, Point3::new(1.0, 0.0, 0.0));

    let before = a.edges().to_vec();
    assert_eq!(a.intersect(&b, ClipPolicy::CoSame), Err(PolygonError::Degenerate { edges: 0 }));
    assert_eq!(a.edges(), &before[..]);
}

#[test]
fn open_polylines_union_end_to_end() {
    let mut path = polyline_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
    let onward = polyline_xy(&[(1.0, 1.0), (2.0, 1.0)]);
    assert!(!path.should_order_reverse(&onward));
    path.union_with(&onward).unwrap();
    assert!(path.is_open());
    assert_eq!(path.edge_count(), 3);
    assert_eq!(path.last_vertex().unwrap().pos, Point3::new(2.0, 1.0, 0.0));
}

#[test]
fn open_polyline_union_reverses_colliding_operand() {
    let mut path = polyline_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
    let backwards = polyline_xy(&[(2.0, 1.0), (1.0, 1.0)]);
    assert!(path.should_order_reverse(&backwards));
    path.union_with(&backwards).unwrap();
    assert!(path.is_open());
    assert_eq!(path.edge_count(), 3);
    assert_eq!(path.first_vertex().unwrap().pos, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(path.last_vertex().unwrap().pos, Point3::new(2.0, 1.0, 0.0));
}

#[test]
fn union_of_open_and_closed_is_refused() {
    let mut closed = square(0.0, 0.0, 1.0);
    let mut open = polyline_xy(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]);
    let before = closed.edges().to_vec();

    assert_eq!(closed.union_with(&open), Err(PolygonError::OpenOperand));
    assert_eq!(closed.edges(), &before[..]);
    assert_eq!(open.union_with(&square(0.0, 0.0, 1.0)), Err(PolygonError::OpenOperand));
    assert_eq!(open.edge_count(), 2);
}
