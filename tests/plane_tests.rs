mod support;

use brushcsg::{Plane, float_types::Real};
use nalgebra::Vector3;
use support::*;

#[test]
fn unit_square_cut_through_its_middle() {
    let unit = square(0.0, 0.0, 1.0);
    let cut = unit.clip_by_plane(&Plane::from_normal(Vector3::x(), 0.5));

    assert_eq!(cut.front.len(), 1);
    assert_eq!(cut.back.len(), 1);
    assert!(approx_eq(cut.front[0].area(), 0.5, 1e-9));
    assert!(approx_eq(cut.back[0].area(), 0.5, 1e-9));
    assert!(cut.front[0].vertices().iter().all(|v| v.pos.x >= 0.5 - 1e-9));
    assert!(cut.back[0].vertices().iter().all(|v| v.pos.x <= 0.5 + 1e-9));

    assert_eq!(cut.boundary.len(), 1);
    assert!(approx_eq(cut.boundary[0].length(), 1.0, 1e-9));
    assert!(cut.front[0].has_edge(&cut.boundary[0], false));
    assert!(cut.back[0].has_edge(&cut.boundary[0], false));
}

#[test]
fn plane_missing_the_polygon_keeps_it_whole() {
    let unit = square(0.0, 0.0, 1.0);
    let ahead = unit.clip_by_plane(&Plane::from_normal(Vector3::x(), -1.0));
    assert_eq!(ahead.front.len(), 1);
    assert!(ahead.back.is_empty());

    let behind = unit.clip_by_plane(&Plane::from_normal(Vector3::x(), 5.0));
    assert!(behind.front.is_empty());
    assert_eq!(behind.back.len(), 1);
}

#[test]
fn shared_boundary_is_not_duplicated() {
    let lower = rect(0.0, 0.0, 1.0, 1.0);
    let upper = rect(0.0, 1.0, 1.0, 1.0);
    let cutter = Plane::from_normal(Vector3::x(), 0.5);
    let mut boundary = Vec::new();
    lower.clip_by_plane_sharing(&cutter, &mut boundary);
    upper.clip_by_plane_sharing(&cutter, &mut boundary);
    let total: Real = boundary.iter().map(|e| e.length()).sum();
    assert!(approx_eq(total, 2.0, 1e-9));
}

#[test]
fn vertices_above_count_against_tolerance() {
    let unit = square(0.0, 0.0, 1.0);
    assert_eq!(unit.vertex_count_above(&Plane::from_normal(Vector3::x(), 0.5)), 2);
    assert_eq!(unit.vertex_count_above(&Plane::from_normal(Vector3::x(), 0.0)), 2);
}

#[test]
fn cut_across_a_notch_leaves_the_gap_open() {
    let u_shape = polygon_xy(&[
        (0.0, 0.0),
        (3.0, 0.0),
        (3.0, 3.0),
        (2.0, 3.0),
        (2.0, 1.0),
        (1.0, 1.0),
        (1.0, 3.0),
        (0.0, 3.0),
    ]);
    let cut = u_shape.clip_by_plane(&Plane::from_normal(Vector3::y(), 2.0));

    let front: Real = cut.front.iter().map(|p| p.area()).sum();
    let back: Real = cut.back.iter().map(|p| p.area()).sum();
    assert!(approx_eq(front, 2.0, 1e-9));
    assert!(approx_eq(back, 5.0, 1e-9));

    let facet: Real = cut.boundary.iter().map(|e| e.length()).sum();
    assert!(approx_eq(facet, 2.0, 1e-9));
    assert!(cut.boundary.iter().all(|e| {
        let mid = (e.start.pos.x + e.end.pos.x) / 2.0;
        !(1.0 + 1e-9..2.0 - 1e-9).contains(&mid)
    }));
}
