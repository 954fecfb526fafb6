mod support;

use brushcsg::{Decomposer, float_types::tolerance};
use support::*;

#[test]
fn convex_pentagon_gives_three_triangles() {
    let pentagon = regular(5, 1.0);
    let triangles = Decomposer::triangulate(&pentagon);
    assert_eq!(triangles.len(), 3);
    let plane = pentagon.plane();
    for t in &triangles {
        let [a, b, c] = t.indices.map(|i| plane.w2p(&pentagon.vertices()[i].pos));
        assert!((b - a).perp(&(c - a)) > tolerance());
    }
    assert!(approx_eq(triangle_area(&pentagon, &triangles), pentagon.area(), 1e-9));
}

#[test]
fn holed_square_triangle_count_and_area() {
    let mut holed = square(0.0, 0.0, 3.0);
    holed.subtract(&square(1.0, 1.0, 1.0)).unwrap();
    let holes = holed.loops().holes.len();
    let triangles = holed.triangles();

    assert_eq!(triangles.len(), holed.vertex_count() - 2 + 2 * holes);
    assert!(approx_eq(triangle_area(&holed, triangles), 8.0, 1e-9));
}

#[test]
fn concave_outline_triangulates_by_sweep() {
    // Comb with two teeth pointing up
    let comb = polygon_xy(&[
        (0.0, 0.0),
        (5.0, 0.0),
        (5.0, 3.0),
        (4.0, 3.0),
        (3.0, 1.0),
        (2.0, 3.0),
        (1.0, 1.0),
        (0.0, 3.0),
    ]);
    let triangles = comb.triangles();
    assert_eq!(triangles.len(), 6);
    assert!(approx_eq(triangle_area(&comb, triangles), comb.area(), 1e-9));
}

#[test]
fn triangles_carry_material_and_back_faces_double() {
    let mut quad = square(0.0, 0.0, 1.0);
    quad.set_material_id(12);
    assert!(quad.triangles().iter().all(|t| t.material_id == 12));
    let both = quad.triangles_with_back_faces();
    assert_eq!(both.len(), 4);
    assert_eq!(both[2], both[0].reversed());
}

#[test]
fn l_shape_merges_into_two_convex_pieces() {
    let l_shape = polygon_xy(&[(0.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0), (1.0, 2.0), (0.0, 2.0)]);
    let convexes = l_shape.convexes();
    assert!(convexes.len() >= 2 && convexes.len() <= 3);
    let covered: usize = convexes.iter().map(|c| c.indices.len() - 2).sum();
    assert_eq!(covered, l_shape.triangles().len());
}

#[test]
fn convex_polygon_is_one_piece() {
    let hexagon = regular(6, 2.0);
    let convexes = Decomposer::decompose_to_convexes(&hexagon);
    assert_eq!(convexes.len(), 1);
    assert_eq!(convexes[0].indices.len(), 6);
}

#[test]
fn open_polyline_has_no_triangles() {
    let mut path = square(0.0, 0.0, 1.0);
    path.remove_edge_at(0).unwrap();
    assert!(path.is_open());
    assert!(path.triangles().is_empty());
    assert!(path.convexes().is_empty());
}
