mod support;

use brushcsg::{PersistError, Polygon, PolygonFlags};
use support::*;

#[test]
fn holed_polygon_round_trips() {
    let mut holed = square(0.0, 0.0, 3.0);
    holed.subtract(&square(1.0, 1.0, 1.0)).unwrap();
    holed.set_material_id(42);
    holed.add_flags(PolygonFlags::MIRRORED);

    let loaded = Polygon::from_bytes(&holed.to_bytes()).unwrap();
    assert_eq!(loaded.vertices(), holed.vertices());
    assert_eq!(loaded.edges(), holed.edges());
    assert_eq!(loaded.plane(), holed.plane());
    assert_eq!(loaded.material_id(), 42);
    assert!(loaded.has_flags(PolygonFlags::MIRRORED));
    assert!(approx_eq(loaded.area(), 8.0, 1e-9));
}

#[test]
fn stream_round_trip() {
    let pentagon = regular(5, 1.0);
    let mut buffer = Vec::new();
    pentagon.write_to(&mut buffer).unwrap();
    let loaded = Polygon::read_from(&mut buffer.as_slice()).unwrap();
    assert_eq!(loaded.edges(), pentagon.edges());
}

#[test]
fn empty_input_is_truncated() {
    assert!(matches!(
        Polygon::from_bytes(&[]),
        Err(PersistError::Truncated { needed: 4, available: 0 })
    ));
}
