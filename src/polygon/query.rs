//! Read-only polygon queries: containment, intersection, equivalence, nearest
//! points, bounds, centres and the cached decompositions.

use crate::bsp::{Classification, IntersectionKind};
use crate::decompose::{Convex, Decomposer, Triangle};
use crate::edge::Edge3;
use crate::float_types::{Real, parry3d::bounding_volume::Aabb};
use crate::plane::{FRONT, Plane};
use crate::polygon::Polygon;
use crate::vertex::Vertex;
use geo::{Area, Coord, LineString, MultiPolygon, Polygon as GeoPolygon};
use nalgebra::{Point3, Vector3};

impl IntersectionKind {
    /// Symmetric intersection test: the stronger of both one-sided answers.
    pub fn between(a: &Polygon, b: &Polygon) -> IntersectionKind {
        let rank = |kind: IntersectionKind| match kind {
            IntersectionKind::None => 0,
            IntersectionKind::JustTouch => 1,
            IntersectionKind::Intersection => 2,
        };
        let forward = a.intersection_with(b);
        if forward == IntersectionKind::Intersection {
            return forward;
        }
        let backward = b.intersection_with(a);
        if rank(backward) > rank(forward) { backward } else { forward }
    }
}

impl Polygon {
    /// Classify a point on the polygon plane; `Outside` without a partition.
    pub fn classify(&self, pos: &Point3<Real>) -> Classification {
        self.partition()
            .map_or(Classification::Outside, |tree| tree.classify(pos))
    }

    /// `pos` lies inside or on the boundary.
    pub fn include(&self, pos: &Point3<Real>) -> bool {
        self.classify(pos) != Classification::Outside
    }

    pub fn is_plane_equivalent(&self, other: &Polygon) -> bool {
        self.plane().is_equivalent(other.plane())
    }

    /// Same counts, flags and plane, and every edge of `other` present with
    /// its direction.
    pub fn is_equivalent(&self, other: &Polygon) -> bool {
        self.edge_count() == other.edge_count()
            && self.vertex_count() == other.vertex_count()
            && self.flags() == other.flags()
            && self.is_plane_equivalent(other)
            && other.edges_3d().all(|edge| self.has_edge(&edge, true))
    }

    pub fn has_edge(&self, edge: &Edge3, respect_direction: bool) -> bool {
        self.edges_3d().any(|own| {
            if respect_direction {
                own.is_equivalent(edge)
            } else {
                own.is_equivalent_undirected(edge)
            }
        })
    }

    /// Index of the edge equivalent to `edge` in the same direction.
    pub fn edge_index_of(&self, edge: &Edge3) -> Option<usize> {
        self.edges_3d().position(|own| own.is_equivalent(edge))
    }

    pub fn has_position(&self, pos: &Point3<Real>) -> bool {
        self.vertex_index_of(pos).is_some()
    }

    pub fn vertex_index_of(&self, pos: &Point3<Real>) -> Option<usize> {
        let target = Vertex::from_pos(*pos);
        self.vertices().iter().position(|v| v.is_equivalent(&target))
    }

    pub fn is_position_on_boundary(&self, pos: &Point3<Real>) -> bool {
        self.edges_3d().any(|edge| edge.contains_point(pos))
    }

    /// Index of the edge closest to `pos`.
    pub fn nearest_edge(&self, pos: &Point3<Real>) -> Option<usize> {
        self.edges_3d()
            .enumerate()
            .map(|(i, edge)| (i, edge.distance_squared(pos)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Closest boundary point to `pos`.
    pub fn nearest_pos(&self, pos: &Point3<Real>) -> Option<Point3<Real>> {
        let index = self.nearest_edge(pos)?;
        self.edge(index).map(|edge| edge.nearest_point(pos).0)
    }

    /// Some part of `edge` lies strictly inside.
    pub fn has_edge_intersection(&self, edge: &Edge3) -> bool {
        self.partition().is_some_and(|tree| tree.has_intersection(edge))
    }

    /// `other` reaches into this polygon's interior.
    pub fn has_intersection(&self, other: &Polygon) -> bool {
        self.intersection_with(other) == IntersectionKind::Intersection
    }

    /// How `other` meets this polygon, tested one way: `other`'s vertices and
    /// edges against this polygon's partition.
    ///
    /// A contact at a single shared vertex only counts as touching when an edge
    /// pair meeting there overlaps along a line.
    pub fn intersection_with(&self, other: &Polygon) -> IntersectionKind {
        if !self.is_valid() || !other.is_valid() {
            return IntersectionKind::None;
        }
        let Some(tree) = self.partition() else {
            return IntersectionKind::None;
        };
        if !self.is_plane_equivalent(other) {
            return IntersectionKind::None;
        }
        if self.is_equivalent(other) {
            return IntersectionKind::Intersection;
        }

        let mut touched = false;
        for vertex in other.vertices() {
            match tree.classify(&vertex.pos) {
                Classification::Inside => return IntersectionKind::Intersection,
                Classification::Border => touched = true,
                Classification::Outside => {},
            }
        }
        for edge in other.edges_3d() {
            match tree.intersection(&edge) {
                IntersectionKind::Intersection => return IntersectionKind::Intersection,
                IntersectionKind::JustTouch => touched = true,
                IntersectionKind::None => {},
            }
        }
        if !touched {
            return IntersectionKind::None;
        }

        let shared: Vec<Point3<Real>> = other
            .vertices()
            .iter()
            .filter(|v| self.has_position(&v.pos))
            .map(|v| v.pos)
            .collect();
        if shared.len() != 1 {
            return IntersectionKind::JustTouch;
        }

        let at = Vertex::from_pos(shared[0]);
        let touching = |polygon: &Polygon| -> Vec<Edge3> {
            polygon
                .edges_3d()
                .filter(|e| e.start.is_equivalent(&at) || e.end.is_equivalent(&at))
                .collect()
        };
        let covers = |a: &Edge3, b: &Edge3| a.contains_point(&b.start.pos) && a.contains_point(&b.end.pos);
        let (mine, theirs) = (touching(self), touching(other));
        let overlapping = mine
            .iter()
            .any(|a| theirs.iter().any(|b| covers(a, b) || covers(b, a)));
        if overlapping {
            IntersectionKind::JustTouch
        } else {
            IntersectionKind::None
        }
    }

    /// Axis-aligned bounds of the vertices; an origin box when empty.
    pub fn bounding_box(&self) -> Aabb {
        *self.cache.bounding_box.get_or_init(|| {
            let mut mins = Point3::new(Real::MAX, Real::MAX, Real::MAX);
            let mut maxs = Point3::new(-Real::MAX, -Real::MAX, -Real::MAX);
            for v in self.vertices() {
                mins = mins.inf(&v.pos);
                maxs = maxs.sup(&v.pos);
            }
            if self.vertices().is_empty() {
                return Aabb::new(Point3::origin(), Point3::origin());
            }
            Aabb::new(mins, maxs)
        })
    }

    /// Bounds grown by `offset` on every side.
    pub fn expanded_bounding_box(&self, offset: Real) -> Aabb {
        let aabb = self.bounding_box();
        let grow = Vector3::repeat(offset);
        Aabb::new(aabb.mins - grow, aabb.maxs + grow)
    }

    /// `pos` lies within the bounds, ignoring the polygon shape.
    pub fn bounds_contain(&self, pos: &Point3<Real>) -> bool {
        self.bounding_box().contains_local_point(pos)
    }

    /// Half the diagonal of the bounding box.
    pub fn radius(&self) -> Real {
        self.bounding_box().half_extents().norm()
    }

    pub fn center_position(&self) -> Point3<Real> {
        self.bounding_box().center()
    }

    pub fn average_position(&self) -> Point3<Real> {
        if self.vertices().is_empty() {
            return Point3::origin();
        }
        let sum: Vector3<Real> = self.vertices().iter().map(|v| v.pos.coords).sum();
        Point3::from(sum / self.vertex_count() as Real)
    }

    /// A point identifying the polygon for picking: the middle of an open
    /// polyline's walk, otherwise the vertex average.
    pub fn representative_position(&self) -> Point3<Real> {
        *self.cache.representative.get_or_init(|| {
            if !self.is_open() {
                return self.average_position();
            }
            match self.linked_vertices() {
                Some(path) if !path.is_empty() => {
                    let mid = path.len() / 2;
                    if path.len() % 2 == 0 {
                        nalgebra::center(&path[mid - 1].pos, &path[mid].pos)
                    } else {
                        path[mid].pos
                    }
                },
                _ => self.average_position(),
            }
        })
    }

    /// Newell plane of the linked outline.
    pub fn computed_plane(&self) -> Option<Plane> {
        let ring = self.linked_vertices()?;
        let positions: Vec<Point3<Real>> = ring.iter().map(|v| v.pos).collect();
        Plane::from_positions(&positions)
    }

    /// Start of an open polyline: a vertex with outgoing but no incoming edges.
    pub fn first_vertex(&self) -> Option<Vertex> {
        if !self.is_open() {
            return None;
        }
        let topology = self.topology();
        self.edges()
            .iter()
            .map(|e| e[0])
            .find(|&v| topology.incoming(v).is_empty())
            .map(|v| self.vertices()[v])
    }

    /// End of an open polyline: a vertex with incoming but no outgoing edges.
    pub fn last_vertex(&self) -> Option<Vertex> {
        if !self.is_open() {
            return None;
        }
        let topology = self.topology();
        self.edges()
            .iter()
            .map(|e| e[1])
            .find(|&v| topology.outgoing(v).is_empty())
            .map(|v| self.vertices()[v])
    }

    pub fn is_end_point(&self, pos: &Point3<Real>) -> bool {
        let target = Vertex::from_pos(*pos);
        [self.first_vertex(), self.last_vertex()]
            .into_iter()
            .flatten()
            .any(|v| v.is_equivalent(&target))
    }

    /// Split an open edge soup into its separate polylines. A closed polygon
    /// is returned whole.
    pub fn isolated_paths(&self) -> Vec<Polygon> {
        if !self.is_open() {
            return vec![self.clone()];
        }
        let topology = self.topology();
        let mut visited = vec![false; self.edge_count()];
        let mut paths = Vec::new();

        for start in 0..self.edge_count() {
            if visited[start] || topology.adjacent(start).0.is_some() {
                continue;
            }
            let mut chain = vec![self.edges()[start][0]];
            let mut current = Some(start);
            while let Some(edge) = current {
                if visited[edge] {
                    break;
                }
                visited[edge] = true;
                chain.push(self.edges()[edge][1]);
                current = topology.adjacent(edge).1;
            }
            let vertices = chain.into_iter().map(|i| self.vertices()[i]).collect();
            let mut path = Polygon::new(vertices, *self.plane(), self.material_id(), false);
            path.set_flags(self.flags());
            paths.push(path);
        }
        paths
    }

    /// Vertices strictly in front of `plane`.
    pub fn vertex_count_above(&self, plane: &Plane) -> usize {
        self.vertices()
            .iter()
            .filter(|v| plane.orient_point(&v.pos) == FRONT)
            .count()
    }

    pub fn is_triangle(&self) -> bool {
        self.vertex_count() == 3 && self.edge_count() == 3 && !self.is_open()
    }

    pub fn is_quad(&self) -> bool {
        self.vertex_count() == 4 && self.edge_count() == 4 && !self.is_open()
    }

    /// Islands in plane coordinates, holes as interior rings.
    pub fn to_geo(&self) -> MultiPolygon<Real> {
        let plane = self.plane();
        let ring = |polygon: &Polygon| -> LineString<Real> {
            let points: Vec<Coord<Real>> = polygon
                .linked_vertices()
                .unwrap_or_default()
                .iter()
                .map(|v| {
                    let p = plane.w2p(&v.pos);
                    Coord { x: p.x, y: p.y }
                })
                .collect();
            LineString::new(points)
        };
        let loops = self.loops();
        let polygons = loops
            .islands
            .iter()
            .map(|island| {
                let exterior = ring(&loops.outers[island.outer].polygon);
                let interiors = island.holes.iter().map(|&h| ring(&loops.holes[h].polygon)).collect();
                GeoPolygon::new(exterior, interiors)
            })
            .collect();
        MultiPolygon::new(polygons)
    }

    /// Enclosed area: outer loops minus holes.
    pub fn area(&self) -> Real {
        self.to_geo().unsigned_area()
    }

    /// Triangles over this polygon's vertex indices.
    pub fn triangles(&self) -> &[Triangle] {
        self.cache.triangles.get_or_init(|| Decomposer::triangulate(self))
    }

    /// Triangles followed by a reversed copy of each, for double-sided use.
    pub fn triangles_with_back_faces(&self) -> Vec<Triangle> {
        let front = self.triangles();
        let mut all = Vec::with_capacity(front.len() * 2);
        all.extend_from_slice(front);
        all.extend(front.iter().map(Triangle::reversed));
        all
    }

    /// Convex cover merged from the triangulation.
    pub fn convexes(&self) -> &[Convex] {
        self.cache
            .convexes
            .get_or_init(|| Decomposer::merge_convex(self, self.triangles()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_at(x: Real, y: Real, size: Real) -> Polygon {
        Polygon::from_positions(&[
            Point3::new(x, y, 0.0),
            Point3::new(x + size, y, 0.0),
            Point3::new(x + size, y + size, 0.0),
            Point3::new(x, y + size, 0.0),
        ])
        .unwrap()
    }

    fn square(x: Real, size: Real) -> Polygon {
        square_at(x, 0.0, size)
    }

    #[test]
    fn overlapping_squares_intersect() {
        let a = square(0.0, 1.0);
        let b = square(0.5, 1.0);
        assert_eq!(a.intersection_with(&b), IntersectionKind::Intersection);
        assert!(a.has_intersection(&b));
    }

    #[test]
    fn squares_sharing_a_side_just_touch() {
        let a = square(0.0, 1.0);
        let b = square(1.0, 1.0);
        assert_eq!(IntersectionKind::between(&a, &b), IntersectionKind::JustTouch);
    }

    #[test]
    fn contained_square_is_found_from_either_side() {
        let outer = square(0.0, 4.0);
        let inner = square_at(1.0, 1.0, 1.0);
        assert_eq!(inner.intersection_with(&outer), IntersectionKind::None);
        assert_eq!(IntersectionKind::between(&inner, &outer), IntersectionKind::Intersection);
    }

    #[test]
    fn inner_square_on_outer_side_just_touches() {
        let outer = square(0.0, 4.0);
        let inner = square(1.0, 1.0);
        assert_eq!(inner.intersection_with(&outer), IntersectionKind::JustTouch);
    }

    #[test]
    fn bounds_and_centres() {
        let sq = square(0.0, 2.0);
        let aabb = sq.bounding_box();
        assert_eq!(aabb.mins, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.maxs, Point3::new(2.0, 2.0, 0.0));
        assert_eq!(sq.center_position(), Point3::new(1.0, 1.0, 0.0));
        assert!((sq.radius() - Real::sqrt(2.0)).abs() < 1e-9);
        assert!(sq.bounds_contain(&Point3::new(0.5, 0.5, 0.0)));
        assert!((sq.area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn polyline_end_points_and_representative() {
        let line = Polygon::new(
            vec![
                Vertex::from_pos(Point3::new(0.0, 0.0, 0.0)),
                Vertex::from_pos(Point3::new(1.0, 0.0, 0.0)),
                Vertex::from_pos(Point3::new(2.0, 1.0, 0.0)),
            ],
            Plane::default(),
            0,
            false,
        );
        assert!(line.is_end_point(&Point3::new(2.0, 1.0, 0.0)));
        assert!(!line.is_end_point(&Point3::new(1.0, 0.0, 0.0)));
        assert_eq!(line.representative_position(), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(line.isolated_paths().len(), 1);
    }

    #[test]
    fn nearest_queries() {
        let sq = square(0.0, 2.0);
        let p = Point3::new(1.0, -1.0, 0.0);
        assert_eq!(sq.nearest_edge(&p), Some(0));
        assert_eq!(sq.nearest_pos(&p), Some(Point3::new(1.0, 0.0, 0.0)));
        assert!(sq.is_position_on_boundary(&Point3::new(2.0, 1.0, 0.0)));
        assert!(sq.include(&Point3::new(1.0, 1.0, 0.0)));
        assert!(!sq.include(&Point3::new(3.0, 1.0, 0.0)));
    }
}
