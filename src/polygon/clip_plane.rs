//! Cutting a polygon by an arbitrary 3D plane.
//!
//! **Algorithm**: vertex distances to the cutting plane are snapped to zero
//! within tolerance. Edges entirely on one side go to that side; crossing
//! edges are split at the hit point. Each side that is left open is closed
//! again with facet edges running along the line where the two planes meet:
//! on-plane edges are attached first, then every gap between consecutive
//! boundary items whose midpoint lies inside the polygon is added in the
//! direction that links an existing end to an existing start.

use crate::edge::Edge3;
use crate::float_types::{Real, tolerance};
use crate::plane::Plane;
use crate::polygon::Polygon;
use crate::vertex::Vertex;
use nalgebra::Vector3;
use tracing::{debug, warn};

/// Step cap for the loop-closing walk used to settle ambiguous facet edges.
const MAX_CLOSING_STEPS: usize = 10_000;

/// Result of [`Polygon::clip_by_plane`].
#[derive(Debug, Clone, Default)]
pub struct PlaneClip {
    /// Parts in front of the cutting plane.
    pub front: Vec<Polygon>,
    /// Parts behind the cutting plane.
    pub back: Vec<Polygon>,
    /// Facet edges created along the cut, oriented as in the front parts.
    pub boundary: Vec<Edge3>,
}

/// A stretch of the cut line already covered by the polygon: an on-plane edge
/// or a single boundary point.
#[derive(Debug, Clone, Copy)]
struct CutItem {
    t_min: Real,
    t_max: Real,
    min: Vertex,
    max: Vertex,
}

impl CutItem {
    fn point(vertex: Vertex, direction: &Vector3<Real>) -> Self {
        let t = direction.dot(&vertex.pos.coords);
        CutItem {
            t_min: t,
            t_max: t,
            min: vertex,
            max: vertex,
        }
    }

    fn edge(edge: &Edge3, direction: &Vector3<Real>) -> Self {
        let a = CutItem::point(edge.start, direction);
        let b = CutItem::point(edge.end, direction);
        if a.t_min <= b.t_min {
            CutItem {
                t_min: a.t_min,
                t_max: b.t_min,
                min: a.min,
                max: b.min,
            }
        } else {
            CutItem {
                t_min: b.t_min,
                t_max: a.t_min,
                min: b.min,
                max: a.min,
            }
        }
    }
}

fn starts_at(part: &[Edge3], vertex: &Vertex) -> bool {
    part.iter().any(|e| e.start.is_equivalent(vertex))
}

fn ends_at(part: &[Edge3], vertex: &Vertex) -> bool {
    part.iter().any(|e| e.end.is_equivalent(vertex))
}

/// Some edge lacks a predecessor or a successor.
fn is_open_part(part: &[Edge3]) -> bool {
    part.iter()
        .any(|e| !ends_at(part, &e.start) || !starts_at(part, &e.end))
}

/// Following successors from `from` reaches `to` within the step cap.
fn walk_reaches(part: &[Edge3], from: &Vertex, to: &Vertex) -> bool {
    let mut current = *from;
    for _ in 0..MAX_CLOSING_STEPS.min(part.len() + 1) {
        if current.is_equivalent(to) {
            return true;
        }
        match part.iter().find(|e| e.start.is_equivalent(&current)) {
            Some(next) => current = next.end,
            None => return false,
        }
    }
    if part.len() >= MAX_CLOSING_STEPS {
        warn!(edges = part.len(), "Loop-closing walk hit its step cap");
    }
    current.is_equivalent(to)
}

/// Direction `gap` should take in `part`, or `None` when it touches no end.
fn orient_gap(part: &[Edge3], gap: &Edge3) -> Option<Edge3> {
    let reversed_hint = starts_at(part, &gap.start) || ends_at(part, &gap.end);
    let forward_hint = ends_at(part, &gap.start) || starts_at(part, &gap.end);
    match (forward_hint, reversed_hint) {
        (true, false) => Some(*gap),
        (false, true) => Some(gap.inverted()),
        (true, true) => {
            if walk_reaches(part, &gap.end, &gap.start) {
                Some(*gap)
            } else {
                Some(gap.inverted())
            }
        },
        (false, false) => None,
    }
}

/// Direction an on-plane edge should take in `part`, or `None` when it
/// connects to nothing there.
fn orient_on_plane(part: &[Edge3], edge: &Edge3) -> Option<Edge3> {
    if ends_at(part, &edge.start) || starts_at(part, &edge.end) {
        Some(*edge)
    } else if ends_at(part, &edge.end) || starts_at(part, &edge.start) {
        Some(edge.inverted())
    } else {
        None
    }
}

fn push_unique(list: &mut Vec<Edge3>, edge: Edge3) {
    if !list.iter().any(|e| e.is_equivalent_undirected(&edge)) {
        list.push(edge);
    }
}

impl Polygon {
    /// Cut by `plane` into front and back parts.
    pub fn clip_by_plane(&self, plane: &Plane) -> PlaneClip {
        let mut boundary = Vec::new();
        let (front, back) = self.clip_by_plane_sharing(plane, &mut boundary);
        PlaneClip { front, back, boundary }
    }

    /// Cut by `plane`, adding new facet edges to `boundary` unless an
    /// equivalent edge is already there. Lets several polygons cut by one
    /// plane share a single facet outline.
    pub fn clip_by_plane_sharing(&self, plane: &Plane, boundary: &mut Vec<Edge3>) -> (Vec<Polygon>, Vec<Polygon>) {
        if !self.is_valid() {
            return (Vec::new(), Vec::new());
        }
        if self.plane().is_equivalent(plane) {
            return (vec![self.clone()], Vec::new());
        }
        if self.plane().is_equivalent(&plane.inverted()) {
            return (Vec::new(), vec![self.clone()]);
        }
        let above = self.vertex_count_above(plane);
        if above == self.vertex_count() {
            return (vec![self.clone()], Vec::new());
        }
        if above == 0 {
            return (Vec::new(), vec![self.clone()]);
        }

        if self.is_open() {
            return self.clip_open_by_plane(plane);
        }

        let eps = tolerance();
        let distance = |v: &Vertex| {
            let d = plane.distance(&v.pos);
            if d.abs() < eps { 0.0 } else { d }
        };

        let mut front: Vec<Edge3> = Vec::new();
        let mut back: Vec<Edge3> = Vec::new();
        let mut on_plane: Vec<Edge3> = Vec::new();
        let mut points: Vec<Vertex> = Vec::new();

        for edge in self.edges_3d() {
            let (d0, d1) = (distance(&edge.start), distance(&edge.end));
            if d0 == 0.0 {
                points.push(edge.start);
            }
            if d0 == 0.0 && d1 == 0.0 {
                on_plane.push(edge);
            } else if d0 >= 0.0 && d1 >= 0.0 {
                front.push(edge);
            } else if d0 <= 0.0 && d1 <= 0.0 {
                back.push(edge);
            } else {
                let hit = edge.start.interpolate(&edge.end, d0 / (d0 - d1));
                points.push(hit);
                let (head, tail) = (Edge3::new(edge.start, hit), Edge3::new(hit, edge.end));
                if d0 > 0.0 {
                    front.push(head);
                    back.push(tail);
                } else {
                    front.push(tail);
                    back.push(head);
                }
            }
        }

        for part in [&mut front, &mut back] {
            if part.is_empty() || !is_open_part(part) {
                continue;
            }
            for edge in &on_plane {
                if let Some(oriented) = orient_on_plane(part, edge) {
                    part.push(oriented);
                }
            }
        }

        if (!front.is_empty() && is_open_part(&front)) || (!back.is_empty() && is_open_part(&back)) {
            for gap in self.cut_gaps(plane, &on_plane, &points) {
                let mut facet = gap;
                if !front.is_empty() && is_open_part(&front) {
                    if let Some(oriented) = orient_gap(&front, &gap) {
                        front.push(oriented);
                        facet = oriented;
                    }
                }
                if !back.is_empty() && is_open_part(&back) {
                    if let Some(oriented) = orient_gap(&back, &gap) {
                        back.push(oriented);
                    }
                }
                push_unique(boundary, facet);
            }
        }

        debug!(
            polygon = self.id().get(),
            front_edges = front.len(),
            back_edges = back.len(),
            "Clipped by plane"
        );
        (self.finish_part(&front), self.finish_part(&back))
    }

    /// Gaps along the cut line between consecutive covered stretches whose
    /// midpoint is inside the polygon.
    fn cut_gaps(&self, plane: &Plane, on_plane: &[Edge3], points: &[Vertex]) -> Vec<Edge3> {
        let Some((_, direction)) = self.plane().intersection_line(plane) else {
            return Vec::new();
        };
        let mut items: Vec<CutItem> = on_plane
            .iter()
            .map(|e| CutItem::edge(e, &direction))
            .chain(points.iter().map(|p| CutItem::point(*p, &direction)))
            .collect();
        items.sort_by(|a, b| a.t_min.total_cmp(&b.t_min));

        // Merge overlapping stretches
        let eps = tolerance();
        let mut merged: Vec<CutItem> = Vec::with_capacity(items.len());
        for item in items {
            match merged.last_mut() {
                Some(last) if item.t_min <= last.t_max + eps => {
                    if item.t_max > last.t_max {
                        last.t_max = item.t_max;
                        last.max = item.max;
                    }
                },
                _ => merged.push(item),
            }
        }

        merged
            .windows(2)
            .filter_map(|pair| {
                let gap = Edge3::new(pair[0].max, pair[1].min);
                let inside = self.partition().is_some_and(|tree| tree.is_inside(&gap, false));
                (!gap.is_point() && inside).then_some(gap)
            })
            .collect()
    }

    /// Turn one side's edges into polygons: one per outer loop, or the whole
    /// part when it has holes or could not be closed.
    fn finish_part(&self, edges: &[Edge3]) -> Vec<Polygon> {
        if edges.len() < 3 {
            return Vec::new();
        }
        let mut part = self.blank_like();
        if part.commit_edges(edges).is_err() {
            return Vec::new();
        }
        part.reset_uvs();
        if part.is_open() || part.has_holes() {
            return vec![part];
        }
        let outers: Vec<Polygon> = part
            .loops()
            .outers
            .iter()
            .map(|outer| {
                let mut piece = outer.polygon.clone();
                piece.reset_uvs();
                piece
            })
            .collect();
        if outers.is_empty() { vec![part] } else { outers }
    }

    /// Open polylines are split edge by edge, with no facet bookkeeping.
    fn clip_open_by_plane(&self, plane: &Plane) -> (Vec<Polygon>, Vec<Polygon>) {
        let mut front = self.blank_like();
        let mut back = self.blank_like();
        for edge in self.edges_3d() {
            let (d0, d1) = (plane.distance(&edge.start.pos), plane.distance(&edge.end.pos));
            let eps = tolerance();
            if d0 >= -eps && d1 >= -eps {
                front.add_edge(&edge);
            } else if d0 <= eps && d1 <= eps {
                back.add_edge(&edge);
            } else {
                let hit = edge.start.interpolate(&edge.end, d0 / (d0 - d1));
                let (head, tail) = (Edge3::new(edge.start, hit), Edge3::new(hit, edge.end));
                if d0 > 0.0 {
                    front.add_edge(&head);
                    back.add_edge(&tail);
                } else {
                    front.add_edge(&tail);
                    back.add_edge(&head);
                }
            }
        }
        let finish = |mut part: Polygon| {
            if !part.is_valid() {
                return Vec::new();
            }
            part.reset_uvs();
            vec![part]
        };
        (finish(front), finish(back))
    }
}
