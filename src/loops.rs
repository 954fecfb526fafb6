//! Loop extraction: turning a polygon's edge soup back into simple closed
//! loops, classifying them as outer boundaries or holes, and grouping holes
//! into islands.
//!
//! Walks take the sharpest right turn at branching vertices. Two outer loops
//! that touch at a single vertex are traced as one figure-eight loop.

use crate::float_types::{Real, tolerance};
use crate::polygon::Polygon;
use crate::polygon::topology::Topology;
use hashbrown::HashSet;
use tracing::{trace, warn};

/// A closed loop (or open path) of the source polygon.
#[derive(Debug, Clone)]
pub struct Loop {
    /// Source vertex indices in walk order.
    pub indices: Vec<usize>,
    /// The loop as a polygon of its own, sharing the source plane, material
    /// and flags.
    pub polygon: Polygon,
}

/// An outer loop and the holes it encloses, as indices into
/// [`Loops::outers`] and [`Loops::holes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Island {
    pub outer: usize,
    pub holes: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Loops {
    /// Counter-clockwise loops about the plane normal.
    pub outers: Vec<Loop>,
    /// Clockwise loops.
    pub holes: Vec<Loop>,
    pub islands: Vec<Island>,
    /// Chains that never closed.
    pub open_paths: Vec<Loop>,
}

impl Loops {
    pub fn is_empty(&self) -> bool {
        self.outers.is_empty() && self.holes.is_empty() && self.open_paths.is_empty()
    }
}

pub struct LoopExtractor;

impl LoopExtractor {
    pub fn extract(polygon: &Polygon) -> Loops {
        let mut loops = Loops::default();
        if !polygon.is_valid() {
            return loops;
        }
        let topology = polygon.topology();
        let edges = polygon.edges();
        let mut claimed = vec![false; edges.len()];

        for start in 0..edges.len() {
            if claimed[start] {
                continue;
            }
            let Some(chain) = walk_closed(&topology, &claimed, start) else {
                continue;
            };
            for &edge in &chain {
                claimed[edge] = true;
            }
            let indices: Vec<usize> = chain.iter().map(|&e| edges[e][0]).collect();
            let area = signed_area(polygon, &indices);
            let eps = tolerance() * tolerance();
            if indices.len() < 3 || area.abs() <= eps {
                trace!(polygon = polygon.id().get(), len = indices.len(), "Dropping degenerate loop");
                continue;
            }
            let found = Loop {
                polygon: loop_polygon(polygon, &indices, true),
                indices,
            };
            if area > 0.0 {
                loops.outers.push(found);
            } else {
                loops.holes.push(found);
            }
        }

        loops.open_paths = open_paths(polygon, &topology, &mut claimed);
        loops.islands = group_islands(&loops.outers, &loops.holes);
        loops
    }
}

/// Follow successors from `start` until the chain returns to its first
/// vertex. Returns the edge indices, or `None` at a dead end.
fn walk_closed(topology: &Topology<'_>, claimed: &[bool], start: usize) -> Option<Vec<usize>> {
    let edges = topology.edges;
    let origin = edges[start][0];
    let mut chain = vec![start];
    let mut in_chain: HashSet<usize> = HashSet::from([start]);
    let mut current = start;

    for _ in 0..=edges.len() {
        let edge = edges[current];
        if edge[1] == origin {
            return Some(chain);
        }
        let options: Vec<usize> = topology
            .outgoing(edge[1])
            .into_iter()
            .filter(|&i| !claimed[i] && !in_chain.contains(&i) && edges[i][1] != edge[0])
            .collect();
        let next = match options.as_slice() {
            [] => return None,
            [only] => *only,
            _ => {
                let far: Vec<usize> = options.iter().map(|&i| edges[i][1]).collect();
                let v = topology.choose_next(edge, &far)?;
                *options.iter().find(|&&i| edges[i][1] == v)?
            },
        };
        chain.push(next);
        in_chain.insert(next);
        current = next;
    }

    warn!(start, edges = edges.len(), "Loop walk hit its iteration cap");
    None
}

/// Unclaimed edges chained into polylines, starting where no unclaimed edge
/// leads in.
fn open_paths(polygon: &Polygon, topology: &Topology<'_>, claimed: &mut [bool]) -> Vec<Loop> {
    let edges = topology.edges;
    let mut paths = Vec::new();
    let has_open_predecessor =
        |claimed: &[bool], i: usize| topology.incoming(edges[i][0]).into_iter().any(|k| !claimed[k] && k != i);

    // Chains with a real start first, then whatever cycles remain
    let mut starts: Vec<usize> = (0..edges.len())
        .filter(|&i| !claimed[i] && !has_open_predecessor(claimed, i))
        .collect();
    starts.extend((0..edges.len()).filter(|&i| !claimed[i]));

    for start in starts {
        if claimed[start] {
            continue;
        }
        let mut indices = vec![edges[start][0]];
        let mut current = Some(start);
        while let Some(edge) = current {
            claimed[edge] = true;
            indices.push(edges[edge][1]);
            current = topology
                .outgoing(edges[edge][1])
                .into_iter()
                .find(|&k| !claimed[k]);
        }
        paths.push(Loop {
            polygon: loop_polygon(polygon, &indices, false),
            indices,
        });
    }
    paths
}

/// Shoelace area of a loop in plane coordinates (positive when
/// counter-clockwise about the plane normal).
pub(crate) fn signed_area(polygon: &Polygon, indices: &[usize]) -> Real {
    let plane = polygon.plane();
    let n = indices.len();
    let mut twice = 0.0;
    for i in 0..n {
        let a = plane.w2p(&polygon.vertices()[indices[i]].pos);
        let b = plane.w2p(&polygon.vertices()[indices[(i + 1) % n]].pos);
        twice += a.x * b.y - b.x * a.y;
    }
    0.5 * twice
}

fn loop_polygon(source: &Polygon, indices: &[usize], closed: bool) -> Polygon {
    let vertices = indices.iter().map(|&i| source.vertices()[i]).collect();
    let mut polygon = Polygon::new(vertices, *source.plane(), source.material_id(), closed);
    polygon.set_flags(source.flags());
    polygon
}

/// Give each hole to the smallest outer loop containing all of its edges.
fn group_islands(outers: &[Loop], holes: &[Loop]) -> Vec<Island> {
    let mut islands: Vec<Island> = (0..outers.len())
        .map(|outer| Island {
            outer,
            holes: Vec::new(),
        })
        .collect();
    let areas: Vec<Real> = outers
        .iter()
        .map(|o| signed_area(&o.polygon, &(0..o.indices.len()).collect::<Vec<_>>()))
        .collect();

    for (h, hole) in holes.iter().enumerate() {
        let owner = outers
            .iter()
            .enumerate()
            .filter(|(_, outer)| {
                outer.polygon.partition().is_some_and(|tree| {
                    hole.polygon
                        .edges_3d()
                        .all(|edge| tree.is_inside(&edge, false))
                })
            })
            .min_by(|a, b| areas[a.0].total_cmp(&areas[b.0]))
            .map(|(i, _)| i);
        match owner {
            Some(i) => islands[i].holes.push(h),
            None => warn!(hole = h, "Hole lies outside every outer loop"),
        }
    }
    islands
}
