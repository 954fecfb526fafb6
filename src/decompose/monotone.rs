//! Sweep-line decomposition into y-monotone pieces and the two-chain stack
//! triangulation of each piece.
//!
//! Sweep order is descending `y`, ties by ascending `x`, in plane coordinates.
//! Every ring is oriented so the interior lies to the left of its edges
//! (outer counter-clockwise, holes clockwise).

use super::{Ring, area_epsilon, orient};
use crate::float_types::{Real, TAU};
use hashbrown::HashSet;
use nalgebra::{Point2, Vector2};
use std::cmp::Ordering;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VertexClass {
    Start,
    End,
    Split,
    Merge,
    Regular,
}

/// All island rings flattened into one node list with ring links.
struct Outline {
    points: Vec<Point2<Real>>,
    sources: Vec<usize>,
    next: Vec<usize>,
    prev: Vec<usize>,
}

impl Outline {
    fn new(outer: &Ring, holes: &[Ring]) -> Self {
        let mut outline = Outline {
            points: Vec::new(),
            sources: Vec::new(),
            next: Vec::new(),
            prev: Vec::new(),
        };
        for ring in std::iter::once(outer).chain(holes) {
            let base = outline.points.len();
            let n = ring.points.len();
            for i in 0..n {
                outline.points.push(ring.points[i]);
                outline.sources.push(ring.sources[i]);
                outline.next.push(base + (i + 1) % n);
                outline.prev.push(base + (i + n - 1) % n);
            }
        }
        outline
    }

    fn len(&self) -> usize {
        self.points.len()
    }

    /// `a` comes before `b` in sweep order.
    fn above(&self, a: usize, b: usize) -> bool {
        sweep_cmp(&self.points[a], &self.points[b]) == Ordering::Less
    }

    fn classify(&self, v: usize) -> VertexClass {
        let (p, n) = (self.prev[v], self.next[v]);
        let turn = orient(&self.points[p], &self.points[v], &self.points[n]);
        let prev_below = self.above(v, p);
        let next_below = self.above(v, n);
        match (prev_below, next_below) {
            (true, true) if turn > 0.0 => VertexClass::Start,
            (true, true) => VertexClass::Split,
            (false, false) if turn > 0.0 => VertexClass::End,
            (false, false) => VertexClass::Merge,
            _ => VertexClass::Regular,
        }
    }

    /// `x` of the edge starting at `e` on the horizontal line through `y`.
    fn edge_x_at(&self, e: usize, y: Real) -> Real {
        let a = self.points[e];
        let b = self.points[self.next[e]];
        let dy = b.y - a.y;
        if dy.abs() < Real::EPSILON {
            return a.x.min(b.x);
        }
        a.x + (y - a.y) * (b.x - a.x) / dy
    }
}

/// Descending `y`, ties by ascending `x`.
fn sweep_cmp(a: &Point2<Real>, b: &Point2<Real>) -> Ordering {
    b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x))
}

/// Active edges crossing the sweep line, each with its helper vertex.
#[derive(Default)]
struct ActiveEdges {
    edges: Vec<(usize, usize)>,
}

impl ActiveEdges {
    fn insert(&mut self, edge: usize, helper: usize) {
        self.edges.push((edge, helper));
    }

    fn remove(&mut self, edge: usize) -> Option<usize> {
        let pos = self.edges.iter().position(|(e, _)| *e == edge)?;
        Some(self.edges.swap_remove(pos).1)
    }

    fn helper(&self, edge: usize) -> Option<usize> {
        self.edges.iter().find(|(e, _)| *e == edge).map(|(_, h)| *h)
    }

    fn set_helper(&mut self, edge: usize, helper: usize) {
        if let Some(entry) = self.edges.iter_mut().find(|(e, _)| *e == edge) {
            entry.1 = helper;
        }
    }

    /// The active edge directly left of `v`.
    fn left_of(&self, outline: &Outline, v: usize) -> Option<usize> {
        let p = outline.points[v];
        let eps = crate::float_types::tolerance();
        self.edges
            .iter()
            .map(|(e, _)| *e)
            .filter(|&e| e != v && outline.next[e] != v)
            .map(|e| (e, outline.edge_x_at(e, p.y)))
            .filter(|(_, x)| *x <= p.x + eps)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(e, _)| e)
    }
}

/// Diagonals that cut the island into y-monotone pieces.
fn monotone_diagonals(outline: &Outline) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = (0..outline.len()).collect();
    order.sort_by(|&a, &b| sweep_cmp(&outline.points[a], &outline.points[b]));
    let classes: Vec<VertexClass> = (0..outline.len()).map(|v| outline.classify(v)).collect();
    let is_merge = |v: Option<usize>| v.is_some_and(|h| classes[h] == VertexClass::Merge);

    let mut active = ActiveEdges::default();
    let mut diagonals = Vec::new();

    for v in order {
        let incoming = outline.prev[v];
        match classes[v] {
            VertexClass::Start => active.insert(v, v),
            VertexClass::End => {
                let helper = active.remove(incoming);
                if is_merge(helper) {
                    diagonals.extend(helper.map(|h| (v, h)));
                }
            },
            VertexClass::Split => {
                if let Some(left) = active.left_of(outline, v) {
                    diagonals.extend(active.helper(left).map(|h| (v, h)));
                    active.set_helper(left, v);
                }
                active.insert(v, v);
            },
            VertexClass::Merge => {
                let helper = active.remove(incoming);
                if is_merge(helper) {
                    diagonals.extend(helper.map(|h| (v, h)));
                }
                if let Some(left) = active.left_of(outline, v) {
                    let helper = active.helper(left);
                    if is_merge(helper) {
                        diagonals.extend(helper.map(|h| (v, h)));
                    }
                    active.set_helper(left, v);
                }
            },
            VertexClass::Regular => {
                // Interior to the right: the boundary descends through v
                if outline.above(incoming, v) {
                    let helper = active.remove(incoming);
                    if is_merge(helper) {
                        diagonals.extend(helper.map(|h| (v, h)));
                    }
                    active.insert(v, v);
                } else if let Some(left) = active.left_of(outline, v) {
                    let helper = active.helper(left);
                    if is_merge(helper) {
                        diagonals.extend(helper.map(|h| (v, h)));
                    }
                    active.set_helper(left, v);
                }
            },
        }
    }
    diagonals.retain(|(a, b)| a != b);
    diagonals
}

/// Clockwise angle from `from` to `to`, in `(0, 2π]`.
fn clockwise_angle(from: &Vector2<Real>, to: &Vector2<Real>) -> Real {
    let angle = (to.x * from.y - to.y * from.x).atan2(from.dot(to));
    if angle <= 0.0 { angle + TAU } else { angle }
}

/// Faces of the outline cut by `diagonals`, each a counter-clockwise node ring.
fn monotone_pieces(outline: &Outline, diagonals: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut outgoing: Vec<Vec<usize>> = (0..outline.len()).map(|v| vec![outline.next[v]]).collect();
    for &(a, b) in diagonals {
        outgoing[a].push(b);
        outgoing[b].push(a);
    }
    let half_edges: usize = outgoing.iter().map(Vec::len).sum();
    let mut visited: HashSet<(usize, usize)> = HashSet::with_capacity(half_edges);
    let mut pieces = Vec::new();

    for start in 0..outline.len() {
        for &first in &outgoing[start] {
            if visited.contains(&(start, first)) {
                continue;
            }
            let mut piece = vec![start];
            let (mut from, mut to) = (start, first);
            let mut steps = 0;
            loop {
                visited.insert((from, to));
                steps += 1;
                if steps > half_edges {
                    warn!(start, "Monotone face walk did not close");
                    break;
                }
                let back = outline.points[from] - outline.points[to];
                let next = outgoing[to]
                    .iter()
                    .copied()
                    .filter(|&w| w != from || outgoing[to].len() == 1)
                    .map(|w| (w, clockwise_angle(&back, &(outline.points[w] - outline.points[to]))))
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(w, _)| w);
                let Some(next) = next else {
                    break;
                };
                if (to, next) == (start, first) {
                    break;
                }
                piece.push(to);
                from = to;
                to = next;
            }
            if piece.len() >= 3 {
                pieces.push(piece);
            }
        }
    }
    pieces
}

/// Two-chain stack triangulation of one y-monotone counter-clockwise piece.
fn triangulate_piece(outline: &Outline, piece: &[usize], out: &mut Vec<[usize; 3]>) {
    let n = piece.len();
    if n < 3 {
        return;
    }
    let p = |v: usize| &outline.points[v];
    let position = |v: usize| piece.iter().position(|&x| x == v).unwrap_or(0);

    let mut sorted: Vec<usize> = piece.to_vec();
    sorted.sort_by(|&a, &b| sweep_cmp(p(a), p(b)));
    let (top, bottom) = (sorted[0], sorted[n - 1]);

    // Walking the ring forward from the top descends the left chain
    let mut on_left = vec![false; n];
    let mut k = position(top);
    while piece[k] != bottom {
        on_left[k] = true;
        k = (k + 1) % n;
    }
    let left = |v: usize| on_left[position(v)];

    let eps = area_epsilon();
    let mut emit = |a: usize, b: usize, c: usize| {
        let area = orient(p(a), p(b), p(c));
        if area > eps {
            out.push([a, b, c]);
        } else if area < -eps {
            out.push([a, c, b]);
        }
    };

    let mut stack = vec![sorted[0], sorted[1]];
    for &u in &sorted[2..n - 1] {
        let Some(&top_of_stack) = stack.last() else {
            break;
        };
        if left(u) != left(top_of_stack) {
            while stack.len() > 1 {
                let (a, b) = (stack[stack.len() - 2], stack[stack.len() - 1]);
                emit(u, a, b);
                stack.pop();
            }
            stack.clear();
            stack.push(top_of_stack);
            stack.push(u);
        } else {
            let mut last = stack.pop().unwrap_or(u);
            while let Some(&candidate) = stack.last() {
                let visible = if left(u) {
                    orient(p(candidate), p(last), p(u)) > eps
                } else {
                    orient(p(u), p(last), p(candidate)) > eps
                };
                if !visible {
                    break;
                }
                emit(u, last, candidate);
                last = candidate;
                stack.pop();
            }
            stack.push(last);
            stack.push(u);
        }
    }

    for pair in stack.windows(2) {
        emit(bottom, pair[0], pair[1]);
    }
}

/// Triangulate an outer ring with holes. Returns triangles over source
/// vertex indices.
pub(crate) fn triangulate(outer: &Ring, holes: &[Ring]) -> Vec<[usize; 3]> {
    let outline = Outline::new(outer, holes);
    if outline.len() < 3 {
        return Vec::new();
    }
    let diagonals = monotone_diagonals(&outline);
    let pieces = monotone_pieces(&outline, &diagonals);

    let mut faces = Vec::with_capacity(outline.len());
    for piece in &pieces {
        triangulate_piece(&outline, piece, &mut faces);
    }
    let expected = outline.len() + 2 * holes.len() - 2;
    if faces.len() != expected {
        warn!(
            got = faces.len(),
            expected,
            "Monotone triangulation dropped degenerate faces"
        );
    }
    faces
        .into_iter()
        .map(|[a, b, c]| [outline.sources[a], outline.sources[b], outline.sources[c]])
        .collect()
}
