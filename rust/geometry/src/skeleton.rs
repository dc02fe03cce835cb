// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Straight skeleton of a polygon with holes, by wavefront propagation.
//!
//! Every boundary edge moves inward at unit speed. Wavefront vertices run
//! along the bisectors of their two edges. Two kinds of events change the
//! wavefront:
//!
//! * **edge event**: an edge shrinks to nothing and its two end vertices
//!   merge into one;
//! * **split event**: a reflex vertex runs into an edge and splits the
//!   wavefront loop there (or joins a hole loop to the loop it hits).
//!
//! The earliest event is found by a full scan after each step. That is cubic
//! in the worst case, which is fine for building footprints.
//!
//! The skeleton partitions the polygon into one face per boundary edge. The
//! *time* of a skeleton node is its distance to the supporting lines of its
//! edges, so a roof with slope `k` puts the node at height `time * k`.

use nalgebra::{Point2, Vector2};

use crate::contour::{cross, ensure_ccw, ensure_cw};
use crate::error::{Error, Result};

const EPS: f64 = 1e-9;

/// A node of the skeleton: position and the time the wavefront reached it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonNode {
    pub point: Point2<f64>,
    pub time: f64,
}

/// The face swept by one boundary edge.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonFace {
    /// Index of the edge: outer ring edges first, then each hole's edges.
    pub edge: usize,
    /// Counter-clockwise loop starting with the edge's two end points
    /// (time 0).
    pub nodes: Vec<SkeletonNode>,
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    pub faces: Vec<SkeletonFace>,
}

#[derive(Debug, Clone, Copy)]
struct EdgeLine {
    a: Point2<f64>,
    b: Point2<f64>,
    dir: Vector2<f64>,
    /// Points into the polygon.
    normal: Vector2<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Vertex {
    origin: Point2<f64>,
    time: f64,
    vel: Vector2<f64>,
    left: usize,
    right: usize,
    prev: usize,
    next: usize,
    active: bool,
}

impl Vertex {
    fn at(&self, t: f64) -> Point2<f64> {
        self.origin + self.vel * (t - self.time)
    }
}

#[derive(Debug, Clone, Copy)]
enum Event {
    Edge { u: usize, w: usize },
    Split { v: usize, x: usize, y: usize },
}

struct Wavefront {
    edges: Vec<EdgeLine>,
    verts: Vec<Vertex>,
    collected: Vec<Vec<SkeletonNode>>,
    now: f64,
}

/// Computes the straight skeleton of `outer` with `holes`.
///
/// Ring orientation is normalized: the outer ring counter-clockwise, holes
/// clockwise.
pub fn straight_skeleton(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Result<Skeleton> {
    let mut rings = vec![ensure_ccw(&clean_ring(outer))];
    rings.extend(holes.iter().map(|h| ensure_cw(&clean_ring(h))));
    if rings[0].len() < 3 {
        return Err(Error::TooFewPoints {
            needed: 3,
            got: rings[0].len(),
        });
    }
    rings.retain(|r| r.len() >= 3);

    let mut wf = Wavefront::new(&rings);
    let limit = 8 * wf.verts.len() * wf.verts.len() + 64;
    let mut steps = 0;
    while let Some((event, time)) = wf.next_event() {
        wf.now = wf.now.max(time);
        match event {
            Event::Edge { u, w } => wf.edge_event(u, w),
            Event::Split { v, x, y } => wf.split_event(v, x, y),
        }
        steps += 1;
        if steps > limit {
            tracing::warn!(steps, "straight skeleton did not converge, stopping early");
            break;
        }
    }

    Ok(Skeleton {
        faces: wf.assemble(),
    })
}

/// Drops repeated and collinear-duplicate points.
fn clean_ring(ring: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut out: Vec<Point2<f64>> = Vec::with_capacity(ring.len());
    for p in ring {
        if out.last().is_some_and(|q| (q - p).norm() < EPS) {
            continue;
        }
        out.push(*p);
    }
    while out.len() > 1 && out.first().zip(out.last()).is_some_and(|(a, b)| (a - b).norm() < EPS) {
        out.pop();
    }
    out
}

impl Wavefront {
    fn new(rings: &[Vec<Point2<f64>>]) -> Self {
        let mut edges = Vec::new();
        let mut verts = Vec::new();
        for ring in rings {
            let base = edges.len();
            let n = ring.len();
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                let dir = (b - a).try_normalize(EPS).unwrap_or_else(Vector2::zeros);
                edges.push(EdgeLine {
                    a,
                    b,
                    dir,
                    normal: Vector2::new(-dir.y, dir.x),
                });
            }
            for i in 0..n {
                let left = base + (i + n - 1) % n;
                let right = base + i;
                verts.push(Vertex {
                    origin: ring[i],
                    time: 0.0,
                    vel: Vector2::zeros(),
                    left,
                    right,
                    prev: base + (i + n - 1) % n,
                    next: base + (i + 1) % n,
                    active: true,
                });
            }
        }
        let mut wf = Self {
            collected: vec![Vec::new(); edges.len()],
            edges,
            verts,
            now: 0.0,
        };
        for k in 0..wf.verts.len() {
            wf.verts[k].vel = wf.velocity(wf.verts[k].left, wf.verts[k].right);
        }
        wf
    }

    /// Bisector velocity keeping unit distance speed to both edge lines.
    fn velocity(&self, left: usize, right: usize) -> Vector2<f64> {
        let nl = self.edges[left].normal;
        let nr = self.edges[right].normal;
        let denom = 1.0 + nl.dot(&nr);
        if denom < EPS {
            Vector2::zeros()
        } else {
            (nl + nr) / denom
        }
    }

    fn is_reflex(&self, v: &Vertex) -> bool {
        cross(&self.edges[v.left].dir, &self.edges[v.right].dir) < -EPS
    }

    fn record(&mut self, edge: usize, point: Point2<f64>, time: f64) {
        self.collected[edge].push(SkeletonNode { point, time });
    }

    fn next_event(&self) -> Option<(Event, f64)> {
        let mut best: Option<(Event, f64)> = None;
        let consider = |event: Event, t: f64, best: &mut Option<(Event, f64)>| {
            let better = match best {
                None => true,
                Some((prev, bt)) => {
                    t < *bt - EPS
                        || (t < *bt + EPS
                            && matches!(event, Event::Edge { .. })
                            && matches!(prev, Event::Split { .. }))
                }
            };
            if better {
                *best = Some((event, t));
            }
        };

        for (u, vu) in self.verts.iter().enumerate() {
            if !vu.active {
                continue;
            }
            let w = vu.next;
            if w != u {
                if let Some(t) = self.edge_event_time(u, w) {
                    consider(Event::Edge { u, w }, t, &mut best);
                }
            }
            if self.is_reflex(vu) {
                for (x, vx) in self.verts.iter().enumerate() {
                    if !vx.active {
                        continue;
                    }
                    if let Some(t) = self.split_event_time(u, x) {
                        consider(
                            Event::Split {
                                v: u,
                                x,
                                y: vx.next,
                            },
                            t,
                            &mut best,
                        );
                    }
                }
            }
        }
        best
    }

    /// When `u` and its successor `w` meet along their shared edge.
    fn edge_event_time(&self, u: usize, w: usize) -> Option<f64> {
        let (vu, vw) = (&self.verts[u], &self.verts[w]);
        if (vu.at(self.now) - vw.at(self.now)).norm() < 1e-7 {
            return Some(self.now);
        }
        let d = self.edges[vu.right].dir;
        let a0 = (vu.origin - vu.vel * vu.time).coords.dot(&d);
        let b0 = (vw.origin - vw.vel * vw.time).coords.dot(&d);
        let closing = vu.vel.dot(&d) - vw.vel.dot(&d);
        if closing <= 1e-12 {
            return None;
        }
        let t = (b0 - a0) / closing;
        (t >= self.now - EPS).then_some(t.max(self.now))
    }

    /// When reflex vertex `v` hits the wavefront segment starting at `x`.
    fn split_event_time(&self, v: usize, x: usize) -> Option<f64> {
        let vv = &self.verts[v];
        let vx = &self.verts[x];
        let y = vx.next;
        let f = vx.right;
        if x == v || y == v || f == vv.left || f == vv.right {
            return None;
        }
        let edge = &self.edges[f];
        let speed = vv.vel.dot(&edge.normal);
        let denom = 1.0 - speed;
        if denom <= EPS {
            return None;
        }
        let t = ((vv.origin - edge.a).dot(&edge.normal) - speed * vv.time) / denom;
        if t <= vv.time + EPS || t < self.now - EPS {
            return None;
        }
        let hit = vv.at(t);
        let px = vx.at(t);
        let py = self.verts[y].at(t);
        let s = (hit - px).dot(&edge.dir);
        let len = (py - px).dot(&edge.dir);
        (len > -EPS && s > -1e-7 && s < len + 1e-7).then_some(t)
    }

    fn loop_len(&self, start: usize) -> usize {
        let mut k = self.verts[start].next;
        let mut count = 1;
        while k != start && count <= self.verts.len() {
            k = self.verts[k].next;
            count += 1;
        }
        count
    }

    fn terminate_loop(&mut self, start: usize, point: Point2<f64>) {
        let now = self.now;
        let mut k = start;
        loop {
            let v = self.verts[k];
            if !v.active {
                break;
            }
            self.record(v.left, point, now);
            self.record(v.right, point, now);
            self.verts[k].active = false;
            k = v.next;
            if k == start {
                break;
            }
        }
    }

    fn push_vertex(&mut self, origin: Point2<f64>, left: usize, right: usize, prev: usize, next: usize) -> usize {
        let vel = self.velocity(left, right);
        self.verts.push(Vertex {
            origin,
            time: self.now,
            vel,
            left,
            right,
            prev,
            next,
            active: true,
        });
        self.verts.len() - 1
    }

    fn edge_event(&mut self, u: usize, w: usize) {
        let now = self.now;
        let point = self.verts[u].at(now);
        if self.loop_len(u) <= 3 {
            self.terminate_loop(u, point);
            return;
        }
        let (vu, vw) = (self.verts[u], self.verts[w]);
        self.record(vu.left, point, now);
        self.record(vu.right, point, now);
        self.record(vw.right, point, now);

        let z = self.push_vertex(point, vu.left, vw.right, vu.prev, vw.next);
        self.verts[vu.prev].next = z;
        self.verts[vw.next].prev = z;
        self.verts[u].active = false;
        self.verts[w].active = false;
    }

    fn split_event(&mut self, v: usize, x: usize, y: usize) {
        let now = self.now;
        let vv = self.verts[v];
        let f = self.verts[x].right;
        let point = vv.at(now);
        self.record(vv.left, point, now);
        self.record(vv.right, point, now);
        self.record(f, point, now);

        let v1 = self.push_vertex(point, vv.left, f, vv.prev, y);
        let v2 = self.push_vertex(point, f, vv.right, x, vv.next);
        self.verts[vv.prev].next = v1;
        self.verts[y].prev = v1;
        self.verts[x].next = v2;
        self.verts[vv.next].prev = v2;
        self.verts[v].active = false;

        for start in [v1, v2] {
            if self.verts[start].active && self.loop_len(start) <= 2 {
                let p = self.verts[start].at(now);
                self.terminate_loop(start, p);
            }
        }
    }

    /// Builds one face per edge: the edge, then its nodes ordered back along
    /// the edge direction.
    fn assemble(&self) -> Vec<SkeletonFace> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(idx, edge)| {
                let mut nodes = self.collected[idx].clone();
                let key = |n: &SkeletonNode| (n.point - edge.a).dot(&edge.dir);
                nodes.sort_by(|p, q| key(q).total_cmp(&key(p)));
                let mut loop_nodes = vec![
                    SkeletonNode {
                        point: edge.a,
                        time: 0.0,
                    },
                    SkeletonNode {
                        point: edge.b,
                        time: 0.0,
                    },
                ];
                for n in nodes {
                    if loop_nodes.iter().any(|m| (m.point - n.point).norm() < 1e-7) {
                        continue;
                    }
                    loop_nodes.push(n);
                }
                (loop_nodes.len() >= 3).then_some(SkeletonFace {
                    edge: idx,
                    nodes: loop_nodes,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::signed_area;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]
    }

    fn face_area_sum(sk: &Skeleton) -> f64 {
        sk.faces
            .iter()
            .map(|f| signed_area(&f.nodes.iter().map(|n| n.point).collect::<Vec<_>>()))
            .sum()
    }

    #[test]
    fn square_roof_meets_at_center() {
        let sk = straight_skeleton(&rect(0.0, 0.0, 2.0, 2.0), &[]).unwrap();
        assert_eq!(sk.faces.len(), 4);
        for face in &sk.faces {
            assert_eq!(face.nodes.len(), 3);
            let apex = face.nodes[2];
            assert_relative_eq!(apex.point.x, 1.0, epsilon = 1e-9);
            assert_relative_eq!(apex.point.y, 1.0, epsilon = 1e-9);
            assert_relative_eq!(apex.time, 1.0, epsilon = 1e-9);
        }
        assert_relative_eq!(face_area_sum(&sk), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn rectangle_has_hip_ridge() {
        let sk = straight_skeleton(&rect(0.0, 0.0, 4.0, 2.0), &[]).unwrap();
        assert_eq!(sk.faces.len(), 4);
        let long: Vec<_> = sk.faces.iter().filter(|f| f.nodes.len() == 4).collect();
        assert_eq!(long.len(), 2);
        for face in &sk.faces {
            for n in &face.nodes[2..] {
                assert_relative_eq!(n.time, 1.0, epsilon = 1e-9);
                assert_relative_eq!(n.point.y, 1.0, epsilon = 1e-9);
            }
        }
        assert_relative_eq!(face_area_sum(&sk), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn l_shape_partitions_footprint() {
        let l = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 2.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let sk = straight_skeleton(&l, &[]).unwrap();
        assert_eq!(sk.faces.len(), 6);
        assert_relative_eq!(face_area_sum(&sk), 12.0, epsilon = 1e-6);
        let peak = sk
            .faces
            .iter()
            .flat_map(|f| f.nodes.iter())
            .map(|n| n.time)
            .fold(0.0, f64::max);
        assert_relative_eq!(peak, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn clockwise_input_is_normalized() {
        let mut pts = rect(0.0, 0.0, 2.0, 2.0);
        pts.reverse();
        let sk = straight_skeleton(&pts, &[]).unwrap();
        assert_relative_eq!(face_area_sum(&sk), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn courtyard_partitions_footprint() {
        let outer = rect(0.0, 0.0, 6.0, 4.0);
        let hole = rect(2.0, 1.5, 3.0, 2.5);
        let sk = straight_skeleton(&outer, &[hole]).unwrap();
        assert_eq!(sk.faces.len(), 8);
        assert_relative_eq!(face_area_sum(&sk), 23.0, epsilon = 1e-6);
    }

    #[test]
    fn too_few_points() {
        assert!(straight_skeleton(&[Point2::origin(), Point2::new(1.0, 0.0)], &[]).is_err());
    }
}
