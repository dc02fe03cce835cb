// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridging: skinning the region between two polygon boundaries.
//!
//! [`bridge`] connects an outer boundary to an inner one with a ring of
//! simple faces. Every inner corner casts a connector ray towards the outer
//! boundary; consecutive connectors and the boundary arcs between them close
//! one face each.
//!
//! * Two aligned rectangles are bridged corner to corner.
//! * When the inner center lies inside the outer polygon, each inner corner
//!   casts along its outward bisector.
//! * When it lies outside, rays are cast from the outer center through the
//!   inner corners so that like corners match.
//! * A bisector ray that misses the outer boundary falls back to the center
//!   ray.
//!
//! Connectors must advance monotonically around the outer perimeter. A hit
//! that would step backwards reuses the previous connector's end point. A
//! connector that would cross the inner boundary is skipped and its corner
//! merges into the neighbouring face.

use smallvec::SmallVec;

use nalgebra::{Point2, Point3};

use crate::contour::{self, point_in_contour, ray_segment, segments_cross};
use crate::error::{Error, Result};
use crate::poly::SmartPoly;
use crate::vec::{dedup_loop, SmartVec};

/// Points closer than this are merged in bridge output.
const MERGE_EPSILON: f64 = 1e-7;

/// Hits closer than this (as an edge fraction) snap to the edge end.
const SNAP_FRACTION: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeOptions {
    /// Insert hit points into the outer boundary; when false, connectors
    /// snap to the nearest existing outer corner.
    pub insert_perimeter: bool,
    /// Allow the corner-to-corner path for aligned rectangles.
    pub allow_by_number: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            insert_perimeter: true,
            allow_by_number: true,
        }
    }
}

/// Where a connector meets the outer boundary.
#[derive(Debug, Clone, Copy)]
struct Hit {
    /// Perimeter parameter: edge index plus fraction along it.
    s: f64,
    point: Point2<f64>,
}

/// Bridges `outer` to `inner`.
///
/// Both polygons are read in `outer`'s frame. The returned faces follow the
/// orientation of `outer` and together tile the region between the two
/// boundaries.
pub fn bridge(
    outer: &SmartPoly,
    inner: &SmartPoly,
    opts: &BridgeOptions,
) -> Result<Vec<Vec<SmartVec>>> {
    let n = outer.len();
    let m = inner.len();
    if n < 3 || m < 3 {
        return Err(Error::TooFewPoints {
            needed: 3,
            got: n.min(m),
        });
    }

    let frame = outer.frame;
    let flip = outer.area < 0.0;

    let mut ring_o: Vec<SmartVec> = outer.points.clone();
    if flip {
        ring_o.reverse();
    }
    let o2: Vec<Point2<f64>> = ring_o.iter().map(|p| p.co2).collect();

    let mut ring_i: Vec<SmartVec> = inner
        .points
        .iter()
        .map(|p| SmartVec {
            co2: frame.make_2d(&p.co),
            ..*p
        })
        .collect();
    if contour::signed_area(&ring_i.iter().map(|p| p.co2).collect::<Vec<_>>()) < 0.0 {
        ring_i.reverse();
    }
    let i2: Vec<Point2<f64>> = ring_i.iter().map(|p| p.co2).collect();

    let mut faces = if opts.allow_by_number && n == 4 && m == 4 && aligned_rects(&o2, &i2) {
        let offset = best_offset(&o2, &i2);
        by_number(&ring_o, &ring_i, offset, false, true)
    } else {
        march(&ring_o, &o2, &ring_i, &i2, opts)?
    };

    if flip {
        for face in &mut faces {
            face.reverse();
        }
    }
    Ok(faces)
}

/// The ray-marching bridge for the general cases.
fn march(
    ring_o: &[SmartVec],
    o2: &[Point2<f64>],
    ring_i: &[SmartVec],
    i2: &[Point2<f64>],
    opts: &BridgeOptions,
) -> Result<Vec<Vec<SmartVec>>> {
    let n = o2.len();
    let m = i2.len();
    let nf = n as f64;

    let inner_local = SmartPoly::with_frame_of(i2, &crate::poly::Frame::default());
    let inner_center = Point2::from(
        i2.iter().fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords) / m as f64,
    );
    let center_inside = point_in_contour(&inner_center, o2);
    let outer_center = Point2::from(
        o2.iter().fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords) / nf,
    );

    let mut hits: Vec<Option<Hit>> = (0..m)
        .map(|j| {
            let from_center = || {
                let dir = i2[j] - outer_center;
                cast(&outer_center, &dir, o2)
            };
            if center_inside {
                cast(&i2[j], &inner_local.outward_ray(j), o2).or_else(from_center)
            } else {
                from_center()
            }
        })
        .collect();

    for hit in hits.iter_mut().flatten() {
        *hit = snap(hit, o2, opts.insert_perimeter);
    }

    let Some(j0) = (0..m)
        .filter_map(|j| hits[j].map(|h| (j, (h.point - i2[j]).norm())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(j, _)| j)
    else {
        return Err(Error::Degenerate("no connector reaches the outer boundary".into()));
    };
    let s0 = hits[j0].map(|h| h.s).unwrap_or_default();
    let rel = |s: f64| (s - s0).rem_euclid(nf);

    // (inner index, hit, relative perimeter parameter)
    let mut connectors: Vec<(usize, Hit, f64)> = Vec::with_capacity(m);
    for k in 0..m {
        let j = (j0 + k) % m;
        let Some(mut hit) = hits[j] else {
            continue;
        };
        let mut d = if k == 0 { 0.0 } else { rel(hit.s) };
        if let Some(&(_, prev, prev_d)) = connectors.last() {
            if d < prev_d {
                hit = prev;
                d = prev_d;
            }
        }
        if crosses_boundaries(&i2[j], &hit.point, j, i2, o2) {
            tracing::debug!(corner = j, "bridge connector crosses a boundary, merging corner");
            continue;
        }
        connectors.push((j, hit, d));
    }

    if connectors.len() < 2 {
        return Err(Error::Degenerate(
            "bridge needs at least two connectors".into(),
        ));
    }

    // Outer corners by relative parameter, duplicated one turn ahead so the
    // closing face can wrap.
    let mut corners: Vec<(f64, usize)> = (0..n)
        .flat_map(|k| {
            let d = rel(k as f64);
            [(d, k), (d + nf, k)]
        })
        .collect();
    corners.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut faces = Vec::with_capacity(connectors.len());
    let count = connectors.len();
    for idx in 0..count {
        let (ja, ha, da) = connectors[idx];
        let (jb, hb, mut db) = connectors[(idx + 1) % count];
        if idx + 1 == count {
            db += nf;
        }

        let mut face: Vec<SmartVec> = Vec::new();
        face.push(hit_vec(&ha, ring_o));
        face.extend(
            corners
                .iter()
                .filter(|(d, _)| *d > da + SNAP_FRACTION && *d < db - SNAP_FRACTION)
                .map(|&(_, k)| ring_o[k]),
        );
        face.push(hit_vec(&hb, ring_o));

        let mut j = jb;
        loop {
            face.push(ring_i[j]);
            if j == ja {
                break;
            }
            j = (j + m - 1) % m;
        }

        let face = dedup_loop(face, MERGE_EPSILON);
        if face.len() < 3 {
            tracing::debug!(from = ja, to = jb, "dropping degenerate bridge face");
            continue;
        }
        faces.push(face);
    }
    Ok(faces)
}

/// First intersection of a ray with the closed contour.
fn cast(origin: &Point2<f64>, dir: &nalgebra::Vector2<f64>, ring: &[Point2<f64>]) -> Option<Hit> {
    if dir.norm() < contour::EPSILON_2D {
        return None;
    }
    let n = ring.len();
    let mut candidates: SmallVec<[(f64, Hit); 4]> = SmallVec::new();
    for e in 0..n {
        let (a, b) = (&ring[e], &ring[(e + 1) % n]);
        if let Some((t, u)) = ray_segment(origin, dir, a, b) {
            candidates.push((
                t,
                Hit {
                    s: e as f64 + u,
                    point: a + (b - a) * u,
                },
            ));
        }
    }
    candidates
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, hit)| hit)
}

/// Snaps a hit onto an outer corner when close to one, or always when
/// perimeter insertion is off.
fn snap(hit: &Hit, ring: &[Point2<f64>], insert_perimeter: bool) -> Hit {
    let n = ring.len();
    let edge = hit.s.floor();
    let u = hit.s - edge;
    let corner = if !insert_perimeter {
        Some(if u < 0.5 { edge } else { edge + 1.0 })
    } else if u < SNAP_FRACTION {
        Some(edge)
    } else if u > 1.0 - SNAP_FRACTION {
        Some(edge + 1.0)
    } else {
        None
    };
    match corner {
        Some(c) => {
            let k = (c as usize) % n;
            Hit {
                s: k as f64,
                point: ring[k],
            }
        }
        None => *hit,
    }
}

/// Whether the connector from inner corner `j` crosses either boundary.
fn crosses_boundaries(
    from: &Point2<f64>,
    to: &Point2<f64>,
    j: usize,
    inner: &[Point2<f64>],
    outer: &[Point2<f64>],
) -> bool {
    let m = inner.len();
    let inner_hit = (0..m)
        .filter(|&e| e != j && (e + 1) % m != j)
        .any(|e| segments_cross(from, to, &inner[e], &inner[(e + 1) % m]));
    let n = outer.len();
    let outer_hit = (0..n).any(|e| segments_cross(from, to, &outer[e], &outer[(e + 1) % n]));
    inner_hit || outer_hit
}

fn hit_vec(hit: &Hit, ring: &[SmartVec]) -> SmartVec {
    let n = ring.len();
    let edge = hit.s.floor();
    let u = hit.s - edge;
    let k = (edge as usize) % n;
    if u < SNAP_FRACTION {
        return ring[k];
    }
    let (a, b) = (&ring[k], &ring[(k + 1) % n]);
    let co = Point3::from(a.co.coords.lerp(&b.co.coords, u));
    let mut v = match (a.vert, b.vert) {
        (Some(va), Some(vb)) => SmartVec::on_edge(co, va, vb),
        _ => SmartVec::new(co),
    };
    v.co2 = hit.point;
    v
}

/// Both contours are rectangles with parallel sides and the inner one lies
/// inside the outer one.
fn aligned_rects(o: &[Point2<f64>], i: &[Point2<f64>]) -> bool {
    let rect = |p: &[Point2<f64>]| {
        (0..4).all(|k| {
            let a = p[(k + 1) % 4] - p[k];
            let b = p[(k + 2) % 4] - p[(k + 1) % 4];
            a.dot(&b).abs() <= 1e-6 * a.norm() * b.norm()
        })
    };
    if !rect(o) || !rect(i) {
        return false;
    }
    let oe = (o[1] - o[0]).normalize();
    let ie = (i[1] - i[0]).normalize();
    let parallel = contour::cross(&oe, &ie).abs() < 1e-6;
    parallel && i.iter().all(|p| point_in_contour(p, o))
}

/// Rotation of `inner` indices that best matches `outer` corners.
fn best_offset(outer: &[Point2<f64>], inner: &[Point2<f64>]) -> usize {
    let n = outer.len();
    (0..n)
        .min_by(|&a, &b| {
            let cost = |off: usize| -> f64 {
                (0..n).map(|k| (outer[k] - inner[(k + off) % n]).norm()).sum()
            };
            cost(a).total_cmp(&cost(b))
        })
        .unwrap_or(0)
}

/// Bridges two closed rings of equal length by index: one quad per edge
/// pair, `a[k], a[k+1], b[k+1+offset], b[k+offset]`.
///
/// With `reverse`, `b` is walked backwards. Quads that collapse to fewer than
/// three distinct points are dropped.
pub fn bridge_by_number(
    a: &[SmartVec],
    b: &[SmartVec],
    offset: usize,
    reverse: bool,
) -> Result<Vec<Vec<SmartVec>>> {
    check_rings(a, b)?;
    Ok(by_number(a, b, offset, reverse, true))
}

/// Like [`bridge_by_number`] for open polylines: no closing quad.
pub fn bridge_by_number_open(a: &[SmartVec], b: &[SmartVec]) -> Result<Vec<Vec<SmartVec>>> {
    check_rings(a, b)?;
    Ok(by_number(a, b, 0, false, false))
}

fn check_rings(a: &[SmartVec], b: &[SmartVec]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::InvalidParameter(format!(
            "bridge by number needs equal counts ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    if a.len() < 2 {
        return Err(Error::TooFewPoints {
            needed: 2,
            got: a.len(),
        });
    }
    Ok(())
}

fn by_number(
    a: &[SmartVec],
    b: &[SmartVec],
    offset: usize,
    reverse: bool,
    closed: bool,
) -> Vec<Vec<SmartVec>> {
    let n = a.len();
    let b: Vec<SmartVec> = if reverse {
        b.iter().rev().copied().collect()
    } else {
        b.to_vec()
    };
    let edges = if closed { n } else { n - 1 };
    (0..edges)
        .filter_map(|k| {
            let quad = vec![
                a[k],
                a[(k + 1) % n],
                b[(k + 1 + offset) % n],
                b[(k + offset) % n],
            ];
            let face = dedup_loop(quad, MERGE_EPSILON);
            if face.len() < 3 {
                tracing::debug!(edge = k, "dropping degenerate quad");
                None
            } else {
                Some(face)
            }
        })
        .collect()
}
