// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D boolean operations on oriented polygons.
//!
//! Boolean work is delegated to i_overlay. Results with holes are turned
//! back into single contours by splicing each hole ring into the outer ring
//! through a non-crossing vertex pair; when no such pair exists the region
//! is triangulated instead.
//!
//! Result points that coincide with a point of the input polygons are
//! relinked to it, and points on an input edge remember that edge, so that
//! realizing the result reuses the existing mesh vertices.

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

use crate::contour::{self, ensure_ccw, ensure_cw, point_segment_distance, segments_cross};
use crate::error::{Error, Result};
use crate::poly::{Frame, SmartPoly};
use crate::triangulation::triangulate_with_holes;
use crate::vec::SmartVec;

/// Minimum area threshold - regions smaller than this are considered degenerate
const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// Result points within this distance of an input point are relinked.
const RELINK_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    Intersect,
    Difference,
    Union,
    Xor,
}

impl ClipOp {
    fn fill(self) -> FillRule {
        // Union inputs may overlap each other; all contours are wound
        // counter-clockwise.
        match self {
            ClipOp::Union => FillRule::NonZero,
            _ => FillRule::EvenOdd,
        }
    }

    fn rule(self) -> OverlayRule {
        match self {
            ClipOp::Intersect => OverlayRule::Intersect,
            ClipOp::Difference => OverlayRule::Difference,
            ClipOp::Union => OverlayRule::Union,
            ClipOp::Xor => OverlayRule::Xor,
        }
    }
}

/// One connected result of a boolean operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Counter-clockwise outer ring.
    pub outer: Vec<Point2<f64>>,
    /// Clockwise hole rings.
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Region {
    pub fn area(&self) -> f64 {
        contour::signed_area(&self.outer) + self.holes.iter().map(|h| contour::signed_area(h)).sum::<f64>()
    }
}

/// Runs a boolean operation on plain 2D contours.
pub fn overlay(
    subject: &[Vec<Point2<f64>>],
    clip: &[Vec<Point2<f64>>],
    op: ClipOp,
) -> Vec<Region> {
    let to_paths = |contours: &[Vec<Point2<f64>>]| -> Vec<Vec<[f64; 2]>> {
        contours
            .iter()
            .filter(|c| c.len() >= 3)
            .map(|c| c.iter().map(|p| [p.x, p.y]).collect())
            .collect()
    };
    let subject = to_paths(subject);
    let clip = to_paths(clip);

    // Vec of shapes, each shape is Vec of contours (first outer, rest holes)
    let shapes = subject.overlay(&clip, op.rule(), op.fill());

    shapes
        .into_iter()
        .filter_map(|shape| {
            let mut contours = shape.into_iter().map(|c| {
                c.into_iter()
                    .map(|p| Point2::new(p[0], p[1]))
                    .collect::<Vec<_>>()
            });
            let outer = ensure_ccw(&contours.next()?);
            if outer.len() < 3 || contour::signed_area(&outer) < MIN_AREA_THRESHOLD {
                return None;
            }
            let holes = contours
                .filter(|h| h.len() >= 3 && contour::signed_area(h).abs() > MIN_AREA_THRESHOLD)
                .map(|h| ensure_cw(&h))
                .collect();
            Some(Region { outer, holes })
        })
        .collect()
}

impl SmartPoly {
    /// Boolean operation with `other`, evaluated in this polygon's frame.
    ///
    /// Every returned polygon is a single contour in this frame.
    pub fn clip_with(&self, other: &SmartPoly, op: ClipOp) -> Result<Vec<SmartPoly>> {
        if self.len() < 3 || other.len() < 3 {
            return Err(Error::TooFewPoints {
                needed: 3,
                got: self.len().min(other.len()),
            });
        }
        let frame = self.frame;
        let subject = vec![ensure_ccw(&self.points_2d())];
        let clip_pts: Vec<Point2<f64>> = other.points.iter().map(|p| frame.make_2d(&p.co)).collect();
        let clip = vec![ensure_ccw(&clip_pts)];

        let other_local: Vec<SmartVec> = other
            .points
            .iter()
            .map(|p| SmartVec {
                co2: frame.make_2d(&p.co),
                ..*p
            })
            .collect();
        let reference = [self.points.as_slice(), other_local.as_slice()];

        let regions = overlay(&subject, &clip, op);
        let mut out = Vec::new();
        for region in &regions {
            out.extend(region_polys(region, &frame, &reference)?);
        }
        Ok(out)
    }
}

/// Unions polygons in the frame of the first one.
pub fn union_regions(polys: &[SmartPoly]) -> Result<(Frame, Vec<Region>)> {
    let first = polys
        .first()
        .ok_or(Error::TooFewPoints { needed: 1, got: 0 })?;
    let frame = first.frame;
    let contours: Vec<Vec<Point2<f64>>> = polys
        .iter()
        .map(|p| ensure_ccw(&p.points.iter().map(|v| frame.make_2d(&v.co)).collect::<Vec<_>>()))
        .collect();
    let (subject, rest) = contours.split_at(1);
    let regions = if rest.is_empty() {
        overlay(subject, &[], ClipOp::Union)
    } else {
        overlay(subject, rest, ClipOp::Union)
    };
    Ok((frame, regions))
}

/// Unions polygons and returns single-contour results.
pub fn union_all(polys: &[SmartPoly]) -> Result<Vec<SmartPoly>> {
    let (frame, regions) = union_regions(polys)?;
    let reference: Vec<Vec<SmartVec>> = polys
        .iter()
        .map(|p| {
            p.points
                .iter()
                .map(|v| SmartVec {
                    co2: frame.make_2d(&v.co),
                    ..*v
                })
                .collect()
        })
        .collect();
    let refs: Vec<&[SmartVec]> = reference.iter().map(|r| r.as_slice()).collect();
    let mut out = Vec::new();
    for region in &regions {
        out.extend(region_polys(region, &frame, &refs)?);
    }
    Ok(out)
}

/// Turns a region into single-contour polygons in `frame`.
pub fn region_polys(
    region: &Region,
    frame: &Frame,
    reference: &[&[SmartVec]],
) -> Result<Vec<SmartPoly>> {
    if region.holes.is_empty() {
        return Ok(vec![relinked_poly(&region.outer, frame, reference)]);
    }
    if let Some(ring) = splice_holes(&region.outer, &region.holes) {
        return Ok(vec![relinked_poly(&ring, frame, reference)]);
    }

    tracing::debug!(holes = region.holes.len(), "hole splice failed, triangulating region");
    let mut all = region.outer.clone();
    for hole in &region.holes {
        all.extend(hole.iter().copied());
    }
    let indices = triangulate_with_holes(&region.outer, &region.holes)?;
    Ok(indices
        .chunks(3)
        .filter(|tri| tri.len() == 3)
        .map(|tri| {
            let pts = [all[tri[0]], all[tri[1]], all[tri[2]]];
            relinked_poly(&ensure_ccw(&pts), frame, reference)
        })
        .collect())
}

/// Splices each hole into the outer ring through the closest vertex pair
/// whose connecting segment crosses no ring.
///
/// The result visits the two connecting vertices twice. Returns `None` when
/// some hole has no valid connection.
pub fn splice_holes(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>]) -> Option<Vec<Point2<f64>>> {
    let mut ring = ensure_ccw(outer);
    let mut pending: Vec<Vec<Point2<f64>>> = holes.iter().map(|h| ensure_cw(h)).collect();
    // Rightmost holes first, like ear-clipping hole elimination.
    pending.sort_by(|a, b| max_x(b).total_cmp(&max_x(a)));

    while !pending.is_empty() {
        let hole = pending.remove(0);
        let mut best: Option<(f64, usize, usize)> = None;
        for (i, a) in ring.iter().enumerate() {
            for (j, b) in hole.iter().enumerate() {
                let dist = (b - a).norm();
                if best.is_some_and(|(d, _, _)| d <= dist) {
                    continue;
                }
                let blocked = crosses_ring(a, b, &ring)
                    || crosses_ring(a, b, &hole)
                    || pending.iter().any(|h| crosses_ring(a, b, h));
                if !blocked {
                    best = Some((dist, i, j));
                }
            }
        }
        let (_, i, j) = best?;
        let mut spliced = Vec::with_capacity(ring.len() + hole.len() + 2);
        spliced.extend_from_slice(&ring[..=i]);
        spliced.extend_from_slice(&hole[j..]);
        spliced.extend_from_slice(&hole[..=j]);
        spliced.extend_from_slice(&ring[i..]);
        ring = spliced;
    }
    Some(ring)
}

fn crosses_ring(a: &Point2<f64>, b: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    (0..n).any(|e| segments_cross(a, b, &ring[e], &ring[(e + 1) % n]))
}

fn max_x(ring: &[Point2<f64>]) -> f64 {
    ring.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max)
}

fn relinked_poly(points: &[Point2<f64>], frame: &Frame, reference: &[&[SmartVec]]) -> SmartPoly {
    let vecs: Vec<SmartVec> = points.iter().map(|p| relink(p, frame, reference)).collect();
    let mut poly = SmartPoly::with_frame_of(&[], frame);
    poly.points = vecs;
    poly.refresh();
    poly
}

/// Matches a result point against the input rings.
fn relink(p: &Point2<f64>, frame: &Frame, reference: &[&[SmartVec]]) -> SmartVec {
    for ring in reference {
        if let Some(v) = ring.iter().find(|v| (v.co2 - p).norm() < RELINK_EPSILON) {
            return *v;
        }
    }
    let co = frame.make_3d(p);
    for ring in reference {
        let n = ring.len();
        for k in 0..n {
            let (a, b) = (&ring[k], &ring[(k + 1) % n]);
            let (dist, _) = point_segment_distance(p, &a.co2, &b.co2);
            if dist < RELINK_EPSILON {
                if let (Some(va), Some(vb)) = (a.vert, b.vert) {
                    return SmartVec::on_edge(co, va, vb);
                }
            }
        }
    }
    SmartVec::new(co)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn square(x0: f64, y0: f64, size: f64) -> SmartPoly {
        SmartPoly::from_points(&[
            Point3::new(x0, y0, 0.0),
            Point3::new(x0 + size, y0, 0.0),
            Point3::new(x0 + size, y0 + size, 0.0),
            Point3::new(x0, y0 + size, 0.0),
        ])
    }

    #[test]
    fn difference_with_inner_square_splices_hole() {
        let outer = square(0.0, 0.0, 4.0);
        let inner = square(1.0, 1.0, 2.0);
        let result = outer.clip_with(&inner, ClipOp::Difference).unwrap();
        assert_eq!(result.len(), 1);
        // 4 outer + 4 hole + 2 repeated connection points
        assert_eq!(result[0].len(), 10);
        assert_relative_eq!(result[0].area(), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn intersection_of_overlapping_squares() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 1.0, 2.0);
        let result = a.clip_with(&b, ClipOp::Intersect).unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn union_of_adjacent_squares() {
        let result = union_all(&[square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)]).unwrap();
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].area(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn union_regions_keeps_holes() {
        // Ring of four bars around a 1x1 hole.
        let bars = [
            SmartPoly::from_points(&[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(3.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ]),
            SmartPoly::from_points(&[
                Point3::new(2.0, 1.0, 0.0),
                Point3::new(3.0, 1.0, 0.0),
                Point3::new(3.0, 3.0, 0.0),
                Point3::new(2.0, 3.0, 0.0),
            ]),
            SmartPoly::from_points(&[
                Point3::new(0.0, 2.0, 0.0),
                Point3::new(2.0, 2.0, 0.0),
                Point3::new(2.0, 3.0, 0.0),
                Point3::new(0.0, 3.0, 0.0),
            ]),
            SmartPoly::from_points(&[
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ]),
        ];
        let (_, regions) = union_regions(&bars).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].holes.len(), 1);
        assert_relative_eq!(regions[0].area(), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn relinks_existing_vertices() {
        let mut mesh = archkit_mesh::EditMesh::new();
        let face = mesh
            .add_root_polygon(
                &[
                    Point3::new(0.0, 0.0, 0.0),
                    Point3::new(2.0, 0.0, 0.0),
                    Point3::new(2.0, 2.0, 0.0),
                    Point3::new(0.0, 2.0, 0.0),
                ],
                archkit_mesh::FaceAttrs::default(),
            )
            .unwrap();
        let poly = SmartPoly::from_face(&mesh, face).unwrap();
        let cutter = square(1.0, -1.0, 2.0);
        let result = poly.clip_with(&cutter, ClipOp::Difference).unwrap();
        assert_eq!(result.len(), 1);
        let linked = result[0].points.iter().filter(|p| p.vert.is_some()).count();
        let on_edge = result[0].points.iter().filter(|p| p.on_edge.is_some()).count();
        // (0,0), (0,2), (2,2) survive; (1,0) and (2,1) are cut points.
        assert_eq!(linked, 3);
        assert_eq!(on_edge, 2);
    }

    #[test]
    fn splice_two_holes() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(6.0, 0.0),
            Point2::new(6.0, 3.0),
            Point2::new(0.0, 3.0),
        ];
        let hole = |x: f64| {
            vec![
                Point2::new(x, 1.0),
                Point2::new(x + 1.0, 1.0),
                Point2::new(x + 1.0, 2.0),
                Point2::new(x, 2.0),
            ]
        };
        let ring = splice_holes(&outer, &[hole(1.0), hole(4.0)]).unwrap();
        assert_eq!(ring.len(), 4 + 2 * 5);
        assert_relative_eq!(contour::signed_area(&ring), 18.0 - 2.0, epsilon = 1e-9);
    }
}
