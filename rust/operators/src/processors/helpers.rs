// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared helpers for operator processors.
//!
//! Reading control faces out of a selection, ring construction in a face
//! frame, and orientation fixes for solid pieces.

use archkit_geometry::{newell_normal, union_all, Axis, Frame, SmartPoly, SmartVec};
use archkit_journal::{SelectionInfo, SelectionMode};
use archkit_mesh::{FaceAttrs, FaceKey};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::context::BuildContext;
use crate::error::{Error, Result};

/// A polygon an operator builds from, with the mesh faces it came from.
#[derive(Debug, Clone)]
pub(super) struct ControlFace {
    pub(super) poly: SmartPoly,
    pub(super) faces: Vec<FaceKey>,
    pub(super) attrs: FaceAttrs,
}

/// Resolves the selected faces into control polygons.
///
/// REGION selections are merged into their union; the other modes yield one
/// control polygon per face. Faces too degenerate to read are skipped.
pub(super) fn control_faces(
    ctx: &BuildContext<'_>,
    selection: &SelectionInfo,
) -> Result<Vec<ControlFace>> {
    let groups = selection.groups();
    if groups.is_empty() {
        return Err(Error::NothingSelected);
    }
    let mesh = ctx.mesh();
    let mut out = Vec::new();
    for group in groups {
        let keys = group
            .iter()
            .map(|&id| {
                mesh.find_face(id).ok_or_else(|| {
                    Error::TopologyInconsistency(format!("selected face {id} is not in the mesh"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut polys = Vec::with_capacity(keys.len());
        for &key in &keys {
            let Some(attrs) = mesh.face(key).map(|f| f.attrs) else {
                continue;
            };
            match SmartPoly::from_face(mesh, key) {
                Ok(poly) => polys.push((key, poly, attrs)),
                Err(e) => tracing::warn!(op_id = ctx.op_id(), error = %e, "skipped unreadable control face"),
            }
        }
        let Some(&(_, _, attrs)) = polys.first() else {
            continue;
        };

        if selection.mode == SelectionMode::Region && polys.len() > 1 {
            let sources: Vec<SmartPoly> = polys.iter().map(|(_, p, _)| p.clone()).collect();
            for poly in union_all(&sources)? {
                out.push(ControlFace {
                    poly,
                    faces: keys.clone(),
                    attrs,
                });
            }
        } else {
            for (key, poly, attrs) in polys {
                out.push(ControlFace {
                    poly,
                    faces: vec![key],
                    attrs,
                });
            }
        }
    }
    if out.is_empty() {
        return Err(Error::NothingSelected);
    }
    Ok(out)
}

/// Retires the control faces still in the mesh.
pub(super) fn retire_faces(ctx: &mut BuildContext<'_>, faces: &[FaceKey]) -> Result<()> {
    for &face in faces {
        if ctx.mesh().contains_face(face) {
            ctx.retire(face)?;
        }
    }
    Ok(())
}

/// Frame axis named in parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaneAxis {
    #[default]
    X,
    Y,
}

impl From<PlaneAxis> for Axis {
    fn from(axis: PlaneAxis) -> Self {
        match axis {
            PlaneAxis::X => Axis::X,
            PlaneAxis::Y => Axis::Y,
        }
    }
}

impl PlaneAxis {
    pub(super) fn direction(&self, frame: &Frame) -> Vector3<f64> {
        match self {
            PlaneAxis::X => frame.x_axis,
            PlaneAxis::Y => frame.y_axis,
        }
    }

    pub(super) fn other(&self) -> PlaneAxis {
        match self {
            PlaneAxis::X => PlaneAxis::Y,
            PlaneAxis::Y => PlaneAxis::X,
        }
    }

    pub(super) fn of(&self, p: &Point2<f64>) -> f64 {
        match self {
            PlaneAxis::X => p.x,
            PlaneAxis::Y => p.y,
        }
    }
}

/// The control polygon's points, counter-clockwise in its frame.
pub(super) fn ccw_ring(poly: &SmartPoly) -> Vec<SmartVec> {
    let mut ring = poly.points.clone();
    if poly.area < 0.0 {
        ring.reverse();
    }
    ring
}

/// Virtual points for 2D frame coordinates at `depth` along the normal.
pub(super) fn ring_at(frame: &Frame, points: &[Point2<f64>], depth: f64) -> Vec<SmartVec> {
    points
        .iter()
        .map(|p| {
            let mut v = SmartVec::new(frame.make_3d_depth(p, depth));
            v.co2 = *p;
            v
        })
        .collect()
}

fn centroid(points: &[SmartVec]) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.co.coords);
    Point3::from(sum / points.len().max(1) as f64)
}

pub(super) fn mean_point(points: impl IntoIterator<Item = Point3<f64>>) -> Point3<f64> {
    let (sum, count) = points
        .into_iter()
        .fold((Vector3::zeros(), 0usize), |(s, c), p| (s + p.coords, c + 1));
    Point3::from(sum / count.max(1) as f64)
}

/// Reverses the loop when its normal points towards `inside`.
pub(super) fn orient_away(mut points: Vec<SmartVec>, inside: &Point3<f64>) -> Vec<SmartVec> {
    let normal = newell_normal(points.iter().map(|p| &p.co));
    if normal.dot(&(centroid(&points) - inside)) < 0.0 {
        points.reverse();
    }
    points
}

/// The six faces of a box given bottom corners `0..4` and the matching top
/// corners `4..8`, each facing away from the box center.
pub(super) fn box_faces(corners: &[SmartVec; 8]) -> Vec<Vec<SmartVec>> {
    const LOOPS: [[usize; 4]; 6] = [
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [1, 2, 6, 5],
        [2, 3, 7, 6],
        [3, 0, 4, 7],
    ];
    let center = centroid(corners);
    LOOPS
        .iter()
        .map(|idx| orient_away(idx.iter().map(|&i| corners[i]).collect(), &center))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_faces_point_outwards() {
        let corners: Vec<SmartVec> = [
            (0.0, 0.0, 0.0),
            (1.0, 0.0, 0.0),
            (1.0, 1.0, 0.0),
            (0.0, 1.0, 0.0),
            (0.0, 0.0, 1.0),
            (1.0, 0.0, 1.0),
            (1.0, 1.0, 1.0),
            (0.0, 1.0, 1.0),
        ]
        .iter()
        .map(|&(x, y, z)| SmartVec::new(Point3::new(x, y, z)))
        .collect();
        let corners: [SmartVec; 8] = corners.try_into().unwrap();
        let center = Point3::new(0.5, 0.5, 0.5);
        for face in box_faces(&corners) {
            let n = newell_normal(face.iter().map(|p| &p.co));
            assert!(n.dot(&(centroid(&face) - center)) > 0.0);
        }
    }

    #[test]
    fn ring_keeps_frame_coordinates() {
        let frame = Frame::from_normal(Point3::new(0.0, 0.0, 2.0), Vector3::z());
        let ring = ring_at(&frame, &[Point2::new(1.0, 2.0)], 0.5);
        assert_eq!(ring[0].co, Point3::new(1.0, 2.0, 2.5));
        assert_eq!(ring[0].co2, Point2::new(1.0, 2.0));
    }
}
