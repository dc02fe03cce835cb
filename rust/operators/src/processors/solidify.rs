// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solidify edges: run a rail of constant section along every edge of a
//! control face, optionally dashed.

use archkit_geometry::{bridge_by_number, ngon, Frame, Point2, SmartPoly, SmartVec, Vector2};
use archkit_journal::SelectionInfo;
use archkit_mesh::FaceAttrs;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use super::helpers::{control_faces, mean_point, orient_away};
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const SIDES: &str = "Sides";
pub const CAPS: &str = "Caps";

/// Section in (outward, normal) coordinates.
type Section = SmallVec<[Point2<f64>; 8]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolidifyEdgesParams {
    /// Section extent across the edge, in the face plane.
    pub width: f64,
    /// Section extent along the face normal.
    pub height: f64,
    /// Shift of the section outwards from the edge.
    pub offset: f64,
    /// Dash length and gap; a zero length gives continuous rails.
    pub dash: [f64; 2],
    /// Join continuous rails at the corners.
    pub miter: bool,
    /// Sides of a round section; below 3 the section is a rectangle.
    pub revolutions: usize,
    pub cap: bool,
    pub styles: SlotStyles,
}

impl Default for SolidifyEdgesParams {
    fn default() -> Self {
        Self {
            width: 0.1,
            height: 0.1,
            offset: 0.0,
            dash: [0.0, 0.0],
            miter: true,
            revolutions: 0,
            cap: true,
            styles: SlotStyles::new(),
        }
    }
}

impl SolidifyEdgesParams {
    fn dashed(&self) -> bool {
        self.dash[0] > 0.0
    }

    fn section(&self) -> Result<Section> {
        if self.revolutions >= 3 {
            let round = ngon(self.revolutions, self.width * 0.5, self.height * 0.5, 0.0)?;
            return Ok(round
                .into_iter()
                .map(|p| Point2::new(p.x + self.offset, p.y + self.height * 0.5))
                .collect());
        }
        let (lo, hi) = (self.offset - self.width * 0.5, self.offset + self.width * 0.5);
        Ok(smallvec![
            Point2::new(lo, 0.0),
            Point2::new(hi, 0.0),
            Point2::new(hi, self.height),
            Point2::new(lo, self.height),
        ])
    }
}

impl OperatorParams for SolidifyEdgesParams {
    fn topology_changed(&self, old: &Self) -> bool {
        let sides = |p: &Self| if p.revolutions >= 3 { p.revolutions } else { 4 };
        sides(self) != sides(old)
            || self.cap != old.cap
            || self.miter != old.miter
            || self.dash != old.dash
    }

    fn validate(&self) -> Result<()> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(Error::InvalidParameters(format!(
                "rail section must be positive, got {} x {}",
                self.width, self.height
            )));
        }
        if self.dashed() && self.dash[1] < 0.0 {
            return Err(Error::InvalidParameters("dash gap must not be negative".into()));
        }
        if self.revolutions > 256 {
            return Err(Error::InvalidParameters(format!(
                "round section of {} sides is too fine",
                self.revolutions
            )));
        }
        Ok(())
    }
}

/// Arc-length intervals of one edge covered by rail pieces.
fn pieces(length: f64, dash: [f64; 2]) -> Vec<(f64, f64)> {
    if dash[0] <= 0.0 {
        return vec![(0.0, length)];
    }
    let mut out = Vec::new();
    let mut s = 0.0;
    while s < length - 1e-9 {
        out.push((s, (s + dash[0]).min(length)));
        s += dash[0] + dash[1];
    }
    out
}

/// One section ring placed at `base` with outward direction `u`.
///
/// `stretch` scales the outward coordinate, for mitered corners.
fn ring(
    frame: &Frame,
    section: &Section,
    base: &Point2<f64>,
    u: &Vector2<f64>,
    stretch: f64,
) -> Vec<SmartVec> {
    section
        .iter()
        .map(|s| {
            let q = base + u * (s.x * stretch);
            let mut v = SmartVec::new(frame.make_3d_depth(&q, s.y));
            v.co2 = q;
            v
        })
        .collect()
}

/// Solidify edges processor.
pub struct SolidifyEdgesProcessor;

impl SolidifyEdgesProcessor {
    fn rails(
        &self,
        ctx: &mut BuildContext<'_>,
        poly: &SmartPoly,
        section: &Section,
        params: &SolidifyEdgesParams,
        attrs: (FaceAttrs, FaceAttrs),
    ) -> Result<()> {
        let frame = poly.frame;
        let n = poly.len();
        let ccw = if poly.area < 0.0 { -1.0 } else { 1.0 };
        for i in 0..n {
            let a = poly.points[i].co2;
            let edge = poly.edge_vector(i);
            let length = edge.norm();
            if length < 1e-9 {
                continue;
            }
            let dir = edge / length;
            let u = Vector2::new(dir.y, -dir.x) * ccw;

            for (s0, s1) in pieces(length, params.dash) {
                let joined_start = params.miter && !params.dashed() && s0 == 0.0;
                let joined_end = params.miter && !params.dashed() && s1 >= length;
                let start = if joined_start {
                    ring(&frame, section, &a, &poly.outward_ray(i), poly.miter_factor(i))
                } else {
                    ring(&frame, section, &(a + dir * s0), &u, 1.0)
                };
                let j = (i + 1) % n;
                let end = if joined_end {
                    let corner = poly.points[j].co2;
                    ring(&frame, section, &corner, &poly.outward_ray(j), poly.miter_factor(j))
                } else {
                    ring(&frame, section, &(a + dir * s1), &u, 1.0)
                };

                let inside = mean_point(start.iter().chain(&end).map(|p| p.co));
                for quad in bridge_by_number(&start, &end, 0, false)? {
                    ctx.face(&orient_away(quad, &inside), SIDES, attrs.0)?;
                }
                if params.cap {
                    if !joined_start {
                        ctx.face(&orient_away(start, &inside), CAPS, attrs.1)?;
                    }
                    if !joined_end {
                        ctx.face(&orient_away(end, &inside), CAPS, attrs.1)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl MeshOperator for SolidifyEdgesProcessor {
    type Params = SolidifyEdgesParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::SolidifyEdges
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &SolidifyEdgesParams,
    ) -> Result<()> {
        ctx.declare_slot(SIDES);
        ctx.declare_slot(CAPS);
        let section = params.section()?;
        for control in control_faces(ctx, selection)? {
            ctx.set_uv_frame(control.poly.frame);
            let attrs = (
                slot_attrs(&params.styles, SIDES, control.attrs),
                slot_attrs(&params.styles, CAPS, control.attrs),
            );
            self.rails(ctx, &control.poly, &section, params, attrs)?;
        }
        if ctx.slot_len(SIDES) % section.len() == 0 {
            ctx.set_modulus(SIDES, section.len());
        }
        Ok(())
    }
}
