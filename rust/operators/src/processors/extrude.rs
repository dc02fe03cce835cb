// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fancy extrude: push a control face out along its normal in steps, with
//! taper, twist and lateral offset interpolated over the steps.

use archkit_geometry::{bridge_by_number, Point2, SmartPoly, SmartVec, Vector2};
use archkit_journal::SelectionInfo;
use nalgebra::Rotation2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::helpers::{ccw_ring, control_faces, retire_faces};
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const SIDES: &str = "Sides";
pub const TOPS: &str = "Tops";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrudeFancyParams {
    pub steps: usize,
    /// Total distance along the face normal.
    pub distance: f64,
    /// Scale of the last ring about the bbox center.
    pub scale: f64,
    /// Lateral offset of the last ring in frame units.
    pub offset: [f64; 2],
    /// Rotation of the last ring about the bbox center, radians.
    pub twist: f64,
    pub cap: bool,
    pub styles: SlotStyles,
}

impl Default for ExtrudeFancyParams {
    fn default() -> Self {
        Self {
            steps: 1,
            distance: 1.0,
            scale: 1.0,
            offset: [0.0, 0.0],
            twist: 0.0,
            cap: true,
            styles: SlotStyles::new(),
        }
    }
}

impl OperatorParams for ExtrudeFancyParams {
    fn topology_changed(&self, old: &Self) -> bool {
        self.steps != old.steps || self.cap != old.cap
    }

    fn validate(&self) -> Result<()> {
        if self.steps == 0 || self.steps > 1024 {
            return Err(Error::InvalidParameters(format!(
                "extrude needs 1..=1024 steps, got {}",
                self.steps
            )));
        }
        if self.scale < 0.0 {
            return Err(Error::InvalidParameters(format!(
                "extrude scale must not be negative, got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

/// Rings from the control boundary (step 0) to the last step.
fn rings(poly: &SmartPoly, params: &ExtrudeFancyParams) -> SmallVec<[Vec<SmartVec>; 8]> {
    let base = ccw_ring(poly);
    let frame = poly.frame;
    let pivot = poly.bbox_center();
    let offset = Vector2::new(params.offset[0], params.offset[1]);

    let mut out: SmallVec<[Vec<SmartVec>; 8]> = SmallVec::with_capacity(params.steps + 1);
    out.push(base.clone());
    for k in 1..=params.steps {
        let t = k as f64 / params.steps as f64;
        let s = 1.0 + (params.scale - 1.0) * t;
        let rot = Rotation2::new(params.twist * t);
        let ring = base
            .iter()
            .map(|p| {
                let q: Point2<f64> = pivot + rot * ((p.co2 - pivot) * s) + offset * t;
                let mut v = SmartVec::new(frame.make_3d_depth(&q, params.distance * t));
                v.co2 = q;
                v
            })
            .collect();
        out.push(ring);
    }
    out
}

/// Fancy extrude processor.
pub struct ExtrudeFancyProcessor;

impl MeshOperator for ExtrudeFancyProcessor {
    type Params = ExtrudeFancyParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::ExtrudeFancy
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &ExtrudeFancyParams,
    ) -> Result<()> {
        ctx.declare_slot(SIDES);
        ctx.declare_slot(TOPS);
        let controls = control_faces(ctx, selection)?;
        for control in &controls {
            retire_faces(ctx, &control.faces)?;
        }

        let flip = params.distance < 0.0;
        let mut row = None;
        for control in &controls {
            let poly = &control.poly;
            ctx.set_uv_frame(poly.frame);
            let side_attrs = slot_attrs(&params.styles, SIDES, control.attrs);
            let rings = rings(poly, params);
            let before = ctx.slot_len(SIDES);
            for pair in rings.windows(2) {
                for mut quad in bridge_by_number(&pair[0], &pair[1], 0, false)? {
                    if flip {
                        quad.reverse();
                    }
                    ctx.face(&quad, SIDES, side_attrs)?;
                }
            }
            let n = rings[0].len();
            let regular = ctx.slot_len(SIDES) - before == n * params.steps;
            row = match row {
                None if regular => Some(n),
                Some(m) if regular && m == n => Some(m),
                _ => Some(0),
            };

            if params.cap {
                if let Some(top) = rings.last() {
                    let mut top = top.clone();
                    if flip {
                        top.reverse();
                    }
                    ctx.face(&top, TOPS, slot_attrs(&params.styles, TOPS, control.attrs))?;
                }
            }
        }
        if let Some(n) = row.filter(|&n| n > 0) {
            ctx.set_modulus(SIDES, n);
        }
        Ok(())
    }
}
