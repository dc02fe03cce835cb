// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Project face: push a control outline along its normal onto a tilted
//! target plane and skin the sides.

use archkit_geometry::{bridge_by_number, SmartVec};
use archkit_journal::SelectionInfo;
use serde::{Deserialize, Serialize};

use super::helpers::{ccw_ring, control_faces, retire_faces};
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const SIDES: &str = "Sides";
pub const TOPS: &str = "Tops";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFaceParams {
    /// Distance of the target plane at the bbox center.
    pub distance: f64,
    /// Target plane tilt about the frame x and y axes, radians.
    pub tilt: [f64; 2],
    pub styles: SlotStyles,
}

impl Default for ProjectFaceParams {
    fn default() -> Self {
        Self {
            distance: 0.5,
            tilt: [0.0, 0.0],
            styles: SlotStyles::new(),
        }
    }
}

impl OperatorParams for ProjectFaceParams {
    fn topology_changed(&self, _old: &Self) -> bool {
        false
    }

    fn validate(&self) -> Result<()> {
        let limit = 80f64.to_radians();
        if self.tilt.iter().any(|t| t.abs() > limit) {
            return Err(Error::InvalidParameters(format!(
                "target plane tilt {:?} exceeds 80 degrees",
                self.tilt
            )));
        }
        Ok(())
    }
}

/// Project face processor.
pub struct ProjectFaceProcessor;

impl MeshOperator for ProjectFaceProcessor {
    type Params = ProjectFaceParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::ProjectFace
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &ProjectFaceParams,
    ) -> Result<()> {
        ctx.declare_slot(SIDES);
        ctx.declare_slot(TOPS);
        let controls = control_faces(ctx, selection)?;
        for control in &controls {
            retire_faces(ctx, &control.faces)?;
        }
        let (tx, ty) = (params.tilt[0].tan(), params.tilt[1].tan());
        let mut ring_sizes = Vec::with_capacity(controls.len());
        for control in &controls {
            let poly = &control.poly;
            let frame = poly.frame;
            ctx.set_uv_frame(frame);
            let center = poly.bbox_center();
            let base = ccw_ring(poly);
            ring_sizes.push(base.len());
            // Tilting about x raises the plane with y, about y with x.
            let top: Vec<SmartVec> = base
                .iter()
                .map(|p| {
                    let q = p.co2 - center;
                    let depth = params.distance + q.y * tx + q.x * ty;
                    let mut v = SmartVec::new(frame.make_3d_depth(&p.co2, depth));
                    v.co2 = p.co2;
                    v
                })
                .collect();

            let mut sides = bridge_by_number(&base, &top, 0, false)?;
            let mut top = top;
            if params.distance < 0.0 {
                sides.iter_mut().for_each(|quad| quad.reverse());
                top.reverse();
            }
            let attrs = slot_attrs(&params.styles, SIDES, control.attrs);
            for quad in sides {
                ctx.face(&quad, SIDES, attrs)?;
            }
            ctx.face(&top, TOPS, slot_attrs(&params.styles, TOPS, control.attrs))?;
        }
        if let Some(&n) = ring_sizes.first() {
            let uniform = ring_sizes.iter().all(|&m| m == n);
            if uniform && ctx.slot_len(SIDES) == n * ring_sizes.len() {
                ctx.set_modulus(SIDES, n);
            }
        }
        Ok(())
    }
}
