// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sweep extrude: revolve a control face about a hinge line lying in its
//! plane.

use std::f64::consts::{FRAC_PI_2, TAU};

use archkit_geometry::{generate_revolve, Point2, Point3, SmartVec, Vector2};
use archkit_journal::SelectionInfo;
use serde::{Deserialize, Serialize};

use super::helpers::{ccw_ring, control_faces, mean_point, orient_away, PlaneAxis};
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const SIDES: &str = "Sides";
pub const TOPS: &str = "Tops";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrudeSweepParams {
    /// Frame axis the hinge runs along.
    pub axis: PlaneAxis,
    /// Hinge position across the other axis, in bbox sizes from the center.
    pub pivot: f64,
    pub angle: f64,
    pub steps: usize,
    pub cap: bool,
    pub styles: SlotStyles,
}

impl Default for ExtrudeSweepParams {
    fn default() -> Self {
        Self {
            axis: PlaneAxis::X,
            pivot: -0.5,
            angle: FRAC_PI_2,
            steps: 4,
            cap: true,
            styles: SlotStyles::new(),
        }
    }
}

impl ExtrudeSweepParams {
    fn full_turn(&self) -> bool {
        (self.angle.abs() - TAU).abs() < 1e-9
    }
}

impl OperatorParams for ExtrudeSweepParams {
    fn topology_changed(&self, old: &Self) -> bool {
        self.steps != old.steps || self.cap != old.cap || self.full_turn() != old.full_turn()
    }

    fn validate(&self) -> Result<()> {
        if self.steps == 0 || self.steps > 720 {
            return Err(Error::InvalidParameters(format!(
                "sweep needs 1..=720 steps, got {}",
                self.steps
            )));
        }
        if self.angle == 0.0 || self.angle.abs() > TAU + 1e-9 {
            return Err(Error::InvalidParameters(format!(
                "sweep angle must be non-zero and at most a full turn, got {}",
                self.angle
            )));
        }
        Ok(())
    }
}

/// Sweep extrude processor.
pub struct ExtrudeSweepProcessor;

impl MeshOperator for ExtrudeSweepProcessor {
    type Params = ExtrudeSweepParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::ExtrudeSweep
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &ExtrudeSweepParams,
    ) -> Result<()> {
        ctx.declare_slot(SIDES);
        ctx.declare_slot(TOPS);
        let mut row = None;
        for control in control_faces(ctx, selection)? {
            let poly = &control.poly;
            let frame = poly.frame;
            ctx.set_uv_frame(frame);

            let base = ccw_ring(poly);
            let section: Vec<Point3<f64>> = base.iter().map(|p| p.co).collect();
            let across = params.axis.other();
            let size = poly.bbox_size();
            let shift = params.pivot * across.of(&Point2::from(size));
            let mut hinge = poly.bbox_center();
            match across {
                PlaneAxis::X => hinge += Vector2::new(shift, 0.0),
                PlaneAxis::Y => hinge += Vector2::new(0.0, shift),
            }
            let rev = generate_revolve(
                &section,
                true,
                &frame.make_3d(&hinge),
                &params.axis.direction(&frame),
                params.steps,
                params.angle,
            )?;

            let point = |ring: usize, idx: usize| -> SmartVec {
                if ring == 0 {
                    base[idx]
                } else {
                    SmartVec::new(rev.rings[ring][idx])
                }
            };
            let inside = mean_point(rev.rings.iter().flatten().copied());
            let attrs = slot_attrs(&params.styles, SIDES, control.attrs);
            let before = ctx.slot_len(SIDES);
            for face in &rev.faces {
                let loop_pts = face.iter().map(|&(r, i)| point(r, i)).collect();
                ctx.face(&orient_away(loop_pts, &inside), SIDES, attrs)?;
            }
            let n = base.len();
            let regular = ctx.slot_len(SIDES) - before == n * params.steps;
            row = match row {
                None if regular => Some(n),
                Some(m) if regular && m == n => Some(m),
                _ => Some(0),
            };

            if params.cap && !rev.full_turn {
                let last = rev.rings.len() - 1;
                let top = (0..n).map(|i| point(last, i)).collect();
                ctx.face(
                    &orient_away(top, &inside),
                    TOPS,
                    slot_attrs(&params.styles, TOPS, control.attrs),
                )?;
            }
        }
        if let Some(n) = row.filter(|&n| n > 0) {
            ctx.set_modulus(SIDES, n);
        }
        Ok(())
    }
}
