// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Louvers: a row of tilted blades across a control face.

use std::f64::consts::FRAC_PI_4;

use archkit_geometry::{Point2, Point3, SmartPoly, SmartVec, Vector3};
use archkit_journal::SelectionInfo;
use serde::{Deserialize, Serialize};

use super::helpers::{box_faces, control_faces, orient_away, PlaneAxis};
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const BLADES: &str = "Blades";
pub const RISERS: &str = "Risers";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeLouversParams {
    pub count: usize,
    /// Frame axis the blades run along; they are stacked across the other.
    pub axis: PlaneAxis,
    /// Clearance from the bbox on every side.
    pub margin: f64,
    pub blade_width: f64,
    pub blade_thickness: f64,
    /// Tilt of the blades out of the face plane, radians.
    pub angle: f64,
    /// Offset of the blade centers along the face normal.
    pub depth: f64,
    /// Close the gaps between neighbouring blades.
    pub risers: bool,
    pub styles: SlotStyles,
}

impl Default for MakeLouversParams {
    fn default() -> Self {
        Self {
            count: 5,
            axis: PlaneAxis::X,
            margin: 0.05,
            blade_width: 0.1,
            blade_thickness: 0.02,
            angle: FRAC_PI_4,
            depth: 0.05,
            risers: false,
            styles: SlotStyles::new(),
        }
    }
}

impl OperatorParams for MakeLouversParams {
    fn topology_changed(&self, old: &Self) -> bool {
        self.count != old.count || self.risers != old.risers
    }

    fn validate(&self) -> Result<()> {
        if self.count == 0 || self.count > 512 {
            return Err(Error::InvalidParameters(format!(
                "louvers need 1..=512 blades, got {}",
                self.count
            )));
        }
        if self.blade_width <= 0.0 || self.blade_thickness <= 0.0 {
            return Err(Error::InvalidParameters("blade size must be positive".into()));
        }
        Ok(())
    }
}

/// Blade corners: bottom `0..4`, top `4..8`.
struct Blade {
    corners: [SmartVec; 8],
    center: Point3<f64>,
}

fn blades(poly: &SmartPoly, params: &MakeLouversParams) -> Vec<Blade> {
    let frame = poly.frame;
    let along = params.axis;
    let across = along.other();
    let (min, max) = (poly.bbox_min, poly.bbox_max);
    let half_len = ((along.of(&max) - along.of(&min)) * 0.5 - params.margin).max(0.0);
    let mid = (along.of(&max) + along.of(&min)) * 0.5;
    let lo = across.of(&min) + params.margin;
    let hi = across.of(&max) - params.margin;

    let long = along.direction(&frame);
    let stack = across.direction(&frame);
    let (sin, cos) = params.angle.sin_cos();
    let chord: Vector3<f64> = (stack * cos + frame.normal * sin) * (params.blade_width * 0.5);
    let thick: Vector3<f64> = (-stack * sin + frame.normal * cos) * (params.blade_thickness * 0.5);
    let half: Vector3<f64> = long * half_len;

    (0..params.count)
        .map(|k| {
            let s = lo + (hi - lo) * (k as f64 + 0.5) / params.count as f64;
            let p2 = match along {
                PlaneAxis::X => Point2::new(mid, s),
                PlaneAxis::Y => Point2::new(s, mid),
            };
            let center = frame.make_3d_depth(&p2, params.depth);
            let corner = |l: f64, c: f64, t: f64| {
                SmartVec::new(center + half * l + chord * c + thick * t)
            };
            Blade {
                corners: [
                    corner(-1.0, -1.0, -1.0),
                    corner(1.0, -1.0, -1.0),
                    corner(1.0, 1.0, -1.0),
                    corner(-1.0, 1.0, -1.0),
                    corner(-1.0, -1.0, 1.0),
                    corner(1.0, -1.0, 1.0),
                    corner(1.0, 1.0, 1.0),
                    corner(-1.0, 1.0, 1.0),
                ],
                center,
            }
        })
        .collect()
}

/// Louver processor.
pub struct MakeLouversProcessor;

impl MeshOperator for MakeLouversProcessor {
    type Params = MakeLouversParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::MakeLouvers
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &MakeLouversParams,
    ) -> Result<()> {
        ctx.declare_slot(BLADES);
        ctx.declare_slot(RISERS);
        for control in control_faces(ctx, selection)? {
            ctx.set_uv_frame(control.poly.frame);
            let blade_attrs = slot_attrs(&params.styles, BLADES, control.attrs);
            let riser_attrs = slot_attrs(&params.styles, RISERS, control.attrs);
            let blades = blades(&control.poly, params);
            for blade in &blades {
                for face in box_faces(&blade.corners) {
                    ctx.face(&face, BLADES, blade_attrs)?;
                }
            }
            if params.risers {
                // Leading bottom edge of one blade to the trailing bottom
                // edge of the next.
                for pair in blades.windows(2) {
                    let (a, b) = (&pair[0].corners, &pair[1].corners);
                    let quad = vec![a[3], a[2], b[1], b[0]];
                    ctx.face(&orient_away(quad, &pair[0].center), RISERS, riser_attrs)?;
                }
            }
        }
        if ctx.slot_len(BLADES) % 6 == 0 {
            ctx.set_modulus(BLADES, 6);
        }
        Ok(())
    }
}
