// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Split face: cut a control face in two, by a diagonal between corners or
//! by a line across one frame axis.

use archkit_geometry::SmartPoly;
use archkit_journal::SelectionInfo;
use serde::{Deserialize, Serialize};

use super::helpers::{control_faces, retire_faces, PlaneAxis};
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const PIECES: &str = "Pieces";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitCut {
    /// Diagonal between two corners of the control face.
    Points { a: usize, b: usize },
    /// Line perpendicular to `axis` at `position` (0..1 of the bbox).
    Axis { axis: PlaneAxis, position: f64 },
}

impl Default for SplitCut {
    fn default() -> Self {
        SplitCut::Axis {
            axis: PlaneAxis::X,
            position: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitFaceParams {
    pub cut: SplitCut,
    pub styles: SlotStyles,
}

impl OperatorParams for SplitFaceParams {
    fn topology_changed(&self, old: &Self) -> bool {
        match (&self.cut, &old.cut) {
            (SplitCut::Points { a, b }, SplitCut::Points { a: oa, b: ob }) => a != oa || b != ob,
            // A moved cut adds or loses pieces only on concave faces, which
            // shows up in the manifest after the rerun.
            (SplitCut::Axis { axis, .. }, SplitCut::Axis { axis: old_axis, .. }) => {
                axis != old_axis
            }
            _ => true,
        }
    }

    fn validate(&self) -> Result<()> {
        if let SplitCut::Axis { position, .. } = self.cut {
            if !(0.0..=1.0).contains(&position) {
                return Err(Error::InvalidParameters(format!(
                    "split position {position} is outside 0..1"
                )));
            }
        }
        Ok(())
    }
}

fn cut(poly: &SmartPoly, cut: &SplitCut) -> Result<Vec<SmartPoly>> {
    match *cut {
        SplitCut::Points { a, b } => {
            let (first, second) = poly.split_points(a, b)?;
            Ok(vec![first, second])
        }
        SplitCut::Axis { axis, position } => {
            let min = axis.of(&poly.bbox_min);
            let max = axis.of(&poly.bbox_max);
            Ok(poly.split_xy(axis.into(), min + (max - min) * position)?)
        }
    }
}

/// Split face processor.
pub struct SplitFaceProcessor;

impl MeshOperator for SplitFaceProcessor {
    type Params = SplitFaceParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::SplitFace
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &SplitFaceParams,
    ) -> Result<()> {
        ctx.declare_slot(PIECES);
        let controls = control_faces(ctx, selection)?;
        // Cut everything first so a bad corner index leaves the mesh alone.
        let mut pieces = Vec::with_capacity(controls.len());
        for control in &controls {
            pieces.push(cut(&control.poly, &params.cut)?);
        }
        for control in &controls {
            retire_faces(ctx, &control.faces)?;
        }
        for (control, parts) in controls.iter().zip(pieces) {
            ctx.set_uv_frame(control.poly.frame);
            let attrs = slot_attrs(&params.styles, PIECES, control.attrs);
            for part in parts {
                ctx.face(&part.points, PIECES, attrs)?;
            }
        }
        Ok(())
    }
}
