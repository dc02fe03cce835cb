// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Grid divide: cut a control face into rows and columns.

use archkit_geometry::{Axis, SmartPoly};
use archkit_journal::SelectionInfo;
use serde::{Deserialize, Serialize};

use super::helpers::{control_faces, retire_faces};
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const CELLS: &str = "Cells";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridDivideParams {
    /// Number of vertical cut lines.
    pub count_x: usize,
    /// Number of horizontal cut lines.
    pub count_y: usize,
    pub styles: SlotStyles,
}

impl Default for GridDivideParams {
    fn default() -> Self {
        Self {
            count_x: 1,
            count_y: 1,
            styles: SlotStyles::new(),
        }
    }
}

impl OperatorParams for GridDivideParams {
    fn topology_changed(&self, old: &Self) -> bool {
        self.count_x != old.count_x || self.count_y != old.count_y
    }

    fn validate(&self) -> Result<()> {
        if self.count_x > 256 || self.count_y > 256 {
            return Err(Error::InvalidParameters(format!(
                "grid of {}x{} cuts is too fine",
                self.count_x, self.count_y
            )));
        }
        Ok(())
    }
}

/// Cut positions at `k / (count + 1)` of the bbox along `axis`.
fn cuts(poly: &SmartPoly, axis: Axis, count: usize) -> Vec<f64> {
    let (lo, hi) = match axis {
        Axis::X => (poly.bbox_min.x, poly.bbox_max.x),
        Axis::Y => (poly.bbox_min.y, poly.bbox_max.y),
    };
    (1..=count)
        .map(|k| lo + (hi - lo) * k as f64 / (count + 1) as f64)
        .collect()
}

/// Splits `poly` at each cut in turn; returns the bands from low to high.
fn bands(poly: &SmartPoly, axis: Axis, cuts: &[f64]) -> Result<Vec<Vec<SmartPoly>>> {
    let mut out = Vec::with_capacity(cuts.len() + 1);
    let mut rest = vec![poly.clone()];
    for &cut in cuts {
        let mut below = Vec::new();
        let mut above = Vec::new();
        for piece in &rest {
            for part in piece.split_xy(axis, cut)? {
                let mid = match axis {
                    Axis::X => part.bbox_center().x,
                    Axis::Y => part.bbox_center().y,
                };
                if mid < cut {
                    below.push(part);
                } else {
                    above.push(part);
                }
            }
        }
        out.push(below);
        rest = above;
    }
    out.push(rest);
    Ok(out)
}

/// Grid divide processor.
pub struct GridDivideProcessor;

impl MeshOperator for GridDivideProcessor {
    type Params = GridDivideParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::GridDivide
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &GridDivideParams,
    ) -> Result<()> {
        ctx.declare_slot(CELLS);
        let controls = control_faces(ctx, selection)?;
        let mut complete = true;
        for control in &controls {
            retire_faces(ctx, &control.faces)?;
        }
        for control in controls {
            let poly = &control.poly;
            ctx.set_uv_frame(poly.frame);
            let attrs = slot_attrs(&params.styles, CELLS, control.attrs);
            let xs = cuts(poly, Axis::X, params.count_x);
            let ys = cuts(poly, Axis::Y, params.count_y);

            let before = ctx.slot_len(CELLS);
            for row in bands(poly, Axis::Y, &ys)? {
                for piece in row {
                    for column in bands(&piece, Axis::X, &xs)? {
                        for cell in column {
                            ctx.face(&cell.points, CELLS, attrs)?;
                        }
                    }
                }
            }
            let made = ctx.slot_len(CELLS) - before;
            complete &= made == (params.count_x + 1) * (params.count_y + 1);
        }
        // Row-major addressing only holds when every cell came out.
        if complete {
            ctx.set_modulus(CELLS, params.count_x + 1);
        } else {
            tracing::debug!(op_id = ctx.op_id(), "grid cells irregular, no row modulus");
        }
        Ok(())
    }
}
