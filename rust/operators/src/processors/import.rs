// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import mesh: lay copies of a small polygon set, or point instances of a
//! named source mesh, over a control face in an array or orbit pattern.

use std::f64::consts::TAU;

use archkit_geometry::{Frame, Point2, SmartVec, Vector2, Vector3};
use archkit_journal::SelectionInfo;
use nalgebra::{Rotation2, Rotation3};
use serde::{Deserialize, Serialize};

use super::helpers::control_faces;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const COPIES: &str = "Copies";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportSource {
    /// Polygons in local (x, y, normal) coordinates around the anchor.
    Polygons { polygons: Vec<Vec<[f64; 3]>> },
    /// A point instance of a mesh stored elsewhere.
    Instance { name: String },
}

impl Default for ImportSource {
    fn default() -> Self {
        ImportSource::Polygons {
            polygons: vec![vec![
                [-0.1, -0.1, 0.0],
                [0.1, -0.1, 0.0],
                [0.1, 0.1, 0.0],
                [-0.1, 0.1, 0.0],
            ]],
        }
    }
}

impl ImportSource {
    fn shape(&self) -> Option<Vec<usize>> {
        match self {
            ImportSource::Polygons { polygons } => Some(polygons.iter().map(Vec::len).collect()),
            ImportSource::Instance { .. } => None,
        }
    }
}

fn full_sweep() -> f64 {
    TAU
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportPattern {
    /// A centered grid of `count` copies spaced by `spacing`.
    Array { count: [usize; 2], spacing: [f64; 2] },
    /// `count` copies on a circle around the anchor.
    Orbit {
        count: usize,
        radius: f64,
        #[serde(default)]
        start_angle: f64,
        #[serde(default = "full_sweep")]
        sweep: f64,
        /// Turn each copy with its orbit angle.
        #[serde(default)]
        align: bool,
    },
}

impl Default for ImportPattern {
    fn default() -> Self {
        ImportPattern::Array {
            count: [1, 1],
            spacing: [1.0, 1.0],
        }
    }
}

impl ImportPattern {
    fn counts(&self) -> (u8, usize, usize) {
        match self {
            ImportPattern::Array { count, .. } => (0, count[0], count[1]),
            ImportPattern::Orbit { count, .. } => (1, *count, 1),
        }
    }

    /// Anchor offsets from the center and the extra turn of each copy.
    fn placements(&self) -> Vec<(Vector2<f64>, f64)> {
        match *self {
            ImportPattern::Array { count, spacing } => {
                let half = |n: usize| (n as f64 - 1.0) * 0.5;
                let mut out = Vec::with_capacity(count[0] * count[1]);
                for j in 0..count[1] {
                    for i in 0..count[0] {
                        let x = (i as f64 - half(count[0])) * spacing[0];
                        let y = (j as f64 - half(count[1])) * spacing[1];
                        out.push((Vector2::new(x, y), 0.0));
                    }
                }
                out
            }
            ImportPattern::Orbit {
                count,
                radius,
                start_angle,
                sweep,
                align,
            } => {
                let closed = (sweep.abs() - TAU).abs() < 1e-9;
                let divisions = if closed || count < 2 { count } else { count - 1 };
                (0..count)
                    .map(|k| {
                        let a = start_angle + sweep * k as f64 / divisions.max(1) as f64;
                        let turn = if align { a } else { 0.0 };
                        (Vector2::new(a.cos(), a.sin()) * radius, turn)
                    })
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportMeshParams {
    pub source: ImportSource,
    pub pattern: ImportPattern,
    pub scale: f64,
    /// Turn of every copy about the face normal, radians.
    pub rotation: f64,
    /// Pattern anchor from the bbox center, in (x, y, normal).
    pub offset: [f64; 3],
    pub styles: SlotStyles,
}

impl Default for ImportMeshParams {
    fn default() -> Self {
        Self {
            source: ImportSource::default(),
            pattern: ImportPattern::default(),
            scale: 1.0,
            rotation: 0.0,
            offset: [0.0, 0.0, 0.0],
            styles: SlotStyles::new(),
        }
    }
}

impl OperatorParams for ImportMeshParams {
    fn topology_changed(&self, old: &Self) -> bool {
        self.source.shape() != old.source.shape() || self.pattern.counts() != old.pattern.counts()
    }

    fn validate(&self) -> Result<()> {
        if self.scale <= 0.0 {
            return Err(Error::InvalidParameters(format!(
                "import scale must be positive, got {}",
                self.scale
            )));
        }
        let (_, a, b) = self.pattern.counts();
        if a == 0 || b == 0 || a * b > 10_000 {
            return Err(Error::InvalidParameters(format!(
                "import pattern of {a}x{b} copies is out of range"
            )));
        }
        match &self.source {
            ImportSource::Polygons { polygons } if polygons.iter().any(|p| p.len() < 3) => Err(
                Error::InvalidParameters("imported polygons need at least 3 points".into()),
            ),
            ImportSource::Instance { name } if name.is_empty() => {
                Err(Error::InvalidParameters("instance source needs a name".into()))
            }
            _ => Ok(()),
        }
    }
}

/// Euler angles of the frame basis turned by `turn` about its normal.
fn instance_rotation(frame: &Frame, turn: f64) -> [f64; 3] {
    let basis = Rotation3::from_basis_unchecked(&[frame.x_axis, frame.y_axis, frame.normal]);
    let spin = Rotation3::from_axis_angle(&Vector3::z_axis(), turn);
    let (roll, pitch, yaw) = (basis * spin).euler_angles();
    [roll, pitch, yaw]
}

/// Import mesh processor.
pub struct ImportMeshProcessor;

impl MeshOperator for ImportMeshProcessor {
    type Params = ImportMeshParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::ImportMesh
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &ImportMeshParams,
    ) -> Result<()> {
        ctx.declare_slot(COPIES);
        let placements = params.pattern.placements();
        for control in control_faces(ctx, selection)? {
            let frame = control.poly.frame;
            ctx.set_uv_frame(frame);
            let attrs = slot_attrs(&params.styles, COPIES, control.attrs);
            let anchor =
                control.poly.bbox_center() + Vector2::new(params.offset[0], params.offset[1]);

            for (shift, turn) in &placements {
                let at: Point2<f64> = anchor + shift;
                let turn = params.rotation + turn;
                match &params.source {
                    ImportSource::Polygons { polygons } => {
                        let rot = Rotation2::new(turn);
                        for polygon in polygons {
                            let points: Vec<SmartVec> = polygon
                                .iter()
                                .map(|p| {
                                    let q = at + rot * (Vector2::new(p[0], p[1]) * params.scale);
                                    let depth = params.offset[2] + p[2] * params.scale;
                                    SmartVec::new(frame.make_3d_depth(&q, depth))
                                })
                                .collect();
                            ctx.face(&points, COPIES, attrs)?;
                        }
                    }
                    ImportSource::Instance { name } => {
                        let position = frame.make_3d_depth(&at, params.offset[2]);
                        ctx.instance(name, position, instance_rotation(&frame, turn), params.scale);
                    }
                }
            }
        }
        if let ImportSource::Polygons { polygons } = &params.source {
            if ctx.slot_len(COPIES) % polygons.len().max(1) == 0 {
                ctx.set_modulus(COPIES, polygons.len().max(1));
            }
        }
        Ok(())
    }
}
