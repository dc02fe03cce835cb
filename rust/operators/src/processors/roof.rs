// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Build roof: a hipped roof over a footprint from its straight skeleton.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_6};

use archkit_geometry::{
    straight_skeleton, union_regions, Frame, Point2, Region, SmartPoly, SmartVec,
};
use archkit_journal::{SelectionInfo, SelectionMode};
use archkit_mesh::FaceAttrs;
use serde::{Deserialize, Serialize};

use super::helpers::control_faces;
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const ROOF: &str = "Roof";
pub const FASCIA: &str = "Fascia";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildRoofParams {
    /// Height of the eaves above the footprint.
    pub eave: f64,
    /// Roof slope, radians.
    pub pitch: f64,
    /// Height of the band below the eaves; zero for none.
    pub fascia: f64,
    pub styles: SlotStyles,
}

impl Default for BuildRoofParams {
    fn default() -> Self {
        Self {
            eave: 0.0,
            pitch: FRAC_PI_6,
            fascia: 0.0,
            styles: SlotStyles::new(),
        }
    }
}

impl OperatorParams for BuildRoofParams {
    fn topology_changed(&self, old: &Self) -> bool {
        (self.fascia > 0.0) != (old.fascia > 0.0)
    }

    fn validate(&self) -> Result<()> {
        if !(self.pitch > 0.0 && self.pitch < FRAC_PI_2) {
            return Err(Error::InvalidParameters(format!(
                "roof pitch must lie strictly between 0 and 90 degrees, got {} rad",
                self.pitch
            )));
        }
        if self.fascia < 0.0 {
            return Err(Error::InvalidParameters("fascia height must not be negative".into()));
        }
        Ok(())
    }
}

/// A footprint with holes in a frame, plus the face attributes to inherit.
struct Footprint {
    frame: Frame,
    region: Region,
    attrs: FaceAttrs,
}

fn footprints(ctx: &BuildContext<'_>, selection: &SelectionInfo) -> Result<Vec<Footprint>> {
    if selection.mode != SelectionMode::Region {
        return Ok(control_faces(ctx, selection)?
            .into_iter()
            .map(|control| {
                let mut outer = control.poly.points_2d();
                if control.poly.area < 0.0 {
                    outer.reverse();
                }
                Footprint {
                    frame: control.poly.frame,
                    region: Region {
                        outer,
                        holes: Vec::new(),
                    },
                    attrs: control.attrs,
                }
            })
            .collect());
    }

    let mut out = Vec::new();
    for group in selection.groups() {
        let mesh = ctx.mesh();
        let mut polys = Vec::with_capacity(group.len());
        let mut attrs = None;
        for id in group {
            let key = mesh.find_face(id).ok_or_else(|| {
                Error::TopologyInconsistency(format!("selected face {id} is not in the mesh"))
            })?;
            match SmartPoly::from_face(mesh, key) {
                Ok(poly) => {
                    attrs = attrs.or(mesh.face(key).map(|f| f.attrs));
                    polys.push(poly);
                }
                Err(e) => tracing::warn!(error = %e, "skipped unreadable footprint face"),
            }
        }
        let Some(attrs) = attrs else { continue };
        let (frame, regions) = union_regions(&polys)?;
        out.extend(regions.into_iter().map(|region| Footprint {
            frame,
            region,
            attrs,
        }));
    }
    if out.is_empty() {
        return Err(Error::NothingSelected);
    }
    Ok(out)
}

/// Build roof processor.
pub struct BuildRoofProcessor;

impl BuildRoofProcessor {
    fn fascia(
        &self,
        ctx: &mut BuildContext<'_>,
        footprint: &Footprint,
        params: &BuildRoofParams,
        attrs: FaceAttrs,
    ) -> Result<()> {
        let frame = &footprint.frame;
        let at = |p: &Point2<f64>, depth: f64| SmartVec::new(frame.make_3d_depth(p, depth));
        let (low, high) = (params.eave - params.fascia, params.eave);
        let rings = std::iter::once(&footprint.region.outer).chain(&footprint.region.holes);
        for ring in rings {
            let n = ring.len();
            for i in 0..n {
                let (a, b) = (ring[i], ring[(i + 1) % n]);
                let quad = [at(&a, low), at(&b, low), at(&b, high), at(&a, high)];
                ctx.face(&quad, FASCIA, attrs)?;
            }
        }
        Ok(())
    }
}

impl MeshOperator for BuildRoofProcessor {
    type Params = BuildRoofParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::BuildRoof
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &BuildRoofParams,
    ) -> Result<()> {
        ctx.declare_slot(ROOF);
        ctx.declare_slot(FASCIA);
        // Eaves on the footprint reuse its vertices.
        let footprint_verts: Vec<_> = selection
            .resolve_faces(ctx.mesh())?
            .into_iter()
            .filter_map(|fk| ctx.mesh().face_vertices(fk).map(|v| v.to_vec()))
            .flatten()
            .collect();
        ctx.share(&footprint_verts);

        let slope = params.pitch.tan();
        for footprint in footprints(ctx, selection)? {
            let frame = footprint.frame;
            ctx.set_uv_frame(frame);
            let skeleton = straight_skeleton(&footprint.region.outer, &footprint.region.holes)?;
            let roof_attrs = slot_attrs(&params.styles, ROOF, footprint.attrs);
            for face in &skeleton.faces {
                let points: Vec<SmartVec> = face
                    .nodes
                    .iter()
                    .map(|n| {
                        let depth = params.eave + n.time * slope;
                        let mut v = SmartVec::new(frame.make_3d_depth(&n.point, depth));
                        v.co2 = n.point;
                        v
                    })
                    .collect();
                ctx.face(&points, ROOF, roof_attrs)?;
            }
            if params.fascia > 0.0 {
                let attrs = slot_attrs(&params.styles, FASCIA, footprint.attrs);
                self.fascia(ctx, &footprint, params, attrs)?;
            }
        }
        Ok(())
    }
}
