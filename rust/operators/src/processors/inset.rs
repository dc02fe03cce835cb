// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inset polygon: a new outline placed inside a control face.
//!
//! The outline is positioned and sized relative to the control face's
//! bounding box, then either floats on the face, is clipped against it, or
//! is bridged to the face boundary. An optional recess pushes the opening
//! back along the normal; arches with a thickness get a frame ring.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_8};

use archkit_geometry::contour::ensure_ccw;
use archkit_geometry::{
    bridge, bridge_by_number, bridge_by_number_open, generate_arch, ngon, normalize_curve,
    place_curve, super_curve, ArchKind, BridgeOptions, ClipOp, Frame, Point2, SmartPoly,
    SmartVec, Vector2,
};
use archkit_journal::SelectionInfo;
use nalgebra::Rotation2;
use serde::{Deserialize, Serialize};

use super::helpers::{control_faces, retire_faces, ring_at, ControlFace};
use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::registry::{MeshOperator, OperatorKind, OperatorParams};
use crate::style::{slot_attrs, SlotStyles};

pub const CENTER: &str = "Center";
pub const BRIDGE: &str = "Bridge";
pub const FRAME: &str = "Frame";
pub const SIDES: &str = "Sides";
pub const OUTER: &str = "Outer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchStyle {
    Flat,
    #[default]
    Round,
    Gothic,
    Oval,
    Tudor,
}

impl From<ArchStyle> for ArchKind {
    fn from(style: ArchStyle) -> Self {
        match style {
            ArchStyle::Flat => ArchKind::Flat,
            ArchStyle::Round => ArchKind::Round,
            ArchStyle::Gothic => ArchKind::Gothic,
            ArchStyle::Oval => ArchKind::Oval,
            ArchStyle::Tudor => ArchKind::Tudor,
        }
    }
}

fn square_rotation() -> f64 {
    FRAC_PI_4
}

fn arch_sides() -> usize {
    12
}

fn curve_points() -> usize {
    32
}

/// Outline of the inset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InsetShape {
    /// The control outline itself, scaled.
    SelfSimilar,
    Ngon {
        sides: usize,
        #[serde(default = "square_rotation")]
        rotation: f64,
    },
    Arch {
        #[serde(default)]
        kind: ArchStyle,
        #[serde(default = "arch_sides")]
        sides: usize,
        #[serde(default)]
        thickness: f64,
    },
    SuperCurve {
        #[serde(default = "curve_points")]
        points: usize,
        exponent: f64,
    },
    /// An imported closed curve, fitted into the inset box.
    Curve { points: Vec<[f64; 2]> },
    /// A named built-in curve.
    Catalog { name: String },
}

impl Default for InsetShape {
    fn default() -> Self {
        InsetShape::Ngon {
            sides: 4,
            rotation: FRAC_PI_4,
        }
    }
}

impl InsetShape {
    /// Whether both shapes produce outlines with the same point structure.
    fn same_outline(&self, other: &Self) -> bool {
        use InsetShape::*;
        match (self, other) {
            (SelfSimilar, SelfSimilar) => true,
            (Ngon { sides: a, .. }, Ngon { sides: b, .. }) => a == b,
            (
                Arch {
                    kind: ka,
                    sides: sa,
                    thickness: ta,
                },
                Arch {
                    kind: kb,
                    sides: sb,
                    thickness: tb,
                },
            ) => ka == kb && sa == sb && (*ta > 0.0) == (*tb > 0.0),
            (SuperCurve { points: a, .. }, SuperCurve { points: b, .. }) => a == b,
            (Curve { points: a }, Curve { points: b }) => a.len() == b.len(),
            (Catalog { name: a }, Catalog { name: b }) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsetJoin {
    /// Leave the control face and lay the inset on top of it.
    Float,
    /// Cut the inset out of the control face and keep both.
    ClipInside,
    /// Cut the inset out of the control face and keep only the rest.
    ClipOutside,
    /// Skin the gap between the control boundary and the inset.
    #[default]
    Bridge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsetParams {
    pub shape: InsetShape,
    /// Offset of the inset center from the bbox center, in bbox sizes.
    pub position: [f64; 2],
    /// Inset size as a fraction of the bbox.
    pub size: [f64; 2],
    /// Rotation about the inset center, radians.
    pub rotation: f64,
    pub join: InsetJoin,
    /// Recess depth along the inward normal; zero keeps the opening flush.
    pub depth: f64,
    pub insert_perimeter: Option<bool>,
    pub styles: SlotStyles,
}

impl Default for InsetParams {
    fn default() -> Self {
        Self {
            shape: InsetShape::default(),
            position: [0.0, 0.0],
            size: [0.5, 0.5],
            rotation: 0.0,
            join: InsetJoin::default(),
            depth: 0.0,
            insert_perimeter: None,
            styles: SlotStyles::new(),
        }
    }
}

impl OperatorParams for InsetParams {
    fn topology_changed(&self, old: &Self) -> bool {
        // Bridge and clip output depends on where the outline meets the
        // boundary, so placement is locked unless the inset floats.
        let joined = self.join != InsetJoin::Float;
        !self.shape.same_outline(&old.shape)
            || self.join != old.join
            || (self.depth > 0.0) != (old.depth > 0.0)
            || self.insert_perimeter != old.insert_perimeter
            || (joined
                && (self.position != old.position
                    || self.size != old.size
                    || self.rotation != old.rotation))
    }

    fn validate(&self) -> Result<()> {
        if self.size.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(Error::InvalidParameters(format!(
                "inset size must be positive, got {:?}",
                self.size
            )));
        }
        if self.depth < 0.0 {
            return Err(Error::InvalidParameters(format!(
                "recess depth must not be negative, got {}",
                self.depth
            )));
        }
        Ok(())
    }
}

/// The inset in the control frame.
struct Outline {
    /// Contour of the center face.
    opening: Vec<Point2<f64>>,
    /// Outer and inner arch polylines bounding the frame ring.
    ring: Option<(Vec<Point2<f64>>, Vec<Point2<f64>>)>,
    /// Contour the join connects to.
    boundary: Vec<Point2<f64>>,
}

impl Outline {
    fn closed(points: Vec<Point2<f64>>) -> Self {
        let points = ensure_ccw(&points);
        Self {
            opening: points.clone(),
            ring: None,
            boundary: points,
        }
    }

    fn rotate(&mut self, center: &Point2<f64>, angle: f64) {
        if angle == 0.0 {
            return;
        }
        let rot = Rotation2::new(angle);
        let turn = |pts: &mut Vec<Point2<f64>>| {
            for p in pts.iter_mut() {
                *p = center + rot * (*p - center);
            }
        };
        turn(&mut self.opening);
        turn(&mut self.boundary);
        if let Some((outer, inner)) = &mut self.ring {
            turn(outer);
            turn(inner);
        }
    }
}

fn catalog_curve(name: &str) -> Result<Vec<Point2<f64>>> {
    let curve = match name {
        "circle" => ngon(32, 0.5, 0.5, 0.0),
        "triangle" => ngon(3, 0.5, 0.5, FRAC_PI_2),
        "diamond" => ngon(4, 0.5, 0.5, 0.0),
        "hexagon" => ngon(6, 0.5, 0.5, 0.0),
        "octagon" => ngon(8, 0.5, 0.5, FRAC_PI_8),
        "squircle" => super_curve(32, 0.5, 0.5, 4.0),
        "star" => super_curve(40, 0.5, 0.5, 0.6),
        other => {
            return Err(Error::InvalidParameters(format!(
                "no catalog curve named {other:?}"
            )))
        }
    };
    Ok(curve?)
}

fn outline(
    shape: &InsetShape,
    control: &SmartPoly,
    center: &Point2<f64>,
    extent: &Vector2<f64>,
    scale: [f64; 2],
) -> Result<Outline> {
    let outline = match shape {
        InsetShape::SelfSimilar => {
            let pivot = control.bbox_center();
            let pts = control
                .points_2d()
                .iter()
                .map(|p| {
                    let d = p - pivot;
                    center + Vector2::new(d.x * scale[0], d.y * scale[1])
                })
                .collect();
            Outline::closed(pts)
        }
        InsetShape::Ngon { sides, rotation } => {
            Outline::closed(place_curve(&ngon(*sides, 0.5, 0.5, *rotation)?, center, extent))
        }
        InsetShape::SuperCurve { points, exponent } => Outline::closed(place_curve(
            &super_curve(*points, 0.5, 0.5, *exponent)?,
            center,
            extent,
        )),
        InsetShape::Curve { points } => {
            let raw: Vec<Point2<f64>> = points.iter().map(|p| Point2::new(p[0], p[1])).collect();
            Outline::closed(place_curve(&normalize_curve(&raw)?, center, extent))
        }
        InsetShape::Catalog { name } => {
            Outline::closed(place_curve(&catalog_curve(name)?, center, extent))
        }
        InsetShape::Arch {
            kind,
            sides,
            thickness,
        } => {
            let thickness = (*thickness > 0.0).then_some(*thickness);
            let profile = generate_arch((*kind).into(), extent.x, extent.y, *sides, thickness)?;
            // Springline at the bottom of the inset box.
            let base = Vector2::new(center.x, center.y - extent.y * 0.5);
            let lift = |pts: &[Point2<f64>]| -> Vec<Point2<f64>> {
                pts.iter().map(|p| p + base).collect()
            };
            let outer = lift(&profile.outer);
            match profile.inner {
                Some(inner) => {
                    let inner = lift(&inner);
                    let mut boundary = outer.clone();
                    if let (Some(&first), Some(&last)) = (inner.first(), inner.last()) {
                        boundary.push(last);
                        boundary.push(first);
                    }
                    Outline {
                        opening: inner.clone(),
                        ring: Some((outer, inner)),
                        boundary,
                    }
                }
                None => Outline::closed(outer),
            }
        }
    };
    if outline.opening.len() < 3 {
        return Err(Error::InvalidParameters("inset outline has fewer than 3 points".into()));
    }
    Ok(outline)
}

/// Clips `points` to the control face when `clip` is set.
fn pieces(
    points: Vec<SmartVec>,
    frame: &Frame,
    clip: Option<&SmartPoly>,
) -> Result<Vec<Vec<SmartVec>>> {
    let Some(control) = clip else {
        return Ok(vec![points]);
    };
    let mut poly = SmartPoly::with_frame_of(&[], frame);
    poly.points = points;
    poly.refresh();
    if poly.len() < 3 {
        return Ok(Vec::new());
    }
    Ok(poly
        .clip_with(control, ClipOp::Intersect)?
        .into_iter()
        .map(|p| p.points)
        .collect())
}

/// Inset polygon processor.
pub struct InsetPolygonProcessor;

impl InsetPolygonProcessor {
    fn inset(
        &self,
        ctx: &mut BuildContext<'_>,
        control: &ControlFace,
        params: &InsetParams,
    ) -> Result<()> {
        let poly = &control.poly;
        let frame = poly.frame;
        ctx.set_uv_frame(frame);
        let attrs = |slot: &str| slot_attrs(&params.styles, slot, control.attrs);

        let size = poly.bbox_size();
        let center = poly.bbox_center()
            + Vector2::new(params.position[0] * size.x, params.position[1] * size.y);
        let extent = Vector2::new(params.size[0] * size.x, params.size[1] * size.y);
        let mut outline = outline(&params.shape, poly, &center, &extent, params.size)?;
        outline.rotate(&center, params.rotation);
        let boundary = SmartPoly::with_frame_of(&outline.boundary, &frame);

        let clip = match params.join {
            InsetJoin::Float => None,
            InsetJoin::Bridge => {
                retire_faces(ctx, &control.faces)?;
                let opts = BridgeOptions {
                    insert_perimeter: params.insert_perimeter.unwrap_or(ctx.insert_perimeter()),
                    allow_by_number: true,
                };
                for face in bridge(poly, &boundary, &opts)? {
                    ctx.face(&face, BRIDGE, attrs(BRIDGE))?;
                }
                None
            }
            InsetJoin::ClipInside | InsetJoin::ClipOutside => {
                retire_faces(ctx, &control.faces)?;
                for piece in poly.clip_with(&boundary, ClipOp::Difference)? {
                    ctx.face(&piece.points, OUTER, attrs(OUTER))?;
                }
                Some(poly)
            }
        };
        if params.join == InsetJoin::ClipOutside {
            return Ok(());
        }

        if let Some((outer, inner)) = &outline.ring {
            let (outer, inner) = (ring_at(&frame, outer, 0.0), ring_at(&frame, inner, 0.0));
            for quad in bridge_by_number_open(&outer, &inner)? {
                for piece in pieces(quad, &frame, clip)? {
                    ctx.face(&piece, FRAME, attrs(FRAME))?;
                }
            }
        }

        for front in pieces(ring_at(&frame, &outline.opening, 0.0), &frame, clip)? {
            if params.depth > 0.0 {
                let back: Vec<SmartVec> = front
                    .iter()
                    .map(|p| SmartVec::new(p.co - frame.normal * params.depth))
                    .collect();
                for side in bridge_by_number(&front, &back, 0, false)? {
                    ctx.face(&side, SIDES, attrs(SIDES))?;
                }
                ctx.face(&back, CENTER, attrs(CENTER))?;
            } else {
                ctx.face(&front, CENTER, attrs(CENTER))?;
            }
        }
        Ok(())
    }
}

impl MeshOperator for InsetPolygonProcessor {
    type Params = InsetParams;

    fn kind(&self) -> OperatorKind {
        OperatorKind::InsetPolygon
    }

    fn operate(
        &self,
        ctx: &mut BuildContext<'_>,
        selection: &SelectionInfo,
        params: &InsetParams,
    ) -> Result<()> {
        for slot in [CENTER, BRIDGE, FRAME, SIDES, OUTER] {
            ctx.declare_slot(slot);
        }
        for control in control_faces(ctx, selection)? {
            self.inset(ctx, &control, params)?;
        }
        Ok(())
    }
}
