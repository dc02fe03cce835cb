// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ArchKit Geometry
//!
//! Planar polygon toolkit for parametric building elements. A [`SmartPoly`]
//! is a loop of [`SmartVec`] points with a local 2D frame; points remember
//! the mesh vertex (or mesh edge) they came from so operators can rebuild
//! topology without duplicating vertices.
//!
//! Boolean operations go through i_overlay, triangulation through earcutr,
//! and all linear algebra through nalgebra.

pub mod arch;
pub mod bridge;
pub mod clip;
pub mod contour;
pub mod curves;
pub mod error;
pub mod poly;
pub mod revolve;
pub mod skeleton;
pub mod split;
pub mod triangulation;
pub mod vec;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use arch::{generate_arch, ArchKind, ArchProfile};
pub use bridge::{bridge, bridge_by_number, bridge_by_number_open, BridgeOptions};
pub use clip::{overlay, region_polys, splice_holes, union_all, union_regions, ClipOp, Region};
pub use curves::{ngon, normalize_curve, place_curve, super_curve};
pub use error::{Error, Result};
pub use poly::{newell_normal, Frame, SmartPoly, UP};
pub use revolve::{generate_revolve, Revolution};
pub use skeleton::{straight_skeleton, Skeleton, SkeletonFace, SkeletonNode};
pub use split::Axis;
pub use triangulation::triangulate_with_holes;
pub use vec::{dedup_loop, SmartVec};
