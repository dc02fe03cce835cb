// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operator processors.
//!
//! One processor per operator kind. Each reads its control faces from the
//! selection, builds into a [`BuildContext`](crate::context::BuildContext)
//! and names its output faces by slot so later operations can find them
//! again after a parameter change.

mod extrude;
mod grid;
mod helpers;
mod import;
mod inset;
mod louvers;
mod project;
mod roof;
mod solidify;
mod split;
mod sweep;

#[cfg(test)]
mod tests;

pub use extrude::{ExtrudeFancyParams, ExtrudeFancyProcessor};
pub use grid::{GridDivideParams, GridDivideProcessor};
pub use helpers::PlaneAxis;
pub use import::{ImportMeshParams, ImportMeshProcessor, ImportPattern, ImportSource};
pub use inset::{ArchStyle, InsetJoin, InsetParams, InsetPolygonProcessor, InsetShape};
pub use louvers::{MakeLouversParams, MakeLouversProcessor};
pub use project::{ProjectFaceParams, ProjectFaceProcessor};
pub use roof::{BuildRoofParams, BuildRoofProcessor};
pub use solidify::{SolidifyEdgesParams, SolidifyEdgesProcessor};
pub use split::{SplitCut, SplitFaceParams, SplitFaceProcessor};
pub use sweep::{ExtrudeSweepParams, ExtrudeSweepProcessor};
