// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-slot face styles carried in operator parameters.

use std::collections::BTreeMap;

use archkit_mesh::{FaceAttrs, FaceTag, UvMode};
use serde::{Deserialize, Serialize};

/// Attributes an operator writes on the faces of one output slot.
///
/// Unset fields inherit from the control face the output was built from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceStyle {
    pub tag: Option<FaceTag>,
    pub thickness: Option<f64>,
    pub uv_mode: Option<UvMode>,
}

impl FaceStyle {
    pub fn tagged(tag: FaceTag) -> Self {
        Self {
            tag: Some(tag),
            ..Self::default()
        }
    }

    /// `base` with this style's fields applied. UV placement is reset; the
    /// build context fills it for the new face.
    pub fn apply(&self, base: FaceAttrs) -> FaceAttrs {
        FaceAttrs {
            tag: self.tag.unwrap_or(base.tag),
            thickness: self.thickness.unwrap_or(base.thickness),
            uv_mode: self.uv_mode.unwrap_or(base.uv_mode),
            uv_origin: [0.0; 3],
            uv_rotate: [0.0; 3],
        }
    }
}

/// Styles keyed by slot name.
pub type SlotStyles = BTreeMap<String, FaceStyle>;

/// Attributes for faces of `slot`, inheriting from `base`.
pub fn slot_attrs(styles: &SlotStyles, slot: &str, base: FaceAttrs) -> FaceAttrs {
    styles
        .get(slot)
        .copied()
        .unwrap_or_default()
        .apply(base)
}
