// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed per-face and per-loop attributes.
//!
//! The integer encodings returned by `as_int` are part of the persisted mesh
//! format and must stay stable.

use serde::{Deserialize, Serialize};

/// Category tag of a face, used downstream for materials and deferred
/// wall extrusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceTag {
    #[default]
    Wall,
    Glass,
    Trim,
    Door,
    Roof,
    Frame,
    /// Faces an external cleanup pass removes.
    Delete,
    /// Index into the journal's custom tag vocabulary.
    Custom(u32),
}

/// First integer code used for custom tags.
const CUSTOM_TAG_BASE: i32 = 100;

impl FaceTag {
    pub fn as_int(&self) -> i32 {
        match self {
            FaceTag::Wall => 0,
            FaceTag::Glass => 1,
            FaceTag::Trim => 2,
            FaceTag::Door => 3,
            FaceTag::Roof => 4,
            FaceTag::Frame => 5,
            FaceTag::Delete => 6,
            FaceTag::Custom(i) => CUSTOM_TAG_BASE + *i as i32,
        }
    }

    pub fn from_int(value: i32) -> Self {
        match value {
            1 => FaceTag::Glass,
            2 => FaceTag::Trim,
            3 => FaceTag::Door,
            4 => FaceTag::Roof,
            5 => FaceTag::Frame,
            6 => FaceTag::Delete,
            v if v >= CUSTOM_TAG_BASE => FaceTag::Custom((v - CUSTOM_TAG_BASE) as u32),
            _ => FaceTag::Wall,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FaceTag::Wall => "wall",
            FaceTag::Glass => "glass",
            FaceTag::Trim => "trim",
            FaceTag::Door => "door",
            FaceTag::Roof => "roof",
            FaceTag::Frame => "frame",
            FaceTag::Delete => "delete",
            FaceTag::Custom(_) => "custom",
        }
    }
}

/// Texture projection mode of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UvMode {
    #[default]
    Default,
    /// Box/planar projection in world space.
    Planar,
    /// Planar projection in the frame stored in `uv_origin`/`uv_rotate`,
    /// with the loop `uv_w` as depth.
    Oriented,
    /// Angle/radius projection around `uv_origin`.
    Polar,
}

impl UvMode {
    pub fn as_int(&self) -> i32 {
        match self {
            UvMode::Default => 0,
            UvMode::Planar => 1,
            UvMode::Oriented => 2,
            UvMode::Polar => 3,
        }
    }

    pub fn from_int(value: i32) -> Self {
        match value {
            1 => UvMode::Planar,
            2 => UvMode::Oriented,
            3 => UvMode::Polar,
            _ => UvMode::Default,
        }
    }
}

/// Attributes stored on every face.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceAttrs {
    pub tag: FaceTag,
    /// Thickness for deferred wall extrusion; zero means none.
    pub thickness: f64,
    pub uv_mode: UvMode,
    pub uv_origin: [f64; 3],
    pub uv_rotate: [f64; 3],
}

impl FaceAttrs {
    pub fn tagged(tag: FaceTag) -> Self {
        Self {
            tag,
            ..Self::default()
        }
    }
}
