// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bones and the composite keys that address them.

use crate::layer::LayerKey;
use crate::transform::{mirror_bone_name, TransformData};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Named keyed value inside a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    /// Bone name, unique within its frame
    pub name: String,
    /// Keyed value
    pub transform: TransformData,
}

impl Bone {
    /// Create a new bone
    pub fn new(name: impl Into<String>, transform: TransformData) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }

    /// Left/right mirrored copy of this bone
    pub fn mirrored(&self) -> Self {
        Self {
            name: mirror_bone_name(&self.name),
            transform: self.transform.mirrored(),
        }
    }
}

/// Address of a bone inside a document.
///
/// Bones never hold pointers to their frame or layer. Anything that needs to
/// refer to a bone (selection, move commands) stores this key and resolves it
/// against the document when used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoneRef {
    /// Owning layer
    pub layer: LayerKey,
    /// Owning frame
    pub frame_no: u32,
    /// Bone name
    pub name: String,
}

impl BoneRef {
    /// Create a new bone reference
    pub fn new(layer: LayerKey, frame_no: u32, name: impl Into<String>) -> Self {
        Self {
            layer,
            frame_no,
            name: name.into(),
        }
    }

    /// Same bone on another frame
    pub fn with_frame(&self, frame_no: u32) -> Self {
        Self {
            layer: self.layer,
            frame_no,
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for BoneRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.layer, self.frame_no, self.name)
    }
}
