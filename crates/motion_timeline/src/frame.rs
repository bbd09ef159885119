// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframes: the bones keyed at one frame number of one layer.

use crate::bone::Bone;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// All bones keyed at one frame number of a layer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    /// Frame number
    pub frame_no: u32,
    bones: IndexMap<String, Bone>,
}

impl Frame {
    /// Create an empty frame
    pub fn new(frame_no: u32) -> Self {
        Self {
            frame_no,
            bones: IndexMap::new(),
        }
    }

    /// Create a frame from a list of bones
    pub fn with_bones(frame_no: u32, bones: impl IntoIterator<Item = Bone>) -> Self {
        let mut frame = Self::new(frame_no);
        for bone in bones {
            frame.set_bone(bone);
        }
        frame
    }

    /// Get a bone by name
    pub fn bone(&self, name: &str) -> Option<&Bone> {
        self.bones.get(name)
    }

    /// Get a mutable bone by name
    pub fn bone_mut(&mut self, name: &str) -> Option<&mut Bone> {
        self.bones.get_mut(name)
    }

    /// Check whether a bone is keyed here
    pub fn has_bone(&self, name: &str) -> bool {
        self.bones.contains_key(name)
    }

    /// Insert or replace a bone, keeping its position when replacing
    pub fn set_bone(&mut self, bone: Bone) {
        self.bones.insert(bone.name.clone(), bone);
    }

    /// Remove a bone, preserving the order of the rest
    pub fn remove_bone(&mut self, name: &str) -> Option<Bone> {
        self.bones.shift_remove(name)
    }

    /// Remove every bone
    pub fn clear_bones(&mut self) {
        self.bones.clear();
    }

    /// Iterate bones in insertion order
    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.values()
    }

    /// Iterate bone names in insertion order
    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.keys().map(String::as_str)
    }

    /// Number of bones
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// A frame without bones is dropped by compaction
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Copy of this frame at another frame number
    pub fn moved_to(&self, frame_no: u32) -> Self {
        Self {
            frame_no,
            bones: self.bones.clone(),
        }
    }

    /// Left/right mirrored copy of this frame
    pub fn mirrored(&self) -> Self {
        Self::with_bones(self.frame_no, self.bones().map(Bone::mirrored))
    }
}

/// On-disk form: bones are a plain ordered list
#[derive(Serialize, Deserialize)]
#[serde(rename = "Frame")]
struct FrameRepr {
    frame_no: u32,
    bones: Vec<Bone>,
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FrameRepr {
            frame_no: self.frame_no,
            bones: self.bones.values().cloned().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = FrameRepr::deserialize(deserializer)?;
        Ok(Frame::with_bones(repr.frame_no, repr.bones))
    }
}
