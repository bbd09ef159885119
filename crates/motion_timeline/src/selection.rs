// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bone selection and the edits that operate on it.

use crate::bone::BoneRef;
use crate::document::TimelineDocument;
use crate::error::{Result, TimelineError};
use crate::frame::Frame;
use crate::layer::{Layer, LayerKey};
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet};

/// Ordered set of selected bones
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    bones: IndexSet<BoneRef>,
}

impl Selection {
    /// Create an empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle-select a group of bones.
    ///
    /// Without `is_multi_select` the group replaces the selection unless one
    /// of its bones is already selected, in which case nothing changes (so a
    /// drag can start from a selected bone). With `is_multi_select` the group
    /// is removed when any of it is selected and added otherwise.
    pub fn select_bones(&mut self, bones: &[BoneRef], is_multi_select: bool) {
        if bones.is_empty() {
            return;
        }
        let has_selected = bones.iter().any(|b| self.bones.contains(b));

        if is_multi_select {
            if has_selected {
                for bone in bones {
                    self.bones.shift_remove(bone);
                }
            } else {
                self.bones.extend(bones.iter().cloned());
            }
        } else if !has_selected {
            self.bones.clear();
            self.bones.extend(bones.iter().cloned());
        }
    }

    /// Clear the selection
    pub fn unselect_all(&mut self) {
        self.bones.clear();
    }

    /// Whether a bone is selected
    pub fn is_selected(&self, bone: &BoneRef) -> bool {
        self.bones.contains(bone)
    }

    /// Whether anything is selected
    pub fn has_selected(&self) -> bool {
        !self.bones.is_empty()
    }

    /// Number of selected bones
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Iterate in selection order
    pub fn iter(&self) -> impl Iterator<Item = &BoneRef> {
        self.bones.iter()
    }

    /// Select every bone of a layer
    pub fn select_all_frames(&mut self, layer: &Layer) {
        let all = Self::bones_in(layer, |_| true);
        self.bones.clear();
        self.bones.extend(all);
    }

    /// Select every bone keyed in `[start, end]`
    pub fn select_frames_range(&mut self, layer: &Layer, start: u32, end: u32, is_multi_select: bool) {
        let range = Self::bones_in(layer, |frame_no| (start..=end).contains(&frame_no));
        if !is_multi_select {
            self.bones.clear();
        }
        self.bones.extend(range);
    }

    /// Extend the selection to every bone on frames that hold a selected bone
    pub fn select_vertical_bones(&mut self, layer: &Layer) {
        let key = layer.key();
        let frames: BTreeSet<u32> = self
            .bones
            .iter()
            .filter(|b| b.layer == key)
            .map(|b| b.frame_no)
            .collect();
        let extra = Self::bones_in(layer, |frame_no| frames.contains(&frame_no));
        self.bones.extend(extra);
    }

    fn bones_in(layer: &Layer, include: impl Fn(u32) -> bool) -> Vec<BoneRef> {
        let key = layer.key();
        layer
            .frames()
            .filter(|f| include(f.frame_no))
            .flat_map(|f| f.bone_names().map(move |n| BoneRef::new(key, f.frame_no, n)))
            .collect()
    }

    /// Rewrite every reference; `None` drops it
    pub fn remap(&mut self, mut map: impl FnMut(&BoneRef) -> Option<BoneRef>) {
        self.bones = self.bones.iter().filter_map(&mut map).collect();
    }

    /// Drop references that no longer resolve in the document
    pub fn retain_existing(&mut self, doc: &TimelineDocument) {
        self.bones
            .retain(|b| doc.layer(b.layer).and_then(|l| l.bone(b.frame_no, &b.name)).is_some());
    }

    /// Drop references into other layers
    pub fn retain_layer(&mut self, key: LayerKey) {
        self.bones.retain(|b| b.layer == key);
    }

    /// Selected bones grouped into frames, in ascending frame order
    pub fn to_frames(&self, doc: &TimelineDocument, key: LayerKey) -> Vec<Frame> {
        let mut frames: BTreeMap<u32, Frame> = BTreeMap::new();
        let Some(layer) = doc.layer(key) else {
            return Vec::new();
        };
        for r in self.bones.iter().filter(|b| b.layer == key) {
            if let Some(bone) = layer.bone(r.frame_no, &r.name) {
                frames
                    .entry(r.frame_no)
                    .or_insert_with(|| Frame::new(r.frame_no))
                    .set_bone(bone.clone());
            }
        }
        frames.into_values().collect()
    }

    /// Move every selected bone by `delta` frames.
    ///
    /// Every bone is checked before anything moves: the destination must lie
    /// in `[0, max_frame_no]` and must not hold an unselected bone of the same
    /// name. Any failure leaves document and selection untouched.
    pub fn move_bones(&mut self, doc: &mut TimelineDocument, delta: i64) -> Result<()> {
        if self.bones.is_empty() {
            return Err(TimelineError::EmptySelection);
        }
        if delta == 0 {
            return Ok(());
        }

        let max_frame_no = i64::from(doc.max_frame_no());
        let mut moves = Vec::with_capacity(self.bones.len());
        for r in &self.bones {
            let blocked = |reason: String| TimelineError::MoveBlocked {
                bone: r.name.clone(),
                frame_no: r.frame_no,
                reason,
            };
            let layer = doc
                .layer(r.layer)
                .ok_or_else(|| TimelineError::LayerNotFound(r.layer.to_string()))?;
            if layer.bone(r.frame_no, &r.name).is_none() {
                return Err(blocked("bone no longer exists".to_string()));
            }

            let dest = i64::from(r.frame_no) + delta;
            if dest < 0 {
                return Err(blocked(format!("destination {dest} is before frame 0")));
            }
            if dest > max_frame_no {
                return Err(blocked(format!("destination {dest} is after frame {max_frame_no}")));
            }
            let dest = dest as u32;
            let occupant = r.with_frame(dest);
            if layer.bone(dest, &r.name).is_some() && !self.bones.contains(&occupant) {
                return Err(blocked(format!("frame {dest} already has this bone")));
            }
            moves.push((r.clone(), dest));
        }

        // Move the leading edge first so no bone lands on one still waiting to move.
        if delta < 0 {
            moves.sort_by_key(|(r, _)| r.frame_no);
        } else {
            moves.sort_by_key(|(r, _)| std::cmp::Reverse(r.frame_no));
        }

        let mut touched = BTreeSet::new();
        for (r, dest) in &moves {
            let Some(layer) = doc.layer_mut(r.layer) else {
                continue;
            };
            if let Some(bone) = layer.remove_bone(r.frame_no, &r.name) {
                layer.set_bone(*dest, bone);
            }
            touched.insert(r.layer);
        }
        for key in touched {
            if let Some(layer) = doc.layer_mut(key) {
                layer.clean_frames();
            }
        }

        let moved: BTreeMap<BoneRef, u32> = moves.into_iter().collect();
        self.remap(|r| Some(moved.get(r).map_or_else(|| r.clone(), |&dest| r.with_frame(dest))));
        Ok(())
    }

    /// Remove every selected bone from the document and clear the selection.
    /// Returns the number of bones removed.
    pub fn remove_from(&mut self, doc: &mut TimelineDocument) -> Result<usize> {
        if self.bones.is_empty() {
            return Err(TimelineError::EmptySelection);
        }
        let mut removed = 0;
        let mut touched = BTreeSet::new();
        for r in &self.bones {
            if let Some(layer) = doc.layer_mut(r.layer) {
                if layer.remove_bone(r.frame_no, &r.name).is_some() {
                    removed += 1;
                }
                touched.insert(r.layer);
            }
        }
        for key in touched {
            if let Some(layer) = doc.layer_mut(key) {
                layer.clean_frames();
            }
        }
        self.bones.clear();
        Ok(removed)
    }
}
