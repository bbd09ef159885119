// SPDX-License-Identifier: MIT OR Apache-2.0
//! Layers: typed keyframe channels of a timeline.
//!
//! A [`Layer`] owns an ordered map of frame number to [`Frame`]. Every layer
//! type shares the same capability set (keying, range edits, compaction,
//! evaluation at the playhead, animation output). Differences between types
//! are data carried by [`LayerKind`]: the persisted tag, default bones, the
//! transform layout of those bones and whether the type takes part in song
//! export.

use crate::bone::Bone;
use crate::frame::Frame;
use crate::host::{AnimationClip, BoneCurve, CurveKey, DcmSong, HostAdapter, HostError, SongEntry};
use crate::transform::{Interpolation, InterpolationMode, TransformData, TransformKind};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

/// Motion layer bones, root first
const MOTION_BONES: &[&str] = &[
    "Bip01",
    "Bip01 Pelvis",
    "Bip01 Spine",
    "Bip01 Spine1",
    "Bip01 Neck",
    "Bip01 Head",
    "Bip01 L Clavicle",
    "Bip01 R Clavicle",
    "Bip01 L UpperArm",
    "Bip01 R UpperArm",
    "Bip01 L Forearm",
    "Bip01 R Forearm",
    "Bip01 L Hand",
    "Bip01 R Hand",
    "Bip01 L Thigh",
    "Bip01 R Thigh",
    "Bip01 L Calf",
    "Bip01 R Calf",
    "Bip01 L Foot",
    "Bip01 R Foot",
];

/// Closed set of layer types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerKind {
    /// Character body motion, one layer per character slot
    Motion,
    /// Eye direction, one layer per character slot
    Eyes,
    /// Scene camera
    Camera,
    /// Scene light
    Light,
    /// Post-processing parameters
    PostEffect,
    /// Background color
    BgColor,
}

impl LayerKind {
    /// Every layer kind, in registry order
    pub const ALL: [LayerKind; 6] = [
        Self::Motion,
        Self::Eyes,
        Self::Camera,
        Self::Light,
        Self::PostEffect,
        Self::BgColor,
    ];

    /// Stable tag used in timeline files and clipboard bundles
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Motion => "MotionTimelineLayer",
            Self::Eyes => "EyesTimelineLayer",
            Self::Camera => "CameraTimelineLayer",
            Self::Light => "LightTimelineLayer",
            Self::PostEffect => "PostEffectTimelineLayer",
            Self::BgColor => "BgColorTimelineLayer",
        }
    }

    /// Resolve a persisted tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Get the display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Motion => "Motion",
            Self::Eyes => "Eyes",
            Self::Camera => "Camera",
            Self::Light => "Light",
            Self::PostEffect => "Post Effect",
            Self::BgColor => "Background Color",
        }
    }

    /// Suffix appended to the animation name when exporting this kind
    pub fn file_suffix(&self) -> Option<&'static str> {
        match self {
            Self::Motion => None,
            Self::Eyes => Some("eyes"),
            Self::Camera => Some("camera"),
            Self::Light => Some("light"),
            Self::PostEffect => Some("post_effect"),
            Self::BgColor => Some("bg_color"),
        }
    }

    /// Layers are ordered by ascending priority inside a document
    pub fn priority(&self) -> u32 {
        match self {
            Self::Motion => 0,
            Self::Eyes => 1,
            Self::Camera => 10,
            Self::Light => 20,
            Self::PostEffect => 30,
            Self::BgColor => 40,
        }
    }

    /// Whether one layer exists per character slot
    pub fn is_per_slot(&self) -> bool {
        matches!(self, Self::Motion | Self::Eyes)
    }

    /// Whether the layer contributes an entry to song export
    pub fn supports_dcm(&self) -> bool {
        matches!(self, Self::Motion | Self::Camera)
    }

    /// Bones keyed by "add key frame all"
    pub fn default_bone_names(&self) -> &'static [&'static str] {
        match self {
            Self::Motion => MOTION_BONES,
            Self::Eyes => &["Eye_L", "Eye_R"],
            Self::Camera => &["Camera"],
            Self::Light => &["Light"],
            Self::PostEffect => &["PostEffect"],
            Self::BgColor => &["BgColor"],
        }
    }

    /// Rest value for a bone of this layer
    pub fn default_transform(&self, bone_name: &str) -> TransformData {
        match self {
            Self::Motion if bone_name == "Bip01" => {
                TransformData::root([0.0, 0.0, 0.0], Interpolation::IDENTITY)
            }
            Self::Motion | Self::Eyes => TransformData::new(TransformKind::Rotation),
            Self::Camera => TransformData {
                values: vec![35.0],
                ..TransformData::root([0.0, 1.0, -3.0], Interpolation::IDENTITY)
            },
            Self::Light => TransformData::values(vec![1.0, 1.0, 1.0, 1.0]),
            Self::PostEffect => TransformData::values(vec![0.0, 0.0, 0.0]),
            Self::BgColor => TransformData::values(vec![0.0, 0.0, 0.0]),
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Identity of a layer inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerKey {
    /// Layer type
    pub kind: LayerKind,
    /// Character slot (always 0 for scene-wide kinds)
    pub slot_no: u32,
}

impl LayerKey {
    /// Create a new layer key
    pub fn new(kind: LayerKind, slot_no: u32) -> Self {
        let slot_no = if kind.is_per_slot() { slot_no } else { 0 };
        Self { kind, slot_no }
    }

    /// The default motion layer every document carries
    pub fn default_motion() -> Self {
        Self::new(LayerKind::Motion, 0)
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_per_slot() {
            write!(f, "{}[{}]", self.kind.display_name(), self.slot_no)
        } else {
            f.write_str(self.kind.display_name())
        }
    }
}

/// Document values needed to build animations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSettings {
    /// Frames per second
    pub frame_rate: f32,
    /// Length in frames
    pub max_frame_no: u32,
    /// Whether the clip loops
    pub is_loop: bool,
}

/// A typed keyframe channel
#[derive(Debug, Clone)]
pub struct Layer {
    key: LayerKey,
    frames: BTreeMap<u32, Frame>,
    /// Bone name to ascending key frame numbers, in first-seen order
    rows: IndexMap<String, Vec<u32>>,
    rows_dirty: bool,
    /// Pose on the host is stale
    pose_dirty: bool,
}

impl Layer {
    /// Create an empty layer
    pub fn new(kind: LayerKind, slot_no: u32) -> Self {
        Self {
            key: LayerKey::new(kind, slot_no),
            frames: BTreeMap::new(),
            rows: IndexMap::new(),
            rows_dirty: false,
            pose_dirty: true,
        }
    }

    /// Layer identity
    pub fn key(&self) -> LayerKey {
        self.key
    }

    /// Layer type
    pub fn kind(&self) -> LayerKind {
        self.key.kind
    }

    /// Character slot
    pub fn slot_no(&self) -> u32 {
        self.key.slot_no
    }

    /// Persisted tag
    pub fn tag(&self) -> &'static str {
        self.key.kind.tag()
    }

    /// Rebuild derived caches. Called after the layer is created, loaded or restored.
    pub fn init(&mut self) {
        self.rebuild_rows();
        self.pose_dirty = true;
    }

    fn touch(&mut self) {
        self.rows_dirty = true;
        self.pose_dirty = true;
    }

    fn rebuild_rows(&mut self) {
        self.rows.clear();
        for frame in self.frames.values() {
            for name in frame.bone_names() {
                self.rows
                    .entry(name.to_string())
                    .or_default()
                    .push(frame.frame_no);
            }
        }
        self.rows_dirty = false;
    }

    fn ensure_rows(&mut self) {
        if self.rows_dirty {
            self.rebuild_rows();
        }
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Iterate frames in ascending frame order
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.values()
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Whether the layer has no keys
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Get a frame
    pub fn frame(&self, frame_no: u32) -> Option<&Frame> {
        self.frames.get(&frame_no)
    }

    /// Get a frame for editing. Row caches are rebuilt on next use.
    pub fn frame_mut(&mut self, frame_no: u32) -> Option<&mut Frame> {
        if self.frames.contains_key(&frame_no) {
            self.touch();
        }
        self.frames.get_mut(&frame_no)
    }

    /// First frame
    pub fn first_frame(&self) -> Option<&Frame> {
        self.frames.values().next()
    }

    /// Create an empty frame, replacing any existing one
    pub fn create_frame(&mut self, frame_no: u32) -> &mut Frame {
        self.touch();
        match self.frames.entry(frame_no) {
            Entry::Occupied(entry) => {
                let frame = entry.into_mut();
                *frame = Frame::new(frame_no);
                frame
            }
            Entry::Vacant(entry) => entry.insert(Frame::new(frame_no)),
        }
    }

    /// Insert a copy of a template frame, replacing any existing one
    pub fn create_frame_from(&mut self, template: &Frame) {
        self.touch();
        self.frames.insert(template.frame_no, template.clone());
    }

    /// Get a frame, creating it if missing
    pub fn get_or_create_frame(&mut self, frame_no: u32) -> &mut Frame {
        self.touch();
        self.frames
            .entry(frame_no)
            .or_insert_with(|| Frame::new(frame_no))
    }

    /// Key a bone
    pub fn set_bone(&mut self, frame_no: u32, bone: Bone) {
        self.get_or_create_frame(frame_no).set_bone(bone);
    }

    /// Key several bones on one frame
    pub fn update_bones(&mut self, frame_no: u32, bones: impl IntoIterator<Item = Bone>) {
        let frame = self.get_or_create_frame(frame_no);
        for bone in bones {
            frame.set_bone(bone);
        }
    }

    /// Remove a key. The frame stays until [`Layer::clean_frames`].
    pub fn remove_bone(&mut self, frame_no: u32, name: &str) -> Option<Bone> {
        let removed = self.frames.get_mut(&frame_no)?.remove_bone(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Get a keyed bone
    pub fn bone(&self, frame_no: u32, name: &str) -> Option<&Bone> {
        self.frames.get(&frame_no)?.bone(name)
    }

    /// Drop frames without bones
    pub fn clean_frames(&mut self) {
        let before = self.frames.len();
        self.frames.retain(|_, frame| !frame.is_empty());
        if self.frames.len() != before {
            self.touch();
        }
    }

    /// Capture the given bones from the host into a frame
    pub fn capture_bones(
        &mut self,
        frame_no: u32,
        names: &[String],
        host: &dyn HostAdapter,
        interpolation: InterpolationMode,
    ) -> Result<(), HostError> {
        let bones = host.capture_pose(self.key, names)?;
        self.update_bones(
            frame_no,
            bones.into_iter().map(|mut bone| {
                bone.transform.interpolation = interpolation;
                bone
            }),
        );
        Ok(())
    }

    /// Capture every tracked bone from the host into a frame
    pub fn update_frame(
        &mut self,
        frame_no: u32,
        host: &dyn HostAdapter,
        interpolation: InterpolationMode,
    ) -> Result<(), HostError> {
        let names = self.tracked_bone_names();
        self.capture_bones(frame_no, &names, host, interpolation)
    }

    /// Bones at rest for the given names, as the host would report them
    pub fn rest_bones(&self, names: &[String]) -> Vec<Bone> {
        names
            .iter()
            .map(|name| Bone::new(name.clone(), self.kind().default_transform(name)))
            .collect()
    }

    /// Key any missing bones on frame 0
    pub fn add_first_bones(&mut self, bones: impl IntoIterator<Item = Bone>) {
        let frame = self.get_or_create_frame(0);
        for bone in bones {
            if !frame.has_bone(&bone.name) {
                frame.set_bone(bone);
            }
        }
    }

    /// Remove every key of the given bones and compact
    pub fn remove_all_bones(&mut self, names: &[String]) {
        for frame in self.frames.values_mut() {
            for name in names {
                frame.remove_bone(name);
            }
        }
        self.touch();
        self.clean_frames();
    }

    // ------------------------------------------------------------------
    // Range edits. Callers validate the range against the document.
    // ------------------------------------------------------------------

    /// Shift frames at or after `start` up by `len`
    pub fn insert_frames(&mut self, start: u32, len: u32) {
        let tail = self.frames.split_off(&start);
        for (frame_no, frame) in tail {
            let target = frame_no + len;
            self.frames.insert(target, frame.moved_to(target));
        }
        self.touch();
    }

    /// Shift frames after `end` up by the range length, then copy the range after itself
    pub fn duplicate_frames(&mut self, start: u32, end: u32) {
        let len = end - start + 1;
        let tail = self.frames.split_off(&(end + 1));
        let copies: Vec<Frame> = self
            .frames
            .range(start..=end)
            .map(|(&frame_no, frame)| frame.moved_to(frame_no + len))
            .collect();
        for frame in copies {
            self.frames.insert(frame.frame_no, frame);
        }
        for (frame_no, frame) in tail {
            let target = frame_no + len;
            self.frames.insert(target, frame.moved_to(target));
        }
        self.touch();
    }

    /// Remove frames in `[start, end]` and shift later frames down
    pub fn delete_frames(&mut self, start: u32, end: u32) {
        let len = end - start + 1;
        let tail = self.frames.split_off(&(end + 1));
        self.frames.split_off(&start);
        for (frame_no, frame) in tail {
            let target = frame_no - len;
            self.frames.insert(target, frame.moved_to(target));
        }
        self.touch();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Largest keyed frame number
    pub fn max_exist_frame_no(&self) -> Option<u32> {
        self.frames.keys().next_back().copied()
    }

    /// Bone name to ascending key frame numbers
    pub fn bone_rows(&mut self) -> &IndexMap<String, Vec<u32>> {
        self.ensure_rows();
        &self.rows
    }

    /// Names of every keyed bone, in first-seen order
    pub fn exist_bone_names(&mut self) -> Vec<String> {
        self.bone_rows().keys().cloned().collect()
    }

    /// Bones captured by a key-all: keyed bones plus the layer defaults
    pub fn tracked_bone_names(&mut self) -> Vec<String> {
        let mut names = self.exist_bone_names();
        for name in self.kind().default_bone_names() {
            if !names.iter().any(|n| n == name) {
                names.push((*name).to_string());
            }
        }
        names
    }

    /// Previous key of a bone, strictly before `frame_no`
    pub fn prev_bone_frame_no(&mut self, name: &str, frame_no: u32) -> Option<u32> {
        let row = self.bone_rows().get(name)?;
        let idx = row.partition_point(|&f| f < frame_no);
        idx.checked_sub(1).map(|i| row[i])
    }

    /// Next key of a bone, strictly after `frame_no`
    pub fn next_bone_frame_no(&mut self, name: &str, frame_no: u32) -> Option<u32> {
        let row = self.bone_rows().get(name)?;
        let idx = row.partition_point(|&f| f <= frame_no);
        row.get(idx).copied()
    }

    /// Closest frame strictly before `frame_no`
    pub fn prev_frame_no(&self, frame_no: u32) -> Option<u32> {
        self.frames.range(..frame_no).next_back().map(|(&no, _)| no)
    }

    /// Closest frame strictly after `frame_no`
    pub fn next_frame_no(&self, frame_no: u32) -> Option<u32> {
        self.frames
            .range(frame_no.saturating_add(1)..)
            .next()
            .map(|(&no, _)| no)
    }

    /// Frame at or before `frame_no`
    pub fn active_frame(&self, frame_no: u32) -> Option<&Frame> {
        self.frames.range(..=frame_no).next_back().map(|(_, f)| f)
    }

    // ------------------------------------------------------------------
    // Evaluation and output
    // ------------------------------------------------------------------

    /// Evaluate every keyed bone at a frame.
    ///
    /// Before the first key a bone holds its first value; after the last key
    /// it holds its last value.
    pub fn pose_at(&mut self, frame_no: u32) -> Vec<Bone> {
        self.ensure_rows();
        let mut pose = Vec::with_capacity(self.rows.len());
        for (name, row) in &self.rows {
            let idx = row.partition_point(|&f| f <= frame_no);
            let prev = idx.checked_sub(1).map(|i| row[i]);
            let next = row.get(idx).copied();

            let transform = match (prev, next) {
                (Some(p), Some(n)) => {
                    let a = self.frames.get(&p).and_then(|f| f.bone(name));
                    let b = self.frames.get(&n).and_then(|f| f.bone(name));
                    match (a, b) {
                        (Some(a), Some(b)) => {
                            let t = (frame_no - p) as f32 / (n - p) as f32;
                            a.transform.interpolate(&b.transform, t)
                        }
                        (Some(a), None) => a.transform.clone(),
                        (None, Some(b)) => b.transform.clone(),
                        (None, None) => continue,
                    }
                }
                (Some(only), None) | (None, Some(only)) => {
                    match self.frames.get(&only).and_then(|f| f.bone(name)) {
                        Some(bone) => bone.transform.clone(),
                        None => continue,
                    }
                }
                (None, None) => continue,
            };
            pose.push(Bone::new(name.clone(), transform));
        }
        pose
    }

    /// Push the evaluated pose at `frame_no` to the host
    pub fn apply_current_frame(
        &mut self,
        frame_no: u32,
        motion_update: bool,
        host: &mut dyn HostAdapter,
    ) -> Result<(), HostError> {
        if !host.has_target(self.key) {
            return Ok(());
        }
        let pose = self.pose_at(frame_no);
        host.apply_pose(self.key, &pose, motion_update)?;
        self.pose_dirty = false;
        Ok(())
    }

    /// Per-tick hook run before history capture
    pub fn update(&mut self) {
        self.ensure_rows();
    }

    /// Per-tick hook run after everything else; flushes a stale pose
    pub fn late_update(&mut self, frame_no: u32, host: &mut dyn HostAdapter) -> Result<(), HostError> {
        if self.pose_dirty && !host.is_anm_playing() {
            self.apply_current_frame(frame_no, false, host)?;
        }
        Ok(())
    }

    /// Build an animation from every bone row
    pub fn build_animation(&mut self, settings: ClipSettings) -> AnimationClip {
        self.ensure_rows();
        let curves = self
            .rows
            .iter()
            .map(|(name, row)| BoneCurve {
                name: name.clone(),
                keys: row
                    .iter()
                    .filter_map(|no| {
                        let bone = self.frames.get(no)?.bone(name)?;
                        Some(CurveKey {
                            frame_no: *no,
                            time: if settings.frame_rate > 0.0 {
                                *no as f32 / settings.frame_rate
                            } else {
                                0.0
                            },
                            transform: bone.transform.clone(),
                        })
                    })
                    .collect(),
            })
            .collect();

        AnimationClip {
            layer: self.key,
            frame_rate: settings.frame_rate,
            max_frame_no: settings.max_frame_no,
            is_loop: settings.is_loop,
            curves,
        }
    }

    /// Build the animation and load it into the host
    pub fn create_and_apply_anm(
        &mut self,
        settings: ClipSettings,
        host: &mut dyn HostAdapter,
    ) -> Result<(), HostError> {
        if !host.has_target(self.key) {
            return Ok(());
        }
        let clip = self.build_animation(settings);
        host.apply_animation(&clip)
    }

    /// Build the animation and export it under `file_name`
    pub fn output_anm(
        &mut self,
        file_name: &str,
        settings: ClipSettings,
        host: &mut dyn HostAdapter,
    ) -> Result<(), HostError> {
        let clip = self.build_animation(settings);
        host.export_animation(file_name, &clip)
    }

    /// Add this layer's song entry. Returns `false` when the type has none.
    pub fn output_dcm(&self, song: &mut DcmSong, file_name: &str) -> bool {
        if !self.kind().supports_dcm() {
            return false;
        }
        song.entries.push(SongEntry {
            layer: self.key,
            file_name: file_name.to_string(),
        });
        true
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.frames == other.frames
    }
}

/// On-disk form of a layer
#[derive(Serialize, Deserialize)]
#[serde(rename = "Layer")]
struct LayerRepr {
    class_name: String,
    slot_no: u32,
    frames: Vec<Frame>,
}

impl Serialize for Layer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LayerRepr {
            class_name: self.tag().to_string(),
            slot_no: self.slot_no(),
            frames: self.frames.values().cloned().collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Layer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = LayerRepr::deserialize(deserializer)?;
        let kind = LayerKind::from_tag(&repr.class_name)
            .ok_or_else(|| D::Error::custom(format!("unknown layer tag {}", repr.class_name)))?;
        let mut layer = Layer::new(kind, repr.slot_no);
        for frame in repr.frames {
            layer.frames.insert(frame.frame_no, frame);
        }
        layer.init();
        Ok(layer)
    }
}
