// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host adapter: the engine-side collaborator that owns the live scene.
//!
//! The timeline never touches the scene directly. It pushes evaluated poses
//! and built animations through [`HostAdapter`] and reads back captured poses
//! and the playback position. [`HeadlessHost`] keeps everything in memory and
//! is what the command-line driver and the tests run against.

use crate::bone::Bone;
use crate::layer::LayerKey;
use crate::transform::TransformData;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors reported by a host adapter
#[derive(Debug, Error)]
pub enum HostError {
    /// Host has nothing to drive for this layer
    #[error("No target for layer {0}")]
    NoTarget(String),

    /// Host rejected the request
    #[error("Host request failed: {0}")]
    Failed(String),
}

/// Key of a single bone curve in a built animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Frame number of the key
    pub frame_no: u32,
    /// Time of the key in seconds
    pub time: f32,
    /// Keyed value
    pub transform: TransformData,
}

/// All keys of one bone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneCurve {
    /// Bone name
    pub name: String,
    /// Keys in ascending frame order
    pub keys: Vec<CurveKey>,
}

/// Animation built from one layer, ready to be played or exported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Source layer
    pub layer: LayerKey,
    /// Frames per second
    pub frame_rate: f32,
    /// Length in frames
    pub max_frame_no: u32,
    /// Whether the clip loops
    pub is_loop: bool,
    /// One curve per keyed bone
    pub curves: Vec<BoneCurve>,
}

impl AnimationClip {
    /// Length in seconds
    pub fn duration(&self) -> f32 {
        if self.frame_rate <= 0.0 {
            return 0.0;
        }
        self.max_frame_no as f32 / self.frame_rate
    }
}

/// Fade row of an exported song
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeRow {
    /// Fade-in flag (`false` fades out)
    pub fade_in: bool,
    /// Start of the fade in seconds
    pub start_time: f32,
    /// Fade length in seconds
    pub fade_time: f32,
}

/// One layer's contribution to an exported song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongEntry {
    /// Source layer
    pub layer: LayerKey,
    /// Animation file referenced by the entry
    pub file_name: String,
}

/// Song description handed to the host for export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DcmSong {
    /// Song name
    pub name: String,
    /// Total length in seconds
    pub end_time: f32,
    /// Fade rows
    pub fades: Vec<FadeRow>,
    /// Per-layer entries
    pub entries: Vec<SongEntry>,
}

/// Engine-side operations the timeline depends on
pub trait HostAdapter {
    /// Whether the host can currently be driven
    fn is_valid(&self) -> bool;

    /// Reason the host is invalid
    fn error_message(&self) -> String;

    /// Whether the user is dragging with the primary pointer
    fn is_pointer_down(&self) -> bool;

    /// Whether the scene has an object driven by this layer
    fn has_target(&self, layer: LayerKey) -> bool;

    /// Read the live pose of the given bones
    fn capture_pose(&self, layer: LayerKey, bone_names: &[String]) -> Result<Vec<Bone>, HostError>;

    /// Push an evaluated pose to the scene
    fn apply_pose(
        &mut self,
        layer: LayerKey,
        bones: &[Bone],
        motion_update: bool,
    ) -> Result<(), HostError>;

    /// Load a built animation into the scene
    fn apply_animation(&mut self, clip: &AnimationClip) -> Result<(), HostError>;

    /// Write a built animation to the host's animation store
    fn export_animation(&mut self, file_name: &str, clip: &AnimationClip) -> Result<(), HostError>;

    /// Write a song description
    fn export_song(&mut self, song: &DcmSong) -> Result<(), HostError>;

    /// Frame the host animation is currently showing
    fn playing_frame_no(&self) -> u32;

    /// Whether the host animation is advancing
    fn is_anm_playing(&self) -> bool;

    /// Move the host animation to a frame
    fn set_playing_frame_no(&mut self, frame_no: u32);

    /// Start or stop the host animation
    fn set_motion_playing(&mut self, playing: bool);

    /// Change the host playback speed
    fn set_anm_speed(&mut self, speed: f32);
}

/// In-memory host used by the headless driver and tests
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    /// Reported by `is_valid`
    pub valid: bool,
    /// Reported by `is_pointer_down`
    pub pointer_down: bool,
    /// Layers that have a target in the scene
    pub targets: BTreeSet<LayerKey>,
    /// Live pose per layer, returned by `capture_pose`
    pub live_pose: BTreeMap<LayerKey, IndexMap<String, TransformData>>,
    /// Last pose pushed per layer
    pub applied: BTreeMap<LayerKey, Vec<Bone>>,
    /// Number of `apply_pose` calls
    pub apply_count: usize,
    /// Layers whose `apply_pose` fails
    pub failing: BTreeSet<LayerKey>,
    /// Last animation loaded per layer
    pub animations: BTreeMap<LayerKey, AnimationClip>,
    /// Exported animations by file name
    pub exported: BTreeMap<String, AnimationClip>,
    /// Exported songs
    pub songs: Vec<DcmSong>,
    /// Current playback frame
    pub playing_frame_no: u32,
    /// Whether playback is running
    pub playing: bool,
    /// Playback speed
    pub anm_speed: f32,
}

impl HeadlessHost {
    /// Create a valid host with no targets
    pub fn new() -> Self {
        Self {
            valid: true,
            pointer_down: false,
            targets: BTreeSet::new(),
            live_pose: BTreeMap::new(),
            applied: BTreeMap::new(),
            apply_count: 0,
            failing: BTreeSet::new(),
            animations: BTreeMap::new(),
            exported: BTreeMap::new(),
            songs: Vec::new(),
            playing_frame_no: 0,
            playing: false,
            anm_speed: 1.0,
        }
    }

    /// Register a target for a layer
    pub fn with_target(mut self, layer: LayerKey) -> Self {
        self.targets.insert(layer);
        self
    }

    /// Set a bone of the live pose
    pub fn set_live_bone(&mut self, layer: LayerKey, name: impl Into<String>, transform: TransformData) {
        self.live_pose
            .entry(layer)
            .or_default()
            .insert(name.into(), transform);
    }

    /// Advance playback by whole frames, wrapping at `max_frame_no`
    pub fn advance(&mut self, frames: u32, max_frame_no: u32) {
        if !self.playing {
            return;
        }
        let step = (frames as f32 * self.anm_speed).round() as u32;
        let span = max_frame_no.saturating_add(1).max(1);
        self.playing_frame_no = (self.playing_frame_no + step) % span;
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostAdapter for HeadlessHost {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn error_message(&self) -> String {
        if self.valid {
            String::new()
        } else {
            "headless host disabled".to_string()
        }
    }

    fn is_pointer_down(&self) -> bool {
        self.pointer_down
    }

    fn has_target(&self, layer: LayerKey) -> bool {
        self.targets.contains(&layer)
    }

    fn capture_pose(&self, layer: LayerKey, bone_names: &[String]) -> Result<Vec<Bone>, HostError> {
        if !self.has_target(layer) {
            return Err(HostError::NoTarget(layer.to_string()));
        }
        let live = self.live_pose.get(&layer);
        let bones = bone_names
            .iter()
            .map(|name| {
                let transform = live
                    .and_then(|pose| pose.get(name))
                    .cloned()
                    .unwrap_or_else(|| layer.kind.default_transform(name));
                Bone::new(name.clone(), transform)
            })
            .collect();
        Ok(bones)
    }

    fn apply_pose(
        &mut self,
        layer: LayerKey,
        bones: &[Bone],
        _motion_update: bool,
    ) -> Result<(), HostError> {
        if self.failing.contains(&layer) {
            return Err(HostError::Failed(format!("pose rejected for {layer}")));
        }
        self.apply_count += 1;
        self.applied.insert(layer, bones.to_vec());
        Ok(())
    }

    fn apply_animation(&mut self, clip: &AnimationClip) -> Result<(), HostError> {
        if !self.has_target(clip.layer) {
            return Err(HostError::NoTarget(clip.layer.to_string()));
        }
        self.animations.insert(clip.layer, clip.clone());
        Ok(())
    }

    fn export_animation(&mut self, file_name: &str, clip: &AnimationClip) -> Result<(), HostError> {
        self.exported.insert(file_name.to_string(), clip.clone());
        Ok(())
    }

    fn export_song(&mut self, song: &DcmSong) -> Result<(), HostError> {
        self.songs.push(song.clone());
        Ok(())
    }

    fn playing_frame_no(&self) -> u32 {
        self.playing_frame_no
    }

    fn is_anm_playing(&self) -> bool {
        self.playing
    }

    fn set_playing_frame_no(&mut self, frame_no: u32) {
        self.playing_frame_no = frame_no;
    }

    fn set_motion_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    fn set_anm_speed(&mut self, speed: f32) {
        self.anm_speed = speed;
    }
}
