// SPDX-License-Identifier: MIT OR Apache-2.0
//! The timeline document: metadata, layers, tracks and the range algebra.
//!
//! All structural edits validate completely before touching any layer, so a
//! rejected request leaves the document exactly as it was.

use crate::config::EditorConfig;
use crate::error::{Result, TimelineError};
use crate::layer::{ClipSettings, Layer, LayerKey, LayerKind};
use crate::naming;
use crate::track::{Track, TrackId};
use serde::{Deserialize, Serialize};

/// Current timeline file format version
pub const TIMELINE_FORMAT_VERSION: u32 = 1;

/// Largest frame number a timeline can address
pub const MAX_FRAME_NO: u32 = 1_000_000;

/// Multi-layer keyframe document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    /// Format version
    pub version: u32,
    /// Animation name, also the file stem
    pub anm_name: String,
    /// Directory relative to the timeline base directory
    pub directory_name: String,
    max_frame_no: u32,
    /// Frames per second
    pub frame_rate: f32,
    /// Whether exported animations loop
    pub is_loop_anm: bool,
    /// Song lead-in in seconds
    pub start_offset_time: f32,
    /// Song tail in seconds
    pub end_offset_time: f32,
    /// Song fade-in length in seconds
    pub start_fade_time: f32,
    /// Song fade-out length in seconds
    pub end_fade_time: f32,
    layers: Vec<Layer>,
    tracks: Vec<Track>,
    active_track_index: Option<usize>,
}

impl TimelineDocument {
    /// Create an empty document carrying the default motion layer
    pub fn new(config: &EditorConfig) -> Self {
        let mut motion = Layer::new(LayerKind::Motion, 0);
        motion.init();
        Self {
            version: TIMELINE_FORMAT_VERSION,
            anm_name: config.default_anm_name.clone(),
            directory_name: String::new(),
            max_frame_no: config.default_max_frame_no.clamp(1, MAX_FRAME_NO),
            frame_rate: config.frame_rate,
            is_loop_anm: config.is_loop_anm,
            start_offset_time: config.start_offset_time,
            end_offset_time: config.end_offset_time,
            start_fade_time: config.start_fade_time,
            end_fade_time: config.end_fade_time,
            layers: vec![motion],
            tracks: Vec::new(),
            active_track_index: None,
        }
    }

    /// Rebuild every layer's derived caches
    pub fn init_layers(&mut self) {
        for layer in &mut self.layers {
            layer.init();
        }
    }

    // ------------------------------------------------------------------
    // Frame counts
    // ------------------------------------------------------------------

    /// Last frame number of the timeline
    pub fn max_frame_no(&self) -> u32 {
        self.max_frame_no
    }

    /// Number of frames including frame 0
    pub fn max_frame_count(&self) -> u32 {
        self.max_frame_no + 1
    }

    /// Seconds per frame
    pub fn frame_duration(&self) -> f32 {
        if self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            0.0
        }
    }

    /// Time of a frame in seconds
    pub fn frame_time_seconds(&self, frame_no: u32) -> f32 {
        frame_no as f32 * self.frame_duration()
    }

    /// Largest keyed frame over every layer
    pub fn max_exist_frame_no(&self) -> u32 {
        self.layers
            .iter()
            .filter_map(Layer::max_exist_frame_no)
            .max()
            .unwrap_or(0)
    }

    /// Set the max frame, never below the last key or 1 and never above [`MAX_FRAME_NO`]
    pub fn set_max_frame_no(&mut self, value: u32) {
        self.max_frame_no = value.min(MAX_FRAME_NO).max(self.max_exist_frame_no()).max(1);
        self.fit_tracks();
    }

    /// Max frame after growing by `len`, if it stays addressable
    fn grown_max_frame_no(&self, len: u32) -> Result<u32> {
        self.max_frame_no
            .checked_add(len)
            .filter(|&max| max <= MAX_FRAME_NO)
            .ok_or_else(|| TimelineError::InvalidData(format!("timeline cannot grow past frame {MAX_FRAME_NO}")))
    }

    /// Grow the max frame to cover every key
    pub fn adjust_max_frame_no(&mut self) {
        let needed = self.max_exist_frame_no();
        if needed > self.max_frame_no {
            self.max_frame_no = needed;
        }
    }

    /// Settings used when building animations
    pub fn clip_settings(&self) -> ClipSettings {
        ClipSettings {
            frame_rate: self.frame_rate,
            max_frame_no: self.max_frame_no,
            is_loop: self.is_loop_anm,
        }
    }

    /// Animation file name for a layer
    pub fn anm_file_name(&self, key: LayerKey) -> String {
        match key.kind.file_suffix() {
            Some(suffix) => naming::anm_file_name(&format!("{}_{suffix}", self.anm_name), key.slot_no),
            None => naming::anm_file_name(&self.anm_name, key.slot_no),
        }
    }

    // ------------------------------------------------------------------
    // Range algebra
    // ------------------------------------------------------------------

    /// Whether `[start, end]` addresses frames of this document
    pub fn is_valid_frame_range(&self, start: u32, end: u32) -> bool {
        !(start == 0 && end == 0) && end <= self.max_frame_no && start <= end
    }

    fn check_range(&self, start: u32, end: u32) -> Result<u32> {
        if !self.is_valid_frame_range(start, end) {
            return Err(TimelineError::InvalidFrameRange {
                start,
                end,
                max_frame_no: self.max_frame_no,
            });
        }
        Ok(end - start + 1)
    }

    /// Open `end - start + 1` empty frames at `start`
    pub fn insert_frames(&mut self, start: u32, end: u32) -> Result<()> {
        let len = self.check_range(start, end)?;
        let max_frame_no = self.grown_max_frame_no(len)?;
        for layer in &mut self.layers {
            layer.insert_frames(start, len);
        }
        self.max_frame_no = max_frame_no;
        Ok(())
    }

    /// Copy `[start, end]` right after itself
    pub fn duplicate_frames(&mut self, start: u32, end: u32) -> Result<()> {
        let len = self.check_range(start, end)?;
        let max_frame_no = self.grown_max_frame_no(len)?;
        for layer in &mut self.layers {
            layer.duplicate_frames(start, end);
        }
        self.max_frame_no = max_frame_no;
        Ok(())
    }

    /// Remove `[start, end]` and close the gap.
    ///
    /// At least two frames must remain after the frame at 0.
    pub fn delete_frames(&mut self, start: u32, end: u32) -> Result<()> {
        let len = self.check_range(start, end)?;
        if self.max_frame_no <= len + 1 {
            return Err(TimelineError::TooFewFrames);
        }
        for layer in &mut self.layers {
            layer.delete_frames(start, end);
        }
        self.max_frame_no -= len;
        self.fit_tracks();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    /// Layers in priority order
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Mutable layers in priority order
    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// Index of a layer
    pub fn layer_index(&self, key: LayerKey) -> Option<usize> {
        self.layers.iter().position(|l| l.key() == key)
    }

    /// Get a layer
    pub fn layer(&self, key: LayerKey) -> Option<&Layer> {
        self.layers.iter().find(|l| l.key() == key)
    }

    /// Get a mutable layer
    pub fn layer_mut(&mut self, key: LayerKey) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.key() == key)
    }

    /// Layers of one kind
    pub fn find_layers(&self, kind: LayerKind) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(move |l| l.kind() == kind)
    }

    /// Add a layer, keeping priority order. Returns its index.
    pub fn add_layer(&mut self, layer: Layer) -> usize {
        let key = layer.key();
        if let Some(idx) = self.layer_index(key) {
            self.layers[idx] = layer;
            return idx;
        }
        let idx = self
            .layers
            .partition_point(|l| (l.kind().priority(), l.slot_no()) <= (key.kind.priority(), key.slot_no));
        self.layers.insert(idx, layer);
        idx
    }

    /// Remove a layer. The default motion layer always stays.
    pub fn remove_layer(&mut self, key: LayerKey) -> Result<Layer> {
        if key == LayerKey::default_motion() {
            return Err(TimelineError::CannotRemoveLayer(key.to_string()));
        }
        let idx = self
            .layer_index(key)
            .ok_or_else(|| TimelineError::LayerNotFound(key.to_string()))?;
        Ok(self.layers.remove(idx))
    }

    // ------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------

    /// Tracks in display order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Index of a track
    pub fn track_index(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    /// Get a track
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Active track index
    pub fn active_track_index(&self) -> Option<usize> {
        self.active_track_index
    }

    /// Active track
    pub fn active_track(&self) -> Option<&Track> {
        self.active_track_index.and_then(|i| self.tracks.get(i))
    }

    /// Active track, only when usable
    pub fn valid_active_track(&self) -> Option<&Track> {
        self.active_track().filter(|t| self.is_valid_track(t))
    }

    /// Whether a track window fits this document
    pub fn is_valid_track(&self, track: &Track) -> bool {
        track.is_valid(self.max_frame_no)
    }

    /// Append a `Track{n}` spanning the whole timeline
    pub fn add_track(&mut self) -> Result<TrackId> {
        let name = naming::next_track_name(self.tracks.iter().map(|t| t.name.as_str()))
            .ok_or(TimelineError::TrackNamesExhausted)?;
        let track = Track::new(name, 0, self.max_frame_no);
        let id = track.id;
        self.tracks.push(track);
        Ok(id)
    }

    /// Activate a track by id, or deactivate with `is_active == false`
    pub fn set_active_track(&mut self, id: Option<TrackId>, is_active: bool) -> Result<()> {
        self.active_track_index = match id {
            Some(id) if is_active => Some(self.track_index(id).ok_or(TimelineError::TrackNotFound)?),
            _ => None,
        };
        Ok(())
    }

    fn active_track_id(&self) -> Option<TrackId> {
        self.active_track().map(|t| t.id)
    }

    /// Re-resolve the active index after the track list changed
    fn restore_active_track(&mut self, active: Option<TrackId>) {
        self.active_track_index = active.and_then(|id| self.track_index(id));
    }

    /// Remove a track. Removing the active track deactivates it.
    pub fn remove_track(&mut self, id: TrackId) -> Result<Track> {
        let active = self.active_track_id();
        let idx = self.track_index(id).ok_or(TimelineError::TrackNotFound)?;
        let removed = self.tracks.remove(idx);
        self.restore_active_track(active);
        Ok(removed)
    }

    /// Move a track one place towards the front. Returns `false` at the front.
    pub fn move_up_track(&mut self, id: TrackId) -> Result<bool> {
        let idx = self.track_index(id).ok_or(TimelineError::TrackNotFound)?;
        if idx == 0 {
            return Ok(false);
        }
        let active = self.active_track_id();
        self.tracks.swap(idx - 1, idx);
        self.restore_active_track(active);
        Ok(true)
    }

    /// Move a track one place towards the back. Returns `false` at the back.
    pub fn move_down_track(&mut self, id: TrackId) -> Result<bool> {
        let idx = self.track_index(id).ok_or(TimelineError::TrackNotFound)?;
        if idx + 1 >= self.tracks.len() {
            return Ok(false);
        }
        let active = self.active_track_id();
        self.tracks.swap(idx, idx + 1);
        self.restore_active_track(active);
        Ok(true)
    }

    /// Change a track window
    pub fn set_track_range(&mut self, id: TrackId, start_frame_no: u32, end_frame_no: u32) -> Result<()> {
        let idx = self.track_index(id).ok_or(TimelineError::TrackNotFound)?;
        let candidate = Track {
            start_frame_no,
            end_frame_no,
            ..self.tracks[idx].clone()
        };
        if !self.is_valid_track(&candidate) {
            return Err(TimelineError::InvalidFrameRange {
                start: start_frame_no,
                end: end_frame_no,
                max_frame_no: self.max_frame_no,
            });
        }
        self.tracks[idx] = candidate;
        Ok(())
    }

    /// Pull track windows back inside a shortened timeline
    fn fit_tracks(&mut self) {
        let max_frame_no = self.max_frame_no;
        for track in &mut self.tracks {
            track.end_frame_no = track.end_frame_no.min(max_frame_no);
            track.start_frame_no = track.start_frame_no.min(track.end_frame_no);
        }
    }

    /// Clamp a frame into the active track, or into the document
    pub fn clamp_frame_no(&self, frame_no: u32) -> u32 {
        match self.valid_active_track() {
            Some(track) => track.clamp(frame_no),
            None => frame_no.min(self.max_frame_no),
        }
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Checks run before exporting
    pub fn validate(&self) -> Result<()> {
        if self.anm_name.is_empty() {
            return Err(TimelineError::InvalidData("animation name is empty".to_string()));
        }
        naming::validate_file_name(&self.anm_name)?;
        naming::validate_dir_name(&self.directory_name)?;

        for layer in &self.layers {
            if let Some(first) = layer.first_frame() {
                if first.frame_no != 0 {
                    return Err(TimelineError::InvalidData(format!(
                        "layer {} has no key at frame 0",
                        layer.key()
                    )));
                }
            }
        }
        if self.layer(LayerKey::default_motion()).map_or(true, Layer::is_empty) {
            return Err(TimelineError::InvalidData("motion layer has no keys".to_string()));
        }

        if let Some(track) = self.active_track() {
            if !self.is_valid_track(track) {
                return Err(TimelineError::InvalidData(format!(
                    "track {} range {} - {} is invalid",
                    track.name, track.start_frame_no, track.end_frame_no
                )));
            }
        }
        Ok(())
    }

    /// Check structural invariants that every edit must keep
    pub fn check_invariants(&self) -> Result<()> {
        if self.max_frame_no < 1 {
            return Err(TimelineError::TooFewFrames);
        }
        if self.max_frame_no > MAX_FRAME_NO {
            return Err(TimelineError::InvalidData(format!(
                "max frame {} is beyond {MAX_FRAME_NO}",
                self.max_frame_no
            )));
        }
        for layer in &self.layers {
            if let Some(last) = layer.max_exist_frame_no() {
                if last > self.max_frame_no {
                    return Err(TimelineError::InvalidData(format!(
                        "layer {} has a key at {} beyond max frame {}",
                        layer.key(),
                        last,
                        self.max_frame_no
                    )));
                }
            }
        }
        for track in &self.tracks {
            if track.start_frame_no > track.end_frame_no || track.end_frame_no > self.max_frame_no {
                return Err(TimelineError::InvalidData(format!(
                    "track {} range {} - {} is outside 0 - {}",
                    track.name, track.start_frame_no, track.end_frame_no, self.max_frame_no
                )));
            }
        }
        if let Some(idx) = self.active_track_index {
            if idx >= self.tracks.len() {
                return Err(TimelineError::TrackNotFound);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::Bone;
    use crate::transform::TransformData;

    fn doc_with_key(frame_no: u32) -> TimelineDocument {
        let mut doc = TimelineDocument::new(&EditorConfig::default());
        let layer = doc.layer_mut(LayerKey::default_motion()).unwrap();
        layer.set_bone(0, Bone::new("Bip01", TransformData::default()));
        layer.set_bone(frame_no, Bone::new("Bip01", TransformData::default()));
        doc
    }

    fn motion_frames(doc: &TimelineDocument) -> Vec<u32> {
        doc.layer(LayerKey::default_motion())
            .unwrap()
            .frames()
            .map(|f| f.frame_no)
            .collect()
    }

    #[test]
    fn test_new_document_defaults() {
        let doc = TimelineDocument::new(&EditorConfig::default());
        assert_eq!(doc.max_frame_no(), 30);
        assert_eq!(doc.max_frame_count(), 31);
        assert_eq!(doc.layers().len(), 1);
        assert!(doc.active_track().is_none());
    }

    #[test]
    fn test_frame_range_validation() {
        let doc = doc_with_key(10);
        assert!(!doc.is_valid_frame_range(0, 0));
        assert!(!doc.is_valid_frame_range(6, 5));
        assert!(!doc.is_valid_frame_range(5, 31));
        assert!(doc.is_valid_frame_range(0, 1));
        assert!(doc.is_valid_frame_range(30, 30));
    }

    #[test]
    fn test_insert_frames_shifts_keys() {
        let mut doc = doc_with_key(10);
        doc.insert_frames(5, 9).unwrap();
        assert_eq!(doc.max_frame_no(), 35);
        assert_eq!(motion_frames(&doc), vec![0, 15]);
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_duplicate_frames() {
        let mut doc = doc_with_key(10);
        doc.duplicate_frames(10, 12).unwrap();
        assert_eq!(doc.max_frame_no(), 33);
        assert_eq!(motion_frames(&doc), vec![0, 10, 13]);
    }

    #[test]
    fn test_delete_frames() {
        let mut doc = doc_with_key(10);
        doc.delete_frames(3, 5).unwrap();
        assert_eq!(doc.max_frame_no(), 27);
        assert_eq!(motion_frames(&doc), vec![0, 7]);
    }

    #[test]
    fn test_delete_everything_rejected() {
        let mut doc = doc_with_key(10);
        let before = doc.clone();
        assert!(matches!(doc.delete_frames(1, 30), Err(TimelineError::TooFewFrames)));
        assert!(matches!(doc.delete_frames(0, 30), Err(TimelineError::TooFewFrames)));
        assert_eq!(doc, before);

        assert!(matches!(doc.delete_frames(2, 30), Err(TimelineError::TooFewFrames)));
        assert_eq!(doc, before);

        doc.delete_frames(3, 30).unwrap();
        assert_eq!(doc.max_frame_no(), 2);
        assert_eq!(motion_frames(&doc), vec![0]);
    }

    #[test]
    fn test_growth_stops_at_frame_limit() {
        let mut doc = doc_with_key(10);
        doc.set_max_frame_no(u32::MAX);
        assert_eq!(doc.max_frame_no(), MAX_FRAME_NO);
        assert_eq!(doc.max_frame_count(), MAX_FRAME_NO + 1);

        let before = doc.clone();
        assert!(matches!(doc.insert_frames(1, 1), Err(TimelineError::InvalidData(_))));
        assert!(matches!(doc.duplicate_frames(5, 10), Err(TimelineError::InvalidData(_))));
        assert_eq!(doc, before);

        doc.set_max_frame_no(MAX_FRAME_NO - 3);
        doc.insert_frames(1, 3).unwrap();
        assert_eq!(doc.max_frame_no(), MAX_FRAME_NO);
        assert_eq!(motion_frames(&doc), vec![0, 13]);
    }

    #[test]
    fn test_shrinking_pulls_tracks_inside() {
        let mut doc = doc_with_key(10);
        let id = doc.add_track().unwrap();
        doc.set_track_range(id, 20, 30).unwrap();

        doc.delete_frames(11, 25).unwrap();
        assert_eq!(doc.max_frame_no(), 15);
        let track = doc.track(id).unwrap();
        assert_eq!((track.start_frame_no, track.end_frame_no), (15, 15));
        doc.check_invariants().unwrap();

        doc.set_max_frame_no(12);
        let track = doc.track(id).unwrap();
        assert_eq!((track.start_frame_no, track.end_frame_no), (12, 12));
        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_invariants_reject_bad_tracks_and_lengths() {
        let doc = doc_with_key(10);

        let mut inverted = doc.clone();
        inverted.tracks.push(Track::new("Track1", 20, 5));
        assert!(matches!(inverted.check_invariants(), Err(TimelineError::InvalidData(_))));

        let mut beyond = doc.clone();
        beyond.tracks.push(Track::new("Track1", 0, 31));
        assert!(matches!(beyond.check_invariants(), Err(TimelineError::InvalidData(_))));

        let mut too_long = doc.clone();
        too_long.max_frame_no = u32::MAX;
        assert!(matches!(too_long.check_invariants(), Err(TimelineError::InvalidData(_))));

        doc.check_invariants().unwrap();
    }

    #[test]
    fn test_invalid_range_leaves_document() {
        let mut doc = doc_with_key(10);
        let before = doc.clone();
        assert!(doc.insert_frames(0, 0).is_err());
        assert!(doc.duplicate_frames(8, 40).is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_set_max_frame_no_clamps() {
        let mut doc = doc_with_key(10);
        doc.set_max_frame_no(4);
        assert_eq!(doc.max_frame_no(), 10);
        doc.set_max_frame_no(0);
        assert_eq!(doc.max_frame_no(), 10);
        doc.set_max_frame_no(60);
        assert_eq!(doc.max_frame_no(), 60);
    }

    #[test]
    fn test_track_reorder_keeps_active_identity() {
        let mut doc = doc_with_key(10);
        let a = doc.add_track().unwrap();
        let b = doc.add_track().unwrap();
        let c = doc.add_track().unwrap();
        assert_eq!(doc.track(b).map(|t| t.name.as_str()), Some("Track2"));

        doc.set_active_track(Some(b), true).unwrap();
        assert!(doc.move_up_track(b).unwrap());
        assert_eq!(doc.active_track().map(|t| t.id), Some(b));
        assert_eq!(doc.active_track_index(), Some(0));

        assert!(doc.move_down_track(a).unwrap());
        assert_eq!(doc.active_track().map(|t| t.id), Some(b));

        doc.remove_track(a).unwrap();
        assert_eq!(doc.active_track().map(|t| t.id), Some(b));

        doc.remove_track(b).unwrap();
        assert!(doc.active_track().is_none());
        assert_eq!(doc.tracks().len(), 1);
        assert_eq!(doc.tracks()[0].id, c);
    }

    #[test]
    fn test_move_track_at_edges() {
        let mut doc = doc_with_key(10);
        let a = doc.add_track().unwrap();
        let b = doc.add_track().unwrap();
        assert!(!doc.move_up_track(a).unwrap());
        assert!(!doc.move_down_track(b).unwrap());
    }

    #[test]
    fn test_clamp_frame_no_uses_active_track() {
        let mut doc = doc_with_key(10);
        assert_eq!(doc.clamp_frame_no(99), 30);
        let id = doc.add_track().unwrap();
        doc.set_track_range(id, 5, 20).unwrap();
        doc.set_active_track(Some(id), true).unwrap();
        assert_eq!(doc.clamp_frame_no(2), 5);
        assert_eq!(doc.clamp_frame_no(25), 20);
        assert!(doc.set_track_range(id, 5, 6).is_err());
    }

    #[test]
    fn test_add_layer_keeps_priority_order() {
        let mut doc = doc_with_key(10);
        doc.add_layer(Layer::new(LayerKind::BgColor, 0));
        doc.add_layer(Layer::new(LayerKind::Camera, 0));
        doc.add_layer(Layer::new(LayerKind::Motion, 1));
        let kinds: Vec<_> = doc.layers().iter().map(|l| (l.kind(), l.slot_no())).collect();
        assert_eq!(
            kinds,
            vec![
                (LayerKind::Motion, 0),
                (LayerKind::Motion, 1),
                (LayerKind::Camera, 0),
                (LayerKind::BgColor, 0),
            ]
        );
    }

    #[test]
    fn test_default_motion_layer_not_removable() {
        let mut doc = doc_with_key(10);
        assert!(doc.remove_layer(LayerKey::default_motion()).is_err());
        doc.add_layer(Layer::new(LayerKind::Camera, 0));
        assert!(doc.remove_layer(LayerKey::new(LayerKind::Camera, 0)).is_ok());
    }

    #[test]
    fn test_validate() {
        let mut doc = doc_with_key(10);
        doc.validate().unwrap();

        doc.anm_name.clear();
        assert!(doc.validate().is_err());

        let mut doc = doc_with_key(10);
        doc.layer_mut(LayerKey::default_motion())
            .unwrap()
            .remove_bone(0, "Bip01");
        doc.layer_mut(LayerKey::default_motion()).unwrap().clean_frames();
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_anm_file_names_do_not_collide() {
        let mut doc = doc_with_key(10);
        doc.anm_name = "dance".to_string();
        assert_eq!(doc.anm_file_name(LayerKey::default_motion()), "dance.anm");
        assert_eq!(doc.anm_file_name(LayerKey::new(LayerKind::Motion, 2)), "dance_2.anm");
        assert_eq!(doc.anm_file_name(LayerKey::new(LayerKind::Camera, 0)), "dance_camera.anm");
        assert_eq!(doc.anm_file_name(LayerKey::new(LayerKind::Eyes, 2)), "dance_eyes_2.anm");
    }
}
