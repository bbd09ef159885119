// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editing session: one open document plus everything that acts on it.
//!
//! [`TimelineSession`] is the single entry point for editor commands. It owns
//! the document, selection, history, layer registry, event bus, clipboard and
//! the host adapter, and is driven once per frame by calling
//! [`TimelineSession::pre_update`], [`TimelineSession::update`] and
//! [`TimelineSession::late_update`] in that order.
//!
//! Commands validate before mutating and return `Err` on rejection; rejected
//! commands are also logged, which is how the user sees the message.
//! Successful edits call [`TimelineSession::request_history`]; the snapshot
//! is taken in `update` once no pointer drag is in progress, so a drag that
//! edits every frame produces a single history entry.

use crate::bone::{Bone, BoneRef};
use crate::clipboard::{Clipboard, ClipboardBundle};
use crate::config::EditorConfig;
use crate::document::TimelineDocument;
use crate::error::{Result, TimelineError};
use crate::events::{EventBus, EventCallback, SubscriptionId, TimelineEvent};
use crate::frame::Frame;
use crate::history::HistoryStack;
use crate::host::{DcmSong, FadeRow, HostAdapter};
use crate::layer::{Layer, LayerKey, LayerKind};
use crate::naming;
use crate::persist;
use crate::registry::LayerRegistry;
use crate::selection::Selection;
use crate::track::TrackId;
use std::path::PathBuf;

fn doc_mut(document: &mut Option<TimelineDocument>) -> Result<&mut TimelineDocument> {
    document.as_mut().ok_or(TimelineError::NoTimeline)
}

fn layer_mut(document: &mut Option<TimelineDocument>, index: usize) -> Result<&mut Layer> {
    doc_mut(document)?
        .layers_mut()
        .get_mut(index)
        .ok_or_else(|| TimelineError::LayerNotFound(format!("index {index}")))
}

/// Live bones from the host, or rest bones when the host has no target
fn capture_or_rest(host: &dyn HostAdapter, layer: &Layer, names: &[String]) -> Vec<Bone> {
    if host.has_target(layer.key()) {
        match host.capture_pose(layer.key(), names) {
            Ok(bones) => return bones,
            Err(e) => tracing::warn!("Capture for {} failed, using rest pose: {e}", layer.key()),
        }
    }
    layer.rest_bones(names)
}

/// Editing session over one timeline document
pub struct TimelineSession<H: HostAdapter> {
    config: EditorConfig,
    registry: LayerRegistry,
    host: H,
    clipboard: Box<dyn Clipboard>,
    events: EventBus,
    document: Option<TimelineDocument>,
    history: HistoryStack,
    selection: Selection,
    current_layer_index: usize,
    current_frame_no: u32,
    prev_playing_frame_no: u32,
    requested_history: Option<String>,
    anm_speed: f32,
}

impl<H: HostAdapter> TimelineSession<H> {
    /// Create a session with the standard layer registry
    pub fn new(config: EditorConfig, host: H, clipboard: Box<dyn Clipboard>) -> Self {
        Self::with_registry(config, LayerRegistry::standard(), host, clipboard)
    }

    /// Create a session with a custom layer registry
    pub fn with_registry(
        config: EditorConfig,
        registry: LayerRegistry,
        host: H,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        let history = HistoryStack::with_limit(config.history_limit);
        Self {
            config,
            registry,
            host,
            clipboard,
            events: EventBus::new(),
            document: None,
            history,
            selection: Selection::new(),
            current_layer_index: 0,
            current_frame_no: 0,
            prev_playing_frame_no: 0,
            requested_history: None,
            anm_speed: 1.0,
        }
    }

    /// Run a command, logging a rejection
    fn command<T>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(self);
        if let Err(e) = &result {
            match e {
                TimelineError::Parse(_)
                | TimelineError::Serialization(_)
                | TimelineError::Snapshot(_)
                | TimelineError::Io(_) => tracing::error!("{name} failed: {e}"),
                _ => tracing::warn!("{name}: {e}"),
            }
        }
        result
    }

    fn ensure_host(&self) -> Result<()> {
        if self.host.is_valid() {
            Ok(())
        } else {
            Err(TimelineError::HostUnavailable(self.host.error_message()))
        }
    }

    /// Document and host must both be usable before an edit
    fn edit_ready(&self) -> Result<()> {
        if self.document.is_none() {
            return Err(TimelineError::NoTimeline);
        }
        self.ensure_host()
    }

    fn publish(&self, event: TimelineEvent) {
        self.events.publish(&event);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Open document
    pub fn document(&self) -> Option<&TimelineDocument> {
        self.document.as_ref()
    }

    /// Editor configuration
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Layer registry
    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    /// Host adapter
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host adapter
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// History stack
    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    /// Current selection
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Playhead frame
    pub fn current_frame_no(&self) -> u32 {
        self.current_frame_no
    }

    /// Pending history description, if any
    pub fn requested_history(&self) -> Option<&str> {
        self.requested_history.as_deref()
    }

    /// Active layer
    pub fn current_layer(&self) -> Option<&Layer> {
        self.document.as_ref()?.layers().get(self.current_layer_index)
    }

    /// Active layer key
    pub fn current_layer_key(&self) -> Option<LayerKey> {
        self.current_layer().map(Layer::key)
    }

    /// Whether the host animation is running
    pub fn is_playing(&self) -> bool {
        self.host.is_anm_playing()
    }

    /// Playback speed multiplier
    pub fn anm_speed(&self) -> f32 {
        self.anm_speed
    }

    /// Subscribe to session events
    pub fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId {
        self.events.subscribe(callback)
    }

    /// Unsubscribe from session events
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Replace the open document with an empty one keyed at frame 0
    pub fn new_timeline(&mut self) -> Result<()> {
        self.command("New timeline", |s| {
            s.ensure_host()?;
            let mut document = TimelineDocument::new(&s.config);
            for layer in document.layers_mut() {
                let names: Vec<String> = layer
                    .kind()
                    .default_bone_names()
                    .iter()
                    .map(|n| (*n).to_string())
                    .collect();
                let bones = capture_or_rest(&s.host, layer, &names);
                layer.add_first_bones(bones);
            }
            s.install_document(document);
            s.history.clear();
            s.request_history("New timeline");
            tracing::info!("Created new timeline");
            Ok(())
        })
    }

    /// Load a timeline file from the configured timeline directory
    pub fn load_timeline(&mut self, anm_name: &str, dir_name: &str) -> Result<()> {
        self.command("Load timeline", |s| {
            s.ensure_host()?;
            let path = persist::timeline_path(&s.config.timeline_dir, dir_name, anm_name)?;
            let document = persist::load_document(&path)?;
            s.install_document(document);
            s.history.clear();
            s.request_history(format!("Load {anm_name}"));
            Ok(())
        })
    }

    /// Save the open document under the configured timeline directory
    pub fn save_timeline(&mut self) -> Result<PathBuf> {
        self.command("Save timeline", |s| {
            let document = s.document.as_ref().ok_or(TimelineError::NoTimeline)?;
            persist::save_document(document, &s.config.timeline_dir)
        })
    }

    /// Close the open document and drop its history
    pub fn clear_timeline(&mut self) {
        if self.document.take().is_some() {
            tracing::info!("Cleared timeline");
        }
        self.selection.unselect_all();
        self.history.clear();
        self.requested_history = None;
        self.current_layer_index = 0;
        self.current_frame_no = 0;
        self.publish(TimelineEvent::Refresh);
    }

    /// The host scene was replaced; nothing in the document is bound any more
    pub fn on_scene_changed(&mut self) {
        self.host.set_motion_playing(false);
        self.clear_timeline();
    }

    /// Drop every history entry
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Tear down: close the document and drop every subscriber
    pub fn shutdown(&mut self) {
        self.clear_timeline();
        self.events.clear();
    }

    /// Make `document` the open document and bring the host in line with it
    fn install_document(&mut self, mut document: TimelineDocument) {
        document.init_layers();
        if self.current_layer_index >= document.layers().len() {
            self.current_layer_index = 0;
        }
        self.current_frame_no = self.current_frame_no.min(document.max_frame_no());
        self.document = Some(document);
        self.selection.unselect_all();
        self.create_and_apply_anm_all();
        self.apply_current_frame_all(true);
        self.publish(TimelineEvent::Refresh);
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Follow the host playhead while its animation runs
    pub fn pre_update(&mut self) {
        if self.document.is_none() || !self.host.is_valid() || !self.host.is_anm_playing() {
            return;
        }
        let playing = self.host.playing_frame_no();
        if playing != self.prev_playing_frame_no {
            self.current_frame_no = playing;
        }
        self.prev_playing_frame_no = playing;

        let window = self
            .document
            .as_ref()
            .and_then(TimelineDocument::valid_active_track)
            .map(|t| (t.start_frame_no, t.end_frame_no));
        if let Some((start, end)) = window {
            if self.current_frame_no < start || self.current_frame_no >= end {
                self.set_playing_frame_no_all(start);
            }
        }
    }

    /// Loop playback, update layers, then record a pending history entry
    pub fn update(&mut self) {
        let Some(max_frame_no) = self.document.as_ref().map(TimelineDocument::max_frame_no) else {
            return;
        };
        if !self.host.is_valid() {
            return;
        }

        if self.host.is_anm_playing() && self.host.playing_frame_no() >= max_frame_no {
            self.set_playing_frame_no_all(0);
        }

        if let Some(document) = self.document.as_mut() {
            for layer in document.layers_mut() {
                layer.update();
            }
        }

        if self.requested_history.is_some() && !self.host.is_pointer_down() {
            if let (Some(description), Some(document)) =
                (self.requested_history.take(), self.document.as_ref())
            {
                if let Err(e) = self.history.add(document, &description) {
                    tracing::error!("Failed to record history {:?}: {e}", description);
                }
            }
        }
    }

    /// Run each layer's late hook; a failing layer does not stop the others
    pub fn late_update(&mut self) {
        let frame_no = self.current_frame_no;
        let Some(document) = self.document.as_mut() else {
            return;
        };
        for layer in document.layers_mut() {
            if let Err(e) = layer.late_update(frame_no, &mut self.host) {
                let error = TimelineError::Layer {
                    layer: layer.key().to_string(),
                    message: e.to_string(),
                };
                tracing::error!("{error}");
            }
        }
    }

    /// Run one full tick
    pub fn tick(&mut self) {
        self.pre_update();
        self.update();
        self.late_update();
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Ask for a snapshot at the end of this tick
    pub fn request_history(&mut self, description: impl Into<String>) {
        self.requested_history = Some(description.into());
    }

    /// Step back one history entry. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> Result<bool> {
        self.command("Undo", |s| {
            s.ensure_host()?;
            let restored = s.history.undo()?;
            Ok(s.restore_document(restored))
        })
    }

    /// Step forward one history entry. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> Result<bool> {
        self.command("Redo", |s| {
            s.ensure_host()?;
            let restored = s.history.redo()?;
            Ok(s.restore_document(restored))
        })
    }

    /// Jump to a history entry. Returns `false` for the current entry or an invalid index.
    pub fn restore_history(&mut self, index: usize) -> Result<bool> {
        self.command("Restore history", |s| {
            s.ensure_host()?;
            let restored = s.history.restore(index)?;
            Ok(s.restore_document(restored))
        })
    }

    fn restore_document(&mut self, restored: Option<TimelineDocument>) -> bool {
        let Some(document) = restored else {
            return false;
        };
        self.requested_history = None;
        self.install_document(document);
        true
    }

    // ------------------------------------------------------------------
    // Frame ranges
    // ------------------------------------------------------------------

    /// Push the evaluated pose of every layer to the host
    pub fn apply_current_frame_all(&mut self, motion_update: bool) {
        let frame_no = self.current_frame_no;
        let Some(document) = self.document.as_mut() else {
            return;
        };
        for layer in document.layers_mut() {
            if let Err(e) = layer.apply_current_frame(frame_no, motion_update, &mut self.host) {
                tracing::warn!("Failed to apply {} at frame {frame_no}: {e}", layer.key());
            }
        }
    }

    fn after_edit(&mut self, description: impl Into<String>) {
        if let Some(max) = self.document.as_ref().map(TimelineDocument::max_frame_no) {
            self.current_frame_no = self.current_frame_no.min(max);
        }
        self.apply_current_frame_all(true);
        self.publish(TimelineEvent::Refresh);
        self.request_history(description);
    }

    /// Open empty frames at `[start, end]`, shifting later keys right
    pub fn insert_frames(&mut self, start: u32, end: u32) -> Result<()> {
        self.command("Insert frames", |s| {
            s.edit_ready()?;
            doc_mut(&mut s.document)?.insert_frames(start, end)?;
            let len = end - start + 1;
            s.selection.remap(|r| {
                Some(if r.frame_no >= start {
                    r.with_frame(r.frame_no + len)
                } else {
                    r.clone()
                })
            });
            s.after_edit(format!("Insert frames: {start} - {end}"));
            Ok(())
        })
    }

    /// Copy `[start, end]` right after itself
    pub fn duplicate_frames(&mut self, start: u32, end: u32) -> Result<()> {
        self.command("Duplicate frames", |s| {
            s.edit_ready()?;
            doc_mut(&mut s.document)?.duplicate_frames(start, end)?;
            let len = end - start + 1;
            s.selection.remap(|r| {
                Some(if r.frame_no > end {
                    r.with_frame(r.frame_no + len)
                } else {
                    r.clone()
                })
            });
            s.after_edit(format!("Duplicate frames: {start} - {end}"));
            Ok(())
        })
    }

    /// Remove `[start, end]`, shifting later keys left
    pub fn delete_frames(&mut self, start: u32, end: u32) -> Result<()> {
        self.command("Delete frames", |s| {
            s.edit_ready()?;
            doc_mut(&mut s.document)?.delete_frames(start, end)?;
            s.selection.unselect_all();
            s.after_edit(format!("Delete frames: {start} - {end}"));
            Ok(())
        })
    }

    /// Change the timeline length; never shorter than the last key
    pub fn set_max_frame_no(&mut self, max_frame_no: u32) -> Result<()> {
        self.command("Set max frame", |s| {
            s.edit_ready()?;
            let document = doc_mut(&mut s.document)?;
            if document.max_frame_no() == max_frame_no {
                return Ok(());
            }
            document.set_max_frame_no(max_frame_no);
            let applied = document.max_frame_no();
            s.after_edit(format!("Max frame: {applied}"));
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Toggle-select bones of the active layer; see [`Selection::select_bones`].
    ///
    /// References into other layers are ignored.
    pub fn select_bones(&mut self, bones: &[BoneRef], is_multi_select: bool) {
        let Some(key) = self.current_layer_key() else {
            return;
        };
        let scoped: Vec<BoneRef> = bones.iter().filter(|b| b.layer == key).cloned().collect();
        if scoped.len() < bones.len() {
            tracing::debug!("Ignored {} bones outside layer {key}", bones.len() - scoped.len());
        }
        self.selection.retain_layer(key);
        self.selection.select_bones(&scoped, is_multi_select);
    }

    /// Clear the selection
    pub fn unselect_all(&mut self) {
        self.selection.unselect_all();
    }

    /// Select every key of the active layer
    pub fn select_all_frames(&mut self) -> Result<()> {
        self.command("Select all", |s| {
            let index = s.current_layer_index;
            let layer = layer_mut(&mut s.document, index)?;
            s.selection.select_all_frames(layer);
            Ok(())
        })
    }

    /// Select every key of the active layer inside `[start, end]`
    pub fn select_frames_range(&mut self, start: u32, end: u32, is_multi_select: bool) -> Result<()> {
        self.command("Select range", |s| {
            let index = s.current_layer_index;
            let layer = layer_mut(&mut s.document, index)?;
            s.selection.select_frames_range(layer, start, end, is_multi_select);
            Ok(())
        })
    }

    /// Extend the selection to whole frames
    pub fn select_vertical_bones(&mut self) -> Result<()> {
        self.command("Select vertical", |s| {
            let index = s.current_layer_index;
            let layer = layer_mut(&mut s.document, index)?;
            s.selection.select_vertical_bones(layer);
            Ok(())
        })
    }

    /// Move the selected keys by `delta` frames, all or nothing
    pub fn move_selected_bones(&mut self, delta: i64) -> Result<()> {
        self.command("Move keyframes", |s| {
            s.edit_ready()?;
            if delta == 0 {
                return Ok(());
            }
            if let Some(key) = s.current_layer_key() {
                s.selection.retain_layer(key);
            }
            let document = doc_mut(&mut s.document)?;
            s.selection.move_bones(document, delta)?;
            s.after_edit("Move keyframes");
            Ok(())
        })
    }

    /// Delete the selected keys
    pub fn remove_selected_frame(&mut self) -> Result<()> {
        self.command("Remove keyframes", |s| {
            s.edit_ready()?;
            if let Some(key) = s.current_layer_key() {
                s.selection.retain_layer(key);
            }
            let document = doc_mut(&mut s.document)?;
            let removed = s.selection.remove_from(document)?;
            tracing::debug!("Removed {removed} keys");
            s.after_edit("Remove keyframes");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Key every tracked bone of the active layer at the playhead from the host pose
    pub fn add_key_frame_all(&mut self) -> Result<()> {
        self.command("Add key frame", |s| {
            s.edit_ready()?;
            let frame_no = s.current_frame_no;
            let interpolation = s.config.default_interpolation;
            let index = s.current_layer_index;
            let layer = layer_mut(&mut s.document, index)?;
            layer.update_frame(frame_no, &s.host, interpolation)?;
            s.publish(TimelineEvent::EditPoseUpdated);
            s.after_edit("Add key frame");
            Ok(())
        })
    }

    /// Key the named bones of the active layer at the playhead from the host pose
    pub fn add_key_frames(&mut self, names: &[String]) -> Result<()> {
        self.command("Add key frames", |s| {
            s.edit_ready()?;
            if names.is_empty() {
                return Ok(());
            }
            let frame_no = s.current_frame_no;
            let interpolation = s.config.default_interpolation;
            let index = s.current_layer_index;
            let layer = layer_mut(&mut s.document, index)?;
            layer.capture_bones(frame_no, names, &s.host, interpolation)?;
            s.publish(TimelineEvent::EditPoseUpdated);
            s.after_edit("Add key frames");
            Ok(())
        })
    }

    /// Remove the named bones of the active layer at the playhead
    pub fn remove_key_frames(&mut self, names: &[String]) -> Result<()> {
        self.command("Remove key frames", |s| {
            s.edit_ready()?;
            let frame_no = s.current_frame_no;
            let index = s.current_layer_index;
            let layer = layer_mut(&mut s.document, index)?;
            let key = layer.key();
            let mut removed = 0;
            for name in names {
                if layer.remove_bone(frame_no, name).is_some() {
                    removed += 1;
                }
            }
            layer.clean_frames();
            if removed == 0 {
                return Ok(());
            }
            if let Some(document) = s.document.as_ref() {
                s.selection.retain_existing(document);
            }
            tracing::debug!("Removed {removed} keys from {key} at {frame_no}");
            s.after_edit("Remove key frames");
            Ok(())
        })
    }

    /// Key a bone directly on the active layer
    pub fn set_bone(&mut self, frame_no: u32, bone: Bone) -> Result<()> {
        self.command("Edit key", |s| {
            s.edit_ready()?;
            let max_frame_no = doc_mut(&mut s.document)?.max_frame_no();
            if frame_no > max_frame_no {
                return Err(TimelineError::InvalidFrameRange {
                    start: frame_no,
                    end: frame_no,
                    max_frame_no,
                });
            }
            let index = s.current_layer_index;
            let name = bone.name.clone();
            layer_mut(&mut s.document, index)?.set_bone(frame_no, bone);
            s.after_edit(format!("Edit {name}"));
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Playhead
    // ------------------------------------------------------------------

    /// Move the playhead, clamped to the active track or the document
    pub fn seek_current_frame(&mut self, frame_no: u32) -> Result<()> {
        self.command("Seek", |s| {
            let document = s.document.as_ref().ok_or(TimelineError::NoTimeline)?;
            let clamped = document.clamp_frame_no(frame_no);
            s.current_frame_no = clamped;
            s.prev_playing_frame_no = clamped;
            s.host.set_playing_frame_no(clamped);
            s.apply_current_frame_all(false);
            s.publish(TimelineEvent::SeekCurrentFrame { frame_no: clamped });
            Ok(())
        })
    }

    /// Seek to the previous frame of the active layer. Returns `false` when there is none.
    pub fn prev_key_frame(&mut self) -> Result<bool> {
        let target = self
            .current_layer()
            .and_then(|l| l.prev_frame_no(self.current_frame_no));
        match target {
            Some(frame_no) => self.seek_current_frame(frame_no).map(|_| true),
            None => Ok(false),
        }
    }

    /// Seek to the next frame of the active layer. Returns `false` when there is none.
    pub fn next_key_frame(&mut self) -> Result<bool> {
        let target = self
            .current_layer()
            .and_then(|l| l.next_frame_no(self.current_frame_no));
        match target {
            Some(frame_no) => self.seek_current_frame(frame_no).map(|_| true),
            None => Ok(false),
        }
    }

    /// Move the host playhead and follow it
    pub fn set_playing_frame_no_all(&mut self, frame_no: u32) {
        self.host.set_playing_frame_no(frame_no);
        self.current_frame_no = frame_no;
        self.prev_playing_frame_no = frame_no;
        self.publish(TimelineEvent::SeekCurrentFrame { frame_no });
    }

    // ------------------------------------------------------------------
    // Tracks
    // ------------------------------------------------------------------

    /// Append a track spanning the whole timeline
    pub fn add_track(&mut self) -> Result<TrackId> {
        self.command("Add track", |s| {
            s.edit_ready()?;
            let id = doc_mut(&mut s.document)?.add_track()?;
            s.publish(TimelineEvent::Refresh);
            Ok(id)
        })
    }

    /// Activate or deactivate a track. Activating seeks to the track start.
    pub fn set_active_track(&mut self, id: Option<TrackId>, is_active: bool) -> Result<()> {
        self.command("Set active track", |s| {
            s.edit_ready()?;
            let document = doc_mut(&mut s.document)?;
            document.set_active_track(id, is_active)?;
            let start = document.active_track().map(|t| t.start_frame_no);
            s.apply_current_frame_all(true);
            if let Some(start) = start {
                s.set_playing_frame_no_all(start);
            }
            s.publish(TimelineEvent::Refresh);
            Ok(())
        })
    }

    /// Remove a track, keeping the active track if it is another one
    pub fn remove_track(&mut self, id: TrackId) -> Result<()> {
        self.command("Remove track", |s| {
            s.edit_ready()?;
            let removed = doc_mut(&mut s.document)?.remove_track(id)?;
            tracing::debug!("Removed track {}", removed.name);
            s.after_edit("Remove track");
            Ok(())
        })
    }

    /// Move a track up one place
    pub fn move_up_track(&mut self, id: TrackId) -> Result<bool> {
        self.command("Move track up", |s| {
            s.edit_ready()?;
            let moved = doc_mut(&mut s.document)?.move_up_track(id)?;
            if moved {
                s.publish(TimelineEvent::Refresh);
            }
            Ok(moved)
        })
    }

    /// Move a track down one place
    pub fn move_down_track(&mut self, id: TrackId) -> Result<bool> {
        self.command("Move track down", |s| {
            s.edit_ready()?;
            let moved = doc_mut(&mut s.document)?.move_down_track(id)?;
            if moved {
                s.publish(TimelineEvent::Refresh);
            }
            Ok(moved)
        })
    }

    /// Change a track window
    pub fn set_track_range(&mut self, id: TrackId, start_frame_no: u32, end_frame_no: u32) -> Result<()> {
        self.command("Set track range", |s| {
            s.edit_ready()?;
            doc_mut(&mut s.document)?.set_track_range(id, start_frame_no, end_frame_no)?;
            s.publish(TimelineEvent::Refresh);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Clipboard
    // ------------------------------------------------------------------

    /// Copy the selected keys of the active layer
    pub fn copy_frames_to_clipboard(&mut self) -> Result<()> {
        self.command("Copy", |s| {
            let document = s.document.as_ref().ok_or(TimelineError::NoTimeline)?;
            let layer = document
                .layers()
                .get(s.current_layer_index)
                .ok_or(TimelineError::NoTimeline)?;
            let frames = s.selection.to_frames(document, layer.key());
            if frames.is_empty() {
                return Err(TimelineError::EmptySelection);
            }
            let bundle = ClipboardBundle::new(layer.tag(), frames);
            s.clipboard.write_text(bundle.to_text()?);
            tracing::info!("Copied {} frames", bundle.frames.len());
            Ok(())
        })
    }

    /// Copy the live host pose of the active layer as a single frame
    pub fn copy_pose_to_clipboard(&mut self) -> Result<()> {
        self.command("Copy pose", |s| {
            s.edit_ready()?;
            let index = s.current_layer_index;
            let layer = layer_mut(&mut s.document, index)?;
            let names = layer.tracked_bone_names();
            let bones = s.host.capture_pose(layer.key(), &names)?;
            let bundle = ClipboardBundle::new(layer.tag(), vec![Frame::with_bones(0, bones)]);
            s.clipboard.write_text(bundle.to_text()?);
            Ok(())
        })
    }

    /// Push the first clipboard frame to the live pose of the active layer.
    /// The document is left untouched.
    pub fn paste_pose_from_clipboard(&mut self) -> Result<()> {
        self.command("Paste pose", |s| {
            s.edit_ready()?;
            let text = s.clipboard.read_text().ok_or(TimelineError::EmptyClipboard)?;
            let bundle = ClipboardBundle::from_text(&text)?;

            let document = s.document.as_ref().ok_or(TimelineError::NoTimeline)?;
            let layer = document
                .layers()
                .get(s.current_layer_index)
                .ok_or(TimelineError::NoTimeline)?;
            if bundle.layer_tag != layer.tag() {
                return Err(TimelineError::LayerMismatch {
                    expected: layer.tag().to_string(),
                    found: bundle.layer_tag,
                });
            }
            let key = layer.key();
            let frame = bundle.first_frame().ok_or(TimelineError::EmptyClipboard)?;
            let bones: Vec<Bone> = frame.bones().cloned().collect();
            s.host.apply_pose(key, &bones, true)?;
            tracing::debug!("Pasted pose of {} bones into {key}", bones.len());
            Ok(())
        })
    }

    /// Paste clipboard frames at the playhead, optionally mirrored
    pub fn paste_frames_from_clipboard(&mut self, flip: bool) -> Result<()> {
        let name = if flip { "Flip paste" } else { "Paste" };
        self.command(name, |s| {
            s.edit_ready()?;
            let text = s.clipboard.read_text().ok_or(TimelineError::EmptyClipboard)?;
            let bundle = ClipboardBundle::from_text(&text)?;

            let target = s.current_frame_no;
            let index = s.current_layer_index;
            let layer = layer_mut(&mut s.document, index)?;
            if bundle.layer_tag != layer.tag() {
                return Err(TimelineError::LayerMismatch {
                    expected: layer.tag().to_string(),
                    found: bundle.layer_tag,
                });
            }
            let frames = bundle.placed_at(target, flip)?;
            for frame in frames {
                layer.update_bones(frame.frame_no, frame.bones().cloned());
            }
            doc_mut(&mut s.document)?.adjust_max_frame_no();
            s.after_edit(name);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    /// Switch to a layer, creating it when the document has none of that kind and slot
    pub fn change_active_layer(&mut self, kind: LayerKind, slot_no: u32) -> Result<()> {
        let key = LayerKey::new(kind, slot_no);
        if self.document.as_ref().and_then(|d| d.layer(key)).is_some() {
            return self.set_active_layer(key);
        }
        self.command("Add layer", |s| {
            s.edit_ready()?;
            let mut layer = s.registry.create(kind, slot_no)?;
            let names: Vec<String> = kind.default_bone_names().iter().map(|n| (*n).to_string()).collect();
            let bones = capture_or_rest(&s.host, &layer, &names);
            layer.add_first_bones(bones);
            let settings = doc_mut(&mut s.document)?.clip_settings();
            if let Err(e) = layer.create_and_apply_anm(settings, &mut s.host) {
                tracing::warn!("Failed to load animation for {key}: {e}");
            }
            s.current_layer_index = doc_mut(&mut s.document)?.add_layer(layer);
            s.selection.unselect_all();
            tracing::info!("Added layer {key}");
            s.after_edit(format!("Add layer {key}"));
            Ok(())
        })
    }

    /// Switch to an existing layer; clears the selection
    pub fn set_active_layer(&mut self, key: LayerKey) -> Result<()> {
        self.command("Set active layer", |s| {
            let index = doc_mut(&mut s.document)?
                .layer_index(key)
                .ok_or_else(|| TimelineError::LayerNotFound(key.to_string()))?;
            s.current_layer_index = index;
            s.selection.unselect_all();
            s.publish(TimelineEvent::Refresh);
            Ok(())
        })
    }

    fn remove_layer_keys(&mut self, keys: &[LayerKey]) -> Result<usize> {
        let current = self.current_layer_key();
        let document = doc_mut(&mut self.document)?;
        let mut removed = 0;
        for key in keys {
            document.remove_layer(*key)?;
            removed += 1;
        }
        self.current_layer_index = current
            .and_then(|k| document.layer_index(k))
            .or_else(|| document.layer_index(LayerKey::default_motion()))
            .unwrap_or(0);
        self.selection.retain_existing(document);
        Ok(removed)
    }

    /// Remove a layer. The default motion layer cannot be removed.
    pub fn remove_layer(&mut self, key: LayerKey) -> Result<()> {
        self.command("Remove layer", |s| {
            s.edit_ready()?;
            s.remove_layer_keys(&[key])?;
            tracing::info!("Removed layer {key}");
            s.after_edit(format!("Remove layer {key}"));
            Ok(())
        })
    }

    /// Remove every removable layer of a kind. Returns the number removed.
    pub fn remove_layers(&mut self, kind: LayerKind) -> Result<usize> {
        self.command("Remove layers", |s| {
            s.edit_ready()?;
            let keys: Vec<LayerKey> = doc_mut(&mut s.document)?
                .find_layers(kind)
                .map(Layer::key)
                .filter(|k| *k != LayerKey::default_motion())
                .collect();
            if keys.is_empty() {
                return Ok(0);
            }
            let removed = s.remove_layer_keys(&keys)?;
            s.after_edit(format!("Remove {kind} layers"));
            Ok(removed)
        })
    }

    /// Copy a per-slot layer into the next free group slot. Returns the new key.
    pub fn duplicate_layer(&mut self, key: LayerKey) -> Result<LayerKey> {
        self.command("Duplicate layer", |s| {
            s.edit_ready()?;
            if !key.kind.is_per_slot() {
                return Err(TimelineError::InvalidData(format!("{} has a single slot", key.kind)));
            }
            let current = s.current_layer_key();
            let document = doc_mut(&mut s.document)?;
            let source = document
                .layer(key)
                .ok_or_else(|| TimelineError::LayerNotFound(key.to_string()))?;
            let slot_no = naming::next_group_index(0, |g| {
                document.layer(LayerKey::new(key.kind, g)).is_some()
            });
            let mut copy = s.registry.create(key.kind, slot_no)?;
            for frame in source.frames() {
                copy.create_frame_from(frame);
            }
            let new_key = copy.key();
            document.add_layer(copy);
            s.current_layer_index = current
                .and_then(|k| document.layer_index(k))
                .unwrap_or(0);
            s.after_edit(format!("Duplicate layer {key}"));
            Ok(new_key)
        })
    }

    // ------------------------------------------------------------------
    // Playback and output
    // ------------------------------------------------------------------

    /// Start playback from the playhead, restarting at 0 from the end
    pub fn play(&mut self) -> Result<()> {
        self.command("Play", |s| {
            s.edit_ready()?;
            let max_frame_no = doc_mut(&mut s.document)?.max_frame_no();
            if s.current_frame_no >= max_frame_no {
                s.set_playing_frame_no_all(0);
            }
            s.create_and_apply_anm_all();
            s.host.set_playing_frame_no(s.current_frame_no);
            s.apply_current_frame_all(true);
            s.host.set_motion_playing(true);
            s.set_anm_speed_all(s.anm_speed);
            s.publish(TimelineEvent::Play);
            Ok(())
        })
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.host.set_motion_playing(false);
        self.publish(TimelineEvent::Stop);
    }

    /// Change the playback speed
    pub fn set_anm_speed_all(&mut self, speed: f32) {
        self.anm_speed = speed;
        self.host.set_anm_speed(speed);
        self.publish(TimelineEvent::AnmSpeedChanged { speed });
    }

    /// Rebuild every layer's animation and load it into the host
    pub fn create_and_apply_anm_all(&mut self) {
        let Some(document) = self.document.as_mut() else {
            return;
        };
        let settings = document.clip_settings();
        for layer in document.layers_mut() {
            if let Err(e) = layer.create_and_apply_anm(settings, &mut self.host) {
                tracing::warn!("Failed to load animation for {}: {e}", layer.key());
            }
        }
    }

    /// Check the document is exportable
    pub fn is_valid_data(&self) -> Result<()> {
        self.document
            .as_ref()
            .ok_or(TimelineError::NoTimeline)?
            .validate()
    }

    /// Export every layer's animation. Returns the file names written.
    pub fn output_anm(&mut self) -> Result<Vec<String>> {
        self.command("Export animation", |s| {
            s.edit_ready()?;
            s.is_valid_data()?;
            let document = doc_mut(&mut s.document)?;
            let settings = document.clip_settings();
            let names: Vec<String> = document
                .layers()
                .iter()
                .map(|l| document.anm_file_name(l.key()))
                .collect();
            for (layer, file_name) in document.layers_mut().iter_mut().zip(&names) {
                layer.output_anm(file_name, settings, &mut s.host)?;
            }
            tracing::info!("Exported {} animations", names.len());
            Ok(names)
        })
    }

    /// Export a song description referencing each supporting layer
    pub fn output_dcm(&mut self) -> Result<DcmSong> {
        self.command("Export song", |s| {
            s.edit_ready()?;
            s.is_valid_data()?;
            let document = s.document.as_ref().ok_or(TimelineError::NoTimeline)?;

            let end_time = document.frame_time_seconds(document.max_frame_no())
                + document.start_offset_time
                + document.end_offset_time;
            let mut song = DcmSong {
                name: document.anm_name.clone(),
                end_time,
                fades: vec![FadeRow {
                    fade_in: true,
                    start_time: 0.0,
                    fade_time: document.start_fade_time,
                }],
                entries: Vec::new(),
            };
            if document.end_fade_time > 0.0 {
                song.fades.push(FadeRow {
                    fade_in: false,
                    start_time: (end_time - document.end_fade_time).max(0.0),
                    fade_time: document.end_fade_time,
                });
            }
            for layer in document.layers() {
                let file_name = document.anm_file_name(layer.key());
                if !layer.output_dcm(&mut song, &file_name) {
                    tracing::warn!("{} does not support song export", layer.key());
                }
            }

            s.host.export_song(&song)?;
            tracing::info!("Exported song {} ({:.2}s)", song.name, song.end_time);
            Ok(song)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::SharedClipboard;
    use crate::host::HeadlessHost;
    use crate::transform::TransformData;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn motion() -> LayerKey {
        LayerKey::default_motion()
    }

    fn value(name: &str, v: f32) -> Bone {
        Bone::new(name, TransformData::values(vec![v]))
    }

    fn session_with(config: EditorConfig, host: HeadlessHost, clipboard: SharedClipboard) -> TimelineSession<HeadlessHost> {
        let mut session = TimelineSession::new(config, host, Box::new(clipboard));
        session.new_timeline().unwrap();
        session.tick();
        session
    }

    fn session() -> TimelineSession<HeadlessHost> {
        session_with(
            EditorConfig::default(),
            HeadlessHost::new().with_target(motion()),
            SharedClipboard::new(),
        )
    }

    fn motion_layer(session: &TimelineSession<HeadlessHost>) -> &Layer {
        session.document().unwrap().layer(motion()).unwrap()
    }

    #[test]
    fn test_new_timeline_records_history_on_tick() {
        let mut session = TimelineSession::new(
            EditorConfig::default(),
            HeadlessHost::new().with_target(motion()),
            Box::new(SharedClipboard::new()),
        );
        session.new_timeline().unwrap();
        assert!(session.history().is_empty());
        assert_eq!(session.requested_history(), Some("New timeline"));

        session.tick();
        assert_eq!(session.history().len(), 1);
        assert!(session.requested_history().is_none());
        assert!(motion_layer(&session).bone(0, "Bip01").is_some());
    }

    #[test]
    fn test_invalid_host_rejects_commands() {
        let mut session = session();
        session.host_mut().valid = false;
        assert!(matches!(
            session.set_bone(4, value("A", 1.0)),
            Err(TimelineError::HostUnavailable(_))
        ));
        assert!(motion_layer(&session).frame(4).is_none());
    }

    #[test]
    fn test_invalid_host_rejects_track_and_history_commands() {
        let mut session = session();
        let id = session.add_track().unwrap();
        session.set_bone(4, value("A", 1.0)).unwrap();
        session.tick();
        assert_eq!(session.history().len(), 2);

        session.host_mut().valid = false;
        let before = session.document().cloned();
        assert!(matches!(session.add_track(), Err(TimelineError::HostUnavailable(_))));
        assert!(matches!(session.remove_track(id), Err(TimelineError::HostUnavailable(_))));
        assert!(session.set_active_track(Some(id), true).is_err());
        assert!(session.set_track_range(id, 2, 10).is_err());
        assert!(session.move_up_track(id).is_err());
        assert!(session.move_down_track(id).is_err());
        assert!(matches!(session.undo(), Err(TimelineError::HostUnavailable(_))));
        assert!(session.redo().is_err());
        assert!(session.restore_history(0).is_err());
        assert_eq!(session.document().cloned(), before);
        assert!(session.requested_history().is_none());

        session.host_mut().valid = true;
        assert!(session.undo().unwrap());
        assert!(motion_layer(&session).frame(4).is_none());
    }

    #[test]
    fn test_history_waits_for_pointer_release() {
        let mut session = session();
        session.host_mut().pointer_down = true;
        session.set_bone(5, value("A", 1.0)).unwrap();
        session.set_bone(5, value("A", 2.0)).unwrap();
        session.tick();
        assert_eq!(session.history().len(), 1);

        session.host_mut().pointer_down = false;
        session.tick();
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().undo_description(), Some("Edit A"));
    }

    #[test]
    fn test_undo_redo() {
        let mut session = session();
        session.set_bone(5, value("A", 1.0)).unwrap();
        session.tick();

        assert!(session.undo().unwrap());
        assert!(motion_layer(&session).frame(5).is_none());
        assert!(!session.undo().unwrap());

        assert!(session.redo().unwrap());
        assert!(motion_layer(&session).bone(5, "A").is_some());
        assert!(!session.redo().unwrap());
    }

    #[test]
    fn test_restore_drops_pending_request() {
        let mut session = session();
        session.set_bone(5, value("A", 1.0)).unwrap();
        session.tick();
        session.set_bone(6, value("B", 1.0)).unwrap();
        assert!(session.requested_history().is_some());

        assert!(session.restore_history(0).unwrap());
        assert!(session.requested_history().is_none());
        assert!(!session.restore_history(0).unwrap());
        assert!(!session.restore_history(99).unwrap());
        assert!(motion_layer(&session).frame(6).is_none());
    }

    #[test]
    fn test_history_limit_evicts_oldest() {
        let config = EditorConfig {
            history_limit: 3,
            ..EditorConfig::default()
        };
        let mut session = session_with(config, HeadlessHost::new().with_target(motion()), SharedClipboard::new());
        for i in 1..=4 {
            session.set_bone(i, value(&format!("B{i}"), 1.0)).unwrap();
            session.tick();
        }
        let history = session.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history.entry(0).map(|e| e.description.as_str()), Some("Edit B2"));
        assert_eq!(history.cursor(), Some(2));
    }

    #[test]
    fn test_zero_history_limit_records_nothing() {
        let config = EditorConfig {
            history_limit: 0,
            ..EditorConfig::default()
        };
        let mut session = session_with(config, HeadlessHost::new().with_target(motion()), SharedClipboard::new());
        session.set_bone(2, value("A", 1.0)).unwrap();
        session.tick();
        assert!(session.history().is_empty());
        assert!(!session.undo().unwrap());
    }

    #[test]
    fn test_copy_paste_keeps_spacing() {
        let mut session = session();
        session.set_bone(3, value("A", 1.0)).unwrap();
        session.set_bone(5, value("B", 2.0)).unwrap();
        session.select_bones(
            &[BoneRef::new(motion(), 3, "A"), BoneRef::new(motion(), 5, "B")],
            false,
        );
        session.copy_frames_to_clipboard().unwrap();

        session.seek_current_frame(10).unwrap();
        session.paste_frames_from_clipboard(false).unwrap();
        let layer = motion_layer(&session);
        assert!(layer.bone(10, "A").is_some());
        assert!(layer.bone(12, "B").is_some());
        assert_eq!(session.requested_history(), Some("Paste"));
    }

    #[test]
    fn test_flip_paste_mirrors_bones() {
        let mut session = session();
        session
            .set_bone(2, Bone::new("Hand_L", TransformData::root([1.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0])))
            .unwrap();
        session.select_bones(&[BoneRef::new(motion(), 2, "Hand_L")], false);
        session.copy_frames_to_clipboard().unwrap();

        session.seek_current_frame(8).unwrap();
        session.paste_frames_from_clipboard(true).unwrap();
        let bone = motion_layer(&session).bone(8, "Hand_R").unwrap();
        assert_eq!(bone.transform.position, Some([-1.0, 0.0, 0.0]));
        assert_eq!(session.requested_history(), Some("Flip paste"));
    }

    #[test]
    fn test_paste_rejects_other_layer_type() {
        let clipboard = SharedClipboard::new();
        let mut session = session_with(
            EditorConfig::default(),
            HeadlessHost::new().with_target(motion()),
            clipboard.clone(),
        );
        let bundle = ClipboardBundle::new(LayerKind::Camera.tag(), vec![Frame::with_bones(0, [value("Camera", 1.0)])]);
        clipboard.write_text(bundle.to_text().unwrap());

        let before = session.document().cloned();
        assert!(matches!(
            session.paste_frames_from_clipboard(false),
            Err(TimelineError::LayerMismatch { .. })
        ));
        assert_eq!(session.document().cloned(), before);
    }

    #[test]
    fn test_paste_empty_clipboard() {
        let mut session = session();
        assert!(matches!(
            session.paste_frames_from_clipboard(false),
            Err(TimelineError::EmptyClipboard)
        ));
        assert!(matches!(session.copy_frames_to_clipboard(), Err(TimelineError::EmptySelection)));
    }

    #[test]
    fn test_copy_pose_captures_live_bones() {
        let clipboard = SharedClipboard::new();
        let mut session = session_with(
            EditorConfig::default(),
            HeadlessHost::new().with_target(motion()),
            clipboard.clone(),
        );
        session
            .host_mut()
            .set_live_bone(motion(), "Bip01", TransformData::rotation([0.0, 1.0, 0.0, 0.0]));
        session.copy_pose_to_clipboard().unwrap();

        let bundle = ClipboardBundle::from_text(&clipboard.read_text().unwrap()).unwrap();
        assert_eq!(bundle.frames.len(), 1);
        let bone = bundle.frames[0].bone("Bip01").unwrap();
        assert_eq!(bone.transform.rotation, Some([0.0, 1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_paste_pose_applies_first_frame() {
        let clipboard = SharedClipboard::new();
        let mut session = session_with(
            EditorConfig::default(),
            HeadlessHost::new().with_target(motion()),
            clipboard.clone(),
        );
        let bundle = ClipboardBundle::new(
            LayerKind::Motion.tag(),
            vec![
                Frame::with_bones(9, [value("Late", 9.0)]),
                Frame::with_bones(2, [value("Spine", 2.0), value("Head", 3.0)]),
            ],
        );
        clipboard.write_text(bundle.to_text().unwrap());

        let before = session.document().cloned();
        session.paste_pose_from_clipboard().unwrap();
        let applied = &session.host().applied[&motion()];
        let mut names: Vec<_> = applied.iter().map(|b| b.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["Head", "Spine"]);
        assert_eq!(session.document().cloned(), before);
        assert!(session.requested_history().is_none());
    }

    #[test]
    fn test_paste_pose_rejects_mismatch_and_empty() {
        let clipboard = SharedClipboard::new();
        let mut session = session_with(
            EditorConfig::default(),
            HeadlessHost::new().with_target(motion()),
            clipboard.clone(),
        );
        assert!(matches!(session.paste_pose_from_clipboard(), Err(TimelineError::EmptyClipboard)));

        let camera = ClipboardBundle::new(LayerKind::Camera.tag(), vec![Frame::with_bones(0, [value("Camera", 1.0)])]);
        clipboard.write_text(camera.to_text().unwrap());
        assert!(matches!(
            session.paste_pose_from_clipboard(),
            Err(TimelineError::LayerMismatch { .. })
        ));

        let empty = ClipboardBundle::new(LayerKind::Motion.tag(), Vec::new());
        clipboard.write_text(empty.to_text().unwrap());
        assert!(matches!(session.paste_pose_from_clipboard(), Err(TimelineError::EmptyClipboard)));

        clipboard.write_text("garbage".to_string());
        assert!(matches!(session.paste_pose_from_clipboard(), Err(TimelineError::Parse(_))));
    }

    #[test]
    fn test_paste_past_frame_limit_leaves_document() {
        let clipboard = SharedClipboard::new();
        let mut session = session_with(
            EditorConfig::default(),
            HeadlessHost::new().with_target(motion()),
            clipboard.clone(),
        );
        let bundle = ClipboardBundle::new(
            LayerKind::Motion.tag(),
            vec![Frame::new(0), Frame::with_bones(u32::MAX - 5, [value("A", 1.0)])],
        );
        clipboard.write_text(bundle.to_text().unwrap());
        session.seek_current_frame(10).unwrap();

        let before = session.document().cloned();
        assert!(matches!(
            session.paste_frames_from_clipboard(false),
            Err(TimelineError::InvalidData(_))
        ));
        session.seek_current_frame(0).unwrap();
        assert!(session.paste_frames_from_clipboard(false).is_err());
        assert_eq!(session.document().cloned(), before);
        assert_eq!(session.document().map(TimelineDocument::max_frame_count), Some(31));
    }

    #[test]
    fn test_selection_stays_on_active_layer() {
        let mut session = session();
        let camera = LayerKey::new(LayerKind::Camera, 0);
        session.change_active_layer(LayerKind::Camera, 0).unwrap();
        session.set_bone(4, value("Camera", 1.0)).unwrap();
        session.set_active_layer(motion()).unwrap();
        session.set_bone(5, value("A", 1.0)).unwrap();

        session.select_bones(&[BoneRef::new(camera, 4, "Camera")], false);
        assert!(session.selection().is_empty());
        assert!(matches!(session.move_selected_bones(2), Err(TimelineError::EmptySelection)));
        let document = session.document().unwrap();
        assert!(document.layer(camera).unwrap().bone(4, "Camera").is_some());
        assert!(document.layer(camera).unwrap().frame(6).is_none());

        session.select_bones(
            &[BoneRef::new(camera, 4, "Camera"), BoneRef::new(motion(), 5, "A")],
            false,
        );
        assert_eq!(session.selection().len(), 1);
        assert!(session.selection().is_selected(&BoneRef::new(motion(), 5, "A")));
    }

    #[test]
    fn test_insert_frames_shifts_selection() {
        let mut session = session();
        session.set_bone(5, value("A", 1.0)).unwrap();
        session.select_bones(&[BoneRef::new(motion(), 5, "A")], false);

        session.insert_frames(2, 3).unwrap();
        assert!(motion_layer(&session).bone(7, "A").is_some());
        assert!(session.selection().is_selected(&BoneRef::new(motion(), 7, "A")));
        assert_eq!(session.requested_history(), Some("Insert frames: 2 - 3"));
    }

    #[test]
    fn test_delete_frames_clears_selection() {
        let mut session = session();
        session.set_bone(5, value("A", 1.0)).unwrap();
        session.select_bones(&[BoneRef::new(motion(), 5, "A")], false);

        session.delete_frames(4, 6).unwrap();
        assert!(session.selection().is_empty());
        assert!(motion_layer(&session).frame(5).is_none());
        assert!(session.delete_frames(0, 0).is_err());
    }

    #[test]
    fn test_move_selected_bones() {
        let mut session = session();
        session.set_bone(5, value("A", 1.0)).unwrap();
        session.set_bone(9, value("A", 2.0)).unwrap();
        session.select_bones(&[BoneRef::new(motion(), 5, "A")], false);

        assert!(matches!(session.move_selected_bones(4), Err(TimelineError::MoveBlocked { .. })));
        assert!(motion_layer(&session).bone(5, "A").is_some());

        session.move_selected_bones(2).unwrap();
        assert!(motion_layer(&session).bone(7, "A").is_some());
        assert!(motion_layer(&session).frame(5).is_none());
        assert!(session.selection().is_selected(&BoneRef::new(motion(), 7, "A")));
        assert_eq!(session.requested_history(), Some("Move keyframes"));
    }

    #[test]
    fn test_remove_selected_and_named_keys() {
        let mut session = session();
        session.set_bone(5, value("A", 1.0)).unwrap();
        session.set_bone(5, value("B", 1.0)).unwrap();
        session.select_bones(&[BoneRef::new(motion(), 5, "A")], false);
        session.remove_selected_frame().unwrap();
        assert!(motion_layer(&session).bone(5, "A").is_none());
        assert!(session.selection().is_empty());

        session.seek_current_frame(5).unwrap();
        session.remove_key_frames(&["B".to_string()]).unwrap();
        assert!(motion_layer(&session).frame(5).is_none());
        assert_eq!(session.requested_history(), Some("Remove key frames"));
    }

    #[test]
    fn test_add_key_frame_all_captures_host_pose() {
        let mut session = session();
        session
            .host_mut()
            .set_live_bone(motion(), "Bip01 Spine", TransformData::rotation([0.0, 0.0, 1.0, 0.0]));
        session.seek_current_frame(6).unwrap();
        session.add_key_frame_all().unwrap();

        let bone = motion_layer(&session).bone(6, "Bip01 Spine").unwrap();
        assert_eq!(bone.transform.rotation, Some([0.0, 0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_failing_layer_does_not_block_others() {
        let camera = LayerKey::new(LayerKind::Camera, 0);
        let mut host = HeadlessHost::new().with_target(motion()).with_target(camera);
        host.failing.insert(camera);
        let mut session = session_with(EditorConfig::default(), host, SharedClipboard::new());

        session.change_active_layer(LayerKind::Camera, 0).unwrap();
        assert_eq!(session.current_layer_key(), Some(camera));

        let count = session.host().apply_count;
        session.seek_current_frame(3).unwrap();
        session.tick();
        assert!(session.host().apply_count > count);
        assert!(session.host().applied.contains_key(&motion()));
        assert!(!session.host().applied.contains_key(&camera));
    }

    #[test]
    fn test_layer_management() {
        let mut session = session();
        assert!(matches!(
            session.remove_layer(motion()),
            Err(TimelineError::CannotRemoveLayer(_))
        ));

        let copy = session.duplicate_layer(motion()).unwrap();
        assert_eq!(copy, LayerKey::new(LayerKind::Motion, 2));
        let document = session.document().unwrap();
        assert_eq!(
            document.layer(copy).map(Layer::frame_count),
            document.layer(motion()).map(Layer::frame_count)
        );
        assert_eq!(session.current_layer_key(), Some(motion()));

        session.change_active_layer(LayerKind::Light, 0).unwrap();
        session.remove_layer(LayerKey::new(LayerKind::Light, 0)).unwrap();
        assert_eq!(session.current_layer_key(), Some(motion()));

        assert_eq!(session.remove_layers(LayerKind::Motion).unwrap(), 1);
        assert_eq!(session.document().unwrap().layers().len(), 1);
    }

    #[test]
    fn test_playback_wraps_at_max_frame() {
        let mut session = session();
        session.play().unwrap();
        assert!(session.is_playing());

        session.host_mut().advance(4, 30);
        session.tick();
        assert_eq!(session.current_frame_no(), 4);

        session.host_mut().playing_frame_no = 30;
        session.tick();
        assert_eq!(session.current_frame_no(), 0);
        assert_eq!(session.host().playing_frame_no, 0);

        session.stop();
        assert!(!session.is_playing());
    }

    #[test]
    fn test_active_track_loops_playback() {
        let mut session = session();
        let id = session.add_track().unwrap();
        session.set_track_range(id, 5, 10).unwrap();
        session.set_active_track(Some(id), true).unwrap();
        assert_eq!(session.current_frame_no(), 5);

        session.play().unwrap();
        session.host_mut().playing_frame_no = 10;
        session.tick();
        assert_eq!(session.current_frame_no(), 5);
        assert_eq!(session.host().playing_frame_no, 5);

        session.seek_current_frame(20).unwrap();
        assert_eq!(session.current_frame_no(), 10);
    }

    #[test]
    fn test_track_reorder_keeps_active_track() {
        let mut session = session();
        let first = session.add_track().unwrap();
        let second = session.add_track().unwrap();
        session.set_active_track(Some(second), true).unwrap();

        assert!(session.move_up_track(second).unwrap());
        assert!(!session.move_up_track(second).unwrap());
        assert_eq!(session.document().unwrap().active_track().map(|t| t.id), Some(second));

        session.remove_track(first).unwrap();
        assert_eq!(session.document().unwrap().active_track().map(|t| t.id), Some(second));
        assert_eq!(session.requested_history(), Some("Remove track"));
    }

    #[test]
    fn test_key_navigation() {
        let mut session = session();
        session.set_bone(4, value("A", 1.0)).unwrap();
        session.set_bone(9, value("A", 1.0)).unwrap();

        assert!(session.next_key_frame().unwrap());
        assert_eq!(session.current_frame_no(), 4);
        assert!(session.next_key_frame().unwrap());
        assert_eq!(session.current_frame_no(), 9);
        assert!(!session.next_key_frame().unwrap());
        assert!(session.prev_key_frame().unwrap());
        assert_eq!(session.current_frame_no(), 4);
    }

    #[test]
    fn test_events_published() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut session = session();
        let sink = Arc::clone(&seen);
        session.subscribe(Box::new(move |e| sink.lock().push(e.name())));

        session.play().unwrap();
        session.stop();
        let seen = seen.lock();
        assert!(seen.contains(&"Play"));
        assert!(seen.contains(&"AnmSpeedChanged"));
        assert_eq!(seen.last(), Some(&"Stop"));
    }

    #[test]
    fn test_output_anm_and_dcm() {
        let mut session = session();
        session.change_active_layer(LayerKind::Camera, 0).unwrap();

        let names = session.output_anm().unwrap();
        assert_eq!(names, vec!["timeline.anm".to_string(), "timeline_camera.anm".to_string()]);
        assert!(session.host().exported.contains_key("timeline.anm"));

        let song = session.output_dcm().unwrap();
        assert!((song.end_time - 2.0).abs() < 1e-5);
        assert_eq!(song.fades.len(), 1);
        assert_eq!(song.entries.len(), 2);
        assert_eq!(session.host().songs.len(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig {
            timeline_dir: dir.path().to_path_buf(),
            default_anm_name: "waltz".to_string(),
            ..EditorConfig::default()
        };
        let mut session = session_with(config, HeadlessHost::new().with_target(motion()), SharedClipboard::new());
        session.set_bone(5, value("A", 1.0)).unwrap();
        let path = session.save_timeline().unwrap();
        assert!(path.exists());
        let saved = session.document().cloned();

        session.clear_timeline();
        assert!(session.document().is_none());
        assert!(matches!(session.set_bone(1, value("A", 1.0)), Err(TimelineError::NoTimeline)));

        assert!(path.ends_with("waltz.ron"));
        session.load_timeline("waltz", "").unwrap();
        assert_eq!(session.document().cloned(), saved);
        session.tick();
        assert_eq!(session.history().len(), 1);
        assert_eq!(
            session.history().entry(0).map(|e| e.description.as_str()),
            Some("Load waltz")
        );
        assert!(session.load_timeline("missing", "").is_err());
    }
}
