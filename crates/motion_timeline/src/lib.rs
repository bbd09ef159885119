// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline document and history engine for keyframed character motion.
//!
//! This crate provides the editing core behind a motion timeline:
//! - Layered documents of frames and keyed bones
//! - Frame range editing (insert, duplicate, delete)
//! - Keyframe selection, moving and structural copy/paste
//! - Snapshot-based undo/redo with deferred capture
//! - Tracks that restrict playback to a frame window
//!
//! ## Architecture
//!
//! The engine is built on:
//! - [`TimelineDocument`] as the single value type for persistence and history
//! - [`HostAdapter`] as the seam to the engine that shows and plays the pose
//! - [`TimelineSession`] as the command surface, driven once per frame

pub mod bone;
pub mod clipboard;
pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod frame;
pub mod history;
pub mod host;
pub mod layer;
pub mod naming;
pub mod persist;
pub mod registry;
pub mod selection;
pub mod session;
pub mod track;
pub mod transform;

pub use bone::{Bone, BoneRef};
pub use clipboard::{Clipboard, ClipboardBundle, SharedClipboard};
pub use config::EditorConfig;
pub use document::TimelineDocument;
pub use error::{Result, TimelineError};
pub use events::{EventBus, EventCallback, SubscriptionId, TimelineEvent};
pub use frame::Frame;
pub use history::{HistoryEntry, HistoryStack, HistoryStats, StateSnapshot};
pub use host::{AnimationClip, DcmSong, HeadlessHost, HostAdapter, HostError};
pub use layer::{ClipSettings, Layer, LayerKey, LayerKind};
pub use registry::{LayerRegistration, LayerRegistry};
pub use selection::Selection;
pub use session::TimelineSession;
pub use track::{Track, TrackId};
pub use transform::{Interpolation, InterpolationMode, TransformData, TransformKind};
