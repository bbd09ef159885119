// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural copy/paste of keyframes as RON text.

use crate::document::MAX_FRAME_NO;
use crate::error::{Result, TimelineError};
use crate::frame::Frame;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Frames copied from one layer, tagged with that layer's type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardBundle {
    /// Tag of the source layer
    pub layer_tag: String,
    /// Copied frames, keeping their source frame numbers
    pub frames: Vec<Frame>,
}

impl ClipboardBundle {
    /// Create a new bundle
    pub fn new(layer_tag: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            layer_tag: layer_tag.into(),
            frames,
        }
    }

    /// Encode as clipboard text
    pub fn to_text(&self) -> Result<String> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Decode clipboard text
    pub fn from_text(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Smallest frame number in the bundle
    pub fn min_frame_no(&self) -> Option<u32> {
        self.frames.iter().map(|f| f.frame_no).min()
    }

    /// Frames shifted so the earliest lands on `target`, optionally mirrored.
    ///
    /// Fails when any frame would land past [`MAX_FRAME_NO`].
    pub fn placed_at(&self, target: u32, flip: bool) -> Result<Vec<Frame>> {
        let min = self.min_frame_no().ok_or(TimelineError::EmptyClipboard)?;
        self.frames
            .iter()
            .map(|frame| {
                let frame_no = (frame.frame_no - min)
                    .checked_add(target)
                    .filter(|&n| n <= MAX_FRAME_NO)
                    .ok_or_else(|| {
                        TimelineError::InvalidData(format!(
                            "pasted frame {} at {target} lands past frame {MAX_FRAME_NO}",
                            frame.frame_no
                        ))
                    })?;
                let frame = if flip { frame.mirrored() } else { frame.clone() };
                Ok(frame.moved_to(frame_no))
            })
            .collect()
    }

    /// Earliest frame of the bundle
    pub fn first_frame(&self) -> Option<&Frame> {
        self.frames.iter().min_by_key(|f| f.frame_no)
    }
}

/// Text clipboard the session copies to and pastes from
pub trait Clipboard {
    /// Current clipboard text
    fn read_text(&self) -> Option<String>;

    /// Replace the clipboard text
    fn write_text(&self, text: String);
}

/// In-process clipboard shareable between sessions
#[derive(Debug, Clone, Default)]
pub struct SharedClipboard {
    text: Arc<Mutex<Option<String>>>,
}

impl SharedClipboard {
    /// Create an empty clipboard
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SharedClipboard {
    fn read_text(&self) -> Option<String> {
        self.text.lock().clone()
    }

    fn write_text(&self, text: String) {
        *self.text.lock() = Some(text);
    }
}
