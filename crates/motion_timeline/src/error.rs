// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for timeline editing.

use crate::host::HostError;
use thiserror::Error;

/// Errors raised by timeline document, session and persistence operations
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Frame range outside `[0, max_frame_no]`, inverted, or `0 - 0`
    #[error("Invalid frame range {start} - {end} (max frame {max_frame_no})")]
    InvalidFrameRange {
        /// Range start
        start: u32,
        /// Range end
        end: u32,
        /// Max frame of the document at the time of the request
        max_frame_no: u32,
    },

    /// Deleting would leave the timeline without a single frame interval
    #[error("Timeline must keep at least 1 frame")]
    TooFewFrames,

    /// Command needs a selection but nothing is selected
    #[error("No bones selected")]
    EmptySelection,

    /// A selected bone cannot be moved to its destination
    #[error("Cannot move {bone} from frame {frame_no}: {reason}")]
    MoveBlocked {
        /// Bone name
        bone: String,
        /// Source frame
        frame_no: u32,
        /// Why the move was refused
        reason: String,
    },

    /// Clipboard payload belongs to another layer type
    #[error("Layer mismatch: clipboard holds {found}, active layer is {expected}")]
    LayerMismatch {
        /// Tag of the active layer
        expected: String,
        /// Tag stored in the clipboard bundle
        found: String,
    },

    /// Clipboard is empty or holds no frames
    #[error("Clipboard holds no frames")]
    EmptyClipboard,

    /// No timeline is loaded
    #[error("No timeline is loaded")]
    NoTimeline,

    /// File name rejected by validation
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    /// Directory name rejected by validation
    #[error("Invalid directory name: {0:?}")]
    InvalidDirName(String),

    /// Document fails its export checks
    #[error("Invalid timeline data: {0}")]
    InvalidData(String),

    /// Host adapter rejected a request
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Host adapter reported itself unusable
    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    /// No layer with the given key exists
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// Layer tag is not registered
    #[error("Unknown layer tag: {0}")]
    UnknownLayerTag(String),

    /// Layer is not removable
    #[error("Cannot remove layer: {0}")]
    CannotRemoveLayer(String),

    /// Track id is not part of the document
    #[error("Track not found")]
    TrackNotFound,

    /// Every candidate track name is taken
    #[error("No free track name")]
    TrackNamesExhausted,

    /// A layer failed during its per-tick update
    #[error("Layer {layer} failed: {message}")]
    Layer {
        /// Layer display key
        layer: String,
        /// Failure detail
        message: String,
    },

    /// RON text could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// RON text could not be produced
    #[error("Serialization error: {0}")]
    Serialization(#[from] ron::Error),

    /// History snapshot could not be encoded or decoded
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;
