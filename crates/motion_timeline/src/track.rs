// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tracks: named playback windows over the timeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Named frame window that restricts playback and seeking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// First frame of the window
    pub start_frame_no: u32,
    /// Last frame of the window
    pub end_frame_no: u32,
}

impl Track {
    /// Create a new track
    pub fn new(name: impl Into<String>, start_frame_no: u32, end_frame_no: u32) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            start_frame_no,
            end_frame_no,
        }
    }

    /// Whether the window is usable for a document with the given max frame.
    ///
    /// The window must lie inside the document and span more than two frames.
    pub fn is_valid(&self, max_frame_no: u32) -> bool {
        self.end_frame_no <= max_frame_no && self.start_frame_no + 1 < self.end_frame_no
    }

    /// Clamp a frame into the window
    pub fn clamp(&self, frame_no: u32) -> u32 {
        frame_no.clamp(self.start_frame_no, self.end_frame_no)
    }

    /// Whether a frame is inside the window
    pub fn contains(&self, frame_no: u32) -> bool {
        (self.start_frame_no..=self.end_frame_no).contains(&frame_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_validity() {
        assert!(Track::new("Track1", 0, 30).is_valid(30));
        assert!(!Track::new("Track1", 0, 31).is_valid(30));
        assert!(!Track::new("Track1", 5, 6).is_valid(30));
        assert!(!Track::new("Track1", 5, 5).is_valid(30));
        assert!(Track::new("Track1", 5, 7).is_valid(30));
    }

    #[test]
    fn test_track_clamp() {
        let track = Track::new("Track1", 10, 20);
        assert_eq!(track.clamp(3), 10);
        assert_eq!(track.clamp(25), 20);
        assert_eq!(track.clamp(15), 15);
        assert!(track.contains(20));
        assert!(!track.contains(21));
    }

    #[test]
    fn test_track_ids_unique() {
        let a = Track::new("A", 0, 10);
        let b = Track::new("A", 0, 10);
        assert_ne!(a.id, b.id);
    }
}
