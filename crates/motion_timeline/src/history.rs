// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linear undo/redo history of whole-document snapshots.
//!
//! Every entry holds the complete document as it was after an edit, encoded
//! with bincode. The cursor points at the entry matching the live document;
//! undo and redo decode the neighbouring entry and hand it back to the
//! caller, which replaces its document wholesale.

use crate::document::TimelineDocument;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of entries kept
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Encoded document state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized document
    pub data: Vec<u8>,
    /// Size in bytes
    pub size: usize,
}

impl StateSnapshot {
    /// Create a new state snapshot
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len();
        Self { data, size }
    }

    /// Create from serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        let data = bincode::serialize(value)?;
        Ok(Self::new(data))
    }

    /// Deserialize to value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }
}

/// One recorded document state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Human-readable description of the edit that produced this state
    pub description: String,
    /// Document after the edit
    pub snapshot: StateSnapshot,
    /// Unix time the entry was recorded
    pub timestamp: u64,
}

impl HistoryEntry {
    /// Snapshot a document
    pub fn new(document: &TimelineDocument, description: impl Into<String>) -> Result<Self> {
        Ok(Self {
            description: description.into(),
            snapshot: StateSnapshot::from_value(document)?,
            timestamp: now_secs(),
        })
    }

    /// Decode the stored document. Layer caches are rebuilt.
    pub fn document(&self) -> Result<TimelineDocument> {
        let mut document: TimelineDocument = self.snapshot.to_value()?;
        document.init_layers();
        Ok(document)
    }
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Entries recorded
    pub entry_count: usize,
    /// Cursor position
    pub cursor: Option<usize>,
    /// Total snapshot bytes
    pub memory_used: usize,
    /// Capacity
    pub limit: usize,
}

/// Snapshot stack with a cursor
#[derive(Debug)]
pub struct HistoryStack {
    entries: VecDeque<HistoryEntry>,
    cursor: Option<usize>,
    limit: usize,
    memory_used: usize,
}

impl HistoryStack {
    /// Create with the default limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create with a custom limit. A limit of 0 disables recording.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            limit,
            memory_used: 0,
        }
    }

    /// Capacity
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the capacity. Takes effect on the next record.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    /// Record the document after an edit.
    ///
    /// Entries after the cursor are discarded first, then the oldest entries
    /// are evicted until there is room. Returns `false` when recording is
    /// disabled.
    pub fn add(&mut self, document: &TimelineDocument, description: &str) -> Result<bool> {
        let entry = HistoryEntry::new(document, description)?;

        let keep = self.cursor.map_or(0, |c| c + 1);
        while self.entries.len() > keep {
            if let Some(dropped) = self.entries.pop_back() {
                self.memory_used = self.memory_used.saturating_sub(dropped.snapshot.size);
            }
        }

        while !self.entries.is_empty() && self.entries.len() >= self.limit {
            if let Some(evicted) = self.entries.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(evicted.snapshot.size);
            }
            self.cursor = self.cursor.and_then(|c| c.checked_sub(1));
        }

        if self.limit == 0 {
            self.cursor = None;
            return Ok(false);
        }

        tracing::debug!("History: recorded {:?} ({} bytes)", description, entry.snapshot.size);
        self.memory_used += entry.snapshot.size;
        self.entries.push_back(entry);
        self.cursor = Some(self.entries.len() - 1);
        Ok(true)
    }

    /// Decode the entry before the cursor and move there.
    /// Returns `None` at the oldest entry.
    pub fn undo(&mut self) -> Result<Option<TimelineDocument>> {
        match self.cursor {
            Some(c) if c > 0 => self.restore(c - 1),
            _ => Ok(None),
        }
    }

    /// Decode the entry after the cursor and move there.
    /// Returns `None` at the newest entry.
    pub fn redo(&mut self) -> Result<Option<TimelineDocument>> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.entries.len() {
            return Ok(None);
        }
        self.restore(next)
    }

    /// Decode an entry and move the cursor to it.
    /// Returns `None` for the current entry or an index out of range.
    pub fn restore(&mut self, index: usize) -> Result<Option<TimelineDocument>> {
        if Some(index) == self.cursor {
            return Ok(None);
        }
        let Some(entry) = self.entries.get(index) else {
            return Ok(None);
        };
        let document = entry.document()?;
        self.cursor = Some(index);
        Ok(Some(document))
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.memory_used = 0;
    }

    /// Cursor position
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry
    pub fn entry(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// Entries newest first with their indices, for a history list view
    pub fn entries_newest_first(&self) -> impl Iterator<Item = (usize, &HistoryEntry)> {
        self.entries.iter().enumerate().rev()
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    /// Description of the state undo would leave
    pub fn undo_description(&self) -> Option<&str> {
        let c = self.cursor.filter(|&c| c > 0)?;
        self.entries.get(c).map(|e| e.description.as_str())
    }

    /// Description of the state redo would reach
    pub fn redo_description(&self) -> Option<&str> {
        let next = self.cursor.map_or(0, |c| c + 1);
        self.entries.get(next).map(|e| e.description.as_str())
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            entry_count: self.entries.len(),
            cursor: self.cursor,
            memory_used: self.memory_used,
            limit: self.limit,
        }
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}
