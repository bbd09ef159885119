// SPDX-License-Identifier: MIT OR Apache-2.0
//! Name validation and allocation helpers.

use crate::error::{Result, TimelineError};
use std::path::{Component, Path};

/// Highest number tried when naming a new track
pub const MAX_TRACK_NAME_INDEX: u32 = 50;

/// Characters rejected in file and directory names
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\0'];

fn has_invalid_char(name: &str) -> bool {
    name.chars().any(|c| c.is_control() || INVALID_CHARS.contains(&c))
}

/// Validate a bare file name (no directories)
pub fn validate_file_name(name: &str) -> Result<()> {
    let reject = |reason: &str| Err(TimelineError::InvalidFileName(format!("{name} ({reason})")));
    if name.is_empty() {
        return reject("empty");
    }
    if name.contains('/') || name.contains('\\') {
        return reject("path separators are not allowed");
    }
    if name.contains("..") {
        return reject("'..' is not allowed");
    }
    if has_invalid_char(name) {
        return reject("invalid character");
    }
    Ok(())
}

/// Validate a relative directory name. Empty means the base directory.
pub fn validate_dir_name(name: &str) -> Result<()> {
    let reject = |reason: &str| Err(TimelineError::InvalidDirName(format!("{name} ({reason})")));
    if name.is_empty() {
        return Ok(());
    }
    let path = Path::new(name);
    if path.is_absolute() || path.has_root() || name.starts_with('/') || name.starts_with('\\') {
        return reject("must be relative");
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) || name.contains("..") {
        return reject("'..' is not allowed");
    }
    if has_invalid_char(name) {
        return reject("invalid character");
    }
    Ok(())
}

/// Whether a bare file name is acceptable
pub fn is_valid_file_name(name: &str) -> bool {
    validate_file_name(name).is_ok()
}

/// Whether a relative directory name is acceptable
pub fn is_valid_dir_name(name: &str) -> bool {
    validate_dir_name(name).is_ok()
}

/// First free `Track{n}` name, `n` in `1..MAX_TRACK_NAME_INDEX`
pub fn next_track_name<'a>(existing: impl IntoIterator<Item = &'a str> + Clone) -> Option<String> {
    (1..MAX_TRACK_NAME_INDEX)
        .map(|i| format!("Track{i}"))
        .find(|candidate| !existing.clone().into_iter().any(|n| n == candidate))
}

/// Next group index after `group` that `is_taken` does not claim.
///
/// Index 1 is never handed out; group 0 is the primary slot and duplicates
/// start at 2.
pub fn next_group_index(mut group: u32, is_taken: impl Fn(u32) -> bool) -> u32 {
    loop {
        group += 1;
        if group == 1 {
            group += 1;
        }
        if !is_taken(group) {
            return group;
        }
    }
}

/// Animation file name for a layer slot
pub fn anm_file_name(anm_name: &str, slot_no: u32) -> String {
    if slot_no > 0 {
        format!("{anm_name}_{slot_no}.anm")
    } else {
        format!("{anm_name}.anm")
    }
}
