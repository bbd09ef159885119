// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline files: one pretty RON document per animation.

use crate::document::{TimelineDocument, TIMELINE_FORMAT_VERSION};
use crate::error::{Result, TimelineError};
use crate::naming;
use std::path::{Path, PathBuf};

/// Extension of timeline files
pub const TIMELINE_EXTENSION: &str = "ron";

/// Path of a timeline file under `base_dir`
pub fn timeline_path(base_dir: &Path, dir_name: &str, anm_name: &str) -> Result<PathBuf> {
    naming::validate_file_name(anm_name)?;
    naming::validate_dir_name(dir_name)?;
    let mut path = base_dir.to_path_buf();
    if !dir_name.is_empty() {
        path.push(dir_name);
    }
    path.push(format!("{anm_name}.{TIMELINE_EXTENSION}"));
    Ok(path)
}

/// Encode a document as timeline file text
pub fn to_ron_string(document: &TimelineDocument) -> Result<String> {
    let pretty = ron::ser::PrettyConfig::default()
        .struct_names(true)
        .enumerate_arrays(false);
    Ok(ron::ser::to_string_pretty(document, pretty)?)
}

/// Decode timeline file text. Layer caches are rebuilt.
pub fn from_ron_str(text: &str) -> Result<TimelineDocument> {
    let mut document: TimelineDocument = ron::from_str(text)?;
    if document.version > TIMELINE_FORMAT_VERSION {
        return Err(TimelineError::InvalidData(format!(
            "Timeline version {} is newer than supported version {}",
            document.version, TIMELINE_FORMAT_VERSION
        )));
    }
    document.check_invariants()?;
    document.init_layers();
    Ok(document)
}

/// Write a document to its file under `base_dir`. Returns the path written.
pub fn save_document(document: &TimelineDocument, base_dir: &Path) -> Result<PathBuf> {
    let path = timeline_path(base_dir, &document.directory_name, &document.anm_name)?;
    let content = to_ron_string(document)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    tracing::info!("Saved timeline to {:?}", path);
    Ok(path)
}

/// Read a document from a file
pub fn load_document(path: &Path) -> Result<TimelineDocument> {
    let content = std::fs::read_to_string(path)?;
    let document = from_ron_str(&content)?;
    tracing::info!("Loaded timeline from {:?}", path);
    Ok(document)
}

/// Timeline names found in a directory, sorted
pub fn list_timelines(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some(TIMELINE_EXTENSION) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::Bone;
    use crate::config::EditorConfig;
    use crate::layer::{Layer, LayerKey, LayerKind};
    use crate::transform::TransformData;

    fn sample() -> TimelineDocument {
        let mut doc = TimelineDocument::new(&EditorConfig::default());
        doc.anm_name = "dance".to_string();
        doc.directory_name = "club".to_string();
        {
            let motion = doc.layer_mut(LayerKey::default_motion()).unwrap();
            motion.set_bone(0, Bone::new("Bip01", TransformData::root([0.0, 1.0, 0.0], [0.0, 0.0, 0.0, 1.0])));
            motion.set_bone(12, Bone::new("Bip01 L Hand", TransformData::rotation([0.0, 0.7, 0.0, 0.7])));
        }
        let mut camera = Layer::new(LayerKind::Camera, 0);
        camera.set_bone(0, Bone::new("Camera", TransformData::values(vec![35.0])));
        doc.add_layer(camera);
        let track = doc.add_track().unwrap();
        doc.set_active_track(Some(track), true).unwrap();
        doc
    }

    #[test]
    fn test_timeline_path() {
        let base = Path::new("/data");
        assert_eq!(
            timeline_path(base, "club", "dance").unwrap(),
            PathBuf::from("/data/club/dance.ron")
        );
        assert_eq!(timeline_path(base, "", "dance").unwrap(), PathBuf::from("/data/dance.ron"));
        assert!(timeline_path(base, "../up", "dance").is_err());
        assert!(timeline_path(base, "", "a/b").is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let doc = sample();
        let path = save_document(&doc, dir.path()).unwrap();
        assert!(path.ends_with("club/dance.ron"));

        let loaded = load_document(&path).unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.active_track().map(|t| t.id), doc.active_track().map(|t| t.id));
        assert_eq!(list_timelines(&dir.path().join("club")).unwrap(), vec!["dance".to_string()]);
    }

    #[test]
    fn test_corrupt_file_rejected() {
        assert!(from_ron_str("TimelineDocument(version: 1").is_err());
        let text = to_ron_string(&sample()).unwrap().replace("CameraTimelineLayer", "Bogus");
        assert!(from_ron_str(&text).is_err());

        let text = to_ron_string(&sample()).unwrap();
        assert!(text.contains("end_frame_no: 30"));
        let beyond = text.replace("end_frame_no: 30", "end_frame_no: 45");
        assert!(matches!(from_ron_str(&beyond), Err(TimelineError::InvalidData(_))));
        let inverted = text.replace("start_frame_no: 0", "start_frame_no: 20").replace("end_frame_no: 30", "end_frame_no: 10");
        assert!(matches!(from_ron_str(&inverted), Err(TimelineError::InvalidData(_))));
        let huge = text.replace("max_frame_no: 30", &format!("max_frame_no: {}", u32::MAX));
        assert!(matches!(from_ron_str(&huge), Err(TimelineError::InvalidData(_))));
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut doc = sample();
        doc.version = TIMELINE_FORMAT_VERSION + 1;
        let text = to_ron_string(&doc).unwrap();
        assert!(matches!(from_ron_str(&text), Err(TimelineError::InvalidData(_))));
    }
}
