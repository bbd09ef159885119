// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of the layer types a session may create.

use crate::error::{Result, TimelineError};
use crate::layer::{Layer, LayerKind};

/// Constructor for a layer type
pub type LayerConstructor = fn(u32) -> Layer;

/// One registered layer type
#[derive(Debug, Clone, Copy)]
pub struct LayerRegistration {
    /// Layer type
    pub kind: LayerKind,
    /// Stable tag
    pub tag: &'static str,
    /// Builds an empty, initialized layer for a slot
    pub constructor: LayerConstructor,
}

fn construct(kind: LayerKind, slot_no: u32) -> Layer {
    let mut layer = Layer::new(kind, slot_no);
    layer.init();
    layer
}

fn motion(slot_no: u32) -> Layer {
    construct(LayerKind::Motion, slot_no)
}

fn eyes(slot_no: u32) -> Layer {
    construct(LayerKind::Eyes, slot_no)
}

fn camera(slot_no: u32) -> Layer {
    construct(LayerKind::Camera, slot_no)
}

fn light(slot_no: u32) -> Layer {
    construct(LayerKind::Light, slot_no)
}

fn post_effect(slot_no: u32) -> Layer {
    construct(LayerKind::PostEffect, slot_no)
}

fn bg_color(slot_no: u32) -> Layer {
    construct(LayerKind::BgColor, slot_no)
}

/// Tag to constructor table, sorted by layer priority
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    entries: Vec<LayerRegistration>,
}

impl LayerRegistry {
    /// Registry with every built-in layer type
    pub fn standard() -> Self {
        let constructors: [(LayerKind, LayerConstructor); 6] = [
            (LayerKind::Motion, motion),
            (LayerKind::Eyes, eyes),
            (LayerKind::Camera, camera),
            (LayerKind::Light, light),
            (LayerKind::PostEffect, post_effect),
            (LayerKind::BgColor, bg_color),
        ];
        let mut registry = Self { entries: Vec::new() };
        for (kind, constructor) in constructors {
            registry.register(kind, constructor);
        }
        registry
    }

    /// Registry with only the given kinds. Motion is always included.
    pub fn with_kinds(kinds: &[LayerKind]) -> Self {
        let standard = Self::standard();
        let entries = standard
            .entries
            .into_iter()
            .filter(|e| e.kind == LayerKind::Motion || kinds.contains(&e.kind))
            .collect();
        Self { entries }
    }

    /// Register or replace a layer type
    pub fn register(&mut self, kind: LayerKind, constructor: LayerConstructor) {
        self.entries.retain(|e| e.kind != kind);
        self.entries.push(LayerRegistration {
            kind,
            tag: kind.tag(),
            constructor,
        });
        self.entries.sort_by_key(|e| e.kind.priority());
    }

    /// Registered types, by priority
    pub fn entries(&self) -> &[LayerRegistration] {
        &self.entries
    }

    /// Whether a kind is registered
    pub fn contains(&self, kind: LayerKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    /// Resolve a tag to a registered kind
    pub fn kind_of(&self, tag: &str) -> Option<LayerKind> {
        self.entries.iter().find(|e| e.tag == tag).map(|e| e.kind)
    }

    /// Create a layer by kind
    pub fn create(&self, kind: LayerKind, slot_no: u32) -> Result<Layer> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.kind == kind)
            .ok_or_else(|| TimelineError::UnknownLayerTag(kind.tag().to_string()))?;
        Ok((entry.constructor)(slot_no))
    }

    /// Create a layer by tag
    pub fn create_by_tag(&self, tag: &str, slot_no: u32) -> Result<Layer> {
        let kind = self
            .kind_of(tag)
            .ok_or_else(|| TimelineError::UnknownLayerTag(tag.to_string()))?;
        self.create(kind, slot_no)
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_sorted_by_priority() {
        let registry = LayerRegistry::standard();
        let priorities: Vec<_> = registry.entries().iter().map(|e| e.kind.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
        assert_eq!(registry.entries()[0].kind, LayerKind::Motion);
    }

    #[test]
    fn test_create_by_tag() {
        let registry = LayerRegistry::standard();
        let layer = registry.create_by_tag("CameraTimelineLayer", 2).unwrap();
        assert_eq!(layer.kind(), LayerKind::Camera);
        assert_eq!(layer.slot_no(), 0);
        assert!(registry.create_by_tag("Nope", 0).is_err());
    }

    #[test]
    fn test_with_kinds_keeps_motion() {
        let registry = LayerRegistry::with_kinds(&[LayerKind::Camera]);
        assert!(registry.contains(LayerKind::Motion));
        assert!(registry.contains(LayerKind::Camera));
        assert!(!registry.contains(LayerKind::Light));
        assert!(registry.create(LayerKind::Light, 0).is_err());
    }
}
