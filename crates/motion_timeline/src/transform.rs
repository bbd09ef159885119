// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bone payloads, interpolation between keys, and left/right mirroring.

use serde::{Deserialize, Serialize};

/// Interpolation mode from a key to the next key of the same bone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InterpolationMode {
    /// Hold the value until the next key
    Constant,
    /// Linear interpolation
    #[default]
    Linear,
    /// Ease in and out
    Smooth,
}

impl InterpolationMode {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::Linear => "Linear",
            Self::Smooth => "Smooth",
        }
    }

    /// Remap a normalized time according to this mode
    pub fn ease(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Constant => 0.0,
            Self::Linear => t,
            Self::Smooth => Interpolation::smoothstep(t),
        }
    }
}

/// Which channels a transform carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransformKind {
    /// Rotation only (regular skeleton bones)
    #[default]
    Rotation,
    /// Position and rotation (root bones, cameras)
    Root,
    /// Position, rotation and scale
    Full,
    /// Free list of scalar values (colors, effect parameters)
    Values,
    /// String values only
    Text,
}

impl TransformKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rotation => "Rotation",
            Self::Root => "Root",
            Self::Full => "Full",
            Self::Values => "Values",
            Self::Text => "Text",
        }
    }

    /// Whether the kind carries a position channel
    pub fn has_position(&self) -> bool {
        matches!(self, Self::Root | Self::Full)
    }

    /// Whether the kind carries a rotation channel
    pub fn has_rotation(&self) -> bool {
        matches!(self, Self::Rotation | Self::Root | Self::Full)
    }

    /// Whether the kind carries a scale channel
    pub fn has_scale(&self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Keyed value of a single bone at a single frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformData {
    /// Channel layout
    pub kind: TransformKind,
    /// Local position
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    /// Local rotation as quaternion (x, y, z, w)
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    /// Local scale
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    /// Free scalar values
    #[serde(default)]
    pub values: Vec<f32>,
    /// Free string values
    #[serde(default)]
    pub str_values: Vec<String>,
    /// Interpolation towards the next key
    #[serde(default)]
    pub interpolation: InterpolationMode,
}

impl TransformData {
    /// Create an identity transform of the given kind
    pub fn new(kind: TransformKind) -> Self {
        Self {
            kind,
            position: kind.has_position().then_some([0.0; 3]),
            rotation: kind.has_rotation().then_some(Interpolation::IDENTITY),
            scale: kind.has_scale().then_some([1.0; 3]),
            values: Vec::new(),
            str_values: Vec::new(),
            interpolation: InterpolationMode::default(),
        }
    }

    /// Rotation-only transform
    pub fn rotation(rotation: [f32; 4]) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::new(TransformKind::Rotation)
        }
    }

    /// Position and rotation transform
    pub fn root(position: [f32; 3], rotation: [f32; 4]) -> Self {
        Self {
            position: Some(position),
            rotation: Some(rotation),
            ..Self::new(TransformKind::Root)
        }
    }

    /// Scalar value transform
    pub fn values(values: Vec<f32>) -> Self {
        Self {
            values,
            ..Self::new(TransformKind::Values)
        }
    }

    /// Set interpolation mode
    pub fn with_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.interpolation = mode;
        self
    }

    /// Evaluate between this key and `next` at normalized time `t`.
    ///
    /// The curve is taken from this key's interpolation mode. String values
    /// never blend and are taken from this key.
    pub fn interpolate(&self, next: &TransformData, t: f32) -> TransformData {
        let t = self.interpolation.ease(t);
        if t <= 0.0 {
            return self.clone();
        }

        let position = match (self.position, next.position) {
            (Some(a), Some(b)) => Some(Interpolation::lerp_vec3(a, b, t)),
            (a, _) => a,
        };
        let rotation = match (self.rotation, next.rotation) {
            (Some(a), Some(b)) => Some(Interpolation::slerp(a, b, t)),
            (a, _) => a,
        };
        let scale = match (self.scale, next.scale) {
            (Some(a), Some(b)) => Some(Interpolation::lerp_vec3(a, b, t)),
            (a, _) => a,
        };
        let values = self
            .values
            .iter()
            .enumerate()
            .map(|(i, &a)| match next.values.get(i) {
                Some(&b) => Interpolation::lerp(a, b, t),
                None => a,
            })
            .collect();

        TransformData {
            kind: self.kind,
            position,
            rotation,
            scale,
            values,
            str_values: self.str_values.clone(),
            interpolation: self.interpolation,
        }
    }

    /// Mirror across the YZ plane: negate X translation and reflect the rotation.
    pub fn mirrored(&self) -> TransformData {
        let mut out = self.clone();
        if let Some(p) = &mut out.position {
            p[0] = -p[0];
        }
        if let Some(q) = &mut out.rotation {
            q[1] = -q[1];
            q[2] = -q[2];
        }
        out
    }
}

impl Default for TransformData {
    fn default() -> Self {
        Self::new(TransformKind::default())
    }
}

/// Left/right token pairs recognized by [`mirror_bone_name`]
const MIRROR_TOKENS: &[(&str, &str)] = &[
    ("Left", "Right"),
    ("left", "right"),
    ("_L", "_R"),
    (" L ", " R "),
    (".L", ".R"),
];

/// Swap the left/right marker in a bone name.
///
/// Names without a marker are returned unchanged. Only the first matching
/// token pair is swapped so that `Hand_L` maps to `Hand_R` and back.
pub fn mirror_bone_name(name: &str) -> String {
    for (left, right) in MIRROR_TOKENS {
        if let Some(pos) = name.rfind(left) {
            let mut out = String::with_capacity(name.len() + 1);
            out.push_str(&name[..pos]);
            out.push_str(right);
            out.push_str(&name[pos + left.len()..]);
            return out;
        }
        if let Some(pos) = name.rfind(right) {
            let mut out = String::with_capacity(name.len());
            out.push_str(&name[..pos]);
            out.push_str(left);
            out.push_str(&name[pos + right.len()..]);
            return out;
        }
    }
    name.to_string()
}

/// Interpolation utilities
pub struct Interpolation;

impl Interpolation {
    /// Identity quaternion
    pub const IDENTITY: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

    /// Linear interpolation between two floats
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Hermite smoothstep on `[0, 1]`
    pub fn smoothstep(t: f32) -> f32 {
        t * t * (3.0 - 2.0 * t)
    }

    /// Interpolate Vec3
    pub fn lerp_vec3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
        [
            Self::lerp(a[0], b[0], t),
            Self::lerp(a[1], b[1], t),
            Self::lerp(a[2], b[2], t),
        ]
    }

    /// Spherical linear interpolation for quaternions
    pub fn slerp(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
        let mut dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];

        // Take the short way round
        let b = if dot < 0.0 {
            dot = -dot;
            [-b[0], -b[1], -b[2], -b[3]]
        } else {
            b
        };

        if dot > 0.9995 {
            let result = [
                Self::lerp(a[0], b[0], t),
                Self::lerp(a[1], b[1], t),
                Self::lerp(a[2], b[2], t),
                Self::lerp(a[3], b[3], t),
            ];
            return Self::normalize_quat(result);
        }

        let theta_0 = dot.acos();
        let theta = theta_0 * t;
        let sin_theta = theta.sin();
        let sin_theta_0 = theta_0.sin();

        let s0 = theta.cos() - dot * sin_theta / sin_theta_0;
        let s1 = sin_theta / sin_theta_0;

        [
            s0 * a[0] + s1 * b[0],
            s0 * a[1] + s1 * b[1],
            s0 * a[2] + s1 * b[2],
            s0 * a[3] + s1 * b[3],
        ]
    }

    /// Normalize a quaternion, falling back to identity for zero length
    pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
        let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
        if len <= f32::EPSILON {
            return Self::IDENTITY;
        }
        [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
    }
}
