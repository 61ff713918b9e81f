//! Animatable values
//!
//! Every value a keyframe can hold implements [`AnimatableProperty`], which tells the
//! engine how to blend two values at a given progress. Value types that the stage tooling
//! can edit additionally convert their keyframes to and from a [`KeyframeSequence`].

use serde::{Deserialize, Serialize};

/// The contract a value must satisfy to be animated.
pub trait AnimatableProperty: Clone + 'static {
    /// Blend `from` and `to` at `progress`.
    ///
    /// Progress is usually within `[0, 1]`, but curves such as springs overshoot, so
    /// implementations should extrapolate sensibly.
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Self;

    /// Whether this value represents an absent endpoint that the optimizer may replace
    /// with a faded counterpart of the opposite endpoint.
    fn is_absent(&self) -> bool {
        false
    }

    /// The value an absent endpoint should take, given the value at the opposite end.
    fn faded_counterpart(present: &Self) -> Self {
        present.clone()
    }

    /// Convert literal keyframes into an editable sequence, if this type supports editing.
    fn encode_keyframes(_samples: Vec<KeyframeSample<Self>>) -> Option<KeyframeSequence> {
        None
    }

    /// Extract keyframes of this type from an edited sequence. `None` when the sequence
    /// holds a different value type.
    fn decode_keyframes(_sequence: &KeyframeSequence) -> Option<Vec<KeyframeSample<Self>>> {
        None
    }
}

/// A literal keyframe as exchanged with the stage tooling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeSample<V> {
    pub relative_timestamp: f64,
    pub value: V,
}

impl<V> KeyframeSample<V> {
    pub fn new(relative_timestamp: f64, value: V) -> Self {
        Self {
            relative_timestamp,
            value,
        }
    }
}

/// Keyframe payload of an editable series, tagged by value type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyframeSequence {
    Double(Vec<KeyframeSample<f64>>),
    Float(Vec<KeyframeSample<f32>>),
    Color(Vec<KeyframeSample<Option<Color>>>),
}

impl KeyframeSequence {
    /// Name of the value type carried by this payload.
    pub fn kind(&self) -> &'static str {
        match self {
            KeyframeSequence::Double(_) => "double",
            KeyframeSequence::Float(_) => "float",
            KeyframeSequence::Color(_) => "color",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            KeyframeSequence::Double(samples) => samples.len(),
            KeyframeSequence::Float(samples) => samples.len(),
            KeyframeSequence::Color(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lerp(from: f64, to: f64, progress: f64) -> f64 {
    from + (to - from) * progress
}

impl AnimatableProperty for f64 {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Self {
        lerp(*from, *to, progress)
    }

    fn encode_keyframes(samples: Vec<KeyframeSample<Self>>) -> Option<KeyframeSequence> {
        Some(KeyframeSequence::Double(samples))
    }

    fn decode_keyframes(sequence: &KeyframeSequence) -> Option<Vec<KeyframeSample<Self>>> {
        match sequence {
            KeyframeSequence::Double(samples) => Some(samples.clone()),
            _ => None,
        }
    }
}

impl AnimatableProperty for f32 {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Self {
        lerp(*from as f64, *to as f64, progress) as f32
    }

    fn encode_keyframes(samples: Vec<KeyframeSample<Self>>) -> Option<KeyframeSequence> {
        Some(KeyframeSequence::Float(samples))
    }

    fn decode_keyframes(sequence: &KeyframeSequence) -> Option<Vec<KeyframeSample<Self>>> {
        match sequence {
            KeyframeSequence::Float(samples) => Some(samples.clone()),
            _ => None,
        }
    }
}

/// A 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl AnimatableProperty for Point {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Self {
        Point::new(
            lerp(from.x, to.x, progress),
            lerp(from.y, to.y, progress),
        )
    }
}

/// RGBA color with straight (non-premultiplied) components in `[0, 1]`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl AnimatableProperty for Color {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Self {
        Color::rgba(
            f32::interpolate(&from.r, &to.r, progress),
            f32::interpolate(&from.g, &to.g, progress),
            f32::interpolate(&from.b, &to.b, progress),
            f32::interpolate(&from.a, &to.a, progress),
        )
    }
}

/// An optional color blends component-wise when both ends are present and switches at the
/// halfway point otherwise.
impl AnimatableProperty for Option<Color> {
    fn interpolate(from: &Self, to: &Self, progress: f64) -> Self {
        match (from, to) {
            (Some(from), Some(to)) => Some(Color::interpolate(from, to, progress)),
            _ if progress > 0.5 => *to,
            _ => *from,
        }
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn faded_counterpart(present: &Self) -> Self {
        present.map(|color| color.with_alpha(0.0))
    }

    fn encode_keyframes(samples: Vec<KeyframeSample<Self>>) -> Option<KeyframeSequence> {
        Some(KeyframeSequence::Color(samples))
    }

    fn decode_keyframes(sequence: &KeyframeSequence) -> Option<Vec<KeyframeSample<Self>>> {
        match sequence {
            KeyframeSequence::Color(samples) => Some(samples.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_interpolation_extrapolates() {
        assert_eq!(f64::interpolate(&10.0, &20.0, 0.5), 15.0);
        assert_eq!(f64::interpolate(&10.0, &20.0, 1.5), 25.0);
        assert_eq!(f32::interpolate(&0.0, &4.0, 0.25), 1.0);
    }

    #[test]
    fn test_color_interpolates_components() {
        let mid = Color::interpolate(&Color::BLACK, &Color::WHITE.with_alpha(0.0), 0.5);
        assert_eq!(mid, Color::rgba(0.5, 0.5, 0.5, 0.5));
    }

    #[test]
    fn test_optional_color_hard_cut_when_absent() {
        let red = Some(Color::RED);
        assert_eq!(Option::<Color>::interpolate(&red, &None, 0.5), red);
        assert_eq!(Option::<Color>::interpolate(&red, &None, 0.51), None);
        assert_eq!(Option::<Color>::interpolate(&None, &red, 0.75), red);
        assert_eq!(
            Option::<Color>::interpolate(&Some(Color::BLACK), &Some(Color::WHITE), 1.0),
            Some(Color::WHITE)
        );
    }

    #[test]
    fn test_faded_counterpart_zeroes_alpha() {
        let faded = Option::<Color>::faded_counterpart(&Some(Color::BLUE));
        assert_eq!(faded, Some(Color::BLUE.with_alpha(0.0)));
        assert!(None::<Color>.is_absent());
        assert!(!Some(Color::BLUE).is_absent());
        assert!(!1.0f64.is_absent());
    }

    #[test]
    fn test_keyframe_sequence_decodes_only_matching_type() {
        let sequence = f64::encode_keyframes(vec![KeyframeSample::new(0.5, 2.0)]).unwrap();
        assert_eq!(sequence.kind(), "double");
        assert_eq!(sequence.len(), 1);
        assert!(f32::decode_keyframes(&sequence).is_none());
        assert!(Option::<Color>::decode_keyframes(&sequence).is_none());
        assert_eq!(f64::decode_keyframes(&sequence).unwrap()[0].value, 2.0);
        assert!(Point::encode_keyframes(vec![KeyframeSample::new(0.0, Point::ZERO)]).is_none());
    }
}
