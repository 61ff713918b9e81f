//! Keyframe series
//!
//! A [`KeyframeSeries`] holds the timestamped values of a single property within one
//! animation node. Values are either literals or relative to the property's value before
//! the animation started.

use marionette_core::{AnimatableProperty, KeyframeSample};
use std::fmt;
use std::rc::Rc;

/// Value of a keyframe
pub enum KeyframeValue<V> {
    Literal(V),
    /// Resolved at render time against the property's pre-animation value.
    Relative(Rc<dyn Fn(&V) -> V>),
}

impl<V: AnimatableProperty> KeyframeValue<V> {
    pub fn relative(resolve: impl Fn(&V) -> V + 'static) -> Self {
        KeyframeValue::Relative(Rc::new(resolve))
    }

    pub fn resolve(&self, initial: &V) -> V {
        match self {
            KeyframeValue::Literal(value) => value.clone(),
            KeyframeValue::Relative(resolve) => resolve(initial),
        }
    }

    pub fn literal(&self) -> Option<&V> {
        match self {
            KeyframeValue::Literal(value) => Some(value),
            KeyframeValue::Relative(_) => None,
        }
    }

    /// Whether this is a literal marking an absent value.
    pub fn is_absent(&self) -> bool {
        self.literal().is_some_and(|value| value.is_absent())
    }
}

impl<V: Clone> Clone for KeyframeValue<V> {
    fn clone(&self) -> Self {
        match self {
            KeyframeValue::Literal(value) => KeyframeValue::Literal(value.clone()),
            KeyframeValue::Relative(resolve) => KeyframeValue::Relative(Rc::clone(resolve)),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for KeyframeValue<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyframeValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            KeyframeValue::Relative(_) => f.write_str("Relative(..)"),
        }
    }
}

/// A single keyframe
#[derive(Clone, Debug)]
pub struct Keyframe<V> {
    /// Position within the owning node's timeline (0.0 to 1.0)
    pub timestamp: f64,
    pub value: KeyframeValue<V>,
}

/// Non-empty, timestamp-ordered keyframes for one property
#[derive(Clone, Debug)]
pub struct KeyframeSeries<V> {
    keyframes: Vec<Keyframe<V>>,
    enabled: bool,
}

impl<V: AnimatableProperty> KeyframeSeries<V> {
    pub fn new(timestamp: f64, value: KeyframeValue<V>) -> Self {
        Self {
            keyframes: vec![Keyframe { timestamp, value }],
            enabled: true,
        }
    }

    /// Insert a keyframe, replacing any keyframe at the same timestamp.
    pub fn insert(&mut self, timestamp: f64, value: KeyframeValue<V>) {
        match self
            .keyframes
            .binary_search_by(|keyframe| keyframe.timestamp.total_cmp(&timestamp))
        {
            Ok(index) => self.keyframes[index].value = value,
            Err(index) => self.keyframes.insert(index, Keyframe { timestamp, value }),
        }
    }

    pub fn keyframes(&self) -> &[Keyframe<V>] {
        &self.keyframes
    }

    pub fn first(&self) -> &Keyframe<V> {
        &self.keyframes[0]
    }

    pub fn last(&self) -> &Keyframe<V> {
        &self.keyframes[self.keyframes.len() - 1]
    }

    pub fn first_mut(&mut self) -> &mut Keyframe<V> {
        &mut self.keyframes[0]
    }

    pub fn last_mut(&mut self) -> &mut Keyframe<V> {
        let last = self.keyframes.len() - 1;
        &mut self.keyframes[last]
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Value at `timestamp`, holding the boundary values outside the keyframed span.
    pub fn value_at(&self, timestamp: f64, initial: &V) -> V {
        let first = self.first();
        if timestamp <= first.timestamp {
            return first.value.resolve(initial);
        }
        let last = self.last();
        if timestamp >= last.timestamp {
            return last.value.resolve(initial);
        }

        // First keyframe strictly after `timestamp`; always in 1..len here.
        let next = self
            .keyframes
            .partition_point(|keyframe| keyframe.timestamp <= timestamp);
        let from = &self.keyframes[next - 1];
        let to = &self.keyframes[next];

        let span = to.timestamp - from.timestamp;
        let local = (timestamp - from.timestamp) / span;
        V::interpolate(&from.value.resolve(initial), &to.value.resolve(initial), local)
    }

    /// The keyframe value placed exactly at 0, if any.
    pub fn value_at_start(&self, initial: &V) -> Option<V> {
        let first = self.first();
        (first.timestamp == 0.0).then(|| first.value.resolve(initial))
    }

    /// Literal keyframes, or `None` if any keyframe is relative.
    pub fn literal_samples(&self) -> Option<Vec<KeyframeSample<V>>> {
        self.keyframes
            .iter()
            .map(|keyframe| {
                keyframe
                    .value
                    .literal()
                    .map(|value| KeyframeSample::new(keyframe.timestamp, value.clone()))
            })
            .collect()
    }

    /// Rebuild from literal samples. Returns `None` for an empty list.
    pub fn from_samples(samples: Vec<KeyframeSample<V>>, enabled: bool) -> Option<Self> {
        let mut samples = samples.into_iter();
        let first = samples.next()?;
        let mut series = Self::new(first.relative_timestamp, KeyframeValue::Literal(first.value));
        for sample in samples {
            series.insert(sample.relative_timestamp, KeyframeValue::Literal(sample.value));
        }
        series.enabled = enabled;
        Some(series)
    }
}
