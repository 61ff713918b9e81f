//! Type-erased keyframe series
//!
//! An animation node stores series of different value types in one map. Each entry is a
//! boxed [`AnimatedSeries`] bound to the root element type through a lens; series that
//! came from a child animation are wrapped in [`Rerooted`], which forwards every call
//! through the child's sub-element lens.

use crate::error::BlueprintError;
use crate::keyframe::{KeyframeSeries, KeyframeValue};
use marionette_core::{AnimatableProperty, KeyframeSequence, Lens, PropertyPath};
use smallvec::SmallVec;
use std::any::{self, Any, TypeId};

pub(crate) type Timestamps = SmallVec<[f64; 4]>;

/// Keyframes for one property of `E`, with the value type erased.
pub(crate) trait AnimatedSeries<E: 'static> {
    /// Resolved path from the root element.
    fn path(&self) -> &PropertyPath;

    fn value_type(&self) -> TypeId;

    fn value_type_name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Keyframe timestamps in this node's timeline.
    fn timestamps(&self) -> Timestamps;

    /// Snapshot of the property before the animation touches it.
    fn capture(&self, element: &E) -> Box<dyn Any>;

    /// Write the interpolated value at `timestamp`.
    fn apply(&self, element: &mut E, timestamp: f64, initial: &dyn Any);

    /// Write the keyframe at 0, or the captured value when there is none.
    fn apply_initial(&self, element: &mut E, initial: &dyn Any);

    /// Whether exactly one endpoint is absent.
    fn has_absent_endpoint(&self) -> bool;

    /// Replace a single absent endpoint with the faded opposite endpoint. Returns whether
    /// anything changed.
    fn synthesize_absent_endpoint(&mut self) -> bool;

    /// Editable payload, if every keyframe is a literal of an editable type.
    fn payload(&self) -> Option<KeyframeSequence>;

    fn check_payload(&self, payload: &KeyframeSequence) -> Result<(), BlueprintError>;

    fn replace_payload(&mut self, payload: &KeyframeSequence) -> Result<(), BlueprintError>;

    fn clone_box(&self) -> Box<dyn AnimatedSeries<E>>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A series declared directly against `E`.
pub(crate) struct PropertySeries<E: 'static, V: AnimatableProperty> {
    pub(crate) lens: Lens<E, V>,
    pub(crate) series: KeyframeSeries<V>,
}

impl<E: 'static, V: AnimatableProperty> PropertySeries<E, V> {
    pub(crate) fn new(lens: Lens<E, V>, timestamp: f64, value: KeyframeValue<V>) -> Self {
        Self {
            lens,
            series: KeyframeSeries::new(timestamp, value),
        }
    }

    fn decode(&self, payload: &KeyframeSequence) -> Result<KeyframeSeries<V>, BlueprintError> {
        let samples =
            V::decode_keyframes(payload).ok_or_else(|| BlueprintError::KeyframeTypeMismatch {
                series: self.lens.path().to_string(),
                expected: any::type_name::<V>(),
                found: payload.kind(),
            })?;
        KeyframeSeries::from_samples(samples, self.series.is_enabled())
            .ok_or_else(|| BlueprintError::EmptyKeyframeSeries(self.lens.path().to_string()))
    }
}

impl<E: 'static, V: AnimatableProperty> AnimatedSeries<E> for PropertySeries<E, V> {
    fn path(&self) -> &PropertyPath {
        self.lens.path()
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<V>()
    }

    fn value_type_name(&self) -> &'static str {
        any::type_name::<V>()
    }

    fn is_enabled(&self) -> bool {
        self.series.is_enabled()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.series.set_enabled(enabled);
    }

    fn timestamps(&self) -> Timestamps {
        self.series.keyframes().iter().map(|k| k.timestamp).collect()
    }

    fn capture(&self, element: &E) -> Box<dyn Any> {
        Box::new(self.lens.get(element).clone())
    }

    fn apply(&self, element: &mut E, timestamp: f64, initial: &dyn Any) {
        if let Some(initial) = initial.downcast_ref::<V>() {
            *self.lens.get_mut(element) = self.series.value_at(timestamp, initial);
        }
    }

    fn apply_initial(&self, element: &mut E, initial: &dyn Any) {
        if let Some(initial) = initial.downcast_ref::<V>() {
            let value = self
                .series
                .value_at_start(initial)
                .unwrap_or_else(|| initial.clone());
            *self.lens.get_mut(element) = value;
        }
    }

    fn has_absent_endpoint(&self) -> bool {
        self.series.first().value.is_absent() != self.series.last().value.is_absent()
    }

    fn synthesize_absent_endpoint(&mut self) -> bool {
        let first_absent = self.series.first().value.is_absent();
        let last_absent = self.series.last().value.is_absent();
        let (source, target) = match (first_absent, last_absent) {
            (true, false) => (self.series.last().value.clone(), self.series.first_mut()),
            (false, true) => (self.series.first().value.clone(), self.series.last_mut()),
            _ => return false,
        };
        target.value = KeyframeValue::relative(move |initial: &V| {
            V::faded_counterpart(&source.resolve(initial))
        });
        true
    }

    fn payload(&self) -> Option<KeyframeSequence> {
        V::encode_keyframes(self.series.literal_samples()?)
    }

    fn check_payload(&self, payload: &KeyframeSequence) -> Result<(), BlueprintError> {
        self.decode(payload).map(|_| ())
    }

    fn replace_payload(&mut self, payload: &KeyframeSequence) -> Result<(), BlueprintError> {
        self.series = self.decode(payload)?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn AnimatedSeries<E>> {
        Box::new(Self {
            lens: self.lens.clone(),
            series: self.series.clone(),
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A child's series, addressed from the parent's element through a sub-element lens.
pub(crate) struct Rerooted<E: 'static, S: 'static> {
    subelement: Lens<E, S>,
    path: PropertyPath,
    inner: Box<dyn AnimatedSeries<S>>,
}

impl<E: 'static, S: 'static> Rerooted<E, S> {
    pub(crate) fn new(subelement: Lens<E, S>, inner: Box<dyn AnimatedSeries<S>>) -> Self {
        Self {
            path: subelement.path().join(inner.path()),
            subelement,
            inner,
        }
    }
}

impl<E: 'static, S: 'static> AnimatedSeries<E> for Rerooted<E, S> {
    fn path(&self) -> &PropertyPath {
        &self.path
    }

    fn value_type(&self) -> TypeId {
        self.inner.value_type()
    }

    fn value_type_name(&self) -> &'static str {
        self.inner.value_type_name()
    }

    fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.inner.set_enabled(enabled);
    }

    fn timestamps(&self) -> Timestamps {
        self.inner.timestamps()
    }

    fn capture(&self, element: &E) -> Box<dyn Any> {
        self.inner.capture(self.subelement.get(element))
    }

    fn apply(&self, element: &mut E, timestamp: f64, initial: &dyn Any) {
        self.inner
            .apply(self.subelement.get_mut(element), timestamp, initial);
    }

    fn apply_initial(&self, element: &mut E, initial: &dyn Any) {
        self.inner
            .apply_initial(self.subelement.get_mut(element), initial);
    }

    fn has_absent_endpoint(&self) -> bool {
        self.inner.has_absent_endpoint()
    }

    fn synthesize_absent_endpoint(&mut self) -> bool {
        self.inner.synthesize_absent_endpoint()
    }

    fn payload(&self) -> Option<KeyframeSequence> {
        self.inner.payload()
    }

    fn check_payload(&self, payload: &KeyframeSequence) -> Result<(), BlueprintError> {
        self.inner.check_payload(payload)
    }

    fn replace_payload(&mut self, payload: &KeyframeSequence) -> Result<(), BlueprintError> {
        self.inner.replace_payload(payload)
    }

    fn clone_box(&self) -> Box<dyn AnimatedSeries<E>> {
        Box::new(Self {
            subelement: self.subelement.clone(),
            path: self.path.clone(),
            inner: self.inner.clone_box(),
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
