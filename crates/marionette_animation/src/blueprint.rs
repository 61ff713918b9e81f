//! Serializable animation blueprints
//!
//! A blueprint mirrors the public shape of an [`Animation`] so remote tooling can inspect
//! it and send back edits. Every entry carries the token of the live entry it describes.
//!
//! Only two kinds of edit merge back into a live animation: enable flags, and the
//! keyframe payload of a managed series (one whose keyframes are all literals of an
//! editable value type). Anything else is a structural edit and is rejected before any
//! change is made.

use crate::animation::{Animation, RepeatStyle};
use crate::curve::{CubicBezier, Curve};
use crate::error::BlueprintError;
use crate::spring::SpringCurve;
use crate::token::{AnimationToken, ChildToken, ExecutionToken, SeriesToken};
use marionette_core::KeyframeSequence;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Identity of an animation curve
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveDescriptor {
    Linear,
    ParabolicEaseIn,
    ParabolicEaseOut,
    SinusoidalEaseInEaseOut,
    CubicBezier(CubicBezier),
    Spring(SpringCurve),
    /// A user-supplied curve, opaque to tooling.
    Custom,
}

impl From<&Curve> for CurveDescriptor {
    fn from(curve: &Curve) -> Self {
        match curve {
            Curve::Linear => CurveDescriptor::Linear,
            Curve::ParabolicEaseIn => CurveDescriptor::ParabolicEaseIn,
            Curve::ParabolicEaseOut => CurveDescriptor::ParabolicEaseOut,
            Curve::SinusoidalEaseInEaseOut => CurveDescriptor::SinusoidalEaseInEaseOut,
            Curve::CubicBezier(bezier) => CurveDescriptor::CubicBezier(*bezier),
            Curve::Spring(spring) => CurveDescriptor::Spring(*spring),
            Curve::Custom(_) => CurveDescriptor::Custom,
        }
    }
}

/// An editable keyframe series
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedSeriesBlueprint {
    pub id: SeriesToken,
    /// Property path from the root element.
    pub name: String,
    pub enabled: bool,
    pub keyframes: KeyframeSequence,
}

/// A series whose keyframes tooling can toggle but not edit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmanagedSeriesBlueprint {
    pub id: SeriesToken,
    pub name: String,
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionBlueprint {
    pub id: ExecutionToken,
    pub name: String,
    pub timestamp: f64,
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildBlueprint {
    pub id: ChildToken,
    /// Sub-element path from the root element.
    pub name: String,
    pub enabled: bool,
    pub relative_start: f64,
    pub relative_duration: f64,
    pub animation: AnimationBlueprint,
}

/// Serializable description of an animation tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationBlueprint {
    pub id: AnimationToken,
    pub implicit_duration: f64,
    pub implicit_repeat_style: RepeatStyle,
    pub curve: CurveDescriptor,
    #[serde(default)]
    pub managed_keyframe_series: Vec<ManagedSeriesBlueprint>,
    #[serde(default)]
    pub unmanaged_keyframe_series: Vec<UnmanagedSeriesBlueprint>,
    #[serde(default)]
    pub execution_blocks: Vec<ExecutionBlueprint>,
    #[serde(default)]
    pub children: Vec<ChildBlueprint>,
}

impl AnimationBlueprint {
    /// Number of nodes in the described tree.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.animation.node_count())
            .sum::<usize>()
    }
}

fn structural(what: impl Into<String>) -> BlueprintError {
    BlueprintError::StructuralEdit(what.into())
}

impl<E: 'static> Animation<E> {
    /// Describe this animation for remote tooling.
    pub fn blueprint(&self) -> AnimationBlueprint {
        let mut managed_keyframe_series = Vec::new();
        let mut unmanaged_keyframe_series = Vec::new();
        for (path, entry) in &self.series {
            let name = path.to_string();
            let enabled = entry.series.is_enabled();
            match entry.series.payload() {
                Some(keyframes) => managed_keyframe_series.push(ManagedSeriesBlueprint {
                    id: entry.token,
                    name,
                    enabled,
                    keyframes,
                }),
                None => unmanaged_keyframe_series.push(UnmanagedSeriesBlueprint {
                    id: entry.token,
                    name,
                    enabled,
                }),
            }
        }

        AnimationBlueprint {
            id: self.token,
            implicit_duration: self.implicit_duration,
            implicit_repeat_style: self.implicit_repeat_style,
            curve: CurveDescriptor::from(&self.curve),
            managed_keyframe_series,
            unmanaged_keyframe_series,
            execution_blocks: self
                .execution_blocks
                .iter()
                .map(|block| ExecutionBlueprint {
                    id: block.token,
                    name: format!("execution@{:.3}", block.timestamp),
                    timestamp: block.timestamp,
                    enabled: block.enabled,
                })
                .collect(),
            children: self
                .children
                .iter()
                .map(|child| ChildBlueprint {
                    id: child.token,
                    name: child.subelement.to_string(),
                    enabled: child.enabled,
                    relative_start: child.relative_start,
                    relative_duration: child.relative_duration,
                    animation: child.animation.blueprint(),
                })
                .collect(),
        }
    }

    /// Merge an edited blueprint into this animation.
    ///
    /// The whole edit is validated first; on error nothing changes.
    pub fn merge_blueprint(
        &mut self,
        blueprint: &AnimationBlueprint,
    ) -> Result<(), BlueprintError> {
        if let Err(error) = self.validate_edit(blueprint) {
            warn!("Rejected edit of {}: {error}", self.token);
            return Err(error);
        }
        self.apply_edit(blueprint)?;
        debug!("Merged edit of {} ({} nodes)", self.token, blueprint.node_count());
        Ok(())
    }

    fn validate_edit(&self, blueprint: &AnimationBlueprint) -> Result<(), BlueprintError> {
        if blueprint.id != self.token {
            return Err(structural(format!(
                "expected animation {}, found {}",
                self.token, blueprint.id
            )));
        }
        if blueprint.implicit_duration != self.implicit_duration {
            return Err(structural(format!("implicit duration of {}", self.token)));
        }
        if blueprint.implicit_repeat_style != self.implicit_repeat_style {
            return Err(structural(format!("implicit repeat style of {}", self.token)));
        }
        if blueprint.curve != CurveDescriptor::from(&self.curve) {
            return Err(structural(format!("curve of {}", self.token)));
        }

        let described =
            blueprint.managed_keyframe_series.len() + blueprint.unmanaged_keyframe_series.len();
        if described != self.series.len() {
            return Err(structural(format!(
                "{} has {} keyframe series, edit describes {described}",
                self.token,
                self.series.len()
            )));
        }
        for (path, entry) in &self.series {
            let name = path.to_string();
            let managed = blueprint
                .managed_keyframe_series
                .iter()
                .find(|series| series.id == entry.token);
            let unmanaged = blueprint
                .unmanaged_keyframe_series
                .iter()
                .find(|series| series.id == entry.token);
            match (managed, unmanaged, entry.series.payload().is_some()) {
                (Some(edit), None, true) if edit.name == name => {
                    entry.series.check_payload(&edit.keyframes)?
                }
                (None, Some(edit), false) if edit.name == name => {}
                _ => return Err(structural(format!("keyframe series {} ({name})", entry.token))),
            }
        }

        if blueprint.execution_blocks.len() != self.execution_blocks.len() {
            return Err(structural(format!("execution blocks of {}", self.token)));
        }
        for block in &self.execution_blocks {
            match blueprint.execution_blocks.iter().find(|edit| edit.id == block.token) {
                Some(edit) if edit.timestamp == block.timestamp => {}
                _ => return Err(structural(format!("execution block {}", block.token))),
            }
        }

        if blueprint.children.len() != self.children.len() {
            return Err(structural(format!("children of {}", self.token)));
        }
        for child in &self.children {
            let edit = blueprint
                .children
                .iter()
                .find(|edit| edit.id == child.token)
                .ok_or_else(|| structural(format!("child {}", child.token)))?;
            if edit.name != child.subelement.to_string()
                || edit.relative_start != child.relative_start
                || edit.relative_duration != child.relative_duration
            {
                return Err(structural(format!("placement of child {}", child.token)));
            }
            child.animation.validate_edit(&edit.animation)?;
        }
        Ok(())
    }

    fn apply_edit(&mut self, blueprint: &AnimationBlueprint) -> Result<(), BlueprintError> {
        for entry in self.series.values_mut() {
            if let Some(edit) = blueprint
                .managed_keyframe_series
                .iter()
                .find(|series| series.id == entry.token)
            {
                entry.series.replace_payload(&edit.keyframes)?;
                entry.series.set_enabled(edit.enabled);
            } else if let Some(edit) = blueprint
                .unmanaged_keyframe_series
                .iter()
                .find(|series| series.id == entry.token)
            {
                entry.series.set_enabled(edit.enabled);
            }
        }

        for block in &mut self.execution_blocks {
            let edit = blueprint
                .execution_blocks
                .iter()
                .find(|edit| edit.id == block.token);
            if let Some(edit) = edit {
                block.enabled = edit.enabled;
            }
        }

        for child in &mut self.children {
            if let Some(edit) = blueprint.children.iter().find(|edit| edit.id == child.token) {
                child.enabled = edit.enabled;
                child.animation.apply_edit(&edit.animation)?;
            }
        }
        Ok(())
    }
}
