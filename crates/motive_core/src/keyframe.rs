//! Keyframe data
//!
//! A keyframe is an offset-tagged snapshot of property values. Sequences
//! are plain data: they carry no timing and no behavior beyond the
//! reordering helpers a motion needs (sort, reverse, offset resolution).

use crate::easing::Easing;
use crate::error::{MotionError, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to an animatable subject
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target:{}", self.0)
    }
}

/// Properties that can be animated
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimatableProperty {
    Width,
    Height,
    Transform,
    Opacity,
    BackgroundColor,
    BorderRadius,
    Margin,
    Padding,
    Border,
}

impl AnimatableProperty {
    pub fn name(self) -> &'static str {
        match self {
            AnimatableProperty::Width => "width",
            AnimatableProperty::Height => "height",
            AnimatableProperty::Transform => "transform",
            AnimatableProperty::Opacity => "opacity",
            AnimatableProperty::BackgroundColor => "background-color",
            AnimatableProperty::BorderRadius => "border-radius",
            AnimatableProperty::Margin => "margin",
            AnimatableProperty::Padding => "padding",
            AnimatableProperty::Border => "border",
        }
    }

    /// Value rendered when nothing has been set
    pub fn initial_value(self) -> PropertyValue {
        match self {
            AnimatableProperty::Opacity => PropertyValue::Number(1.0),
            AnimatableProperty::BorderRadius
            | AnimatableProperty::Margin
            | AnimatableProperty::Padding => PropertyValue::Number(0.0),
            AnimatableProperty::Width | AnimatableProperty::Height => "auto".into(),
            AnimatableProperty::Transform | AnimatableProperty::Border => "none".into(),
            AnimatableProperty::BackgroundColor => "transparent".into(),
        }
    }
}

impl fmt::Display for AnimatableProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of an animatable property
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Numeric value, interpolated linearly
    Number(f32),
    /// Anything else (`"300px"`, `"rotate(40deg)"`), switched discretely
    Keyword(String),
}

impl PropertyValue {
    /// Interpolate toward `to` at eased progress `t`
    ///
    /// Numbers blend; mixed or keyword pairs flip at the midpoint.
    pub fn interpolate(&self, to: &PropertyValue, t: f32) -> PropertyValue {
        match (self, to) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => {
                PropertyValue::Number(a + (b - a) * t)
            }
            _ if t < 0.5 => self.clone(),
            _ => to.clone(),
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            PropertyValue::Keyword(_) => None,
        }
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value as f32)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Keyword(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Keyword(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Keyword(s) => f.write_str(s),
        }
    }
}

/// A snapshot of property values at a point in a timeline
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Position in the timeline (0.0 to 1.0), `None` lets the driver space it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f32>,
    /// Easing applied to the segment that starts at this keyframe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
    #[serde(flatten)]
    pub properties: IndexMap<AnimatableProperty, PropertyValue>,
}

impl Keyframe {
    /// Keyframe pinned at `offset`
    pub fn at(offset: f32) -> Self {
        Self {
            offset: Some(offset),
            ..Default::default()
        }
    }

    /// Keyframe whose offset is left to the driver
    pub fn implicit() -> Self {
        Self::default()
    }

    /// Builder: set a property value
    pub fn set(mut self, property: AnimatableProperty, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(property, value.into());
        self
    }

    /// Builder: set segment easing
    pub fn ease(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }

    pub fn get(&self, property: AnimatableProperty) -> Option<&PropertyValue> {
        self.properties.get(&property)
    }
}

/// Ordered list of keyframes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyframeSequence(Vec<Keyframe>);

impl KeyframeSequence {
    pub fn new(frames: Vec<Keyframe>) -> Self {
        Self(frames)
    }

    pub fn frames(&self) -> &[Keyframe] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keyframe> {
        self.0.iter()
    }

    /// Every property referenced anywhere in the sequence, in first-seen order
    pub fn properties(&self) -> IndexSet<AnimatableProperty> {
        self.0
            .iter()
            .flat_map(|frame| frame.properties.keys().copied())
            .collect()
    }

    /// Whether the first keyframe sits exactly at offset 0
    pub fn has_start_frame(&self) -> bool {
        self.0.first().and_then(|frame| frame.offset) == Some(0.0)
    }

    /// Stable sort by ascending offset, a missing offset sorts as 0
    pub fn sorted_by_offset(&self) -> KeyframeSequence {
        let mut frames = self.0.clone();
        frames.sort_by(|a, b| a.offset.unwrap_or(0.0).total_cmp(&b.offset.unwrap_or(0.0)));
        KeyframeSequence(frames)
    }

    /// Traverse back to front, mirroring each explicit offset (`o ↦ 1 − o`)
    ///
    /// Keyframes without an explicit offset keep `None` and are therefore
    /// not time-mirrored.
    pub fn reversed(&self) -> KeyframeSequence {
        let frames = self
            .0
            .iter()
            .rev()
            .map(|frame| Keyframe {
                offset: frame.offset.map(|o| 1.0 - o),
                ..frame.clone()
            })
            .collect();
        KeyframeSequence(frames)
    }

    /// Prepend a keyframe
    pub fn with_start_frame(&self, start: Keyframe) -> KeyframeSequence {
        let mut frames = Vec::with_capacity(self.0.len() + 1);
        frames.push(start);
        frames.extend(self.0.iter().cloned());
        KeyframeSequence(frames)
    }

    /// Resolve missing offsets: a lone frame lands at 1, otherwise the
    /// first defaults to 0, the last to 1, and interior gaps are spaced
    /// evenly between their explicit neighbours.
    pub fn computed_offsets(&self) -> Vec<f32> {
        let len = self.0.len();
        let mut offsets: Vec<Option<f32>> = self.0.iter().map(|frame| frame.offset).collect();

        match len {
            0 => return Vec::new(),
            1 => return vec![offsets[0].unwrap_or(1.0)],
            _ => {
                offsets[0].get_or_insert(0.0);
                offsets[len - 1].get_or_insert(1.0);
            }
        }

        let mut resolved = Vec::with_capacity(len);
        let mut last_known = 0;
        resolved.push(offsets[0].unwrap_or(0.0));

        for idx in 1..len {
            let Some(offset) = offsets[idx] else {
                resolved.push(0.0);
                continue;
            };

            let gap = idx - last_known;
            if gap > 1 {
                let start = resolved[last_known];
                for (step, slot) in resolved[last_known + 1..idx].iter_mut().enumerate() {
                    *slot = start + (offset - start) * (step + 1) as f32 / gap as f32;
                }
            }
            resolved.push(offset);
            last_known = idx;
        }

        resolved
    }

    /// Non-empty, and every explicit offset is a finite value in [0, 1]
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(MotionError::configuration("keyframe sequence is empty"));
        }

        for (idx, frame) in self.0.iter().enumerate() {
            if let Some(offset) = frame.offset {
                if !offset.is_finite() || !(0.0..=1.0).contains(&offset) {
                    return Err(MotionError::configuration(format!(
                        "keyframe {idx} has offset {offset}, expected a value in [0, 1]"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl From<Vec<Keyframe>> for KeyframeSequence {
    fn from(frames: Vec<Keyframe>) -> Self {
        Self(frames)
    }
}

impl FromIterator<Keyframe> for KeyframeSequence {
    fn from_iter<I: IntoIterator<Item = Keyframe>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KeyframeSequence {
    type Item = &'a Keyframe;
    type IntoIter = std::slice::Iter<'a, Keyframe>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
