//! The closed set of atomic document edits.
//!
//! Every [`Step`] can be applied to a document, report the position changes it
//! causes, produce its inverse, be rebased through a mapping, and be merged
//! with an adjacent step of the same kind.

use super::map::{Mappable, StepMap};
use super::mark_step::{AddMarkStep, RemoveMarkStep};
use super::replace_step::{ReplaceAroundStep, ReplaceStep};
use crate::model::{
    JsonError, MarkJson, ModelError, Node, ReplaceError, Schema, Slice, SliceJson,
};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Replace(#[from] ReplaceError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("structure replace would overwrite content")]
    StructureOverwrite,
    #[error("structure gap-replace would overwrite content")]
    GapOverwrite,
    #[error("gap is not a flat range")]
    GapNotFlat,
    #[error("content does not fit in gap")]
    GapMismatch,
    #[error("step positions out of order")]
    InvalidRange,
}

/// The document a step produced, or why it could not be applied.
pub type StepResult = Result<Node, StepError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace(ReplaceStep),
    ReplaceAround(ReplaceAroundStep),
    AddMark(AddMarkStep),
    RemoveMark(RemoveMarkStep),
}

impl Step {
    /// The `stepType` name used in the JSON form.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Replace(_) => "replace",
            Step::ReplaceAround(_) => "replaceAround",
            Step::AddMark(_) => "addMark",
            Step::RemoveMark(_) => "removeMark",
        }
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        match self {
            Step::Replace(step) => step.apply(doc),
            Step::ReplaceAround(step) => step.apply(doc),
            Step::AddMark(step) => step.apply(doc),
            Step::RemoveMark(step) => step.apply(doc),
        }
    }

    /// Whether the step's positions are ordered. Steps built by a
    /// [`Transform`](super::Transform) always are; steps read from JSON are
    /// checked against this.
    pub fn valid_range(&self) -> bool {
        match self {
            Step::Replace(step) => step.valid_range(),
            Step::ReplaceAround(step) => step.valid_range(),
            Step::AddMark(step) => step.from <= step.to,
            Step::RemoveMark(step) => step.from <= step.to,
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace(step) => step.get_map(),
            Step::ReplaceAround(step) => step.get_map(),
            Step::AddMark(_) | Step::RemoveMark(_) => StepMap::empty(),
        }
    }

    /// The step that undoes this one. `doc` must be the document this step
    /// was applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, StepError> {
        Ok(match self {
            Step::Replace(step) => Step::Replace(step.invert(doc)?),
            Step::ReplaceAround(step) => Step::ReplaceAround(step.invert(doc)?),
            Step::AddMark(step) => Step::RemoveMark(step.invert()),
            Step::RemoveMark(step) => Step::AddMark(step.invert()),
        })
    }

    /// Rebase the step through `mapping`. `None` when the content it
    /// targeted was deleted.
    pub fn map(&self, mapping: &impl Mappable) -> Option<Step> {
        match self {
            Step::Replace(step) => step.map(mapping).map(Step::Replace),
            Step::ReplaceAround(step) => step.map(mapping).map(Step::ReplaceAround),
            Step::AddMark(step) => step.map(mapping).map(Step::AddMark),
            Step::RemoveMark(step) => step.map(mapping).map(Step::RemoveMark),
        }
    }

    /// Combine with a step applied directly after this one, when the two can
    /// be expressed as a single step.
    pub fn merge(&self, other: &Step) -> Option<Step> {
        match (self, other) {
            (Step::Replace(a), Step::Replace(b)) => a.merge(b).map(Step::Replace),
            (Step::AddMark(a), Step::AddMark(b)) => a.merge(b).map(Step::AddMark),
            (Step::RemoveMark(a), Step::RemoveMark(b)) => a.merge(b).map(Step::RemoveMark),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<Value, JsonError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Step, JsonError> {
        let step = StepJson::deserialize(value)?.into_step(schema)?;
        if !step.valid_range() {
            return Err(JsonError::InvalidStepRange);
        }
        Ok(step)
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "stepType", rename_all = "camelCase")]
enum StepJson {
    Replace {
        from: usize,
        to: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slice: Option<SliceJson>,
        #[serde(default, skip_serializing_if = "is_false")]
        structure: bool,
    },
    #[serde(rename_all = "camelCase")]
    ReplaceAround {
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        insert: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slice: Option<SliceJson>,
        #[serde(default, skip_serializing_if = "is_false")]
        structure: bool,
    },
    AddMark {
        from: usize,
        to: usize,
        mark: MarkJson,
    },
    RemoveMark {
        from: usize,
        to: usize,
        mark: MarkJson,
    },
}

fn slice_json(slice: &Slice) -> Option<SliceJson> {
    (slice.content().size() > 0).then(|| SliceJson::from(slice))
}

impl From<&Step> for StepJson {
    fn from(step: &Step) -> Self {
        match step {
            Step::Replace(s) => StepJson::Replace {
                from: s.from,
                to: s.to,
                slice: slice_json(&s.slice),
                structure: s.structure,
            },
            Step::ReplaceAround(s) => StepJson::ReplaceAround {
                from: s.from,
                to: s.to,
                gap_from: s.gap_from,
                gap_to: s.gap_to,
                insert: s.insert,
                slice: slice_json(&s.slice),
                structure: s.structure,
            },
            Step::AddMark(s) => StepJson::AddMark {
                from: s.from,
                to: s.to,
                mark: MarkJson::from(&s.mark),
            },
            Step::RemoveMark(s) => StepJson::RemoveMark {
                from: s.from,
                to: s.to,
                mark: MarkJson::from(&s.mark),
            },
        }
    }
}

impl StepJson {
    fn into_step(self, schema: &Schema) -> Result<Step, JsonError> {
        let slice = |json: Option<SliceJson>| -> Result<Slice, JsonError> {
            json.map_or_else(|| Ok(Slice::empty()), |s| s.into_slice(schema))
        };
        Ok(match self {
            StepJson::Replace {
                from,
                to,
                slice: json,
                structure,
            } => Step::Replace(ReplaceStep::new(from, to, slice(json)?, structure)),
            StepJson::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                insert,
                slice: json,
                structure,
            } => Step::ReplaceAround(ReplaceAroundStep::new(
                from,
                to,
                gap_from,
                gap_to,
                slice(json)?,
                insert,
                structure,
            )),
            StepJson::AddMark { from, to, mark } => {
                Step::AddMark(AddMarkStep::new(from, to, mark.into_mark(schema)?))
            }
            StepJson::RemoveMark { from, to, mark } => {
                Step::RemoveMark(RemoveMarkStep::new(from, to, mark.into_mark(schema)?))
            }
        })
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StepJson::from(self).serialize(serializer)
    }
}
