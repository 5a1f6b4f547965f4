//! Steps, position mapping, and the [`Transform`] accumulator.
//!
//! A [`Transform`] starts from a document and records every [`Step`]
//! applied to it, the document before each step, and a [`Mapping`] through
//! all of them. The higher-level methods (`replace`, `split`, `lift`,
//! `add_mark`, ...) compute steps against the current document and apply
//! them through [`Transform::step`].
//!
//! ```
//! use richdoc::{Schema, SchemaSpec, Transform};
//!
//! let schema = Schema::new(SchemaSpec::basic()).unwrap();
//! let text = schema.text("foobar", vec![]).unwrap();
//! let para = schema.node("paragraph", None, text, vec![]).unwrap();
//! let doc = schema.node("doc", None, para, vec![]).unwrap();
//!
//! let mut tr = Transform::new(doc);
//! tr.split(4, 1, None).unwrap();
//! assert_eq!(tr.doc().to_string(), r#"doc(paragraph("foo"), paragraph("bar"))"#);
//! ```

mod map;
mod mark;
mod mark_step;
mod replace;
mod replace_step;
mod step;
mod structure;

pub use map::{Assoc, MapRange, MapResult, Mappable, Mapping, Recover, StepMap};
pub use mark::MarkFilter;
pub use mark_step::{AddMarkStep, RemoveMarkStep};
pub use replace::replace_step;
pub use replace_step::{ReplaceAroundStep, ReplaceStep};
pub use step::{Step, StepError, StepResult};
pub use structure::{
    Direction, Wrapper, block_range, can_join, can_split, find_wrapping, insert_point,
    join_point, lift_target,
};

use crate::model::{
    Attrs, ContentMatch, Fragment, Mark, ModelError, Node, NodeRange, NodeType, SchemaError, Slice,
};
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },
    #[error("no node at position {0}")]
    NoNodeAt(usize),
    #[error("{0} is not a textblock type")]
    NotTextblock(String),
    #[error("wrapper {0} does not accept the wrappers inside it")]
    InvalidWrapper(String),
    #[error("depth out of range")]
    InvalidDepth,
    #[error("no valid way to fit the content into {from}..{to}")]
    CannotFit { from: usize, to: usize },
}

/// An edit in progress: the current document, the steps that produced it,
/// and the mapping through those steps.
#[derive(Debug, Clone)]
pub struct Transform {
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
}

impl Transform {
    pub fn new(doc: Node) -> Self {
        Self {
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// The current document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document this transform started from.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The document before each step, parallel to [`Transform::steps`].
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply a step, failing without changes when it does not apply.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransformError> {
        let doc = step.apply(&self.doc)?;
        self.add_step(step, doc);
        Ok(self)
    }

    /// Apply a step if it applies, returning the raw result either way.
    pub fn maybe_step(&mut self, step: Step) -> StepResult {
        let doc = step.apply(&self.doc)?;
        self.add_step(step, doc.clone());
        Ok(doc)
    }

    fn add_step(&mut self, step: Step, doc: Node) {
        self.docs.push(std::mem::replace(&mut self.doc, doc));
        self.mapping.append_map(step.get_map(), None);
        debug!(kind = step.kind(), steps = self.steps.len() + 1, "applied step");
        self.steps.push(step);
    }

    /// Run `f`, rolling back every step it applied if it fails.
    fn atomic<F>(&mut self, f: F) -> Result<&mut Self, TransformError>
    where
        F: FnOnce(&mut Self) -> Result<(), TransformError>,
    {
        let len = self.steps.len();
        let doc = self.doc.clone();
        match f(self) {
            Ok(()) => Ok(self),
            Err(err) => {
                if self.steps.len() > len {
                    trace!(rolled_back = self.steps.len() - len, %err, "rolling back");
                }
                self.steps.truncate(len);
                self.docs.truncate(len);
                self.mapping.truncate(len);
                self.doc = doc;
                Err(err)
            }
        }
    }

    /// Replace `from..to` with `slice`, fitting it into the document.
    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, TransformError> {
        if let Some(step) = replace_step(&self.doc, from, to, slice)? {
            self.step(step)?;
        }
        Ok(self)
    }

    pub fn replace_with(
        &mut self,
        from: usize,
        to: usize,
        content: impl Into<Fragment>,
    ) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::new(content.into(), 0, 0))
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.replace(from, to, Slice::empty())
    }

    pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> Result<&mut Self, TransformError> {
        self.replace_with(pos, pos, content)
    }

    /// Like [`Transform::replace`], but widens the range over parent nodes
    /// the slice's open nodes can take the place of.
    pub fn replace_range(&mut self, from: usize, to: usize, slice: Slice) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| replace::replace_range(tr, from, to, slice))
    }

    pub fn replace_range_with(&mut self, from: usize, to: usize, node: Node) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| replace::replace_range_with(tr, from, to, node))
    }

    pub fn delete_range(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| replace::delete_range(tr, from, to))
    }

    /// Move the content of `range` out of its ancestors down to `target`,
    /// usually found with [`lift_target`].
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| structure::lift(tr, range, target))
    }

    /// Join the blocks around `pos`, `depth` levels deep.
    pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| structure::join(tr, pos, depth))
    }

    /// Wrap `range` in the given wrappers, outermost first, usually found
    /// with [`find_wrapping`].
    pub fn wrap(&mut self, range: &NodeRange, wrappers: &[Wrapper]) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| structure::wrap(tr, range, wrappers))
    }

    pub fn set_block_type(
        &mut self,
        from: usize,
        to: usize,
        node_type: &NodeType,
        attrs: Option<&Attrs>,
    ) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| structure::set_block_type(tr, from, to, node_type, attrs))
    }

    /// Change the type and attributes of the node at `pos`. `None` keeps the
    /// current type.
    pub fn set_node_type(
        &mut self,
        pos: usize,
        node_type: Option<&NodeType>,
        attrs: Option<&Attrs>,
    ) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| structure::set_node_type(tr, pos, node_type, attrs))
    }

    /// Split the node at `pos`, `depth` levels deep. See [`can_split`] for
    /// the meaning of `types_after`.
    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        types_after: Option<&[Option<Wrapper>]>,
    ) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| structure::split(tr, pos, depth, types_after))
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| mark::add_mark(tr, from, to, &mark))
    }

    pub fn remove_mark(
        &mut self,
        from: usize,
        to: usize,
        filter: impl Into<MarkFilter>,
    ) -> Result<&mut Self, TransformError> {
        let filter = filter.into();
        self.atomic(|tr| mark::remove_mark(tr, from, to, &filter))
    }

    /// Strip content and marks of the node at `pos` that a node of
    /// `parent_type` would not allow.
    pub fn clear_incompatible(
        &mut self,
        pos: usize,
        parent_type: &NodeType,
        matcher: Option<ContentMatch>,
    ) -> Result<&mut Self, TransformError> {
        self.atomic(|tr| mark::clear_incompatible(tr, pos, parent_type, matcher))
    }
}
