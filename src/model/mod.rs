//! Schema-constrained document model.
//!
//! This module provides the immutable tree values that edit steps operate on:
//!
//! - [`Schema`], [`NodeType`], [`MarkType`] - the document grammar, built from a
//!   serializable [`SchemaSpec`]
//! - [`ContentMatch`] - compiled content expressions used to validate children
//! - [`Node`] and [`Fragment`] - structurally shared tree values
//! - [`Mark`] - inline formatting attached to text and inline nodes
//! - [`ResolvedPos`] and [`NodeRange`] - transient views of a position's ancestry
//! - [`Slice`] - a fragment cut out of a document, possibly open at its edges
//!
//! Positions count one unit per `char` of text, one unit per leaf node, and two
//! units (opening and closing token) around the content of every other node.

mod content;
mod fragment;
mod json;
mod mark;
mod node;
mod replace;
mod resolved;
mod schema;
mod slice;

pub use content::ContentMatch;
pub use fragment::Fragment;
pub use json::JsonError;
pub use mark::Mark;
pub use node::Node;
pub use replace::ReplaceError;
pub use resolved::{NodeRange, ResolvedPos};
pub use schema::{
    AttributeSpec, Attrs, MarkSpec, MarkType, NodeSpec, NodeType, Schema, SchemaError, SchemaSpec,
};
pub use slice::Slice;

pub(crate) use json::{MarkJson, SliceJson};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("position {pos} out of range (document size {size})")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("invalid content for node {0}")]
    InvalidContent(String),
    #[error("invalid collection of marks for node {0}")]
    InvalidMarks(String),
    #[error("empty text nodes are not allowed")]
    EmptyText,
    #[error("removing non-flat range")]
    NonFlatRange,
    #[error("invalid range {from}..{to}")]
    InvalidRange { from: usize, to: usize },
}
