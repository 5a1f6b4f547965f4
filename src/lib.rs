//! richdoc: a transactional edit engine for schema-constrained rich-text documents.
//!
//! Documents are immutable trees validated against a [`Schema`]. Edits are
//! expressed as invertible [`Step`]s, each carrying a [`StepMap`] that lets
//! positions recorded before the edit be mapped to the document after it.
//!
//! - **Document model** - schema, content expressions, nodes, marks, slices
//! - **Steps** - add/remove mark, replace, and replace-around
//! - **Mapping** - composable position maps with deletion tracking
//! - **Transform** - an accumulator with structural helpers (split, join,
//!   lift, wrap, set block type) and the slice-fitting replace algorithm
//!
//! # Quick Start
//!
//! ```rust
//! use richdoc::{Assoc, Mappable, Schema, SchemaSpec, Transform};
//!
//! let schema = Schema::new(SchemaSpec::basic()).unwrap();
//! let text = schema.text("hello world", vec![]).unwrap();
//! let para = schema.node("paragraph", None, text, vec![]).unwrap();
//! let doc = schema.node("doc", None, para, vec![]).unwrap();
//!
//! let mut tr = Transform::new(doc);
//! tr.delete(1, 7).unwrap();
//! assert_eq!(tr.doc().to_string(), r#"doc(paragraph("world"))"#);
//! assert_eq!(tr.mapping().map(9, Assoc::After), 3);
//! ```

// Schema-constrained document model
pub mod model;

// Steps, mapping, and the transform accumulator
pub mod transform;

pub use model::{
    AttributeSpec, Attrs, ContentMatch, Fragment, JsonError, Mark, MarkSpec, MarkType, ModelError,
    Node, NodeRange, NodeSpec, NodeType, ReplaceError, ResolvedPos, Schema, SchemaError,
    SchemaSpec, Slice,
};

pub use transform::{
    AddMarkStep, Assoc, Direction, MapRange, MapResult, Mappable, Mapping, MarkFilter, Recover,
    RemoveMarkStep, ReplaceAroundStep, ReplaceStep, Step, StepError, StepMap, StepResult,
    Transform, TransformError, Wrapper, block_range, can_join, can_split, find_wrapping,
    insert_point, join_point, lift_target, replace_step,
};
