//! JSON representation of nodes, marks and slices.
//!
//! Serialization goes through plain serde structs; deserialization needs a
//! [`Schema`] to resolve type names, so it is exposed as `from_json`
//! constructors rather than `Deserialize` impls.

use super::{Attrs, Fragment, Mark, Node, Schema, SchemaError, Slice};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("malformed JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unknown node type {0:?}")]
    UnknownNodeType(String),
    #[error("unknown mark type {0:?}")]
    UnknownMarkType(String),
    #[error("invalid text node")]
    InvalidText,
    #[error("step positions out of order")]
    InvalidStepRange,
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NodeJson {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<MarkJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MarkJson {
    #[serde(rename = "type")]
    mark_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SliceJson {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<NodeJson>,
    #[serde(default, skip_serializing_if = "is_zero")]
    open_start: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    open_end: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl From<&Node> for NodeJson {
    fn from(node: &Node) -> Self {
        Self {
            node_type: node.node_type().name().to_string(),
            attrs: node.attrs().clone(),
            content: node.content().iter().map(NodeJson::from).collect(),
            marks: node.marks().iter().map(MarkJson::from).collect(),
            text: node.text().map(str::to_string),
        }
    }
}

impl NodeJson {
    fn into_node(self, schema: &Schema) -> Result<Node, JsonError> {
        let marks = self
            .marks
            .into_iter()
            .map(|m| m.into_mark(schema))
            .collect::<Result<Vec<_>, _>>()?;
        if self.node_type == "text" {
            let text = self.text.ok_or(JsonError::InvalidText)?;
            return schema.text(&text, marks).map_err(|_| JsonError::InvalidText);
        }
        let node_type = schema
            .node_type(&self.node_type)
            .ok_or(JsonError::UnknownNodeType(self.node_type))?;
        let content = fragment_from_json(schema, self.content)?;
        Ok(node_type.create(Some(&self.attrs), content, marks)?)
    }
}

impl From<&Mark> for MarkJson {
    fn from(mark: &Mark) -> Self {
        Self {
            mark_type: mark.mark_type().name().to_string(),
            attrs: mark.attrs().clone(),
        }
    }
}

impl MarkJson {
    pub(crate) fn into_mark(self, schema: &Schema) -> Result<Mark, JsonError> {
        let mark_type = schema
            .mark_type(&self.mark_type)
            .ok_or(JsonError::UnknownMarkType(self.mark_type))?;
        Ok(mark_type.create(Some(&self.attrs))?)
    }
}

impl From<&Slice> for SliceJson {
    fn from(slice: &Slice) -> Self {
        Self {
            content: slice.content().iter().map(NodeJson::from).collect(),
            open_start: slice.open_start(),
            open_end: slice.open_end(),
        }
    }
}

impl SliceJson {
    pub(crate) fn into_slice(self, schema: &Schema) -> Result<Slice, JsonError> {
        let content = fragment_from_json(schema, self.content)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }
}

fn fragment_from_json(schema: &Schema, nodes: Vec<NodeJson>) -> Result<Fragment, JsonError> {
    let nodes = nodes
        .into_iter()
        .map(|n| n.into_node(schema))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Fragment::from_array(nodes))
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeJson::from(self).serialize(serializer)
    }
}

impl Serialize for Mark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        MarkJson::from(self).serialize(serializer)
    }
}

impl Serialize for Slice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SliceJson::from(self).serialize(serializer)
    }
}

impl Node {
    pub fn to_json(&self) -> Result<Value, JsonError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Node, JsonError> {
        NodeJson::deserialize(value)?.into_node(schema)
    }
}

impl Mark {
    pub fn to_json(&self) -> Result<Value, JsonError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Mark, JsonError> {
        MarkJson::deserialize(value)?.into_mark(schema)
    }
}

impl Slice {
    pub fn to_json(&self) -> Result<Value, JsonError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(schema: &Schema, value: &Value) -> Result<Slice, JsonError> {
        if value.is_null() {
            return Ok(Slice::empty());
        }
        SliceJson::deserialize(value)?.into_slice(schema)
    }
}
