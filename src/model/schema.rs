use super::content::{self, MatchState, TypeTable};
use super::{ContentMatch, Fragment, Mark, ModelError, Node};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Attribute values of a node or mark, keyed by attribute name.
pub type Attrs = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema is missing its top node type {0:?}")]
    MissingTopNode(String),
    #[error("every schema needs a 'text' node type")]
    MissingText,
    #[error("duplicate node type {0:?}")]
    DuplicateNode(String),
    #[error("duplicate mark type {0:?}")]
    DuplicateMark(String),
    #[error("{message} (in content expression {expr:?})")]
    ContentExpression { expr: String, message: String },
    #[error("unknown mark type or group {0:?}")]
    UnknownMark(String),
    #[error("unknown node type {0:?}")]
    UnknownNodeType(String),
    #[error("no value supplied for attribute {attr:?} of {owner}")]
    MissingAttribute { owner: String, attr: String },
    #[error("text nodes cannot be empty")]
    EmptyText,
    #[error("text nodes are created with Schema::text")]
    TextCreate,
}

/// Declaration of a single attribute. An attribute without a default is
/// required when creating nodes or marks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
}

// Distinguishes an explicit `"default": null` from a missing default.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl AttributeSpec {
    pub fn required() -> Self {
        Self { default: None }
    }

    pub fn with_default(value: Value) -> Self {
        Self {
            default: Some(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeSpec {
    pub name: String,
    /// Content expression, e.g. `"paragraph block*"`. Absent means leaf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Allowed marks: space-separated names or groups, `"_"` for all, `""` for none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub inline: bool,
    pub atom: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttributeSpec>,
    pub defining: bool,
    pub isolating: bool,
    pub code: bool,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn content(mut self, expr: &str) -> Self {
        self.content = Some(expr.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn marks(mut self, marks: &str) -> Self {
        self.marks = Some(marks.to_string());
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn attr(mut self, name: &str, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.to_string(), spec);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkSpec {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, AttributeSpec>,
    /// Marks this one excludes. Absent excludes only itself, `""` excludes
    /// nothing, `"_"` excludes every mark.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excludes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusive: Option<bool>,
}

impl MarkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: &str, spec: AttributeSpec) -> Self {
        self.attrs.insert(name.to_string(), spec);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaSpec {
    pub nodes: Vec<NodeSpec>,
    pub marks: Vec<MarkSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_node: Option<String>,
}

impl SchemaSpec {
    /// The basic rich-text schema: paragraphs, headings, quotes, code blocks,
    /// lists, images and hard breaks, with link, em, strong and code marks.
    pub fn basic() -> Self {
        let nodes = vec![
            NodeSpec::new("doc").content("block+"),
            NodeSpec::new("paragraph").content("inline*").group("block"),
            NodeSpec::new("blockquote")
                .content("block+")
                .group("block")
                .defining(),
            NodeSpec::new("horizontal_rule").group("block"),
            NodeSpec::new("heading")
                .content("inline*")
                .group("block")
                .defining()
                .attr("level", AttributeSpec::with_default(Value::from(1))),
            NodeSpec::new("code_block")
                .content("text*")
                .marks("")
                .group("block")
                .code()
                .defining(),
            NodeSpec::new("text").group("inline"),
            NodeSpec::new("image")
                .inline()
                .group("inline")
                .attr("src", AttributeSpec::required())
                .attr("alt", AttributeSpec::with_default(Value::Null))
                .attr("title", AttributeSpec::with_default(Value::Null)),
            NodeSpec::new("hard_break").inline().group("inline"),
            NodeSpec::new("ordered_list")
                .content("list_item+")
                .group("block")
                .attr("order", AttributeSpec::with_default(Value::from(1))),
            NodeSpec::new("bullet_list")
                .content("list_item+")
                .group("block"),
            NodeSpec::new("list_item")
                .content("paragraph block*")
                .defining(),
        ];
        let mut link = MarkSpec::new("link")
            .attr("href", AttributeSpec::required())
            .attr("title", AttributeSpec::with_default(Value::Null));
        link.inclusive = Some(false);
        let marks = vec![
            link,
            MarkSpec::new("em"),
            MarkSpec::new("strong"),
            MarkSpec::new("code"),
        ];
        Self {
            nodes,
            marks,
            top_node: None,
        }
    }
}

pub(crate) struct NodeTypeData {
    spec: NodeSpec,
    groups: Vec<String>,
    content_match: usize,
    is_block: bool,
    is_leaf: bool,
    inline_content: bool,
    // None allows every mark.
    mark_set: Option<Vec<usize>>,
}

pub(crate) struct MarkTypeData {
    spec: MarkSpec,
    groups: Vec<String>,
    excluded: Vec<usize>,
}

pub(crate) struct SchemaInner {
    spec: SchemaSpec,
    nodes: Vec<NodeTypeData>,
    marks: Vec<MarkTypeData>,
    matches: Vec<MatchState>,
    top: usize,
    text: usize,
}

/// A compiled document grammar. Cheap to clone; all handles derived from a
/// schema share it.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

fn split_groups(group: Option<&str>) -> Vec<String> {
    group
        .map(|g| g.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn gather_marks(marks: &[MarkTypeData], names: &str) -> Result<Vec<usize>, SchemaError> {
    let mut found = Vec::new();
    for name in names.split_whitespace() {
        if let Some(index) = marks.iter().position(|m| m.spec.name == name) {
            found.push(index);
            continue;
        }
        let before = found.len();
        for (index, mark) in marks.iter().enumerate() {
            if name == "_" || mark.groups.iter().any(|g| g == name) {
                found.push(index);
            }
        }
        if found.len() == before {
            return Err(SchemaError::UnknownMark(name.to_string()));
        }
    }
    Ok(found)
}

impl Schema {
    pub fn new(spec: SchemaSpec) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for node in &spec.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(SchemaError::DuplicateNode(node.name.clone()));
            }
        }
        let top_name = spec.top_node.clone().unwrap_or_else(|| "doc".to_string());
        let top = spec
            .nodes
            .iter()
            .position(|n| n.name == top_name)
            .ok_or(SchemaError::MissingTopNode(top_name))?;
        let text = spec
            .nodes
            .iter()
            .position(|n| n.name == "text")
            .ok_or(SchemaError::MissingText)?;

        let groups: Vec<Vec<String>> = spec
            .nodes
            .iter()
            .map(|n| split_groups(n.group.as_deref()))
            .collect();
        let is_block: Vec<bool> = spec
            .nodes
            .iter()
            .map(|n| !(n.inline || n.name == "text"))
            .collect();
        let table = TypeTable {
            names: spec.nodes.iter().map(|n| n.name.as_str()).collect(),
            groups: &groups,
            is_block: &is_block,
        };

        let mut matches = vec![MatchState {
            valid_end: true,
            next: Vec::new(),
        }];
        let mut content_matches = Vec::with_capacity(spec.nodes.len());
        for node in &spec.nodes {
            let expr = node.content.as_deref().unwrap_or("");
            content_matches.push(content::compile(expr, &table, &mut matches)?);
        }

        let mut seen = HashSet::new();
        let mut marks = Vec::with_capacity(spec.marks.len());
        for mark in &spec.marks {
            if !seen.insert(mark.name.as_str()) {
                return Err(SchemaError::DuplicateMark(mark.name.clone()));
            }
            marks.push(MarkTypeData {
                spec: mark.clone(),
                groups: split_groups(mark.group.as_deref()),
                excluded: Vec::new(),
            });
        }
        for index in 0..marks.len() {
            let excluded = match marks[index].spec.excludes.as_deref() {
                None => vec![index],
                Some(names) => gather_marks(&marks, names)?,
            };
            marks[index].excluded = excluded;
        }

        let mut nodes = Vec::with_capacity(spec.nodes.len());
        for (index, node) in spec.nodes.iter().enumerate() {
            let content_match = content_matches[index];
            let inline_content = matches[content_match]
                .next
                .first()
                .is_some_and(|&(ty, _)| !is_block[ty]);
            let is_leaf = content_match == content::EMPTY;
            let mark_set = match node.marks.as_deref() {
                Some("_") => None,
                Some(names) => Some(gather_marks(&marks, names)?),
                None if inline_content => None,
                None => Some(Vec::new()),
            };
            nodes.push(NodeTypeData {
                spec: node.clone(),
                groups: groups[index].clone(),
                content_match,
                is_block: is_block[index],
                is_leaf,
                inline_content,
                mark_set,
            });
        }

        tracing::debug!(
            nodes = nodes.len(),
            marks = marks.len(),
            states = matches.len(),
            "compiled schema"
        );

        Ok(Self {
            inner: Arc::new(SchemaInner {
                spec,
                nodes,
                marks,
                matches,
                top,
                text,
            }),
        })
    }

    pub fn spec(&self) -> &SchemaSpec {
        &self.inner.spec
    }

    pub fn node_type(&self, name: &str) -> Option<NodeType> {
        self.inner
            .nodes
            .iter()
            .position(|n| n.spec.name == name)
            .map(|index| self.node_type_at(index))
    }

    pub fn mark_type(&self, name: &str) -> Option<MarkType> {
        self.inner
            .marks
            .iter()
            .position(|m| m.spec.name == name)
            .map(|index| self.mark_type_at(index))
    }

    pub fn top_node_type(&self) -> NodeType {
        self.node_type_at(self.inner.top)
    }

    pub fn node_types(&self) -> impl Iterator<Item = NodeType> + '_ {
        (0..self.inner.nodes.len()).map(|index| self.node_type_at(index))
    }

    pub fn mark_types(&self) -> impl Iterator<Item = MarkType> + '_ {
        (0..self.inner.marks.len()).map(|index| self.mark_type_at(index))
    }

    /// Create a node of the named type.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: Vec<Mark>,
    ) -> Result<Node, SchemaError> {
        let node_type = self
            .node_type(name)
            .ok_or_else(|| SchemaError::UnknownNodeType(name.to_string()))?;
        node_type.create(attrs, content, marks)
    }

    pub fn text(&self, text: &str, marks: Vec<Mark>) -> Result<Node, SchemaError> {
        if text.is_empty() {
            return Err(SchemaError::EmptyText);
        }
        Ok(Node::new_text(
            self.node_type_at(self.inner.text),
            text.to_string(),
            Mark::set_from(marks),
        ))
    }

    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> Result<Mark, SchemaError> {
        let mark_type = self
            .mark_type(name)
            .ok_or_else(|| SchemaError::UnknownMark(name.to_string()))?;
        mark_type.create(attrs)
    }

    pub(crate) fn node_type_at(&self, index: usize) -> NodeType {
        NodeType {
            schema: self.clone(),
            index,
        }
    }

    pub(crate) fn mark_type_at(&self, index: usize) -> MarkType {
        MarkType {
            schema: self.clone(),
            index,
        }
    }

    pub(crate) fn match_state(&self, index: usize) -> &MatchState {
        &self.inner.matches[index]
    }

    pub(crate) fn same(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field(
                "nodes",
                &self.inner.nodes.iter().map(|n| &n.spec.name).collect::<Vec<_>>(),
            )
            .field(
                "marks",
                &self.inner.marks.iter().map(|m| &m.spec.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn compute_attrs(
    owner: &str,
    specs: &BTreeMap<String, AttributeSpec>,
    given: Option<&Attrs>,
) -> Result<Attrs, SchemaError> {
    let mut built = Attrs::new();
    for (name, spec) in specs {
        let value = given
            .and_then(|g| g.get(name))
            .cloned()
            .or_else(|| spec.default.clone());
        let Some(value) = value else {
            return Err(SchemaError::MissingAttribute {
                owner: owner.to_string(),
                attr: name.clone(),
            });
        };
        built.insert(name.clone(), value);
    }
    Ok(built)
}

/// Handle to a node type within its schema.
#[derive(Clone)]
pub struct NodeType {
    schema: Schema,
    index: usize,
}

impl NodeType {
    fn data(&self) -> &NodeTypeData {
        &self.schema.inner.nodes[self.index]
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.data().spec.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.data().spec
    }

    pub fn groups(&self) -> &[String] {
        &self.data().groups
    }

    pub fn is_block(&self) -> bool {
        self.data().is_block
    }

    pub fn is_inline(&self) -> bool {
        !self.data().is_block
    }

    pub fn is_text(&self) -> bool {
        self.index == self.schema.inner.text
    }

    pub fn is_textblock(&self) -> bool {
        self.data().is_block && self.data().inline_content
    }

    pub fn inline_content(&self) -> bool {
        self.data().inline_content
    }

    pub fn is_leaf(&self) -> bool {
        self.data().is_leaf
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.data().spec.atom
    }

    pub fn content_match(&self) -> ContentMatch {
        ContentMatch::new(self.schema.clone(), self.data().content_match)
    }

    pub fn has_required_attrs(&self) -> bool {
        self.data().spec.attrs.values().any(|a| a.default.is_none())
    }

    /// Fill in defaults for missing attributes and drop unknown ones.
    pub fn compute_attrs(&self, attrs: Option<&Attrs>) -> Result<Attrs, SchemaError> {
        compute_attrs(self.name(), &self.data().spec.attrs, attrs)
    }

    /// Create a node of this type. Content is not validated; see
    /// [`NodeType::check_content`].
    pub fn create(
        &self,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: Vec<Mark>,
    ) -> Result<Node, SchemaError> {
        if self.is_text() {
            return Err(SchemaError::TextCreate);
        }
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::new(
            self.clone(),
            attrs,
            content.into(),
            Mark::set_from(marks),
        ))
    }

    /// Create a node of this type, adding nodes before and after `content`
    /// where needed to make it valid. Returns `None` when no valid node can
    /// be built around the given content.
    pub fn create_and_fill(
        &self,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
        marks: Vec<Mark>,
    ) -> Option<Node> {
        if self.is_text() {
            return None;
        }
        let attrs = self.compute_attrs(attrs).ok()?;
        let mut content = content.into();
        let start = self.content_match();
        if content.size() > 0 {
            let before = start.fill_before(&content, false, 0)?;
            content = before.append(&content);
        }
        let matched = start.match_fragment(&content)?;
        let after = matched.fill_before(&Fragment::empty(), true, 0)?;
        Some(Node::new(
            self.clone(),
            attrs,
            content.append(&after),
            Mark::set_from(marks),
        ))
    }

    pub fn valid_content(&self, content: &Fragment) -> bool {
        let Some(result) = self.content_match().match_fragment(content) else {
            return false;
        };
        result.valid_end() && content.iter().all(|child| self.allows_marks(child.marks()))
    }

    pub fn check_content(&self, content: &Fragment) -> Result<(), ModelError> {
        if self.valid_content(content) {
            Ok(())
        } else {
            Err(ModelError::InvalidContent(format!(
                "{}: {}",
                self.name(),
                content
            )))
        }
    }

    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        match &self.data().mark_set {
            None => true,
            Some(set) => set.contains(&mark_type.index),
        }
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark_type(m.mark_type()))
    }

    pub fn allowed_marks(&self, marks: &[Mark]) -> Vec<Mark> {
        marks
            .iter()
            .filter(|m| self.allows_mark_type(m.mark_type()))
            .cloned()
            .collect()
    }

    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(&other.content_match())
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.schema.same(&other.schema)
    }
}

impl Eq for NodeType {}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeType({})", self.name())
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle to a mark type within its schema.
#[derive(Clone)]
pub struct MarkType {
    schema: Schema,
    index: usize,
}

impl MarkType {
    fn data(&self) -> &MarkTypeData {
        &self.schema.inner.marks[self.index]
    }

    pub fn name(&self) -> &str {
        &self.data().spec.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn spec(&self) -> &MarkSpec {
        &self.data().spec
    }

    /// Marks in a set are ordered by rank, which is declaration order.
    pub fn rank(&self) -> usize {
        self.index
    }

    pub fn inclusive(&self) -> bool {
        self.data().spec.inclusive.unwrap_or(true)
    }

    pub fn create(&self, attrs: Option<&Attrs>) -> Result<Mark, SchemaError> {
        let attrs = compute_attrs(self.name(), &self.data().spec.attrs, attrs)?;
        Ok(Mark::new(self.clone(), attrs))
    }

    pub fn excludes(&self, other: &MarkType) -> bool {
        self.data().excluded.contains(&other.index)
    }

    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|m| m.mark_type() == self)
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter()
            .filter(|m| m.mark_type() != self)
            .cloned()
            .collect()
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.schema.same(&other.schema)
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkType({})", self.name())
    }
}
