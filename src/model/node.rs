use super::replace::{self, ReplaceError};
use super::{
    Attrs, ContentMatch, Fragment, Mark, MarkType, ModelError, NodeType, ResolvedPos, Slice,
};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

struct NodeInner {
    node_type: NodeType,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    size: usize,
}

/// An immutable document node. Clones share structure.
#[derive(Clone)]
pub struct Node(Arc<NodeInner>);

fn char_slice(text: &str, from: usize, to: usize) -> String {
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

impl Node {
    pub(crate) fn new(node_type: NodeType, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        let size = if node_type.is_leaf() {
            1
        } else {
            content.size() + 2
        };
        Node(Arc::new(NodeInner {
            node_type,
            attrs,
            content,
            marks,
            text: None,
            size,
        }))
    }

    pub(crate) fn new_text(node_type: NodeType, text: String, marks: Vec<Mark>) -> Self {
        let size = text.chars().count();
        Node(Arc::new(NodeInner {
            node_type,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(text),
            size,
        }))
    }

    pub fn node_type(&self) -> &NodeType {
        &self.0.node_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.0.attrs.get(name)
    }

    pub fn marks(&self) -> &[Mark] {
        &self.0.marks
    }

    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    /// The text of a text node, `None` for every other node.
    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    /// Size of the node in position units: text length for text, 1 for
    /// other leaves, content size plus 2 otherwise.
    pub fn node_size(&self) -> usize {
        self.0.size
    }

    pub fn content_size(&self) -> usize {
        self.0.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.0.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.0.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    pub fn is_text(&self) -> bool {
        self.0.text.is_some()
    }

    pub fn is_block(&self) -> bool {
        self.0.node_type.is_block()
    }

    pub fn is_inline(&self) -> bool {
        self.0.node_type.is_inline()
    }

    pub fn is_textblock(&self) -> bool {
        self.0.node_type.is_textblock()
    }

    pub fn inline_content(&self) -> bool {
        self.0.node_type.inline_content()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.node_type.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.0.node_type.is_atom()
    }

    pub fn text_content(&self) -> String {
        if let Some(text) = self.text() {
            return text.to_string();
        }
        let mut out = String::new();
        self.descendants(&mut |node, _, _, _| {
            if let Some(text) = node.text() {
                out.push_str(text);
            }
            true
        });
        out
    }

    /// Same type, attributes and marks.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(other.node_type(), Some(other.attrs()), other.marks())
    }

    /// Compare markup against the given type, attributes (defaults when
    /// `None`) and marks.
    pub fn has_markup(&self, node_type: &NodeType, attrs: Option<&Attrs>, marks: &[Mark]) -> bool {
        if self.node_type() != node_type {
            return false;
        }
        let attrs_match = match attrs {
            Some(attrs) => self.attrs() == attrs,
            None => *self.attrs() == node_type.compute_attrs(None).unwrap_or_default(),
        };
        attrs_match && Mark::same_set(self.marks(), marks)
    }

    /// A node with the same markup and different content.
    pub fn copy(&self, content: Fragment) -> Node {
        if self.is_text() {
            return self.clone();
        }
        Node::new(
            self.0.node_type.clone(),
            self.0.attrs.clone(),
            content,
            self.0.marks.clone(),
        )
    }

    /// A node with the same type, attributes and content, and the given marks.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        if Mark::same_set(&marks, self.marks()) {
            return self.clone();
        }
        match self.text() {
            Some(text) => Node::new_text(self.0.node_type.clone(), text.to_string(), marks),
            None => Node::new(
                self.0.node_type.clone(),
                self.0.attrs.clone(),
                self.0.content.clone(),
                marks,
            ),
        }
    }

    pub(crate) fn with_text(&self, text: String) -> Node {
        if self.text() == Some(text.as_str()) {
            return self.clone();
        }
        Node::new_text(self.0.node_type.clone(), text, self.0.marks.clone())
    }

    /// Cut the node down to the content between `from` and `to`. For text
    /// nodes the offsets are character offsets.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if let Some(text) = self.text() {
            if from == 0 && to >= self.node_size() {
                return self.clone();
            }
            return self.with_text(char_slice(text, from, to));
        }
        if from == 0 && to == self.content_size() {
            return self.clone();
        }
        self.copy(self.content().cut(from, to))
    }

    /// Cut out the slice between two positions. With `include_parents`, the
    /// slice opens up to the shared ancestor depth rather than the minimum
    /// needed.
    pub fn slice(&self, from: usize, to: usize, include_parents: bool) -> Result<Slice, ModelError> {
        if from > to {
            return Err(ModelError::InvalidRange { from, to });
        }
        if from == to {
            return Ok(Slice::empty());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = if include_parents {
            0
        } else {
            rfrom.shared_depth(to)
        };
        let start = rfrom.start(depth);
        let node = rfrom.node(depth);
        let content = node.content().cut(rfrom.pos() - start, rto.pos() - start);
        Ok(Slice::new(
            content,
            rfrom.depth() - depth,
            rto.depth() - depth,
        ))
    }

    /// Replace the range `from..to` with `slice`, checking that the result
    /// is valid along the affected spine.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ReplaceError> {
        if from > to {
            return Err(ModelError::InvalidRange { from, to }.into());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        replace::replace(&rfrom, &rto, slice)
    }

    /// The node starting directly at `pos`, if any.
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let (index, offset) = node.content().find_index(pos);
            let child = node.maybe_child(index)?.clone();
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ModelError> {
        ResolvedPos::resolve(self, pos)
    }

    /// Call `f` for every descendant overlapping `from..to`, with the node,
    /// its absolute start position, its parent and its index in the parent.
    /// Returning `false` skips the node's children.
    pub fn nodes_between<F>(&self, from: usize, to: usize, f: &mut F)
    where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        self.nodes_between_at(from, to, f, 0);
    }

    fn nodes_between_at<F>(&self, from: usize, to: usize, f: &mut F, start_pos: usize)
    where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        let mut pos = 0;
        for (index, child) in self.content().iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, start_pos + pos, self, index) && child.content_size() > 0 {
                let start = pos + 1;
                child.nodes_between_at(
                    from.saturating_sub(start),
                    child.content_size().min(to - start),
                    f,
                    start_pos + start,
                );
            }
            pos = end;
        }
    }

    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize, &Node, usize) -> bool,
    {
        self.nodes_between(0, self.content_size(), f);
    }

    pub fn range_has_mark(&self, from: usize, to: usize, mark_type: &MarkType) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node, _, _, _| {
                if mark_type.is_in_set(node.marks()).is_some() {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// The content match state after the first `index` children, or `None`
    /// when those children do not match this node's content expression.
    pub fn content_match_at(&self, index: usize) -> Option<ContentMatch> {
        self.node_type()
            .content_match()
            .match_fragment_range(self.content(), 0, index)
    }

    /// Whether replacing children `from..to` with `replacement` leaves valid
    /// content.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        let Some(one) = self
            .content_match_at(from)
            .and_then(|m| m.match_fragment(replacement))
        else {
            return false;
        };
        let Some(two) = one.match_fragment_range(self.content(), to, self.child_count()) else {
            return false;
        };
        two.valid_end() && replacement.iter().all(|child| self.node_type().allows_marks(child.marks()))
    }

    /// Whether children `from..to` can be replaced by a single node of type
    /// `node_type` carrying `marks`.
    pub fn can_replace_with(
        &self,
        from: usize,
        to: usize,
        node_type: &NodeType,
        marks: Option<&[Mark]>,
    ) -> bool {
        if marks.is_some_and(|marks| !self.node_type().allows_marks(marks)) {
            return false;
        }
        let Some(start) = self
            .content_match_at(from)
            .and_then(|m| m.match_type(node_type))
        else {
            return false;
        };
        start
            .match_fragment_range(self.content(), to, self.child_count())
            .is_some_and(|end| end.valid_end())
    }

    /// Whether `other`'s content could be appended to this node's content.
    pub fn can_append(&self, other: &Node) -> bool {
        if other.content_size() > 0 {
            self.can_replace(self.child_count(), self.child_count(), other.content())
        } else {
            self.node_type().compatible_content(other.node_type())
        }
    }

    /// Validate this node and all descendants against the schema.
    pub fn check(&self) -> Result<(), ModelError> {
        if let Some(text) = self.text() {
            if text.is_empty() {
                return Err(ModelError::EmptyText);
            }
        } else {
            self.node_type().check_content(self.content())?;
        }
        let mut normalized: Vec<Mark> = Vec::new();
        for mark in self.marks() {
            normalized = mark.add_to_set(&normalized);
        }
        if !Mark::same_set(&normalized, self.marks()) {
            return Err(ModelError::InvalidMarks(self.node_type().name().to_string()));
        }
        for child in self.content() {
            child.check()?;
        }
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.same_markup(other)
                && self.text() == other.text()
                && self.content() == other.content())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = match self.text() {
            Some(text) => format!("{text:?}"),
            None if self.child_count() > 0 => format!(
                "{}({})",
                self.node_type().name(),
                self.content().to_string_inner()
            ),
            None => self.node_type().name().to_string(),
        };
        for mark in self.marks().iter().rev() {
            out = format!("{}({out})", mark.mark_type().name());
        }
        f.write_str(&out)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
