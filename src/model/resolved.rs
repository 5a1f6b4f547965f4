use super::{ModelError, Node};
use std::fmt;

#[derive(Clone)]
struct PathEntry {
    node: Node,
    index: usize,
    offset: usize,
}

/// A position resolved against a document: the chain of ancestors, the index
/// into each of them, and their start offsets.
#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> Result<Self, ModelError> {
        if pos > doc.content_size() {
            return Err(ModelError::PositionOutOfRange {
                pos,
                size: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset);
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }
        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of ancestors between the document and the position's parent.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Offset of the position inside its parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn parent(&self) -> &Node {
        &self.path[self.depth()].node
    }

    pub fn doc(&self) -> &Node {
        &self.path[0].node
    }

    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    /// Index into the ancestor at `depth` of the child containing (or
    /// directly after) the position.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Start position of the content of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].offset + 1
        }
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the ancestor at `depth`.
    ///
    /// # Panics
    ///
    /// Panics for depth 0, since the document has no position before it.
    pub fn before(&self, depth: usize) -> usize {
        assert!(depth > 0, "there is no position before the top-level node");
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset
        }
    }

    /// Position directly after the ancestor at `depth`.
    ///
    /// # Panics
    ///
    /// Panics for depth 0, since the document has no position after it.
    pub fn after(&self, depth: usize) -> usize {
        assert!(depth > 0, "there is no position after the top-level node");
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].offset + self.node(depth).node_size()
        }
    }

    /// Offset into the text node the position points into, or 0 when it sits
    /// between nodes.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let offset = self.text_offset();
        Some(if offset > 0 {
            child.cut(offset, child.node_size())
        } else {
            child.clone()
        })
    }

    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let offset = self.text_offset();
        if offset > 0 {
            return Some(self.parent().child(index).cut(0, offset));
        }
        if index == 0 {
            None
        } else {
            Some(self.parent().child(index - 1).clone())
        }
    }

    /// The deepest depth whose ancestor contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|&depth| self.start(depth) <= pos && self.end(depth) >= pos)
            .unwrap_or(0)
    }

    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.depth() == other.depth() && self.pos - self.parent_offset == other.pos - other.parent_offset
    }

    /// The deepest range of sibling blocks covering both positions, optionally
    /// restricted to parents matching `pred`.
    pub fn block_range(
        &self,
        other: &ResolvedPos,
        pred: Option<&dyn Fn(&Node) -> bool>,
    ) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let lift = self.parent().inline_content() || self.pos == other.pos;
        let top = if lift {
            self.depth().checked_sub(1)?
        } else {
            self.depth()
        };
        (0..=top)
            .rev()
            .find(|&depth| other.pos <= self.end(depth) && pred.is_none_or(|p| p(self.node(depth))))
            .map(|depth| NodeRange::new(self.clone(), other.clone(), depth))
    }
}

impl fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = (1..=self.depth())
            .map(|d| format!("{}_{}", self.node(d).node_type().name(), self.index(d - 1)))
            .collect();
        write!(f, "{}:{}@{}", path.join("/"), self.parent_offset, self.pos)
    }
}

/// A flat range of siblings at `depth`, spanning from the child containing
/// `from` to the child containing `to`.
#[derive(Clone, Debug)]
pub struct NodeRange {
    pub from: ResolvedPos,
    pub to: ResolvedPos,
    pub depth: usize,
}

impl NodeRange {
    pub fn new(from: ResolvedPos, to: ResolvedPos, depth: usize) -> Self {
        Self { from, to, depth }
    }

    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }

    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }

    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}
