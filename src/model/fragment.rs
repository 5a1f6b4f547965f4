use super::Node;
use std::fmt;

/// An ordered sequence of sibling nodes. Adjacent text nodes with identical
/// marks are always merged.
#[derive(Clone, Default)]
pub struct Fragment {
    content: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a fragment from nodes, merging adjacent compatible text.
    pub fn from_array(nodes: Vec<Node>) -> Self {
        let mut content: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut size = 0;
        for node in nodes {
            size += node.node_size();
            if let Some(last) = content.last_mut()
                && last.is_text()
                && node.is_text()
                && last.same_markup(&node)
            {
                *last = last.with_text(format!(
                    "{}{}",
                    last.text().unwrap_or_default(),
                    node.text().unwrap_or_default()
                ));
                continue;
            }
            content.push(node);
        }
        Self { content, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn child(&self, index: usize) -> &Node {
        &self.content[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.content.iter()
    }

    pub fn children(&self) -> &[Node] {
        &self.content
    }

    /// Cut out the sub-fragment between two content positions.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        let mut size = 0;
        if to > from {
            let mut pos = 0;
            for child in &self.content {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let child = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), child.node_size().min(to - pos))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                child.content_size().min(to.saturating_sub(pos + 1)),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    size += child.node_size();
                    result.push(child);
                }
                pos = end;
            }
        }
        Fragment {
            content: result,
            size,
        }
    }

    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        if from == to {
            return Fragment::empty();
        }
        if from == 0 && to == self.content.len() {
            return self.clone();
        }
        let content = self.content[from..to].to_vec();
        let size = content.iter().map(Node::node_size).sum();
        Fragment { content, size }
    }

    /// Replace the child at `index`, returning a new fragment.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut content = self.content.clone();
        let size = self.size + node.node_size() - content[index].node_size();
        content[index] = node;
        Fragment { content, size }
    }

    pub fn add_to_start(&self, node: Node) -> Fragment {
        let mut nodes = Vec::with_capacity(self.content.len() + 1);
        nodes.push(node);
        nodes.extend(self.content.iter().cloned());
        Fragment::from_array(nodes)
    }

    pub fn add_to_end(&self, node: Node) -> Fragment {
        let mut nodes = self.content.clone();
        nodes.push(node);
        Fragment::from_array(nodes)
    }

    /// Concatenate, merging text at the seam.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size == 0 {
            return self.clone();
        }
        if self.size == 0 {
            return other.clone();
        }
        let mut nodes = self.content.clone();
        nodes.extend(other.content.iter().cloned());
        Fragment::from_array(nodes)
    }

    /// Find the child index and start offset for a content position. A
    /// position on a child boundary resolves to the child after it.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        if pos == 0 {
            return (0, 0);
        }
        if pos >= self.size {
            return (self.content.len(), self.size);
        }
        let mut cur = 0;
        for (i, child) in self.content.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                return if end == pos { (i + 1, end) } else { (i, cur) };
            }
            cur = end;
        }
        (self.content.len(), self.size)
    }

    pub(crate) fn to_string_inner(&self) -> String {
        self.content
            .iter()
            .map(Node::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.content == other.content
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        let size = node.node_size();
        Self {
            content: vec![node],
            size,
        }
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Self::from_array(nodes)
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.iter()
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.to_string_inner())
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
