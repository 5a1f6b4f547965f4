use super::{Fragment, ModelError, Node};
use std::fmt;

/// A piece cut out of a document. `open_start` and `open_end` count how many
/// nodes on each edge are cut open rather than complete.
#[derive(Clone, Default, PartialEq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Positions the slice adds when inserted into a document.
    pub fn size(&self) -> usize {
        self.content
            .size()
            .saturating_sub(self.open_start + self.open_end)
    }

    /// Insert `fragment` at `pos` inside the slice content. Returns `None`
    /// when the content at that position does not accept it.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ModelError> {
        let content = remove_range(&self.content, from + self.open_start, to + self.open_start)?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }

    /// The largest slice covering `fragment`, opening through first and last
    /// children as deep as possible. Isolating nodes stop the descent when
    /// `open_isolating` is false.
    pub fn max_open(fragment: Fragment, open_isolating: bool) -> Slice {
        let mut open_start = 0;
        let mut open_end = 0;
        let mut node = fragment.first_child().cloned();
        while let Some(n) = node {
            if n.is_leaf() || (!open_isolating && n.node_type().spec().isolating) {
                break;
            }
            open_start += 1;
            node = n.first_child().cloned();
        }
        let mut node = fragment.last_child().cloned();
        while let Some(n) = node {
            if n.is_leaf() || (!open_isolating && n.node_type().spec().isolating) {
                break;
            }
            open_end += 1;
            node = n.last_child().cloned();
        }
        Slice::new(fragment, open_start, open_end)
    }
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ModelError> {
    let (index, offset) = content.find_index(from);
    let child = content.maybe_child(index);
    let (index_to, offset_to) = content.find_index(to);
    if offset == from || child.is_some_and(Node::is_text) {
        let to_child = content.maybe_child(index_to);
        if offset_to != to && !to_child.is_some_and(|c| c.is_text()) {
            return Err(ModelError::NonFlatRange);
        }
        return Ok(content
            .cut(0, from)
            .append(&content.cut(to, content.size())));
    }
    let Some(child) = child.filter(|_| index == index_to) else {
        return Err(ModelError::NonFlatRange);
    };
    let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
    Ok(content.replace_child(index, child.copy(inner)))
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: &Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist);
    let child = content.maybe_child(index);
    if offset == dist || child.is_some_and(|c| c.is_text()) {
        if parent.is_some_and(|p| !p.can_replace(index, index, insert)) {
            return None;
        }
        return Some(
            content
                .cut(0, dist)
                .append(insert)
                .append(&content.cut(dist, content.size())),
        );
    }
    let child = child?;
    let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child))?;
    Some(content.replace_child(index, child.copy(inner)))
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.content, self.open_start, self.open_end)
    }
}

impl fmt::Debug for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
