use super::map::{Assoc, Mappable};
use super::step::StepResult;
use crate::model::{Fragment, Mark, Node, Slice};

/// Rebuild `fragment`, passing every inline node through `f` together with
/// its parent.
fn map_fragment(fragment: &Fragment, f: &dyn Fn(&Node, &Node) -> Node, parent: &Node) -> Fragment {
    let mut mapped = Vec::with_capacity(fragment.child_count());
    for child in fragment {
        let mut child = child.clone();
        if child.content_size() > 0 {
            let inner = map_fragment(child.content(), f, &child);
            child = child.copy(inner);
        }
        if child.is_inline() {
            child = f(&child, parent);
        }
        mapped.push(child);
    }
    Fragment::from_array(mapped)
}

fn apply_marks(
    doc: &Node,
    from: usize,
    to: usize,
    f: &dyn Fn(&Node, &Node) -> Node,
) -> StepResult {
    let old = doc.slice(from, to, false)?;
    let rfrom = doc.resolve(from)?;
    let parent = rfrom.node(rfrom.shared_depth(to));
    let content = map_fragment(old.content(), f, parent);
    let slice = Slice::new(content, old.open_start(), old.open_end());
    Ok(doc.replace(from, to, &slice)?)
}

fn map_range(from: usize, to: usize, mapping: &impl Mappable) -> Option<(usize, usize)> {
    let from = mapping.map_result(from, Assoc::After);
    let to = mapping.map_result(to, Assoc::Before);
    if (from.deleted() && to.deleted()) || from.pos >= to.pos {
        None
    } else {
        Some((from.pos, to.pos))
    }
}

/// Add a mark to every inline node between `from` and `to` whose parent
/// allows it.
#[derive(Debug, Clone, PartialEq)]
pub struct AddMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

impl AddMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> Self {
        Self { from, to, mark }
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        apply_marks(doc, self.from, self.to, &|node, parent| {
            if !node.is_atom() || !parent.node_type().allows_mark_type(self.mark.mark_type()) {
                return node.clone();
            }
            node.mark(self.mark.add_to_set(node.marks()))
        })
    }

    pub fn invert(&self) -> RemoveMarkStep {
        RemoveMarkStep::new(self.from, self.to, self.mark.clone())
    }

    pub fn map(&self, mapping: &impl Mappable) -> Option<AddMarkStep> {
        let (from, to) = map_range(self.from, self.to, mapping)?;
        Some(AddMarkStep::new(from, to, self.mark.clone()))
    }

    /// Overlapping or adjacent steps adding the same mark merge into one.
    pub fn merge(&self, other: &AddMarkStep) -> Option<AddMarkStep> {
        if other.mark == self.mark && self.from <= other.to && self.to >= other.from {
            Some(AddMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            ))
        } else {
            None
        }
    }
}

/// Remove a mark from every inline node between `from` and `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveMarkStep {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

impl RemoveMarkStep {
    pub fn new(from: usize, to: usize, mark: Mark) -> Self {
        Self { from, to, mark }
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        apply_marks(doc, self.from, self.to, &|node, _| {
            node.mark(self.mark.remove_from_set(node.marks()))
        })
    }

    pub fn invert(&self) -> AddMarkStep {
        AddMarkStep::new(self.from, self.to, self.mark.clone())
    }

    pub fn map(&self, mapping: &impl Mappable) -> Option<RemoveMarkStep> {
        let (from, to) = map_range(self.from, self.to, mapping)?;
        Some(RemoveMarkStep::new(from, to, self.mark.clone()))
    }

    pub fn merge(&self, other: &RemoveMarkStep) -> Option<RemoveMarkStep> {
        if other.mark == self.mark && self.from <= other.to && self.to >= other.from {
            Some(RemoveMarkStep::new(
                self.from.min(other.from),
                self.to.max(other.to),
                self.mark.clone(),
            ))
        } else {
            None
        }
    }
}
