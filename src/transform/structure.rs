//! Structural edits (lift, wrap, split, join, retyping) and the finders that
//! compute valid targets for them.

use super::map::{Assoc, Mappable, Mapping};
use super::mark::clear_incompatible;
use super::replace_step::{ReplaceAroundStep, ReplaceStep};
use super::step::Step;
use super::{Transform, TransformError};
use crate::model::{Attrs, Fragment, ModelError, Node, NodeRange, NodeType, Slice};

/// A node type plus attributes to create a wrapping (or split-off) node
/// with. `None` attrs use the type's defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapper {
    pub node_type: NodeType,
    pub attrs: Option<Attrs>,
}

impl Wrapper {
    pub fn new(node_type: NodeType, attrs: Option<Attrs>) -> Self {
        Self { node_type, attrs }
    }
}

impl From<NodeType> for Wrapper {
    fn from(node_type: NodeType) -> Self {
        Self::new(node_type, None)
    }
}

/// Which side of a position [`join_point`] searches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Backward,
    Forward,
}

/// Resolve both positions and find the block range around them.
pub fn block_range(doc: &Node, from: usize, to: usize) -> Result<Option<NodeRange>, ModelError> {
    let rfrom = doc.resolve(from)?;
    let rto = doc.resolve(to)?;
    Ok(rfrom.block_range(&rto, None))
}

fn can_cut(node: &Node, start: usize, end: usize) -> bool {
    (start == 0 || node.can_replace(start, node.child_count(), &Fragment::empty()))
        && (end == node.child_count() || node.can_replace(0, end, &Fragment::empty()))
}

/// The depth the content of `range` could be lifted to, if any.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
    let content = range
        .parent()
        .content()
        .cut_by_index(range.start_index(), range.end_index());
    let mut depth = range.depth;
    loop {
        let node = range.from.node(depth);
        let index = range.from.index(depth);
        let end_index = range.to.index_after(depth);
        if depth < range.depth && node.can_replace(index, end_index, &content) {
            return Some(depth);
        }
        if depth == 0 || node.node_type().spec().isolating || !can_cut(node, index, end_index) {
            return None;
        }
        depth -= 1;
    }
}

pub(crate) fn lift(
    tr: &mut Transform,
    range: &NodeRange,
    target: usize,
) -> Result<(), TransformError> {
    let (rfrom, rto, depth) = (&range.from, &range.to, range.depth);
    if target >= depth {
        return Err(TransformError::InvalidDepth);
    }
    let gap_start = rfrom.before(depth + 1);
    let gap_end = rto.after(depth + 1);
    let mut start = gap_start;
    let mut end = gap_end;

    let mut before = Fragment::empty();
    let mut open_start = 0;
    let mut splitting = false;
    for d in (target + 1..=depth).rev() {
        if splitting || rfrom.index(d) > 0 {
            splitting = true;
            before = Fragment::from(rfrom.node(d).copy(before));
            open_start += 1;
        } else {
            start -= 1;
        }
    }
    let mut after = Fragment::empty();
    let mut open_end = 0;
    splitting = false;
    for d in (target + 1..=depth).rev() {
        if splitting || rto.after(d + 1) < rto.end(d) {
            splitting = true;
            after = Fragment::from(rto.node(d).copy(after));
            open_end += 1;
        } else {
            end += 1;
        }
    }

    let insert = before.size() - open_start;
    tr.step(Step::ReplaceAround(ReplaceAroundStep::new(
        start,
        end,
        gap_start,
        gap_end,
        Slice::new(before.append(&after), open_start, open_end),
        insert,
        true,
    )))?;
    Ok(())
}

/// The wrappers needed to wrap `range` in a node of `node_type`: any
/// wrappers the parent needs around it, the node itself, and any wrappers
/// needed inside it for the range's content to fit.
pub fn find_wrapping(
    range: &NodeRange,
    node_type: &NodeType,
    attrs: Option<&Attrs>,
) -> Option<Vec<Wrapper>> {
    let around = find_wrapping_outside(range, node_type)?;
    let inner = find_wrapping_inside(range, node_type)?;
    let mut wrappers: Vec<Wrapper> = around.into_iter().map(Wrapper::from).collect();
    wrappers.push(Wrapper::new(node_type.clone(), attrs.cloned()));
    wrappers.extend(inner.into_iter().map(Wrapper::from));
    Some(wrappers)
}

fn find_wrapping_outside(range: &NodeRange, node_type: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let around = parent
        .content_match_at(range.start_index())?
        .find_wrapping(node_type)?;
    let outer = around.first().unwrap_or(node_type);
    parent
        .can_replace_with(range.start_index(), range.end_index(), outer, None)
        .then_some(around)
}

fn find_wrapping_inside(range: &NodeRange, node_type: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let inner = parent.maybe_child(range.start_index())?;
    let inside = node_type.content_match().find_wrapping(inner.node_type())?;
    let last = inside.last().unwrap_or(node_type);
    let mut matcher = last.content_match();
    for i in range.start_index()..range.end_index() {
        matcher = matcher.match_type(parent.child(i).node_type())?;
    }
    matcher.valid_end().then_some(inside)
}

pub(crate) fn wrap(
    tr: &mut Transform,
    range: &NodeRange,
    wrappers: &[Wrapper],
) -> Result<(), TransformError> {
    let mut content = Fragment::empty();
    for wrapper in wrappers.iter().rev() {
        if content.size() > 0
            && !wrapper
                .node_type
                .content_match()
                .match_fragment(&content)
                .is_some_and(|m| m.valid_end())
        {
            return Err(TransformError::InvalidWrapper(
                wrapper.node_type.name().to_string(),
            ));
        }
        content = Fragment::from(wrapper.node_type.create(
            wrapper.attrs.as_ref(),
            content,
            Vec::new(),
        )?);
    }
    let (start, end) = (range.start(), range.end());
    tr.step(Step::ReplaceAround(ReplaceAroundStep::new(
        start,
        end,
        start,
        end,
        Slice::new(content, 0, 0),
        wrappers.len(),
        true,
    )))?;
    Ok(())
}

fn can_change_type(doc: &Node, pos: usize, node_type: &NodeType) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    let index = rpos.index(rpos.depth());
    rpos.parent().can_replace_with(index, index + 1, node_type, None)
}

pub(crate) fn set_block_type(
    tr: &mut Transform,
    from: usize,
    to: usize,
    node_type: &NodeType,
    attrs: Option<&Attrs>,
) -> Result<(), TransformError> {
    if !node_type.is_textblock() {
        return Err(TransformError::NotTextblock(node_type.name().to_string()));
    }
    let attrs = node_type.compute_attrs(attrs)?;
    let map_from = tr.steps().len();
    let mut textblocks = Vec::new();
    tr.doc().nodes_between(from, to, &mut |node, pos, _, _| {
        if node.is_textblock() {
            textblocks.push((node.clone(), pos));
            return false;
        }
        true
    });
    for (node, pos) in textblocks {
        if node.has_markup(node_type, Some(&attrs), &[]) {
            continue;
        }
        let mapped = since(tr, map_from).map(pos, Assoc::After);
        if !can_change_type(tr.doc(), mapped, node_type) {
            continue;
        }
        clear_incompatible(tr, mapped, node_type, None)?;
        let mapping = since(tr, map_from);
        let start = mapping.map(pos, Assoc::After);
        let end = mapping.map(pos + node.node_size(), Assoc::After);
        let replacement = node_type.create(Some(&attrs), Fragment::empty(), node.marks().to_vec())?;
        tr.step(Step::ReplaceAround(ReplaceAroundStep::new(
            start,
            end,
            start + 1,
            end - 1,
            Slice::new(Fragment::from(replacement), 0, 0),
            1,
            true,
        )))?;
    }
    Ok(())
}

fn since(tr: &Transform, start: usize) -> Mapping {
    tr.mapping().slice(start, tr.mapping().len())
}

pub(crate) fn set_node_type(
    tr: &mut Transform,
    pos: usize,
    node_type: Option<&NodeType>,
    attrs: Option<&Attrs>,
) -> Result<(), TransformError> {
    let node = tr.doc().node_at(pos).ok_or(TransformError::NoNodeAt(pos))?;
    let node_type = node_type.unwrap_or(node.node_type()).clone();
    let end = pos + node.node_size();
    if node.is_leaf() {
        let replacement = node_type.create(attrs, Fragment::empty(), node.marks().to_vec())?;
        tr.replace_with(pos, end, replacement)?;
        return Ok(());
    }
    if !node_type.valid_content(node.content()) {
        let replacement = node_type
            .create_and_fill(attrs, Fragment::empty(), node.marks().to_vec())
            .ok_or_else(|| ModelError::InvalidContent(node_type.name().to_string()))?;
        tr.replace_with(pos, end, replacement)?;
        return Ok(());
    }
    let replacement = node_type.create(attrs, Fragment::empty(), node.marks().to_vec())?;
    tr.step(Step::ReplaceAround(ReplaceAroundStep::new(
        pos,
        end,
        pos + 1,
        end - 1,
        Slice::new(Fragment::from(replacement), 0, 0),
        1,
        true,
    )))?;
    Ok(())
}

fn wrapper_at(types_after: Option<&[Option<Wrapper>]>, index: usize) -> Option<&Wrapper> {
    types_after.and_then(|t| t.get(index)).and_then(Option::as_ref)
}

/// Whether splitting at `pos` through `depth` levels yields valid nodes.
/// `types_after[i]` overrides the node created after the split at level
/// `i`, counted from the outermost split level.
pub fn can_split(
    doc: &Node,
    pos: usize,
    depth: usize,
    types_after: Option<&[Option<Wrapper>]>,
) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    let Some(base) = rpos.depth().checked_sub(depth) else {
        return false;
    };
    let parent = rpos.parent();
    let index = rpos.index(rpos.depth());
    let inner_type = types_after
        .and_then(|t| t.last())
        .and_then(Option::as_ref)
        .map_or_else(|| parent.node_type().clone(), |w| w.node_type.clone());
    if parent.node_type().spec().isolating
        || !parent.can_replace(index, parent.child_count(), &Fragment::empty())
        || !inner_type.valid_content(&parent.content().cut_by_index(index, parent.child_count()))
    {
        return false;
    }
    // Level `d` corresponds to `types_after[d - base - 1]`.
    for d in (base + 1..rpos.depth()).rev() {
        let node = rpos.node(d);
        let index = rpos.index(d);
        if node.node_type().spec().isolating {
            return false;
        }
        let mut rest = node.content().cut_by_index(index, node.child_count());
        if let Some(child) = wrapper_at(types_after, d - base) {
            let Ok(replacement) =
                child
                    .node_type
                    .create(child.attrs.as_ref(), Fragment::empty(), Vec::new())
            else {
                return false;
            };
            rest = rest.replace_child(0, replacement);
        }
        let after = wrapper_at(types_after, d - base - 1)
            .map_or_else(|| node.node_type().clone(), |w| w.node_type.clone());
        if !node.can_replace(index + 1, node.child_count(), &Fragment::empty())
            || !after.valid_content(&rest)
        {
            return false;
        }
    }
    let index = rpos.index_after(base);
    let base_type = wrapper_at(types_after, 0)
        .map_or_else(|| rpos.node(base + 1).node_type().clone(), |w| w.node_type.clone());
    rpos.node(base).can_replace_with(index, index, &base_type, None)
}

pub(crate) fn split(
    tr: &mut Transform,
    pos: usize,
    depth: usize,
    types_after: Option<&[Option<Wrapper>]>,
) -> Result<(), TransformError> {
    let rpos = tr.doc().resolve(pos)?;
    let Some(base) = rpos.depth().checked_sub(depth) else {
        return Err(TransformError::InvalidDepth);
    };
    let mut before = Fragment::empty();
    let mut after = Fragment::empty();
    for d in (base + 1..=rpos.depth()).rev() {
        let node = rpos.node(d);
        before = Fragment::from(node.copy(before));
        after = Fragment::from(match wrapper_at(types_after, d - base - 1) {
            Some(w) => w.node_type.create(w.attrs.as_ref(), after, Vec::new())?,
            None => node.copy(after),
        });
    }
    tr.step(Step::Replace(ReplaceStep::new(
        pos,
        pos,
        Slice::new(before.append(&after), depth, depth),
        true,
    )))?;
    Ok(())
}

fn joinable(a: Option<&Node>, b: Option<&Node>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !a.is_leaf() && a.can_append(b),
        _ => false,
    }
}

/// Whether the nodes directly before and after `pos` can be joined.
pub fn can_join(doc: &Node, pos: usize) -> bool {
    let Ok(rpos) = doc.resolve(pos) else {
        return false;
    };
    let index = rpos.index(rpos.depth());
    joinable(rpos.node_before().as_ref(), rpos.node_after().as_ref())
        && rpos.parent().can_replace(index, index + 1, &Fragment::empty())
}

/// Find the nearest position around `pos`, walking outward in
/// `direction`, at which two non-textblock nodes can be joined.
pub fn join_point(doc: &Node, pos: usize, direction: Direction) -> Option<usize> {
    let rpos = doc.resolve(pos).ok()?;
    let mut pos = pos;
    for d in (0..=rpos.depth()).rev() {
        let mut index = rpos.index(d);
        let (before, after) = if d == rpos.depth() {
            (rpos.node_before(), rpos.node_after())
        } else if direction == Direction::Forward {
            index += 1;
            (
                Some(rpos.node(d + 1).clone()),
                rpos.node(d).maybe_child(index).cloned(),
            )
        } else {
            (
                index
                    .checked_sub(1)
                    .and_then(|i| rpos.node(d).maybe_child(i).cloned()),
                Some(rpos.node(d + 1).clone()),
            )
        };
        if before.as_ref().is_some_and(|b| !b.is_textblock())
            && joinable(before.as_ref(), after.as_ref())
            && rpos.node(d).can_replace(index, index + 1, &Fragment::empty())
        {
            return Some(pos);
        }
        if d == 0 {
            break;
        }
        pos = match direction {
            Direction::Backward => rpos.before(d),
            Direction::Forward => rpos.after(d),
        };
    }
    None
}

pub(crate) fn join(tr: &mut Transform, pos: usize, depth: usize) -> Result<(), TransformError> {
    let Some(from) = pos.checked_sub(depth) else {
        return Err(TransformError::InvalidDepth);
    };
    tr.step(Step::Replace(ReplaceStep::new(
        from,
        pos + depth,
        Slice::empty(),
        true,
    )))?;
    Ok(())
}

/// The closest position to `pos` where a node of `node_type` could be
/// inserted, looking only at positions reachable by leaving ancestors at
/// their very start or end.
pub fn insert_point(doc: &Node, pos: usize, node_type: &NodeType) -> Option<usize> {
    let rpos = doc.resolve(pos).ok()?;
    let index = rpos.index(rpos.depth());
    if rpos.parent().can_replace_with(index, index, node_type, None) {
        return Some(pos);
    }
    if rpos.parent_offset() == 0 {
        for d in (0..rpos.depth()).rev() {
            let index = rpos.index(d);
            if rpos.node(d).can_replace_with(index, index, node_type, None) {
                return Some(rpos.before(d + 1));
            }
            if index > 0 {
                return None;
            }
        }
    }
    if rpos.parent_offset() == rpos.parent().content_size() {
        for d in (0..rpos.depth()).rev() {
            let index = rpos.index_after(d);
            if rpos.node(d).can_replace_with(index, index, node_type, None) {
                return Some(rpos.after(d + 1));
            }
            if index < rpos.node(d).child_count() {
                return None;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Schema, SchemaSpec};

    fn schema() -> Schema {
        Schema::new(SchemaSpec::basic()).unwrap()
    }

    fn p(schema: &Schema, text: &str) -> Node {
        schema
            .node("paragraph", None, schema.text(text, vec![]).unwrap(), vec![])
            .unwrap()
    }

    fn node(schema: &Schema, name: &str, content: Vec<Node>) -> Node {
        schema.node(name, None, content, vec![]).unwrap()
    }

    #[test]
    fn lift_target_of_blockquote_child() {
        let s = schema();
        let d = node(&s, "doc", vec![node(&s, "blockquote", vec![p(&s, "a"), p(&s, "b")])]);
        let range = block_range(&d, 5, 5).unwrap().unwrap();
        assert_eq!(range.depth, 1);
        assert_eq!(lift_target(&range), Some(0));
    }

    #[test]
    fn top_level_paragraph_cannot_be_lifted() {
        let s = schema();
        let d = node(&s, "doc", vec![p(&s, "a")]);
        let range = block_range(&d, 1, 1).unwrap().unwrap();
        assert_eq!(lift_target(&range), None);
    }

    #[test]
    fn wrapping_a_paragraph_in_a_list_adds_an_item() {
        let s = schema();
        let d = node(&s, "doc", vec![p(&s, "a")]);
        let range = block_range(&d, 1, 1).unwrap().unwrap();
        let list = s.node_type("bullet_list").unwrap();
        let wrappers = find_wrapping(&range, &list, None).unwrap();
        let names: Vec<&str> = wrappers.iter().map(|w| w.node_type.name()).collect();
        assert_eq!(names, ["bullet_list", "list_item"]);
    }

    #[test]
    fn split_and_join_points() {
        let s = schema();
        let d = node(&s, "doc", vec![p(&s, "ab"), p(&s, "cd")]);
        assert!(can_split(&d, 2, 1, None));
        assert!(!can_split(&d, 2, 2, None));
        assert!(can_join(&d, 4));
        assert!(!can_join(&d, 2));
        let quotes = node(
            &s,
            "doc",
            vec![
                node(&s, "blockquote", vec![p(&s, "a")]),
                node(&s, "blockquote", vec![p(&s, "b")]),
            ],
        );
        assert_eq!(join_point(&quotes, 7, Direction::Backward), Some(5));
        assert_eq!(join_point(&quotes, 2, Direction::Backward), None);
        assert_eq!(join_point(&quotes, 2, Direction::Forward), Some(5));
        assert_eq!(join_point(&quotes, 8, Direction::Forward), None);
    }

    #[test]
    fn insert_point_leaves_textblocks() {
        let s = schema();
        let d = node(&s, "doc", vec![p(&s, "ab")]);
        let rule = s.node_type("horizontal_rule").unwrap();
        assert_eq!(insert_point(&d, 1, &rule), Some(0));
        assert_eq!(insert_point(&d, 3, &rule), Some(4));
        assert_eq!(insert_point(&d, 2, &rule), None);
    }
}
