use super::mark_step::{AddMarkStep, RemoveMarkStep};
use super::replace_step::ReplaceStep;
use super::step::Step;
use super::{Transform, TransformError};
use crate::model::{ContentMatch, Fragment, Mark, MarkType, NodeType, Slice};

/// Which marks [`Transform::remove_mark`] strips.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkFilter {
    /// Every mark.
    All,
    /// Every mark of this type, whatever its attributes.
    Type(MarkType),
    /// Only marks equal to this one.
    Mark(Mark),
}

impl From<Mark> for MarkFilter {
    fn from(mark: Mark) -> Self {
        MarkFilter::Mark(mark)
    }
}

impl From<MarkType> for MarkFilter {
    fn from(mark_type: MarkType) -> Self {
        MarkFilter::Type(mark_type)
    }
}

pub(crate) fn add_mark(
    tr: &mut Transform,
    from: usize,
    to: usize,
    mark: &Mark,
) -> Result<(), TransformError> {
    let mut removed: Vec<RemoveMarkStep> = Vec::new();
    let mut added: Vec<AddMarkStep> = Vec::new();
    tr.doc().nodes_between(from, to, &mut |node, pos, parent, _| {
        if !node.is_inline() {
            return true;
        }
        let marks = node.marks();
        if mark.is_in_set(marks) || !parent.node_type().allows_mark_type(mark.mark_type()) {
            return true;
        }
        let start = pos.max(from);
        let end = (pos + node.node_size()).min(to);
        let new_set = mark.add_to_set(marks);
        for old in marks.iter().filter(|m| !m.is_in_set(&new_set)) {
            match removed.last_mut() {
                Some(last) if last.to == start && last.mark == *old => last.to = end,
                _ => removed.push(RemoveMarkStep::new(start, end, old.clone())),
            }
        }
        match added.last_mut() {
            Some(last) if last.to == start => last.to = end,
            _ => added.push(AddMarkStep::new(start, end, mark.clone())),
        }
        true
    });
    for step in removed {
        tr.step(Step::RemoveMark(step))?;
    }
    for step in added {
        tr.step(Step::AddMark(step))?;
    }
    Ok(())
}

struct Matched {
    mark: Mark,
    from: usize,
    to: usize,
    step: usize,
}

pub(crate) fn remove_mark(
    tr: &mut Transform,
    from: usize,
    to: usize,
    filter: &MarkFilter,
) -> Result<(), TransformError> {
    let mut matched: Vec<Matched> = Vec::new();
    let mut step = 0;
    tr.doc().nodes_between(from, to, &mut |node, pos, _, _| {
        if !node.is_inline() {
            return true;
        }
        step += 1;
        let to_remove: Vec<Mark> = match filter {
            MarkFilter::All => node.marks().to_vec(),
            MarkFilter::Type(mark_type) => node
                .marks()
                .iter()
                .filter(|m| m.mark_type() == mark_type)
                .cloned()
                .collect(),
            MarkFilter::Mark(mark) if mark.is_in_set(node.marks()) => vec![mark.clone()],
            MarkFilter::Mark(_) => Vec::new(),
        };
        let end = (pos + node.node_size()).min(to);
        for mark in to_remove {
            // Extend a run that ended on the previous inline node.
            let found = matched
                .iter()
                .rposition(|m| m.step + 1 == step && m.mark == mark);
            match found {
                Some(i) => {
                    matched[i].to = end;
                    matched[i].step = step;
                }
                None => matched.push(Matched {
                    mark,
                    from: pos.max(from),
                    to: end,
                    step,
                }),
            }
        }
        true
    });
    for m in matched {
        tr.step(Step::RemoveMark(RemoveMarkStep::new(m.from, m.to, m.mark)))?;
    }
    Ok(())
}

/// Remove the children and marks of the node at `pos` that would not be
/// allowed in a node of `parent_type`, and fill in required content at the
/// end. `matcher` is the content match to start from, defaulting to the
/// start of `parent_type`.
pub(crate) fn clear_incompatible(
    tr: &mut Transform,
    pos: usize,
    parent_type: &NodeType,
    matcher: Option<ContentMatch>,
) -> Result<(), TransformError> {
    let node = tr.doc().node_at(pos).ok_or(TransformError::NoNodeAt(pos))?;
    let mut matcher = matcher.unwrap_or_else(|| parent_type.content_match());
    let mut replace_steps = Vec::new();
    let mut cur = pos + 1;
    for child in node.content() {
        let end = cur + child.node_size();
        match matcher.match_type(child.node_type()) {
            None => replace_steps.push(ReplaceStep::new(cur, end, Slice::empty(), false)),
            Some(allowed) => {
                matcher = allowed;
                for mark in child.marks() {
                    if !parent_type.allows_mark_type(mark.mark_type()) {
                        tr.step(Step::RemoveMark(RemoveMarkStep::new(cur, end, mark.clone())))?;
                    }
                }
            }
        }
        cur = end;
    }
    if !matcher.valid_end() {
        let fill = matcher
            .fill_before(&Fragment::empty(), true, 0)
            .unwrap_or_else(Fragment::empty);
        tr.replace(cur, cur, Slice::new(fill, 0, 0))?;
    }
    for step in replace_steps.into_iter().rev() {
        tr.step(Step::Replace(step))?;
    }
    Ok(())
}
