//! Fitting arbitrary slices into a document.
//!
//! [`replace_step`] finds the cheapest step that places a slice between two
//! positions while keeping the document valid, closing and opening nodes on
//! either side as needed. [`replace_range`] and friends build on it to pick
//! sensible replacement depths for user-level edits.

use super::replace_step::{ReplaceAroundStep, ReplaceStep};
use super::step::Step;
use super::structure::insert_point;
use super::{Transform, TransformError};
use crate::model::{Attrs, ContentMatch, Fragment, Node, NodeType, ResolvedPos, Slice};
use tracing::trace;

/// Build a step that replaces `from..to` with `slice`, adjusting the slice
/// to fit. `Ok(None)` means the replacement would be a no-op.
pub fn replace_step(
    doc: &Node,
    from: usize,
    to: usize,
    slice: Slice,
) -> Result<Option<Step>, TransformError> {
    if from > to {
        return Err(TransformError::InvalidRange { from, to });
    }
    if from == to && slice.size() == 0 {
        return Ok(None);
    }
    let rfrom = doc.resolve(from)?;
    let rto = doc.resolve(to)?;
    if fits_trivially(&rfrom, &rto, &slice) {
        return Ok(Some(Step::Replace(ReplaceStep::new(from, to, slice, false))));
    }
    Fitter::new(rfrom, rto, slice).fit()
}

fn fits_trivially(rfrom: &ResolvedPos, rto: &ResolvedPos, slice: &Slice) -> bool {
    slice.open_start() == 0
        && slice.open_end() == 0
        && rfrom.start(rfrom.depth()) == rto.start(rto.depth())
        && rfrom.parent().can_replace(
            rfrom.index(rfrom.depth()),
            rto.index(rto.depth()),
            slice.content(),
        )
}

#[derive(Clone)]
struct Frontier {
    node_type: NodeType,
    matcher: ContentMatch,
}

struct Fittable {
    slice_depth: usize,
    frontier_depth: usize,
    parent: Option<Node>,
    inject: Option<Fragment>,
    wrap: Vec<NodeType>,
}

struct CloseLevel {
    depth: usize,
    fit: Fragment,
}

/// Places the content of `unplaced` into the open nodes on the `frontier`
/// one piece at a time, opening slice nodes or dropping them when nothing
/// fits, then closes the result against the content after `to`.
struct Fitter {
    from: ResolvedPos,
    to: ResolvedPos,
    unplaced: Slice,
    frontier: Vec<Frontier>,
    placed: Fragment,
}

impl Fitter {
    fn new(from: ResolvedPos, to: ResolvedPos, unplaced: Slice) -> Self {
        let frontier = (0..=from.depth())
            .map(|depth| {
                let node = from.node(depth);
                Frontier {
                    node_type: node.node_type().clone(),
                    matcher: node
                        .content_match_at(from.index_after(depth))
                        .unwrap_or_else(|| node.node_type().content_match()),
                }
            })
            .collect();
        let mut placed = Fragment::empty();
        for depth in (1..=from.depth()).rev() {
            placed = Fragment::from(from.node(depth).copy(placed));
        }
        Self {
            from,
            to,
            unplaced,
            frontier,
            placed,
        }
    }

    fn depth(&self) -> usize {
        self.frontier.len() - 1
    }

    fn fit(mut self) -> Result<Option<Step>, TransformError> {
        while self.unplaced.size() > 0 {
            if let Some(fittable) = self.find_fittable() {
                trace!(
                    slice_depth = fittable.slice_depth,
                    frontier_depth = fittable.frontier_depth,
                    wrappers = fittable.wrap.len(),
                    "placing slice content"
                );
                self.place_nodes(fittable)?;
            } else if !self.open_more() {
                self.drop_node();
            }
        }

        let move_inline = self.must_move_inline();
        let placed_size = self
            .placed
            .size()
            .saturating_sub(self.depth() + self.from.depth());
        let from = self.from.clone();
        let target = match move_inline {
            Some(pos) => from.doc().resolve(pos)?,
            None => self.to.clone(),
        };
        let Some(to) = self.close(target)? else {
            return Err(TransformError::CannotFit {
                from: from.pos(),
                to: self.to.pos(),
            });
        };

        let mut content = self.placed.clone();
        let mut open_start = from.depth();
        let mut open_end = to.depth();
        while open_start > 0 && open_end > 0 && content.child_count() == 1 {
            content = content.child(0).content().clone();
            open_start -= 1;
            open_end -= 1;
        }
        let slice = Slice::new(content, open_start, open_end);
        if let Some(move_inline) = move_inline {
            return Ok(Some(Step::ReplaceAround(ReplaceAroundStep::new(
                from.pos(),
                move_inline,
                self.to.pos(),
                self.to.end(self.to.depth()),
                slice,
                placed_size,
                false,
            ))));
        }
        if slice.size() > 0 || from.pos() != self.to.pos() {
            return Ok(Some(Step::Replace(ReplaceStep::new(
                from.pos(),
                to.pos(),
                slice,
                false,
            ))));
        }
        Ok(None)
    }

    /// Find a position on the frontier where the next piece of the slice can
    /// be placed. The first pass only accepts direct fits (possibly after
    /// generated filler nodes); the second allows wrapping the piece.
    fn find_fittable(&self) -> Option<Fittable> {
        let mut start_depth = self.unplaced.open_start();
        let mut cur = self.unplaced.content().clone();
        let mut open_end = self.unplaced.open_end();
        for d in 0..start_depth {
            let Some(node) = cur.first_child().cloned() else {
                break;
            };
            if cur.child_count() > 1 {
                open_end = 0;
            }
            if node.node_type().spec().isolating && open_end <= d {
                start_depth = d;
                break;
            }
            cur = node.content().clone();
        }

        for pass in 1..=2 {
            let top = if pass == 1 {
                start_depth
            } else {
                self.unplaced.open_start()
            };
            for slice_depth in (0..=top).rev() {
                let (fragment, parent) = if slice_depth > 0 {
                    let Some(parent) = content_at(self.unplaced.content(), slice_depth - 1)
                        .first_child()
                        .cloned()
                    else {
                        continue;
                    };
                    (parent.content().clone(), Some(parent))
                } else {
                    (self.unplaced.content().clone(), None)
                };
                let first = fragment.first_child();
                for frontier_depth in (0..=self.depth()).rev() {
                    let Frontier { node_type, matcher } = &self.frontier[frontier_depth];
                    if pass == 1 {
                        let fits = match first {
                            Some(first) if matcher.match_type(first.node_type()).is_some() => {
                                Some(None)
                            }
                            Some(first) => matcher
                                .fill_before(&Fragment::from(first.clone()), false, 0)
                                .map(Some),
                            None => parent
                                .as_ref()
                                .filter(|p| node_type.compatible_content(p.node_type()))
                                .map(|_| None),
                        };
                        if let Some(inject) = fits {
                            return Some(Fittable {
                                slice_depth,
                                frontier_depth,
                                parent,
                                inject,
                                wrap: Vec::new(),
                            });
                        }
                    } else if let Some(first) = first
                        && let Some(wrap) = matcher.find_wrapping(first.node_type())
                    {
                        return Some(Fittable {
                            slice_depth,
                            frontier_depth,
                            parent,
                            inject: None,
                            wrap,
                        });
                    }
                    if parent
                        .as_ref()
                        .is_some_and(|p| matcher.match_type(p.node_type()).is_some())
                    {
                        break;
                    }
                }
            }
        }
        None
    }

    fn open_more(&mut self) -> bool {
        let content = self.unplaced.content().clone();
        let open_start = self.unplaced.open_start();
        let open_end = self.unplaced.open_end();
        let inner = content_at(&content, open_start);
        match inner.first_child() {
            Some(first) if !first.is_leaf() => {}
            _ => return false,
        }
        let reaches_end = inner.size() + open_start >= content.size().saturating_sub(open_end);
        let new_end = if reaches_end { open_start + 1 } else { 0 };
        self.unplaced = Slice::new(content, open_start + 1, open_end.max(new_end));
        true
    }

    fn drop_node(&mut self) {
        let content = self.unplaced.content().clone();
        let open_start = self.unplaced.open_start();
        let open_end = self.unplaced.open_end();
        let inner = content_at(&content, open_start);
        self.unplaced = if inner.child_count() <= 1 && open_start > 0 {
            let open_at_end = content.size().saturating_sub(open_start) <= open_start + inner.size();
            Slice::new(
                drop_from_fragment(&content, open_start - 1, 1),
                open_start - 1,
                if open_at_end { open_start - 1 } else { open_end },
            )
        } else {
            Slice::new(drop_from_fragment(&content, open_start, 1), open_start, open_end)
        };
    }

    fn place_nodes(&mut self, fittable: Fittable) -> Result<(), TransformError> {
        let Fittable {
            slice_depth,
            frontier_depth,
            parent,
            inject,
            wrap,
        } = fittable;
        while self.depth() > frontier_depth {
            self.close_frontier_node();
        }
        // Wrappers are only opened here; the next pass places content inside them.
        for node_type in &wrap {
            self.open_frontier_node(node_type, None, Fragment::empty())?;
        }

        let slice = self.unplaced.clone();
        let fragment = parent
            .as_ref()
            .map_or_else(|| slice.content().clone(), |p| p.content().clone());
        let open_start = slice.open_start() - slice_depth;
        let Frontier {
            node_type,
            mut matcher,
        } = self.frontier[frontier_depth].clone();
        let mut taken = 0;
        let mut add = Vec::new();
        if let Some(inject) = &inject {
            add.extend(inject.iter().cloned());
            if let Some(after) = matcher.match_fragment(inject) {
                matcher = after;
            }
        }
        let mut open_end_count = (fragment.size() + slice_depth) as isize
            - slice.content().size().saturating_sub(slice.open_end()) as isize;
        while taken < fragment.child_count() {
            let next = fragment.child(taken);
            let Some(matches) = matcher.match_type(next.node_type()) else {
                break;
            };
            taken += 1;
            if taken > 1 || open_start == 0 || next.content_size() > 0 {
                matcher = matches;
                let marked = next.mark(node_type.allowed_marks(next.marks()));
                add.push(close_node_start(
                    &marked,
                    if taken == 1 { open_start } else { 0 },
                    if taken == fragment.child_count() {
                        open_end_count
                    } else {
                        -1
                    },
                ));
            }
        }
        let to_end = taken == fragment.child_count();
        if !to_end {
            open_end_count = -1;
        }

        self.placed = add_to_fragment(&self.placed, frontier_depth, &Fragment::from_array(add));
        self.frontier[frontier_depth].matcher = matcher;

        // A slice level that is used up closes its frontier node when the
        // types agree, or when the level had no content left to place.
        if to_end
            && open_end_count < 0
            && self.frontier.len() > 1
            && parent.as_ref().is_some_and(|p| {
                fragment.child_count() == 0
                    || *p.node_type() == self.frontier[self.depth()].node_type
            })
        {
            self.close_frontier_node();
        }

        let mut cur = fragment;
        for _ in 0..open_end_count.max(0) {
            let Some(node) = cur.last_child().cloned() else {
                break;
            };
            let matcher = node
                .content_match_at(node.child_count())
                .unwrap_or_else(|| node.node_type().content_match());
            self.frontier.push(Frontier {
                node_type: node.node_type().clone(),
                matcher,
            });
            cur = node.content().clone();
        }

        self.unplaced = if !to_end {
            Slice::new(
                drop_from_fragment(slice.content(), slice_depth, taken),
                slice.open_start(),
                slice.open_end(),
            )
        } else if slice_depth == 0 {
            Slice::empty()
        } else {
            Slice::new(
                drop_from_fragment(slice.content(), slice_depth - 1, 1),
                slice_depth - 1,
                if open_end_count < 0 {
                    slice.open_end()
                } else {
                    slice_depth - 1
                },
            )
        };
        Ok(())
    }

    /// When the slice ends in a textblock but the content after `to` is
    /// inline and cannot be joined directly, the trailing inline content has
    /// to be moved into the placed textblock. Returns the end of the range
    /// to move.
    fn must_move_inline(&self) -> Option<usize> {
        if !self.to.parent().is_textblock() {
            return None;
        }
        let top = &self.frontier[self.depth()];
        if !top.node_type.is_textblock()
            || content_after_fits(&self.to, self.to.depth(), &top.node_type, &top.matcher, false)
                .is_none()
            || (self.to.depth() == self.depth()
                && self
                    .find_close_level(&self.to)
                    .is_some_and(|level| level.depth == self.depth()))
        {
            return None;
        }
        let mut depth = self.to.depth();
        let mut after = self.to.after(depth);
        while depth > 1 {
            depth -= 1;
            if after != self.to.end(depth) {
                break;
            }
            after += 1;
        }
        Some(after)
    }

    /// The deepest frontier level that can be closed against the content
    /// after `to`. Ancestors of `to` below that level are always reopened,
    /// even when nothing is left in them, so they survive the replace.
    fn find_close_level(&self, to: &ResolvedPos) -> Option<CloseLevel> {
        'scan: for i in (0..=self.depth().min(to.depth())).rev() {
            let Frontier { node_type, matcher } = &self.frontier[i];
            let Some(fit) = content_after_fits(to, i, node_type, matcher, false) else {
                continue;
            };
            for d in (0..i).rev() {
                let outer = &self.frontier[d];
                match content_after_fits(to, d, &outer.node_type, &outer.matcher, true) {
                    Some(matches) if matches.child_count() == 0 => {}
                    _ => continue 'scan,
                }
            }
            return Some(CloseLevel { depth: i, fit });
        }
        None
    }

    fn close(&mut self, to: ResolvedPos) -> Result<Option<ResolvedPos>, TransformError> {
        let Some(close) = self.find_close_level(&to) else {
            return Ok(None);
        };
        while self.depth() > close.depth {
            self.close_frontier_node();
        }
        if close.fit.child_count() > 0 {
            self.placed = add_to_fragment(&self.placed, close.depth, &close.fit);
        }
        for d in close.depth + 1..=to.depth() {
            let node = to.node(d);
            let add = node
                .node_type()
                .content_match()
                .fill_before(node.content(), true, to.index(d))
                .unwrap_or_else(Fragment::empty);
            self.open_frontier_node(node.node_type(), Some(node.attrs()), add)?;
        }
        Ok(Some(to))
    }

    fn open_frontier_node(
        &mut self,
        node_type: &NodeType,
        attrs: Option<&Attrs>,
        content: Fragment,
    ) -> Result<(), TransformError> {
        let depth = self.depth();
        let top = &mut self.frontier[depth];
        if let Some(next) = top.matcher.match_type(node_type) {
            top.matcher = next;
        }
        let node = node_type.create(attrs, content, Vec::new())?;
        self.placed = add_to_fragment(&self.placed, depth, &Fragment::from(node));
        self.frontier.push(Frontier {
            node_type: node_type.clone(),
            matcher: node_type.content_match(),
        });
        Ok(())
    }

    fn close_frontier_node(&mut self) {
        let Some(open) = self.frontier.pop() else {
            return;
        };
        if let Some(add) = open.matcher.fill_before(&Fragment::empty(), true, 0)
            && add.child_count() > 0
        {
            self.placed = add_to_fragment(&self.placed, self.frontier.len(), &add);
        }
    }
}

/// Fill in the required content before a node whose start was open, and
/// after it too when its end is closed.
fn close_node_start(node: &Node, open_start: usize, open_end: isize) -> Node {
    if open_start == 0 {
        return node.clone();
    }
    let mut frag = node.content().clone();
    if open_start > 1
        && let Some(first) = frag.first_child().cloned()
    {
        let inner_end = if frag.child_count() == 1 { open_end - 1 } else { 0 };
        frag = frag.replace_child(0, close_node_start(&first, open_start - 1, inner_end));
    }
    let start = node.node_type().content_match();
    if let Some(before) = start.fill_before(&frag, false, 0) {
        frag = before.append(&frag);
    }
    if open_end <= 0
        && let Some(after) = start
            .match_fragment(&frag)
            .and_then(|m| m.fill_before(&Fragment::empty(), true, 0))
    {
        frag = frag.append(&after);
    }
    node.copy(frag)
}

fn drop_from_fragment(fragment: &Fragment, depth: usize, count: usize) -> Fragment {
    if depth == 0 {
        return fragment.cut_by_index(count.min(fragment.child_count()), fragment.child_count());
    }
    let Some(first) = fragment.first_child() else {
        return fragment.clone();
    };
    fragment.replace_child(
        0,
        first.copy(drop_from_fragment(first.content(), depth - 1, count)),
    )
}

fn add_to_fragment(fragment: &Fragment, depth: usize, content: &Fragment) -> Fragment {
    if depth == 0 {
        return fragment.append(content);
    }
    let Some(last) = fragment.last_child() else {
        return fragment.append(content);
    };
    fragment.replace_child(
        fragment.child_count() - 1,
        last.copy(add_to_fragment(last.content(), depth - 1, content)),
    )
}

fn content_at(fragment: &Fragment, depth: usize) -> Fragment {
    let mut fragment = fragment.clone();
    for _ in 0..depth {
        let Some(first) = fragment.first_child().cloned() else {
            break;
        };
        fragment = first.content().clone();
    }
    fragment
}

fn content_after_fits(
    to: &ResolvedPos,
    depth: usize,
    node_type: &NodeType,
    matcher: &ContentMatch,
    open: bool,
) -> Option<Fragment> {
    let node = to.node(depth);
    let index = if open {
        to.index_after(depth)
    } else {
        to.index(depth)
    };
    if index == node.child_count() && !node_type.compatible_content(node.node_type()) {
        return None;
    }
    let fit = matcher.fill_before(node.content(), true, index)?;
    if invalid_marks(node_type, node.content(), index) {
        None
    } else {
        Some(fit)
    }
}

fn invalid_marks(node_type: &NodeType, fragment: &Fragment, start: usize) -> bool {
    fragment
        .iter()
        .skip(start)
        .any(|child| !node_type.allows_marks(child.marks()))
}

/// Depths at which `from..to` covers the whole content of an ancestor.
fn covered_depths(rfrom: &ResolvedPos, rto: &ResolvedPos) -> Vec<usize> {
    let mut result = Vec::new();
    for d in (0..=rfrom.depth().min(rto.depth())).rev() {
        let start = rfrom.start(d);
        if start + (rfrom.depth() - d) < rfrom.pos()
            || rto.end(d) > rto.pos() + (rto.depth() - d)
            || rfrom.node(d).node_type().spec().isolating
            || rto.node(d).node_type().spec().isolating
        {
            break;
        }
        if start == rto.start(d)
            || (d == rfrom.depth()
                && d == rto.depth()
                && rfrom.parent().inline_content()
                && rto.parent().inline_content()
                && d > 0
                && rto.start(d - 1) + 1 == start)
        {
            result.push(d);
        }
    }
    result
}

fn defines_content(node_type: &NodeType) -> bool {
    node_type.spec().defining
}

fn close_fragment(
    fragment: &Fragment,
    depth: usize,
    old_open: usize,
    new_open: usize,
    parent: Option<&Node>,
) -> Fragment {
    let mut fragment = fragment.clone();
    if depth < old_open
        && let Some(first) = fragment.first_child().cloned()
    {
        let inner = close_fragment(first.content(), depth + 1, old_open, new_open, Some(&first));
        fragment = fragment.replace_child(0, first.copy(inner));
    }
    if depth > new_open
        && let Some(matcher) = parent.and_then(|p| p.content_match_at(0))
    {
        let start = matcher
            .fill_before(&fragment, false, 0)
            .map_or_else(|| fragment.clone(), |before| before.append(&fragment));
        let end = matcher
            .match_fragment(&start)
            .and_then(|m| m.fill_before(&Fragment::empty(), true, 0))
            .unwrap_or_else(Fragment::empty);
        fragment = start.append(&end);
    }
    fragment
}

/// Replace `from..to` with `slice`, expanding the range to cover whole
/// parent nodes when that lets the slice's open nodes take their place.
pub(crate) fn replace_range(
    tr: &mut Transform,
    from: usize,
    to: usize,
    slice: Slice,
) -> Result<(), TransformError> {
    if slice.size() == 0 {
        return delete_range(tr, from, to);
    }
    let rfrom = tr.doc().resolve(from)?;
    let rto = tr.doc().resolve(to)?;
    if fits_trivially(&rfrom, &rto, &slice) {
        tr.step(Step::Replace(ReplaceStep::new(from, to, slice, false)))?;
        return Ok(());
    }

    // Negative depths mean "replace from before that ancestor up to `to`"
    // instead of covering the whole node.
    let mut target_depths: Vec<isize> = covered_depths(&rfrom, &rto)
        .into_iter()
        .map(|d| d as isize)
        .collect();
    if target_depths.last() == Some(&0) {
        target_depths.pop();
    }
    let mut preferred_target = -(rfrom.depth() as isize + 1);
    target_depths.insert(0, preferred_target);
    let mut pos = rfrom.pos() as isize - 1;
    for d in (1..=rfrom.depth()).rev() {
        let spec = rfrom.node(d).node_type().spec();
        if spec.defining || spec.isolating {
            break;
        }
        if target_depths.contains(&(d as isize)) {
            preferred_target = d as isize;
        } else if rfrom.before(d) as isize == pos {
            target_depths.insert(1, -(d as isize));
        }
        pos -= 1;
    }
    let preferred_target_index = target_depths
        .iter()
        .position(|&d| d == preferred_target)
        .unwrap_or(0);

    let mut left_nodes = Vec::new();
    let mut content = slice.content().clone();
    for i in 0..=slice.open_start() {
        let Some(node) = content.first_child().cloned() else {
            break;
        };
        content = node.content().clone();
        left_nodes.push(node);
        if i == slice.open_start() {
            break;
        }
    }

    // Back up to cover defining textblocks directly above the preferred
    // depth, possibly skipping one non-defining textblock.
    let mut preferred_depth = slice.open_start();
    let target_node = rfrom.node(preferred_target.unsigned_abs() - 1);
    for d in (0..preferred_depth).rev() {
        let Some(left) = left_nodes.get(d) else {
            continue;
        };
        let def = defines_content(left.node_type());
        if def && !left.same_markup(target_node) {
            preferred_depth = d;
        } else if def || !left.node_type().is_textblock() {
            break;
        }
    }

    let open_start = slice.open_start();
    for j in (0..=open_start).rev() {
        let open_depth = (j + preferred_depth + 1) % (open_start + 1);
        let Some(insert) = left_nodes.get(open_depth) else {
            continue;
        };
        for i in 0..target_depths.len() {
            let target = target_depths[(i + preferred_target_index) % target_depths.len()];
            let expand = target >= 0;
            let target_depth = target.unsigned_abs();
            let parent = rfrom.node(target_depth - 1);
            let index = rfrom.index(target_depth - 1);
            if parent.can_replace_with(index, index, insert.node_type(), Some(insert.marks())) {
                let end = if expand { rto.after(target_depth) } else { to };
                let closed = Slice::new(
                    close_fragment(slice.content(), 0, open_start, open_depth, None),
                    open_depth,
                    slice.open_end(),
                );
                tr.replace(rfrom.before(target_depth), end, closed)?;
                return Ok(());
            }
        }
    }

    let start_steps = tr.steps().len();
    let (mut from, mut to) = (from, to);
    for &depth in target_depths.iter().rev() {
        match tr.replace(from, to, slice.clone()) {
            Ok(_) | Err(TransformError::CannotFit { .. }) => {}
            Err(err) => return Err(err),
        }
        if tr.steps().len() > start_steps {
            return Ok(());
        }
        if depth < 0 {
            continue;
        }
        from = rfrom.before(depth as usize);
        to = rto.after(depth as usize);
    }
    Err(TransformError::CannotFit { from, to })
}

/// Replace `from..to` with a single node. An empty range inside a non-empty
/// parent that cannot hold a block node is moved to a nearby valid point.
pub(crate) fn replace_range_with(
    tr: &mut Transform,
    from: usize,
    to: usize,
    node: Node,
) -> Result<(), TransformError> {
    let (mut from, mut to) = (from, to);
    if !node.is_inline()
        && from == to
        && tr.doc().resolve(from)?.parent().content_size() > 0
        && let Some(point) = insert_point(tr.doc(), from, node.node_type())
    {
        from = point;
        to = point;
    }
    replace_range(tr, from, to, Slice::new(Fragment::from(node), 0, 0))
}

/// Delete `from..to`, widening the range to whole nodes when it covers
/// their entire content.
pub(crate) fn delete_range(
    tr: &mut Transform,
    from: usize,
    to: usize,
) -> Result<(), TransformError> {
    let rfrom = tr.doc().resolve(from)?;
    let rto = tr.doc().resolve(to)?;
    let covered = covered_depths(&rfrom, &rto);
    for (i, &depth) in covered.iter().enumerate() {
        let last = i == covered.len() - 1;
        if (last && depth == 0) || rfrom.node(depth).node_type().content_match().valid_end() {
            tr.delete(rfrom.start(depth), rto.end(depth))?;
            return Ok(());
        }
        if depth > 0
            && (last
                || rfrom.node(depth - 1).can_replace(
                    rfrom.index(depth - 1),
                    rto.index_after(depth - 1),
                    &Fragment::empty(),
                ))
        {
            tr.delete(rfrom.before(depth), rto.after(depth))?;
            return Ok(());
        }
    }
    for d in 1..=rfrom.depth().min(rto.depth()) {
        if from - rfrom.start(d) == rfrom.depth() - d
            && to > rfrom.end(d)
            && rto.end(d) - to != rto.depth() - d
            && rfrom.start(d - 1) == rto.start(d - 1)
            && rfrom.node(d - 1).can_replace(
                rfrom.index(d - 1),
                rto.index(d - 1),
                &Fragment::empty(),
            )
        {
            tr.delete(rfrom.before(d), to)?;
            return Ok(());
        }
    }
    tr.delete(from, to)?;
    Ok(())
}
