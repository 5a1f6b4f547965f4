use super::map::{Assoc, MapRange, Mappable, StepMap};
use super::step::{StepError, StepResult};
use crate::model::{Node, Slice};

/// Replace `from..to` with a slice. A structure step must not delete
/// content, only node boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceStep {
    pub from: usize,
    pub to: usize,
    pub slice: Slice,
    pub structure: bool,
}

impl ReplaceStep {
    pub fn new(from: usize, to: usize, slice: Slice, structure: bool) -> Self {
        Self {
            from,
            to,
            slice,
            structure,
        }
    }

    /// `from <= to`.
    pub fn valid_range(&self) -> bool {
        self.from <= self.to
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        if !self.valid_range() {
            return Err(StepError::InvalidRange);
        }
        if self.structure && content_between(doc, self.from, self.to)? {
            return Err(StepError::StructureOverwrite);
        }
        Ok(doc.replace(self.from, self.to, &self.slice)?)
    }

    pub fn get_map(&self) -> StepMap {
        StepMap::new(vec![MapRange::new(
            self.from,
            self.to.saturating_sub(self.from),
            self.slice.size(),
        )])
    }

    pub fn invert(&self, doc: &Node) -> Result<ReplaceStep, StepError> {
        Ok(ReplaceStep::new(
            self.from,
            self.from + self.slice.size(),
            doc.slice(self.from, self.to, false)?,
            false,
        ))
    }

    pub fn map(&self, mapping: &impl Mappable) -> Option<ReplaceStep> {
        let from = mapping.map_result(self.from, Assoc::After);
        let to = mapping.map_result(self.to, Assoc::Before);
        if from.deleted_across() && to.deleted_across() {
            return None;
        }
        Some(ReplaceStep::new(
            from.pos,
            from.pos.max(to.pos),
            self.slice.clone(),
            self.structure,
        ))
    }

    /// Merge with a replacement that starts where this one's inserted
    /// content ends, or ends where this one starts.
    pub fn merge(&self, other: &ReplaceStep) -> Option<ReplaceStep> {
        if other.structure || self.structure {
            return None;
        }
        let empty = self.slice.size() + other.slice.size() == 0;
        if self.from + self.slice.size() == other.from
            && self.slice.open_end() == 0
            && other.slice.open_start() == 0
        {
            let slice = if empty {
                Slice::empty()
            } else {
                Slice::new(
                    self.slice.content().append(other.slice.content()),
                    self.slice.open_start(),
                    other.slice.open_end(),
                )
            };
            Some(ReplaceStep::new(
                self.from,
                self.to + (other.to - other.from),
                slice,
                false,
            ))
        } else if other.to == self.from
            && self.slice.open_start() == 0
            && other.slice.open_end() == 0
        {
            let slice = if empty {
                Slice::empty()
            } else {
                Slice::new(
                    other.slice.content().append(self.slice.content()),
                    other.slice.open_start(),
                    self.slice.open_end(),
                )
            };
            Some(ReplaceStep::new(other.from, self.to, slice, false))
        } else {
            None
        }
    }
}

/// Replace `from..to` with a slice while keeping the content of
/// `gap_from..gap_to`, which is reinserted into the slice at `insert`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceAroundStep {
    pub from: usize,
    pub to: usize,
    pub gap_from: usize,
    pub gap_to: usize,
    pub slice: Slice,
    pub insert: usize,
    pub structure: bool,
}

impl ReplaceAroundStep {
    pub fn new(
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        insert: usize,
        structure: bool,
    ) -> Self {
        Self {
            from,
            to,
            gap_from,
            gap_to,
            slice,
            insert,
            structure,
        }
    }

    /// `from <= gap_from <= gap_to <= to`, with the insert point inside the slice.
    pub fn valid_range(&self) -> bool {
        self.from <= self.gap_from
            && self.gap_from <= self.gap_to
            && self.gap_to <= self.to
            && self.insert <= self.slice.size()
    }

    pub fn apply(&self, doc: &Node) -> StepResult {
        if !self.valid_range() {
            return Err(StepError::InvalidRange);
        }
        if self.structure
            && (content_between(doc, self.from, self.gap_from)?
                || content_between(doc, self.gap_to, self.to)?)
        {
            return Err(StepError::GapOverwrite);
        }
        let gap = doc.slice(self.gap_from, self.gap_to, false)?;
        if gap.open_start() > 0 || gap.open_end() > 0 {
            return Err(StepError::GapNotFlat);
        }
        let inserted = self
            .slice
            .insert_at(self.insert, gap.content())
            .ok_or(StepError::GapMismatch)?;
        Ok(doc.replace(self.from, self.to, &inserted)?)
    }

    pub fn get_map(&self) -> StepMap {
        StepMap::new(vec![
            MapRange::new(self.from, self.gap_from.saturating_sub(self.from), self.insert),
            MapRange::new(
                self.gap_to,
                self.to.saturating_sub(self.gap_to),
                self.slice.size().saturating_sub(self.insert),
            ),
        ])
    }

    pub fn invert(&self, doc: &Node) -> Result<ReplaceAroundStep, StepError> {
        let gap = self.gap_to - self.gap_from;
        let removed = doc
            .slice(self.from, self.to, false)?
            .remove_between(self.gap_from - self.from, self.gap_to - self.from)?;
        Ok(ReplaceAroundStep::new(
            self.from,
            self.from + self.slice.size() + gap,
            self.from + self.insert,
            self.from + self.insert + gap,
            removed,
            self.gap_from - self.from,
            self.structure,
        ))
    }

    pub fn map(&self, mapping: &impl Mappable) -> Option<ReplaceAroundStep> {
        let from = mapping.map_result(self.from, Assoc::After);
        let to = mapping.map_result(self.to, Assoc::Before);
        let gap_from = if self.from == self.gap_from {
            from.pos
        } else {
            mapping.map(self.gap_from, Assoc::Before)
        };
        let gap_to = if self.to == self.gap_to {
            to.pos
        } else {
            mapping.map(self.gap_to, Assoc::After)
        };
        if (from.deleted_across() && to.deleted_across()) || gap_from < from.pos || gap_to > to.pos {
            return None;
        }
        Some(ReplaceAroundStep::new(
            from.pos,
            to.pos,
            gap_from,
            gap_to,
            self.slice.clone(),
            self.insert,
            self.structure,
        ))
    }
}

/// Whether the range `from..to` covers anything besides node boundaries.
fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, StepError> {
    let rfrom = doc.resolve(from)?;
    let mut dist = to.saturating_sub(from);
    let mut depth = rfrom.depth();
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom.node(depth).maybe_child(rfrom.index_after(depth)).cloned();
        while dist > 0 {
            let Some(node) = next.filter(|n| !n.is_leaf()) else {
                return Ok(true);
            };
            next = node.first_child().cloned();
            dist -= 1;
        }
    }
    Ok(false)
}
