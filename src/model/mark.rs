use super::{Attrs, MarkType};
use std::fmt;

/// A piece of inline formatting. Marks on a node form an ordered set sorted by
/// mark type rank, with no two marks that exclude each other.
#[derive(Clone, PartialEq)]
pub struct Mark {
    mark_type: MarkType,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new(mark_type: MarkType, attrs: Attrs) -> Self {
        Self { mark_type, attrs }
    }

    pub fn mark_type(&self) -> &MarkType {
        &self.mark_type
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Add this mark to `set`, replacing marks it excludes. If a mark in the
    /// set excludes this one, the set is returned unchanged.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.mark_type.excludes(&other.mark_type) {
                copy.get_or_insert_with(|| set[..i].to_vec());
            } else if other.mark_type.excludes(&self.mark_type) {
                return set.to_vec();
            } else {
                if !placed && other.mark_type.rank() > self.mark_type.rank() {
                    copy.get_or_insert_with(|| set[..i].to_vec())
                        .push(self.clone());
                    placed = true;
                }
                if let Some(copy) = copy.as_mut() {
                    copy.push(other.clone());
                }
            }
        }
        let mut copy = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            copy.push(self.clone());
        }
        copy
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }

    pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
        a == b
    }

    /// Normalize an arbitrary list of marks into a sorted set.
    pub fn set_from(mut marks: Vec<Mark>) -> Vec<Mark> {
        if marks.len() > 1 {
            marks.sort_by_key(|m| m.mark_type.rank());
        }
        marks
    }
}

impl fmt::Debug for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{}", self.mark_type.name())
        } else {
            write!(f, "{}{:?}", self.mark_type.name(), self.attrs)
        }
    }
}
