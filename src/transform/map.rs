//! Position mapping through document changes.
//!
//! A [`StepMap`] describes the ranges one step replaced; a [`Mapping`] chains
//! many of them, optionally pairing maps that mirror each other so that
//! positions deleted and then restored can be recovered exactly.

/// Which side a position sticks to when content is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assoc {
    Before,
    #[default]
    After,
}

const DEL_BEFORE: u8 = 1;
const DEL_AFTER: u8 = 2;
const DEL_ACROSS: u8 = 4;
const DEL_SIDE: u8 = 8;

/// Identifies a position inside a replaced range so a mirroring map can put
/// it back where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recover {
    pub index: usize,
    pub offset: usize,
}

/// Outcome of mapping a position, including whether its surroundings were
/// deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    del_info: u8,
    pub recover: Option<Recover>,
}

impl MapResult {
    fn new(pos: usize, del_info: u8, recover: Option<Recover>) -> Self {
        Self {
            pos,
            del_info,
            recover,
        }
    }

    /// The content on the position's association side was deleted.
    pub fn deleted(&self) -> bool {
        self.del_info & DEL_SIDE > 0
    }

    pub fn deleted_before(&self) -> bool {
        self.del_info & (DEL_BEFORE | DEL_ACROSS) > 0
    }

    pub fn deleted_after(&self) -> bool {
        self.del_info & (DEL_AFTER | DEL_ACROSS) > 0
    }

    pub fn deleted_across(&self) -> bool {
        self.del_info & DEL_ACROSS > 0
    }
}

/// Anything positions can be mapped through.
pub trait Mappable {
    fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult;

    fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }
}

/// One replaced range: `old_size` positions starting at `start` became
/// `new_size` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapRange {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl MapRange {
    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        Self {
            start,
            old_size,
            new_size,
        }
    }
}

fn shift(pos: usize, diff: isize) -> usize {
    pos.saturating_add_signed(diff)
}

fn size_diff(range: &MapRange) -> isize {
    range.new_size as isize - range.old_size as isize
}

/// The position changes produced by a single step: a sorted list of
/// replaced ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<MapRange>,
    inverted: bool,
}

impl StepMap {
    pub fn new(ranges: Vec<MapRange>) -> Self {
        Self {
            ranges,
            inverted: false,
        }
    }

    /// A map that leaves every position in place.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A map that shifts every position by `n`.
    pub fn offset(n: isize) -> Self {
        match n {
            0 => Self::empty(),
            n if n < 0 => Self::new(vec![MapRange::new(0, n.unsigned_abs(), 0)]),
            n => Self::new(vec![MapRange::new(0, 0, n.unsigned_abs())]),
        }
    }

    pub fn ranges(&self) -> &[MapRange] {
        &self.ranges
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    fn sizes(&self, range: &MapRange) -> (usize, usize) {
        if self.inverted {
            (range.new_size, range.old_size)
        } else {
            (range.old_size, range.new_size)
        }
    }

    /// Map the recover token of a position back to the position inside the
    /// replaced range it came from.
    pub fn recover(&self, recover: Recover) -> usize {
        let mut diff = 0;
        if !self.inverted {
            for range in &self.ranges[..recover.index] {
                diff += size_diff(range);
            }
        }
        shift(self.ranges[recover.index].start, diff) + recover.offset
    }

    fn map_inner(&self, pos: usize, assoc: Assoc) -> MapResult {
        let mut diff: isize = 0;
        for (index, range) in self.ranges.iter().enumerate() {
            let start = if self.inverted {
                shift(range.start, -diff)
            } else {
                range.start
            };
            if start > pos {
                break;
            }
            let (old_size, new_size) = self.sizes(range);
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    Assoc::Before
                } else if pos == end {
                    Assoc::After
                } else {
                    assoc
                };
                let result = shift(start, diff) + if side == Assoc::Before { 0 } else { new_size };
                let anchor = if assoc == Assoc::Before { start } else { end };
                let recover = (pos != anchor).then_some(Recover {
                    index,
                    offset: pos - start,
                });
                let mut del = if pos == start {
                    DEL_AFTER
                } else if pos == end {
                    DEL_BEFORE
                } else {
                    DEL_ACROSS
                };
                if pos != anchor {
                    del |= DEL_SIDE;
                }
                return MapResult::new(result, del, recover);
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult::new(shift(pos, diff), 0, None)
    }

    /// Whether `pos` (identified by `recover`) still sits inside the range it
    /// was recorded in.
    pub fn touches(&self, pos: usize, recover: Recover) -> bool {
        let mut diff: isize = 0;
        for (index, range) in self.ranges.iter().enumerate() {
            let start = if self.inverted {
                shift(range.start, -diff)
            } else {
                range.start
            };
            if start > pos {
                break;
            }
            let (old_size, new_size) = self.sizes(range);
            let end = start + old_size;
            if pos <= end && index == recover.index {
                return true;
            }
            diff += new_size as isize - old_size as isize;
        }
        false
    }

    /// Call `f(old_start, old_end, new_start, new_end)` for every changed
    /// range, in document order.
    pub fn for_each<F: FnMut(usize, usize, usize, usize)>(&self, mut f: F) {
        let mut diff: isize = 0;
        for range in &self.ranges {
            let (old_size, new_size) = self.sizes(range);
            let start = range.start;
            let old_start = if self.inverted { shift(start, -diff) } else { start };
            let new_start = if self.inverted { start } else { shift(start, diff) };
            f(old_start, old_start + old_size, new_start, new_start + new_size);
            diff += new_size as isize - old_size as isize;
        }
    }

    pub fn invert(&self) -> StepMap {
        StepMap {
            ranges: self.ranges.clone(),
            inverted: !self.inverted,
        }
    }
}

impl Mappable for StepMap {
    fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        self.map_inner(pos, assoc)
    }
}

/// A pipeline of step maps. Maps `n` and `m` can be registered as mirrors of
/// each other, meaning one undoes the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
    mirror: Vec<(usize, usize)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_maps(maps: Vec<StepMap>) -> Self {
        Self {
            maps,
            mirror: Vec::new(),
        }
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// A mapping over maps `from..to`, keeping mirror pairs inside that window.
    pub fn slice(&self, from: usize, to: usize) -> Mapping {
        let mirror = self
            .mirror
            .iter()
            .filter(|&&(a, b)| (from..to).contains(&a) && (from..to).contains(&b))
            .map(|&(a, b)| (a - from, b - from))
            .collect();
        Mapping {
            maps: self.maps[from..to].to_vec(),
            mirror,
        }
    }

    /// Drop every map from `len` on, along with their mirror pairs.
    pub fn truncate(&mut self, len: usize) {
        self.maps.truncate(len);
        self.mirror.retain(|&(a, b)| a < len && b < len);
    }

    /// Append a map. With `mirrors`, it is registered as the mirror of the
    /// map at that index.
    pub fn append_map(&mut self, map: StepMap, mirrors: Option<usize>) {
        self.maps.push(map);
        if let Some(mirror) = mirrors {
            self.set_mirror(self.maps.len() - 1, mirror);
        }
    }

    pub fn append_mapping(&mut self, mapping: &Mapping) {
        let start = self.maps.len();
        for (i, map) in mapping.maps.iter().enumerate() {
            let mirror = mapping
                .get_mirror(i)
                .filter(|&m| m < i)
                .map(|m| start + m);
            self.append_map(map.clone(), mirror);
        }
    }

    /// Append the inverse of `mapping`, mirroring each inverted map against
    /// its original when `mapping` sits directly before it in this mapping.
    pub fn append_mapping_inverted(&mut self, mapping: &Mapping) {
        let total = self.maps.len() + mapping.maps.len();
        for i in (0..mapping.maps.len()).rev() {
            let mirror = mapping
                .get_mirror(i)
                .filter(|&m| m > i)
                .map(|m| total - m - 1);
            self.append_map(mapping.maps[i].invert(), mirror);
        }
    }

    pub fn invert(&self) -> Mapping {
        let mut inverse = Mapping::new();
        inverse.append_mapping_inverted(self);
        inverse
    }

    pub fn get_mirror(&self, n: usize) -> Option<usize> {
        self.mirror.iter().find_map(|&(a, b)| {
            if a == n {
                Some(b)
            } else if b == n {
                Some(a)
            } else {
                None
            }
        })
    }

    pub fn set_mirror(&mut self, n: usize, m: usize) {
        self.mirror.push((n, m));
    }

    /// Map through the maps starting at index `from`.
    pub fn map_from(&self, pos: usize, assoc: Assoc, from: usize) -> usize {
        self.map_window(pos, assoc, from, self.maps.len()).pos
    }

    fn map_window(&self, pos: usize, assoc: Assoc, from: usize, to: usize) -> MapResult {
        let mut pos = pos;
        let mut del_info = 0;
        let mut i = from;
        while i < to {
            let map = &self.maps[i];
            let result = map.map_result(pos, assoc);
            if let Some(recover) = result.recover
                && let Some(corr) = self.get_mirror(i)
                && corr > i
                && corr < to
            {
                i = corr;
                pos = self.maps[corr].recover(recover);
                i += 1;
                continue;
            }
            del_info |= result.del_info;
            pos = result.pos;
            i += 1;
        }
        MapResult::new(pos, del_info, None)
    }
}

impl Mappable for Mapping {
    fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        self.map_window(pos, assoc, 0, self.maps.len())
    }

    fn map(&self, pos: usize, assoc: Assoc) -> usize {
        if self.mirror.is_empty() {
            return self
                .maps
                .iter()
                .fold(pos, |pos, map| map.map(pos, assoc));
        }
        self.map_result(pos, assoc).pos
    }
}
