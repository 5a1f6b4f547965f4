//! A naive, simple oracle for position mapping.
//!
//! Instead of arithmetic over range lists, the oracle materializes every
//! token of the document, applies the replacements to that token list, and
//! maps a position by looking for the tokens around it that survived.
use richdoc::Assoc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Old(usize),
    New,
}

/// One replacement map over a document of `size` tokens. Ranges are
/// `(start, old_size, new_size)` in old coordinates, sorted, and separated by
/// at least one untouched token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaiveMap {
    size: usize,
    ranges: Vec<(usize, usize, usize)>,
}

impl NaiveMap {
    pub fn new(size: usize, ranges: Vec<(usize, usize, usize)>) -> Self {
        Self { size, ranges }
    }

    pub fn ranges(&self) -> &[(usize, usize, usize)] {
        &self.ranges
    }

    pub fn new_size(&self) -> usize {
        self.ranges
            .iter()
            .fold(self.size, |size, &(_, old, new)| size - old + new)
    }

    fn tokens_after(&self) -> Vec<Token> {
        let mut out = Vec::new();
        let mut ranges = self.ranges.iter().peekable();
        let mut i = 0;
        while i < self.size {
            if let Some(&&(start, old, new)) = ranges.peek()
                && start == i
            {
                out.extend(std::iter::repeat_n(Token::New, new));
                i += old;
                ranges.next();
                continue;
            }
            out.push(Token::Old(i));
            i += 1;
        }
        // Insertions at the very end.
        for &(start, _, new) in ranges {
            if start == self.size {
                out.extend(std::iter::repeat_n(Token::New, new));
            }
        }
        out
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        let after = self.tokens_after();
        let find = |old: usize| after.iter().position(|t| *t == Token::Old(old));
        let left = if pos == 0 {
            Some(0)
        } else {
            find(pos - 1).map(|i| i + 1)
        };
        let right = if pos == self.size {
            Some(after.len())
        } else {
            find(pos)
        };
        match (left, right) {
            (Some(l), Some(r)) => match assoc {
                Assoc::Before => l,
                Assoc::After => r,
            },
            (Some(l), None) => l,
            (None, Some(r)) => r,
            (None, None) => match assoc {
                Assoc::Before => (0..pos)
                    .rev()
                    .find_map(|old| find(old).map(|i| i + 1))
                    .unwrap_or(0),
                Assoc::After => (pos..self.size)
                    .find_map(find)
                    .unwrap_or(after.len()),
            },
        }
    }
}

/// A sequence of naive maps, each applying to the output of the previous.
#[derive(Debug, Clone, Default)]
pub struct NaiveMapping {
    maps: Vec<NaiveMap>,
}

impl NaiveMapping {
    pub fn new() -> Self {
        Self { maps: Vec::new() }
    }

    pub fn push(&mut self, map: NaiveMap) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[NaiveMap] {
        &self.maps
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }
}
