//! Cell and range addressing in A1 notation.
//!
//! Rows and columns are 1-based throughout, matching what the template
//! coordinate contracts are written in (`A1` is row 1, column 1).

use crate::errors::{Error, Result};
use std::fmt;

/// A single worksheet coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// 1-based row.
    pub row: u32,
    /// 1-based column (`A` = 1).
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parses `B7`-style references. `$` anchors and out-of-sheet bounds are
    /// not accepted; template coordinates never carry them.
    pub fn parse(a1: &str) -> Result<Self> {
        let s = a1.trim();
        let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || digits.is_empty() {
            return Err(Error::Template(format!("bad cell reference {a1:?}")));
        }
        let mut col: u32 = 0;
        for b in letters.bytes() {
            if !b.is_ascii_alphabetic() {
                return Err(Error::Template(format!("bad cell reference {a1:?}")));
            }
            col = col * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1;
        }
        let row: u32 = digits
            .parse()
            .ok()
            .filter(|&r| r > 0)
            .ok_or_else(|| Error::Template(format!("bad cell reference {a1:?}")))?;
        Ok(Self { row, col })
    }

}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n = self.col;
        let mut letters = [0u8; 7];
        let mut i = letters.len();
        while n > 0 {
            i -= 1;
            letters[i] = b'A' + ((n - 1) % 26) as u8;
            n = (n - 1) / 26;
        }
        for &b in &letters[i..] {
            write!(f, "{}", b as char)?;
        }
        write!(f, "{}", self.row)
    }
}

/// An inclusive rectangular region, normalized so that `start <= end` on both
/// axes. Used for merged-cell bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: CellRef,
    pub end: CellRef,
}

impl Range {
    pub fn new(a: CellRef, b: CellRef) -> Self {
        Self {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parses `A1:B2` ranges; a bare `C3` denotes a single-cell range.
    pub fn parse(a1: &str) -> Result<Self> {
        match a1.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellRef::parse(a)?, CellRef::parse(b)?)),
            None => {
                let cell = CellRef::parse(a1)?;
                Ok(Self::new(cell, cell))
            }
        }
    }

    pub const fn contains(&self, cell: CellRef) -> bool {
        cell.row >= self.start.row
            && cell.row <= self.end.row
            && cell.col >= self.start.col
            && cell.col <= self.end.col
    }

    /// The top-left member, the only cell of a merged region that accepts
    /// direct writes.
    pub const fn anchor(&self) -> CellRef {
        self.start
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_print_round_trip() {
        for a1 in ["A1", "K2", "O15", "AA10", "BC32"] {
            let cell = CellRef::parse(a1).unwrap();
            assert_eq!(cell.to_string(), a1);
        }
        assert_eq!(CellRef::parse("b7").unwrap(), CellRef::new(7, 2));
        assert_eq!(CellRef::parse("AA1").unwrap(), CellRef::new(1, 27));
    }

    #[test]
    fn test_parse_rejects_malformed_references() {
        for bad in ["", "7", "B", "B0", "1B", "B-2"] {
            assert!(CellRef::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_range_parse_and_containment() {
        let range = Range::parse("B3:D5").unwrap();
        assert_eq!(range.anchor(), CellRef::new(3, 2));
        assert!(range.contains(CellRef::new(4, 3)));
        assert!(!range.contains(CellRef::new(2, 3)));
        assert!(!range.contains(CellRef::new(4, 5)));

        let single = Range::parse("C3").unwrap();
        assert_eq!(single.start, single.end);
        assert_eq!(single.to_string(), "C3");
        assert_eq!(Range::parse("D5:B3").unwrap(), range);
    }
}
