//! In-memory worksheet model with merge-aware safe writes.
//!
//! The model is deliberately small: sparse rows of cells, each cell keeping
//! the raw style index and payload it had in the template, plus the sheet's
//! merged regions. Writes never fail — they report a [`WriteOutcome`] so the
//! composer can log and count faults without one bad coordinate aborting a
//! whole document.

use crate::sheet::address::{CellRef, Range};
use std::collections::BTreeMap;

/// A value being written into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<u32> for CellValue {
    fn from(v: u32) -> Self {
        CellValue::Number(f64::from(v))
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

/// What a cell currently holds. Template payloads are kept raw so that an
/// untouched cell round-trips byte-compatibly; our own writes use `Number`
/// and `Inline` only.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    /// Numeric cell, raw text of `<v>`.
    Number(String),
    /// Shared-string cell (`t="s"`), raw index text. Never produced by
    /// writes, so the package's string table is never touched.
    Shared(String),
    /// Inline string (`t="inlineStr"`).
    Inline(String),
    /// Boolean cell (`t="b"`), raw `<v>` text.
    Bool(String),
    /// Formula cell: expression plus cached `<v>`, kept verbatim.
    Formula { expr: String, cached: Option<String> },
}

/// One cell: template style index, payload, and whether the template flagged
/// it as a covered (non-anchor) member of a merged region.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub style: Option<String>,
    pub payload: Payload,
    pub covered: bool,
}

impl Cell {
    fn empty() -> Self {
        Self {
            style: None,
            payload: Payload::Empty,
            covered: false,
        }
    }
}

/// One row: attributes other than `r` kept verbatim (height, level, style),
/// cells keyed by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub attrs: Vec<(String, String)>,
    pub cells: BTreeMap<u32, Cell>,
}

/// Outcome of a single safe write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Landed directly on the requested coordinate.
    Written,
    /// The coordinate is a covered member of a merged region; the value was
    /// redirected to the region's anchor.
    Anchored(CellRef),
    /// The coordinate is flagged as merged but no owning region exists any
    /// more; nothing was written.
    Skipped(CellRef),
}

impl WriteOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, WriteOutcome::Skipped(_))
    }
}

/// A loaded worksheet.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    rows: BTreeMap<u32, Row>,
    merges: Vec<Range>,
}

impl Worksheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merges(&self) -> &[Range] {
        &self.merges
    }

    pub fn rows(&self) -> &BTreeMap<u32, Row> {
        &self.rows
    }

    /// Loader entry: install a template cell as-is.
    pub(crate) fn insert_template_cell(&mut self, at: CellRef, cell: Cell) {
        self.rows.entry(at.row).or_default().cells.insert(at.col, cell);
    }

    /// Loader entry: install row attributes.
    pub(crate) fn insert_row_attrs(&mut self, row: u32, attrs: Vec<(String, String)>) {
        self.rows.entry(row).or_default().attrs = attrs;
    }

    /// Loader entry: install the merge table and flag every existing
    /// non-anchor member as covered.
    pub(crate) fn set_merges(&mut self, merges: Vec<Range>) {
        self.merges = merges;
        for (&row, row_data) in &mut self.rows {
            for (&col, cell) in &mut row_data.cells {
                let at = CellRef::new(row, col);
                cell.covered = self
                    .merges
                    .iter()
                    .any(|m| m.contains(at) && m.anchor() != at);
            }
        }
    }

    fn cell(&self, at: CellRef) -> Option<&Cell> {
        self.rows.get(&at.row).and_then(|r| r.cells.get(&at.col))
    }

    /// The merged region owning `at`, if any.
    pub fn region_of(&self, at: CellRef) -> Option<Range> {
        self.merges.iter().copied().find(|m| m.contains(at))
    }

    /// Safe write. Resolves merged-cell ownership: anchors and plain cells
    /// are written directly, covered members are redirected to their anchor,
    /// and a covered cell whose region can no longer be found is skipped.
    pub fn write<V: Into<CellValue>>(&mut self, at: CellRef, value: V) -> WriteOutcome {
        let value = value.into();
        match self.region_of(at) {
            Some(region) if region.anchor() == at => {
                self.write_raw(at, value);
                WriteOutcome::Written
            }
            Some(region) => {
                let anchor = region.anchor();
                self.write_raw(anchor, value);
                WriteOutcome::Anchored(anchor)
            }
            None => {
                if self.cell(at).is_some_and(|c| c.covered) {
                    WriteOutcome::Skipped(at)
                } else {
                    self.write_raw(at, value);
                    WriteOutcome::Written
                }
            }
        }
    }

    fn write_raw(&mut self, at: CellRef, value: CellValue) {
        let cell = self
            .rows
            .entry(at.row)
            .or_default()
            .cells
            .entry(at.col)
            .or_insert_with(Cell::empty);
        cell.payload = match value {
            CellValue::Number(n) => Payload::Number(format_number(n)),
            CellValue::Text(s) => Payload::Inline(s),
        };
    }

    /// Inserts a blank row at `at`, shifting all rows at or below it down by
    /// one. Every merge region's bounds are remapped explicitly: regions
    /// below the insertion point shift, regions straddling it grow.
    pub fn insert_row(&mut self, at: u32) {
        let rows = std::mem::take(&mut self.rows);
        self.rows = rows
            .into_iter()
            .map(|(r, data)| if r >= at { (r + 1, data) } else { (r, data) })
            .collect();
        for merge in &mut self.merges {
            if merge.start.row >= at {
                merge.start.row += 1;
                merge.end.row += 1;
            } else if merge.end.row >= at {
                merge.end.row += 1;
            }
        }
    }

    /// Numeric value of a cell (template or written), for assertions and the
    /// composer's read-backs.
    pub fn number(&self, at: CellRef) -> Option<f64> {
        match &self.cell(at)?.payload {
            Payload::Number(raw) => raw.parse().ok(),
            _ => None,
        }
    }

    /// Inline text value of a cell.
    pub fn text(&self, at: CellRef) -> Option<&str> {
        match &self.cell(at)?.payload {
            Payload::Inline(s) => Some(s),
            _ => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_covered(&mut self, at: CellRef) {
        self.rows
            .entry(at.row)
            .or_default()
            .cells
            .entry(at.col)
            .or_insert_with(Cell::empty)
            .covered = true;
    }
}

/// Render a number the way spreadsheet `<v>` elements expect: integers
/// without a trailing `.0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
