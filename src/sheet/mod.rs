//! Spreadsheet primitives: A1 addressing, the in-memory worksheet model with
//! merge-aware safe writes, and XLSX package load/save.

pub mod address;
pub mod worksheet;
pub mod xlsx;

pub use address::{CellRef, Range};
pub use worksheet::{CellValue, Worksheet, WriteOutcome};
pub use xlsx::Workbook;
