//! Document generation: drives the three template documents from the ledger
//! aggregates.
//!
//! One generation request runs three phases in order — expense claim, audit
//! sheet, no-car certificates — against fixed template coordinates. A failed
//! phase aborts the ones after it; files already saved stay on disk. Cell
//! level faults never abort a document: they are logged, counted and
//! reported.

use crate::config::AppConfig;
use crate::core::{amount, ledger::TripLedger};
use crate::errors::{Error, Result};
use crate::models::{TripLineItem, UserRecord};
use crate::sheet::{CellRef, CellValue, Workbook, Worksheet, WriteOutcome};
use chrono::{Datelike, NaiveDate};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// First data row of the expense claim template.
const DATA_START_ROW: u32 = 8;
/// Data rows pre-provisioned by the template; every item beyond this count
/// needs a row inserted.
const TEMPLATE_CAPACITY: usize = 6;
/// Footer rows of the expense claim template before any insertion.
const TOTAL_ROW: u32 = 14;
const BANK_ROW: u32 = 15;

/// What a completed generation produced.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Saved documents, in creation order.
    pub files: Vec<PathBuf>,
    /// Cell writes skipped over broken merge metadata.
    pub skipped_cells: usize,
}

/// Counts skipped writes across one generation.
#[derive(Debug, Default)]
struct CellLog {
    skipped: usize,
}

impl CellLog {
    /// Safe write against a fixed template coordinate. Faults are absorbed
    /// here: a bad coordinate costs one cell, never the document.
    fn put<V: Into<CellValue>>(&mut self, sheet: &mut Worksheet, a1: &str, value: V) {
        let at = match CellRef::parse(a1) {
            Ok(at) => at,
            Err(e) => {
                warn!("Skipped write to unparseable coordinate {a1}: {e}");
                self.skipped += 1;
                return;
            }
        };
        match sheet.write(at, value) {
            WriteOutcome::Written => {}
            WriteOutcome::Anchored(anchor) => {
                debug!("Write to {a1} redirected to merge anchor {anchor}");
            }
            WriteOutcome::Skipped(at) => {
                warn!("Skipped write to broken merged cell {at}");
                self.skipped += 1;
            }
        }
    }
}

/// Generates the expense claim, the audit sheet and zero or more no-car
/// certificates into `out_dir`.
pub fn generate(
    config: &AppConfig,
    user: &UserRecord,
    fill_date: NaiveDate,
    ledger: &TripLedger,
    out_dir: &Path,
) -> Result<GenerationReport> {
    let (min_date, max_date) = ledger.date_span()?;
    let items = ledger.sorted_by_date();
    let total = ledger.total();
    let date_desc = date_range_description(min_date, max_date);
    let suffix = format!("{}_{}", user.name, fill_date.format("%m%d"));

    let claim_path = out_dir.join(format!("1_差旅费报销单_{suffix}.xlsx"));
    let audit_path = out_dir.join(format!("2_报销审核单_{suffix}.xlsx"));
    ensure_not_locked(&claim_path)?;
    ensure_not_locked(&audit_path)?;

    let mut log = CellLog::default();
    let mut files = Vec::new();

    write_expense_claim(
        config, user, fill_date, &items, total, &date_desc, &claim_path, &mut log,
    )
    .map_err(|e| Error::Generation(format!("expense claim: {e}")))?;
    files.push(claim_path);
    info!("Expense claim saved ({} line rows)", items.len());

    write_audit_sheet(config, user, fill_date, total, &audit_path, &mut log)
        .map_err(|e| Error::Generation(format!("audit sheet: {e}")))?;
    files.push(audit_path);
    info!("Audit sheet saved");

    for item in items.iter().filter(|i| i.needs_no_car_proof) {
        let path = write_no_car_certificate(config, user, item, out_dir, &mut log)
            .map_err(|e| Error::Generation(format!("no-car certificate: {e}")))?;
        files.push(path);
    }
    info!(
        "Generation complete: {} file(s), {} skipped cell(s)",
        files.len(),
        log.skipped
    );

    Ok(GenerationReport {
        files,
        skipped_cells: log.skipped,
    })
}

/// `自 X 年 X 月 X 日 至 X 年 X 月 X 日 计 N 天`, N counting both endpoints.
fn date_range_description(min: NaiveDate, max: NaiveDate) -> String {
    let days = (max - min).num_days() + 1;
    format!(
        "自 {} 年 {} 月 {} 日 至 {} 年 {} 月 {} 日 计 {} 天",
        min.year(),
        min.month(),
        min.day(),
        max.year(),
        max.month(),
        max.day(),
        days
    )
}

/// Refuses to proceed when a like-named output is exclusively locked by
/// another program (a spreadsheet UI holding the file open). Probing is an
/// append-mode open; absence and other failures are not a lock.
fn ensure_not_locked(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    match OpenOptions::new().append(true).open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(Error::ResourceBusy(path.to_path_buf()))
        }
        Err(_) => Ok(()),
    }
}

#[allow(clippy::too_many_arguments)]
fn write_expense_claim(
    config: &AppConfig,
    user: &UserRecord,
    fill_date: NaiveDate,
    items: &[TripLineItem],
    total: f64,
    date_desc: &str,
    path: &Path,
    log: &mut CellLog,
) -> Result<()> {
    let mut book = Workbook::load(&config.template_paths.expense)?;
    let sheet = &mut book.sheet;
    let station = config.station_info.name.as_str();

    log.put(sheet, "K2", fill_date.year() as f64);
    log.put(sheet, "M2", fill_date.month());
    log.put(sheet, "O2", fill_date.day());
    log.put(sheet, "B3", station);
    log.put(sheet, "G3", station);
    log.put(sheet, "B4", user.name.as_str());
    log.put(sheet, "E4", items[0].reason.as_str());
    log.put(sheet, "G4", "详见明细");
    log.put(sheet, "J4", date_desc);

    for (i, item) in items.iter().enumerate() {
        let row = DATA_START_ROW + i as u32;
        if i >= TEMPLATE_CAPACITY {
            sheet.insert_row(row);
        }
        log.put(sheet, &format!("A{row}"), item.date.year() as f64);
        log.put(sheet, &format!("B{row}"), item.date.month());
        log.put(sheet, &format!("C{row}"), item.date.day());
        log.put(sheet, &format!("D{row}"), item.start_place.as_str());
        log.put(sheet, &format!("E{row}"), item.end_place.as_str());
        if item.food_amount > 0.0 {
            log.put(sheet, &format!("H{row}"), 1.0);
            log.put(sheet, &format!("I{row}"), item.food_amount);
        }
        if item.misc_amount > 0.0 {
            log.put(sheet, &format!("M{row}"), item.misc_amount);
        }
    }

    // The totals/banking footer moves down one row per inserted line.
    let extra = items.len().saturating_sub(TEMPLATE_CAPACITY) as u32;
    let total_row = TOTAL_ROW + extra;
    let bank_row = BANK_ROW + extra;
    log.put(sheet, &format!("G{total_row}"), amount::to_legal_text(total));
    log.put(sheet, &format!("C{bank_row}"), user.name.as_str());
    log.put(sheet, &format!("F{bank_row}"), user.card.as_str());
    log.put(sheet, &format!("K{bank_row}"), user.bank.as_str());
    log.put(sheet, &format!("N{bank_row}"), user.phone.as_str());

    book.save(path)
}

fn write_audit_sheet(
    config: &AppConfig,
    user: &UserRecord,
    fill_date: NaiveDate,
    total: f64,
    path: &Path,
    log: &mut CellLog,
) -> Result<()> {
    let mut book = Workbook::load(&config.template_paths.audit)?;
    let sheet = &mut book.sheet;

    log.put(sheet, "K4", fill_date.year() as f64);
    log.put(sheet, "M4", fill_date.month());
    log.put(sheet, "O4", fill_date.day());
    log.put(sheet, "E6", config.station_info.name.as_str());
    log.put(sheet, "J10", total);
    log.put(sheet, "C11", amount::to_legal_text(total));
    log.put(sheet, "C12", user.name.as_str());
    log.put(sheet, "F12", user.card.as_str());
    log.put(sheet, "K12", user.bank.as_str());
    log.put(sheet, "N12", user.phone.as_str());

    book.save(path)
}

/// One certificate per flagged leg, template loaded fresh each time.
fn write_no_car_certificate(
    config: &AppConfig,
    user: &UserRecord,
    item: &TripLineItem,
    out_dir: &Path,
    log: &mut CellLog,
) -> Result<PathBuf> {
    let mut book = Workbook::load(&config.template_paths.no_car)?;
    let sheet = &mut book.sheet;
    let (span_start, span_end) = item.span();

    log.put(sheet, "F3", item.date.year() as f64);
    log.put(sheet, "H3", item.date.month());
    log.put(sheet, "J3", item.date.day());
    log.put(sheet, "B5", config.station_info.name.as_str());
    log.put(sheet, "E5", user.name.as_str());
    log.put(sheet, "H5", item.end_place.as_str());
    log.put(sheet, "B7", item.reason.as_str());
    log.put(sheet, "B8", span_start.month());
    log.put(sheet, "D8", span_start.day());
    log.put(sheet, "F8", span_end.month());
    log.put(sheet, "H8", span_end.day());

    let path = out_dir.join(format!(
        "3_未派车_{}_{}_至_{}.xlsx",
        user.name,
        span_start.format("%m%d"),
        item.end_place
    ));
    book.save(&path)?;
    Ok(path)
}
