//! XLSX package load and part-preserving save.
//!
//! A template is opened as a plain zip package. Every part is kept verbatim;
//! only the first worksheet's `sheetData` and `mergeCells` sections are
//! parsed into a [`Worksheet`] and re-serialized on save. Styles, themes,
//! shared strings, print setup and anything else the office suite put into
//! the template survive byte-for-byte, which is what keeps the pre-formatted
//! documents printable.

use crate::errors::{Error, Result};
use crate::sheet::address::{CellRef, Range};
use crate::sheet::worksheet::{Cell, Payload, Worksheet};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs::File;
use std::io::{BufReader, Read, Write as _};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A loaded template package: all parts verbatim plus the parsed first
/// worksheet.
#[derive(Debug)]
pub struct Workbook {
    parts: Vec<(String, Vec<u8>)>,
    sheet_part: String,
    sheet_xml: Vec<u8>,
    pub sheet: Worksheet,
}

impl Workbook {
    /// Opens a template file and parses its first worksheet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)
            .map_err(|e| Error::Template(format!("cannot open {path_ref:?}: {e}")))?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut bytes)?;
            parts.push((entry.name().to_string(), bytes));
        }

        let sheet_part = first_sheet_part(&parts)?;
        let sheet_xml = part(&parts, &sheet_part)
            .ok_or_else(|| Error::Template(format!("missing worksheet part {sheet_part}")))?
            .to_vec();
        let sheet = parse_worksheet_xml(&sheet_xml)?;

        Ok(Self {
            parts,
            sheet_part,
            sheet_xml,
            sheet,
        })
    }

    /// Writes the package to `path`, replacing only the worksheet part.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let updated = serialize_worksheet_xml(&self.sheet_xml, &self.sheet)?;
        let file = File::create(path.as_ref())?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            if name == &self.sheet_part {
                zip.write_all(&updated)?;
            } else {
                zip.write_all(bytes)?;
            }
        }
        zip.finish()?;
        Ok(())
    }
}

fn part<'a>(parts: &'a [(String, Vec<u8>)], name: &str) -> Option<&'a [u8]> {
    parts
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, bytes)| bytes.as_slice())
}

/// Resolves the first sheet listed in `workbook.xml` through the workbook
/// relationships part.
fn first_sheet_part(parts: &[(String, Vec<u8>)]) -> Result<String> {
    let workbook = part(parts, "xl/workbook.xml")
        .ok_or_else(|| Error::Template("missing xl/workbook.xml".to_string()))?;
    let rel_id = first_sheet_rel_id(workbook)?;

    let rels = part(parts, "xl/_rels/workbook.xml.rels")
        .ok_or_else(|| Error::Template("missing xl/_rels/workbook.xml.rels".to_string()))?;
    let target = relationship_target(rels, &rel_id)?
        .ok_or_else(|| Error::Template(format!("unresolved sheet relationship {rel_id}")))?;

    Ok(if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("xl/{target}")
    })
}

fn first_sheet_rel_id(workbook_xml: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(workbook_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"id" {
                        return Ok(attr.unescape_value()?.into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Err(Error::Template(
        "workbook.xml lists no sheets".to_string(),
    ))
}

fn relationship_target(rels_xml: &[u8], rel_id: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(rels_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rel_id) {
                    return Ok(target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(None)
}

/// Parses `sheetData` and `mergeCells` out of a worksheet part.
pub(crate) fn parse_worksheet_xml(xml: &[u8]) -> Result<Worksheet> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheet = Worksheet::new();
    let mut merges = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                let (row, attrs) = parse_row_attrs(&e)?;
                sheet.insert_row_attrs(row, attrs);
                parse_row_cells(&mut reader, &mut sheet, row)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                let (row, attrs) = parse_row_attrs(&e)?;
                sheet.insert_row_attrs(row, attrs);
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"mergeCell" => {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.local_name().as_ref() == b"ref" {
                        merges.push(Range::parse(&attr.unescape_value()?)?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    sheet.set_merges(merges);
    Ok(sheet)
}

fn parse_row_attrs(e: &BytesStart<'_>) -> Result<(u32, Vec<(String, String)>)> {
    let mut row = None;
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        if key == "r" {
            row = value.parse::<u32>().ok();
        } else {
            attrs.push((key, value));
        }
    }
    let row = row.ok_or_else(|| Error::Template("row without r attribute".to_string()))?;
    Ok((row, attrs))
}

fn parse_row_cells(reader: &mut Reader<&[u8]>, sheet: &mut Worksheet, row: u32) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let (at, style, cell_type) = parse_cell_attrs(&e, row)?;
                let payload = parse_cell_payload(reader, cell_type.as_deref())?;
                sheet.insert_template_cell(
                    at,
                    Cell {
                        style,
                        payload,
                        covered: false,
                    },
                );
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let (at, style, _) = parse_cell_attrs(&e, row)?;
                sheet.insert_template_cell(
                    at,
                    Cell {
                        style,
                        payload: Payload::Empty,
                        covered: false,
                    },
                );
            }
            Event::End(e) if e.local_name().as_ref() == b"row" => break,
            Event::Eof => {
                return Err(Error::Template("unterminated row element".to_string()));
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_cell_attrs(
    e: &BytesStart<'_>,
    row: u32,
) -> Result<(CellRef, Option<String>, Option<String>)> {
    let mut at = None;
    let mut style = None;
    let mut cell_type = None;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.local_name().as_ref() {
            b"r" => at = Some(CellRef::parse(&attr.unescape_value()?)?),
            b"s" => style = Some(attr.unescape_value()?.into_owned()),
            b"t" => cell_type = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }
    let at = at.ok_or_else(|| Error::Template(format!("cell without r attribute in row {row}")))?;
    Ok((at, style, cell_type))
}

/// Reads the children of a `<c>` element (`<v>`, `<f>`, `<is><t>`) and maps
/// them onto a [`Payload`] according to the cell's `t` attribute.
fn parse_cell_payload(reader: &mut Reader<&[u8]>, cell_type: Option<&str>) -> Result<Payload> {
    let mut buf = Vec::new();
    let mut value = None;
    let mut formula = None;
    let mut inline = None;
    let mut current = None::<&'static str>;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"v" => current = Some("v"),
                b"f" => current = Some("f"),
                b"t" => current = Some("t"),
                _ => {}
            },
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                match current {
                    Some("v") => value = Some(text),
                    Some("f") => formula = Some(text),
                    Some("t") => inline = Some(text),
                    _ => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"c" => break,
                b"v" | b"f" | b"t" => current = None,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"f" => formula = Some(String::new()),
            Event::Eof => return Err(Error::Template("unterminated cell element".to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(if let Some(expr) = formula {
        Payload::Formula {
            expr,
            cached: value,
        }
    } else {
        match (cell_type, value, inline) {
            (Some("s"), Some(v), _) => Payload::Shared(v),
            (Some("b"), Some(v), _) => Payload::Bool(v),
            (Some("inlineStr"), _, Some(t)) => Payload::Inline(t),
            (Some("inlineStr"), _, None) => Payload::Inline(String::new()),
            (Some("str"), Some(v), _) => Payload::Inline(v),
            (_, Some(v), _) => Payload::Number(v),
            (_, None, _) => Payload::Empty,
        }
    })
}

/// Re-serializes the original worksheet XML, swapping in the model's
/// `sheetData` and `mergeCells` and copying every other event verbatim.
pub(crate) fn serialize_worksheet_xml(original: &[u8], sheet: &Worksheet) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(original);
    let mut writer = Writer::new(Vec::with_capacity(original.len()));
    let mut buf = Vec::new();
    let mut merges_done = false;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                skip_element(&mut reader)?;
                write_sheet_data(&mut writer, sheet)?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                write_sheet_data(&mut writer, sheet)?;
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"mergeCells" => {
                skip_element(&mut reader)?;
                write_merge_cells(&mut writer, sheet.merges())?;
                merges_done = true;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"mergeCells" => {
                write_merge_cells(&mut writer, sheet.merges())?;
                merges_done = true;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"worksheet" => {
                if !merges_done && !sheet.merges().is_empty() {
                    write_merge_cells(&mut writer, sheet.merges())?;
                }
                writer.write_event(Event::End(e.to_owned()))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev.into_owned())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Discards events until the end of the element whose start was just read.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<()> {
    let mut buf = Vec::new();
    let mut depth = 1u32;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(Error::Template("unterminated element".to_string()));
            }
            _ => {}
        }
        buf.clear();
    }
}

fn write_sheet_data(writer: &mut Writer<Vec<u8>>, sheet: &Worksheet) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
    for (&row_num, row) in sheet.rows() {
        let row_str = row_num.to_string();
        let mut start = BytesStart::new("row");
        start.push_attribute(("r", row_str.as_str()));
        for (key, value) in &row.attrs {
            // spans goes stale once cells are added or rows move; the office
            // suite recomputes it.
            if key == "spans" {
                continue;
            }
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if row.cells.is_empty() {
            writer.write_event(Event::Empty(start))?;
            continue;
        }
        writer.write_event(Event::Start(start))?;
        for (&col, cell) in &row.cells {
            write_cell(writer, CellRef::new(row_num, col), cell)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    Ok(())
}

fn write_cell(writer: &mut Writer<Vec<u8>>, at: CellRef, cell: &Cell) -> Result<()> {
    let a1 = at.to_string();
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", a1.as_str()));
    if let Some(style) = &cell.style {
        start.push_attribute(("s", style.as_str()));
    }
    match &cell.payload {
        Payload::Empty => {
            writer.write_event(Event::Empty(start))?;
        }
        Payload::Number(raw) => {
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "v", raw)?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        Payload::Shared(index) => {
            start.push_attribute(("t", "s"));
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "v", index)?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        Payload::Bool(raw) => {
            start.push_attribute(("t", "b"));
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "v", raw)?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        Payload::Inline(text) => {
            start.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            let mut t = BytesStart::new("t");
            t.push_attribute(("xml:space", "preserve"));
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        Payload::Formula { expr, cached } => {
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, "f", expr)?;
            if let Some(cached) = cached {
                write_text_element(writer, "v", cached)?;
            }
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
    }
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_merge_cells(writer: &mut Writer<Vec<u8>>, merges: &[Range]) -> Result<()> {
    if merges.is_empty() {
        return Ok(());
    }
    let count = merges.len().to_string();
    let mut start = BytesStart::new("mergeCells");
    start.push_attribute(("count", count.as_str()));
    writer.write_event(Event::Start(start))?;
    for merge in merges {
        let range = merge.to_string();
        let mut elem = BytesStart::new("mergeCell");
        elem.push_attribute(("ref", range.as_str()));
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("mergeCells")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="2" ht="30" spans="1:15"><c r="B2" s="3"/><c r="K2" s="1"><v>2023</v></c></row>
    <row r="4"><c r="E4" t="s"><v>12</v></c><c r="G4" s="2" t="inlineStr"><is><t>摘要</t></is></c></row>
    <row r="10"><c r="J10"><f>SUM(I8:I9)</f><v>0</v></c></row>
  </sheetData>
  <mergeCells count="2"><mergeCell ref="B2:D2"/><mergeCell ref="E4:F4"/></mergeCells>
  <pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>
</worksheet>"#;

    fn cell(a1: &str) -> CellRef {
        CellRef::parse(a1).unwrap()
    }

    #[test]
    fn test_parse_picks_up_cells_and_merges() {
        let ws = parse_worksheet_xml(SHEET.as_bytes()).unwrap();
        assert_eq!(ws.number(cell("K2")), Some(2023.0));
        assert_eq!(ws.merges().len(), 2);
        assert_eq!(ws.region_of(cell("C2")).unwrap().anchor(), cell("B2"));
    }

    #[test]
    fn test_serialize_round_trips_through_parse() {
        let ws = parse_worksheet_xml(SHEET.as_bytes()).unwrap();
        let out = serialize_worksheet_xml(SHEET.as_bytes(), &ws).unwrap();
        let again = parse_worksheet_xml(&out).unwrap();
        assert_eq!(again.number(cell("K2")), Some(2023.0));
        assert_eq!(again.merges(), ws.merges());
        // Unrelated sections are carried through untouched.
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("pageMargins"));
        assert!(!text.contains("spans"));
    }

    #[test]
    fn test_write_then_serialize_lands_on_merge_anchor() {
        let mut ws = parse_worksheet_xml(SHEET.as_bytes()).unwrap();
        ws.write(cell("C2"), "龙潭供电所");
        let out = serialize_worksheet_xml(SHEET.as_bytes(), &ws).unwrap();
        let again = parse_worksheet_xml(&out).unwrap();
        assert_eq!(again.text(cell("B2")), Some("龙潭供电所"));
    }

    #[test]
    fn test_insert_row_is_reflected_in_serialized_merges() {
        let mut ws = parse_worksheet_xml(SHEET.as_bytes()).unwrap();
        ws.insert_row(3);
        let out = serialize_worksheet_xml(SHEET.as_bytes(), &ws).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(r#"<mergeCell ref="B2:D2"/>"#));
        assert!(text.contains(r#"<mergeCell ref="E5:F5"/>"#));
        assert!(text.contains(r#"<row r="5""#));
    }

    #[test]
    fn test_formula_and_shared_cells_survive_untouched() {
        let ws = parse_worksheet_xml(SHEET.as_bytes()).unwrap();
        let out = serialize_worksheet_xml(SHEET.as_bytes(), &ws).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<f>SUM(I8:I9)</f>"));
        assert!(text.contains(r#"<c r="E4" t="s"><v>12</v></c>"#));
    }

    #[test]
    fn test_workbook_load_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.xlsx");
        crate::test_utils::write_template(&template, SHEET);

        let mut book = Workbook::load(&template).unwrap();
        book.sheet.write(cell("B4"), "张三");
        let output = dir.path().join("out.xlsx");
        book.save(&output).unwrap();

        let reopened = Workbook::load(&output).unwrap();
        assert_eq!(reopened.sheet.text(cell("B4")), Some("张三"));
        assert_eq!(reopened.sheet.number(cell("K2")), Some(2023.0));
        assert_eq!(reopened.sheet.merges().len(), 2);
    }
}
