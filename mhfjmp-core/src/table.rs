//! CSV interchange for the menu and area tables.
//!
//! One header row, then one row per record. Rows that cannot be parsed are
//! skipped with a [`Warning::MalformedRow`]; only I/O failures abort a load.

use std::fmt::Display;
use std::io::{Read, Write};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::area::{Area, AreaEntry};
use crate::diagnostics::{Diagnostics, Outcome, Warning};
use crate::error::Result;
use crate::menu::{MenuEntry, MenuTail, Vec3};
use crate::schema::{SchemaVersion, STAGE_ID_SENTINEL};

pub const MENU_TABLE: &str = "menu_entries";
pub const AREA_TABLE: &str = "area_entries";

pub const AREA_COLUMNS: &[&str] = &["AreaIndex", "lenEntryData", "AreaEntries", "StageIds"];

/// A data row with its header-relative column names, for error messages.
struct Row<'r> {
    record: &'r StringRecord,
    columns: &'static [&'static str],
}

impl<'r> Row<'r> {
    fn check_len(&self) -> std::result::Result<(), String> {
        if self.record.len() < self.columns.len() {
            return Err(format!("expected {} columns, found {}", self.columns.len(), self.record.len()));
        }
        Ok(())
    }

    fn text(&self, i: usize) -> &'r str {
        self.record.get(i).unwrap_or_default()
    }

    fn parse<T>(&self, i: usize) -> std::result::Result<T, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.text(i).trim();
        raw.parse::<T>()
            .map_err(|e| format!("column {}: invalid value {:?}: {}", self.columns[i], raw, e))
    }

    fn float(&self, i: usize) -> std::result::Result<f32, String> {
        let raw = self.text(i).trim();
        parse_f32(raw).map_err(|e| format!("column {}: invalid value {:?}: {}", self.columns[i], raw, e))
    }

    fn vec3(&self, first: usize) -> std::result::Result<Vec3, String> {
        Ok(Vec3 { x: self.float(first)?, y: self.float(first + 1)?, z: self.float(first + 2)? })
    }
}

/// Finite floats use the shortest decimal form that reads back to the same
/// bits. NaN payloads and infinities are written as `0x` bit patterns.
pub fn format_f32(v: f32) -> String {
    if v.is_finite() {
        v.to_string()
    } else {
        format!("0x{:08X}", v.to_bits())
    }
}

/// Decimal, or a `0x` bit pattern as written by [`format_f32`].
pub fn parse_f32(s: &str) -> std::result::Result<f32, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(bits) => u32::from_str_radix(bits, 16).map(f32::from_bits).map_err(|e| e.to_string()),
        None => s.parse::<f32>().map_err(|e| e.to_string()),
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

/// Reads every data row, handing well-formed CSV records to `parse`. CSV
/// syntax errors skip the row; I/O errors are returned.
fn load_rows<R, T, F>(reader: R, table: &'static str, mut parse: F) -> Result<Outcome<Vec<T>>>
where
    R: Read,
    F: FnMut(&StringRecord, &[T], &mut Diagnostics) -> std::result::Result<T, String>,
{
    let mut diagnostics = Diagnostics::new();
    let mut rows = Vec::new();
    let mut csv = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);

    for result in csv.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                diagnostics.warn(Warning::MalformedRow { table, line, reason: e.to_string() });
                continue;
            }
        };
        match parse(&record, &rows, &mut diagnostics) {
            Ok(row) => rows.push(row),
            Err(reason) => diagnostics.warn(Warning::MalformedRow { table, line: line_of(&record), reason }),
        }
    }

    log::debug!("{}: loaded {} rows", table, rows.len());
    Ok(Outcome { value: rows, diagnostics })
}

pub fn write_menu_table<W: Write>(writer: W, schema: SchemaVersion, entries: &[MenuEntry]) -> Result<()> {
    let mut csv = WriterBuilder::new().from_writer(writer);
    csv.write_record(schema.menu_columns())?;

    for (i, e) in entries.iter().enumerate() {
        let mut row = vec![
            i.to_string(),
            e.title.clone(),
            e.description.clone(),
            e.jump_id.to_string(),
            e.unk_0c.to_string(),
            e.area_id.to_string(),
            e.area_id2.to_string(),
            e.area_id3.to_string(),
            e.unk_18.to_string(),
            format_f32(e.position.x),
            format_f32(e.position.y),
            format_f32(e.position.z),
            e.rotation.to_string(),
            format_f32(e.position1.x),
            format_f32(e.position1.y),
            format_f32(e.position1.z),
        ];
        match e.tail.for_schema(schema) {
            MenuTail::Rotation(v) => row.push(v.to_string()),
            MenuTail::Flags { flag0, flag1, flag2 } => {
                row.extend([flag0.to_string(), flag1.to_string(), flag2.to_string()]);
            }
        }
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

fn parse_menu_row(record: &StringRecord, schema: SchemaVersion) -> std::result::Result<MenuEntry, String> {
    let row = Row { record, columns: schema.menu_columns() };
    row.check_len()?;

    let tail = match schema {
        SchemaVersion::V1 => MenuTail::Rotation(row.parse(16)?),
        SchemaVersion::V2 => MenuTail::Flags { flag0: row.parse(16)?, flag1: row.parse(17)?, flag2: row.parse(18)? },
    };
    Ok(MenuEntry {
        title: row.text(1).to_string(),
        description: row.text(2).to_string(),
        jump_id: row.parse(3)?,
        unk_0c: row.parse(4)?,
        area_id: row.parse(5)?,
        area_id2: row.parse(6)?,
        area_id3: row.parse(7)?,
        unk_18: row.parse(8)?,
        position: row.vec3(9)?,
        rotation: row.parse(12)?,
        position1: row.vec3(13)?,
        tail,
    })
}

pub fn read_menu_table<R: Read>(reader: R, schema: SchemaVersion) -> Result<Outcome<Vec<MenuEntry>>> {
    load_rows(reader, MENU_TABLE, |record, _, _| parse_menu_row(record, schema))
}

/// `[index,flags] ` per entry, each followed by one space.
pub fn format_area_entries(entries: &[AreaEntry]) -> String {
    entries.iter().map(|e| format!("[{},{}] ", e.index, e.flags)).collect()
}

pub fn format_stage_ids(ids: &[u16]) -> String {
    ids.iter().map(u16::to_string).collect::<Vec<_>>().join(",")
}

pub fn parse_area_entries(s: &str) -> std::result::Result<Vec<AreaEntry>, String> {
    s.split_whitespace()
        .map(|token| -> std::result::Result<AreaEntry, String> {
            let inner = token.trim_matches(|c: char| c == '[' || c == ']');
            let (index, flags) = inner
                .split_once(',')
                .ok_or_else(|| format!("area entry {token:?}: expected [index,flags]"))?;
            let field = |v: &str| v.trim().parse::<u16>().map_err(|e| format!("area entry {token:?}: {e}"));
            Ok(AreaEntry { index: field(index)?, flags: field(flags)? })
        })
        .collect()
}

/// Ids separated by commas and/or spaces.
pub fn parse_stage_ids(s: &str) -> std::result::Result<Vec<u16>, String> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| -> std::result::Result<u16, String> {
            let id = part.parse::<u16>().map_err(|e| format!("stage id {part:?}: {e}"))?;
            if id == STAGE_ID_SENTINEL {
                return Err("stage id 0 is reserved for the list terminator".to_string());
            }
            Ok(id)
        })
        .collect()
}

pub fn write_area_table<W: Write>(writer: W, areas: &[Area]) -> Result<()> {
    let mut csv = WriterBuilder::new().from_writer(writer);
    csv.write_record(AREA_COLUMNS)?;
    for (i, area) in areas.iter().enumerate() {
        csv.write_record([
            (i + 1).to_string(),
            area.entries.len().to_string(),
            format_area_entries(&area.entries),
            format_stage_ids(&area.stage_ids),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Areas in row order. `AreaIndex` is expected to count from 1 and
/// `lenEntryData` to match the parsed list; neither is trusted.
pub fn read_area_table<R: Read>(reader: R) -> Result<Outcome<Vec<Area>>> {
    load_rows(reader, AREA_TABLE, |record, accepted, diagnostics| {
        let row = Row { record, columns: AREA_COLUMNS };
        row.check_len()?;

        let index: u32 = row.parse(0)?;
        let declared_len: u32 = row.parse(1)?;
        let area = Area { entries: parse_area_entries(row.text(2))?, stage_ids: parse_stage_ids(row.text(3))? };

        let line = line_of(record);
        let expected = accepted.len() as u32 + 1;
        if index != expected {
            diagnostics.warn(Warning::AreaIndexMismatch { line, index, expected });
        }
        if declared_len as usize != area.entries.len() {
            log::warn!(
                "{}: line {}: lenEntryData is {} but {} entries were listed; using the list",
                AREA_TABLE,
                line,
                declared_len,
                area.entries.len()
            );
        }
        Ok(area)
    })
}
