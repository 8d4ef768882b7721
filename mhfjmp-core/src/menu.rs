//! Menu table records.

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{Error, Result};
use crate::schema::{SchemaVersion, MENU_RECORD_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// The last 32-bit word before the string pointers. Both views cover the same
/// four bytes, so converting between them is lossless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTail {
    /// V1: a second rotation word.
    Rotation(u32),
    /// V2: two byte flags and a 16-bit flag word.
    Flags { flag0: u8, flag1: u8, flag2: u16 },
}

impl MenuTail {
    pub fn raw(self) -> u32 {
        match self {
            MenuTail::Rotation(v) => v,
            MenuTail::Flags { flag0, flag1, flag2 } => flag0 as u32 | (flag1 as u32) << 8 | (flag2 as u32) << 16,
        }
    }

    pub fn from_raw(schema: SchemaVersion, raw: u32) -> Self {
        match schema {
            SchemaVersion::V1 => MenuTail::Rotation(raw),
            SchemaVersion::V2 => MenuTail::Flags { flag0: raw as u8, flag1: (raw >> 8) as u8, flag2: (raw >> 16) as u16 },
        }
    }

    /// The same bytes seen through `schema`'s field layout.
    pub fn for_schema(self, schema: SchemaVersion) -> Self {
        Self::from_raw(schema, self.raw())
    }
}

impl Default for MenuTail {
    fn default() -> Self {
        MenuTail::Rotation(0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MenuEntry {
    pub jump_id: u32,
    pub unk_0c: u32,
    pub area_id: u16,
    pub area_id2: u16,
    pub area_id3: u16,
    pub unk_18: u16,
    pub position: Vec3,
    pub rotation: u32,
    pub position1: Vec3,
    pub tail: MenuTail,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Title,
    Description,
}

impl TextField {
    pub fn name(self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::Description => "description",
        }
    }
}

/// Sequential field writer over one record.
struct RecordWriter {
    w: ByteWriter,
    at: usize,
}

impl RecordWriter {
    fn u8(&mut self, v: u8) -> Result<()> {
        self.w.write_u8(self.at, v)?;
        self.at += 1;
        Ok(())
    }

    fn u16(&mut self, v: u16) -> Result<()> {
        self.w.write_u16(self.at, v)?;
        self.at += 2;
        Ok(())
    }

    fn u32(&mut self, v: u32) -> Result<()> {
        self.w.write_u32(self.at, v)?;
        self.at += 4;
        Ok(())
    }

    fn vec3(&mut self, v: Vec3) -> Result<()> {
        for c in [v.x, v.y, v.z] {
            self.w.write_f32(self.at, c)?;
            self.at += 4;
        }
        Ok(())
    }
}

fn read_vec3(cursor: &mut ByteCursor<'_>) -> Result<Vec3> {
    Ok(Vec3 { x: cursor.read_f32()?, y: cursor.read_f32()?, z: cursor.read_f32()? })
}

#[derive(Debug, Clone, Copy)]
pub struct MenuRecordCodec {
    schema: SchemaVersion,
}

impl MenuRecordCodec {
    pub fn new(schema: SchemaVersion) -> Self {
        Self { schema }
    }

    /// Decodes the record at `record_offset` and dereferences its two string
    /// pointers through `resolve`. Leaves the cursor at the end of the record.
    pub fn decode<F>(&self, cursor: &mut ByteCursor<'_>, record_offset: u32, mut resolve: F) -> Result<MenuEntry>
    where
        F: FnMut(TextField, &[u8]) -> String,
    {
        cursor.seek_to(record_offset)?;

        let jump_id = cursor.read_u32()?;
        let unk_0c = cursor.read_u32()?;
        let area_id = cursor.read_u16()?;
        let area_id2 = cursor.read_u16()?;
        let area_id3 = cursor.read_u16()?;
        let unk_18 = cursor.read_u16()?;
        let position = read_vec3(cursor)?;
        let rotation = cursor.read_u32()?;
        let position1 = read_vec3(cursor)?;
        let tail = match self.schema {
            SchemaVersion::V1 => MenuTail::Rotation(cursor.read_u32()?),
            SchemaVersion::V2 => MenuTail::Flags {
                flag0: cursor.read_u8()?,
                flag1: cursor.read_u8()?,
                flag2: cursor.read_u16()?,
            },
        };

        let title_offset = cursor.read_u32()?;
        let description_offset = cursor.read_u32()?;
        let title = resolve(TextField::Title, cursor.read_cstring_at(title_offset)?);
        let description = resolve(TextField::Description, cursor.read_cstring_at(description_offset)?);

        Ok(MenuEntry {
            jump_id,
            unk_0c,
            area_id,
            area_id2,
            area_id3,
            unk_18,
            position,
            rotation,
            position1,
            tail,
            title,
            description,
        })
    }

    /// Decodes `count` consecutive records starting at `start`.
    pub fn decode_table<F>(
        &self,
        cursor: &mut ByteCursor<'_>,
        start: u32,
        count: u32,
        mut resolve: F,
    ) -> Result<Vec<MenuEntry>>
    where
        F: FnMut(usize, TextField, &[u8]) -> String,
    {
        let table_len = (count as usize).saturating_mul(MENU_RECORD_SIZE);
        if (start as usize).saturating_add(table_len) > cursor.len() {
            return Err(Error::OutOfBounds { offset: start as usize, len: table_len, size: cursor.len() });
        }

        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let offset = (start as usize)
                .checked_add(i * MENU_RECORD_SIZE)
                .and_then(|o| u32::try_from(o).ok())
                .ok_or(Error::OffsetOverflow { what: "menu record offset" })?;
            let entry = self.decode(cursor, offset, |field, raw| resolve(i, field, raw))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Number of whole records between `start` and `end`. The text pool never
    /// precedes the table it belongs to.
    pub fn count_between(start: u32, end: u32) -> Result<u32> {
        if end < start {
            return Err(Error::MenuCountUnderivable { start, first_title: end });
        }
        let span = end - start;
        if span as usize % MENU_RECORD_SIZE != 0 {
            return Err(Error::MisalignedMenuSection { start, end });
        }
        Ok(span / MENU_RECORD_SIZE as u32)
    }

    /// Packs `entry` with the given string offsets. Offsets are always supplied
    /// by the layout planner.
    pub fn encode(&self, entry: &MenuEntry, title_offset: u32, description_offset: u32) -> Result<[u8; MENU_RECORD_SIZE]> {
        let mut rec = RecordWriter { w: ByteWriter::with_len(MENU_RECORD_SIZE), at: 0 };

        rec.u32(entry.jump_id)?;
        rec.u32(entry.unk_0c)?;
        rec.u16(entry.area_id)?;
        rec.u16(entry.area_id2)?;
        rec.u16(entry.area_id3)?;
        rec.u16(entry.unk_18)?;
        rec.vec3(entry.position)?;
        rec.u32(entry.rotation)?;
        rec.vec3(entry.position1)?;
        match entry.tail.for_schema(self.schema) {
            MenuTail::Rotation(v) => rec.u32(v)?,
            MenuTail::Flags { flag0, flag1, flag2 } => {
                rec.u8(flag0)?;
                rec.u8(flag1)?;
                rec.u16(flag2)?;
            }
        }
        rec.u32(title_offset)?;
        rec.u32(description_offset)?;
        debug_assert_eq!(rec.at, MENU_RECORD_SIZE);

        let mut out = [0u8; MENU_RECORD_SIZE];
        out.copy_from_slice(rec.w.as_slice());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(tail: MenuTail) -> MenuEntry {
        MenuEntry {
            jump_id: 0x0102_0304,
            unk_0c: 7,
            area_id: 11,
            area_id2: 12,
            area_id3: 13,
            unk_18: 0xFFFF,
            position: Vec3 { x: 1.5, y: -2.25, z: 100.0 },
            rotation: 0x8000,
            position1: Vec3 { x: 0.1, y: 0.2, z: 0.3 },
            tail,
            title: "Mezeporta".to_string(),
            description: "Town".to_string(),
        }
    }

    fn ascii(_: TextField, raw: &[u8]) -> String {
        String::from_utf8(raw.to_vec()).unwrap()
    }

    #[test]
    fn v1_record_layout() {
        let codec = MenuRecordCodec::new(SchemaVersion::V1);
        let rec = codec.encode(&sample(MenuTail::Rotation(0xDEAD_BEEF)), 0x1000, 0x100A).unwrap();
        assert_eq!(&rec[0..4], &[4, 3, 2, 1]);
        assert_eq!(&rec[14..16], &[0xFF, 0xFF]);
        assert_eq!(&rec[16..20], &1.5f32.to_le_bytes());
        assert_eq!(&rec[28..32], &0x8000u32.to_le_bytes());
        assert_eq!(&rec[44..48], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&rec[48..52], &0x1000u32.to_le_bytes());
        assert_eq!(&rec[52..56], &0x100Au32.to_le_bytes());
    }

    #[test]
    fn decode_dereferences_strings() {
        for (schema, tail) in [
            (SchemaVersion::V1, MenuTail::Rotation(42)),
            (SchemaVersion::V2, MenuTail::Flags { flag0: 1, flag1: 2, flag2: 0x0304 }),
        ] {
            let codec = MenuRecordCodec::new(schema);
            let entry = sample(tail);
            let mut file = vec![0u8; 8];
            file.extend_from_slice(&codec.encode(&entry, 64, 74).unwrap());
            file.extend_from_slice(b"Mezeporta\0Town\0");

            let mut cur = ByteCursor::new(&file);
            let decoded = codec.decode(&mut cur, 8, ascii).unwrap();
            assert_eq!(decoded, entry);
            assert_eq!(cur.position(), 8 + MENU_RECORD_SIZE);
        }
    }

    #[test]
    fn tail_views_share_bytes() {
        let flags = MenuTail::Flags { flag0: 0x11, flag1: 0x22, flag2: 0x4433 };
        assert_eq!(flags.raw(), 0x4433_2211);
        assert_eq!(flags.for_schema(SchemaVersion::V1), MenuTail::Rotation(0x4433_2211));

        let v1 = MenuRecordCodec::new(SchemaVersion::V1).encode(&sample(flags), 0, 0).unwrap();
        let v2 = MenuRecordCodec::new(SchemaVersion::V2).encode(&sample(flags), 0, 0).unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn dangling_string_pointer_is_out_of_bounds() {
        let codec = MenuRecordCodec::new(SchemaVersion::V1);
        let rec = codec.encode(&sample(MenuTail::Rotation(0)), 0x9999, 0).unwrap();
        let mut cur = ByteCursor::new(&rec);
        assert!(matches!(codec.decode(&mut cur, 0, ascii), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn table_past_end_is_rejected_before_reading() {
        let codec = MenuRecordCodec::new(SchemaVersion::V1);
        let rec = codec.encode(&sample(MenuTail::Rotation(0)), 0, 0).unwrap();
        let mut cur = ByteCursor::new(&rec);
        let err = codec.decode_table(&mut cur, 0, u32::MAX, |_, _, raw| ascii(TextField::Title, raw)).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { offset: 0, size: MENU_RECORD_SIZE, .. }));
        assert!(codec.decode_table(&mut cur, 0, 2, |_, _, raw| ascii(TextField::Title, raw)).is_err());
    }

    #[test]
    fn count_between_records() {
        assert_eq!(MenuRecordCodec::count_between(0x100, 0x100 + 3 * 56).unwrap(), 3);
        assert_eq!(MenuRecordCodec::count_between(0x100, 0x100).unwrap(), 0);
        assert!(matches!(
            MenuRecordCodec::count_between(0x100, 0x10),
            Err(Error::MenuCountUnderivable { start: 0x100, first_title: 0x10 })
        ));
        assert!(matches!(
            MenuRecordCodec::count_between(0x100, 0x101),
            Err(Error::MisalignedMenuSection { .. })
        ));
    }
}
