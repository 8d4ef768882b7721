//! Format constants and the two known schema versions.
//!
//! Layout (little-endian):
//! - 0x00: menu table offset (u32 in V1, two u16 halves in V2)
//! - 0x04: u32 area table offset
//! - 0x08: u32 area count
//! - menu table: `count` records of 56 bytes
//! - text pool: NUL-terminated strings referenced by the menu records
//! - area table: `count` headers of 12 bytes, then the index lists and
//!   0-terminated stage id lists they point to

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{Error, Result};

pub const MENU_RECORD_SIZE: usize = 56;
pub const AREA_HEADER_SIZE: usize = 12;
pub const AREA_ENTRY_SIZE: usize = 4;
pub const STAGE_ID_SIZE: usize = 2;
pub const STAGE_ID_SENTINEL: u16 = 0;

pub const MENU_TABLE_PTR_OFFSET: usize = 0x00;
pub const AREA_TABLE_PTR_OFFSET: usize = 0x04;
pub const AREA_COUNT_OFFSET: usize = 0x08;
/// Bytes of the template that are patched by the encoder.
pub const FIXED_HEADER_SIZE: usize = 0x0C;

/// Zero block appended after the template, followed by [`HEADER_END_MARKER`].
pub const HEADER_PADDING_LEN: usize = 16;
pub const HEADER_END_MARKER: u8 = 0xFF;
pub const HEADER_EXTENSION_SIZE: usize = HEADER_PADDING_LEN + 1;

/// Space reserved for the text pool; the area section starts after it.
pub const DEFAULT_TEXT_POOL_CAPACITY: usize = 3072;
pub const DEFAULT_SECTION_PADDING: usize = 6;

/// Where the unpatched retail file keeps its menu table.
pub const RETAIL_MENU_TABLE_OFFSET: u32 = 0x7A0;
pub const RETAIL_MENU_ENTRY_COUNT: u32 = 24;

/// Offset of the title pointer inside a menu record.
pub const MENU_TITLE_PTR_OFFSET: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// 32-bit menu table pointer; records end with a second rotation word.
    #[default]
    V1,
    /// Menu table pointer stored as two u16 halves; the last record word is
    /// split into u8/u8/u16 flags.
    V2,
}

/// How the menu table pointer at 0x00 is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuPointerEncoding {
    Full32,
    Split16,
}

impl SchemaVersion {
    pub fn menu_pointer(self) -> MenuPointerEncoding {
        match self {
            SchemaVersion::V1 => MenuPointerEncoding::Full32,
            SchemaVersion::V2 => MenuPointerEncoding::Split16,
        }
    }

    pub fn read_menu_pointer(self, cursor: &mut ByteCursor<'_>) -> Result<u32> {
        cursor.seek_to(MENU_TABLE_PTR_OFFSET as u32)?;
        match self.menu_pointer() {
            MenuPointerEncoding::Full32 => cursor.read_u32(),
            MenuPointerEncoding::Split16 => {
                let lo = cursor.read_u16()? as u32;
                let hi = cursor.read_u16()? as u32;
                Ok(lo | (hi << 16))
            }
        }
    }

    pub fn write_menu_pointer(self, writer: &mut ByteWriter, ptr: u32) -> Result<()> {
        match self.menu_pointer() {
            MenuPointerEncoding::Full32 => writer.write_u32(MENU_TABLE_PTR_OFFSET, ptr),
            MenuPointerEncoding::Split16 => {
                writer.write_u16(MENU_TABLE_PTR_OFFSET, ptr as u16)?;
                writer.write_u16(MENU_TABLE_PTR_OFFSET + 2, (ptr >> 16) as u16)
            }
        }
    }

    /// Column names of the menu table export, in record field order.
    pub fn menu_columns(self) -> &'static [&'static str] {
        const V1: &[&str] = &[
            "ID", "Title", "Description", "JumpID", "Unk0C", "AreaID", "AreaID2", "AreaID3", "Unk18", "PosX",
            "PosY", "PosZ", "Rotation", "PosX1", "PosY1", "PosZ1", "Rotation1",
        ];
        const V2: &[&str] = &[
            "ID", "Title", "Description", "JumpID", "Unk0C", "AreaID", "AreaID2", "AreaID3", "Unk18", "PosX",
            "PosY", "PosZ", "Rotation", "PosX1", "PosY1", "PosZ1", "Flag0", "Flag1", "Flag2",
        ];
        match self {
            SchemaVersion::V1 => V1,
            SchemaVersion::V2 => V2,
        }
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(SchemaVersion::V1),
            "v2" | "2" => Ok(SchemaVersion::V2),
            other => Err(Error::UnknownSchema(other.to_string())),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SchemaVersion::V1 => "v1",
            SchemaVersion::V2 => "v2",
        })
    }
}

/// Where the decoder finds the menu table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum MenuTableLocation {
    /// Offset from the header pointer. Without an explicit count, the count is
    /// derived from where the text pool starts (the first title pointer).
    Header { count: Option<u32> },
    /// Hard offset and count, for files whose header pointer is not trusted.
    Fixed { offset: u32, count: u32 },
}

impl MenuTableLocation {
    pub fn retail() -> Self {
        MenuTableLocation::Fixed { offset: RETAIL_MENU_TABLE_OFFSET, count: RETAIL_MENU_ENTRY_COUNT }
    }
}

impl Default for MenuTableLocation {
    fn default() -> Self {
        MenuTableLocation::Header { count: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_pointer_encodings_read_back() {
        for schema in [SchemaVersion::V1, SchemaVersion::V2] {
            let mut w = ByteWriter::with_len(FIXED_HEADER_SIZE);
            schema.write_menu_pointer(&mut w, 0x0001_2345).unwrap();
            let bytes = w.into_inner();
            assert_eq!(&bytes[..4], &[0x45, 0x23, 0x01, 0x00]);

            let mut cur = ByteCursor::new(&bytes);
            assert_eq!(schema.read_menu_pointer(&mut cur).unwrap(), 0x0001_2345);
        }
    }

    #[test]
    fn column_sets_differ_only_in_tail() {
        let v1 = SchemaVersion::V1.menu_columns();
        let v2 = SchemaVersion::V2.menu_columns();
        assert_eq!(v1.len(), 17);
        assert_eq!(v2.len(), 19);
        assert_eq!(&v1[..16], &v2[..16]);
    }

    #[test]
    fn parse_schema() {
        assert_eq!("V2".parse::<SchemaVersion>().unwrap(), SchemaVersion::V2);
        assert!(matches!("v3".parse::<SchemaVersion>(), Err(Error::UnknownSchema(_))));
    }
}
