//! Whole-container decode and encode.

use mhfjmp_nls::{TextCodec, TextDecoder, TextEncoder};

use crate::area::{Area, AreaHeader, AreaTableCodec};
use crate::cursor::{ByteCursor, SeekOrigin};
use crate::diagnostics::{Diagnostics, Outcome, TextDirection, Warning};
use crate::error::Result;
use crate::layout::{EncodeOptions, Encoded, LayoutPlanner};
use crate::menu::{MenuEntry, MenuRecordCodec};
use crate::schema::{MenuTableLocation, SchemaVersion, AREA_TABLE_PTR_OFFSET, MENU_TITLE_PTR_OFFSET};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub schema: SchemaVersion,
    pub menu_table: MenuTableLocation,
}

/// The editable contents of a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub menu_entries: Vec<MenuEntry>,
    pub areas: Vec<Area>,
}

/// Offsets read while decoding. Only meaningful for the decoded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub menu_offset: u32,
    pub menu_count: u32,
    pub area_table_offset: u32,
    pub area_count: u32,
    pub area_headers: Vec<AreaHeader>,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct Decoded {
    pub container: Container,
    pub info: ContainerInfo,
}

pub struct ContainerCodec<C = TextCodec> {
    text: C,
}

impl<C> ContainerCodec<C>
where
    C: TextDecoder + TextEncoder,
{
    pub fn new(text: C) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &C {
        &self.text
    }

    /// Start and count of the menu table.
    fn locate_menu(cursor: &mut ByteCursor<'_>, header_offset: u32, location: MenuTableLocation) -> Result<(u32, u32)> {
        match location {
            MenuTableLocation::Fixed { offset, count } => Ok((offset, count)),
            MenuTableLocation::Header { count: Some(count) } => Ok((header_offset, count)),
            MenuTableLocation::Header { count: None } => {
                if header_offset == 0 {
                    return Ok((0, 0));
                }
                // The text pool directly follows the menu table and starts with
                // the first entry's title.
                let text_pool_start = cursor.peek_at(header_offset, |cur| {
                    cur.seek(MENU_TITLE_PTR_OFFSET as i64, SeekOrigin::Current)?;
                    cur.read_u32()
                })?;
                Ok((header_offset, MenuRecordCodec::count_between(header_offset, text_pool_start)?))
            }
        }
    }

    pub fn decode(&self, bytes: &[u8], options: &DecodeOptions) -> Result<Outcome<Decoded>> {
        let mut diagnostics = Diagnostics::new();
        let mut cursor = ByteCursor::new(bytes);

        let header_menu_offset = options.schema.read_menu_pointer(&mut cursor)?;
        cursor.seek_to(AREA_TABLE_PTR_OFFSET as u32)?;
        let area_table_offset = cursor.read_u32()?;
        let area_count = cursor.read_u32()?;

        let (menu_offset, menu_count) = Self::locate_menu(&mut cursor, header_menu_offset, options.menu_table)?;
        log::debug!(
            "{} container: menu @0x{:X} ({} entries), areas @0x{:X} ({})",
            options.schema,
            menu_offset,
            menu_count,
            area_table_offset,
            area_count
        );

        let records = MenuRecordCodec::new(options.schema);
        let menu_entries = records.decode_table(&mut cursor, menu_offset, menu_count, |i, field, raw| {
            let text = self.text.decode(raw);
            if text.fell_back {
                diagnostics.warn(Warning::TextCodecFailure {
                    context: format!("menu entry {i} {}", field.name()),
                    direction: TextDirection::Decode,
                });
            }
            text.value.into_owned()
        })?;

        let decoded_areas = if area_count == 0 {
            Vec::new()
        } else {
            AreaTableCodec::decode(&mut cursor, area_table_offset, area_count, &mut diagnostics)?
        };
        let (area_headers, areas): (Vec<_>, Vec<_>) = decoded_areas.into_iter().map(|d| (d.header, d.area)).unzip();

        log::info!(
            "decoded {} menu entries and {} areas from {} bytes",
            menu_entries.len(),
            area_count,
            bytes.len()
        );

        Ok(Outcome {
            value: Decoded {
                container: Container { menu_entries, areas },
                info: ContainerInfo {
                    menu_offset,
                    menu_count,
                    area_table_offset,
                    area_count,
                    area_headers,
                    len: bytes.len(),
                },
            },
            diagnostics,
        })
    }

    /// Lays `container` out after `template`, which supplies every byte the
    /// encoder does not own. The first 0x0C bytes are overwritten with the new
    /// header fields.
    pub fn encode(&self, container: &Container, template: &[u8], options: &EncodeOptions) -> Result<Outcome<Encoded>> {
        let mut diagnostics = Diagnostics::new();
        let encoded = LayoutPlanner::new(*options, &self.text).encode(
            &container.menu_entries,
            &container.areas,
            template,
            &mut diagnostics,
        )?;

        let layout = &encoded.layout;
        log::info!(
            "encoded {} menu entries and {} areas: text pool {}/{} bytes, {} bytes total",
            container.menu_entries.len(),
            container.areas.len(),
            layout.text_pool_len,
            options.text_pool_capacity,
            layout.total_len
        );
        Ok(Outcome { value: encoded, diagnostics })
    }
}

impl Default for ContainerCodec<TextCodec> {
    fn default() -> Self {
        Self::new(TextCodec::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::AreaEntry;
    use crate::cursor::ByteWriter;
    use crate::error::Error;
    use crate::menu::{MenuTail, Vec3};
    use pretty_assertions::assert_eq;

    fn entry(jump_id: u32, title: &str, description: &str) -> MenuEntry {
        MenuEntry {
            jump_id,
            area_id: 1,
            position: Vec3 { x: 1.0, y: 2.0, z: 3.0 },
            tail: MenuTail::Rotation(0x10),
            title: title.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// Hand-laid file: 0x10 byte header, two menu records at 0x10, strings,
    /// then one area header and its payload.
    fn hand_built() -> Vec<u8> {
        let codec = MenuRecordCodec::new(SchemaVersion::V1);
        let mut w = ByteWriter::with_len(0xA4);
        let menu = 0x10usize;
        let text = menu + 2 * 56; // 0x80
        w.write_bytes(menu, &codec.encode(&entry(1, "ab", "c"), 0x80, 0x83).unwrap()).unwrap();
        w.write_bytes(menu + 56, &codec.encode(&entry(2, "d", ""), 0x85, 0x87).unwrap()).unwrap();
        w.write_bytes(text, b"ab\0c\0d\0\0").unwrap();

        let areas = 0x90usize;
        w.write_u32(areas, 0x9C).unwrap();
        w.write_u32(areas + 4, 1).unwrap();
        w.write_u32(areas + 8, 0xA0).unwrap();
        w.write_bytes(0x9C, &hex::decode("0500010007000000").unwrap()).unwrap();

        w.write_u32(0, menu as u32).unwrap();
        w.write_u32(4, areas as u32).unwrap();
        w.write_u32(8, 1).unwrap();
        w.into_inner()
    }

    #[test]
    fn decodes_hand_built_container() {
        let bytes = hand_built();
        let out = ContainerCodec::default().decode(&bytes, &DecodeOptions::default()).unwrap();
        assert!(out.diagnostics.is_empty());

        let decoded = out.value;
        assert_eq!(decoded.info.menu_offset, 0x10);
        assert_eq!(decoded.info.menu_count, 2);
        assert_eq!(decoded.container.menu_entries, vec![entry(1, "ab", "c"), entry(2, "d", "")]);
        assert_eq!(
            decoded.container.areas,
            vec![Area { entries: vec![AreaEntry { index: 5, flags: 1 }], stage_ids: vec![7] }]
        );
        assert_eq!(
            decoded.info.area_headers,
            vec![AreaHeader { entries_offset: 0x9C, entries_len: 1, stage_ids_offset: 0xA0 }]
        );
    }

    #[test]
    fn fixed_location_ignores_header_pointer() {
        let mut bytes = hand_built();
        bytes[0..4].copy_from_slice(&0xDEADu32.to_le_bytes());

        let options = DecodeOptions {
            schema: SchemaVersion::V1,
            menu_table: MenuTableLocation::Fixed { offset: 0x10 + 56, count: 1 },
        };
        let decoded = ContainerCodec::default().decode(&bytes, &options).unwrap().value;
        assert_eq!(decoded.container.menu_entries, vec![entry(2, "d", "")]);

        // The bogus header pointer is out of range when trusted.
        assert!(matches!(
            ContainerCodec::default().decode(&bytes, &DecodeOptions::default()),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn explicit_header_count() {
        let bytes = hand_built();
        let options = DecodeOptions { menu_table: MenuTableLocation::Header { count: Some(1) }, ..Default::default() };
        let decoded = ContainerCodec::default().decode(&bytes, &options).unwrap().value;
        assert_eq!(decoded.container.menu_entries.len(), 1);
        assert_eq!(decoded.info.menu_count, 1);
    }

    #[test]
    fn invalid_legacy_text_is_kept_as_raw_bytes() {
        let mut bytes = hand_built();
        // "ab" -> "a\xFF"
        bytes[0x81] = 0xFF;
        let out = ContainerCodec::default().decode(&bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(out.value.container.menu_entries[0].title, "a\u{FF}");
        assert_eq!(
            out.diagnostics.warnings(),
            &[Warning::TextCodecFailure { context: "menu entry 0 title".to_string(), direction: TextDirection::Decode }]
        );
    }

    #[test]
    fn truncated_header_is_out_of_bounds() {
        let err = ContainerCodec::default().decode(&[0u8; 6], &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
    }

    #[test]
    fn empty_container_reencodes() {
        let codec = ContainerCodec::default();
        let encoded = codec.encode(&Container::default(), &[0u8; 0x0C], &EncodeOptions::default()).unwrap();
        let decoded = codec.decode(&encoded.value.bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.value.container, Container::default());
        // No records, so no menu pointer for the count derivation to follow.
        assert_eq!(encoded.value.layout.menu_start, 0x0C + 17);
        assert_eq!(decoded.value.info.menu_offset, 0);
    }

    #[test]
    fn areas_without_menu_reencode_with_no_text_pool() {
        let codec = ContainerCodec::default();
        let container = Container {
            menu_entries: vec![],
            areas: (1..=4).map(|i| Area { entries: vec![AreaEntry { index: i, flags: 0 }], stage_ids: vec![i] }).collect(),
        };
        let options = EncodeOptions { text_pool_capacity: 0, ..Default::default() };
        let encoded = codec.encode(&container, &[0u8; 0x10], &options).unwrap();
        let decoded = codec.decode(&encoded.value.bytes, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.value.container, container);
    }

    #[test]
    fn huge_area_count_is_out_of_bounds() {
        let mut bytes = [0u8; 0x10];
        bytes[4..8].copy_from_slice(&0x0Cu32.to_le_bytes());
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        let err = ContainerCodec::default().decode(&bytes, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { offset: 0x0C, size: 0x10, .. }));

        let options = DecodeOptions { menu_table: MenuTableLocation::Header { count: Some(u32::MAX) }, ..Default::default() };
        bytes[0..4].copy_from_slice(&0x0Cu32.to_le_bytes());
        bytes[8..12].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(ContainerCodec::default().decode(&bytes, &options), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn strings_before_the_table_need_an_explicit_count() {
        let codec = MenuRecordCodec::new(SchemaVersion::V1);
        let mut w = ByteWriter::with_len(0x20 + 56);
        w.write_bytes(0x10, b"t\0d\0").unwrap();
        w.write_bytes(0x20, &codec.encode(&entry(7, "t", "d"), 0x10, 0x12).unwrap()).unwrap();
        w.write_u32(0, 0x20).unwrap();
        let bytes = w.into_inner();

        let err = ContainerCodec::default().decode(&bytes, &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MenuCountUnderivable { start: 0x20, first_title: 0x10 }));

        let options = DecodeOptions { menu_table: MenuTableLocation::Header { count: Some(1) }, ..Default::default() };
        let decoded = ContainerCodec::default().decode(&bytes, &options).unwrap().value;
        assert_eq!(decoded.container.menu_entries, vec![entry(7, "t", "d")]);
    }
}
