//! Encoder-side layout planning.
//!
//! Every pointer in the container is an absolute offset, so the planner works
//! in two phases like an assembler: first assign an address to every section
//! and string, then write the bytes into a buffer pre-sized to the final
//! length. Sections are placed in dependency order:
//!
//! template | 16 x 0x00, 0xFF | menu records | text pool (reserved) | padding |
//! area headers | area data

use mhfjmp_nls::TextEncoder;

use crate::area::{Area, AreaHeader, AreaTableCodec};
use crate::cursor::ByteWriter;
use crate::diagnostics::{Diagnostics, TextDirection, Warning};
use crate::error::{Error, Result};
use crate::menu::{MenuEntry, MenuRecordCodec, TextField};
use crate::schema::{
    SchemaVersion, AREA_COUNT_OFFSET, AREA_ENTRY_SIZE, AREA_HEADER_SIZE, AREA_TABLE_PTR_OFFSET,
    DEFAULT_SECTION_PADDING, DEFAULT_TEXT_POOL_CAPACITY, FIXED_HEADER_SIZE, HEADER_END_MARKER,
    HEADER_EXTENSION_SIZE, HEADER_PADDING_LEN, MENU_RECORD_SIZE, STAGE_ID_SENTINEL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub schema: SchemaVersion,
    /// Bytes reserved for the text pool. Exceeding it is fatal.
    pub text_pool_capacity: usize,
    /// Gap between the reserved text pool and the area headers.
    pub section_padding: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            schema: SchemaVersion::default(),
            text_pool_capacity: DEFAULT_TEXT_POOL_CAPACITY,
            section_padding: DEFAULT_SECTION_PADDING,
        }
    }
}

/// Offsets assigned by one encode pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerLayout {
    pub template_len: usize,
    pub menu_start: usize,
    pub text_pool_start: usize,
    pub text_pool_len: usize,
    pub area_start: usize,
    pub area_data_start: usize,
    pub area_headers: Vec<AreaHeader>,
    /// Cumulative offset after the last area payload; the output length.
    pub total_len: usize,
}

/// Encoded strings and the absolute offset of each.
#[derive(Debug, Clone, Default)]
struct TextPool {
    bytes: Vec<u8>,
    /// (title, description) offset per menu entry.
    offsets: Vec<(u32, u32)>,
}

#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub layout: ContainerLayout,
}

fn to_offset(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::OffsetOverflow { what })
}

pub struct LayoutPlanner<'a, C> {
    options: EncodeOptions,
    codec: &'a C,
}

impl<'a, C: TextEncoder> LayoutPlanner<'a, C> {
    pub fn new(options: EncodeOptions, codec: &'a C) -> Self {
        Self { options, codec }
    }

    /// Title then description of every entry, each NUL-terminated, with the
    /// offset of each string taken before it is appended.
    fn build_text_pool(&self, start: usize, entries: &[MenuEntry], diagnostics: &mut Diagnostics) -> Result<TextPool> {
        let mut pool = TextPool::default();
        for (i, entry) in entries.iter().enumerate() {
            let mut push = |field: TextField, text: &str| -> Result<u32> {
                let offset = to_offset(start + pool.bytes.len(), "text pool string")?;
                let encoded = self.codec.encode(text);
                if encoded.fell_back {
                    diagnostics.warn(Warning::TextCodecFailure {
                        context: format!("menu entry {i} {}", field.name()),
                        direction: TextDirection::Encode,
                    });
                }
                pool.bytes.extend_from_slice(&encoded.value);
                pool.bytes.push(0);
                Ok(offset)
            };
            let title = push(TextField::Title, &entry.title)?;
            let description = push(TextField::Description, &entry.description)?;
            pool.offsets.push((title, description));
        }
        Ok(pool)
    }

    /// Assigns every offset. Nothing is written yet.
    fn plan(&self, template_len: usize, menu_count: usize, text_pool_len: usize, areas: &[Area]) -> Result<ContainerLayout> {
        if template_len < FIXED_HEADER_SIZE {
            return Err(Error::TemplateTooSmall { len: template_len, required: FIXED_HEADER_SIZE });
        }
        if text_pool_len > self.options.text_pool_capacity {
            return Err(Error::TextPoolOverflow { used: text_pool_len, capacity: self.options.text_pool_capacity });
        }

        let menu_start = template_len + HEADER_EXTENSION_SIZE;
        let text_pool_start = menu_start + menu_count * MENU_RECORD_SIZE;
        let area_start = text_pool_start + self.options.text_pool_capacity + self.options.section_padding;
        let area_data_start = area_start + areas.len() * AREA_HEADER_SIZE;

        let mut cumulative = area_data_start;
        let mut area_headers = Vec::with_capacity(areas.len());
        for area in areas {
            let entries_offset = to_offset(cumulative, "area index list")?;
            let stage_ids_offset =
                to_offset(cumulative + area.entries.len() * AREA_ENTRY_SIZE, "area stage id list")?;
            area_headers.push(AreaHeader {
                entries_offset,
                entries_len: to_offset(area.entries.len(), "area index list length")?,
                stage_ids_offset,
            });
            cumulative += area.data_size();
        }
        // Every pointer the format stores must fit, including the final end.
        to_offset(cumulative, "container size")?;

        Ok(ContainerLayout {
            template_len,
            menu_start,
            text_pool_start,
            text_pool_len,
            area_start,
            area_data_start,
            area_headers,
            total_len: cumulative,
        })
    }

    pub fn encode(
        &self,
        entries: &[MenuEntry],
        areas: &[Area],
        template: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> Result<Encoded> {
        for (area, a) in areas.iter().enumerate() {
            if let Some(position) = a.stage_ids.iter().position(|&id| id == STAGE_ID_SENTINEL) {
                return Err(Error::ZeroStageId { area, position });
            }
        }

        let menu_start = template.len() + HEADER_EXTENSION_SIZE;
        let text_pool_start = menu_start + entries.len() * MENU_RECORD_SIZE;
        let pool = self.build_text_pool(text_pool_start, entries, diagnostics)?;
        let layout = self.plan(template.len(), entries.len(), pool.bytes.len(), areas)?;
        debug_assert_eq!(layout.text_pool_start, text_pool_start);

        log::debug!(
            "layout: menu @0x{:X} ({} entries), text @0x{:X} ({}/{} bytes), areas @0x{:X} ({}), end 0x{:X}",
            layout.menu_start,
            entries.len(),
            layout.text_pool_start,
            layout.text_pool_len,
            self.options.text_pool_capacity,
            layout.area_start,
            areas.len(),
            layout.total_len
        );

        let mut out = ByteWriter::from_template(template, layout.total_len)?;

        // Header extension: zero block and end marker.
        out.write_bytes(layout.template_len, &[0u8; HEADER_PADDING_LEN])?;
        out.write_u8(layout.template_len + HEADER_PADDING_LEN, HEADER_END_MARKER)?;

        let records = MenuRecordCodec::new(self.options.schema);
        for (i, (entry, &(title, description))) in entries.iter().zip(&pool.offsets).enumerate() {
            let record = records.encode(entry, title, description)?;
            out.write_bytes(layout.menu_start + i * MENU_RECORD_SIZE, &record)?;
        }
        out.write_bytes(layout.text_pool_start, &pool.bytes)?;

        for (i, header) in layout.area_headers.iter().enumerate() {
            AreaTableCodec::write_header(&mut out, layout.area_start + i * AREA_HEADER_SIZE, header)?;
        }
        let mut cursor = layout.area_data_start;
        for (area, header) in areas.iter().zip(&layout.area_headers) {
            debug_assert_eq!(cursor, header.entries_offset as usize);
            cursor = AreaTableCodec::write_payload(&mut out, cursor, area)?;
        }
        if cursor != out.len() {
            return Err(Error::LayoutOverflow { offset: cursor, len: 0, size: out.len() });
        }

        // An empty table is stored as a null pointer: its count could not be
        // derived from a text pool that holds no title.
        let menu_pointer = if entries.is_empty() { 0 } else { to_offset(layout.menu_start, "menu table")? };
        self.options.schema.write_menu_pointer(&mut out, menu_pointer)?;
        out.write_u32(AREA_TABLE_PTR_OFFSET, to_offset(layout.area_start, "area table")?)?;
        out.write_u32(AREA_COUNT_OFFSET, to_offset(areas.len(), "area count")?)?;

        Ok(Encoded { bytes: out.into_inner(), layout })
    }
}
