//! Area table: 12-byte headers pointing at an index list and a
//! 0-terminated stage id list.

use crate::cursor::{ByteCursor, ByteWriter};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::schema::{AREA_ENTRY_SIZE, AREA_HEADER_SIZE, STAGE_ID_SENTINEL, STAGE_ID_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AreaEntry {
    pub index: u16,
    pub flags: u16,
}

/// Raw header triple as stored in the file. Only meaningful for the file it
/// was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AreaHeader {
    pub entries_offset: u32,
    pub entries_len: u32,
    pub stage_ids_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Area {
    pub entries: Vec<AreaEntry>,
    /// Never contains the 0 terminator.
    pub stage_ids: Vec<u16>,
}

impl Area {
    /// Bytes taken in the data block: index list, stage ids and terminator.
    pub fn data_size(&self) -> usize {
        self.entries.len() * AREA_ENTRY_SIZE + self.stage_ids.len() * STAGE_ID_SIZE + STAGE_ID_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedArea {
    pub header: AreaHeader,
    pub area: Area,
}

pub struct AreaTableCodec;

impl AreaTableCodec {
    pub fn read_header(cursor: &mut ByteCursor<'_>, offset: u32) -> Result<AreaHeader> {
        cursor.seek_to(offset)?;
        Ok(AreaHeader {
            entries_offset: cursor.read_u32()?,
            entries_len: cursor.read_u32()?,
            stage_ids_offset: cursor.read_u32()?,
        })
    }

    pub fn decode(
        cursor: &mut ByteCursor<'_>,
        table_base: u32,
        area_count: u32,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<DecodedArea>> {
        // The header block must lie inside the buffer before the count is trusted.
        let table_len = (area_count as usize).saturating_mul(AREA_HEADER_SIZE);
        if (table_base as usize).saturating_add(table_len) > cursor.len() {
            return Err(Error::OutOfBounds { offset: table_base as usize, len: table_len, size: cursor.len() });
        }

        let mut areas = Vec::with_capacity(area_count as usize);
        for i in 0..area_count as usize {
            let offset = (table_base as usize)
                .checked_add(i * AREA_HEADER_SIZE)
                .and_then(|o| u32::try_from(o).ok())
                .ok_or(Error::OffsetOverflow { what: "area header offset" })?;
            let header = Self::read_header(cursor, offset)?;

            let mut area = Area::default();
            if header.entries_offset != 0 && header.entries_len != 0 {
                area.entries = cursor.peek_at(header.entries_offset, |cur| {
                    (0..header.entries_len)
                        .map(|_| -> Result<AreaEntry> {
                            Ok(AreaEntry { index: cur.read_u16()?, flags: cur.read_u16()? })
                        })
                        .collect::<Result<Vec<_>>>()
                })?;
            } else if header.entries_len != 0 {
                diagnostics.warn(Warning::DanglingAreaLength { area: i, len: header.entries_len });
            }

            if header.stage_ids_offset != 0 {
                area.stage_ids = cursor.peek_at(header.stage_ids_offset, |cur| {
                    let mut ids = Vec::new();
                    loop {
                        let id = cur.read_u16()?;
                        if id == STAGE_ID_SENTINEL {
                            break;
                        }
                        ids.push(id);
                    }
                    Ok(ids)
                })?;
            }

            log::debug!(
                "area {}: {} entries @0x{:X}, {} stage ids @0x{:X}",
                i,
                area.entries.len(),
                header.entries_offset,
                area.stage_ids.len(),
                header.stage_ids_offset
            );
            areas.push(DecodedArea { header, area });
        }
        Ok(areas)
    }

    pub fn write_header(writer: &mut ByteWriter, offset: usize, header: &AreaHeader) -> Result<()> {
        writer.write_u32(offset, header.entries_offset)?;
        writer.write_u32(offset + 4, header.entries_len)?;
        writer.write_u32(offset + 8, header.stage_ids_offset)
    }

    /// Writes the index list, the stage ids and the terminator at `offset`.
    /// Returns the offset just past the terminator.
    pub fn write_payload(writer: &mut ByteWriter, offset: usize, area: &Area) -> Result<usize> {
        let mut at = offset;
        for entry in &area.entries {
            writer.write_u16(at, entry.index)?;
            writer.write_u16(at + 2, entry.flags)?;
            at += AREA_ENTRY_SIZE;
        }
        for &id in &area.stage_ids {
            writer.write_u16(at, id)?;
            at += STAGE_ID_SIZE;
        }
        writer.write_u16(at, STAGE_ID_SENTINEL)?;
        Ok(at + STAGE_ID_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(headers: &[[u32; 3]], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for h in headers {
            for v in h {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn decodes_entries_and_stage_ids() {
        // One header at 0, data at 12: two entries then [10, 20, 0].
        let data = hex::decode("0100 0200 0300 0400 0a00 1400 0000".replace(' ', "")).unwrap();
        let bytes = table(&[[12, 2, 20]], &data);

        let mut diag = Diagnostics::new();
        let mut cur = ByteCursor::new(&bytes);
        let areas = AreaTableCodec::decode(&mut cur, 0, 1, &mut diag).unwrap();

        assert_eq!(
            areas[0].area,
            Area {
                entries: vec![AreaEntry { index: 1, flags: 2 }, AreaEntry { index: 3, flags: 4 }],
                stage_ids: vec![10, 20],
            }
        );
        assert_eq!(areas[0].header, AreaHeader { entries_offset: 12, entries_len: 2, stage_ids_offset: 20 });
        assert!(diag.is_empty());
    }

    #[test]
    fn null_pointers_decode_as_empty() {
        let bytes = table(&[[0, 0, 0], [0, 0, 0]], &[]);
        let mut diag = Diagnostics::new();
        let mut cur = ByteCursor::new(&bytes);
        let areas = AreaTableCodec::decode(&mut cur, 0, 2, &mut diag).unwrap();
        assert_eq!(areas.len(), 2);
        assert!(areas.iter().all(|a| a.area == Area::default()));
        assert!(diag.is_empty());
    }

    #[test]
    fn length_without_pointer_warns() {
        let bytes = table(&[[0, 3, 0]], &[]);
        let mut diag = Diagnostics::new();
        let mut cur = ByteCursor::new(&bytes);
        let areas = AreaTableCodec::decode(&mut cur, 0, 1, &mut diag).unwrap();
        assert!(areas[0].area.entries.is_empty());
        assert_eq!(diag.warnings(), &[Warning::DanglingAreaLength { area: 0, len: 3 }]);
    }

    #[test]
    fn unterminated_stage_ids_are_out_of_bounds() {
        let bytes = table(&[[0, 0, 12]], &[5, 0, 6, 0]);
        let mut diag = Diagnostics::new();
        let mut cur = ByteCursor::new(&bytes);
        let err = AreaTableCodec::decode(&mut cur, 0, 1, &mut diag).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { .. }));
    }

    #[test]
    fn header_count_past_end_is_out_of_bounds() {
        let bytes = table(&[[0, 0, 0]], &[]);
        let mut diag = Diagnostics::new();
        let mut cur = ByteCursor::new(&bytes);
        let err = AreaTableCodec::decode(&mut cur, 0, u32::MAX, &mut diag).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { offset: 0, size: 12, .. }));
        assert!(matches!(AreaTableCodec::decode(&mut cur, 4, 1, &mut diag), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn payload_ends_with_one_sentinel() {
        let area = Area { entries: vec![AreaEntry { index: 9, flags: 1 }], stage_ids: vec![7] };
        let mut w = ByteWriter::with_len(2 + area.data_size());
        let end = AreaTableCodec::write_payload(&mut w, 2, &area).unwrap();
        assert_eq!(end, 2 + area.data_size());
        assert_eq!(hex::encode(w.as_slice()), "0000090001000700 0000".replace(' ', ""));
    }
}
