//! Cross-reference streams (ISO 32000-1 Section 7.5.8)

use super::xref::{XRefEntry, XRefTable};
use super::{ParseError, ParseResult};
use crate::objects::{Object, Stream};
use tracing::debug;

/// Decode the rows of a cross-reference stream
///
/// Type 0 rows (free) and rows of unknown type are skipped. When the type
/// field has zero width every row is type 1.
pub fn parse_xref_stream(stream: &Stream, position: usize, length: usize) -> ParseResult<XRefTable> {
    let invalid = |message: String| ParseError::InvalidXRef {
        position,
        length,
        message,
    };

    let dict = stream.dict();
    let widths = field_widths(dict.get_array("W"))
        .ok_or_else(|| invalid("/W must hold three non-negative integers".to_string()))?;
    let ranges = match dict.get_array("Index") {
        Some(index) => index_ranges(index).ok_or_else(|| {
            invalid("/Index must hold pairs of non-negative integers".to_string())
        })?,
        None => {
            let size = dict
                .get_integer("Size")
                .and_then(|size| u32::try_from(size).ok())
                .ok_or_else(|| ParseError::MissingKey("Size".to_string()))?;
            vec![(0, size)]
        }
    };

    let data = stream.decoded_data()?;
    let row_len: usize = widths.iter().sum();
    let mut table = XRefTable::new();
    let mut rows = data.chunks_exact(row_len.max(1));

    for (start, count) in ranges {
        for number in start..start.saturating_add(count) {
            let row = rows
                .next()
                .filter(|_| row_len > 0)
                .ok_or_else(|| invalid(format!("stream ends before the row for object {number}")))?;

            let (type_field, rest) = row.split_at(widths[0]);
            let (field2, field3) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { read_field(type_field) };
            let field2 = read_field(field2);
            let field3 = read_field(field3);

            let out_of_range = || invalid(format!("row for object {number} holds out-of-range fields"));
            let entry = match kind {
                1 if field2 > 0 => XRefEntry::Indirect {
                    offset: usize::try_from(field2).map_err(|_| out_of_range())?,
                    generation: u16::try_from(field3).map_err(|_| out_of_range())?,
                },
                2 => XRefEntry::Compressed {
                    container: u32::try_from(field2).map_err(|_| out_of_range())?,
                    index: u32::try_from(field3).map_err(|_| out_of_range())?,
                },
                _ => continue,
            };
            table.merge_entry(number, entry);
        }
    }

    debug!(entries = table.len(), "Decoded cross-reference stream");
    Ok(table)
}

fn field_widths(w: Option<&Vec<Object>>) -> Option<[usize; 3]> {
    let w = w?;
    if w.len() != 3 {
        return None;
    }
    let mut widths = [0usize; 3];
    for (slot, value) in widths.iter_mut().zip(w) {
        let width = value.as_integer()?;
        // Widths above 8 bytes cannot be held in a u64
        if !(0..=8).contains(&width) {
            return None;
        }
        *slot = width as usize;
    }
    Some(widths)
}

fn index_ranges(index: &[Object]) -> Option<Vec<(u32, u32)>> {
    if index.len() % 2 != 0 {
        return None;
    }
    index
        .chunks_exact(2)
        .map(|pair| {
            let start = u32::try_from(pair[0].as_integer()?).ok()?;
            let count = u32::try_from(pair[1].as_integer()?).ok()?;
            Some((start, count))
        })
        .collect()
}

/// Big-endian unsigned integer of arbitrary width up to eight bytes
pub(crate) fn read_field(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |value, byte| (value << 8) | u64::from(*byte))
}
