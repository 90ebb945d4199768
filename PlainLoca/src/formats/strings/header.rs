//! Fixed header of a string resource
//!
//! Field meanings are partly guesses; all of them are round-tripped as read.

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::UNKNOWN_SEGMENT_SIZE;
use crate::error::Result;

/// Header scalars plus the unknown segment blob
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpaqueHeader {
    /// Probably a language index (0 English, 8 Polish)
    pub language_index: u32,
    /// Probably a version; observed to be 100
    pub version: u32,
    /// Name hash of the resource
    pub name_hash: u32,
    /// Key table rows as declared by the file
    pub num_keys: i64,
    /// Number of 12-byte unknown segment entries
    pub num_unknown_segments: i32,
    /// String block rows as declared by the file
    pub num_strings: i64,
    pub unknown: [i32; 3],
    /// `num_unknown_segments * 12` bytes following the key table
    pub unknown_segment: Vec<u8>,
    /// Header length declared by the resource metadata
    pub declared_size: usize,
}

impl OpaqueHeader {
    /// Read the fixed header fields; the unknown segment is read separately
    /// because it follows the key table.
    pub(crate) fn read_fields(cursor: &mut Cursor<&[u8]>, declared_size: usize) -> Result<Self> {
        let language_index = cursor.read_u32::<LittleEndian>()?;
        let version = cursor.read_u32::<LittleEndian>()?;
        let name_hash = cursor.read_u32::<LittleEndian>()?;
        let num_keys = cursor.read_i64::<LittleEndian>()?;
        let num_unknown_segments = cursor.read_i32::<LittleEndian>()?;
        let num_strings = cursor.read_i64::<LittleEndian>()?;
        let unknown = [
            cursor.read_i32::<LittleEndian>()?,
            cursor.read_i32::<LittleEndian>()?,
            cursor.read_i32::<LittleEndian>()?,
        ];

        Ok(Self {
            language_index,
            version,
            name_hash,
            num_keys,
            num_unknown_segments,
            num_strings,
            unknown,
            unknown_segment: Vec::new(),
            declared_size,
        })
    }

    /// Whole 12-byte entries of the unknown segment; a truncated tail is dropped
    #[must_use]
    pub fn whole_unknown_segment(&self) -> &[u8] {
        let whole = self.unknown_segment.len() / UNKNOWN_SEGMENT_SIZE * UNKNOWN_SEGMENT_SIZE;
        &self.unknown_segment[..whole]
    }

    /// Write the fixed header fields with recomputed table counts
    ///
    /// The unknown segment count follows the blob actually held, not the
    /// count the file declared.
    pub(crate) fn write_fields<W: Write>(
        &self,
        writer: &mut W,
        num_keys: usize,
        num_strings: usize,
    ) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.language_index)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.name_hash)?;
        writer.write_i64::<LittleEndian>(num_keys as i64)?;
        let num_unknown_segments = self.whole_unknown_segment().len() / UNKNOWN_SEGMENT_SIZE;
        writer.write_i32::<LittleEndian>(num_unknown_segments as i32)?;
        writer.write_i64::<LittleEndian>(num_strings as i64)?;
        for value in self.unknown {
            writer.write_i32::<LittleEndian>(value)?;
        }
        Ok(())
    }
}
