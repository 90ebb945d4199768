//! String resource reading and parsing
//!
//! Only an unsupported profile, bad metadata or a missing header fail the
//! parse. Everything after the header degrades: problems are logged and the
//! entries decoded so far are kept.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use super::{
    Dialect, HEADER_FIELDS_SIZE, KEY_ROW_SIZE, LocalizedString, OPAQUE_SIZE, OpaqueHeader,
    ResourceMeta, StringResource, TextKey, UNKNOWN_SEGMENT_SIZE,
};
use crate::error::{Error, Result};
use crate::formats::common::io::{read_bytes, read_sized_string, remaining};

/// Size of the index + length prefix of a string block row
const STRING_ROW_PREFIX: usize = 8;

/// Read a string resource from disk
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read, or any error
/// of [`parse_resource_bytes`].
///
/// [`Error::Io`]: crate::Error::Io
pub fn read_resource<P: AsRef<Path>>(path: P, meta: &ResourceMeta) -> Result<StringResource> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    parse_resource_bytes(&buffer, meta)
}

/// Parse a string resource from bytes
///
/// # Errors
///
/// Returns [`Error::UnsupportedProfile`] for games other than Anthem and Dead Space,
/// [`Error::InvalidResourceMeta`] if the metadata carries no header length and
/// [`Error::TruncatedHeader`] if the fixed header cannot be read.
///
/// [`Error::UnsupportedProfile`]: crate::Error::UnsupportedProfile
/// [`Error::InvalidResourceMeta`]: crate::Error::InvalidResourceMeta
/// [`Error::TruncatedHeader`]: crate::Error::TruncatedHeader
pub fn parse_resource_bytes(data: &[u8], meta: &ResourceMeta) -> Result<StringResource> {
    let dialect = meta.resolve_dialect()?;
    let declared_size = meta.header_size()?;

    if data.len() < HEADER_FIELDS_SIZE {
        return Err(Error::TruncatedHeader {
            expected: HEADER_FIELDS_SIZE,
            available: data.len(),
        });
    }

    let mut cursor = Cursor::new(data);
    let header = OpaqueHeader::read_fields(&mut cursor, declared_size)?;

    let position = cursor.position() as usize;
    if position != declared_size {
        tracing::warn!(
            "Expected reader position after reading the header of <{}> was <{}>, instead position is <{}>. Reading the data of this resource will likely fail!",
            meta.name,
            declared_size,
            position
        );
    }

    let mut resource = StringResource::new(header, dialect);
    let index_map = read_key_table(&mut cursor, &mut resource, &meta.name);
    read_unknown_segment(&mut cursor, &mut resource, &meta.name);
    read_string_block(&mut cursor, &mut resource, &index_map, &meta.name);

    report_missing_texts(&resource, &meta.name);

    tracing::debug!(
        "Read string resource <{}>: {} keys, {} declared strings, {} unknown segments",
        meta.name,
        resource.entries.len(),
        resource.header.num_strings,
        resource.header.num_unknown_segments
    );

    Ok(resource)
}

/// Read the key table, filling `resource.entries` with text-less entries
///
/// Returns the index to keys mapping used to resolve the string block.
fn read_key_table(
    cursor: &mut Cursor<&[u8]>,
    resource: &mut StringResource,
    name: &str,
) -> HashMap<u32, Vec<TextKey>> {
    let mut index_map: HashMap<u32, Vec<TextKey>> = HashMap::new();

    let declared = resource.header.num_keys;
    if declared < 0 {
        tracing::warn!("Resource <{}> declares a negative key count <{}>", name, declared);
        return index_map;
    }

    for row in 0..declared {
        if remaining(cursor) < KEY_ROW_SIZE {
            tracing::warn!(
                "Key table of <{}> is truncated after {} of {} rows",
                name,
                row,
                declared
            );
            break;
        }

        let Ok((index, key, opaque)) = read_key_row(cursor, resource.dialect) else {
            break;
        };

        index_map.entry(index).or_default().push(key);

        if resource.entries.contains_key(&key) {
            tracing::warn!("Duplicate key row for text <{}> in <{}>", key, name);
        } else {
            resource.entries.insert(key, LocalizedString::new(opaque));
        }
    }

    index_map
}

fn read_key_row(
    cursor: &mut Cursor<&[u8]>,
    dialect: Dialect,
) -> Result<(u32, TextKey, [u8; OPAQUE_SIZE])> {
    let index = cursor.read_u32::<LittleEndian>()?;
    let id = cursor.read_u32::<LittleEndian>()?;

    match dialect {
        Dialect::Plain => {
            let mut opaque = [0u8; OPAQUE_SIZE];
            cursor.read_exact(&mut opaque)?;
            Ok((index, TextKey::id(id), opaque))
        }
        Dialect::Variations => {
            let variation = cursor.read_i64::<LittleEndian>()?;
            Ok((index, TextKey::new(id, variation), [0u8; OPAQUE_SIZE]))
        }
    }
}

fn read_unknown_segment(cursor: &mut Cursor<&[u8]>, resource: &mut StringResource, name: &str) {
    let count = resource.header.num_unknown_segments;
    if count <= 0 {
        if count < 0 {
            tracing::warn!("Resource <{}> declares a negative unknown segment count <{}>", name, count);
        }
        return;
    }

    let wanted = count as usize * UNKNOWN_SEGMENT_SIZE;
    let available = remaining(cursor);
    if wanted > available {
        tracing::warn!(
            "Unknown segment of <{}> is truncated: expected {} bytes, {} available",
            name,
            wanted,
            available
        );
    }

    if let Ok(blob) = read_bytes(cursor, wanted.min(available)) {
        resource.header.unknown_segment = blob;
    }
}

fn read_string_block(
    cursor: &mut Cursor<&[u8]>,
    resource: &mut StringResource,
    index_map: &HashMap<u32, Vec<TextKey>>,
    name: &str,
) {
    while remaining(cursor) > 0 {
        if remaining(cursor) < STRING_ROW_PREFIX {
            tracing::warn!(
                "Ignoring {} trailing bytes at the end of <{}>",
                remaining(cursor),
                name
            );
            break;
        }

        let Ok(row) = read_string_row(cursor) else {
            tracing::warn!(
                "String block of <{}> is truncated at offset {}",
                name,
                cursor.position()
            );
            break;
        };
        let (index, text) = row;

        match index_map.get(&index) {
            Some(keys) => {
                for key in keys {
                    if let Some(entry) = resource.entries.get_mut(key) {
                        entry.text = Some(text.clone());
                    }
                }
            }
            None => {
                tracing::warn!("Cannot find {:08x} in {}", index, name);
            }
        }
    }
}

fn read_string_row(cursor: &mut Cursor<&[u8]>) -> Result<(u32, String)> {
    let index = cursor.read_u32::<LittleEndian>()?;
    let length = cursor.read_i32::<LittleEndian>()?;
    let length = usize::try_from(length).map_err(|_| Error::UnexpectedEof)?;
    let text = read_sized_string(cursor, length)?;
    Ok((index, text))
}

fn report_missing_texts(resource: &StringResource, name: &str) {
    let missing = resource.entries.values().filter(|e| e.text.is_none()).count();
    if missing > 0 {
        tracing::warn!("{} text ids of <{}> were not assigned any text", missing, name);
    }

    if resource.dialect == Dialect::Variations {
        let without_default = resource
            .ids()
            .into_iter()
            .filter(|id| !resource.contains_key(&TextKey::id(*id)))
            .count();
        if without_default > 0 {
            tracing::warn!(
                "{} text ids of <{}> have variations but no default variation",
                without_default,
                name
            );
        }
    }
}
