//! String resource writing
//!
//! SPDX-License-Identifier: MIT
//!
//! The string block index written here is a content bucket (FNV-1a of the
//! text), so re-encoding preserves the key to text mapping but not the byte
//! layout of the original file.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};

use super::{Dialect, LocalizedString, StringResource, TextKey};
use crate::error::Result;
use crate::formats::common::fnv1a_32;
use crate::formats::common::io::write_sized_string;
use crate::overlay::TextOverlay;

/// Base entries with the overlay applied on top; the base is left untouched
///
/// Keys added by the overlay get an all-zero opaque payload.
#[must_use]
pub fn effective_entries(
    resource: &StringResource,
    overlay: Option<&TextOverlay>,
) -> BTreeMap<TextKey, LocalizedString> {
    let mut entries = resource.entries.clone();
    if let Some(overlay) = overlay {
        for (key, text) in overlay.iter() {
            entries.entry(*key).or_default().text = Some(text.clone());
        }
    }
    entries
}

/// Write a string resource to disk
///
/// # Errors
/// Returns an error if file writing fails.
pub fn write_resource<P: AsRef<Path>>(
    path: P,
    resource: &StringResource,
    overlay: Option<&TextOverlay>,
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&encode_resource(resource, overlay)?)?;
    writer.flush()?;
    Ok(())
}

/// Serialize a resource, with `overlay` applied, to bytes
///
/// # Errors
/// Returns an error if writing to the in-memory buffer fails.
pub fn encode_resource(resource: &StringResource, overlay: Option<&TextOverlay>) -> Result<Vec<u8>> {
    let entries = effective_entries(resource, overlay);

    let mut buckets = IndexBuckets::default();
    let mut rows = Vec::with_capacity(entries.len());

    // BTreeMap iteration yields rows in TextKey order
    for (key, entry) in &entries {
        if resource.dialect == Dialect::Plain && key.variation != 0 {
            tracing::warn!(
                "Dropping text <{}>: the plain dialect cannot store variations",
                key
            );
            continue;
        }
        let index = entry.text.as_deref().map(|text| buckets.index_for(text));
        rows.push((index, *key, entry.opaque));
    }

    // Keys without text point at an index that has no string row
    let missing = rows
        .iter()
        .any(|(index, _, _)| index.is_none())
        .then(|| buckets.unused_index());

    tracing::debug!(
        "Writing string resource: {} keys, {} strings, {} overridden by overlay",
        rows.len(),
        buckets.by_index.len(),
        overlay.map_or(0, TextOverlay::len)
    );

    let mut out = Vec::new();
    resource
        .header
        .write_fields(&mut out, rows.len(), buckets.by_index.len())?;

    for (index, key, opaque) in &rows {
        out.write_u32::<LittleEndian>(index.or(missing).unwrap_or_default())?;
        out.write_u32::<LittleEndian>(key.id)?;
        match resource.dialect {
            Dialect::Plain => out.write_all(opaque)?,
            Dialect::Variations => out.write_i64::<LittleEndian>(key.variation)?,
        }
    }

    out.write_all(resource.header.whole_unknown_segment())?;

    for (index, text) in &buckets.by_index {
        out.write_u32::<LittleEndian>(*index)?;
        write_sized_string(&mut out, text)?;
    }

    Ok(out)
}

/// Assigns one string block index per distinct text
#[derive(Default)]
struct IndexBuckets<'a> {
    by_text: HashMap<&'a str, u32>,
    by_index: BTreeMap<u32, &'a str>,
}

impl<'a> IndexBuckets<'a> {
    fn index_for(&mut self, text: &'a str) -> u32 {
        if let Some(&index) = self.by_text.get(text) {
            return index;
        }

        let mut index = fnv1a_32(text);
        while self.by_index.contains_key(&index) {
            tracing::debug!("String index {:08x} already taken, trying the next one", index);
            index = index.wrapping_add(1);
        }

        self.by_text.insert(text, index);
        self.by_index.insert(index, text);
        index
    }

    /// First index from the empty-text hash upwards that no text occupies
    fn unused_index(&self) -> u32 {
        let mut index = fnv1a_32("");
        while self.by_index.contains_key(&index) {
            index = index.wrapping_add(1);
        }
        index
    }
}
