//! Persisted overlay format
//!
//! ```text
//! u32 version | u64 resourceIdentity | i32 entryCount
//! entryCount x (u32 textId [| i64 variation] | null-terminated utf8 text)
//! ```
//!
//! The variation field is only present for the variations dialect.
//! Versions:
//! 1: number of texts followed by text id / text tuples

use std::io::{BufRead, Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use super::TextOverlay;
use crate::error::{Error, Result};
use crate::formats::common::io::{read_null_terminated_string, write_null_terminated_string};
use crate::formats::strings::{Dialect, TextKey};

/// Overlay format revision written by this crate
pub const OVERLAY_PERSISTENCE_VERSION: u32 = 1;

/// What to do with an overlay written by a newer format revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Fail the load with [`Error::UnsupportedOverlayVersion`]
    #[default]
    Fail,
    /// Log an error and load the overlay without any texts
    Skip,
}

/// Options for reading persisted overlays
#[derive(Debug, Clone, Copy)]
pub struct OverlayOptions {
    pub dialect: Dialect,
    pub policy: VersionPolicy,
}

impl OverlayOptions {
    #[must_use]
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            policy: VersionPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Write an overlay in the current format revision
///
/// Nothing is written when validation fails.
///
/// # Errors
/// Returns [`Error::OverlayUnbound`] if the overlay has no resource identity,
/// or [`Error::InvalidString`] if a text contains a NUL character.
pub fn write_overlay<W: Write>(writer: &mut W, overlay: &TextOverlay, dialect: Dialect) -> Result<()> {
    if overlay.rid() == 0 {
        return Err(Error::OverlayUnbound);
    }

    let mut entries = Vec::with_capacity(overlay.len());
    for (key, text) in overlay {
        if text.contains('\0') {
            return Err(Error::InvalidString(format!("text <{key}> contains a NUL character")));
        }
        if !dialect.has_variations() && key.variation != 0 {
            tracing::warn!("Not persisting text <{}>: the plain dialect cannot store variations", key);
            continue;
        }
        entries.push((key, text));
    }

    writer.write_u32::<LittleEndian>(OVERLAY_PERSISTENCE_VERSION)?;
    writer.write_u64::<LittleEndian>(overlay.rid())?;
    writer.write_i32::<LittleEndian>(entries.len() as i32)?;

    for (key, text) in entries {
        writer.write_u32::<LittleEndian>(key.id)?;
        if dialect.has_variations() {
            writer.write_i64::<LittleEndian>(key.variation)?;
        }
        write_null_terminated_string(writer, text)?;
    }

    writer.flush()?;
    Ok(())
}

/// Serialize an overlay to bytes
///
/// # Errors
/// Returns [`Error::OverlayUnbound`] if the overlay has no resource identity.
pub fn overlay_to_bytes(overlay: &TextOverlay, dialect: Dialect) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_overlay(&mut buf, overlay, dialect)?;
    Ok(buf)
}

/// Read a persisted overlay
///
/// # Errors
/// Returns [`Error::UnsupportedOverlayVersion`] if the data was written by a
/// newer revision and the policy is [`VersionPolicy::Fail`], or an IO error
/// for truncated data.
pub fn read_overlay<R: BufRead>(reader: &mut R, options: &OverlayOptions) -> Result<TextOverlay> {
    let version = reader.read_u32::<LittleEndian>()?;
    let mut overlay = TextOverlay::new();
    overlay.bind_rid(reader.read_u64::<LittleEndian>()?);

    if version > OVERLAY_PERSISTENCE_VERSION {
        let err = Error::UnsupportedOverlayVersion {
            found: version,
            supported: OVERLAY_PERSISTENCE_VERSION,
        };
        return match options.policy {
            VersionPolicy::Fail => Err(err),
            VersionPolicy::Skip => {
                tracing::error!("Text mod for resource <{:X}> skipped: {}", overlay.rid(), err);
                Ok(overlay)
            }
        };
    }

    read_version1_texts(reader, &mut overlay, options.dialect)?;
    Ok(overlay)
}

/// Parse a persisted overlay from bytes
///
/// # Errors
/// See [`read_overlay`].
pub fn parse_overlay_bytes(data: &[u8], options: &OverlayOptions) -> Result<TextOverlay> {
    read_overlay(&mut Cursor::new(data), options)
}

fn read_version1_texts<R: BufRead>(
    reader: &mut R,
    overlay: &mut TextOverlay,
    dialect: Dialect,
) -> Result<()> {
    let count = reader.read_i32::<LittleEndian>()?;
    if count < 0 {
        tracing::warn!("Overlay for <{:X}> declares a negative entry count <{}>", overlay.rid(), count);
    }

    for _ in 0..count.max(0) {
        let id = reader.read_u32::<LittleEndian>()?;
        let variation = if dialect.has_variations() {
            reader.read_i64::<LittleEndian>()?
        } else {
            0
        };
        let text = read_null_terminated_string(reader)?;
        overlay.set_text(TextKey::new(id, variation), text);
    }

    Ok(())
}
