//! Minimal project file reader
//!
//! Only what is needed to pull modified assets out of a project: the header is
//! validated and skipped, added data is skipped, and modified ebx/res records
//! are collected. Records stored as a modified-resource envelope (type name
//! followed by the resource specific payload) are surfaced as
//! [`ProjectModification`]s; raw asset data is ignored.
//!
//! ```text
//! u64 magic | u32 version | cstr profile | i64 | i64 | u32 | 5 x cstr | 5 x sized blob
//! added:    i32 superbundles | bundles | ebx | res | chunks
//! modified: i32 count x ebx record | i32 count x res record | ...
//! ```

use std::io::{Cursor, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::formats::common::io::{
    read_bool, read_bytes, read_guid, read_null_terminated_string, skip, skip_sized_blob,
    write_null_terminated_string,
};
use crate::formats::strings::GameProfile;
use crate::merge::{AssetData, AssetModification, STRINGS_KIND};
use crate::overlay::{OverlayOptions, TextOverlay, parse_overlay_bytes};

/// Project file magic, "FROSTY" little-endian
pub const PROJECT_MAGIC: u64 = 0x0000_5954_534F_5246;

/// The only project format version this reader understands
pub const PROJECT_FORMAT_VERSION: u32 = 14;

/// Added res rows: u64 rid, u32 type, 16 bytes of meta
const ADDED_RES_TRAILER_SIZE: usize = 8 + 4 + 16;

/// Added chunk rows: guid plus i32
const ADDED_CHUNK_SIZE: usize = 16 + 4;

const SHA1_SIZE: usize = 20;

/// Which asset table a modification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetTable {
    Ebx,
    Res,
}

/// A modified asset stored as a modified-resource envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectModification {
    pub name: String,
    pub table: AssetTable,
    /// Type name from the envelope, e.g. `...ModifiedPlainLocalizationResource`
    pub kind: String,
    pub added_bundles: Vec<String>,
    /// Envelope payload, without the type name
    pub payload: Vec<u8>,
}

impl ProjectModification {
    /// Whether the payload is a persisted string overlay
    #[must_use]
    pub fn is_string_overlay(&self) -> bool {
        self.kind.ends_with(STRINGS_KIND)
    }
}

/// What the reader extracted from a project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectContents {
    pub profile: String,
    /// Names of bundles the project adds
    pub added_bundles: Vec<String>,
    pub modifications: Vec<ProjectModification>,
}

impl ProjectContents {
    /// Decode every persisted string overlay, keyed by asset name
    ///
    /// # Errors
    /// Returns an error if an overlay cannot be decoded under `options`.
    pub fn string_overlays(&self, options: &OverlayOptions) -> Result<Vec<(String, TextOverlay)>> {
        self.modifications
            .iter()
            .filter(|m| m.is_string_overlay())
            .map(|m| Ok((m.name.clone(), parse_overlay_bytes(&m.payload, options)?)))
            .collect()
    }

    /// Modifications in the shape the union merge works on
    ///
    /// # Errors
    /// Returns an error if a string overlay cannot be decoded under `options`.
    pub fn asset_modifications(&self, options: &OverlayOptions) -> Result<Vec<AssetModification>> {
        self.modifications
            .iter()
            .map(|m| {
                let data = if m.is_string_overlay() {
                    AssetData::Strings(parse_overlay_bytes(&m.payload, options)?)
                } else {
                    AssetData::Opaque {
                        kind: m.kind.clone(),
                        payload: m.payload.clone(),
                    }
                };
                Ok(AssetModification::new(m.name.clone(), Some(data))
                    .with_bundles(m.added_bundles.iter().cloned()))
            })
            .collect()
    }
}

/// Read a project file
///
/// # Errors
/// Returns an error if the file is not a version 14 project for `profile`, or
/// is truncated.
pub fn read_project<P: AsRef<Path>>(path: P, profile: &GameProfile) -> Result<ProjectContents> {
    let path = path.as_ref();
    tracing::info!("Loading project {}", path.display());
    let data = std::fs::read(path)?;
    parse_project_bytes(&data, profile)
}

/// Parse a project from bytes
///
/// # Errors
/// See [`read_project`].
pub fn parse_project_bytes(data: &[u8], profile: &GameProfile) -> Result<ProjectContents> {
    let mut cursor = Cursor::new(data);

    let magic = cursor.read_u64::<LittleEndian>()?;
    if magic != PROJECT_MAGIC {
        return Err(Error::InvalidProjectMagic(magic));
    }

    let version = cursor.read_u32::<LittleEndian>()?;
    if version != PROJECT_FORMAT_VERSION {
        return Err(Error::UnsupportedProjectVersion {
            found: version,
            supported: PROJECT_FORMAT_VERSION,
        });
    }

    let found = read_null_terminated_string(&mut cursor)?;
    if !found.eq_ignore_ascii_case(profile.name()) {
        return Err(Error::ProfileMismatch {
            expected: profile.name().to_string(),
            found,
        });
    }

    skip_setup(&mut cursor)?;

    let mut contents = ProjectContents {
        profile: found,
        ..ProjectContents::default()
    };
    read_added_data(&mut cursor, &mut contents)?;

    let ebx_count = cursor.read_i32::<LittleEndian>()?;
    for _ in 0..ebx_count.max(0) {
        if let Some(modification) = read_modified_ebx(&mut cursor)? {
            contents.modifications.push(modification);
        }
    }

    let res_count = cursor.read_i32::<LittleEndian>()?;
    for _ in 0..res_count.max(0) {
        if let Some(modification) = read_modified_res(&mut cursor)? {
            contents.modifications.push(modification);
        }
    }

    tracing::debug!(
        "Project contains {} added bundles and {} modified resources",
        contents.added_bundles.len(),
        contents.modifications.len()
    );
    Ok(contents)
}

/// Creation date, modification date, game version, mod details and blobs
fn skip_setup(cursor: &mut Cursor<&[u8]>) -> Result<()> {
    cursor.read_i64::<LittleEndian>()?;
    cursor.read_i64::<LittleEndian>()?;
    cursor.read_u32::<LittleEndian>()?;
    for _ in 0..5 {
        read_null_terminated_string(cursor)?;
    }
    for _ in 0..5 {
        skip_sized_blob(cursor)?;
    }
    Ok(())
}

fn read_added_data(cursor: &mut Cursor<&[u8]>, contents: &mut ProjectContents) -> Result<()> {
    // Superbundles carry no rows in this version
    cursor.read_i32::<LittleEndian>()?;

    let bundles = cursor.read_i32::<LittleEndian>()?;
    for _ in 0..bundles.max(0) {
        let name = read_null_terminated_string(cursor)?;
        let _superbundle = read_null_terminated_string(cursor)?;
        let _bundle_type = cursor.read_i32::<LittleEndian>()?;
        contents.added_bundles.push(name);
    }

    let ebx = cursor.read_i32::<LittleEndian>()?;
    for _ in 0..ebx.max(0) {
        read_null_terminated_string(cursor)?;
        read_guid(cursor)?;
    }

    let res = cursor.read_i32::<LittleEndian>()?;
    for _ in 0..res.max(0) {
        read_null_terminated_string(cursor)?;
        skip(cursor, ADDED_RES_TRAILER_SIZE)?;
    }

    let chunks = cursor.read_i32::<LittleEndian>()?;
    if chunks > 0 {
        skip(cursor, chunks as usize * ADDED_CHUNK_SIZE)?;
    }
    Ok(())
}

/// Name, linked assets and bundles shared by ebx and res records
fn read_record_prefix(cursor: &mut Cursor<&[u8]>) -> Result<(String, Vec<String>)> {
    let name = read_null_terminated_string(cursor)?;

    let linked = cursor.read_i32::<LittleEndian>()?;
    for _ in 0..linked.max(0) {
        let kind = read_null_terminated_string(cursor)?;
        if kind == "chunk" {
            read_guid(cursor)?;
        } else {
            read_null_terminated_string(cursor)?;
        }
    }

    let bundle_count = cursor.read_i32::<LittleEndian>()?;
    let mut bundles = Vec::new();
    for _ in 0..bundle_count.max(0) {
        bundles.push(read_null_terminated_string(cursor)?);
    }
    Ok((name, bundles))
}

fn read_sized_bytes(cursor: &mut Cursor<&[u8]>) -> Result<Vec<u8>> {
    let len = cursor.read_i32::<LittleEndian>()?;
    read_bytes(cursor, len.max(0) as usize)
}

fn read_modified_ebx(cursor: &mut Cursor<&[u8]>) -> Result<Option<ProjectModification>> {
    let (name, added_bundles) = read_record_prefix(cursor)?;
    if !read_bool(cursor)? {
        return Ok(None);
    }

    let _transient = read_bool(cursor)?;
    let _user_data = read_null_terminated_string(cursor)?;
    let is_resource = read_bool(cursor)?;
    let data = read_sized_bytes(cursor)?;

    if !is_resource {
        tracing::trace!("Ignoring raw ebx data of <{}>", name);
        return Ok(None);
    }
    envelope_modification(name, AssetTable::Ebx, added_bundles, &data).map(Some)
}

fn read_modified_res(cursor: &mut Cursor<&[u8]>) -> Result<Option<ProjectModification>> {
    let (name, added_bundles) = read_record_prefix(cursor)?;
    if !read_bool(cursor)? {
        return Ok(None);
    }

    let sha1 = read_bytes(cursor, SHA1_SIZE)?;
    let _original_size = cursor.read_i64::<LittleEndian>()?;
    let _res_meta = read_sized_bytes(cursor)?;
    let _user_data = read_null_terminated_string(cursor)?;
    let data = read_sized_bytes(cursor)?;

    // A zero hash marks data that is a modified resource rather than raw bytes
    if sha1.iter().any(|&b| b != 0) {
        tracing::trace!("Ignoring raw res data of <{}>", name);
        return Ok(None);
    }
    envelope_modification(name, AssetTable::Res, added_bundles, &data).map(Some)
}

fn envelope_modification(
    name: String,
    table: AssetTable,
    added_bundles: Vec<String>,
    data: &[u8],
) -> Result<ProjectModification> {
    let (kind, payload) = read_envelope(data)?;
    tracing::debug!("Found modified resource <{}> of type {}", name, kind);
    Ok(ProjectModification {
        name,
        table,
        kind,
        added_bundles,
        payload: payload.to_vec(),
    })
}

/// Split a modified-resource envelope into type name and payload
///
/// # Errors
/// Returns an error if the type name is not terminated.
pub fn read_envelope(data: &[u8]) -> Result<(String, &[u8])> {
    let mut cursor = Cursor::new(data);
    let kind = read_null_terminated_string(&mut cursor)?;
    let start = cursor.position() as usize;
    Ok((kind, &data[start..]))
}

/// Wrap a payload in a modified-resource envelope
///
/// # Errors
/// Returns an error if writing fails.
pub fn write_envelope<W: Write>(writer: &mut W, kind: &str, payload: &[u8]) -> Result<()> {
    write_null_terminated_string(writer, kind)?;
    writer.write_all(payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::strings::{Dialect, TextKey};
    use crate::overlay::overlay_to_bytes;
    use byteorder::WriteBytesExt;
    use pretty_assertions::assert_eq;

    /// Write the parts of a project this reader looks at; everything else empty
    fn write_minimal_project<W: Write>(
        writer: &mut W,
        profile: &str,
        modified_res: &[(&str, &[u8])],
    ) -> Result<()> {
        writer.write_u64::<LittleEndian>(PROJECT_MAGIC)?;
        writer.write_u32::<LittleEndian>(PROJECT_FORMAT_VERSION)?;
        write_null_terminated_string(writer, profile)?;
        writer.write_i64::<LittleEndian>(0)?;
        writer.write_i64::<LittleEndian>(0)?;
        writer.write_u32::<LittleEndian>(0)?;
        for _ in 0..5 {
            write_null_terminated_string(writer, "")?;
        }
        for _ in 0..5 {
            writer.write_i32::<LittleEndian>(0)?;
        }
        // superbundles, bundles, ebx, res, chunks
        for _ in 0..5 {
            writer.write_i32::<LittleEndian>(0)?;
        }
        // modified ebx
        writer.write_i32::<LittleEndian>(0)?;

        writer.write_i32::<LittleEndian>(modified_res.len() as i32)?;
        for (name, envelope) in modified_res {
            write_null_terminated_string(writer, name)?;
            writer.write_i32::<LittleEndian>(0)?;
            writer.write_i32::<LittleEndian>(1)?;
            write_null_terminated_string(writer, "win32/localization")?;
            writer.write_u8(1)?;
            writer.write_all(&[0u8; SHA1_SIZE])?;
            writer.write_i64::<LittleEndian>(0)?;
            writer.write_i32::<LittleEndian>(4)?;
            writer.write_all(&[44, 0, 0, 0])?;
            write_null_terminated_string(writer, "")?;
            writer.write_i32::<LittleEndian>(envelope.len() as i32)?;
            writer.write_all(envelope)?;
        }
        Ok(())
    }

    const OVERLAY_TYPE: &str = "PlainLocalizationPlugin.ModifiedPlainLocalizationResource";

    fn overlay_envelope(rid: u64, text: &str) -> Vec<u8> {
        let mut overlay = TextOverlay::bound(rid);
        overlay.set_text(TextKey::id(0x10), text);
        let mut envelope = Vec::new();
        write_envelope(
            &mut envelope,
            OVERLAY_TYPE,
            &overlay_to_bytes(&overlay, Dialect::Plain).unwrap(),
        )
        .unwrap();
        envelope
    }

    #[test]
    fn test_read_string_overlays() {
        let envelope = overlay_envelope(0xAA, "Hi");
        let mut other = Vec::new();
        write_envelope(&mut other, "SomeOther.ModifiedResource", &[1, 2, 3]).unwrap();

        let mut project = Vec::new();
        write_minimal_project(
            &mut project,
            "anthem",
            &[("localization/en", envelope.as_slice()), ("meshes/x", other.as_slice())],
        )
        .unwrap();

        let contents = parse_project_bytes(&project, &GameProfile::Anthem).unwrap();
        assert_eq!(contents.profile, "anthem");
        assert_eq!(contents.modifications.len(), 2);
        assert_eq!(contents.modifications[0].added_bundles, vec!["win32/localization"]);

        let overlays = contents
            .string_overlays(&OverlayOptions::new(Dialect::Plain))
            .unwrap();
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].0, "localization/en");
        assert_eq!(overlays[0].1.rid(), 0xAA);
        assert_eq!(overlays[0].1.get(&TextKey::id(0x10)), Some("Hi"));

        let assets = contents
            .asset_modifications(&OverlayOptions::new(Dialect::Plain))
            .unwrap();
        assert_eq!(assets[1].data.as_ref().unwrap().kind(), "SomeOther.ModifiedResource");
    }

    #[test]
    fn test_bad_magic() {
        let data = 0x1234u64.to_le_bytes();
        assert!(matches!(
            parse_project_bytes(&data, &GameProfile::Anthem),
            Err(Error::InvalidProjectMagic(0x1234))
        ));
    }

    #[test]
    fn test_wrong_version() {
        let mut data = PROJECT_MAGIC.to_le_bytes().to_vec();
        data.extend_from_slice(&13u32.to_le_bytes());
        assert!(matches!(
            parse_project_bytes(&data, &GameProfile::Anthem),
            Err(Error::UnsupportedProjectVersion { found: 13, .. })
        ));
    }

    #[test]
    fn test_profile_mismatch() {
        let mut project = Vec::new();
        write_minimal_project(&mut project, "DeadSpace", &[]).unwrap();
        assert!(matches!(
            parse_project_bytes(&project, &GameProfile::Anthem),
            Err(Error::ProfileMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_project() {
        let mut project = Vec::new();
        write_minimal_project(&mut project, "anthem", &[("a", overlay_envelope(1, "x").as_slice())]).unwrap();
        project.truncate(project.len() - 3);
        assert!(parse_project_bytes(&project, &GameProfile::Anthem).is_err());
    }

    #[test]
    fn test_huge_bundle_count_in_truncated_record() {
        let mut project = Vec::new();
        write_minimal_project(&mut project, "anthem", &[]).unwrap();
        // Replace the trailing modified ebx and res counts with one ebx record
        project.truncate(project.len() - 8);
        project.write_i32::<LittleEndian>(1).unwrap();
        write_null_terminated_string(&mut project, "ui/menu").unwrap();
        project.write_i32::<LittleEndian>(0).unwrap();
        project.write_i32::<LittleEndian>(i32::MAX).unwrap();
        write_null_terminated_string(&mut project, "win32/ui").unwrap();

        assert!(matches!(
            parse_project_bytes(&project, &GameProfile::Anthem),
            Err(Error::UnexpectedEof)
        ));
    }

    #[test]
    fn test_envelope_split() {
        let envelope = overlay_envelope(5, "x");
        let (kind, payload) = read_envelope(&envelope).unwrap();
        assert_eq!(kind, OVERLAY_TYPE);
        assert_eq!(&payload[..4], &1u32.to_le_bytes());
    }
}
