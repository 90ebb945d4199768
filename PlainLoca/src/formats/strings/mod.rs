//! Plain localized string resource format
//!
//! Binary string table used by Anthem and Dead Space. A resource holds one
//! language: a fixed header, a key table mapping text ids to string block
//! indices, an opaque "unknown segment" and a trailing string block.
//!
//! ```text
//! u32 langIndex | u32 version | u32 nameHash | i64 numKeys | i32 numUnknownSegments
//! i64 numStrings | i32 unk1 | i32 unk2 | i32 unk3
//! numKeys            x (u32 index | u32 textId | 8 bytes opaque or i64 variation)
//! numUnknownSegments x 12 bytes
//! (u32 index | i32 length | utf8 bytes[length]) until end of buffer
//! ```

mod header;
mod reader;
mod writer;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use header::OpaqueHeader;
pub use reader::{parse_resource_bytes, read_resource};
pub use writer::{effective_entries, encode_resource, write_resource};

/// Size of the fixed header fields in bytes
pub const HEADER_FIELDS_SIZE: usize = 44;

/// Size of one entry in the unknown segment
pub const UNKNOWN_SEGMENT_SIZE: usize = 12;

/// Size of one key table row (index + id + 8 bytes)
pub const KEY_ROW_SIZE: usize = 16;

/// Size of the opaque per-key payload in the plain dialect
pub const OPAQUE_SIZE: usize = 8;

/// Identifies one text: text id plus variation
///
/// Ordering is id-major, variation-minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextKey {
    /// Stable id referenced by game content
    pub id: u32,
    /// Grammatical variation, 0 for the default text
    pub variation: i64,
}

impl TextKey {
    #[must_use]
    pub const fn new(id: u32, variation: i64) -> Self {
        Self { id, variation }
    }

    /// Key for the default variation of `id`
    #[must_use]
    pub const fn id(id: u32) -> Self {
        Self { id, variation: 0 }
    }
}

impl From<u32> for TextKey {
    fn from(id: u32) -> Self {
        Self::id(id)
    }
}

impl fmt::Display for TextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variation == 0 {
            write!(f, "{:08X}", self.id)
        } else {
            write!(f, "{:08X}[{}]", self.id, self.variation)
        }
    }
}

/// Layout of the per-key trailer in the key table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// 8 opaque bytes, one text per id
    Plain,
    /// `i64` variation number, several texts per id
    Variations,
}

impl Dialect {
    /// Whether persisted overlays carry a variation after each text id
    #[must_use]
    pub fn has_variations(self) -> bool {
        matches!(self, Dialect::Variations)
    }
}

/// Game the resource was taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameProfile {
    Anthem,
    DeadSpace,
    /// Any other profile; decoding rejects it
    Other(String),
}

impl GameProfile {
    /// Parse a profile name, ignoring case
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "anthem" => GameProfile::Anthem,
            "deadspace" | "dead space" => GameProfile::DeadSpace,
            _ => GameProfile::Other(name.to_string()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            GameProfile::Anthem => "Anthem",
            GameProfile::DeadSpace => "DeadSpace",
            GameProfile::Other(name) => name,
        }
    }

    /// Key table dialect used by this game
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedProfile`] for [`GameProfile::Other`].
    pub fn dialect(&self) -> Result<Dialect> {
        match self {
            GameProfile::Anthem => Ok(Dialect::Plain),
            GameProfile::DeadSpace => Ok(Dialect::Variations),
            GameProfile::Other(name) => Err(Error::UnsupportedProfile {
                profile: name.clone(),
            }),
        }
    }
}

/// Everything the asset manager knows about a resource besides its bytes
#[derive(Debug, Clone)]
pub struct ResourceMeta {
    /// Display name, used in log output
    pub name: String,
    /// Resource identity; overlays are bound to it
    pub rid: u64,
    pub profile: GameProfile,
    /// Raw resource metadata; the first 4 bytes hold the header length
    pub res_meta: Vec<u8>,
    /// Overrides the dialect implied by the profile
    pub dialect: Option<Dialect>,
}

impl ResourceMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, rid: u64, profile: GameProfile, res_meta: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            rid,
            profile,
            res_meta,
            dialect: None,
        }
    }

    /// Force a key table dialect regardless of profile
    #[must_use]
    pub fn with_dialect(mut self, dialect: Option<Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// Header length declared by the metadata
    pub fn header_size(&self) -> Result<usize> {
        match self.res_meta.get(..4) {
            Some(&[a, b, c, d]) => Ok(u32::from_le_bytes([a, b, c, d]) as usize),
            _ => Err(Error::InvalidResourceMeta {
                len: self.res_meta.len(),
            }),
        }
    }

    /// Dialect to decode with; fails for unsupported profiles even when overridden
    pub fn resolve_dialect(&self) -> Result<Dialect> {
        let profile_dialect = self.profile.dialect()?;
        Ok(self.dialect.unwrap_or(profile_dialect))
    }
}

/// Default text of one key as stored in the resource
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocalizedString {
    /// Opaque key table payload, written back unchanged
    pub opaque: [u8; OPAQUE_SIZE],
    /// Text from the string block; `None` if no string row resolved to this key
    pub text: Option<String>,
}

impl LocalizedString {
    #[must_use]
    pub fn new(opaque: [u8; OPAQUE_SIZE]) -> Self {
        Self { opaque, text: None }
    }

    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            opaque: [0; OPAQUE_SIZE],
            text: Some(text.into()),
        }
    }
}

/// A decoded string resource
#[derive(Debug, Clone)]
pub struct StringResource {
    pub header: OpaqueHeader,
    pub dialect: Dialect,
    pub entries: BTreeMap<TextKey, LocalizedString>,
}

impl StringResource {
    #[must_use]
    pub fn new(header: OpaqueHeader, dialect: Dialect) -> Self {
        Self {
            header,
            dialect,
            entries: BTreeMap::new(),
        }
    }

    /// Default text for `key`, if any
    #[must_use]
    pub fn text(&self, key: &TextKey) -> Option<&str> {
        self.entries.get(key).and_then(|e| e.text.as_deref())
    }

    #[must_use]
    pub fn contains_key(&self, key: &TextKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Distinct text ids
    #[must_use]
    pub fn ids(&self) -> BTreeSet<u32> {
        self.entries.keys().map(|k| k.id).collect()
    }

    /// Variations defined for `id`
    #[must_use]
    pub fn variations(&self, id: u32) -> BTreeSet<i64> {
        self.entries
            .range(TextKey::new(id, i64::MIN)..=TextKey::new(id, i64::MAX))
            .map(|(k, _)| k.variation)
            .collect()
    }

    /// Key to text mapping, skipping keys without text
    #[must_use]
    pub fn texts(&self) -> BTreeMap<TextKey, String> {
        self.entries
            .iter()
            .filter_map(|(k, e)| e.text.clone().map(|t| (*k, t)))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_key_ordering() {
        let mut keys = vec![
            TextKey::new(2, 0),
            TextKey::new(1, 5),
            TextKey::new(1, -1),
            TextKey::new(1, 0),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                TextKey::new(1, -1),
                TextKey::new(1, 0),
                TextKey::new(1, 5),
                TextKey::new(2, 0),
            ]
        );
    }

    #[test]
    fn test_text_key_display() {
        assert_eq!(TextKey::id(0x10).to_string(), "00000010");
        assert_eq!(TextKey::new(0xABCD, 2).to_string(), "0000ABCD[2]");
    }

    #[test]
    fn test_profile_dialects() {
        assert_eq!(GameProfile::from_name("anthem").dialect().unwrap(), Dialect::Plain);
        assert_eq!(
            GameProfile::from_name("DeadSpace").dialect().unwrap(),
            Dialect::Variations
        );
        assert!(matches!(
            GameProfile::from_name("MassEffectAndromeda").dialect(),
            Err(Error::UnsupportedProfile { .. })
        ));
    }

    #[test]
    fn test_header_size_from_meta() {
        let meta = ResourceMeta::new("en", 1, GameProfile::Anthem, vec![44, 0, 0, 0, 9, 9]);
        assert_eq!(meta.header_size().unwrap(), 44);

        let short = ResourceMeta::new("en", 1, GameProfile::Anthem, vec![44, 0]);
        assert!(matches!(
            short.header_size(),
            Err(Error::InvalidResourceMeta { len: 2 })
        ));
    }

    #[test]
    fn test_dialect_override_still_checks_profile() {
        let meta = ResourceMeta::new("en", 1, GameProfile::Anthem, vec![44, 0, 0, 0])
            .with_dialect(Some(Dialect::Variations));
        assert_eq!(meta.resolve_dialect().unwrap(), Dialect::Variations);

        let other = ResourceMeta::new("en", 1, GameProfile::from_name("Bf1"), vec![44, 0, 0, 0])
            .with_dialect(Some(Dialect::Plain));
        assert!(other.resolve_dialect().is_err());
    }

    #[test]
    fn test_variations_range() {
        let mut resource = StringResource::new(OpaqueHeader::default(), Dialect::Variations);
        resource.entries.insert(TextKey::new(1, 0), LocalizedString::with_text("a"));
        resource.entries.insert(TextKey::new(1, 3), LocalizedString::with_text("b"));
        resource.entries.insert(TextKey::new(2, 1), LocalizedString::with_text("c"));

        assert_eq!(resource.variations(1), BTreeSet::from([0, 3]));
        assert_eq!(resource.variations(2), BTreeSet::from([1]));
        assert!(resource.variations(3).is_empty());
        assert_eq!(resource.ids(), BTreeSet::from([1, 2]));
    }
}
