//! Sparse edit overlay for a string resource
//!
//! An overlay records only the texts a user added or changed. It is bound to
//! one resource by identity (the resource id) and can be persisted on its own
//! and re-attached to a freshly decoded resource later.
//!
//! # Example
//!
//! ```
//! use plainloca::formats::strings::{Dialect, TextKey};
//! use plainloca::overlay::{OverlayOptions, TextOverlay, overlay_to_bytes, parse_overlay_bytes};
//!
//! let mut overlay = TextOverlay::bound(0xCAFE);
//! overlay.set_text(TextKey::id(0x10), "Hi");
//!
//! let bytes = overlay_to_bytes(&overlay, Dialect::Plain)?;
//! let reloaded = parse_overlay_bytes(&bytes, &OverlayOptions::new(Dialect::Plain))?;
//! assert_eq!(reloaded.get(&TextKey::id(0x10)), Some("Hi"));
//! # Ok::<(), plainloca::Error>(())
//! ```

mod persist;

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::formats::strings::TextKey;

pub use persist::{
    OVERLAY_PERSISTENCE_VERSION, OverlayOptions, VersionPolicy, overlay_to_bytes,
    parse_overlay_bytes, read_overlay, write_overlay,
};

/// Added or replaced texts of one resource, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOverlay {
    rid: u64,
    texts: IndexMap<TextKey, String>,
}

impl TextOverlay {
    /// Create an unbound, empty overlay
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty overlay bound to `rid`
    #[must_use]
    pub fn bound(rid: u64) -> Self {
        Self {
            rid,
            texts: IndexMap::new(),
        }
    }

    /// Identity of the resource this overlay belongs to; 0 when unbound
    #[must_use]
    pub fn rid(&self) -> u64 {
        self.rid
    }

    /// Bind the overlay to a resource
    ///
    /// Rebinding to a different resource is allowed but logged, as it usually
    /// means a mod made for another game or language version.
    pub fn bind_rid(&mut self, rid: u64) {
        if self.rid != 0 && self.rid != rid {
            tracing::warn!(
                "Trying to initialize modified resource for resRid <{:X}> with contents of resource resRid <{:X}> - This may indicate a mod made for a different game or language version!",
                self.rid,
                rid
            );
        }
        self.rid = rid;
    }

    /// Add or replace a text
    pub fn set_text(&mut self, key: TextKey, text: impl Into<String>) {
        self.texts.insert(key, text.into());
    }

    /// Remove a text; no-op if absent
    pub fn remove_text(&mut self, key: &TextKey) -> Option<String> {
        self.texts.shift_remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &TextKey) -> Option<&str> {
        self.texts.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &TextKey) -> bool {
        self.texts.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TextKey, &String)> {
        self.texts.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TextKey> {
        self.texts.keys()
    }

    /// Distinct text ids with at least one edit
    #[must_use]
    pub fn ids(&self) -> BTreeSet<u32> {
        self.texts.keys().map(|k| k.id).collect()
    }

    /// Edited variations of `id`
    #[must_use]
    pub fn variations_of(&self, id: u32) -> BTreeSet<i64> {
        self.texts
            .keys()
            .filter(|k| k.id == id)
            .map(|k| k.variation)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Take every text of `higher_priority`, overwriting texts already present
    ///
    /// Keys only present here are kept. An identity mismatch is logged, not
    /// rejected; an unbound overlay adopts the other identity.
    pub fn merge(&mut self, higher_priority: &TextOverlay) {
        if self.rid == 0 {
            self.rid = higher_priority.rid;
        } else if self.rid != higher_priority.rid {
            tracing::warn!(
                "Trying to merge resource with resRid <{:X}> into resource for resRid <{:X}> - This may indicate a mod made for a different game version!",
                higher_priority.rid,
                self.rid
            );
        }

        for (key, text) in &higher_priority.texts {
            self.set_text(*key, text.clone());
        }
    }
}

impl<'a> IntoIterator for &'a TextOverlay {
    type Item = (&'a TextKey, &'a String);
    type IntoIter = indexmap::map::Iter<'a, TextKey, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.texts.iter()
    }
}
