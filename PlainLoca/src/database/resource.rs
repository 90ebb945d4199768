//! One decoded string resource together with its edit overlay

use std::collections::BTreeSet;

use crate::error::Result;
use crate::formats::strings::{
    Dialect, ResourceMeta, StringResource, TextKey, encode_resource, parse_resource_bytes,
};
use crate::overlay::{TextOverlay, overlay_to_bytes};

/// Modification state change caused by an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The resource stayed in its state
    None,
    /// Unmodified -> modified: the first edit created the overlay
    Modified,
    /// Modified -> unmodified: the last edit was reverted and the overlay dropped
    Reverted,
}

/// A string resource as the editor sees it: default texts plus overlay
#[derive(Debug, Clone)]
pub struct EditableResource {
    name: String,
    rid: u64,
    base: StringResource,
    overlay: Option<TextOverlay>,
}

impl EditableResource {
    #[must_use]
    pub fn new(name: impl Into<String>, rid: u64, base: StringResource) -> Self {
        Self {
            name: name.into(),
            rid,
            base,
            overlay: None,
        }
    }

    /// Decode `data` and wrap it
    ///
    /// # Errors
    /// See [`parse_resource_bytes`].
    pub fn from_bytes(data: &[u8], meta: &ResourceMeta) -> Result<Self> {
        let base = parse_resource_bytes(data, meta)?;
        Ok(Self::new(meta.name.clone(), meta.rid, base))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rid(&self) -> u64 {
        self.rid
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.base.dialect
    }

    /// The decoded resource, without edits
    #[must_use]
    pub fn base(&self) -> &StringResource {
        &self.base
    }

    #[must_use]
    pub fn overlay(&self) -> Option<&TextOverlay> {
        self.overlay.as_ref()
    }

    /// Whether any edit is pending
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.overlay.is_some()
    }

    /// Attach a previously persisted overlay, binding it to this resource
    ///
    /// An empty overlay is dropped instead of attached.
    pub fn attach_overlay(&mut self, mut overlay: TextOverlay) -> Transition {
        let was_modified = self.is_modified();
        overlay.bind_rid(self.rid);

        if overlay.is_empty() {
            self.overlay = None;
            return if was_modified {
                Transition::Reverted
            } else {
                Transition::None
            };
        }

        self.overlay = Some(overlay);
        if was_modified {
            Transition::None
        } else {
            Transition::Modified
        }
    }

    /// Detach and return the overlay
    pub fn take_overlay(&mut self) -> Option<TextOverlay> {
        self.overlay.take()
    }

    /// Current text: overlay first, then the default text
    #[must_use]
    pub fn get_text(&self, key: &TextKey) -> Option<&str> {
        self.overlay
            .as_ref()
            .and_then(|o| o.get(key))
            .or_else(|| self.base.text(key))
    }

    /// Text as stored in the resource, ignoring edits
    #[must_use]
    pub fn get_default_text(&self, key: &TextKey) -> Option<&str> {
        self.base.text(key)
    }

    /// Add or edit a text
    ///
    /// Setting a text back to its default value reverts the edit instead of
    /// storing a duplicate. Plain dialect resources have no variations, so
    /// edits to a non-zero variation are refused and nothing is stored.
    pub fn set_text(&mut self, key: TextKey, text: impl Into<String>) -> Transition {
        if self.base.dialect == Dialect::Plain && key.variation != 0 {
            tracing::warn!(
                "Ignoring edit of <{}> in resource <{}>: the plain dialect cannot store variations",
                key,
                self.name
            );
            return Transition::None;
        }

        let text = text.into();
        if self.base.text(&key) == Some(text.as_str()) {
            return self.remove_text(&key);
        }

        let transition = if self.overlay.is_none() {
            Transition::Modified
        } else {
            Transition::None
        };

        let rid = self.rid;
        self.overlay
            .get_or_insert_with(|| TextOverlay::bound(rid))
            .set_text(key, text);

        tracing::trace!("Added or replaced text <{}> in resource <{}>", key, self.name);
        transition
    }

    /// Revert an edited text; the overlay is dropped once it is empty
    pub fn remove_text(&mut self, key: &TextKey) -> Transition {
        let Some(overlay) = self.overlay.as_mut() else {
            return Transition::None;
        };

        overlay.remove_text(key);
        if overlay.is_empty() {
            self.overlay = None;
            Transition::Reverted
        } else {
            Transition::None
        }
    }

    /// Whether `key` carries an edit
    #[must_use]
    pub fn is_edited(&self, key: &TextKey) -> bool {
        self.overlay.as_ref().is_some_and(|o| o.contains(key))
    }

    /// Ids present in the resource itself
    #[must_use]
    pub fn default_ids(&self) -> BTreeSet<u32> {
        self.base.ids()
    }

    /// Ids with at least one edit
    #[must_use]
    pub fn modified_ids(&self) -> BTreeSet<u32> {
        self.overlay.as_ref().map(TextOverlay::ids).unwrap_or_default()
    }

    /// Union of default and modified ids
    #[must_use]
    pub fn all_ids(&self) -> BTreeSet<u32> {
        let mut ids = self.default_ids();
        ids.extend(self.modified_ids());
        ids
    }

    /// Variations of `id` known to the resource or the overlay
    #[must_use]
    pub fn variations(&self, id: u32) -> BTreeSet<i64> {
        let mut variations = self.base.variations(id);
        if let Some(overlay) = &self.overlay {
            variations.extend(overlay.variations_of(id));
        }
        variations
    }

    /// Encode the resource with all edits applied
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn save_bytes(&self) -> Result<Vec<u8>> {
        tracing::debug!(
            "Writing text resource <{}>, including <{}> modified texts out of <{}> default texts",
            self.name,
            self.overlay.as_ref().map_or(0, TextOverlay::len),
            self.base.len()
        );
        encode_resource(&self.base, self.overlay.as_ref())
    }

    /// Persist the overlay, if there is one
    ///
    /// # Errors
    /// Returns [`crate::Error::OverlayUnbound`] if the resource identity is 0.
    pub fn save_overlay(&self) -> Result<Option<Vec<u8>>> {
        self.overlay
            .as_ref()
            .map(|o| overlay_to_bytes(o, self.base.dialect))
            .transpose()
    }
}
