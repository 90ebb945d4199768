//! Localized string database over all languages
//!
//! Each language is expected to resolve to exactly one string resource. When a
//! language holds more than one, queries go to the first resource and edits to
//! all of them; a warning is logged since results are then not accurate.
//!
//! Edits that move a resource between unmodified and modified are reported to
//! an optional [`ModificationListener`], synchronously and only on the
//! boundary crossings.

mod resource;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::formats::strings::{ResourceMeta, TextKey};
use crate::overlay::parse_overlay_bytes;

pub use resource::{EditableResource, Transition};

/// Receives resource state changes from [`TextDatabase`]
pub trait ModificationListener {
    /// The resource got its first pending edit
    fn on_modified(&self, rid: u64, name: &str);
    /// The last pending edit of the resource was reverted
    fn on_reverted(&self, rid: u64, name: &str);
}

/// All string resources of a game, grouped by language
pub struct TextDatabase {
    config: Config,
    languages: BTreeMap<String, Vec<EditableResource>>,
    listener: Option<Box<dyn ModificationListener>>,
}

impl std::fmt::Debug for TextDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDatabase")
            .field("config", &self.config)
            .field("languages", &self.languages.keys().collect::<Vec<_>>())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl TextDatabase {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            languages: BTreeMap::new(),
            listener: None,
        }
    }

    /// Install the listener for modified/reverted notifications
    #[must_use]
    pub fn with_listener(mut self, listener: Box<dyn ModificationListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Language key used when none is given, e.g. `LanguageFormat_English`
    #[must_use]
    pub fn default_language(&self) -> String {
        self.config.language_key()
    }

    /// Known language keys, sorted
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Register a resource for a language
    ///
    /// Returns `false` if a resource with the same identity is already loaded
    /// for that language.
    pub fn add_resource(&mut self, language: impl Into<String>, resource: EditableResource) -> bool {
        let resources = self.languages.entry(language.into()).or_default();
        if resources.iter().any(|r| r.rid() == resource.rid()) {
            return false;
        }
        resources.push(resource);
        true
    }

    /// Decode a resource and register it for `language`
    ///
    /// The configured dialect overrides the profile's unless `meta` sets one.
    ///
    /// # Errors
    /// Returns an error if the resource cannot be decoded.
    pub fn load_resource(&mut self, language: &str, data: &[u8], meta: ResourceMeta) -> Result<bool> {
        let dialect = meta.dialect.or(self.config.dialect);
        let resource = EditableResource::from_bytes(data, &meta.with_dialect(dialect))?;
        tracing::info!(
            "Loaded text resource <{}> for language <{}>: {} texts",
            resource.name(),
            language,
            resource.base().len()
        );
        Ok(self.add_resource(language, resource))
    }

    /// Apply a persisted overlay to the resource it is bound to
    ///
    /// Edits already pending on that resource are kept unless the overlay
    /// replaces them. Returns `false` if no loaded resource has the overlay's
    /// identity.
    ///
    /// # Errors
    /// Returns an error if the overlay cannot be decoded.
    pub fn load_overlay(&mut self, data: &[u8]) -> Result<bool> {
        let Some(rid) = data
            .get(4..12)
            .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
            .map(u64::from_le_bytes)
        else {
            return Err(Error::UnexpectedEof);
        };

        let Some(resource) = self
            .languages
            .values_mut()
            .flat_map(|resources| resources.iter_mut())
            .find(|resource| resource.rid() == rid)
        else {
            tracing::warn!("No text resource with resRid <{:X}> is loaded, text mod ignored", rid);
            return Ok(false);
        };

        let incoming = parse_overlay_bytes(data, &self.config.overlay_options(resource.dialect()))?;
        let was_modified = resource.is_modified();
        let overlay = match resource.take_overlay() {
            Some(mut pending) => {
                pending.merge(&incoming);
                pending
            }
            None => incoming,
        };

        let transition = match (was_modified, resource.attach_overlay(overlay)) {
            (true, Transition::Modified) => Transition::None,
            (_, transition) => transition,
        };
        notify(self.listener.as_deref(), transition, resource);
        Ok(true)
    }

    /// Resources of `language`
    ///
    /// Logs a warning if there is more than one and an error if the language
    /// is unknown.
    #[must_use]
    pub fn resources(&self, language: &str) -> &[EditableResource] {
        match self.languages.get(language) {
            Some(resources) => {
                self.warn_if_ambiguous(language, resources.len());
                resources
            }
            None => {
                tracing::error!("Language <{}> is not found in the game!", language);
                &[]
            }
        }
    }

    /// Mutable access to the resources of `language`
    pub fn resources_mut(&mut self, language: &str) -> &mut [EditableResource] {
        if let Some(count) = self.languages.get(language).map(Vec::len) {
            self.warn_if_ambiguous(language, count);
        } else {
            tracing::error!("Language <{}> is not found in the game!", language);
        }
        match self.languages.get_mut(language) {
            Some(resources) => resources,
            None => &mut [],
        }
    }

    fn warn_if_ambiguous(&self, language: &str, count: usize) {
        if count > 1 && self.config.warn_on_multiple_resources {
            tracing::warn!(
                "Language <{}> contains more than one resource! Results will not be accurate!",
                language
            );
        }
    }

    fn default_resources(&self) -> &[EditableResource] {
        self.resources(&self.default_language())
    }

    /// Text of `id` / `variation` in the default language
    #[must_use]
    pub fn get_string(&self, id: u32, variation: i64) -> Option<&str> {
        self.default_resources()
            .first()
            .and_then(|r| r.get_text(&TextKey::new(id, variation)))
    }

    /// Like [`get_string`](Self::get_string) with a decimal id string
    #[must_use]
    pub fn get_string_by_name(&self, id: &str) -> Option<&str> {
        let id = parse_text_id(id)?;
        self.get_string(id, 0)
    }

    /// Every variation of `id` with its current text
    #[must_use]
    pub fn get_all_variations(&self, id: u32) -> BTreeMap<i64, String> {
        let mut variations = BTreeMap::new();
        for resource in self.default_resources() {
            for variation in resource.variations(id) {
                if let Some(text) = resource.get_text(&TextKey::new(id, variation)) {
                    variations.insert(variation, text.to_string());
                }
            }
        }
        variations
    }

    /// Whether `id` / `variation` carries an edit
    #[must_use]
    pub fn is_string_edited(&self, id: u32, variation: i64) -> bool {
        self.default_resources()
            .first()
            .is_some_and(|r| r.is_edited(&TextKey::new(id, variation)))
    }

    /// Set a text in every resource of the default language
    pub fn set_string(&mut self, id: u32, variation: i64, value: &str) {
        let key = TextKey::new(id, variation);
        self.for_each_default_resource(|resource| resource.set_text(key, value));
    }

    /// Like [`set_string`](Self::set_string) with a decimal id string
    pub fn set_string_by_name(&mut self, id: &str, value: &str) {
        if let Some(id) = parse_text_id(id) {
            self.set_string(id, 0, value);
        }
    }

    /// Revert every variation of `id`
    pub fn revert_string(&mut self, id: u32) {
        self.for_each_default_resource(|resource| {
            let mut last = Transition::None;
            for variation in resource.variations(id) {
                let transition = resource.remove_text(&TextKey::new(id, variation));
                if transition != Transition::None {
                    last = transition;
                }
            }
            last
        });
    }

    /// Revert one variation of `id`
    pub fn revert_variation(&mut self, id: u32, variation: i64) {
        let key = TextKey::new(id, variation);
        self.for_each_default_resource(|resource| resource.remove_text(&key));
    }

    /// All text ids, default and modified
    #[must_use]
    pub fn enumerate_strings(&self) -> BTreeSet<u32> {
        self.default_resources()
            .iter()
            .flat_map(EditableResource::all_ids)
            .collect()
    }

    /// Text ids present in the resources themselves
    #[must_use]
    pub fn enumerate_default_strings(&self) -> BTreeSet<u32> {
        self.default_resources()
            .iter()
            .flat_map(EditableResource::default_ids)
            .collect()
    }

    /// Text ids with at least one edit
    #[must_use]
    pub fn enumerate_modified_strings(&self) -> BTreeSet<u32> {
        self.default_resources()
            .iter()
            .flat_map(EditableResource::modified_ids)
            .collect()
    }

    fn for_each_default_resource<F>(&mut self, mut edit: F)
    where
        F: FnMut(&mut EditableResource) -> Transition,
    {
        let language = self.default_language();
        if let Some(count) = self.languages.get(&language).map(Vec::len) {
            self.warn_if_ambiguous(&language, count);
        } else {
            tracing::error!("Language <{}> is not found in the game!", language);
            return;
        }

        let Some(resources) = self.languages.get_mut(&language) else {
            return;
        };
        for resource in resources {
            let transition = edit(resource);
            notify(self.listener.as_deref(), transition, resource);
        }
    }
}

fn notify(listener: Option<&dyn ModificationListener>, transition: Transition, resource: &EditableResource) {
    match transition {
        Transition::None => {}
        Transition::Modified => {
            tracing::info!("Resource <{}> has pending modifications", resource.name());
            if let Some(listener) = listener {
                listener.on_modified(resource.rid(), resource.name());
            }
        }
        Transition::Reverted => {
            tracing::info!("Resource <{}> reverted to its original state", resource.name());
            if let Some(listener) = listener {
                listener.on_reverted(resource.rid(), resource.name());
            }
        }
    }
}

fn parse_text_id(id: &str) -> Option<u32> {
    match id.trim().parse::<u32>() {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!("Cannot read text id <{}>", id);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::strings::{Dialect, LocalizedString, OpaqueHeader, StringResource};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<(String, u64)>>>);

    impl ModificationListener for Recorder {
        fn on_modified(&self, rid: u64, _name: &str) {
            self.0.borrow_mut().push(("modified".to_string(), rid));
        }

        fn on_reverted(&self, rid: u64, _name: &str) {
            self.0.borrow_mut().push(("reverted".to_string(), rid));
        }
    }

    fn english(rid: u64, texts: &[(u32, i64, &str)]) -> EditableResource {
        let mut base = StringResource::new(OpaqueHeader::default(), Dialect::Variations);
        for (id, variation, text) in texts {
            base.entries
                .insert(TextKey::new(*id, *variation), LocalizedString::with_text(*text));
        }
        EditableResource::new("localization/english", rid, base)
    }

    fn database() -> (TextDatabase, Recorder) {
        let recorder = Recorder::default();
        let mut db = TextDatabase::new(Config::default()).with_listener(Box::new(recorder.clone()));
        db.add_resource(
            "LanguageFormat_English",
            english(1, &[(0x10, 0, "Hello"), (0x20, 0, "he"), (0x20, 1, "she")]),
        );
        (db, recorder)
    }

    #[test]
    fn test_scenario_edit_then_revert_by_value() {
        let (mut db, recorder) = database();

        db.set_string(0x10, 0, "Hi");
        assert!(db.is_string_edited(0x10, 0));
        assert_eq!(db.get_string(0x10, 0), Some("Hi"));

        db.set_string(0x10, 0, "Hello");
        assert!(!db.is_string_edited(0x10, 0));
        assert_eq!(db.get_string(0x10, 0), Some("Hello"));

        assert_eq!(
            *recorder.0.borrow(),
            vec![("modified".to_string(), 1), ("reverted".to_string(), 1)]
        );
    }

    #[test]
    fn test_listener_only_on_boundaries() {
        let (mut db, recorder) = database();
        db.set_string(0x10, 0, "a");
        db.set_string(0x10, 0, "b");
        db.set_string(0x30, 0, "c");
        assert_eq!(recorder.0.borrow().len(), 1);

        db.revert_variation(0x10, 0);
        assert_eq!(recorder.0.borrow().len(), 1);
        db.revert_variation(0x30, 0);
        assert_eq!(recorder.0.borrow().len(), 2);
    }

    #[test]
    fn test_revert_string_all_variations() {
        let (mut db, recorder) = database();
        db.set_string(0x20, 0, "him");
        db.set_string(0x20, 1, "her");
        db.revert_string(0x20);

        assert!(!db.is_string_edited(0x20, 0));
        assert!(!db.is_string_edited(0x20, 1));
        assert!(db.enumerate_modified_strings().is_empty());
        assert_eq!(recorder.0.borrow().last().unwrap().0, "reverted");
    }

    #[test]
    fn test_enumeration_completeness() {
        let (mut db, _) = database();
        db.set_string(0x99, 0, "added");
        db.set_string(0x10, 0, "changed");

        let mut expected = db.enumerate_default_strings();
        expected.extend(db.enumerate_modified_strings());
        assert_eq!(db.enumerate_strings(), expected);
        assert_eq!(db.enumerate_modified_strings(), BTreeSet::from([0x10, 0x99]));
    }

    #[test]
    fn test_all_variations() {
        let (mut db, _) = database();
        db.set_string(0x20, 2, "they");
        let variations = db.get_all_variations(0x20);
        assert_eq!(
            variations,
            BTreeMap::from([
                (0, "he".to_string()),
                (1, "she".to_string()),
                (2, "they".to_string()),
            ])
        );
    }

    #[test]
    fn test_string_ids_by_name() {
        let (mut db, _) = database();
        assert_eq!(db.get_string_by_name("16"), Some("Hello"));
        assert_eq!(db.get_string_by_name("not a number"), None);

        db.set_string_by_name("16", "Howdy");
        assert_eq!(db.get_string(0x10, 0), Some("Howdy"));
        db.set_string_by_name("0x10", "ignored");
        assert_eq!(db.get_string(0x10, 0), Some("Howdy"));
    }

    #[test]
    fn test_unknown_language_is_empty() {
        let config = Config {
            default_language: "Klingon".to_string(),
            ..Config::default()
        };
        let mut db = TextDatabase::new(config);
        db.add_resource("LanguageFormat_English", english(1, &[(1, 0, "x")]));

        assert_eq!(db.get_string(1, 0), None);
        assert!(db.enumerate_strings().is_empty());
        db.set_string(1, 0, "y");
        assert!(db.resources("LanguageFormat_English")[0].overlay().is_none());
    }

    #[test]
    fn test_multiple_resources_first_wins() {
        let (mut db, recorder) = database();
        assert!(db.add_resource("LanguageFormat_English", english(2, &[(0x10, 0, "Other")])));
        assert!(!db.add_resource("LanguageFormat_English", english(2, &[])));

        assert_eq!(db.get_string(0x10, 0), Some("Hello"));
        db.set_string(0x10, 0, "Edited");
        // Edit lands in both resources, each crossing its own boundary
        assert_eq!(recorder.0.borrow().len(), 2);
        assert_eq!(
            db.resources("LanguageFormat_English")[1].get_text(&TextKey::id(0x10)),
            Some("Edited")
        );
    }

    #[test]
    fn test_load_overlay_binds_by_identity() {
        let (mut db, recorder) = database();
        let mut overlay = crate::overlay::TextOverlay::bound(1);
        overlay.set_text(TextKey::new(0x20, 1), "they");
        let bytes = crate::overlay::overlay_to_bytes(&overlay, Dialect::Variations).unwrap();

        assert!(db.load_overlay(&bytes).unwrap());
        assert_eq!(db.get_string(0x20, 1), Some("they"));
        assert_eq!(*recorder.0.borrow(), vec![("modified".to_string(), 1)]);

        // Merged onto pending edits without a second notification
        db.set_string(0x10, 0, "Hi");
        let mut second = crate::overlay::TextOverlay::bound(1);
        second.set_text(TextKey::new(0x20, 1), "it");
        let bytes = crate::overlay::overlay_to_bytes(&second, Dialect::Variations).unwrap();
        assert!(db.load_overlay(&bytes).unwrap());

        assert_eq!(db.get_string(0x10, 0), Some("Hi"));
        assert_eq!(db.get_string(0x20, 1), Some("it"));
        assert_eq!(recorder.0.borrow().len(), 1);
    }

    #[test]
    fn test_load_overlay_unknown_resource() {
        let (mut db, _) = database();
        let mut overlay = crate::overlay::TextOverlay::bound(42);
        overlay.set_text(TextKey::id(1), "x");
        let bytes = crate::overlay::overlay_to_bytes(&overlay, Dialect::Variations).unwrap();

        assert!(!db.load_overlay(&bytes).unwrap());
        assert!(matches!(db.load_overlay(&[1, 0, 0]), Err(Error::UnexpectedEof)));
    }
}
