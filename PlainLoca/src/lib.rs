//! # PlainLoca
//!
//! A pure-Rust library for Frostbite plain localized string resources, as
//! shipped by Anthem and Dead Space.
//!
//! ## Features
//!
//! - **String resources** - Decode and re-encode the binary string table,
//!   keeping unknown header fields and per-key payloads intact
//! - **Overlays** - Sparse, persistable edit sets bound to one resource
//! - **Text database** - Per-language lookup and editing with revert-by-value
//! - **Union merge** - Combine edits from two independently made projects
//! - **Project reader** - Pull persisted overlays out of a project file
//!
//! ## Quick Start
//!
//! ### Reading and Editing a Resource
//!
//! ```no_run
//! use plainloca::prelude::*;
//!
//! let meta = ResourceMeta::new("localization/english", 0x1234, GameProfile::Anthem, vec![44, 0, 0, 0]);
//! let data = std::fs::read("english.res")?;
//!
//! let mut resource = EditableResource::from_bytes(&data, &meta)?;
//! resource.set_text(TextKey::id(0x10), "Hi");
//!
//! std::fs::write("english.res", resource.save_bytes()?)?;
//! if let Some(overlay) = resource.save_overlay()? {
//!     std::fs::write("english.mod", overlay)?;
//! }
//! # Ok::<(), plainloca::Error>(())
//! ```
//!
//! ### Using the Text Database
//!
//! ```
//! use plainloca::prelude::*;
//!
//! let db = TextDatabase::new(Config::default());
//! assert_eq!(db.default_language(), "LanguageFormat_English");
//! assert_eq!(db.get_string(0x10, 0), None);
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod formats;
pub mod merge;
pub mod overlay;
pub mod project;
pub mod usage;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::formats::strings::{
        Dialect, GameProfile, LocalizedString, OpaqueHeader, ResourceMeta, StringResource,
        TextKey, encode_resource, parse_resource_bytes, read_resource, write_resource,
    };

    pub use crate::overlay::{
        OverlayOptions, TextOverlay, VersionPolicy, overlay_to_bytes, parse_overlay_bytes,
        read_overlay, write_overlay,
    };

    pub use crate::database::{EditableResource, ModificationListener, TextDatabase, Transition};

    pub use crate::merge::{
        AssetData, AssetModification, ExternalRef, MergeReport, merge_assets, merge_overlays,
        union_merge_projects,
    };

    pub use crate::project::{ProjectContents, ProjectModification, parse_project_bytes, read_project};
    pub use crate::usage::{StringReferences, UsageIndex, scan_usages};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
