//! Binary formats
//!
//! `strings` is the localized string resource codec; `common` holds the
//! cursor helpers and hashing it shares with the overlay and project readers.

pub mod common;
pub mod strings;

// Re-export main resource types
pub use strings::{
    Dialect, GameProfile, LocalizedString, OpaqueHeader, ResourceMeta, StringResource, TextKey,
    encode_resource, parse_resource_bytes, read_resource, write_resource,
};
