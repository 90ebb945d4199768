//! Common utilities shared across the string resource, overlay and project formats

pub(crate) mod hash;
pub(crate) mod io;

pub use hash::fnv1a_32;
