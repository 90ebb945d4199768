//! Error types for `PlainLoca`
//!
//! Structural problems inside a resource (header length mismatch, unresolved
//! string indices, truncated tables) are not errors: they are reported through
//! `tracing` and decoding continues with whatever could be read.

use thiserror::Error;

/// The error type for `PlainLoca` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected end of input while reading a required field.
    #[error("unexpected end of file")]
    UnexpectedEof,

    // ==================== String Resource Errors ====================
    /// The game profile is not one this codec understands.
    #[error("unsupported game profile '{profile}' (supported: Anthem, DeadSpace)")]
    UnsupportedProfile {
        /// The profile name that was requested.
        profile: String,
    },

    /// The resource is too short to contain the fixed header.
    #[error("truncated string resource header: need {expected} bytes, have {available}")]
    TruncatedHeader {
        /// Size of the fixed header in bytes.
        expected: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// The resource metadata does not carry a header length.
    #[error("invalid resource metadata: {len} bytes (need at least 4)")]
    InvalidResourceMeta {
        /// Length of the metadata blob.
        len: usize,
    },

    // ==================== Overlay Errors ====================
    /// The persisted overlay was written by a newer format revision.
    #[error(
        "overlay persistence version {found} is newer than supported version {supported}; \
         update the tool or remove the newer mod"
    )]
    UnsupportedOverlayVersion {
        /// The version tag found in the data.
        found: u32,
        /// The highest version this reader understands.
        supported: u32,
    },

    /// An overlay was saved without being bound to a resource.
    #[error("modified resource not bound to any resource")]
    OverlayUnbound,

    // ==================== Merge Errors ====================
    /// Two asset modifications of different kinds were merged.
    #[error("cannot merge asset '{name}': kind '{left}' does not match '{right}'")]
    IncompatibleMerge {
        /// Asset name.
        name: String,
        /// Kind of the first operand.
        left: String,
        /// Kind of the second operand.
        right: String,
    },

    // ==================== Project File Errors ====================
    /// The file is not a project file.
    #[error("invalid project magic: {0:#018x}")]
    InvalidProjectMagic(u64),

    /// The project file format version is not supported.
    #[error("unsupported project version: {found} (supported: {supported})")]
    UnsupportedProjectVersion {
        /// The version number found in the file.
        found: u32,
        /// The only version this reader understands.
        supported: u32,
    },

    /// The project file was written for a different game.
    #[error("project was made for profile '{found}', expected '{expected}'")]
    ProfileMismatch {
        /// Profile of the loaded data.
        expected: String,
        /// Profile stored in the project.
        found: String,
    },

    // ==================== Parsing Errors ====================
    /// TOML configuration parse error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A string field was not valid UTF-8, or cannot be written as a null-terminated string.
    #[error("invalid string: {0}")]
    InvalidString(String),
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::InvalidString(err.to_string())
    }
}

/// A specialized Result type for `PlainLoca` operations.
pub type Result<T> = std::result::Result<T, Error>;
