//! Configuration for plainloca.toml

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::strings::Dialect;
use crate::overlay::{OverlayOptions, VersionPolicy};

/// Prefix of the language keys resources are registered under
pub const LANGUAGE_KEY_PREFIX: &str = "LanguageFormat_";

fn default_language() -> String {
    "English".to_string()
}

fn default_true() -> bool {
    true
}

/// Settings passed into the text database and overlay readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Language shown and edited by default, without the key prefix
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Handling of overlays written by a newer format revision
    #[serde(default)]
    pub overlay_version_policy: VersionPolicy,
    /// Key row dialect, overriding the one implied by the game profile
    #[serde(default)]
    pub dialect: Option<Dialect>,
    #[serde(default = "default_true")]
    pub warn_on_multiple_resources: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            overlay_version_policy: VersionPolicy::default(),
            dialect: None,
            warn_on_multiple_resources: true,
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text; missing fields take defaults
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Language key of the default language, e.g. `LanguageFormat_English`
    #[must_use]
    pub fn language_key(&self) -> String {
        format!("{LANGUAGE_KEY_PREFIX}{}", self.default_language)
    }

    /// Overlay read options for resources of `dialect`
    ///
    /// The configured dialect, if any, takes precedence.
    #[must_use]
    pub fn overlay_options(&self, dialect: Dialect) -> OverlayOptions {
        OverlayOptions::new(self.dialect.unwrap_or(dialect)).with_policy(self.overlay_version_policy)
    }
}
