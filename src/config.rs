//! Configuration types for dltracker

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Manifest schema version written by this crate
pub const SCHEMA_VERSION: u32 = 2;

/// Default manifest filename inside a tracked directory
pub const DEFAULT_MANIFEST_NAME: &str = "dltracker.json";

/// Tracker configuration
///
/// Built explicitly and handed to [`DownloadTracker::open_with`](crate::DownloadTracker::open_with),
/// which seals it. Once sealed, every mutator fails with [`Error::ConfigSealed`].
/// Sealing cannot be undone, and the seal is not part of the serialized form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Manifest filename (default: "dltracker.json")
    #[serde(default = "default_manifest_name")]
    manifest_name: String,

    /// Provenance text written to the manifest's `description` field
    #[serde(default = "default_description")]
    description: String,

    /// Indentation width for the pretty-printed manifest (default: 2)
    #[serde(default = "default_indent")]
    indent: usize,

    #[serde(skip)]
    sealed: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            manifest_name: default_manifest_name(),
            description: default_description(),
            indent: default_indent(),
            sealed: false,
        }
    }
}

impl TrackerConfig {
    /// Manifest filename
    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    /// Provenance text for the manifest
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Indentation width for the manifest
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Whether [`seal`](Self::seal) has been called
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Freeze the configuration
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Change the manifest filename
    ///
    /// The name must be a single, non-empty path segment.
    pub fn set_manifest_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.check_unsealed("manifest_name")?;
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(crate::ArgumentError::missing("manifest_name").into());
        }
        if trimmed.contains(['/', '\\']) {
            return Err(crate::ArgumentError::invalid(
                "manifest_name",
                "must not contain path separators",
            )
            .into());
        }
        self.manifest_name = trimmed.to_string();
        Ok(())
    }

    /// Change the provenance text
    pub fn set_description(&mut self, description: impl Into<String>) -> Result<()> {
        self.check_unsealed("description")?;
        self.description = description.into();
        Ok(())
    }

    /// Change the manifest indentation width
    pub fn set_indent(&mut self, indent: usize) -> Result<()> {
        self.check_unsealed("indent")?;
        self.indent = indent;
        Ok(())
    }

    fn check_unsealed(&self, key: &str) -> Result<()> {
        if self.sealed {
            return Err(Error::ConfigSealed {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

fn default_manifest_name() -> String {
    DEFAULT_MANIFEST_NAME.to_string()
}

fn default_description() -> String {
    "Index of package tarballs downloaded for offline installation. Do not edit by hand."
        .to_string()
}

fn default_indent() -> usize {
    2
}
