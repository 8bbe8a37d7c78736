//! The download tracker: a registry of tarballs cached in one directory
//!
//! ## Submodules
//!
//! Methods on [`DownloadTracker`] are organized by concern:
//! - `add`: recording newly downloaded tarballs
//! - `resolve`: `get`/`contains` lookups with per-kind spec resolution
//! - `persist`: writing the manifest
//! - `audit`: checking records against the filesystem
//!
//! ## Concurrency
//!
//! A tracker has a single writer: `add` and `serialize` take `&mut self`, so concurrent
//! producers must funnel their writes through one owner (for example a task fed by a
//! channel). `get` and `contains` are synchronous and take `&self`.

mod add;
mod audit;
mod persist;
mod resolve;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use audit::AuditEntry;

use crate::config::TrackerConfig;
use crate::error::{ArgumentError, Error, Result};
use crate::logging::{self, Logger};
use crate::manifest::{Document, Sections};
use crate::reconstruct::reconstruct;
use crate::types::ResolvedRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Registry of the package tarballs cached in one directory
pub struct DownloadTracker {
    /// Absolute path of the tracked directory
    path: PathBuf,

    /// Sealed configuration
    config: Arc<TrackerConfig>,

    /// Destination for diagnostics
    logger: Arc<dyn Logger>,

    /// In-memory index plus manifest metadata
    document: Document,

    /// Whether the index changed since it was loaded or last written
    dirty: bool,
}

impl std::fmt::Debug for DownloadTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadTracker")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl DownloadTracker {
    /// Open the tracker for `directory` with the default configuration
    ///
    /// See [`open_with`](Self::open_with).
    pub async fn open(directory: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(directory, TrackerConfig::default(), None).await
    }

    /// Open the tracker for `directory`
    ///
    /// Loads the manifest if there is one, repairing records of the wrong shape.
    /// Without a manifest, the index is rebuilt from the directory listing and the
    /// tracker starts dirty so the next [`serialize`](Self::serialize) writes one.
    /// `config` is sealed and kept for the tracker's lifetime.
    ///
    /// # Errors
    /// - [`ArgumentError::Missing`] if `directory` is empty
    /// - [`Error::DirectoryNotFound`] / [`Error::NotADirectory`] for a bad directory
    /// - [`Error::ManifestParse`] if the manifest is not valid JSON
    /// - [`Error::Io`] if the manifest exists but cannot be read
    pub async fn open_with(
        directory: impl AsRef<Path>,
        mut config: TrackerConfig,
        logger: Option<Arc<dyn Logger>>,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        if directory.as_os_str().is_empty() {
            return Err(ArgumentError::missing("directory").into());
        }
        let logger = logging::or_default(logger);

        let metadata = match tokio::fs::metadata(directory).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::DirectoryNotFound {
                    path: directory.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_dir() {
            return Err(Error::NotADirectory {
                path: directory.to_path_buf(),
            });
        }
        let path = tokio::fs::canonicalize(directory).await?;

        config.seal();
        let manifest_path = path.join(config.manifest_name());

        let (document, dirty) = match tokio::fs::read_to_string(&manifest_path).await {
            Ok(text) => match Document::parse(&text, logger.as_ref()) {
                Ok(document) => {
                    let repaired = document.repaired;
                    (document, repaired)
                }
                Err(source) => {
                    logger.error(&format!(
                        "failed to parse manifest {}",
                        manifest_path.display()
                    ));
                    logger.error(&source.to_string());
                    return Err(Error::ManifestParse {
                        path: manifest_path,
                        source,
                    });
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                logger.info(&format!(
                    "no manifest found at {}; indexing directory contents",
                    manifest_path.display()
                ));
                let sections = reconstruct(&path, Some(logger.clone())).await?;
                let document = Document {
                    sections,
                    ..Document::default()
                };
                (document, true)
            }
            Err(e) => {
                logger.error(&format!(
                    "failed to read manifest {}: {}",
                    manifest_path.display(),
                    e
                ));
                return Err(e.into());
            }
        };

        Ok(Self {
            path,
            config: Arc::new(config),
            logger,
            document,
            dirty,
        })
    }

    /// Absolute path of the tracked directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sealed configuration this tracker was opened with
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Whether there are changes not yet written by [`serialize`](Self::serialize)
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The in-memory index
    pub fn sections(&self) -> &Sections {
        &self.document.sections
    }

    /// Full path of the tarball a resolved record refers to
    pub fn tarball_path(&self, record: &ResolvedRecord) -> PathBuf {
        self.path.join(record.filename())
    }

    fn manifest_path(&self) -> PathBuf {
        self.path.join(self.config.manifest_name())
    }
}
