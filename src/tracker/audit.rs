//! Checking index records against the tracked directory

use super::DownloadTracker;
use crate::error::AuditError;
use crate::filename::has_tarball_extension;
use crate::manifest::{GitEntry, Slot};
use crate::types::Kind;
use serde::Serialize;
use serde_json::Value;

/// A problem found by [`DownloadTracker::audit`]
#[derive(Debug)]
pub struct AuditEntry {
    /// Section of the offending record
    pub kind: Kind,
    /// Package name, repo, or (for `url`) the URL key
    pub name: String,
    /// Version, tag, commit or ref under `name`; `None` for `url` records
    pub key: Option<String>,
    /// The record as it is stored
    pub record: Value,
    /// What is wrong with it
    pub error: AuditError,
}

impl AuditEntry {
    fn new<T: Serialize>(
        kind: Kind,
        name: &str,
        key: Option<&str>,
        slot: &Slot<T>,
        error: AuditError,
    ) -> Self {
        Self {
            kind,
            name: name.to_string(),
            key: key.map(str::to_string),
            record: serde_json::to_value(slot).unwrap_or(Value::Null),
            error,
        }
    }
}

impl DownloadTracker {
    /// Check every record against the filesystem and the rest of the index
    ///
    /// A record referencing a tarball must name an existing, non-empty regular file
    /// with a tarball extension. Placeholders for records that were malformed at load
    /// are reported as [`AuditError::NoData`], and tags or git refs whose target is
    /// missing as [`AuditError::OrphanedReference`].
    ///
    /// Never fails and never modifies the index. Problems are listed in section order
    /// (`semver`, `tag`, `git`, `url`), then in index order. An empty list means the
    /// index is consistent.
    pub async fn audit(&self) -> Vec<AuditEntry> {
        let sections = &self.document.sections;
        let mut problems = Vec::new();

        for (name, versions) in &sections.semver {
            for (version, slot) in versions {
                let error = match slot {
                    Slot::Valid(record) => self.check_file(&record.filename).await,
                    Slot::Malformed(_) => Some(AuditError::NoData),
                };
                if let Some(error) = error {
                    problems.push(AuditEntry::new(Kind::Semver, name, Some(version), slot, error));
                }
            }
        }

        for (name, tags) in &sections.tag {
            for (tag, slot) in tags {
                let error = match slot {
                    Slot::Valid(tagged) => {
                        let target_exists = sections
                            .semver
                            .get(name)
                            .is_some_and(|versions| versions.contains_key(&tagged.version));
                        (!target_exists).then(|| AuditError::OrphanedReference {
                            alias: tag.clone(),
                            target: tagged.version.clone(),
                        })
                    }
                    Slot::Malformed(_) => Some(AuditError::NoData),
                };
                if let Some(error) = error {
                    problems.push(AuditEntry::new(Kind::Tag, name, Some(tag), slot, error));
                }
            }
        }

        for (repo, entries) in &sections.git {
            for (key, slot) in entries {
                let error = match slot {
                    Slot::Valid(GitEntry::Commit(record)) => self.check_file(&record.filename).await,
                    Slot::Valid(GitEntry::Ref(alias)) => {
                        let target_exists = matches!(
                            entries.get(&alias.commit),
                            Some(Slot::Valid(GitEntry::Commit(_)) | Slot::Malformed(_))
                        );
                        (!target_exists).then(|| AuditError::OrphanedReference {
                            alias: key.clone(),
                            target: alias.commit.clone(),
                        })
                    }
                    Slot::Malformed(_) => Some(AuditError::NoData),
                };
                if let Some(error) = error {
                    problems.push(AuditEntry::new(Kind::Git, repo, Some(key), slot, error));
                }
            }
        }

        for (url, slot) in &sections.url {
            let error = match slot {
                Slot::Valid(record) => self.check_file(&record.filename).await,
                Slot::Malformed(_) => Some(AuditError::NoData),
            };
            if let Some(error) = error {
                problems.push(AuditEntry::new(Kind::Url, url, None, slot, error));
            }
        }

        if problems.is_empty() {
            self.logger.verbose("audit found no problems");
        } else {
            self.logger
                .info(&format!("audit found {} problem(s)", problems.len()));
        }
        problems
    }

    /// First problem with the tarball `filename`, checked in order: exists, regular
    /// file, non-empty, tarball extension
    async fn check_file(&self, filename: &str) -> Option<AuditError> {
        let path = self.path.join(filename);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Some(AuditError::NotFound { path });
            }
            Err(e) => return Some(AuditError::Io(e)),
        };
        if !metadata.is_file() {
            return Some(AuditError::NotRegularFile { path });
        }
        if metadata.len() == 0 {
            return Some(AuditError::ZeroLength { path });
        }
        if !has_tarball_extension(filename) {
            return Some(AuditError::NotTarball {
                filename: filename.to_string(),
            });
        }
        None
    }
}
