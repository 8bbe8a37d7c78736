//! Rebuild index sections from the files in a tracked directory
//!
//! Used when a directory has no manifest. Filenames are the only information
//! available, so dist-tags and git refs cannot be recovered.

use crate::error::{ArgumentError, Result};
use crate::filename;
use crate::logging::{self, Logger};
use crate::manifest::{FileRecord, GitCommitRecord, GitEntry, Sections, Slot};
use crate::types::DecodedFilename;
use serde_json::Map;
use std::path::Path;
use std::sync::Arc;

/// Scan `directory` (one level deep) and index every decodable tarball name
///
/// Entries whose names do not decode are skipped with a warning. The `tag` section
/// of the result is always empty.
///
/// # Errors
/// - [`ArgumentError::Missing`] if `directory` is empty
/// - [`Error::Io`](crate::Error::Io) if the directory cannot be listed
pub async fn reconstruct(directory: &Path, logger: Option<Arc<dyn Logger>>) -> Result<Sections> {
    if directory.as_os_str().is_empty() {
        return Err(ArgumentError::missing("directory").into());
    }
    let logger = logging::or_default(logger);

    let mut sections = Sections::default();
    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => logger.warn(&format!(
                "failed to parse filename '{}'",
                raw.to_string_lossy()
            )),
        }
    }
    // Directory order is platform-dependent
    names.sort();

    for name in names {
        match filename::decode(&name) {
            Ok(Some(decoded)) => insert(&mut sections, decoded, name),
            Ok(None) | Err(_) => {
                logger.warn(&format!("failed to parse filename '{}'", name));
            }
        }
    }

    logger.verbose(&format!(
        "reconstructed index from {}: {} semver, {} git, {} url",
        directory.display(),
        sections.semver.len(),
        sections.git.len(),
        sections.url.len()
    ));
    Ok(sections)
}

fn insert(sections: &mut Sections, decoded: DecodedFilename, filename: String) {
    match decoded {
        DecodedFilename::Semver {
            package_name,
            version_comparable,
            ..
        } => {
            sections
                .semver
                .entry(package_name)
                .or_default()
                .insert(version_comparable, Slot::Valid(FileRecord::new(filename)));
        }
        DecodedFilename::Git { repo, commit, .. } => {
            let record = GitCommitRecord {
                filename,
                refs: Vec::new(),
                extra: Map::new(),
            };
            sections
                .git
                .entry(repo)
                .or_default()
                .insert(commit, Slot::Valid(GitEntry::Commit(record)));
        }
        DecodedFilename::Url { url } => {
            sections
                .url
                .insert(url, Slot::Valid(FileRecord::new(filename)));
        }
    }
}
