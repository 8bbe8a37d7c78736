//! Recording downloaded tarballs

use super::DownloadTracker;
use crate::error::{ArgumentError, Error, Result};
use crate::filename::is_commit_hash;
use crate::manifest::{
    FileRecord, GitCommitRecord, GitEntry, GitRefRecord, Sections, Slot, TagRecord,
};
use crate::types::{Kind, required_str};
use serde_json::{Map, Value};

/// Payload fields consumed by `add`; everything else is kept as record metadata
const RESERVED_FIELDS: &[&str] = &[
    "name", "version", "spec", "filename", "repo", "commit", "refs",
];

/// Tags that mean "no tag at all"
pub(crate) fn is_default_tag(spec: &str) -> bool {
    spec.is_empty() || spec == "latest"
}

/// A validated `add` request
#[derive(Debug, Clone, PartialEq)]
enum Addition {
    Semver {
        name: String,
        version: String,
        record: FileRecord,
    },
    Tag {
        name: String,
        version: String,
        tag: String,
        record: FileRecord,
    },
    /// A `""`/`"latest"` tag: the version becomes the latest-added one
    Latest {
        name: String,
        version: String,
        record: FileRecord,
    },
    Git {
        repo: String,
        commit: String,
        refs: Vec<String>,
        filename: String,
        extra: Map<String, Value>,
    },
    Url {
        key: String,
        record: FileRecord,
    },
}

impl Addition {
    fn filename(&self) -> &str {
        match self {
            Addition::Semver { record, .. }
            | Addition::Tag { record, .. }
            | Addition::Latest { record, .. }
            | Addition::Url { record, .. } => &record.filename,
            Addition::Git { filename, .. } => filename,
        }
    }
}

impl DownloadTracker {
    /// Record a tarball that is present in the tracked directory
    ///
    /// `data` must be an object with a `filename` plus the fields `kind` requires:
    /// - `semver`: `name`, `version`
    /// - `tag`: `name`, `version`, `spec` (the dist-tag; `""`/`"latest"` make the
    ///   version the latest-added semver record, keeping any record already stored)
    /// - `git`: `repo`, `commit`, and optionally `refs`
    /// - `url`: `spec` (the URL)
    ///
    /// Other fields are stored with the record. Each required field is checked for
    /// absence, then type, then emptiness.
    ///
    /// # Errors
    /// - [`ArgumentError`] variants for contract violations
    /// - [`Error::FileNotFound`] if the tarball is not in the directory
    /// - [`Error::Io`] if the tarball cannot be inspected
    pub async fn add(&mut self, kind: &str, data: &Value) -> Result<()> {
        let kind: Kind = kind.parse()?;
        let addition = validate(kind, data)?;

        let file_path = self.path.join(addition.filename());
        if let Err(e) = tokio::fs::metadata(&file_path).await {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(Error::FileNotFound { path: file_path });
            }
            return Err(e.into());
        }

        self.logger.verbose(&format!(
            "adding {} record for {}",
            kind,
            addition.filename()
        ));
        merge(&mut self.document.sections, addition);
        self.dirty = true;
        Ok(())
    }
}

/// Check an `add` payload and turn it into an [`Addition`]
fn validate(kind: Kind, data: &Value) -> std::result::Result<Addition, ArgumentError> {
    let object = match data {
        Value::Null => return Err(ArgumentError::missing("data")),
        Value::Object(object) => object,
        _ => return Err(ArgumentError::wrong_type("data", "an object")),
    };
    let filename = required_str(object, "filename")?.to_string();
    if filename.contains(['/', '\\']) || filename == "." || filename == ".." {
        return Err(ArgumentError::invalid(
            "filename",
            "must name a file directly inside the tracked directory",
        ));
    }
    let extra: Map<String, Value> = object
        .iter()
        .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    match kind {
        Kind::Semver | Kind::Tag => {
            let name = required_str(object, "name")?.to_string();
            let version = required_str(object, "version")?.to_string();
            if semver::Version::parse(&version).is_err() {
                return Err(ArgumentError::invalid(
                    "version",
                    format!("'{}' is not a semver 2.0 version", version),
                ));
            }
            let record = FileRecord { filename, extra };
            if kind == Kind::Semver {
                return Ok(Addition::Semver {
                    name,
                    version,
                    record,
                });
            }
            let tag = match object.get("spec") {
                None | Some(Value::Null) => return Err(ArgumentError::missing("spec")),
                Some(Value::String(spec)) => spec.trim().to_string(),
                Some(_) => return Err(ArgumentError::wrong_type("spec", "a string")),
            };
            if is_default_tag(&tag) {
                return Ok(Addition::Latest {
                    name,
                    version,
                    record,
                });
            }
            Ok(Addition::Tag {
                name,
                version,
                tag,
                record,
            })
        }
        Kind::Git => {
            let repo = required_str(object, "repo")?.to_string();
            let commit = required_str(object, "commit")?;
            if !is_commit_hash(commit) {
                return Err(ArgumentError::invalid(
                    "commit",
                    "must be 40 hexadecimal characters",
                ));
            }
            let refs = validate_refs(object.get("refs"))?;
            Ok(Addition::Git {
                repo,
                commit: commit.to_ascii_lowercase(),
                refs,
                filename,
                extra,
            })
        }
        Kind::Url => {
            let spec = required_str(object, "spec")?;
            let key = url_key(spec).ok_or_else(|| {
                ArgumentError::invalid("spec", format!("'{}' is not an absolute URL", spec))
            })?;
            Ok(Addition::Url {
                key,
                record: FileRecord { filename, extra },
            })
        }
    }
}

fn validate_refs(refs: Option<&Value>) -> std::result::Result<Vec<String>, ArgumentError> {
    let items = match refs {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ArgumentError::wrong_type("refs", "an array of strings")),
    };
    if items.is_empty() {
        return Err(ArgumentError::invalid("refs", "must not be an empty array"));
    }
    let mut refs = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(name) = item else {
            return Err(ArgumentError::wrong_type("refs", "an array of strings"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(ArgumentError::invalid("refs", "ref names must not be empty"));
        }
        if is_commit_hash(name) {
            return Err(ArgumentError::invalid(
                "refs",
                format!("'{}' looks like a commit hash", name),
            ));
        }
        if !refs.iter().any(|r| r == name) {
            refs.push(name.to_string());
        }
    }
    Ok(refs)
}

/// Protocol-stripped key of a URL spec: `host[:port]/path[?query]`
pub(crate) fn url_key(spec: &str) -> Option<String> {
    let parsed = url::Url::parse(spec).ok()?;
    let host = parsed.host_str().filter(|h| !h.is_empty())?;
    let mut key = match parsed.port() {
        Some(port) => format!("{}:{}{}", host, port, parsed.path()),
        None => format!("{}{}", host, parsed.path()),
    };
    if let Some(query) = parsed.query() {
        key.push('?');
        key.push_str(query);
    }
    Some(key)
}

/// Apply a validated addition to the index
fn merge(sections: &mut Sections, addition: Addition) {
    match addition {
        Addition::Semver {
            name,
            version,
            record,
        } => {
            sections
                .semver
                .entry(name)
                .or_default()
                .insert(version, Slot::Valid(record));
        }
        Addition::Tag {
            name,
            version,
            tag,
            record,
        } => {
            let versions = sections.semver.entry(name.clone()).or_default();
            let has_backing_record = versions.get(&version).is_some_and(|s| s.valid().is_some());
            if !has_backing_record {
                versions.insert(version.clone(), Slot::Valid(record));
            }
            sections
                .tag
                .entry(name)
                .or_default()
                .insert(tag, Slot::Valid(TagRecord { version }));
        }
        Addition::Latest {
            name,
            version,
            record,
        } => {
            let versions = sections.semver.entry(name.clone()).or_default();
            let slot = match versions.shift_remove(&version) {
                Some(existing @ Slot::Valid(_)) => existing,
                _ => Slot::Valid(record),
            };
            versions.insert(version.clone(), slot);

            // An explicit "latest" tag from an older manifest follows along
            if let Some(tags) = sections.tag.get_mut(&name)
                && let Some(latest) = tags.get_mut("latest")
            {
                *latest = Slot::Valid(TagRecord { version });
            }
        }
        Addition::Git {
            repo,
            commit,
            refs,
            filename,
            extra,
        } => merge_git(sections, repo, commit, refs, filename, extra),
        Addition::Url { key, record } => {
            sections.url.insert(key, Slot::Valid(record));
        }
    }
}

fn merge_git(
    sections: &mut Sections,
    repo: String,
    commit: String,
    refs: Vec<String>,
    filename: String,
    extra: Map<String, Value>,
) {
    let entries = sections.git.entry(repo).or_default();

    // Refs that still alias this commit survive a re-add
    let mut all_refs: Vec<String> = match entries.get(&commit) {
        Some(Slot::Valid(GitEntry::Commit(old))) => old
            .refs
            .iter()
            .filter(|r| match entries.get(*r) {
                Some(Slot::Valid(GitEntry::Ref(alias))) => alias.commit == commit,
                _ => false,
            })
            .cloned()
            .collect(),
        _ => Vec::new(),
    };
    for name in &refs {
        if !all_refs.contains(name) {
            all_refs.push(name.clone());
        }
    }

    // A ref moving to this commit leaves its previous commit
    let moved: Vec<(String, String)> = refs
        .iter()
        .filter_map(|name| match entries.get(name) {
            Some(Slot::Valid(GitEntry::Ref(alias))) if alias.commit != commit => {
                Some((name.clone(), alias.commit.clone()))
            }
            _ => None,
        })
        .collect();
    for (name, previous) in moved {
        if let Some(Slot::Valid(GitEntry::Commit(old))) = entries.get_mut(&previous) {
            old.refs.retain(|r| *r != name);
        }
    }

    entries.insert(
        commit.clone(),
        Slot::Valid(GitEntry::Commit(GitCommitRecord {
            filename,
            refs: all_refs,
            extra,
        })),
    );
    for name in refs {
        entries.insert(
            name,
            Slot::Valid(GitEntry::Ref(GitRefRecord {
                commit: commit.clone(),
            })),
        );
    }
}
