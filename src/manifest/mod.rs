//! Manifest model for `dltracker.json`
//!
//! The manifest holds four sections:
//!
//! ```json
//! {
//!   "semver": {"<name>": {"<version>": {"filename": "..."}}},
//!   "tag":    {"<name>": {"<tag>": {"version": "<version>"}}},
//!   "git":    {"<domain>/<path>": {
//!                "<commit>": {"filename": "...", "refs": ["<ref>"]},
//!                "<ref>": {"commit": "<commit>"}}},
//!   "url":    {"<host><path>": {"filename": "..."}},
//!   "description": "...", "created": "...", "updated": "...", "schemaVersion": 2
//! }
//! ```
//!
//! Loading goes through two repair passes (see [`repair`]): subtrees of the wrong shape
//! are discarded, and individual records of the wrong shape are kept as
//! [`Slot::Malformed`] placeholders.

pub(crate) mod repair;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::SCHEMA_VERSION;
use crate::logging::Logger;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Byte order mark tolerated at the start of a manifest
const BOM: char = '\u{feff}';

/// Two-level, insertion-ordered index: `name -> key -> record`
pub type Index<T> = IndexMap<String, IndexMap<String, Slot<T>>>;

/// A record as loaded: usable, or a placeholder for something malformed
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Slot<T> {
    /// A well-formed record
    Valid(T),
    /// The original JSON of a record that failed validation
    Malformed(Value),
}

impl<T> Slot<T> {
    /// The record, if well-formed
    pub fn valid(&self) -> Option<&T> {
        match self {
            Slot::Valid(record) => Some(record),
            Slot::Malformed(_) => None,
        }
    }
}

/// A record pointing at a tarball (semver and url sections)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Tarball filename in the tracked directory
    pub filename: String,
    /// Any additional metadata stored with the record
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileRecord {
    /// A record with no extra metadata
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            extra: Map::new(),
        }
    }
}

/// A dist-tag pointing at a version in the semver section
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagRecord {
    /// The tagged version
    pub version: String,
}

/// A git snapshot stored under its commit hash
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GitCommitRecord {
    /// Tarball filename in the tracked directory
    pub filename: String,
    /// Refs (branches, tags) that point at this commit
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<String>,
    /// Any additional metadata stored with the record
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A ref alias stored under the ref name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitRefRecord {
    /// The commit the ref points at
    pub commit: String,
}

/// An entry in a git repository subtree
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GitEntry {
    /// Keyed by a commit hash
    Commit(GitCommitRecord),
    /// Keyed by a ref name
    Ref(GitRefRecord),
}

/// The four index sections
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sections {
    /// `name -> version -> record`
    pub semver: Index<FileRecord>,
    /// `name -> tag -> {version}`
    pub tag: Index<TagRecord>,
    /// `repo -> commit|ref -> entry`
    pub git: Index<GitEntry>,
    /// `host+path -> record`
    pub url: IndexMap<String, Slot<FileRecord>>,
}

impl Sections {
    /// Whether all four sections are empty
    pub fn is_empty(&self) -> bool {
        self.semver.is_empty() && self.tag.is_empty() && self.git.is_empty() && self.url.is_empty()
    }
}

/// A loaded or about-to-be-written manifest
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Document {
    pub(crate) sections: Sections,
    pub(crate) created: Option<String>,
    /// Whether loading had to discard part of the file
    pub(crate) repaired: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut<'a> {
    semver: &'a Index<FileRecord>,
    tag: &'a Index<TagRecord>,
    git: &'a Index<GitEntry>,
    url: &'a IndexMap<String, Slot<FileRecord>>,
    description: &'a str,
    created: &'a str,
    updated: &'a str,
    schema_version: u32,
}

impl Document {
    /// Parse manifest text, repairing anything of the wrong shape
    ///
    /// Only a JSON syntax error fails; shape problems are logged and repaired.
    pub(crate) fn parse(text: &str, logger: &dyn Logger) -> Result<Self, serde_json::Error> {
        let text = text.strip_prefix(BOM).unwrap_or(text);
        let value: Value = serde_json::from_str(text)?;
        let (mut root, mut repaired) = match value {
            Value::Object(root) => (root, false),
            other => {
                logger.warn(&format!(
                    "removing manifest content: expected an object, found {}",
                    json_type(&other)
                ));
                (Map::new(), true)
            }
        };

        repaired |= repair::discard_malformed_subtrees(&mut root, logger) > 0;
        let created = match root.get("created") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        let sections = repair::replace_malformed_records(root, logger);
        Ok(Self {
            sections,
            created,
            repaired,
        })
    }

    /// Render the manifest as pretty JSON, stamping `updated` with `now`
    pub(crate) fn render(
        &self,
        description: &str,
        now: &str,
        indent: usize,
    ) -> Result<String, serde_json::Error> {
        let out = DocumentOut {
            semver: &self.sections.semver,
            tag: &self.sections.tag,
            git: &self.sections.git,
            url: &self.sections.url,
            description,
            created: self.created.as_deref().unwrap_or(now),
            updated: now,
            schema_version: SCHEMA_VERSION,
        };
        let indent = vec![b' '; indent];
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        out.serialize(&mut serializer)?;
        buf.push(b'\n');
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
