//! Core types for dltracker

use crate::error::ArgumentError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Index section a record belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Registry package addressed by name and version
    Semver,
    /// Dist-tag alias for a registry package version
    Tag,
    /// Git repository snapshot addressed by commit
    Git,
    /// Tarball fetched from an arbitrary URL
    Url,
}

impl Kind {
    /// All kinds, in manifest order
    pub const ALL: [Kind; 4] = [Kind::Semver, Kind::Tag, Kind::Git, Kind::Url];

    /// The section name used in the manifest
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Semver => "semver",
            Kind::Tag => "tag",
            Kind::Git => "git",
            Kind::Url => "url",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(ArgumentError::missing("kind")),
            "semver" => Ok(Kind::Semver),
            "tag" => Ok(Kind::Tag),
            "git" => Ok(Kind::Git),
            "url" => Ok(Kind::Url),
            other => Err(ArgumentError::UnknownKind(other.to_string())),
        }
    }
}

/// Identity of a package artifact, as encoded into a cache filename
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PackageIdentity {
    /// Registry package
    Semver {
        /// Package name, possibly scoped (`@scope/name`)
        name: String,
        /// Semver 2.0 version
        version: String,
    },
    /// Git repository at a commit
    Git {
        /// Host of the repository (e.g., "github.com")
        domain: String,
        /// Repository path on the host (e.g., "user/project")
        path: String,
        /// 40-hex-digit commit hash
        commit: String,
    },
    /// Remote tarball
    Url {
        /// Absolute URL of the tarball
        url: String,
    },
}

impl PackageIdentity {
    /// Build an identity from a dynamic object of the form `{"type": "semver", ...}`
    ///
    /// Missing fields, wrongly typed fields and unknown `type` tags are reported as
    /// distinct [`ArgumentError`] kinds. Field values are not validated here; that is
    /// [`encode`](crate::filename::encode)'s job.
    pub fn from_value(value: &Value) -> Result<Self, ArgumentError> {
        let object = match value {
            Value::Null => return Err(ArgumentError::missing("identity")),
            Value::Object(object) => object,
            _ => return Err(ArgumentError::wrong_type("identity", "an object")),
        };
        let tag = required_str(object, "type")?;
        match tag {
            "semver" => Ok(PackageIdentity::Semver {
                name: required_str(object, "name")?.to_string(),
                version: required_str(object, "version")?.to_string(),
            }),
            "git" => Ok(PackageIdentity::Git {
                domain: required_str(object, "domain")?.to_string(),
                path: required_str(object, "path")?.to_string(),
                commit: required_str(object, "commit")?.to_string(),
            }),
            "url" => Ok(PackageIdentity::Url {
                url: required_str(object, "url")?.to_string(),
            }),
            other => Err(ArgumentError::UnknownKind(other.to_string())),
        }
    }
}

/// Read a required string field: missing, then wrong type, then empty-after-trim
pub(crate) fn required_str<'a>(
    object: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a str, ArgumentError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ArgumentError::missing(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ArgumentError::missing(field)),
        Some(Value::String(s)) => Ok(s.trim()),
        Some(_) => Err(ArgumentError::wrong_type(field, "a string")),
    }
}

/// Result of decoding a cache filename
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedFilename {
    /// A registry package tarball
    Semver {
        /// Package name
        package_name: String,
        /// Full version text, including any prerelease and build parts
        version_comparable: String,
        /// The `MAJOR.MINOR.PATCH` part of the version
        version_numeric: String,
        /// Prerelease identifiers, if any
        prerelease: Option<String>,
        /// Build metadata, if any
        build: Option<String>,
        /// Tarball extension including the leading dot
        extension: String,
    },
    /// A git repository snapshot
    Git {
        /// Repository host
        domain: String,
        /// Repository path on the host
        path: String,
        /// `domain/path`
        repo: String,
        /// Commit hash
        commit: String,
        /// Tarball extension including the leading dot
        extension: String,
    },
    /// A remote tarball
    Url {
        /// `host` + `path` of the source URL
        url: String,
    },
}

/// A record resolved by [`DownloadTracker::get`](crate::DownloadTracker::get)
///
/// Serializes to the flat object form the install layer consumes, e.g.
/// `{"name": "x", "version": "1.0.0", "filename": "x-1.0.0.tar.gz"}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedRecord {
    /// Resolved through the `semver` or `tag` section
    Semver {
        /// Package name
        name: String,
        /// Resolved version
        version: String,
        /// The dist-tag that was requested, for tag lookups
        #[serde(skip_serializing_if = "Option::is_none")]
        spec: Option<String>,
        /// Tarball filename
        filename: String,
        /// Additional metadata stored with the record
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// Resolved through the `git` section
    Git {
        /// `domain/path`
        repo: String,
        /// Resolved commit
        commit: String,
        /// Tarball filename
        filename: String,
        /// Refs known to point at this commit
        #[serde(skip_serializing_if = "Vec::is_empty")]
        refs: Vec<String>,
        /// Additional metadata stored with the record
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    /// Resolved through the `url` section
    Url {
        /// The URL spec as requested
        spec: String,
        /// Tarball filename
        filename: String,
        /// Additional metadata stored with the record
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl ResolvedRecord {
    /// Tarball filename, relative to the tracked directory
    pub fn filename(&self) -> &str {
        match self {
            ResolvedRecord::Semver { filename, .. }
            | ResolvedRecord::Git { filename, .. }
            | ResolvedRecord::Url { filename, .. } => filename,
        }
    }

    /// Flat JSON object form of the record
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Outcome of a lookup
///
/// `Absent` and `Unknown` are different answers: the first means the package (or repo)
/// is indexed but nothing matches the spec, the second that it was never indexed.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    /// A matching record
    Found(ResolvedRecord),
    /// Name is indexed, spec unmatched
    Absent,
    /// Name was never indexed
    Unknown,
}

impl Lookup {
    /// Whether a record was found
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// The found record, if any
    pub fn record(&self) -> Option<&ResolvedRecord> {
        match self {
            Lookup::Found(record) => Some(record),
            _ => None,
        }
    }

    /// Consume the lookup, keeping only a found record
    pub fn into_record(self) -> Option<ResolvedRecord> {
        match self {
            Lookup::Found(record) => Some(record),
            _ => None,
        }
    }
}
