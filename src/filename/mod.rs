//! Filename codec for cached tarballs
//!
//! The cache directory is flat, and a tarball's filename is the only key the directory
//! reconstructor can see. Each [`PackageIdentity`] therefore maps to exactly one
//! filename, and [`decode`] inverts [`encode`].
//!
//! ## Grammar
//!
//! Before percent-encoding, a filename is one of:
//! - **git**: `domain/path#commit.tar.gz` (commit is 40 hex digits)
//! - **semver**: `name-version.tar.gz`, or `name%version.tar.gz` when the dash form is
//!   ambiguous (see [`is_version_ambiguous`])
//! - **url**: `host/path`, with `.tar.gz` appended unless the path already ends in a
//!   tarball extension
//!
//! The whole raw form is then percent-encoded into one filesystem-safe segment.
//! Decoding tries the productions in the order git, semver, url.

mod ambiguity;


pub use ambiguity::is_version_ambiguous;

use crate::error::{ArgumentError, Error, Result};
use crate::types::{DecodedFilename, PackageIdentity};
use regex::Regex;
use semver::Version;
use std::sync::LazyLock;

/// Extensions recognized as tarballs, longest first
pub const TARBALL_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".tar"];

/// Extension appended by [`encode`] when one is needed
const DEFAULT_EXTENSION: &str = ".tar.gz";

static GIT_STEM: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([^/#]+)/([^#]+)#([0-9a-fA-F]{40})$").expect("static pattern compiles")
});

/// Check whether `commit` is a full 40-hex-digit commit hash (either case)
#[must_use]
pub fn is_commit_hash(commit: &str) -> bool {
    commit.len() == 40 && commit.chars().all(|c| c.is_ascii_hexdigit())
}

/// The tarball extension `filename` ends with, if any
///
/// # Examples
///
/// ```
/// use dltracker::filename::tarball_extension;
///
/// assert_eq!(tarball_extension("x-1.0.0.tar.gz"), Some(".tar.gz"));
/// assert_eq!(tarball_extension("x-1.0.0.TGZ"), Some(".TGZ"));
/// assert_eq!(tarball_extension("x-1.0.0.zip"), None);
/// ```
#[must_use]
pub fn tarball_extension(filename: &str) -> Option<&str> {
    let lower = filename.to_ascii_lowercase();
    TARBALL_EXTENSIONS
        .iter()
        .find(|ext| lower.len() > ext.len() && lower.ends_with(*ext))
        .map(|ext| &filename[filename.len() - ext.len()..])
}

/// Check whether `filename` ends with a tarball extension
#[must_use]
pub fn has_tarball_extension(filename: &str) -> bool {
    tarball_extension(filename).is_some()
}

/// Check whether `name` can be stored with the semver production
///
/// Scoped names (`@scope/name`) are the only names allowed to contain a slash.
fn is_valid_package_name(name: &str) -> bool {
    if name.is_empty() || name.contains('%') || name.chars().any(char::is_whitespace) {
        return false;
    }
    match name.split_once('/') {
        None => true,
        Some((scope, rest)) => {
            scope.len() > 1 && scope.starts_with('@') && !rest.is_empty() && !rest.contains('/')
        }
    }
}

/// Encode a package identity as a cache filename
///
/// # Examples
///
/// ```
/// use dltracker::filename::encode;
/// use dltracker::PackageIdentity;
///
/// let name = encode(&PackageIdentity::Semver {
///     name: "@scope/pkg".into(),
///     version: "1.0.0".into(),
/// }).unwrap();
/// assert_eq!(name, "%40scope%2Fpkg-1.0.0.tar.gz");
/// ```
///
/// # Errors
/// - [`ArgumentError::Missing`] for an empty required field
/// - [`ArgumentError::Invalid`] for a malformed version, commit or URL, or a package
///   name whose filename would decode to a different name and version
pub fn encode(identity: &PackageIdentity) -> Result<String> {
    let raw = match identity {
        PackageIdentity::Semver { name, version } => raw_semver(name, version)?,
        PackageIdentity::Git {
            domain,
            path,
            commit,
        } => raw_git(domain, path, commit)?,
        PackageIdentity::Url { url } => raw_url(url)?,
    };
    Ok(urlencoding::encode(&raw).into_owned())
}

/// Encode a dynamic identity object such as `{"type": "git", "domain": ..., ...}`
///
/// # Errors
/// Everything [`PackageIdentity::from_value`] and [`encode`] report, including
/// [`ArgumentError::UnknownKind`] for an unrecognized `type`.
pub fn encode_value(identity: &serde_json::Value) -> Result<String> {
    let identity = PackageIdentity::from_value(identity)?;
    encode(&identity)
}

fn require<'a>(value: &'a str, field: &str) -> std::result::Result<&'a str, ArgumentError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ArgumentError::missing(field));
    }
    Ok(value)
}

fn raw_semver(name: &str, version: &str) -> Result<String> {
    let name = require(name, "name")?;
    let version = require(version, "version")?;
    if Version::parse(version).is_err() {
        let reason = format!("'{}' is not a semver 2.0 version", version);
        return Err(ArgumentError::invalid("version", reason).into());
    }
    if !is_valid_package_name(name) {
        let reason = format!("'{}' is not a valid package name", name);
        return Err(ArgumentError::invalid("name", reason).into());
    }
    let separator = if is_version_ambiguous(name, Some(version))? {
        '%'
    } else {
        '-'
    };

    // The dash form can still split elsewhere, e.g. `foo-1.0.0-rc` + `2.0.0`
    let stem = format!("{}{}{}", name, separator, version);
    let round_trips = matches!(
        decode_git(&stem, DEFAULT_EXTENSION).or_else(|| decode_semver(&stem, DEFAULT_EXTENSION)),
        Some(DecodedFilename::Semver { package_name, version_comparable, .. })
            if package_name == name && version_comparable == version
    );
    if !round_trips {
        let reason = format!("'{}' would not decode back to this name and version", stem);
        return Err(ArgumentError::invalid("name", reason).into());
    }
    Ok(format!("{}{}", stem, DEFAULT_EXTENSION))
}

fn raw_git(domain: &str, path: &str, commit: &str) -> Result<String> {
    let domain = require(domain, "domain")?;
    let path = require(path, "path")?;
    let commit = require(commit, "commit")?;
    if !is_commit_hash(commit) {
        return Err(ArgumentError::invalid("commit", "must be 40 hexadecimal characters").into());
    }
    if domain.contains(['/', '#']) {
        return Err(ArgumentError::invalid("domain", "must not contain '/' or '#'").into());
    }
    if path.contains('#') {
        return Err(ArgumentError::invalid("path", "must not contain '#'").into());
    }
    Ok(format!(
        "{}/{}#{}{}",
        domain,
        path,
        commit.to_ascii_lowercase(),
        DEFAULT_EXTENSION
    ))
}

fn raw_url(spec: &str) -> Result<String> {
    let spec = require(spec, "url")?;
    let parsed = url::Url::parse(spec)
        .map_err(|e| Error::from(ArgumentError::invalid("url", e.to_string())))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::from(ArgumentError::invalid("url", "URL has no host")))?;
    let path = parsed.path();
    if path.is_empty() || path == "/" {
        return Err(ArgumentError::invalid("url", "URL has no path").into());
    }
    let mut raw = match parsed.port() {
        Some(port) => format!("{}:{}{}", host, port, path),
        None => format!("{}{}", host, path),
    };
    if !has_tarball_extension(&raw) {
        raw.push_str(DEFAULT_EXTENSION);
    }
    Ok(raw)
}

/// Decode a cache filename back into its identity parts
///
/// Returns `Ok(None)` for anything that is not an encoded tarball name; malformed input
/// never produces an error.
///
/// # Examples
///
/// ```
/// use dltracker::filename::decode;
/// use dltracker::DecodedFilename;
///
/// let decoded = decode("x-1.0.0-beta.2.tgz").unwrap().unwrap();
/// match decoded {
///     DecodedFilename::Semver { package_name, version_numeric, prerelease, .. } => {
///         assert_eq!(package_name, "x");
///         assert_eq!(version_numeric, "1.0.0");
///         assert_eq!(prerelease.as_deref(), Some("beta.2"));
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// assert_eq!(decode("README.md").unwrap(), None);
/// ```
///
/// # Errors
/// Returns [`ArgumentError::Missing`] if `filename` is empty.
pub fn decode(filename: &str) -> std::result::Result<Option<DecodedFilename>, ArgumentError> {
    if filename.trim().is_empty() {
        return Err(ArgumentError::missing("filename"));
    }
    let Ok(raw) = urlencoding::decode(filename) else {
        return Ok(None);
    };
    let Some(extension) = tarball_extension(&raw) else {
        return Ok(None);
    };
    let stem = &raw[..raw.len() - extension.len()];

    let decoded = decode_git(stem, extension)
        .or_else(|| decode_semver(stem, extension))
        .or_else(|| decode_url(&raw, stem));
    Ok(decoded)
}

fn decode_git(stem: &str, extension: &str) -> Option<DecodedFilename> {
    let captures = GIT_STEM.captures(stem)?;
    let domain = captures.get(1)?.as_str().to_string();
    let path = captures.get(2)?.as_str().to_string();
    let commit = captures.get(3)?.as_str().to_ascii_lowercase();
    Some(DecodedFilename::Git {
        repo: format!("{}/{}", domain, path),
        domain,
        path,
        commit,
        extension: extension.to_string(),
    })
}

fn decode_semver(stem: &str, extension: &str) -> Option<DecodedFilename> {
    if let Some((name, version)) = stem.split_once('%') {
        return semver_parts(name, version, extension);
    }
    // Leftmost split whose tail is a valid version
    stem.match_indices('-')
        .find_map(|(idx, _)| semver_parts(&stem[..idx], &stem[idx + 1..], extension))
}

fn semver_parts(name: &str, version: &str, extension: &str) -> Option<DecodedFilename> {
    if !is_valid_package_name(name) {
        return None;
    }
    let parsed = Version::parse(version).ok()?;
    Some(DecodedFilename::Semver {
        package_name: name.to_string(),
        version_comparable: version.to_string(),
        version_numeric: format!("{}.{}.{}", parsed.major, parsed.minor, parsed.patch),
        prerelease: (!parsed.pre.is_empty()).then(|| parsed.pre.to_string()),
        build: (!parsed.build.is_empty()).then(|| parsed.build.to_string()),
        extension: extension.to_string(),
    })
}

fn decode_url(raw: &str, stem: &str) -> Option<DecodedFilename> {
    let (host, path) = stem.split_once('/')?;
    if host.is_empty() || path.is_empty() || host.chars().any(char::is_whitespace) {
        return None;
    }
    Some(DecodedFilename::Url {
        url: raw.to_string(),
    })
}
