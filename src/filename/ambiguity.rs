//! Detection of name/version strings that can be split more than one way
//!
//! The result decides whether [`encode`](super::encode) joins name and version with `-`
//! or `%`. The separator is part of the on-disk format, so this rule must not change
//! without a schema version bump.

use crate::error::ArgumentError;
use regex::Regex;
use std::sync::LazyLock;

/// Two `X.Y.Z` triplets joined by `-`, preceded by `-`
static AMBIGUOUS_RUN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"-\d+\.\d+\.\d+-\d+\.\d+\.\d+").expect("static pattern compiles")
});

/// Check whether `name` (or `name-version`) could be parsed as name + version in two ways
///
/// # Examples
///
/// ```
/// use dltracker::filename::is_version_ambiguous;
///
/// assert!(is_version_ambiguous("foo-1.2.3", Some("4.5.6")).unwrap());
/// assert!(is_version_ambiguous("foo", Some("1.2.3-4.5.6")).unwrap());
/// assert!(!is_version_ambiguous("foo", Some("1.2.3")).unwrap());
/// ```
///
/// # Errors
/// Returns [`ArgumentError::Missing`] if `name` is empty.
pub fn is_version_ambiguous(name: &str, version: Option<&str>) -> Result<bool, ArgumentError> {
    if name.is_empty() {
        return Err(ArgumentError::missing("name"));
    }
    let ambiguous = match version {
        Some(version) if !version.is_empty() => {
            AMBIGUOUS_RUN.is_match(&format!("{}-{}", name, version))
        }
        _ => AMBIGUOUS_RUN.is_match(name),
    };
    Ok(ambiguous)
}
