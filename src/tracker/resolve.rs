//! Lookups: `get` and `contains`
//!
//! Resolution rules per kind:
//! - `semver`: exact version, a range (highest satisfying version wins), or `*`/`""`
//!   when exactly one version is known
//! - `tag`: a dist-tag, with `""`/`"latest"` falling back to the latest-added version
//! - `git`: a commit hash, a ref alias, `semver:<range>` over the repo's ref names, or
//!   `*`/`""` for `main`, then `master`, then the sole commit
//! - `url`: the literal spec, then its protocol-stripped key

use super::DownloadTracker;
use super::add::{is_default_tag, url_key};
use crate::error::{ArgumentError, Result};
use crate::filename::is_commit_hash;
use crate::manifest::{FileRecord, GitCommitRecord, GitEntry, Slot};
use crate::types::{Kind, Lookup, ResolvedRecord};
use indexmap::IndexMap;
use semver::{Version, VersionReq};

/// Branches tried, in order, for a `*` git spec
const DEFAULT_BRANCHES: [&str; 2] = ["main", "master"];

impl DownloadTracker {
    /// Look up the record `spec` resolves to
    ///
    /// `name` is the package name (`semver`, `tag`) or `domain/path` (`git`) and must be
    /// empty for `url`, where `spec` carries the URL.
    ///
    /// Returns [`Lookup::Unknown`] when `name` was never indexed and
    /// [`Lookup::Absent`] when it was but nothing matches `spec`.
    ///
    /// # Errors
    /// [`ArgumentError`] variants for contract violations. Lookups themselves never fail.
    pub fn get(&self, kind: &str, name: &str, spec: &str) -> Result<Lookup> {
        let kind: Kind = kind.parse()?;
        let name = name.trim();
        let spec = spec.trim();

        let lookup = match kind {
            Kind::Url => {
                if !name.is_empty() {
                    let err = ArgumentError::invalid("name", "must be empty for url lookups");
                    return Err(err.into());
                }
                if spec.is_empty() {
                    return Err(ArgumentError::missing("spec").into());
                }
                self.resolve_url(spec)
            }
            _ if name.is_empty() => return Err(ArgumentError::missing("name").into()),
            Kind::Semver => self.resolve_semver(name, spec),
            Kind::Tag => self.resolve_tag(name, spec),
            Kind::Git => self.resolve_git(name, spec),
        };
        Ok(lookup)
    }

    /// Whether `get` would find a record
    ///
    /// # Errors
    /// Same as [`get`](Self::get).
    pub fn contains(&self, kind: &str, name: &str, spec: &str) -> Result<bool> {
        self.get(kind, name, spec).map(|lookup| lookup.is_found())
    }

    fn resolve_semver(&self, name: &str, spec: &str) -> Lookup {
        let Some(versions) = self.document.sections.semver.get(name) else {
            return Lookup::Unknown;
        };

        let version = if spec.is_empty() || spec == "*" {
            let mut valid = versions.iter().filter(|(_, slot)| slot.valid().is_some());
            match (valid.next(), valid.next()) {
                (Some((version, _)), None) => version.as_str(),
                _ => return Lookup::Absent,
            }
        } else if versions.get(spec).is_some_and(|slot| slot.valid().is_some()) {
            spec
        } else if Version::parse(spec).is_ok() {
            return Lookup::Absent;
        } else {
            let Some(range) = parse_range(spec) else {
                self.logger
                    .verbose(&format!("'{}' is neither a version nor a range", spec));
                return Lookup::Absent;
            };
            let known = versions
                .iter()
                .filter(|(_, slot)| slot.valid().is_some())
                .map(|(version, _)| version.as_str());
            match highest_satisfying(known, &range) {
                Some(version) => version,
                None => return Lookup::Absent,
            }
        };

        match versions.get(version).and_then(Slot::valid) {
            Some(record) => Lookup::Found(semver_record(name, version, None, record)),
            None => Lookup::Absent,
        }
    }

    fn resolve_tag(&self, name: &str, spec: &str) -> Lookup {
        let sections = &self.document.sections;
        let tags = sections.tag.get(name);
        let versions = sections.semver.get(name);
        if tags.is_none() && versions.is_none() {
            return Lookup::Unknown;
        }

        let tag = if spec.is_empty() { "latest" } else { spec };
        let version = match tags.and_then(|t| t.get(tag)).and_then(Slot::valid) {
            Some(tagged) => tagged.version.as_str(),
            None if is_default_tag(spec) => {
                // Latest-added is the last valid key in insertion order
                let latest = versions.and_then(|v| {
                    v.iter()
                        .rev()
                        .find(|(_, slot)| slot.valid().is_some())
                        .map(|(version, _)| version.as_str())
                });
                match latest {
                    Some(version) => version,
                    None => return Lookup::Absent,
                }
            }
            None => return Lookup::Absent,
        };

        match versions.and_then(|v| v.get(version)).and_then(Slot::valid) {
            Some(record) => Lookup::Found(semver_record(name, version, Some(spec), record)),
            None => Lookup::Absent,
        }
    }

    fn resolve_git(&self, repo: &str, spec: &str) -> Lookup {
        let Some(entries) = self.document.sections.git.get(repo) else {
            return Lookup::Unknown;
        };

        if spec.is_empty() || spec == "*" {
            for branch in DEFAULT_BRANCHES {
                if let Some(commit) = ref_target(entries, branch)
                    && let Some(record) = commit_record(entries, commit)
                {
                    return Lookup::Found(git_record(repo, commit, record));
                }
            }
            let mut commits = entries.iter().filter_map(|(key, slot)| match slot {
                Slot::Valid(GitEntry::Commit(record)) => Some((key, record)),
                _ => None,
            });
            return match (commits.next(), commits.next()) {
                (Some((commit, record)), None) => Lookup::Found(git_record(repo, commit, record)),
                _ => Lookup::Unknown,
            };
        }

        if let Some(range) = spec.strip_prefix("semver:") {
            let Some(range) = parse_range(range.trim()) else {
                self.logger.error(&format!(
                    "invalid semver range in git spec '{}' for {}",
                    spec, repo
                ));
                return Lookup::Unknown;
            };
            let ref_names = entries.iter().filter_map(|(key, slot)| match slot {
                Slot::Valid(GitEntry::Ref(_)) => Some(key.as_str()),
                _ => None,
            });
            let Some(ref_name) = highest_satisfying(ref_names, &range) else {
                return Lookup::Absent;
            };
            return match ref_target(entries, ref_name)
                .and_then(|commit| Some((commit, commit_record(entries, commit)?)))
            {
                Some((commit, record)) => Lookup::Found(git_record(repo, commit, record)),
                None => Lookup::Absent,
            };
        }

        let commit = if is_commit_hash(spec) {
            spec.to_ascii_lowercase()
        } else {
            match ref_target(entries, spec) {
                Some(commit) => commit.to_string(),
                None => return Lookup::Absent,
            }
        };
        match commit_record(entries, &commit) {
            Some(record) => Lookup::Found(git_record(repo, &commit, record)),
            None => Lookup::Absent,
        }
    }

    fn resolve_url(&self, spec: &str) -> Lookup {
        let url = &self.document.sections.url;
        let key = url_key(spec);
        let candidates = [Some(spec), key.as_deref()];

        let mut indexed = false;
        for candidate in candidates.into_iter().flatten() {
            match url.get(candidate) {
                Some(Slot::Valid(record)) => {
                    return Lookup::Found(ResolvedRecord::Url {
                        spec: spec.to_string(),
                        filename: record.filename.clone(),
                        extra: record.extra.clone(),
                    });
                }
                Some(Slot::Malformed(_)) => indexed = true,
                None => {}
            }
        }
        if indexed { Lookup::Absent } else { Lookup::Unknown }
    }
}

fn ref_target<'a>(entries: &'a IndexMap<String, Slot<GitEntry>>, name: &str) -> Option<&'a str> {
    match entries.get(name) {
        Some(Slot::Valid(GitEntry::Ref(alias))) => Some(alias.commit.as_str()),
        _ => None,
    }
}

fn commit_record<'a>(
    entries: &'a IndexMap<String, Slot<GitEntry>>,
    commit: &str,
) -> Option<&'a GitCommitRecord> {
    match entries.get(commit) {
        Some(Slot::Valid(GitEntry::Commit(record))) => Some(record),
        _ => None,
    }
}

fn semver_record(
    name: &str,
    version: &str,
    spec: Option<&str>,
    record: &FileRecord,
) -> ResolvedRecord {
    ResolvedRecord::Semver {
        name: name.to_string(),
        version: version.to_string(),
        spec: spec.map(str::to_string),
        filename: record.filename.clone(),
        extra: record.extra.clone(),
    }
}

fn git_record(repo: &str, commit: &str, record: &GitCommitRecord) -> ResolvedRecord {
    ResolvedRecord::Git {
        repo: repo.to_string(),
        commit: commit.to_string(),
        filename: record.filename.clone(),
        refs: record.refs.clone(),
        extra: record.extra.clone(),
    }
}

/// Parse an npm-style range into alternatives
///
/// Accepts `||` alternatives, space-separated comparators (`>=1.0.0 <2.0.0`), operators
/// separated from their version (`>= 1.0.0`), hyphen ranges (`1.0.0 - 1.5.0`) and
/// `v`-prefixed versions. A bare full version is an exact match and a bare partial
/// version (`1.2`) means `1.2.x`, as in npm.
pub(crate) fn parse_range(range: &str) -> Option<Vec<VersionReq>> {
    range.split("||").map(|set| parse_comparator_set(set.trim())).collect()
}

fn parse_comparator_set(set: &str) -> Option<VersionReq> {
    let tokens: Vec<&str> = set.split_whitespace().collect();
    if tokens.is_empty() {
        return Some(VersionReq::STAR);
    }
    if let [low, "-", high] = tokens.as_slice() {
        let low = strip_version_prefix(low);
        let high = strip_version_prefix(high);
        return VersionReq::parse(&format!(">={}, <={}", low, high)).ok();
    }

    let mut comparators = Vec::with_capacity(tokens.len());
    let mut operator = String::new();
    for token in tokens {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            operator.push_str(token);
            continue;
        }
        let split = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
            .unwrap_or(token.len());
        operator.push_str(&token[..split]);
        let version = strip_version_prefix(&token[split..]);

        if operator.is_empty() && version.starts_with(|c: char| c.is_ascii_digit()) {
            if Version::parse(version).is_ok() {
                operator.push('=');
            } else if !version.contains(['x', 'X', '*']) {
                operator.push('~');
            }
        }
        comparators.push(format!("{}{}", operator, version));
        operator.clear();
    }
    if !operator.is_empty() {
        return None;
    }
    VersionReq::parse(&comparators.join(", ")).ok()
}

fn strip_version_prefix(version: &str) -> &str {
    version
        .strip_prefix(['v', 'V', '='])
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(version)
}

/// The candidate with the highest version that satisfies any alternative in `range`
///
/// Candidates that do not parse as versions (after dropping a `v`/`=` prefix) are
/// ignored.
pub(crate) fn highest_satisfying<'a>(
    candidates: impl Iterator<Item = &'a str>,
    range: &[VersionReq],
) -> Option<&'a str> {
    candidates
        .filter_map(|candidate| {
            let version = Version::parse(strip_version_prefix(candidate)).ok()?;
            range
                .iter()
                .any(|req| req.matches(&version))
                .then_some((version, candidate))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, candidate)| candidate)
}
