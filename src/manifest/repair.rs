//! Load-time repair of a manifest's JSON tree
//!
//! Two independent passes:
//! 1. [`discard_malformed_subtrees`] removes anything that is not an object where an
//!    object is required (a section, a package/repo subtree, or a leaf record), and
//!    semver keys that are not versions.
//! 2. [`replace_malformed_records`] converts the remaining tree into typed
//!    [`Sections`], keeping records that fail validation as [`Slot::Malformed`].

use super::{
    FileRecord, GitCommitRecord, GitEntry, GitRefRecord, Index, Sections, Slot, TagRecord,
    json_type,
};
use crate::filename::is_commit_hash;
use crate::logging::Logger;
use crate::types::Kind;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Remove every subtree of the wrong shape, returning how many were removed
pub(crate) fn discard_malformed_subtrees(
    root: &mut Map<String, Value>,
    logger: &dyn Logger,
) -> usize {
    let mut removed = 0;
    for kind in Kind::ALL {
        let section = kind.as_str();
        let Some(value) = root.get_mut(section) else {
            continue;
        };
        let entries = match value {
            Value::Object(entries) => entries,
            other => {
                let found = json_type(other);
                logger.warn(&format!(
                    "removing '{}' section: expected an object, found {}",
                    section, found
                ));
                root.remove(section);
                removed += 1;
                continue;
            }
        };
        removed += match kind {
            Kind::Url => discard_non_object_leaves(section, None, entries, logger),
            _ => discard_in_two_level_section(kind, entries, logger),
        };
    }
    removed
}

fn discard_in_two_level_section(
    kind: Kind,
    entries: &mut Map<String, Value>,
    logger: &dyn Logger,
) -> usize {
    let section = kind.as_str();
    let mut removed = 0;
    let names: Vec<String> = entries.keys().cloned().collect();
    for name in names {
        let Some(subtree) = entries.get_mut(&name) else {
            continue;
        };
        let records = match subtree {
            Value::Object(records) => records,
            other => {
                let found = json_type(other);
                logger.warn(&format!(
                    "removing {} entry '{}': expected an object, found {}",
                    section, name, found
                ));
                entries.remove(&name);
                removed += 1;
                continue;
            }
        };

        let mut removed_here = discard_non_object_leaves(section, Some(&name), records, logger);
        if kind == Kind::Semver {
            let bad_keys: Vec<String> = records
                .keys()
                .filter(|version| semver::Version::parse(version).is_err())
                .cloned()
                .collect();
            for version in bad_keys {
                logger.warn(&format!(
                    "removing semver record '{}' '{}': key is not a version",
                    name, version
                ));
                records.remove(&version);
                removed_here += 1;
            }
        }
        if removed_here > 0 && records.is_empty() {
            entries.remove(&name);
        }
        removed += removed_here;
    }
    removed
}

fn discard_non_object_leaves(
    section: &str,
    name: Option<&str>,
    records: &mut Map<String, Value>,
    logger: &dyn Logger,
) -> usize {
    let bad_keys: Vec<String> = records
        .iter()
        .filter(|(_, record)| !record.is_object())
        .map(|(key, _)| key.clone())
        .collect();
    for key in &bad_keys {
        if let Some(record) = records.remove(key) {
            let location = match name {
                Some(name) => format!("'{}' '{}'", name, key),
                None => format!("'{}'", key),
            };
            logger.warn(&format!(
                "removing {} record {}: expected an object, found {}",
                section,
                location,
                json_type(&record)
            ));
        }
    }
    bad_keys.len()
}

/// Build typed sections, keeping invalid records as placeholders
///
/// Expects a tree already passed through [`discard_malformed_subtrees`]; anything it
/// would have removed is skipped here as well.
pub(crate) fn replace_malformed_records(
    mut root: Map<String, Value>,
    logger: &dyn Logger,
) -> Sections {
    let mut take = |kind: Kind| match root.remove(kind.as_str()) {
        Some(Value::Object(entries)) => entries,
        _ => Map::new(),
    };
    let semver = take(Kind::Semver);
    let tag = take(Kind::Tag);
    let git = take(Kind::Git);
    let url = take(Kind::Url);

    Sections {
        semver: typed_index(Kind::Semver, semver, logger, |_, record| {
            check::<FileRecord>(record, |r| {
                (!r.filename.trim().is_empty()).then_some(()).ok_or("empty filename")
            })
            .map(Slot::Valid)
        }),
        tag: typed_index(Kind::Tag, tag, logger, |_, record| {
            check::<TagRecord>(record, |r| {
                semver::Version::parse(&r.version)
                    .map(|_| ())
                    .map_err(|_| "version is not valid semver")
            })
            .map(Slot::Valid)
        }),
        git: typed_index(Kind::Git, git, logger, |key, record| {
            // Commit records are keyed by hash, ref aliases by name
            if is_commit_hash(key) {
                check::<GitCommitRecord>(record, |r| {
                    if r.filename.trim().is_empty() {
                        Err("empty filename")
                    } else if r.refs.iter().any(|ref_name| ref_name.trim().is_empty()) {
                        Err("empty ref name")
                    } else {
                        Ok(())
                    }
                })
                .map(|r| Slot::Valid(GitEntry::Commit(r)))
            } else {
                check::<GitRefRecord>(record, |r| {
                    is_commit_hash(&r.commit)
                        .then_some(())
                        .ok_or("commit is not a 40-hex hash")
                })
                .map(|r| Slot::Valid(GitEntry::Ref(r)))
            }
        }),
        url: url
            .into_iter()
            .filter(|(_, record)| record.is_object())
            .map(|(key, record)| {
                let slot = check::<FileRecord>(&record, |r| {
                    (!r.filename.trim().is_empty()).then_some(()).ok_or("empty filename")
                })
                .map(Slot::Valid)
                .unwrap_or_else(|reason| {
                    logger.warn(&format!("replacing url record '{}': {}", key, reason));
                    Slot::Malformed(record)
                });
                (key, slot)
            })
            .collect(),
    }
}

fn typed_index<T>(
    kind: Kind,
    entries: Map<String, Value>,
    logger: &dyn Logger,
    convert: impl Fn(&str, &Value) -> Result<Slot<T>, String>,
) -> Index<T> {
    let mut index = Index::new();
    for (name, subtree) in entries {
        let Value::Object(records) = subtree else {
            continue;
        };
        let mut typed = IndexMap::new();
        for (key, record) in records {
            if !record.is_object() {
                continue;
            }
            let slot = convert(&key, &record).unwrap_or_else(|reason| {
                logger.warn(&format!(
                    "replacing {} record '{}' '{}': {}",
                    kind, name, key, reason
                ));
                Slot::Malformed(record)
            });
            typed.insert(key, slot);
        }
        index.insert(name, typed);
    }
    index
}

fn check<T: DeserializeOwned>(
    record: &Value,
    validate: impl Fn(&T) -> Result<(), &'static str>,
) -> Result<T, String> {
    let typed: T = serde_json::from_value(record.clone()).map_err(|e| e.to_string())?;
    validate(&typed).map_err(str::to_string)?;
    Ok(typed)
}
