//! Custom test assertions for tracker lookups

use dltracker::{AuditEntry, Lookup, ResolvedRecord};
use serde_json::Value;

/// Assert that `lookup` found a record and return it
pub fn expect_found(lookup: Lookup) -> ResolvedRecord {
    match lookup {
        Lookup::Found(record) => record,
        other => panic!("expected a record, got {other:?}"),
    }
}

/// Assert that `lookup` found a record whose flat form equals `expected`
pub fn assert_found_eq(lookup: Lookup, expected: &Value) {
    let record = expect_found(lookup);
    assert_eq!(&record.to_value(), expected, "resolved record mismatch");
}

/// Assert that `lookup` resolved to the git commit `expected`
pub fn assert_git_commit(lookup: Lookup, expected: &str) {
    match expect_found(lookup) {
        ResolvedRecord::Git { commit, .. } => assert_eq!(commit, expected),
        other => panic!("expected a git record, got {other:?}"),
    }
}

/// Error codes of an audit report, in report order
pub fn audit_codes(entries: &[AuditEntry]) -> Vec<&'static str> {
    entries.iter().map(|entry| entry.error.code()).collect()
}
