use super::repair::{discard_malformed_subtrees, replace_malformed_records};
use super::*;
use crate::logging::test_support::{Level, RecordingLogger};
use serde_json::json;

const COMMIT: &str = "89abcdef0123456789abcdef0123456789abcdef";

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture must be an object, got {other}"),
    }
}

// --- discard_malformed_subtrees ---

#[test]
fn discard_removes_non_object_sections() {
    let logger = RecordingLogger::default();
    let mut root = object(json!({
        "semver": [],
        "tag": "oops",
        "git": null,
        "url": {},
    }));

    let removed = discard_malformed_subtrees(&mut root, &logger);

    assert_eq!(removed, 3);
    assert!(root.get("semver").is_none());
    assert!(root.get("tag").is_none());
    assert!(root.get("git").is_none());
    assert!(root.get("url").is_some(), "well-formed section must survive");
    let warnings = logger.messages(Level::Warn);
    assert_eq!(warnings.len(), 3);
    assert!(warnings.iter().all(|w| w.starts_with("removing")));
}

#[test]
fn discard_removes_non_object_leaves_and_emptied_subtrees() {
    let logger = RecordingLogger::default();
    let mut root = object(json!({
        "semver": {
            "x": {"1.0.0": null},
            "y": {"1.0.0": {"filename": "y-1.0.0.tar.gz"}, "2.0.0": 42},
            "z": "not an object",
        },
        "url": {"a.com/x.tgz": true},
    }));

    let removed = discard_malformed_subtrees(&mut root, &logger);

    assert_eq!(removed, 4);
    let semver = root["semver"].as_object().unwrap();
    assert!(semver.get("x").is_none(), "emptied subtree is removed");
    assert!(semver.get("z").is_none());
    assert_eq!(semver["y"].as_object().unwrap().len(), 1);
    assert!(root["url"].as_object().unwrap().is_empty());
}

#[test]
fn discard_removes_semver_keys_that_are_not_versions() {
    let logger = RecordingLogger::default();
    let mut root = object(json!({
        "semver": {"x": {
            "latest": {"filename": "x-1.0.0.tar.gz"},
            "1.0.0": {"filename": "x-1.0.0.tar.gz"},
        }},
    }));

    assert_eq!(discard_malformed_subtrees(&mut root, &logger), 1);
    let versions = root["semver"]["x"].as_object().unwrap();
    assert!(versions.contains_key("1.0.0"));
    assert!(!versions.contains_key("latest"));
}

#[test]
fn discard_keeps_objects_with_bad_fields_for_the_second_pass() {
    let logger = RecordingLogger::default();
    let mut root = object(json!({
        "semver": {"x": {"1.0.0": {"filename": 7}}},
    }));
    assert_eq!(discard_malformed_subtrees(&mut root, &logger), 0);
    assert!(logger.records().is_empty());
}

// --- replace_malformed_records ---

#[test]
fn replace_keeps_valid_records_typed() {
    let logger = RecordingLogger::default();
    let root = object(json!({
        "semver": {"x": {"1.0.0": {"filename": "x-1.0.0.tar.gz", "integrity": "sha512-abc"}}},
        "tag": {"x": {"beta": {"version": "1.0.0"}}},
        "git": {"github.com/a/b": {
            COMMIT: {"filename": "g.tar.gz", "refs": ["main"]},
            "main": {"commit": COMMIT},
        }},
        "url": {"a.com/x.tgz": {"filename": "a.com%2Fx.tgz"}},
    }));

    let sections = replace_malformed_records(root, &logger);

    assert!(logger.records().is_empty());
    let record = sections.semver["x"]["1.0.0"].valid().unwrap();
    assert_eq!(record.filename, "x-1.0.0.tar.gz");
    assert_eq!(record.extra["integrity"], "sha512-abc");
    assert_eq!(
        sections.tag["x"]["beta"],
        Slot::Valid(TagRecord {
            version: "1.0.0".into()
        })
    );
    match sections.git["github.com/a/b"][COMMIT].valid().unwrap() {
        GitEntry::Commit(commit) => assert_eq!(commit.refs, vec!["main".to_string()]),
        other => panic!("expected commit, got {other:?}"),
    }
    assert_eq!(
        sections.git["github.com/a/b"]["main"],
        Slot::Valid(GitEntry::Ref(GitRefRecord {
            commit: COMMIT.into()
        }))
    );
    assert!(sections.url["a.com/x.tgz"].valid().is_some());
}

#[test]
fn replace_turns_bad_records_into_placeholders() {
    let logger = RecordingLogger::default();
    let root = object(json!({
        "semver": {"x": {
            "1.0.0": {"filename": 7},
            "2.0.0": {"filename": "x-2.0.0.tar.gz"},
        }},
        "tag": {"x": {"beta": {"version": "soon"}}},
        "git": {"github.com/a/b": {
            COMMIT: {"refs": ["main"]},
            "main": {"commit": "abc"},
        }},
        "url": {"a.com/x.tgz": {}},
    }));

    let sections = replace_malformed_records(root, &logger);

    assert!(matches!(sections.semver["x"]["1.0.0"], Slot::Malformed(_)));
    assert!(sections.semver["x"]["2.0.0"].valid().is_some(), "siblings survive");
    assert!(matches!(sections.tag["x"]["beta"], Slot::Malformed(_)));
    assert!(matches!(sections.git["github.com/a/b"][COMMIT], Slot::Malformed(_)));
    assert!(matches!(sections.git["github.com/a/b"]["main"], Slot::Malformed(_)));
    assert!(matches!(sections.url["a.com/x.tgz"], Slot::Malformed(_)));

    let warnings = logger.messages(Level::Warn);
    assert_eq!(warnings.len(), 5);
    assert!(warnings.iter().all(|w| w.starts_with("replacing")));
}

#[test]
fn placeholder_keeps_original_json() {
    let logger = RecordingLogger::default();
    let root = object(json!({"semver": {"x": {"1.0.0": {"file": "x.tgz"}}}}));
    let sections = replace_malformed_records(root, &logger);
    assert_eq!(
        sections.semver["x"]["1.0.0"],
        Slot::Malformed(json!({"file": "x.tgz"}))
    );
}

// --- Document ---

#[test]
fn parse_strips_bom_and_keeps_created() {
    let logger = RecordingLogger::default();
    let text = "\u{feff}{\"semver\":{},\"created\":\"2024-01-01T00:00:00Z\",\"schemaVersion\":2}";
    let doc = Document::parse(text, &logger).unwrap();
    assert!(doc.sections.is_empty());
    assert_eq!(doc.created.as_deref(), Some("2024-01-01T00:00:00Z"));
}

#[test]
fn parse_fails_only_on_syntax_errors() {
    let logger = RecordingLogger::default();
    assert!(Document::parse("{\"semver\": ", &logger).is_err());

    let doc = Document::parse("[1, 2, 3]", &logger).unwrap();
    assert!(doc.sections.is_empty());
    assert_eq!(logger.messages(Level::Warn).len(), 1);
}

#[test]
fn parse_preserves_version_insertion_order() {
    let logger = RecordingLogger::default();
    let text = r#"{"semver": {"x": {
        "2.0.0": {"filename": "x-2.0.0.tar.gz"},
        "1.0.0": {"filename": "x-1.0.0.tar.gz"}
    }}}"#;
    let doc = Document::parse(text, &logger).unwrap();
    let versions: Vec<&String> = doc.sections.semver["x"].keys().collect();
    assert_eq!(versions, ["2.0.0", "1.0.0"]);
}

#[test]
fn render_writes_header_fields_and_no_bom() {
    let mut doc = Document::default();
    doc.sections
        .semver
        .entry("x".into())
        .or_default()
        .insert("1.0.0".into(), Slot::Valid(FileRecord::new("x-1.0.0.tar.gz")));

    let text = doc.render("test cache", "2024-05-05T05:05:05Z", 2).unwrap();

    assert!(!text.starts_with('\u{feff}'));
    assert!(text.contains("\n  \"semver\""), "two-space indent expected");
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["schemaVersion"], 2);
    assert_eq!(value["description"], "test cache");
    assert_eq!(value["created"], "2024-05-05T05:05:05Z");
    assert_eq!(value["updated"], "2024-05-05T05:05:05Z");
    assert_eq!(value["semver"]["x"]["1.0.0"]["filename"], "x-1.0.0.tar.gz");
    assert_eq!(value["tag"], json!({}));
}

#[test]
fn render_writes_placeholders_back_unchanged() {
    let logger = RecordingLogger::default();
    let text = r#"{"semver": {"x": {"1.0.0": {"file": "x.tgz"}}}, "created": "then"}"#;
    let doc = Document::parse(text, &logger).unwrap();
    let out: Value = serde_json::from_str(&doc.render("d", "now", 2).unwrap()).unwrap();
    assert_eq!(out["semver"]["x"]["1.0.0"], json!({"file": "x.tgz"}));
    assert_eq!(out["created"], "then");
    assert_eq!(out["updated"], "now");
}
