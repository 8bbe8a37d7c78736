use super::*;

#[tokio::test]
async fn test_serialize_twice_writes_once() {
    let (mut tracker, logger, temp_dir) = create_test_tracker().await;

    assert!(tracker.serialize().await.unwrap());
    assert!(temp_dir.path().join("dltracker.json").exists());
    assert!(!tracker.is_dirty());

    assert!(!tracker.serialize().await.unwrap());
    assert!(
        logger
            .messages(Level::Verbose)
            .contains(&"nothing to write".to_string())
    );
}

#[tokio::test]
async fn test_serialized_manifest_has_all_sections_and_header() {
    let (mut tracker, _logger, temp_dir) = create_test_tracker().await;
    add_semver(&mut tracker, "x", "1.0.0").await;
    add_git(&mut tracker, "github.com/a/b", COMMIT_A, &["main"]).await;

    tracker.serialize().await.unwrap();

    let manifest = read_manifest(temp_dir.path());
    assert_eq!(manifest["schemaVersion"], 2);
    assert!(manifest["description"].is_string());
    assert!(manifest["created"].is_string());
    assert_eq!(manifest["created"], manifest["updated"]);
    assert_eq!(manifest["semver"]["x"]["1.0.0"]["filename"], "x-1.0.0.tar.gz");
    assert_eq!(manifest["tag"], json!({}));
    assert_eq!(manifest["git"]["github.com/a/b"][COMMIT_A]["refs"], json!(["main"]));
    assert_eq!(manifest["git"]["github.com/a/b"]["main"], json!({"commit": COMMIT_A}));
    assert_eq!(manifest["url"], json!({}));

    let raw = std::fs::read_to_string(temp_dir.path().join("dltracker.json")).unwrap();
    assert!(!raw.starts_with('\u{feff}'));
    assert!(raw.ends_with('\n'));
}

#[tokio::test]
async fn test_serialize_preserves_created_and_refreshes_updated() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dir = temp_dir.path();
    write_manifest(
        dir,
        &json!({
            "semver": {}, "tag": {}, "git": {}, "url": {},
            "created": "2020-02-02T02:02:02.000Z",
            "updated": "2020-02-02T02:02:02.000Z",
            "schemaVersion": 2,
        }),
    );
    let (mut tracker, _logger) = open_recorded(dir).await;
    add_semver(&mut tracker, "x", "1.0.0").await;

    tracker.serialize().await.unwrap();

    let manifest = read_manifest(dir);
    assert_eq!(manifest["created"], "2020-02-02T02:02:02.000Z");
    assert_ne!(manifest["updated"], "2020-02-02T02:02:02.000Z");
}

#[tokio::test]
async fn test_serialized_manifest_reloads_to_the_same_index() {
    let (mut tracker, _logger, temp_dir) = create_test_tracker().await;
    add_semver(&mut tracker, "x", "2.0.0").await;
    add_semver(&mut tracker, "x", "1.0.0").await;
    add_git(&mut tracker, "github.com/a/b", COMMIT_A, &["main"]).await;
    tracker.serialize().await.unwrap();

    let (reloaded, logger) = open_recorded(temp_dir.path()).await;

    assert_eq!(reloaded.sections(), tracker.sections());
    assert!(!reloaded.is_dirty());
    assert!(logger.messages(Level::Warn).is_empty());
    let version = match reloaded.get("tag", "x", "latest").unwrap() {
        Lookup::Found(ResolvedRecord::Semver { version, .. }) => version,
        other => panic!("expected a semver record, got {other:?}"),
    };
    assert_eq!(version, "1.0.0", "insertion order survives a save/load cycle");
}

#[tokio::test]
async fn test_serialize_failure_keeps_dirty_and_logs_warning() {
    let (mut tracker, logger, temp_dir) = create_test_tracker().await;
    // A directory in the way of the temp file makes the write fail
    std::fs::create_dir(temp_dir.path().join("dltracker.json.tmp")).unwrap();

    let err = tracker.serialize().await.unwrap_err();

    assert!(err.io_kind().is_some());
    assert!(tracker.is_dirty(), "a failed write must be retryable");
    assert_eq!(logger.messages(Level::Warn).len(), 1);
    assert!(!temp_dir.path().join("dltracker.json").exists());

    std::fs::remove_dir(temp_dir.path().join("dltracker.json.tmp")).unwrap();
    assert!(tracker.serialize().await.unwrap());
    assert!(!tracker.is_dirty());
}

#[tokio::test]
async fn test_serialize_honors_configured_indent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = TrackerConfig::default();
    config.set_indent(4).unwrap();
    config.set_description("mirror for build farm").unwrap();
    let mut tracker = DownloadTracker::open_with(temp_dir.path(), config, None)
        .await
        .unwrap();

    tracker.serialize().await.unwrap();

    let raw = std::fs::read_to_string(temp_dir.path().join("dltracker.json")).unwrap();
    assert!(raw.contains("\n    \"semver\""));
    assert_eq!(read_manifest(temp_dir.path())["description"], "mirror for build farm");
}
