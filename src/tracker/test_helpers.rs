//! Shared test helpers for creating DownloadTracker instances in tests.

use crate::config::{DEFAULT_MANIFEST_NAME, TrackerConfig};
use crate::logging::test_support::RecordingLogger;
use crate::tracker::DownloadTracker;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub(crate) const COMMIT_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub(crate) const COMMIT_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub(crate) const COMMIT_C: &str = "cccccccccccccccccccccccccccccccccccccccc";

/// Place a non-empty file named `name` in `dir`
pub(crate) fn write_tarball(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), b"\x1f\x8b fake tarball").unwrap();
}

pub(crate) fn write_manifest(dir: &Path, manifest: &Value) {
    std::fs::write(
        dir.join(DEFAULT_MANIFEST_NAME),
        serde_json::to_string_pretty(manifest).unwrap(),
    )
    .unwrap();
}

pub(crate) fn read_manifest(dir: &Path) -> Value {
    let text = std::fs::read_to_string(dir.join(DEFAULT_MANIFEST_NAME)).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Open a tracker on `dir` that records its log output
pub(crate) async fn open_recorded(dir: &Path) -> (DownloadTracker, Arc<RecordingLogger>) {
    let logger = Arc::new(RecordingLogger::default());
    let tracker = DownloadTracker::open_with(dir, TrackerConfig::default(), Some(logger.clone()))
        .await
        .unwrap();
    (tracker, logger)
}

/// Helper to create a tracker over a fresh, empty temp directory.
/// Returns the tracker, its logger and the tempdir (which must be kept alive).
pub(crate) async fn create_test_tracker() -> (DownloadTracker, Arc<RecordingLogger>, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let (tracker, logger) = open_recorded(temp_dir.path()).await;
    (tracker, logger, temp_dir)
}

pub(crate) fn semver_data(name: &str, version: &str, filename: &str) -> Value {
    json!({"name": name, "version": version, "filename": filename})
}

pub(crate) fn git_data(repo: &str, commit: &str, filename: &str, refs: &[&str]) -> Value {
    let mut data = json!({"repo": repo, "commit": commit, "filename": filename});
    if !refs.is_empty() {
        data["refs"] = json!(refs);
    }
    data
}

/// Add a semver record, creating its tarball first
pub(crate) async fn add_semver(tracker: &mut DownloadTracker, name: &str, version: &str) {
    let filename = format!("{}-{}.tar.gz", name, version);
    write_tarball(tracker.path(), &filename);
    tracker
        .add("semver", &semver_data(name, version, &filename))
        .await
        .unwrap();
}

/// Add a git record, creating its tarball first
pub(crate) async fn add_git(tracker: &mut DownloadTracker, repo: &str, commit: &str, refs: &[&str]) {
    let filename = format!("{}.tar.gz", &commit[..8]);
    write_tarball(tracker.path(), &filename);
    tracker
        .add("git", &git_data(repo, commit, &filename, refs))
        .await
        .unwrap();
}
