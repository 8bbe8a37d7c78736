//! Cache directory fixtures

use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

pub const MANIFEST: &str = "dltracker.json";

pub const COMMIT_MAIN: &str = "1111111111111111111111111111111111111111";
pub const COMMIT_MASTER: &str = "2222222222222222222222222222222222222222";
pub const COMMIT_OLD: &str = "3333333333333333333333333333333333333333";

/// Create a cache directory holding a non-empty file for each of `filenames`
pub fn cache_dir_with(filenames: &[&str]) -> TempDir {
    let temp_dir = tempfile::tempdir().unwrap();
    for filename in filenames {
        write_tarball(temp_dir.path(), filename);
    }
    temp_dir
}

/// Place a non-empty file named `filename` in `dir`
pub fn write_tarball(dir: &Path, filename: &str) {
    std::fs::write(dir.join(filename), b"\x1f\x8b\x08 tarball bytes").unwrap();
}

pub fn write_manifest(dir: &Path, manifest: &Value) {
    std::fs::write(
        dir.join(MANIFEST),
        serde_json::to_string_pretty(manifest).unwrap(),
    )
    .unwrap();
}

pub fn read_manifest(dir: &Path) -> Value {
    let text = std::fs::read_to_string(dir.join(MANIFEST)).unwrap();
    serde_json::from_str(&text).unwrap()
}

