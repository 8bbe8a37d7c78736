//! Writing the manifest

use super::DownloadTracker;
use crate::error::Result;
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};

impl DownloadTracker {
    /// Write the manifest if anything changed since it was loaded or last written
    ///
    /// Returns `false` without touching the filesystem when there is nothing to write.
    /// The manifest is written to a temporary file beside it and renamed into place, so
    /// a failed write never leaves a truncated manifest. `created` is kept from the
    /// loaded manifest and `updated` is set to the current time.
    ///
    /// # Errors
    /// Returns the I/O error of a failed write. The tracker stays dirty so the call
    /// can be retried.
    pub async fn serialize(&mut self) -> Result<bool> {
        if !self.dirty {
            self.logger.verbose("nothing to write");
            return Ok(false);
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let text = self.document.render(
            self.config.description(),
            &now,
            self.config.indent(),
        )?;
        let manifest_path = self.manifest_path();

        if let Err(e) = write_atomic(&manifest_path, &text).await {
            self.logger.warn(&format!(
                "failed to write manifest {}: {}",
                manifest_path.display(),
                e
            ));
            return Err(e.into());
        }

        if self.document.created.is_none() {
            self.document.created = Some(now);
        }
        self.dirty = false;
        self.logger
            .verbose(&format!("wrote manifest {}", manifest_path.display()));
        Ok(true)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let temp = temp_path(path);
    let result = async {
        tokio::fs::write(&temp, contents).await?;
        tokio::fs::rename(&temp, path).await
    }
    .await;
    if result.is_err() {
        // Best effort; the temp path may never have been created
        let _ = tokio::fs::remove_file(&temp).await;
    }
    result
}
