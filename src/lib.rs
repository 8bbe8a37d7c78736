//! # dltracker
//!
//! Registry of package tarballs cached in a local directory for offline installation.
//!
//! ## Design Philosophy
//!
//! dltracker is designed to be:
//! - **Filename-addressed** - Every tarball name encodes its package identity, so an
//!   index can always be rebuilt from a directory listing
//! - **Self-healing** - A damaged manifest is repaired on load instead of failing
//! - **Library-first** - No CLI, purely a Rust crate for fetch and install layers
//!
//! ## Quick Start
//!
//! ```no_run
//! use dltracker::{DownloadTracker, Lookup};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tracker = DownloadTracker::open("/var/cache/tarballs").await?;
//!
//!     // After downloading x-1.0.0.tar.gz into the directory
//!     tracker
//!         .add(
//!             "semver",
//!             &json!({"name": "x", "version": "1.0.0", "filename": "x-1.0.0.tar.gz"}),
//!         )
//!         .await?;
//!     tracker.serialize().await?;
//!
//!     if let Lookup::Found(record) = tracker.get("semver", "x", "^1.0.0")? {
//!         println!("install from {}", tracker.tarball_path(&record).display());
//!     }
//!
//!     for problem in tracker.audit().await {
//!         eprintln!("{} {}: {}", problem.kind, problem.name, problem.error);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Filename codec for cached tarballs
pub mod filename;
/// Logger contract and default backend
pub mod logging;
/// Manifest model and load-time repair
pub mod manifest;
/// Index reconstruction from a directory listing
pub mod reconstruct;
/// The download tracker (decomposed into focused submodules)
pub mod tracker;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::TrackerConfig;
pub use error::{ArgumentError, AuditError, Error, Result};
pub use logging::{Logger, TracingLogger};
pub use reconstruct::reconstruct;
pub use tracker::{AuditEntry, DownloadTracker};
pub use types::{DecodedFilename, Kind, Lookup, PackageIdentity, ResolvedRecord};
