//! Error types for dltracker
//!
//! Errors fall into three groups:
//! - Argument-contract violations ([`ArgumentError`]), raised before any I/O happens
//! - Data-integrity problems found by [`audit`](crate::DownloadTracker::audit)
//!   ([`AuditError`]), which are reported, never thrown
//! - Filesystem faults, which keep their underlying [`std::io::ErrorKind`] and report
//!   it as an errno-style code (`EACCES`, `EISDIR`, ...), or `EIO` for anything else
//!
//! Every error carries a machine-checkable [`code`](Error::code). Callers should match on
//! variants or codes, never on message text.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for dltracker operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dltracker
#[derive(Debug, Error)]
pub enum Error {
    /// An argument broke the calling contract
    #[error("invalid argument: {0}")]
    Argument(#[from] ArgumentError),

    /// The tracked directory does not exist
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound {
        /// The directory that was expected to exist
        path: PathBuf,
    },

    /// The tracked path exists but is not a directory
    #[error("not a directory: {}", path.display())]
    NotADirectory {
        /// The path that was expected to be a directory
        path: PathBuf,
    },

    /// A tarball named in an `add` call is not present in the tracked directory
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Full path of the missing tarball
        path: PathBuf,
    },

    /// The manifest file exists but is not valid JSON
    #[error("failed to parse manifest {}: {source}", path.display())]
    ManifestParse {
        /// Path of the manifest file
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// A sealed configuration was mutated
    #[error("configuration is sealed: cannot change '{key}'")]
    ConfigSealed {
        /// The setting that was being changed
        key: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Argument-contract violations
///
/// "Required but absent" and "present but of the wrong type" are distinct kinds.
/// An empty (or whitespace-only) string counts as absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    /// A required argument or field is missing or empty
    #[error("'{name}' is required")]
    Missing {
        /// Name of the argument or field
        name: String,
    },

    /// An argument or field is present but has the wrong type
    #[error("'{name}' must be {expected}")]
    WrongType {
        /// Name of the argument or field
        name: String,
        /// Description of the expected type (e.g., "a string")
        expected: String,
    },

    /// An argument or field has the right type but a malformed value
    #[error("invalid value for '{name}': {reason}")]
    Invalid {
        /// Name of the argument or field
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A record kind or identity tag that is not recognized
    #[error("unrecognized kind '{0}'")]
    UnknownKind(String),
}

impl ArgumentError {
    pub(crate) fn missing(name: impl Into<String>) -> Self {
        Self::Missing { name: name.into() }
    }

    pub(crate) fn wrong_type(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::WrongType {
            name: name.into(),
            expected: expected.into(),
        }
    }

    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Get the machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ArgumentError::Missing { .. } => "ERR_MISSING_ARGS",
            ArgumentError::WrongType { .. } => "ERR_INVALID_ARG_TYPE",
            ArgumentError::Invalid { .. } => "ERR_INVALID_ARG_VALUE",
            ArgumentError::UnknownKind(_) => "ERR_UNKNOWN_KIND",
        }
    }
}

/// Problems reported by an audit
#[derive(Debug, Error)]
pub enum AuditError {
    /// The referenced tarball does not exist
    #[error("file not found: {}", path.display())]
    NotFound {
        /// Full path of the missing file
        path: PathBuf,
    },

    /// The referenced path exists but is not a regular file
    #[error("not a regular file: {}", path.display())]
    NotRegularFile {
        /// Full path of the offending entry
        path: PathBuf,
    },

    /// The referenced file is empty
    #[error("file has zero length: {}", path.display())]
    ZeroLength {
        /// Full path of the empty file
        path: PathBuf,
    },

    /// The referenced filename lacks a tarball extension
    #[error("not a tarball: {filename}")]
    NotTarball {
        /// The filename as recorded
        filename: String,
    },

    /// A record that was malformed when the manifest was loaded
    #[error("record has no usable data")]
    NoData,

    /// A tag or git ref pointing at a record that does not exist
    #[error("orphaned reference: '{alias}' points at missing '{target}'")]
    OrphanedReference {
        /// The tag or ref name
        alias: String,
        /// The version or commit it points at
        target: String,
    },

    /// Stat failed for a reason other than absence
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuditError {
    /// Get the machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AuditError::NotFound { .. } => "ENOENT",
            AuditError::NotRegularFile { .. } => "EFNOTREG",
            AuditError::ZeroLength { .. } => "EFZEROLEN",
            AuditError::NotTarball { .. } => "EFNOTTAR",
            AuditError::NoData => "ENODATA",
            AuditError::OrphanedReference { .. } => "EORPHANREF",
            AuditError::Io(e) => io_error_code(e.kind()),
        }
    }
}

impl Error {
    /// Get the machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::Argument(e) => e.code(),
            Error::DirectoryNotFound { .. } => "ENOENT",
            Error::NotADirectory { .. } => "ENOTDIR",
            Error::FileNotFound { .. } => "ENOENT",
            Error::ManifestParse { .. } => "EMANIFESTPARSE",
            Error::ConfigSealed { .. } => "ECONFIGSEALED",
            Error::Io(e) => io_error_code(e.kind()),
            Error::Serialization(_) => "EJSON",
        }
    }

    /// The underlying I/O error kind, if this error came from the filesystem
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Error::Io(e) => Some(e.kind()),
            Error::DirectoryNotFound { .. } | Error::FileNotFound { .. } => {
                Some(std::io::ErrorKind::NotFound)
            }
            _ => None,
        }
    }
}

/// errno-style code for a filesystem fault, `EIO` when there is no closer match
fn io_error_code(kind: std::io::ErrorKind) -> &'static str {
    use std::io::ErrorKind;
    match kind {
        ErrorKind::NotFound => "ENOENT",
        ErrorKind::PermissionDenied => "EACCES",
        ErrorKind::AlreadyExists => "EEXIST",
        ErrorKind::NotADirectory => "ENOTDIR",
        ErrorKind::IsADirectory => "EISDIR",
        ErrorKind::DirectoryNotEmpty => "ENOTEMPTY",
        ErrorKind::ReadOnlyFilesystem => "EROFS",
        ErrorKind::StorageFull => "ENOSPC",
        ErrorKind::Interrupted => "EINTR",
        _ => "EIO",
    }
}
