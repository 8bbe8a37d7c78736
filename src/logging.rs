//! Logger contract shared by the tracker and the directory reconstructor
//!
//! Hosts that already have a logging pipeline implement [`Logger`]; everyone else gets
//! [`TracingLogger`], which forwards to `tracing`.

use std::sync::Arc;

/// The four-level logging contract
pub trait Logger: Send + Sync {
    /// An operation failed
    fn error(&self, message: &str);

    /// Something was wrong but has been handled
    fn warn(&self, message: &str);

    /// Noteworthy progress
    fn info(&self, message: &str);

    /// Detail useful only when diagnosing
    fn verbose(&self, message: &str);
}

/// Default [`Logger`] backed by `tracing`
///
/// `verbose` maps to `tracing::debug!`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "dltracker", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "dltracker", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "dltracker", "{}", message);
    }

    fn verbose(&self, message: &str) {
        tracing::debug!(target: "dltracker", "{}", message);
    }
}

pub(crate) fn or_default(logger: Option<Arc<dyn Logger>>) -> Arc<dyn Logger> {
    logger.unwrap_or_else(|| Arc::new(TracingLogger))
}
