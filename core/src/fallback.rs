//! Default handlers for outcomes the caller left unhandled.
//!
//! A single process-wide `Fallback` is installed lazily (`LogFallback` unless
//! replaced). A fallback set with `Dispatcher::with_fallback` takes
//! precedence over the installed one.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::http::{ResponseData, UploadProgress};

/// Strategy invoked when no caller-supplied handler covers an outcome.
pub trait Fallback: Send + Sync {
    /// A response failed business validation and no error-response handler was given.
    fn on_error_data(&self, data: &ResponseData);

    /// A transport failure occurred and no `handle_error` was given.
    fn on_error(&self, error: &DispatchError);

    /// Upload progress for a request without its own progress hook.
    fn on_upload_progress(&self, progress: &UploadProgress);
}

/// Logs every unhandled outcome through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFallback;

impl Fallback for LogFallback {
    fn on_error_data(&self, data: &ResponseData) {
        warn!(?data, "response rejected by validate_response");
    }

    fn on_error(&self, error: &DispatchError) {
        warn!(%error, "request failed");
    }

    fn on_upload_progress(&self, progress: &UploadProgress) {
        debug!(loaded = progress.loaded, total = progress.total, "upload progress");
    }
}

static GLOBAL: Lazy<RwLock<Arc<dyn Fallback>>> = Lazy::new(|| RwLock::new(Arc::new(LogFallback)));

/// The currently installed process-wide fallback.
pub fn global() -> Arc<dyn Fallback> {
    GLOBAL.read().clone()
}

/// Replace the process-wide fallback, returning the previous one.
pub fn install(fallback: Arc<dyn Fallback>) -> Arc<dyn Fallback> {
    std::mem::replace(&mut *GLOBAL.write(), fallback)
}

/// Serializes tests that swap the process-wide fallback.
#[cfg(test)]
pub(crate) static TEST_GUARD: parking_lot::Mutex<()> = parking_lot::const_mutex(());
