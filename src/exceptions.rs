//! Exception handling decorator with a runtime passthrough toggle.
//!
//! The harness replaces the host application's exception handler on every
//! boot with a [`GuardedHandler`] wrapping the fresh application's real
//! handler. The guard consults a shared [`ExceptionToggle`] at handling
//! time, so flipping the toggle mid-test affects the very next error, and
//! the toggle itself is connector-scoped: it survives reboots while the
//! wrapped handler does not.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Request, Response};

use crate::error::ServeError;

/// Exception handler boundary the host application installs and the kernel
/// consults when request handling fails.
pub trait ExceptionHandler: Send + Sync {
    /// Log or otherwise record the error.
    fn report(&self, error: &ServeError);

    /// Translate the error into an HTTP response.
    ///
    /// # Errors
    ///
    /// Returning `Err` declines to render; the error then surfaces to the
    /// caller of the dispatch.
    fn render(
        &self,
        request: &Request<Bytes>,
        error: ServeError,
    ) -> Result<Response<Bytes>, ServeError>;
}

/// Whether the framework's error-to-response translation is in effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionMode {
    /// Delegate to the wrapped handler; errors become HTTP responses.
    Intercepting,
    /// Do not delegate; errors surface raw to the dispatch caller.
    Passthrough,
}

/// Shared toggle read by the guard at handling time.
#[derive(Debug)]
pub struct ExceptionToggle {
    mode: Mutex<ExceptionMode>,
}

impl ExceptionToggle {
    /// Construct a toggle in the given initial mode.
    #[must_use]
    pub fn new(mode: ExceptionMode) -> Self {
        Self {
            mode: Mutex::new(mode),
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> ExceptionMode {
        *self
            .mode
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Switch modes; takes effect for the next error handled.
    pub fn set(&self, mode: ExceptionMode) {
        *self
            .mode
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = mode;
    }
}

impl Default for ExceptionToggle {
    fn default() -> Self {
        Self::new(ExceptionMode::Intercepting)
    }
}

/// Decorator over the host's real exception handler.
///
/// Exactly one real handler is wrapped per boot; the lifecycle manager
/// builds a fresh guard around whatever handler the new application
/// installed, carrying the connector's toggle across.
pub struct GuardedHandler {
    inner: Arc<dyn ExceptionHandler>,
    toggle: Arc<ExceptionToggle>,
}

impl GuardedHandler {
    /// Wrap `inner`, consulting `toggle` on every error.
    #[must_use]
    pub fn new(inner: Arc<dyn ExceptionHandler>, toggle: Arc<ExceptionToggle>) -> Self {
        Self { inner, toggle }
    }
}

impl ExceptionHandler for GuardedHandler {
    fn report(&self, error: &ServeError) {
        if self.toggle.mode() == ExceptionMode::Intercepting {
            self.inner.report(error);
        }
    }

    fn render(
        &self,
        request: &Request<Bytes>,
        error: ServeError,
    ) -> Result<Response<Bytes>, ServeError> {
        match self.toggle.mode() {
            ExceptionMode::Intercepting => self.inner.render(request, error),
            ExceptionMode::Passthrough => {
                log::debug!("exception handling disabled; rethrowing {error}");
                Err(error)
            }
        }
    }
}
