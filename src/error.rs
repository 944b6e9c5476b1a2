//! Error types for harness construction, boot, and dispatch.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error surfaced by host applications, handlers, and overrides.
///
/// The host boundary cannot commit to a concrete error type, so anything
/// crossing it is carried as a trait object, the same shape the exception
/// handler receives at render time.
pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while constructing the connector or booting the application.
///
/// Every variant is fatal to the current test: the application is in an
/// unknown state and the boot is never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootError {
    /// The configured bootstrap entry point does not exist on disk.
    #[error("bootstrap file {0:?} not found")]
    MissingBootstrapFile(PathBuf),
    /// The configured environment file does not exist on disk.
    #[error("environment file {0:?} not found")]
    MissingEnvironmentFile(PathBuf),
    /// The configured base URL does not parse as a URI.
    #[error("invalid base url {0:?}")]
    InvalidBaseUrl(String),
    /// The host's bootstrap entry point failed to produce an application.
    #[error("application bootstrap failed: {0}")]
    Bootstrap(#[source] ServeError),
    /// The kernel's own bootstrap sequence failed after construction.
    #[error("kernel bootstrap failed: {0}")]
    Kernel(#[source] ServeError),
}

/// Error returned when applying registered overrides to a fresh application.
#[derive(Debug, Error)]
#[error("application handler failed: {0}")]
pub struct OverrideError(#[source] pub ServeError);

/// Errors surfaced by [`dispatch`](crate::Connector::dispatch).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// Rebooting the application ahead of the request failed.
    #[error(transparent)]
    Boot(#[from] BootError),
    /// Applying the override registry to the fresh application failed.
    #[error(transparent)]
    Override(#[from] OverrideError),
    /// The transport request could not be translated into a native request.
    #[error("invalid transport request: {0}")]
    InvalidRequest(String),
    /// An application error reached the caller because exception handling
    /// is disabled, or the host handler declined to render it.
    #[error("unhandled application error: {0}")]
    Unhandled(#[source] ServeError),
}

/// Result alias used by connector entry points.
pub type Result<T, E = DispatchError> = std::result::Result<T, E>;
