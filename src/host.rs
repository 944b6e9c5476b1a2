//! Boundary traits the host framework implements so the harness can drive it.
//!
//! The harness never implements the web framework; it orchestrates one from
//! outside through this contract. A host exposes a [`Bootstrapper`] (the
//! bootstrap entry point producing a fresh application) and an
//! [`Application`] (the booted instance: container, event bus, database
//! slot, exception-handler slot, and the HTTP kernel's entry points).
//!
//! Kernel contract: `handle` must route request-handling errors through the
//! currently installed exception handler rather than translating them
//! itself. The harness relies on that to decide, per error, between an
//! error response and raw propagation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

use crate::{
    config::HarnessConfig,
    container::Container,
    error::ServeError,
    events::EventBus,
    exceptions::ExceptionHandler,
};

/// Container identifier under which the current inbound request is bound.
///
/// Reserved by the harness: the binding is refreshed after override
/// reapplication on every dispatch, so an override registered under this
/// identifier is overwritten with the real inbound request before the
/// kernel runs.
pub const REQUEST_SERVICE: &str = "request";

/// Handle to the host's database connection manager.
pub type DbHandle = Arc<dyn ConnectionManager>;

/// Database connection manager boundary.
///
/// The harness only needs enough surface to decide whether a connection is
/// worth carrying across a reboot, and to name it in logs.
pub trait ConnectionManager: Send + Sync {
    /// Whether the manager currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// Stable label identifying the underlying connection, for logs and
    /// connection-identity probes.
    fn label(&self) -> String {
        "connection".to_owned()
    }

    /// Close the underlying connection. Invoked by the owning test module's
    /// end-of-test cleanup, once per test rather than once per request.
    fn disconnect(&self) {}
}

/// Shared slot holding the application's connection manager.
///
/// The slot is interior-mutable so a bootstrap-checkpoint listener can graft
/// a carried connection over the binding the fresh application made for
/// itself, without needing `&mut` access to the application mid-bootstrap.
#[derive(Clone, Default)]
pub struct DatabaseSlot {
    inner: Arc<Mutex<Option<DbHandle>>>,
}

impl DatabaseSlot {
    /// Construct an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connection manager, if one is installed.
    #[must_use]
    pub fn get(&self) -> Option<DbHandle> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Install `db`, replacing any prior manager.
    pub fn install(&self, db: DbHandle) {
        *self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(db);
    }
}

impl std::fmt::Debug for DatabaseSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSlot")
            .field("installed", &self.get().is_some())
            .finish()
    }
}

/// A booted host application instance.
#[async_trait]
pub trait Application: Send {
    /// The application's DI container.
    fn container(&self) -> &Container;

    /// Mutable access to the DI container.
    fn container_mut(&mut self) -> &mut Container;

    /// The application's event bus (cheap clone of a shared handle).
    fn events(&self) -> EventBus;

    /// Replace the event bus wholesale (used to install the muted stand-in).
    fn swap_events(&mut self, bus: EventBus);

    /// The application's database slot.
    fn database(&self) -> DatabaseSlot;

    /// Currently installed exception handler.
    fn exception_handler(&self) -> Arc<dyn ExceptionHandler>;

    /// Install `handler` as the exception handler the kernel consults.
    fn set_exception_handler(&mut self, handler: Arc<dyn ExceptionHandler>);

    /// Run the kernel's own bootstrap sequence: configuration loading,
    /// provider registration and boot, bootstrap checkpoint events.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the current boot.
    fn bootstrap_kernel(&mut self) -> Result<(), ServeError>;

    /// Drive `request` through routing and middleware to a response.
    ///
    /// # Errors
    ///
    /// Returns the raw error when the installed exception handler declines
    /// to render it (the passthrough diagnostic path).
    async fn handle(&mut self, request: Request<Bytes>) -> Result<Response<Bytes>, ServeError>;

    /// Post-response termination hook: session persistence and other
    /// deferred cleanup.
    fn terminate(&mut self, request: &Request<Bytes>, response: &Response<Bytes>);

    /// Mark middleware as skipped by the kernel.
    fn set_middleware_disabled(&mut self, disabled: bool);

    /// Detach the ORM's model-event dispatcher for this application's life.
    ///
    /// Model events are a separate, lower-level channel than the
    /// application bus; the event recorder never observes them.
    fn detach_model_events(&mut self);
}

/// The host application's bootstrap entry point.
pub trait Bootstrapper: Send + Sync {
    /// Application type this bootstrapper produces.
    type App: Application + 'static;

    /// Construct a brand-new, not-yet-kernel-bootstrapped application, with
    /// environment configuration from `config` loaded into it.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the current test.
    fn boot(&self, config: &HarnessConfig) -> Result<Self::App, ServeError>;
}
