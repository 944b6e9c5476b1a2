//! Application boot sequence and cross-reboot state transplant.
//!
//! Every request after the first rebuilds the application wholesale; the
//! only state grafted onto the fresh instance is the carried database
//! connection. Ordering here is load-bearing:
//!
//! - the providers-registered hook must be on the bus before the kernel
//!   bootstrap runs, so the carried connection overrides the fresh
//!   application's own database binding instead of being overridden by it;
//! - the recorder attaches after the kernel bootstrap, so provider-installed
//!   listeners do not double-fire into it;
//! - the exception guard wraps the handler the fresh application actually
//!   installed, carrying the connector's toggle across the reboot.

use std::sync::Arc;

use bytes::Bytes;
use http::Request;

use crate::{
    bridge,
    config::HarnessConfig,
    error::BootError,
    events::{EventBus, PROVIDERS_REGISTERED},
    exceptions::{ExceptionToggle, GuardedHandler},
    host::{Application, Bootstrapper, DbHandle, REQUEST_SERVICE},
    recorder::EventRecorder,
};

/// State deliberately carried from the discarded application into the next
/// boot. Everything not named here is rebuilt from scratch.
#[derive(Default)]
pub struct CarryOver {
    /// Live database connection manager reused by the next application, so
    /// sequential in-test requests do not exhaust the connection budget and
    /// an open transaction survives the reboot.
    pub db: Option<DbHandle>,
}

impl CarryOver {
    /// Capture carry-over state from the application about to be discarded.
    ///
    /// Only a currently connected manager is worth carrying; a disconnected
    /// one is cheaper to rebuild than to graft.
    pub fn capture(app: &impl Application) -> Self {
        let db = app.database().get().filter(|db| db.is_connected());
        Self { db }
    }
}

/// Behavior toggles applied to every freshly booted application.
#[derive(Clone, Copy, Debug, Default)]
pub struct BootFlags {
    /// Skip middleware execution in the kernel.
    pub middleware_disabled: bool,
    /// Swap the event bus for the muted stand-in.
    pub events_disabled: bool,
    /// Detach the ORM's model-event dispatcher.
    pub model_events_disabled: bool,
}

/// Boot a fresh application and configure it for the harness.
///
/// `seed` is the native form of the inbound request driving this boot; a
/// boot with no request yet (the connector's construction) binds a GET
/// against the configured base URL instead.
///
/// # Errors
///
/// Any failure is fatal to the current test; boots are never retried.
pub fn boot_application<B: Bootstrapper>(
    bootstrapper: &B,
    config: &HarnessConfig,
    carry: CarryOver,
    seed: Option<&Request<Bytes>>,
    recorder: &EventRecorder,
    toggle: &Arc<ExceptionToggle>,
    flags: BootFlags,
) -> Result<B::App, BootError> {
    tracing::debug!(
        carried_db = carry.db.is_some(),
        seeded = seed.is_some(),
        "booting application"
    );
    let mut app = bootstrapper.boot(config).map_err(BootError::Bootstrap)?;

    let placeholder = bridge::placeholder_request(config.base_url())
        .map_err(|_| BootError::InvalidBaseUrl(config.base_url().to_owned()))?;
    app.container_mut()
        .instance(REQUEST_SERVICE, Arc::new(placeholder));

    if let Some(old_db) = carry.db {
        install_db_rebind_hook(&app.events(), &app.database(), old_db);
    }

    let current = seed.map_or_else(
        || bridge::placeholder_request(config.base_url()),
        |request| Ok(bridge::duplicate_native(request)),
    )
    .map_err(|_| BootError::InvalidBaseUrl(config.base_url().to_owned()))?;
    app.container_mut()
        .instance(REQUEST_SERVICE, Arc::new(current));

    app.bootstrap_kernel().map_err(BootError::Kernel)?;

    recorder.attach(&app.events());

    let guard = GuardedHandler::new(app.exception_handler(), Arc::clone(toggle));
    app.set_exception_handler(Arc::new(guard));

    if flags.middleware_disabled {
        app.set_middleware_disabled(true);
    }
    if flags.events_disabled {
        app.swap_events(EventBus::muted());
        recorder.attach(&app.events());
    }
    if flags.model_events_disabled {
        app.detach_model_events();
    }

    #[cfg(feature = "metrics")]
    crate::metrics::inc_boots();
    log::debug!("application booted");
    Ok(app)
}

/// Register the providers-registered hook that grafts `old_db` over the new
/// application's own database binding.
fn install_db_rebind_hook(bus: &EventBus, slot: &crate::host::DatabaseSlot, old_db: DbHandle) {
    let slot = slot.clone();
    bus.listen(
        PROVIDERS_REGISTERED,
        Arc::new(move |_| {
            tracing::debug!(db = %old_db.label(), "reinstalling carried database connection");
            slot.install(Arc::clone(&old_db));
        }),
    );
}
