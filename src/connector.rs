//! The request-cycle connector driving a host application under test.
//!
//! One connector serves one test: it boots the application at construction,
//! rebuilds it before every request after the first, reapplies the override
//! registry to each fresh instance, records every event fired, and carries
//! the exception-handling toggle and database connection across reboots.

use std::sync::Arc;

use crate::{
    bridge,
    config::HarnessConfig,
    container::{Container, Resolver, SharedService},
    error::{BootError, DispatchError, ServeError},
    events::{DomainEvent, EventBus},
    exceptions::{ExceptionMode, ExceptionToggle},
    host::{Application, Bootstrapper, REQUEST_SERVICE},
    lifecycle::{self, BootFlags, CarryOver},
    overrides::OverrideRegistry,
    recorder::EventRecorder,
    transport::{TransportRequest, TransportResponse},
};

/// Callback invoked with the application after every boot, the harness's
/// channel for publishing the fresh instance back to the owning test module.
pub type BootObserver<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// In-process connector between a test runner and a host application.
pub struct Connector<B: Bootstrapper> {
    bootstrapper: B,
    config: HarnessConfig,
    overrides: OverrideRegistry,
    recorder: EventRecorder,
    toggle: Arc<ExceptionToggle>,
    flags: BootFlags,
    app: B::App,
    first_request: bool,
    boot_observer: Option<BootObserver<B::App>>,
}

impl<B: Bootstrapper> Connector<B> {
    /// Boot the application and construct a connector around it.
    ///
    /// # Errors
    ///
    /// Returns a [`BootError`] when the configuration is invalid or the
    /// initial boot fails; both are fatal to the test.
    pub fn new(bootstrapper: B, config: HarnessConfig) -> Result<Self, BootError> {
        config.validate()?;
        let toggle = Arc::new(ExceptionToggle::new(if config.disable_exception_handling {
            ExceptionMode::Passthrough
        } else {
            ExceptionMode::Intercepting
        }));
        let flags = BootFlags {
            middleware_disabled: config.disable_middleware,
            events_disabled: config.disable_events,
            model_events_disabled: config.disable_model_events,
        };
        let recorder = EventRecorder::new();
        let app = lifecycle::boot_application(
            &bootstrapper,
            &config,
            CarryOver::default(),
            None,
            &recorder,
            &toggle,
            flags,
        )?;
        Ok(Self {
            bootstrapper,
            config,
            overrides: OverrideRegistry::new(),
            recorder,
            toggle,
            flags,
            app,
            first_request: true,
            boot_observer: None,
        })
    }

    /// Drive one simulated HTTP exchange through the application.
    ///
    /// Every call after the first reboots the application first; the
    /// override registry is reapplied to whichever instance handles the
    /// request.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] when the reboot or override application
    /// fails, when the transport request is not valid HTTP, or when an
    /// application error surfaces raw because exception handling is
    /// disabled.
    pub async fn dispatch(
        &mut self,
        request: TransportRequest,
    ) -> Result<TransportResponse, DispatchError> {
        let native = bridge::to_native(request)?;

        if self.first_request {
            self.first_request = false;
        } else {
            let carry = CarryOver::capture(&self.app);
            self.app = lifecycle::boot_application(
                &self.bootstrapper,
                &self.config,
                carry,
                Some(&native),
                &self.recorder,
                &self.toggle,
                self.flags,
            )?;
            self.notify_observer();
        }

        self.overrides.apply_all(&mut self.app)?;
        self.app
            .container_mut()
            .instance(REQUEST_SERVICE, Arc::new(bridge::duplicate_native(&native)));

        tracing::debug!(method = %native.method(), uri = %native.uri(), "dispatching request");
        let kernel_request = bridge::duplicate_native(&native);
        match self.app.handle(kernel_request).await {
            Ok(response) => {
                self.app.terminate(&native, &response);
                #[cfg(feature = "metrics")]
                crate::metrics::inc_dispatches("ok");
                Ok(bridge::to_transport(response))
            }
            Err(error) => {
                #[cfg(feature = "metrics")]
                crate::metrics::inc_dispatches("error");
                Err(DispatchError::Unhandled(error))
            }
        }
    }

    /// Whether an event matching `query` was recorded during this test.
    #[must_use]
    pub fn event_triggered(&self, query: &str) -> bool {
        self.recorder.was_triggered(query)
    }

    /// Typed form of [`event_triggered`](Self::event_triggered).
    #[must_use]
    pub fn event_fired<E: DomainEvent>(&self) -> bool {
        self.recorder.was_triggered_event::<E>()
    }

    /// Normalized names of every event recorded so far, in dispatch order.
    #[must_use]
    pub fn recorded_events(&self) -> Vec<String> {
        self.recorder.names()
    }

    /// Let application errors surface raw to the dispatch caller.
    pub fn disable_exception_handling(&self) {
        self.toggle.set(ExceptionMode::Passthrough);
    }

    /// Restore the host's error-to-response translation.
    pub fn enable_exception_handling(&self) {
        self.toggle.set(ExceptionMode::Intercepting);
    }

    /// Skip middleware in the current application and every later boot.
    pub fn disable_middleware(&mut self) {
        self.flags.middleware_disabled = true;
        self.app.set_middleware_disabled(true);
    }

    /// Run middleware again in the current application and later boots.
    pub fn enable_middleware(&mut self) {
        self.flags.middleware_disabled = false;
        self.app.set_middleware_disabled(false);
    }

    /// Mute the event bus: listeners stop running, recording continues.
    pub fn disable_events(&mut self) {
        self.flags.events_disabled = true;
        self.app.swap_events(EventBus::muted());
        self.recorder.attach(&self.app.events());
    }

    /// Detach the ORM's model-event dispatcher, now and on every later boot.
    pub fn disable_model_events(&mut self) {
        self.flags.model_events_disabled = true;
        self.app.detach_model_events();
    }

    /// Register a binding override applied on every application.
    pub fn register_binding(
        &mut self,
        abstract_id: impl Into<String>,
        resolver: impl Fn(&Container) -> SharedService + Send + Sync + 'static,
        shared: bool,
    ) {
        self.overrides
            .register_binding(abstract_id, Arc::new(resolver) as Resolver, shared);
    }

    /// Register a contextual binding override.
    pub fn register_contextual_binding(
        &mut self,
        consumer_id: impl Into<String>,
        abstract_id: impl Into<String>,
        resolver: impl Fn(&Container) -> SharedService + Send + Sync + 'static,
    ) {
        self.overrides.register_contextual_binding(
            consumer_id,
            abstract_id,
            Arc::new(resolver) as Resolver,
        );
    }

    /// Register an instance override.
    pub fn register_instance(
        &mut self,
        abstract_id: impl Into<String>,
        instance: SharedService,
    ) {
        self.overrides.register_instance(abstract_id, instance);
    }

    /// Register an application handler run, in order, after every boot.
    pub fn register_application_handler(
        &mut self,
        handler: impl Fn(&mut dyn Application) -> Result<(), ServeError> + Send + Sync + 'static,
    ) {
        self.overrides
            .register_application_handler(Box::new(handler));
    }

    /// Drop every registered application handler.
    pub fn clear_application_handlers(&mut self) {
        self.overrides.clear_application_handlers();
    }

    /// Install an observer invoked with the application after each boot.
    ///
    /// The observer fires immediately for the currently booted instance.
    pub fn set_boot_observer(&mut self, observer: BootObserver<B::App>) {
        observer(&self.app);
        self.boot_observer = Some(observer);
    }

    /// The currently booted application.
    #[must_use]
    pub fn app(&self) -> &B::App {
        &self.app
    }

    /// Mutable access to the currently booted application.
    pub fn app_mut(&mut self) -> &mut B::App {
        &mut self.app
    }

    fn notify_observer(&self) {
        if let Some(observer) = &self.boot_observer {
            observer(&self.app);
        }
    }
}

impl<B: Bootstrapper> std::fmt::Debug for Connector<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("first_request", &self.first_request)
            .field("flags", &self.flags)
            .field("overrides", &self.overrides)
            .finish_non_exhaustive()
    }
}
