//! Miniature host framework used by the integration tests.
//!
//! `FixtureBootstrapper` and `FixtureApp` implement the host boundary just
//! far enough to exercise the connector: a route table, a kernel with one
//! response-stamping middleware, bootstrap checkpoint events, a counted
//! database connection per boot, a default exception handler, and a
//! model-event channel separate from the application bus.

// Each integration test binary compiles this module and uses its own subset.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use drydock::{
    Application, Bootstrapper, ConnectionManager, Container, DatabaseSlot, EventBus,
    ExceptionHandler, HarnessConfig, PROVIDERS_REGISTERED, ServeError,
    host::REQUEST_SERVICE,
};
use http::{Request, Response, StatusCode};

/// Install a test-writer tracing subscriber; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared log of model-event names, owned by the bootstrapper so it
/// survives reboots.
pub type ModelEventLog = Arc<Mutex<Vec<String>>>;

/// Context handed to fixture route handlers.
pub struct RouteCtx<'a> {
    pub container: &'a Container,
    pub events: &'a EventBus,
    pub db: &'a DatabaseSlot,
    /// `None` once model events are detached.
    pub model_events: Option<&'a ModelEventLog>,
}

/// Fixture route handler.
pub type RouteHandler = Arc<
    dyn Fn(&RouteCtx<'_>, &Request<Bytes>) -> Result<Response<Bytes>, ServeError> + Send + Sync,
>;

/// One database connection per boot, labelled with its open order.
pub struct FixtureDb {
    label: String,
    connected: AtomicBool,
}

impl FixtureDb {
    fn new(sequence: usize) -> Self {
        Self {
            label: format!("conn-{sequence}"),
            connected: AtomicBool::new(true),
        }
    }

}

impl ConnectionManager for FixtureDb {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Host-default exception handler: 500 with the error text, stamped so
/// tests can tell it rendered the response.
struct FixtureExceptionHandler {
    reported: Arc<Mutex<Vec<String>>>,
}

impl ExceptionHandler for FixtureExceptionHandler {
    fn report(&self, error: &ServeError) {
        self.reported
            .lock()
            .expect("reported log lock")
            .push(error.to_string());
    }

    fn render(
        &self,
        _request: &Request<Bytes>,
        error: ServeError,
    ) -> Result<Response<Bytes>, ServeError> {
        Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header("x-rendered-by", "fixture-handler")
            .body(Bytes::from(error.to_string()))
            .expect("static response"))
    }
}

/// Bootstrap entry point for the fixture framework.
///
/// Route tables and probe counters live here so they survive the
/// per-request application rebuilds.
#[derive(Default)]
pub struct FixtureBootstrapper {
    routes: HashMap<String, RouteHandler>,
    fail_boot: bool,
    /// Connections opened across every boot (one per kernel bootstrap).
    pub connections_opened: Arc<AtomicUsize>,
    /// Hits on the provider-registered `cache.cleared` listener.
    pub provider_listener_hits: Arc<AtomicUsize>,
    /// Model events emitted while the dispatcher was attached.
    pub model_events: ModelEventLog,
    /// Errors reported to the host's default exception handler.
    pub reported_errors: Arc<Mutex<Vec<String>>>,
    /// Terminate-hook invocations across every application.
    pub terminations: Arc<AtomicUsize>,
}

impl FixtureBootstrapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bootstrapper whose `boot` always fails.
    pub fn failing() -> Self {
        Self {
            fail_boot: true,
            ..Self::default()
        }
    }

    /// Register a route under `"METHOD /path"`.
    #[must_use]
    pub fn route(
        mut self,
        method: &str,
        path: &str,
        handler: impl Fn(&RouteCtx<'_>, &Request<Bytes>) -> Result<Response<Bytes>, ServeError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.routes.insert(format!("{method} {path}"), Arc::new(handler));
        self
    }
}

impl Bootstrapper for FixtureBootstrapper {
    type App = FixtureApp;

    fn boot(&self, _config: &HarnessConfig) -> Result<FixtureApp, ServeError> {
        if self.fail_boot {
            return Err("fixture bootstrap exploded".into());
        }
        Ok(FixtureApp {
            container: Container::new(),
            bus: EventBus::new(),
            db: DatabaseSlot::new(),
            handler: Arc::new(FixtureExceptionHandler {
                reported: Arc::clone(&self.reported_errors),
            }),
            routes: self.routes.clone(),
            middleware_disabled: false,
            model_events: Some(Arc::clone(&self.model_events)),
            connections_opened: Arc::clone(&self.connections_opened),
            provider_listener_hits: Arc::clone(&self.provider_listener_hits),
            terminations: Arc::clone(&self.terminations),
        })
    }
}

/// A booted fixture application.
pub struct FixtureApp {
    container: Container,
    bus: EventBus,
    db: DatabaseSlot,
    handler: Arc<dyn ExceptionHandler>,
    routes: HashMap<String, RouteHandler>,
    middleware_disabled: bool,
    model_events: Option<ModelEventLog>,
    connections_opened: Arc<AtomicUsize>,
    provider_listener_hits: Arc<AtomicUsize>,
    terminations: Arc<AtomicUsize>,
}

impl FixtureApp {
    /// The label of the currently installed database connection.
    pub fn db_label(&self) -> Option<String> {
        self.db.get().map(|db| db.label())
    }

    fn not_found() -> Response<Bytes> {
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Bytes::from_static(b"not found"))
            .expect("static response")
    }
}

#[async_trait]
impl Application for FixtureApp {
    fn container(&self) -> &Container {
        &self.container
    }

    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    fn events(&self) -> EventBus {
        self.bus.clone()
    }

    fn swap_events(&mut self, bus: EventBus) {
        self.bus = bus;
    }

    fn database(&self) -> DatabaseSlot {
        self.db.clone()
    }

    fn exception_handler(&self) -> Arc<dyn ExceptionHandler> {
        Arc::clone(&self.handler)
    }

    fn set_exception_handler(&mut self, handler: Arc<dyn ExceptionHandler>) {
        self.handler = handler;
    }

    fn bootstrap_kernel(&mut self) -> Result<(), ServeError> {
        self.bus.dispatch_named("bootstrapping: LoadConfiguration");
        self.bus.dispatch_named("bootstrapped: LoadConfiguration");

        // Provider registration: a listener with an observable side effect
        // and this boot's own database connection.
        let hits = Arc::clone(&self.provider_listener_hits);
        self.bus.listen(
            "cache.cleared",
            Arc::new(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let sequence = self.connections_opened.fetch_add(1, Ordering::SeqCst) + 1;
        self.db.install(Arc::new(FixtureDb::new(sequence)));
        self.bus.dispatch_named(PROVIDERS_REGISTERED);

        self.bus.dispatch_named("bootstrapped: BootProviders");
        Ok(())
    }

    async fn handle(&mut self, request: Request<Bytes>) -> Result<Response<Bytes>, ServeError> {
        let key = format!("{} {}", request.method(), request.uri().path());
        let route = self.routes.get(&key).cloned();
        let ctx = RouteCtx {
            container: &self.container,
            events: &self.bus,
            db: &self.db,
            model_events: self.model_events.as_ref(),
        };
        let result = match route {
            Some(handler) => handler(&ctx, &request),
            None => Ok(Self::not_found()),
        };
        match result {
            Ok(mut response) => {
                if !self.middleware_disabled {
                    response
                        .headers_mut()
                        .insert("x-middleware", "on".parse().expect("static header"));
                }
                Ok(response)
            }
            Err(error) => {
                let handler = Arc::clone(&self.handler);
                handler.report(&error);
                handler.render(&request, error)
            }
        }
    }

    fn terminate(&mut self, _request: &Request<Bytes>, _response: &Response<Bytes>) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        self.bus.dispatch_named("kernel.terminated");
    }

    fn set_middleware_disabled(&mut self, disabled: bool) {
        self.middleware_disabled = disabled;
    }

    fn detach_model_events(&mut self) {
        self.model_events = None;
    }
}

/// Route handler echoing the bound current request's URI, for tests probing
/// the container-bound request.
pub fn current_request_echo(
    ctx: &RouteCtx<'_>,
    _request: &Request<Bytes>,
) -> Result<Response<Bytes>, ServeError> {
    let bound = ctx
        .container
        .resolve_as::<Request<Bytes>>(REQUEST_SERVICE)
        .map(|request| request.uri().to_string())
        .unwrap_or_default();
    Ok(Response::new(Bytes::from(bound)))
}

/// Plain 200 response with `body`.
pub fn text_response(body: impl Into<Bytes>) -> Result<Response<Bytes>, ServeError> {
    Ok(Response::new(body.into()))
}
