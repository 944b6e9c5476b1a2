//! Registry of test-declared container overrides that outlive reboots.
//!
//! The registry belongs to the connector, not the application: the
//! application is rebuilt wholesale on every request, and whatever a test
//! registered here is reapplied to each fresh instance. Bindings and
//! instances follow last-write-wins; application handlers are an ordered,
//! append-only sequence until explicitly cleared.

use std::collections::HashMap;

use crate::{
    container::{Resolver, SharedService},
    error::{OverrideError, ServeError},
    host::Application,
};

/// Callback mutating a freshly booted application.
pub type ApplicationHandler =
    Box<dyn Fn(&mut dyn Application) -> Result<(), ServeError> + Send + Sync>;

struct BindingOverride {
    resolver: Resolver,
    shared: bool,
}

/// Container overrides reapplied after every boot.
#[derive(Default)]
pub struct OverrideRegistry {
    bindings: HashMap<String, BindingOverride>,
    contextual: HashMap<String, HashMap<String, Resolver>>,
    instances: HashMap<String, SharedService>,
    handlers: Vec<ApplicationHandler>,
}

impl OverrideRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a binding override; takes effect at the next application.
    pub fn register_binding(
        &mut self,
        abstract_id: impl Into<String>,
        resolver: Resolver,
        shared: bool,
    ) {
        self.bindings
            .insert(abstract_id.into(), BindingOverride { resolver, shared });
    }

    /// Store a contextual binding override.
    pub fn register_contextual_binding(
        &mut self,
        consumer_id: impl Into<String>,
        abstract_id: impl Into<String>,
        resolver: Resolver,
    ) {
        self.contextual
            .entry(consumer_id.into())
            .or_default()
            .insert(abstract_id.into(), resolver);
    }

    /// Store an instance override.
    pub fn register_instance(&mut self, abstract_id: impl Into<String>, instance: SharedService) {
        self.instances.insert(abstract_id.into(), instance);
    }

    /// Append an application handler; handlers run in registration order.
    pub fn register_application_handler(&mut self, handler: ApplicationHandler) {
        self.handlers.push(handler);
    }

    /// Drop every application handler; bindings and instances are kept.
    pub fn clear_application_handlers(&mut self) {
        self.handlers.clear();
    }

    /// Apply every override to `app`: bindings, then contextual bindings,
    /// then instances, then handlers in registration order.
    ///
    /// Idempotent with respect to registry state: two freshly booted
    /// applications configured from the same registry end up equivalent.
    ///
    /// # Errors
    ///
    /// A handler error aborts the remaining handlers and is fatal to the
    /// current dispatch.
    pub fn apply_all(&self, app: &mut dyn Application) -> Result<(), OverrideError> {
        let container = app.container_mut();
        for (abstract_id, binding) in &self.bindings {
            container.bind(
                abstract_id.clone(),
                std::sync::Arc::clone(&binding.resolver),
                binding.shared,
            );
        }
        for (consumer_id, needs) in &self.contextual {
            for (abstract_id, resolver) in needs {
                container.bind_contextual(
                    consumer_id.clone(),
                    abstract_id.clone(),
                    std::sync::Arc::clone(resolver),
                );
            }
        }
        for (abstract_id, instance) in &self.instances {
            container.instance(abstract_id.clone(), std::sync::Arc::clone(instance));
        }
        for handler in &self.handlers {
            handler(app).map_err(OverrideError)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for OverrideRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideRegistry")
            .field("bindings", &self.bindings.keys())
            .field("contextual", &self.contextual.keys())
            .field("instances", &self.instances.keys())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
