//! Type-erased dependency-injection container exposed by the host application.
//!
//! `Container` maps string service identifiers to resolvers, shared
//! instances, and contextual (per-consumer) bindings. Values are stored as
//! `Arc<dyn Any + Send + Sync>` so unrelated service types share one map;
//! typed access goes through [`Container::resolve_as`].
//!
//! The container is a collaborator type the harness configures on every
//! boot. Identifier collisions follow last-write-wins: rebinding a service
//! replaces the previous binding and drops any cached shared resolution.

use std::{any::Any, collections::HashMap, sync::Arc};

use dashmap::DashMap;

/// Shared, type-erased service value.
pub type SharedService = Arc<dyn Any + Send + Sync>;

/// Resolver closure producing a service from the container.
pub type Resolver = Arc<dyn Fn(&Container) -> SharedService + Send + Sync>;

struct Binding {
    resolver: Resolver,
    shared: bool,
}

/// String-keyed DI registry with bindings, contextual bindings, and
/// instances.
#[derive(Default)]
pub struct Container {
    bindings: HashMap<String, Binding>,
    contextual: HashMap<String, HashMap<String, Resolver>>,
    instances: HashMap<String, SharedService>,
    // Cache of resolutions for `shared` bindings; keyed like `bindings`.
    resolved: DashMap<String, SharedService>,
}

impl Container {
    /// Construct an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver for `abstract_id`, replacing any prior binding.
    ///
    /// When `shared` is true the first resolution is cached and every later
    /// resolution returns the same value.
    pub fn bind(&mut self, abstract_id: impl Into<String>, resolver: Resolver, shared: bool) {
        let abstract_id = abstract_id.into();
        self.resolved.remove(&abstract_id);
        self.instances.remove(&abstract_id);
        self.bindings.insert(abstract_id, Binding { resolver, shared });
    }

    /// Register a contextual binding: when `consumer_id` asks for
    /// `abstract_id`, resolve it with `resolver` instead of the global
    /// binding.
    pub fn bind_contextual(
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

    /// Register a concrete instance for `abstract_id`.
    pub fn instance(&mut self, abstract_id: impl Into<String>, value: SharedService) {
        let abstract_id = abstract_id.into();
        self.resolved.remove(&abstract_id);
        self.instances.insert(abstract_id, value);
    }

    /// Whether any binding or instance exists for `abstract_id`.
    #[must_use]
    pub fn contains(&self, abstract_id: &str) -> bool {
        self.instances.contains_key(abstract_id) || self.bindings.contains_key(abstract_id)
    }

    /// Resolve `abstract_id` against instances, then bindings.
    ///
    /// Returns `None` when nothing is registered under the identifier.
    #[must_use]
    pub fn resolve(&self, abstract_id: &str) -> Option<SharedService> {
        if let Some(value) = self.instances.get(abstract_id) {
            return Some(Arc::clone(value));
        }
        if let Some(cached) = self.resolved.get(abstract_id) {
            return Some(Arc::clone(&cached));
        }
        let binding = self.bindings.get(abstract_id)?;
        let value = (binding.resolver)(self);
        if binding.shared {
            self.resolved
                .insert(abstract_id.to_owned(), Arc::clone(&value));
        }
        Some(value)
    }

    /// Resolve `abstract_id` on behalf of `consumer_id`, preferring a
    /// contextual binding over the global one.
    #[must_use]
    pub fn resolve_for(&self, consumer_id: &str, abstract_id: &str) -> Option<SharedService> {
        if let Some(resolver) = self
            .contextual
            .get(consumer_id)
            .and_then(|needs| needs.get(abstract_id))
        {
            return Some(resolver(self));
        }
        self.resolve(abstract_id)
    }

    /// Resolve `abstract_id` and downcast it to `T`.
    ///
    /// Returns `None` when the identifier is unbound or bound to a value of
    /// another type.
    #[must_use]
    pub fn resolve_as<T: Send + Sync + 'static>(&self, abstract_id: &str) -> Option<Arc<T>> {
        self.resolve(abstract_id)
            .and_then(|value| value.downcast::<T>().ok())
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.bindings.keys())
            .field("contextual", &self.contextual.keys())
            .field("instances", &self.instances.keys())
            .finish_non_exhaustive()
    }
}
