//! Event bus collaborator and the event shapes observed by the harness.
//!
//! The bus models the slice of the host's pub/sub surface the harness
//! touches: named listeners (used by the lifecycle manager for bootstrap
//! checkpoints), wildcard listeners (used by the event recorder), and taps.
//! A tap observes every dispatch even on a muted bus, which is how recording
//! keeps working when a test disables events: listeners stop running, the
//! record of what was dispatched does not.

use std::sync::{Arc, Mutex};

/// Name of the bootstrap checkpoint fired once the host has registered its
/// service providers. The lifecycle manager hooks this to graft a carried
/// database connection over the fresh application's own binding.
pub const PROVIDERS_REGISTERED: &str = "bootstrapped: RegisterProviders";

/// Reserved prefix for in-flight bootstrap phase events.
pub const BOOTSTRAPPING_PREFIX: &str = "bootstrapping: ";
/// Reserved prefix for completed bootstrap phase events.
pub const BOOTSTRAPPED_PREFIX: &str = "bootstrapped: ";

/// Typed event dispatched on the bus.
///
/// `name` defaults to the type path; `parents` lists the names of broader
/// event categories this event also satisfies, so assertions against a base
/// event match a dispatched refinement of it.
pub trait DomainEvent: Send + Sync + 'static {
    /// Name recorded for this event type.
    #[must_use]
    fn name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Names of broader event categories this event also satisfies.
    #[must_use]
    fn parents() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }
}

/// How an event entered the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Dispatched as a typed [`DomainEvent`]; the label is its type name.
    Typed,
    /// Dispatched as a raw string label, possibly `"name: details"` shaped.
    Named,
}

/// Snapshot of one dispatch, as seen by listeners and taps.
#[derive(Clone, Debug)]
pub struct FiredEvent {
    /// Raw label: the type name for typed events, the full string otherwise.
    pub label: String,
    /// Names of broader categories the event also satisfies (typed only).
    pub ancestry: Vec<String>,
    /// Whether the event was typed or a raw string.
    pub kind: EventKind,
}

/// Listener callback invoked with each dispatch.
pub type Listener = Arc<dyn Fn(&FiredEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    named: Vec<(String, Listener)>,
    wildcard: Vec<Listener>,
    taps: Vec<Listener>,
    muted: bool,
}

/// Cheaply clonable pub/sub bus shared between the application and the
/// harness.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    /// Construct an empty, un-muted bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a muted bus: dispatches reach taps only.
    #[must_use]
    pub fn muted() -> Self {
        let bus = Self::new();
        bus.lock().muted = true;
        bus
    }

    /// Whether this bus is the muted stand-in.
    #[must_use]
    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    /// Register a listener for events whose raw label equals `label`.
    pub fn listen(&self, label: impl Into<String>, listener: Listener) {
        self.lock().named.push((label.into(), listener));
    }

    /// Register a listener invoked for every dispatch.
    pub fn listen_any(&self, listener: Listener) {
        self.lock().wildcard.push(listener);
    }

    /// Register a tap: an observer that sees every dispatch, muted or not.
    pub fn tap(&self, listener: Listener) {
        self.lock().taps.push(listener);
    }

    /// Dispatch a typed event.
    pub fn dispatch<E: DomainEvent>(&self, _event: &E) {
        let fired = FiredEvent {
            label: E::name().to_owned(),
            ancestry: E::parents().iter().map(|&p| p.to_owned()).collect(),
            kind: EventKind::Typed,
        };
        self.fire(&fired);
    }

    /// Dispatch a raw string event label.
    pub fn dispatch_named(&self, label: &str) {
        let fired = FiredEvent {
            label: label.to_owned(),
            ancestry: Vec::new(),
            kind: EventKind::Named,
        };
        self.fire(&fired);
    }

    fn fire(&self, fired: &FiredEvent) {
        // Listeners are cloned out so a listener may dispatch further
        // events without deadlocking on the bus lock.
        let (matched, muted) = {
            let inner = self.lock();
            let mut matched: Vec<Listener> = inner.taps.clone();
            if !inner.muted {
                matched.extend(
                    inner
                        .named
                        .iter()
                        .filter(|(label, _)| *label == fired.label)
                        .map(|(_, listener)| Arc::clone(listener)),
                );
                matched.extend(inner.wildcard.iter().cloned());
            }
            (matched, inner.muted)
        };
        tracing::trace!(label = %fired.label, muted, "event dispatched");
        for listener in matched {
            listener(fired);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("EventBus")
            .field("named", &inner.named.len())
            .field("wildcard", &inner.wildcard.len())
            .field("taps", &inner.taps.len())
            .field("muted", &inner.muted)
            .finish()
    }
}
