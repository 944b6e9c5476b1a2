//! Recorder of every event name fired during boot and request handling.
//!
//! The recorder owns the connector-lifetime event history: storage is
//! created once per connector and shared into the listener closure attached
//! to each boot's bus, so assertions can span every request in a test. A
//! fresh listener is attached per boot because the previous boot's bus is
//! discarded with its application.

use std::sync::{Arc, Mutex};

use crate::events::{
    BOOTSTRAPPED_PREFIX, BOOTSTRAPPING_PREFIX, DomainEvent, EventBus, EventKind, FiredEvent,
};

/// One recorded dispatch: the normalized name plus every name it satisfies.
#[derive(Clone, Debug)]
struct Recorded {
    name: String,
    lineage: Vec<String>,
}

/// Append-only store of normalized event names with ancestry matching.
#[derive(Clone, Default)]
pub struct EventRecorder {
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

/// Reduce a raw string label to its recorded name.
///
/// `"name: details"` becomes `name`, except labels carrying a reserved
/// bootstrap prefix, which are preserved verbatim so tests can assert on
/// individual bootstrap phases.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    if label.starts_with(BOOTSTRAPPING_PREFIX) || label.starts_with(BOOTSTRAPPED_PREFIX) {
        return label.to_owned();
    }
    match label.split_once(':') {
        Some((name, _)) => name.trim().to_owned(),
        None => label.to_owned(),
    }
}

impl EventRecorder {
    /// Construct a recorder with empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach this recorder to `bus`.
    ///
    /// On a live bus the recorder subscribes as a wildcard listener; on the
    /// muted stand-in it taps the dispatch entry point directly, since a
    /// muted bus runs no listeners.
    pub fn attach(&self, bus: &EventBus) {
        let recorded = Arc::clone(&self.recorded);
        let listener: crate::events::Listener = Arc::new(move |fired: &FiredEvent| {
            let entry = Self::record_entry(fired);
            tracing::trace!(event = %entry.name, "event recorded");
            #[cfg(feature = "metrics")]
            crate::metrics::inc_events_recorded();
            recorded
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(entry);
        });
        if bus.is_muted() {
            bus.tap(listener);
        } else {
            bus.listen_any(listener);
        }
    }

    fn record_entry(fired: &FiredEvent) -> Recorded {
        match fired.kind {
            EventKind::Typed => {
                let mut lineage = Vec::with_capacity(1 + fired.ancestry.len());
                lineage.push(fired.label.clone());
                lineage.extend(fired.ancestry.iter().cloned());
                Recorded {
                    name: fired.label.clone(),
                    lineage,
                }
            }
            EventKind::Named => {
                let name = normalize_label(&fired.label);
                Recorded {
                    lineage: vec![name.clone()],
                    name,
                }
            }
        }
    }

    /// Whether any recorded event's name, or an ancestor name it satisfies,
    /// equals the normalized `query`.
    ///
    /// The match direction is recorded-satisfies-query: asserting on a base
    /// event matches a recorded refinement, never the reverse.
    #[must_use]
    pub fn was_triggered(&self, query: &str) -> bool {
        let query = normalize_label(query);
        self.recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .any(|entry| entry.lineage.iter().any(|name| *name == query))
    }

    /// Typed form of [`was_triggered`](Self::was_triggered).
    #[must_use]
    pub fn was_triggered_event<E: DomainEvent>(&self) -> bool {
        self.was_triggered(E::name())
    }

    /// Normalized names of every recorded event, in dispatch order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }
}

impl std::fmt::Debug for EventRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRecorder")
            .field("recorded", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    struct Payment;

    impl DomainEvent for Payment {
        fn name() -> &'static str {
            "billing::Payment"
        }
    }

    struct CardPayment;

    impl DomainEvent for CardPayment {
        fn name() -> &'static str {
            "billing::CardPayment"
        }

        fn parents() -> &'static [&'static str] {
            &["billing::Payment"]
        }
    }

    fn attached() -> (EventRecorder, EventBus) {
        let recorder = EventRecorder::new();
        let bus = EventBus::new();
        recorder.attach(&bus);
        (recorder, bus)
    }

    #[rstest]
    #[case("orders.created: {\"id\":1}", "orders.created")]
    #[case("orders.created", "orders.created")]
    #[case("bootstrapping: LoadConfiguration", "bootstrapping: LoadConfiguration")]
    #[case("bootstrapped: RegisterProviders", "bootstrapped: RegisterProviders")]
    fn labels_normalize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_label(raw), expected);
    }

    #[test]
    fn string_event_matches_reduced_name() {
        let (recorder, bus) = attached();
        bus.dispatch_named("orders.created: {\"id\":1}");
        assert!(recorder.was_triggered("orders.created"));
        assert!(!recorder.was_triggered("orders.shipped"));
    }

    #[test]
    fn query_is_normalized_like_the_event() {
        let (recorder, bus) = attached();
        bus.dispatch_named("orders.created: {\"id\":1}");
        assert!(recorder.was_triggered("orders.created: {\"id\":9}"));
    }

    #[test]
    fn typed_event_matches_its_type_name() {
        let (recorder, bus) = attached();
        bus.dispatch(&Payment);
        assert!(recorder.was_triggered_event::<Payment>());
    }

    #[test]
    fn refinement_matches_base_query_but_not_reverse() {
        let (recorder, bus) = attached();
        bus.dispatch(&CardPayment);
        assert!(recorder.was_triggered_event::<Payment>());

        let (recorder, bus) = attached();
        bus.dispatch(&Payment);
        assert!(!recorder.was_triggered_event::<CardPayment>());
    }

    #[test]
    fn bootstrap_phases_record_verbatim() {
        let (recorder, bus) = attached();
        bus.dispatch_named("bootstrapping: LoadConfiguration");
        assert!(recorder.was_triggered("bootstrapping: LoadConfiguration"));
        assert!(!recorder.was_triggered("bootstrapping"));
    }

    #[test]
    fn attach_to_muted_bus_records_via_tap() {
        let recorder = EventRecorder::new();
        let bus = EventBus::muted();
        recorder.attach(&bus);
        bus.dispatch_named("cache.cleared");
        assert!(recorder.was_triggered("cache.cleared"));
    }

    #[test]
    fn storage_accumulates_across_attachments() {
        let recorder = EventRecorder::new();
        let first = EventBus::new();
        recorder.attach(&first);
        first.dispatch_named("one");

        let second = EventBus::new();
        recorder.attach(&second);
        second.dispatch_named("two");

        assert_eq!(recorder.names(), vec!["one", "two"]);
    }
}
