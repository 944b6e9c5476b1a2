//! Metric helpers for `drydock`.
//!
//! This module defines metric names and simple helper functions wrapping
//! the [`metrics`](https://docs.rs/metrics) crate.

use metrics::counter;

/// Name of the counter tracking application boots.
pub const BOOTS_TOTAL: &str = "drydock_boots_total";
/// Name of the counter tracking dispatched requests.
pub const DISPATCHES_TOTAL: &str = "drydock_dispatches_total";
/// Name of the counter tracking recorded events.
pub const EVENTS_RECORDED_TOTAL: &str = "drydock_events_recorded_total";

/// Record an application boot.
pub fn inc_boots() {
    counter!(BOOTS_TOTAL).increment(1);
}

/// Record a dispatched request with its outcome label.
pub fn inc_dispatches(outcome: &'static str) {
    counter!(DISPATCHES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record an event observed by the recorder.
pub fn inc_events_recorded() {
    counter!(EVENTS_RECORDED_TOTAL).increment(1);
}
