#![doc(html_root_url = "https://docs.rs/drydock/latest")]
//! In-process request-cycle harness for driving a host web framework under
//! test.
//!
//! `drydock` connects a black-box HTTP test runner to a host application's
//! full request lifecycle without a network socket. A [`Connector`] boots a
//! fresh application per test and rebuilds it before every request after
//! the first, while:
//!
//! - reapplying test-registered container overrides ([`OverrideRegistry`])
//!   to each fresh instance,
//! - recording every event name fired for later assertion
//!   ([`EventRecorder`]),
//! - decorating the host's exception handler with a runtime passthrough
//!   toggle ([`GuardedHandler`]),
//! - carrying the live database connection across reboots, and
//! - translating between transport-level and host-native HTTP messages,
//!   including test-mode upload normalization.
//!
//! The host framework is not implemented here; it plugs in through the
//! [`host`] boundary traits.

pub mod bridge;
pub mod config;
pub mod connector;
pub mod container;
pub mod error;
pub mod events;
pub mod exceptions;
pub mod host;
pub mod lifecycle;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod overrides;
pub mod recorder;
pub mod transport;
pub mod uploads;

pub use config::HarnessConfig;
pub use connector::{BootObserver, Connector};
pub use container::{Container, Resolver, SharedService};
pub use error::{BootError, DispatchError, OverrideError, Result, ServeError};
pub use events::{DomainEvent, EventBus, EventKind, FiredEvent, PROVIDERS_REGISTERED};
pub use exceptions::{ExceptionHandler, ExceptionMode, ExceptionToggle, GuardedHandler};
pub use host::{Application, Bootstrapper, ConnectionManager, DatabaseSlot, DbHandle};
pub use lifecycle::{BootFlags, CarryOver};
pub use overrides::OverrideRegistry;
pub use recorder::EventRecorder;
pub use transport::{TransportRequest, TransportResponse};
pub use uploads::{FileField, RawUpload, TestUpload, UploadBag, UploadField};
