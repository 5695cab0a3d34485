//! # homerule-adapter-virtual
//!
//! In-memory stand-ins for every outbound port of the engine. Used by the
//! `homeruled` demo binary and by end-to-end tests.
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`VirtualGateway`] | `DeviceGateway` | Climate units and lights kept in memory, notifications queued in an outbox |
//! | [`StaticDescriptions`] | `AnomalyDescriptionLookup` | Fixed description → event table, optionally scoped per space |
//! | [`LoggingNotifier`] | `AnomalyNotifier` | Logs each alert and keeps a copy |
//! | [`ManualClock`] | `Clock` | Time only moves when told to |
//!
//! The gateway and notifier keep a bounded history of what they received
//! ([`DEFAULT_HISTORY`] entries unless built with `with_history`).
//!
//! ## Dependency rule
//!
//! Depends on `homerule_domain` and `homerule_app` (for port traits).
//! Nothing depends on this crate except the binary.

mod clock;
mod descriptions;
mod gateway;
mod history;
mod notifier;

pub use clock::ManualClock;
pub use descriptions::StaticDescriptions;
pub use gateway::{GatewayCall, VirtualGateway};
pub use history::DEFAULT_HISTORY;
pub use notifier::LoggingNotifier;
