//! # homerule-app
//!
//! Application layer — the live observer graph and **port definitions**
//! (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceGateway` — drive climate units, lights, notifications
//!   - `AnomalyDescriptionLookup` — map free-text descriptions to anomaly events
//!   - `AnomalyNotifier` — side path taken on an anomaly's rising edge
//!   - `Clock` — the single source of "now"
//! - Hold the **observer graph**: events notify rules, rules trigger actions
//! - Provide **in-process infrastructure** (dispatch queue, conflict arbiter)
//!   that doesn't need IO
//! - Expose the `RuleManager` use-cases
//!
//! ## Dependency rule
//! Depends on `homerule-domain` only (plus `tokio` for channels, locks and
//! the dispatch worker). Never imports adapter crates. Adapters depend on
//! *this* crate, not the reverse.

pub mod action;
pub mod arbiter;
pub mod context;
pub mod dispatch;
pub mod event;
pub mod observer;
pub mod ports;
pub mod registry;
pub mod rule;
pub mod services;
