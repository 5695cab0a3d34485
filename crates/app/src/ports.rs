//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the engine and the outside world. They
//! are defined here (in `app`) so that both the engine and the adapters can
//! depend on them without creating circular dependencies.

pub mod anomaly_descriptions;
pub mod anomaly_notifier;
pub mod clock;
pub mod device_gateway;

pub use anomaly_descriptions::{AnomalyDescriptionLookup, LookupError, NoDescriptions};
pub use anomaly_notifier::{AnomalyAlert, AnomalyNotifier};
pub use clock::{Clock, SystemClock};
pub use device_gateway::{DeviceGateway, GatewayError};
