//! Device gateway port — the outbound edge towards physical actuators.

use std::future::Future;
use std::sync::Arc;

use homerule_domain::action::ClimateState;

/// Why the gateway refused or failed a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The device or its bridge could not be reached.
    #[error("device at `{target}` is unreachable")]
    Unreachable { target: String },

    /// The device answered with a non-success response.
    #[error("device at `{target}` rejected the command: {reason}")]
    Rejected { target: String, reason: String },
}

/// Drives actuators. Latency and transport are opaque to the engine; only
/// success or failure matters.
pub trait DeviceGateway: Send + Sync + 'static {
    /// Apply a climate state to the unit at `location`.
    fn set_climate_state(
        &self,
        location: &str,
        state: &ClimateState,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Switch the lights at `location`.
    fn set_light_state(
        &self,
        location: &str,
        on: bool,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Deliver a text notification.
    fn send_notification(
        &self,
        address: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

impl<T: DeviceGateway> DeviceGateway for Arc<T> {
    fn set_climate_state(
        &self,
        location: &str,
        state: &ClimateState,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).set_climate_state(location, state)
    }

    fn set_light_state(
        &self,
        location: &str,
        on: bool,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).set_light_state(location, on)
    }

    fn send_notification(
        &self,
        address: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).send_notification(address, message)
    }
}
