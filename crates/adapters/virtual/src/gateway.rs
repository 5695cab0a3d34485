//! Virtual device gateway — climate units, lights and an outbox.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use homerule_app::ports::{DeviceGateway, GatewayError};
use homerule_domain::action::ClimateState;
use homerule_domain::event::normalize_name;

use crate::history::History;

/// One call received by the gateway, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Climate { location: String, state: ClimateState },
    Light { location: String, on: bool },
    Notification { address: String, message: String },
}

#[derive(Debug, Default)]
struct Devices {
    climate: HashMap<String, ClimateState>,
    lights: HashMap<String, bool>,
    outbox: History<(String, String)>,
    offline: HashSet<String>,
    calls: History<GatewayCall>,
}

/// Simulated actuators kept in memory.
///
/// Any target (location or address) can be marked offline, after which
/// calls to it fail with [`GatewayError::Unreachable`] and leave the
/// simulated state untouched.
///
/// The outbox and call log keep only the most recent
/// [`DEFAULT_HISTORY`](crate::DEFAULT_HISTORY) entries unless
/// [`with_history`](Self::with_history) says otherwise.
#[derive(Debug, Default)]
pub struct VirtualGateway {
    devices: Mutex<Devices>,
    latency: Option<Duration>,
}

impl VirtualGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the last `limit` outbox entries and calls; `0` keeps none.
    #[must_use]
    pub fn with_history(limit: usize) -> Self {
        Self {
            devices: Mutex::new(Devices {
                outbox: History::with_limit(limit),
                calls: History::with_limit(limit),
                ..Devices::default()
            }),
            latency: None,
        }
    }

    /// Delay every call by `latency` to mimic a slow bridge.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Mark `target` reachable or not.
    pub fn set_offline(&self, target: &str, offline: bool) {
        let target = normalize_name(target);
        let mut devices = self.lock();
        if offline {
            devices.offline.insert(target);
        } else {
            devices.offline.remove(&target);
        }
    }

    /// Current state of the climate unit at `location`, if it was ever set.
    #[must_use]
    pub fn climate_state(&self, location: &str) -> Option<ClimateState> {
        self.lock().climate.get(&normalize_name(location)).copied()
    }

    /// Whether the lights at `location` are on, if they were ever switched.
    #[must_use]
    pub fn light_state(&self, location: &str) -> Option<bool> {
        self.lock().lights.get(&normalize_name(location)).copied()
    }

    /// Recently delivered notifications as `(address, message)`, oldest
    /// first.
    #[must_use]
    pub fn outbox(&self) -> Vec<(String, String)> {
        self.lock().outbox.to_vec()
    }

    /// Recent calls received, including failed ones.
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.to_vec()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Devices> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(
        &self,
        target: &str,
        call: GatewayCall,
        update: impl FnOnce(&mut Devices),
    ) -> Result<(), GatewayError> {
        let mut devices = self.lock();
        devices.calls.push(call);
        if devices.offline.contains(&normalize_name(target)) {
            tracing::warn!(device = target, "virtual device offline");
            return Err(GatewayError::Unreachable {
                target: target.to_string(),
            });
        }
        update(&mut devices);
        Ok(())
    }
}

impl DeviceGateway for VirtualGateway {
    async fn set_climate_state(
        &self,
        location: &str,
        state: &ClimateState,
    ) -> Result<(), GatewayError> {
        self.simulate_latency().await;
        let state = *state;
        let call = GatewayCall::Climate {
            location: location.to_string(),
            state,
        };
        self.apply(location, call, |devices| {
            devices.climate.insert(normalize_name(location), state);
        })?;
        tracing::info!(location, %state, "virtual climate unit updated");
        Ok(())
    }

    async fn set_light_state(&self, location: &str, on: bool) -> Result<(), GatewayError> {
        self.simulate_latency().await;
        let call = GatewayCall::Light {
            location: location.to_string(),
            on,
        };
        self.apply(location, call, |devices| {
            devices.lights.insert(normalize_name(location), on);
        })?;
        tracing::info!(location, on, "virtual light switched");
        Ok(())
    }

    async fn send_notification(&self, address: &str, message: &str) -> Result<(), GatewayError> {
        self.simulate_latency().await;
        let call = GatewayCall::Notification {
            address: address.to_string(),
            message: message.to_string(),
        };
        self.apply(address, call, |devices| {
            devices
                .outbox
                .push((address.to_string(), message.to_string()));
        })?;
        tracing::info!(address, message, "virtual notification sent");
        Ok(())
    }
}
