//! Virtual plug model.
//!
//! A [`Plug`] is one emulated HS110 outlet. Its electrical values come
//! from sensors it does not own: each binding is a [`SensorRef`] index
//! into the externally owned sensor table behind
//! [`SensorPort`](crate::app::ports::SensorPort).

pub mod mac;
pub mod registry;

use core::cell::Cell;
use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::config::PlugConfig;
use crate::error::ConfigError;
use mac::{MacAddress, MacString, fnv1_hash, format_mac};

/// Maximum alias length accepted by Kasa hubs.
pub const MAX_NAME_LEN: usize = 32;

/// Plug display name.
pub type PlugName = heapless::String<MAX_NAME_LEN>;

/// Kasa `deviceId` string (a formatted MAC or an 8-digit hash).
pub type DeviceId = MacString;

/// Index of a plug inside the registry.
pub type PlugId = u8;

/// Slots in the sensor table; valid [`SensorRef`] indices are below this.
pub const MAX_SENSORS: usize = 32;

/// Weak reference to an externally owned sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorRef(pub u8);

/// Where a plug's power figure comes from.
///
/// Exactly one variant applies per plug, inferred from the bound sensors
/// with priority power > current+voltage > current+nominal voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    /// A power sensor is bound. Current and voltage sensors are optional
    /// refinements; missing values are derived.
    DirectPower {
        power: SensorRef,
        current: Option<SensorRef>,
        voltage: Option<SensorRef>,
    },
    /// Live current and voltage; power is their product.
    CurrentVoltagePair {
        current: SensorRef,
        voltage: SensorRef,
    },
    /// Live current against the configured nominal voltage.
    CurrentWithNominalVoltage { current: SensorRef },
}

impl PowerSource {
    /// Infer the variant from the optional sensor bindings.
    /// Returns `None` when no qualifying combination is bound.
    pub fn infer(
        power: Option<SensorRef>,
        current: Option<SensorRef>,
        voltage: Option<SensorRef>,
    ) -> Option<Self> {
        match (power, current, voltage) {
            (Some(power), current, voltage) => Some(Self::DirectPower {
                power,
                current,
                voltage,
            }),
            (None, Some(current), Some(voltage)) => {
                Some(Self::CurrentVoltagePair { current, voltage })
            }
            (None, Some(current), None) => Some(Self::CurrentWithNominalVoltage { current }),
            (None, None, _) => None,
        }
    }
}

/// One emulated smart plug.
///
/// Identity and bindings are fixed at startup. Relay and LED state are
/// the only runtime-mutable parts and live in `Cell`s, so the registry
/// can be shared immutably by every component of the single-threaded
/// loop.
#[derive(Debug, Clone)]
pub struct Plug {
    id: PlugId,
    name: PlugName,
    mac: Option<MacAddress>,
    encrypt: bool,
    nominal_voltage: f32,
    power_source: PowerSource,
    relay_on: Cell<bool>,
    led_off: Cell<bool>,
    /// Uptime (ms) at which the relay last switched on.
    relay_on_since_ms: Cell<u64>,
}

impl Plug {
    pub const DEFAULT_NOMINAL_VOLTAGE: f32 = 120.0;

    /// Build a plug with protocol defaults: encrypted, 120 V nominal,
    /// relay on, no MAC.
    pub fn new(name: &str, power_source: PowerSource) -> Result<Self, ConfigError> {
        let mut n = PlugName::new();
        if name.is_empty() {
            return Err(ConfigError::ValidationFailed("plug name must not be empty"));
        }
        n.push_str(name)
            .map_err(|()| ConfigError::ValidationFailed("plug name longer than 32 bytes"))?;

        Ok(Self {
            id: 0,
            name: n,
            mac: None,
            encrypt: true,
            nominal_voltage: Self::DEFAULT_NOMINAL_VOLTAGE,
            power_source,
            relay_on: Cell::new(true),
            led_off: Cell::new(false),
            relay_on_since_ms: Cell::new(0),
        })
    }

    /// Build a plug from its configuration entry.
    pub fn from_config(cfg: &PlugConfig) -> Result<Self, ConfigError> {
        let source = cfg.power_source().ok_or(ConfigError::ValidationFailed(
            "plug needs a power sensor, current+voltage sensors, or a current sensor",
        ))?;
        let plug = Self::new(cfg.name.as_str(), source)?
            .with_encrypt(cfg.encrypt)
            .with_nominal_voltage(cfg.voltage);
        Ok(match cfg.parsed_mac()? {
            Some(mac) => plug.with_mac(mac),
            None => plug,
        })
    }

    pub fn with_mac(mut self, mac: MacAddress) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn with_nominal_voltage(mut self, volts: f32) -> Self {
        self.nominal_voltage = volts;
        self
    }

    pub(crate) fn set_id(&mut self, id: PlugId) {
        self.id = id;
    }

    pub(crate) fn set_mac(&mut self, mac: MacAddress) {
        self.mac = Some(mac);
    }

    pub fn id(&self) -> PlugId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn mac(&self) -> Option<MacAddress> {
        self.mac
    }

    pub fn mac_string(&self) -> Option<MacString> {
        self.mac.as_ref().map(format_mac)
    }

    /// Kasa `deviceId`: the formatted MAC, or the name hash when no MAC
    /// is known.
    pub fn device_id(&self) -> DeviceId {
        match &self.mac {
            Some(mac) => format_mac(mac),
            None => {
                let mut id = DeviceId::new();
                let _ = write!(id, "{:08X}", fnv1_hash(self.name.as_str()));
                id
            }
        }
    }

    pub fn encrypt_enabled(&self) -> bool {
        self.encrypt
    }

    pub fn nominal_voltage(&self) -> f32 {
        self.nominal_voltage
    }

    pub fn power_source(&self) -> PowerSource {
        self.power_source
    }

    pub fn relay_on(&self) -> bool {
        self.relay_on.get()
    }

    /// Switch the virtual relay. Returns `true` if the state changed.
    pub fn set_relay(&self, on: bool, now_ms: u64) -> bool {
        let changed = self.relay_on.replace(on) != on;
        if changed && on {
            self.relay_on_since_ms.set(now_ms);
        }
        changed
    }

    /// Seconds the relay has been on, or 0 while off.
    pub fn on_time_secs(&self, now_ms: u64) -> u64 {
        if self.relay_on.get() {
            now_ms.saturating_sub(self.relay_on_since_ms.get()) / 1000
        } else {
            0
        }
    }

    pub fn led_off(&self) -> bool {
        self.led_off.get()
    }

    pub fn set_led_off(&self, off: bool) {
        self.led_off.set(off);
    }
}
