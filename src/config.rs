//! Emulator configuration.
//!
//! The plug list mirrors the ESPSense YAML schema: each plug has a name,
//! optional power/current/voltage sensor bindings, a nominal voltage, an
//! encryption flag and an optional MAC. The document is JSON; on the
//! device it is compiled in from `config/espsense.json`, on the host it
//! can be supplied on the command line.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::plug::mac::{MacAddress, parse_mac};
use crate::plug::registry::MAX_PLUG_COUNT;
use crate::plug::{MAX_SENSORS, PowerSource, SensorRef};

/// Default configuration document shipped with the firmware image.
pub const DEFAULT_CONFIG_JSON: &str = include_str!("../config/espsense.json");

/// Kasa local protocol port (UDP and TCP).
pub const KASA_PORT: u16 = 9999;

/// Top-level emulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatorConfig {
    // --- Network ---
    /// Port the UDP (and optional TCP) listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Also serve length-prefixed requests over TCP.
    #[serde(default)]
    pub tcp_enabled: bool,
    /// Station credentials. `None` leaves networking to the platform.
    #[serde(default)]
    pub wifi: Option<WifiConfig>,

    // --- Scheduling ---
    /// Datagrams handled per loop tick before yielding.
    #[serde(default = "default_max_datagrams")]
    pub max_datagrams_per_tick: u8,
    /// Loop tick period (milliseconds).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u32,

    // --- Identity ---
    /// Give MAC-less plugs the hardware MAC (first) or a name-derived one.
    #[serde(default = "default_true")]
    pub assign_missing_macs: bool,

    // --- Plugs ---
    pub plugs: Vec<PlugConfig>,
}

/// One plug descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlugConfig {
    pub name: heapless::String<32>,
    #[serde(default)]
    pub power_sensor: Option<SensorRef>,
    #[serde(default)]
    pub current_sensor: Option<SensorRef>,
    #[serde(default)]
    pub voltage_sensor: Option<SensorRef>,
    /// Nominal mains voltage used when no voltage sensor is bound.
    #[serde(default = "default_voltage")]
    pub voltage: f32,
    #[serde(default = "default_true")]
    pub encrypt: bool,
    #[serde(default)]
    pub mac_address: Option<heapless::String<17>>,
}

/// Wi-Fi station credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: heapless::String<32>,
    #[serde(default)]
    pub password: heapless::String<64>,
}

fn default_port() -> u16 {
    KASA_PORT
}

fn default_max_datagrams() -> u8 {
    8
}

fn default_tick_interval() -> u32 {
    50
}

fn default_voltage() -> f32 {
    120.0
}

fn default_true() -> bool {
    true
}

impl EmulatorConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every invariant the runtime relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plugs.is_empty() {
            return Err(ConfigError::ValidationFailed("at least one plug is required"));
        }
        if self.plugs.len() > MAX_PLUG_COUNT {
            return Err(ConfigError::TooManyPlugs);
        }
        if self.max_datagrams_per_tick == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_datagrams_per_tick must be at least 1",
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be positive"));
        }
        for (i, plug) in self.plugs.iter().enumerate() {
            plug.validate()?;
            if self.plugs[..i].iter().any(|p| p.name == plug.name) {
                return Err(ConfigError::DuplicatePlug);
            }
        }
        Ok(())
    }
}

impl PlugConfig {
    /// A plug bound only to a power sensor.
    pub fn with_power_sensor(name: &str, sensor: SensorRef) -> Self {
        let mut n = heapless::String::new();
        let _ = n.push_str(name);
        Self {
            name: n,
            power_sensor: Some(sensor),
            current_sensor: None,
            voltage_sensor: None,
            voltage: default_voltage(),
            encrypt: true,
            mac_address: None,
        }
    }

    /// Inferred power source, or `None` if the sensor set is invalid.
    pub fn power_source(&self) -> Option<PowerSource> {
        PowerSource::infer(self.power_sensor, self.current_sensor, self.voltage_sensor)
    }

    /// The configured MAC, parsed.
    pub fn parsed_mac(&self) -> Result<Option<MacAddress>, ConfigError> {
        match &self.mac_address {
            None => Ok(None),
            Some(s) => parse_mac(s)
                .map(Some)
                .ok_or(ConfigError::ValidationFailed("mac_address must be XX:XX:XX:XX:XX:XX")),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationFailed("plug name must not be empty"));
        }
        if !(self.voltage.is_finite() && self.voltage > 0.0) {
            return Err(ConfigError::ValidationFailed("voltage must be a positive number"));
        }
        if self.power_source().is_none() {
            return Err(ConfigError::ValidationFailed(
                "plug needs a power sensor, current+voltage sensors, or a current sensor",
            ));
        }
        let bound = [self.power_sensor, self.current_sensor, self.voltage_sensor];
        if bound.iter().flatten().any(|s| usize::from(s.0) >= MAX_SENSORS) {
            return Err(ConfigError::ValidationFailed("sensor index out of range"));
        }
        self.parsed_mac()?;
        Ok(())
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            port: KASA_PORT,
            tcp_enabled: false,
            wifi: None,
            max_datagrams_per_tick: default_max_datagrams(),
            tick_interval_ms: default_tick_interval(),
            assign_missing_macs: true,
            plugs: vec![PlugConfig::with_power_sensor("ESPSense", SensorRef(0))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = EmulatorConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.port, 9999);
        assert!(c.max_datagrams_per_tick > 0);
    }

    #[test]
    fn shipped_document_is_valid() {
        let c = EmulatorConfig::from_json(DEFAULT_CONFIG_JSON).unwrap();
        assert!(!c.plugs.is_empty());
    }

    #[test]
    fn plug_defaults_match_schema() {
        let c = EmulatorConfig::from_json(
            r#"{ "plugs": [ { "name": "Dryer", "current_sensor": 3 } ] }"#,
        )
        .unwrap();
        let p = &c.plugs[0];
        assert!((p.voltage - 120.0).abs() < f32::EPSILON);
        assert!(p.encrypt);
        assert!(p.mac_address.is_none());
        assert_eq!(
            p.power_source(),
            Some(PowerSource::CurrentWithNominalVoltage {
                current: SensorRef(3)
            })
        );
        assert_eq!(c.port, KASA_PORT);
        assert!(c.assign_missing_macs);
    }

    #[test]
    fn empty_plug_list_rejected() {
        assert!(matches!(
            EmulatorConfig::from_json(r#"{ "plugs": [] }"#),
            Err(ConfigError::ValidationFailed(_))
        ));
    }

    #[test]
    fn voltage_sensor_alone_rejected() {
        let r = EmulatorConfig::from_json(
            r#"{ "plugs": [ { "name": "x", "voltage_sensor": 1 } ] }"#,
        );
        assert!(matches!(r, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn non_positive_voltage_rejected() {
        let r = EmulatorConfig::from_json(
            r#"{ "plugs": [ { "name": "x", "current_sensor": 1, "voltage": 0.0 } ] }"#,
        );
        assert!(matches!(r, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn sensor_index_beyond_table_rejected() {
        for plug in [
            r#"{ "name": "x", "power_sensor": 32 }"#,
            r#"{ "name": "x", "current_sensor": 1, "voltage_sensor": 200 }"#,
        ] {
            let r = EmulatorConfig::from_json(&format!(r#"{{ "plugs": [ {plug} ] }}"#));
            assert_eq!(
                r.unwrap_err(),
                ConfigError::ValidationFailed("sensor index out of range")
            );
        }
        let last = EmulatorConfig::from_json(r#"{ "plugs": [ { "name": "x", "power_sensor": 31 } ] }"#);
        assert!(last.is_ok());
    }

    #[test]
    fn bad_mac_rejected() {
        let r = EmulatorConfig::from_json(
            r#"{ "plugs": [ { "name": "x", "power_sensor": 1, "mac_address": "nope" } ] }"#,
        );
        assert!(matches!(r, Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn too_many_plugs_rejected() {
        let mut c = EmulatorConfig::default();
        c.plugs = (0..=MAX_PLUG_COUNT)
            .map(|i| PlugConfig::with_power_sensor(&format!("p{i}"), SensorRef(0)))
            .collect();
        assert_eq!(c.validate(), Err(ConfigError::TooManyPlugs));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut c = EmulatorConfig::default();
        c.plugs.push(PlugConfig::with_power_sensor("ESPSense", SensorRef(1)));
        assert_eq!(c.validate(), Err(ConfigError::DuplicatePlug));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert_eq!(
            EmulatorConfig::from_json("not json").unwrap_err(),
            ConfigError::Parse
        );
    }

    #[test]
    fn serde_roundtrip() {
        let c = EmulatorConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2 = EmulatorConfig::from_json(&json).unwrap();
        assert_eq!(c.plugs.len(), c2.plugs.len());
        assert_eq!(c.plugs[0].name, c2.plugs[0].name);
        assert_eq!(c.port, c2.port);
    }
}
