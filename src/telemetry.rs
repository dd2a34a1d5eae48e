//! Telemetry aggregator — derives power, current and voltage per plug.
//!
//! Each plug's [`PowerSource`] says which values are measured; the rest
//! are derived with P = I × V:
//!
//! | Source                      | power        | current        | voltage             |
//! |-----------------------------|--------------|----------------|---------------------|
//! | `DirectPower`               | sensor       | sensor or P/V  | sensor or nominal   |
//! | `CurrentVoltagePair`        | I × V        | sensor         | sensor              |
//! | `CurrentWithNominalVoltage` | I × V        | sensor         | nominal             |
//!
//! A sensor without a reading never blocks or faults: the last value seen
//! for that sensor is used, then a fallback (zero, or nominal voltage).

use log::debug;

use crate::app::ports::SensorPort;
use crate::error::ProtocolError;
use crate::plug::{Plug, PowerSource, SensorRef};

/// Distinct sensors whose last value is remembered.
const LAST_KNOWN_CAP: usize = 32;

/// One electrical snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Watts.
    pub power: f32,
    /// Amps.
    pub current: f32,
    /// Volts.
    pub voltage: f32,
}

/// Stateful aggregator; remembers the last good value of every sensor.
#[derive(Debug, Default)]
pub struct TelemetryAggregator {
    last_known: heapless::FnvIndexMap<SensorRef, f32, LAST_KNOWN_CAP>,
}

impl TelemetryAggregator {
    pub fn new() -> Self {
        Self {
            last_known: heapless::FnvIndexMap::new(),
        }
    }

    /// Compute `{power, current, voltage}` for `plug`.
    pub fn read(&mut self, plug: &Plug, sensors: &impl SensorPort) -> Reading {
        let nominal = plug.nominal_voltage();
        match plug.power_source() {
            PowerSource::DirectPower {
                power,
                current,
                voltage,
            } => {
                let power = self.sample_or(power, sensors, 0.0);
                let voltage = voltage.map_or(nominal, |v| self.sample_or(v, sensors, nominal));
                let derived = current_from(power, voltage);
                let current = current.map_or(derived, |c| self.sample_or(c, sensors, derived));
                Reading {
                    power,
                    current,
                    voltage,
                }
            }
            PowerSource::CurrentVoltagePair { current, voltage } => {
                let current = self.sample_or(current, sensors, 0.0);
                let voltage = self.sample_or(voltage, sensors, nominal);
                Reading {
                    power: current * voltage,
                    current,
                    voltage,
                }
            }
            PowerSource::CurrentWithNominalVoltage { current } => {
                let current = self.sample_or(current, sensors, 0.0);
                Reading {
                    power: current * nominal,
                    current,
                    voltage: nominal,
                }
            }
        }
    }

    /// Live value for `sensor`, remembering it on success.
    pub fn sample(
        &mut self,
        sensor: SensorRef,
        sensors: &impl SensorPort,
    ) -> Result<f32, ProtocolError> {
        match sensors.reading(sensor) {
            Some(v) if v.is_finite() => {
                // A full cache only loses memory for new sensors; the live
                // value is still returned.
                let _ = self.last_known.insert(sensor, v);
                Ok(v)
            }
            _ => Err(ProtocolError::SensorUnavailable),
        }
    }

    /// Live value, else last known, else `fallback`.
    fn sample_or(&mut self, sensor: SensorRef, sensors: &impl SensorPort, fallback: f32) -> f32 {
        match self.sample(sensor, sensors) {
            Ok(v) => v,
            Err(e) => {
                let v = self.last_known.get(&sensor).copied().unwrap_or(fallback);
                debug!("Telemetry: sensor {} {}, using {:.2}", sensor.0, e, v);
                v
            }
        }
    }
}

/// I = P / V, with zero, negative or non-finite voltage yielding 0 A.
fn current_from(power: f32, voltage: f32) -> f32 {
    if voltage.is_finite() && voltage > f32::EPSILON {
        power / voltage
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Table(HashMap<u8, f32>);

    impl Table {
        fn with(mut self, idx: u8, v: f32) -> Self {
            self.0.insert(idx, v);
            self
        }
    }

    impl SensorPort for Table {
        fn reading(&self, sensor: SensorRef) -> Option<f32> {
            self.0.get(&sensor.0).copied()
        }
    }

    fn plug(source: PowerSource) -> Plug {
        Plug::new("test", source).unwrap()
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn current_voltage_pair_multiplies() {
        let p = plug(PowerSource::CurrentVoltagePair {
            current: SensorRef(0),
            voltage: SensorRef(1),
        });
        let s = Table::default().with(0, 2.0).with(1, 120.0);
        let r = TelemetryAggregator::new().read(&p, &s);
        assert!(approx(r.power, 240.0));
        assert!(approx(r.current, 2.0));
        assert!(approx(r.voltage, 120.0));
    }

    #[test]
    fn direct_power_derives_current_from_nominal() {
        let p = plug(PowerSource::DirectPower {
            power: SensorRef(0),
            current: None,
            voltage: None,
        });
        let s = Table::default().with(0, 100.0);
        let r = TelemetryAggregator::new().read(&p, &s);
        assert!(approx(r.power, 100.0));
        assert!(approx(r.voltage, 120.0));
        assert!(approx(r.current, 0.833));
    }

    #[test]
    fn direct_power_prefers_bound_current_and_voltage() {
        let p = plug(PowerSource::DirectPower {
            power: SensorRef(0),
            current: Some(SensorRef(1)),
            voltage: Some(SensorRef(2)),
        });
        let s = Table::default().with(0, 500.0).with(1, 2.1).with(2, 238.0);
        let r = TelemetryAggregator::new().read(&p, &s);
        assert!(approx(r.current, 2.1));
        assert!(approx(r.voltage, 238.0));
    }

    #[test]
    fn nominal_voltage_path_uses_configured_constant() {
        let p = plug(PowerSource::CurrentWithNominalVoltage {
            current: SensorRef(4),
        })
        .with_nominal_voltage(230.0);
        let s = Table::default().with(4, 1.5);
        let r = TelemetryAggregator::new().read(&p, &s);
        assert!(approx(r.voltage, 230.0));
        assert!(approx(r.power, 345.0));
    }

    #[test]
    fn zero_voltage_sensor_gives_zero_current() {
        let p = plug(PowerSource::DirectPower {
            power: SensorRef(0),
            current: None,
            voltage: Some(SensorRef(1)),
        });
        let s = Table::default().with(0, 60.0).with(1, 0.0);
        let r = TelemetryAggregator::new().read(&p, &s);
        assert_eq!(r.current, 0.0);
        assert!(r.current.is_finite());
    }

    #[test]
    fn unavailable_sensor_falls_back_to_last_known_then_zero() {
        let p = plug(PowerSource::CurrentWithNominalVoltage {
            current: SensorRef(0),
        });
        let mut agg = TelemetryAggregator::new();

        let never = agg.read(&p, &Table::default());
        assert_eq!(never.current, 0.0);
        assert_eq!(never.power, 0.0);

        agg.read(&p, &Table::default().with(0, 3.0));
        let stale = agg.read(&p, &Table::default());
        assert!(approx(stale.current, 3.0));
        assert!(approx(stale.power, 360.0));
    }

    #[test]
    fn non_finite_reading_is_unavailable() {
        let mut agg = TelemetryAggregator::new();
        let s = Table::default().with(0, f32::NAN);
        assert_eq!(
            agg.sample(SensorRef(0), &s),
            Err(ProtocolError::SensorUnavailable)
        );
    }

    #[test]
    fn missing_voltage_sensor_falls_back_to_nominal() {
        let p = plug(PowerSource::CurrentVoltagePair {
            current: SensorRef(0),
            voltage: SensorRef(1),
        });
        let s = Table::default().with(0, 1.0);
        let r = TelemetryAggregator::new().read(&p, &s);
        assert!(approx(r.voltage, 120.0));
        assert!(approx(r.power, 120.0));
    }
}
