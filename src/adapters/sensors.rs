//! In-memory sensor table.
//!
//! Plugs never own sensors: they hold [`SensorRef`] indices into this
//! table, which implements [`SensorPort`]. Whatever produces readings
//! (an ADC driver or a metering IC) publishes into it once per tick.
//! Host builds have a `SimulatedMeter` that does the same with synthetic
//! loads; it does not exist in device firmware.
//!
//! A slot that has never been published, or was invalidated, reads as
//! `None` and the telemetry layer falls back to its last known value.

use log::debug;
#[cfg(not(target_os = "espidf"))]
use log::info;

use crate::app::ports::SensorPort;
#[cfg(not(target_os = "espidf"))]
use crate::config::EmulatorConfig;
pub use crate::plug::MAX_SENSORS;
use crate::plug::SensorRef;

// ───────────────────────────────────────────────────────────────
// SensorTable
// ───────────────────────────────────────────────────────────────

pub struct SensorTable {
    slots: [Option<f32>; MAX_SENSORS],
}

impl Default for SensorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorTable {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_SENSORS],
        }
    }

    /// Store a fresh reading. Out-of-range indices are ignored.
    pub fn publish(&mut self, sensor: SensorRef, value: f32) {
        if let Some(slot) = self.slots.get_mut(usize::from(sensor.0)) {
            *slot = Some(value);
        } else {
            debug!("Sensors: index {} out of range, ignored", sensor.0);
        }
    }

    /// Mark a sensor as having no state.
    pub fn invalidate(&mut self, sensor: SensorRef) {
        if let Some(slot) = self.slots.get_mut(usize::from(sensor.0)) {
            *slot = None;
        }
    }

    /// Slots that currently hold a value.
    pub fn populated(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl SensorPort for SensorTable {
    fn reading(&self, sensor: SensorRef) -> Option<f32> {
        self.slots.get(usize::from(sensor.0)).copied().flatten()
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated meter (host only)
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantity {
    Power,
    Current,
    Voltage,
}

/// Synthetic readings for every sensor the configuration binds.
///
/// Each plug gets a slowly oscillating load around its own base
/// wattage, and voltages hover near the plug's nominal value.
#[cfg(not(target_os = "espidf"))]
pub struct SimulatedMeter {
    bindings: heapless::Vec<(SensorRef, Quantity, f32), MAX_SENSORS>,
}

#[cfg(not(target_os = "espidf"))]
impl SimulatedMeter {
    /// Collect the sensor bindings of every configured plug.
    pub fn from_config(config: &EmulatorConfig) -> Self {
        let mut bindings = heapless::Vec::new();
        for (i, plug) in config.plugs.iter().enumerate() {
            let base_watts = 60.0 + 45.0 * i as f32;
            let wanted = [
                (plug.power_sensor, Quantity::Power, base_watts),
                (
                    plug.current_sensor,
                    Quantity::Current,
                    base_watts / plug.voltage,
                ),
                (plug.voltage_sensor, Quantity::Voltage, plug.voltage),
            ];
            for (sensor, quantity, base) in wanted {
                let Some(sensor) = sensor else { continue };
                if bindings.iter().any(|(s, _, _)| *s == sensor) {
                    continue;
                }
                let _ = bindings.push((sensor, quantity, base));
            }
        }
        info!("Sensors(sim): {} simulated sensor(s)", bindings.len());
        Self { bindings }
    }

    /// Publish one round of readings for time `now_ms`.
    pub fn update(&self, table: &mut SensorTable, now_ms: u64) {
        let t = (now_ms % 60_000) as f32 / 60_000.0 * core::f32::consts::TAU;
        for &(sensor, quantity, base) in &self.bindings {
            let swing = match quantity {
                Quantity::Power | Quantity::Current => 0.2,
                Quantity::Voltage => 0.01,
            };
            table.publish(sensor, base * (1.0 + swing * t.sin()));
        }
    }
}
