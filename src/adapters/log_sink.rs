//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing emulator events to the logger
//! (UART / USB-CDC on the device, stderr in simulation). Routine traffic
//! goes to `debug`, state changes to `info`, anomalies to `warn`.

use log::{debug, info, warn};

use crate::app::events::EmulatorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`EmulatorEvent`] to the console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &EmulatorEvent) {
        match event {
            EmulatorEvent::Started { plugs } => {
                info!("START | plugs={}", plugs);
            }
            EmulatorEvent::DiscoveryAnswered { records } => {
                debug!("DISCO | records={}", records);
            }
            EmulatorEvent::CommandHandled { plug, verb } => {
                debug!("CMD   | plug={} {}.{}", plug, verb.module(), verb.method());
            }
            EmulatorEvent::RelayChanged { plug, on } => {
                info!("RELAY | {} -> {}", plug, if *on { "ON" } else { "OFF" });
            }
            EmulatorEvent::UnknownPlug { target } => {
                warn!("CMD   | unknown child id {:?}", target.as_str());
            }
            EmulatorEvent::RequestDropped(e) => {
                debug!("DROP  | {}", e);
            }
            EmulatorEvent::RepliesThrottled { dropped } => {
                warn!("RATE  | {} reply(ies) dropped", dropped);
            }
        }
    }
}
