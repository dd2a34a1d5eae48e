//! Mock network and sensor adapters for integration tests.
//!
//! [`MockTransport`] plays the role of a socket: tests queue inbound
//! payloads and inspect every reply the server sent, decoded back to
//! JSON.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;

use espsense::app::events::EmulatorEvent;
use espsense::app::ports::{ClockPort, EventSink, SensorPort};
use espsense::app::service::EmulatorService;
use espsense::config::EmulatorConfig;
use espsense::error::TransportError;
use espsense::net::server::Server;
use espsense::net::transport::DatagramTransport;
use espsense::plug::SensorRef;
use espsense::plug::registry::PlugRegistry;
use espsense::protocol::codec::{decode_datagram, encode_payload, Encoding};
use serde_json::Value;

pub const HUB: ([u8; 4], u16) = ([192, 168, 1, 20], 50_123);
pub const HW_MAC: [u8; 6] = [0x24, 0x0A, 0xC4, 0x11, 0x22, 0x33];

// ── Transport ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockTransport {
    pub inbox: VecDeque<(Vec<u8>, SocketAddr)>,
    pub sent: Vec<(Vec<u8>, SocketAddr)>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn push(&mut self, payload: Vec<u8>) {
        self.inbox.push_back((payload, SocketAddr::from(HUB)));
    }

    /// Every reply decoded to JSON, with the encoding it arrived in.
    pub fn replies(&self) -> Vec<(Value, Encoding)> {
        self.sent
            .iter()
            .map(|(wire, _)| {
                let (json, enc) = decode_datagram(wire).expect("reply must decode");
                (serde_json::from_slice(&json).expect("reply must be JSON"), enc)
            })
            .collect()
    }
}

impl DatagramTransport for MockTransport {
    fn recv_from(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, TransportError> {
        Ok(self.inbox.pop_front().map(|(data, peer)| {
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            (n, peer)
        }))
    }

    fn send_to(&mut self, data: &[u8], peer: SocketAddr) -> Result<(), TransportError> {
        self.sent.push((data.to_vec(), peer));
        Ok(())
    }
}

// ── Sensors, clock, events ────────────────────────────────────

#[derive(Default)]
pub struct MockSensors(pub HashMap<u8, f32>);

#[allow(dead_code)]
impl MockSensors {
    pub fn with(mut self, sensor: u8, value: f32) -> Self {
        self.0.insert(sensor, value);
        self
    }
}

impl SensorPort for MockSensors {
    fn reading(&self, sensor: SensorRef) -> Option<f32> {
        self.0.get(&sensor.0).copied()
    }
}

pub struct FixedClock(pub u64);

impl ClockPort for FixedClock {
    fn uptime_ms(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
pub struct RecordingSink(pub Vec<EmulatorEvent>);

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &EmulatorEvent) {
        self.0.push(event.clone());
    }
}

// ── Fixture ───────────────────────────────────────────────────

/// Three plugs: direct power with a shared voltage sensor, current
/// against 240 V nominal, and an unencrypted current+voltage pair with
/// a fixed MAC.
pub const THREE_PLUGS: &str = r#"{
    "plugs": [
        { "name": "Heat Pump", "power_sensor": 0, "voltage_sensor": 1 },
        { "name": "Water Heater", "current_sensor": 2, "voltage": 240.0 },
        { "name": "Garage Freezer", "current_sensor": 3, "voltage_sensor": 1,
          "encrypt": false, "mac_address": "50:C7:BF:00:00:03" }
    ]
}"#;

pub struct Rig {
    pub service: EmulatorService,
    pub server: Server<MockTransport>,
    pub sensors: MockSensors,
    pub clock: FixedClock,
    pub events: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config_json: &str) -> Self {
        let config = EmulatorConfig::from_json(config_json).expect("valid config");
        let registry = PlugRegistry::from_config(&config, HW_MAC).expect("registry");
        let mut events = RecordingSink::default();
        let mut service = EmulatorService::new(registry);
        service.start(&mut events);
        Self {
            service,
            server: Server::new("mock", MockTransport::default(), config.max_datagrams_per_tick),
            sensors: MockSensors::default()
                .with(0, 1500.0)
                .with(1, 230.0)
                .with(2, 10.0)
                .with(3, 0.5),
            clock: FixedClock(0),
            events,
        }
    }

    /// Queue `json` in the given encoding and run one poll.
    pub fn exchange(&mut self, json: &str, encoding: Encoding) -> Vec<(Value, Encoding)> {
        self.server
            .transport_mut()
            .push(encode_payload(json.as_bytes().to_vec(), encoding));
        let before = self.server.transport().sent.len();
        self.server
            .poll(&mut self.service, &self.sensors, &self.clock, &mut self.events);
        self.server.transport().replies().split_off(before)
    }
}
