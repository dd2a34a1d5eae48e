//! Discovery responder.
//!
//! Hubs find plugs by broadcasting a read-only query to port 9999. Every
//! registered plug answers on its own, exactly as a room full of real
//! HS110s would. Each answer always carries `system.get_sysinfo` so the
//! hub can bind readings to a MAC and alias; `emeter.get_realtime` is
//! added when the query asked for it (the Sense poll).
//!
//! ```text
//!   Idle ──broadcast──▶ ReceivedBroadcast ──▶ Responding ──done──▶ Idle
//! ```
//!
//! Stateless between requests and best-effort: no retry, no pacing.

use log::{debug, info};

use crate::app::events::EmulatorEvent;
use crate::app::ports::{ClockPort, EventSink, SensorPort};
use crate::plug::mac::MacString;
use crate::plug::registry::{MAX_PLUG_COUNT, PlugRegistry};
use crate::plug::{DeviceId, Plug, PlugName};
use crate::protocol::codec::Encoding;
use crate::protocol::request::{Request, Verb};
use crate::protocol::response::{Realtime, ReplyDoc, SysInfo, to_leaf};
use crate::protocol::{Reply, Replies};
use crate::telemetry::TelemetryAggregator;

/// Responder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    ReceivedBroadcast,
    Responding,
}

/// Capability flags advertised in `feature`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub timer: bool,
    pub energy_meter: bool,
}

impl Capabilities {
    /// Every emulated plug is an energy-monitoring HS110.
    pub const HS110: Self = Self {
        timer: true,
        energy_meter: true,
    };

    pub const fn feature(self) -> &'static str {
        match (self.timer, self.energy_meter) {
            (true, true) => "TIM:ENE",
            (true, false) => "TIM",
            (false, true) => "ENE",
            (false, false) => "",
        }
    }
}

/// Identity summary of one plug, built per request.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRecord {
    pub alias: PlugName,
    pub mac: Option<MacString>,
    pub device_id: DeviceId,
    pub relay_on: bool,
    pub led_off: bool,
    pub on_time_secs: u64,
    pub capabilities: Capabilities,
}

impl DiscoveryRecord {
    pub fn from_plug(plug: &Plug, now_ms: u64) -> Self {
        let mut alias = PlugName::new();
        let _ = alias.push_str(plug.name());
        Self {
            alias,
            mac: plug.mac_string(),
            device_id: plug.device_id(),
            relay_on: plug.relay_on(),
            led_off: plug.led_off(),
            on_time_secs: plug.on_time_secs(now_ms),
            capabilities: Capabilities::HS110,
        }
    }
}

/// Answers broadcast queries with one reply per plug.
#[derive(Debug)]
pub struct DiscoveryResponder {
    state: DiscoveryState,
    answered: u32,
}

impl Default for DiscoveryResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryResponder {
    pub fn new() -> Self {
        Self {
            state: DiscoveryState::Idle,
            answered: 0,
        }
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Broadcasts answered since boot.
    pub fn answered(&self) -> u32 {
        self.answered
    }

    /// Identity records for every registered plug, in registry order.
    pub fn records(
        registry: &PlugRegistry,
        now_ms: u64,
    ) -> heapless::Vec<DiscoveryRecord, MAX_PLUG_COUNT> {
        registry
            .list_all()
            .iter()
            .map(|p| DiscoveryRecord::from_plug(p, now_ms))
            .collect()
    }

    /// Build the per-plug replies to a discovery query.
    pub fn respond(
        &mut self,
        request: &Request,
        registry: &PlugRegistry,
        telemetry: &mut TelemetryAggregator,
        sensors: &impl SensorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Replies {
        self.transition(DiscoveryState::ReceivedBroadcast);
        let with_realtime = request.wants(Verb::GetRealtime);
        let now_ms = clock.uptime_ms();

        self.transition(DiscoveryState::Responding);
        let mut replies = Replies::new();
        for plug in registry.list_all() {
            let record = DiscoveryRecord::from_plug(plug, now_ms);
            let mut doc = ReplyDoc::new();
            doc.put(
                Verb::GetSysinfo.module(),
                Verb::GetSysinfo.method(),
                to_leaf(&SysInfo::from(&record)),
            );
            if with_realtime {
                let reading = telemetry.read(plug, sensors);
                doc.put(
                    Verb::GetRealtime.module(),
                    Verb::GetRealtime.method(),
                    to_leaf(&Realtime::from(reading)),
                );
            }
            let encoding = Encoding::for_plug(plug.encrypt_enabled());
            if let Some(payload) = doc.encode(encoding) {
                let _ = replies.push(Reply {
                    plug: Some(plug.id()),
                    payload,
                });
            }
        }

        self.answered = self.answered.wrapping_add(1);
        sink.emit(&EmulatorEvent::DiscoveryAnswered {
            records: replies.len(),
        });
        info!(
            "Discovery: answered {} with {} record(s){}",
            self.answered,
            replies.len(),
            if with_realtime { " + realtime" } else { "" }
        );
        self.transition(DiscoveryState::Idle);
        replies
    }

    fn transition(&mut self, next: DiscoveryState) {
        debug!("Discovery: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plug::{PowerSource, SensorRef};
    use crate::protocol::codec::decode_datagram;
    use crate::protocol::request::parse_request;
    use serde_json::Value;

    struct Fixed;
    impl SensorPort for Fixed {
        fn reading(&self, _: SensorRef) -> Option<f32> {
            Some(60.0)
        }
    }
    impl ClockPort for Fixed {
        fn uptime_ms(&self) -> u64 {
            5_000
        }
    }

    #[derive(Default)]
    struct Events(Vec<EmulatorEvent>);
    impl EventSink for Events {
        fn emit(&mut self, e: &EmulatorEvent) {
            self.0.push(e.clone());
        }
    }

    fn registry() -> PlugRegistry {
        let src = PowerSource::DirectPower {
            power: SensorRef(0),
            current: None,
            voltage: None,
        };
        let mut r = PlugRegistry::new();
        r.register(
            Plug::new("Heat Pump", src)
                .unwrap()
                .with_mac([0x50, 0x02, 0x91, 0xAA, 0xBB, 0xCC]),
        )
        .unwrap();
        r.register(Plug::new("Dryer", src).unwrap().with_encrypt(false))
            .unwrap();
        r.register(Plug::new("Oven", src).unwrap()).unwrap();
        r
    }

    fn decode(reply: &Reply) -> Value {
        let (json, _) = decode_datagram(&reply.payload).unwrap();
        serde_json::from_slice(&json).unwrap()
    }

    fn run(query: &str) -> (Replies, Events) {
        let reg = registry();
        let req = parse_request(query.as_bytes(), Encoding::Plaintext).unwrap();
        let mut events = Events::default();
        let mut responder = DiscoveryResponder::new();
        let replies = responder.respond(
            &req,
            &reg,
            &mut TelemetryAggregator::new(),
            &Fixed,
            &Fixed,
            &mut events,
        );
        assert_eq!(responder.state(), DiscoveryState::Idle);
        (replies, events)
    }

    #[test]
    fn one_distinct_record_per_plug() {
        let (replies, events) = run(r#"{"system":{"get_sysinfo":{}}}"#);
        assert_eq!(replies.len(), 3);

        let docs: Vec<Value> = replies.iter().map(decode).collect();
        let aliases: Vec<&str> = docs
            .iter()
            .map(|d| d["system"]["get_sysinfo"]["alias"].as_str().unwrap())
            .collect();
        assert_eq!(aliases, ["Heat Pump", "Dryer", "Oven"]);

        assert_eq!(docs[0]["system"]["get_sysinfo"]["mac"], "50:02:91:AA:BB:CC");
        assert!(docs[1]["system"]["get_sysinfo"].get("mac").is_none());
        assert!(docs[0].get("emeter").is_none());

        assert_eq!(events.0, [EmulatorEvent::DiscoveryAnswered { records: 3 }]);
    }

    #[test]
    fn sense_poll_carries_realtime_and_sysinfo() {
        let (replies, _) = run(r#"{"emeter":{"get_realtime":{}}}"#);
        for reply in &replies {
            let doc = decode(reply);
            assert_eq!(doc["emeter"]["get_realtime"]["power"], 60.0);
            assert_eq!(doc["emeter"]["get_realtime"]["current"], 0.5);
            assert_eq!(doc["system"]["get_sysinfo"]["model"], "HS110(US)");
        }
    }

    #[test]
    fn replies_follow_each_plugs_encryption() {
        let (replies, _) = run(r#"{"system":{"get_sysinfo":{}}}"#);
        assert_ne!(replies[0].payload[0], b'{');
        assert_eq!(replies[1].payload[0], b'{');
    }

    #[test]
    fn records_report_on_time() {
        let reg = registry();
        let recs = DiscoveryResponder::records(&reg, 65_000);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].on_time_secs, 65);
        assert_eq!(recs[0].capabilities.feature(), "TIM:ENE");
        assert!(recs[2].mac.is_none());
    }
}
