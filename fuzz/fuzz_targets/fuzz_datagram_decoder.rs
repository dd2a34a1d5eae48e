//! Fuzz target: datagram decode → request parse → service dispatch
//!
//! Every byte string a hub (or an attacker) can put on UDP/9999 must be
//! answered or dropped without panicking, and no reply may exceed what
//! one plug per registry slot can produce.
//!
//! cargo fuzz run fuzz_datagram_decoder

#![no_main]

use espsense::app::events::EmulatorEvent;
use espsense::app::ports::{ClockPort, EventSink, SensorPort};
use espsense::app::service::EmulatorService;
use espsense::config::EmulatorConfig;
use espsense::plug::SensorRef;
use espsense::plug::registry::{MAX_PLUG_COUNT, PlugRegistry};
use libfuzzer_sys::fuzz_target;

struct Fixed;

impl SensorPort for Fixed {
    fn reading(&self, sensor: SensorRef) -> Option<f32> {
        (sensor.0 % 2 == 0).then_some(120.0)
    }
}

impl ClockPort for Fixed {
    fn uptime_ms(&self) -> u64 {
        1_000
    }
}

impl EventSink for Fixed {
    fn emit(&mut self, _event: &EmulatorEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let config = EmulatorConfig::default();
    let Ok(registry) = PlugRegistry::from_config(&config, [0x02, 0, 0, 0, 0, 1]) else {
        return;
    };
    let mut service = EmulatorService::new(registry);

    let replies = service.handle_datagram(data, &Fixed, &Fixed, &mut Fixed);
    assert!(replies.len() <= MAX_PLUG_COUNT);
    for reply in &replies {
        assert!(!reply.payload.is_empty(), "replies are never empty");
    }
});
