//! Commands: targeted requests, relay and LED state, error replies and
//! dropped input, all through the polled server.

use espsense::app::events::EmulatorEvent;
use espsense::error::{MalformedReason, ProtocolError};
use espsense::protocol::cipher;
use espsense::protocol::codec::Encoding;

use super::mock_net::{FixedClock, Rig, THREE_PLUGS};

#[test]
fn targeted_realtime_answers_only_the_named_plug() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(
        r#"{"context":{"child_ids":["Water Heater"]},"emeter":{"get_realtime":{}}}"#,
        Encoding::Encrypted,
    );
    assert_eq!(replies.len(), 1);
    let rt = &replies[0].0["emeter"]["get_realtime"];
    assert_eq!(rt["current"], 10.0);
    assert_eq!(rt["power"], 2400.0);
}

#[test]
fn plug_can_be_addressed_by_mac() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(
        r#"{"context":{"child_ids":["50:C7:BF:00:00:03"]},"system":{"get_sysinfo":{}}}"#,
        Encoding::Plaintext,
    );
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0["system"]["get_sysinfo"]["alias"], "Garage Freezer");
    assert_eq!(replies[0].1, Encoding::Plaintext);
}

#[test]
fn relay_off_then_on_resets_on_time() {
    let mut rig = Rig::new(THREE_PLUGS);
    let off = rig.exchange(
        r#"{"context":{"child_ids":["Heat Pump"]},"system":{"set_relay_state":{"state":0}}}"#,
        Encoding::Encrypted,
    );
    assert_eq!(off[0].0["system"]["set_relay_state"]["err_code"], 0);
    assert!(rig.events.0.contains(&EmulatorEvent::RelayChanged {
        plug: "Heat Pump".try_into().unwrap(),
        on: false,
    }));

    rig.clock = FixedClock(10_000);
    rig.exchange(
        r#"{"context":{"child_ids":["Heat Pump"]},"system":{"set_relay_state":{"state":1}}}"#,
        Encoding::Encrypted,
    );

    rig.clock = FixedClock(13_500);
    let info = rig.exchange(
        r#"{"context":{"child_ids":["Heat Pump"]},"system":{"get_sysinfo":{}}}"#,
        Encoding::Encrypted,
    );
    let sys = &info[0].0["system"]["get_sysinfo"];
    assert_eq!(sys["relay_state"], 1);
    assert_eq!(sys["on_time"], 3);
}

#[test]
fn relay_change_is_visible_in_later_discovery() {
    let mut rig = Rig::new(THREE_PLUGS);
    rig.exchange(
        r#"{"context":{"child_ids":["Water Heater"]},"system":{"set_relay_state":{"state":0}}}"#,
        Encoding::Encrypted,
    );
    let replies = rig.exchange(r#"{"system":{"get_sysinfo":{}}}"#, Encoding::Encrypted);
    let states: Vec<_> = replies
        .iter()
        .map(|(v, _)| v["system"]["get_sysinfo"]["relay_state"].as_u64().unwrap())
        .collect();
    assert_eq!(states, [1, 0, 1]);
}

#[test]
fn unknown_plug_gets_an_error_and_others_still_answer() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(
        r#"{"context":{"child_ids":["Pool Pump","Heat Pump"]},"emeter":{"get_realtime":{}}}"#,
        Encoding::Encrypted,
    );
    assert_eq!(replies.len(), 2);

    let error = replies
        .iter()
        .find(|(v, _)| v.get("context").is_some())
        .expect("error reply");
    assert_eq!(error.0["context"]["err_code"], -14);
    assert_eq!(error.0["context"]["child_id"], "Pool Pump");
    assert_eq!(error.1, Encoding::Encrypted);

    let ok = replies
        .iter()
        .find(|(v, _)| v.get("emeter").is_some())
        .expect("realtime reply");
    assert_eq!(ok.0["emeter"]["get_realtime"]["power"], 1500.0);
}

#[test]
fn invalid_relay_argument_leaves_state_unchanged() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(
        r#"{"context":{"child_ids":["Heat Pump"]},"system":{"set_relay_state":{"state":"off"}}}"#,
        Encoding::Encrypted,
    );
    assert_eq!(replies[0].0["system"]["set_relay_state"]["err_code"], -3);
    assert!(rig.service.registry().list_all()[0].relay_on());
}

#[test]
fn unsupported_module_and_method_are_reported() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(
        r#"{"context":{"child_ids":["Heat Pump"]},"schedule":{"get_rules":{}},"system":{"reboot":{}}}"#,
        Encoding::Encrypted,
    );
    assert_eq!(replies.len(), 1);
    let v = &replies[0].0;
    assert_eq!(v["schedule"]["err_code"], -1);
    assert_eq!(v["system"]["reboot"]["err_code"], -2);
}

#[test]
fn wrongly_encrypted_payload_is_dropped_without_reply() {
    let mut rig = Rig::new(THREE_PLUGS);
    // Two autokey layers: a single decrypt never yields JSON.
    let twice = cipher::encrypt(&cipher::encrypt(br#"{"system":{"get_sysinfo":{}}}"#));
    rig.server.transport_mut().push(twice);
    rig.server
        .poll(&mut rig.service, &rig.sensors, &rig.clock, &mut rig.events);

    assert!(rig.server.transport().sent.is_empty());
    assert!(rig
        .events
        .0
        .iter()
        .any(|e| matches!(e, EmulatorEvent::RequestDropped(ProtocolError::MalformedDatagram(_)))));
    assert_eq!(rig.service.stats().dropped, 1);
}

#[test]
fn json_array_is_not_a_request() {
    let mut rig = Rig::new(THREE_PLUGS);
    assert!(rig.exchange("[1,2,3]", Encoding::Encrypted).is_empty());
    assert!(rig.events.0.contains(&EmulatorEvent::RequestDropped(
        ProtocolError::MalformedDatagram(MalformedReason::NotObject)
    )));
}

#[test]
fn backlog_drains_over_several_ticks() {
    let mut rig = Rig::new(
        r#"{ "max_datagrams_per_tick": 2,
             "plugs": [ { "name": "Solo", "power_sensor": 0, "encrypt": false } ] }"#,
    );
    for _ in 0..5 {
        rig.server
            .transport_mut()
            .push(br#"{"system":{"get_sysinfo":{}}}"#.to_vec());
    }

    let mut ticks = 0;
    while !rig.server.transport().inbox.is_empty() {
        let stats = rig
            .server
            .poll(&mut rig.service, &rig.sensors, &rig.clock, &mut rig.events);
        assert!(stats.received <= 2);
        ticks += 1;
    }
    assert_eq!(ticks, 3);
    assert_eq!(rig.server.transport().sent.len(), 5);
}

#[test]
fn non_list_child_ids_never_fan_out_to_every_plug() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(
        r#"{"context":{"child_ids":"Heat Pump"},"system":{"set_relay_state":{"state":0}}}"#,
        Encoding::Encrypted,
    );
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0["context"]["err_code"], -14);
    assert!(rig
        .service
        .registry()
        .list_all()
        .iter()
        .all(|p| p.relay_on()));
}

#[test]
fn unresolvable_child_ids_are_answered_not_dropped() {
    let mut rig = Rig::new(THREE_PLUGS);
    let numeric = rig.exchange(
        r#"{"context":{"child_ids":[42]},"system":{"set_relay_state":{"state":0}}}"#,
        Encoding::Encrypted,
    );
    assert_eq!(numeric.len(), 1);
    assert_eq!(numeric[0].0["context"]["child_id"], "42");

    let empty = rig.exchange(
        r#"{"context":{"child_ids":[]},"system":{"get_sysinfo":{}}}"#,
        Encoding::Encrypted,
    );
    assert_eq!(empty.len(), 1);
    assert_eq!(empty[0].0["context"]["err_code"], -14);
}
