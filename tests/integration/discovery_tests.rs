//! Discovery: broadcast query → one reply per plug, each in that plug's
//! encoding, carrying its configured identity.

use espsense::app::events::EmulatorEvent;
use espsense::protocol::codec::Encoding;

use super::mock_net::{Rig, THREE_PLUGS};

const SYSINFO: &str = r#"{"system":{"get_sysinfo":{}}}"#;
const SYSINFO_AND_REALTIME: &str = r#"{"system":{"get_sysinfo":{}},"emeter":{"get_realtime":{}}}"#;

#[test]
fn broadcast_yields_one_record_per_plug() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(SYSINFO, Encoding::Encrypted);

    assert_eq!(replies.len(), 3);
    let aliases: Vec<_> = replies
        .iter()
        .map(|(v, _)| v["system"]["get_sysinfo"]["alias"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(aliases, ["Heat Pump", "Water Heater", "Garage Freezer"]);

    for (v, _) in &replies {
        let info = &v["system"]["get_sysinfo"];
        assert_eq!(info["err_code"], 0);
        assert_eq!(info["model"], "HS110(US)");
        assert_eq!(info["type"], "IOT.SMARTPLUGSWITCH");
        assert_eq!(info["relay_state"], 1);
    }
    assert!(rig
        .events
        .0
        .contains(&EmulatorEvent::DiscoveryAnswered { records: 3 }));
}

#[test]
fn records_carry_hardware_configured_and_synthesised_macs() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(SYSINFO, Encoding::Encrypted);

    let macs: Vec<_> = replies
        .iter()
        .map(|(v, _)| v["system"]["get_sysinfo"]["mac"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(macs[0], "24:0A:C4:11:22:33");
    assert_eq!(macs[2], "50:C7:BF:00:00:03");
    assert_ne!(macs[1], macs[0]);
    assert_ne!(macs[1], macs[2]);
}

#[test]
fn mac_is_absent_when_assignment_is_disabled() {
    let mut rig = Rig::new(
        r#"{ "assign_missing_macs": false,
             "plugs": [ { "name": "Bare", "power_sensor": 0 } ] }"#,
    );
    let replies = rig.exchange(SYSINFO, Encoding::Encrypted);
    assert_eq!(replies.len(), 1);
    let info = &replies[0].0["system"]["get_sysinfo"];
    assert!(info.get("mac").is_none());
    assert_eq!(info["alias"], "Bare");
}

#[test]
fn each_reply_uses_its_plugs_encoding() {
    let mut rig = Rig::new(THREE_PLUGS);
    let encodings: Vec<_> = rig
        .exchange(SYSINFO, Encoding::Encrypted)
        .into_iter()
        .map(|(_, e)| e)
        .collect();
    assert_eq!(
        encodings,
        [Encoding::Encrypted, Encoding::Encrypted, Encoding::Plaintext]
    );
}

#[test]
fn plaintext_broadcast_is_also_answered() {
    let mut rig = Rig::new(THREE_PLUGS);
    assert_eq!(rig.exchange(SYSINFO, Encoding::Plaintext).len(), 3);
}

#[test]
fn realtime_rides_along_when_requested() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(SYSINFO_AND_REALTIME, Encoding::Encrypted);
    assert_eq!(replies.len(), 3);

    let heat_pump = &replies[0].0["emeter"]["get_realtime"];
    assert_eq!(heat_pump["power"], 1500.0);
    assert_eq!(heat_pump["voltage"], 230.0);
    assert_eq!(heat_pump["current"], 6.52);

    let water_heater = &replies[1].0["emeter"]["get_realtime"];
    assert_eq!(water_heater["power"], 2400.0);
    assert_eq!(water_heater["voltage"], 240.0);

    let freezer = &replies[2].0["emeter"]["get_realtime"];
    assert_eq!(freezer["power"], 115.0);
    assert_eq!(freezer["err_code"], 0);
}

#[test]
fn sysinfo_only_broadcast_has_no_emeter_section() {
    let mut rig = Rig::new(THREE_PLUGS);
    let replies = rig.exchange(SYSINFO, Encoding::Encrypted);
    assert!(replies.iter().all(|(v, _)| v.get("emeter").is_none()));
}
