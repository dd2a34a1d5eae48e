//! HS110 reply bodies.
//!
//! Every plug reply mirrors the request's `module → method` nesting; the
//! leaf is a verb result or an error object:
//!
//! | Case               | Leaf                                                  |
//! |--------------------|-------------------------------------------------------|
//! | success (setters)  | `{"err_code":0}`                                      |
//! | unknown module     | `{"<module>":{"err_code":-1,"err_msg":"module not support"}}` |
//! | unknown method     | `{"err_code":-2,"err_msg":"member not support"}`      |
//! | bad parameters     | `{"err_code":-3,"err_msg":"invalid argument"}`        |
//! | unknown child id   | `{"context":{"err_code":-14,...,"child_id":"..."}}`    |

use serde::Serialize;
use serde_json::{Map, Value, json};

use super::codec::{Encoding, encode_payload};
use crate::discovery::DiscoveryRecord;
use crate::error::ProtocolError;
use crate::telemetry::Reading;

/// Firmware version string reported to hubs.
pub const SW_VERSION: &str = "1.2.5 Build 171213 Rel.101523";
/// Product model emulated.
pub const MODEL: &str = "HS110(US)";
/// Kasa device type for switched outlets.
pub const DEVICE_TYPE: &str = "IOT.SMARTPLUGSWITCH";

/// `system.get_sysinfo` result.
#[derive(Debug, Clone, Serialize)]
pub struct SysInfo {
    pub err_code: i32,
    pub sw_ver: &'static str,
    pub hw_ver: f32,
    #[serde(rename = "type")]
    pub device_type: &'static str,
    pub model: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<heapless::String<17>>,
    #[serde(rename = "deviceId")]
    pub device_id: heapless::String<17>,
    pub alias: heapless::String<32>,
    pub relay_state: u8,
    pub on_time: u64,
    pub led_off: u8,
    pub feature: &'static str,
    pub updating: u8,
}

impl From<&DiscoveryRecord> for SysInfo {
    fn from(r: &DiscoveryRecord) -> Self {
        Self {
            err_code: 0,
            sw_ver: SW_VERSION,
            hw_ver: 1.0,
            device_type: DEVICE_TYPE,
            model: MODEL,
            mac: r.mac.clone(),
            device_id: r.device_id.clone(),
            alias: r.alias.clone(),
            relay_state: u8::from(r.relay_on),
            on_time: r.on_time_secs,
            led_off: u8::from(r.led_off),
            feature: r.capabilities.feature(),
            updating: 0,
        }
    }
}

/// `emeter.get_realtime` result.
///
/// Values are `f64` rounded to two decimals so they serialise as `0.83`
/// rather than the nearest `f32` expansion.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Realtime {
    pub current: f64,
    pub voltage: f64,
    pub power: f64,
    pub total: f64,
    pub err_code: i32,
}

impl From<Reading> for Realtime {
    fn from(r: Reading) -> Self {
        Self {
            current: round2(r.current),
            voltage: round2(r.voltage),
            power: round2(r.power),
            total: 0.0,
            err_code: 0,
        }
    }
}

fn round2(v: f32) -> f64 {
    (f64::from(v) * 100.0).round() / 100.0
}

/// Incrementally built `module → method → leaf` document.
#[derive(Debug, Default)]
pub struct ReplyDoc {
    root: Map<String, Value>,
}

impl ReplyDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `module.method` to `leaf`.
    pub fn put(&mut self, module: &str, method: &str, leaf: Value) {
        let entry = self
            .root
            .entry(module.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(method.to_owned(), leaf);
        }
    }

    /// Replace the whole `module` entry with `leaf`.
    pub fn put_module(&mut self, module: &str, leaf: Value) {
        self.root.insert(module.to_owned(), leaf);
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Serialise and apply `encoding`.
    pub fn encode(self, encoding: Encoding) -> Option<Vec<u8>> {
        encode_value(&Value::Object(self.root), encoding)
    }
}

/// `{"err_code":0}`
pub fn ack() -> Value {
    json!({ "err_code": 0 })
}

/// Error leaf for a protocol error.
pub fn error_leaf(err: ProtocolError) -> Value {
    json!({ "err_code": err.err_code(), "err_msg": err.err_msg() })
}

/// Module-level leaf for a module the plug does not emulate.
pub fn module_not_supported() -> Value {
    json!({ "err_code": -1, "err_msg": "module not support" })
}

/// Reply for a `child_ids` entry that names no plug.
pub fn unknown_plug(child_id: &str) -> Value {
    let err = ProtocolError::UnknownPlug;
    json!({
        "context": {
            "err_code": err.err_code(),
            "err_msg": err.err_msg(),
            "child_id": child_id,
        }
    })
}

/// Serialise any reply value and apply `encoding`.
pub fn encode_value(value: &Value, encoding: Encoding) -> Option<Vec<u8>> {
    serde_json::to_vec(value)
        .ok()
        .map(|json| encode_payload(json, encoding))
}

/// Leaf for a serialisable result struct.
pub fn to_leaf(result: &impl Serialize) -> Value {
    serde_json::to_value(result).unwrap_or(Value::Null)
}
