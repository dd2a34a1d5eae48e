//! Structured request decoding.
//!
//! A decoded payload is a JSON object of `module → { method → params }`.
//! The reserved `context` key may carry `child_ids`, the plugs the
//! request targets:
//!
//! ```json
//! {"context":{"child_ids":["50:02:91:AA:BB:CC"]},
//!  "system":{"set_relay_state":{"state":0}}}
//! ```
//!
//! Parsing never fails on an unknown verb; those become [`Call`] variants
//! the handler answers with error bodies. Only structurally unusable
//! payloads are rejected as [`ProtocolError::MalformedDatagram`].

use serde_json::{Map, Value};

use super::codec::Encoding;
use crate::error::{MalformedReason, ProtocolError};
use crate::plug::registry::MAX_PLUG_COUNT;

/// Longest `child_ids` entry kept verbatim.
pub const MAX_TARGET_LEN: usize = 40;

/// One `child_ids` entry.
pub type TargetName = heapless::String<MAX_TARGET_LEN>;

/// Which plugs a request addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum Targets {
    /// No context: every registered plug.
    All,
    /// `context.child_ids`, capped at [`MAX_PLUG_COUNT`] entries.
    Named(heapless::Vec<TargetName, MAX_PLUG_COUNT>),
}

/// Supported command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// `system.get_sysinfo`
    GetSysinfo,
    /// `emeter.get_realtime`
    GetRealtime,
    /// `system.set_relay_state`
    SetRelayState,
    /// `system.set_led_off`
    SetLedOff,
}

impl Verb {
    pub const fn module(self) -> &'static str {
        match self {
            Self::GetSysinfo | Self::SetRelayState | Self::SetLedOff => "system",
            Self::GetRealtime => "emeter",
        }
    }

    pub const fn method(self) -> &'static str {
        match self {
            Self::GetSysinfo => "get_sysinfo",
            Self::GetRealtime => "get_realtime",
            Self::SetRelayState => "set_relay_state",
            Self::SetLedOff => "set_led_off",
        }
    }

    /// Read-only verbs a discovery broadcast may carry.
    pub const fn is_query(self) -> bool {
        matches!(self, Self::GetSysinfo | Self::GetRealtime)
    }
}

/// One `module.method` invocation inside a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// A recognised verb and its parameters.
    Verb { verb: Verb, params: Value },
    /// The module itself is not emulated.
    UnknownModule { module: String },
    /// The module exists but not this method.
    UnknownMethod { module: String, method: String },
    /// The module's value is not an object of methods.
    BadModule { module: String },
}

const KNOWN_MODULES: [&str; 2] = ["system", "emeter"];

fn classify(module: &str, method: &str) -> Option<Verb> {
    match (module, method) {
        ("system", "get_sysinfo") => Some(Verb::GetSysinfo),
        ("system", "set_relay_state") => Some(Verb::SetRelayState),
        ("system", "set_led_off") => Some(Verb::SetLedOff),
        ("emeter", "get_realtime") => Some(Verb::GetRealtime),
        _ => None,
    }
}

/// A fully decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub targets: Targets,
    pub calls: Vec<Call>,
    /// Encoding the request arrived in; error replies mirror it.
    pub encoding: Encoding,
}

impl Request {
    /// A broadcast-shaped query: no target context and only read verbs.
    pub fn is_discovery(&self) -> bool {
        self.targets == Targets::All
            && !self.calls.is_empty()
            && self
                .calls
                .iter()
                .all(|c| matches!(c, Call::Verb { verb, .. } if verb.is_query()))
    }

    /// Whether any call asks for `verb`.
    pub fn wants(&self, verb: Verb) -> bool {
        self.calls
            .iter()
            .any(|c| matches!(c, Call::Verb { verb: v, .. } if *v == verb))
    }
}

/// Parse decoded JSON bytes into a [`Request`].
pub fn parse_request(json: &[u8], encoding: Encoding) -> Result<Request, ProtocolError> {
    let value: Value = serde_json::from_slice(json)
        .map_err(|_| ProtocolError::MalformedDatagram(MalformedReason::NotJson))?;
    let Value::Object(root) = value else {
        return Err(ProtocolError::MalformedDatagram(MalformedReason::NotObject));
    };

    let mut targets = Targets::All;
    let mut calls = Vec::new();

    for (module, body) in root {
        if module == "context" {
            targets = parse_context(&body);
            continue;
        }
        if !KNOWN_MODULES.contains(&module.as_str()) {
            calls.push(Call::UnknownModule { module });
            continue;
        }
        let Value::Object(methods) = body else {
            calls.push(Call::BadModule { module });
            continue;
        };
        push_methods(&module, methods, &mut calls);
    }

    if calls.is_empty() {
        return Err(ProtocolError::MalformedDatagram(MalformedReason::NotObject));
    }

    Ok(Request {
        targets,
        calls,
        encoding,
    })
}

fn push_methods(module: &str, methods: Map<String, Value>, calls: &mut Vec<Call>) {
    for (method, params) in methods {
        match classify(module, &method) {
            Some(verb) => calls.push(Call::Verb { verb, params }),
            None => calls.push(Call::UnknownMethod {
                module: module.into(),
                method,
            }),
        }
    }
}

/// `context.child_ids`, or all plugs when the key is absent.
///
/// A present key always narrows the target set: a non-array value names
/// nothing, and a non-string entry is kept as its JSON text so it fails
/// lookup and is reported.
fn parse_context(context: &Value) -> Targets {
    let Some(ids) = context.get("child_ids") else {
        return Targets::All;
    };
    let mut names = heapless::Vec::new();
    for id in ids.as_array().into_iter().flatten() {
        let name = match id {
            Value::String(s) => truncate(s),
            other => truncate(&other.to_string()),
        };
        if names.push(name).is_err() {
            break;
        }
    }
    Targets::Named(names)
}

fn truncate(s: &str) -> TargetName {
    let mut out = TargetName::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
