//! Command protocol handler.
//!
//! Resolves a decoded [`Request`]'s targets against the registry and runs
//! every call against every targeted plug. Each plug produces exactly one
//! reply mirroring the request's `module → method` keys; an unresolvable
//! `child_ids` entry produces one `-14` context error instead. Failures
//! stay local: one bad target or method never suppresses the answers of
//! the others.

use log::{debug, info, warn};
use serde_json::Value;

use super::codec::Encoding;
use super::request::{Call, Request, TargetName, Targets, Verb};
use super::response::{
    Realtime, ReplyDoc, SysInfo, ack, encode_value, error_leaf, module_not_supported, to_leaf,
    unknown_plug,
};
use super::{Reply, Replies};
use crate::app::events::EmulatorEvent;
use crate::app::ports::{ClockPort, EventSink, SensorPort};
use crate::discovery::DiscoveryRecord;
use crate::error::ProtocolError;
use crate::plug::Plug;
use crate::plug::registry::PlugRegistry;
use crate::telemetry::TelemetryAggregator;

/// Per-plug command dispatcher.
#[derive(Debug, Default)]
pub struct CommandHandler {
    handled: u32,
    rejected: u32,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls executed successfully since boot.
    pub fn handled(&self) -> u32 {
        self.handled
    }

    /// Calls answered with an error body since boot.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Execute `request` and build one reply per target.
    pub fn handle(
        &mut self,
        request: &Request,
        registry: &PlugRegistry,
        telemetry: &mut TelemetryAggregator,
        sensors: &impl SensorPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> Replies {
        let now_ms = clock.uptime_ms();
        let mut replies = Replies::new();

        match &request.targets {
            Targets::All => {
                for plug in registry.list_all() {
                    if let Some(reply) =
                        self.dispatch(plug, request, telemetry, sensors, now_ms, sink)
                    {
                        let _ = replies.push(reply);
                    }
                }
            }
            Targets::Named(names) => {
                // Bit per plug id; a plug named twice answers once.
                let mut answered: u16 = 0;
                for name in names {
                    match registry.find_by_device_id(name) {
                        Some(plug) => {
                            let bit = 1u16 << plug.id();
                            if answered & bit != 0 {
                                continue;
                            }
                            answered |= bit;
                            if let Some(reply) =
                                self.dispatch(plug, request, telemetry, sensors, now_ms, sink)
                            {
                                let _ = replies.push(reply);
                            }
                        }
                        None => {
                            warn!("Handler: no plug matches child id {:?}", name.as_str());
                            self.reject_target(name, request, &mut replies, sink);
                        }
                    }
                }
                if names.is_empty() {
                    warn!("Handler: child_ids names no plug");
                    self.reject_target(&TargetName::new(), request, &mut replies, sink);
                }
            }
        }

        replies
    }

    /// Answer an unresolvable target with a `-14` context error.
    fn reject_target(
        &mut self,
        name: &TargetName,
        request: &Request,
        replies: &mut Replies,
        sink: &mut impl EventSink,
    ) {
        self.rejected = self.rejected.wrapping_add(1);
        sink.emit(&EmulatorEvent::UnknownPlug {
            target: name.clone(),
        });
        if let Some(payload) = encode_value(&unknown_plug(name), request.encoding) {
            let _ = replies.push(Reply {
                plug: None,
                payload,
            });
        }
    }

    /// Run every call of `request` against one plug.
    fn dispatch(
        &mut self,
        plug: &Plug,
        request: &Request,
        telemetry: &mut TelemetryAggregator,
        sensors: &impl SensorPort,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Option<Reply> {
        let mut doc = ReplyDoc::new();

        for call in &request.calls {
            match call {
                Call::Verb { verb, params } => {
                    let leaf = match execute(plug, *verb, params, telemetry, sensors, now_ms, sink)
                    {
                        Ok(leaf) => {
                            self.handled = self.handled.wrapping_add(1);
                            sink.emit(&EmulatorEvent::CommandHandled {
                                plug: plug.id(),
                                verb: *verb,
                            });
                            leaf
                        }
                        Err(e) => {
                            debug!(
                                "Handler: {}.{} on {:?}: {}",
                                verb.module(),
                                verb.method(),
                                plug.name(),
                                e
                            );
                            self.rejected = self.rejected.wrapping_add(1);
                            error_leaf(e)
                        }
                    };
                    doc.put(verb.module(), verb.method(), leaf);
                }
                Call::UnknownModule { module } => {
                    debug!("Handler: module {:?} not supported", module);
                    self.rejected = self.rejected.wrapping_add(1);
                    doc.put_module(module, module_not_supported());
                }
                Call::UnknownMethod { module, method } => {
                    debug!("Handler: method {}.{} not supported", module, method);
                    self.rejected = self.rejected.wrapping_add(1);
                    doc.put(module, method, error_leaf(ProtocolError::UnsupportedCommand));
                }
                Call::BadModule { module } => {
                    self.rejected = self.rejected.wrapping_add(1);
                    doc.put_module(module, error_leaf(ProtocolError::InvalidArgument));
                }
            }
        }

        let encoding = Encoding::for_plug(plug.encrypt_enabled());
        doc.encode(encoding).map(|payload| Reply {
            plug: Some(plug.id()),
            payload,
        })
    }
}

/// Execute one recognised verb against `plug`.
fn execute(
    plug: &Plug,
    verb: Verb,
    params: &Value,
    telemetry: &mut TelemetryAggregator,
    sensors: &impl SensorPort,
    now_ms: u64,
    sink: &mut impl EventSink,
) -> Result<Value, ProtocolError> {
    match verb {
        Verb::GetSysinfo => Ok(to_leaf(&SysInfo::from(&DiscoveryRecord::from_plug(
            plug, now_ms,
        )))),
        Verb::GetRealtime => Ok(to_leaf(&Realtime::from(telemetry.read(plug, sensors)))),
        Verb::SetRelayState => {
            let on = flag(params, "state")?;
            if plug.set_relay(on, now_ms) {
                info!("Handler: {:?} relay {}", plug.name(), if on { "on" } else { "off" });
                let mut name = crate::plug::PlugName::new();
                let _ = name.push_str(plug.name());
                sink.emit(&EmulatorEvent::RelayChanged { plug: name, on });
            }
            Ok(ack())
        }
        Verb::SetLedOff => {
            plug.set_led_off(flag(params, "off")?);
            Ok(ack())
        }
    }
}

/// A `0`/`1` integer parameter.
fn flag(params: &Value, key: &str) -> Result<bool, ProtocolError> {
    match params.get(key).and_then(Value::as_u64) {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        _ => Err(ProtocolError::InvalidArgument),
    }
}
