//! Plug registry — the fixed set of plugs built at startup.
//!
//! Plugs are registered once from the validated configuration and never
//! removed. Lookups return `None` on a miss; callers decide how to reply.

use log::{info, warn};

use super::mac::{MacAddress, parse_mac, synthesize_mac};
use super::{Plug, PlugId};
use crate::config::EmulatorConfig;
use crate::error::ConfigError;

/// Upper bound on emulated plugs per device.
pub const MAX_PLUG_COUNT: usize = 10;

/// Fixed-capacity collection of configured plugs.
#[derive(Debug, Default)]
pub struct PlugRegistry {
    plugs: heapless::Vec<Plug, MAX_PLUG_COUNT>,
}

impl PlugRegistry {
    pub fn new() -> Self {
        Self {
            plugs: heapless::Vec::new(),
        }
    }

    /// Build the registry from configuration.
    ///
    /// When `assign_missing_macs` is set, a plug without a MAC gets the
    /// device's `hardware_mac` if it is the first plug, otherwise a MAC
    /// synthesised from its name so that no two plugs collide.
    pub fn from_config(
        config: &EmulatorConfig,
        hardware_mac: MacAddress,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (index, entry) in config.plugs.iter().enumerate() {
            let mut plug = Plug::from_config(entry)?;
            if plug.mac().is_none() && config.assign_missing_macs {
                let mac = if index == 0 {
                    hardware_mac
                } else {
                    synthesize_mac(plug.name())
                };
                plug.set_mac(mac);
            }
            registry.register(plug)?;
        }
        Ok(registry)
    }

    /// Add a plug. Startup only.
    pub fn register(&mut self, mut plug: Plug) -> Result<PlugId, ConfigError> {
        if self.find_by_name(plug.name()).is_some() {
            warn!("Registry: duplicate plug name '{}'", plug.name());
            return Err(ConfigError::DuplicatePlug);
        }
        if self.plugs.is_full() {
            warn!(
                "Registry: more than {} plugs, ignoring '{}'",
                MAX_PLUG_COUNT,
                plug.name()
            );
            return Err(ConfigError::TooManyPlugs);
        }
        let id = self.plugs.len() as PlugId;
        plug.set_id(id);
        info!(
            "Registry: plug {} '{}' mac={} encrypt={} source={:?}",
            id,
            plug.name(),
            plug.mac_string().as_deref().unwrap_or("-"),
            plug.encrypt_enabled(),
            plug.power_source()
        );
        self.plugs
            .push(plug)
            .map_err(|_| ConfigError::TooManyPlugs)?;
        Ok(id)
    }

    pub fn get(&self, id: PlugId) -> Option<&Plug> {
        self.plugs.get(id as usize)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Plug> {
        self.plugs.iter().find(|p| p.name() == name)
    }

    pub fn find_by_mac(&self, mac: &MacAddress) -> Option<&Plug> {
        self.plugs.iter().find(|p| p.mac().as_ref() == Some(mac))
    }

    /// Resolve a Kasa `child_ids` entry: device id, MAC string, or alias.
    pub fn find_by_device_id(&self, id: &str) -> Option<&Plug> {
        if let Some(plug) = self.plugs.iter().find(|p| p.device_id().as_str() == id) {
            return Some(plug);
        }
        if let Some(mac) = parse_mac(id) {
            if let Some(plug) = self.find_by_mac(&mac) {
                return Some(plug);
            }
        }
        self.find_by_name(id)
    }

    pub fn list_all(&self) -> &[Plug] {
        &self.plugs
    }

    pub fn len(&self) -> usize {
        self.plugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugs.is_empty()
    }
}
