//! Registry of known TiVo receivers.

use crate::config::Config;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tivoshare_common::Tsn;

/// A device as known to the share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownDevice {
    pub tsn: Tsn,
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Default)]
struct Devices {
    addresses: BTreeMap<Tsn, String>,
    names: BTreeMap<Tsn, String>,
}

/// Thread-safe map of device serials to addresses and human names.
#[derive(Default)]
pub struct DeviceRegistry {
    inner: RwLock<Devices>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry from the `[tivos.*]` sections.
    pub fn from_config(config: &Config) -> Self {
        let registry = Self::new();
        {
            let mut devices = registry.inner.write();
            for (tsn, tivo) in &config.tivos {
                let tsn = Tsn::from(tsn.as_str());
                if let Some(address) = &tivo.address {
                    devices.addresses.insert(tsn.clone(), address.clone());
                }
                if let Some(name) = &tivo.name {
                    devices.names.insert(tsn, name.clone());
                }
            }
        }
        registry
    }

    /// Note the address a device was last seen at.
    pub fn record(&self, tsn: &Tsn, address: impl Into<String>) {
        if tsn.is_unknown() {
            return;
        }
        self.inner.write().addresses.insert(tsn.clone(), address.into());
    }

    pub fn set_name(&self, tsn: &Tsn, name: impl Into<String>) {
        self.inner.write().names.insert(tsn.clone(), name.into());
    }

    pub fn address(&self, tsn: &Tsn) -> Option<String> {
        self.inner.read().addresses.get(tsn).cloned()
    }

    pub fn name(&self, tsn: &Tsn) -> Option<String> {
        self.inner.read().names.get(tsn).cloned()
    }

    /// Map a human-readable device name back to its serial.
    ///
    /// Anything that is not a known name is taken to be a serial already.
    pub fn reverse_lookup(&self, raw: &str) -> Tsn {
        let devices = self.inner.read();
        devices
            .names
            .iter()
            .find(|(_, name)| name.as_str() == raw)
            .map(|(tsn, _)| tsn.clone())
            .unwrap_or_else(|| Tsn::from(raw))
    }

    /// Every device with a known address or name, ordered by serial.
    pub fn snapshot(&self) -> Vec<KnownDevice> {
        let devices = self.inner.read();
        let mut serials: Vec<&Tsn> = devices.addresses.keys().collect();
        serials.extend(devices.names.keys());
        serials.sort();
        serials.dedup();

        serials
            .into_iter()
            .map(|tsn| KnownDevice {
                tsn: tsn.clone(),
                name: devices.names.get(tsn).cloned(),
                address: devices.addresses.get(tsn).cloned(),
            })
            .collect()
    }
}
