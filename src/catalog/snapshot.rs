//! Immutable catalog snapshot: devices, configs and the derived per-device
//! config lists for both buses.
//!
//! A snapshot is built in one pass ([`Catalog::refresh`]) and never edited
//! afterwards; callers that need fresh data build a new one. Queries take
//! `&self`, so a snapshot can be shared across threads while no refresh is in
//! flight.

use crate::catalog::binder::bind_indices;
use crate::catalog::priority::insert_sorted;
use crate::catalog::{ConfigId, ConfigSet};
use crate::config::{Config, ConfigRole};
use crate::error::{CatalogError, ResolveError};
use crate::loader::{ConfigLoader, LoadOutcome};
use crate::probe::HardwareProbe;
use crate::resolve;
use crate::{BusType, Device};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

/// A config file that could not be parsed, kept for reporting only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvalidConfig {
    pub bus: BusType,
    pub role: ConfigRole,
    pub source: PathBuf,
    pub reason: String,
}

/// Two configs of the same bus and role declared the same name; only the
/// first one (`existing`) takes part in matching.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NameCollision {
    pub bus: BusType,
    pub role: ConfigRole,
    pub name: String,
    pub existing: PathBuf,
    pub duplicate: PathBuf,
}

/// A detected device plus the configs bound to it, highest priority first.
#[derive(Clone, Debug)]
pub struct MatchedDevice {
    pub device: Device,
    available: Vec<ConfigId>,
    installed: Vec<ConfigId>,
}

impl MatchedDevice {
    fn new(device: Device) -> Self {
        Self {
            device,
            available: Vec::new(),
            installed: Vec::new(),
        }
    }

    /// Ids into the bus's database set.
    pub fn available_ids(&self) -> &[ConfigId] {
        &self.available
    }

    /// Ids into the bus's installed set.
    pub fn installed_ids(&self) -> &[ConfigId] {
        &self.installed
    }
}

#[derive(Clone, Debug)]
struct BusCatalog {
    devices: Vec<MatchedDevice>,
    database: ConfigSet,
    installed: ConfigSet,
}

impl BusCatalog {
    fn empty(bus: BusType) -> Self {
        Self {
            devices: Vec::new(),
            database: ConfigSet::new(bus),
            installed: ConfigSet::new(bus),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Catalog {
    pci: BusCatalog,
    usb: BusCatalog,
    invalid: Vec<InvalidConfig>,
    collisions: Vec<NameCollision>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            pci: BusCatalog::empty(BusType::Pci),
            usb: BusCatalog::empty(BusType::Usb),
            invalid: Vec::new(),
            collisions: Vec::new(),
        }
    }
}

impl Catalog {
    /// Build a fresh snapshot from the hardware probe and config loader.
    ///
    /// Unparsable config files land in [`Catalog::invalid`]; only probe or
    /// loader I/O failures abort the refresh.
    pub fn refresh(probe: &dyn HardwareProbe, loader: &dyn ConfigLoader) -> Result<Self> {
        let mut catalog = Self::default();
        for bus in BusType::ALL {
            let devices = probe
                .probe(bus)
                .with_context(|| format!("probing {bus} devices"))?;
            catalog.set_devices(bus, devices);

            let database = loader
                .load(bus, ConfigRole::Database)
                .with_context(|| format!("loading {bus} config database"))?;
            catalog.absorb(bus, ConfigRole::Database, database);

            let installed = loader
                .load(bus, ConfigRole::Installed)
                .with_context(|| format!("loading installed {bus} configs"))?;
            catalog.absorb(bus, ConfigRole::Installed, installed);

            catalog.rebind(bus, ConfigRole::Database);
            catalog.rebind(bus, ConfigRole::Installed);
            catalog.log_summary(bus);
        }
        Ok(catalog)
    }

    /// Build a snapshot from in-memory records, bypassing the collaborators.
    pub fn from_parts(
        devices: Vec<Device>,
        database: Vec<Config>,
        installed: Vec<Config>,
    ) -> Self {
        let mut catalog = Self::default();
        for bus in BusType::ALL {
            let bus_devices = devices.iter().filter(|d| d.bus == bus).cloned().collect();
            catalog.set_devices(bus, bus_devices);
            let outcome = |configs: &[Config]| LoadOutcome {
                configs: configs.iter().filter(|c| c.bus == bus).cloned().collect(),
                invalid: Vec::new(),
            };
            catalog.absorb(bus, ConfigRole::Database, outcome(&database));
            catalog.absorb(bus, ConfigRole::Installed, outcome(&installed));
            catalog.rebind(bus, ConfigRole::Database);
            catalog.rebind(bus, ConfigRole::Installed);
        }
        catalog
    }

    /// Re-read only the installed configs, keeping devices and the database.
    ///
    /// Installed-role invalid records and collisions are replaced as well.
    pub fn reload_installed(mut self, loader: &dyn ConfigLoader) -> Result<Self> {
        self.invalid.retain(|entry| entry.role != ConfigRole::Installed);
        self.collisions.retain(|entry| entry.role != ConfigRole::Installed);
        for bus in BusType::ALL {
            let installed = loader
                .load(bus, ConfigRole::Installed)
                .with_context(|| format!("reloading installed {bus} configs"))?;
            {
                let slot = self.bus_mut(bus);
                slot.installed = ConfigSet::new(bus);
                for device in &mut slot.devices {
                    device.installed.clear();
                }
            }
            self.absorb(bus, ConfigRole::Installed, installed);
            self.rebind(bus, ConfigRole::Installed);
            self.log_summary(bus);
        }
        Ok(self)
    }

    fn bus_ref(&self, bus: BusType) -> &BusCatalog {
        match bus {
            BusType::Pci => &self.pci,
            BusType::Usb => &self.usb,
        }
    }

    fn bus_mut(&mut self, bus: BusType) -> &mut BusCatalog {
        match bus {
            BusType::Pci => &mut self.pci,
            BusType::Usb => &mut self.usb,
        }
    }

    fn set_devices(&mut self, bus: BusType, devices: Vec<Device>) {
        let slot = self.bus_mut(bus);
        slot.devices = devices
            .into_iter()
            .filter(|device| {
                if device.bus != bus {
                    tracing::warn!(%bus, device_bus = %device.bus, sysfs_id = %device.sysfs_id, "probe returned device of other bus; skipping");
                    return false;
                }
                true
            })
            .map(|mut device| {
                device.normalize();
                MatchedDevice::new(device)
            })
            .collect();
    }

    fn absorb(&mut self, bus: BusType, role: ConfigRole, outcome: LoadOutcome) {
        for entry in outcome.invalid {
            tracing::warn!(%bus, %role, source = %entry.source.display(), reason = %entry.reason, "config failed to parse");
            self.invalid.push(entry);
        }

        let mut rejected = Vec::new();
        {
            let slot = self.bus_mut(bus);
            let set = match role {
                ConfigRole::Database => &mut slot.database,
                ConfigRole::Installed => &mut slot.installed,
            };
            for config in outcome.configs {
                let source = config.source.clone();
                if let Err(err) = set.insert(config) {
                    rejected.push((source, err));
                }
            }
        }

        for (source, err) in rejected {
            match err {
                CatalogError::NameCollision {
                    bus,
                    name,
                    existing,
                    duplicate,
                } => {
                    tracing::warn!(%bus, %role, name = %name, existing = %existing.display(), duplicate = %duplicate.display(), "duplicate config name; keeping the first");
                    self.collisions.push(NameCollision {
                        bus,
                        role,
                        name,
                        existing,
                        duplicate,
                    });
                }
                other @ CatalogError::BusMismatch { .. } => {
                    tracing::warn!(%bus, %role, source = %source.display(), error = %other, "config rejected");
                    self.invalid.push(InvalidConfig {
                        bus,
                        role,
                        source,
                        reason: other.to_string(),
                    });
                }
            }
        }
    }

    fn rebind(&mut self, bus: BusType, role: ConfigRole) {
        let slot = self.bus_mut(bus);
        let set = match role {
            ConfigRole::Database => &slot.database,
            ConfigRole::Installed => &slot.installed,
        };
        let devices: Vec<Device> = slot.devices.iter().map(|d| d.device.clone()).collect();

        let mut lists: Vec<Vec<&Config>> = vec![Vec::new(); devices.len()];
        for config in set.iter() {
            let hits = bind_indices(config, &devices);
            tracing::debug!(%bus, %role, config = %config.name, devices = hits.len(), "bound config");
            for idx in hits {
                insert_sorted(&mut lists[idx], config);
            }
        }

        let ids: Vec<Vec<ConfigId>> = lists
            .into_iter()
            .map(|list| list.iter().filter_map(|c| set.id_of(&c.name)).collect())
            .collect();
        for (device, ids) in slot.devices.iter_mut().zip(ids) {
            match role {
                ConfigRole::Database => device.available = ids,
                ConfigRole::Installed => device.installed = ids,
            }
        }
    }

    fn log_summary(&self, bus: BusType) {
        let slot = self.bus_ref(bus);
        tracing::info!(
            %bus,
            devices = slot.devices.len(),
            database = slot.database.len(),
            installed = slot.installed.len(),
            "catalog refreshed"
        );
    }

    pub fn devices(&self, bus: BusType) -> &[MatchedDevice] {
        &self.bus_ref(bus).devices
    }

    /// Every config known for `bus`, installed or not.
    pub fn database(&self, bus: BusType) -> &ConfigSet {
        &self.bus_ref(bus).database
    }

    pub fn installed(&self, bus: BusType) -> &ConfigSet {
        &self.bus_ref(bus).installed
    }

    pub fn invalid(&self) -> &[InvalidConfig] {
        &self.invalid
    }

    pub fn collisions(&self) -> &[NameCollision] {
        &self.collisions
    }

    /// Configs bound to `device` from the database, highest priority first.
    pub fn available_configs<'a>(&'a self, device: &MatchedDevice) -> Vec<&'a Config> {
        let set = self.database(device.device.bus);
        device.available.iter().filter_map(|id| set.get(*id)).collect()
    }

    /// Installed configs bound to `device`, highest priority first.
    pub fn installed_configs<'a>(&'a self, device: &MatchedDevice) -> Vec<&'a Config> {
        let set = self.installed(device.device.bus);
        device.installed.iter().filter_map(|id| set.get(*id)).collect()
    }

    /// Devices a database config is bound to.
    pub fn devices_of<'a>(&'a self, config: &Config) -> Vec<&'a Device> {
        let set = self.database(config.bus);
        let Some(id) = set.id_of(&config.name) else {
            return Vec::new();
        };
        self.devices(config.bus)
            .iter()
            .filter(|d| d.available.contains(&id))
            .map(|d| &d.device)
            .collect()
    }

    /// Look up a config by name, preferring the installed copy.
    pub fn find_config(&self, bus: BusType, name: &str) -> Option<&Config> {
        self.installed(bus)
            .find(name)
            .or_else(|| self.database(bus).find(name))
    }

    /// Configs that must be installed along with `config`.
    pub fn dependencies_to_install<'a>(
        &'a self,
        config: &Config,
    ) -> Result<Vec<&'a Config>, ResolveError> {
        resolve::resolve_dependencies(
            config,
            self.installed(config.bus),
            self.database(config.bus),
        )
    }

    /// Installed configs that conflict with `config` or its dependencies.
    pub fn local_conflicts<'a>(&'a self, config: &Config) -> Result<Vec<&'a Config>, ResolveError> {
        resolve::conflicts(config, self.installed(config.bus), self.database(config.bus))
    }

    /// Installed configs that depend on `config`.
    pub fn local_requirements<'a>(&'a self, config: &Config) -> Vec<&'a Config> {
        resolve::required_by(config, self.installed(config.bus))
    }
}
