//! Per-bus config arena.
//!
//! Configs are stored once and referenced by [`ConfigId`] from device lists.
//! Names are unique within a set; a second config with a known name is
//! rejected with [`CatalogError::NameCollision`] and the first one is kept.

use crate::config::Config;
use crate::error::CatalogError;
use crate::BusType;
use serde::Serialize;
use std::collections::HashMap;

/// Stable index of a config inside one [`ConfigSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConfigId(pub(crate) usize);

#[derive(Clone, Debug)]
pub struct ConfigSet {
    bus: BusType,
    configs: Vec<Config>,
    by_name: HashMap<String, ConfigId>,
}

impl ConfigSet {
    pub fn new(bus: BusType) -> Self {
        Self {
            bus,
            configs: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Build a set, failing on the first rejected config.
    pub fn from_configs(
        bus: BusType,
        configs: impl IntoIterator<Item = Config>,
    ) -> Result<Self, CatalogError> {
        let mut set = Self::new(bus);
        for config in configs {
            set.insert(config)?;
        }
        Ok(set)
    }

    pub fn bus(&self) -> BusType {
        self.bus
    }

    pub fn insert(&mut self, config: Config) -> Result<ConfigId, CatalogError> {
        if config.bus != self.bus {
            return Err(CatalogError::BusMismatch {
                name: config.name,
                expected: self.bus,
                actual: config.bus,
            });
        }
        if let Some(existing) = self.by_name.get(&config.name) {
            return Err(CatalogError::NameCollision {
                bus: self.bus,
                name: config.name.clone(),
                existing: self.configs[existing.0].source.clone(),
                duplicate: config.source,
            });
        }
        let id = ConfigId(self.configs.len());
        self.by_name.insert(config.name.clone(), id);
        self.configs.push(config);
        Ok(id)
    }

    pub fn get(&self, id: ConfigId) -> Option<&Config> {
        self.configs.get(id.0)
    }

    pub fn id_of(&self, name: &str) -> Option<ConfigId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a config by exact name.
    pub fn find(&self, name: &str) -> Option<&Config> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterates configs in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Config> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
