//! Config loading from the on-disk database.
//!
//! The catalog only sees the [`ConfigLoader`] trait; [`FsConfigLoader`] is the
//! implementation that walks `<root>/<bus>/` for config files and parses each
//! one. A file that fails to parse becomes an [`InvalidConfig`] and never
//! aborts the load.

pub mod parse;
pub mod walk;

pub use parse::{parse_config_file, parse_config_str};
pub use walk::find_config_files;

use crate::catalog::InvalidConfig;
use crate::config::{Config, ConfigRole};
use crate::settings::Settings;
use crate::BusType;
use anyhow::Result;

/// Parsed configs of one (bus, role) pair plus the files that failed.
#[derive(Clone, Debug, Default)]
pub struct LoadOutcome {
    pub configs: Vec<Config>,
    pub invalid: Vec<InvalidConfig>,
}

/// Source of parsed config records.
pub trait ConfigLoader {
    fn load(&self, bus: BusType, role: ConfigRole) -> Result<LoadOutcome>;
}

#[derive(Clone, Debug)]
pub struct FsConfigLoader {
    settings: Settings,
}

impl FsConfigLoader {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl ConfigLoader for FsConfigLoader {
    fn load(&self, bus: BusType, role: ConfigRole) -> Result<LoadOutcome> {
        let dir = self.settings.config_dir(bus, role);
        let paths = find_config_files(&dir, &self.settings.config_file_name)?;
        tracing::debug!(%bus, %role, dir = %dir.display(), files = paths.len(), "loading configs");

        let mut outcome = LoadOutcome::default();
        for path in paths {
            match parse_config_file(&path, bus) {
                Ok(config) => outcome.configs.push(config),
                Err(err) => outcome.invalid.push(InvalidConfig {
                    bus,
                    role,
                    source: path,
                    reason: format!("{err:#}"),
                }),
            }
        }
        Ok(outcome)
    }
}
