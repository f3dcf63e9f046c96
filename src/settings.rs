//! Where config databases live.
//!
//! Each field resolves, in order: explicit override (CLI flag), environment
//! variable, compile-time hint baked in by `build.rs`, built-in default.
//! Empty values are ignored at every step.

use crate::{BusType, ConfigRole};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATABASE_DIR: &str = "/var/lib/mhwd/db";
pub const DEFAULT_INSTALLED_DIR: &str = "/var/lib/mhwd/local";
pub const DEFAULT_CONFIG_FILE_NAME: &str = "MHWDCONFIG";

const ENV_DATABASE_DIR: &str = "HWCONF_DB_DIR";
const ENV_INSTALLED_DIR: &str = "HWCONF_LOCAL_DIR";
const ENV_CONFIG_FILE_NAME: &str = "HWCONF_CONFIG_NAME";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Root of every known config, with `pci/` and `usb/` below it.
    pub database_dir: PathBuf,
    /// Root of installed configs, same layout as `database_dir`.
    pub installed_dir: PathBuf,
    /// Exact file name a config file must have to be picked up.
    pub config_file_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_dir: PathBuf::from(DEFAULT_DATABASE_DIR),
            installed_dir: PathBuf::from(DEFAULT_INSTALLED_DIR),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Resolve settings from the process environment and build hints.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve settings using `lookup` in place of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_dir = non_empty(lookup(ENV_DATABASE_DIR))
            .or_else(|| non_empty(option_env!("HWCONF_DB_DIR_HINT").map(str::to_string)))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_DIR));
        let installed_dir = non_empty(lookup(ENV_INSTALLED_DIR))
            .or_else(|| non_empty(option_env!("HWCONF_LOCAL_DIR_HINT").map(str::to_string)))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALLED_DIR));
        let config_file_name = non_empty(lookup(ENV_CONFIG_FILE_NAME))
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE_NAME.to_string());

        Self {
            database_dir,
            installed_dir,
            config_file_name,
        }
    }

    /// Apply explicit overrides on top of the resolved values.
    pub fn with_overrides(
        mut self,
        database_dir: Option<PathBuf>,
        installed_dir: Option<PathBuf>,
        config_file_name: Option<String>,
    ) -> Self {
        if let Some(dir) = database_dir.filter(|d| !d.as_os_str().is_empty()) {
            self.database_dir = dir;
        }
        if let Some(dir) = installed_dir.filter(|d| !d.as_os_str().is_empty()) {
            self.installed_dir = dir;
        }
        if let Some(name) = non_empty(config_file_name) {
            self.config_file_name = name;
        }
        self
    }

    pub fn root(&self, role: ConfigRole) -> &Path {
        match role {
            ConfigRole::Database => &self.database_dir,
            ConfigRole::Installed => &self.installed_dir,
        }
    }

    /// Directory holding configs of one bus and role.
    pub fn config_dir(&self, bus: BusType, role: ConfigRole) -> PathBuf {
        self.root(role).join(bus.dir_name())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
