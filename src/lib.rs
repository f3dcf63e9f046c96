//! Hardware driver-config matching engine.
//!
//! Detected devices (from a [`HardwareProbe`]) and parsed driver configs (from
//! a [`ConfigLoader`]) are combined into an immutable [`Catalog`] snapshot.
//! Installers query the snapshot for per-device config candidates and use the
//! analyzers in [`resolve`] before acting: the core decides, it never installs.

pub mod catalog;
pub mod config;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod probe;
pub mod resolve;
pub mod settings;

pub use catalog::{Catalog, ConfigId, ConfigSet, InvalidConfig, MatchedDevice, NameCollision};
pub use config::{Config, ConfigRole, IdentifierRule};
pub use error::{CatalogError, ResolveError};
pub use loader::{ConfigLoader, FsConfigLoader, LoadOutcome};
pub use matcher::{glob_matches, rule_matches};
pub use probe::{HardwareProbe, SnapshotProbe, SysfsProbe};
pub use resolve::{conflicts, required_by, resolve_dependencies};
pub use settings::Settings;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two independent device/config namespaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BusType {
    Pci,
    Usb,
}

impl BusType {
    pub const ALL: [BusType; 2] = [BusType::Pci, BusType::Usb];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusType::Pci => "PCI",
            BusType::Usb => "USB",
        }
    }

    /// Directory name used for this bus under a config database root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            BusType::Pci => "pci",
            BusType::Usb => "usb",
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One enumerated hardware device.
///
/// Identifiers are lowercase hex strings; `class_id` is base class followed by
/// sub class (`0300` for a VGA controller). Sysfs fields are diagnostics only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub bus: BusType,
    pub class_id: String,
    pub vendor_id: String,
    pub device_id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub vendor_name: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default)]
    pub sysfs_bus_id: String,
    #[serde(default)]
    pub sysfs_id: String,
}

impl Device {
    /// Build a device with normalized identifiers and empty descriptive fields.
    pub fn new(bus: BusType, class_id: &str, vendor_id: &str, device_id: &str) -> Self {
        Self {
            bus,
            class_id: class_id.trim().to_ascii_lowercase(),
            vendor_id: vendor_id.trim().to_ascii_lowercase(),
            device_id: device_id.trim().to_ascii_lowercase(),
            class_name: String::new(),
            vendor_name: String::new(),
            device_name: String::new(),
            sysfs_bus_id: String::new(),
            sysfs_id: String::new(),
        }
    }

    /// Lowercase the identifier fields in place.
    pub fn normalize(&mut self) {
        self.class_id = self.class_id.trim().to_ascii_lowercase();
        self.vendor_id = self.vendor_id.trim().to_ascii_lowercase();
        self.device_id = self.device_id.trim().to_ascii_lowercase();
    }
}

/// Split a config value list on commas and whitespace, lowercasing entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
