//! Hardware enumeration.
//!
//! The catalog only depends on [`HardwareProbe`]. [`SysfsProbe`] reads the
//! live device tree; [`SnapshotProbe`] replays a JSON snapshot so a catalog
//! can be rebuilt on another machine or in tests.

pub mod snapshot;
pub mod sysfs;

pub use snapshot::{DeviceSnapshot, SnapshotProbe, SNAPSHOT_SCHEMA_VERSION};
pub use sysfs::SysfsProbe;

use crate::{BusType, Device};
use anyhow::Result;

/// Source of enumerated devices, one bus at a time, in stable order.
pub trait HardwareProbe {
    fn probe(&self, bus: BusType) -> Result<Vec<Device>>;
}
