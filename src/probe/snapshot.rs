//! JSON device snapshots.
//!
//! A snapshot is the probe output of one machine written to disk, so the same
//! catalog can be rebuilt elsewhere. Input is validated against the bundled
//! JSON Schema before it is deserialized; a snapshot that fails validation is
//! rejected as a whole.

use crate::probe::HardwareProbe;
use crate::{BusType, Device};
use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Version marker every snapshot must carry.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "device_snapshot_v1";

const SNAPSHOT_SCHEMA: &str = include_str!("../../schema/device_snapshot.schema.json");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub schema_version: String,
    pub devices: Vec<Device>,
}

impl DeviceSnapshot {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            devices,
        }
    }

    /// Validate and deserialize a snapshot document.
    pub fn from_value(value: Value) -> Result<Self> {
        validate_snapshot(&value)?;
        let snapshot: DeviceSnapshot =
            serde_json::from_value(value).context("deserializing device snapshot")?;
        Ok(snapshot)
    }
}

fn validate_snapshot(value: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(SNAPSHOT_SCHEMA).context("parsing bundled snapshot schema")?;
    let compiled = JSONSchema::compile(&schema)
        .map_err(|err| anyhow!("compiling bundled snapshot schema: {err}"))?;
    if let Err(errors) = compiled.validate(value) {
        let details = errors
            .map(|err| format!("{}: {}", err.instance_path, err))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("device snapshot failed validation:\n{}", details);
    }
    Ok(())
}

/// Probe that replays a stored snapshot instead of reading hardware.
#[derive(Clone, Debug, Default)]
pub struct SnapshotProbe {
    devices: Vec<Device>,
}

impl SnapshotProbe {
    pub fn from_devices(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading device snapshot {}", path.display()))?;
        let value: Value = serde_json::from_str(&data)
            .with_context(|| format!("parsing device snapshot {}", path.display()))?;
        let snapshot = DeviceSnapshot::from_value(value)
            .with_context(|| format!("loading device snapshot {}", path.display()))?;
        Ok(Self::from_devices(snapshot.devices))
    }
}

impl HardwareProbe for SnapshotProbe {
    fn probe(&self, bus: BusType) -> Result<Vec<Device>> {
        Ok(self
            .devices
            .iter()
            .filter(|device| device.bus == bus)
            .cloned()
            .collect())
    }
}
