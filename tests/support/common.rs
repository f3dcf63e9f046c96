#![allow(dead_code)]

use anyhow::{Context, Result};
use hwconf::probe::DeviceSnapshot;
use hwconf::{BusType, ConfigRole, Device, Settings};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

// On-disk database fixture: `<temp>/db/{pci,usb}` and `<temp>/local/{pci,usb}`
// plus an optional device snapshot, removed when dropped.
pub struct TempDb {
    dir: TempDir,
}

impl TempDb {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new().context("failed to allocate temp database")?;
        for role in ["db", "local"] {
            for bus in ["pci", "usb"] {
                fs::create_dir_all(dir.path().join(role).join(bus))?;
            }
        }
        Ok(Self { dir })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn database_dir(&self) -> PathBuf {
        self.root().join("db")
    }

    pub fn installed_dir(&self) -> PathBuf {
        self.root().join("local")
    }

    pub fn settings(&self) -> Settings {
        Settings {
            database_dir: self.database_dir(),
            installed_dir: self.installed_dir(),
            config_file_name: "MHWDCONFIG".to_string(),
        }
    }

    /// Write `<role>/<bus>/<dir>/MHWDCONFIG` and return its path.
    pub fn write_config(
        &self,
        role: ConfigRole,
        bus: BusType,
        dir: &str,
        contents: &str,
    ) -> Result<PathBuf> {
        let root = match role {
            ConfigRole::Database => self.database_dir(),
            ConfigRole::Installed => self.installed_dir(),
        };
        let config_dir = root.join(bus.dir_name()).join(dir);
        fs::create_dir_all(&config_dir)?;
        let path = config_dir.join("MHWDCONFIG");
        fs::write(&path, contents)
            .with_context(|| format!("failed to write fixture {}", path.display()))?;
        Ok(path)
    }

    /// Write the same config into the database and the installed tree.
    pub fn install_config(&self, bus: BusType, dir: &str, contents: &str) -> Result<()> {
        self.write_config(ConfigRole::Database, bus, dir, contents)?;
        self.write_config(ConfigRole::Installed, bus, dir, contents)?;
        Ok(())
    }

    pub fn write_snapshot(&self, devices: Vec<Device>) -> Result<PathBuf> {
        let path = self.root().join("devices.json");
        fs::write(
            &path,
            serde_json::to_string_pretty(&DeviceSnapshot::new(devices))?,
        )?;
        Ok(path)
    }
}

pub fn config_text(name: &str, priority: i32, body: &str) -> String {
    format!("NAME=\"{name}\"\nVERSION=\"1.0\"\nFREEDRIVER=\"true\"\nPRIORITY=\"{priority}\"\n{body}\n")
}

// A laptop with hybrid graphics, an ethernet chip and a USB receiver.
pub fn sample_devices() -> Vec<Device> {
    let mut intel = Device::new(BusType::Pci, "0300", "8086", "3e9b");
    intel.sysfs_bus_id = "0000:00:02.0".to_string();
    let mut nvidia = Device::new(BusType::Pci, "0302", "10de", "1c8d");
    nvidia.sysfs_bus_id = "0000:01:00.0".to_string();
    let mut ethernet = Device::new(BusType::Pci, "0200", "10ec", "8168");
    ethernet.sysfs_bus_id = "0000:02:00.0".to_string();
    let mut receiver = Device::new(BusType::Usb, "0301", "046d", "c52b");
    receiver.sysfs_bus_id = "1-2".to_string();
    vec![intel, nvidia, ethernet, receiver]
}

pub fn hwconf_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hwconf"))
}

// Runs hwconf against the fixture database and its device snapshot.
pub fn run_hwconf(db: &TempDb, snapshot: &Path, args: &[&str]) -> Result<Output> {
    Command::new(hwconf_binary())
        .arg("--db")
        .arg(db.database_dir())
        .arg("--local")
        .arg(db.installed_dir())
        .arg("--devices")
        .arg(snapshot)
        .args(args)
        .env_remove("HWCONF_CONFIG_NAME")
        .output()
        .context("failed to execute hwconf")
}
