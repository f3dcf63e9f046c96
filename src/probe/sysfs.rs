//! Device enumeration from the Linux sysfs tree.
//!
//! PCI devices come from `bus/pci/devices/*` (`class`, `vendor`, `device`);
//! USB devices from `bus/usb/devices/*` entries that carry `idVendor`. USB
//! devices whose class is defined per interface (`00`) take the class of
//! their first interface. Names are best effort: the PCI base-class table and
//! the USB `manufacturer`/`product` strings.

use crate::probe::HardwareProbe;
use crate::{BusType, Device};
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DEFAULT_SYSFS_ROOT: &str = "/sys";

#[derive(Clone, Debug)]
pub struct SysfsProbe {
    root: PathBuf,
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl SysfsProbe {
    /// Probe below `root` instead of `/sys`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bus_dir(&self, bus: BusType) -> PathBuf {
        self.root.join("bus").join(bus.dir_name()).join("devices")
    }

    fn sysfs_id(&self, entry: &Path) -> String {
        let resolved = fs::canonicalize(entry).unwrap_or_else(|_| entry.to_path_buf());
        let root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        match resolved.strip_prefix(&root) {
            Ok(rel) => format!("/{}", rel.display()),
            Err(_) => resolved.display().to_string(),
        }
    }

    fn pci_device(&self, entry: &Path, name: &str) -> Result<Device> {
        let class = read_hex(&entry.join("class"), 6)?;
        let vendor = read_hex(&entry.join("vendor"), 4)?;
        let device_id = read_hex(&entry.join("device"), 4)?;

        let mut device = Device::new(BusType::Pci, &class[..4], &vendor, &device_id);
        device.class_name = pci_class_name(&class[..2]).to_string();
        device.sysfs_bus_id = name.to_string();
        device.sysfs_id = self.sysfs_id(entry);
        Ok(device)
    }

    fn usb_device(&self, entry: &Path, name: &str) -> Result<Device> {
        let vendor = read_hex(&entry.join("idVendor"), 4)?;
        let product = read_hex(&entry.join("idProduct"), 4)?;
        let mut base = read_hex(&entry.join("bDeviceClass"), 2)?;
        let mut sub = read_hex(&entry.join("bDeviceSubClass"), 2)?;
        if base == "00" {
            if let Some((iface_base, iface_sub)) = first_interface_class(entry, name) {
                base = iface_base;
                sub = iface_sub;
            }
        }

        let mut device = Device::new(BusType::Usb, &format!("{base}{sub}"), &vendor, &product);
        device.class_name = usb_class_name(&base).to_string();
        device.vendor_name = read_text(&entry.join("manufacturer")).unwrap_or_default();
        device.device_name = read_text(&entry.join("product")).unwrap_or_default();
        device.sysfs_bus_id = name.to_string();
        device.sysfs_id = self.sysfs_id(entry);
        Ok(device)
    }
}

impl HardwareProbe for SysfsProbe {
    fn probe(&self, bus: BusType) -> Result<Vec<Device>> {
        let dir = self.bus_dir(bus);
        let mut entries = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .map(|entry| entry.map(|e| (e.file_name().to_string_lossy().into_owned(), e.path())))
                .collect::<io::Result<Vec<_>>>()
                .with_context(|| format!("listing {}", dir.display()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(%bus, dir = %dir.display(), "bus not present");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err).with_context(|| format!("listing {}", dir.display())),
        };
        entries.sort();

        let mut devices = Vec::new();
        for (name, path) in entries {
            let parsed = match bus {
                BusType::Pci => self.pci_device(&path, &name),
                BusType::Usb => {
                    // Interfaces (`1-1:1.0`) and root hub aliases without ids are not devices.
                    if !path.join("idVendor").is_file() {
                        continue;
                    }
                    self.usb_device(&path, &name)
                }
            };
            match parsed {
                Ok(device) => devices.push(device),
                Err(err) => {
                    let reason = format!("{err:#}");
                    tracing::warn!(%bus, entry = %name, error = %reason, "skipping unreadable device");
                }
            }
        }
        Ok(devices)
    }
}

fn read_text(path: &Path) -> Result<String> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(raw.trim().to_string())
}

/// Read a hex attribute, normalized to lowercase and zero-padded to `width`.
fn read_hex(path: &Path, width: usize) -> Result<String> {
    let raw = read_text(path)?;
    normalize_hex(&raw, width)
        .with_context(|| format!("{} holds no hex value: '{raw}'", path.display()))
}

fn normalize_hex(raw: &str, width: usize) -> Option<String> {
    let digits = raw
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .to_ascii_lowercase();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("{digits:0>width$}"))
}

fn first_interface_class(entry: &Path, name: &str) -> Option<(String, String)> {
    let prefix = format!("{name}:");
    let mut interfaces: Vec<PathBuf> = fs::read_dir(entry)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.path())
        .collect();
    interfaces.sort();

    interfaces.iter().find_map(|iface| {
        let base = read_hex(&iface.join("bInterfaceClass"), 2).ok()?;
        let sub = read_hex(&iface.join("bInterfaceSubClass"), 2).ok()?;
        Some((base, sub))
    })
}

fn pci_class_name(base: &str) -> &'static str {
    match base {
        "00" => "Unclassified device",
        "01" => "Mass storage controller",
        "02" => "Network controller",
        "03" => "Display controller",
        "04" => "Multimedia controller",
        "05" => "Memory controller",
        "06" => "Bridge",
        "07" => "Communication controller",
        "08" => "Generic system peripheral",
        "09" => "Input device controller",
        "0a" => "Docking station",
        "0b" => "Processor",
        "0c" => "Serial bus controller",
        "0d" => "Wireless controller",
        "0e" => "Intelligent controller",
        "0f" => "Satellite communications controller",
        "10" => "Encryption controller",
        "11" => "Signal processing controller",
        "12" => "Processing accelerators",
        _ => "Unassigned class",
    }
}

fn usb_class_name(base: &str) -> &'static str {
    match base {
        "00" => "Per-interface class",
        "01" => "Audio",
        "02" => "Communications",
        "03" => "Human Interface Device",
        "06" => "Imaging",
        "07" => "Printer",
        "08" => "Mass Storage",
        "09" => "Hub",
        "0a" => "CDC Data",
        "0b" => "Smart Card",
        "0e" => "Video",
        "e0" => "Wireless",
        "ef" => "Miscellaneous Device",
        "fe" => "Application Specific",
        "ff" => "Vendor Specific Class",
        _ => "Unknown class",
    }
}
