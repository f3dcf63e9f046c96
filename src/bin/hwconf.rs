//! Command-line front-end for the config catalog.
//!
//! Builds a catalog snapshot from the live sysfs tree (or a `--devices`
//! snapshot) and the on-disk config databases, then prints one view of it.
//! Every command is read-only: it reports what an installer would have to do
//! and never installs or removes anything.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use hwconf::probe::DeviceSnapshot;
use hwconf::{
    BusType, Catalog, Config, FsConfigLoader, HardwareProbe, MatchedDevice, Settings,
    SnapshotProbe, SysfsProbe,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "hwconf")]
#[command(about = "Match detected hardware against driver configs and resolve their relations")]
struct Cli {
    /// Config database root (contains pci/ and usb/).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Installed config root (contains pci/ and usb/).
    #[arg(long, global = true)]
    local: Option<PathBuf>,
    /// File name that marks a config file.
    #[arg(long = "config-name", global = true)]
    config_name: Option<String>,
    /// Replay a JSON device snapshot instead of probing sysfs.
    #[arg(long, global = true)]
    devices: Option<PathBuf>,
    /// Probe below this directory instead of /sys.
    #[arg(long = "sysfs-root", global = true)]
    sysfs_root: Option<PathBuf>,
    /// Restrict output to PCI.
    #[arg(long, global = true)]
    pci: bool,
    /// Restrict output to USB.
    #[arg(long, global = true)]
    usb: bool,
    /// Emit JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Devices with their available and installed configs.
    List,
    /// Every config in the database.
    ListAll,
    /// Installed configs.
    ListInstalled,
    /// Config files that failed to load, and duplicate names.
    Invalid,
    /// Print the detected devices as a replayable JSON snapshot.
    Snapshot,
    /// Configs that must be installed together with NAME.
    Deps { name: String },
    /// Installed configs that conflict with NAME or its dependencies.
    Conflicts { name: String },
    /// Installed configs that depend on NAME.
    RequiredBy { name: String },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::from_env().with_overrides(
        cli.db.clone(),
        cli.local.clone(),
        cli.config_name.clone(),
    );
    let probe = build_probe(&cli)?;
    let buses = selected_buses(&cli);

    if let Command::Snapshot = cli.command {
        let mut devices = Vec::new();
        for bus in &buses {
            devices.extend(probe.probe(*bus)?);
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&DeviceSnapshot::new(devices))?
        );
        return Ok(());
    }

    let loader = FsConfigLoader::new(settings);
    let catalog = Catalog::refresh(probe.as_ref(), &loader).context("building catalog")?;

    match &cli.command {
        Command::List => print_devices(&catalog, &buses, cli.json),
        Command::ListAll => print_configs(
            buses.iter().flat_map(|bus| catalog.database(*bus).iter()),
            cli.json,
        ),
        Command::ListInstalled => print_configs(
            buses.iter().flat_map(|bus| catalog.installed(*bus).iter()),
            cli.json,
        ),
        Command::Invalid => print_invalid(&catalog, &buses, cli.json),
        Command::Deps { name } => {
            let config = lookup(&catalog, &buses, name, Preference::Database)?;
            let deps = catalog.dependencies_to_install(config)?;
            print_configs(deps, cli.json)
        }
        Command::Conflicts { name } => {
            let config = lookup(&catalog, &buses, name, Preference::Database)?;
            let found = catalog.local_conflicts(config)?;
            print_configs(found, cli.json)
        }
        Command::RequiredBy { name } => {
            let config = lookup(&catalog, &buses, name, Preference::Installed)?;
            print_configs(catalog.local_requirements(config), cli.json)
        }
        Command::Snapshot => Ok(()),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_probe(cli: &Cli) -> Result<Box<dyn HardwareProbe>> {
    if let Some(path) = &cli.devices {
        if cli.sysfs_root.is_some() {
            bail!("--devices and --sysfs-root cannot be combined");
        }
        return Ok(Box::new(SnapshotProbe::load(path)?));
    }
    Ok(Box::new(match &cli.sysfs_root {
        Some(root) => SysfsProbe::new(root),
        None => SysfsProbe::default(),
    }))
}

fn selected_buses(cli: &Cli) -> Vec<BusType> {
    match (cli.pci, cli.usb) {
        (true, false) => vec![BusType::Pci],
        (false, true) => vec![BusType::Usb],
        _ => BusType::ALL.to_vec(),
    }
}

#[derive(Clone, Copy)]
enum Preference {
    Database,
    Installed,
}

fn lookup<'a>(
    catalog: &'a Catalog,
    buses: &[BusType],
    name: &str,
    preference: Preference,
) -> Result<&'a Config> {
    let name = name.trim().to_ascii_lowercase();
    for bus in buses {
        let found = match preference {
            Preference::Database => catalog
                .database(*bus)
                .find(&name)
                .or_else(|| catalog.installed(*bus).find(&name)),
            Preference::Installed => catalog.find_config(*bus, &name),
        };
        if let Some(config) = found {
            return Ok(config);
        }
    }
    bail!("config '{name}' does not exist")
}

#[derive(Serialize)]
struct ConfigRow<'a> {
    name: &'a str,
    bus: BusType,
    priority: i32,
    free_driver: bool,
    version: &'a str,
    info: &'a str,
    source: String,
}

impl<'a> From<&'a Config> for ConfigRow<'a> {
    fn from(config: &'a Config) -> Self {
        Self {
            name: &config.name,
            bus: config.bus,
            priority: config.priority,
            free_driver: config.free_driver,
            version: &config.version,
            info: &config.info,
            source: config.source.display().to_string(),
        }
    }
}

fn print_configs<'a>(configs: impl IntoIterator<Item = &'a Config>, json: bool) -> Result<()> {
    let rows: Vec<ConfigRow<'a>> = configs.into_iter().map(ConfigRow::from).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("> none");
        return Ok(());
    }
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0).max(4);
    println!("{:<width$}  {:<3}  {:>8}  {:<8}  VERSION", "NAME", "BUS", "PRIORITY", "FREE");
    for row in rows {
        println!(
            "{:<width$}  {:<3}  {:>8}  {:<8}  {}",
            row.name,
            row.bus.as_str(),
            row.priority,
            if row.free_driver { "true" } else { "false" },
            row.version
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct DeviceRow<'a> {
    bus: BusType,
    sysfs_bus_id: &'a str,
    class_id: &'a str,
    vendor_id: &'a str,
    device_id: &'a str,
    class_name: &'a str,
    vendor_name: &'a str,
    device_name: &'a str,
    available: Vec<&'a str>,
    installed: Vec<&'a str>,
}

fn device_row<'a>(catalog: &'a Catalog, entry: &'a MatchedDevice) -> DeviceRow<'a> {
    let device = &entry.device;
    DeviceRow {
        bus: device.bus,
        sysfs_bus_id: &device.sysfs_bus_id,
        class_id: &device.class_id,
        vendor_id: &device.vendor_id,
        device_id: &device.device_id,
        class_name: &device.class_name,
        vendor_name: &device.vendor_name,
        device_name: &device.device_name,
        available: catalog
            .available_configs(entry)
            .into_iter()
            .map(|c| c.name.as_str())
            .collect(),
        installed: catalog
            .installed_configs(entry)
            .into_iter()
            .map(|c| c.name.as_str())
            .collect(),
    }
}

fn print_devices(catalog: &Catalog, buses: &[BusType], json: bool) -> Result<()> {
    let rows: Vec<DeviceRow<'_>> = buses
        .iter()
        .flat_map(|bus| catalog.devices(*bus).iter())
        .map(|entry| device_row(catalog, entry))
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    for row in rows {
        println!(
            "> {} {} {} ({}) {}:{} {} {}",
            row.bus.as_str(),
            row.sysfs_bus_id,
            row.class_name,
            row.class_id,
            row.vendor_id,
            row.device_id,
            row.vendor_name,
            row.device_name
        );
        println!("    available: {}", join_or_none(&row.available));
        println!("    installed: {}", join_or_none(&row.installed));
    }
    Ok(())
}

fn join_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

fn print_invalid(catalog: &Catalog, buses: &[BusType], json: bool) -> Result<()> {
    let invalid: Vec<_> = catalog
        .invalid()
        .iter()
        .filter(|entry| buses.contains(&entry.bus))
        .collect();
    let collisions: Vec<_> = catalog
        .collisions()
        .iter()
        .filter(|entry| buses.contains(&entry.bus))
        .collect();

    if json {
        let report = serde_json::json!({
            "invalid": invalid,
            "collisions": collisions,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for entry in invalid {
        println!(
            "invalid {} {} config {}: {}",
            entry.bus,
            entry.role,
            entry.source.display(),
            entry.reason
        );
    }
    for entry in collisions {
        println!(
            "duplicate {} {} config '{}': {} ignored, {} kept",
            entry.bus,
            entry.role,
            entry.name,
            entry.duplicate.display(),
            entry.existing.display()
        );
    }
    Ok(())
}
