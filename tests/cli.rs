#![cfg(unix)]
// End-to-end runs of the hwconf binary against fixture databases.
#[path = "support/common.rs"]
mod common;

use anyhow::Result;
use hwconf::{BusType, ConfigRole};
use serde_json::Value;

use common::{TempDb, config_text, run_hwconf, sample_devices};

fn stdout_json(output: &std::process::Output) -> Result<Value> {
    Ok(serde_json::from_slice(&output.stdout)?)
}

fn row_names(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn graphics_db() -> Result<TempDb> {
    let db = TempDb::new()?;
    db.write_config(
        ConfigRole::Database,
        BusType::Pci,
        "video-nvidia",
        &config_text(
            "video-nvidia",
            4,
            "CLASSIDS=\"0300 0302\"\nVENDORIDS=\"10de\"\nMHWDDEPENDS=\"nvidia-utils\"",
        ),
    )?;
    db.write_config(
        ConfigRole::Database,
        BusType::Pci,
        "nvidia-utils",
        &config_text("nvidia-utils", 0, "CLASSIDS=\"ffff\"\nMHWDCONFLICTS=\"video-nouveau*\""),
    )?;
    db.install_config(
        BusType::Pci,
        "video-linux",
        &config_text("video-linux", 2, "CLASSIDS=\"0300 0302\""),
    )?;
    db.install_config(
        BusType::Pci,
        "video-nouveau",
        &config_text("video-nouveau", 1, "CLASSIDS=\"0300 0302\"\nVENDORIDS=\"10de\""),
    )?;
    Ok(db)
}

// Ensures `list --json` reports per-device configs highest priority first.
#[test]
fn list_reports_available_and_installed() -> Result<()> {
    let db = graphics_db()?;
    let snapshot = db.write_snapshot(sample_devices())?;
    let output = run_hwconf(&db, &snapshot, &["--pci", "--json", "list"])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let rows = stdout_json(&output)?;
    let rows = rows.as_array().expect("device rows");
    assert_eq!(rows.len(), 3);
    let nvidia = rows
        .iter()
        .find(|row| row["sysfs_bus_id"] == "0000:01:00.0")
        .expect("nvidia row");
    assert_eq!(
        nvidia["available"],
        serde_json::json!(["video-nvidia", "video-linux", "video-nouveau"])
    );
    assert_eq!(
        nvidia["installed"],
        serde_json::json!(["video-linux", "video-nouveau"])
    );
    Ok(())
}

// Ensures deps and conflicts resolve through the database and installed set.
#[test]
fn deps_and_conflicts_follow_dependencies() -> Result<()> {
    let db = graphics_db()?;
    let snapshot = db.write_snapshot(sample_devices())?;

    let deps = run_hwconf(&db, &snapshot, &["--json", "deps", "VIDEO-NVIDIA"])?;
    assert!(deps.status.success(), "{}", String::from_utf8_lossy(&deps.stderr));
    assert_eq!(row_names(&stdout_json(&deps)?), vec!["nvidia-utils"]);

    let conflicts = run_hwconf(&db, &snapshot, &["--json", "conflicts", "video-nvidia"])?;
    assert!(conflicts.status.success());
    assert_eq!(row_names(&stdout_json(&conflicts)?), vec!["video-nouveau"]);

    let required = run_hwconf(&db, &snapshot, &["required-by", "video-linux"])?;
    assert!(required.status.success());
    assert_eq!(String::from_utf8_lossy(&required.stdout).trim(), "> none");
    Ok(())
}

// Ensures required-by resolves names that only exist as installed configs.
#[test]
fn required_by_finds_installed_only_configs() -> Result<()> {
    let db = graphics_db()?;
    db.write_config(
        ConfigRole::Installed,
        BusType::Pci,
        "legacy-base",
        &config_text("legacy-base", 0, "CLASSIDS=\"ffff\""),
    )?;
    db.write_config(
        ConfigRole::Installed,
        BusType::Pci,
        "legacy-extra",
        &config_text("legacy-extra", 0, "CLASSIDS=\"ffff\"\nMHWDDEPENDS=\"legacy-base\""),
    )?;
    let snapshot = db.write_snapshot(sample_devices())?;

    let output = run_hwconf(&db, &snapshot, &["--json", "required-by", "legacy-base"])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(row_names(&stdout_json(&output)?), vec!["legacy-extra"]);
    Ok(())
}

// Ensures unknown names fail with a clear message.
#[test]
fn unknown_config_fails() -> Result<()> {
    let db = graphics_db()?;
    let snapshot = db.write_snapshot(sample_devices())?;
    let output = run_hwconf(&db, &snapshot, &["deps", "video-missing"])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config 'video-missing' does not exist"), "{stderr}");
    Ok(())
}

// Ensures a dependency cycle aborts with the offending chain.
#[test]
fn dependency_cycle_exits_nonzero() -> Result<()> {
    let db = TempDb::new()?;
    db.write_config(ConfigRole::Database, BusType::Usb, "a", &config_text("loop-a", 0, "MHWDDEPENDS=\"loop-b\""))?;
    db.write_config(ConfigRole::Database, BusType::Usb, "b", &config_text("loop-b", 0, "MHWDDEPENDS=\"loop-a\""))?;
    let snapshot = db.write_snapshot(sample_devices())?;

    let output = run_hwconf(&db, &snapshot, &["deps", "loop-a"])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loop-a -> loop-b -> loop-a"), "{stderr}");
    Ok(())
}

// Ensures broken files show up in the invalid report instead of failing.
#[test]
fn invalid_report_lists_broken_files() -> Result<()> {
    let db = graphics_db()?;
    let broken = db.write_config(ConfigRole::Database, BusType::Pci, "broken", "INFO=\"no name\"\n")?;
    let snapshot = db.write_snapshot(sample_devices())?;

    let output = run_hwconf(&db, &snapshot, &["--json", "invalid"])?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output)?;
    let invalid = report["invalid"].as_array().expect("invalid array");
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0]["source"], broken.display().to_string());
    assert_eq!(invalid[0]["role"], "database");
    Ok(())
}

// Ensures the snapshot subcommand replays its input faithfully.
#[test]
fn snapshot_round_trips_devices() -> Result<()> {
    let db = TempDb::new()?;
    let snapshot = db.write_snapshot(sample_devices())?;
    let output = run_hwconf(&db, &snapshot, &["snapshot"])?;
    assert!(output.status.success());
    let value = stdout_json(&output)?;
    assert_eq!(value["schema_version"], "device_snapshot_v1");
    assert_eq!(value["devices"].as_array().map(Vec::len), Some(4));
    Ok(())
}

// Ensures the two probe sources are mutually exclusive.
#[test]
fn devices_and_sysfs_root_conflict() -> Result<()> {
    let db = TempDb::new()?;
    let snapshot = db.write_snapshot(sample_devices())?;
    let sysfs = db.root().display().to_string();
    let output = run_hwconf(&db, &snapshot, &["--sysfs-root", &sysfs, "list"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be combined"));
    Ok(())
}
