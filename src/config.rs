//! Parsed driver-config records.

use crate::BusType;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Which database a config was loaded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigRole {
    /// Every config known to the database, installed or not.
    Database,
    /// Configs currently installed on the host.
    Installed,
}

impl ConfigRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigRole::Database => "database",
            ConfigRole::Installed => "installed",
        }
    }
}

impl fmt::Display for ConfigRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hardware facet a config requires: whitelist/blacklist globs for each
/// identifier kind. An empty whitelist places no constraint on that kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IdentifierRule {
    pub class_ids: Vec<String>,
    pub blacklisted_class_ids: Vec<String>,
    pub vendor_ids: Vec<String>,
    pub blacklisted_vendor_ids: Vec<String>,
    pub device_ids: Vec<String>,
    pub blacklisted_device_ids: Vec<String>,
}

impl IdentifierRule {
    /// Rule that accepts every device.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_class_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_vendor_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vendor_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_device_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_blacklisted_class_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklisted_class_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_blacklisted_vendor_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklisted_vendor_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_blacklisted_device_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklisted_device_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// A named, prioritized driver config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Config {
    pub name: String,
    pub bus: BusType,
    pub priority: i32,
    pub rules: Vec<IdentifierRule>,
    /// Exact names of configs this one requires, in declared order.
    pub dependencies: Vec<String>,
    /// Glob patterns matched against other config names.
    pub conflicts: Vec<String>,
    pub info: String,
    pub version: String,
    pub free_driver: bool,
    pub source: PathBuf,
}

impl Config {
    /// Minimal config with a single match-anything rule.
    pub fn new(name: impl Into<String>, bus: BusType) -> Self {
        Self {
            name: name.into(),
            bus,
            priority: 0,
            rules: vec![IdentifierRule::any()],
            dependencies: Vec::new(),
            conflicts: Vec::new(),
            info: String::new(),
            version: String::new(),
            free_driver: true,
            source: PathBuf::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_rules(mut self, rules: Vec<IdentifierRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_conflicts<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicts = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|dep| dep == name)
    }
}
