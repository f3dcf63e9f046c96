//! Dependency closure, conflict and reverse-dependency analysis.
//!
//! All three analyzers read a catalog snapshot and return decisions; none of
//! them mutates anything. Dependency names are exact; conflict entries are
//! case-insensitive globs over config names.

use crate::catalog::ConfigSet;
use crate::config::Config;
use crate::error::ResolveError;
use crate::matcher::glob_matches;
use std::collections::HashSet;

struct Frame<'x> {
    name: &'x str,
    dependencies: &'x [String],
    next: usize,
}

/// Configs that must be installed for `config` to work, in pre-order.
///
/// Dependencies are expanded in declared order and each one is fully resolved
/// before its next sibling. Names already installed or already collected are
/// skipped; names missing from `database` are skipped with a debug log. A
/// name that reappears on the current expansion path is a cycle.
pub fn resolve_dependencies<'a>(
    config: &Config,
    installed: &ConfigSet,
    database: &'a ConfigSet,
) -> Result<Vec<&'a Config>, ResolveError> {
    let mut resolved: Vec<&'a Config> = Vec::new();
    let mut collected: HashSet<&'a str> = HashSet::new();
    let mut path = vec![Frame {
        name: config.name.as_str(),
        dependencies: &config.dependencies,
        next: 0,
    }];

    while let Some(frame) = path.last_mut() {
        let dependencies = frame.dependencies;
        let Some(dependency) = dependencies.get(frame.next) else {
            path.pop();
            continue;
        };
        frame.next += 1;

        if installed.contains(dependency) {
            continue;
        }
        if path.iter().any(|f| f.name == dependency.as_str()) {
            let mut cycle: Vec<String> = path.iter().map(|f| f.name.to_string()).collect();
            cycle.push(dependency.clone());
            tracing::debug!(config = %config.name, cycle = ?cycle, "dependency cycle");
            return Err(ResolveError::CycleDetected { path: cycle });
        }
        if collected.contains(dependency.as_str()) {
            continue;
        }

        match database.find(dependency) {
            Some(found) => {
                resolved.push(found);
                collected.insert(found.name.as_str());
                path.push(Frame {
                    name: found.name.as_str(),
                    dependencies: &found.dependencies,
                    next: 0,
                });
            }
            None => {
                tracing::debug!(
                    config = %config.name,
                    dependency = %dependency,
                    bus = %database.bus(),
                    "dependency not found in database; skipping"
                );
            }
        }
    }

    Ok(resolved)
}

/// Installed configs that collide with `config` or anything it pulls in.
///
/// Each (member, pattern) pair records at most one new conflict; `config`
/// itself is never reported even when installed.
pub fn conflicts<'a>(
    config: &Config,
    installed: &'a ConfigSet,
    database: &ConfigSet,
) -> Result<Vec<&'a Config>, ResolveError> {
    let mut members: Vec<&Config> = resolve_dependencies(config, installed, database)?;
    members.push(config);

    let mut found: Vec<&'a Config> = Vec::new();
    for member in members {
        for pattern in &member.conflicts {
            for candidate in installed.iter() {
                if candidate.name == config.name {
                    continue;
                }
                if !glob_matches(pattern, &candidate.name) {
                    continue;
                }
                if found.iter().any(|c| c.name == candidate.name) {
                    continue;
                }
                tracing::debug!(config = %config.name, via = %member.name, pattern = %pattern, conflict = %candidate.name, "installed config conflicts");
                found.push(candidate);
                break;
            }
        }
    }

    Ok(found)
}

/// Installed configs that list `config` as a dependency.
pub fn required_by<'a>(config: &Config, installed: &'a ConfigSet) -> Vec<&'a Config> {
    let mut requirements: Vec<&'a Config> = Vec::new();
    for candidate in installed.iter() {
        if !candidate.depends_on(&config.name) {
            continue;
        }
        if requirements.iter().any(|c| c.name == candidate.name) {
            continue;
        }
        requirements.push(candidate);
    }
    requirements
}
