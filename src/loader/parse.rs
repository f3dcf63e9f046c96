//! Parser for line-based `KEY="value"` config files.
//!
//! Recognized keys (case-insensitive): NAME, INFO, VERSION, FREEDRIVER,
//! PRIORITY, CLASSIDS, VENDORIDS, DEVICEIDS, the three BLACKLISTED* variants,
//! MHWDDEPENDS, MHWDCONFLICTS and INCLUDE. Other lines (install hooks, shell
//! functions) are ignored. Assigning a whitelist that the current rule already
//! has opens a new rule, so a file can declare several hardware facets.

use crate::config::{Config, IdentifierRule};
use crate::{BusType, split_list};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};

const MAX_INCLUDE_DEPTH: usize = 8;

/// Parse one config file for `bus`.
pub fn parse_config_file(path: &Path, bus: BusType) -> Result<Config> {
    let mut config = Config::new(String::new(), bus).with_source(path);
    config.rules = vec![IdentifierRule::default()];
    read_into(&mut config, path, 0)?;
    finish(config)
}

/// Parse config text as if it had been read from `source`.
pub fn parse_config_str(text: &str, source: &Path, bus: BusType) -> Result<Config> {
    let mut config = Config::new(String::new(), bus).with_source(source);
    config.rules = vec![IdentifierRule::default()];
    apply_text(&mut config, text, base_dir(source), 0)?;
    finish(config)
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

fn read_into(config: &mut Config, path: &Path, depth: usize) -> Result<()> {
    if depth > MAX_INCLUDE_DEPTH {
        bail!("include nesting deeper than {MAX_INCLUDE_DEPTH} at {}", path.display());
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    apply_text(config, &text, base_dir(path), depth)
        .with_context(|| format!("parsing config {}", path.display()))
}

fn apply_text(config: &mut Config, text: &str, base: &Path, depth: usize) -> Result<()> {
    for (idx, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().trim_matches('"').trim();
        let line_no = idx + 1;

        match key.as_str() {
            "include" => {
                let included = resolve_path(value, base);
                read_into(config, &included, depth + 1)
                    .with_context(|| format!("line {line_no}: INCLUDE {}", included.display()))?;
            }
            "name" => config.name = value.to_ascii_lowercase(),
            "info" => config.info = value.to_string(),
            "version" => config.version = value.to_string(),
            "freedriver" => config.free_driver = !value.eq_ignore_ascii_case("false"),
            "priority" => {
                config.priority = value
                    .parse()
                    .with_context(|| format!("line {line_no}: invalid PRIORITY '{value}'"))?;
            }
            "classids" => {
                let ids = read_list(value, base, line_no)?;
                open_rule(&mut config.rules, |r| !r.class_ids.is_empty()).class_ids = ids;
            }
            "vendorids" => {
                let ids = read_list(value, base, line_no)?;
                open_rule(&mut config.rules, |r| !r.vendor_ids.is_empty()).vendor_ids = ids;
            }
            "deviceids" => {
                let ids = read_list(value, base, line_no)?;
                open_rule(&mut config.rules, |r| !r.device_ids.is_empty()).device_ids = ids;
            }
            "blacklistedclassids" => {
                current_rule(&mut config.rules).blacklisted_class_ids =
                    read_list(value, base, line_no)?;
            }
            "blacklistedvendorids" => {
                current_rule(&mut config.rules).blacklisted_vendor_ids =
                    read_list(value, base, line_no)?;
            }
            "blacklisteddeviceids" => {
                current_rule(&mut config.rules).blacklisted_device_ids =
                    read_list(value, base, line_no)?;
            }
            "mhwddepends" => config.dependencies = read_list(value, base, line_no)?,
            "mhwdconflicts" => config.conflicts = read_list(value, base, line_no)?,
            _ => {}
        }
    }
    Ok(())
}

fn finish(mut config: Config) -> Result<Config> {
    if config.name.is_empty() {
        bail!("config {} has no NAME", config.source.display());
    }
    for rule in &mut config.rules {
        for list in [&mut rule.class_ids, &mut rule.vendor_ids, &mut rule.device_ids] {
            if list.is_empty() {
                list.push("*".to_string());
            }
        }
    }
    Ok(config)
}

/// Cut a trailing `#` comment; a `#` inside double quotes is kept.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (pos, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..pos],
            _ => {}
        }
    }
    line
}

/// Absolute paths stay as-is; relative ones resolve against `base`.
fn resolve_path(value: &str, base: &Path) -> PathBuf {
    let candidate = Path::new(value.trim());
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

/// Split a value list; a leading `>` names a file holding the entries.
fn read_list(value: &str, base: &Path, line_no: usize) -> Result<Vec<String>> {
    let Some(file) = value.strip_prefix('>') else {
        return Ok(split_list(value));
    };
    let path = resolve_path(file, base);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("line {line_no}: reading id list {}", path.display()))?;
    Ok(text
        .lines()
        .flat_map(|line| split_list(strip_comment(line)))
        .collect())
}

fn open_rule(
    rules: &mut Vec<IdentifierRule>,
    taken: fn(&IdentifierRule) -> bool,
) -> &mut IdentifierRule {
    if rules.last().is_none_or(taken) {
        rules.push(IdentifierRule::default());
    }
    let last = rules.len() - 1;
    &mut rules[last]
}

fn current_rule(rules: &mut Vec<IdentifierRule>) -> &mut IdentifierRule {
    if rules.is_empty() {
        rules.push(IdentifierRule::default());
    }
    let last = rules.len() - 1;
    &mut rules[last]
}
