//! Device-config binding.

use crate::config::Config;
use crate::matcher::rule_matches;
use crate::Device;

/// Devices a config applies to.
///
/// Every rule of the config must match at least one device of the config's
/// bus; otherwise the config matches nothing. The result is the deduplicated
/// union of per-rule matches in enumeration order.
pub fn bind<'d>(config: &Config, devices: &'d [Device]) -> Vec<&'d Device> {
    bind_indices(config, devices)
        .into_iter()
        .map(|idx| &devices[idx])
        .collect()
}

pub(crate) fn bind_indices(config: &Config, devices: &[Device]) -> Vec<usize> {
    if config.rules.is_empty() {
        return Vec::new();
    }

    let mut matched = vec![false; devices.len()];
    for rule in &config.rules {
        let mut rule_hit = false;
        for (idx, device) in devices.iter().enumerate() {
            if device.bus != config.bus {
                continue;
            }
            if rule_matches(rule, device) {
                matched[idx] = true;
                rule_hit = true;
            }
        }
        if !rule_hit {
            return Vec::new();
        }
    }

    matched
        .iter()
        .enumerate()
        .filter_map(|(idx, hit)| hit.then_some(idx))
        .collect()
}
