//! Wildcard identifier matching and per-device rule evaluation.

use crate::config::IdentifierRule;
use crate::Device;
use globset::GlobBuilder;

/// Case-insensitive fnmatch-style match of `value` against `pattern`.
///
/// Supports `*`, `?`, backslash escapes and bracket expressions with ranges,
/// `!`/`^` negation and POSIX named classes such as `[:xdigit:]`. Braces are
/// literal. A malformed pattern matches nothing.
pub fn glob_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !has_glob_meta(pattern) {
        return pattern.eq_ignore_ascii_case(value);
    }

    let Some(translated) = translate(pattern) else {
        tracing::trace!(pattern, "malformed pattern treated as no match");
        return false;
    };
    match GlobBuilder::new(&translated)
        .case_insensitive(true)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
    {
        Ok(glob) => glob.compile_matcher().is_match(value),
        Err(err) => {
            tracing::trace!(pattern, error = %err, "malformed pattern treated as no match");
            false
        }
    }
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern
        .chars()
        .any(|c| matches!(c, '*' | '?' | '[' | '\\'))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

/// Rewrite an fnmatch pattern into globset syntax.
///
/// `None` means the pattern is malformed or can never match.
fn translate(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' | '?' => out.push(chars[i]),
            '\\' => {
                i += 1;
                push_literal(&mut out, *chars.get(i)?);
            }
            '[' => {
                let (class, next) = parse_bracket(&chars, i + 1)?;
                out.push_str(&class);
                i = next;
                continue;
            }
            c => push_literal(&mut out, c),
        }
        i += 1;
    }
    Some(out)
}

fn push_literal(out: &mut String, c: char) {
    if matches!(c, '*' | '?' | '[' | ']' | '{' | '}' | ',' | '\\') {
        out.push('\\');
    }
    out.push(c);
}

/// Parse a bracket expression whose body starts at `start`; returns the
/// globset class and the index just past the closing `]`.
fn parse_bracket(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    let negated = matches!(chars.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    let mut first = true;
    loop {
        let c = *chars.get(i)?;
        if c == ']' && !first {
            i += 1;
            break;
        }
        first = false;

        if c == '[' && chars.get(i + 1) == Some(&':') {
            let rest = &chars[i + 2..];
            if let Some(len) = rest.windows(2).position(|w| w == [':', ']']) {
                let name: String = rest[..len].iter().collect();
                items.extend(named_class(&name)?);
                i += len + 4;
                continue;
            }
        }

        let lo = if c == '\\' {
            i += 1;
            *chars.get(i)?
        } else {
            c
        };
        i += 1;
        if chars.get(i) == Some(&'-') && chars.get(i + 1).is_some_and(|&n| n != ']') {
            let mut hi = chars[i + 1];
            i += 2;
            if hi == '\\' {
                hi = *chars.get(i)?;
                i += 1;
            }
            items.push(ClassItem::Range(lo, hi));
        } else {
            items.push(ClassItem::Single(lo));
        }
    }

    Some((render_class(negated, items)?, i))
}

fn named_class(name: &str) -> Option<Vec<ClassItem>> {
    use ClassItem::{Range, Single};

    let items = match name {
        "alnum" => vec![Range('0', '9'), Range('a', 'z'), Range('A', 'Z')],
        "alpha" => vec![Range('a', 'z'), Range('A', 'Z')],
        "blank" => vec![Single(' '), Single('\t')],
        "cntrl" => vec![Range('\0', '\x1f'), Single('\x7f')],
        "digit" => vec![Range('0', '9')],
        "graph" => vec![Range('!', '~')],
        "lower" => vec![Range('a', 'z')],
        "print" => vec![Range(' ', '~')],
        "punct" => vec![
            Range('!', '/'),
            Range(':', '@'),
            Range('[', '`'),
            Range('{', '~'),
        ],
        "space" => vec![Single(' '), Range('\t', '\r')],
        "upper" => vec![Range('A', 'Z')],
        "xdigit" => vec![Range('0', '9'), Range('a', 'f'), Range('A', 'F')],
        _ => return None,
    };
    Some(items)
}

// globset reads `]` as literal only when first, `-` only when first or last,
// and a leading `!` or `^` as negation.
fn render_class(negated: bool, items: Vec<ClassItem>) -> Option<String> {
    let mut singles: Vec<char> = Vec::new();
    let mut ranges: Vec<(char, char)> = Vec::new();
    for item in items {
        match item {
            ClassItem::Single(c) => singles.push(c),
            ClassItem::Range(lo, hi) if lo > hi => {}
            ClassItem::Range(lo, hi)
                if lo == hi || [lo, hi].iter().any(|c| matches!(*c, ']' | '-' | '!' | '^')) =>
            {
                singles.extend(lo..=hi);
            }
            ClassItem::Range(lo, hi) => ranges.push((lo, hi)),
        }
    }
    singles.sort_unstable();
    singles.dedup();
    let close = singles.contains(&']');
    let dash = singles.contains(&'-');
    singles.retain(|c| !matches!(*c, ']' | '-'));
    singles.sort_by_key(|c| matches!(*c, '!' | '^'));

    if !close && !dash && ranges.is_empty() && singles.is_empty() {
        return negated.then(|| "?".to_string());
    }
    if !negated && !close && ranges.is_empty() && singles.first().is_some_and(|c| matches!(*c, '!' | '^')) {
        let mut alternatives: Vec<String> = singles.iter().map(|c| c.to_string()).collect();
        if dash {
            alternatives.push("-".to_string());
        }
        return Some(format!("{{{}}}", alternatives.join(",")));
    }

    let mut class = String::from("[");
    if negated {
        class.push('!');
    }
    if close {
        class.push(']');
    }
    for (lo, hi) in ranges {
        class.push(lo);
        class.push('-');
        class.push(hi);
    }
    class.extend(singles);
    if dash {
        class.push('-');
    }
    class.push(']');
    Some(class)
}

fn any_matches(patterns: &[String], value: &str) -> bool {
    patterns.iter().any(|pattern| glob_matches(pattern, value))
}

fn whitelist_passes(patterns: &[String], value: &str) -> bool {
    patterns.is_empty() || any_matches(patterns, value)
}

/// Evaluate one rule against one device.
///
/// Stages run in order (class, vendor, device; whitelist before blacklist for
/// each) and the first failing stage ends evaluation.
pub fn rule_matches(rule: &IdentifierRule, device: &Device) -> bool {
    if !whitelist_passes(&rule.class_ids, &device.class_id) {
        return false;
    }
    if any_matches(&rule.blacklisted_class_ids, &device.class_id) {
        return false;
    }
    if !whitelist_passes(&rule.vendor_ids, &device.vendor_id) {
        return false;
    }
    if any_matches(&rule.blacklisted_vendor_ids, &device.vendor_id) {
        return false;
    }
    if !whitelist_passes(&rule.device_ids, &device.device_id) {
        return false;
    }
    !any_matches(&rule.blacklisted_device_ids, &device.device_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BusType;

    fn nvidia_gpu() -> Device {
        Device::new(BusType::Pci, "0300", "10de", "1c82")
    }

    #[test]
    fn glob_is_case_insensitive_both_ways() {
        assert!(glob_matches("10DE", "10de"));
        assert!(glob_matches("10de", "10DE"));
        assert!(glob_matches("VIDEO-*", "video-nvidia"));
    }

    #[test]
    fn glob_supports_wildcards_and_classes() {
        assert!(glob_matches("03??", "0302"));
        assert!(!glob_matches("03??", "030"));
        assert!(glob_matches("1c8[0-3]", "1c82"));
        assert!(!glob_matches("1c8[!0-3]", "1c82"));
        assert!(glob_matches("*", ""));
    }

    #[test]
    fn malformed_pattern_fails_closed() {
        assert!(!glob_matches("[10de", "[10de"));
        assert!(!glob_matches("[10de", "10de"));
        assert!(!glob_matches("[[:hexdigit:]]", "a"));
        assert!(!glob_matches("10de\\", "10de"));
    }

    #[test]
    fn posix_named_classes() {
        assert!(glob_matches("[[:digit:]]03", "503"));
        assert!(!glob_matches("[[:digit:]]03", "d]03"));
        assert!(!glob_matches("[[:digit:]]03", "d03"));
        assert!(glob_matches("[[:xdigit:]]*", "10de"));
        assert!(!glob_matches("[[:XDIGIT:]]", "a"));
        assert!(glob_matches("[![:digit:]]*", "video"));
        assert!(!glob_matches("[![:digit:]]*", "0300"));
        assert!(glob_matches("[[:alpha:][:digit:]_]", "_"));
        assert!(glob_matches("[[:punct:]]", "-"));
        assert!(glob_matches("[[:punct:]]", "!"));
        assert!(!glob_matches("[[:punct:]]", "a"));
    }

    #[test]
    fn braces_are_literal() {
        assert!(!glob_matches("video-{a,b}", "video-a"));
        assert!(glob_matches("video-{a,b}", "video-{a,b}"));
        assert!(glob_matches("a{b", "a{b"));
        assert!(glob_matches("video-{a,b}*", "video-{a,b}-extra"));
        assert!(!glob_matches("video-{a,b}*", "video-a-extra"));
    }

    #[test]
    fn bracket_edge_members() {
        assert!(glob_matches("[]a]", "]"));
        assert!(glob_matches("[!]a]", "b"));
        assert!(!glob_matches("[!]a]", "]"));
        assert!(glob_matches("[a-]", "-"));
        assert!(!glob_matches("[!]", "!"));
        assert!(glob_matches("[!!]", "a"));
        assert!(!glob_matches("[!!]", "!"));
        assert!(glob_matches("[\\!]", "!"));
        assert!(!glob_matches("[\\!]", "a"));
        assert!(glob_matches("\\*", "*"));
        assert!(!glob_matches("\\*", "x"));
    }

    #[test]
    fn empty_rule_accepts_any_device() {
        assert!(rule_matches(&IdentifierRule::any(), &nvidia_gpu()));
    }

    #[test]
    fn whitelist_miss_fails_each_stage() {
        let device = nvidia_gpu();
        let by_class = IdentifierRule::any().with_class_ids(["0200"]);
        let by_vendor = IdentifierRule::any().with_vendor_ids(["8086"]);
        let by_device = IdentifierRule::any().with_device_ids(["0001", "0002"]);
        assert!(!rule_matches(&by_class, &device));
        assert!(!rule_matches(&by_vendor, &device));
        assert!(!rule_matches(&by_device, &device));
    }

    #[test]
    fn blacklist_hit_overrides_whitelist() {
        let device = nvidia_gpu();
        let rule = IdentifierRule::any()
            .with_class_ids(["03*"])
            .with_vendor_ids(["10de"])
            .with_device_ids(["*"])
            .with_blacklisted_device_ids(["1C8?"]);
        assert!(!rule_matches(&rule, &device));

        let rule = IdentifierRule::any()
            .with_class_ids(["*"])
            .with_blacklisted_class_ids(["0300"]);
        assert!(!rule_matches(&rule, &device));

        let rule = IdentifierRule::any().with_blacklisted_vendor_ids(["10de"]);
        assert!(!rule_matches(&rule, &device));
    }

    #[test]
    fn full_rule_passes_when_every_stage_passes() {
        let rule = IdentifierRule::any()
            .with_class_ids(["0300", "0302"])
            .with_blacklisted_class_ids(["0380"])
            .with_vendor_ids(["10DE"])
            .with_blacklisted_vendor_ids(["8086"])
            .with_device_ids(["1c8?"])
            .with_blacklisted_device_ids(["1c81"]);
        assert!(rule_matches(&rule, &nvidia_gpu()));
    }
}
