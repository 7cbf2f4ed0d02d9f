//! Dashboard configuration
//!
//! A minimal TOML subset, enough for `dashboard.toml`:
//!
//! - `key = value` pairs (string, integer, boolean)
//! - `[section]` headers
//! - Comments (`# ...`), also after a value
//!
//! Unknown sections and keys are errors so that a typo never silently
//! falls back to a default.

use crate::handoff::Transport;
use crate::link::LINK_TIMEOUT_MS;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration parse error, with the 1-based line it occurred on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Header names no known section
    UnknownSection { line: u32 },
    /// Key not valid in its section
    UnknownKey { line: u32 },
    /// Value has the wrong type or is out of range
    InvalidValue { line: u32 },
    /// Line is neither a header nor `key = value`
    Malformed { line: u32 },
}

/// `[serial]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerialConfig {
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: redline_hal::uart::ECU_BAUD_RATE,
        }
    }
}

/// `[bus]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusConfig {
    pub bitrate: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bitrate: redline_hal::can::DEFAULT_BITRATE,
        }
    }
}

/// `[timing]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Period of the presentation consumer (ms)
    pub dashboard_update_ms: u32,
    /// Period of the debug statistics log (ms)
    pub debug_stats_ms: u32,
    /// Silence before `connected` is cleared (ms)
    pub link_timeout_ms: u32,
    /// Ring items decoded per ingest poll
    pub drain_budget: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dashboard_update_ms: 50,
            debug_stats_ms: 200,
            link_timeout_ms: LINK_TIMEOUT_MS,
            drain_budget: 64,
        }
    }
}

/// `[debug]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DebugConfig {
    /// Log link statistics every `debug_stats_ms`
    pub stats: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self { stats: true }
    }
}

/// Complete dashboard configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DashboardConfig {
    /// Transport whose ingest context owns the store
    pub transport: Transport,
    pub serial: SerialConfig,
    pub bus: BusConfig,
    pub timing: TimingConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Serial,
    Bus,
    Timing,
    Debug,
}

/// Parse a configuration file; keys not present keep their defaults
pub fn parse_config(input: &str) -> Result<DashboardConfig, ConfigError> {
    let mut config = DashboardConfig::default();
    let mut section = Section::Root;

    for (index, line) in input.lines().enumerate() {
        let line_no = index as u32 + 1;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])
                .ok_or(ConfigError::UnknownSection { line: line_no })?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ConfigError::Malformed { line: line_no })?;
        apply_value(&mut config, section, key, value, line_no)?;
    }

    Ok(config)
}

fn parse_section_header(header: &str) -> Option<Section> {
    match header.trim() {
        "serial" => Some(Section::Serial),
        "bus" => Some(Section::Bus),
        "timing" => Some(Section::Timing),
        "debug" => Some(Section::Debug),
        _ => None,
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Strip a trailing comment unless the '#' sits inside a string
    let value = match value.find('#') {
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn apply_value(
    config: &mut DashboardConfig,
    section: Section,
    key: &str,
    value: &str,
    line: u32,
) -> Result<(), ConfigError> {
    let invalid = ConfigError::InvalidValue { line };

    match (section, key) {
        (Section::Root, "transport") => {
            config.transport = match parse_string(value) {
                "serial" => Transport::Serial,
                "bus" => Transport::Bus,
                _ => return Err(invalid),
            };
        }
        (Section::Serial, "baud_rate") => {
            config.serial.baud_rate = parse_positive(value).ok_or(invalid)?;
        }
        (Section::Bus, "bitrate") => {
            config.bus.bitrate = parse_positive(value).ok_or(invalid)?;
        }
        (Section::Timing, "dashboard_update_ms") => {
            config.timing.dashboard_update_ms = parse_positive(value).ok_or(invalid)?;
        }
        (Section::Timing, "debug_stats_ms") => {
            config.timing.debug_stats_ms = parse_positive(value).ok_or(invalid)?;
        }
        (Section::Timing, "link_timeout_ms") => {
            config.timing.link_timeout_ms = parse_positive(value).ok_or(invalid)?;
        }
        (Section::Timing, "drain_budget") => {
            config.timing.drain_budget = parse_positive(value).ok_or(invalid)?;
        }
        (Section::Debug, "stats") => {
            config.debug.stats = parse_bool(value).ok_or(invalid)?;
        }
        _ => return Err(ConfigError::UnknownKey { line }),
    }
    Ok(())
}

/// Strip surrounding quotes; bare words are accepted as-is
fn parse_string(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

/// Integer greater than zero, `_` separators allowed
fn parse_positive<T>(value: &str) -> Option<T>
where
    T: core::str::FromStr + Default + PartialOrd,
{
    let mut digits = heapless::String::<24>::new();
    for c in value.chars().filter(|&c| c != '_') {
        digits.push(c).ok()?;
    }
    let parsed: T = digits.parse().ok()?;
    (parsed > T::default()).then_some(parsed)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
