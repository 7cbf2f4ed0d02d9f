//! Build script for redline-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates dashboard.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Keys each section accepts, with the value type they need
const SCHEMA: &[(&str, &[(&str, Kind)])] = &[
    ("", &[("transport", Kind::Transport)]),
    ("serial", &[("baud_rate", Kind::Positive)]),
    ("bus", &[("bitrate", Kind::Positive)]),
    (
        "timing",
        &[
            ("dashboard_update_ms", Kind::Positive),
            ("debug_stats_ms", Kind::Positive),
            ("link_timeout_ms", Kind::Positive),
            ("drain_budget", Kind::Positive),
        ],
    ),
    ("debug", &[("stats", Kind::Bool)]),
];

#[derive(Clone, Copy)]
enum Kind {
    Transport,
    Positive,
    Bool,
}

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate dashboard.toml against the keys the firmware understands
fn validate_config() {
    println!("cargo:rerun-if-changed=dashboard.toml");

    let config_path = Path::new("dashboard.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: dashboard.toml not found!                                ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds dashboard.toml at build time.               ║\n\
            ║  Please create one in the redline-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read dashboard.toml                            ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in dashboard.toml                    ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let errors = check_schema(&config);
    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid dashboard configuration                          ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=dashboard.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_schema(config: &toml::Value) -> Vec<String> {
    let mut errors = Vec::new();

    let root = match config.as_table() {
        Some(table) => table,
        None => return vec!["top level must be a table".to_string()],
    };

    for (name, value) in root {
        match value {
            toml::Value::Table(table) => match section_keys(name) {
                Some(keys) => check_keys(name, table, keys, &mut errors),
                None => errors.push(format!("unknown section [{}]", name)),
            },
            _ => match section_keys("").and_then(|keys| find_kind(keys, name)) {
                Some(kind) => check_value(name, value, kind, &mut errors),
                None => errors.push(format!("unknown key '{}'", name)),
            },
        }
    }

    errors
}

fn section_keys(name: &str) -> Option<&'static [(&'static str, Kind)]> {
    SCHEMA
        .iter()
        .find(|(section, _)| *section == name)
        .map(|(_, keys)| *keys)
}

fn find_kind(keys: &[(&str, Kind)], key: &str) -> Option<Kind> {
    keys.iter().find(|(name, _)| *name == key).map(|(_, kind)| *kind)
}

fn check_keys(
    section: &str,
    table: &toml::map::Map<String, toml::Value>,
    keys: &[(&str, Kind)],
    errors: &mut Vec<String>,
) {
    for (key, value) in table {
        let label = format!("[{}] {}", section, key);
        match find_kind(keys, key) {
            Some(kind) => check_value(&label, value, kind, errors),
            None => errors.push(format!("unknown key {}", label)),
        }
    }
}

fn check_value(label: &str, value: &toml::Value, kind: Kind, errors: &mut Vec<String>) {
    match kind {
        Kind::Transport => match value.as_str() {
            Some("serial") | Some("bus") => {}
            _ => errors.push(format!("{} must be \"serial\" or \"bus\"", label)),
        },
        Kind::Positive => match value.as_integer() {
            Some(n) if n > 0 && n <= u32::MAX as i64 => {}
            _ => errors.push(format!("{} must be a positive integer", label)),
        },
        Kind::Bool => {
            if value.as_bool().is_none() {
                errors.push(format!("{} must be true or false", label));
            }
        }
    }
}
