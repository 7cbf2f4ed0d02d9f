//! Embedded dashboard configuration

use defmt::*;
use redline_core::config::{parse_config, DashboardConfig};
use redline_core::Transport;

/// Compiled-in configuration, validated by build.rs
const EMBEDDED_CONFIG: &str = include_str!("../dashboard.toml");

/// Parse the embedded configuration, falling back to defaults
pub fn load() -> DashboardConfig {
    let mut config = match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration");
            config
        }
        Err(e) => {
            warn!("Embedded configuration rejected: {}, using defaults", e);
            DashboardConfig::default()
        }
    };

    // The RP2040 has no frame bus controller
    if config.transport == Transport::Bus {
        warn!("Bus transport not available on this board, using serial");
        config.transport = Transport::Serial;
    }

    info!(
        "Config: {} baud, update {} ms, link timeout {} ms, budget {}",
        config.serial.baud_rate,
        config.timing.dashboard_update_ms,
        config.timing.link_timeout_ms,
        config.timing.drain_budget
    );
    config
}
