// Configuration module for the vision edge gateway
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
    let mut config = load_config(path)?;

    if let Ok(listen_addr) = std::env::var("GATEWAY_LISTEN_ADDR") {
        config.server.listen_addr = listen_addr;
    }

    if let Ok(level) = std::env::var("GATEWAY_LOG_LEVEL") {
        config.logging.level = level;
    }

    Ok(config)
}
