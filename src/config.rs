//! Simulation configuration
//!
//! Loaded from TOML. Every field has a default, so a missing file or a partial
//! file still yields a runnable simulation. Lookup order:
//!
//! 1. Path given as first command line argument
//! 2. `IRQSIM_CONFIG` environment variable
//! 3. `<config dir>/irqsim/config.toml` if it exists
//! 4. Built-in defaults

use crate::controller::ControllerSettings;
use crate::device::DeviceSettings;
use crate::error::SimulationError;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_ENV_VAR: &str = "IRQSIM_CONFIG";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SimulationConfig {
    pub controller: ControllerSettings,
    pub devices: DeviceSettings,
    /// Buffer size of the notification broadcast channel
    pub event_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            controller: ControllerSettings::default(),
            devices: DeviceSettings::default(),
            event_capacity: 256,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).wrap_err("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&raw).wrap_err_with(|| format!("Invalid config file {}", path.display()))
    }

    /// Resolves the config source and loads it, falling back to defaults
    pub fn discover(cli_path: Option<PathBuf>) -> Result<Self> {
        match Self::locate(cli_path) {
            Some(path) => Self::load(&path),
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn locate(cli_path: Option<PathBuf>) -> Option<PathBuf> {
        if cli_path.is_some() {
            return cli_path;
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("irqsim").join("config.toml"))
            .filter(|path| path.is_file())
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.controller.poll_interval_ms == 0 {
            return Err(SimulationError::InvalidConfig(
                "controller.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(SimulationError::InvalidConfig(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        self.devices.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_control_panel_timing() {
        let config = SimulationConfig::default();
        assert_eq!(config.controller.poll_interval_ms, 100);
        assert_eq!(config.controller.isr_duration_ms, 1500);
        assert_eq!(config.devices.min_delay_ms, 3000);
        assert_eq!(config.devices.delay_range_ms, 7000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [controller]
            isr_duration_ms = 250

            [devices]
            min_delay_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.controller.isr_duration_ms, 250);
        assert_eq!(config.controller.poll_interval_ms, 100);
        assert_eq!(config.devices.min_delay_ms, 500);
        assert_eq!(config.devices.delay_range_ms, 7000);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SimulationConfig::from_toml_str("event_capacity = 0").is_err());
        assert!(SimulationConfig::from_toml_str("[devices]\ndelay_range_ms = 0").is_err());
        assert!(SimulationConfig::from_toml_str("[controller]\npoll_interval_ms = 0").is_err());
        assert!(SimulationConfig::from_toml_str("controller = 3").is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let path = PathBuf::from("/nonexistent/irqsim.toml");
        assert_eq!(SimulationConfig::locate(Some(path.clone())), Some(path));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = SimulationConfig::discover(Some(PathBuf::from("/nonexistent/irqsim.toml")));
        assert!(result.is_err());
    }
}
