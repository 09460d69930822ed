//! Configuration file management
//!
//! Loads TOML configuration files and provides application settings.
//! Override files are merged on top of the base config in order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MONITOR_POLL_INTERVAL_MS, MIN_MONITOR_POLL_INTERVAL_MS};

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which kinds of input devices may be connected
    pub input: InputConfig,
    /// Keyboard settings
    pub keyboard: KeyboardConfig,
    /// Hotplug monitor settings
    pub monitor: MonitorConfig,
    /// Display geometry
    pub display: DisplayConfig,
}

/// Allowed input device kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Connect physical keyboards
    pub keyboard: bool,
    /// Connect mice and touchpads
    pub pointer: bool,
    /// Connect touchscreens
    pub touchscreen: bool,
}

/// Keyboard settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Hide the on-screen keyboard while a physical keyboard is connected
    pub autohide: bool,
    /// XKB keyboard model (empty = default)
    pub xkb_model: String,
    /// XKB keyboard layout (e.g., "us", "de", empty = default)
    pub xkb_layout: String,
    /// XKB keyboard variant (empty = default)
    pub xkb_variant: String,
    /// XKB keyboard options (e.g., "ctrl:nocaps", empty = default)
    pub xkb_options: String,
}

/// Hotplug monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Follow device connects/disconnects after startup
    pub enabled: bool,
    /// Interval between hotplug polls in milliseconds (default: 1000)
    pub poll_interval_ms: u64,
}

/// Display geometry used for absolute pointer/touch coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            pointer: true,
            touchscreen: true,
        }
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            autohide: true,
            xkb_model: String::new(),
            xkb_layout: String::new(),
            xkb_variant: String::new(),
            xkb_options: String::new(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: DEFAULT_MONITOR_POLL_INTERVAL_MS,
        }
    }
}

impl MonitorConfig {
    /// Poll interval with the lower bound applied
    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.max(MIN_MONITOR_POLL_INTERVAL_MS)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
        }
    }
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/unlockboard.conf";

    /// Environment variable naming a config file
    const CONFIG_ENV: &'static str = "UNLOCKBOARD_CONFIG";

    /// Get the path that would be used for loading config
    ///
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. UNLOCKBOARD_CONFIG environment variable
        if let Ok(path) = std::env::var(Self::CONFIG_ENV) {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/unlockboard/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("unlockboard").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/unlockboard.conf
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load the base config and merge overrides on top.
    ///
    /// `base` replaces the lookup of `config_path()`. A broken base file
    /// falls back to defaults, a broken override is skipped.
    pub fn load(base: Option<&Path>, overrides: &[PathBuf]) -> Self {
        let base_path = base.map(Path::to_path_buf).or_else(Self::config_path);

        let mut merged = match base_path.as_deref() {
            Some(path) => match read_table(path) {
                Ok(table) => {
                    info!("Loaded config: {}", path.display());
                    table
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                    toml::Table::new()
                }
            },
            None => {
                info!("Using built-in default config");
                toml::Table::new()
            }
        };

        for path in overrides {
            match read_table(path) {
                Ok(table) => {
                    merge_tables(&mut merged, table);
                    info!("Applied config override: {}", path.display());
                }
                Err(e) => warn!("Skipping config override {}: {:#}", path.display(), e),
            }
        }

        match Self::from_table(merged) {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid merged config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    /// Parse a complete config from TOML text
    #[cfg(test)]
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content).context("Failed to parse config")?;
        Self::from_table(table)
    }

    fn from_table(table: toml::Table) -> Result<Self> {
        toml::Value::Table(table)
            .try_into()
            .context("Config does not match the expected schema")
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Merge `overlay` into `base`: tables merge per key, everything else
/// replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
