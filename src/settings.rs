//! Configuration management for isofrac.
//!
//! Settings are read from INI files with the following precedence:
//!
//! 1. Local configuration (`./isofrac_config.cfg`)
//! 2. User configuration (`~/.config/isofrac/isofrac_config.cfg`)
//! 3. System configuration (`/etc/isofrac/isofrac_config.cfg`)
//! 4. Built-in defaults
//!
//! Each file only needs the keys it changes; later (higher priority) files
//! are applied on top of earlier ones.
//!
//! # Configuration File Format
//!
//! ```ini
//! [thresholds]
//! low_frequency = 30.0
//!
//! [output]
//! full_report = false
//! json = false
//!
//! [logging]
//! level = info
//!
//! [elements]
//! D = 1
//! ```
//!
//! The `[elements]` section extends the built-in atomic number table used to
//! locate the substituted atom in the normal-mode coordinates.

use crate::convergence::DEFAULT_LOW_FREQUENCY_THRESHOLD;
use crate::isotope::ExtendedElementTable;
use configparser::ini::Ini;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in every location.
pub const CONFIG_FILE_NAME: &str = "isofrac_config.cfg";

/// Errors that can occur during configuration loading and processing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// All program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Advisory thresholds
    pub thresholds: ThresholdSettings,
    /// Report options
    pub output: OutputSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
    /// Extra element symbol → atomic number entries
    pub elements: HashMap<String, u32>,
}

/// Advisory thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdSettings {
    /// Symmetric bound for low frequencies in cm⁻¹ (default: 30.0)
    pub low_frequency: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            low_frequency: DEFAULT_LOW_FREQUENCY_THRESHOLD,
        }
    }
}

/// Report options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputSettings {
    /// Write RPFR components, displacement sums, convergence tables and
    /// low frequencies to the text report (default: false)
    pub full_report: bool,
    /// Also write a JSON report next to the text report (default: false)
    pub json: bool,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: error, warn, info, debug, trace (default: "info")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// The configured level as a `log` filter; unknown names fall back to info.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

/// Loads and holds program settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
    load_warnings: Vec<String>,
}

impl SettingsManager {
    /// Loads settings from the system, user and local configuration files.
    ///
    /// A file that fails to parse or validate is skipped as a whole and
    /// described in [`SettingsManager::load_warnings`]; none of its keys are
    /// applied. The logger is usually not running yet at this point, so the
    /// caller reports those warnings.
    pub fn load() -> Result<Self, ConfigError> {
        let mut candidates = Vec::new();
        if let Some(system_path) = Self::get_system_config_path() {
            candidates.push(("system", system_path));
        }
        if let Some(user_path) = Self::get_user_config_path() {
            candidates.push(("user", user_path));
        }
        candidates.push(("local", PathBuf::from(CONFIG_FILE_NAME)));
        Ok(Self::load_from_files(&candidates))
    }

    /// Applies `candidates` in order, lowest priority first.
    fn load_from_files(candidates: &[(&str, PathBuf)]) -> Self {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();
        let mut load_warnings = Vec::new();
        for (kind, path) in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_config(path, &settings) {
                Ok(layered) => {
                    settings = layered;
                    config_source = format!("{} config ({})", kind, path.display());
                    debug!("Loaded {} configuration from: {}", kind, path.display());
                }
                Err(e) => load_warnings.push(format!(
                    "Failed to load {} config from {}: {}",
                    kind,
                    path.display(),
                    e
                )),
            }
        }

        Self {
            settings,
            config_source,
            load_warnings,
        }
    }

    /// Loads settings from a single file on top of the built-in defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let settings = Self::load_config(path, &Settings::default())?;
        Ok(Self {
            settings,
            config_source: format!("file ({})", path.display()),
            load_warnings: Vec::new(),
        })
    }

    /// Wraps already-built settings.
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            config_source: "provided settings".to_string(),
            load_warnings: Vec::new(),
        }
    }

    /// Configuration files that were skipped, with the reason.
    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    /// Returns the source of the loaded configuration.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the threshold settings.
    pub fn thresholds(&self) -> &ThresholdSettings {
        &self.settings.thresholds
    }

    /// Gets the output settings.
    pub fn output(&self) -> &OutputSettings {
        &self.settings.output
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Builds the element table: built-in periodic table plus `[elements]`.
    pub fn element_table(&self) -> ExtendedElementTable {
        ExtendedElementTable::new(self.settings.elements.clone())
    }

    /// Returns `base` with the keys present in one INI file applied.
    fn load_config(path: &Path, base: &Settings) -> Result<Settings, ConfigError> {
        let mut settings = base.clone();
        let content = fs::read_to_string(path)?;
        // Element symbols are case sensitive (Co vs CO), so keep key case.
        let mut ini = Ini::new_cs();
        let map = ini
            .read(content)
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        if let Some(section) = map.get("thresholds") {
            if let Some(Some(value)) = section.get("low_frequency") {
                let threshold: f64 = value.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("Invalid low_frequency: {}", value))
                })?;
                if !threshold.is_finite() || threshold < 0.0 {
                    return Err(ConfigError::InvalidValue(format!(
                        "low_frequency must be a non-negative number, got {}",
                        value
                    )));
                }
                settings.thresholds.low_frequency = threshold;
            }
        }

        if let Some(section) = map.get("output") {
            if let Some(Some(value)) = section.get("full_report") {
                settings.output.full_report = parse_bool("full_report", value)?;
            }
            if let Some(Some(value)) = section.get("json") {
                settings.output.json = parse_bool("json", value)?;
            }
        }

        if let Some(section) = map.get("logging") {
            if let Some(Some(level)) = section.get("level") {
                if level.parse::<log::LevelFilter>().is_err() {
                    return Err(ConfigError::InvalidValue(format!(
                        "Invalid log level: {}",
                        level
                    )));
                }
                settings.logging.level = level.to_lowercase();
            }
        }

        if let Some(section) = map.get("elements") {
            for (symbol, value) in section {
                let Some(value) = value else { continue };
                let z: u32 = value.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!(
                        "Invalid atomic number for {}: {}",
                        symbol, value
                    ))
                })?;
                settings.elements.insert(symbol.clone(), z);
            }
        }

        Ok(settings)
    }

    /// Gets the system configuration file path.
    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/isofrac").join(CONFIG_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("isofrac").join(CONFIG_FILE_NAME))
        }
    }

    /// Gets the user configuration file path.
    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("isofrac")
                    .join(CONFIG_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("isofrac").join(CONFIG_FILE_NAME))
        }
    }

    /// Writes a commented configuration template to `path`.
    pub fn create_template(path: &Path) -> Result<(), ConfigError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let defaults = Settings::default();
        format!(
            r#"# isofrac configuration file
#
# Files are applied in order, later ones overriding earlier ones:
#
# 1. System config (/etc/isofrac/isofrac_config.cfg)
# 2. User config (~/.config/isofrac/isofrac_config.cfg)
# 3. Current working directory (./isofrac_config.cfg)
#
# Missing sections or keys keep the defaults shown below.

[thresholds]
# Low frequencies outside +/- this value (cm-1) raise a warning (default: 30.0)
low_frequency = {}

[output]
# Include RPFR components, isotope displacement sums, convergence tables
# and low frequencies in the text report (default: false)
full_report = {}

# Also write <report>.json (default: false)
json = {}

[logging]
# error, warn, info, debug or trace (default: info)
level = {}

[elements]
# Extra element symbols for the atomic number lookup, e.g.
# D = 1
"#,
            defaults.thresholds.low_frequency,
            defaults.output.full_report,
            defaults.output.json,
            defaults.logging.level,
        )
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "Invalid {} value: {}",
            key, value
        ))),
    }
}
