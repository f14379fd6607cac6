//! Configuration for a conversion: color mode, page geometry and the browser
//! used to rasterize the document.
//!
//! Settings come from three layers, later layers winning:
//! 1. built-in defaults (`LIGHT`, `LETTER`, 0.5in margin),
//! 2. an optional TOML file selected with [`ConfigSource`],
//! 3. command line flags.
//!
//! # Configuration Example
//!
//! ```toml
//! mode = "DARK"
//! size = "A4"
//! margin = 0.75
//!
//! [chrome]
//! path = "/usr/bin/chromium"
//! sandbox = true
//! timeout = 60
//! settle_ms = 500
//! ```
//!
//! Unlike a forgiving style file, every value here is validated: an unknown
//! mode or size, a negative margin or a malformed file is reported as
//! [`MdpError::ConfigError`] instead of silently falling back to a default.

use crate::MdpError;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use toml::Value;

/// Default page margin in inches.
pub const DEFAULT_MARGIN_INCHES: f64 = 0.5;

/// Configuration source for conversion settings.
/// Determines where the TOML configuration should be loaded from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    /// Use built-in defaults
    Default,
    /// Load configuration from a file path
    File(&'a str),
    /// Use an embedded TOML configuration string
    Embedded(&'a str),
}

/// Color theme of the rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Light,
    Dark,
}

impl ColorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Light => "LIGHT",
            ColorMode::Dark => "DARK",
        }
    }
}

impl FromStr for ColorMode {
    type Err = MdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LIGHT" => Ok(ColorMode::Light),
            "DARK" => Ok(ColorMode::Dark),
            _ => Err(MdpError::ConfigError {
                message: format!("Unknown color mode '{}'", s),
                suggestion: "Use LIGHT or DARK".to_string(),
            }),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    Letter,
    A4,
}

impl PageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageSize::Letter => "LETTER",
            PageSize::A4 => "A4",
        }
    }

    /// The keyword used in the CSS `@page { size: … }` rule.
    pub fn css_keyword(&self) -> &'static str {
        match self {
            PageSize::Letter => "letter",
            PageSize::A4 => "A4",
        }
    }

    /// Paper width and height in inches.
    pub fn dimensions_inches(&self) -> (f64, f64) {
        match self {
            PageSize::Letter => (8.5, 11.0),
            PageSize::A4 => (8.27, 11.69),
        }
    }
}

impl FromStr for PageSize {
    type Err = MdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LETTER" => Ok(PageSize::Letter),
            "A4" => Ok(PageSize::A4),
            _ => Err(MdpError::ConfigError {
                message: format!("Unknown page size '{}'", s),
                suggestion: "Use LETTER or A4".to_string(),
            }),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks that a margin is a usable inch quantity.
pub fn validate_margin(margin_inches: f64) -> Result<f64, MdpError> {
    if !margin_inches.is_finite() || margin_inches < 0.0 {
        return Err(MdpError::ConfigError {
            message: format!("Invalid page margin {}", margin_inches),
            suggestion: "Use a non-negative number of inches, e.g. 0.5".to_string(),
        });
    }
    Ok(margin_inches)
}

/// Options for the headless browser that prints the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChromeSettings {
    /// Browser executable; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    pub sandbox: bool,
    /// Seconds before an idle browser or a stalled tab operation is abandoned.
    pub timeout_secs: u64,
    /// Milliseconds to wait after navigation so embedded fonts and images load.
    pub settle_ms: u64,
}

impl Default for ChromeSettings {
    fn default() -> Self {
        Self {
            executable: None,
            sandbox: true,
            timeout_secs: 60,
            settle_ms: 500,
        }
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub mode: ColorMode,
    pub page_size: PageSize,
    pub margin_inches: f64,
    pub chrome: ChromeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: ColorMode::default(),
            page_size: PageSize::default(),
            margin_inches: DEFAULT_MARGIN_INCHES,
            chrome: ChromeSettings::default(),
        }
    }
}

fn type_error(key: &str, expected: &str) -> MdpError {
    MdpError::ConfigError {
        message: format!("Configuration key '{}' must be {}", key, expected),
        suggestion: "Fix the value in your configuration file".to_string(),
    }
}

fn parse_str<'v>(table: &'v Value, key: &str) -> Result<Option<&'v str>, MdpError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| type_error(key, "a string")),
    }
}

fn parse_float(table: &Value, key: &str) -> Result<Option<f64>, MdpError> {
    match table.get(key) {
        None => Ok(None),
        // TOML keeps `1` and `1.0` distinct; accept both for inch values
        Some(Value::Float(f)) => Ok(Some(*f)),
        Some(Value::Integer(i)) => Ok(Some(*i as f64)),
        Some(_) => Err(type_error(key, "a number")),
    }
}

fn parse_bool(table: &Value, key: &str) -> Result<Option<bool>, MdpError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => v.as_bool().map(Some).ok_or_else(|| type_error(key, "true or false")),
    }
}

fn parse_u64(table: &Value, key: &str) -> Result<Option<u64>, MdpError> {
    match table.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .and_then(|i| u64::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| type_error(key, "a non-negative integer")),
    }
}

/// Parses a TOML configuration string on top of the built-in defaults.
pub fn parse_config_string(config_str: &str) -> Result<Settings, MdpError> {
    let root: Value = toml::from_str(config_str).map_err(|e| MdpError::ConfigError {
        message: format!("Invalid TOML: {}", e),
        suggestion: "Check the configuration file syntax".to_string(),
    })?;

    let mut settings = Settings::default();

    if let Some(mode) = parse_str(&root, "mode")? {
        settings.mode = mode.parse()?;
    }
    if let Some(size) = parse_str(&root, "size")? {
        settings.page_size = size.parse()?;
    }
    if let Some(margin) = parse_float(&root, "margin")? {
        settings.margin_inches = validate_margin(margin)?;
    }

    if let Some(chrome) = root.get("chrome") {
        if !chrome.is_table() {
            return Err(type_error("chrome", "a table"));
        }
        if let Some(path) = parse_str(chrome, "path")? {
            settings.chrome.executable = Some(PathBuf::from(path));
        }
        if let Some(sandbox) = parse_bool(chrome, "sandbox")? {
            settings.chrome.sandbox = sandbox;
        }
        if let Some(timeout) = parse_u64(chrome, "timeout")? {
            settings.chrome.timeout_secs = timeout;
        }
        if let Some(settle) = parse_u64(chrome, "settle_ms")? {
            settings.chrome.settle_ms = settle;
        }
    }

    Ok(settings)
}

/// Loads settings from the given source.
///
/// # Examples
/// ```
/// use md_pdf::config::{load_config_from_source, ColorMode, ConfigSource};
///
/// let settings = load_config_from_source(ConfigSource::Embedded("mode = \"DARK\"")).unwrap();
/// assert_eq!(settings.mode, ColorMode::Dark);
/// ```
pub fn load_config_from_source(source: ConfigSource) -> Result<Settings, MdpError> {
    match source {
        ConfigSource::Default => Ok(Settings::default()),
        ConfigSource::File(path) => {
            let content = fs::read_to_string(path).map_err(|e| MdpError::ConfigError {
                message: format!("Cannot read configuration file '{}': {}", path, e),
                suggestion: "Check the --config path".to_string(),
            })?;
            parse_config_string(&content)
        }
        ConfigSource::Embedded(content) => parse_config_string(content),
    }
}
