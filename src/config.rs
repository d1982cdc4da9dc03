//! Configuration file handling.
//!
//! Settings come from `.cyclone-map.toml` (or `--config`), and CLI
//! arguments override whatever the file says.

use crate::cli::Args;
use crate::data::{EventKind, Source, Sources};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".cyclone-map.toml";

/// Published event table of the Pérez Zeledón dashboard
pub const DEFAULT_EVENTS_URL: &str =
    "https://github.com/Allan-15/App_ProSIG/raw/refs/heads/main/datos_perez_zeledon.csv";

/// Published district polygons of the Pérez Zeledón dashboard
pub const DEFAULT_DISTRICTS_URL: &str =
    "https://github.com/Allan-15/App_ProSIG/raw/refs/heads/main/distritos_pz.gpkg";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub map: MapConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the two datasets come from (URL or path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_events")]
    pub events: String,

    #[serde(default = "default_districts")]
    pub districts: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            events: default_events(),
            districts: default_districts(),
        }
    }
}

fn default_events() -> String {
    DEFAULT_EVENTS_URL.to_string()
}

fn default_districts() -> String {
    DEFAULT_DISTRICTS_URL.to_string()
}

/// Initial control values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Flag column of the initial event type.
    #[serde(default = "default_event")]
    pub event: String,

    /// Initial year; the first year in the data when unset or absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            event: default_event(),
            year: None,
        }
    }
}

fn default_event() -> String {
    EventKind::Flood.column().to_string()
}

/// Initial map view. Unset centre/zoom fit the district bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_lon: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,

    #[serde(default = "default_true")]
    pub show_labels: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lon: None,
            center_lat: None,
            zoom: None,
            show_labels: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// File receiving logs while the dashboard owns the terminal.
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("cyclone-map.log")
}

/// Fully resolved settings the program runs with.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Sources,
    pub kind: EventKind,
    pub year: Option<i32>,
    pub map: MapConfig,
    pub log_file: PathBuf,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load `--config` if given, else the default file if present, else
    /// built-in defaults.
    pub fn discover(args: &Args) -> Result<Self> {
        match &args.config {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref events) = args.events {
            self.sources.events = events.clone();
        }
        if let Some(ref districts) = args.districts {
            self.sources.districts = districts.clone();
        }
        if let Some(kind) = args.event {
            self.selection.event = kind.column().to_string();
        }
        if let Some(year) = args.year {
            self.selection.year = Some(year);
        }
        if let Some(ref file) = args.log_file {
            self.logging.file = file.clone();
        }
    }

    /// Validate and resolve into run settings.
    pub fn settings(&self) -> Result<Settings> {
        let kind: EventKind = self
            .selection
            .event
            .parse()
            .map_err(anyhow::Error::msg)
            .context("Invalid [selection] event")?;

        Ok(Settings {
            sources: Sources {
                events: Source::parse(&self.sources.events),
                districts: Source::parse(&self.sources.districts),
            },
            kind,
            year: self.selection.year,
            map: self.map.clone(),
            log_file: self.logging.file.clone(),
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sources.events, DEFAULT_EVENTS_URL);
        assert_eq!(config.selection.event, "INUNDACION");
        assert!(config.map.show_labels);
        let settings = config.settings().unwrap();
        assert_eq!(settings.kind, EventKind::Flood);
        assert!(matches!(settings.sources.districts, Source::Url(_)));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[sources]
events = "data/eventos.csv"
districts = "data/distritos.geojson"

[selection]
event = "DESLIZAMIENTO"
year = 2011

[map]
zoom = 900.0
show_labels = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        let settings = config.settings().unwrap();
        assert_eq!(settings.sources.events, Source::Path(PathBuf::from("data/eventos.csv")));
        assert_eq!(settings.kind, EventKind::Landslide);
        assert_eq!(settings.year, Some(2011));
        assert_eq!(settings.map.zoom, Some(900.0));
        assert_eq!(settings.map.center_lon, None);
        assert!(!settings.map.show_labels);
        assert_eq!(settings.log_file, PathBuf::from("cyclone-map.log"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        let args = Args {
            events: Some("local.csv".into()),
            event: Some(EventKind::Landslide),
            year: Some(2016),
            ..Args::default()
        };
        config.merge_with_args(&args);
        let settings = config.settings().unwrap();
        assert_eq!(settings.sources.events, Source::Path(PathBuf::from("local.csv")));
        assert_eq!(settings.sources.districts, Source::Url(DEFAULT_DISTRICTS_URL.into()));
        assert_eq!(settings.kind, EventKind::Landslide);
        assert_eq!(settings.year, Some(2016));
    }

    #[test]
    fn test_invalid_event_in_config() {
        let config: Config = toml::from_str("[selection]\nevent = \"SISMO\"").unwrap();
        assert!(config.settings().is_err());
    }

    #[test]
    fn test_default_toml_round_trips() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[sources]"));
        assert!(toml_str.contains("[selection]"));
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
