//! Command-line interface argument parsing.

use crate::data::EventKind;
use clap::Parser;
use std::path::PathBuf;

/// Terminal dashboard of historical cyclonic events (floods and
/// landslides) in the canton of Pérez Zeledón, Costa Rica.
///
/// Examples:
///   cyclone-map
///   cyclone-map --event DESLIZAMIENTO --year 2010
///   cyclone-map --events datos.csv --districts distritos.geojson
///   cyclone-map --print --year 2016
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Event table: URL or path to a semicolon-delimited file
    #[arg(long, value_name = "SRC", env = "CYCLONE_MAP_EVENTS")]
    pub events: Option<String>,

    /// District polygons: URL or path to a GeoPackage (.gpkg) or GeoJSON file
    #[arg(long, value_name = "SRC", env = "CYCLONE_MAP_DISTRICTS")]
    pub districts: Option<String>,

    /// Initial event type (INUNDACION or DESLIZAMIENTO)
    #[arg(short, long, value_name = "TYPE")]
    pub event: Option<EventKind>,

    /// Initial year; falls back to the first year in the data
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cyclone-map.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the selection as plain text instead of opening the dashboard
    #[arg(short, long)]
    pub print: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log file used while the dashboard owns the terminal
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Generate a default .cyclone-map.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter when RUST_LOG is not set
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "cyclone_map=debug,info"
        } else {
            "info"
        }
    }
}
