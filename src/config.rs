//! Configuration Module
//! Loads `config.yaml` and resolves the data, user-data and plot directories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Coordinate reference system of the Dove latitude/longitude fields.
pub const CRS_IN: &str = "EPSG:4326";
/// Coordinate reference system used for plotting (Web Mercator).
pub const CRS_OUT: &str = "EPSG:3857";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unknown distance unit '{0}' (expected m, km or mi)")]
    UnknownDistanceUnit(String),
    #[error("Unsupported image format '{0}' (expected png or svg)")]
    UnknownImageFormat(String),
}

/// Unit used when reporting distances between towers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
}

impl DistanceUnit {
    /// Rescaling factor: `meters / factor` gives a value in this unit.
    pub fn factor(self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1000.0,
            DistanceUnit::Miles => 1609.34,
        }
    }

    /// Short axis/table label.
    pub fn label(self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
        }
    }

    pub fn from_meters(self, meters: f64) -> f64 {
        meters / self.factor()
    }
}

impl FromStr for DistanceUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "meter" | "meters" => Ok(DistanceUnit::Meters),
            "km" | "kilometer" | "kilometers" => Ok(DistanceUnit::Kilometers),
            "mi" | "mile" | "miles" => Ok(DistanceUnit::Miles),
            _ => Err(ConfigError::UnknownDistanceUnit(s.to_string())),
        }
    }
}

impl TryFrom<String> for DistanceUnit {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DistanceUnit> for String {
    fn from(unit: DistanceUnit) -> Self {
        unit.label().to_string()
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output format of the generated charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            _ => Err(ConfigError::UnknownImageFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for ImageFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ImageFormat> for String {
    fn from(format: ImageFormat) -> Self {
        format.extension().to_string()
    }
}

/// Settings shared across the loader, search and chart modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory the relative folders below are resolved against.
    #[serde(skip)]
    pub working_dir: PathBuf,
    #[serde(rename = "data_folder")]
    pub data_dir: PathBuf,
    #[serde(rename = "user_data_folder")]
    pub user_data_dir: PathBuf,
    #[serde(rename = "plots_folder")]
    pub plot_dir: PathBuf,
    pub distance_unit: DistanceUnit,
    pub dpi: u32,
    /// Dove ring type kept during loading, e.g. `full-circle`.
    pub ring_type: String,
    #[serde(rename = "dove_data_refresh")]
    pub dove_refresh: bool,
    #[serde(default)]
    pub image_format: ImageFormat,
}

impl Settings {
    /// Load settings from a YAML file; relative folders resolve against `working_dir`.
    pub fn load(path: &Path, working_dir: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_yaml_str(&text)?;
        settings.working_dir = working_dir.to_path_buf();
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let mut settings: Settings = serde_yaml::from_str(text)?;
        settings.ring_type = settings.ring_type.to_lowercase();
        Ok(settings)
    }

    /// Point the user tower lists at a different folder.
    pub fn change_user_dir(&mut self, user_dir: Option<PathBuf>) {
        if let Some(dir) = user_dir {
            self.user_data_dir = dir;
        }
    }

    /// Directory holding `towers.csv` and `bells.csv`.
    pub fn dove_dir(&self) -> PathBuf {
        self.working_dir.join(&self.data_dir).join("dove_data")
    }

    /// Directory holding the world snapshot.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.working_dir.join(&self.data_dir).join("world")
    }

    pub fn user_dir(&self) -> PathBuf {
        self.working_dir.join(&self.user_data_dir)
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.working_dir.join(&self.plot_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
data_folder: data
user_data_folder: user
plots_folder: plots
distance_unit: miles
dpi: 150
ring_type: Full-circle
dove_data_refresh: true
"#;

    #[test]
    fn test_parse_settings() {
        let settings = Settings::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(settings.distance_unit, DistanceUnit::Miles);
        assert_eq!(settings.dpi, 150);
        assert_eq!(settings.ring_type, "full-circle");
        assert!(settings.dove_refresh);
        assert_eq!(settings.image_format, ImageFormat::Png);
    }

    #[test]
    fn test_directories_resolve_against_working_dir() {
        let mut settings = Settings::from_yaml_str(SAMPLE).unwrap();
        settings.working_dir = PathBuf::from("/srv/bells");
        assert_eq!(settings.dove_dir(), PathBuf::from("/srv/bells/data/dove_data"));
        assert_eq!(settings.snapshot_dir(), PathBuf::from("/srv/bells/data/world"));
        settings.change_user_dir(Some(PathBuf::from("elsewhere")));
        assert_eq!(settings.user_dir(), PathBuf::from("/srv/bells/elsewhere"));
        settings.change_user_dir(None);
        assert_eq!(settings.user_dir(), PathBuf::from("/srv/bells/elsewhere"));
    }

    #[test]
    fn test_distance_units() {
        assert_eq!("kilometers".parse::<DistanceUnit>().unwrap(), DistanceUnit::Kilometers);
        assert_eq!("mi".parse::<DistanceUnit>().unwrap().label(), "mi");
        assert!((DistanceUnit::Miles.from_meters(1609.34) - 1.0).abs() < 1e-12);
        assert!("furlongs".parse::<DistanceUnit>().is_err());
    }

    #[test]
    fn test_malformed_config_fails() {
        assert!(Settings::from_yaml_str("dpi: [not a number").is_err());
        let bad_unit = SAMPLE.replace("miles", "leagues");
        assert!(Settings::from_yaml_str(&bad_unit).is_err());
        let pdf = format!("{SAMPLE}image_format: pdf\n");
        assert!(Settings::from_yaml_str(&pdf).is_err());
    }
}
