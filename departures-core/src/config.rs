//! Device configuration.
//!
//! Read from a JSON file (`BOARD_CONFIG`, default `config.json`). Secrets can
//! be kept out of the file: `NRE_TOKEN`, `TFL_APP_KEY`, `GITHUB_TOKEN` and
//! `OPENWEATHERMAP_KEY` override the file's values when set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::darwin::RailConfig;
use crate::domain::{MAX_SERVICES, UpdateCode, Version};
use crate::http::TrustPolicy;
use crate::tfl::TflConfig;
use crate::update::{DEFAULT_REPO, DigestPolicy, ReleaseConfig};
use crate::weather::WeatherConfig;

/// Environment variable naming the config file.
pub const CONFIG_PATH_VAR: &str = "BOARD_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";
const DEFAULT_POLL_SECS: u64 = 60;
const MIN_POLL_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> UpdateCode {
        UpdateCode::DataError
    }
}

/// Which board the device shows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoardKind {
    /// National Rail departures for a station.
    Rail {
        /// Three-letter station code
        crs: String,
        #[serde(default)]
        include_bus: bool,
        #[serde(default = "default_rows")]
        num_rows: usize,
    },
    /// Underground arrivals for a stop point.
    Underground {
        stop_id: String,
        /// Shown as the board heading; the feed does not name the station
        #[serde(default)]
        location: String,
    },
}

fn default_rows() -> usize {
    MAX_SERVICES
}

fn default_poll_secs() -> u64 {
    DEFAULT_POLL_SECS
}

fn default_repo() -> String {
    DEFAULT_REPO.to_string()
}

/// Over-the-air update settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    pub enabled: bool,
    #[serde(default = "default_repo")]
    pub repo: String,
    pub github_token: Option<String>,
    pub digest_policy: DigestPolicy,
    /// Version of the running firmware; the package version when unset
    pub firmware_version: Option<String>,
    pub firmware_path: PathBuf,
    /// Size of the firmware slot in bytes
    pub firmware_capacity: u64,
    /// Directory the web bundle is served from
    pub web_dir: PathBuf,
    /// Records the installed web bundle version
    pub web_marker: PathBuf,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            repo: default_repo(),
            github_token: None,
            digest_policy: DigestPolicy::default(),
            firmware_version: None,
            firmware_path: PathBuf::from("firmware.bin"),
            firmware_capacity: 0x1E_0000,
            web_dir: PathBuf::from("www"),
            web_marker: PathBuf::from("www/webapp.ver"),
        }
    }
}

impl UpdateSettings {
    pub fn running_firmware(&self) -> Version {
        Version::parse_lenient(
            self.firmware_version
                .as_deref()
                .unwrap_or(env!("CARGO_PKG_VERSION")),
        )
    }
}

/// Current weather shown beneath the board.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WeatherSettings {
    #[serde(default)]
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Override the weather API base URL (for testing)
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Everything the device needs to run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoardConfig {
    pub board: BoardKind,
    #[serde(default)]
    pub nre_token: String,
    #[serde(default)]
    pub tfl_app_key: String,
    #[serde(default)]
    pub trust: TrustPolicy,
    #[serde(default = "default_poll_secs")]
    pub poll_interval_secs: u64,
    /// Override the rail service description URL (for testing)
    #[serde(default)]
    pub wsdl_url: Option<String>,
    /// Override the underground API base URL (for testing)
    #[serde(default)]
    pub tfl_base_url: Option<String>,
    #[serde(default)]
    pub update: UpdateSettings,
    /// No weather line when absent
    #[serde(default)]
    pub weather: Option<WeatherSettings>,
}

impl BoardConfig {
    /// Load from the file named by `BOARD_CONFIG` with environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::from_file(Path::new(&path))?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace secrets with non-empty values from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());
        if let Some(token) = lookup("NRE_TOKEN") {
            self.nre_token = token;
        }
        if let Some(key) = lookup("TFL_APP_KEY") {
            self.tfl_app_key = key;
        }
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.update.github_token = Some(token);
        }
        if let (Some(key), Some(weather)) = (lookup("OPENWEATHERMAP_KEY"), self.weather.as_mut()) {
            weather.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.board {
            BoardKind::Rail { crs, num_rows, .. } => {
                if crs.len() != 3 || !crs.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(ConfigError::Invalid(format!("{crs:?} is not a station code")));
                }
                if self.nre_token.is_empty() {
                    return Err(ConfigError::Invalid("rail boards need an NRE token".into()));
                }
                if *num_rows == 0 || *num_rows > MAX_SERVICES {
                    return Err(ConfigError::Invalid(format!(
                        "num_rows must be 1 to {MAX_SERVICES}"
                    )));
                }
            }
            BoardKind::Underground { stop_id, .. } => {
                if stop_id.is_empty() {
                    return Err(ConfigError::Invalid("underground boards need a stop_id".into()));
                }
            }
        }
        if let Some(weather) = &self.weather {
            if weather.api_key.is_empty() {
                return Err(ConfigError::Invalid("weather needs an OpenWeatherMap key".into()));
            }
            if !(-90.0..=90.0).contains(&weather.latitude)
                || !(-180.0..=180.0).contains(&weather.longitude)
            {
                return Err(ConfigError::Invalid(format!(
                    "{}, {} is not a location",
                    weather.latitude, weather.longitude
                )));
            }
        }
        if self.poll_interval_secs < MIN_POLL_SECS {
            return Err(ConfigError::Invalid(format!(
                "poll interval must be at least {MIN_POLL_SECS}s"
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Rail client configuration, if this is a rail board.
    pub fn rail(&self) -> Option<RailConfig> {
        let BoardKind::Rail {
            crs,
            include_bus,
            num_rows,
        } = &self.board
        else {
            return None;
        };
        let config = RailConfig::new(&self.nre_token, crs)
            .with_include_bus(*include_bus)
            .with_num_rows(*num_rows);
        Some(match &self.wsdl_url {
            Some(url) => config.with_wsdl_url(url),
            None => config,
        })
    }

    /// Underground client configuration, if this is an underground board.
    pub fn underground(&self) -> Option<TflConfig> {
        let BoardKind::Underground { stop_id, .. } = &self.board else {
            return None;
        };
        let config = TflConfig::new(&self.tfl_app_key, stop_id);
        Some(match &self.tfl_base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        })
    }

    /// Weather client configuration, if a weather line is wanted.
    pub fn weather(&self) -> Option<WeatherConfig> {
        let weather = self.weather.as_ref()?;
        let config = WeatherConfig::new(&weather.api_key, weather.latitude, weather.longitude);
        Some(match &weather.base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        })
    }

    pub fn release(&self) -> ReleaseConfig {
        ReleaseConfig::new()
            .with_repo(&self.update.repo)
            .with_token(self.update.github_token.clone())
            .with_digest_policy(self.update.digest_policy)
    }
}
