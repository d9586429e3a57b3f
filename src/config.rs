/// Service configuration loader - parses climate.toml
///
/// Keeps the dataset location, listener settings, and the fixed query
/// parameters of the precipitation/tobs routes out of the code. Every field
/// has a default, so a missing file runs the service against the stock
/// Hawaii dataset layout.

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "climate.toml";

/// Environment variable that overrides `DEFAULT_CONFIG_PATH`.
pub const CONFIG_PATH_ENV: &str = "CLIMATE_CONFIG";

/// Most recent measurement date in the published dataset.
pub const PRECIPITATION_REFERENCE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2017, 8, 23) {
    Some(date) => date,
    None => panic!("invalid precipitation reference date"),
};

/// Last observation of the most active station in the published dataset.
pub const TOBS_REFERENCE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2017, 8, 18) {
    Some(date) => date,
    None => panic!("invalid tobs reference date"),
};

/// Station with the most observations in the published dataset.
pub const MOST_ACTIVE_STATION: &str = "USC00519281";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure for TOML parsing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite file holding the station and measurement tables.
    pub database_path: PathBuf,
    pub bind_address: String,
    pub port: u16,
    /// Worker threads serving requests.
    pub workers: usize,
    pub reference: ApiConfig,
}

/// Fixed query parameters for the windowed routes.
///
/// The dataset is static, so its most recent dates and busiest station are
/// known in advance and pinned here instead of being derived per request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Last date of the precipitation window.
    pub precipitation_reference_date: NaiveDate,
    /// Last date of the tobs window (last observation of the busiest station).
    pub tobs_reference_date: NaiveDate,
    /// Station whose observations the tobs route reports.
    pub most_active_station: String,
    /// Window length ending at each reference date.
    pub lookback_days: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("Resources/hawaii.sqlite"),
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            workers: 4,
            reference: ApiConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            precipitation_reference_date: PRECIPITATION_REFERENCE_DATE,
            tobs_reference_date: TOBS_REFERENCE_DATE,
            most_active_station: MOST_ACTIVE_STATION.to_string(),
            lookback_days: 365,
        }
    }
}

/// `reference - lookback_days`, or `None` when it leaves chrono's date range.
fn window_start(reference: NaiveDate, lookback_days: i64) -> Option<NaiveDate> {
    reference.checked_sub_signed(Duration::try_days(lookback_days)?)
}

impl ApiConfig {
    /// First date of the precipitation window.
    ///
    /// Saturates at `NaiveDate::MIN`; `validate` rejects such windows on load.
    pub fn precipitation_start(&self) -> NaiveDate {
        window_start(self.precipitation_reference_date, self.lookback_days)
            .unwrap_or(NaiveDate::MIN)
    }

    /// First date of the tobs window. Saturates like `precipitation_start`.
    pub fn tobs_start(&self) -> NaiveDate {
        window_start(self.tobs_reference_date, self.lookback_days).unwrap_or(NaiveDate::MIN)
    }
}

impl ServiceConfig {
    /// `host:port` string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.reference.lookback_days < 0 {
            return Err(ConfigError::Invalid("lookback_days must not be negative".into()));
        }
        for (name, reference) in [
            ("precipitation_reference_date", self.reference.precipitation_reference_date),
            ("tobs_reference_date", self.reference.tobs_reference_date),
        ] {
            if window_start(reference, self.reference.lookback_days).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "lookback_days {} reaches past the supported date range from {} {}",
                    self.reference.lookback_days, name, reference
                )));
            }
        }
        if self.reference.most_active_station.trim().is_empty() {
            return Err(ConfigError::Invalid("most_active_station must not be empty".into()));
        }
        Ok(())
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str, origin: &Path) -> Result<ServiceConfig, ConfigError> {
    let config: ServiceConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from `path`.
///
/// A missing file yields the defaults; an unreadable or malformed one is an
/// error.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents, path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("{} not found, using default configuration", path.display());
            Ok(ServiceConfig::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolves the config path: explicit argument, then `CLIMATE_CONFIG`
/// (from the environment or `.env`), then `climate.toml`.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    dotenv::dotenv().ok();

    explicit
        .map(PathBuf::from)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
