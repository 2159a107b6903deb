//! Runtime settings, read from ~/.vaerprognose/config.json.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! A file that exists but does not parse is an error.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const REFERENCE_TIMEZONE: &str = "Europe/Oslo";

const MAX_TIMEOUT_SECS: u64 = 120;

/// Towns offered when the user does not name any.
pub const DEFAULT_CITIES: &[&str] = &[
    "Kristiansand",
    "Arendal",
    "Grimstad",
    "Mandal",
    "Flekkefjord",
    "Stavanger",
    "Sandnes",
    "Egersund",
    "Skien",
    "Porsgrunn",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub geocoding_url: String,
    pub forecast_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Language hint sent to the geocoder.
    pub language: String,
    /// IANA zone that defines "today" and the forecast's day boundaries.
    pub timezone: String,
    /// Accepted country names. Empty accepts the first candidate.
    pub country_filter: Vec<String>,
    pub max_candidates: usize,
    pub days: u32,
    pub default_cities: Vec<String>,
    /// How many of `default_cities` are selected when no town is given.
    pub default_selection: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            geocoding_url: GEOCODING_URL.into(),
            forecast_url: FORECAST_URL.into(),
            timeout_secs: 30,
            user_agent: format!("vaerprognose/{}", env!("CARGO_PKG_VERSION")),
            language: "nb".into(),
            timezone: REFERENCE_TIMEZONE.into(),
            country_filter: vec!["Norway".into()],
            max_candidates: 10,
            days: 7,
            default_cities: DEFAULT_CITIES.iter().map(|s| s.to_string()).collect(),
            default_selection: 5,
        }
    }
}

impl Settings {
    /// Load from the default location, falling back to defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = match fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let settings: Settings = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vaerprognose")
            .join("config.json")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "timeout_secs must be 1..={}, got {}",
                MAX_TIMEOUT_SECS, self.timeout_secs
            )));
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::Invalid("max_candidates must be at least 1".into()));
        }
        if self.days == 0 {
            return Err(ConfigError::Invalid("days must be at least 1".into()));
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown timezone '{}'", self.timezone)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The towns used when the caller names none.
    pub fn default_towns(&self) -> Vec<String> {
        self.default_cities
            .iter()
            .take(self.default_selection)
            .cloned()
            .collect()
    }
}
