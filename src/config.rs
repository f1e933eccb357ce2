//! Runtime configuration.
//!
//! Every collaborator receives the pieces of [`AppConfig`] it needs at
//! construction time. The file is TOML; all sections are optional and fall
//! back to the public Paris open-data endpoints.
//!
//! ```
//! use park_assist::config::AppConfig;
//!
//! let config = AppConfig::from_toml_str(r#"
//!     [engine]
//!     search_radius_km = 2.5
//!     random_seed = 7
//! "#).unwrap();
//!
//! assert_eq!(config.engine.search_radius_km, 2.5);
//! assert_eq!(config.engine.max_candidates, 15);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "PARK_ASSIST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "park-assist.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sources: SourceConfig,
    pub credentials: Credentials,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole recommendation cycle.
    pub cycle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cycle_timeout_secs: 120,
        }
    }
}

/// Upstream endpoints and dataset identifiers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    pub saemes_api_url: String,
    pub saemes_dataset: String,
    pub saemes_reference_dataset: String,
    pub paris_api_url: String,
    pub paris_parking_dataset: String,
    pub paris_works_dataset: String,
    pub ratp_traffic_url: String,
    pub directions_url: String,
    pub weather_url: String,
    pub ip_lookup_url: String,
    pub request_timeout_secs: u64,
    pub weather_timeout_secs: u64,
    pub ip_lookup_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            saemes_api_url: "https://data.opendatasoft.com/api/records/1.0/search/".to_string(),
            saemes_dataset: "places-disponibles-parkings-saemes@saemes".to_string(),
            saemes_reference_dataset: "referentiel-parkings-saemes@saemes".to_string(),
            paris_api_url: "https://opendata.paris.fr/api/records/1.0/search/".to_string(),
            paris_parking_dataset: "stationnement-en-ouvrage".to_string(),
            paris_works_dataset: "chantiers-perturbants".to_string(),
            ratp_traffic_url: "https://api-ratp.pierre-grimaud.fr/v4/traffic".to_string(),
            directions_url: "https://maps.googleapis.com/maps/api/directions/json".to_string(),
            weather_url: "http://www.infoclimat.fr/public-api/gfs/json".to_string(),
            ip_lookup_url: "https://api.ipify.org".to_string(),
            request_timeout_secs: 10,
            weather_timeout_secs: 15,
            ip_lookup_timeout_secs: 5,
        }
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather_timeout_secs)
    }

    pub fn ip_lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.ip_lookup_timeout_secs)
    }
}

/// Secrets. Usually provided through the environment rather than the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Credentials {
    pub maps_api_key: Option<String>,
    pub infoclimat_username: Option<String>,
    pub infoclimat_private_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search_radius_km: f64,
    pub max_candidates: usize,
    pub history_days: u32,
    pub destination_station_radius_km: f64,
    pub lot_station_radius_km: f64,
    pub prediction_station_radius_km: f64,
    /// Fixed seed for reproducible runs; fresh entropy per request when unset.
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            search_radius_km: 3.0,
            max_candidates: 15,
            history_days: 30,
            destination_station_radius_km: 0.8,
            lot_station_radius_km: 0.5,
            prediction_station_radius_km: 0.8,
            random_seed: None,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Loads the file named by `PARK_ASSIST_CONFIG` (or `park-assist.toml`),
    /// using defaults when it does not exist, then applies environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let base = if Path::new(&path).exists() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        let config = base.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `MAPS_API_KEY`, `INFOCLIMAT_USERNAME`, `INFOCLIMAT_PRIVATE_KEY`
    /// and `PARK_ASSIST_PORT`. Empty values are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("MAPS_API_KEY") {
            self.credentials.maps_api_key = Some(key);
        }
        if let Some(user) = non_empty("INFOCLIMAT_USERNAME") {
            self.credentials.infoclimat_username = Some(user);
        }
        if let Some(secret) = non_empty("INFOCLIMAT_PRIVATE_KEY") {
            self.credentials.infoclimat_private_key = Some(secret);
        }
        if let Some(port) = non_empty("PARK_ASSIST_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.search_radius_km.is_nan() || self.engine.search_radius_km <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.search_radius_km must be positive, got {}",
                self.engine.search_radius_km
            )));
        }
        if self.engine.max_candidates == 0 {
            return Err(ConfigError::Invalid("engine.max_candidates must be at least 1".to_string()));
        }
        if self.sources.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("sources.request_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}
