// Infoclimat GFS forecast with signed `_auth` parameter

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::blocking;
use serde_json::Value;
use sha1::Sha1;

use crate::config::{Credentials, SourceConfig};
use crate::error::{ParkError, Result};
use crate::geo::GeoPoint;
use crate::models::WeatherReport;
use crate::sources::{get_json, http_client};

type HmacSha1 = Hmac<Sha1>;

const FALLBACK_IP: &str = "0.0.0.0";

/// Weather at a point. Never fails: problems become [`WeatherReport::Unavailable`].
pub trait WeatherSource: Send + Sync {
    fn weather_at(&self, point: GeoPoint) -> WeatherReport;
}

/// Used when no credentials are configured and in tests.
#[derive(Debug, Clone)]
pub struct NoWeather {
    reason: String,
}

impl NoWeather {
    pub fn new(reason: impl Into<String>) -> Self {
        NoWeather { reason: reason.into() }
    }
}

impl WeatherSource for NoWeather {
    fn weather_at(&self, _point: GeoPoint) -> WeatherReport {
        WeatherReport::Unavailable(self.reason.clone())
    }
}

pub struct InfoclimatClient {
    client: blocking::Client,
    ip_client: blocking::Client,
    url: String,
    ip_lookup_url: String,
    username: String,
    private_key: String,
}

impl InfoclimatClient {
    pub fn new(config: &SourceConfig, credentials: &Credentials) -> Result<Self> {
        let (username, private_key) = match (&credentials.infoclimat_username, &credentials.infoclimat_private_key) {
            (Some(user), Some(key)) => (user.clone(), key.clone()),
            _ => {
                return Err(ParkError::Credentials(
                    "INFOCLIMAT_USERNAME and INFOCLIMAT_PRIVATE_KEY are required".to_string(),
                ));
            }
        };

        Ok(InfoclimatClient {
            client: http_client(config.weather_timeout())?,
            ip_client: http_client(config.ip_lookup_timeout())?,
            url: config.weather_url.clone(),
            ip_lookup_url: config.ip_lookup_url.clone(),
            username,
            private_key,
        })
    }

    /// Infoclimat client when credentials exist, otherwise [`NoWeather`].
    pub fn from_config(config: &SourceConfig, credentials: &Credentials) -> Box<dyn WeatherSource> {
        match Self::new(config, credentials) {
            Ok(client) => Box::new(client),
            Err(e) => {
                tracing::debug!("Weather disabled: {}", e);
                Box::new(NoWeather::new(e.to_string()))
            }
        }
    }

    fn public_ip(&self) -> String {
        let lookup = || -> Result<String> {
            let response = self
                .ip_client
                .get(&self.ip_lookup_url)
                .send()
                .map_err(|e| ParkError::Network(format!("Failed to fetch public IP: {}", e)))?;
            if !response.status().is_success() {
                return Err(ParkError::Status(format!("IP lookup returned {}", response.status())));
            }
            Ok(response.text()?.trim().to_string())
        };

        lookup().unwrap_or_else(|e| {
            tracing::warn!("⚠️  {}, using {}", e, FALLBACK_IP);
            FALLBACK_IP.to_string()
        })
    }

    fn fetch(&self, point: GeoPoint) -> Result<Value> {
        let ip = self.public_ip();
        let auth = auth_token(&self.username, &self.private_key, &ip, Utc::now(), point)?;
        let ll = format_ll(point);

        tracing::info!("🌦️  Fetching weather for {}...", ll);
        get_json(
            &self.client,
            &self.url,
            &[("_ll", ll.as_str()), ("_auth", auth.as_str()), ("verbose", "true")],
        )
    }
}

impl WeatherSource for InfoclimatClient {
    fn weather_at(&self, point: GeoPoint) -> WeatherReport {
        match self.fetch(point) {
            Ok(json) => interpret_response(json),
            Err(e) => {
                tracing::warn!("❌ Weather unavailable: {}", e);
                WeatherReport::Unavailable(e.to_string())
            }
        }
    }
}

fn format_ll(point: GeoPoint) -> String {
    format!("{:.6},{:.6}", point.lat, point.lon)
}

/// Hex HMAC-SHA1 of `message`.
pub fn sign(key: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| ParkError::Credentials(format!("Invalid private key: {}", e)))?;
    mac.update(message.as_bytes());
    Ok(mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

/// `base64url_nopad("user|ip|timestamp|signature")`, the signature covering
/// `"user|ip|timestamp|lat,lon"`.
pub fn auth_token(username: &str, private_key: &str, ip: &str, at: DateTime<Utc>, point: GeoPoint) -> Result<String> {
    let timestamp = at.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let to_sign = format!("{}|{}|{}|{}", username, ip, timestamp, format_ll(point));
    let signature = sign(private_key, &to_sign)?;
    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}|{}|{}", username, ip, timestamp, signature)))
}

/// `request_state == 200` means usable data; anything else carries the API message.
pub fn interpret_response(json: Value) -> WeatherReport {
    if json["request_state"].as_i64() == Some(200) {
        return WeatherReport::Available(json);
    }

    let state = match &json["request_state"] {
        Value::Null => "N/A".to_string(),
        other => other.to_string(),
    };
    let message = json["message"].as_str().unwrap_or("Unknown error from Infoclimat API.");
    tracing::warn!("❌ Infoclimat error: state={}, message={}", state, message);
    WeatherReport::Unavailable(format!("Infoclimat API Error: State={}, Message={}", state, message))
}
