// Google Directions API client

use reqwest::blocking;
use serde_json::Value;

use crate::config::SourceConfig;
use crate::error::{ParkError, Result};
use crate::geo::{GeoPoint, decode_polyline};
use crate::models::TravelMode;
use crate::sources::{get_json, http_client};

#[derive(Debug, Clone, Copy)]
pub struct DirectionsRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub mode: TravelMode,
    pub with_traffic: bool,
    pub avoid_works: bool,
}

impl DirectionsRequest {
    /// Query parameters, without the API key.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let driving = self.mode == TravelMode::Driving;
        let mut params = vec![
            ("origin", format!("{},{}", self.origin.lat, self.origin.lon)),
            ("destination", format!("{},{}", self.destination.lat, self.destination.lon)),
            ("mode", self.mode.as_str().to_string()),
            ("alternatives", self.avoid_works.to_string()),
        ];
        if self.with_traffic && driving {
            params.push(("departure_time", "now".to_string()));
        }
        if self.avoid_works && driving {
            params.push(("avoid", "tolls".to_string()));
        }
        params
    }
}

/// One candidate route returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOption {
    pub duration_min: u32,
    pub duration_in_traffic_min: Option<u32>,
    pub points: Vec<GeoPoint>,
}

pub trait RouteProvider: Send + Sync {
    fn routes(&self, request: &DirectionsRequest) -> Result<Vec<RouteOption>>;
}

pub struct GoogleDirections {
    client: blocking::Client,
    url: String,
    api_key: String,
}

impl GoogleDirections {
    pub fn new(config: &SourceConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(GoogleDirections {
            client: http_client(config.request_timeout())?,
            url: config.directions_url.clone(),
            api_key: api_key.into(),
        })
    }
}

impl RouteProvider for GoogleDirections {
    fn routes(&self, request: &DirectionsRequest) -> Result<Vec<RouteOption>> {
        let params = request.params();
        let mut query: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        query.push(("key", self.api_key.as_str()));

        let json = get_json(&self.client, &self.url, &query)?;
        parse_routes(&json)
    }
}

/// Routes of an `OK` response; any other status is a provider error.
pub fn parse_routes(json: &Value) -> Result<Vec<RouteOption>> {
    let status = json["status"].as_str().unwrap_or("MISSING_STATUS");
    if status != "OK" {
        let message = json["error_message"].as_str().unwrap_or(status);
        return Err(ParkError::Provider(format!("Directions API: {}", message)));
    }

    let routes: Vec<RouteOption> = json["routes"]
        .as_array()
        .ok_or_else(|| ParkError::Parse("Missing routes array".to_string()))?
        .iter()
        .filter_map(|route| {
            let leg = &route["legs"][0];
            let duration_min = (leg["duration"]["value"].as_u64()? / 60) as u32;
            let duration_in_traffic_min = leg["duration_in_traffic"]["value"].as_u64().map(|s| (s / 60) as u32);
            let points = route["overview_polyline"]["points"]
                .as_str()
                .map(decode_polyline)
                .unwrap_or_default();

            Some(RouteOption { duration_min, duration_in_traffic_min, points })
        })
        .collect();

    if routes.is_empty() {
        return Err(ParkError::Provider("Directions API returned no usable route".to_string()));
    }

    Ok(routes)
}
