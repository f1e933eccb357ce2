// RATP metro traffic status

use reqwest::blocking;
use serde_json::Value;

use crate::config::SourceConfig;
use crate::error::{ParkError, Result};
use crate::models::TransitIncident;
use crate::random::RandomSource;
use crate::sources::{Feed, get_json, http_client};
use crate::transit::build_incident;

pub struct RatpTrafficFeed {
    client: blocking::Client,
    url: String,
}

impl RatpTrafficFeed {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(RatpTrafficFeed {
            client: http_client(config.request_timeout())?,
            url: config.ratp_traffic_url.clone(),
        })
    }
}

impl Feed for RatpTrafficFeed {
    type Item = TransitIncident;

    fn name(&self) -> &str {
        "RATP metro lines"
    }

    fn fetch(&self, _rng: &mut dyn RandomSource) -> Result<Vec<TransitIncident>> {
        let json = get_json(&self.client, &self.url, &[])?;
        parse_traffic(&json)
    }
}

/// One incident per entry of `result.metros`.
pub fn parse_traffic(json: &Value) -> Result<Vec<TransitIncident>> {
    let metros = json["result"]["metros"]
        .as_array()
        .ok_or_else(|| ParkError::Parse("Missing metro traffic data".to_string()))?;

    let incidents = metros
        .iter()
        .map(|metro| {
            let line = match &metro["line"] {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => String::new(),
            };
            build_incident(
                &line,
                metro["slug"].as_str().unwrap_or("normal"),
                metro["title"].as_str().unwrap_or("Trafic normal"),
                metro["message"].as_str().unwrap_or(""),
            )
        })
        .collect();

    Ok(incidents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImpactLevel;
    use serde_json::json;

    #[test]
    fn test_parse_traffic() {
        let json = json!({"result": {"metros": [
            {"line": "1", "slug": "normal", "title": "Trafic normal", "message": "Trafic normal sur l'ensemble de la ligne."},
            {"line": "7", "slug": "critical", "title": "Trafic interrompu",
             "message": "Trafic interrompu entre Louis Blanc et Riquet."},
            {"line": 14}
        ]}});

        let incidents = parse_traffic(&json).unwrap();
        assert_eq!(incidents.len(), 3);
        assert_eq!(incidents[0].impact, ImpactLevel::Normal);
        assert_eq!(incidents[1].impact, ImpactLevel::Disrupted);
        assert_eq!(incidents[1].closed_stations, vec!["Louis Blanc", "Riquet"]);
        assert_eq!(incidents[2].line, "14");
        assert_eq!(incidents[2].status, "normal");
        assert_eq!(incidents[2].impact, ImpactLevel::Normal);
    }

    #[test]
    fn test_parse_traffic_missing_result() {
        assert!(parse_traffic(&json!({"result": {}})).is_err());
    }
}
