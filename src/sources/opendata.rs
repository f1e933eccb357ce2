// OpenDataSoft records API: Saemes lots, municipal lots and road works

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use reqwest::blocking;
use serde_json::Value;

use crate::config::SourceConfig;
use crate::error::{ParkError, Result};
use crate::geo::{GeoPoint, polygon_centroid};
use crate::models::{DisruptionLevel, ParkingLot, RoadWork, WorkStatus};
use crate::random::RandomSource;
use crate::sources::{Feed, get_json, http_client};

const PARIS_POSTCODES: &str = "75*";

fn records(json: &Value) -> Result<&Vec<Value>> {
    json["records"]
        .as_array()
        .ok_or_else(|| ParkError::Parse("Missing records array".to_string()))
}

/// `[lon, lat]` point geometry.
fn point_geometry(record: &Value) -> Option<GeoPoint> {
    let coords = record["geometry"]["coordinates"].as_array()?;
    let lon = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    Some(GeoPoint::new(lat, lon))
}

/// Non-negative count, integer or float encoded, saturating at `u32::MAX`.
fn count_field(value: &Value) -> Option<u32> {
    if let Some(n) = value.as_u64() {
        return Some(u32::try_from(n).unwrap_or(u32::MAX));
    }
    let x = value.as_f64()?;
    if !x.is_finite() || x < 0.0 {
        return None;
    }
    Some(x.round().min(u32::MAX as f64) as u32)
}

fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ============================================================================
// Saemes
// ============================================================================

pub struct SaemesFeed {
    client: blocking::Client,
    url: String,
    dataset: String,
    reference_dataset: String,
}

impl SaemesFeed {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(SaemesFeed {
            client: http_client(config.request_timeout())?,
            url: config.saemes_api_url.clone(),
            dataset: config.saemes_dataset.clone(),
            reference_dataset: config.saemes_reference_dataset.clone(),
        })
    }

    fn query(&self, dataset: &str) -> Result<Value> {
        get_json(
            &self.client,
            &self.url,
            &[
                ("dataset", dataset),
                ("rows", "100"),
                ("facet", "code_postal"),
                ("refine.code_postal", PARIS_POSTCODES),
            ],
        )
    }
}

impl Feed for SaemesFeed {
    type Item = ParkingLot;

    fn name(&self) -> &str {
        "Saemes parkings"
    }

    fn fetch(&self, rng: &mut dyn RandomSource) -> Result<Vec<ParkingLot>> {
        let reference = self.query(&self.reference_dataset)?;
        let availability = self.query(&self.dataset)?;
        parse_saemes(&reference, &availability, rng)
    }
}

/// Merges the static reference records with real-time availability by
/// `identifiant_unique`.
pub fn parse_saemes(reference: &Value, availability: &Value, rng: &mut dyn RandomSource) -> Result<Vec<ParkingLot>> {
    let free_by_id: HashMap<&str, u32> = records(availability)?
        .iter()
        .filter_map(|record| {
            let fields = &record["fields"];
            let id = fields["identifiant_unique"].as_str()?;
            Some((id, count_field(&fields["places_disponibles"]).unwrap_or(0)))
        })
        .collect();

    let lots = records(reference)?
        .iter()
        .filter_map(|record| {
            let fields = &record["fields"];
            let id = fields["identifiant_unique"].as_str()?;
            let position = point_geometry(record)?;

            let capacity = count_field(&fields["capacite_totale"]).unwrap_or(100);
            let free = match free_by_id.get(id) {
                Some(free) => *free,
                None => rng.int_in(10, (capacity / 2) as i64).max(0) as u32,
            };

            let tariff = match fields["tarif_1h"].as_f64() {
                Some(t) if t != 0.0 => t,
                _ => round_cents(rng.uniform(2.5, 5.0)),
            };

            ParkingLot::new(
                id,
                fields["nom"].as_str().unwrap_or("Parking Saemes"),
                fields["adresse"].as_str().unwrap_or("Paris"),
                position,
                capacity,
                free,
                tariff,
            )
        })
        .collect();

    Ok(lots)
}

// ============================================================================
// Municipal parkings
// ============================================================================

pub struct MunicipalFeed {
    client: blocking::Client,
    url: String,
    dataset: String,
}

impl MunicipalFeed {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(MunicipalFeed {
            client: http_client(config.request_timeout())?,
            url: config.paris_api_url.clone(),
            dataset: config.paris_parking_dataset.clone(),
        })
    }
}

impl Feed for MunicipalFeed {
    type Item = ParkingLot;

    fn name(&self) -> &str {
        "municipal parkings"
    }

    fn fetch(&self, rng: &mut dyn RandomSource) -> Result<Vec<ParkingLot>> {
        let json = get_json(
            &self.client,
            &self.url,
            &[
                ("dataset", self.dataset.as_str()),
                ("rows", "50"),
                ("facet", "statut"),
                ("refine.statut", "En service"),
            ],
        )?;
        parse_municipal(&json, rng)
    }
}

/// The municipal feed carries no availability or tariff; both are simulated.
pub fn parse_municipal(json: &Value, rng: &mut dyn RandomSource) -> Result<Vec<ParkingLot>> {
    let lots = records(json)?
        .iter()
        .filter_map(|record| {
            let fields = &record["fields"];
            let id = match &fields["id_parc"] {
                Value::String(s) => format!("PARIS_{}", s),
                Value::Number(n) => format!("PARIS_{}", n),
                _ => format!("PARIS_{}", rng.int_in(1000, 9999)),
            };
            let position = point_geometry(record)?;

            let capacity = count_field(&fields["capacite_totale"]).unwrap_or_else(|| rng.int_in(100, 500) as u32);
            let free = rng.int_in(20, (capacity as f64 * 0.7) as i64).max(0) as u32;
            let tariff = round_cents(rng.uniform(3.0, 6.0));

            ParkingLot::new(
                id,
                fields["nom_du_parc"].as_str().unwrap_or("Parking Municipal"),
                fields["adresse"].as_str().unwrap_or("Paris"),
                position,
                capacity,
                free,
                tariff,
            )
        })
        .collect();

    Ok(lots)
}

// ============================================================================
// Road works
// ============================================================================

pub struct RoadWorksFeed {
    client: blocking::Client,
    url: String,
    dataset: String,
}

impl RoadWorksFeed {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(RoadWorksFeed {
            client: http_client(config.request_timeout())?,
            url: config.paris_api_url.clone(),
            dataset: config.paris_works_dataset.clone(),
        })
    }
}

impl Feed for RoadWorksFeed {
    type Item = RoadWork;

    fn name(&self) -> &str {
        "road works"
    }

    fn fetch(&self, rng: &mut dyn RandomSource) -> Result<Vec<RoadWork>> {
        let json = get_json(
            &self.client,
            &self.url,
            &[
                ("dataset", self.dataset.as_str()),
                ("rows", "100"),
                ("facet", "statut"),
                ("refine.statut", "En cours"),
            ],
        )?;
        parse_road_works(&json, Utc::now(), rng)
    }
}

/// Works with a Point or Polygon geometry. The feed has no usable dates, so
/// start and end are drawn around `now`.
pub fn parse_road_works(json: &Value, now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Result<Vec<RoadWork>> {
    let works = records(json)?
        .iter()
        .filter_map(|record| {
            let fields = &record["fields"];
            let geometry = &record["geometry"];

            let (position, polygon) = match geometry["type"].as_str()? {
                "Point" => (point_geometry(record)?, None),
                "Polygon" => {
                    let ring: Vec<GeoPoint> = geometry["coordinates"][0]
                        .as_array()?
                        .iter()
                        .filter_map(|pair| Some(GeoPoint::new(pair[1].as_f64()?, pair[0].as_f64()?)))
                        .collect();
                    (polygon_centroid(&ring)?, Some(ring))
                }
                _ => return None,
            };

            let id = match fields["id_situ"].as_str() {
                Some(id) => id.to_string(),
                None => format!("TRAV_PERT_{}", rng.int_in(1000, 9999)),
            };
            let start = now - Duration::days(rng.int_in(1, 30));
            let end = now + Duration::days(rng.int_in(7, 60));

            let work = RoadWork {
                id,
                name: fields["intitule"].as_str().unwrap_or("Travaux de voirie").to_string(),
                description: fields["description"]
                    .as_str()
                    .unwrap_or("Travaux perturbant la circulation")
                    .to_string(),
                latitude: position.lat,
                longitude: position.lon,
                start,
                end,
                disruption: DisruptionLevel::from_code(fields["niveau_perturbation"].as_i64().unwrap_or(2)),
                status: WorkStatus::InProgress,
                affects_circulation: true,
                polygon: None,
            };
            Some(work.with_polygon(polygon))
        })
        .collect();

    Ok(works)
}
