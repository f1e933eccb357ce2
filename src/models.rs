// Domain entities shared by the aggregator, the predictor, the router and the ranker

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

// ============================================================================
// Parking
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingLot {
    pub id: String,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity: u32,
    pub free_spaces: u32,
    pub hourly_tariff: f64,
    pub distance_to_destination: f64, // km, filled in by filtering
}

impl ParkingLot {
    /// Builds a lot, clamping `free_spaces` to `capacity`. Zero capacity is rejected.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        position: GeoPoint,
        capacity: u32,
        free_spaces: u32,
        hourly_tariff: f64,
    ) -> Option<Self> {
        if capacity == 0 {
            return None;
        }
        Some(ParkingLot {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            latitude: position.lat,
            longitude: position.lon,
            capacity,
            free_spaces: free_spaces.min(capacity),
            hourly_tariff,
            distance_to_destination: 0.0,
        })
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn current_occupancy(&self) -> f64 {
        1.0 - self.free_spaces as f64 / self.capacity as f64
    }
}

// ============================================================================
// Road Works
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisruptionLevel {
    Disruptive,
    HighlyDisruptive,
}

impl DisruptionLevel {
    /// Open-data `niveau_perturbation` code: 1 is "Très perturbant".
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            DisruptionLevel::HighlyDisruptive
        } else {
            DisruptionLevel::Disruptive
        }
    }
}

impl fmt::Display for DisruptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisruptionLevel::Disruptive => write!(f, "Disruptive"),
            DisruptionLevel::HighlyDisruptive => write!(f, "Highly Disruptive"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkStatus {
    InProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadWork {
    pub id: String,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub disruption: DisruptionLevel,
    pub status: WorkStatus,
    pub affects_circulation: bool,
    pub polygon: Option<Vec<GeoPoint>>, // at least 3 vertices when present
}

impl RoadWork {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Keeps the footprint only when it forms a polygon.
    pub fn with_polygon(mut self, polygon: Option<Vec<GeoPoint>>) -> Self {
        self.polygon = polygon.filter(|ring| ring.len() >= 3);
        self
    }
}

// ============================================================================
// Transit
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Normal,
    Disrupted,
    Interrupted,
    Works,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitIncident {
    pub line: String,
    pub status: String, // raw status code: "normal", "alerte", "normal_trav", ...
    pub title: String,
    pub message: String,
    pub impact: ImpactLevel,
    pub closed_stations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationRecord {
    pub name: String,
    pub slug: String,
    pub latitude: f64,
    pub longitude: f64,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitStation {
    pub name: String,
    pub slug: String,
    pub latitude: f64,
    pub longitude: f64,
    pub lines: Vec<String>,
    pub closed: bool,
    pub closure_reason: String,
    pub distance_km: f64, // to the reference point of the lookup
}

// ============================================================================
// Context: weather & events
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum WeatherReport {
    Available(serde_json::Value),
    Unavailable(String),
}

impl WeatherReport {
    pub fn is_available(&self) -> bool {
        matches!(self, WeatherReport::Available(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactZone {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalEvent {
    pub name: String,
    pub venue: String,
    pub date: NaiveDate,
    pub zone: ImpactZone,
    pub impact_coefficient: f64,
}

impl LocalEvent {
    pub fn covers(&self, point: GeoPoint) -> bool {
        point.distance_km(&GeoPoint::new(self.zone.latitude, self.zone.longitude)) <= self.zone.radius_km
    }
}

// ============================================================================
// Prediction
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeToSaturation {
    Minutes(u32),
    Hours(u32),
    LowImmediateRisk,
    AlreadySaturated,
    LowRisk,
    NotApplicable,
}

impl fmt::Display for TimeToSaturation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeToSaturation::Minutes(m) => write!(f, "~{} min", m),
            TimeToSaturation::Hours(h) => write!(f, "~{} hour(s)", h),
            TimeToSaturation::LowImmediateRisk => write!(f, "Low immediate risk"),
            TimeToSaturation::AlreadySaturated => write!(f, "Already saturated or very close"),
            TimeToSaturation::LowRisk => write!(f, "Very low risk"),
            TimeToSaturation::NotApplicable => write!(f, "N/A"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaturationPrediction {
    pub lot_id: String,
    pub current_occupancy: f64,
    pub predicted_occupancy: f64,
    pub predicted_at: DateTime<Tz>,
    pub reliability: f64,
    pub time_to_saturation: TimeToSaturation,
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Driving,
    Walking,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TravelEstimate {
    pub duration_min: u32,
    pub duration_in_traffic_min: u32,
    pub route_points: Vec<GeoPoint>,
}

// ============================================================================
// Recommendation
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ClosedStation {
    pub name: String,
    pub lines: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitImpact {
    pub score_penalty: f64,
    pub closed_near_lot: Vec<ClosedStation>,
    pub closed_near_destination: Vec<ClosedStation>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeBreakdown {
    pub access_min: u32,
    pub walk_min: u32,
    pub total_min: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaturationSnapshot {
    pub current: String,
    pub predicted: String,
    pub reliability: String,
    pub time_to_saturation: String,
}

impl From<&SaturationPrediction> for SaturationSnapshot {
    fn from(p: &SaturationPrediction) -> Self {
        SaturationSnapshot {
            current: format!("{:.2}", p.current_occupancy),
            predicted: format!("{:.2}", p.predicted_occupancy),
            reliability: format!("{:.2}", p.reliability),
            time_to_saturation: p.time_to_saturation.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlternativeSummary {
    pub name: String,
    pub score: f64,
    pub total_min: u32,
    pub predicted_saturation: f64,
    pub access_min: u32,
    pub walk_min: u32,
    pub reliability: f64,
    pub works_on_route: usize,
    pub transit_impact: TransitImpact,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub best: Option<ParkingLot>,
    pub score: Option<f64>,
    pub times: Option<TimeBreakdown>,
    pub saturation: Option<SaturationSnapshot>,
    pub route_to_lot: Vec<GeoPoint>,
    pub route_lot_to_destination: Vec<GeoPoint>,
    pub works_on_route: Vec<RoadWork>,
    pub all_works: Vec<RoadWork>,
    pub transit_incidents: Vec<TransitIncident>,
    pub destination_stations: Vec<TransitStation>,
    pub lot_stations: Vec<TransitStation>,
    pub transit_impact: Option<TransitImpact>,
    pub alternatives: Vec<AlternativeSummary>,
}

impl Recommendation {
    /// The explicit "no recommendation" outcome, carrying whatever context was gathered.
    pub fn none(
        all_works: Vec<RoadWork>,
        transit_incidents: Vec<TransitIncident>,
        destination_stations: Vec<TransitStation>,
    ) -> Self {
        Recommendation {
            best: None,
            score: None,
            times: None,
            saturation: None,
            route_to_lot: Vec::new(),
            route_lot_to_destination: Vec::new(),
            works_on_route: Vec::new(),
            all_works,
            transit_incidents,
            destination_stations,
            lot_stations: Vec::new(),
            transit_impact: None,
            alternatives: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_invariants() {
        let lot = ParkingLot::new("L1", "Lot", "Paris", GeoPoint::new(48.85, 2.35), 100, 150, 3.0).unwrap();
        assert_eq!(lot.free_spaces, 100);
        assert_eq!(lot.current_occupancy(), 0.0);
        assert!(ParkingLot::new("L2", "Lot", "Paris", GeoPoint::new(48.85, 2.35), 0, 0, 3.0).is_none());
    }

    #[test]
    fn test_current_occupancy() {
        let lot = ParkingLot::new("L1", "Lot", "Paris", GeoPoint::new(48.85, 2.35), 500, 300, 3.0).unwrap();
        assert!((lot.current_occupancy() - 0.40).abs() < 1e-12);
    }

    #[test]
    fn test_time_to_saturation_text() {
        assert_eq!(TimeToSaturation::Minutes(12).to_string(), "~12 min");
        assert_eq!(TimeToSaturation::Hours(2).to_string(), "~2 hour(s)");
        assert_eq!(TimeToSaturation::NotApplicable.to_string(), "N/A");
    }

    #[test]
    fn test_disruption_from_code() {
        assert_eq!(DisruptionLevel::from_code(1), DisruptionLevel::HighlyDisruptive);
        assert_eq!(DisruptionLevel::from_code(2), DisruptionLevel::Disruptive);
        assert_eq!(DisruptionLevel::HighlyDisruptive.to_string(), "Highly Disruptive");
    }
}
