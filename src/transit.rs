// Transit network state: incident classification and the station reference index

use crate::geo::{GeoPoint, distance_km};
use crate::matching::{extract_closed_stations, station_closure};
use crate::models::{ImpactLevel, StationRecord, TransitIncident, TransitStation};

// ============================================================================
// Incident classification
// ============================================================================

/// Derives the impact level from the RATP status slug and message, first match wins.
pub fn classify_impact(status: &str, message: &str) -> ImpactLevel {
    let message = message.to_lowercase();

    if status == "alerte" || status == "critical" || message.contains("perturbé") {
        ImpactLevel::Disrupted
    } else if message.contains("interrompu") || message.contains("arrêt") {
        ImpactLevel::Interrupted
    } else if status == "normal_trav" || message.contains("travaux") {
        ImpactLevel::Works
    } else if message.contains("fermée") || message.contains("fermé") {
        ImpactLevel::Disrupted
    } else {
        ImpactLevel::Normal
    }
}

/// Builds an incident from a raw line status; station names are extracted for
/// non-normal lines only.
pub fn build_incident(line: &str, status: &str, title: &str, message: &str) -> TransitIncident {
    let impact = classify_impact(status, message);
    let closed_stations = if impact == ImpactLevel::Normal {
        Vec::new()
    } else {
        extract_closed_stations(message)
    };

    TransitIncident {
        line: line.to_string(),
        status: status.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        impact,
        closed_stations,
    }
}

// ============================================================================
// Station index
// ============================================================================

/// Read-only station reference data, shared across requests.
#[derive(Debug, Clone)]
pub struct StationIndex {
    stations: Vec<StationRecord>,
}

impl StationIndex {
    pub fn new(stations: Vec<StationRecord>) -> Self {
        StationIndex { stations }
    }

    /// The built-in Paris reference stations.
    pub fn paris() -> Self {
        Self::new(crate::fallback::station_records())
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations within `radius_km` of `point`, annotated with closures, nearest first.
    pub fn stations_near(
        &self,
        point: GeoPoint,
        radius_km: f64,
        incidents: &[TransitIncident],
    ) -> Vec<TransitStation> {
        let mut nearby: Vec<TransitStation> = self
            .stations
            .iter()
            .filter_map(|record| {
                let distance = distance_km(point, GeoPoint::new(record.latitude, record.longitude));
                if distance > radius_km {
                    return None;
                }
                let closure = station_closure(&record.name, incidents);
                Some(TransitStation {
                    name: record.name.clone(),
                    slug: record.slug.clone(),
                    latitude: record.latitude,
                    longitude: record.longitude,
                    lines: record.lines.clone(),
                    closed: closure.is_some(),
                    closure_reason: closure.unwrap_or_default(),
                    distance_km: distance,
                })
            })
            .collect();

        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        for station in nearby.iter().take(5) {
            tracing::debug!(
                "   - {} ({}) - {:.2}km - {}",
                station.name,
                station.lines.join(", "),
                station.distance_km,
                if station.closed { "CLOSED" } else { "Open" }
            );
        }

        nearby
    }

    pub fn closed_near(
        &self,
        point: GeoPoint,
        radius_km: f64,
        incidents: &[TransitIncident],
    ) -> Vec<TransitStation> {
        self.stations_near(point, radius_km, incidents)
            .into_iter()
            .filter(|s| s.closed)
            .collect()
    }
}

impl Default for StationIndex {
    fn default() -> Self {
        Self::paris()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;

    const RIQUET_AREA: GeoPoint = GeoPoint::new(48.8889, 2.3625);

    #[test]
    fn test_classify_impact_order() {
        assert_eq!(classify_impact("alerte", "Trafic interrompu"), ImpactLevel::Disrupted);
        assert_eq!(classify_impact("normal", "Trafic interrompu entre A et B"), ImpactLevel::Interrupted);
        assert_eq!(classify_impact("normal", "Arrêt non desservi"), ImpactLevel::Interrupted);
        assert_eq!(classify_impact("normal_trav", "Ligne ouverte"), ImpactLevel::Works);
        assert_eq!(classify_impact("normal", "Accès Cadet fermé"), ImpactLevel::Disrupted);
        assert_eq!(classify_impact("normal", "Trafic normal"), ImpactLevel::Normal);
    }

    #[test]
    fn test_build_incident_extracts_only_when_disrupted() {
        let normal = build_incident("1", "normal", "Trafic normal", "Trafic normal sur la ligne.");
        assert!(normal.closed_stations.is_empty());

        let works = build_incident("7", "normal_trav", "Travaux", "Travaux: la station Cadet est fermée ce soir.");
        assert_eq!(works.impact, ImpactLevel::Works);
        assert!(works.closed_stations.contains(&"Cadet".to_string()));
    }

    #[test]
    fn test_stations_near_sorted_and_bounded() {
        let index = StationIndex::paris();
        let stations = index.stations_near(RIQUET_AREA, 0.8, &[]);
        assert!(!stations.is_empty());
        assert_eq!(stations[0].name, "Riquet");
        assert!(stations.iter().all(|s| s.distance_km <= 0.8 && !s.closed));
        assert!(stations.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn test_fallback_incidents_close_riquet() {
        let index = StationIndex::paris();
        let closed = index.closed_near(RIQUET_AREA, 0.8, &fallback::transit_incidents());
        let names: Vec<&str> = closed.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"Riquet"));
        assert!(closed.iter().all(|s| s.closure_reason.contains("Line 7")));
    }
}
