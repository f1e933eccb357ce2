//! Recommendation cycle: gather context, evaluate every reachable lot, rank.
//!
//! Scores are penalties, lower is better:
//!
//! ```text
//! satur² × 100 + (access + walk) × 0.5 + tariff × 2 + works × 15
//!     + distance_km × 10 + transit_penalty − availability_bonus
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Europe::Paris;
use chrono_tz::Tz;

use crate::aggregator::{DataAggregator, filter_relevant_lots};
use crate::config::AppConfig;
use crate::geo::GeoPoint;
use crate::models::{
    AlternativeSummary, ClosedStation, LocalEvent, ParkingLot, Recommendation, RoadWork, SaturationPrediction,
    SaturationSnapshot, TimeBreakdown, TransitImpact, TransitIncident, TransitStation, TravelEstimate, TravelMode,
    WeatherReport,
};
use crate::predictor::{HistoryGenerator, PredictionConditions, SaturationPredictor};
use crate::random::{RandomSource, SeededRandom};
use crate::routing::{RouteAnalyzer, works_on_route};
use crate::sources::directions::{GoogleDirections, RouteProvider};
use crate::transit::StationIndex;

pub const MAX_ALTERNATIVES: usize = 3;
pub const AVAILABLE_BELOW: f64 = 0.95;

const CLOSED_NEAR_LOT_PENALTY: f64 = 5.0;
const CLOSED_NEAR_DESTINATION_BONUS: f64 = 10.0;

// ============================================================================
// Scoring
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub predicted_saturation: f64,
    pub access_min: u32,
    pub walk_min: u32,
    pub hourly_tariff: f64,
    pub works_on_route: usize,
    pub distance_km: f64,
    pub transit_penalty: f64,
}

pub fn score_lot(inputs: &ScoreInputs) -> f64 {
    let satur = inputs.predicted_saturation;
    let availability_bonus = if satur > 0.8 { 0.0 } else { (1.0 - satur) * 20.0 };

    satur.powi(2) * 100.0
        + (inputs.access_min + inputs.walk_min) as f64 * 0.5
        + inputs.hourly_tariff * 2.0
        + inputs.works_on_route as f64 * 15.0
        + inputs.distance_km * 10.0
        + inputs.transit_penalty
        - availability_bonus
}

fn closed_stations(stations: &[TransitStation]) -> Vec<ClosedStation> {
    stations
        .iter()
        .filter(|s| s.closed)
        .map(|s| ClosedStation {
            name: s.name.clone(),
            lines: s.lines.clone(),
            reason: s.closure_reason.clone(),
        })
        .collect()
}

/// +5 per closed station near the lot, −10 per closed station near the destination.
pub fn transit_impact(lot_stations: &[TransitStation], destination_stations: &[TransitStation]) -> TransitImpact {
    let closed_near_lot = closed_stations(lot_stations);
    let closed_near_destination = closed_stations(destination_stations);

    let score_penalty = closed_near_lot.len() as f64 * CLOSED_NEAR_LOT_PENALTY
        - closed_near_destination.len() as f64 * CLOSED_NEAR_DESTINATION_BONUS;

    let recommendation = if !closed_near_destination.is_empty() {
        format!(
            "Advantageous parking: {} closed station(s) near the destination",
            closed_near_destination.len()
        )
    } else if !closed_near_lot.is_empty() {
        format!("Warning: {} closed station(s) near the parking", closed_near_lot.len())
    } else {
        "Metro running normally, no particular impact".to_string()
    };

    TransitImpact {
        score_penalty,
        closed_near_lot,
        closed_near_destination,
        recommendation,
    }
}

// ============================================================================
// Recommendation cycle
// ============================================================================

/// Everything fetched once per cycle.
struct CycleContext {
    lots: Vec<ParkingLot>,
    works: Vec<RoadWork>,
    incidents: Vec<TransitIncident>,
    destination_stations: Vec<TransitStation>,
    weather: WeatherReport,
    events: Vec<LocalEvent>,
}

struct Candidate {
    lot: ParkingLot,
    access: TravelEstimate,
    walk: TravelEstimate,
    prediction: SaturationPrediction,
    works_on_route: Vec<RoadWork>,
    lot_stations: Vec<TransitStation>,
    transit_impact: TransitImpact,
    score: f64,
}

impl Candidate {
    fn access_min(&self) -> u32 {
        self.access.duration_in_traffic_min
    }

    fn walk_min(&self) -> u32 {
        self.walk.duration_min
    }

    fn total_min(&self) -> u32 {
        self.access_min() + self.walk_min()
    }

    fn is_available(&self) -> bool {
        self.prediction.predicted_occupancy < AVAILABLE_BELOW
    }

    fn summary(&self) -> AlternativeSummary {
        AlternativeSummary {
            name: self.lot.name.clone(),
            score: self.score,
            total_min: self.total_min(),
            predicted_saturation: self.prediction.predicted_occupancy,
            access_min: self.access_min(),
            walk_min: self.walk_min(),
            reliability: self.prediction.reliability,
            works_on_route: self.works_on_route.len(),
            transit_impact: self.transit_impact.clone(),
        }
    }
}

pub struct Recommender {
    aggregator: DataAggregator,
    router: RouteAnalyzer,
    predictor: SaturationPredictor,
    rng: Box<dyn RandomSource>,
}

impl Recommender {
    pub fn new(
        aggregator: DataAggregator,
        router: RouteAnalyzer,
        predictor: SaturationPredictor,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Recommender { aggregator, router, predictor, rng }
    }

    /// Live sources, the Directions API when a key is configured, seeded
    /// randomness when `engine.random_seed` is set.
    pub fn from_config(config: &AppConfig, stations: Arc<StationIndex>) -> Self {
        let provider: Option<Box<dyn RouteProvider>> = match &config.credentials.maps_api_key {
            Some(key) => match GoogleDirections::new(&config.sources, key.clone()) {
                Ok(client) => Some(Box::new(client)),
                Err(e) => {
                    tracing::warn!("⚠️  Directions client unavailable, simulating routes: {}", e);
                    None
                }
            },
            None => {
                tracing::debug!("MAPS_API_KEY not set, travel times are simulated");
                None
            }
        };

        Self::new(
            DataAggregator::new(config, stations),
            RouteAnalyzer::new(provider),
            SaturationPredictor::new(HistoryGenerator::new(config.engine.history_days)),
            Box::new(SeededRandom::from_seed_option(config.engine.random_seed)),
        )
    }

    /// Both lot families near `destination`, filtered.
    pub fn relevant_lots(&mut self, destination: GeoPoint) -> Vec<ParkingLot> {
        let mut lots = self.aggregator.saemes_lots(Some(destination), self.rng.as_mut()).into_items();
        lots.extend(self.aggregator.municipal_lots(Some(destination), self.rng.as_mut()).into_items());
        lots
    }

    /// Both lot families within `radius_km`, nearest first.
    pub fn lots_near(&mut self, destination: GeoPoint, radius_km: f64) -> Vec<ParkingLot> {
        let mut lots = self.aggregator.saemes_lots(None, self.rng.as_mut()).into_items();
        lots.extend(self.aggregator.municipal_lots(None, self.rng.as_mut()).into_items());
        filter_relevant_lots(lots, destination, radius_km, self.aggregator.engine().max_candidates)
    }

    pub fn road_works(&mut self) -> Vec<RoadWork> {
        self.aggregator.road_works(self.rng.as_mut()).into_items()
    }

    pub fn transit_incidents(&mut self) -> Vec<TransitIncident> {
        self.aggregator.transit_incidents(self.rng.as_mut()).into_items()
    }

    /// Stations around `point`, annotated with the current closures.
    pub fn stations_near(&mut self, point: GeoPoint, radius_km: f64) -> Vec<TransitStation> {
        let incidents = self.transit_incidents();
        self.aggregator.stations_near(point, radius_km, &incidents)
    }

    /// Saturation forecast for one lot under the current conditions around it.
    pub fn predict_lot(&mut self, lot: &ParkingLot, target: DateTime<Tz>) -> SaturationPrediction {
        let incidents = self.aggregator.transit_incidents(self.rng.as_mut()).into_items();
        let weather = self.aggregator.weather_at(lot.position());
        let events = self.aggregator.local_events(target.date_naive());
        self.predict_with(lot, target, &incidents, &weather, &events)
    }

    fn predict_with(
        &mut self,
        lot: &ParkingLot,
        target: DateTime<Tz>,
        incidents: &[TransitIncident],
        weather: &WeatherReport,
        events: &[LocalEvent],
    ) -> SaturationPrediction {
        let radius = self.aggregator.engine().prediction_station_radius_km;
        let closed_nearby = self
            .aggregator
            .station_index()
            .closed_near(lot.position(), radius, incidents)
            .len();

        let conditions = PredictionConditions {
            weather,
            closed_stations_nearby: closed_nearby,
            events,
        };
        self.predictor.predict(lot, target, &conditions, self.rng.as_mut())
    }

    fn gather(&mut self, destination: GeoPoint, target_arrival: DateTime<Tz>) -> CycleContext {
        let lots = self.relevant_lots(destination);
        let works = self.aggregator.road_works(self.rng.as_mut()).into_items();
        let incidents = self.aggregator.transit_incidents(self.rng.as_mut()).into_items();
        let radius = self.aggregator.engine().destination_station_radius_km;
        let destination_stations = self.aggregator.stations_near(destination, radius, &incidents);
        let weather = self.aggregator.weather_at(destination);
        let events = self.aggregator.local_events(target_arrival.date_naive());

        CycleContext { lots, works, incidents, destination_stations, weather, events }
    }

    fn evaluate(
        &mut self,
        lot: ParkingLot,
        origin: GeoPoint,
        destination: GeoPoint,
        target_arrival: DateTime<Tz>,
        ctx: &CycleContext,
    ) -> Option<Candidate> {
        let position = lot.position();

        let Some(access) = self.router.travel_time(
            origin,
            position,
            TravelMode::Driving,
            true,
            true,
            &ctx.works,
            self.rng.as_mut(),
        ) else {
            tracing::warn!("      ❌ No driving route to {}", lot.name);
            return None;
        };

        let now = Utc::now().with_timezone(&Paris);
        let arrival = (now + Duration::minutes(access.duration_in_traffic_min as i64)).max(target_arrival);
        let prediction = self.predict_with(&lot, arrival, &ctx.incidents, &ctx.weather, &ctx.events);

        let Some(walk) = self.router.travel_time(
            position,
            destination,
            TravelMode::Walking,
            false,
            false,
            &ctx.works,
            self.rng.as_mut(),
        ) else {
            tracing::warn!("      ❌ No walking route from {}", lot.name);
            return None;
        };

        let works = works_on_route(&access.route_points, &ctx.works);
        let lot_stations = self.aggregator.station_index().stations_near(
            position,
            self.aggregator.engine().lot_station_radius_km,
            &ctx.incidents,
        );
        let impact = transit_impact(&lot_stations, &ctx.destination_stations);

        let score = score_lot(&ScoreInputs {
            predicted_saturation: prediction.predicted_occupancy,
            access_min: access.duration_in_traffic_min,
            walk_min: walk.duration_min,
            hourly_tariff: lot.hourly_tariff,
            works_on_route: works.len(),
            distance_km: lot.distance_to_destination,
            transit_penalty: impact.score_penalty,
        });

        tracing::info!(
            "      ✅ {}: score {:.1} ({}min, saturation {:.0}%)",
            lot.name,
            score,
            access.duration_in_traffic_min + walk.duration_min,
            prediction.predicted_occupancy * 100.0
        );

        Some(Candidate {
            lot,
            access,
            walk,
            prediction,
            works_on_route: works,
            lot_stations,
            transit_impact: impact,
            score,
        })
    }

    pub fn recommend(&mut self, origin: GeoPoint, destination: GeoPoint, target_arrival: DateTime<Tz>) -> Recommendation {
        tracing::info!(
            "🎯 Parking search: ({:.4}, {:.4}) -> ({:.4}, {:.4})",
            origin.lat,
            origin.lon,
            destination.lat,
            destination.lon
        );

        let mut ctx = self.gather(destination, target_arrival);

        if ctx.lots.is_empty() {
            tracing::warn!("❌ No relevant parking in the area");
            return Recommendation::none(ctx.works, ctx.incidents, ctx.destination_stations);
        }

        tracing::info!("✅ Evaluating {} parkings", ctx.lots.len());
        let lots = std::mem::take(&mut ctx.lots);
        let total = lots.len();
        let mut candidates: Vec<Candidate> = Vec::with_capacity(total);
        for (i, lot) in lots.into_iter().enumerate() {
            tracing::info!(
                "   📊 {}/{}: {} ({:.2}km)",
                i + 1,
                total,
                lot.name,
                lot.distance_to_destination
            );
            if let Some(candidate) = self.evaluate(lot, origin, destination, target_arrival, &ctx) {
                candidates.push(candidate);
            }
        }

        candidates.sort_by(|a, b| a.score.total_cmp(&b.score));

        tracing::info!("🏆 Ranking:");
        for (i, c) in candidates.iter().take(5).enumerate() {
            tracing::info!(
                "   {}. {} - score {:.1} - {}min{}",
                i + 1,
                c.lot.name,
                c.score,
                c.total_min(),
                if c.is_available() { "" } else { " (likely full)" }
            );
        }

        let mut ranked = candidates.into_iter();
        let Some(best) = ranked.next() else {
            tracing::warn!("❌ No reachable parking");
            return Recommendation::none(ctx.works, ctx.incidents, ctx.destination_stations);
        };
        let alternatives: Vec<AlternativeSummary> = ranked.take(MAX_ALTERNATIVES).map(|c| c.summary()).collect();

        tracing::info!("✅ Recommended: {}", best.lot.name);

        Recommendation {
            times: Some(TimeBreakdown {
                access_min: best.access_min(),
                walk_min: best.walk_min(),
                total_min: best.total_min(),
            }),
            saturation: Some(SaturationSnapshot::from(&best.prediction)),
            score: Some(best.score),
            route_to_lot: best.access.route_points,
            route_lot_to_destination: best.walk.route_points,
            works_on_route: best.works_on_route,
            all_works: ctx.works,
            transit_incidents: ctx.incidents,
            destination_stations: ctx.destination_stations,
            lot_stations: best.lot_stations,
            transit_impact: Some(best.transit_impact),
            alternatives,
            best: Some(best.lot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::{ParkError, Result};
    use crate::models::{DisruptionLevel, ImpactLevel, StationRecord, WorkStatus};
    use crate::random::testing::FixedRandom;
    use crate::sources::directions::{DirectionsRequest, RouteOption};
    use crate::sources::weather::WeatherSource;
    use crate::sources::Feed;
    use crate::transit::build_incident;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use serde_json::json;

    // Away from the fallback closures and event zones
    const DESTINATION: GeoPoint = GeoPoint::new(48.8450, 2.3700);
    const ORIGIN: GeoPoint = GeoPoint::new(48.8300, 2.3550);

    fn station(name: &str, closed: bool) -> TransitStation {
        TransitStation {
            name: name.to_string(),
            slug: name.to_lowercase(),
            latitude: 48.85,
            longitude: 2.35,
            lines: vec!["7".to_string()],
            closed,
            closure_reason: if closed { "Closed - Line 7: Travaux".to_string() } else { String::new() },
            distance_km: 0.2,
        }
    }

    fn lot(id: &str, at: GeoPoint) -> ParkingLot {
        ParkingLot::new(id, format!("Parking {}", id), "Paris", at, 200, 100, 3.5).unwrap()
    }

    fn inputs(works: usize) -> ScoreInputs {
        ScoreInputs {
            predicted_saturation: 0.6,
            access_min: 12,
            walk_min: 6,
            hourly_tariff: 3.5,
            works_on_route: works,
            distance_km: 0.556,
            transit_penalty: 0.0,
        }
    }

    struct StaticFeed<T: Clone>(Vec<T>);

    impl<T: Clone + Send> Feed for StaticFeed<T> {
        type Item = T;

        fn name(&self) -> &str {
            "static"
        }

        fn fetch(&self, _rng: &mut dyn RandomSource) -> Result<Vec<T>> {
            Ok(self.0.clone())
        }
    }

    /// One straight route to the requested destination.
    struct DirectRoutes;

    impl RouteProvider for DirectRoutes {
        fn routes(&self, request: &DirectionsRequest) -> Result<Vec<RouteOption>> {
            let (from, to) = (request.origin, request.destination);
            let points = (0..=10)
                .map(|i| {
                    let t = i as f64 / 10.0;
                    GeoPoint::new(from.lat + (to.lat - from.lat) * t, from.lon + (to.lon - from.lon) * t)
                })
                .collect();
            Ok(vec![RouteOption { duration_min: 10, duration_in_traffic_min: Some(12), points }])
        }
    }

    struct NoRoutes;

    impl RouteProvider for NoRoutes {
        fn routes(&self, _request: &DirectionsRequest) -> Result<Vec<RouteOption>> {
            Err(ParkError::Provider("ZERO_RESULTS".to_string()))
        }
    }

    fn work_at(id: &str, at: GeoPoint) -> RoadWork {
        RoadWork {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            latitude: at.lat,
            longitude: at.lon,
            start: Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap(),
            disruption: DisruptionLevel::Disruptive,
            status: WorkStatus::InProgress,
            affects_circulation: true,
            polygon: None,
        }
    }

    // Keeps the municipal feed live without adding candidates
    fn outside_paris() -> ParkingLot {
        lot("FAR", GeoPoint::new(48.95, 2.50))
    }

    fn quiet_metro() -> Vec<TransitIncident> {
        vec![build_incident("14", "normal", "Trafic normal", "Trafic normal sur la ligne.")]
    }

    struct ClearSky;

    impl WeatherSource for ClearSky {
        fn weather_at(&self, _point: GeoPoint) -> WeatherReport {
            WeatherReport::Available(json!({"request_state": 200, "message": "OK"}))
        }
    }

    fn static_aggregator(
        lots: Vec<ParkingLot>,
        works: Vec<RoadWork>,
        incidents: Vec<TransitIncident>,
        stations: StationIndex,
    ) -> DataAggregator {
        let engine = EngineConfig { history_days: 0, ..EngineConfig::default() };
        DataAggregator::offline(engine, Arc::new(stations))
            .with_lot_feeds(Box::new(StaticFeed(lots)), Box::new(StaticFeed(vec![outside_paris()])))
            .with_works_feed(Box::new(StaticFeed(works)))
            .with_transit_feed(Box::new(StaticFeed(incidents)))
    }

    fn cycle(aggregator: DataAggregator, provider: Option<Box<dyn RouteProvider>>, rng: Box<dyn RandomSource>) -> Recommender {
        Recommender::new(
            aggregator,
            RouteAnalyzer::new(provider),
            SaturationPredictor::new(HistoryGenerator::new(0)),
            rng,
        )
    }

    fn recommender(lots: Vec<ParkingLot>, works: Vec<RoadWork>, provider: Option<Box<dyn RouteProvider>>) -> Recommender {
        let aggregator = static_aggregator(lots, works, quiet_metro(), StationIndex::paris());
        cycle(aggregator, provider, Box::new(SeededRandom::new(21)))
    }

    /// `(name, score)` of every ranked lot, best first.
    fn ranked(result: &Recommendation) -> Vec<(String, f64)> {
        let mut ranked = Vec::new();
        if let (Some(best), Some(score)) = (&result.best, result.score) {
            ranked.push((best.name.clone(), score));
        }
        ranked.extend(result.alternatives.iter().map(|a| (a.name.clone(), a.score)));
        ranked
    }

    fn arrival() -> DateTime<Tz> {
        Paris.with_ymd_and_hms(2025, 7, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_score_components() {
        // 0.36*100 + 18*0.5 + 7 + 0 + 5.56 + 0 - 8
        assert_relative_eq!(score_lot(&inputs(0)), 36.0 + 9.0 + 7.0 + 5.56 - 8.0, epsilon = 1e-9);

        let busy = ScoreInputs { predicted_saturation: 0.9, ..inputs(0) };
        assert_relative_eq!(score_lot(&busy), 81.0 + 9.0 + 7.0 + 5.56, epsilon = 1e-9);
    }

    #[test]
    fn test_each_work_costs_fifteen() {
        assert_relative_eq!(score_lot(&inputs(1)) - score_lot(&inputs(0)), 15.0, epsilon = 1e-9);
        assert_relative_eq!(score_lot(&inputs(3)) - score_lot(&inputs(0)), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_transit_impact_destination_bonus() {
        let destination = vec![station("Riquet", true), station("Crimée", true), station("Stalingrad", false)];
        let impact = transit_impact(&[], &destination);
        assert_eq!(impact.score_penalty, -20.0);
        assert!(impact.closed_near_lot.is_empty());
        assert_eq!(impact.closed_near_destination.len(), 2);
        assert_eq!(impact.recommendation, "Advantageous parking: 2 closed station(s) near the destination");
    }

    #[test]
    fn test_transit_impact_lot_penalty_and_normal() {
        let impact = transit_impact(&[station("Cadet", true)], &[station("Opéra", false)]);
        assert_eq!(impact.score_penalty, 5.0);
        assert_eq!(impact.recommendation, "Warning: 1 closed station(s) near the parking");
        assert_eq!(impact.closed_near_lot[0].lines, vec!["7"]);

        let impact = transit_impact(&[station("Cadet", false)], &[]);
        assert_eq!(impact.score_penalty, 0.0);
        assert_eq!(impact.recommendation, "Metro running normally, no particular impact");
    }

    #[test]
    fn test_work_on_route_flips_ranking() {
        // Same distance to the destination, one north and one south
        let north = GeoPoint::new(DESTINATION.lat + 0.005, DESTINATION.lon);
        let south = GeoPoint::new(DESTINATION.lat - 0.005, DESTINATION.lon);
        let lots = vec![lot("A", north), lot("B", south)];
        let works = vec![work_at("W1", north)];

        let mut recommender = recommender(lots, works, Some(Box::new(DirectRoutes)));
        let result = recommender.recommend(ORIGIN, DESTINATION, arrival());

        let best = result.best.as_ref().unwrap();
        assert_eq!(best.id, "B");
        assert!(result.works_on_route.is_empty());
        assert_eq!(result.alternatives.len(), 1);

        let runner_up = &result.alternatives[0];
        assert_eq!(runner_up.name, "Parking A");
        assert_eq!(runner_up.works_on_route, 1);
        assert_relative_eq!(runner_up.score - result.score.unwrap(), 15.0, epsilon = 1e-9);

        let times = result.times.as_ref().unwrap();
        assert_eq!(times.access_min, 12);
        assert_eq!(times.walk_min, 10);
        assert_eq!(times.total_min, 22);
        assert_eq!(result.route_to_lot.len(), 11);
        assert_eq!(result.route_to_lot[0], ORIGIN);
    }

    #[test]
    fn test_ordering_and_alternatives_cap() {
        let lots: Vec<ParkingLot> = (0..6)
            .map(|i| lot(&format!("L{}", i), GeoPoint::new(DESTINATION.lat + 0.002 * i as f64, DESTINATION.lon)))
            .collect();

        let mut recommender = recommender(lots, Vec::new(), None);
        let result = recommender.recommend(ORIGIN, DESTINATION, arrival());

        assert!(result.best.is_some());
        assert_eq!(result.alternatives.len(), MAX_ALTERNATIVES);
        let mut previous = result.score.unwrap();
        for alt in &result.alternatives {
            assert!(alt.score >= previous);
            previous = alt.score;
        }
        let saturation = result.saturation.as_ref().unwrap();
        assert_eq!(saturation.predicted, "0.50");
        assert_eq!(saturation.reliability, "0.80");
    }

    #[test]
    fn test_no_lots_in_range() {
        let far = vec![outside_paris()];
        let mut recommender = recommender(far, Vec::new(), None);
        let result = recommender.recommend(ORIGIN, DESTINATION, arrival());
        assert!(result.is_empty());
        assert!(result.alternatives.is_empty());
        assert_eq!(result.transit_incidents.len(), 1);
        assert_eq!(result.transit_incidents[0].impact, ImpactLevel::Normal);
    }

    #[test]
    fn test_unreachable_lots_give_no_recommendation() {
        let lots = vec![lot("A", GeoPoint::new(DESTINATION.lat + 0.003, DESTINATION.lon))];
        let mut recommender = recommender(lots, Vec::new(), Some(Box::new(NoRoutes)));
        let result = recommender.recommend(ORIGIN, DESTINATION, arrival());
        assert!(result.is_empty());
        assert!(result.times.is_none());
    }

    #[test]
    fn test_available_weather_adjusts_saturation() {
        let lots = vec![
            lot("A", GeoPoint::new(DESTINATION.lat + 0.002, DESTINATION.lon)),
            lot("B", GeoPoint::new(DESTINATION.lat - 0.002, DESTINATION.lon)),
        ];

        // Draw below 0.3: the 30% branch lowers demand
        let aggregator = static_aggregator(lots.clone(), Vec::new(), quiet_metro(), StationIndex::paris())
            .with_weather(Box::new(ClearSky));
        let mut calm = cycle(aggregator, Some(Box::new(DirectRoutes)), Box::new(FixedRandom(0.1)));
        let result = calm.recommend(ORIGIN, DESTINATION, arrival());
        assert_eq!(result.saturation.as_ref().unwrap().predicted, "0.45");
        assert_relative_eq!(result.alternatives[0].predicted_saturation, 0.45, epsilon = 1e-9);

        // Otherwise demand rises by 5%
        let aggregator = static_aggregator(lots, Vec::new(), quiet_metro(), StationIndex::paris())
            .with_weather(Box::new(ClearSky));
        let mut busy = cycle(aggregator, Some(Box::new(DirectRoutes)), Box::new(FixedRandom(0.5)));
        let result = busy.recommend(ORIGIN, DESTINATION, arrival());
        assert_relative_eq!(result.alternatives[0].predicted_saturation, 0.525, epsilon = 1e-9);
    }

    #[test]
    fn test_event_zone_raises_saturation() {
        let opera = GeoPoint::new(48.8712, 2.3316);
        let lots = vec![
            lot("OLYMPIA", GeoPoint::new(48.8705, 2.3290)),
            lot("QUIET", GeoPoint::new(48.8800, 2.3450)),
        ];

        let mut recommender = recommender(lots, Vec::new(), Some(Box::new(DirectRoutes)));
        let result = recommender.recommend(ORIGIN, opera, arrival());

        assert_eq!(result.best.as_ref().unwrap().id, "QUIET");
        assert_eq!(result.saturation.as_ref().unwrap().predicted, "0.50");

        let olympia = &result.alternatives[0];
        assert_eq!(olympia.name, "Parking OLYMPIA");
        assert_relative_eq!(olympia.predicted_saturation, 0.5 * 1.4, epsilon = 1e-9);
    }

    #[test]
    fn test_destination_closures_shift_every_candidate() {
        let stations = || {
            StationIndex::new(
                [("Alpha Nord", 0.0), ("Beta Nord", 0.002)]
                    .into_iter()
                    .map(|(name, dlon)| StationRecord {
                        name: name.to_string(),
                        slug: name.to_lowercase(),
                        latitude: DESTINATION.lat + 0.003,
                        longitude: DESTINATION.lon + dlon,
                        lines: vec!["7".to_string()],
                    })
                    .collect(),
            )
        };
        // Well beyond the lot and prediction radii of both stations
        let lots = vec![
            lot("S1", GeoPoint::new(DESTINATION.lat - 0.012, DESTINATION.lon)),
            lot("S2", GeoPoint::new(DESTINATION.lat - 0.012, DESTINATION.lon + 0.004)),
        ];
        let closures = vec![build_incident(
            "7",
            "alerte",
            "Trafic perturbé",
            "La station Alpha Nord est fermée. La station Beta Nord est fermée.",
        )];

        let open = static_aggregator(lots.clone(), Vec::new(), quiet_metro(), stations());
        let baseline = cycle(open, Some(Box::new(DirectRoutes)), Box::new(SeededRandom::new(3)))
            .recommend(ORIGIN, DESTINATION, arrival());

        let closed = static_aggregator(lots, Vec::new(), closures, stations());
        let result = cycle(closed, Some(Box::new(DirectRoutes)), Box::new(SeededRandom::new(3)))
            .recommend(ORIGIN, DESTINATION, arrival());

        assert_eq!(result.destination_stations.iter().filter(|s| s.closed).count(), 2);
        assert!(result.lot_stations.is_empty());
        let impact = result.transit_impact.as_ref().unwrap();
        assert_eq!(impact.score_penalty, -20.0);
        assert_eq!(impact.recommendation, "Advantageous parking: 2 closed station(s) near the destination");

        let before = ranked(&baseline);
        let after = ranked(&result);
        assert_eq!(before.len(), 2);
        assert_eq!(after.len(), 2);
        for ((name_before, score_before), (name_after, score_after)) in before.iter().zip(&after) {
            assert_eq!(name_before, name_after);
            assert_relative_eq!(score_after - score_before, -20.0, epsilon = 1e-9);
        }
    }
}
