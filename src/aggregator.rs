// Data aggregation: every upstream source behind one facade, each degrading to
// its synthetic dataset on failure

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::config::{AppConfig, EngineConfig};
use crate::error::Result;
use crate::fallback;
use crate::geo::{GeoPoint, distance_km};
use crate::models::{LocalEvent, ParkingLot, RoadWork, TransitIncident, TransitStation, WeatherReport};
use crate::random::RandomSource;
use crate::sources::opendata::{MunicipalFeed, RoadWorksFeed, SaemesFeed};
use crate::sources::ratp::RatpTrafficFeed;
use crate::sources::weather::{InfoclimatClient, NoWeather, WeatherSource};
use crate::sources::{Feed, OfflineFeed, Sourced, fetch_or_fallback};
use crate::transit::StationIndex;

type LotFeed = Box<dyn Feed<Item = ParkingLot>>;
type WorksFeed = Box<dyn Feed<Item = RoadWork>>;
type IncidentFeed = Box<dyn Feed<Item = TransitIncident>>;

fn or_offline<F, T>(name: &str, built: Result<F>) -> Box<dyn Feed<Item = T>>
where
    F: Feed<Item = T> + 'static,
    T: 'static,
{
    match built {
        Ok(feed) => Box::new(feed),
        Err(e) => {
            tracing::warn!("⚠️  {} client unavailable: {}", name, e);
            Box::new(OfflineFeed::<T>::new(name, e.to_string()))
        }
    }
}

pub struct DataAggregator {
    engine: EngineConfig,
    saemes: LotFeed,
    municipal: LotFeed,
    works: WorksFeed,
    transit: IncidentFeed,
    weather: Box<dyn WeatherSource>,
    stations: Arc<StationIndex>,
}

impl DataAggregator {
    pub fn new(config: &AppConfig, stations: Arc<StationIndex>) -> Self {
        let sources = &config.sources;
        DataAggregator {
            engine: config.engine.clone(),
            saemes: or_offline("Saemes parkings", SaemesFeed::new(sources)),
            municipal: or_offline("municipal parkings", MunicipalFeed::new(sources)),
            works: or_offline("road works", RoadWorksFeed::new(sources)),
            transit: or_offline("RATP metro lines", RatpTrafficFeed::new(sources)),
            weather: InfoclimatClient::from_config(sources, &config.credentials),
            stations,
        }
    }

    /// No network access at all: every source serves its synthetic dataset.
    pub fn offline(engine: EngineConfig, stations: Arc<StationIndex>) -> Self {
        DataAggregator {
            engine,
            saemes: Box::new(OfflineFeed::<ParkingLot>::new("Saemes parkings", "offline mode")),
            municipal: Box::new(OfflineFeed::<ParkingLot>::new("municipal parkings", "offline mode")),
            works: Box::new(OfflineFeed::<RoadWork>::new("road works", "offline mode")),
            transit: Box::new(OfflineFeed::<TransitIncident>::new("RATP metro lines", "offline mode")),
            weather: Box::new(NoWeather::new("offline mode")),
            stations,
        }
    }

    pub fn with_lot_feeds(mut self, saemes: LotFeed, municipal: LotFeed) -> Self {
        self.saemes = saemes;
        self.municipal = municipal;
        self
    }

    pub fn with_works_feed(mut self, works: WorksFeed) -> Self {
        self.works = works;
        self
    }

    pub fn with_transit_feed(mut self, transit: IncidentFeed) -> Self {
        self.transit = transit;
        self
    }

    pub fn with_weather(mut self, weather: Box<dyn WeatherSource>) -> Self {
        self.weather = weather;
        self
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn station_index(&self) -> &StationIndex {
        &self.stations
    }

    /// Saemes lots, narrowed to the relevant ones when a destination is given.
    pub fn saemes_lots(&self, destination: Option<GeoPoint>, rng: &mut dyn RandomSource) -> Sourced<ParkingLot> {
        let lots = fetch_or_fallback(self.saemes.as_ref(), rng, fallback::saemes_lots);
        self.narrow(lots, destination)
    }

    pub fn municipal_lots(&self, destination: Option<GeoPoint>, rng: &mut dyn RandomSource) -> Sourced<ParkingLot> {
        let lots = fetch_or_fallback(self.municipal.as_ref(), rng, fallback::municipal_lots);
        self.narrow(lots, destination)
    }

    fn narrow(&self, lots: Sourced<ParkingLot>, destination: Option<GeoPoint>) -> Sourced<ParkingLot> {
        match destination {
            Some(destination) => lots.map(|lots| {
                filter_relevant_lots(lots, destination, self.engine.search_radius_km, self.engine.max_candidates)
            }),
            None => lots,
        }
    }

    pub fn road_works(&self, rng: &mut dyn RandomSource) -> Sourced<RoadWork> {
        fetch_or_fallback(self.works.as_ref(), rng, |rng| fallback::road_works(Utc::now(), rng))
    }

    pub fn transit_incidents(&self, rng: &mut dyn RandomSource) -> Sourced<TransitIncident> {
        fetch_or_fallback(self.transit.as_ref(), rng, |_| fallback::transit_incidents())
    }

    pub fn stations_near(&self, point: GeoPoint, radius_km: f64, incidents: &[TransitIncident]) -> Vec<TransitStation> {
        let stations = self.stations.stations_near(point, radius_km, incidents);
        let closed = stations.iter().filter(|s| s.closed).count();
        tracing::info!("🚇 {} station(s) within {:.1}km, {} closed", stations.len(), radius_km, closed);
        stations
    }

    pub fn weather_at(&self, point: GeoPoint) -> WeatherReport {
        self.weather.weather_at(point)
    }

    pub fn local_events(&self, date: NaiveDate) -> Vec<LocalEvent> {
        fallback::local_events(date)
    }
}

/// Lots within `radius_km` of `destination`, nearest first, at most `max`.
/// Sets `distance_to_destination` on every kept lot.
pub fn filter_relevant_lots(
    lots: Vec<ParkingLot>,
    destination: GeoPoint,
    radius_km: f64,
    max: usize,
) -> Vec<ParkingLot> {
    let total = lots.len();
    let mut relevant: Vec<ParkingLot> = lots
        .into_iter()
        .filter_map(|mut lot| {
            let distance = distance_km(destination, lot.position());
            if distance > radius_km {
                return None;
            }
            lot.distance_to_destination = distance;
            Some(lot)
        })
        .collect();

    relevant.sort_by(|a, b| a.distance_to_destination.total_cmp(&b.distance_to_destination));
    relevant.truncate(max);

    tracing::info!("📍 {} of {} parkings within {:.1}km of the destination", relevant.len(), total, radius_km);
    for lot in relevant.iter().take(3) {
        tracing::debug!("   - {}: {:.2}km", lot.name, lot.distance_to_destination);
    }

    relevant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParkError;
    use crate::random::SeededRandom;

    const HOTEL_DE_VILLE: GeoPoint = GeoPoint::new(48.8566, 2.3522);

    fn lot_at(id: &str, lat: f64, lon: f64) -> ParkingLot {
        ParkingLot::new(id, id, "Paris", GeoPoint::new(lat, lon), 100, 50, 3.0).unwrap()
    }

    struct StaticLots(Vec<ParkingLot>);

    impl Feed for StaticLots {
        type Item = ParkingLot;

        fn name(&self) -> &str {
            "static lots"
        }

        fn fetch(&self, _rng: &mut dyn RandomSource) -> Result<Vec<ParkingLot>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_filter_radius_order_and_cap() {
        let mut lots: Vec<ParkingLot> = (0..30)
            .map(|i| lot_at(&format!("L{}", i), 48.8566 + 0.001 * i as f64, 2.3522))
            .collect();
        lots.push(lot_at("FAR", 48.95, 2.45));

        let relevant = filter_relevant_lots(lots, HOTEL_DE_VILLE, 3.0, 15);
        assert_eq!(relevant.len(), 15);
        assert!(relevant.iter().all(|l| l.distance_to_destination <= 3.0));
        assert!(relevant.windows(2).all(|w| w[0].distance_to_destination <= w[1].distance_to_destination));
        assert_eq!(relevant[0].id, "L0");
        assert!(relevant.iter().all(|l| l.id != "FAR"));
    }

    #[test]
    fn test_filter_empty_when_nothing_in_radius() {
        let relevant = filter_relevant_lots(vec![lot_at("FAR", 48.95, 2.45)], HOTEL_DE_VILLE, 3.0, 15);
        assert!(relevant.is_empty());
    }

    #[test]
    fn test_offline_serves_fallback_data() {
        let aggregator = DataAggregator::offline(EngineConfig::default(), Arc::new(StationIndex::paris()));
        let mut rng = SeededRandom::new(5);

        let saemes = aggregator.saemes_lots(None, &mut rng);
        assert!(!saemes.is_live());
        assert_eq!(saemes.items().len(), 5);

        let nearby = aggregator.saemes_lots(Some(HOTEL_DE_VILLE), &mut rng);
        assert!(nearby.items().iter().all(|l| l.distance_to_destination <= 3.0));

        assert_eq!(aggregator.municipal_lots(None, &mut rng).items().len(), 4);
        assert_eq!(aggregator.road_works(&mut rng).items().len(), 3);
        assert_eq!(aggregator.transit_incidents(&mut rng).items().len(), 4);
        assert!(!aggregator.weather_at(HOTEL_DE_VILLE).is_available());
    }

    #[test]
    fn test_live_feed_wins_over_fallback() {
        let aggregator = DataAggregator::offline(EngineConfig::default(), Arc::new(StationIndex::paris()))
            .with_lot_feeds(
                Box::new(StaticLots(vec![lot_at("LIVE", 48.8570, 2.3525)])),
                Box::new(OfflineFeed::<ParkingLot>::new("municipal", "down")),
            );
        let mut rng = SeededRandom::new(5);

        let saemes = aggregator.saemes_lots(Some(HOTEL_DE_VILLE), &mut rng);
        assert!(saemes.is_live());
        assert_eq!(saemes.items()[0].id, "LIVE");

        // Live but nothing within range stays live, just empty
        let far = DataAggregator::offline(EngineConfig::default(), Arc::new(StationIndex::paris()))
            .with_lot_feeds(
                Box::new(StaticLots(vec![lot_at("FAR", 48.95, 2.45)])),
                Box::new(StaticLots(Vec::new())),
            );
        assert!(far.saemes_lots(Some(HOTEL_DE_VILLE), &mut rng).items().is_empty());
        assert!(!far.municipal_lots(None, &mut rng).is_live());
    }

    #[test]
    fn test_offline_feed_error() {
        let feed = OfflineFeed::<RoadWork>::new("road works", "no client");
        let err = feed.fetch(&mut SeededRandom::new(1)).unwrap_err();
        assert!(matches!(err, ParkError::Network(_)));
    }
}
