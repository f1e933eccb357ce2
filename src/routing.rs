//! Travel time estimation and road-work exposure of routes.
//!
//! With a Directions key the provider's routes are used; without one the
//! analyzer simulates durations from great-circle distance.

use crate::geo::{GeoPoint, distance_km, sample_every};
use crate::models::{DisruptionLevel, RoadWork, TravelEstimate, TravelMode};
use crate::random::RandomSource;
use crate::sources::directions::{DirectionsRequest, RouteOption, RouteProvider};

pub const DRIVING_SPEED_KMH: f64 = 20.0;
pub const WALKING_SPEED_KMH: f64 = 5.0;
pub const MAX_WORKS_IMPACT: f64 = 0.8;

const WORKS_NEAR_ENDPOINT_KM: f64 = 1.0;
const ROUTE_IMPACT_RADIUS_KM: f64 = 0.5;
const ROUTE_IMPACT_STRIDE: usize = 10;
const ON_ROUTE_RADIUS_KM: f64 = 0.3;
const ON_ROUTE_STRIDE: usize = 5;

pub struct RouteAnalyzer {
    provider: Option<Box<dyn RouteProvider>>,
}

impl RouteAnalyzer {
    pub fn new(provider: Option<Box<dyn RouteProvider>>) -> Self {
        RouteAnalyzer { provider }
    }

    pub fn simulated() -> Self {
        Self::new(None)
    }

    /// `None` when the provider fails or returns nothing usable.
    #[allow(clippy::too_many_arguments)]
    pub fn travel_time(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
        with_traffic: bool,
        avoid_works: bool,
        works: &[RoadWork],
        rng: &mut dyn RandomSource,
    ) -> Option<TravelEstimate> {
        let Some(provider) = &self.provider else {
            return Some(simulate(origin, destination, mode, avoid_works, works, rng));
        };

        let request = DirectionsRequest { origin, destination, mode, with_traffic, avoid_works };
        let routes = match provider.routes(&request) {
            Ok(routes) => routes,
            Err(e) => {
                tracing::warn!("❌ Route {} unavailable: {}", mode.as_str(), e);
                return None;
            }
        };

        let route = if avoid_works && routes.len() > 1 {
            choose_least_disrupted_route(&routes, works)?
        } else {
            routes.first()?
        };

        let duration_in_traffic_min = match route.duration_in_traffic_min {
            Some(traffic) if with_traffic && mode == TravelMode::Driving => traffic,
            _ => route.duration_min,
        };

        Some(TravelEstimate {
            duration_min: route.duration_min,
            duration_in_traffic_min,
            route_points: route.points.clone(),
        })
    }
}

fn simulate(
    origin: GeoPoint,
    destination: GeoPoint,
    mode: TravelMode,
    avoid_works: bool,
    works: &[RoadWork],
    rng: &mut dyn RandomSource,
) -> TravelEstimate {
    let distance = distance_km(origin, destination);

    match mode {
        TravelMode::Driving => {
            let mut base = distance / DRIVING_SPEED_KMH * 60.0;
            if avoid_works {
                base *= 1.0 + works_impact_factor(origin, destination, works);
            }
            let traffic = base * rng.uniform(1.2, 1.8);
            TravelEstimate {
                duration_min: base as u32,
                duration_in_traffic_min: traffic as u32,
                route_points: Vec::new(),
            }
        }
        TravelMode::Walking => {
            let minutes = (distance / WALKING_SPEED_KMH * 60.0) as u32;
            TravelEstimate {
                duration_min: minutes,
                duration_in_traffic_min: minutes,
                route_points: Vec::new(),
            }
        }
    }
}

fn disrupts_circulation(work: &&RoadWork) -> bool {
    work.affects_circulation
}

/// Extra travel-time share caused by works near either end of a trip.
pub fn works_impact_factor(origin: GeoPoint, destination: GeoPoint, works: &[RoadWork]) -> f64 {
    let total: f64 = works
        .iter()
        .filter(disrupts_circulation)
        .filter(|w| {
            let at = w.position();
            distance_km(origin, at).min(distance_km(destination, at)) < WORKS_NEAR_ENDPOINT_KM
        })
        .map(|w| match w.disruption {
            DisruptionLevel::HighlyDisruptive => 0.30,
            DisruptionLevel::Disruptive => 0.15,
        })
        .sum();

    total.min(MAX_WORKS_IMPACT)
}

/// Penalty points for a route: every 10th point, per work within 500 m.
pub fn route_impact_points(points: &[GeoPoint], works: &[RoadWork]) -> u32 {
    sample_every(points, ROUTE_IMPACT_STRIDE)
        .map(|point| {
            works
                .iter()
                .filter(|w| distance_km(*point, w.position()) < ROUTE_IMPACT_RADIUS_KM)
                .map(|w| match w.disruption {
                    DisruptionLevel::HighlyDisruptive => 10,
                    DisruptionLevel::Disruptive => 5,
                })
                .sum::<u32>()
        })
        .sum()
}

/// Lowest `duration + impact points`; the earliest route wins ties.
pub fn choose_least_disrupted_route<'a>(routes: &'a [RouteOption], works: &[RoadWork]) -> Option<&'a RouteOption> {
    let mut best: Option<(&RouteOption, u32)> = None;
    for route in routes {
        let score = route.duration_min + route_impact_points(&route.points, works);
        if best.is_none_or(|(_, best_score)| score < best_score) {
            best = Some((route, score));
        }
    }
    best.map(|(route, _)| route)
}

/// Circulation-affecting works with a sampled route point within 300 m.
pub fn works_on_route(points: &[GeoPoint], works: &[RoadWork]) -> Vec<RoadWork> {
    works
        .iter()
        .filter(disrupts_circulation)
        .filter(|w| {
            let at = w.position();
            sample_every(points, ON_ROUTE_STRIDE).any(|p| distance_km(*p, at) < ON_ROUTE_RADIUS_KM)
        })
        .cloned()
        .collect()
}
