//! Saturation forecasting.
//!
//! The forecast starts from an hourly occupancy history (synthetic, see
//! [`HistoryGenerator`]) and is then adjusted for weather, nearby transit
//! closures and local events before being clamped to `[0, 1]`.

use chrono::{DateTime, Datelike, Duration, Timelike, Weekday};
use chrono_tz::Tz;

use crate::models::{LocalEvent, ParkingLot, SaturationPrediction, TimeToSaturation, WeatherReport};
use crate::random::RandomSource;

pub const DEFAULT_PREDICTION: f64 = 0.5;
pub const DEFAULT_STDDEV: f64 = 0.2;
pub const CLOSED_STATION_FACTOR: f64 = 0.15;

const SATURATION_THRESHOLD: f64 = 0.95;
const SATURATED: f64 = 0.99;
const LOW_RISK: f64 = 0.5;
const FILL_HORIZON_MIN: f64 = 60.0;
const MIN_FILL_RATE: f64 = 0.001;

// ============================================================================
// Occupancy history
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct OccupancySample {
    pub weekday: Weekday,
    pub hour: u32,
    pub occupancy: f64,
}

/// Synthetic hourly occupancy pattern: rush hours, lunch, nights, quieter weekends.
#[derive(Debug, Clone, Copy)]
pub struct HistoryGenerator {
    pub days: u32,
}

impl Default for HistoryGenerator {
    fn default() -> Self {
        HistoryGenerator { days: 30 }
    }
}

impl HistoryGenerator {
    pub fn new(days: u32) -> Self {
        HistoryGenerator { days }
    }

    /// `days × 24` samples going back from `reference`.
    pub fn generate(&self, reference: DateTime<Tz>, rng: &mut dyn RandomSource) -> Vec<OccupancySample> {
        let mut samples = Vec::with_capacity(self.days as usize * 24);

        for day in 0..self.days {
            let weekday = (reference - Duration::days(day as i64)).weekday();
            let weekend = weekday.num_days_from_monday() >= 5;

            for hour in 0..24 {
                let (low, high) = Self::baseline_band(hour);
                let mut base = rng.uniform(low, high);
                if weekend {
                    base *= 0.7;
                }
                let occupancy = (base + rng.uniform(-0.1, 0.1)).min(1.0);
                samples.push(OccupancySample { weekday, hour, occupancy });
            }
        }

        samples
    }

    pub fn baseline_band(hour: u32) -> (f64, f64) {
        match hour {
            8..=10 => (0.7, 0.95),
            17..=19 => (0.8, 0.98),
            12..=14 => (0.6, 0.85),
            h if h >= 22 || h <= 6 => (0.1, 0.3),
            _ => (0.4, 0.7),
        }
    }
}

// ============================================================================
// Prediction
// ============================================================================

/// External signals for one prediction.
#[derive(Debug, Clone, Copy)]
pub struct PredictionConditions<'a> {
    pub weather: &'a WeatherReport,
    /// Closed stations within the prediction radius of the lot.
    pub closed_stations_nearby: usize,
    pub events: &'a [LocalEvent],
}

#[derive(Debug, Clone, Default)]
pub struct SaturationPredictor {
    history: HistoryGenerator,
}

impl SaturationPredictor {
    pub fn new(history: HistoryGenerator) -> Self {
        SaturationPredictor { history }
    }

    pub fn predict(
        &self,
        lot: &ParkingLot,
        target: DateTime<Tz>,
        conditions: &PredictionConditions<'_>,
        rng: &mut dyn RandomSource,
    ) -> SaturationPrediction {
        let history = self.history.generate(target, rng);
        let (base, stddev) = Self::baseline(&history, target.weekday(), target.hour());

        let mut prediction = base;

        if conditions.weather.is_available() {
            prediction *= if rng.chance(0.3) { 0.9 } else { 1.05 };
        }

        if conditions.closed_stations_nearby > 0 {
            let factor = (1.0 + CLOSED_STATION_FACTOR).powi(conditions.closed_stations_nearby as i32);
            prediction *= factor;
            tracing::info!(
                "🚇 Metro impact on {}: {} closed station(s) -> +{:.0}%",
                lot.name,
                conditions.closed_stations_nearby,
                (factor - 1.0) * 100.0
            );
        }

        for event in conditions.events.iter().filter(|e| e.covers(lot.position())) {
            tracing::debug!("🎫 {} raises demand at {} (x{})", event.name, lot.name, event.impact_coefficient);
            prediction *= event.impact_coefficient;
        }

        let prediction = prediction.clamp(0.0, 1.0);
        let current = lot.current_occupancy();

        SaturationPrediction {
            lot_id: lot.id.clone(),
            current_occupancy: current,
            predicted_occupancy: prediction,
            predicted_at: target,
            reliability: 1.0 - stddev,
            time_to_saturation: time_to_saturation(current, prediction),
        }
    }

    /// Mean and population standard deviation of the samples within one hour of
    /// `hour` on `weekday`.
    pub fn baseline(history: &[OccupancySample], weekday: Weekday, hour: u32) -> (f64, f64) {
        let similar: Vec<f64> = history
            .iter()
            .filter(|s| s.weekday == weekday && s.hour.abs_diff(hour) <= 1)
            .map(|s| s.occupancy)
            .collect();

        if similar.is_empty() {
            return (DEFAULT_PREDICTION, DEFAULT_STDDEV);
        }

        let n = similar.len() as f64;
        let mean = similar.iter().sum::<f64>() / n;
        let variance = similar.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        (mean, variance.sqrt())
    }
}

/// Linear fill-rate extrapolation towards the 95% threshold.
pub fn time_to_saturation(current: f64, predicted: f64) -> TimeToSaturation {
    if predicted > SATURATION_THRESHOLD && current < SATURATION_THRESHOLD {
        let rate = (predicted - current) / FILL_HORIZON_MIN;
        if rate > MIN_FILL_RATE {
            let minutes = ((SATURATION_THRESHOLD - current) / rate) as u32;
            if minutes < 60 {
                TimeToSaturation::Minutes(minutes)
            } else {
                TimeToSaturation::Hours(minutes / 60)
            }
        } else {
            TimeToSaturation::LowImmediateRisk
        }
    } else if predicted >= SATURATED {
        TimeToSaturation::AlreadySaturated
    } else if predicted <= LOW_RISK {
        TimeToSaturation::LowRisk
    } else {
        TimeToSaturation::NotApplicable
    }
}
