//! Parking recommendation engine for Paris.
//!
//! Given an origin and a destination, [`ranker::Recommender`] gathers parking
//! availability, road works, metro status and weather, forecasts saturation
//! for every nearby lot and returns the best lot with up to three
//! alternatives. Every upstream source degrades to synthetic data when it is
//! unreachable.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod fallback;
pub mod geo;
pub mod matching;
pub mod models;
pub mod predictor;
pub mod random;
pub mod ranker;
pub mod routing;
pub mod sources;
pub mod transit;

pub use config::AppConfig;
pub use error::{ConfigError, ParkError};
pub use geo::GeoPoint;
pub use models::Recommendation;
pub use ranker::Recommender;
