// Backend API server for the Paris parking assistant
// Parking recommendation, road works, metro status and saturation forecasts

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use chrono::{DateTime, Utc};
use chrono_tz::Europe::Paris;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use park_assist::config::AppConfig;
use park_assist::geo::GeoPoint;
use park_assist::ranker::Recommender;
use park_assist::transit::StationIndex;

const SOURCES: [&str; 5] = ["Saemes", "Paris Open Data", "RATP", "Infoclimat", "Google Directions"];

#[derive(Clone)]
struct AppState {
    config: Arc<AppConfig>,
    stations: Arc<StationIndex>,
}

impl AppState {
    /// Fresh per request: own HTTP clients, own random state.
    fn recommender(&self) -> Recommender {
        Recommender::from_config(&self.config, self.stations.clone())
    }
}

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    timestamp: i64,
    sources: Vec<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now().timestamp(),
            sources: SOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn error(message: String) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now().timestamp(),
            sources: vec![],
        }
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Coordinates {
    lat: f64,
    lon: f64,
}

impl Coordinates {
    fn to_point(&self) -> Result<GeoPoint, String> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("Invalid coordinates: {}, {}", self.lat, self.lon));
        }
        Ok(GeoPoint::new(self.lat, self.lon))
    }
}

#[derive(Debug, Deserialize)]
struct RecommendRequest {
    origin: Coordinates,
    destination: Coordinates,
    /// RFC 3339; defaults to now.
    arrival: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AreaQuery {
    lat: f64,
    lon: f64,
    radius_km: Option<f64>,
}

impl AreaQuery {
    fn to_point(&self) -> Result<GeoPoint, String> {
        Coordinates { lat: self.lat, lon: self.lon }.to_point()
    }

    fn radius_or(&self, default: f64) -> Result<f64, String> {
        match self.radius_km {
            Some(r) if r.is_nan() || r <= 0.0 => Err(format!("radius_km must be positive, got {}", r)),
            Some(r) => Ok(r),
            None => Ok(default),
        }
    }
}

fn bad_request(message: String) -> HttpResponse {
    tracing::warn!("⚠️  Bad request: {}", message);
    HttpResponse::BadRequest().json(ApiResponse::<String>::error(message))
}

// ============================================================================
// Blocking Cycle Runner
// ============================================================================

/// Runs `job` on the blocking pool with a fresh recommender, bounded by the
/// configured cycle timeout. `Err` from the job becomes a 404.
async fn run_cycle<T, F>(state: &AppState, label: &'static str, job: F) -> HttpResponse
where
    T: Serialize + Send + 'static,
    F: FnOnce(Recommender) -> Result<T, String> + Send + 'static,
{
    let timeout = Duration::from_secs(state.config.server.cycle_timeout_secs);
    let state = state.clone();
    let task = tokio::task::spawn_blocking(move || job(state.recommender()));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(data))) => HttpResponse::Ok().json(ApiResponse::success(data)),
        Ok(Ok(Err(message))) => {
            tracing::warn!("⚠️  {}: {}", label, message);
            HttpResponse::NotFound().json(ApiResponse::<String>::error(message))
        }
        Ok(Err(e)) => {
            tracing::error!("❌ {} task panicked: {}", label, e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<String>::error(format!("{} task panicked", label)))
        }
        Err(_) => {
            tracing::error!("❌ {} timed out after {:?}", label, timeout);
            HttpResponse::GatewayTimeout()
                .json(ApiResponse::<String>::error(format!("{} timed out", label)))
        }
    }
}

// ============================================================================
// API Routes
// ============================================================================

async fn recommend(state: web::Data<AppState>, body: web::Json<RecommendRequest>) -> HttpResponse {
    let request = body.into_inner();
    let (origin, destination) = match (request.origin.to_point(), request.destination.to_point()) {
        (Ok(o), Ok(d)) => (o, d),
        (Err(e), _) | (_, Err(e)) => return bad_request(e),
    };
    let arrival = request.arrival.unwrap_or_else(Utc::now).with_timezone(&Paris);

    run_cycle(&state, "Recommendation", move |mut recommender| {
        Ok(recommender.recommend(origin, destination, arrival))
    })
    .await
}

async fn get_lots(state: web::Data<AppState>, query: web::Query<AreaQuery>) -> HttpResponse {
    let (point, radius) = match (query.to_point(), query.radius_or(state.config.engine.search_radius_km)) {
        (Ok(p), Ok(r)) => (p, r),
        (Err(e), _) | (_, Err(e)) => return bad_request(e),
    };

    run_cycle(&state, "Parking lookup", move |mut recommender| {
        let lots = recommender.lots_near(point, radius);
        tracing::info!("🅿️  Parkings requested: {} within {:.1}km", lots.len(), radius);
        Ok(lots)
    })
    .await
}

async fn get_works(state: web::Data<AppState>) -> HttpResponse {
    run_cycle(&state, "Road works", |mut recommender| {
        let works = recommender.road_works();
        tracing::info!("🚧 Road works requested: {} active", works.len());
        Ok(works)
    })
    .await
}

async fn get_transit(state: web::Data<AppState>) -> HttpResponse {
    run_cycle(&state, "Transit status", |mut recommender| {
        let incidents = recommender.transit_incidents();
        tracing::info!("🚇 Transit status requested: {} lines", incidents.len());
        Ok(incidents)
    })
    .await
}

async fn get_stations(state: web::Data<AppState>, query: web::Query<AreaQuery>) -> HttpResponse {
    let (point, radius) = match (
        query.to_point(),
        query.radius_or(state.config.engine.destination_station_radius_km),
    ) {
        (Ok(p), Ok(r)) => (p, r),
        (Err(e), _) | (_, Err(e)) => return bad_request(e),
    };

    run_cycle(&state, "Station lookup", move |mut recommender| {
        Ok(recommender.stations_near(point, radius))
    })
    .await
}

async fn get_prediction(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<AreaQuery>,
) -> HttpResponse {
    let lot_id = path.into_inner();
    let point = match query.to_point() {
        Ok(p) => p,
        Err(e) => return bad_request(e),
    };
    let radius = state.config.engine.search_radius_km;

    run_cycle(&state, "Saturation prediction", move |mut recommender| {
        let lots = recommender.lots_near(point, radius);
        let lot = lots
            .iter()
            .find(|l| l.id == lot_id)
            .ok_or_else(|| format!("Parking '{}' not found near the destination", lot_id))?;

        let prediction = recommender.predict_lot(lot, Utc::now().with_timezone(&Paris));
        tracing::info!(
            "🔮 Prediction for {}: {:.0}% ({})",
            lot.name,
            prediction.predicted_occupancy * 100.0,
            prediction.time_to_saturation
        );
        Ok(prediction)
    })
    .await
}

async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "Paris Parking Assistant API",
        "version": env!("CARGO_PKG_VERSION"),
        "sources": SOURCES,
        "reference_stations": state.stations.len(),
        "directions": if state.config.credentials.maps_api_key.is_some() { "live" } else { "simulated" },
        "timestamp": Utc::now().timestamp(),
    }))
}

// ============================================================================
// Server Setup
// ============================================================================

async fn run_server(config: AppConfig) -> std::io::Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let app_state = AppState {
        config: Arc::new(config),
        stations: Arc::new(StationIndex::paris()),
    };

    tracing::info!("╔════════════════════════════════════════════════════════════╗");
    tracing::info!("║   🚗 Paris Parking Assistant                               ║");
    tracing::info!("╚════════════════════════════════════════════════════════════╝");
    tracing::info!("🌐 Server running on: http://{}:{}", host, port);
    tracing::info!("📡 API available at: http://localhost:{}/api/parking", port);
    tracing::info!("⏱️  Cycle timeout: {}s", app_state.config.server.cycle_timeout_secs);

    tracing::info!("📍 Available Routes:");
    tracing::info!("   POST /api/parking/recommend              - Best parking + alternatives");
    tracing::info!("   GET  /api/parking/lots?lat&lon&radius_km - Parkings near a point");
    tracing::info!("   GET  /api/parking/works                  - Current road works");
    tracing::info!("   GET  /api/parking/transit                - Metro line status");
    tracing::info!("   GET  /api/parking/stations?lat&lon       - Stations with closures");
    tracing::info!("   GET  /api/parking/prediction/:id?lat&lon - Saturation forecast");
    tracing::info!("   GET  /health                             - Health check");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api/parking")
                    .route("/recommend", web::post().to(recommend))
                    .route("/lots", web::get().to(get_lots))
                    .route("/works", web::get().to(get_works))
                    .route("/transit", web::get().to(get_transit))
                    .route("/stations", web::get().to(get_stations))
                    .route("/prediction/{lot_id}", web::get().to(get_prediction)),
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("📡 Loading configuration...");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Invalid configuration: {}", e);
            tracing::error!("💡 Check the file named by PARK_ASSIST_CONFIG (default park-assist.toml)");
            std::process::exit(1);
        }
    };

    if config.credentials.infoclimat_username.is_none() || config.credentials.infoclimat_private_key.is_none() {
        tracing::warn!("⚠️  INFOCLIMAT_USERNAME / INFOCLIMAT_PRIVATE_KEY not set, weather adjustments disabled");
    }
    if config.credentials.maps_api_key.is_none() {
        tracing::warn!("⚠️  MAPS_API_KEY not set, travel times are simulated");
    }

    actix_web::rt::System::new().block_on(run_server(config))
}
