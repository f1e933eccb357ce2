// Error types shared by the data sources, the router and the configuration layer

use thiserror::Error;

// ============================================================================
// Source / Provider Errors
// ============================================================================

/// Failure of a single upstream call. These never leave the aggregator or the
/// router: they are logged and turned into fallback data or a missing route.
#[derive(Debug, Error)]
pub enum ParkError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status error: {0}")]
    Status(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Missing credentials: {0}")]
    Credentials(String),
}

impl From<reqwest::Error> for ParkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ParkError::Network(format!("request timed out: {}", e))
        } else if e.is_decode() {
            ParkError::Parse(format!("invalid response body: {}", e))
        } else if let Some(status) = e.status() {
            ParkError::Status(format!("{} ({})", status, e))
        } else {
            ParkError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ParkError {
    fn from(e: serde_json::Error) -> Self {
        ParkError::Parse(format!("Invalid JSON response: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, ParkError>;

// ============================================================================
// Configuration Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
