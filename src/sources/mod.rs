//! Upstream data feeds and the fallback strategy.
//!
//! Each feed performs its own blocking HTTP calls and parses the payload with
//! pure functions over `serde_json::Value`. A failing or empty feed never
//! reaches the caller: [`resolve`] swaps in a synthetic dataset instead.

pub mod directions;
pub mod opendata;
pub mod ratp;
pub mod weather;

use std::time::Duration;

use reqwest::blocking;

use crate::error::{ParkError, Result};
use crate::random::RandomSource;

/// A list-shaped upstream source.
pub trait Feed: Send {
    type Item;

    fn name(&self) -> &str;

    fn fetch(&self, rng: &mut dyn RandomSource) -> Result<Vec<Self::Item>>;
}

/// Items tagged with where they came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Sourced<T> {
    Live(Vec<T>),
    Fallback(Vec<T>),
}

impl<T> Sourced<T> {
    pub fn is_live(&self) -> bool {
        matches!(self, Sourced::Live(_))
    }

    pub fn items(&self) -> &[T] {
        match self {
            Sourced::Live(items) | Sourced::Fallback(items) => items,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Sourced::Live(items) | Sourced::Fallback(items) => items,
        }
    }

    /// Transforms the items, keeping the provenance.
    pub fn map<U, F>(self, f: F) -> Sourced<U>
    where
        F: FnOnce(Vec<T>) -> Vec<U>,
    {
        match self {
            Sourced::Live(items) => Sourced::Live(f(items)),
            Sourced::Fallback(items) => Sourced::Fallback(f(items)),
        }
    }
}

/// Feed standing in for a client that could not be built; always fails.
pub struct OfflineFeed<T> {
    name: String,
    reason: String,
    _item: std::marker::PhantomData<fn() -> T>,
}

impl<T> OfflineFeed<T> {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        OfflineFeed {
            name: name.into(),
            reason: reason.into(),
            _item: std::marker::PhantomData,
        }
    }
}

impl<T> Feed for OfflineFeed<T> {
    type Item = T;

    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self, _rng: &mut dyn RandomSource) -> Result<Vec<T>> {
        Err(ParkError::Network(format!("{} offline: {}", self.name, self.reason)))
    }
}

/// Live data when the primary call succeeded with at least one item,
/// otherwise the fallback dataset.
pub fn resolve<T, F>(name: &str, primary: Result<Vec<T>>, fallback: F) -> Sourced<T>
where
    F: FnOnce() -> Vec<T>,
{
    match primary {
        Ok(items) if !items.is_empty() => {
            tracing::info!("✅ {} {}: live data", items.len(), name);
            Sourced::Live(items)
        }
        Ok(_) => {
            tracing::warn!("⚠️  {}: no records returned, using simulated data", name);
            Sourced::Fallback(fallback())
        }
        Err(e) => {
            tracing::warn!("❌ {}: {}, using simulated data", name, e);
            Sourced::Fallback(fallback())
        }
    }
}

/// Fetches a feed and resolves it against `fallback`.
pub fn fetch_or_fallback<T, F>(feed: &dyn Feed<Item = T>, rng: &mut dyn RandomSource, fallback: F) -> Sourced<T>
where
    F: FnOnce(&mut dyn RandomSource) -> Vec<T>,
{
    tracing::info!("🔄 Fetching {}...", feed.name());
    let primary = feed.fetch(rng);
    resolve(feed.name(), primary, || fallback(rng))
}

// ============================================================================
// HTTP helpers
// ============================================================================

pub(crate) fn http_client(timeout: Duration) -> Result<blocking::Client> {
    blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ParkError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// GET with query parameters, checked for a success status, decoded as JSON.
pub(crate) fn get_json(
    client: &blocking::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<serde_json::Value> {
    let response = client
        .get(url)
        .query(query)
        .send()
        .map_err(|e| ParkError::Network(format!("Failed to fetch {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(ParkError::Status(format!("{} returned {}", url, response.status())));
    }

    let body = response
        .text()
        .map_err(|e| ParkError::Network(format!("Failed to read response: {}", e)))?;

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    struct StaticFeed(Result<Vec<u32>>);

    impl Feed for StaticFeed {
        type Item = u32;

        fn name(&self) -> &str {
            "static numbers"
        }

        fn fetch(&self, _rng: &mut dyn RandomSource) -> Result<Vec<u32>> {
            match &self.0 {
                Ok(items) => Ok(items.clone()),
                Err(e) => Err(ParkError::Network(e.to_string())),
            }
        }
    }

    #[test]
    fn test_resolve_prefers_live() {
        let sourced = resolve("numbers", Ok(vec![1, 2]), || vec![9]);
        assert_eq!(sourced, Sourced::Live(vec![1, 2]));
        assert!(sourced.is_live());
    }

    #[test]
    fn test_resolve_empty_falls_back() {
        let sourced = resolve("numbers", Ok(Vec::new()), || vec![9]);
        assert_eq!(sourced, Sourced::Fallback(vec![9]));
    }

    #[test]
    fn test_resolve_error_falls_back() {
        let sourced = resolve("numbers", Err(ParkError::Parse("bad".into())), || vec![9, 8]);
        assert!(!sourced.is_live());
        assert_eq!(sourced.items(), &[9, 8]);
    }

    #[test]
    fn test_fetch_or_fallback_uses_rng_only_on_fallback() {
        let mut rng = SeededRandom::new(3);
        let live = fetch_or_fallback(&StaticFeed(Ok(vec![4])), &mut rng, |_| vec![0]);
        assert_eq!(live.into_items(), vec![4]);

        let failed = StaticFeed(Err(ParkError::Network("down".into())));
        let fallback = fetch_or_fallback(&failed, &mut rng, |r| vec![r.int_in(5, 5) as u32]);
        assert_eq!(fallback, Sourced::Fallback(vec![5]));
    }
}
