//! Geocoding of the search origin.
//!
//! Best-effort, one result only. A failed or empty lookup returns `None`
//! and discovery falls back to text-based location matching.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::geo::GeoPoint;

/// Resolves a location query string into coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<GeoPoint>>;
}

/// OpenStreetMap Nominatim geocoder.
pub struct NominatimGeocoder {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct NominatimRow {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

impl NominatimGeocoder {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; FurryFriendsShelterBot/1.0; +https://furryfriendswa.org/bot)")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(12))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> anyhow::Result<Option<GeoPoint>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        let rows: Vec<NominatimRow> = self
            .client
            .get("https://nominatim.openstreetmap.org/search")
            .query(&[
                ("q", query),
                ("format", "jsonv2"),
                ("limit", "1"),
                ("countrycodes", "us"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let (Ok(latitude), Ok(longitude)) = (row.lat.parse::<f64>(), row.lon.parse::<f64>())
        else {
            warn!(query, "geocoder returned unparseable coordinates");
            return Ok(None);
        };
        Ok(Some(GeoPoint {
            latitude,
            longitude,
            display_name: row.display_name,
        }))
    }
}

/// Geocoder that never resolves anything; keyless and test runs.
pub struct NoopGeocoder;

#[async_trait]
impl Geocoder for NoopGeocoder {
    async fn geocode(&self, _query: &str) -> anyhow::Result<Option<GeoPoint>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_geocoder_returns_none() {
        let result = NoopGeocoder.geocode("Portland, OR").await.unwrap();
        assert!(result.is_none());
    }
}
