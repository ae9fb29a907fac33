//! Google Places (New) nearby-search provider.
//!
//! Covers large radii by tiling nearby search across the area (the API
//! caps results per call). Only runs when the search origin geocoded and
//! a radius was requested.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::deadline::Deadline;
use crate::geo::{self, GeoPoint, GeoTile, METERS_PER_MILE};
use crate::progress::{ProgressEvent, ProgressSink, StopReason};
use crate::score::score_place;
use crate::types::{Category, OrganizationCandidate};

const NEARBY_URL: &str = "https://places.googleapis.com/v1/places:searchNearby";
const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.location,places.types,places.primaryType,places.businessStatus,places.websiteUri,places.nationalPhoneNumber";

/// Places API (New) client.
pub struct PlacesClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NearbyRequest {
    max_result_count: u32,
    location_restriction: LocationRestriction,
    rank_preference: &'static str,
}

#[derive(Debug, Serialize)]
struct LocationRestriction {
    circle: Circle,
}

#[derive(Debug, Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(default)]
    pub id: String,
    display_name: Option<DisplayName>,
    formatted_address: Option<String>,
    location: Option<Location>,
    #[serde(default)]
    types: Vec<String>,
    primary_type: Option<String>,
    business_status: Option<String>,
    website_uri: Option<String>,
    national_phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DisplayName {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl PlacesClient {
    /// Build from config; `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.google_maps_api_key.clone()?;
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.places_http_timeout)
            .build()
            .ok()?;
        Some(Self { client, api_key })
    }

    /// Nearby search within one tile, ranked by distance.
    pub async fn search_nearby(&self, tile: &GeoTile) -> anyhow::Result<Vec<Place>> {
        let request = NearbyRequest {
            max_result_count: 20,
            location_restriction: LocationRestriction {
                circle: Circle {
                    center: LatLng {
                        latitude: tile.latitude,
                        longitude: tile.longitude,
                    },
                    radius: tile.radius_m.max(1.0),
                },
            },
            rank_preference: "DISTANCE",
        };

        let response: NearbyResponse = self
            .client
            .post(NEARBY_URL)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.places)
    }
}

/// Coarse category from place type tokens.
pub fn map_place_category(primary_type: &str, types: &[String]) -> Category {
    let primary = primary_type.to_lowercase();
    let has = |token: &str| types.iter().any(|t| t.eq_ignore_ascii_case(token));
    if ["animal_shelter", "veterinary_care", "pet_store"]
        .iter()
        .any(|t| *t == primary || has(t))
    {
        Category::PetIndustry
    } else if has("nonprofit_organization") {
        Category::Nonprofit
    } else if has("corporate_office") {
        Category::CorporateCsr
    } else if has("bank") || has("investment_service") {
        Category::Financial
    } else {
        Category::LocalBusiness
    }
}

/// Map an API place into a candidate with coordinates and a notes line
/// recording its type tokens and business status.
pub fn map_place_to_candidate(place: &Place) -> OrganizationCandidate {
    let name = place
        .display_name
        .as_ref()
        .and_then(|d| d.text.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Unknown Place");
    let primary_type = place.primary_type.as_deref().unwrap_or("").trim();

    let mut notes_bits = Vec::new();
    if !primary_type.is_empty() {
        notes_bits.push(format!("Google Places primary type: {primary_type}"));
    }
    if !place.types.is_empty() {
        let shown: Vec<&str> = place.types.iter().take(8).map(String::as_str).collect();
        notes_bits.push(format!("Types: {}", shown.join(", ")));
    }
    if let Some(status) = place.business_status.as_deref() {
        notes_bits.push(format!("Business status: {status}"));
    }
    notes_bits.push("Discovered via Google Places Nearby Search.".to_string());

    let score = score_place(
        name,
        &place.types,
        primary_type,
        place.website_uri.as_deref().is_some_and(|w| !w.is_empty()),
    );

    OrganizationCandidate::place(
        &place.id,
        name,
        place.website_uri.clone().filter(|w| !w.is_empty()),
        map_place_category(primary_type, &place.types),
        score,
        place.formatted_address.clone().filter(|a| !a.is_empty()),
        place.location.as_ref().and_then(|l| l.latitude),
        place.location.as_ref().and_then(|l| l.longitude),
        place.national_phone_number.clone().filter(|p| !p.is_empty()),
        notes_bits.join(" "),
        Some(primary_type.to_string()).filter(|t| !t.is_empty()),
        place.types.clone(),
    )
}

/// Collect local place candidates by tiling nearby search across the
/// requested radius.
///
/// Checks the global and stage deadlines before every tile, dedupes by
/// place id within the run, counts tile errors against a cap, and stops
/// once the target candidate count is reached. Every stop except
/// reaching the target emits a `stopped_early` warning.
#[allow(clippy::too_many_arguments)]
pub async fn run_places_stage(
    client: &PlacesClient,
    origin: &GeoPoint,
    radius_miles: f64,
    result_limit: usize,
    global_deadline: Deadline,
    stage_budget: Duration,
    tile_error_cap: u32,
    progress: &ProgressSink,
) -> Vec<OrganizationCandidate> {
    let radius_m = (radius_miles * METERS_PER_MILE).max(100.0);
    let result_limit = result_limit.clamp(1, 1000);
    let target = (result_limit * 4).max(80).min(1000).min(4000);
    let tile_radius = geo::tile_radius_for(radius_m);
    let tiles = geo::generate_tiles(origin.latitude, origin.longitude, radius_m, tile_radius);
    let stage_deadline = Deadline::after(stage_budget.max(Duration::from_secs(1)));

    progress(
        ProgressEvent::running(
            "google_places",
            format!("Google Places nearby search across {} tile(s)...", tiles.len()),
        )
        .with_progress(14)
        .with_extra("source", json!("google_places"))
        .with_extra("tiles_total", json!(tiles.len())),
    );

    let mut seen_place_ids: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();
    let mut tile_errors = 0u32;
    let mut stop_reason: Option<StopReason> = None;
    let mut tiles_done = 0usize;

    for (idx, tile) in tiles.iter().enumerate() {
        if global_deadline.expired() {
            stop_reason = Some(StopReason::GlobalDeadline);
            break;
        }
        if stage_deadline.expired() {
            stop_reason = Some(StopReason::GooglePlacesStageDeadline);
            break;
        }
        if candidates.len() >= target {
            stop_reason = Some(StopReason::TargetCandidatesReached);
            break;
        }

        let places = match client.search_nearby(tile).await {
            Ok(places) => places,
            Err(err) => {
                tile_errors += 1;
                warn!(
                    tile = idx + 1,
                    tiles_total = tiles.len(),
                    tile_errors,
                    error = %err,
                    "Google Places tile failed"
                );
                progress(
                    ProgressEvent::warning(
                        "google_places",
                        format!("Google Places tile {}/{} issue: {err}", idx + 1, tiles.len()),
                    )
                    .with_extra("source", json!("google_places"))
                    .with_extra("tile_index", json!(idx + 1))
                    .with_extra("tile_errors", json!(tile_errors)),
                );
                if tile_errors >= tile_error_cap.max(1) {
                    stop_reason = Some(StopReason::TooManyTileErrors);
                    break;
                }
                continue;
            }
        };

        for place in &places {
            let place_id = place.id.trim();
            if place_id.is_empty() || !seen_place_ids.insert(place_id.to_string()) {
                continue;
            }
            candidates.push(map_place_to_candidate(place));
            if candidates.len() >= target {
                break;
            }
        }
        tiles_done = idx + 1;

        let pct = 14 + ((tiles_done as f64 / tiles.len().max(1) as f64) * 24.0) as u8;
        progress(
            ProgressEvent::running(
                "google_places",
                format!(
                    "Google Places collected {} candidate(s) from {}/{} tile(s).",
                    candidates.len(),
                    tiles_done,
                    tiles.len()
                ),
            )
            .with_progress(pct)
            .with_extra("source", json!("google_places"))
            .with_extra("tiles_total", json!(tiles.len()))
            .with_extra("tiles_done", json!(tiles_done))
            .with_extra("candidates", json!(candidates.len())),
        );
    }

    if let Some(reason) = stop_reason.filter(|r| *r != StopReason::TargetCandidatesReached) {
        progress(
            ProgressEvent::warning(
                "google_places",
                format!(
                    "Google Places stopped early ({}). Continuing with collected candidates.",
                    reason.describe()
                ),
            )
            .with_extra("source", json!("google_places"))
            .with_extra("tiles_total", json!(tiles.len()))
            .with_extra("tiles_done", json!(tiles_done))
            .with_extra("candidates", json!(candidates.len()))
            .with_stop_reason(reason),
        );
    }

    info!(
        count = candidates.len(),
        tiles_done,
        tiles_total = tiles.len(),
        source = "google_places",
        "places stage done"
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::noop_sink;

    fn place(id: &str, name: &str, types: &[&str], primary: &str) -> Place {
        Place {
            id: id.to_string(),
            display_name: Some(DisplayName {
                text: Some(name.to_string()),
            }),
            formatted_address: Some("123 SW Main St, Portland, OR 97204, USA".to_string()),
            location: Some(Location {
                latitude: Some(45.51),
                longitude: Some(-122.67),
            }),
            types: types.iter().map(|t| t.to_string()).collect(),
            primary_type: Some(primary.to_string()),
            business_status: Some("OPERATIONAL".to_string()),
            website_uri: Some("https://example.org".to_string()),
            national_phone_number: Some("(503) 555-0100".to_string()),
        }
    }

    #[test]
    fn test_map_place_category() {
        assert_eq!(
            map_place_category("animal_shelter", &["animal_shelter".into()]),
            Category::PetIndustry
        );
        assert_eq!(
            map_place_category("", &["nonprofit_organization".into()]),
            Category::Nonprofit
        );
        assert_eq!(map_place_category("", &["bank".into()]), Category::Financial);
        assert_eq!(map_place_category("", &["bakery".into()]), Category::LocalBusiness);
    }

    #[test]
    fn test_map_place_to_candidate() {
        let mapped = map_place_to_candidate(&place(
            "ChIJtest",
            "Westside Animal Shelter",
            &["animal_shelter", "nonprofit_organization"],
            "animal_shelter",
        ));
        assert_eq!(mapped.place_id.as_deref(), Some("ChIJtest"));
        assert_eq!(mapped.category, Category::PetIndustry);
        assert_eq!(mapped.city.as_deref(), Some("Portland"));
        assert_eq!(mapped.state.as_deref(), Some("OR"));
        assert_eq!(mapped.latitude, Some(45.51));
        assert!(mapped.donation_potential_score >= 8);
        assert!(mapped.notes.as_deref().unwrap().contains("animal_shelter"));
        assert!(mapped.location_hint_applied);
    }

    #[tokio::test]
    async fn test_stage_returns_empty_on_expired_deadline() {
        let client = PlacesClient {
            client: reqwest::Client::new(),
            api_key: "test".to_string(),
        };
        let origin = GeoPoint {
            latitude: 45.5152,
            longitude: -122.6784,
            display_name: None,
        };
        let sink = noop_sink();
        let collected = run_places_stage(
            &client,
            &origin,
            5.0,
            100,
            Deadline::after(Duration::ZERO),
            Duration::from_secs(180),
            10,
            &sink,
        )
        .await;
        assert!(collected.is_empty());
    }
}
