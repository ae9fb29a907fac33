//! Great-circle distance math and tile-grid generation.
//!
//! Nearby-search APIs cap results per call, so large radii are covered by
//! laying a grid of smaller circular tiles over the search area and
//! querying each tile center.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_MILES: f64 = 3958.8;
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

pub const METERS_PER_MILE: f64 = 1609.344;

/// A geocoded point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: Option<String>,
}

/// A circular sub-region of the search area, consumed read-only by the
/// nearby-places provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTile {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

/// Great-circle distance between two points in miles.
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine(lat1, lon1, lat2, lon2, EARTH_RADIUS_MILES)
}

/// Great-circle distance between two points in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine(lat1, lon1, lat2, lon2, EARTH_RADIUS_METERS)
}

fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius: f64) -> f64 {
    let p1 = lat1.to_radians();
    let p2 = lat2.to_radians();
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    radius * c
}

/// Whether a point lies within `radius_miles` of `origin`.
///
/// Returns false when origin, point, or radius is missing so callers can
/// fall back to text matching.
pub fn within_radius_miles(
    origin: Option<&GeoPoint>,
    lat: Option<f64>,
    lon: Option<f64>,
    radius_miles: Option<f64>,
) -> bool {
    let (Some(origin), Some(lat), Some(lon), Some(radius)) = (origin, lat, lon, radius_miles)
    else {
        return false;
    };
    haversine_miles(origin.latitude, origin.longitude, lat, lon) <= radius
}

fn meters_per_degree_lon(lat_deg: f64) -> f64 {
    METERS_PER_DEGREE_LAT * lat_deg.to_radians().cos()
}

/// Tile radius appropriate for a total search radius, in meters.
///
/// Small radii get dense coverage; very large radii get coarser tiles to
/// bound the number of API calls.
pub fn tile_radius_for(radius_m: f64) -> f64 {
    if radius_m <= 3_000.0 {
        700.0
    } else if radius_m <= 8_000.0 {
        1_200.0
    } else if radius_m <= 20_000.0 {
        1_800.0
    } else {
        2_500.0
    }
}

/// Generate a square grid of tile centers constrained to the search radius.
///
/// The origin tile always comes first, and no two tiles share a center
/// after rounding to 5 decimal places.
pub fn generate_tiles(
    center_lat: f64,
    center_lon: f64,
    radius_m: f64,
    tile_radius_m: f64,
) -> Vec<GeoTile> {
    let tile_radius_m = tile_radius_m.max(250.0);
    let lat_step = (tile_radius_m * 1.6) / METERS_PER_DEGREE_LAT;
    let lon_step = (tile_radius_m * 1.6) / meters_per_degree_lon(center_lat).max(1.0);
    let lat_range = radius_m / METERS_PER_DEGREE_LAT;
    let lon_range = radius_m / meters_per_degree_lon(center_lat).max(1.0);

    let mut tiles = vec![GeoTile {
        latitude: center_lat,
        longitude: center_lon,
        radius_m: tile_radius_m,
    }];
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    seen.insert(rounded_center(center_lat, center_lon));

    let mut lat = center_lat - lat_range;
    while lat <= center_lat + lat_range {
        let mut lon = center_lon - lon_range;
        while lon <= center_lon + lon_range {
            if haversine_meters(center_lat, center_lon, lat, lon) <= radius_m + tile_radius_m
                && seen.insert(rounded_center(lat, lon))
            {
                tiles.push(GeoTile {
                    latitude: lat,
                    longitude: lon,
                    radius_m: tile_radius_m,
                });
            }
            lon += lon_step;
        }
        lat += lat_step;
    }

    tiles
}

fn rounded_center(lat: f64, lon: f64) -> (i64, i64) {
    ((lat * 1e5).round() as i64, (lon * 1e5).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Portland OR to Seattle WA, roughly 145 miles.
        let d = haversine_miles(45.5152, -122.6784, 47.6062, -122.3321);
        assert!((140.0..150.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert!(haversine_miles(45.0, -122.0, 45.0, -122.0) < 1e-9);
    }

    #[test]
    fn test_within_radius_requires_all_inputs() {
        let origin = GeoPoint {
            latitude: 45.5,
            longitude: -122.6,
            display_name: None,
        };
        assert!(within_radius_miles(
            Some(&origin),
            Some(45.51),
            Some(-122.61),
            Some(5.0)
        ));
        assert!(!within_radius_miles(None, Some(45.51), Some(-122.61), Some(5.0)));
        assert!(!within_radius_miles(Some(&origin), None, Some(-122.61), Some(5.0)));
        assert!(!within_radius_miles(Some(&origin), Some(45.51), Some(-122.61), None));
    }

    #[test]
    fn test_generate_tiles_origin_first_and_unique() {
        let tiles = generate_tiles(45.5152, -122.6784, 8_000.0, 1_200.0);
        assert!(tiles.len() > 1);
        assert_eq!(tiles[0].latitude, 45.5152);
        assert_eq!(tiles[0].longitude, -122.6784);

        let mut seen = HashSet::new();
        for tile in &tiles {
            let key = (
                (tile.latitude * 1e5).round() as i64,
                (tile.longitude * 1e5).round() as i64,
            );
            assert!(seen.insert(key), "duplicate tile center {key:?}");
        }
    }

    #[test]
    fn test_generate_tiles_stay_near_radius() {
        let radius = 5_000.0;
        let tile_radius = tile_radius_for(radius);
        for tile in generate_tiles(45.5152, -122.6784, radius, tile_radius) {
            let d = haversine_meters(45.5152, -122.6784, tile.latitude, tile.longitude);
            assert!(d <= radius + tile_radius + 1.0, "tile {d}m out of bounds");
        }
    }

    #[test]
    fn test_tile_radius_scales_with_search_radius() {
        assert_eq!(tile_radius_for(2_000.0), 700.0);
        assert_eq!(tile_radius_for(5_000.0), 1_200.0);
        assert_eq!(tile_radius_for(15_000.0), 1_800.0);
        assert_eq!(tile_radius_for(40_000.0), 2_500.0);
    }
}
