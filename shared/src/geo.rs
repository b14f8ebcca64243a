//! Coordinates and distance math.
//!
//! Distances are great-circle (Haversine) kilometers. The radius to zoom
//! table and [`GeoBounds`] decide what the map camera shows.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorKind};

pub const EARTH_RADIUS_KM: f64 = 6_371.0;
pub const MIN_ZOOM: f64 = 3.0;
pub const MAX_ZOOM: f64 = 18.0;
pub const FALLBACK_ZOOM: f64 = 6.0;

/// Radius (km) to the map zoom that shows the whole search circle.
pub const RADIUS_ZOOM_MAP: &[(u32, f64)] = &[
    (1, 15.0),
    (2, 14.0),
    (5, 13.0),
    (10, 12.0),
    (25, 11.0),
    (50, 10.0),
    (100, 9.0),
    (250, 8.0),
];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// A latitude/longitude pair that has passed range validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLatLon", into = "RawLatLon")]
pub struct LatLon {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawLatLon {
    lat: f64,
    #[serde(alias = "lng")]
    lon: f64,
}

impl TryFrom<RawLatLon> for LatLon {
    type Error = CoordinateError;

    fn try_from(raw: RawLatLon) -> Result<Self, Self::Error> {
        Self::new(raw.lat, raw.lon)
    }
}

impl From<LatLon> for RawLatLon {
    fn from(coord: LatLon) -> Self {
        Self {
            lat: coord.lat,
            lon: coord.lon,
        }
    }
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::LongitudeOutOfRange(lon));
        }
        Ok(Self { lat, lon })
    }

    /// For compile-time constants already known to be in range.
    pub(crate) const fn from_degrees_unchecked(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lon(self) -> f64 {
        self.lon
    }

    #[must_use]
    pub fn distance_km(self, other: Self) -> f64 {
        haversine_km(self, other)
    }

    /// Shifts the point by a delta in degrees, clamping into the valid range.
    #[must_use]
    pub(crate) fn offset(self, d_lat: f64, d_lon: f64) -> Self {
        Self {
            lat: (self.lat + d_lat).clamp(-90.0, 90.0),
            lon: (self.lon + d_lon).clamp(-180.0, 180.0),
        }
    }
}

impl TryFrom<(f64, f64)> for LatLon {
    type Error = CoordinateError;

    fn try_from((lat, lon): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(lat, lon)
    }
}

#[must_use]
pub fn haversine_km(p1: LatLon, p2: LatLon) -> f64 {
    const EPSILON: f64 = 1e-10;

    if (p1.lat - p2.lat).abs() < EPSILON && (p1.lon - p2.lon).abs() < EPSILON {
        return 0.0;
    }

    let lat1_rad = p1.lat.to_radians();
    let lat2_rad = p2.lat.to_radians();
    let delta_lat = (p2.lat - p1.lat).to_radians();
    let delta_lon = (p2.lon - p1.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);

    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().asin();
    let result = EARTH_RADIUS_KM * c;

    if result.is_finite() {
        result
    } else {
        f64::MAX
    }
}

#[must_use]
pub fn format_distance(km: f64) -> String {
    if !km.is_finite() || km < 0.0 {
        return "Unknown".to_string();
    }

    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else if km < 10.0 {
        format!("{km:.1} km")
    } else {
        format!("{:.0} km", km.round())
    }
}

#[must_use]
pub fn format_time_ago(timestamp_ms: u64, now_ms: u64) -> String {
    if timestamp_ms > now_ms {
        return "Just now".into();
    }

    let diff_mins = now_ms.saturating_sub(timestamp_ms) / 60_000;
    if diff_mins < 1 {
        return "Just now".into();
    }
    if diff_mins < 60 {
        return format!("{diff_mins}m ago");
    }

    let diff_hours = diff_mins / 60;
    if diff_hours < 24 {
        return format!("{diff_hours}h ago");
    }

    let diff_days = diff_hours / 24;
    if diff_days < 7 {
        return format!("{diff_days}d ago");
    }
    if diff_days < 30 {
        return format!("{}w ago", diff_days / 7);
    }

    format!("{}mo ago", diff_days / 30)
}

#[must_use]
pub fn zoom_for_radius(radius_km: u32) -> f64 {
    RADIUS_ZOOM_MAP
        .iter()
        .find(|(r, _)| *r >= radius_km)
        .map_or(FALLBACK_ZOOM, |(_, z)| *z)
}

/// Axis-aligned box around a set of points, used to fit the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    #[must_use]
    pub fn around(points: &[LatLon]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        for p in rest {
            bounds.south = bounds.south.min(p.lat);
            bounds.north = bounds.north.max(p.lat);
            bounds.west = bounds.west.min(p.lon);
            bounds.east = bounds.east.max(p.lon);
        }
        Some(bounds)
    }

    #[must_use]
    pub fn center(&self) -> LatLon {
        LatLon {
            lat: (self.south + self.north) / 2.0,
            lon: (self.west + self.east) / 2.0,
        }
    }

    /// Zoom at which the larger side of the box still fits, with one level of
    /// padding so markers on the edge stay tappable.
    #[must_use]
    pub fn fit_zoom(&self) -> f64 {
        let span = (self.north - self.south)
            .max(self.east - self.west)
            .max(1e-6);
        let zoom = (360.0 / span).log2() - 1.0;
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> LatLon {
        LatLon::new(lat, lon).unwrap()
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert_eq!(
            LatLon::new(91.0, 0.0),
            Err(CoordinateError::LatitudeOutOfRange(91.0))
        );
        assert_eq!(
            LatLon::new(0.0, -181.0),
            Err(CoordinateError::LongitudeOutOfRange(-181.0))
        );
        assert_eq!(LatLon::new(f64::NAN, 0.0), Err(CoordinateError::NonFinite));
    }

    #[test]
    fn deserializing_invalid_coordinates_fails() {
        assert!(serde_json::from_str::<LatLon>(r#"{"lat": 56.9, "lng": 24.1}"#).is_ok());
        assert!(serde_json::from_str::<LatLon>(r#"{"lat": 120.0, "lon": 24.1}"#).is_err());
    }

    #[test]
    fn same_point_is_zero() {
        let p = coord(56.95, 24.10);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn riga_to_jurmala_is_about_twenty_km() {
        let riga = coord(56.9496, 24.1052);
        let jurmala = coord(56.968, 23.7704);
        let d = haversine_km(riga, jurmala);
        assert!((d - 20.4).abs() < 1.0, "got {d}");
    }

    #[test]
    fn antipodal_distance_is_half_circumference() {
        let d = haversine_km(coord(0.0, 0.0), coord(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1.0);
    }

    #[test]
    fn formats_distance_by_magnitude() {
        assert_eq!(format_distance(0.85), "850 m");
        assert_eq!(format_distance(2.44), "2.4 km");
        assert_eq!(format_distance(35.2), "35 km");
        assert_eq!(format_distance(f64::NAN), "Unknown");
        assert_eq!(format_distance(-1.0), "Unknown");
    }

    #[test]
    fn formats_relative_time() {
        assert_eq!(format_time_ago(0, 30_000), "Just now");
        assert_eq!(format_time_ago(0, 5 * 60_000), "5m ago");
        assert_eq!(format_time_ago(0, 3 * 3_600_000), "3h ago");
        assert_eq!(format_time_ago(0, 2 * 86_400_000), "2d ago");
        assert_eq!(format_time_ago(0, 14 * 86_400_000), "2w ago");
        assert_eq!(format_time_ago(10, 0), "Just now");
    }

    #[test]
    fn zoom_table_falls_back_for_huge_radius() {
        assert_eq!(zoom_for_radius(10), 12.0);
        assert_eq!(zoom_for_radius(11), 11.0);
        assert_eq!(zoom_for_radius(1000), FALLBACK_ZOOM);
    }

    #[test]
    fn bounds_fit_both_points() {
        let a = coord(56.95, 24.10);
        let b = coord(57.05, 24.30);
        let bounds = GeoBounds::around(&[a, b]).unwrap();
        let center = bounds.center();
        assert!((center.lat() - 57.0).abs() < 1e-9);
        assert!((center.lon() - 24.2).abs() < 1e-9);
        let zoom = bounds.fit_zoom();
        assert!((MIN_ZOOM..=MAX_ZOOM).contains(&zoom));
        assert!(GeoBounds::around(&[]).is_none());
    }

    #[test]
    fn single_point_bounds_clamp_to_max_zoom() {
        let p = coord(10.0, 10.0);
        let bounds = GeoBounds::around(&[p]).unwrap();
        assert_eq!(bounds.fit_zoom(), MAX_ZOOM);
    }
}
