//! Best-effort device location. The engine always has a position to work
//! with: the configured default until a real fix arrives, after which only
//! newer real fixes replace it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::geo::LatLon;

/// A device position fix as reported by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        let kind = match e {
            LocationError::PermissionDenied => ErrorKind::LocationPermissionDenied,
            LocationError::Timeout => ErrorKind::Timeout,
            LocationError::Unavailable(_) => ErrorKind::Location,
        };
        AppError::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub position: LatLon,
    /// `false` while the configured fallback is in use.
    pub is_real: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationUpdate {
    /// The result belongs to an attempt that is no longer awaited.
    Stale,
    Upgraded(UserLocation),
    /// Acquisition failed; the previous location stays in place.
    Kept(LocationError),
}

/// Tracks the session's user location and one-shot acquisition attempts.
#[derive(Debug, Clone)]
pub struct UserLocationProvider {
    current: UserLocation,
    attempt: u32,
    in_flight: Option<u32>,
}

impl UserLocationProvider {
    #[must_use]
    pub const fn new(default: LatLon) -> Self {
        Self {
            current: UserLocation {
                position: default,
                is_real: false,
            },
            attempt: 0,
            in_flight: None,
        }
    }

    #[must_use]
    pub const fn current(&self) -> UserLocation {
        self.current
    }

    #[must_use]
    pub const fn is_acquiring(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True until the first attempt has been started in this session.
    #[must_use]
    pub const fn never_attempted(&self) -> bool {
        self.attempt == 0
    }

    /// Starts a new attempt, superseding any attempt still in flight.
    pub fn begin_acquisition(&mut self) -> u32 {
        self.attempt = self.attempt.wrapping_add(1);
        self.in_flight = Some(self.attempt);
        self.attempt
    }

    pub fn resolve(&mut self, attempt: u32, result: Result<GeoFix, LocationError>) -> LocationUpdate {
        if self.in_flight != Some(attempt) {
            tracing::debug!(attempt, current = self.attempt, "ignoring stale location result");
            return LocationUpdate::Stale;
        }
        self.in_flight = None;

        let fix = match result {
            Ok(fix) => fix,
            Err(e) => {
                tracing::warn!(attempt, error = %e, "location unavailable, keeping previous position");
                return LocationUpdate::Kept(e);
            }
        };

        match LatLon::new(fix.lat, fix.lon) {
            Ok(position) => {
                self.current = UserLocation {
                    position,
                    is_real: true,
                };
                tracing::info!(
                    attempt,
                    lat = position.lat(),
                    lon = position.lon(),
                    accuracy_m = ?fix.accuracy_m,
                    "device location acquired"
                );
                LocationUpdate::Upgraded(self.current)
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "device reported an invalid position");
                LocationUpdate::Kept(LocationError::Unavailable(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn riga() -> LatLon {
        LatLon::new(56.9496, 24.1052).unwrap()
    }

    fn fix(lat: f64, lon: f64) -> GeoFix {
        GeoFix {
            lat,
            lon,
            accuracy_m: Some(12.0),
        }
    }

    #[test]
    fn starts_with_default_position() {
        let provider = UserLocationProvider::new(riga());
        assert_eq!(provider.current().position, riga());
        assert!(!provider.current().is_real);
        assert!(provider.never_attempted());
    }

    #[test]
    fn successful_fix_upgrades_once() {
        let mut provider = UserLocationProvider::new(riga());
        let attempt = provider.begin_acquisition();
        assert_matches!(
            provider.resolve(attempt, Ok(fix(56.95, 24.10))),
            LocationUpdate::Upgraded(loc) if loc.is_real
        );
        // A duplicate delivery for the same attempt is not applied twice.
        assert_eq!(
            provider.resolve(attempt, Ok(fix(10.0, 10.0))),
            LocationUpdate::Stale
        );
        assert!((provider.current().position.lat() - 56.95).abs() < 1e-9);
    }

    #[test]
    fn failure_keeps_default() {
        let mut provider = UserLocationProvider::new(riga());
        let attempt = provider.begin_acquisition();
        assert_eq!(
            provider.resolve(attempt, Err(LocationError::Timeout)),
            LocationUpdate::Kept(LocationError::Timeout)
        );
        assert_eq!(provider.current().position, riga());
        assert!(!provider.current().is_real);
        assert!(!provider.is_acquiring());
    }

    #[test]
    fn superseded_attempt_is_stale() {
        let mut provider = UserLocationProvider::new(riga());
        let first = provider.begin_acquisition();
        let second = provider.begin_acquisition();
        assert_eq!(provider.resolve(first, Ok(fix(1.0, 1.0))), LocationUpdate::Stale);
        assert_matches!(
            provider.resolve(second, Ok(fix(2.0, 2.0))),
            LocationUpdate::Upgraded(_)
        );
    }

    #[test]
    fn invalid_fix_is_rejected() {
        let mut provider = UserLocationProvider::new(riga());
        let attempt = provider.begin_acquisition();
        assert_matches!(
            provider.resolve(attempt, Ok(fix(f64::NAN, 0.0))),
            LocationUpdate::Kept(LocationError::Unavailable(_))
        );
    }

    #[test]
    fn errors_map_to_app_error_kinds() {
        let e: AppError = LocationError::PermissionDenied.into();
        assert_eq!(e.kind, ErrorKind::LocationPermissionDenied);
    }
}
