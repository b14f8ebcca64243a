//! Versioned result fetching.
//!
//! Every request gets a fresh [`FetchVersion`]. Only the response carrying the
//! latest version is applied; anything older is dropped on arrival. There is
//! no cancellation of in-flight requests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::filters::SearchFilters;
use crate::geo::LatLon;
use crate::item::Item;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FetchVersion(pub u64);

impl FetchVersion {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Parameters of one search request against the item data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub center: LatLon,
    /// Radius actually sent; the "no limit" choice is already mapped to the
    /// nationwide constant.
    pub radius_km: u32,
    /// Comma-joined category wire names.
    pub categories: Option<String>,
    pub status: String,
    pub min_results: u32,
}

impl SearchQuery {
    #[must_use]
    pub fn new(
        center: LatLon,
        filters: &SearchFilters,
        nationwide_radius_km: u32,
        status: &str,
        min_results: u32,
    ) -> Self {
        let radius_km = if filters.is_nationwide() {
            nationwide_radius_km
        } else {
            filters.radius_km
        };
        Self {
            center,
            radius_km,
            categories: filters.category_param(),
            status: status.to_string(),
            min_results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<Item>,
    #[serde(default, alias = "effectiveRadius")]
    pub effective_radius: Option<f64>,
    #[serde(default, alias = "radiusExpanded")]
    pub radius_expanded: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Item {0} not found")]
    NotFound(u64),
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<FetchError> for AppError {
    fn from(e: FetchError) -> Self {
        let kind = match &e {
            FetchError::Network(_) => ErrorKind::Network,
            FetchError::Status { status: 408 | 504, .. } => ErrorKind::Timeout,
            FetchError::Status { status: 404, .. } | FetchError::NotFound(_) => {
                ErrorKind::NotFound
            }
            FetchError::Status { .. } => ErrorKind::Network,
            FetchError::Decode(_) => ErrorKind::Deserialization,
        };
        AppError::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPhase {
    Idle,
    /// Nothing has loaded yet in this session; the shell shows a skeleton.
    InitialLoad,
    /// A previous list is on screen; the shell shows a small indicator.
    Refreshing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Stale,
    Loaded {
        count: usize,
        radius_expanded: bool,
    },
    Failed(AppError),
}

#[derive(Debug, Clone)]
pub struct ResultFetchCoordinator {
    latest: FetchVersion,
    in_flight: bool,
    last_query: Option<SearchQuery>,
    items: Vec<Item>,
    /// Any successful load in this session, including earlier screens.
    has_loaded_once: bool,
    /// A successful load through this coordinator.
    has_results: bool,
    effective_radius_km: Option<f64>,
    radius_expanded: bool,
    error: Option<AppError>,
}

impl ResultFetchCoordinator {
    /// Continues numbering after `last_issued` so responses addressed to an
    /// earlier coordinator never match this one. `loaded_before` carries the
    /// session's load history so a remount refreshes instead of showing the
    /// initial skeleton.
    #[must_use]
    pub const fn resume_after(last_issued: FetchVersion, loaded_before: bool) -> Self {
        Self {
            latest: last_issued,
            in_flight: false,
            last_query: None,
            items: Vec::new(),
            has_loaded_once: loaded_before,
            has_results: false,
            effective_radius_km: None,
            radius_expanded: false,
            error: None,
        }
    }

    pub fn begin(&mut self, query: SearchQuery) -> FetchVersion {
        self.latest = self.latest.next();
        self.in_flight = true;
        tracing::debug!(
            version = self.latest.0,
            radius_km = query.radius_km,
            categories = ?query.categories,
            "issuing search"
        );
        self.last_query = Some(query);
        self.latest
    }

    pub fn complete(
        &mut self,
        version: FetchVersion,
        outcome: Result<SearchResponse, FetchError>,
    ) -> FetchOutcome {
        if version != self.latest {
            tracing::debug!(
                version = version.0,
                latest = self.latest.0,
                "discarding stale search response"
            );
            return FetchOutcome::Stale;
        }
        self.in_flight = false;

        match outcome {
            Ok(response) => {
                let count = response.items.len();
                tracing::info!(
                    version = version.0,
                    count,
                    effective_radius = ?response.effective_radius,
                    expanded = response.radius_expanded,
                    "search results loaded"
                );
                self.items = response.items;
                self.effective_radius_km = response.effective_radius;
                self.radius_expanded = response.radius_expanded;
                self.has_loaded_once = true;
                self.has_results = true;
                self.error = None;
                FetchOutcome::Loaded {
                    count,
                    radius_expanded: self.radius_expanded,
                }
            }
            Err(e) => {
                let error = AppError::from(e).with_context("version", version.0.to_string());
                tracing::warn!(
                    error = %error,
                    kept = self.items.len(),
                    "search failed, keeping last results"
                );
                self.error = Some(error.clone());
                FetchOutcome::Failed(error)
            }
        }
    }

    #[must_use]
    pub const fn latest_version(&self) -> FetchVersion {
        self.latest
    }

    #[must_use]
    pub fn last_query(&self) -> Option<&SearchQuery> {
        self.last_query.as_ref()
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub const fn has_loaded_once(&self) -> bool {
        self.has_loaded_once
    }

    #[must_use]
    pub const fn has_results(&self) -> bool {
        self.has_results
    }

    #[must_use]
    pub const fn phase(&self) -> LoadPhase {
        match (self.in_flight, self.has_loaded_once) {
            (false, _) => LoadPhase::Idle,
            (true, false) => LoadPhase::InitialLoad,
            (true, true) => LoadPhase::Refreshing,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    #[must_use]
    pub const fn radius_expanded(&self) -> bool {
        self.radius_expanded
    }

    /// Radius to show the user: what the source actually searched when it
    /// says so, otherwise the requested one.
    #[must_use]
    pub fn displayed_radius_km(&self, requested_km: u32) -> Option<f64> {
        match self.effective_radius_km {
            Some(r) if r.is_finite() && r > 0.0 => Some(r),
            _ if requested_km == 0 => None,
            _ => Some(f64::from(requested_km)),
        }
    }
}
