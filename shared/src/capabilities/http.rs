use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::error::{AppError, ErrorKind};
use crate::fetch::{FetchError, SearchQuery};
use crate::item::ItemId;

pub const MAX_URL_LENGTH: usize = 2048;
pub const ITEMS_PATH: &str = "/api/v1/items";

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<HttpError> for AppError {
    fn from(e: HttpError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

/// Base URL of the item data source, validated once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    base: Url,
}

impl ApiEndpoint {
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let invalid = |reason: String| HttpError::InvalidUrl {
            url: truncate_url(base),
            reason,
        };

        if base.trim().is_empty() {
            return Err(invalid("URL cannot be empty".into()));
        }
        if base.len() > MAX_URL_LENGTH {
            return Err(invalid(format!(
                "URL exceeds maximum length of {MAX_URL_LENGTH} bytes"
            )));
        }

        let parsed = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(invalid(format!(
                "invalid scheme '{scheme}', only 'http' and 'https' are allowed"
            )));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("URL must have a host".into()));
        }
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(invalid("credentials in URL are not allowed".into()));
        }

        Ok(Self { base: parsed })
    }

    /// `GET /api/v1/items?lat=..&lng=..&radius=..[&category=..]&status=..&min_results=..`
    pub fn search_url(&self, query: &SearchQuery) -> Result<Url, HttpError> {
        let mut url = self.join(ITEMS_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("lat", &query.center.lat().to_string())
                .append_pair("lng", &query.center.lon().to_string())
                .append_pair("radius", &query.radius_km.to_string());
            if let Some(categories) = &query.categories {
                pairs.append_pair("category", categories);
            }
            pairs
                .append_pair("status", &query.status)
                .append_pair("min_results", &query.min_results.to_string());
        }
        Ok(url)
    }

    pub fn item_url(&self, id: ItemId) -> Result<Url, HttpError> {
        self.join(&format!("{ITEMS_PATH}/{id}"))
    }

    fn join(&self, path: &str) -> Result<Url, HttpError> {
        self.base.join(path).map_err(|e| HttpError::InvalidUrl {
            url: truncate_url(path),
            reason: e.to_string(),
        })
    }
}

/// Folds a crux_http result into the engine's own error type.
pub fn into_outcome<T>(result: crux_http::Result<crux_http::Response<T>>) -> Result<T, FetchError> {
    match result {
        Ok(mut response) => {
            let status = u16::from(response.status());
            if !(200..300).contains(&status) {
                return Err(FetchError::Status {
                    status,
                    message: format!("unexpected status {status}"),
                });
            }
            response
                .take_body()
                .ok_or_else(|| FetchError::Decode("empty response body".into()))
        }
        Err(e) => Err(FetchError::Network(e.to_string())),
    }
}

fn truncate_url(url: &str) -> String {
    if url.len() <= 100 {
        url.to_string()
    } else {
        let cut = (0..=100).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &url[..cut])
    }
}
