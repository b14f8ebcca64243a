mod geolocation;
mod http;
mod kv;

pub use self::geolocation::{Geolocation, GeolocationOperation};
pub use self::http::{into_outcome, ApiEndpoint, HttpError, ITEMS_PATH};
pub use self::kv::{
    decode_radius, decode_session, encode_radius, encode_session, KeyNamespace, KvKey,
    StorageError,
};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::event::Event;

#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CapabilityError> for crate::error::AppError {
    fn from(e: CapabilityError) -> Self {
        match e {
            CapabilityError::Http(e) => e.into(),
            CapabilityError::Storage(e) => e.into(),
        }
    }
}

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
    pub geolocation: Geolocation<Event>,
}
