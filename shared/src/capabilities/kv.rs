use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorKind};
use crate::event::StoredValue;
use crate::selection::SessionSnapshot;

pub const MAX_KEY_LENGTH: usize = 512;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
    #[error("failed to read '{key}': {message}")]
    Read { key: String, message: String },
    #[error("failed to write '{key}': {message}")]
    Write { key: String, message: String },
    #[error("stored value for '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        let kind = match e {
            StorageError::Corrupt { .. } => ErrorKind::Deserialization,
            StorageError::InvalidKey { .. }
            | StorageError::Read { .. }
            | StorageError::Write { .. } => ErrorKind::Storage,
        };
        AppError::new(kind, e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyNamespace {
    /// Survives process restarts.
    Settings,
    /// Cross-navigation screen state.
    Session,
}

impl KeyNamespace {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Session => "session",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KvKey {
    namespace: KeyNamespace,
    key: String,
}

const SEARCH_RADIUS_KEY: &str = "search_radius_km";
const MAP_SESSION_KEY: &str = "map_screen";

impl KvKey {
    pub fn new(namespace: KeyNamespace, key: impl Into<String>) -> Result<Self, StorageError> {
        let key = key.into();
        Self::validate_key(&key)?;
        Ok(Self { namespace, key })
    }

    #[must_use]
    pub fn raw(&self) -> String {
        format!("{}:{}", self.namespace.prefix(), self.key)
    }

    #[must_use]
    pub const fn namespace(&self) -> KeyNamespace {
        self.namespace
    }

    /// Saved search radius, in kilometers.
    pub fn search_radius() -> Result<Self, StorageError> {
        Self::new(KeyNamespace::Settings, SEARCH_RADIUS_KEY)
    }

    /// Selected item and sheet position of the map screen.
    pub fn map_session() -> Result<Self, StorageError> {
        Self::new(KeyNamespace::Session, MAP_SESSION_KEY)
    }

    fn validate_key(key: &str) -> Result<(), StorageError> {
        let invalid = |reason: &str| StorageError::InvalidKey {
            key: key.chars().take(50).collect(),
            reason: reason.to_string(),
        };
        if key.trim().is_empty() {
            return Err(invalid("key cannot be empty"));
        }
        if key.len() > MAX_KEY_LENGTH {
            return Err(invalid("key exceeds maximum length"));
        }
        if key.contains(':') {
            return Err(invalid("key cannot contain the namespace separator"));
        }
        if key.chars().any(char::is_control) {
            return Err(invalid("key contains control characters"));
        }
        Ok(())
    }
}

pub fn encode_radius(key: &KvKey, km: u32) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(&km).map_err(|e| StorageError::Write {
        key: key.raw(),
        message: e.to_string(),
    })
}

/// `Ok(None)` when nothing was stored yet.
pub fn decode_radius(key: &KvKey, stored: StoredValue) -> Result<Option<u32>, StorageError> {
    read(key, stored, |bytes| {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    })
}

pub fn encode_session(key: &KvKey, snapshot: &SessionSnapshot) -> Result<Vec<u8>, StorageError> {
    snapshot.to_bytes().map_err(|e| StorageError::Write {
        key: key.raw(),
        message: e.to_string(),
    })
}

pub fn decode_session(
    key: &KvKey,
    stored: StoredValue,
) -> Result<Option<SessionSnapshot>, StorageError> {
    read(key, stored, |bytes| {
        SessionSnapshot::from_bytes(bytes).map_err(|e| e.to_string())
    })
}

fn read<T>(
    key: &KvKey,
    stored: StoredValue,
    decode: impl FnOnce(&[u8]) -> Result<T, String>,
) -> Result<Option<T>, StorageError> {
    match stored {
        Ok(None) => Ok(None),
        Ok(Some(bytes)) => decode(&bytes).map(Some).map_err(|message| StorageError::Corrupt {
            key: key.raw(),
            message,
        }),
        Err(message) => Err(StorageError::Read {
            key: key.raw(),
            message,
        }),
    }
}
