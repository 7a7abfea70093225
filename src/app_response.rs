use std::fmt::{Display, Formatter};

use lmdb::Error as LmdbError;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;

/// Message surfaced to the user when the backing store runs out of room.
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "Storage quota exceeded! Please delete some lessons or use smaller video files.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppResponse {
    StorageError(String),
    SerializationError(String),
    NotFound(String),
    ValidationError(String),
    QuotaExceeded(String),
    MediaError(String),
    BadRequest(String),
    Ok(String),
}

impl Display for AppResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppResponse::StorageError(msg) => write!(f, "Storage error: {}", msg),
            AppResponse::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppResponse::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppResponse::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppResponse::QuotaExceeded(msg) => write!(f, "Quota exceeded: {}", msg),
            AppResponse::MediaError(msg) => write!(f, "Media error: {}", msg),
            AppResponse::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppResponse::Ok(msg) => write!(f, "Ok: {}", msg),
        }
    }
}

impl std::error::Error for AppResponse {}

impl From<LmdbError> for AppResponse {
    fn from(err: LmdbError) -> Self {
        match err {
            LmdbError::MapFull => AppResponse::QuotaExceeded(QUOTA_EXCEEDED_MESSAGE.to_string()),
            LmdbError::NotFound => AppResponse::NotFound("Key not found in storage".to_string()),
            LmdbError::Corrupted | LmdbError::Panic => {
                AppResponse::StorageError(format!("Storage is corrupted: {}", err))
            }
            _ => AppResponse::StorageError(format!("LMDB error: {}", err)),
        }
    }
}

impl From<SerdeError> for AppResponse {
    fn from(err: SerdeError) -> Self {
        AppResponse::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for AppResponse {
    fn from(err: std::io::Error) -> Self {
        AppResponse::StorageError(format!("IO error: {}", err))
    }
}

impl AppResponse {
    pub fn success(msg: impl Into<String>) -> Self {
        AppResponse::Ok(msg.into())
    }

    pub fn quota_exceeded() -> Self {
        AppResponse::QuotaExceeded(QUOTA_EXCEEDED_MESSAGE.to_string())
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AppResponse::QuotaExceeded(_))
    }
}
